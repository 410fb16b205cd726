//! Testing utilities for the Beacon workspace
//!
//! Fixtures for notifications and an in-process [`ScriptedConnector`] that
//! stands in for the push server.

#![allow(missing_docs)]

use async_trait::async_trait;
use beacon_model::NotificationItem;
use beacon_transport::{Connection, Connector, TransportError};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Fixed base instant for fixtures
pub const BASE_EPOCH_SECS: i64 = 1_700_000_000;

/// Timestamp `secs` after the fixture base
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(BASE_EPOCH_SECS + secs, 0).unwrap()
}

/// Unread notification created `secs` after the base
pub fn item(id: i64, title: &str, secs: i64) -> NotificationItem {
    NotificationItem::new(id, title, ts(secs))
}

/// Wire payload for a notification
pub fn payload(id: i64, title: &str, secs: i64) -> Value {
    json!({
        "id": id,
        "title": title,
        "type": "task_assigned",
        "priority": "normal",
        "is_read": false,
        "created_at": ts(secs).to_rfc3339(),
    })
}

/// Text frame carrying a notification
pub fn notification_frame(id: i64, title: &str, secs: i64) -> String {
    json!({ "type": "notification", "data": payload(id, title, secs) }).to_string()
}

/// What the scripted server pushes to the client
#[derive(Debug, Clone)]
enum ServerMessage {
    Text(String),
    Fail,
    Close,
}

#[derive(Debug, Default)]
struct ScriptState {
    attempts: AtomicUsize,
    refusing: AtomicBool,
    urls: Mutex<Vec<String>>,
}

/// Connector whose connections are driven by a [`ScriptedServer`]
#[derive(Debug)]
pub struct ScriptedConnector {
    state: Arc<ScriptState>,
    sessions: mpsc::UnboundedSender<ServerSession>,
}

/// Server side of a [`ScriptedConnector`]
#[derive(Debug)]
pub struct ScriptedServer {
    state: Arc<ScriptState>,
    sessions: mpsc::UnboundedReceiver<ServerSession>,
}

/// Create a connector and the server that controls it
pub fn scripted() -> (Arc<ScriptedConnector>, ScriptedServer) {
    let state = Arc::new(ScriptState::default());
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Arc::new(ScriptedConnector {
            state: state.clone(),
            sessions: tx,
        }),
        ScriptedServer {
            state,
            sessions: rx,
        },
    )
}

impl ScriptedServer {
    /// Wait for the next accepted connection
    pub async fn accept(&mut self) -> ServerSession {
        self.sessions.recv().await.expect("connector dropped")
    }

    /// Refuse (or stop refusing) new connections
    pub fn refuse_connections(&self, refuse: bool) {
        self.state.refusing.store(refuse, Ordering::SeqCst);
    }

    /// Number of connect attempts, refused ones included
    pub fn attempts(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }

    /// URLs dialled so far
    pub fn urls(&self) -> Vec<String> {
        self.state.urls.lock().clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError> {
        self.state.attempts.fetch_add(1, Ordering::SeqCst);
        self.state.urls.lock().push(url.to_string());

        if self.state.refusing.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectFailed("connection refused".to_string()));
        }

        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        self.sessions
            .send(ServerSession {
                to_client,
                from_client,
            })
            .map_err(|_| TransportError::ConnectFailed("server gone".to_string()))?;

        Ok(Box::new(ScriptedConnection {
            inbound,
            outbound,
            closed: false,
        }))
    }
}

/// One accepted connection, seen from the server
#[derive(Debug)]
pub struct ServerSession {
    to_client: mpsc::UnboundedSender<ServerMessage>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl ServerSession {
    /// Push a raw text frame
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.to_client.send(ServerMessage::Text(text.into()));
    }

    /// Push a JSON frame
    pub fn send_json(&self, value: Value) {
        self.send_text(value.to_string());
    }

    /// Push a notification frame
    pub fn push(&self, id: i64, title: &str, secs: i64) {
        self.send_text(notification_frame(id, title, secs));
    }

    /// Make the client's next read fail
    pub fn fail(&self) {
        let _ = self.to_client.send(ServerMessage::Fail);
    }

    /// Close from the server side
    pub fn close(&self) {
        let _ = self.to_client.send(ServerMessage::Close);
    }

    /// Next text frame sent by the client
    pub async fn next_client_frame(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Resolve once the client has closed its end
    pub async fn closed(&self) {
        self.to_client.closed().await;
    }

    /// Check if the client has closed its end
    pub fn is_closed(&self) -> bool {
        self.to_client.is_closed()
    }
}

struct ScriptedConnection {
    inbound: mpsc::UnboundedReceiver<ServerMessage>,
    outbound: mpsc::UnboundedSender<String>,
    closed: bool,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.outbound.send(text).map_err(|_| TransportError::Closed)
    }

    async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
        if self.closed {
            return None;
        }
        match self.inbound.recv().await {
            Some(ServerMessage::Text(text)) => Some(Ok(text)),
            Some(ServerMessage::Fail) => Some(Err(TransportError::Socket("scripted failure".to_string()))),
            Some(ServerMessage::Close) | None => None,
        }
    }

    async fn close(&mut self) {
        self.closed = true;
        self.inbound.close();
    }
}

//! Notification hub
//!
//! Bridges the [`Transport`] and the [`SnapshotStore`] into one view:
//!
//! ```text
//! Transport ──events──→ pump task ──→ NotificationHub::apply
//!                                          │ lock
//!                          NotificationFeed ← mutate
//!                          SnapshotStore    ← persist
//!                          watch<FeedView>  ← publish
//! ```
//!
//! Every transition holds the state lock across mutate, persist and
//! publish, so observers never see a half-applied change.

use crate::config::BeaconConfig;
use crate::feed::NotificationFeed;
use crate::token::{usable_token, TokenProvider};
use beacon_model::{NotificationId, NotificationItem, RawNotification, ServerFrame};
use beacon_store::{KeyValueStorage, SnapshotStore};
use beacon_transport::{Connector, Transport, TransportEvent};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// User-visible text for any transport failure
pub const CONNECTION_ERROR: &str = "Connection error";

/// User-visible text when no token is available
pub const AUTH_REQUIRED: &str = "Authentication required";

/// Coarse connection status shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Not connected and not trying
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Last attempt failed; retries may be pending
    Error,
    /// No token; nothing will connect until the hub is remounted
    AuthRequired,
}

impl ConnectionStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
            Self::AuthRequired => "auth_required",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Published view of the hub
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedView {
    /// Newest first
    pub notifications: Vec<NotificationItem>,
    pub unread_count: usize,
    pub status: ConnectionStatus,
    pub is_connecting: bool,
    pub is_connected: bool,
    /// [`CONNECTION_ERROR`] or [`AUTH_REQUIRED`]
    pub last_error: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct HubState {
    feed: NotificationFeed,
    status: ConnectionStatus,
    last_error: Option<String>,
    last_synced_at: Option<DateTime<Utc>>,
    /// Set by unmount; transport events are ignored from then on
    torn_down: bool,
}

impl HubState {
    fn view(&self) -> FeedView {
        FeedView {
            notifications: self.feed.items().to_vec(),
            unread_count: self.feed.unread_count(),
            status: self.status,
            is_connecting: self.status == ConnectionStatus::Connecting,
            is_connected: self.status == ConnectionStatus::Connected,
            last_error: self.last_error.clone(),
            last_synced_at: self.last_synced_at,
        }
    }
}

/// Reactive notification state for one signed-in user
///
/// Created by [`NotificationHub::mount`]; torn down by
/// [`NotificationHub::unmount`] or on drop. Actions never fail: storage
/// problems are logged and connection problems show up in the status.
pub struct NotificationHub {
    store: SnapshotStore,
    transport: Option<Transport>,
    state: Mutex<HubState>,
    view: watch::Sender<FeedView>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationHub")
            .field("store", &self.store)
            .field("transport", &self.transport)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl NotificationHub {
    /// Hydrate from storage, then start the live connection
    ///
    /// Hydration is synchronous; the connection is established in the
    /// background. Without a usable token no connection is attempted and
    /// the status is [`ConnectionStatus::AuthRequired`].
    ///
    /// Must be called inside a tokio runtime.
    pub fn mount(
        config: &BeaconConfig,
        storage: Arc<dyn KeyValueStorage>,
        connector: Arc<dyn Connector>,
        tokens: &dyn TokenProvider,
    ) -> Arc<Self> {
        let store = SnapshotStore::new(storage, config.storage_key.clone());

        let Some(token) = usable_token(tokens) else {
            tracing::info!(key = %store.key(), "no auth token, staying offline");
            return Self::offline(store, ConnectionStatus::AuthRequired, Some(AUTH_REQUIRED));
        };

        let transport_config = match config.transport_config(&token) {
            Ok(transport_config) => transport_config,
            Err(e) => {
                tracing::error!(api = %config.api_base_url, error = %e, "unusable push endpoint");
                return Self::offline(store, ConnectionStatus::Error, Some(CONNECTION_ERROR));
            }
        };

        let (transport, events) = Transport::new(transport_config, connector);
        let hub = Arc::new(Self::hydrate(store, Some(transport), ConnectionStatus::Disconnected, None));

        let pump = tokio::spawn(pump(Arc::downgrade(&hub), events));
        *hub.pump.lock() = Some(pump);

        if let Some(transport) = &hub.transport {
            transport.connect();
        }
        hub
    }

    /// Hub over stored notifications only, never connecting
    #[must_use]
    pub fn detached(config: &BeaconConfig, storage: Arc<dyn KeyValueStorage>) -> Arc<Self> {
        let store = SnapshotStore::new(storage, config.storage_key.clone());
        Self::offline(store, ConnectionStatus::Disconnected, None)
    }

    fn offline(store: SnapshotStore, status: ConnectionStatus, error: Option<&str>) -> Arc<Self> {
        Arc::new(Self::hydrate(store, None, status, error.map(str::to_string)))
    }

    fn hydrate(
        store: SnapshotStore,
        transport: Option<Transport>,
        status: ConnectionStatus,
        last_error: Option<String>,
    ) -> Self {
        let snapshot = store.load();
        let state = HubState {
            feed: NotificationFeed::from_items(snapshot.notifications),
            status,
            last_error,
            last_synced_at: snapshot.last_synced_at,
            torn_down: false,
        };
        tracing::debug!(
            key = %store.key(),
            count = state.feed.len(),
            unread = state.feed.unread_count(),
            "hub hydrated"
        );
        let (view, _) = watch::channel(state.view());
        Self {
            store,
            transport,
            state: Mutex::new(state),
            view,
            pump: Mutex::new(None),
        }
    }

    /// Mark one notification read
    ///
    /// Returns `false` (and changes nothing) if it is absent or already read.
    pub fn mark_as_read(&self, id: NotificationId) -> bool {
        self.transition(true, |state| state.feed.mark_as_read(id, Utc::now()))
    }

    /// Mark every notification read, returning how many flipped
    pub fn mark_all_as_read(&self) -> usize {
        let mut flipped = 0;
        self.transition(true, |state| {
            flipped = state.feed.mark_all_as_read(Utc::now());
            flipped > 0
        });
        flipped
    }

    /// Drop every notification and persist the empty list
    pub fn clear_notifications(&self) {
        self.transition(true, |state| {
            let dropped = state.feed.clear();
            tracing::debug!(dropped, "notifications cleared");
            true
        });
    }

    /// Reconnect now, resetting backoff
    ///
    /// No-op when the hub never had a token.
    pub fn reconnect(&self) {
        match &self.transport {
            Some(transport) => transport.reconnect(),
            None => tracing::debug!(status = %self.status(), "reconnect ignored, hub is offline"),
        }
    }

    /// Disconnect and stop consuming events; safe to call repeatedly
    ///
    /// A live hub ends up [`ConnectionStatus::Disconnected`]; an offline one
    /// keeps its status.
    pub fn unmount(&self) {
        if let Some(transport) = &self.transport {
            transport.disconnect();
            self.transition(false, |state| {
                let changed = !state.torn_down || state.status != ConnectionStatus::Disconnected;
                state.torn_down = true;
                state.status = ConnectionStatus::Disconnected;
                state.last_error = None;
                changed
            });
        }
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
            tracing::debug!(key = %self.store.key(), "hub unmounted");
        }
    }

    /// Current view
    #[must_use]
    pub fn view(&self) -> FeedView {
        self.view.borrow().clone()
    }

    /// Watch view changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FeedView> {
        self.view.subscribe()
    }

    #[must_use]
    pub fn notifications(&self) -> Vec<NotificationItem> {
        self.state.lock().feed.items().to_vec()
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.state.lock().feed.unread_count()
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.state.lock().status
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    fn apply(&self, event: TransportEvent) {
        match event {
            TransportEvent::Connecting => self.set_status(ConnectionStatus::Connecting, None),
            TransportEvent::Opened => self.set_status(ConnectionStatus::Connected, None),
            TransportEvent::Closed => {
                // an Error event may follow and take precedence
                self.event_transition(false, |state| {
                    let was_connected = state.status == ConnectionStatus::Connected;
                    if was_connected {
                        state.status = ConnectionStatus::Disconnected;
                    }
                    was_connected
                });
            }
            TransportEvent::Error => self.set_status(ConnectionStatus::Error, Some(CONNECTION_ERROR)),
            TransportEvent::Frame(ServerFrame::Notification { data }) => self.receive(data),
            TransportEvent::Frame(ServerFrame::Connected { message, .. }) => {
                tracing::debug!(message = message.as_deref().unwrap_or_default(), "server handshake");
            }
            TransportEvent::Frame(_) => {}
        }
    }

    fn receive(&self, raw: RawNotification) {
        let item = match NotificationItem::normalize(raw, Utc::now()) {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(error = %e, "notification dropped");
                return;
            }
        };
        let id = item.id;

        self.event_transition(true, |state| {
            let outcome = state.feed.push(item);
            tracing::debug!(
                notification_id = %id,
                replaced = outcome.replaced,
                evicted = outcome.evicted.len(),
                "notification received"
            );
            true
        });
    }

    fn set_status(&self, status: ConnectionStatus, error: Option<&str>) {
        self.event_transition(false, |state| {
            let error = error.map(str::to_string);
            if state.status == status && state.last_error == error {
                return false;
            }
            state.status = status;
            state.last_error = error;
            true
        });
    }

    /// Transition driven by the transport; dropped once unmounted
    fn event_transition(&self, persist: bool, mutate: impl FnOnce(&mut HubState) -> bool) -> bool {
        self.transition(persist, |state| !state.torn_down && mutate(state))
    }

    /// Mutate, persist if asked, publish; all under the state lock
    fn transition(&self, persist: bool, mutate: impl FnOnce(&mut HubState) -> bool) -> bool {
        let mut state = self.state.lock();
        if !mutate(&mut state) {
            return false;
        }
        if persist {
            let snapshot = self.store.save(state.feed.items());
            state.last_synced_at = snapshot.last_synced_at;
        }
        self.view.send_replace(state.view());
        true
    }
}

impl Drop for NotificationHub {
    fn drop(&mut self) {
        self.unmount();
    }
}

async fn pump(hub: Weak<NotificationHub>, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
    while let Some(event) = events.recv().await {
        let Some(hub) = hub.upgrade() else {
            break;
        };
        hub.apply(event);
    }
}

//! Connection driver task
//!
//! Owns the socket and runs the state machine. It is steered only through
//! [`Command`]s and reports only through [`TransportEvent`]s and the state
//! watch channel.

use crate::config::TransportConfig;
use crate::connection::{Connection, Connector};
use crate::event::{ConnectionState, SessionId, TransportEvent};
use beacon_model::{ClientFrame, ServerFrame};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

/// Commands accepted by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    /// Drop the current connection (if any) and dial again now
    Reconnect,
    /// Close and stop
    Disconnect,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    PeerClosed,
    Failed,
    Reconnect,
    Disconnect,
}

pub(crate) struct Driver {
    config: TransportConfig,
    connector: Arc<dyn Connector>,
    events: mpsc::UnboundedSender<TransportEvent>,
    state: Arc<watch::Sender<ConnectionState>>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl Driver {
    pub(crate) fn new(
        config: TransportConfig,
        connector: Arc<dyn Connector>,
        events: mpsc::UnboundedSender<TransportEvent>,
        state: Arc<watch::Sender<ConnectionState>>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        Self {
            config,
            connector,
            events,
            state,
            commands,
        }
    }

    /// Run until disconnected or until nobody listens for events
    pub(crate) async fn run(mut self) {
        let mut failures: u32 = 0;

        loop {
            if self.events.is_closed() {
                tracing::debug!("event receiver dropped, stopping transport");
                break;
            }

            self.transition(ConnectionState::Connecting, TransportEvent::Connecting);
            let url = self.config.request_url();

            let attempt = tokio::select! {
                biased;
                command = self.commands.recv() => Err(command),
                result = self.connector.connect(&url) => Ok(result),
            };

            let connected = match attempt {
                Err(Some(Command::Reconnect)) => {
                    failures = 0;
                    continue;
                }
                Err(Some(Command::Disconnect) | None) => break,
                Ok(result) => result,
            };

            match connected {
                Ok(mut conn) => {
                    // A disconnect issued while dialling wins over the fresh connection
                    if let Ok(command) = self.commands.try_recv() {
                        conn.close().await;
                        if command == Command::Disconnect {
                            break;
                        }
                        failures = 0;
                        continue;
                    }

                    let session = SessionId::new();
                    tracing::info!(%session, endpoint = %self.config.endpoint, "notification socket open");
                    self.transition(ConnectionState::Connected, TransportEvent::Opened);

                    let (end, delivered) = self.run_session(conn, session).await;
                    tracing::info!(%session, reason = ?end, delivered, "notification socket closed");
                    self.emit(TransportEvent::Closed);

                    match end {
                        SessionEnd::Disconnect => break,
                        SessionEnd::Reconnect => {
                            failures = 0;
                            continue;
                        }
                        SessionEnd::PeerClosed => {
                            self.set_state(ConnectionState::Disconnected);
                        }
                        SessionEnd::Failed => {
                            self.transition(ConnectionState::Error, TransportEvent::Error);
                        }
                    }

                    // Only a session that carried traffic proves the endpoint healthy
                    if delivered {
                        failures = 0;
                    } else {
                        failures = failures.saturating_add(1);
                        tracing::warn!(%session, attempt = failures, "notification socket closed before any frame");
                    }
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    tracing::warn!(attempt = failures, error = %e, "notification socket connect failed");
                    self.transition(ConnectionState::Error, TransportEvent::Error);
                }
            }

            if self.config.gives_up_after(failures) {
                tracing::info!(failures, "automatic reconnect stopped, waiting for manual reconnect");
                match self.commands.recv().await {
                    Some(Command::Reconnect) => {
                        failures = 0;
                        continue;
                    }
                    Some(Command::Disconnect) | None => break,
                }
            }

            let delay = self.config.retry_delay(failures.saturating_sub(1));
            tracing::debug!(delay_ms = delay_ms(delay), failures, "reconnect scheduled");
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(Command::Reconnect) => failures = 0,
                    Some(Command::Disconnect) | None => break,
                },
                () = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(ConnectionState::Disconnected);
        tracing::debug!("transport driver stopped");
    }

    /// Pump one open connection; also reports whether any frame arrived
    async fn run_session(&mut self, mut conn: Box<dyn Connection>, session: SessionId) -> (SessionEnd, bool) {
        let mut delivered = false;
        let period = self.config.heartbeat_interval;
        let tick = period.unwrap_or(Duration::from_secs(3600));
        let mut heartbeat = tokio::time::interval_at(Instant::now() + tick, tick);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => {
                    conn.close().await;
                    let end = match command {
                        Some(Command::Reconnect) => SessionEnd::Reconnect,
                        Some(Command::Disconnect) | None => SessionEnd::Disconnect,
                    };
                    return (end, delivered);
                }
                frame = conn.next_text() => match frame {
                    Some(Ok(text)) => {
                        delivered = true;
                        self.dispatch(&text, session);
                    }
                    Some(Err(e)) => {
                        tracing::warn!(%session, error = %e, "notification socket failed");
                        conn.close().await;
                        return (SessionEnd::Failed, delivered);
                    }
                    None => return (SessionEnd::PeerClosed, delivered),
                },
                _ = heartbeat.tick(), if period.is_some() => {
                    let sent = match ClientFrame::Ping.to_text() {
                        Ok(ping) => conn.send_text(ping).await,
                        Err(e) => {
                            tracing::error!(error = %e, "heartbeat frame encoding failed");
                            continue;
                        }
                    };
                    if let Err(e) = sent {
                        tracing::warn!(%session, error = %e, "heartbeat send failed");
                        conn.close().await;
                        return (SessionEnd::Failed, delivered);
                    }
                    tracing::trace!(%session, "heartbeat sent");
                }
            }
        }
    }

    fn dispatch(&self, text: &str, session: SessionId) {
        match ServerFrame::parse(text) {
            Ok(ServerFrame::Unknown) => {
                tracing::debug!(%session, "ignoring frame of unknown type");
            }
            Ok(ServerFrame::Pong) => {
                tracing::trace!(%session, "heartbeat acknowledged");
            }
            Ok(frame) => {
                tracing::trace!(%session, kind = frame.kind(), "frame received");
                self.emit(TransportEvent::Frame(frame));
            }
            Err(e) => {
                tracing::warn!(%session, error = %e, "dropping malformed frame");
            }
        }
    }

    fn transition(&self, state: ConnectionState, event: TransportEvent) {
        self.set_state(state);
        self.emit(event);
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn emit(&self, event: TransportEvent) {
        // A closed receiver is noticed at the top of the run loop
        let _ = self.events.send(event);
    }
}

fn delay_ms(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

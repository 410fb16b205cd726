//! Transport handle
//!
//! Owns the driver task. `connect`, `reconnect` and `disconnect` only send
//! commands or spawn the driver; they never block and never fail.

use crate::config::TransportConfig;
use crate::connection::Connector;
use crate::driver::{Command, Driver};
use crate::event::{ConnectionState, TransportEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Running driver
#[derive(Debug)]
struct DriverHandle {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl DriverHandle {
    fn is_running(&self) -> bool {
        !self.task.is_finished() && !self.commands.is_closed()
    }
}

/// Real-time transport wrapper
///
/// Events are delivered on the receiver returned by [`Transport::new`].
/// Methods that start the driver must be called inside a tokio runtime.
pub struct Transport {
    config: TransportConfig,
    connector: Arc<dyn Connector>,
    events: mpsc::UnboundedSender<TransportEvent>,
    state: Arc<watch::Sender<ConnectionState>>,
    driver: Mutex<Option<DriverHandle>>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("endpoint", &self.config.endpoint.as_str())
            .field("state", &self.state())
            .field("driver", &self.driver)
            .finish_non_exhaustive()
    }
}

impl Transport {
    /// Create transport and its event receiver
    #[must_use]
    pub fn new(
        config: TransportConfig,
        connector: Arc<dyn Connector>,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let transport = Self {
            config,
            connector,
            events,
            state: Arc::new(state),
            driver: Mutex::new(None),
        };
        (transport, rx)
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Start connecting; no-op if already running
    pub fn connect(&self) {
        let mut driver = self.driver.lock();
        if driver.as_ref().is_some_and(DriverHandle::is_running) {
            return;
        }
        *driver = Some(self.spawn_driver());
    }

    /// Tear down and re-establish now, resetting backoff
    pub fn reconnect(&self) {
        let mut driver = self.driver.lock();
        if let Some(handle) = driver.as_ref() {
            if handle.is_running() && handle.commands.send(Command::Reconnect).is_ok() {
                return;
            }
        }
        *driver = Some(self.spawn_driver());
    }

    /// Close and stop reconnecting; safe to call repeatedly
    pub fn disconnect(&self) {
        if let Some(handle) = self.driver.lock().take() {
            // Driver may already be gone
            let _ = handle.commands.send(Command::Disconnect);
            tracing::debug!("transport disconnect requested");
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch state changes
    #[inline]
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Check whether the driver task is alive
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.driver.lock().as_ref().is_some_and(DriverHandle::is_running)
    }

    fn spawn_driver(&self) -> DriverHandle {
        let (commands, rx) = mpsc::unbounded_channel();
        let driver = Driver::new(
            self.config.clone(),
            self.connector.clone(),
            self.events.clone(),
            self.state.clone(),
            rx,
        );
        tracing::debug!(endpoint = %self.config.endpoint, "transport driver starting");
        DriverHandle {
            commands,
            task: tokio::spawn(driver.run()),
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

//! Beacon Transport
//!
//! Keeps a live connection to the notification push endpoint and delivers
//! parsed frames as [`TransportEvent`]s on a channel.
//!
//! # Architecture
//!
//! ```text
//! Transport ──commands──→ Driver task ──→ Connector / Connection (WebSocket)
//!     ↑                        │
//!     └── state (watch) ←──────┤
//!   consumer ←── events (mpsc) ┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use beacon_transport::{endpoint_url, Transport, TransportConfig, TransportEvent, WsConnector};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TransportConfig::new(endpoint_url("https://crm.example.com/api")?, "token");
//! let (transport, mut events) = Transport::new(config, Arc::new(WsConnector));
//! transport.connect();
//!
//! while let Some(event) = events.recv().await {
//!     if let TransportEvent::Frame(frame) = event {
//!         println!("{}", frame.kind());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod connection;
mod driver;
pub mod error;
pub mod event;
pub mod transport;

pub use config::{endpoint_url, TransportConfig, NOTIFICATION_PATH};
pub use connection::{Connection, Connector, WsConnection, WsConnector};
pub use error::TransportError;
pub use event::{ConnectionState, SessionId, TransportEvent};
pub use transport::Transport;

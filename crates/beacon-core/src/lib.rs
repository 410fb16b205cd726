//! Beacon Core
//!
//! Live notification feed for a signed-in user:
//! - [`NotificationFeed`]: ordered, deduplicated, bounded list
//! - [`NotificationHub`]: feed + snapshot persistence + live transport,
//!   published as a [`FeedView`]
//! - [`BeaconConfig`]: TOML and environment configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use beacon_core::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let config = BeaconConfig::new().with_env_overrides();
//! let storage = Arc::new(FileStorage::new(config.resolved_data_dir()));
//! let tokens = StaticToken::from(config.token.clone());
//!
//! let hub = NotificationHub::mount(&config, storage, Arc::new(WsConnector), &tokens);
//! let mut views = hub.subscribe();
//! while views.changed().await.is_ok() {
//!     println!("{} unread", views.borrow().unread_count);
//! }
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod feed;
pub mod hub;
pub mod token;

pub use config::BeaconConfig;
pub use error::BeaconError;
pub use feed::{NotificationFeed, PushOutcome};
pub use hub::{ConnectionStatus, FeedView, NotificationHub, AUTH_REQUIRED, CONNECTION_ERROR};
pub use token::{StaticToken, TokenProvider};

/// Commonly used types
pub mod prelude {
    pub use crate::config::BeaconConfig;
    pub use crate::error::BeaconError;
    pub use crate::feed::NotificationFeed;
    pub use crate::hub::{ConnectionStatus, FeedView, NotificationHub};
    pub use crate::token::{StaticToken, TokenProvider};
    pub use beacon_model::{NotificationId, NotificationItem, NotificationType, Priority};
    pub use beacon_store::{FileStorage, KeyValueStorage, MemoryStorage};
    pub use beacon_transport::{Connector, WsConnector};
}

/// Result type for Beacon operations
pub type Result<T> = std::result::Result<T, BeaconError>;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

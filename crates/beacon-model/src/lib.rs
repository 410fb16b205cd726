//! Beacon Model
//!
//! Data model shared by every Beacon crate:
//! - [`NotificationItem`] and its lenient wire shape [`RawNotification`]
//! - [`Metadata`] with an explicit decode step
//! - [`Snapshot`], the persisted form of the notification list
//! - [`ServerFrame`] / [`ClientFrame`], the real-time frame format
//!
//! # Example
//!
//! ```rust
//! use beacon_model::{NotificationItem, ServerFrame};
//!
//! let frame = ServerFrame::parse(r#"{"type":"notification","data":{"id":1,"title":"Hi"}}"#).unwrap();
//! if let ServerFrame::Notification { data } = frame {
//!     let item = NotificationItem::normalize(data, chrono::Utc::now()).unwrap();
//!     assert_eq!(item.title, "Hi");
//! }
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod frame;
pub mod metadata;
pub mod notification;
pub mod snapshot;

pub use error::{FrameError, MetadataError, NormalizeError, SnapshotError};
pub use frame::{ClientFrame, ServerFrame};
pub use metadata::Metadata;
pub use notification::{
    parse_timestamp, retain_newest, unread_count, NotificationId, NotificationItem,
    NotificationType, Priority, RawNotification, DEFAULT_TITLE, MAX_RETAINED,
};
pub use snapshot::Snapshot;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Beacon Store
//!
//! Durable, best-effort persistence of the notification snapshot.
//!
//! ```text
//! NotificationItem[] → Snapshot → JSON → KeyValueStorage (file / memory)
//!                         ↑________________________↓
//!                          load(): normalize + bound
//! ```
//!
//! # Example
//!
//! ```rust
//! use beacon_store::{MemoryStorage, SnapshotStore};
//! use std::sync::Arc;
//!
//! let store = SnapshotStore::with_default_key(Arc::new(MemoryStorage::new()));
//! let snapshot = store.load();
//! assert!(snapshot.notifications.is_empty());
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod storage;
pub mod store;

pub use error::{StorageError, StoreError};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use store::{SnapshotStore, DEFAULT_STORAGE_KEY};

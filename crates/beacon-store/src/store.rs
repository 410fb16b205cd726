//! Snapshot store
//!
//! Persists the notification list under one namespaced key. Loading never
//! fails: missing or corrupt data hydrates as an empty snapshot. Saving is
//! best-effort: [`SnapshotStore::save`] logs write failures instead of
//! returning them.

use crate::error::StoreError;
use crate::storage::KeyValueStorage;
use beacon_model::{NotificationItem, Snapshot};
use chrono::Utc;
use std::sync::Arc;

/// Default storage key
pub const DEFAULT_STORAGE_KEY: &str = "beacon:notifications";

/// Snapshot store over a storage medium
#[derive(Clone)]
pub struct SnapshotStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore").field("key", &self.key).finish_non_exhaustive()
    }
}

impl SnapshotStore {
    /// Create store for `key` on `storage`
    #[inline]
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Create store under [`DEFAULT_STORAGE_KEY`]
    #[inline]
    #[must_use]
    pub fn with_default_key(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self::new(storage, DEFAULT_STORAGE_KEY)
    }

    /// Storage key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the snapshot for hydration
    ///
    /// Items are normalized and the list brought into feed shape. Any failure
    /// yields an empty snapshot.
    #[must_use]
    pub fn load(&self) -> Snapshot {
        let text = match self.storage.get(&self.key) {
            Ok(Some(text)) => text,
            Ok(None) => return Snapshot::empty(),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "snapshot read failed, starting empty");
                return Snapshot::empty();
            }
        };

        match Snapshot::decode(&text, Utc::now()) {
            Ok(snapshot) => {
                tracing::debug!(
                    key = %self.key,
                    count = snapshot.notifications.len(),
                    unread = snapshot.unread_count,
                    "snapshot loaded"
                );
                snapshot
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "corrupt snapshot discarded");
                Snapshot::empty()
            }
        }
    }

    /// Persist `items`, logging any failure
    ///
    /// Returns the snapshot that was (or would have been) written.
    pub fn save(&self, items: &[NotificationItem]) -> Snapshot {
        let snapshot = Snapshot::from_items(items.to_vec(), Utc::now());
        if let Err(e) = self.write(&snapshot) {
            tracing::warn!(key = %self.key, error = %e, "snapshot write failed");
        }
        snapshot
    }

    /// Persist `items`, surfacing failure
    ///
    /// # Errors
    /// - `StoreError::Snapshot` if encoding fails
    /// - `StoreError::Storage` if the medium rejects the write
    pub fn try_save(&self, items: &[NotificationItem]) -> Result<Snapshot, StoreError> {
        let snapshot = Snapshot::from_items(items.to_vec(), Utc::now());
        self.write(&snapshot)?;
        Ok(snapshot)
    }

    /// Persist an empty snapshot
    pub fn clear(&self) -> Snapshot {
        self.save(&[])
    }

    fn write(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let text = snapshot.encode()?;
        self.storage.set(&self.key, &text)?;
        tracing::trace!(key = %self.key, bytes = text.len(), "snapshot written");
        Ok(())
    }
}

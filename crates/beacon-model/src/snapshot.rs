//! Persisted snapshot format
//!
//! Stored as a single JSON document:
//! `{ "notifications": [...], "unreadCount": n, "lastSyncedAt": "<RFC 3339>" }`.

use crate::error::SnapshotError;
use crate::notification::{retain_newest, unread_count, NotificationItem, RawNotification, MAX_RETAINED};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Snapshot of the notification list
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Notifications, newest first
    pub notifications: Vec<NotificationItem>,
    /// Count of unread notifications
    pub unread_count: usize,
    /// When the snapshot was last written
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Snapshot as found in storage, before any item is trusted
#[derive(Debug, Default, Deserialize)]
struct StoredSnapshot {
    #[serde(default)]
    notifications: Vec<Value>,
    #[serde(default, rename = "lastSyncedAt")]
    last_synced_at: Option<String>,
}

impl Snapshot {
    /// Empty snapshot, never synced
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from a list, recomputing the unread count
    #[must_use]
    pub fn from_items(notifications: Vec<NotificationItem>, synced_at: DateTime<Utc>) -> Self {
        Self {
            unread_count: unread_count(&notifications),
            notifications,
            last_synced_at: Some(synced_at),
        }
    }

    /// Decode stored text leniently
    ///
    /// Items that do not normalize are skipped. The list is brought back into
    /// feed shape and the stored unread count is ignored in favour of a
    /// recomputed one.
    ///
    /// # Errors
    /// - `SnapshotError::Corrupt` if the text is not a snapshot object at all
    pub fn decode(text: &str, now: DateTime<Utc>) -> Result<Self, SnapshotError> {
        let stored: StoredSnapshot = serde_json::from_str(text)?;

        let mut notifications: Vec<NotificationItem> = stored
            .notifications
            .into_iter()
            .filter_map(|value| {
                let raw: RawNotification = match serde_json::from_value(value) {
                    Ok(raw) => raw,
                    Err(e) => {
                        tracing::debug!(error = %e, "skipping unreadable stored notification");
                        return None;
                    }
                };
                NotificationItem::normalize(raw, now)
                    .map_err(|e| tracing::debug!(error = %e, "skipping stored notification"))
                    .ok()
            })
            .collect();
        retain_newest(&mut notifications, MAX_RETAINED);

        Ok(Self {
            unread_count: unread_count(&notifications),
            notifications,
            last_synced_at: stored
                .last_synced_at
                .as_deref()
                .and_then(crate::notification::parse_timestamp),
        })
    }

    /// Encode for storage
    ///
    /// # Errors
    /// - `SnapshotError::Corrupt` if serialization fails
    pub fn encode(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Check the stored count against the list
    #[inline]
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.unread_count == unread_count(&self.notifications)
    }
}

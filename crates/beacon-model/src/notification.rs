//! Notification items
//!
//! Defines the normalized [`NotificationItem`], the lenient wire shape
//! [`RawNotification`] it is built from, and the ordering every list of
//! notifications is kept in.

use crate::error::NormalizeError;
use crate::metadata::Metadata;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::str::FromStr;

/// Maximum number of notifications retained in memory and in the snapshot
pub const MAX_RETAINED: usize = 50;

/// Title used when a payload carries none
pub const DEFAULT_TITLE: &str = "Notification";

/// Unique notification identifier (server-assigned)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub i64);

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NotificationId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Notification category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// A task was assigned to the user
    TaskAssigned,
    /// A task is due soon or overdue
    TaskDue,
    /// A task was completed
    TaskCompleted,
    /// A contact record changed
    ContactUpdated,
    /// An organization record changed
    OrganizationUpdated,
    /// An email campaign was sent
    CampaignSent,
    /// An email campaign failed
    CampaignFailed,
    /// A workflow automation fired
    WorkflowTriggered,
    /// The assistant suggested a data change
    AiSuggestion,
    /// The user was mentioned
    Mention,
    /// System announcement
    System,
    /// Any category this client does not know
    #[default]
    #[serde(other)]
    Other,
}

impl NotificationType {
    /// Wire name of the category
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TaskAssigned => "task_assigned",
            Self::TaskDue => "task_due",
            Self::TaskCompleted => "task_completed",
            Self::ContactUpdated => "contact_updated",
            Self::OrganizationUpdated => "organization_updated",
            Self::CampaignSent => "campaign_sent",
            Self::CampaignFailed => "campaign_failed",
            Self::WorkflowTriggered => "workflow_triggered",
            Self::AiSuggestion => "ai_suggestion",
            Self::Mention => "mention",
            Self::System => "system",
            Self::Other => "other",
        }
    }

    /// Parse a wire name, mapping unknown names to `Other`
    #[must_use]
    pub fn from_wire(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "task_assigned" => Self::TaskAssigned,
            "task_due" => Self::TaskDue,
            "task_completed" => Self::TaskCompleted,
            "contact_updated" => Self::ContactUpdated,
            "organization_updated" | "organisation_updated" => Self::OrganizationUpdated,
            "campaign_sent" => Self::CampaignSent,
            "campaign_failed" => Self::CampaignFailed,
            "workflow_triggered" => Self::WorkflowTriggered,
            "ai_suggestion" => Self::AiSuggestion,
            "mention" => Self::Mention,
            "system" => Self::System,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Informational
    Low,
    /// Default priority
    #[default]
    Normal,
    /// Needs attention
    High,
    /// Needs attention now
    Urgent,
}

impl Priority {
    /// Wire name of the priority
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "normal" | "medium" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "urgent" | "critical" => Ok(Self::Urgent),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification as received from the server or read back from storage
///
/// Every field is optional; [`NotificationItem::normalize`] decides defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNotification {
    /// Identifier, as a number or a numeric string
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    /// Title
    #[serde(default)]
    pub title: Option<String>,
    /// Body text
    #[serde(default)]
    pub message: Option<String>,
    /// Category wire name
    #[serde(default, rename = "type", alias = "notification_type")]
    pub kind: Option<String>,
    /// Priority wire name
    #[serde(default)]
    pub priority: Option<String>,
    /// Read flag
    #[serde(default)]
    pub is_read: Option<bool>,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: Option<String>,
    /// Read timestamp
    #[serde(default)]
    pub read_at: Option<String>,
    /// Navigation target
    #[serde(default)]
    pub link: Option<String>,
    /// Metadata, structured or string-encoded
    #[serde(default)]
    pub metadata: Option<Value>,
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

/// Parse a timestamp in RFC 3339, or without offset (assumed UTC)
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// A normalized notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationItem {
    /// Unique identifier
    pub id: NotificationId,
    /// Title
    pub title: String,
    /// Body text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Category
    #[serde(rename = "type", default)]
    pub kind: NotificationType,
    /// Priority
    #[serde(default)]
    pub priority: Priority,
    /// Read flag
    #[serde(default)]
    pub is_read: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// When the user read it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    /// Navigation target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Arbitrary payload
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl NotificationItem {
    /// Create an unread notification
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<NotificationId>, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            message: None,
            kind: NotificationType::default(),
            priority: Priority::default(),
            is_read: false,
            created_at,
            read_at: None,
            link: None,
            metadata: Metadata::empty(),
        }
    }

    /// With message
    #[inline]
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// With category
    #[inline]
    #[must_use]
    pub fn with_kind(mut self, kind: NotificationType) -> Self {
        self.kind = kind;
        self
    }

    /// With priority
    #[inline]
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// With link
    #[inline]
    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// With metadata
    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Already read at the given time
    #[inline]
    #[must_use]
    pub fn read(mut self, at: DateTime<Utc>) -> Self {
        self.is_read = true;
        self.read_at = Some(at);
        self
    }

    /// Normalize a wire payload
    ///
    /// Absent title becomes [`DEFAULT_TITLE`], blank message becomes `None`,
    /// absent or unparseable `created_at` becomes `now`. Metadata that fails
    /// to decode is dropped with a warning.
    ///
    /// # Errors
    /// - `NormalizeError::MissingId` if the payload has no usable id
    pub fn normalize(raw: RawNotification, now: DateTime<Utc>) -> Result<Self, NormalizeError> {
        let id = NotificationId(raw.id.ok_or(NormalizeError::MissingId)?);

        let title = raw
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let message = raw.message.filter(|m| !m.trim().is_empty());

        let created_at = match raw.created_at.as_deref() {
            Some(text) => parse_timestamp(text).unwrap_or_else(|| {
                tracing::debug!(notification_id = %id, created_at = text, "unparseable created_at, using now");
                now
            }),
            None => now,
        };
        let read_at = raw.read_at.as_deref().and_then(parse_timestamp);

        let priority = raw
            .priority
            .as_deref()
            .and_then(|p| p.parse().ok())
            .unwrap_or_default();
        let kind = raw
            .kind
            .as_deref()
            .map(NotificationType::from_wire)
            .unwrap_or_default();

        let metadata = match raw.metadata {
            Some(value) => Metadata::decode(value).unwrap_or_else(|e| {
                tracing::warn!(notification_id = %id, error = %e, "dropping undecodable metadata");
                Metadata::empty()
            }),
            None => Metadata::empty(),
        };

        Ok(Self {
            id,
            title,
            message,
            kind,
            priority,
            is_read: raw.is_read.unwrap_or(false),
            created_at,
            read_at,
            link: raw.link.filter(|l| !l.trim().is_empty()),
            metadata,
        })
    }

    /// Flip to read, stamping `read_at` only if it was never stamped
    ///
    /// Returns `false` if the item was already read.
    pub fn mark_read(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_read {
            return false;
        }
        self.is_read = true;
        self.read_at.get_or_insert(now);
        true
    }

    /// Feed ordering: newest first, ties broken by higher id first
    #[inline]
    #[must_use]
    pub fn newest_first(a: &Self, b: &Self) -> Ordering {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    }
}

/// Count of unread items
#[inline]
#[must_use]
pub fn unread_count(items: &[NotificationItem]) -> usize {
    items.iter().filter(|item| !item.is_read).count()
}

/// Bring an arbitrary list into feed shape
///
/// Sorts newest first, keeps the first occurrence of each id in that order,
/// then truncates to `max`.
pub fn retain_newest(items: &mut Vec<NotificationItem>, max: usize) {
    items.sort_by(NotificationItem::newest_first);
    let mut seen = HashSet::with_capacity(items.len());
    items.retain(|item| seen.insert(item.id));
    items.truncate(max);
}

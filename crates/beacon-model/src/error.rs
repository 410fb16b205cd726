//! Error types for the notification model
//!
//! Covers the three places where untrusted input enters the model:
//! - Wire payload normalization
//! - Metadata decoding
//! - Frame parsing

/// Errors while turning a wire payload into a [`NotificationItem`](crate::NotificationItem)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// Payload carries no usable identifier
    #[error("notification payload has no usable id")]
    MissingId,
}

/// Errors while decoding a metadata payload
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// String-encoded metadata is not valid JSON
    #[error("metadata is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Metadata does not have the requested shape
    #[error("metadata has unexpected shape: {0}")]
    Shape(#[source] serde_json::Error),
}

/// Errors while parsing or encoding real-time frames
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Frame is not valid JSON or misses required fields
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors while decoding a persisted snapshot
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Snapshot text is not a JSON snapshot object
    #[error("corrupt snapshot: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_error_display() {
        assert!(NormalizeError::MissingId.to_string().contains("no usable id"));
    }

    #[test]
    fn frame_error_from_json() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let frame_err = FrameError::from(err);
        assert!(frame_err.to_string().starts_with("malformed frame"));
    }
}

//! Error types for the snapshot store

use beacon_model::SnapshotError;
use std::path::PathBuf;

/// Errors from a storage medium
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// IO error on the backing file
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Write would exceed the medium's quota
    #[error("storage quota exceeded for '{key}': {needed} bytes needed, {quota} allowed")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },
}

impl StorageError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from the snapshot store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Storage medium failed
    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),

    /// Snapshot could not be encoded
    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] SnapshotError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_error_display() {
        let err = StorageError::QuotaExceeded {
            key: "k".to_string(),
            needed: 10,
            quota: 5,
        };
        assert!(err.to_string().contains("quota exceeded"));

        let store_err = StoreError::from(err);
        assert!(store_err.to_string().starts_with("storage failed"));
    }
}

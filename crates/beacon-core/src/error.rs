//! Error types for Beacon Core
//!
//! The hub itself never returns errors from its actions; these cover
//! configuration loading and the offline paths used by the CLI.

use beacon_store::StoreError;
use beacon_transport::TransportError;
use std::path::PathBuf;

/// Main Beacon error type
#[derive(Debug, thiserror::Error)]
pub enum BeaconError {
    /// Configuration value is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file is not valid TOML
    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Transport failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No auth token available
    #[error("authentication required")]
    AuthenticationRequired,

    /// Notification not in the feed
    #[error("notification not found: {0}")]
    NotFound(i64),
}

impl BeaconError {
    /// Check if retrying the same operation can succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::Store(_) => true,
            _ => false,
        }
    }

    /// Check if the user has to act (log in, fix configuration)
    #[inline]
    #[must_use]
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationRequired
                | Self::Config(_)
                | Self::ConfigParse(_)
                | Self::Transport(TransportError::InvalidUrl(_))
        )
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beacon_error_display() {
        let err = BeaconError::Config("bad".to_string());
        assert!(err.to_string().contains("configuration error"));
        assert_eq!(BeaconError::AuthenticationRequired.to_string(), "authentication required");
    }

    #[test]
    fn beacon_error_classification() {
        assert!(BeaconError::AuthenticationRequired.requires_user_action());
        assert!(!BeaconError::AuthenticationRequired.is_retryable());

        let refused = BeaconError::from(TransportError::ConnectFailed("refused".into()));
        assert!(refused.is_retryable());
        assert!(!refused.requires_user_action());

        let bad_url = BeaconError::from(TransportError::InvalidUrl("x".into()));
        assert!(!bad_url.is_retryable());
    }
}

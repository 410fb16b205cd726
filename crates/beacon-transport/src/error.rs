//! Error types for the transport

/// Transport errors
///
/// These stay inside the transport and its logs; consumers only ever see
/// [`TransportEvent::Error`](crate::TransportEvent::Error).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Endpoint URL cannot be used
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),

    /// Connection could not be established
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// Established connection failed
    #[error("socket error: {0}")]
    Socket(String),

    /// Connection already closed
    #[error("connection closed")]
    Closed,
}

impl TransportError {
    /// Check if a retry can succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidUrl(_))
    }
}

//! Connection state and transport events

use beacon_model::ServerFrame;
use ulid::Ulid;

/// Identifier of one connected session, for log correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate new session ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection state machine
///
/// ```text
/// Disconnected → Connecting → Connected → Disconnected
///                    ↓             ↓
///                  Error ←─────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No connection and none being attempted
    #[default]
    Disconnected,
    /// Attempt in progress
    Connecting,
    /// Open connection
    Connected,
    /// Last attempt or session failed
    Error,
}

impl ConnectionState {
    /// Check if open
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Display name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events published by the transport, in order
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A connection attempt started
    Connecting,
    /// Connection opened
    Opened,
    /// Connection closed
    Closed,
    /// Connection attempt or session failed (details stay in the logs)
    Error,
    /// Parsed frame of a known type
    Frame(ServerFrame),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn state_names() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Error.is_connected());
    }
}

//! Real-time frames
//!
//! Incoming frames are JSON objects discriminated by `type`. Unknown types
//! decode to [`ServerFrame::Unknown`] so callers can ignore them.

use crate::error::FrameError;
use crate::notification::RawNotification;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frame received from the push endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// A new or updated notification
    Notification {
        /// Notification payload
        data: RawNotification,
    },
    /// Handshake acknowledgement
    Connected {
        /// User the server bound the socket to
        #[serde(default)]
        user_id: Option<Value>,
        /// Server greeting
        #[serde(default)]
        message: Option<String>,
    },
    /// Heartbeat reply
    Pong,
    /// Any type this client does not handle
    #[serde(other)]
    Unknown,
}

impl ServerFrame {
    /// Parse a text frame
    ///
    /// # Errors
    /// - `FrameError::Malformed` if the text is not a JSON frame object
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Short name for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Notification { .. } => "notification",
            Self::Connected { .. } => "connected",
            Self::Pong => "pong",
            Self::Unknown => "unknown",
        }
    }
}

/// Frame sent to the push endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Heartbeat
    Ping,
}

impl ClientFrame {
    /// Encode as a text frame
    ///
    /// # Errors
    /// - `FrameError::Malformed` if serialization fails
    pub fn to_text(&self) -> Result<String, FrameError> {
        Ok(serde_json::to_string(self)?)
    }
}

//! Session state machine states.

use serde::{Deserialize, Serialize};

/// Connection state of a chat session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No credentials requested yet, or explicitly left.
    #[default]
    Idle,
    /// Credential fetch or transport handshake in flight.
    Connecting,
    /// Transport ready; messages may be sent.
    Connected,
    /// Transport closed by an error or the remote side.
    Disconnected,
}

impl SessionState {
    /// Whether a `connect()` call would start a new attempt.
    pub fn can_connect(self) -> bool {
        matches!(self, Self::Idle | Self::Disconnected)
    }

    pub fn can_send(self) -> bool {
        self == Self::Connected
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnected => write!(f, "Disconnected"),
        }
    }
}

//! Chat log entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sender name reserved for synthetic presence notices.
pub const SYSTEM_SENDER: &str = "System";

/// Unique identifier for a chat entry.
///
/// Generated when the entry is created and stable for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Generate a new random entry ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a chat entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// Produced by this session's own send action.
    Local,
    /// Received from the room, or a reply from the agent service.
    Remote,
    /// Synthesized locally, e.g. presence notices.
    System,
}

/// A single entry in the session's message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub id: EntryId,
    /// Display name of the sender.
    pub sender: String,
    /// Text payload. Never empty.
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub origin: Origin,
}

impl ChatEntry {
    /// Create an entry stamped with a fresh ID and the current time.
    pub fn new(sender: impl Into<String>, content: impl Into<String>, origin: Origin) -> Self {
        Self {
            id: EntryId::new(),
            sender: sender.into(),
            content: content.into(),
            timestamp: Utc::now(),
            origin,
        }
    }

    /// Create a `System` presence notice.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(SYSTEM_SENDER, content, Origin::System)
    }

    pub fn is_local(&self) -> bool {
        self.origin == Origin::Local
    }
}

impl std::fmt::Display for ChatEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.origin {
            Origin::System => write!(f, "* {}", self.content),
            Origin::Local | Origin::Remote => write!(f, "<{}> {}", self.sender, self.content),
        }
    }
}

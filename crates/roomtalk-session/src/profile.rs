//! Who joins which room.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Room joined when none is chosen.
pub const DEFAULT_ROOM: &str = "default";

/// Identity and room name a session connects with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProfile {
    pub identity: String,
    pub room: String,
}

impl SessionProfile {
    /// Build a profile from user input, trimming both values.
    pub fn new(identity: &str, room: &str) -> Result<Self, SessionError> {
        let identity = identity.trim();
        let room = room.trim();
        if identity.is_empty() {
            return Err(SessionError::Config("identity must not be empty".to_string()));
        }
        if room.is_empty() {
            return Err(SessionError::Config("room must not be empty".to_string()));
        }
        Ok(Self {
            identity: identity.to_string(),
            room: room.to_string(),
        })
    }
}

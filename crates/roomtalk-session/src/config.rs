//! Client configuration loaded from TOML.

use std::time::Duration;

use roomtalk_backend::DEFAULT_BACKEND_URL;
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Which room transport a chat session runs over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// LiveKit rooms, with credentials from the backend token endpoint.
    #[default]
    Livekit,
    /// In-process rooms. Only sessions in the same process meet.
    Local,
}

/// Backend address and runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub transport: TransportKind,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            log_level: default_log_level(),
            transport: TransportKind::default(),
        }
    }
}

/// Chat session behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Sender name for agent replies and for data packets with no sender.
    #[serde(default = "default_agent_label")]
    pub agent_label: String,
    /// How long the typing indicator stays up without a reply.
    #[serde(default = "default_typing_timeout_secs")]
    pub typing_timeout_secs: u64,
}

impl ChatConfig {
    pub fn typing_timeout(&self) -> Duration {
        Duration::from_secs(self.typing_timeout_secs)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            agent_label: default_agent_label(),
            typing_timeout_secs: default_typing_timeout_secs(),
        }
    }
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_agent_label() -> String {
    "Assistant".to_string()
}

fn default_typing_timeout_secs() -> u64 {
    10
}

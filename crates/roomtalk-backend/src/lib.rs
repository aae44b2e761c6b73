//! Backend service clients for roomtalk.
//!
//! Defines the [`TokenService`] and [`ReplyGateway`] traits the session
//! controller depends on, and [`BackendClient`], an HTTP implementation of
//! both against the roomtalk backend.

use async_trait::async_trait;
use roomtalk_types::Credentials;

pub mod client;
pub mod error;
#[cfg(feature = "mock")]
pub mod mock;

pub use client::{AgentStatus, BackendClient, DEFAULT_BACKEND_URL};
pub use error::BackendError;

/// Mints room credentials for an identity.
#[async_trait]
pub trait TokenService: Send + Sync + 'static {
    /// Request credentials for `identity` to join `room`.
    async fn fetch_credentials(
        &self,
        identity: &str,
        room: &str,
    ) -> Result<Credentials, BackendError>;
}

/// Produces a synthesized reply to a user's message.
#[async_trait]
pub trait ReplyGateway: Send + Sync + 'static {
    /// Ask the agent to reply to `text` sent by `user_id`.
    ///
    /// Returns `Ok(None)` when the agent has nothing to say.
    async fn reply(&self, user_id: &str, text: &str) -> Result<Option<String>, BackendError>;
}

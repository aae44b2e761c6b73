//! Transport errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("invalid access token: {0}")]
    InvalidToken(String),

    #[error("failed to publish data: {0}")]
    Publish(String),

    #[error("connection closed")]
    Closed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

//! Session errors.

use roomtalk_backend::BackendError;
use roomtalk_transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to fetch room credentials: {0}")]
    CredentialFetch(#[source] BackendError),

    #[error("failed to connect to room: {0}")]
    TransportHandshake(#[source] TransportError),

    #[error("failed to send message: {0}")]
    Publish(#[source] TransportError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("session has shut down")]
    Closed,
}

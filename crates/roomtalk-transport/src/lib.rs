//! Room transport abstraction for roomtalk.
//!
//! This crate defines the [`RoomConnector`] and [`RoomConnection`] traits a
//! realtime room backend must implement, plus an in-process [`local`]
//! backend and, with the `livekit` feature, a LiveKit media-server backend.

use std::sync::Arc;

use async_trait::async_trait;
use roomtalk_types::{ConnectOptions, Participant, RoomEvent};
use tokio::sync::mpsc;

pub mod error;
#[cfg(feature = "livekit")]
pub mod livekit;
pub mod local;
#[cfg(feature = "mock")]
pub mod mock;

pub use error::TransportError;
#[cfg(feature = "livekit")]
pub use crate::livekit::LiveKitConnector;
pub use local::{LocalConnector, LocalHub};

/// Capacity of the per-connection inbound event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// A freshly opened room connection and its inbound event stream.
///
/// The event stream ends when the connection is released.
pub struct OpenedRoom {
    pub connection: Arc<dyn RoomConnection>,
    pub events: mpsc::Receiver<RoomEvent>,
}

/// Opens connections to a room.
#[async_trait]
pub trait RoomConnector: Send + Sync + 'static {
    /// Connect to the room at `url`, authenticating with `token`.
    ///
    /// Resolves once the transport reports the connection as ready.
    async fn connect(
        &self,
        url: &str,
        token: &str,
        options: &ConnectOptions,
    ) -> Result<OpenedRoom, TransportError>;
}

/// An open connection to a room.
#[async_trait]
pub trait RoomConnection: Send + Sync + 'static {
    /// Identity this connection joined as.
    fn local_identity(&self) -> String;

    /// Remote participants currently in the room, excluding ourselves.
    fn remote_participants(&self) -> Vec<Participant>;

    /// Publish a payload to every other participant on `topic`.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Leave the room. Idempotent.
    async fn disconnect(&self);
}

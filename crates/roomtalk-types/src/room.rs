//! Room transport types.
//!
//! Events, participants and connection parameters exchanged between the
//! session controller and a room transport backend.

use serde::{Deserialize, Serialize};

/// Data channel topic carrying chat text.
pub const CHAT_TOPIC: &str = "lk.chat";

/// Connection credentials minted by the token service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Opaque access token.
    pub token: String,
    /// Transport endpoint address.
    #[serde(rename = "wsUrl")]
    pub ws_url: String,
}

/// A participant connected to a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub identity: String,
}

impl Participant {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
        }
    }
}

/// Which ICE candidates the transport may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IceTransportPolicy {
    All,
    /// Only TURN relay candidates.
    Relay,
}

/// Options passed to the transport when opening a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOptions {
    pub ice_transport_policy: IceTransportPolicy,
    /// Subscribe to remote data streams without an explicit request.
    pub auto_subscribe: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            ice_transport_policy: IceTransportPolicy::Relay,
            auto_subscribe: true,
        }
    }
}

/// Inbound events delivered by a room connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// A data packet arrived.
    DataReceived {
        payload: Vec<u8>,
        /// Identity of the sending participant, if known.
        participant: Option<String>,
        topic: Option<String>,
    },
    /// A remote participant joined after we connected.
    ParticipantConnected(Participant),
    /// The connection was closed by the remote side or the network.
    Disconnected { reason: String },
}

impl RoomEvent {
    /// Build a chat-topic data event from text.
    pub fn chat(participant: Option<&str>, text: &str) -> Self {
        Self::DataReceived {
            payload: text.as_bytes().to_vec(),
            participant: participant.map(str::to_string),
            topic: Some(CHAT_TOPIC.to_string()),
        }
    }
}

//! LiveKit media-server backend.
//!
//! Opens real rooms on a LiveKit server with the credentials minted by the
//! backend's token endpoint. ICE is restricted to TURN relay candidates
//! unless the options say otherwise.

use std::sync::Arc;

use ::livekit::prelude::{DataPacket, Room, RoomOptions};
use ::livekit::webrtc::prelude::IceTransportsType;
use async_trait::async_trait;
use roomtalk_types::{ConnectOptions, IceTransportPolicy, Participant, RoomEvent};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::{OpenedRoom, RoomConnection, RoomConnector, EVENT_CHANNEL_CAPACITY};

/// Connects to rooms on a LiveKit server.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveKitConnector;

impl LiveKitConnector {
    pub fn new() -> Self {
        Self
    }
}

/// Room options for a LiveKit connection.
fn room_options(options: &ConnectOptions) -> RoomOptions {
    let mut room_options = RoomOptions::default();
    room_options.auto_subscribe = options.auto_subscribe;
    room_options.rtc_config.ice_transport_type = match options.ice_transport_policy {
        IceTransportPolicy::All => IceTransportsType::All,
        IceTransportPolicy::Relay => IceTransportsType::Relay,
    };
    room_options
}

#[async_trait]
impl RoomConnector for LiveKitConnector {
    async fn connect(
        &self,
        url: &str,
        token: &str,
        options: &ConnectOptions,
    ) -> Result<OpenedRoom, TransportError> {
        debug!(url, ?options, "opening livekit room connection");
        let (room, room_events) = Room::connect(url, token, room_options(options))
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;
        info!(room = %room.name(), "joined livekit room");

        let (tx, events) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(forward_events(room_events, tx));

        Ok(OpenedRoom {
            connection: Arc::new(LiveKitConnection { room }),
            events,
        })
    }
}

/// Translate LiveKit room events into transport events until either side
/// goes away.
async fn forward_events(
    mut room_events: mpsc::UnboundedReceiver<::livekit::RoomEvent>,
    tx: mpsc::Sender<RoomEvent>,
) {
    while let Some(event) = room_events.recv().await {
        let Some(event) = translate(event) else {
            continue;
        };
        let last = matches!(event, RoomEvent::Disconnected { .. });
        if tx.send(event).await.is_err() || last {
            break;
        }
    }
    debug!("livekit event stream ended");
}

fn translate(event: ::livekit::RoomEvent) -> Option<RoomEvent> {
    match event {
        ::livekit::RoomEvent::DataReceived {
            payload,
            topic,
            participant,
            ..
        } => Some(RoomEvent::DataReceived {
            payload: payload.to_vec(),
            participant: participant.map(|p| p.identity().0),
            topic,
        }),
        ::livekit::RoomEvent::ParticipantConnected(participant) => Some(
            RoomEvent::ParticipantConnected(Participant::new(participant.identity().0)),
        ),
        ::livekit::RoomEvent::Disconnected { reason } => Some(RoomEvent::Disconnected {
            reason: format!("{reason:?}"),
        }),
        _ => None,
    }
}

/// A connection to a LiveKit room.
pub struct LiveKitConnection {
    room: Room,
}

#[async_trait]
impl RoomConnection for LiveKitConnection {
    fn local_identity(&self) -> String {
        self.room.local_participant().identity().0
    }

    fn remote_participants(&self) -> Vec<Participant> {
        self.room
            .remote_participants()
            .into_keys()
            .map(|identity| Participant::new(identity.0))
            .collect()
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let packet = DataPacket {
            payload,
            topic: Some(topic.to_string()),
            reliable: true,
            ..Default::default()
        };
        self.room
            .local_participant()
            .publish_data(packet)
            .await
            .map_err(|e| TransportError::Publish(e.to_string()))
    }

    async fn disconnect(&self) {
        if let Err(e) = self.room.close().await {
            warn!(error = %e, "error closing livekit room");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_relay_only() {
        let options = room_options(&ConnectOptions::default());
        assert!(options.auto_subscribe);
        assert!(matches!(
            options.rtc_config.ice_transport_type,
            IceTransportsType::Relay
        ));
    }

    #[test]
    fn all_candidates_when_requested() {
        let options = room_options(&ConnectOptions {
            ice_transport_policy: IceTransportPolicy::All,
            auto_subscribe: false,
        });
        assert!(!options.auto_subscribe);
        assert!(matches!(
            options.rtc_config.ice_transport_type,
            IceTransportsType::All
        ));
    }

    #[test]
    fn unrelated_events_are_skipped() {
        assert!(translate(::livekit::RoomEvent::Reconnecting).is_none());
    }
}

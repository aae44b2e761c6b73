//! In-process room backend.
//!
//! A [`LocalHub`] hosts any number of named rooms inside the current
//! process. Connections made through a [`LocalConnector`] sharing the hub see
//! each other's data packets and join notifications, which is enough to run
//! a chat session without a media server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use roomtalk_types::{ConnectOptions, Participant, RoomEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::{OpenedRoom, RoomConnection, RoomConnector, EVENT_CHANNEL_CAPACITY};

/// Endpoint address reported for local rooms.
pub const LOCAL_URL: &str = "local://roomtalk";

/// Grant encoded into a local access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LocalGrant {
    identity: String,
    room: String,
}

struct Member {
    id: u64,
    identity: String,
    tx: mpsc::Sender<RoomEvent>,
}

#[derive(Default)]
struct HubState {
    rooms: HashMap<String, Vec<Member>>,
    next_member: u64,
}

/// Hosts in-process rooms.
#[derive(Clone, Default)]
pub struct LocalHub {
    state: Arc<Mutex<HubState>>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint an access token granting `identity` entry to `room`.
    pub fn mint_token(identity: &str, room: &str) -> String {
        let grant = LocalGrant {
            identity: identity.to_string(),
            room: room.to_string(),
        };
        serde_json::to_string(&grant).unwrap_or_default()
    }

    /// Identities currently present in `room`.
    pub fn participants(&self, room: &str) -> Vec<String> {
        self.lock()
            .rooms
            .get(room)
            .map(|members| members.iter().map(|m| m.identity.clone()).collect())
            .unwrap_or_default()
    }

    /// Close `room`, dropping every member with a `Disconnected` event.
    pub fn close_room(&self, room: &str, reason: &str) {
        let members = self.lock().rooms.remove(room).unwrap_or_default();
        info!(room, members = members.len(), "closing local room");
        for member in members {
            let _ = member.tx.try_send(RoomEvent::Disconnected {
                reason: reason.to_string(),
            });
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn join(&self, grant: &LocalGrant) -> (u64, Vec<Participant>, mpsc::Receiver<RoomEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let mut state = self.lock();
        state.next_member += 1;
        let id = state.next_member;

        let members = state.rooms.entry(grant.room.clone()).or_default();
        let present = members
            .iter()
            .map(|m| Participant::new(m.identity.clone()))
            .collect();
        for member in members.iter() {
            deliver(
                member,
                RoomEvent::ParticipantConnected(Participant::new(grant.identity.clone())),
            );
        }
        members.push(Member {
            id,
            identity: grant.identity.clone(),
            tx,
        });
        (id, present, rx)
    }

    fn leave(&self, room: &str, member_id: u64) {
        let mut state = self.lock();
        if let Some(members) = state.rooms.get_mut(room) {
            members.retain(|m| m.id != member_id);
            if members.is_empty() {
                state.rooms.remove(room);
            }
        }
    }
}

fn deliver(member: &Member, event: RoomEvent) {
    if let Err(e) = member.tx.try_send(event) {
        warn!(identity = %member.identity, error = %e, "dropping event for slow member");
    }
}

/// Connects to rooms hosted by a [`LocalHub`].
#[derive(Clone)]
pub struct LocalConnector {
    hub: LocalHub,
}

impl LocalConnector {
    pub fn new(hub: LocalHub) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl RoomConnector for LocalConnector {
    async fn connect(
        &self,
        url: &str,
        token: &str,
        options: &ConnectOptions,
    ) -> Result<OpenedRoom, TransportError> {
        let grant: LocalGrant = serde_json::from_str(token)
            .map_err(|e| TransportError::InvalidToken(e.to_string()))?;
        if grant.identity.is_empty() || grant.room.is_empty() {
            return Err(TransportError::InvalidToken(
                "identity and room are required".to_string(),
            ));
        }
        debug!(url, ?options, "opening local room connection");

        let (member_id, _, events) = self.hub.join(&grant);
        info!(room = %grant.room, identity = %grant.identity, "joined local room");

        let connection = LocalConnection {
            hub: self.hub.clone(),
            room: grant.room,
            identity: grant.identity,
            member_id,
        };
        Ok(OpenedRoom {
            connection: Arc::new(connection),
            events,
        })
    }
}

/// A member's connection to a local room.
pub struct LocalConnection {
    hub: LocalHub,
    room: String,
    identity: String,
    member_id: u64,
}

#[async_trait]
impl RoomConnection for LocalConnection {
    fn local_identity(&self) -> String {
        self.identity.clone()
    }

    fn remote_participants(&self) -> Vec<Participant> {
        self.hub
            .lock()
            .rooms
            .get(&self.room)
            .map(|members| {
                members
                    .iter()
                    .filter(|m| m.id != self.member_id)
                    .map(|m| Participant::new(m.identity.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let state = self.hub.lock();
        let members = state.rooms.get(&self.room).ok_or(TransportError::Closed)?;
        if !members.iter().any(|m| m.id == self.member_id) {
            return Err(TransportError::Closed);
        }
        for member in members.iter().filter(|m| m.id != self.member_id) {
            deliver(
                member,
                RoomEvent::DataReceived {
                    payload: payload.clone(),
                    participant: Some(self.identity.clone()),
                    topic: Some(topic.to_string()),
                },
            );
        }
        Ok(())
    }

    async fn disconnect(&self) {
        self.hub.leave(&self.room, self.member_id);
        debug!(room = %self.room, identity = %self.identity, "left local room");
    }
}

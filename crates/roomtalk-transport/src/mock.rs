//! Mock transport backend for testing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use roomtalk_types::{ConnectOptions, Participant, RoomEvent};
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::{OpenedRoom, RoomConnection, RoomConnector, EVENT_CHANNEL_CAPACITY};

/// A recorded call to [`RoomConnector::connect`].
#[derive(Debug, Clone)]
pub struct ConnectAttempt {
    pub url: String,
    pub token: String,
    pub options: ConnectOptions,
}

/// A recorded call to [`RoomConnection::publish`].
#[derive(Debug, Clone)]
pub struct PublishedPacket {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl PublishedPacket {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

#[derive(Debug, Default)]
struct MockState {
    attempts: Vec<ConnectAttempt>,
    published: Vec<PublishedPacket>,
    participants: Vec<Participant>,
    fail_connect: Option<String>,
    fail_publish: Option<String>,
    events_tx: Option<mpsc::Sender<RoomEvent>>,
    publish_delay: Option<Duration>,
    disconnect_delay: Option<Duration>,
    disconnects: usize,
    /// Id of the connection `events_tx` feeds.
    current: u64,
}

/// Mock room connector.
///
/// Every successful connect replaces the event feed that
/// [`MockConnectorHandle::inject`] writes to.
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Get a clonable handle for scripting and observing the mock.
    pub fn handle(&self) -> MockConnectorHandle {
        MockConnectorHandle {
            state: Arc::clone(&self.state),
        }
    }
}

/// Clonable observer and control handle for [`MockConnector`].
#[derive(Clone)]
pub struct MockConnectorHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockConnectorHandle {
    /// Participants reported as already present on the next connect.
    pub fn set_participants(&self, identities: &[&str]) {
        self.state.lock().unwrap().participants =
            identities.iter().map(|i| Participant::new(*i)).collect();
    }

    /// Make subsequent connects fail with a handshake error.
    pub fn fail_connect(&self, reason: &str) {
        self.state.lock().unwrap().fail_connect = Some(reason.to_string());
    }

    /// Make subsequent publishes fail.
    pub fn fail_publish(&self, reason: &str) {
        self.state.lock().unwrap().fail_publish = Some(reason.to_string());
    }

    /// Make each publish take `delay` before it is recorded.
    pub fn set_publish_delay(&self, delay: Duration) {
        self.state.lock().unwrap().publish_delay = Some(delay);
    }

    /// Make each `disconnect()` take `delay` to finish.
    pub fn set_disconnect_delay(&self, delay: Duration) {
        self.state.lock().unwrap().disconnect_delay = Some(delay);
    }

    /// Push an event into the most recent connection's event stream.
    pub async fn inject(&self, event: RoomEvent) {
        let tx = self.state.lock().unwrap().events_tx.clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }

    pub fn attempts(&self) -> Vec<ConnectAttempt> {
        self.state.lock().unwrap().attempts.clone()
    }

    pub fn published(&self) -> Vec<PublishedPacket> {
        self.state.lock().unwrap().published.clone()
    }

    /// Number of `disconnect()` calls on any connection that have finished.
    pub fn disconnects(&self) -> usize {
        self.state.lock().unwrap().disconnects
    }
}

#[async_trait]
impl RoomConnector for MockConnector {
    async fn connect(
        &self,
        url: &str,
        token: &str,
        options: &ConnectOptions,
    ) -> Result<OpenedRoom, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.attempts.push(ConnectAttempt {
            url: url.to_string(),
            token: token.to_string(),
            options: options.clone(),
        });
        if let Some(reason) = &state.fail_connect {
            return Err(TransportError::Handshake(reason.clone()));
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        state.events_tx = Some(tx);
        state.current += 1;
        let connection = MockConnection {
            id: state.current,
            state: Arc::clone(&self.state),
            participants: state.participants.clone(),
        };
        Ok(OpenedRoom {
            connection: Arc::new(connection),
            events: rx,
        })
    }
}

/// Connection produced by [`MockConnector`].
pub struct MockConnection {
    id: u64,
    state: Arc<Mutex<MockState>>,
    participants: Vec<Participant>,
}

#[async_trait]
impl RoomConnection for MockConnection {
    fn local_identity(&self) -> String {
        "mock".to_string()
    }

    fn remote_participants(&self) -> Vec<Participant> {
        self.participants.clone()
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let delay = self.state.lock().unwrap().publish_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = &state.fail_publish {
            return Err(TransportError::Publish(reason.clone()));
        }
        state.published.push(PublishedPacket {
            topic: topic.to_string(),
            payload,
        });
        Ok(())
    }

    async fn disconnect(&self) {
        let delay = {
            let mut state = self.state.lock().unwrap();
            if state.current == self.id {
                state.events_tx = None;
            }
            state.disconnect_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state.lock().unwrap().disconnects += 1;
    }
}

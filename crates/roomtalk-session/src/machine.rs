//! Session state machine.
//!
//! [`SessionMachine::apply`] takes one [`Input`] (a caller command or the
//! completion of something started earlier) and returns the [`Effect`]s the
//! runtime must carry out. It never awaits and owns no I/O handles, so every
//! transition can be driven directly in tests.
//!
//! Each accepted `connect()` and every `disconnect()` starts a new epoch.
//! Work started under an older epoch reports back with that epoch and is
//! ignored, which is how late replies, late handshakes and events from a
//! released connection are kept out of the log.

use std::time::Duration;

use roomtalk_backend::BackendError;
use roomtalk_transport::TransportError;
use roomtalk_types::{ChatEntry, Credentials, Origin, Participant, RoomEvent, CHAT_TOPIC};
use tracing::{debug, info, warn};

use crate::config::ChatConfig;
use crate::controller::SessionSnapshot;
use crate::error::SessionError;
use crate::log::MessageLog;
use crate::profile::SessionProfile;
use crate::state::SessionState;
use crate::typing::TypingIndicator;

/// Something that happened to the session.
#[derive(Debug)]
pub enum Input {
    /// Caller asked to join the room.
    Connect,
    /// Caller asked to leave the room.
    Disconnect,
    /// Caller asked to send a message.
    Send(String),
    CredentialsFetched {
        epoch: u64,
        result: Result<Credentials, BackendError>,
    },
    /// The handshake finished. On success carries the participants already
    /// present in the room.
    TransportOpened {
        epoch: u64,
        result: Result<Vec<Participant>, TransportError>,
    },
    /// An inbound event from the connection opened under `epoch`.
    Room { epoch: u64, event: RoomEvent },
    Published {
        outgoing: Outgoing,
        result: Result<(), TransportError>,
    },
    ReplyReceived {
        epoch: u64,
        result: Result<Option<String>, BackendError>,
    },
    TypingExpired { generation: u64 },
}

/// Work the runtime must carry out on behalf of the machine.
#[derive(Debug)]
pub enum Effect {
    /// Request credentials from the token service.
    FetchCredentials { epoch: u64 },
    /// Open a transport connection with these credentials.
    OpenTransport { epoch: u64, credentials: Credentials },
    /// Keep the connection that just opened and start delivering its events.
    AdoptConnection { epoch: u64 },
    /// Close the connection that just opened; nobody is waiting for it.
    DiscardConnection,
    /// Let go of the owned connection, closing it first if `close`.
    ReleaseConnection { close: bool },
    /// Publish chat text on the data channel.
    Publish(Outgoing),
    /// Ask the reply gateway to answer `text`.
    RequestReply { epoch: u64, text: String },
    /// (Re)start the typing countdown.
    ArmTimer { generation: u64, after: Duration },
    CancelTimer,
    /// Deliver an error to the caller.
    Report(SessionError),
}

/// A message accepted for publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub epoch: u64,
    pub text: String,
    /// Inbound chat messages logged when the send was accepted. If more
    /// arrive before the publish completes, someone already answered and the
    /// typing indicator stays down.
    pub inbound_seen: u64,
}

/// State, message log and typing indicator of one chat session.
#[derive(Debug)]
pub struct SessionMachine {
    profile: SessionProfile,
    agent_label: String,
    typing_timeout: Duration,
    state: SessionState,
    log: MessageLog,
    typing: TypingIndicator,
    epoch: u64,
    inbound: u64,
}

impl SessionMachine {
    pub fn new(profile: SessionProfile, config: &ChatConfig) -> Self {
        Self {
            profile,
            agent_label: config.agent_label.clone(),
            typing_timeout: config.typing_timeout(),
            state: SessionState::Idle,
            log: MessageLog::new(),
            typing: TypingIndicator::new(),
            epoch: 0,
            inbound: 0,
        }
    }

    pub fn profile(&self) -> &SessionProfile {
        &self.profile
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn is_typing(&self) -> bool {
        self.typing.is_active()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Observable view of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            messages: self.log.entries().to_vec(),
            is_typing: self.typing.is_active(),
        }
    }

    /// Apply one input and return the effects it requires.
    pub fn apply(&mut self, input: Input) -> Vec<Effect> {
        match input {
            Input::Connect => self.connect(),
            Input::Disconnect => self.disconnect(),
            Input::Send(text) => self.send(&text),
            Input::CredentialsFetched { epoch, result } => {
                self.credentials_fetched(epoch, result)
            }
            Input::TransportOpened { epoch, result } => self.transport_opened(epoch, result),
            Input::Room { epoch, event } => self.room_event(epoch, event),
            Input::Published { outgoing, result } => self.published(outgoing, result),
            Input::ReplyReceived { epoch, result } => self.reply_received(epoch, result),
            Input::TypingExpired { generation } => {
                if self.typing.expire(generation) {
                    debug!(generation, "typing indicator timed out");
                } else {
                    debug!(generation, "ignoring stale typing timeout");
                }
                Vec::new()
            }
        }
    }

    fn connect(&mut self) -> Vec<Effect> {
        if !self.state.can_connect() {
            debug!(state = %self.state, "connect ignored");
            return Vec::new();
        }
        self.epoch += 1;
        self.state = SessionState::Connecting;
        info!(
            identity = %self.profile.identity,
            room = %self.profile.room,
            "connecting"
        );
        vec![Effect::FetchCredentials { epoch: self.epoch }]
    }

    fn disconnect(&mut self) -> Vec<Effect> {
        info!(state = %self.state, "leaving room");
        self.epoch += 1;
        self.state = SessionState::Idle;
        self.log.clear();
        self.typing.disarm();
        vec![Effect::ReleaseConnection { close: true }, Effect::CancelTimer]
    }

    fn send(&mut self, text: &str) -> Vec<Effect> {
        let text = text.trim();
        if text.is_empty() {
            debug!("ignoring empty message");
            return Vec::new();
        }
        if !self.state.can_send() {
            debug!(state = %self.state, "cannot send while not connected");
            return Vec::new();
        }
        vec![Effect::Publish(Outgoing {
            epoch: self.epoch,
            text: text.to_string(),
            inbound_seen: self.inbound,
        })]
    }

    /// Whether a continuation issued under `epoch` still belongs to the
    /// current connection attempt.
    fn is_current_attempt(&self, epoch: u64, state: SessionState) -> bool {
        epoch == self.epoch && self.state == state
    }

    fn credentials_fetched(
        &mut self,
        epoch: u64,
        result: Result<Credentials, BackendError>,
    ) -> Vec<Effect> {
        if !self.is_current_attempt(epoch, SessionState::Connecting) {
            debug!(epoch, "discarding stale credentials");
            return Vec::new();
        }
        match result {
            Ok(credentials) => {
                debug!(url = %credentials.ws_url, "credentials acquired");
                vec![Effect::OpenTransport { epoch, credentials }]
            }
            Err(e) => {
                warn!(error = %e, "credential fetch failed");
                self.state = SessionState::Disconnected;
                vec![Effect::Report(SessionError::CredentialFetch(e))]
            }
        }
    }

    fn transport_opened(
        &mut self,
        epoch: u64,
        result: Result<Vec<Participant>, TransportError>,
    ) -> Vec<Effect> {
        if !self.is_current_attempt(epoch, SessionState::Connecting) {
            debug!(epoch, "discarding stale connection");
            return match result {
                Ok(_) => vec![Effect::DiscardConnection],
                Err(_) => Vec::new(),
            };
        }
        match result {
            Ok(present) => {
                self.state = SessionState::Connected;
                info!(room = %self.profile.room, present = present.len(), "connected");
                for participant in present {
                    self.log.append(ChatEntry::system(format!(
                        "{} is in the room",
                        participant.identity
                    )));
                }
                vec![Effect::AdoptConnection { epoch }]
            }
            Err(e) => {
                warn!(error = %e, "transport handshake failed");
                self.state = SessionState::Disconnected;
                vec![Effect::Report(SessionError::TransportHandshake(e))]
            }
        }
    }

    fn room_event(&mut self, epoch: u64, event: RoomEvent) -> Vec<Effect> {
        if !self.is_current_attempt(epoch, SessionState::Connected) {
            debug!(epoch, ?event, "ignoring event from inactive connection");
            return Vec::new();
        }
        match event {
            RoomEvent::DataReceived {
                payload,
                participant,
                topic,
            } => {
                if topic.as_deref() != Some(CHAT_TOPIC) {
                    debug!(?topic, "ignoring data on foreign topic");
                    return Vec::new();
                }
                let content = String::from_utf8_lossy(&payload).into_owned();
                if content.is_empty() {
                    debug!("ignoring empty chat payload");
                    return Vec::new();
                }
                let sender = participant
                    .filter(|p| !p.is_empty())
                    .unwrap_or_else(|| self.agent_label.clone());
                self.log.append(ChatEntry::new(sender, content, Origin::Remote));
                self.inbound += 1;
                self.typing.disarm();
                vec![Effect::CancelTimer]
            }
            RoomEvent::ParticipantConnected(participant) => {
                self.log.append(ChatEntry::system(format!(
                    "{} joined the room",
                    participant.identity
                )));
                Vec::new()
            }
            RoomEvent::Disconnected { reason } => {
                info!(%reason, "transport disconnected");
                self.state = SessionState::Disconnected;
                vec![Effect::ReleaseConnection { close: false }]
            }
        }
    }

    fn published(&mut self, outgoing: Outgoing, result: Result<(), TransportError>) -> Vec<Effect> {
        let Outgoing {
            epoch,
            text,
            inbound_seen,
        } = outgoing;
        if epoch != self.epoch {
            debug!(epoch, "discarding publish result from previous session");
            return Vec::new();
        }
        match result {
            Ok(()) => {
                self.log.append(ChatEntry::new(
                    self.profile.identity.clone(),
                    text.clone(),
                    Origin::Local,
                ));
                let mut effects = Vec::with_capacity(2);
                if inbound_seen == self.inbound {
                    let generation = self.typing.arm();
                    effects.push(Effect::ArmTimer {
                        generation,
                        after: self.typing_timeout,
                    });
                } else {
                    debug!("message arrived while publishing, typing indicator stays down");
                }
                effects.push(Effect::RequestReply { epoch, text });
                effects
            }
            Err(e) => {
                warn!(error = %e, "publish failed");
                vec![Effect::Report(SessionError::Publish(e))]
            }
        }
    }

    fn reply_received(
        &mut self,
        epoch: u64,
        result: Result<Option<String>, BackendError>,
    ) -> Vec<Effect> {
        if epoch != self.epoch {
            debug!(epoch, "discarding reply from previous session");
            return Vec::new();
        }
        match result {
            Ok(Some(reply)) if !reply.is_empty() => {
                self.log.append(ChatEntry::new(
                    self.agent_label.clone(),
                    reply,
                    Origin::Remote,
                ));
            }
            Ok(_) => warn!("agent returned no reply"),
            Err(e) => warn!(error = %e, "agent reply failed"),
        }
        self.typing.disarm();
        vec![Effect::CancelTimer]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> SessionMachine {
        SessionMachine::new(
            SessionProfile::new("alice", "default").unwrap(),
            &ChatConfig::default(),
        )
    }

    fn credentials() -> Credentials {
        Credentials {
            token: "t0k".to_string(),
            ws_url: "wss://x/rtc".to_string(),
        }
    }

    /// Drive a machine to `Connected` with the given participants present.
    fn connected(present: &[&str]) -> SessionMachine {
        let mut m = machine();
        m.apply(Input::Connect);
        let epoch = m.epoch();
        m.apply(Input::CredentialsFetched {
            epoch,
            result: Ok(credentials()),
        });
        m.apply(Input::TransportOpened {
            epoch,
            result: Ok(present.iter().map(|p| Participant::new(*p)).collect()),
        });
        assert_eq!(m.state(), SessionState::Connected);
        m
    }

    /// Send `text` and report the publish as successful.
    fn send_ok(m: &mut SessionMachine, text: &str) -> Vec<Effect> {
        let effects = m.apply(Input::Send(text.to_string()));
        let Some(Effect::Publish(outgoing)) = effects.into_iter().next() else {
            panic!("expected publish");
        };
        m.apply(Input::Published {
            outgoing,
            result: Ok(()),
        })
    }

    fn armed_generation(effects: &[Effect]) -> u64 {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::ArmTimer { generation, .. } => Some(*generation),
                _ => None,
            })
            .expect("timer armed")
    }

    fn contents(m: &SessionMachine) -> Vec<(&str, &str, Origin)> {
        m.log()
            .iter()
            .map(|e| (e.sender.as_str(), e.content.as_str(), e.origin))
            .collect()
    }

    #[test]
    fn connect_requests_credentials() {
        let mut m = machine();
        let effects = m.apply(Input::Connect);
        assert_eq!(m.state(), SessionState::Connecting);
        assert!(matches!(
            effects.as_slice(),
            [Effect::FetchCredentials { epoch: 1 }]
        ));
    }

    #[test]
    fn connect_is_noop_while_connecting_or_connected() {
        let mut m = machine();
        m.apply(Input::Connect);
        assert!(m.apply(Input::Connect).is_empty());
        assert_eq!(m.epoch(), 1);

        let mut m = connected(&[]);
        assert!(m.apply(Input::Connect).is_empty());
        assert_eq!(m.state(), SessionState::Connected);
    }

    #[test]
    fn credentials_open_transport() {
        let mut m = machine();
        m.apply(Input::Connect);
        let effects = m.apply(Input::CredentialsFetched {
            epoch: 1,
            result: Ok(credentials()),
        });
        match effects.as_slice() {
            [Effect::OpenTransport { epoch, credentials }] => {
                assert_eq!(*epoch, 1);
                assert_eq!(credentials.ws_url, "wss://x/rtc");
            }
            other => panic!("unexpected effects: {other:?}"),
        }
    }

    #[test]
    fn credential_failure_reports_and_disconnects() {
        let mut m = machine();
        m.apply(Input::Connect);
        let effects = m.apply(Input::CredentialsFetched {
            epoch: 1,
            result: Err(BackendError::Malformed("missing token".to_string())),
        });
        assert_eq!(m.state(), SessionState::Disconnected);
        assert!(matches!(
            effects.as_slice(),
            [Effect::Report(SessionError::CredentialFetch(_))]
        ));
    }

    #[test]
    fn handshake_failure_reports_and_disconnects() {
        let mut m = machine();
        m.apply(Input::Connect);
        m.apply(Input::CredentialsFetched {
            epoch: 1,
            result: Ok(credentials()),
        });
        let effects = m.apply(Input::TransportOpened {
            epoch: 1,
            result: Err(TransportError::Handshake("rejected".to_string())),
        });
        assert_eq!(m.state(), SessionState::Disconnected);
        assert!(matches!(
            effects.as_slice(),
            [Effect::Report(SessionError::TransportHandshake(_))]
        ));
    }

    #[test]
    fn can_retry_after_failed_connect() {
        let mut m = machine();
        m.apply(Input::Connect);
        m.apply(Input::CredentialsFetched {
            epoch: 1,
            result: Err(BackendError::Malformed("boom".to_string())),
        });
        let effects = m.apply(Input::Connect);
        assert!(matches!(
            effects.as_slice(),
            [Effect::FetchCredentials { epoch: 2 }]
        ));
    }

    #[test]
    fn present_participants_are_announced() {
        let m = connected(&["bob", "carol"]);
        assert_eq!(
            contents(&m),
            vec![
                ("System", "bob is in the room", Origin::System),
                ("System", "carol is in the room", Origin::System),
            ]
        );
    }

    #[test]
    fn connection_opened_after_disconnect_is_discarded() {
        let mut m = machine();
        m.apply(Input::Connect);
        m.apply(Input::CredentialsFetched {
            epoch: 1,
            result: Ok(credentials()),
        });
        m.apply(Input::Disconnect);

        let effects = m.apply(Input::TransportOpened {
            epoch: 1,
            result: Ok(vec![Participant::new("bob")]),
        });
        assert!(matches!(effects.as_slice(), [Effect::DiscardConnection]));
        assert_eq!(m.state(), SessionState::Idle);
        assert!(m.log().is_empty());
    }

    #[test]
    fn send_publishes_trimmed_text() {
        let mut m = connected(&[]);
        let effects = m.apply(Input::Send("  hello \n".to_string()));
        match effects.as_slice() {
            [Effect::Publish(outgoing)] => assert_eq!(outgoing.text, "hello"),
            other => panic!("unexpected effects: {other:?}"),
        }
        // Nothing is logged until the publish succeeds.
        assert!(m.log().is_empty());
        assert!(!m.is_typing());
    }

    #[test]
    fn blank_send_is_rejected_in_every_state() {
        let mut m = machine();
        assert!(m.apply(Input::Send(String::new())).is_empty());

        let mut m = connected(&[]);
        assert!(m.apply(Input::Send(String::new())).is_empty());
        assert!(m.apply(Input::Send("   ".to_string())).is_empty());
        assert!(m.log().is_empty());
        assert!(!m.is_typing());
    }

    #[test]
    fn send_rejected_unless_connected() {
        let mut m = machine();
        assert!(m.apply(Input::Send("hi".to_string())).is_empty());
        m.apply(Input::Connect);
        assert!(m.apply(Input::Send("hi".to_string())).is_empty());
    }

    #[test]
    fn successful_publish_logs_arms_and_requests_reply() {
        let mut m = connected(&[]);
        let effects = send_ok(&mut m, "hello");

        assert_eq!(
            contents(&m),
            vec![("alice", "hello", Origin::Local)]
        );
        assert!(m.is_typing());
        match effects.as_slice() {
            [Effect::ArmTimer { after, .. }, Effect::RequestReply { text, .. }] => {
                assert_eq!(*after, Duration::from_secs(10));
                assert_eq!(text, "hello");
            }
            other => panic!("unexpected effects: {other:?}"),
        }
    }

    #[test]
    fn failed_publish_reports_without_logging() {
        let mut m = connected(&[]);
        let epoch = m.epoch();
        let effects = m.apply(Input::Published {
            outgoing: Outgoing {
                epoch,
                text: "hello".to_string(),
                inbound_seen: 0,
            },
            result: Err(TransportError::Publish("channel closed".to_string())),
        });
        assert!(m.log().is_empty());
        assert!(!m.is_typing());
        assert!(matches!(
            effects.as_slice(),
            [Effect::Report(SessionError::Publish(_))]
        ));
    }

    #[test]
    fn inbound_chat_logs_and_clears_typing() {
        let mut m = connected(&[]);
        send_ok(&mut m, "hi");
        let epoch = m.epoch();

        let effects = m.apply(Input::Room {
            epoch,
            event: RoomEvent::chat(Some("bob"), "hey alice"),
        });
        assert!(!m.is_typing());
        assert!(matches!(effects.as_slice(), [Effect::CancelTimer]));
        assert_eq!(
            contents(&m)[1],
            ("bob", "hey alice", Origin::Remote)
        );
    }

    #[test]
    fn inbound_chat_without_sender_uses_agent_label() {
        let mut m = connected(&[]);
        let epoch = m.epoch();
        m.apply(Input::Room {
            epoch,
            event: RoomEvent::chat(None, "hello there"),
        });
        assert_eq!(m.log().entries()[0].sender, "Assistant");
    }

    #[test]
    fn data_on_other_topics_is_ignored() {
        let mut m = connected(&[]);
        send_ok(&mut m, "hi");
        let epoch = m.epoch();
        let effects = m.apply(Input::Room {
            epoch,
            event: RoomEvent::DataReceived {
                payload: b"{}".to_vec(),
                participant: Some("bob".to_string()),
                topic: Some("lk.transcription".to_string()),
            },
        });
        assert!(effects.is_empty());
        assert_eq!(m.log().len(), 1);
        assert!(m.is_typing());
    }

    #[test]
    fn participant_join_is_announced_without_touching_typing() {
        let mut m = connected(&[]);
        send_ok(&mut m, "hi");
        let epoch = m.epoch();
        m.apply(Input::Room {
            epoch,
            event: RoomEvent::ParticipantConnected(Participant::new("dave")),
        });
        assert!(m.is_typing());
        assert_eq!(
            contents(&m)[1],
            ("System", "dave joined the room", Origin::System)
        );
    }

    #[test]
    fn stale_typing_timeout_is_ignored_after_inbound_message() {
        let mut m = connected(&[]);
        let generation = armed_generation(&send_ok(&mut m, "hi"));
        let epoch = m.epoch();
        m.apply(Input::Room {
            epoch,
            event: RoomEvent::chat(Some("bob"), "hey"),
        });
        let before = m.log().len();

        m.apply(Input::TypingExpired { generation });
        assert!(!m.is_typing());
        assert_eq!(m.log().len(), before);
    }

    #[test]
    fn message_arriving_during_publish_keeps_typing_down() {
        let mut m = connected(&[]);
        let effects = m.apply(Input::Send("hi".to_string()));
        let Some(Effect::Publish(outgoing)) = effects.into_iter().next() else {
            panic!("expected publish");
        };
        let epoch = m.epoch();
        m.apply(Input::Room {
            epoch,
            event: RoomEvent::chat(Some("bob"), "hey"),
        });

        let effects = m.apply(Input::Published {
            outgoing,
            result: Ok(()),
        });
        assert!(!m.is_typing());
        assert!(matches!(effects.as_slice(), [Effect::RequestReply { .. }]));
        assert_eq!(
            contents(&m),
            vec![
                ("bob", "hey", Origin::Remote),
                ("alice", "hi", Origin::Local),
            ]
        );

        // The next send with nothing in between raises it again.
        send_ok(&mut m, "still there?");
        assert!(m.is_typing());
    }

    #[test]
    fn typing_timeout_lowers_indicator() {
        let mut m = connected(&[]);
        let generation = armed_generation(&send_ok(&mut m, "hi"));
        m.apply(Input::TypingExpired { generation });
        assert!(!m.is_typing());
    }

    #[test]
    fn second_send_replaces_countdown() {
        let mut m = connected(&[]);
        let first = armed_generation(&send_ok(&mut m, "one"));
        let second = armed_generation(&send_ok(&mut m, "two"));

        m.apply(Input::TypingExpired { generation: first });
        assert!(m.is_typing());
        m.apply(Input::TypingExpired { generation: second });
        assert!(!m.is_typing());
    }

    #[test]
    fn reply_is_logged_as_agent() {
        let mut m = connected(&[]);
        send_ok(&mut m, "hello");
        let epoch = m.epoch();
        let effects = m.apply(Input::ReplyReceived {
            epoch,
            result: Ok(Some("hi alice".to_string())),
        });
        assert!(matches!(effects.as_slice(), [Effect::CancelTimer]));
        assert!(!m.is_typing());
        assert_eq!(
            contents(&m)[1],
            ("Assistant", "hi alice", Origin::Remote)
        );
    }

    #[test]
    fn empty_or_failed_reply_only_clears_typing() {
        let mut m = connected(&[]);
        send_ok(&mut m, "hello");
        let epoch = m.epoch();
        m.apply(Input::ReplyReceived {
            epoch,
            result: Ok(Some(String::new())),
        });
        assert!(!m.is_typing());
        assert_eq!(m.log().len(), 1);

        send_ok(&mut m, "again");
        m.apply(Input::ReplyReceived {
            epoch,
            result: Err(BackendError::Malformed("oops".to_string())),
        });
        assert!(!m.is_typing());
        assert_eq!(m.log().len(), 2);
    }

    #[test]
    fn reply_after_disconnect_does_not_resurrect_log() {
        let mut m = connected(&[]);
        send_ok(&mut m, "hello");
        let epoch = m.epoch();
        m.apply(Input::Disconnect);

        let effects = m.apply(Input::ReplyReceived {
            epoch,
            result: Ok(Some("too late".to_string())),
        });
        assert!(effects.is_empty());
        assert!(m.log().is_empty());
        assert_eq!(m.state(), SessionState::Idle);
    }

    #[test]
    fn passive_disconnect_keeps_history() {
        let mut m = connected(&["bob"]);
        send_ok(&mut m, "hello");
        let epoch = m.epoch();
        let effects = m.apply(Input::Room {
            epoch,
            event: RoomEvent::Disconnected {
                reason: "network".to_string(),
            },
        });
        assert_eq!(m.state(), SessionState::Disconnected);
        assert!(matches!(
            effects.as_slice(),
            [Effect::ReleaseConnection { close: false }]
        ));
        assert_eq!(m.log().len(), 2);
        assert!(m.apply(Input::Send("still there?".to_string())).is_empty());

        // Events still queued from the dropped connection are ignored.
        m.apply(Input::Room {
            epoch,
            event: RoomEvent::chat(Some("bob"), "late"),
        });
        assert_eq!(m.log().len(), 2);
    }

    #[test]
    fn explicit_disconnect_clears_everything() {
        let mut m = connected(&["bob"]);
        send_ok(&mut m, "hello");
        let effects = m.apply(Input::Disconnect);

        assert_eq!(m.state(), SessionState::Idle);
        assert!(m.log().is_empty());
        assert!(!m.is_typing());
        assert!(matches!(
            effects.as_slice(),
            [Effect::ReleaseConnection { close: true }, Effect::CancelTimer]
        ));
    }

    #[test]
    fn disconnect_from_idle_is_harmless() {
        let mut m = machine();
        m.apply(Input::Disconnect);
        assert_eq!(m.state(), SessionState::Idle);
        assert!(!m.apply(Input::Connect).is_empty());
    }

    #[test]
    fn snapshot_mirrors_state() {
        let mut m = connected(&["bob"]);
        send_ok(&mut m, "hello");
        let snapshot = m.snapshot();
        assert_eq!(snapshot.state, SessionState::Connected);
        assert_eq!(snapshot.messages.len(), 2);
        assert!(snapshot.is_typing);
    }
}

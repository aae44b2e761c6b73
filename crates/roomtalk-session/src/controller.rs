//! Session runtime.
//!
//! [`SessionController`] owns a [`SessionMachine`] and runs it on a single
//! event loop. Caller commands arrive through [`SessionHandle`]; slow work
//! (credential fetch, handshake, publish, agent reply, typing countdown) runs
//! in spawned tasks whose results re-enter the loop as machine inputs. The
//! loop never waits on any of them.

use std::sync::Arc;

use roomtalk_backend::{BackendError, ReplyGateway, TokenService};
use roomtalk_transport::{OpenedRoom, RoomConnection, RoomConnector, TransportError};
use roomtalk_types::{ChatEntry, ConnectOptions, Credentials, RoomEvent, CHAT_TOPIC};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ChatConfig;
use crate::error::SessionError;
use crate::machine::{Effect, Input, Outgoing, SessionMachine};
use crate::profile::SessionProfile;
use crate::state::SessionState;

/// Caller commands processed by the session loop.
#[derive(Debug)]
pub enum SessionCommand {
    Connect,
    Disconnect,
    Send(String),
    /// Leave the room and stop the loop.
    Shutdown,
}

/// Results of spawned work, fed back into the loop.
enum Completion {
    Fetched {
        epoch: u64,
        result: Result<Credentials, BackendError>,
    },
    Opened {
        epoch: u64,
        result: Result<OpenedRoom, TransportError>,
    },
    Room {
        epoch: u64,
        event: RoomEvent,
    },
    Published {
        outgoing: Outgoing,
        result: Result<(), TransportError>,
    },
    Reply {
        epoch: u64,
        result: Result<Option<String>, BackendError>,
    },
    TypingExpired {
        generation: u64,
    },
}

/// Observable state of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub messages: Vec<ChatEntry>,
    pub is_typing: bool,
}

/// External services a session talks to.
#[derive(Clone)]
pub struct SessionServices {
    pub tokens: Arc<dyn TokenService>,
    pub connector: Arc<dyn RoomConnector>,
    pub replies: Arc<dyn ReplyGateway>,
}

/// The connection the session currently owns.
struct Link {
    connection: Arc<dyn RoomConnection>,
    /// Outbound queue drained in order by the link's publisher task.
    outbox: mpsc::UnboundedSender<Outgoing>,
}

/// Runs a chat session's event loop.
pub struct SessionController {
    machine: SessionMachine,
    services: SessionServices,
    options: ConnectOptions,
    link: Option<Link>,
    timer: Option<JoinHandle<()>>,
    /// Connections still closing in the background.
    closing: Vec<JoinHandle<()>>,
    command_tx: mpsc::Sender<SessionCommand>,
    command_rx: mpsc::Receiver<SessionCommand>,
    completion_tx: mpsc::Sender<Completion>,
    completion_rx: mpsc::Receiver<Completion>,
    status_tx: watch::Sender<SessionSnapshot>,
    error_tx: mpsc::Sender<SessionError>,
    error_rx: Option<mpsc::Receiver<SessionError>>,
}

impl SessionController {
    /// Create a session for `profile`. Nothing happens until `run()` is
    /// driven and a `connect()` arrives.
    pub fn new(profile: SessionProfile, config: &ChatConfig, services: SessionServices) -> Self {
        let machine = SessionMachine::new(profile, config);
        let (command_tx, command_rx) = mpsc::channel(256);
        let (completion_tx, completion_rx) = mpsc::channel(1024);
        let (status_tx, _) = watch::channel(machine.snapshot());
        let (error_tx, error_rx) = mpsc::channel(64);

        Self {
            machine,
            services,
            options: ConnectOptions::default(),
            link: None,
            timer: None,
            closing: Vec::new(),
            command_tx,
            command_rx,
            completion_tx,
            completion_rx,
            status_tx,
            error_tx,
            error_rx: Some(error_rx),
        }
    }

    /// Get a handle for driving the session and observing its state.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            commands: self.command_tx.clone(),
            status: self.status_tx.subscribe(),
        }
    }

    /// Take the receiver for connect and send errors.
    /// Returns `None` if already taken.
    pub fn take_error_receiver(&mut self) -> Option<mpsc::Receiver<SessionError>> {
        self.error_rx.take()
    }

    /// Run the session loop until a shutdown command arrives.
    pub async fn run(mut self) {
        info!(
            identity = %self.machine.profile().identity,
            room = %self.machine.profile().room,
            "session loop started"
        );
        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    match command {
                        Some(SessionCommand::Connect) => self.step(Input::Connect, None),
                        Some(SessionCommand::Disconnect) => {
                            self.step(Input::Disconnect, None);
                        }
                        Some(SessionCommand::Send(text)) => {
                            self.step(Input::Send(text), None);
                        }
                        Some(SessionCommand::Shutdown) | None => break,
                    }
                }
                Some(completion) = self.completion_rx.recv() => {
                    self.handle_completion(completion);
                }
            }
        }
        self.step(Input::Disconnect, None);
        for close in self.closing.drain(..) {
            let _ = close.await;
        }
        info!("session loop stopped");
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Fetched { epoch, result } => {
                self.step(Input::CredentialsFetched { epoch, result }, None);
            }
            Completion::Opened { epoch, result } => match result {
                Ok(opened) => {
                    let present = opened.connection.remote_participants();
                    let input = Input::TransportOpened {
                        epoch,
                        result: Ok(present),
                    };
                    self.step(input, Some(opened));
                }
                Err(e) => {
                    self.step(
                        Input::TransportOpened {
                            epoch,
                            result: Err(e),
                        },
                        None,
                    );
                }
            },
            Completion::Room { epoch, event } => {
                self.step(Input::Room { epoch, event }, None);
            }
            Completion::Published { outgoing, result } => {
                self.step(Input::Published { outgoing, result }, None);
            }
            Completion::Reply { epoch, result } => {
                self.step(Input::ReplyReceived { epoch, result }, None);
            }
            Completion::TypingExpired { generation } => {
                self.step(Input::TypingExpired { generation }, None);
            }
        }
    }

    /// Apply one input, carry out its effects, and publish the new snapshot.
    ///
    /// `opened` is the connection that just finished its handshake, if the
    /// input reports one.
    fn step(&mut self, input: Input, mut opened: Option<OpenedRoom>) {
        let effects = self.machine.apply(input);
        for effect in effects {
            self.execute(effect, &mut opened);
        }
        if let Some(stray) = opened {
            self.close(stray.connection);
        }

        let next = self.machine.snapshot();
        self.status_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn execute(&mut self, effect: Effect, opened: &mut Option<OpenedRoom>) {
        match effect {
            Effect::FetchCredentials { epoch } => {
                let tokens = Arc::clone(&self.services.tokens);
                let profile = self.machine.profile().clone();
                let tx = self.completion_tx.clone();
                tokio::spawn(async move {
                    let result = tokens
                        .fetch_credentials(&profile.identity, &profile.room)
                        .await;
                    let _ = tx.send(Completion::Fetched { epoch, result }).await;
                });
            }
            Effect::OpenTransport { epoch, credentials } => {
                let connector = Arc::clone(&self.services.connector);
                let options = self.options.clone();
                let tx = self.completion_tx.clone();
                tokio::spawn(async move {
                    debug!(url = %credentials.ws_url, "opening transport");
                    let result = connector
                        .connect(&credentials.ws_url, &credentials.token, &options)
                        .await;
                    let _ = tx.send(Completion::Opened { epoch, result }).await;
                });
            }
            Effect::AdoptConnection { epoch } => {
                if let Some(room) = opened.take() {
                    self.adopt(epoch, room);
                }
            }
            Effect::DiscardConnection => {
                if let Some(room) = opened.take() {
                    debug!("closing connection nobody is waiting for");
                    self.close(room.connection);
                }
            }
            Effect::ReleaseConnection { close } => {
                if let Some(link) = self.link.take() {
                    if close {
                        self.close(link.connection);
                    }
                    debug!(close, "released connection");
                }
            }
            Effect::Publish(outgoing) => {
                let queued = match &self.link {
                    Some(link) => link.outbox.send(outgoing).map_err(|e| e.0),
                    None => Err(outgoing),
                };
                if let Err(outgoing) = queued {
                    let tx = self.completion_tx.clone();
                    tokio::spawn(async move {
                        let result = Err(TransportError::Closed);
                        let _ = tx.send(Completion::Published { outgoing, result }).await;
                    });
                }
            }
            Effect::RequestReply { epoch, text } => {
                let replies = Arc::clone(&self.services.replies);
                let user_id = self.machine.profile().identity.clone();
                let tx = self.completion_tx.clone();
                tokio::spawn(async move {
                    let result = replies.reply(&user_id, &text).await;
                    let _ = tx.send(Completion::Reply { epoch, result }).await;
                });
            }
            Effect::ArmTimer { generation, after } => {
                self.cancel_timer();
                let tx = self.completion_tx.clone();
                self.timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(Completion::TypingExpired { generation }).await;
                }));
            }
            Effect::CancelTimer => self.cancel_timer(),
            Effect::Report(error) => {
                if let Err(e) = self.error_tx.try_send(error) {
                    warn!(error = %e, "dropping error report");
                }
            }
        }
    }

    /// Take ownership of a freshly opened connection: forward its events
    /// into the loop and start its publisher.
    fn adopt(&mut self, epoch: u64, room: OpenedRoom) {
        let OpenedRoom {
            connection,
            mut events,
        } = room;

        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if tx.send(Completion::Room { epoch, event }).await.is_err() {
                    return;
                }
            }
            let event = RoomEvent::Disconnected {
                reason: "event stream ended".to_string(),
            };
            let _ = tx.send(Completion::Room { epoch, event }).await;
        });

        let (outbox, mut queue) = mpsc::unbounded_channel::<Outgoing>();
        let publisher = Arc::clone(&connection);
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            while let Some(outgoing) = queue.recv().await {
                let result = publisher
                    .publish(CHAT_TOPIC, outgoing.text.as_bytes().to_vec())
                    .await;
                if tx
                    .send(Completion::Published { outgoing, result })
                    .await
                    .is_err()
                {
                    return;
                }
            }
        });

        info!(identity = %connection.local_identity(), "connection adopted");
        self.link = Some(Link { connection, outbox });
    }

    /// Close `connection` in the background so a slow transport never
    /// stalls the loop.
    fn close(&mut self, connection: Arc<dyn RoomConnection>) {
        self.closing.retain(|close| !close.is_finished());
        self.closing.push(tokio::spawn(async move {
            connection.disconnect().await;
        }));
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Clonable handle for driving a session and observing its state.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    status: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Join the room. No-op while connecting or connected.
    pub async fn connect(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::Connect).await
    }

    /// Leave the room, clearing the message log.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::Disconnect).await
    }

    /// Send a chat message. Blank text and sends while not connected are
    /// ignored.
    pub async fn send_message(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.command(SessionCommand::Send(text.into())).await
    }

    /// Leave the room and stop the session loop.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::Shutdown).await
    }

    async fn command(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Current state of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.status.borrow().clone()
    }

    /// Get a receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.status.clone()
    }

    /// Wait until the session state satisfies `pred`.
    pub async fn wait_until(
        &self,
        pred: impl Fn(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot, SessionError> {
        let mut rx = self.status.clone();
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if pred(&*snapshot) {
                    return Ok((*snapshot).clone());
                }
            }
            rx.changed().await.map_err(|_| SessionError::Closed)?;
        }
    }
}

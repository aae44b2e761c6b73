//! Mock backend services for testing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use roomtalk_types::Credentials;

use crate::error::BackendError;
use crate::{ReplyGateway, TokenService};

// ---------------------------------------------------------------------------
// MockTokenService
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct TokenState {
    calls: Vec<(String, String)>,
    failure: Option<String>,
    delay: Option<Duration>,
    ws_url: String,
}

/// Mock token service that mints `token-<identity>-<room>` credentials.
#[derive(Clone)]
pub struct MockTokenService {
    state: Arc<Mutex<TokenState>>,
}

impl MockTokenService {
    pub fn new(ws_url: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(TokenState {
                calls: Vec::new(),
                failure: None,
                delay: None,
                ws_url: ws_url.to_string(),
            })),
        }
    }

    /// Fail subsequent requests with a 500 status.
    pub fn fail_with(&self, body: &str) {
        self.state.lock().unwrap().failure = Some(body.to_string());
    }

    /// Hold each response for `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    /// Recorded `(identity, room)` pairs.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl TokenService for MockTokenService {
    async fn fetch_credentials(
        &self,
        identity: &str,
        room: &str,
    ) -> Result<Credentials, BackendError> {
        let (delay, outcome) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push((identity.to_string(), room.to_string()));
            let outcome = match &state.failure {
                Some(body) => Err(body.clone()),
                None => Ok(Credentials {
                    token: format!("token-{identity}-{room}"),
                    ws_url: state.ws_url.clone(),
                }),
            };
            (state.delay, outcome)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        outcome.map_err(|body| BackendError::Status { status: 500, body })
    }
}

// ---------------------------------------------------------------------------
// MockReplyGateway
// ---------------------------------------------------------------------------

/// How [`MockReplyGateway`] answers.
#[derive(Debug, Clone)]
pub enum ReplyScript {
    /// Reply with this text.
    Text(String),
    /// Answer with an empty reply.
    Empty,
    /// Fail with a 500 status carrying this body.
    Fail(String),
    /// Never answer.
    Hang,
}

#[derive(Debug)]
struct ReplyState {
    calls: Vec<(String, String)>,
    script: ReplyScript,
    delay: Option<Duration>,
}

/// Mock reply gateway.
#[derive(Clone)]
pub struct MockReplyGateway {
    state: Arc<Mutex<ReplyState>>,
}

impl MockReplyGateway {
    pub fn new(script: ReplyScript) -> Self {
        Self {
            state: Arc::new(Mutex::new(ReplyState {
                calls: Vec::new(),
                script,
                delay: None,
            })),
        }
    }

    /// Reply with `text` to every request.
    pub fn replying(text: &str) -> Self {
        Self::new(ReplyScript::Text(text.to_string()))
    }

    pub fn set_script(&self, script: ReplyScript) {
        self.state.lock().unwrap().script = script;
    }

    /// Hold each response for `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    /// Recorded `(user_id, text)` pairs.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl ReplyGateway for MockReplyGateway {
    async fn reply(&self, user_id: &str, text: &str) -> Result<Option<String>, BackendError> {
        let (delay, script) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push((user_id.to_string(), text.to_string()));
            (state.delay, state.script.clone())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match script {
            ReplyScript::Text(reply) => Ok(Some(reply)),
            ReplyScript::Empty => Ok(None),
            ReplyScript::Fail(body) => Err(BackendError::Status { status: 500, body }),
            ReplyScript::Hang => std::future::pending().await,
        }
    }
}

//! HTTP client for the roomtalk backend.

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use roomtalk_types::Credentials;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::BackendError;
use crate::{ReplyGateway, TokenService};

/// Backend address used when none is configured.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3001";

/// Body of `POST /agent/reply`.
#[derive(Debug, Serialize)]
struct ReplyRequest<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ReplyResponse {
    #[serde(default)]
    reply: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Agent backend capabilities reported by `GET /agent/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AgentStatus {
    #[serde(rename = "geminiConfigured", default)]
    pub llm_configured: bool,
    #[serde(rename = "mem0Configured", default)]
    pub memory_configured: bool,
}

/// Client for the token, agent and health endpoints.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base: Url,
    http: Client,
}

impl BackendClient {
    /// Create a client for the backend at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| BackendError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            base,
            http: Client::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        let joined = format!("{}/{path}", self.base.as_str().trim_end_matches('/'));
        Url::parse(&joined).map_err(|e| BackendError::InvalidUrl(format!("{joined}: {e}")))
    }

    /// Returns `true` when the backend answers `GET /health` with `ok`.
    pub async fn health(&self) -> Result<bool, BackendError> {
        let response = self.http.get(self.endpoint("health")?).send().await?;
        let health: HealthResponse = decode(response).await?;
        Ok(health.status == "ok")
    }

    /// Query `GET /agent/status`.
    pub async fn agent_status(&self) -> Result<AgentStatus, BackendError> {
        let response = self.http.get(self.endpoint("agent/status")?).send().await?;
        decode(response).await
    }
}

/// Check the status code and decode a JSON body.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(BackendError::Status {
            status: status.as_u16(),
            body,
        });
    }
    trace!(len = body.len(), "decoding backend response");
    serde_json::from_str(&body).map_err(|e| BackendError::Malformed(e.to_string()))
}

#[async_trait]
impl TokenService for BackendClient {
    async fn fetch_credentials(
        &self,
        identity: &str,
        room: &str,
    ) -> Result<Credentials, BackendError> {
        debug!(identity, room, "requesting room token");
        let response = self
            .http
            .get(self.endpoint("token")?)
            .query(&[("identity", identity), ("room", room)])
            .send()
            .await?;
        let credentials: Credentials = decode(response).await?;
        if credentials.token.is_empty() || credentials.ws_url.is_empty() {
            return Err(BackendError::Malformed(
                "token and wsUrl must be non-empty".to_string(),
            ));
        }
        Ok(credentials)
    }
}

#[async_trait]
impl ReplyGateway for BackendClient {
    async fn reply(&self, user_id: &str, text: &str) -> Result<Option<String>, BackendError> {
        let response = self
            .http
            .post(self.endpoint("agent/reply")?)
            .json(&ReplyRequest { user_id, text })
            .send()
            .await?;
        let body: ReplyResponse = decode(response).await?;
        Ok(body.reply.filter(|r| !r.is_empty()))
    }
}

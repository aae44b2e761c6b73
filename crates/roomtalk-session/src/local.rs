//! Token service for in-process rooms.

use async_trait::async_trait;
use roomtalk_backend::{BackendError, TokenService};
use roomtalk_transport::local::LOCAL_URL;
use roomtalk_transport::LocalHub;
use roomtalk_types::Credentials;

/// Mints [`LocalHub`] tokens without a backend round trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTokenService;

#[async_trait]
impl TokenService for LocalTokenService {
    async fn fetch_credentials(
        &self,
        identity: &str,
        room: &str,
    ) -> Result<Credentials, BackendError> {
        Ok(Credentials {
            token: LocalHub::mint_token(identity, room),
            ws_url: LOCAL_URL.to_string(),
        })
    }
}

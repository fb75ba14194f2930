use std::sync::Arc;

use fleetdesk_core::{Timestamp, User};

use super::types::{AuthSession, LoginRequest, RegisterRequest};
use crate::{
    ApiError, ApiResult,
    http::{ApiClient, ApiRequest, unwrap_envelope},
    refresh::{RefreshCoordinator, RefreshOutcome},
    token_store::TokenStore,
    vault::{CredentialPair, SessionStatus, TokenVault},
};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const ME_PATH: &str = "/auth/me";

pub trait Clock {
    fn now(&self) -> Timestamp;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Login, registration and logout against the auth endpoints.
///
/// Issued credentials go straight into the shared [`TokenVault`]; every
/// other request picks them up through the bearer stage.
pub struct AuthService<S, T = SystemClock>
where
    S: TokenStore,
    T: Clock,
{
    client: ApiClient,
    coordinator: Arc<RefreshCoordinator<S, T>>,
}

impl<S, T> AuthService<S, T>
where
    S: TokenStore,
    T: Clock,
{
    pub fn new(client: ApiClient, coordinator: Arc<RefreshCoordinator<S, T>>) -> Self {
        Self {
            client,
            coordinator,
        }
    }

    pub fn vault(&self) -> &Arc<TokenVault<S, T>> {
        self.coordinator.vault()
    }

    pub fn is_authenticated(&self) -> bool {
        self.vault().is_authenticated()
    }

    pub fn status(&self) -> SessionStatus {
        self.vault().status()
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        let body = LoginRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        let request = ApiRequest::post(LOGIN_PATH).with_json(&body)?;
        self.start_session(request).await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> ApiResult<User> {
        let body = RegisterRequest {
            name: name.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
        };
        let request = ApiRequest::post(REGISTER_PATH).with_json(&body)?;
        self.start_session(request).await
    }

    /// Local credentials are always dropped; the server call is best effort.
    pub async fn logout(&self) {
        let mut request = ApiRequest::post(LOGOUT_PATH);
        if let Some(token) = self.vault().access_token() {
            if let Err(err) = request.set_bearer(&token) {
                log::warn!("logout without credentials: {}", err.display_chain());
            }
        }

        self.vault().clear();
        if let Err(err) = self.client.send(request).await {
            log::warn!("server-side logout failed: {}", err.display_chain());
        }
        log::info!("logged out");
    }

    pub async fn current_user(&self) -> ApiResult<User> {
        self.client.get_json(ME_PATH).await
    }

    /// Exchanges the refresh token now instead of waiting for a 401.
    pub async fn refresh_session(&self) -> ApiResult<()> {
        match self.coordinator.force_refresh().await {
            RefreshOutcome::Refreshed { .. } => Ok(()),
            RefreshOutcome::Failed { reason } => Err(ApiError::RefreshFailed { reason }),
        }
    }

    async fn start_session(&self, request: ApiRequest) -> ApiResult<User> {
        let response = self.client.send(request).await?;
        let session: AuthSession = unwrap_envelope(&response)?;
        self.vault().establish(CredentialPair {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
        })?;
        log::info!("signed in as {}", session.user.email);
        Ok(session.user)
    }
}

//! Session refresh protocol.
//!
//! [`RefreshCoordinator`] is a two-state machine (`Idle`, `Refreshing`).
//! The first caller to see a rejected access token becomes the leader and
//! performs the exchange; callers arriving while it runs join a wait list
//! and receive the leader's outcome. A refresh token is therefore never
//! exchanged twice concurrently.
//!
//! [`RefreshOnUnauthorized`] is the middleware stage that drives the
//! coordinator on a 401 and replays the original request at most once.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use fleetdesk_core::Timestamp;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::oneshot;

use crate::{
    ApiResult,
    auth::{Clock, SystemClock},
    http::{ApiRequest, ApiResponse, HttpTransport, Middleware, Next, unwrap_envelope},
    token_store::TokenStore,
    vault::TokenVault,
};

pub const REFRESH_PATH: &str = "/auth/refresh";

const EXEMPT_PATHS: [&str; 4] = [
    "/auth/login",
    "/auth/register",
    "/auth/logout",
    REFRESH_PATH,
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed { access_token: String },
    Failed { reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshPhase {
    Idle,
    Refreshing,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefreshMetrics {
    pub exchanges: u64,
    pub coalesced_waiters: u64,
    pub failures: u64,
    pub last_success_at: Option<Timestamp>,
}

enum RefreshState {
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

enum Role {
    Leader,
    Waiter(oneshot::Receiver<RefreshOutcome>),
    Settled(RefreshOutcome),
}

#[derive(Deserialize)]
struct RefreshResponse {
    #[serde(alias = "accessToken")]
    access_token: String,
    #[serde(default, alias = "refreshToken")]
    refresh_token: Option<String>,
}

pub struct RefreshCoordinator<S, T = SystemClock>
where
    S: TokenStore,
    T: Clock,
{
    vault: Arc<TokenVault<S, T>>,
    transport: Arc<dyn HttpTransport>,
    state: Mutex<RefreshState>,
    metrics: Mutex<RefreshMetrics>,
}

impl<S, T> RefreshCoordinator<S, T>
where
    S: TokenStore,
    T: Clock,
{
    pub fn new(vault: Arc<TokenVault<S, T>>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            vault,
            transport,
            state: Mutex::new(RefreshState::Idle),
            metrics: Mutex::new(RefreshMetrics::default()),
        }
    }

    pub fn vault(&self) -> &Arc<TokenVault<S, T>> {
        &self.vault
    }

    pub fn phase(&self) -> RefreshPhase {
        match *lock(&self.state) {
            RefreshState::Idle => RefreshPhase::Idle,
            RefreshState::Refreshing { .. } => RefreshPhase::Refreshing,
        }
    }

    pub fn metrics(&self) -> RefreshMetrics {
        lock(&self.metrics).clone()
    }

    /// Called after the server rejected `rejected_access`.
    ///
    /// When the vault already holds a different access token (a refresh
    /// landed after the request left), that token is returned without a new
    /// exchange.
    pub async fn refresh_after_rejection(&self, rejected_access: Option<&str>) -> RefreshOutcome {
        self.run(Some(rejected_access)).await
    }

    /// Exchanges the refresh token unconditionally (still single-flight).
    pub async fn force_refresh(&self) -> RefreshOutcome {
        self.run(None).await
    }

    async fn run(&self, rejected_access: Option<Option<&str>>) -> RefreshOutcome {
        let role = self.claim_role(rejected_access);

        match role {
            Role::Settled(outcome) => outcome,
            Role::Waiter(rx) => {
                lock(&self.metrics).coalesced_waiters += 1;
                log::debug!("refresh already in flight; waiting for its outcome");
                rx.await.unwrap_or_else(|_| RefreshOutcome::Failed {
                    reason: "in-flight refresh was abandoned".to_string(),
                })
            }
            Role::Leader => {
                let guard = LeaderGuard {
                    state: &self.state,
                    settled: false,
                };
                let outcome = self.exchange().await;
                guard.settle(&outcome);
                outcome
            }
        }
    }

    fn claim_role(&self, rejected_access: Option<Option<&str>>) -> Role {
        let mut state = lock(&self.state);
        match &mut *state {
            RefreshState::Refreshing { waiters } => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                Role::Waiter(rx)
            }
            RefreshState::Idle => {
                if let Some(rejected) = rejected_access {
                    if let Some(current) = self.vault.access_token() {
                        if Some(current.as_str()) != rejected {
                            log::debug!("access token already replaced; skipping refresh");
                            return Role::Settled(RefreshOutcome::Refreshed {
                                access_token: current,
                            });
                        }
                    }
                }
                *state = RefreshState::Refreshing {
                    waiters: Vec::new(),
                };
                Role::Leader
            }
        }
    }

    async fn exchange(&self) -> RefreshOutcome {
        lock(&self.metrics).exchanges += 1;

        let Some(refresh_token) = self.vault.refresh_token() else {
            lock(&self.metrics).failures += 1;
            log::warn!("session refresh failed: no refresh token available");
            self.vault.clear();
            return RefreshOutcome::Failed {
                reason: "no refresh token available".to_string(),
            };
        };

        match self.exchange_token(&refresh_token).await {
            Ok(access_token) => {
                lock(&self.metrics).last_success_at = Some(self.vault.now());
                log::info!("session refreshed");
                RefreshOutcome::Refreshed { access_token }
            }
            Err(reason) => self.fail(&refresh_token, reason),
        }
    }

    async fn exchange_token(&self, refresh_token: &str) -> Result<String, String> {
        log::debug!("exchanging refresh token at {REFRESH_PATH}");
        let mut request = ApiRequest::post(REFRESH_PATH);
        request
            .set_bearer(refresh_token)
            .map_err(|err| err.to_string())?;

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|err| err.display_chain().to_string())?;

        if !response.status().is_success() {
            let message = response
                .error_message()
                .unwrap_or_else(|| "refresh token rejected".to_string());
            return Err(format!(
                "refresh endpoint answered {}: {message}",
                response.status().as_u16()
            ));
        }

        let tokens: RefreshResponse = unwrap_envelope(&response)
            .map_err(|err| format!("malformed refresh response: {}", err.display_chain()))?;

        self.vault
            .rotate(
                refresh_token,
                tokens.access_token.clone(),
                tokens.refresh_token,
            )
            .map_err(|err| err.display_chain().to_string())?;
        Ok(tokens.access_token)
    }

    /// Clears the session the failed exchange belonged to. A session that
    /// was replaced mid-exchange by a login is kept.
    fn fail(&self, exchanged_refresh: &str, reason: String) -> RefreshOutcome {
        lock(&self.metrics).failures += 1;
        if self.vault.revoke(exchanged_refresh) {
            log::warn!("session refresh failed, clearing credentials: {reason}");
        } else {
            log::warn!("session refresh failed, keeping newer session: {reason}");
        }
        RefreshOutcome::Failed { reason }
    }
}

/// Returns the machine to `Idle` and releases waiters, even when the
/// leader's future is dropped mid-exchange.
struct LeaderGuard<'a> {
    state: &'a Mutex<RefreshState>,
    settled: bool,
}

impl LeaderGuard<'_> {
    fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        let waiters = self.release();
        if !waiters.is_empty() {
            log::debug!("releasing {} refresh waiters", waiters.len());
        }
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    fn release(&self) -> Vec<oneshot::Sender<RefreshOutcome>> {
        let mut state = lock(self.state);
        match std::mem::replace(&mut *state, RefreshState::Idle) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => Vec::new(),
        }
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        for waiter in self.release() {
            let _ = waiter.send(RefreshOutcome::Failed {
                reason: "in-flight refresh was abandoned".to_string(),
            });
        }
    }
}

/// Middleware stage: on a 401, refresh once and replay the request.
pub struct RefreshOnUnauthorized<S, T = SystemClock>
where
    S: TokenStore,
    T: Clock,
{
    coordinator: Arc<RefreshCoordinator<S, T>>,
}

impl<S, T> RefreshOnUnauthorized<S, T>
where
    S: TokenStore,
    T: Clock,
{
    pub fn new(coordinator: Arc<RefreshCoordinator<S, T>>) -> Self {
        Self { coordinator }
    }

    fn is_exempt(&self, request: &ApiRequest) -> bool {
        let route = request.route();
        EXEMPT_PATHS.iter().any(|path| *path == route)
    }
}

#[async_trait]
impl<S, T> Middleware for RefreshOnUnauthorized<S, T>
where
    S: TokenStore + Send + Sync + 'static,
    T: Clock + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "refresh-on-unauthorized"
    }

    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> ApiResult<ApiResponse> {
        if self.is_exempt(&request) {
            return next.run(request).await;
        }

        let mut replay = request.clone();
        let response = next.run(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED || replay.is_retry() {
            return Ok(response);
        }

        let outcome = self
            .coordinator
            .refresh_after_rejection(response.credential_used())
            .await;
        match outcome {
            RefreshOutcome::Refreshed { .. } => {
                replay.mark_retried();
                log::debug!(
                    "replaying {} {} with refreshed credentials",
                    replay.method(),
                    replay.route()
                );
                next.run(replay).await
            }
            RefreshOutcome::Failed { reason } => {
                log::warn!(
                    "{} {} rejected and session could not be refreshed: {reason}",
                    replay.method(),
                    replay.route()
                );
                Ok(response)
            }
        }
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

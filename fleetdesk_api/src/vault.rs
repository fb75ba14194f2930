//! Process-wide view of the persisted credentials.
//!
//! Every read goes back to the [`TokenStore`] so callers always see the
//! latest tokens, even when a refresh lands between two requests. Read
//! failures degrade to "absent"; write failures are returned.

use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use fleetdesk_core::Timestamp;
use tokio::sync::watch;

use crate::{
    ApiError, ApiResult,
    auth::{Clock, SystemClock},
    config::ApiConfig,
    token_store::{StoredCredentials, TokenStore},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl From<&ApiConfig> for TokenLifetimes {
    fn from(config: &ApiConfig) -> Self {
        Self {
            access: config.access_token_ttl,
            refresh: config.refresh_token_ttl,
        }
    }
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self::from(&ApiConfig::default())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Authenticated,
    LoginRequired,
}

pub struct TokenVault<S, T = SystemClock>
where
    S: TokenStore,
    T: Clock,
{
    store: S,
    clock: T,
    lifetimes: TokenLifetimes,
    status_tx: watch::Sender<SessionStatus>,
    write_lock: Mutex<()>,
}

impl<S> TokenVault<S, SystemClock>
where
    S: TokenStore,
{
    pub fn new(store: S, lifetimes: TokenLifetimes) -> Self {
        Self::with_clock(store, lifetimes, SystemClock)
    }
}

impl<S, T> TokenVault<S, T>
where
    S: TokenStore,
    T: Clock,
{
    pub fn with_clock(store: S, lifetimes: TokenLifetimes, clock: T) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::LoginRequired);
        let vault = Self {
            store,
            clock,
            lifetimes,
            status_tx,
            write_lock: Mutex::new(()),
        };
        vault.publish(vault.derive_status());
        vault
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    /// Raw persisted record, including expired tokens.
    pub fn stored(&self) -> Option<StoredCredentials> {
        match self.store.load_credentials() {
            Ok(credentials) => credentials,
            Err(err) => {
                log::warn!(
                    "token storage unavailable, treating session as absent: {}",
                    err.display_chain()
                );
                None
            }
        }
    }

    /// Both tokens, only when both are still live.
    pub fn get(&self) -> Option<CredentialPair> {
        let now = self.now();
        self.stored()
            .filter(|stored| stored.access_is_live(now) && stored.refresh_is_live(now))
            .map(|stored| CredentialPair {
                access_token: stored.access_token,
                refresh_token: stored.refresh_token,
            })
    }

    pub fn access_token(&self) -> Option<String> {
        let now = self.now();
        self.stored()
            .filter(|stored| stored.access_is_live(now) && stored.refresh_is_live(now))
            .map(|stored| stored.access_token)
    }

    pub fn refresh_token(&self) -> Option<String> {
        let now = self.now();
        self.stored()
            .filter(|stored| stored.refresh_is_live(now))
            .map(|stored| stored.refresh_token)
    }

    /// A live refresh token means a usable session, even with the access
    /// token expired.
    pub fn is_authenticated(&self) -> bool {
        self.refresh_token().is_some()
    }

    pub fn set(
        &self,
        pair: CredentialPair,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> ApiResult<()> {
        let _writing = self.write_guard();
        let now = self.now();
        let credentials = StoredCredentials {
            access_token: pair.access_token,
            access_expires_at: expiry_after(now, access_ttl)?,
            refresh_token: pair.refresh_token,
            refresh_expires_at: expiry_after(now, refresh_ttl)?,
            updated_at: now,
        };
        self.store.save_credentials(&credentials)?;
        self.publish(SessionStatus::Authenticated);
        Ok(())
    }

    /// Stores a freshly issued pair with the configured lifetimes.
    pub fn establish(&self, pair: CredentialPair) -> ApiResult<()> {
        self.set(pair, self.lifetimes.access, self.lifetimes.refresh)
    }

    /// Replaces the access token after a refresh of `exchanged_refresh`.
    /// A rotated refresh token restarts the refresh lifetime; otherwise the
    /// old expiry is kept. Fails without writing when the stored session no
    /// longer holds `exchanged_refresh`, so a logout or a newer login that
    /// landed mid-exchange is never overwritten.
    pub fn rotate(
        &self,
        exchanged_refresh: &str,
        access_token: String,
        rotated_refresh: Option<String>,
    ) -> ApiResult<()> {
        let _writing = self.write_guard();
        let now = self.now();
        let current = self
            .stored()
            .filter(|stored| stored.refresh_is_live(now))
            .filter(|stored| stored.refresh_token == exchanged_refresh)
            .ok_or_else(|| ApiError::RefreshFailed {
                reason: "session changed while refreshing".to_string(),
            })?;

        let (refresh_token, refresh_expires_at) = match rotated_refresh {
            Some(rotated) => (rotated, expiry_after(now, self.lifetimes.refresh)?),
            None => (current.refresh_token, current.refresh_expires_at),
        };

        let credentials = StoredCredentials {
            access_token,
            access_expires_at: expiry_after(now, self.lifetimes.access)?,
            refresh_token,
            refresh_expires_at,
            updated_at: now,
        };
        self.store.save_credentials(&credentials)?;
        self.publish(SessionStatus::Authenticated);
        Ok(())
    }

    /// Drops both tokens and signals that a new login is required.
    pub fn clear(&self) {
        let _writing = self.write_guard();
        self.clear_locked();
    }

    /// Clears the session only while it still holds `refresh_token`.
    /// Returns false when a newer session replaced it.
    pub fn revoke(&self, refresh_token: &str) -> bool {
        let _writing = self.write_guard();
        match self.stored() {
            Some(stored) if stored.refresh_token != refresh_token => false,
            _ => {
                self.clear_locked();
                true
            }
        }
    }

    fn clear_locked(&self) {
        if let Err(err) = self.store.clear_credentials() {
            log::warn!("failed to clear stored tokens: {}", err.display_chain());
        }
        self.publish(SessionStatus::LoginRequired);
    }

    pub fn status(&self) -> SessionStatus {
        *self.status_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    fn derive_status(&self) -> SessionStatus {
        if self.is_authenticated() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::LoginRequired
        }
    }

    fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, status: SessionStatus) {
        let previous = self.status_tx.send_replace(status);
        if previous != status {
            log::debug!("session status changed: {previous:?} -> {status:?}");
        }
    }
}

fn expiry_after(now: Timestamp, ttl: Duration) -> ApiResult<Timestamp> {
    now.checked_add(ttl)
        .ok_or_else(|| ApiError::message(format!("token lifetime {ttl:?} overflows")))
}

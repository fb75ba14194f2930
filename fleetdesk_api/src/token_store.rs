use std::sync::{Mutex, PoisonError};

use fleetdesk_core::Timestamp;
use keyring::Entry;
use serde::{Deserialize, Serialize};

use crate::ApiResult;

/// Persisted credential record. Both tokens carry their own expiry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredCredentials {
    pub access_token: String,
    pub access_expires_at: Timestamp,
    pub refresh_token: String,
    pub refresh_expires_at: Timestamp,
    pub updated_at: Timestamp,
}

impl StoredCredentials {
    pub fn access_is_live(&self, now: Timestamp) -> bool {
        self.access_expires_at > now
    }

    pub fn refresh_is_live(&self, now: Timestamp) -> bool {
        self.refresh_expires_at > now
    }
}

pub trait TokenStore {
    fn load_credentials(&self) -> ApiResult<Option<StoredCredentials>>;
    fn save_credentials(&self, credentials: &StoredCredentials) -> ApiResult<()>;
    fn clear_credentials(&self) -> ApiResult<()>;
}

#[derive(Clone, Debug)]
pub struct KeyringTokenStore {
    service: String,
    account: String,
}

impl KeyringTokenStore {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> ApiResult<Entry> {
        Ok(Entry::new(&self.service, &self.account)?)
    }
}

impl TokenStore for KeyringTokenStore {
    fn load_credentials(&self) -> ApiResult<Option<StoredCredentials>> {
        let entry = self.entry()?;
        match entry.get_password() {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save_credentials(&self, credentials: &StoredCredentials) -> ApiResult<()> {
        let entry = self.entry()?;
        let raw = serde_json::to_string(credentials)?;
        entry.set_password(&raw)?;
        Ok(())
    }

    fn clear_credentials(&self) -> ApiResult<()> {
        let entry = self.entry()?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Process-local store. Credentials vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    credentials: Mutex<Option<StoredCredentials>>,
}

impl MemoryTokenStore {
    pub fn with_credentials(credentials: StoredCredentials) -> Self {
        Self {
            credentials: Mutex::new(Some(credentials)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load_credentials(&self) -> ApiResult<Option<StoredCredentials>> {
        Ok(self
            .credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save_credentials(&self, credentials: &StoredCredentials) -> ApiResult<()> {
        *self
            .credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(credentials.clone());
        Ok(())
    }

    fn clear_credentials(&self) -> ApiResult<()> {
        *self
            .credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

impl<S: TokenStore + ?Sized> TokenStore for std::sync::Arc<S> {
    fn load_credentials(&self) -> ApiResult<Option<StoredCredentials>> {
        (**self).load_credentials()
    }

    fn save_credentials(&self, credentials: &StoredCredentials) -> ApiResult<()> {
        (**self).save_credentials(credentials)
    }

    fn clear_credentials(&self) -> ApiResult<()> {
        (**self).clear_credentials()
    }
}

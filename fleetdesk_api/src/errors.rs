use std::fmt;

use fleetdesk_core::LocationId;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Coarse classification callers branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Auth,
    Validation,
    Server,
    Refresh,
    Local,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
    #[error("network failure: {reason}")]
    Network { reason: String },
    #[error("not authenticated: {message}")]
    Unauthorized { message: String },
    #[error("request rejected ({status}): {message}")]
    Validation { status: u16, message: String },
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("unexpected response status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },
    #[error("session refresh failed: {reason}")]
    RefreshFailed { reason: String },
    #[error("location {location_id} has reached the maximum of {limit} devices")]
    DeviceLimitReached {
        location_id: LocationId,
        limit: usize,
    },
    #[error("a location holds at most {limit} devices, got {count}")]
    TooManyDevices { count: usize, limit: usize },
    #[error("keyring operation failed")]
    Keyring(#[from] keyring::Error),
    #[error("payload serialization failed")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid url")]
    InvalidUrl(#[from] url::ParseError),
    #[error("credential cannot be used as a header value")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("{0}")]
    Message(String),
}

impl ApiError {
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }

    pub fn network(reason: impl Into<String>) -> Self {
        Self::Network {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::Unauthorized { .. } => ErrorKind::Auth,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Server { .. } | Self::UnexpectedStatus { .. } => ErrorKind::Server,
            Self::RefreshFailed { .. } => ErrorKind::Refresh,
            Self::InvalidConfig(_)
            | Self::DeviceLimitReached { .. }
            | Self::TooManyDevices { .. }
            | Self::Keyring(_)
            | Self::Serialization(_)
            | Self::InvalidUrl(_)
            | Self::InvalidHeader(_)
            | Self::Message(_) => ErrorKind::Local,
        }
    }

    /// True when the session is gone and the user has to sign in again.
    pub fn requires_login(&self) -> bool {
        matches!(self.kind(), ErrorKind::Auth | ErrorKind::Refresh)
    }

    pub fn display_chain(&self) -> DisplayChainedError<'_> {
        DisplayChainedError { inner: self }
    }
}

pub struct DisplayChainedError<'a> {
    inner: &'a (dyn std::error::Error + 'static),
}

impl<'a> DisplayChainedError<'a> {
    pub fn new(inner: &'a (dyn std::error::Error + 'static)) -> Self {
        Self { inner }
    }
}

impl fmt::Debug for DisplayChainedError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(self.inner);

        while let Some(err) = current {
            if first {
                first = false;
            } else {
                write!(f, " -> ")?;
            }

            write!(f, "{err}")?;
            current = err.source();
        }

        Ok(())
    }
}

impl fmt::Display for DisplayChainedError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

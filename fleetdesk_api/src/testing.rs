use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use fleetdesk_core::Timestamp;
use reqwest::{Method, StatusCode};

use crate::{
    ApiError, ApiResult,
    auth::Clock,
    http::{ApiRequest, ApiResponse, HttpTransport},
    token_store::MemoryTokenStore,
    vault::{CredentialPair, TokenLifetimes, TokenVault},
};

pub(crate) type TestVault = TokenVault<MemoryTokenStore, ManualClock>;

pub(crate) fn ts(epoch_secs: i64) -> Timestamp {
    Timestamp::from_epoch_secs(epoch_secs).expect("valid epoch seconds")
}

#[derive(Clone)]
pub(crate) struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    pub(crate) fn at(epoch_secs: i64) -> Self {
        Self {
            now: Arc::new(Mutex::new(ts(epoch_secs))),
        }
    }

    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = now.checked_add(by).expect("clock advance in range");
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) fn seeded_vault(access: &str, refresh: &str) -> Arc<TestVault> {
    let vault = TokenVault::with_clock(
        MemoryTokenStore::default(),
        TokenLifetimes::default(),
        ManualClock::at(1_000),
    );
    vault
        .establish(CredentialPair {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        })
        .expect("seed vault");
    Arc::new(vault)
}

type Handler = Box<dyn Fn(&ApiRequest) -> ApiResult<ApiResponse> + Send + Sync>;

/// Transport answering from a closure and recording every request.
pub(crate) struct ScriptedTransport {
    handler: Handler,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(
        handler: impl Fn(&ApiRequest) -> ApiResult<ApiResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn always(status: StatusCode, body: &str) -> Self {
        let body = body.to_owned();
        Self::new(move |_| Ok(ApiResponse::new(status, body.clone())))
    }

    pub(crate) fn failing(reason: &str) -> Self {
        let reason = reason.to_owned();
        Self::new(move |_| Err(ApiError::network(reason.clone())))
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn count(&self, method: &Method, route: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.method() == method && request.route() == route)
            .count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        (self.handler)(&request)
    }
}

pub(crate) fn json(status: StatusCode, value: serde_json::Value) -> ApiResponse {
    ApiResponse::json_body(status, &value)
}

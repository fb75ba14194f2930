//! Ordered request/response stages run in front of the transport.
//!
//! Each stage gets the request and a [`Next`] handle for the rest of the
//! chain. A stage may rewrite the request, inspect the response, or call
//! `next` more than once (the refresh stage replays through it).

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;

use super::{
    request::{ApiRequest, ApiResponse},
    transport::HttpTransport,
};
use crate::{ApiResult, auth::Clock, token_store::TokenStore, vault::TokenVault};

#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> ApiResult<ApiResponse>;
}

#[derive(Clone, Copy)]
pub struct Next<'a> {
    transport: &'a dyn HttpTransport,
    stages: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub fn new(transport: &'a dyn HttpTransport, stages: &'a [Arc<dyn Middleware>]) -> Self {
        Self { transport, stages }
    }

    pub async fn run(self, request: ApiRequest) -> ApiResult<ApiResponse> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    transport: self.transport,
                    stages: rest,
                };
                stage.handle(request, next).await
            }
            None => self.transport.execute(request).await,
        }
    }
}

/// Attaches the current access token as a bearer credential.
///
/// The token is read from the vault on every call, never captured.
pub struct BearerAuth<S, T>
where
    S: TokenStore,
    T: Clock,
{
    vault: Arc<TokenVault<S, T>>,
}

impl<S, T> BearerAuth<S, T>
where
    S: TokenStore,
    T: Clock,
{
    pub fn new(vault: Arc<TokenVault<S, T>>) -> Self {
        Self { vault }
    }
}

#[async_trait]
impl<S, T> Middleware for BearerAuth<S, T>
where
    S: TokenStore + Send + Sync + 'static,
    T: Clock + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "bearer-auth"
    }

    async fn handle(&self, mut request: ApiRequest, next: Next<'_>) -> ApiResult<ApiResponse> {
        if request.has_authorization() {
            return next.run(request).await;
        }

        let token = self.vault.access_token();
        if let Some(token) = &token {
            request.set_bearer(token)?;
        }

        let mut response = next.run(request).await?;
        response.set_credential_used(token);
        Ok(response)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RequestLogger;

#[async_trait]
impl Middleware for RequestLogger {
    fn name(&self) -> &'static str {
        "request-logger"
    }

    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> ApiResult<ApiResponse> {
        let method = request.method().clone();
        let route = request.route().to_owned();
        let retry = if request.is_retry() { " (retry)" } else { "" };
        log::debug!("--> {method} {route}{retry}");

        let started = Instant::now();
        let result = next.run(request).await;
        match &result {
            Ok(response) => log::debug!(
                "<-- {method} {route}{retry} {} in {:?}",
                response.status(),
                started.elapsed()
            ),
            Err(err) => log::debug!(
                "<-- {method} {route}{retry} failed in {:?}: {}",
                started.elapsed(),
                err.display_chain()
            ),
        }
        result
    }
}

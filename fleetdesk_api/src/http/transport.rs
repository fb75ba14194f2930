use async_trait::async_trait;
use url::Url;

use super::request::{ApiRequest, ApiResponse};
use crate::{ApiError, ApiResult, config::ApiConfig, errors::DisplayChainedError};

/// Last hop of the pipeline: puts a request on the wire.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> ApiResult<ApiResponse>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .map_err(|err| {
                ApiError::message(format!(
                    "failed to build http client: {}",
                    DisplayChainedError::new(&err)
                ))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url()?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> ApiResult<Url> {
        join_api_path(&self.base_url, path)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let url = self.url_for(request.path())?;

        let mut builder = self
            .client
            .request(request.method().clone(), url)
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| ApiError::network(DisplayChainedError::new(&err).to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| ApiError::network(DisplayChainedError::new(&err).to_string()))?;

        Ok(ApiResponse::new(status, body.to_vec()))
    }
}

/// Appends `path` (which may carry a query) to the base URL's own path.
fn join_api_path(base_url: &Url, path: &str) -> ApiResult<Url> {
    let (route, query) = match path.split_once('?') {
        Some((route, query)) => (route, Some(query)),
        None => (path, None),
    };

    let mut url = base_url.clone();
    let base_path = base_url.path().trim_end_matches('/');
    let route = route.trim_start_matches('/');
    url.set_path(&format!("{base_path}/{route}"));
    url.set_query(query);
    url.set_fragment(None);
    Ok(url)
}

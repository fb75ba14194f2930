use std::time::Duration;

use url::Url;

use crate::{ApiError, ApiResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub user_agent: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            user_agent: concat!("fleetdesk/", env!("CARGO_PKG_VERSION")).to_owned(),
            access_token_ttl: DEFAULT_ACCESS_TOKEN_TTL,
            refresh_token_ttl: DEFAULT_REFRESH_TOKEN_TTL,
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> ApiResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(ApiError::InvalidConfig("FLEETDESK_API_URL must be set"));
        }
        let parsed = Url::parse(&self.base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidConfig(
                "api url must use http or https",
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ApiError::InvalidConfig("user_agent must be set"));
        }
        if self.access_token_ttl.is_zero() || self.refresh_token_ttl.is_zero() {
            return Err(ApiError::InvalidConfig("token lifetimes must be non-zero"));
        }
        if self.access_token_ttl > self.refresh_token_ttl {
            return Err(ApiError::InvalidConfig(
                "access token lifetime must not exceed refresh token lifetime",
            ));
        }
        Ok(())
    }

    pub fn base_url(&self) -> ApiResult<Url> {
        Ok(Url::parse(&self.base_url)?)
    }
}

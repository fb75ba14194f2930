pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod refresh;
pub mod resources;
pub mod token_store;
pub mod vault;

#[cfg(test)]
mod testing;

pub use auth::{AuthService, AuthSession, Clock, LoginRequest, RegisterRequest, SystemClock};
pub use config::ApiConfig;
pub use errors::{ApiError, ApiResult, ErrorKind};
pub use http::{
    ApiClient, ApiClientBuilder, ApiRequest, ApiResponse, BearerAuth, HttpTransport, Middleware,
    Next, ReqwestTransport, RequestLogger,
};
pub use refresh::{
    RefreshCoordinator, RefreshMetrics, RefreshOnUnauthorized, RefreshOutcome, RefreshPhase,
};
pub use resources::{DashboardClient, DashboardOverview, DevicesClient, LocationsClient};
pub use token_store::{KeyringTokenStore, MemoryTokenStore, StoredCredentials, TokenStore};
pub use vault::{CredentialPair, SessionStatus, TokenLifetimes, TokenVault};

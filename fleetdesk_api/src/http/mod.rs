mod client;
mod middleware;
mod request;
mod transport;

pub use client::{ApiClient, ApiClientBuilder, unwrap_envelope};
pub use middleware::{BearerAuth, Middleware, Next, RequestLogger};
pub use request::{ApiRequest, ApiResponse};
pub use transport::{HttpTransport, ReqwestTransport};

mod service;
mod types;

pub use service::{AuthService, Clock, LOGIN_PATH, LOGOUT_PATH, ME_PATH, REGISTER_PATH, SystemClock};
pub use types::{AuthSession, LoginRequest, RegisterRequest};

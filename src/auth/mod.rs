//! Bearer token authentication and the endpoints for registering and signing in.

mod log_in;
mod middleware;
mod register;
mod token;

pub use log_in::{AuthResponse, get_current_user_endpoint, log_in_endpoint};
pub use middleware::{AuthState, auth_guard};
pub use register::register_endpoint;
pub use token::{DEFAULT_TOKEN_DURATION, JwtKeys, decode_token, encode_token};

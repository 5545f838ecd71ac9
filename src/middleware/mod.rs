//! Middleware for the session API
//!
//! Request tracing, rate limiting, security headers and session extraction.

pub mod auth;
mod rate_limiter;
mod security;
mod tracing;

pub use auth::{SessionUser, SESSION_COOKIE};
pub use rate_limiter::{rate_limit_layer, RateLimiter};
pub use security::security_headers;
pub use tracing::request_tracing;

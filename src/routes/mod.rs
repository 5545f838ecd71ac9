//! Route definitions for the session API

mod auth;

use axum::{routing::get, Router};

use crate::handlers::{health_check, root};
use crate::middleware;
use crate::state::AppState;

pub use auth::auth_routes;

/// Full application router with tracing and security headers applied
///
/// Rate limiting and CORS are deployment concerns and are layered on in `main`.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(auth_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(axum::middleware::from_fn(middleware::request_tracing))
}

//! API handlers for the session server

pub mod auth;

pub use auth::*;

// Re-export the session extractor for handler use
pub use crate::middleware::auth::SessionUser;

/// Health check response
#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub sessions: usize,
    pub version: String,
}

/// GET /health
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<crate::state::AppState>,
) -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse {
        status: "healthy".to_string(),
        sessions: state.auth_service.session_count().await,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /
pub async fn root() -> &'static str {
    "SpruceKit Session Server"
}

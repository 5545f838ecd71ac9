//! Session routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::auth;
use crate::state::AppState;

/// Create the sign-in session routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sprucekit-nonce", get(auth::issue_nonce))
        .route("/api/sprucekit-login", post(auth::login))
        .route("/api/sprucekit-logout", post(auth::logout))
        .route("/api/sprucekit-session", get(auth::current_session))
}

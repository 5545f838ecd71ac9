//! Session HTTP handlers
//!
//! Thin glue between the session routes and the authentication service.

use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::middleware::{SessionUser, SESSION_COOKIE};
use crate::models::{LoginRequest, LoginResult, LogoutResponse, SessionInfo};
use crate::state::AppState;

/// Cookie carrying the nonce between the nonce and login calls
pub const NONCE_COOKIE: &str = "nonce";

/// GET /api/sprucekit-nonce - Mint a nonce, returned as the body and as a cookie
pub async fn issue_nonce(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, String) {
    let nonce = state.auth_service.generate_nonce().await;
    (jar.add(Cookie::new(NONCE_COOKIE, nonce.clone())), nonce)
}

/// POST /api/sprucekit-login - Verify a signed sign-in message
///
/// Always answers 200; the outcome is in the body.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> (CookieJar, Json<LoginResult>) {
    let nonce = jar
        .get(NONCE_COOKIE)
        .map(|c| c.value().to_string())
        .unwrap_or_default();

    let result = state
        .auth_service
        .login(
            req.siwe.as_deref(),
            req.signature.as_deref(),
            req.dao_login,
            req.resolve_ens,
            &nonce,
            req.resolve_lens,
        )
        .await;

    let jar = match &result.session_token {
        Some(token) => jar.add(
            Cookie::build((SESSION_COOKIE, token.clone()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .secure(state.secure_cookies),
        ),
        None => jar,
    };

    (jar, Json(result))
}

/// POST /api/sprucekit-logout - End the current session
///
/// Always answers 200 with `{ success }`.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    let token = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

    let success = state
        .auth_service
        .logout(token.as_deref())
        .await
        .unwrap_or(true);

    let jar = match token {
        Some(_) => jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        None => jar,
    };

    (jar, Json(LogoutResponse { success }))
}

/// GET /api/sprucekit-session - Describe the session behind the cookie
pub async fn current_session(user: SessionUser) -> Json<SessionInfo> {
    Json(SessionInfo::from(&user.session))
}

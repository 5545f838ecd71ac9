//! Session extraction
//!
//! Resolves the session cookie into the live session it names.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;

use crate::auth::{AuthError, AuthService};
use crate::error::ApiError;
use crate::models::SessionRecord;

/// Cookie carrying the signed session token
pub const SESSION_COOKIE: &str = "sprucekit-session";

/// Authenticated session extracted from the session cookie
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(user: SessionUser) -> impl IntoResponse {
///     format!("Hello, {}", user.session.address)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub session: SessionRecord,
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or(AuthError::MissingSession)?;

        let auth_service = Arc::<AuthService>::from_ref(state);
        let session = auth_service.verify_session(&token).await?;

        Ok(SessionUser { session })
    }
}

//! Session token generation and validation
//!
//! Session tokens are HS256 JWTs signed with the process-wide signing key.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JWT-related errors
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Token decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Token expired")]
    TokenExpired,
}

/// Claims carried by a session token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    /// Subject (account address)
    pub sub: String,
    /// Session id
    pub jti: String,
    /// Domain the sign-in message was issued for
    pub domain: String,
    /// Chain id from the sign-in message
    pub chain_id: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Generate a session token
pub fn generate_session_token(
    address: &str,
    jti: &str,
    domain: &str,
    chain_id: &str,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    secret: &str,
) -> Result<String, JwtError> {
    let claims = SessionClaims {
        sub: address.to_string(),
        jti: jti.to_string(),
        domain: domain.to_string(),
        chain_id: chain_id.to_string(),
        iat: issued_at.timestamp(),
        exp: expires_at.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| JwtError::EncodingFailed(e.to_string()))
}

/// Verify and decode a session token
pub fn verify_session_token(token: &str, secret: &str) -> Result<SessionClaims, JwtError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        _ => JwtError::DecodingFailed(e.to_string()),
    })?;

    Ok(token_data.claims)
}

//! Session models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Issued nonce awaiting a login
#[derive(Debug, Clone)]
pub struct NonceRecord {
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
}

/// Authenticated session held by the server
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub jti: String,
    pub address: String,
    pub domain: String,
    pub chain_id: String,
    pub nonce: String,
    pub dao_login: bool,
    pub ens: Option<EnsData>,
    pub lens: Option<Vec<LensProfile>>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// ENS-style name data for an address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnsData {
    pub domain: Option<String>,
    pub avatar_url: Option<String>,
}

/// Lens-style social profile for an address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LensProfile {
    pub id: String,
    pub handle: String,
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Body of `POST /api/sprucekit-login`
///
/// Every field is optional at the decoding level; missing values are forwarded
/// to the authentication service as-is.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub siwe: Option<String>,
    pub signature: Option<String>,
    pub dao_login: Option<bool>,
    pub resolve_ens: Option<bool>,
    pub resolve_lens: Option<bool>,
}

/// Result of a login attempt; returned with status 200 either way
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SignInError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ens: Option<EnsData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lens: Option<Vec<LensProfile>>,
    /// Signed session token; travels as a cookie, never in the body
    #[serde(skip)]
    pub session_token: Option<String>,
}

impl LoginResult {
    pub fn failure(error: SignInError) -> Self {
        Self {
            success: false,
            error: Some(error),
            session: None,
            ens: None,
            lens: None,
            session_token: None,
        }
    }
}

/// Why a login failed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignInError {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
}

/// Public view of a session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub address: String,
    pub domain: String,
    pub chain_id: String,
    pub nonce: String,
    pub dao_login: bool,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&SessionRecord> for SessionInfo {
    fn from(record: &SessionRecord) -> Self {
        Self {
            address: record.address.clone(),
            domain: record.domain.clone(),
            chain_id: record.chain_id.clone(),
            nonce: record.nonce.clone(),
            dao_login: record.dao_login,
            issued_at: record.issued_at,
            expires_at: record.expires_at,
        }
    }
}

/// Body of `POST /api/sprucekit-logout`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogoutResponse {
    pub success: bool,
}

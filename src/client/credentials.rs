//! Credentials module and credential decoding

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

use super::storage::{ListOptions, Storage, StorageError};
use super::{ClientError, SpruceKit};

/// Directory, relative to the storage prefix, that holds credentials
pub const CREDENTIALS_DIR: &str = "credentials/";

/// Credentials stored by the signed-in account
#[derive(Clone)]
pub struct Credentials {
    storage: Storage,
}

impl Credentials {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Stored credential keys
    pub async fn list(&self, options: ListOptions) -> Result<Vec<String>, StorageError> {
        let keys = self
            .storage
            .list(ListOptions {
                remove_prefix: true,
            })
            .await?;

        Ok(keys
            .into_iter()
            .filter(|k| k.starts_with(CREDENTIALS_DIR))
            .map(|k| {
                if options.remove_prefix {
                    k
                } else {
                    format!("{}/{}", self.storage.prefix(), k)
                }
            })
            .collect())
    }
}

/// Credential list for display; failures are logged and yield an empty list
pub async fn load_credentials(provider: &SpruceKit) -> Vec<String> {
    let Some(credentials) = provider.credentials() else {
        return Vec::new();
    };

    match credentials
        .list(ListOptions {
            remove_prefix: true,
        })
        .await
    {
        Ok(list) => list,
        Err(e) => {
            tracing::error!(error = %e, "Error fetching credentials");
            Vec::new()
        }
    }
}

/// Readable view of a witnessed credential JWT
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CredentialEntry {
    #[serde(rename = "type")]
    pub credential_type: String,
    pub issuer: Option<String>,
    pub subject: Value,
    pub issuance_date: Option<String>,
    pub claims: Value,
    pub jwt: String,
}

/// Decode the payload of a credential JWT without checking its signature
///
/// Verification belongs to the witness service (see `WitnessClient::verify`).
pub fn to_credential_entry(jwt: &str) -> Result<CredentialEntry, ClientError> {
    let mut parts = jwt.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => {
            return Err(ClientError::InvalidCredential(
                "expected a three-part JWT".to_string(),
            ))
        }
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| ClientError::InvalidCredential(e.to_string()))?;
    let claims: Value = serde_json::from_slice(&bytes)?;

    let vc = claims.get("vc").cloned().unwrap_or(Value::Null);

    let credential_type = vc
        .get("type")
        .and_then(|t| match t {
            Value::Array(types) => types
                .iter()
                .filter_map(Value::as_str)
                .find(|t| *t != "VerifiableCredential")
                .map(str::to_string),
            Value::String(s) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_else(|| "Unknown".to_string());

    let issuer = claims
        .get("iss")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| match vc.get("issuer") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Object(o)) => o.get("id").and_then(Value::as_str).map(str::to_string),
            _ => None,
        });

    let subject = vc
        .get("credentialSubject")
        .cloned()
        .or_else(|| claims.get("sub").cloned())
        .unwrap_or(Value::Null);

    let issuance_date = vc
        .get("issuanceDate")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            claims
                .get("nbf")
                .or_else(|| claims.get("iat"))
                .and_then(Value::as_i64)
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        });

    Ok(CredentialEntry {
        credential_type,
        issuer,
        subject,
        issuance_date,
        claims,
        jwt: jwt.to_string(),
    })
}

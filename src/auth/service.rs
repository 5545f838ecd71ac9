//! Authentication service
//!
//! Core session logic for wallet sign-in: nonce issuance, sign-in message
//! verification, session issuance and termination.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{LoginResult, NonceRecord, SessionInfo, SessionRecord, SignInError};

use super::crypto::{verify_wallet_signature, CryptoError};
use super::jwt::{generate_session_token, verify_session_token, JwtError};
use super::message::{MessageError, SignInMessage};
use super::resolver::{IdentityResolver, NoopResolver};

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing sign-in message")]
    MissingMessage,

    #[error("Missing signature")]
    MissingSignature,

    #[error("Invalid sign-in message: {0}")]
    InvalidMessage(#[from] MessageError),

    #[error("Nonce does not match the nonce cookie")]
    NonceMismatch { expected: String, received: String },

    #[error("Nonce not found or expired")]
    NonceNotFound,

    #[error("Nonce already used")]
    NonceAlreadyUsed,

    #[error("Nonce expired")]
    NonceExpired,

    #[error("Domain does not match")]
    DomainMismatch { expected: String, received: String },

    #[error("Sign-in message is expired or not yet valid")]
    MessageExpired,

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("No session cookie")]
    MissingSession,

    #[error("Session not found or revoked")]
    SessionNotFound,
}

impl From<CryptoError> for AuthError {
    fn from(e: CryptoError) -> Self {
        AuthError::InvalidSignature(e.to_string())
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        AuthError::TokenError(e.to_string())
    }
}

impl AuthError {
    /// Stable identifier reported as `error.type` in login results
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingMessage => "MissingMessage",
            AuthError::MissingSignature => "MissingSignature",
            AuthError::InvalidMessage(_) => "MalformedMessage",
            AuthError::NonceMismatch { .. } => "NonceMismatch",
            AuthError::NonceNotFound => "NonceNotFound",
            AuthError::NonceAlreadyUsed => "NonceAlreadyUsed",
            AuthError::NonceExpired => "NonceExpired",
            AuthError::DomainMismatch { .. } => "DomainMismatch",
            AuthError::MessageExpired => "ExpiredMessage",
            AuthError::InvalidSignature(_) => "InvalidSignature",
            AuthError::TokenError(_) => "TokenError",
            AuthError::MissingSession => "MissingSession",
            AuthError::SessionNotFound => "SessionNotFound",
        }
    }
}

impl From<AuthError> for SignInError {
    fn from(e: AuthError) -> Self {
        let (expected, received) = match &e {
            AuthError::NonceMismatch { expected, received }
            | AuthError::DomainMismatch { expected, received } => {
                (Some(expected.clone()), Some(received.clone()))
            }
            _ => (None, None),
        };
        SignInError {
            kind: e.kind().to_string(),
            message: e.to_string(),
            expected,
            received,
        }
    }
}

/// Authentication service
pub struct AuthService {
    signing_key: String,
    nonce_ttl: Duration,
    session_ttl: Duration,
    expected_domain: Option<String>,
    nonces: RwLock<HashMap<String, NonceRecord>>,
    sessions: RwLock<HashMap<String, SessionRecord>>,
    resolver: Arc<dyn IdentityResolver>,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(signing_key: String, nonce_ttl_seconds: i64, session_ttl_seconds: i64) -> Self {
        Self {
            signing_key,
            nonce_ttl: Duration::seconds(nonce_ttl_seconds),
            session_ttl: Duration::seconds(session_ttl_seconds),
            expected_domain: None,
            nonces: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            resolver: Arc::new(NoopResolver),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.signing_key.clone(),
            config.nonce_ttl_seconds,
            config.session_ttl_seconds,
        )
        .with_expected_domain(config.sign_in_domain.clone())
    }

    /// Require every sign-in message to carry this domain
    pub fn with_expected_domain(mut self, domain: Option<String>) -> Self {
        self.expected_domain = domain;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Mint and record a fresh nonce
    pub async fn generate_nonce(&self) -> String {
        let nonce = generate_secure_nonce();
        let now = Utc::now();

        self.nonces.write().await.insert(
            nonce.clone(),
            NonceRecord {
                nonce: nonce.clone(),
                issued_at: now,
                expires_at: now + self.nonce_ttl,
                used: false,
                used_at: None,
            },
        );

        tracing::debug!(nonce = %nonce, "Issued sign-in nonce");
        nonce
    }

    /// Verify a signed sign-in message and open a session
    ///
    /// Failures are reported inside the result rather than as an error, so the
    /// caller can hand the result to the client unchanged.
    pub async fn login(
        &self,
        siwe: Option<&str>,
        signature: Option<&str>,
        dao_login: Option<bool>,
        resolve_ens: Option<bool>,
        nonce: &str,
        resolve_lens: Option<bool>,
    ) -> LoginResult {
        match self
            .try_login(
                siwe,
                signature,
                dao_login.unwrap_or(false),
                resolve_ens.unwrap_or(false),
                nonce,
                resolve_lens.unwrap_or(false),
            )
            .await
        {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, kind = e.kind(), "Sign-in rejected");
                LoginResult::failure(e.into())
            }
        }
    }

    async fn try_login(
        &self,
        siwe: Option<&str>,
        signature: Option<&str>,
        dao_login: bool,
        resolve_ens: bool,
        cookie_nonce: &str,
        resolve_lens: bool,
    ) -> Result<LoginResult, AuthError> {
        let raw_message = siwe.ok_or(AuthError::MissingMessage)?;
        let signature = signature.ok_or(AuthError::MissingSignature)?;

        let message: SignInMessage = raw_message.parse()?;

        if message.nonce != cookie_nonce {
            return Err(AuthError::NonceMismatch {
                expected: cookie_nonce.to_string(),
                received: message.nonce.clone(),
            });
        }

        self.check_nonce(&message.nonce).await?;

        if let Some(expected) = &self.expected_domain {
            if &message.domain != expected {
                return Err(AuthError::DomainMismatch {
                    expected: expected.clone(),
                    received: message.domain.clone(),
                });
            }
        }

        let now = Utc::now();
        if !message.is_valid_at(now) {
            return Err(AuthError::MessageExpired);
        }

        verify_wallet_signature(&message.address, raw_message, signature)?;

        // Consume only after the signature checks out, and re-check under the
        // write lock so a concurrent login with the same nonce loses.
        self.consume_nonce(&message.nonce).await?;

        let ens = if resolve_ens {
            self.resolver.resolve_ens(&message.address).await
        } else {
            None
        };
        let lens = if resolve_lens {
            self.resolver.resolve_lens(&message.address).await
        } else {
            None
        };

        let jti = Uuid::new_v4().to_string();
        let expires_at = match message.expiration_time {
            Some(exp) if exp < now + self.session_ttl => exp,
            _ => now + self.session_ttl,
        };

        let session_token = generate_session_token(
            &message.address,
            &jti,
            &message.domain,
            &message.chain_id,
            now,
            expires_at,
            &self.signing_key,
        )?;

        let record = SessionRecord {
            jti: jti.clone(),
            address: message.address.clone(),
            domain: message.domain.clone(),
            chain_id: message.chain_id.clone(),
            nonce: message.nonce.clone(),
            dao_login,
            ens: ens.clone(),
            lens: lens.clone(),
            issued_at: now,
            expires_at,
        };
        let session = SessionInfo::from(&record);
        self.sessions.write().await.insert(jti.clone(), record);

        tracing::info!(address = %message.address, session = %jti, "Sign-in succeeded");

        Ok(LoginResult {
            success: true,
            error: None,
            session: Some(session),
            ens,
            lens,
            session_token: Some(session_token),
        })
    }

    async fn check_nonce(&self, nonce: &str) -> Result<(), AuthError> {
        let nonces = self.nonces.read().await;
        let record = nonces.get(nonce).ok_or(AuthError::NonceNotFound)?;

        if record.used {
            return Err(AuthError::NonceAlreadyUsed);
        }
        if record.expires_at < Utc::now() {
            return Err(AuthError::NonceExpired);
        }
        Ok(())
    }

    async fn consume_nonce(&self, nonce: &str) -> Result<(), AuthError> {
        let mut nonces = self.nonces.write().await;
        let record = nonces.get_mut(nonce).ok_or(AuthError::NonceNotFound)?;

        if record.used {
            return Err(AuthError::NonceAlreadyUsed);
        }
        record.used = true;
        record.used_at = Some(Utc::now());
        Ok(())
    }

    /// End the session behind `session_token`
    ///
    /// `None` when there was nothing to end, `Some(false)` when the token does
    /// not verify, `Some(true)` otherwise (including sessions already gone).
    pub async fn logout(&self, session_token: Option<&str>) -> Option<bool> {
        let token = session_token?;

        let claims = match verify_session_token(token, &self.signing_key) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!(error = %e, "Logout with an unverifiable session token");
                return Some(false);
            }
        };

        let removed = self.sessions.write().await.remove(&claims.jti).is_some();
        tracing::info!(address = %claims.sub, session = %claims.jti, removed, "Signed out");
        Some(true)
    }

    /// Resolve a session token to a live session
    pub async fn verify_session(&self, session_token: &str) -> Result<SessionRecord, AuthError> {
        let claims = verify_session_token(session_token, &self.signing_key)?;

        let sessions = self.sessions.read().await;
        let record = sessions
            .get(&claims.jti)
            .filter(|s| s.expires_at > Utc::now())
            .ok_or(AuthError::SessionNotFound)?;

        Ok(record.clone())
    }

    /// Drop expired nonces and sessions, returning how many of each went
    pub async fn purge_expired(&self) -> (usize, usize) {
        let now = Utc::now();

        let mut nonces = self.nonces.write().await;
        let before = nonces.len();
        nonces.retain(|_, n| n.expires_at > now);
        let purged_nonces = before - nonces.len();
        drop(nonces);

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        let purged_sessions = before - sessions.len();

        (purged_nonces, purged_sessions)
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Generate a cryptographically secure nonce
fn generate_secure_nonce() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::crypto::encode_account_address;
    use crate::models::{EnsData, LensProfile};
    use async_trait::async_trait;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use ed25519_dalek::{Signer, SigningKey};

    const SECRET: &str = "test-signing-key";

    fn service() -> AuthService {
        AuthService::new(SECRET.to_string(), 300, 3600)
    }

    fn wallet() -> (SigningKey, String) {
        let key = SigningKey::from_bytes(&[42u8; 32]);
        let address = encode_account_address(&key.verifying_key().to_bytes());
        (key, address)
    }

    fn signed_message(key: &SigningKey, address: &str, nonce: &str) -> (String, String) {
        let text = SignInMessage::new(
            "localhost:3000",
            address,
            "http://localhost:3000",
            "1",
            nonce,
        )
        .to_string();
        let signature = STANDARD.encode(key.sign(text.as_bytes()).to_bytes());
        (text, signature)
    }

    #[tokio::test]
    async fn test_nonces_are_unique_hex() {
        let auth = service();
        let a = auth.generate_nonce().await;
        let b = auth.generate_nonce().await;
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_login_success() {
        let auth = service();
        let (key, address) = wallet();
        let nonce = auth.generate_nonce().await;
        let (text, sig) = signed_message(&key, &address, &nonce);

        let result = auth
            .login(Some(&text), Some(&sig), None, None, &nonce, None)
            .await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.session.unwrap().address, address);
        let token = result.session_token.unwrap();
        let session = auth.verify_session(&token).await.unwrap();
        assert_eq!(session.address, address);
    }

    #[tokio::test]
    async fn test_nonce_is_single_use() {
        let auth = service();
        let (key, address) = wallet();
        let nonce = auth.generate_nonce().await;
        let (text, sig) = signed_message(&key, &address, &nonce);

        assert!(auth.login(Some(&text), Some(&sig), None, None, &nonce, None).await.success);

        let replay = auth
            .login(Some(&text), Some(&sig), None, None, &nonce, None)
            .await;
        assert!(!replay.success);
        assert_eq!(replay.error.unwrap().kind, "NonceAlreadyUsed");
    }

    #[tokio::test]
    async fn test_missing_cookie_nonce_fails() {
        let auth = service();
        let (key, address) = wallet();
        let nonce = auth.generate_nonce().await;
        let (text, sig) = signed_message(&key, &address, &nonce);

        let result = auth.login(Some(&text), Some(&sig), None, None, "", None).await;
        let error = result.error.unwrap();
        assert_eq!(error.kind, "NonceMismatch");
        assert_eq!(error.expected.as_deref(), Some(""));
        assert_eq!(error.received.as_deref(), Some(nonce.as_str()));
    }

    #[tokio::test]
    async fn test_unknown_nonce_fails() {
        let auth = service();
        let (key, address) = wallet();
        let (text, sig) = signed_message(&key, &address, "deadbeefdeadbeef");

        let result = auth
            .login(Some(&text), Some(&sig), None, None, "deadbeefdeadbeef", None)
            .await;
        assert_eq!(result.error.unwrap().kind, "NonceNotFound");
    }

    #[tokio::test]
    async fn test_wrong_signer_fails_and_keeps_nonce() {
        let auth = service();
        let (_, address) = wallet();
        let impostor = SigningKey::from_bytes(&[9u8; 32]);
        let nonce = auth.generate_nonce().await;
        let (text, sig) = signed_message(&impostor, &address, &nonce);

        let result = auth.login(Some(&text), Some(&sig), None, None, &nonce, None).await;
        assert_eq!(result.error.unwrap().kind, "InvalidSignature");

        // The nonce survives a failed signature so the real owner can still use it
        let (key, _) = wallet();
        let (text, sig) = signed_message(&key, &address, &nonce);
        assert!(auth.login(Some(&text), Some(&sig), None, None, &nonce, None).await.success);
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let auth = service();
        let result = auth.login(None, None, None, None, "", None).await;
        assert_eq!(result.error.unwrap().kind, "MissingMessage");

        let result = auth.login(Some("text"), None, None, None, "", None).await;
        assert_eq!(result.error.unwrap().kind, "MissingSignature");
    }

    #[tokio::test]
    async fn test_domain_mismatch() {
        let auth = service().with_expected_domain(Some("example.com".to_string()));
        let (key, address) = wallet();
        let nonce = auth.generate_nonce().await;
        let (text, sig) = signed_message(&key, &address, &nonce);

        let result = auth.login(Some(&text), Some(&sig), None, None, &nonce, None).await;
        let error = result.error.unwrap();
        assert_eq!(error.kind, "DomainMismatch");
        assert_eq!(error.received.as_deref(), Some("localhost:3000"));
    }

    struct FixedResolver;

    #[async_trait]
    impl IdentityResolver for FixedResolver {
        async fn resolve_ens(&self, _address: &str) -> Option<EnsData> {
            Some(EnsData {
                domain: Some("alice.eth".to_string()),
                avatar_url: None,
            })
        }

        async fn resolve_lens(&self, _address: &str) -> Option<Vec<LensProfile>> {
            Some(vec![LensProfile {
                id: "0x01".to_string(),
                handle: "alice.lens".to_string(),
            }])
        }
    }

    #[tokio::test]
    async fn test_resolution_flags() {
        let auth = service().with_resolver(Arc::new(FixedResolver));
        let (key, address) = wallet();

        let nonce = auth.generate_nonce().await;
        let (text, sig) = signed_message(&key, &address, &nonce);
        let plain = auth.login(Some(&text), Some(&sig), None, None, &nonce, None).await;
        assert!(plain.ens.is_none() && plain.lens.is_none());

        let nonce = auth.generate_nonce().await;
        let (text, sig) = signed_message(&key, &address, &nonce);
        let resolved = auth
            .login(Some(&text), Some(&sig), Some(true), Some(true), &nonce, Some(true))
            .await;
        assert_eq!(resolved.ens.unwrap().domain.as_deref(), Some("alice.eth"));
        assert_eq!(resolved.lens.unwrap()[0].handle, "alice.lens");
        assert!(resolved.session.unwrap().dao_login);
    }

    #[tokio::test]
    async fn test_logout_outcomes() {
        let auth = service();
        assert_eq!(auth.logout(None).await, None);
        assert_eq!(auth.logout(Some("garbage")).await, Some(false));

        let (key, address) = wallet();
        let nonce = auth.generate_nonce().await;
        let (text, sig) = signed_message(&key, &address, &nonce);
        let token = auth
            .login(Some(&text), Some(&sig), None, None, &nonce, None)
            .await
            .session_token
            .unwrap();

        assert_eq!(auth.logout(Some(&token)).await, Some(true));
        assert!(auth.verify_session(&token).await.is_err());
        // Already gone still reports success
        assert_eq!(auth.logout(Some(&token)).await, Some(true));
    }

    fn sign(key: &SigningKey, message: &SignInMessage) -> (String, String) {
        let text = message.to_string();
        let signature = STANDARD.encode(key.sign(text.as_bytes()).to_bytes());
        (text, signature)
    }

    #[tokio::test]
    async fn test_expired_nonce_fails() {
        let auth = AuthService::new(SECRET.to_string(), -1, 3600);
        let (key, address) = wallet();
        let nonce = auth.generate_nonce().await;
        let (text, sig) = signed_message(&key, &address, &nonce);

        let result = auth.login(Some(&text), Some(&sig), None, None, &nonce, None).await;
        assert!(!result.success);
        assert_eq!(result.error.unwrap().kind, "NonceExpired");
        assert_eq!(auth.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_not_before_in_future_keeps_nonce() {
        let auth = service();
        let (key, address) = wallet();
        let nonce = auth.generate_nonce().await;

        let mut early = SignInMessage::new(
            "localhost:3000",
            address.clone(),
            "http://localhost:3000",
            "1",
            nonce.clone(),
        );
        early.not_before = Some(Utc::now() + Duration::minutes(5));
        let (text, sig) = sign(&key, &early);

        let result = auth.login(Some(&text), Some(&sig), None, None, &nonce, None).await;
        assert_eq!(result.error.unwrap().kind, "ExpiredMessage");

        // Rejected before consumption, so the nonce still works
        let (text, sig) = signed_message(&key, &address, &nonce);
        let result = auth.login(Some(&text), Some(&sig), None, None, &nonce, None).await;
        assert!(result.success, "{:?}", result.error);
    }

    #[tokio::test]
    async fn test_past_expiration_time_fails() {
        let auth = service();
        let (key, address) = wallet();
        let nonce = auth.generate_nonce().await;

        let message = SignInMessage::new(
            "localhost:3000",
            address,
            "http://localhost:3000",
            "1",
            nonce.clone(),
        )
        .with_expiration_time(Utc::now() - Duration::minutes(1));
        let (text, sig) = sign(&key, &message);

        let result = auth.login(Some(&text), Some(&sig), None, None, &nonce, None).await;
        assert!(!result.success);
        assert_eq!(result.error.unwrap().kind, "ExpiredMessage");
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let auth = AuthService::new(SECRET.to_string(), -1, 3600);
        auth.generate_nonce().await;
        auth.generate_nonce().await;

        let (nonces, sessions) = auth.purge_expired().await;
        assert_eq!(nonces, 2);
        assert_eq!(sessions, 0);
    }
}

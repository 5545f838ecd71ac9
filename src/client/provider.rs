//! SpruceKit provider
//!
//! Talks to a session server on behalf of one wallet: fetches a nonce, signs a
//! sign-in message, logs in, and keeps the session cookie in its own jar so
//! later calls ride on it.

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::SignInMessage;
use crate::models::{LoginRequest, LoginResult, LogoutResponse, SessionInfo};

use super::credentials::Credentials;
use super::storage::{ObjectStore, Storage, StorageOptions};
use super::wallet::WalletSigner;
use super::ClientError;

fn default_chain_id() -> String {
    "1".to_string()
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Base of the session routes, e.g. `http://localhost:3000/api`
    pub server_host: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: String,
    /// Statement line shown to the user in the sign-in message
    #[serde(default)]
    pub statement: Option<String>,
    #[serde(default)]
    pub resolve_ens: bool,
    #[serde(default)]
    pub resolve_lens: bool,
    /// Storage module; connected during sign-in when present
    #[serde(default)]
    pub storage: Option<StorageOptions>,
}

impl ProviderConfig {
    pub fn new(server_host: impl Into<String>) -> Self {
        Self {
            server_host: server_host.into(),
            chain_id: default_chain_id(),
            statement: None,
            resolve_ens: false,
            resolve_lens: false,
            storage: None,
        }
    }

    pub fn with_storage(mut self, storage: StorageOptions) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = Some(statement.into());
        self
    }
}

pub struct SpruceKit {
    config: ProviderConfig,
    host: String,
    domain: String,
    origin: String,
    client: Client,
    wallet: Arc<dyn WalletSigner>,
    object_store: Option<Arc<dyn ObjectStore>>,
    session: Option<SessionInfo>,
    storage: Option<Storage>,
    credentials: Option<Credentials>,
}

impl SpruceKit {
    pub fn new(config: ProviderConfig, wallet: Arc<dyn WalletSigner>) -> Result<Self, ClientError> {
        let url = Url::parse(&config.server_host)
            .map_err(|e| ClientError::InvalidHost(format!("{}: {}", config.server_host, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| ClientError::InvalidHost(config.server_host.clone()))?;
        let domain = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            host: config.server_host.trim_end_matches('/').to_string(),
            domain,
            origin: url.origin().ascii_serialization(),
            config,
            client,
            wallet,
            object_store: None,
            session: None,
            storage: None,
            credentials: None,
        })
    }

    /// Backend for the storage module
    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    fn endpoint(&self, route: &str) -> String {
        format!("{}/{}", self.host, route)
    }

    /// Run the nonce, sign, login round trip and connect storage
    pub async fn sign_in(&mut self) -> Result<SessionInfo, ClientError> {
        let nonce = self
            .client
            .get(self.endpoint("sprucekit-nonce"))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let mut message = SignInMessage::new(
            self.domain.clone(),
            self.wallet.address(),
            self.origin.clone(),
            self.config.chain_id.clone(),
            nonce,
        );
        if let Some(statement) = &self.config.statement {
            message = message.with_statement(statement.clone());
        }
        let siwe = message.to_string();
        let signature = self.wallet.sign_message(&siwe)?;

        let request = LoginRequest {
            siwe: Some(siwe),
            signature: Some(signature),
            dao_login: None,
            resolve_ens: Some(self.config.resolve_ens),
            resolve_lens: Some(self.config.resolve_lens),
        };

        let result: LoginResult = self
            .client
            .post(self.endpoint("sprucekit-login"))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !result.success {
            let reason = result
                .error
                .map(|e| format!("{}: {}", e.kind, e.message))
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(ClientError::SignInRejected(reason));
        }
        let session = result
            .session
            .ok_or_else(|| ClientError::SignInRejected("no session in response".to_string()))?;

        if let Some(options) = &self.config.storage {
            let store = self
                .object_store
                .clone()
                .ok_or(ClientError::StorageNotConfigured)?;
            let storage = Storage::connect(store, options, &session.address).await?;
            self.credentials = Some(Credentials::new(storage.clone()));
            self.storage = Some(storage);
        }

        tracing::info!(address = %session.address, "Signed in");
        self.session = Some(session.clone());
        Ok(session)
    }

    /// End the server session; returns the server's `success` flag
    pub async fn sign_out(&self) -> Result<bool, ClientError> {
        let response: LogoutResponse = self
            .client
            .post(self.endpoint("sprucekit-logout"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.success)
    }

    /// Signed-in address
    pub fn address(&self) -> Option<String> {
        self.session.as_ref().map(|s| s.address.clone())
    }

    pub fn chain_id(&self) -> &str {
        &self.config.chain_id
    }

    pub fn session(&self) -> Option<&SessionInfo> {
        self.session.as_ref()
    }

    pub fn storage(&self) -> Option<&Storage> {
        self.storage.as_ref()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn signer(&self) -> &dyn WalletSigner {
        self.wallet.as_ref()
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

impl std::fmt::Debug for SpruceKit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpruceKit")
            .field("host", &self.host)
            .field("domain", &self.domain)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LocalWallet;

    #[test]
    fn test_domain_and_origin_from_host() {
        let provider = SpruceKit::new(
            ProviderConfig::new("http://localhost:3000/api/"),
            Arc::new(LocalWallet::random()),
        )
        .unwrap();

        assert_eq!(provider.domain, "localhost:3000");
        assert_eq!(provider.origin, "http://localhost:3000");
        assert_eq!(
            provider.endpoint("sprucekit-nonce"),
            "http://localhost:3000/api/sprucekit-nonce"
        );
        assert!(provider.address().is_none());
    }

    #[test]
    fn test_invalid_host() {
        let err = SpruceKit::new(ProviderConfig::new("not a url"), Arc::new(LocalWallet::random()))
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::InvalidHost(_)));
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: ProviderConfig = serde_json::from_str(
            r#"{"serverHost":"https://app.example/api","storage":{"prefix":"my-app","autoCreateNewOrbit":true}}"#,
        )
        .unwrap();
        assert_eq!(config.chain_id, "1");
        let storage = config.storage.unwrap();
        assert_eq!(storage.prefix, "my-app");
        assert!(storage.auto_create_new_orbit);
        assert!(storage.hosts.is_empty());
    }
}

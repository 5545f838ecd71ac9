//! Client session controller
//!
//! Owns at most one live provider. Children read it through [`SessionController::provider`].

use std::sync::Arc;
use tokio::task::JoinHandle;

use super::provider::{ProviderConfig, SpruceKit};
use super::storage::ObjectStore;
use super::wallet::WalletSigner;
use super::ClientError;

pub struct SessionController {
    config: ProviderConfig,
    wallet: Arc<dyn WalletSigner>,
    object_store: Option<Arc<dyn ObjectStore>>,
    provider: Option<SpruceKit>,
}

impl SessionController {
    pub fn new(config: ProviderConfig, wallet: Arc<dyn WalletSigner>) -> Self {
        Self {
            config,
            wallet,
            object_store: None,
            provider: None,
        }
    }

    pub fn with_object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    /// Build a provider and sign in with it
    ///
    /// The provider is kept only when sign-in succeeds; on error the current
    /// slot is left as it was.
    pub async fn sign_in(&mut self) -> Result<(), ClientError> {
        let mut provider = SpruceKit::new(self.config.clone(), self.wallet.clone())?;
        if let Some(store) = &self.object_store {
            provider = provider.with_object_store(store.clone());
        }

        provider.sign_in().await?;
        self.provider = Some(provider);
        Ok(())
    }

    /// Drop the provider and end its server session in the background
    ///
    /// The slot is cleared before the logout request completes. Returns the
    /// task handle, or `None` when nobody was signed in.
    pub fn sign_out(&mut self) -> Option<JoinHandle<()>> {
        let provider = self.provider.take()?;

        Some(tokio::spawn(async move {
            match provider.sign_out().await {
                Ok(true) => tracing::debug!("Server session ended"),
                Ok(false) => tracing::warn!("Server refused to end session"),
                Err(e) => tracing::error!(error = %e, "Sign-out request failed"),
            }
        }))
    }

    /// Signed-in address, or an empty string
    pub fn address(&self) -> String {
        self.provider
            .as_ref()
            .and_then(SpruceKit::address)
            .unwrap_or_default()
    }

    pub fn provider(&self) -> Option<&SpruceKit> {
        self.provider.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.provider.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LocalWallet;

    fn controller(host: &str) -> SessionController {
        SessionController::new(ProviderConfig::new(host), Arc::new(LocalWallet::random()))
    }

    #[tokio::test]
    async fn test_signed_out_by_default() {
        let mut controller = controller("http://127.0.0.1:9/api");
        assert_eq!(controller.address(), "");
        assert!(controller.provider().is_none());
        assert!(controller.sign_out().is_none());
    }

    #[tokio::test]
    async fn test_failed_sign_in_leaves_slot_empty() {
        let mut controller = controller("not a url");
        assert!(matches!(
            controller.sign_in().await,
            Err(ClientError::InvalidHost(_))
        ));
        assert!(!controller.is_signed_in());
    }
}

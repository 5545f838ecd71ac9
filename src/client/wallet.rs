//! Wallet signers

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signer, SigningKey};
use sha2::{Digest, Sha256};

use crate::auth::encode_account_address;

use super::ClientError;

/// Something that controls an account and can sign messages for it
pub trait WalletSigner: Send + Sync {
    /// Account address (`G...`)
    fn address(&self) -> String;

    /// Base64 signature over the exact message text
    fn sign_message(&self, message: &str) -> Result<String, ClientError>;
}

/// In-process ed25519 wallet
pub struct LocalWallet {
    key: SigningKey,
}

impl LocalWallet {
    /// Fresh random key
    pub fn random() -> Self {
        Self {
            key: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    pub fn from_secret_bytes(secret: [u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(&secret),
        }
    }

    /// Deterministic key derived from a passphrase, for fixtures and demos
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest: [u8; 32] = Sha256::digest(passphrase.as_bytes()).into();
        Self::from_secret_bytes(digest)
    }
}

impl WalletSigner for LocalWallet {
    fn address(&self) -> String {
        encode_account_address(&self.key.verifying_key().to_bytes())
    }

    fn sign_message(&self, message: &str) -> Result<String, ClientError> {
        Ok(STANDARD.encode(self.key.sign(message.as_bytes()).to_bytes()))
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

//! Client-side errors

use thiserror::Error;

use super::storage::StorageError;

/// Errors raised by the session provider and its modules
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid server host: {0}")]
    InvalidHost(String),

    #[error("Sign-in rejected: {0}")]
    SignInRejected(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Storage module is not configured")]
    StorageNotConfigured,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Witness service error: {0}")]
    Witness(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

//! Client side of the session flow
//!
//! [`SessionController`] owns the live [`SpruceKit`] provider; storage,
//! credentials and issuance hang off the provider once signed in.

pub mod controller;
pub mod credentials;
pub mod error;
pub mod issuer;
pub mod provider;
pub mod storage;
pub mod wallet;
pub mod witness;

pub use controller::SessionController;
pub use credentials::{load_credentials, to_credential_entry, CredentialEntry, Credentials};
pub use error::ClientError;
pub use issuer::{CredentialIssuer, BASIC_POST_TYPE};
pub use provider::{ProviderConfig, SpruceKit};
pub use storage::{ListOptions, MemoryStore, ObjectStore, Storage, StorageError, StorageOptions};
pub use wallet::{LocalWallet, WalletSigner};
pub use witness::{subject_for, WitnessClient, WitnessEndpoints, DEFAULT_WITNESS_URL};

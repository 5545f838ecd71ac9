//! Authentication module
//!
//! Provides wallet-based sign-in for the session endpoints.
//! - Single-use nonces
//! - Sign-in message parsing and ed25519 signature verification
//! - Session tokens signed with the process-wide signing key

mod crypto;
mod jwt;
mod message;
mod resolver;
mod service;

pub use crypto::{decode_account_address, encode_account_address, verify_wallet_signature, CryptoError};
pub use jwt::{verify_session_token, SessionClaims};
pub use message::{MessageError, SignInMessage};
pub use resolver::{IdentityResolver, NoopResolver};
pub use service::{AuthError, AuthService};

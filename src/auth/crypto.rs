//! Wallet signature verification
//!
//! Accounts are ed25519 public keys in Stellar strkey form (`G...`). A signature
//! is the base64 ed25519 signature over the exact sign-in message text.

use base32::Alphabet;
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

/// Strkey version byte for ed25519 account ids (renders as a leading 'G')
const ACCOUNT_ID_VERSION: u8 = 6 << 3;

/// Errors that can occur during signature verification
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid account address format: {0}")]
    InvalidAddressFormat(String),

    #[error("Invalid address checksum")]
    InvalidChecksum,

    #[error("Invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    #[error("Signature verification failed")]
    VerificationFailed,

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
}

/// Verify a wallet signature over `message`
///
/// # Arguments
/// * `address` - account address (e.g., "GABC...")
/// * `message` - the exact text that was signed
/// * `signature_base64` - base64-encoded ed25519 signature
pub fn verify_wallet_signature(
    address: &str,
    message: &str,
    signature_base64: &str,
) -> Result<(), CryptoError> {
    let public_key_bytes = decode_account_address(address)?;

    let signature_bytes = decode_signature(signature_base64)?;

    let signature = Signature::from_slice(&signature_bytes)
        .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))?;

    let verifying_key = VerifyingKey::from_bytes(&public_key_bytes)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;

    verifying_key
        .verify(message.as_bytes(), &signature)
        .map_err(|_| CryptoError::VerificationFailed)
}

/// Decode an account address into its 32-byte ed25519 public key
///
/// Addresses are base32-encoded with a version byte prefix
/// and a 2-byte CRC16 checksum at the end.
pub fn decode_account_address(address: &str) -> Result<[u8; 32], CryptoError> {
    if !address.starts_with('G') {
        return Err(CryptoError::InvalidAddressFormat(
            "Account addresses must start with 'G'".to_string(),
        ));
    }

    let decoded = base32::decode(Alphabet::Rfc4648 { padding: false }, address)
        .ok_or_else(|| CryptoError::InvalidAddressFormat("Invalid base32 encoding".to_string()))?;

    // 1 version byte + 32 key bytes + 2 checksum bytes
    if decoded.len() != 35 {
        return Err(CryptoError::InvalidAddressFormat(format!(
            "Expected 35 bytes, got {}",
            decoded.len()
        )));
    }

    if decoded[0] != ACCOUNT_ID_VERSION {
        return Err(CryptoError::InvalidAddressFormat(format!(
            "Unexpected version byte {:#04x}",
            decoded[0]
        )));
    }

    let payload = &decoded[..33];
    let checksum = &decoded[33..35];
    if checksum != crc16_xmodem(payload) {
        return Err(CryptoError::InvalidChecksum);
    }

    let mut public_key = [0u8; 32];
    public_key.copy_from_slice(&decoded[1..33]);

    Ok(public_key)
}

/// Encode a 32-byte ed25519 public key as an account address
pub fn encode_account_address(public_key: &[u8; 32]) -> String {
    let mut payload = Vec::with_capacity(35);
    payload.push(ACCOUNT_ID_VERSION);
    payload.extend_from_slice(public_key);
    let checksum = crc16_xmodem(&payload);
    payload.extend_from_slice(&checksum);

    base32::encode(Alphabet::Rfc4648 { padding: false }, &payload)
}

/// Calculate CRC16-XModem checksum, little-endian
fn crc16_xmodem(data: &[u8]) -> [u8; 2] {
    let mut crc: u16 = 0;

    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }

    [(crc & 0xff) as u8, (crc >> 8) as u8]
}

/// Wallets differ on padding and alphabet, so accept standard and URL-safe forms.
fn decode_signature(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    let trimmed = encoded.trim();
    STANDARD
        .decode(trimmed)
        .or_else(|_| URL_SAFE_NO_PAD.decode(trimmed.trim_end_matches('=')))
        .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn test_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    #[test]
    fn test_decode_account_address() {
        let address = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7";
        assert!(decode_account_address(address).is_ok());
    }

    #[test]
    fn test_invalid_address_prefix() {
        let address = "SAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7";
        let result = decode_account_address(address);
        assert!(matches!(result, Err(CryptoError::InvalidAddressFormat(_))));
    }

    #[test]
    fn test_corrupted_checksum() {
        let address = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN6";
        assert!(decode_account_address(address).is_err());
    }

    #[test]
    fn test_encoded_address_decodes_to_same_key() {
        let key = test_key();
        let public = key.verifying_key().to_bytes();
        let address = encode_account_address(&public);

        assert!(address.starts_with('G'));
        assert_eq!(address.len(), 56);
        assert_eq!(decode_account_address(&address).unwrap(), public);
    }

    #[test]
    fn test_verify_wallet_signature() {
        let key = test_key();
        let address = encode_account_address(&key.verifying_key().to_bytes());
        let message = "localhost wants you to sign in";
        let signature = STANDARD.encode(key.sign(message.as_bytes()).to_bytes());

        assert!(verify_wallet_signature(&address, message, &signature).is_ok());
        assert!(matches!(
            verify_wallet_signature(&address, "tampered", &signature),
            Err(CryptoError::VerificationFailed)
        ));
    }

    #[test]
    fn test_url_safe_signature_accepted() {
        let key = test_key();
        let address = encode_account_address(&key.verifying_key().to_bytes());
        let signature = URL_SAFE_NO_PAD.encode(key.sign(b"hello").to_bytes());

        assert!(verify_wallet_signature(&address, "hello", &signature).is_ok());
    }

    #[test]
    fn test_garbage_signature() {
        let key = test_key();
        let address = encode_account_address(&key.verifying_key().to_bytes());
        assert!(matches!(
            verify_wallet_signature(&address, "hello", "not base64!!"),
            Err(CryptoError::InvalidSignatureFormat(_))
        ));
    }
}

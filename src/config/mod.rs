//! Configuration management for the SpruceKit session server
//!
//! This module handles loading and validating configuration from environment variables,
//! with support for different environments (development, staging, production).

use std::env;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Current environment
    pub environment: Environment,

    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Key used to sign session tokens (`SPRUCE_KIT_SIGNING_KEY`)
    pub signing_key: String,

    /// True when no signing key was configured and one was generated for this process
    pub signing_key_generated: bool,

    /// Domain every sign-in message must carry, if set
    pub sign_in_domain: Option<String>,

    /// Nonce TTL in seconds (default: 300 = 5 minutes)
    pub nonce_ttl_seconds: i64,

    /// Session TTL in seconds (default: 86400 = 1 day)
    pub session_ttl_seconds: i64,

    /// Rate limit: requests per second per client
    pub rate_limit_rps: u32,

    /// CORS allowed origins
    pub cors_allowed_origins: Option<String>,

    /// Log level (RUST_LOG)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .map(|s| Environment::parse(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let (signing_key, signing_key_generated) =
            match env::var("SPRUCE_KIT_SIGNING_KEY").ok().filter(|k| !k.is_empty()) {
                Some(key) => (key, false),
                None if environment.is_production() => {
                    return Err(ConfigError::MissingEnvVar(
                        "SPRUCE_KIT_SIGNING_KEY".to_string(),
                    ))
                }
                None => (generate_signing_key(), true),
            };

        let sign_in_domain = env::var("SIGN_IN_DOMAIN").ok().filter(|d| !d.is_empty());

        let nonce_ttl_seconds = env::var("AUTH_NONCE_TTL_SECONDS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<i64>()
            .unwrap_or(300);

        let session_ttl_seconds = env::var("SESSION_TTL_SECONDS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse::<i64>()
            .unwrap_or(86400);

        let rate_limit_rps = parse_rate_limit(env::var("RATE_LIMIT_RPS").ok())?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS").ok();

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Config {
            environment,
            host,
            port,
            signing_key,
            signing_key_generated,
            sign_in_domain,
            nonce_ttl_seconds,
            session_ttl_seconds,
            rate_limit_rps,
            cors_allowed_origins,
            log_level,
        })
    }

    /// Whether cookies should carry the `Secure` attribute
    pub fn secure_cookies(&self) -> bool {
        self.environment.is_production()
    }
}

/// Random 32-byte hex key for processes started without `SPRUCE_KIT_SIGNING_KEY`
/// Requests per second per client; zero would reject every request
fn parse_rate_limit(value: Option<String>) -> Result<u32, ConfigError> {
    let rps = value
        .unwrap_or_else(|| "100".to_string())
        .parse::<u32>()
        .unwrap_or(100);

    if rps == 0 {
        return Err(ConfigError::InvalidValue(
            "RATE_LIMIT_RPS must be greater than zero".to_string(),
        ));
    }
    Ok(rps)
}

fn generate_signing_key() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

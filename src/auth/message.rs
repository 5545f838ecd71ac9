//! Sign-in message format
//!
//! EIP-4361 style text that a wallet signs to prove control of an account.
//! The signature always covers the exact text, so verification works on the
//! raw string and parsing only extracts the fields the policy checks.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const HEADER_SUFFIX: &str = " wants you to sign in with your Stellar account:";
const URI_TAG: &str = "URI: ";
const VERSION_TAG: &str = "Version: ";
const CHAIN_TAG: &str = "Chain ID: ";
const NONCE_TAG: &str = "Nonce: ";
const ISSUED_AT_TAG: &str = "Issued At: ";
const EXPIRATION_TAG: &str = "Expiration Time: ";
const NOT_BEFORE_TAG: &str = "Not Before: ";
const REQUEST_ID_TAG: &str = "Request ID: ";
const RESOURCES_TAG: &str = "Resources:";

/// Errors raised while parsing a sign-in message
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MessageError {
    #[error("Message is missing the {0} line")]
    MissingField(&'static str),

    #[error("Malformed {field} line: {value}")]
    Malformed { field: &'static str, value: String },

    #[error("Unsupported message version: {0}")]
    UnsupportedVersion(String),

    #[error("Invalid timestamp in {field}: {value}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("Nonce must be at least 8 alphanumeric characters")]
    InvalidNonce,
}

/// A parsed sign-in message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInMessage {
    pub domain: String,
    pub address: String,
    pub statement: Option<String>,
    pub uri: String,
    pub version: String,
    pub chain_id: String,
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
    pub expiration_time: Option<DateTime<Utc>>,
    pub not_before: Option<DateTime<Utc>>,
    pub request_id: Option<String>,
    pub resources: Vec<String>,
}

impl SignInMessage {
    /// Build a version 1 message issued now
    pub fn new(
        domain: impl Into<String>,
        address: impl Into<String>,
        uri: impl Into<String>,
        chain_id: impl Into<String>,
        nonce: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            address: address.into(),
            statement: None,
            uri: uri.into(),
            version: "1".to_string(),
            chain_id: chain_id.into(),
            nonce: nonce.into(),
            issued_at: Utc::now(),
            expiration_time: None,
            not_before: None,
            request_id: None,
            resources: Vec::new(),
        }
    }

    pub fn with_statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = Some(statement.into());
        self
    }

    pub fn with_expiration_time(mut self, expiration_time: DateTime<Utc>) -> Self {
        self.expiration_time = Some(expiration_time);
        self
    }

    /// Check the time bounds against `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let not_expired = self.expiration_time.map_or(true, |exp| now < exp);
        let started = self.not_before.map_or(true, |nbf| now >= nbf);
        not_expired && started
    }
}

fn format_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_time(field: &'static str, value: &str) -> Result<DateTime<Utc>, MessageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| MessageError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })
}

impl fmt::Display for SignInMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}{}", self.domain, HEADER_SUFFIX)?;
        writeln!(f, "{}", self.address)?;
        writeln!(f)?;
        if let Some(statement) = &self.statement {
            writeln!(f, "{}", statement)?;
            writeln!(f)?;
        }
        writeln!(f, "{}{}", URI_TAG, self.uri)?;
        writeln!(f, "{}{}", VERSION_TAG, self.version)?;
        writeln!(f, "{}{}", CHAIN_TAG, self.chain_id)?;
        writeln!(f, "{}{}", NONCE_TAG, self.nonce)?;
        write!(f, "{}{}", ISSUED_AT_TAG, format_time(&self.issued_at))?;
        if let Some(exp) = &self.expiration_time {
            write!(f, "\n{}{}", EXPIRATION_TAG, format_time(exp))?;
        }
        if let Some(nbf) = &self.not_before {
            write!(f, "\n{}{}", NOT_BEFORE_TAG, format_time(nbf))?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, "\n{}{}", REQUEST_ID_TAG, request_id)?;
        }
        if !self.resources.is_empty() {
            write!(f, "\n{}", RESOURCES_TAG)?;
            for resource in &self.resources {
                write!(f, "\n- {}", resource)?;
            }
        }
        Ok(())
    }
}

/// Line cursor over the message body
struct Lines<'a> {
    inner: std::iter::Peekable<std::str::Lines<'a>>,
}

impl<'a> Lines<'a> {
    fn next_line(&mut self, field: &'static str) -> Result<&'a str, MessageError> {
        self.inner.next().ok_or(MessageError::MissingField(field))
    }

    fn tagged(&mut self, tag: &str, field: &'static str) -> Result<&'a str, MessageError> {
        let line = self.next_line(field)?;
        line.strip_prefix(tag).ok_or(MessageError::Malformed {
            field,
            value: line.to_string(),
        })
    }

    fn optional_tagged(&mut self, tag: &str) -> Option<&'a str> {
        let line: &'a str = *self.inner.peek()?;
        let value = line.strip_prefix(tag)?;
        self.inner.next();
        Some(value)
    }
}

impl FromStr for SignInMessage {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = Lines {
            inner: s.lines().peekable(),
        };

        let header = lines.next_line("header")?;
        let domain = header
            .strip_suffix(HEADER_SUFFIX)
            .filter(|d| !d.is_empty())
            .ok_or(MessageError::Malformed {
                field: "header",
                value: header.to_string(),
            })?
            .to_string();

        let address = lines.next_line("address")?.to_string();

        if !lines.next_line("blank line")?.is_empty() {
            return Err(MessageError::Malformed {
                field: "blank line",
                value: "expected an empty line after the address".to_string(),
            });
        }

        let upcoming: Option<&str> = lines.inner.peek().copied();
        let statement = match upcoming {
            Some(line) if line.starts_with(URI_TAG) => None,
            Some(_) => {
                let statement = lines.next_line("statement")?.to_string();
                if !lines.next_line("blank line")?.is_empty() {
                    return Err(MessageError::Malformed {
                        field: "statement",
                        value: "statements must be a single line".to_string(),
                    });
                }
                Some(statement)
            }
            None => return Err(MessageError::MissingField("URI")),
        };

        let uri = lines.tagged(URI_TAG, "URI")?.to_string();

        let version = lines.tagged(VERSION_TAG, "Version")?.to_string();
        if version != "1" {
            return Err(MessageError::UnsupportedVersion(version));
        }

        let chain_id = lines.tagged(CHAIN_TAG, "Chain ID")?.to_string();

        let nonce = lines.tagged(NONCE_TAG, "Nonce")?.to_string();
        if nonce.len() < 8 || !nonce.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(MessageError::InvalidNonce);
        }

        let issued_at = parse_time("Issued At", lines.tagged(ISSUED_AT_TAG, "Issued At")?)?;

        let expiration_time = lines
            .optional_tagged(EXPIRATION_TAG)
            .map(|v| parse_time("Expiration Time", v))
            .transpose()?;
        let not_before = lines
            .optional_tagged(NOT_BEFORE_TAG)
            .map(|v| parse_time("Not Before", v))
            .transpose()?;
        let request_id = lines.optional_tagged(REQUEST_ID_TAG).map(str::to_string);

        let mut resources = Vec::new();
        if lines.optional_tagged(RESOURCES_TAG).is_some() {
            while let Some(resource) = lines.optional_tagged("- ") {
                resources.push(resource.to_string());
            }
        }

        if let Some(extra) = lines.inner.next() {
            return Err(MessageError::Malformed {
                field: "trailer",
                value: extra.to_string(),
            });
        }

        Ok(SignInMessage {
            domain,
            address,
            statement,
            uri,
            version,
            chain_id,
            nonce,
            issued_at,
            expiration_time,
            not_before,
            request_id,
            resources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const ADDRESS: &str = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7";

    fn sample() -> SignInMessage {
        SignInMessage::new(
            "localhost:3000",
            ADDRESS,
            "http://localhost:3000",
            "1",
            "a1b2c3d4e5f60718",
        )
    }

    #[test]
    fn test_parse_rendered_message() {
        let mut message = sample().with_statement("Sign in to my-app");
        message.request_id = Some("req-1".to_string());
        message.resources = vec!["https://example.com/a".to_string()];

        let text = message.to_string();
        assert!(text.starts_with(
            "localhost:3000 wants you to sign in with your Stellar account:\n"
        ));

        let parsed: SignInMessage = text.parse().unwrap();
        assert_eq!(parsed.domain, "localhost:3000");
        assert_eq!(parsed.address, ADDRESS);
        assert_eq!(parsed.statement.as_deref(), Some("Sign in to my-app"));
        assert_eq!(parsed.nonce, "a1b2c3d4e5f60718");
        assert_eq!(parsed.request_id.as_deref(), Some("req-1"));
        assert_eq!(parsed.resources, vec!["https://example.com/a".to_string()]);
    }

    #[test]
    fn test_parse_without_statement() {
        let text = sample().to_string();
        let parsed: SignInMessage = text.parse().unwrap();
        assert_eq!(parsed.statement, None);
        assert_eq!(parsed.uri, "http://localhost:3000");
    }

    #[test]
    fn test_missing_nonce_line() {
        let text = sample().to_string().replace("Nonce: a1b2c3d4e5f60718\n", "");
        let err = text.parse::<SignInMessage>().unwrap_err();
        assert!(matches!(err, MessageError::Malformed { field: "Nonce", .. }));
    }

    #[test]
    fn test_short_nonce_rejected() {
        let mut message = sample();
        message.nonce = "abc".to_string();
        assert_eq!(
            message.to_string().parse::<SignInMessage>().unwrap_err(),
            MessageError::InvalidNonce
        );
    }

    #[test]
    fn test_wrong_header() {
        let err = "hello\nworld".parse::<SignInMessage>().unwrap_err();
        assert!(matches!(err, MessageError::Malformed { field: "header", .. }));
    }

    #[test]
    fn test_time_bounds() {
        let now = Utc::now();
        let message = sample().with_expiration_time(now + Duration::minutes(5));
        assert!(message.is_valid_at(now));
        assert!(!message.is_valid_at(now + Duration::minutes(6)));
    }
}

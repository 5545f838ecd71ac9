//! Credential witness service client
//!
//! The witness turns a self-issued claim into a signed credential in two
//! rounds: it first returns a statement for the wallet to sign, then trades
//! the signature for a credential JWT.

use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::ClientError;

/// Public witness deployment used when none is configured
pub const DEFAULT_WITNESS_URL: &str = "https://rebasedemo.spruceid.workers.dev";

/// Witness proof flavour for claims the subject makes about itself
const SELF_ISSUED: &str = "WitnessedSelfIssued";

/// Witness service endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessEndpoints {
    pub instructions: String,
    pub statement: String,
    pub witness: String,
    pub verify: String,
}

impl WitnessEndpoints {
    pub fn from_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            instructions: format!("{}/instructions", base),
            statement: format!("{}/statement", base),
            witness: format!("{}/witness", base),
            verify: format!("{}/verify", base),
        }
    }
}

impl Default for WitnessEndpoints {
    fn default() -> Self {
        Self::from_base(DEFAULT_WITNESS_URL)
    }
}

/// Credential subject naming an account on a chain
pub fn subject_for(address: &str, chain_id: &str) -> Value {
    json!({
        "pkh": {
            "stellar": {
                "address": address,
                "chain_id": chain_id,
            }
        }
    })
}

/// `{ "subject": subject, ...content }`
fn claim_body(subject: &Value, content: &Map<String, Value>) -> Value {
    let mut body = Map::new();
    body.insert("subject".to_string(), subject.clone());
    body.extend(content.iter().map(|(k, v)| (k.clone(), v.clone())));
    Value::Object(body)
}

#[derive(Debug, Clone)]
pub struct WitnessClient {
    client: Client,
    endpoints: WitnessEndpoints,
}

impl WitnessClient {
    pub fn new(endpoints: WitnessEndpoints) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &WitnessEndpoints {
        &self.endpoints
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value, ClientError> {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::Witness(format!("{} returned {}: {}", url, status, text)));
        }
        Ok(response.json().await?)
    }

    /// Human-readable instructions for a credential type
    pub async fn instructions(&self, credential_type: &str) -> Result<Value, ClientError> {
        self.post(&self.endpoints.instructions, &json!({ "type": credential_type }))
            .await
    }

    /// Statement the subject must sign for this claim
    pub async fn statement(
        &self,
        credential_type: &str,
        subject: &Value,
        content: &Map<String, Value>,
    ) -> Result<String, ClientError> {
        let request = json!({
            "opts": {
                SELF_ISSUED: { credential_type: claim_body(subject, content) }
            }
        });

        let body = self.post(&self.endpoints.statement, &request).await?;
        body.get("statement")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ClientError::Witness("No statement found in witness response".to_string()))
    }

    /// Trade a signed statement for a credential JWT
    pub async fn witness(
        &self,
        credential_type: &str,
        subject: &Value,
        content: &Map<String, Value>,
        signature: &str,
    ) -> Result<String, ClientError> {
        let request = json!({
            "proof": {
                SELF_ISSUED: {
                    credential_type: {
                        "signature": signature,
                        "statement": claim_body(subject, content),
                    }
                }
            }
        });

        let body = self.post(&self.endpoints.witness, &request).await?;
        body.get("jwt")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ClientError::Witness("No jwt found in witness response".to_string()))
    }

    /// Ask the witness whether it stands behind a credential
    pub async fn verify(&self, jwt: &str) -> Result<bool, ClientError> {
        let response = self
            .client
            .post(&self.endpoints.verify)
            .json(&json!({ "jwt": jwt }))
            .send()
            .await?;
        Ok(response.status().is_success())
    }
}

impl Default for WitnessClient {
    fn default() -> Self {
        Self::new(WitnessEndpoints::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_from_base() {
        let endpoints = WitnessEndpoints::from_base("http://localhost:8787/");
        assert_eq!(endpoints.statement, "http://localhost:8787/statement");
        assert_eq!(endpoints.witness, "http://localhost:8787/witness");
        assert_eq!(endpoints.verify, "http://localhost:8787/verify");
        assert_eq!(endpoints.instructions, "http://localhost:8787/instructions");
    }

    #[test]
    fn test_claim_body_puts_subject_first() {
        let subject = subject_for("GABC", "1");
        let mut content = Map::new();
        content.insert("title".to_string(), json!("hello"));

        let body = claim_body(&subject, &content);
        assert_eq!(body["subject"]["pkh"]["stellar"]["address"], "GABC");
        assert_eq!(body["subject"]["pkh"]["stellar"]["chain_id"], "1");
        assert_eq!(body["title"], "hello");
    }
}

//! Witnessed credential issuance
//!
//! Issues basic posts through the witness service and keeps the resulting
//! credentials in the provider's storage under `credentials/`.

use chrono::Utc;
use serde_json::{Map, Value};

use super::credentials::to_credential_entry;
use super::provider::SpruceKit;
use super::storage::{ListOptions, Storage};
use super::witness::{subject_for, WitnessClient};
use super::ClientError;

/// Credential type issued for title/body posts
pub const BASIC_POST_TYPE: &str = "WitnessedBasicPost";

pub struct CredentialIssuer<'a> {
    provider: &'a SpruceKit,
    witness: WitnessClient,
    credential_list: Vec<String>,
}

impl<'a> CredentialIssuer<'a> {
    pub fn new(provider: &'a SpruceKit, witness: WitnessClient) -> Self {
        Self {
            provider,
            witness,
            credential_list: Vec::new(),
        }
    }

    /// Full keys of the credentials this issuer knows about
    pub fn credential_list(&self) -> &[String] {
        &self.credential_list
    }

    fn storage(&self) -> Result<&'a Storage, ClientError> {
        self.provider.storage().ok_or(ClientError::StorageNotConfigured)
    }

    /// Reload the list from storage; failures keep the current list
    pub async fn refresh(&mut self) {
        let storage = match self.storage() {
            Ok(storage) => storage,
            Err(e) => {
                tracing::error!(error = %e, "Cannot list credentials");
                return;
            }
        };

        match storage.list(ListOptions::default()).await {
            Ok(keys) => {
                self.credential_list = keys
                    .into_iter()
                    .filter(|k| k.contains("/credentials/"))
                    .collect();
            }
            Err(e) => tracing::error!(error = %e, "Error fetching credentials"),
        }
    }

    /// Witness a post and store the credential; returns its full key
    ///
    /// Keys are `credentials/post_<unix millis>`, so a second post issued in
    /// the same millisecond overwrites the first.
    pub async fn issue(&mut self, title: &str, body: &str) -> Result<String, ClientError> {
        let storage = self.storage()?;
        let address = self.provider.address().ok_or(ClientError::NotSignedIn)?;
        let subject = subject_for(&address, self.provider.chain_id());

        let mut content = Map::new();
        content.insert("title".to_string(), Value::String(title.to_string()));
        content.insert("body".to_string(), Value::String(body.to_string()));

        let statement = self
            .witness
            .statement(BASIC_POST_TYPE, &subject, &content)
            .await?;
        let signature = self.provider.signer().sign_message(&statement)?;
        let jwt = self
            .witness
            .witness(BASIC_POST_TYPE, &subject, &content, &signature)
            .await?;

        let key = format!("credentials/post_{}", Utc::now().timestamp_millis());
        storage.put(&key, &jwt).await?;

        let entry = format!("{}/{}", storage.prefix(), key);
        tracing::info!(entry = %entry, "Credential issued");
        self.credential_list.push(entry.clone());
        Ok(entry)
    }

    /// Render a stored credential as `"<entry>:\n<json>"`
    pub async fn view(&self, entry: &str) -> Option<String> {
        let storage = self.storage().ok()?;
        let key = storage.relative_key(entry);

        let jwt = match storage.get::<String>(key).await {
            Ok(Some(jwt)) => jwt,
            Ok(None) => {
                tracing::warn!(entry = %entry, "Credential not found");
                return None;
            }
            Err(e) => {
                tracing::error!(entry = %entry, error = %e, "Error reading credential");
                return None;
            }
        };

        let rendered = to_credential_entry(&jwt)
            .and_then(|credential| Ok(serde_json::to_string_pretty(&credential)?));
        match rendered {
            Ok(json) => Some(format!("{}:\n{}", entry, json)),
            Err(e) => {
                tracing::error!(entry = %entry, error = %e, "Error decoding credential");
                None
            }
        }
    }

    pub async fn delete(&mut self, entry: &str) -> Result<(), ClientError> {
        let storage = self.storage()?;
        storage.delete(storage.relative_key(entry)).await?;
        self.credential_list.retain(|e| e != entry);
        Ok(())
    }
}

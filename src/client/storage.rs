//! Object storage module
//!
//! Values are JSON-serialized and kept under `<prefix>/<key>` in a namespace
//! owned by the signed-in account. The backing network is reached through
//! [`ObjectStore`]; [`MemoryStore`] keeps everything in process.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Namespace not found: {0}")]
    NamespaceNotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Value is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage module options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageOptions {
    /// Path prefix every key lives under, e.g. `my-app`
    pub prefix: String,
    /// Storage hosts the backend may use
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Create the owner's namespace on first connect
    #[serde(default)]
    pub auto_create_new_orbit: bool,
}

/// Options for [`Storage::list`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    /// Return keys relative to the prefix
    pub remove_prefix: bool,
}

/// Backend seam for the storage network
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn namespace_exists(&self, namespace: &str) -> Result<bool, StorageError>;

    async fn create_namespace(&self, namespace: &str) -> Result<(), StorageError>;

    /// Keys in `namespace` starting with `prefix`, in key order
    async fn list(&self, namespace: &str, prefix: &str) -> Result<Vec<String>, StorageError>;

    async fn put(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Returns whether a value was removed
    async fn delete(&self, namespace: &str, key: &str) -> Result<bool, StorageError>;
}

/// In-process object store
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: RwLock<HashMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn namespace_exists(&self, namespace: &str) -> Result<bool, StorageError> {
        Ok(self.namespaces.read().await.contains_key(namespace))
    }

    async fn create_namespace(&self, namespace: &str) -> Result<(), StorageError> {
        self.namespaces
            .write()
            .await
            .entry(namespace.to_string())
            .or_default();
        Ok(())
    }

    async fn list(&self, namespace: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        let namespaces = self.namespaces.read().await;
        let objects = namespaces
            .get(namespace)
            .ok_or_else(|| StorageError::NamespaceNotFound(namespace.to_string()))?;

        Ok(objects
            .range(prefix.to_string()..)
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn put(&self, namespace: &str, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let mut namespaces = self.namespaces.write().await;
        namespaces
            .get_mut(namespace)
            .ok_or_else(|| StorageError::NamespaceNotFound(namespace.to_string()))?
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let namespaces = self.namespaces.read().await;
        Ok(namespaces
            .get(namespace)
            .ok_or_else(|| StorageError::NamespaceNotFound(namespace.to_string()))?
            .get(key)
            .cloned())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool, StorageError> {
        let mut namespaces = self.namespaces.write().await;
        Ok(namespaces
            .get_mut(namespace)
            .ok_or_else(|| StorageError::NamespaceNotFound(namespace.to_string()))?
            .remove(key)
            .is_some())
    }
}

/// Storage module bound to one owner and prefix
#[derive(Clone)]
pub struct Storage {
    store: Arc<dyn ObjectStore>,
    namespace: String,
    prefix: String,
    hosts: Vec<String>,
}

impl Storage {
    /// Attach to the owner's namespace, creating it when allowed
    pub async fn connect(
        store: Arc<dyn ObjectStore>,
        options: &StorageOptions,
        owner: &str,
    ) -> Result<Self, StorageError> {
        let namespace = format!("{}/default", owner);

        if !store.namespace_exists(&namespace).await? {
            if !options.auto_create_new_orbit {
                return Err(StorageError::NamespaceNotFound(namespace));
            }
            store.create_namespace(&namespace).await?;
            tracing::info!(namespace = %namespace, "Created storage namespace");
        }

        tracing::debug!(namespace = %namespace, hosts = ?options.hosts, "Storage connected");

        Ok(Self {
            store,
            namespace,
            prefix: options.prefix.trim_end_matches('/').to_string(),
            hosts: options.hosts.clone(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}/{}", self.prefix, key.trim_start_matches('/'))
    }

    /// Strip `<prefix>/` from a full key, leaving other strings untouched
    pub fn relative_key<'k>(&self, key: &'k str) -> &'k str {
        key.strip_prefix(&self.prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(key)
    }

    /// Keys under the prefix
    pub async fn list(&self, options: ListOptions) -> Result<Vec<String>, StorageError> {
        let keys = self
            .store
            .list(&self.namespace, &format!("{}/", self.prefix))
            .await?;

        if options.remove_prefix {
            Ok(keys.iter().map(|k| self.relative_key(k).to_string()).collect())
        } else {
            Ok(keys)
        }
    }

    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(value)?;
        self.store.put(&self.namespace, &self.full_key(key), bytes).await
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.store.get(&self.namespace, &self.full_key(key)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.store.delete(&self.namespace, &self.full_key(key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(auto_create: bool) -> StorageOptions {
        StorageOptions {
            prefix: "my-app".to_string(),
            hosts: vec!["https://storage.example".to_string()],
            auto_create_new_orbit: auto_create,
        }
    }

    #[tokio::test]
    async fn test_connect_requires_namespace_without_auto_create() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
        let err = Storage::connect(store.clone(), &options(false), "GOWNER")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, StorageError::NamespaceNotFound(_)));

        assert!(Storage::connect(store.clone(), &options(true), "GOWNER").await.is_ok());
        // Existing namespace no longer needs auto-create
        assert!(Storage::connect(store, &options(false), "GOWNER").await.is_ok());
    }

    #[tokio::test]
    async fn test_put_get_delete_under_prefix() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
        let storage = Storage::connect(store.clone(), &options(true), "GOWNER")
            .await
            .unwrap();

        storage.put("notes/a", "first").await.unwrap();
        storage.put("notes/b", &serde_json::json!({"n": 2})).await.unwrap();

        let raw = store.get("GOWNER/default", "my-app/notes/a").await.unwrap();
        assert_eq!(raw.unwrap(), b"\"first\"".to_vec());

        assert_eq!(
            storage.get::<String>("notes/a").await.unwrap().as_deref(),
            Some("first")
        );
        assert_eq!(storage.get::<String>("missing").await.unwrap(), None);

        assert!(storage.delete("notes/a").await.unwrap());
        assert!(!storage.delete("notes/a").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_prefix_handling() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
        let storage = Storage::connect(store.clone(), &options(true), "GOWNER")
            .await
            .unwrap();
        storage.put("b", &1).await.unwrap();
        storage.put("a", &2).await.unwrap();
        store
            .put("GOWNER/default", "other-app/x", b"3".to_vec())
            .await
            .unwrap();

        assert_eq!(
            storage.list(ListOptions::default()).await.unwrap(),
            vec!["my-app/a".to_string(), "my-app/b".to_string()]
        );
        assert_eq!(
            storage
                .list(ListOptions { remove_prefix: true })
                .await
                .unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_relative_key() {
        let storage = Storage {
            store: Arc::new(MemoryStore::new()),
            namespace: "ns".to_string(),
            prefix: "my-app".to_string(),
            hosts: Vec::new(),
        };
        assert_eq!(storage.relative_key("my-app/credentials/x"), "credentials/x");
        assert_eq!(storage.relative_key("credentials/x"), "credentials/x");
        assert_eq!(storage.relative_key("my-appx/y"), "my-appx/y");
    }
}

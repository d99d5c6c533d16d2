//! Store backed by a single secret in a remote secrets manager
//!
//! The whole namespace is one JSON object (`{"key": "value", ...}`) kept
//! under one secret id. The secrets manager only reads and writes the blob
//! as a whole, so writes reload it first and the local copy is only a cache
//! that is valid until the next write.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{SecureStore, StoreError};

const BACKEND: &str = "vault";

/// Error type of [`SecretsVault`] implementations
pub type VaultError = Box<dyn std::error::Error + Send + Sync>;

/// Whole-secret access to a remote secrets manager
#[async_trait]
pub trait SecretsVault: Send + Sync {
    async fn get_secret_value(&self, secret_id: &str) -> Result<String, VaultError>;

    async fn update_secret(&self, secret_id: &str, secret_string: &str) -> Result<(), VaultError>;
}

/// [`SecureStore`] over one secret of a [`SecretsVault`].
///
/// Reads are served from a cache loaded on first use. Every write drops the
/// cache and reloads the secret under the lock before changing and saving
/// it, so keys written by other processes since our last load survive.
/// Two processes writing at the same moment can still race; the last
/// reload wins.
///
/// `clear_all` is refused: the same secret may hold a signing key that must
/// never be deleted through this path.
pub struct VaultStore {
    vault: Arc<dyn SecretsVault>,
    secret_id: String,
    cache: Mutex<Option<BTreeMap<String, String>>>,
}

impl VaultStore {
    /// Connect to `secret_id` through the given vault client.
    ///
    /// The secret is read once to check that it exists and holds a JSON
    /// object; the cache still starts empty.
    pub async fn connect(
        vault: Arc<dyn SecretsVault>,
        secret_id: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let secret_id = secret_id.into();

        let blob = vault.get_secret_value(&secret_id).await.map_err(|e| {
            StoreError::misconfigured(BACKEND, format!("cannot read secret '{secret_id}': {e}"))
        })?;
        parse_blob(&blob).map_err(|e| {
            StoreError::misconfigured(BACKEND, format!("secret '{secret_id}' is unusable: {e}"))
        })?;

        tracing::info!(secret_id = %secret_id, "Vault store connected");

        Ok(Self {
            vault,
            secret_id,
            cache: Mutex::new(None),
        })
    }

    pub fn secret_id(&self) -> &str {
        &self.secret_id
    }

    async fn load(&self, key: Option<&str>) -> Result<BTreeMap<String, String>, StoreError> {
        tracing::debug!(secret_id = %self.secret_id, "Loading vault secret");
        let blob = self
            .vault
            .get_secret_value(&self.secret_id)
            .await
            .map_err(|e| StoreError::transient(BACKEND, key, e))?;
        parse_blob(&blob)
    }

    async fn save(&self, entries: &BTreeMap<String, String>, key: &str) -> Result<(), StoreError> {
        let blob = serde_json::to_string(entries).map_err(|e| StoreError::Corrupt {
            backend: BACKEND,
            reason: e.to_string(),
        })?;
        self.vault
            .update_secret(&self.secret_id, &blob)
            .await
            .map_err(|e| StoreError::transient(BACKEND, Some(key), e))
    }

    /// Run `read` over the cached entries, loading them on first use
    async fn with_cached<T>(
        &self,
        key: Option<&str>,
        read: impl FnOnce(&BTreeMap<String, String>) -> T,
    ) -> Result<T, StoreError> {
        let mut cache = self.cache.lock().await;
        if let Some(entries) = cache.as_ref() {
            return Ok(read(entries));
        }
        let entries = self.load(key).await?;
        let value = read(&entries);
        *cache = Some(entries);
        Ok(value)
    }
}

fn parse_blob(blob: &str) -> Result<BTreeMap<String, String>, StoreError> {
    if blob.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(blob).map_err(|e| StoreError::Corrupt {
        backend: BACKEND,
        reason: format!("expected a JSON object of strings: {e}"),
    })
}

#[async_trait]
impl SecureStore for VaultStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_cached(Some(key), |entries| entries.get(key).cloned())
            .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut cache = self.cache.lock().await;
        *cache = None;

        let mut entries = self.load(Some(key)).await?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries, key).await?;

        tracing::debug!(secret_id = %self.secret_id, key = %key, "Vault secret updated");
        *cache = Some(entries);
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), StoreError> {
        let mut cache = self.cache.lock().await;
        *cache = None;

        let mut entries = self.load(Some(key)).await?;
        if entries.remove(key).is_some() {
            self.save(&entries, key).await?;
            tracing::debug!(secret_id = %self.secret_id, key = %key, "Vault key cleared");
        }
        *cache = Some(entries);
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        tracing::warn!(secret_id = %self.secret_id, "Refusing to clear all vault entries");
        Err(StoreError::OperationNotPermitted {
            backend: BACKEND,
            operation: "clear_all",
        })
    }

    async fn entries(&self) -> Result<BTreeMap<String, String>, StoreError> {
        self.with_cached(None, |entries| entries.clone()).await
    }

    async fn keys(&self) -> Result<BTreeSet<String>, StoreError> {
        self.with_cached(None, |entries| entries.keys().cloned().collect())
            .await
    }
}

//! Pluggable secure key/value storage
//!
//! Every backend implements [`SecureStore`]. Which one is used is decided
//! once, at construction, from a [`StoreConfig`].

mod database;
mod error;
mod memory;
mod vault;

#[cfg(feature = "aws")]
mod aws;

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::StoreConfig;

#[cfg(feature = "aws")]
pub use aws::AwsSecretsManager;
pub use database::DatabaseStore;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use vault::{SecretsVault, VaultError, VaultStore};

/// A stored secret with its last modification time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretEntry {
    pub key: String,
    pub value: String,
    pub modified_at: DateTime<Utc>,
}

/// Key/value storage for secrets.
///
/// A missing key is `Ok(None)`, never an error. Writes are durable when
/// the call returns. I/O failures are returned as they happen; retrying is
/// the caller's decision.
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Backend name used in logs and errors
    fn backend(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert or replace the value stored under `key`
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`; removing an absent key is a no-op
    async fn clear(&self, key: &str) -> Result<(), StoreError>;

    /// Remove every key. Backends may refuse with
    /// [`StoreError::OperationNotPermitted`].
    async fn clear_all(&self) -> Result<(), StoreError>;

    async fn entries(&self) -> Result<BTreeMap<String, String>, StoreError>;

    async fn keys(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self.entries().await?.into_keys().collect())
    }

    /// Entries under `prefix`, keyed by the remainder of the key
    async fn entries_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(prefix)
                    .map(|rest| (rest.to_string(), value))
            })
            .collect())
    }
}

/// Open the backend selected by `config`.
///
/// Backends check their connection here, so an unreachable or misconfigured
/// backend fails now with [`StoreError::Misconfigured`] rather than on
/// first use.
pub async fn open_store(config: &StoreConfig) -> Result<Box<dyn SecureStore>, StoreError> {
    match config {
        StoreConfig::Memory => Ok(Box::new(MemoryStore::new())),
        StoreConfig::Database { url } => Ok(Box::new(DatabaseStore::connect(url).await?)),
        #[cfg(feature = "aws")]
        StoreConfig::AwsSecretsManager { secret_id } => {
            let vault = AwsSecretsManager::from_env().await;
            Ok(Box::new(
                VaultStore::connect(std::sync::Arc::new(vault), secret_id.clone()).await?,
            ))
        }
    }
}

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use super::{SecretEntry, SecureStore, StoreError};

const BACKEND: &str = "memory";

/// In-process store with no persistence.
///
/// Serves as the test double and as the reference for how the other
/// backends behave.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, SecretEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full entry for `key`, including its modification time
    pub fn entry(&self, key: &str) -> Option<SecretEntry> {
        self.read().get(key).cloned()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, SecretEntry>> {
        // Every write is a single insert/remove, so a poisoned map is still consistent
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, SecretEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SecureStore for MemoryStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read().get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let entry = SecretEntry {
            key: key.to_string(),
            value: value.to_string(),
            modified_at: Utc::now(),
        };
        self.write().insert(key.to_string(), entry);
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), StoreError> {
        self.write().remove(key);
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        self.write().clear();
        Ok(())
    }

    async fn entries(&self) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(self
            .read()
            .values()
            .map(|entry| (entry.key.clone(), entry.value.clone()))
            .collect())
    }
}

//! Partner credentials kept in the secure store

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::store::{SecureStore, StoreError};

/// Store key holding the serialized credentials bundle
pub const CREDENTIALS_KEY: &str = "credentials";

/// OAuth client credentials issued to a partner organization
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub partner_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("partner_id", &self.partner_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read the bundle from `store`; `None` when it was never saved
    pub async fn load(store: &dyn SecureStore) -> Result<Option<Self>, StoreError> {
        let Some(raw) = store.get(CREDENTIALS_KEY).await? else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                backend: store.backend(),
                reason: format!("credentials are not valid JSON: {e}"),
            })
    }

    pub async fn save(&self, store: &dyn SecureStore) -> Result<(), StoreError> {
        let raw = serde_json::to_string(self).map_err(|e| StoreError::Corrupt {
            backend: store.backend(),
            reason: e.to_string(),
        })?;
        store.set(CREDENTIALS_KEY, &raw).await
    }
}

//! chcs-client: async client for the CHCS health data service
//!
//! [`HealthClient`] is the entry point. It talks to the REST and FHIR APIs
//! through [`ApiClient`] and keeps partner credentials and patient id
//! mappings in a pluggable [`SecureStore`].

pub mod api;
pub mod config;
pub mod credentials;
mod error;
pub mod health;
pub mod query;
pub mod store;

pub use api::{ApiClient, ApiError, Endpoint, RequestOptions};
pub use config::{ClientConfig, DEFAULT_BASE_URL, StoreConfig};
pub use credentials::{CREDENTIALS_KEY, Credentials};
pub use error::ClientError;
pub use health::{HealthClient, PATIENT_ID_MAPPING_PREFIX};
pub use query::ObservationQuery;
pub use store::{
    DatabaseStore, MemoryStore, SecretEntry, SecretsVault, SecureStore, StoreError, VaultStore,
    open_store,
};

pub use chcs_core::{Code, FieldValue, FlatRecord, HealthRecord, NormalizeError};

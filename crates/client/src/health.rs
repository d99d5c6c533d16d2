//! High-level CHCS client
//!
//! [`HealthClient`] ties an [`ApiClient`] to a [`SecureStore`] and exposes
//! the user, patient and observation calls.

use std::collections::BTreeMap;

use chcs_core::{FlatRecord, tidy_resource};
use futures::{Stream, StreamExt, TryStreamExt};
use serde_json::Value as JsonValue;

use crate::api::{ApiClient, Endpoint, RequestOptions};
use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::error::ClientError;
use crate::query::ObservationQuery;
use crate::store::SecureStore;

/// Store key prefix for external-to-CHCS patient id mappings
pub const PATIENT_ID_MAPPING_PREFIX: &str = "patient_id_mapping/";

pub struct HealthClient {
    api: ApiClient,
    store: Box<dyn SecureStore>,
    credentials: Option<Credentials>,
}

impl HealthClient {
    /// Build the API client and read stored credentials once
    pub async fn connect(
        config: ClientConfig,
        store: Box<dyn SecureStore>,
    ) -> Result<Self, ClientError> {
        let api = ApiClient::new(&config)?;
        let credentials = Credentials::load(store.as_ref()).await?;

        tracing::info!(
            base_url = %api.base_url(),
            store = store.backend(),
            has_credentials = credentials.is_some(),
            "CHCS client ready"
        );

        Ok(Self {
            api,
            store,
            credentials,
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn store(&self) -> &dyn SecureStore {
        self.store.as_ref()
    }

    /// Credentials read at connect time or last saved through this client
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub async fn save_credentials(&mut self, credentials: &Credentials) -> Result<(), ClientError> {
        credentials.save(self.store.as_ref()).await?;
        self.credentials = Some(credentials.clone());
        tracing::info!(partner_id = %credentials.partner_id, "Credentials saved");
        Ok(())
    }

    /// Profile of the user owning the API token
    pub async fn get_user(&self) -> Result<JsonValue, ClientError> {
        let url = self.api.url(Endpoint::Rest, "users/profile")?;
        self.api
            .request(Endpoint::Rest, "users/profile", RequestOptions::default())
            .await?
            .ok_or_else(|| ClientError::invalid_response(url, "empty user profile"))
    }

    /// Every patient visible to the token, across all pages
    pub fn list_patients(&self) -> impl Stream<Item = Result<JsonValue, ClientError>> + '_ {
        self.api.list_rest("patients", &[])
    }

    /// Observation resources matching `query`.
    ///
    /// The query is checked before any request is made.
    pub fn list_observations<'a>(
        &'a self,
        query: &ObservationQuery,
    ) -> Result<impl Stream<Item = Result<JsonValue, ClientError>> + use<'a>, ClientError> {
        let params = query.to_params()?;
        Ok(self.api.list_fhir("Observation", &params))
    }

    /// Matching observations drained and flattened into records
    pub async fn list_observation_records(
        &self,
        query: &ObservationQuery,
    ) -> Result<Vec<FlatRecord>, ClientError> {
        let records: Vec<FlatRecord> = self
            .list_observations(query)?
            .map(|item| item.and_then(|resource| Ok(tidy_resource(&resource)?)))
            .try_collect()
            .await?;

        tracing::debug!(records = records.len(), "Observations normalized");
        Ok(records)
    }

    /// Known external patient ids and the CHCS patient they map to
    pub async fn patient_id_mappings(&self) -> Result<BTreeMap<String, String>, ClientError> {
        Ok(self
            .store
            .entries_with_prefix(PATIENT_ID_MAPPING_PREFIX)
            .await?)
    }

    pub async fn set_patient_id_mapping(
        &self,
        external_id: &str,
        patient_id: &str,
    ) -> Result<(), ClientError> {
        let key = format!("{PATIENT_ID_MAPPING_PREFIX}{external_id}");
        self.store.set(&key, patient_id).await?;
        Ok(())
    }
}

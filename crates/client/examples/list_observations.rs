//! List the current user's patients and one patient's observations.
//!
//! ```sh
//! CHCS_TOKEN=... CHCS_PATIENT_ID=40001 cargo run -p chcs-client --example list_observations
//! ```

use std::error::Error;

use chcs_client::{ClientConfig, HealthClient, ObservationQuery, StoreConfig, open_store};
use futures::TryStreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,chcs_client=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let store = open_store(&StoreConfig::from_env()?).await?;
    let client = HealthClient::connect(ClientConfig::from_env(), store).await?;

    let user = client.get_user().await?;
    tracing::info!(user = %user, "Signed in");

    let patients: Vec<_> = client.list_patients().try_collect().await?;
    tracing::info!(count = patients.len(), "Patients listed");

    let Ok(patient_id) = std::env::var("CHCS_PATIENT_ID") else {
        tracing::warn!("CHCS_PATIENT_ID not set, skipping observations");
        return Ok(());
    };

    let records = client
        .list_observation_records(&ObservationQuery::for_patient(patient_id))
        .await?;
    for record in &records {
        println!("{}", serde_json::to_string(record)?);
    }
    tracing::info!(count = records.len(), "Observations listed");

    Ok(())
}

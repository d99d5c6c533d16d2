//! AWS Secrets Manager as a [`SecretsVault`]

use async_trait::async_trait;
use aws_sdk_secretsmanager::Client;
use aws_sdk_secretsmanager::error::DisplayErrorContext;

use super::{SecretsVault, VaultError};

/// Secrets Manager client adapter
#[derive(Clone, Debug)]
pub struct AwsSecretsManager {
    client: Client,
}

impl AwsSecretsManager {
    /// Wrap an already configured client. The client is used as given.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS configuration chain
    /// (environment, profile, instance metadata).
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl SecretsVault for AwsSecretsManager {
    async fn get_secret_value(&self, secret_id: &str) -> Result<String, VaultError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| VaultError::from(DisplayErrorContext(&e).to_string()))?;

        output
            .secret_string()
            .map(str::to_string)
            .ok_or_else(|| VaultError::from(format!("secret {secret_id} has no string value")))
    }

    async fn update_secret(&self, secret_id: &str, secret_string: &str) -> Result<(), VaultError> {
        self.client
            .update_secret()
            .secret_id(secret_id)
            .secret_string(secret_string)
            .send()
            .await
            .map_err(|e| VaultError::from(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

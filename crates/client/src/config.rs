//! Client configuration
//!
//! Plain structs passed into constructors. Only the outermost caller should
//! use the `from_env` loaders; library components never read the
//! environment themselves.

use std::fmt;
use std::time::Duration;

use crate::store::StoreError;

/// Default CHCS deployment
pub const DEFAULT_BASE_URL: &str = "https://chcs.fly.dev";

/// CHCS API connection settings
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    /// Transport timeout applied to every request; none by default
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: Some(token.into()),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("CHCS_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into()),
            token: std::env::var("CHCS_TOKEN").ok().filter(|t| !t.is_empty()),
            timeout: None,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Secure store backend selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Memory,
    Database {
        url: String,
    },
    #[cfg(feature = "aws")]
    AwsSecretsManager {
        secret_id: String,
    },
}

impl StoreConfig {
    /// Load the backend selection from environment variables.
    ///
    /// `CHCS_STORE` is `memory` (default), `database` (needs `DATABASE_URL`)
    /// or `aws` (needs `CHCS_SECRET_ID` and the `aws` feature).
    pub fn from_env() -> Result<Self, StoreError> {
        let backend = std::env::var("CHCS_STORE").unwrap_or_else(|_| "memory".into());
        match backend.as_str() {
            "memory" => Ok(Self::Memory),
            "database" => std::env::var("DATABASE_URL")
                .map(|url| Self::Database { url })
                .map_err(|_| StoreError::misconfigured("database", "DATABASE_URL is not set")),
            #[cfg(feature = "aws")]
            "aws" => std::env::var("CHCS_SECRET_ID")
                .map(|secret_id| Self::AwsSecretsManager { secret_id })
                .map_err(|_| StoreError::misconfigured("vault", "CHCS_SECRET_ID is not set")),
            other => Err(StoreError::misconfigured(
                "config",
                format!("unknown store backend '{other}'"),
            )),
        }
    }
}

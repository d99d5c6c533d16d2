//! Client error handling

use chcs_core::NormalizeError;
use reqwest::StatusCode;
use thiserror::Error;

use crate::api::ApiError;
use crate::store::StoreError;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid combination of arguments, raised before any I/O
    #[error("Invalid arguments: {0}")]
    CallerContract(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Transport failure (connect, timeout, dropped connection)
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub(crate) fn invalid_response(url: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// HTTP status of a failed API call
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api(err) => Some(err.status),
            Self::Http(err) => err.status(),
            _ => None,
        }
    }

    /// Whether a caller-side retry could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api(err) => err.status.is_server_error(),
            Self::Store(err) => err.is_transient(),
            _ => false,
        }
    }
}

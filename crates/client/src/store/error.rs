//! Secure store errors

use thiserror::Error;

/// Errors raised by [`SecureStore`](super::SecureStore) backends
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend unreachable or rejected our configuration at construction
    #[error("{backend} store misconfigured: {reason}")]
    Misconfigured {
        backend: &'static str,
        reason: String,
    },

    /// A destructive operation this backend deliberately refuses
    #[error("{operation} is not permitted on the {backend} store")]
    OperationNotPermitted {
        backend: &'static str,
        operation: &'static str,
    },

    /// I/O failure during a call; not retried
    #[error("{backend} store error{}: {reason}", key_suffix(.key))]
    Transient {
        backend: &'static str,
        key: Option<String>,
        reason: String,
    },

    /// Stored data could not be decoded
    #[error("{backend} store holds invalid data: {reason}")]
    Corrupt {
        backend: &'static str,
        reason: String,
    },
}

impl StoreError {
    pub fn misconfigured(backend: &'static str, reason: impl ToString) -> Self {
        Self::Misconfigured {
            backend,
            reason: reason.to_string(),
        }
    }

    pub fn transient(backend: &'static str, key: Option<&str>, reason: impl ToString) -> Self {
        Self::Transient {
            backend,
            key: key.map(str::to_string),
            reason: reason.to_string(),
        }
    }

    /// Whether a caller-side retry could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

fn key_suffix(key: &Option<String>) -> String {
    key.as_deref()
        .map(|k| format!(" for key '{k}'"))
        .unwrap_or_default()
}

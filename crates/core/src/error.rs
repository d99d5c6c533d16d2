use thiserror::Error;

/// Errors raised while turning fetched resources into flat records
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Invalid timestamp in {field}: {value}")]
    InvalidTimestamp { field: String, value: String },

    #[error("Invalid attachment: {0}")]
    Attachment(String),
}

impl NormalizeError {
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

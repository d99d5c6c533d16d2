//! Header/body health records extracted from fetched resources

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::{Map, Value as JsonValue};

use crate::error::NormalizeError;

/// A health record: resource metadata in `header`, measurement in `body`
#[derive(Debug, Clone, PartialEq)]
pub struct HealthRecord {
    pub resource_type: String,
    pub header: Map<String, JsonValue>,
    pub body: Map<String, JsonValue>,
}

impl HealthRecord {
    pub fn new(
        resource_type: impl Into<String>,
        header: Map<String, JsonValue>,
        body: Map<String, JsonValue>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            header,
            body,
        }
    }

    /// Extract a record from a fetched resource.
    ///
    /// The header and body are read from the resource itself when present,
    /// otherwise from the base64 JSON document in `valueAttachment.data`
    /// (how FHIR Observations carry Open mHealth data points).
    pub fn from_resource(resource: &JsonValue) -> Result<Self, NormalizeError> {
        let resource_type = resource
            .get("resourceType")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| NormalizeError::MissingField("resourceType".to_string()))?;

        if resource.get("header").is_some() || resource.get("body").is_some() {
            return Ok(Self::new(
                resource_type,
                section(resource, "header")?,
                section(resource, "body")?,
            ));
        }

        let document = decode_attachment(resource)?;
        Ok(Self::new(
            resource_type,
            section(&document, "header")?,
            section(&document, "body")?,
        ))
    }
}

fn section(document: &JsonValue, name: &str) -> Result<Map<String, JsonValue>, NormalizeError> {
    match document.get(name) {
        Some(JsonValue::Object(map)) => Ok(map.clone()),
        Some(_) => Err(NormalizeError::invalid_field(name, "expected an object")),
        None => Err(NormalizeError::MissingField(name.to_string())),
    }
}

fn decode_attachment(resource: &JsonValue) -> Result<JsonValue, NormalizeError> {
    let data = resource
        .pointer("/valueAttachment/data")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| NormalizeError::MissingField("valueAttachment.data".to_string()))?;

    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| NormalizeError::Attachment(format!("base64: {e}")))?;

    serde_json::from_slice(&bytes).map_err(|e| NormalizeError::Attachment(format!("json: {e}")))
}

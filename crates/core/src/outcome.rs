use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Severity of the issue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Fatal,
    Error,
    Warning,
    Information,
    Success,
}

/// FHIR OperationOutcome, as returned in FHIR error bodies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    pub resource_type: String,
    #[serde(default)]
    pub issue: Vec<OperationOutcomeIssue>,
}

/// A single issue in an OperationOutcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationOutcomeIssue {
    pub severity: IssueSeverity,
    /// Issue type code (`invalid`, `not-found`, `security`, ...)
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<CodeableText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

/// The `text` member of a CodeableConcept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeableText {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl OperationOutcome {
    /// Parse a JSON body as an OperationOutcome.
    ///
    /// Returns `None` unless `resourceType` is `OperationOutcome`.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        if value.get("resourceType").and_then(JsonValue::as_str) != Some("OperationOutcome") {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Human-readable summary of all issues, `None` if no issue has text
    pub fn summary(&self) -> Option<String> {
        let messages: Vec<&str> = self
            .issue
            .iter()
            .filter_map(|issue| {
                issue
                    .diagnostics
                    .as_deref()
                    .or_else(|| issue.details.as_ref().and_then(|d| d.text.as_deref()))
            })
            .collect();

        if messages.is_empty() {
            None
        } else {
            Some(messages.join("; "))
        }
    }
}

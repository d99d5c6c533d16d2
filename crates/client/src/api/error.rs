//! Normalization of failed API responses
//!
//! Upstream error bodies come in three shapes: JSON API errors with a
//! `detail` member (or a FHIR OperationOutcome), HTML pages from gateways,
//! and plain or empty bodies. [`ApiError`] hides the difference.

use chcs_core::OperationOutcome;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Response, StatusCode};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Detail used instead of the markup of an HTML error page
pub const HTML_PLACEHOLDER: &str = "(html error page)";

/// Longest raw-body excerpt kept as detail, in characters
pub const MAX_DETAIL_CHARS: usize = 1024;

/// A non-success HTTP response
#[derive(Debug, Clone, Error)]
#[error("HTTP {status} for {url}{}", detail_suffix(.detail))]
pub struct ApiError {
    pub status: StatusCode,
    pub url: String,
    /// Best-effort human-readable reason, when one could be extracted
    pub detail: Option<String>,
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

impl ApiError {
    /// Build the error from a failed response, consuming its body
    pub(crate) async fn from_response(response: Response) -> Self {
        let status = response.status();
        let url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let detail = match response.bytes().await {
            Ok(body) => extract_detail(content_type.as_deref(), &body),
            Err(e) => {
                tracing::debug!(error = %e, "Failed to read error body");
                None
            }
        };

        Self {
            status,
            url,
            detail,
        }
    }
}

/// Pull a readable reason out of an error body.
///
/// HTML bodies give [`HTML_PLACEHOLDER`]. JSON bodies give their `detail`
/// member, or the diagnostics of an OperationOutcome. Anything else gives
/// the body text cut to [`MAX_DETAIL_CHARS`]. Empty or non-UTF-8 bodies
/// give nothing.
pub fn extract_detail(content_type: Option<&str>, body: &[u8]) -> Option<String> {
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html")) {
        return Some(HTML_PLACEHOLDER.to_string());
    }

    if let Ok(json) = serde_json::from_slice::<JsonValue>(body) {
        match json.get("detail") {
            Some(JsonValue::String(detail)) => return Some(detail.clone()),
            Some(JsonValue::Null) | None => {}
            Some(other) => return Some(other.to_string()),
        }
        if let Some(summary) = OperationOutcome::from_json(&json).and_then(|o| o.summary()) {
            return Some(summary);
        }
    }

    let text = std::str::from_utf8(body).ok()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.chars().take(MAX_DETAIL_CHARS).collect())
    }
}

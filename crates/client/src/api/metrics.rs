//! Request metrics
//!
//! Records `chcs_client_requests_total` (counter) and
//! `chcs_client_request_duration_seconds` (histogram) for every request,
//! with method/path/status labels. Nothing is exported unless the
//! application installs a `metrics` recorder.

use std::time::Duration;

use reqwest::Method;

/// Normalize request paths to avoid high-cardinality labels.
/// Replaces UUID and numeric segments with `:id`.
pub(crate) fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            let numeric = !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit());
            if numeric || uuid::Uuid::try_parse(seg).is_ok() {
                ":id"
            } else {
                seg
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Record count and duration of one request.
/// `status` is the HTTP status code, or `error` when no response arrived.
pub(crate) fn record_request(method: &Method, path: &str, status: &str, elapsed: Duration) {
    metrics::counter!(
        "chcs_client_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "chcs_client_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(elapsed.as_secs_f64());
}

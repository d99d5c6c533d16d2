//! HTTP client for the CHCS REST and FHIR APIs

use std::fmt;
use std::time::Instant;

use futures::Stream;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, Response, Url};
use serde_json::Value as JsonValue;

use super::error::ApiError;
use super::metrics::{normalize_path, record_request};
use super::pager::paginate;
use super::request_id::{REQUEST_ID_HEADER, RequestId};
use crate::config::ClientConfig;
use crate::error::ClientError;

const USER_AGENT_VALUE: &str = concat!("chcs-client/", env!("CARGO_PKG_VERSION"));

/// API family a path belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Plain JSON API under `/api/v1`
    Rest,
    /// FHIR R5 API under `/fhir/r5`
    Fhir,
}

impl Endpoint {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Rest => "api/v1",
            Self::Fhir => "fhir/r5",
        }
    }
}

/// Per-request options
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub body: Option<JsonValue>,
    /// Turn 4xx/5xx statuses into [`ApiError`]
    pub check: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            query: Vec::new(),
            body: None,
            check: true,
        }
    }
}

impl RequestOptions {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    pub fn unchecked(mut self) -> Self {
        self.check = false;
        self
    }
}

/// Authenticated client for one CHCS deployment
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let token = config
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::Config("no API token configured".into()))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ClientError::Config(format!("invalid base URL '{}': {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "base URL '{}' cannot carry paths",
                config.base_url
            )));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ClientError::Config("API token is not a valid header value".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL of `path` under `endpoint`
    pub fn url(&self, endpoint: Endpoint, path: &str) -> Result<Url, ClientError> {
        let raw = format!(
            "{}/{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            endpoint.prefix(),
            path.trim_start_matches('/')
        );
        Url::parse(&raw).map_err(|e| ClientError::CallerContract(format!("invalid path '{path}': {e}")))
    }

    /// Send a request and decode its JSON body; `None` when the body is empty
    pub async fn request(
        &self,
        endpoint: Endpoint,
        path: &str,
        options: RequestOptions,
    ) -> Result<Option<JsonValue>, ClientError> {
        let url = self.url(endpoint, path)?;
        self.request_url(url, options).await
    }

    /// Send a request and hand back the response untouched.
    ///
    /// Failing statuses are still raised unless `options.check` is off.
    pub async fn request_raw(
        &self,
        endpoint: Endpoint,
        path: &str,
        options: RequestOptions,
    ) -> Result<Response, ClientError> {
        let url = self.url(endpoint, path)?;
        self.send(url, options).await
    }

    /// Stream every item of a paginated REST list
    pub fn list_rest<'a>(
        &'a self,
        path: &str,
        query: &[(String, String)],
    ) -> impl Stream<Item = Result<JsonValue, ClientError>> + use<'a> {
        let first = self.list_url(Endpoint::Rest, path, query);
        paginate(self, Endpoint::Rest, first)
    }

    /// Stream every resource of a paginated FHIR search
    pub fn list_fhir<'a>(
        &'a self,
        path: &str,
        query: &[(String, String)],
    ) -> impl Stream<Item = Result<JsonValue, ClientError>> + use<'a> {
        let first = self.list_url(Endpoint::Fhir, path, query);
        paginate(self, Endpoint::Fhir, first)
    }

    fn list_url(
        &self,
        endpoint: Endpoint,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Url, ClientError> {
        let mut url = self.url(endpoint, path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    pub(crate) async fn request_url(
        &self,
        url: Url,
        options: RequestOptions,
    ) -> Result<Option<JsonValue>, ClientError> {
        let response = self.send(url, options).await?;
        let url = response.url().clone();
        let body = response.bytes().await?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| ClientError::invalid_response(&url, format!("body is not JSON: {e}")))
    }

    async fn send(&self, url: Url, options: RequestOptions) -> Result<Response, ClientError> {
        let request_id = RequestId::new();
        let method = options.method;
        let metric_path = normalize_path(url.path());

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(REQUEST_ID_HEADER, request_id.to_string());
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            url = %url,
            "Sending API request"
        );

        let start = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                record_request(&method, &metric_path, "error", start.elapsed());
                tracing::warn!(request_id = %request_id, url = %url, error = %e, "API request failed");
                return Err(e.into());
            }
        };

        let status = response.status();
        record_request(&method, &metric_path, status.as_str(), start.elapsed());
        tracing::debug!(
            request_id = %request_id,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "API response received"
        );

        if options.check && (status.is_client_error() || status.is_server_error()) {
            let error = ApiError::from_response(response).await;
            tracing::warn!(
                request_id = %request_id,
                status = status.as_u16(),
                url = %error.url,
                detail = error.detail.as_deref().unwrap_or(""),
                "API request rejected"
            );
            return Err(error.into());
        }

        Ok(response)
    }
}

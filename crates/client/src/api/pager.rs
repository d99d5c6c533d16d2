//! Page-by-page traversal of list endpoints
//!
//! REST lists are `{"results": [...], "next": <url or null>}`; FHIR lists
//! are Bundles whose `link` may hold a `next` relation. Pages are fetched
//! lazily, one when the previous one has been consumed, until no
//! continuation remains.

use std::collections::{HashSet, VecDeque};

use chcs_core::Bundle;
use futures::Stream;
use futures::stream;
use reqwest::Url;
use serde_json::Value as JsonValue;

use super::client::{ApiClient, Endpoint, RequestOptions};
use crate::error::ClientError;

/// Items of one fetched page and where the next one is
#[derive(Debug)]
pub(crate) struct Page {
    pub items: Vec<JsonValue>,
    pub next: Option<Url>,
}

impl Page {
    /// Parse a page body in the envelope of `endpoint`.
    ///
    /// An empty body is an empty last page. Continuations are resolved
    /// against the page URL and must stay on the origin of `base`, so the
    /// bearer token is never sent elsewhere.
    pub(crate) fn parse(
        endpoint: Endpoint,
        body: Option<JsonValue>,
        page_url: &Url,
        base: &Url,
    ) -> Result<Self, ClientError> {
        let Some(body) = body else {
            return Ok(Self {
                items: Vec::new(),
                next: None,
            });
        };

        let (items, next) = match endpoint {
            Endpoint::Rest => parse_rest(body, page_url)?,
            Endpoint::Fhir => parse_bundle(body, page_url)?,
        };

        let next = match next {
            Some(next) => Some(resolve_next(base, page_url, &next)?),
            None => None,
        };

        Ok(Self { items, next })
    }
}

fn parse_rest(
    body: JsonValue,
    page_url: &Url,
) -> Result<(Vec<JsonValue>, Option<String>), ClientError> {
    let JsonValue::Object(mut envelope) = body else {
        return Err(ClientError::invalid_response(page_url, "expected a JSON object"));
    };

    let items = match envelope.remove("results") {
        Some(JsonValue::Array(items)) => items,
        _ => {
            return Err(ClientError::invalid_response(page_url, "missing 'results' list"));
        }
    };

    let next = match envelope.remove("next") {
        Some(JsonValue::String(next)) if !next.is_empty() => Some(next),
        _ => None,
    };

    Ok((items, next))
}

fn parse_bundle(
    body: JsonValue,
    page_url: &Url,
) -> Result<(Vec<JsonValue>, Option<String>), ClientError> {
    let bundle: Bundle = serde_json::from_value(body)
        .map_err(|e| ClientError::invalid_response(page_url, format!("not a FHIR Bundle: {e}")))?;

    let next = bundle.next_link().map(str::to_string);
    Ok((bundle.into_resources().collect(), next))
}

fn resolve_next(base: &Url, page_url: &Url, next: &str) -> Result<Url, ClientError> {
    let next_url = page_url.join(next).map_err(|e| {
        ClientError::invalid_response(page_url, format!("bad continuation link '{next}': {e}"))
    })?;

    if next_url.origin() != base.origin() {
        return Err(ClientError::invalid_response(
            page_url,
            format!("continuation link '{next_url}' leaves {}", base.origin().ascii_serialization()),
        ));
    }
    if &next_url == page_url {
        return Err(ClientError::invalid_response(
            page_url,
            "continuation link repeats the current page",
        ));
    }

    Ok(next_url)
}

/// Traversal state threaded through the stream
struct Pager<'a> {
    client: &'a ApiClient,
    endpoint: Endpoint,
    buffered: VecDeque<JsonValue>,
    next: Option<Result<Url, ClientError>>,
    visited: HashSet<Url>,
    pages: usize,
}

impl<'a> Pager<'a> {
    async fn advance(mut self) -> Result<Option<(JsonValue, Self)>, ClientError> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                return Ok(Some((item, self)));
            }

            let Some(next) = self.next.take() else {
                return Ok(None);
            };
            let url = next?;
            if !self.visited.insert(url.clone()) {
                return Err(ClientError::invalid_response(
                    &url,
                    "continuation link revisits an earlier page",
                ));
            }

            let body = self
                .client
                .request_url(url.clone(), RequestOptions::default())
                .await?;
            let page = Page::parse(self.endpoint, body, &url, self.client.base_url())?;

            self.pages += 1;
            tracing::debug!(
                url = %url,
                page = self.pages,
                items = page.items.len(),
                has_next = page.next.is_some(),
                "Fetched list page"
            );

            self.buffered.extend(page.items);
            self.next = page.next.map(Ok);
        }
    }
}

/// Stream every item of a list, starting at `first`
pub(crate) fn paginate(
    client: &ApiClient,
    endpoint: Endpoint,
    first: Result<Url, ClientError>,
) -> impl Stream<Item = Result<JsonValue, ClientError>> + '_ {
    let pager = Pager {
        client,
        endpoint,
        buffered: VecDeque::new(),
        next: Some(first),
        visited: HashSet::new(),
        pages: 0,
    };
    stream::try_unfold(pager, Pager::advance)
}

//! CHCS API access: request sending, error normalization and pagination

mod client;
mod error;
mod metrics;
mod pager;
mod request_id;

pub use client::{ApiClient, Endpoint, RequestOptions};
pub use error::{ApiError, HTML_PLACEHOLDER, MAX_DETAIL_CHARS, extract_detail};
pub use request_id::{REQUEST_ID_HEADER, RequestId};

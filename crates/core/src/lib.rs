//! chcs-core: Shared FHIR and Open mHealth types for the CHCS client
//!
//! This crate has no I/O. It provides the FHIR envelope types the client
//! consumes (Bundle, OperationOutcome), the Open mHealth code catalogue,
//! and the normalizer that turns health records into flat rows.

pub mod bundle;
pub mod code;
pub mod error;
pub mod normalize;
pub mod outcome;
pub mod record;

pub use bundle::{Bundle, BundleLink, BundleType, unwrap_entry};
pub use code::{Code, OPEN_MHEALTH_SYSTEM, qualify_code};
pub use error::NormalizeError;
pub use normalize::{FieldValue, FlatRecord, flatten, tidy, tidy_resource};
pub use outcome::{IssueSeverity, OperationOutcome, OperationOutcomeIssue};
pub use record::HealthRecord;

//! Flattening of nested health records into single-level rows
//!
//! Rows produced here are meant for tabular analysis: nested keys are joined
//! with `_`, and every field ending in `date_time` is emitted twice, once as
//! a UTC instant (for comparing across patients) and once as `<field>_local`
//! with the wall-clock time of the original offset (for time-of-day work).

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::NormalizeError;
use crate::record::HealthRecord;

/// Fields with this suffix are parsed as timestamps
pub const TIMESTAMP_SUFFIX: &str = "date_time";

/// Suffix of the naive local-time twin of a timestamp field
pub const LOCAL_SUFFIX: &str = "_local";

/// A single-level record, field name to value
pub type FlatRecord = BTreeMap<String, FieldValue>;

/// Value of a flat record field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Scalar or sequence copied from the source document
    Value(JsonValue),
    /// Timezone-aware instant normalized to UTC
    Utc(DateTime<Utc>),
    /// Wall-clock time with no timezone attached
    Local(NaiveDateTime),
}

impl FieldValue {
    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            FieldValue::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Utc(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_local(&self) -> Option<NaiveDateTime> {
        match self {
            FieldValue::Local(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl From<JsonValue> for FieldValue {
    fn from(value: JsonValue) -> Self {
        FieldValue::Value(value)
    }
}

/// Flatten a nested mapping.
///
/// `{"top": 1, "a": {"b": 5}}` becomes `{"top": 1, "a_b": 5}`. Only objects
/// are descended into; arrays and scalars are copied as leaves. A later key
/// overwrites an earlier one that flattens to the same name.
pub fn flatten(map: &Map<String, JsonValue>) -> Map<String, JsonValue> {
    let mut flat = Map::new();
    flatten_into(&mut flat, map, None);
    flat
}

fn flatten_into(flat: &mut Map<String, JsonValue>, map: &Map<String, JsonValue>, prefix: Option<&str>) {
    for (key, value) in map {
        let key = match prefix {
            Some(prefix) => format!("{prefix}_{key}"),
            None => key.clone(),
        };
        match value {
            JsonValue::Object(child) => flatten_into(flat, child, Some(&key)),
            leaf => {
                flat.insert(key, leaf.clone());
            }
        }
    }
}

/// Reshape a health record into one flat row.
///
/// `resource_type` comes first, then the flattened header, then the
/// flattened body, so body fields win on collision. Timestamp fields are
/// then expanded into their UTC and `_local` forms.
pub fn tidy(record: &HealthRecord) -> Result<FlatRecord, NormalizeError> {
    let mut fields = Map::new();
    fields.insert(
        "resource_type".to_string(),
        JsonValue::String(record.resource_type.clone()),
    );
    fields.extend(flatten(&record.header));
    fields.extend(flatten(&record.body));

    let timestamp_fields: Vec<String> = fields
        .keys()
        .filter(|name| name.ends_with(TIMESTAMP_SUFFIX))
        .cloned()
        .collect();

    let mut flat: FlatRecord = fields
        .into_iter()
        .map(|(name, value)| (name, FieldValue::Value(value)))
        .collect();

    for name in timestamp_fields {
        let local_name = format!("{name}{LOCAL_SUFFIX}");
        let (utc, local) = match flat.get(&name).and_then(FieldValue::as_json) {
            Some(JsonValue::String(raw)) => {
                let ts = parse_timestamp(raw).ok_or_else(|| NormalizeError::InvalidTimestamp {
                    field: name.clone(),
                    value: raw.clone(),
                })?;
                (
                    FieldValue::Utc(ts.with_timezone(&Utc)),
                    FieldValue::Local(ts.naive_local()),
                )
            }
            Some(JsonValue::Null) | None => {
                (FieldValue::Value(JsonValue::Null), FieldValue::Value(JsonValue::Null))
            }
            Some(other) => {
                return Err(NormalizeError::InvalidTimestamp {
                    field: name.clone(),
                    value: other.to_string(),
                });
            }
        };
        flat.insert(name, utc);
        flat.insert(local_name, local);
    }

    Ok(flat)
}

/// Extract the record from a fetched resource and tidy it
pub fn tidy_resource(resource: &JsonValue) -> Result<FlatRecord, NormalizeError> {
    tidy(&HealthRecord::from_resource(resource)?)
}

/// ISO 8601 forms with an offset, tried after RFC 3339
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
];

/// ISO 8601 forms without an offset
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parse an ISO 8601 timestamp. Values without an offset are taken as UTC;
/// a bare date is midnight UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    if let Some(ts) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(ts);
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Some(naive.and_utc().fixed_offset())
}

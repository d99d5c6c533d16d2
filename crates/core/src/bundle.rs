use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// FHIR Bundle types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BundleType {
    Searchset,
    History,
    Collection,
    Document,
    Message,
    Transaction,
    TransactionResponse,
    Batch,
    BatchResponse,
    SubscriptionNotification,
    #[serde(other)]
    Unknown,
}

/// FHIR Bundle resource as returned by search endpoints.
///
/// Entries are kept as raw JSON: upstream servers are not consistent about
/// wrapping, so they are unwrapped with [`unwrap_entry`] instead of being
/// decoded into a fixed shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    #[serde(default = "bundle_resource_type")]
    pub resource_type: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub bundle_type: Option<BundleType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link: Vec<BundleLink>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<JsonValue>,
}

fn bundle_resource_type() -> String {
    "Bundle".to_string()
}

/// Bundle navigation link
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BundleLink {
    pub relation: String,
    pub url: String,
}

impl Bundle {
    /// URL of the next page, if the server advertised one
    pub fn next_link(&self) -> Option<&str> {
        self.link
            .iter()
            .find(|link| link.relation == "next")
            .map(|link| link.url.as_str())
    }

    /// Consume the bundle, yielding each entry's resource
    pub fn into_resources(self) -> impl Iterator<Item = JsonValue> {
        self.entry.into_iter().map(unwrap_entry)
    }
}

/// Unwrap a bundle entry.
///
/// An entry that is an object with exactly one member (normally
/// `{"resource": {...}}`) yields that member's value. Anything else is
/// returned unchanged.
pub fn unwrap_entry(entry: JsonValue) -> JsonValue {
    match entry {
        JsonValue::Object(map) if map.len() == 1 => {
            map.into_iter().map(|(_, value)| value).next().unwrap_or_default()
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_key_wrapper_yields_nested_value() {
        let entry = json!({"resource": {"resourceType": "Observation", "id": "1"}});
        assert_eq!(
            unwrap_entry(entry),
            json!({"resourceType": "Observation", "id": "1"})
        );
    }

    #[test]
    fn wrapper_key_name_does_not_matter() {
        assert_eq!(unwrap_entry(json!({"item": 7})), json!(7));
    }

    #[test]
    fn multi_key_entry_is_verbatim() {
        let entry = json!({"fullUrl": "Observation/1", "resource": {"id": "1"}});
        assert_eq!(unwrap_entry(entry.clone()), entry);
    }

    #[test]
    fn non_object_entries_are_verbatim() {
        assert_eq!(unwrap_entry(json!("x")), json!("x"));
        assert_eq!(unwrap_entry(json!([1, 2])), json!([1, 2]));
        assert_eq!(unwrap_entry(json!({})), json!({}));
    }

    #[test]
    fn searchset_without_entries_parses_empty() {
        let bundle: Bundle =
            serde_json::from_value(json!({"resourceType": "Bundle", "type": "searchset", "total": 0}))
                .unwrap();
        assert_eq!(bundle.bundle_type, Some(BundleType::Searchset));
        assert!(bundle.entry.is_empty());
        assert_eq!(bundle.next_link(), None);
    }

    #[test]
    fn next_link_and_resources() {
        let bundle: Bundle = serde_json::from_value(json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "link": [
                {"relation": "self", "url": "https://example.org/fhir/r5/Observation"},
                {"relation": "next", "url": "https://example.org/fhir/r5/Observation?page=2"}
            ],
            "entry": [{"resource": {"id": "a"}}, {"resource": {"id": "b"}}]
        }))
        .unwrap();

        assert_eq!(
            bundle.next_link(),
            Some("https://example.org/fhir/r5/Observation?page=2")
        );
        let ids: Vec<JsonValue> = bundle.into_resources().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("a"), json!("b")]);
    }

    #[test]
    fn unknown_bundle_type_is_tolerated() {
        let bundle: Bundle = serde_json::from_value(json!({"type": "something-new"})).unwrap();
        assert_eq!(bundle.bundle_type, Some(BundleType::Unknown));
        assert_eq!(bundle.resource_type, "Bundle");
    }
}

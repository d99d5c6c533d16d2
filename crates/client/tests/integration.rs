//! Integration tests for the CHCS client.
//!
//! Every test runs the client against a local wiremock server, so the full
//! request path (headers, pagination, error bodies, normalization) is
//! exercised without network access.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{TimeZone, Utc};
use futures::TryStreamExt;
use serde_json::{Value as JsonValue, json};
use wiremock::matchers::{any, header, header_exists, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chcs_client::api::HTML_PLACEHOLDER;
use chcs_client::{
    ApiClient, ClientConfig, ClientError, Code, Credentials, Endpoint, HealthClient, MemoryStore,
    ObservationQuery, RequestOptions, SecureStore,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const TEST_TOKEN: &str = "test-token";

fn test_config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(server.uri(), TEST_TOKEN)
}

async fn test_client(server: &MockServer) -> HealthClient {
    HealthClient::connect(test_config(server), Box::new(MemoryStore::new()))
        .await
        .expect("Failed to build client")
}

/// Observation carrying an Open mHealth data point as a base64 attachment
fn observation(id: &str, systolic: u32, effective: &str) -> JsonValue {
    let document = json!({
        "header": {
            "uuid": id,
            "schema_id": {"namespace": "omh", "name": "blood-pressure", "version": "4.0"},
            "source_creation_date_time": "2024-03-01T08:00:00Z"
        },
        "body": {
            "systolic_blood_pressure": {"value": systolic, "unit": "mmHg"},
            "effective_time_frame": {"date_time": effective}
        }
    });

    json!({
        "resourceType": "Observation",
        "id": id,
        "status": "final",
        "valueAttachment": {
            "contentType": "application/json",
            "data": STANDARD.encode(document.to_string())
        }
    })
}

fn bundle(entries: Vec<JsonValue>, next: Option<String>) -> JsonValue {
    let link: Vec<JsonValue> = next
        .into_iter()
        .map(|url| json!({"relation": "next", "url": url}))
        .collect();
    json!({
        "resourceType": "Bundle",
        "type": "searchset",
        "link": link,
        "entry": entries.into_iter().map(|r| json!({"resource": r})).collect::<Vec<_>>()
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_get_user_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/profile"))
        .and(header("authorization", "Bearer test-token"))
        .and(header_exists("x-request-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "email": "a@b.c"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let user = client.get_user().await.unwrap();

    assert_eq!(user["email"], "a@b.c");
}

#[tokio::test]
async fn test_list_patients_drains_all_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/patients"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 3,
            "next": null,
            "results": [{"id": 3}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/patients"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 3,
            "next": format!("{}/api/v1/patients?page=2", server.uri()),
            "results": [{"id": 1}, {"id": 2}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let patients: Vec<JsonValue> = client.list_patients().try_collect().await.unwrap();

    let ids: Vec<i64> = patients.iter().map(|p| p["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_list_observations_follows_bundle_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fhir/r5/Observation"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(bundle(vec![json!({"resourceType": "Observation", "id": "c"})], None)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fhir/r5/Observation"))
        .and(query_param("patient", "40001"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bundle(
            vec![
                json!({"resourceType": "Observation", "id": "a"}),
                json!({"resourceType": "Observation", "id": "b"}),
            ],
            Some("/fhir/r5/Observation?patient=40001&page=2".to_string()),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let resources: Vec<JsonValue> = client
        .list_observations(&ObservationQuery::for_patient("40001"))
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    let ids: Vec<&str> = resources.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_observation_query_requires_patient_or_study() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let result = client.list_observations(&ObservationQuery::default().code(Code::BloodPressure));

    assert!(matches!(result, Err(ClientError::CallerContract(_))));
}

#[tokio::test]
async fn test_observation_code_is_qualified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fhir/r5/Observation"))
        .and(query_param("_has:Group:member:_id", "30001"))
        .and(query_param("code", "https://w3id.org/openmhealth|omh:blood-pressure:4.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bundle(vec![], None)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let resources: Vec<JsonValue> = client
        .list_observations(&ObservationQuery::for_study("30001").code(Code::BloodPressure))
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert!(resources.is_empty());
}

#[tokio::test]
async fn test_observation_records_are_flattened() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fhir/r5/Observation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bundle(
            vec![
                observation("obs-1", 120, "2024-03-01T09:30:00+02:00"),
                observation("obs-2", 135, "2024-03-02T07:15:00Z"),
            ],
            None,
        )))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let records = client
        .list_observation_records(&ObservationQuery::for_patient("40001"))
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    let first = &records[0];
    assert_eq!(first["resource_type"].as_json(), Some(&json!("Observation")));
    assert_eq!(first["uuid"].as_json(), Some(&json!("obs-1")));
    assert_eq!(first["systolic_blood_pressure_value"].as_json(), Some(&json!(120)));
    assert_eq!(
        first["effective_time_frame_date_time"].as_utc(),
        Some(Utc.with_ymd_and_hms(2024, 3, 1, 7, 30, 0).unwrap())
    );
    assert_eq!(
        first["effective_time_frame_date_time_local"]
            .as_local()
            .map(|t| t.to_string()),
        Some("2024-03-01 09:30:00".to_string())
    );
}

#[tokio::test]
async fn test_undecodable_observation_is_normalize_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fhir/r5/Observation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(bundle(
            vec![json!({
                "resourceType": "Observation",
                "valueAttachment": {"data": "!!not base64!!"}
            })],
            None,
        )))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let err = client
        .list_observation_records(&ObservationQuery::for_patient("40001"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Normalize(_)));
}

#[tokio::test]
async fn test_json_error_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/profile"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "token expired", "code": "token_not_valid"})),
        )
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let err = client.get_user().await.unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(401));
    match err {
        ClientError::Api(api) => {
            assert_eq!(api.detail.as_deref(), Some("token expired"));
            assert!(api.url.ends_with("/api/v1/users/profile"));
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_html_error_page_is_replaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/patients"))
        .respond_with(
            ResponseTemplate::new(502)
                .set_body_raw("<html><body>Bad Gateway</body></html>", "text/html"),
        )
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let err = client
        .list_patients()
        .try_collect::<Vec<_>>()
        .await
        .unwrap_err();

    assert!(err.is_transient());
    match err {
        ClientError::Api(api) => assert_eq!(api.detail.as_deref(), Some(HTML_PLACEHOLDER)),
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_body_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/patients/40001"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::new(&test_config(&server)).unwrap();
    let body = api
        .request(
            Endpoint::Rest,
            "patients/40001",
            RequestOptions::default().method(reqwest::Method::DELETE),
        )
        .await
        .unwrap();

    assert!(body.is_none());
}

#[tokio::test]
async fn test_unchecked_request_returns_failing_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fhir/r5/Observation/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "not found"})))
        .mount(&server)
        .await;

    let api = ApiClient::new(&test_config(&server)).unwrap();
    let response = api
        .request_raw(
            Endpoint::Fhir,
            "Observation/missing",
            RequestOptions::default().unchecked(),
        )
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);

    let err = api
        .request_raw(Endpoint::Fhir, "Observation/missing", RequestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
}

#[tokio::test]
async fn test_foreign_continuation_is_refused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": "https://elsewhere.example/api/v1/patients?page=2",
            "results": [{"id": 1}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let err = client
        .list_patients()
        .try_collect::<Vec<_>>()
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::InvalidResponse { .. }));
}

#[tokio::test]
async fn test_continuation_cycle_is_refused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/patients"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": "/api/v1/patients",
            "results": [{"id": 2}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/patients"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": format!("{}/api/v1/patients?page=2", server.uri()),
            "results": [{"id": 1}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let err = client
        .list_patients()
        .try_collect::<Vec<_>>()
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::InvalidResponse { ref reason, .. } if reason.contains("revisits")));
}

#[tokio::test]
async fn test_malformed_envelope_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{not json", "application/json"))
        .mount(&server)
        .await;

    let client = test_client(&server).await;
    let err = client
        .list_patients()
        .try_collect::<Vec<_>>()
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::InvalidResponse { .. }));
}

#[tokio::test]
async fn test_credentials_are_loaded_at_connect() {
    let server = MockServer::start().await;
    let store = MemoryStore::new();
    let credentials = Credentials {
        partner_id: "partner-1".into(),
        client_id: "client-1".into(),
        client_secret: "secret".into(),
    };
    credentials.save(&store).await.unwrap();

    let client = HealthClient::connect(test_config(&server), Box::new(store))
        .await
        .unwrap();

    assert_eq!(client.credentials(), Some(&credentials));
    assert_eq!(client.store().backend(), "memory");
}

#[tokio::test]
async fn test_saved_credentials_reach_the_store() {
    let server = MockServer::start().await;
    let mut client = test_client(&server).await;
    assert!(client.credentials().is_none());

    let credentials = Credentials {
        partner_id: "partner-2".into(),
        client_id: "client-2".into(),
        client_secret: "secret".into(),
    };
    client.save_credentials(&credentials).await.unwrap();

    assert_eq!(client.credentials(), Some(&credentials));
    assert_eq!(
        Credentials::load(client.store()).await.unwrap(),
        Some(credentials)
    );
}

#[tokio::test]
async fn test_patient_id_mappings() {
    let server = MockServer::start().await;
    let client = test_client(&server).await;

    client.set_patient_id_mapping("ext-1", "40001").await.unwrap();
    client.set_patient_id_mapping("ext-2", "40002").await.unwrap();
    client.store().set("unrelated", "x").await.unwrap();

    let mappings = client.patient_id_mappings().await.unwrap();
    assert_eq!(mappings.len(), 2);
    assert_eq!(mappings["ext-1"], "40001");
    assert_eq!(mappings["ext-2"], "40002");
}

#[tokio::test]
async fn test_missing_token_fails_at_connect() {
    let server = MockServer::start().await;
    let config = ClientConfig {
        token: None,
        ..test_config(&server)
    };

    let err = HealthClient::connect(config, Box::new(MemoryStore::new()))
        .await
        .err()
        .expect("connect should fail");
    assert!(matches!(err, ClientError::Config(_)));
}

//! Verify builders and response normalization against JSON test vectors
//! stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests or payloads, and
//! simulated responses. Comparing parsed JSON (not raw strings) avoids false
//! negatives from field-ordering differences.

use serde_json::Value;
use sprest_core::{
    field_metadata, ApiError, Envelope, FieldCreation, FieldScope, HttpMethod, HttpRequest, HttpResponse,
    ListCreation, SpClient, Transport, TransportError,
};

/// Never called: the vectors only exercise builders.
struct NoNetwork;

impl Transport for NoNetwork {
    fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        Err(TransportError("no network in test vectors".to_string()))
    }
}

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        other => panic!("unknown method: {other}"),
    }
}

fn parse_headers(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect()
}

fn assert_request(req: &HttpRequest, expected: &Value, web_url: &str, name: &str) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.url, format!("{web_url}{}", expected["path"].as_str().unwrap()), "{name}: url");
    assert_eq!(req.headers, parse_headers(&expected["headers"]), "{name}: headers");
}

// ---------------------------------------------------------------------------
// Field metadata
// ---------------------------------------------------------------------------

#[test]
fn field_metadata_vectors() {
    let raw = include_str!("../../test-vectors/field_metadata.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input: FieldCreation = serde_json::from_value(case["input"].clone()).unwrap();
        let scope = match case["scope"].as_str().unwrap() {
            "list" => FieldScope::ListColumn,
            "site" => FieldScope::SiteColumn,
            other => panic!("{name}: unknown scope {other}"),
        };

        let result = field_metadata(&input, scope);
        match case["expected_error"].as_str() {
            None => {
                let body: Value = serde_json::from_str(&result.unwrap()).unwrap();
                assert_eq!(body, case["expected_body"], "{name}: body");
            }
            Some("unsupported_field_type") => {
                assert!(matches!(result, Err(ApiError::UnsupportedFieldType(_))), "{name}: {result:?}");
            }
            Some("invalid_input") => {
                assert!(matches!(result, Err(ApiError::InvalidInput(_))), "{name}: {result:?}");
            }
            Some(other) => panic!("{name}: unknown expected error {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn list_creation_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let c = SpClient::new(vectors["web_url"].as_str().unwrap(), NoNetwork);

    for case in vectors["list_creation"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input: ListCreation = serde_json::from_value(case["input"].clone()).unwrap();
        let expected = &case["expected_request"];

        let req = c.lists().metadata(&input).unwrap();
        assert_request(&req, expected, c.web_url(), name);

        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, expected["body"], "{name}: body");
    }
}

#[test]
fn verb_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let c = SpClient::new(vectors["web_url"].as_str().unwrap(), NoNetwork);

    for case in vectors["verbs"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let url = format!("{}{}", c.web_url(), case["url"].as_str().unwrap());
        let body = case["body"].to_string();

        let req = match case["verb"].as_str().unwrap() {
            "get" => c.build_get(&url),
            "merge" => c.build_merge(&url, &body),
            "patch" => c.build_patch(&url, &body),
            other => panic!("{name}: unknown verb {other}"),
        }
        .unwrap();
        assert_request(&req, &case["expected_request"], c.web_url(), name);

        if case["body"].is_object() {
            let sent: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
            assert_eq!(sent, case["body"], "{name}: body");
        } else {
            assert!(req.body.is_none(), "{name}: body");
        }
    }
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

#[test]
fn envelope_vectors() {
    let raw = include_str!("../../test-vectors/envelopes.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["response"];
        let expected = &case["expected"];

        let envelope = Envelope::from_response(HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            status_text: sim["status_text"].as_str().unwrap().to_string(),
            headers: Vec::new(),
            body: sim["body"].as_str().unwrap().to_string(),
        });

        assert_eq!(envelope.ok, expected["ok"].as_bool().unwrap(), "{name}: ok");
        assert_eq!(i64::from(envelope.status_code), expected["status_code"].as_i64().unwrap(), "{name}: status");
        assert_eq!(envelope.body.is_some(), expected["has_body"].as_bool().unwrap(), "{name}: body");
        match expected["message"].as_str() {
            Some(message) => match &envelope.error {
                Some(ApiError::Remote { message: actual, .. }) => assert_eq!(actual, message, "{name}: message"),
                other => panic!("{name}: unexpected error {other:?}"),
            },
            None => assert!(envelope.error.is_none(), "{name}: error"),
        }
    }
}

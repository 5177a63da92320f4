//! Verify build/classify against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected outcomes. Decoded trees are compared as JSON values so key
//! order never matters.

use vitalsource_core::{
    ApiResponse, ClientConfig, CodeOrder, CodesClient, HttpMethod, HttpRequest, HttpResponse,
    ParsedData,
};

const BASE_URL: &str = "http://localhost:3000/";

fn client() -> CodesClient {
    CodesClient::with_config("test-key", ClientConfig::default().with_base_url(BASE_URL)).unwrap()
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn check_request(name: &str, req: &HttpRequest, expected: &serde_json::Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    let endpoint = expected["endpoint"].as_str().unwrap();
    assert_eq!(req.endpoint, endpoint, "{name}: endpoint");
    assert_eq!(req.url, format!("{BASE_URL}{endpoint}"), "{name}: url");

    let expected_headers: Vec<(String, String)> = expected["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect();
    assert_eq!(req.headers, expected_headers, "{name}: headers");

    match expected.get("body") {
        Some(body) => assert_eq!(req.body.as_deref(), body.as_str(), "{name}: body"),
        None => assert!(req.body.is_none(), "{name}: body should be None"),
    }
}

fn simulated(case: &serde_json::Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse::new(
        sim["status"].as_u64().unwrap() as u16,
        sim["body"].as_str().unwrap(),
    )
}

fn check_outcome(name: &str, resp: &ApiResponse, expected: &serde_json::Value) {
    match expected["kind"].as_str().unwrap() {
        "data" => assert_eq!(resp.data().as_data(), Some(&expected["data"]), "{name}: data"),
        "empty" => assert_eq!(resp.data(), &ParsedData::Empty, "{name}: data"),
        "malformed" => assert!(
            matches!(resp.data(), ParsedData::Malformed { .. }),
            "{name}: expected malformed, got {:?}",
            resp.data()
        ),
        "failed" => assert_eq!(resp.data(), &ParsedData::Failed, "{name}: data"),
        other => panic!("{name}: unknown outcome kind: {other}"),
    }

    let errors = serde_json::to_value(resp.errors()).unwrap();
    assert_eq!(errors, expected["errors"], "{name}: errors");
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[test]
fn create_test_vectors() {
    let raw = include_str!("../../test-vectors/create.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let order: CodeOrder = serde_json::from_value(case["input"].clone()).unwrap();

        let req = c.build_create_codes(&order).unwrap();
        check_request(name, &req, &case["expected_request"]);

        let resp = c.parse_response(simulated(case));
        check_outcome(name, &resp, &case["expected_outcome"]);
    }
}

// ---------------------------------------------------------------------------
// Check
// ---------------------------------------------------------------------------

#[test]
fn check_test_vectors() {
    let raw = include_str!("../../test-vectors/check.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let code = case["input_code"].as_str().unwrap();

        let req = c.build_check_code(code);
        check_request(name, &req, &case["expected_request"]);

        let resp = c.parse_response(simulated(case));
        check_outcome(name, &resp, &case["expected_outcome"]);
    }
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

#[test]
fn cancel_test_vectors() {
    let raw = include_str!("../../test-vectors/cancel.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let code = case["input_code"].as_str().unwrap();

        let req = c.build_cancel_code(code);
        check_request(name, &req, &case["expected_request"]);

        let resp = c.parse_response(simulated(case));
        check_outcome(name, &resp, &case["expected_outcome"]);
    }
}

// ---------------------------------------------------------------------------
// Invariant across every vector
// ---------------------------------------------------------------------------

#[test]
fn errors_always_mean_failed() {
    let c = client();
    for raw in [
        include_str!("../../test-vectors/create.json"),
        include_str!("../../test-vectors/check.json"),
        include_str!("../../test-vectors/cancel.json"),
    ] {
        let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();
        for case in vectors["cases"].as_array().unwrap() {
            let resp = c.parse_response(simulated(case));
            if !resp.errors().is_empty() {
                assert_eq!(resp.data().as_bool(), Some(false), "{}", case["name"]);
            }
        }
    }
}

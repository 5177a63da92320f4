use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, MockConfig, API_KEY_HEADER};
use tower::ServiceExt;

const KEY: &str = "test-key";

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn order_body(sku: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><codes sku="{sku}" license-type="default" online-license-type="default" num-codes="1" tag="postman_created_code"/>"#
    )
}

fn request(method: &str, uri: &str, key: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    builder.body(body.to_string()).unwrap()
}

/// Pull the text of the first `<code>` element out of a create response.
fn first_code(body: &str) -> String {
    let start = body.find("<code>").unwrap() + "<code>".len();
    let end = body[start..].find("</code>").unwrap() + start;
    body[start..end].to_string()
}

// --- auth ---

#[tokio::test]
async fn missing_key_returns_403() {
    let resp = app(MockConfig::default())
        .oneshot(request("POST", "/v3/codes", None, &order_body("sku-123")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(body_string(resp).await.is_empty());
}

#[tokio::test]
async fn wrong_key_returns_403() {
    let resp = app(MockConfig::default())
        .oneshot(request("GET", "/v4/codes/ABC", Some("nope"), ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

// --- create ---

#[tokio::test]
async fn create_code_returns_code() {
    let resp = app(MockConfig::default())
        .oneshot(request("POST", "/v3/codes", Some(KEY), &order_body("sku-123")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_string(resp).await;
    assert!(body.starts_with(r#"<codes sku="sku-123">"#), "{body}");
    assert_eq!(first_code(&body).len(), 19);
}

#[tokio::test]
async fn create_multiple_codes() {
    let body = r#"<codes sku="9780000000001" num-codes="3"/>"#;
    let resp = app(MockConfig::default())
        .oneshot(request("POST", "/v3/codes", Some(KEY), body))
        .await
        .unwrap();

    let body = body_string(resp).await;
    assert_eq!(body.matches("<code>").count(), 3);
}

#[tokio::test]
async fn create_unknown_sku_reports_application_error() {
    let resp = app(MockConfig::default())
        .oneshot(request("POST", "/v3/codes", Some(KEY), &order_body("nope")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_string(resp).await;
    assert!(body.contains("<error-code>1013</error-code>"));
    assert!(body.contains("<error-text>SKU not found in catalog</error-text>"));
}

#[tokio::test]
async fn create_malformed_body_reports_application_error() {
    let resp = app(MockConfig::default())
        .oneshot(request("POST", "/v3/codes", Some(KEY), "{\"sku\":1}"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.contains("<error-code>400</error-code>"));
}

#[tokio::test]
async fn create_rate_limited_sku_returns_429() {
    let resp = app(MockConfig::default())
        .oneshot(request("POST", "/v3/codes", Some(KEY), &order_body("rate-limit")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}

// --- check / cancel ---

#[tokio::test]
async fn check_unknown_code_returns_404() {
    let resp = app(MockConfig::default())
        .oneshot(request("GET", "/v4/codes/NOPE", Some(KEY), ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_unknown_code_returns_404() {
    let resp = app(MockConfig::default())
        .oneshot(request("DELETE", "/v4/codes/NOPE", Some(KEY), ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- full lifecycle ---

#[tokio::test]
async fn code_lifecycle() {
    use tower::Service;

    let mut app = app(MockConfig::default()).into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("POST", "/v3/codes", Some(KEY), &order_body("sku-123")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let code = first_code(&body_string(resp).await);

    // check: active
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("GET", &format!("/v4/codes/{code}"), Some(KEY), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_string(resp).await;
    assert!(body.contains(&format!("<code>{code}</code>")));
    assert!(body.contains("<sku>sku-123</sku>"));
    assert!(body.contains("<state>active</state>"));
    assert!(body.contains("<tag>postman_created_code</tag>"));

    // cancel: empty 200
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("DELETE", &format!("/v4/codes/{code}"), Some(KEY), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.is_empty());

    // cancel again: application error
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("DELETE", &format!("/v4/codes/{code}"), Some(KEY), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.contains("<error-code>1101</error-code>"));

    // check: cancelled
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(request("GET", &format!("/v4/codes/{code}"), Some(KEY), ""))
        .await
        .unwrap();
    assert!(body_string(resp).await.contains("<state>cancelled</state>"));
}

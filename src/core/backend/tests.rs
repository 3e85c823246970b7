use std::time::Duration;

use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use super::{HttpBackend, VerificationBackend};
use crate::core::common::BackendResponseError;

fn backend(mock_server: &MockServer) -> HttpBackend {
    HttpBackend::new(&mock_server.uri(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn create_session_posts_an_empty_object() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/create-session"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "url": "https://verify.stripe.com/start/test_123", "session_id": "vs_123"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let res = backend(&mock_server).create_session().await.unwrap();

    assert_eq!(
        Some(("https://verify.stripe.com/start/test_123", "vs_123")),
        res.redirect_target()
    );
}

#[tokio::test]
async fn create_session_keeps_partial_payloads() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/create-session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "session_id": "vs_123" })))
        .mount(&mock_server)
        .await;

    let res = backend(&mock_server).create_session().await.unwrap();

    assert_eq!(None, res.url);
    assert_eq!(None, res.redirect_target());
}

#[tokio::test]
async fn create_session_fails_on_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/create-session"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&mock_server)
        .await;

    assert!(backend(&mock_server).create_session().await.is_err());
}

#[tokio::test]
async fn base_url_path_prefix_is_kept() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/verification-status/vs_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "processing" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend =
        HttpBackend::new(&format!("{}/api/", mock_server.uri()), Duration::from_secs(5)).unwrap();

    let res = backend.verification_status("vs_1".to_string()).await.unwrap();

    assert_eq!("processing", res.status);
}

#[tokio::test]
async fn verification_status_returns_unknown_strings_verbatim() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/verification-status/vs_42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "on_hold" })))
        .mount(&mock_server)
        .await;

    let res = backend(&mock_server)
        .verification_status("vs_42".to_string())
        .await
        .unwrap();

    assert_eq!("on_hold", res.status);
}

#[tokio::test]
async fn verification_status_fails_on_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/verification-status/vs_42"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "status": "verified" })))
        .mount(&mock_server)
        .await;

    let err = backend(&mock_server)
        .verification_status("vs_42".to_string())
        .await
        .unwrap_err();

    let err = err.downcast_ref::<BackendResponseError>().unwrap();
    assert_eq!(Some(500), err.status.map(|s| s.as_u16()));
}

#[tokio::test]
async fn verification_status_fails_without_status_field() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/verification-status/vs_42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": "verified" })))
        .mount(&mock_server)
        .await;

    assert!(backend(&mock_server)
        .verification_status("vs_42".to_string())
        .await
        .is_err());
}

#[test]
fn rejects_invalid_backend_url() {
    assert!(HttpBackend::new("not a url", Duration::from_secs(5)).is_err());
    assert!(HttpBackend::new("mailto:ops@example.com", Duration::from_secs(5)).is_err());
}

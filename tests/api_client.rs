use dzdl::common::api::backend::TaskBackend;
use dzdl::common::api::client::ApiClient;
use dzdl::common::api::error::ApiError;
use dzdl::downloader::RetrievalAction;
use dzdl::downloader::poller::{ProgressPoller, Transition};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_submit_sends_form_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/download"))
        .and(body_string_contains("url=http%3A%2F%2Fx"))
        .and(body_string_contains("arl_cookie=abc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "task_id": "t1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let resp = client.submit("http://x", "abc").await.unwrap();
    assert_eq!(resp.task_id(), Some("t1"));
}

#[tokio::test]
async fn test_submit_error_body_on_bad_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid Deezer URL"})))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let resp = client.submit("http://x", "abc").await.unwrap();
    assert_eq!(resp.task_id(), None);
    assert_eq!(resp.error(), Some("Invalid Deezer URL"));
}

#[tokio::test]
async fn test_non_json_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let err = client.submit("http://x", "abc").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_progress_queries_task_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/progress"))
        .and(query_param("task_id", "t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "starting": false,
            "current": 3,
            "total": 10,
            "finished": false,
            "error": null,
            "zip_ready": false
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let resp = client.progress("t1").await.unwrap();
    assert_eq!(resp.counters(), Some((3, 10)));
    assert_eq!(resp.error(), None);
}

#[tokio::test]
async fn test_progress_not_found_still_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/progress"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "Progress not found. Task may have finished or an error occurred.",
            "finished": true
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let resp = client.progress("gone").await.unwrap();
    assert!(resp.is_finished());
    assert!(resp.error().is_some());
}

#[tokio::test]
async fn test_progress_off_type_field_is_interpreted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/progress"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"starting": true, "current": "0"})),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let poller = ProgressPoller::new("t1", Arc::new(client));
    assert_eq!(poller.query().await, Transition::Starting);
}

#[tokio::test]
async fn test_transport_failure() {
    // 端口 1 上没有服务
    let client = ApiClient::new("http://127.0.0.1:1").unwrap();
    let err = client.progress("t1").await.unwrap_err();
    assert!(matches!(err, ApiError::Reqwest(_)));
}

#[tokio::test]
async fn test_fetch_zip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download_zip/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04zipdata".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let action = RetrievalAction::new("t1", client.zip_url("t1").unwrap());
    let dir = tempfile::tempdir().unwrap();

    let saved = action.fetch(&client, dir.path()).await.unwrap();
    assert_eq!(saved, dir.path().join("t1.zip"));
    assert_eq!(std::fs::read(&saved).unwrap(), b"PK\x03\x04zipdata");
}

#[tokio::test]
async fn test_fetch_zip_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download_zip/t1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let action = RetrievalAction::new("t1", client.zip_url("t1").unwrap());
    let dir = tempfile::tempdir().unwrap();

    let err = action.fetch(&client, dir.path()).await.unwrap_err();
    assert!(matches!(err, ApiError::HttpStatus(status) if status.as_u16() == 404));
}

mod common;

use axum::http::StatusCode;
use common::{TestApp, OPENAI_KEY};
use launch_service::services::providers::ProviderId;
use launch_service::services::StaticCredentials;
use tower::util::ServiceExt;

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;
    app.store.create(ProviderId::OpenAi, "gpt-4o");

    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "launch-service");
    assert_eq!(body["activeSessions"], 1);
}

#[tokio::test]
async fn providers_lists_credential_availability() {
    let app =
        TestApp::spawn_with(StaticCredentials::new().with_key(ProviderId::OpenAi, OPENAI_KEY))
            .await;

    let (status, body) = app.get("/providers").await;

    assert_eq!(status, StatusCode::OK);
    let providers = body["providers"].as_array().unwrap();
    assert_eq!(providers.len(), 5);

    let configured: Vec<&str> = providers
        .iter()
        .filter(|p| p["configured"] == true)
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert_eq!(configured, vec!["openai"]);
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = TestApp::spawn().await;
    let request = axum::http::Request::builder()
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use launch_service::config::{LaunchConfig, SessionConfig, UpstreamConfig};
use launch_service::services::providers::ProviderId;
use launch_service::services::{ManualClock, SessionStore, StaticCredentials};
use launch_service::{build_router, AppState};
use serde_json::Value;
use service_core::config::Config as CoreConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;
use wiremock::MockServer;

pub const OPENAI_KEY: &str = "sk-test-openai";
pub const ANTHROPIC_KEY: &str = "sk-test-anthropic";
pub const GOOGLE_KEY: &str = "test-google";
pub const GROQ_KEY: &str = "gsk-test";
pub const OPENROUTER_KEY: &str = "sk-or-test";

pub struct TestApp {
    pub router: Router,
    pub store: SessionStore,
    pub clock: Arc<ManualClock>,
    pub provider: MockServer,
}

impl TestApp {
    /// App with a credential for every provider, all pointed at one mock server.
    pub async fn spawn() -> Self {
        let credentials = StaticCredentials::new()
            .with_key(ProviderId::OpenAi, OPENAI_KEY)
            .with_key(ProviderId::Anthropic, ANTHROPIC_KEY)
            .with_key(ProviderId::Google, GOOGLE_KEY)
            .with_key(ProviderId::Groq, GROQ_KEY)
            .with_key(ProviderId::OpenRouter, OPENROUTER_KEY);
        Self::spawn_with(credentials).await
    }

    pub async fn spawn_with(credentials: StaticCredentials) -> Self {
        let provider = MockServer::start().await;

        let base_urls: HashMap<ProviderId, String> = ProviderId::ALL
            .into_iter()
            .map(|id| (id, provider.uri()))
            .collect();

        let config = LaunchConfig {
            common: CoreConfig {
                port: 0,
                log_level: "error".to_string(),
            },
            sessions: SessionConfig::default(),
            upstream: UpstreamConfig {
                connect_timeout_secs: 2,
                request_timeout_secs: 10,
                base_urls,
            },
            otlp_endpoint: None,
        };

        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = SessionStore::new(clock.clone(), config.sessions.ttl());
        let state = AppState::new(config, Arc::new(credentials), store.clone())
            .expect("Failed to build app state");

        TestApp {
            router: build_router(state),
            store,
            clock,
            provider,
        }
    }

    pub async fn post_generate(&self, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/generate")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// POST a raw body, optionally without a content type.
    pub async fn post_generate_raw(
        &self,
        body: &'static str,
        content_type: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("POST").uri("/generate");
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn get_status(&self, session_id: &str) -> (StatusCode, Value) {
        self.get(&format!("/status/{}", session_id)).await
    }

    /// Poll status until `isComplete` is true.
    pub async fn wait_for_completion(&self, session_id: &str) -> Value {
        for _ in 0..200 {
            let (status, body) = self.get_status(session_id).await;
            assert_eq!(status, StatusCode::OK, "session vanished: {}", body);
            if body["isComplete"] == true {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session {} never completed", session_id);
    }

    /// Number of requests the mock provider has seen.
    pub async fn upstream_calls(&self) -> usize {
        self.provider
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}

/// Join SSE `data:` payloads into a response body.
pub fn sse_body(payloads: &[String]) -> String {
    payloads
        .iter()
        .map(|p| format!("data: {}\n\n", p))
        .collect()
}

pub fn chat_delta(text: &str) -> String {
    serde_json::json!({"choices": [{"index": 0, "delta": {"content": text}}]}).to_string()
}

pub fn anthropic_delta(text: &str) -> String {
    serde_json::json!({
        "type": "content_block_delta",
        "index": 0,
        "delta": {"type": "text_delta", "text": text}
    })
    .to_string()
}

pub fn gemini_chunk(text: &str) -> String {
    serde_json::json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
    })
    .to_string()
}

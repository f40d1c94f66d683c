use crate::dtos::HealthResponse;
use crate::startup::AppState;
use axum::{extract::State, Json};

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "launch-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_sessions: state.store.len(),
    })
}

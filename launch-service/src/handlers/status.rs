use crate::dtos::StatusResponse;
use crate::services::clean_content;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;

/// Current cleaned content for a session. Never mutates the session.
pub async fn session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    let snapshot = state
        .store
        .snapshot(&session_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Session not found")))?;

    Ok(Json(StatusResponse {
        content: clean_content(&snapshot.content),
        is_complete: snapshot.is_complete,
        error: snapshot.failure,
    }))
}

use crate::dtos::{GenerateRequest, GenerateResponse};
use crate::startup::AppState;
use axum::{body::Bytes, extract::State, Json};
use service_core::error::AppError;

/// Start a generation; the body streams in the background.
///
/// The body is read raw so that a missing body or content type still reaches
/// field validation, and a malformed one gets the usual error envelope.
pub async fn generate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerateResponse>, AppError> {
    let request = GenerateRequest::from_body(&body)?;
    let session_id = state.dispatcher.generate(request.into()).await?;

    Ok(Json(GenerateResponse {
        session_id,
        is_complete: false,
    }))
}

use crate::services::providers::ProviderId;
use crate::services::GenerateCommand;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

/// `POST /generate` body. Every field is optional on the wire so that a
/// missing field reaches validation and gets its own message.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    pub idea: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
}

impl GenerateRequest {
    /// Parse a raw request body. An empty body is an empty request, so it
    /// fails field validation like `{}` does; any other body must be a JSON
    /// object whose fields are strings.
    pub fn from_body(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid request body: {}", e)))
    }
}

impl From<GenerateRequest> for GenerateCommand {
    fn from(req: GenerateRequest) -> Self {
        Self {
            idea: req.idea,
            model: req.model,
            provider: req.provider,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub session_id: String,
    pub is_complete: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub content: String,
    pub is_complete: bool,
    /// Present only when the upstream stream broke.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: ProviderId,
    pub configured: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProvidersResponse {
    pub providers: Vec<ProviderInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub active_sessions: usize,
}

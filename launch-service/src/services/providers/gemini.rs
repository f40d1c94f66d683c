//! Gemini adapter (contents/parts style).
//!
//! Streams through `streamGenerateContent?alt=sse`, which emits one
//! `GenerateContentResponse` per `data:` line and simply closes the stream
//! when done; there is no sentinel line.

use super::{
    join_url, json_headers, ChunkEvent, ProviderAdapter, ProviderError, ProviderId,
    MAX_OUTPUT_TOKENS, TEMPERATURE,
};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

/// Gemini API base URL.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiAdapter {
    base_url: String,
}

impl GeminiAdapter {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            base_url: base_url.unwrap_or_else(|| GEMINI_API_BASE.to_string()),
        }
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Google
    }

    fn endpoint(&self, model: &str) -> String {
        join_url(
            &self.base_url,
            &format!("models/{}:streamGenerateContent?alt=sse", model),
        )
    }

    fn build_headers(&self, api_key: &str) -> Result<HeaderMap, ProviderError> {
        json_headers("x-goog-api-key", api_key)
    }

    fn build_body(&self, _model: &str, prompt: &str) -> Result<serde_json::Value, ProviderError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };
        Ok(serde_json::to_value(request)?)
    }

    fn validate_model(&self, model: &str) -> bool {
        model.starts_with("gemini-")
    }

    fn extract(&self, chunk: &serde_json::Value) -> ChunkEvent {
        let Ok(response) = GenerateContentResponse::deserialize(chunk) else {
            return ChunkEvent::Skip("chunk is not a GenerateContentResponse");
        };

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text);

        match text {
            Some(text) => ChunkEvent::Fragment(text),
            None => ChunkEvent::Skip("candidates[0].content.parts[0].text missing"),
        }
    }
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

//! Messages-style adapter (Anthropic).

use super::{
    join_url, json_headers, ChunkEvent, ProviderAdapter, ProviderError, ProviderId,
    MAX_OUTPUT_TOKENS, TEMPERATURE,
};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const MESSAGES_PATH: &str = "/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicAdapter {
    base_url: String,
}

impl AnthropicAdapter {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            base_url: base_url.unwrap_or_else(|| ANTHROPIC_API_BASE.to_string()),
        }
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    fn endpoint(&self, _model: &str) -> String {
        join_url(&self.base_url, MESSAGES_PATH)
    }

    fn build_headers(&self, api_key: &str) -> Result<HeaderMap, ProviderError> {
        let mut headers = json_headers("x-api-key", api_key)?;
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        Ok(headers)
    }

    fn build_body(&self, model: &str, prompt: &str) -> Result<serde_json::Value, ProviderError> {
        let request = MessagesRequest {
            model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            max_tokens: MAX_OUTPUT_TOKENS,
            temperature: TEMPERATURE,
            stream: true,
        };
        Ok(serde_json::to_value(request)?)
    }

    fn validate_model(&self, model: &str) -> bool {
        model.starts_with("claude-")
    }

    /// Accepts both a whole-message shape (`content[0].text`) and the
    /// incremental `content_block_delta` events; `message_stop` ends the stream
    /// and an `error` event fails it.
    fn extract(&self, chunk: &serde_json::Value) -> ChunkEvent {
        let Ok(event) = MessagesEvent::deserialize(chunk) else {
            return ChunkEvent::Skip("chunk is not a messages event");
        };

        match event.event_type.as_deref() {
            Some("message_stop") => return ChunkEvent::Done,
            Some("error") => {
                let error = event.error.unwrap_or_default();
                let kind = error.kind.unwrap_or_else(|| "error".to_string());
                return match error.message {
                    Some(message) => ChunkEvent::Failed(format!("{}: {}", kind, message)),
                    None => ChunkEvent::Failed(kind),
                };
            }
            _ => {}
        }

        if let Some(text) = event.delta.and_then(|d| d.text) {
            return ChunkEvent::Fragment(text);
        }

        match event.content.into_iter().next().and_then(|block| block.text) {
            Some(text) => ChunkEvent::Fragment(text),
            None => ChunkEvent::Skip("content[0].text missing"),
        }
    }
}

// ============================================================================
// Messages API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesEvent {
    #[serde(rename = "type", default)]
    event_type: Option<String>,
    #[serde(default)]
    delta: Option<TextDelta>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamError {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

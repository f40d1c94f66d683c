//! OpenAI-compatible chat-completions adapters (OpenAI, Groq, OpenRouter).

use super::{
    join_url, json_headers, ChunkEvent, ProviderAdapter, ProviderError, ProviderId,
    MAX_OUTPUT_TOKENS, TEMPERATURE,
};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";
const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// One chat-completions provider; they differ only in base URL and model check.
pub struct ChatCompletionsAdapter {
    id: ProviderId,
    base_url: String,
    model_check: fn(&str) -> bool,
}

impl ChatCompletionsAdapter {
    pub fn openai(base_url: Option<String>) -> Self {
        Self {
            id: ProviderId::OpenAi,
            base_url: base_url.unwrap_or_else(|| OPENAI_API_BASE.to_string()),
            model_check: |model| model.starts_with("gpt-") || model.starts_with("ft:gpt-"),
        }
    }

    pub fn groq(base_url: Option<String>) -> Self {
        Self {
            id: ProviderId::Groq,
            base_url: base_url.unwrap_or_else(|| GROQ_API_BASE.to_string()),
            model_check: |model| model.contains("llama2") || model.contains("mixtral"),
        }
    }

    /// OpenRouter routes to many vendors and accepts any model id.
    pub fn openrouter(base_url: Option<String>) -> Self {
        Self {
            id: ProviderId::OpenRouter,
            base_url: base_url.unwrap_or_else(|| OPENROUTER_API_BASE.to_string()),
            model_check: |_| true,
        }
    }
}

impl ProviderAdapter for ChatCompletionsAdapter {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn endpoint(&self, _model: &str) -> String {
        join_url(&self.base_url, CHAT_COMPLETIONS_PATH)
    }

    fn build_headers(&self, api_key: &str) -> Result<HeaderMap, ProviderError> {
        json_headers("authorization", &format!("Bearer {}", api_key))
    }

    fn build_body(&self, model: &str, prompt: &str) -> Result<serde_json::Value, ProviderError> {
        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
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
        (self.model_check)(model)
    }

    fn extract(&self, chunk: &serde_json::Value) -> ChunkEvent {
        let Ok(chunk) = ChatChunk::deserialize(chunk) else {
            return ChunkEvent::Skip("chunk is not a chat completion delta");
        };

        match chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
        {
            Some(text) => ChunkEvent::Fragment(text),
            None => ChunkEvent::Skip("choices[0].delta.content missing"),
        }
    }
}

// ============================================================================
// Chat Completions Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

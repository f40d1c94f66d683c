//! LLM provider adapters and the registry that resolves them.
//!
//! An adapter is pure data plus pure functions: where to send the request,
//! which headers and body to send, whether a model id looks plausible, and
//! how to pull a text fragment out of one streamed JSON chunk. Adapters never
//! perform I/O; the dispatcher owns the HTTP client.

pub mod anthropic;
pub mod chat_completions;
pub mod gemini;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub use anthropic::AnthropicAdapter;
pub use chat_completions::ChatCompletionsAdapter;
pub use gemini::GeminiAdapter;

/// Shared generation settings sent to every provider.
pub const MAX_OUTPUT_TOKENS: u32 = 4000;
pub const TEMPERATURE: f32 = 0.7;

/// Error type for adapter operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Invalid header value for {0}")]
    InvalidHeader(&'static str),

    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Built-in provider identifiers, as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Anthropic,
    Google,
    Groq,
    OpenRouter,
}

impl ProviderId {
    pub const ALL: [ProviderId; 5] = [
        ProviderId::OpenAi,
        ProviderId::Anthropic,
        ProviderId::Google,
        ProviderId::Groq,
        ProviderId::OpenRouter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Anthropic => "anthropic",
            ProviderId::Google => "google",
            ProviderId::Groq => "groq",
            ProviderId::OpenRouter => "openrouter",
        }
    }

    /// Upper-cased id used to name environment variables (`OPENAI_API_KEY`).
    pub fn env_prefix(&self) -> String {
        self.as_str().to_uppercase()
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or(())
    }
}

/// What one parsed stream chunk means for the session buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkEvent {
    /// Text to append.
    Fragment(String),

    /// The provider signalled end of generation.
    Done,

    /// The provider reported an error inside the stream.
    Failed(String),

    /// Parsed fine but carries no text at the expected path.
    Skip(&'static str),
}

/// Fixed request/response conventions for one provider.
pub trait ProviderAdapter: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Full request URL. Only the contents/parts style depends on the model.
    fn endpoint(&self, model: &str) -> String;

    fn build_headers(&self, api_key: &str) -> Result<HeaderMap, ProviderError>;

    /// Request payload, asking for streamed output.
    fn build_body(&self, model: &str, prompt: &str) -> Result<serde_json::Value, ProviderError>;

    /// Coarse naming-convention check; passing it does not mean the provider
    /// knows the model.
    fn validate_model(&self, model: &str) -> bool;

    fn extract(&self, chunk: &serde_json::Value) -> ChunkEvent;
}

/// Header map with JSON content type and one sensitive credential header.
pub(crate) fn json_headers(
    auth_header: &'static str,
    auth_value: &str,
) -> Result<HeaderMap, ProviderError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut value =
        HeaderValue::from_str(auth_value).map_err(|_| ProviderError::InvalidHeader(auth_header))?;
    value.set_sensitive(true);
    headers.insert(auth_header, value);

    Ok(headers)
}

/// Join a base URL and a path without doubling or dropping the slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Lookup table from provider id to adapter.
#[derive(Clone)]
pub struct ProviderRegistry {
    adapters: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    /// The five built-in adapters at their public endpoints.
    pub fn with_defaults() -> Self {
        Self::with_base_urls(&HashMap::new())
    }

    /// Built-in adapters, with `base_urls` replacing the default base URL of
    /// any provider it names.
    pub fn with_base_urls(base_urls: &HashMap<ProviderId, String>) -> Self {
        let base = |id: ProviderId| base_urls.get(&id).cloned();

        let adapters: Vec<Arc<dyn ProviderAdapter>> = vec![
            Arc::new(ChatCompletionsAdapter::openai(base(ProviderId::OpenAi))),
            Arc::new(AnthropicAdapter::new(base(ProviderId::Anthropic))),
            Arc::new(GeminiAdapter::new(base(ProviderId::Google))),
            Arc::new(ChatCompletionsAdapter::groq(base(ProviderId::Groq))),
            Arc::new(ChatCompletionsAdapter::openrouter(base(
                ProviderId::OpenRouter,
            ))),
        ];

        Self {
            adapters: adapters.into_iter().map(|a| (a.id(), a)).collect(),
        }
    }

    pub fn lookup(&self, provider: &str) -> Option<Arc<dyn ProviderAdapter>> {
        let id = ProviderId::from_str(provider).ok()?;
        self.adapters.get(&id).cloned()
    }

    /// Registered ids in declaration order.
    pub fn ids(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|id| self.adapters.contains_key(id))
            .collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_resolves_every_builtin_provider() {
        let registry = ProviderRegistry::with_defaults();
        for id in ProviderId::ALL {
            let adapter = registry.lookup(id.as_str()).expect("adapter registered");
            assert_eq!(adapter.id(), id);
        }
    }

    #[test]
    fn lookup_is_case_sensitive_and_rejects_unknown() {
        let registry = ProviderRegistry::with_defaults();
        assert!(registry.lookup("OpenAI").is_none());
        assert!(registry.lookup("mistral").is_none());
        assert!(registry.lookup("").is_none());
    }

    #[test]
    fn base_url_override_changes_only_that_provider() {
        let mut overrides = HashMap::new();
        overrides.insert(ProviderId::OpenAi, "http://127.0.0.1:9999/".to_string());
        let registry = ProviderRegistry::with_base_urls(&overrides);

        assert_eq!(
            registry.lookup("openai").unwrap().endpoint("gpt-4o"),
            "http://127.0.0.1:9999/chat/completions"
        );
        assert_eq!(
            registry.lookup("groq").unwrap().endpoint("mixtral-8x7b"),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn env_prefix_is_upper_case_id() {
        assert_eq!(ProviderId::OpenRouter.env_prefix(), "OPENROUTER");
        assert_eq!(ProviderId::OpenAi.env_prefix(), "OPENAI");
    }

    #[test]
    fn ids_lists_all_in_order() {
        assert_eq!(
            ProviderRegistry::with_defaults().ids(),
            ProviderId::ALL.to_vec()
        );
    }

    #[test]
    fn credential_header_is_marked_sensitive() {
        let headers = json_headers("x-api-key", "secret").unwrap();
        assert!(headers["x-api-key"].is_sensitive());
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn invalid_credential_characters_are_rejected() {
        assert!(json_headers("x-api-key", "bad\nkey").is_err());
    }
}

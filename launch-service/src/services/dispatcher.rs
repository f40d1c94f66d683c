//! Validates generation requests and hands the upstream stream to a
//! background accumulator.

use crate::services::accumulator::StreamAccumulator;
use crate::services::credentials::CredentialSource;
use crate::services::prompt::build_prompt;
use crate::services::providers::{ProviderAdapter, ProviderError, ProviderId, ProviderRegistry};
use crate::services::session_store::SessionStore;
use metrics::counter;
use secrecy::{ExposeSecret, SecretString};
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;

/// Caller-facing summary for every server-side generation failure.
pub const GENERATION_FAILED: &str = "Failed to generate framework";

/// Upstream error bodies are truncated to this many characters in responses.
const MAX_UPSTREAM_BODY_CHARS: usize = 2000;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Idea is required")]
    IdeaRequired,

    #[error("Model is required")]
    ModelRequired,

    #[error("Provider is required")]
    ProviderRequired,

    #[error("Invalid provider")]
    InvalidProvider,

    #[error("Invalid model ID for {0}. Please check the model ID format.")]
    InvalidModel(ProviderId),

    #[error("{0} API key not configured")]
    MissingCredential(ProviderId),

    #[error("Failed to build provider request: {0}")]
    Request(#[from] ProviderError),

    #[error("Provider request failed: {0}")]
    Transport(String),

    #[error("Provider returned {status}: {body}")]
    Upstream { status: u16, body: String },
}

impl GenerateError {
    /// Short label for the rejection metric.
    pub fn reason(&self) -> &'static str {
        match self {
            GenerateError::IdeaRequired => "idea_required",
            GenerateError::ModelRequired => "model_required",
            GenerateError::ProviderRequired => "provider_required",
            GenerateError::InvalidProvider => "invalid_provider",
            GenerateError::InvalidModel(_) => "invalid_model",
            GenerateError::MissingCredential(_) => "missing_credential",
            GenerateError::Request(_) => "request_build",
            GenerateError::Transport(_) => "transport",
            GenerateError::Upstream { .. } => "upstream_status",
        }
    }

    /// Missing fields and unknown providers are reported as 400. Everything
    /// else, including a model id the provider's naming check rejects, is a
    /// generation failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GenerateError::IdeaRequired
                | GenerateError::ModelRequired
                | GenerateError::ProviderRequired
                | GenerateError::InvalidProvider
        )
    }
}

impl From<GenerateError> for AppError {
    fn from(err: GenerateError) -> Self {
        if err.is_client_error() {
            AppError::BadRequest(anyhow::anyhow!(err.to_string()))
        } else {
            AppError::OperationFailed {
                summary: GENERATION_FAILED.to_string(),
                details: err.to_string(),
            }
        }
    }
}

/// Raw request fields; any may be missing.
#[derive(Debug, Clone, Default)]
pub struct GenerateCommand {
    pub idea: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
}

/// A request that passed every precondition.
struct ValidatedRequest {
    idea: String,
    model: String,
    adapter: Arc<dyn ProviderAdapter>,
    api_key: SecretString,
}

#[derive(Clone)]
pub struct GenerationDispatcher {
    registry: ProviderRegistry,
    credentials: Arc<dyn CredentialSource>,
    store: SessionStore,
    client: reqwest::Client,
}

impl GenerationDispatcher {
    pub fn new(
        registry: ProviderRegistry,
        credentials: Arc<dyn CredentialSource>,
        store: SessionStore,
        client: reqwest::Client,
    ) -> Self {
        Self {
            registry,
            credentials,
            store,
            client,
        }
    }

    /// Start a generation and return its session id without waiting for the
    /// body. The session exists before the upstream request is sent, so a
    /// status poll right after this returns always finds it.
    pub async fn generate(&self, command: GenerateCommand) -> Result<String, GenerateError> {
        let request = self.validate(command).inspect_err(|e| {
            counter!("generation_rejected_total", "reason" => e.reason()).increment(1);
        })?;

        let adapter = request.adapter;
        let provider = adapter.id();
        let prompt = build_prompt(&request.idea);
        let headers = adapter.build_headers(request.api_key.expose_secret())?;
        let body = adapter.build_body(&request.model, &prompt)?;
        let url = adapter.endpoint(&request.model);

        let session_id = self.store.create(provider, &request.model);
        let pending = PendingSession::new(self.store.clone(), session_id.clone());
        counter!("generations_started_total", "provider" => provider.as_str()).increment(1);

        tracing::info!(
            session_id = %session_id,
            provider = %provider,
            model = %request.model,
            idea_len = request.idea.len(),
            "Dispatching generation"
        );

        let response = match self.client.post(&url).headers(headers).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                self.count_upstream_error(provider);
                return Err(GenerateError::Transport(e.without_url().to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            self.count_upstream_error(provider);
            return Err(GenerateError::Upstream {
                status: status.as_u16(),
                body: text.chars().take(MAX_UPSTREAM_BODY_CHARS).collect(),
            });
        }

        pending.hand_off();
        let accumulator = StreamAccumulator::new(self.store.clone(), session_id.clone(), adapter);
        let span = tracing::info_span!(
            "ingest",
            session_id = %session_id,
            provider = %provider
        );
        tokio::spawn(accumulator.run(response.bytes_stream()).instrument(span));

        Ok(session_id)
    }

    /// Provider ids paired with whether a credential is currently available.
    pub fn provider_status(&self) -> Vec<(ProviderId, bool)> {
        self.registry
            .ids()
            .into_iter()
            .map(|id| (id, self.credentials.api_key(id).is_some()))
            .collect()
    }

    fn validate(&self, command: GenerateCommand) -> Result<ValidatedRequest, GenerateError> {
        let idea = non_empty(command.idea).ok_or(GenerateError::IdeaRequired)?;
        let model = non_empty(command.model).ok_or(GenerateError::ModelRequired)?;
        let provider = non_empty(command.provider).ok_or(GenerateError::ProviderRequired)?;

        let adapter = self
            .registry
            .lookup(&provider)
            .ok_or(GenerateError::InvalidProvider)?;

        if !adapter.validate_model(&model) {
            return Err(GenerateError::InvalidModel(adapter.id()));
        }

        let api_key = self
            .credentials
            .api_key(adapter.id())
            .ok_or(GenerateError::MissingCredential(adapter.id()))?;

        Ok(ValidatedRequest {
            idea,
            model,
            adapter,
            api_key,
        })
    }

    fn count_upstream_error(&self, provider: ProviderId) {
        counter!("upstream_errors_total", "provider" => provider.as_str()).increment(1);
    }
}

/// Removes a freshly created session unless it was handed to an accumulator.
///
/// Covers early returns and the handler future being dropped while the
/// upstream response head is still pending.
struct PendingSession {
    store: SessionStore,
    session_id: String,
    armed: bool,
}

impl PendingSession {
    fn new(store: SessionStore, session_id: String) -> Self {
        Self {
            store,
            session_id,
            armed: true,
        }
    }

    fn hand_off(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingSession {
    fn drop(&mut self) {
        if self.armed && self.store.remove(&self.session_id).is_some() {
            tracing::debug!(
                session_id = %self.session_id,
                "Removed session that never reached its stream"
            );
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

//! Per-request provider credential lookup.

use crate::services::providers::ProviderId;
use secrecy::{ExposeSecret, Secret, SecretString};
use std::collections::HashMap;

/// Resolves the API key for a provider at request time.
pub trait CredentialSource: Send + Sync {
    fn api_key(&self, provider: ProviderId) -> Option<SecretString>;
}

/// Reads `<PROVIDER>_API_KEY` from the process environment on every call, so
/// a key added after startup is picked up without a restart.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl EnvCredentials {
    pub fn var_name(provider: ProviderId) -> String {
        format!("{}_API_KEY", provider.env_prefix())
    }
}

impl CredentialSource for EnvCredentials {
    fn api_key(&self, provider: ProviderId) -> Option<SecretString> {
        std::env::var(Self::var_name(provider))
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(Secret::new)
    }
}

/// Fixed keys, for tests and embedding.
#[derive(Default)]
pub struct StaticCredentials {
    keys: HashMap<ProviderId, SecretString>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, provider: ProviderId, key: impl Into<String>) -> Self {
        self.keys.insert(provider, Secret::new(key.into()));
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn api_key(&self, provider: ProviderId) -> Option<SecretString> {
        self.keys
            .get(&provider)
            .map(|key| Secret::new(key.expose_secret().clone()))
    }
}

use crate::services::providers::ProviderId;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Sessions idle for longer than this are evicted (1 hour).
const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Period of the background eviction sweep (5 minutes).
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Covers the whole streamed generation, not just the response head.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, Deserialize)]
pub struct LaunchConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub sessions: SessionConfig,
    pub upstream: UpstreamConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Base URL overrides keyed by provider, e.g. to point at a local mock.
    #[serde(default)]
    pub base_urls: HashMap<ProviderId, String>,
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_SESSION_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl UpstreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            base_urls: HashMap::new(),
        }
    }
}

impl LaunchConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let mut base_urls = HashMap::new();
        for provider in ProviderId::ALL {
            let key = format!("{}_BASE_URL", provider.env_prefix());
            if let Ok(url) = env::var(&key) {
                base_urls.insert(provider, url);
            }
        }

        Ok(LaunchConfig {
            common: common_config,
            sessions: SessionConfig {
                ttl_secs: get_env_u64("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS, is_prod)?,
                sweep_interval_secs: get_env_u64(
                    "SESSION_SWEEP_INTERVAL_SECS",
                    DEFAULT_SWEEP_INTERVAL_SECS,
                    is_prod,
                )?,
            },
            upstream: UpstreamConfig {
                connect_timeout_secs: get_env_u64(
                    "PROVIDER_CONNECT_TIMEOUT_SECS",
                    DEFAULT_CONNECT_TIMEOUT_SECS,
                    is_prod,
                )?,
                request_timeout_secs: get_env_u64(
                    "PROVIDER_REQUEST_TIMEOUT_SECS",
                    DEFAULT_REQUEST_TIMEOUT_SECS,
                    is_prod,
                )?,
                base_urls,
            },
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn get_env_u64(key: &str, default: u64, is_prod: bool) -> Result<u64, AppError> {
    get_env(key, Some(&default.to_string()), is_prod)?
        .parse()
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("{} must be an integer: {}", key, e)))
}

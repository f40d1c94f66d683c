//! Application startup and lifecycle management.

use crate::config::LaunchConfig;
use crate::handlers;
use crate::services::providers::ProviderRegistry;
use crate::services::{
    CredentialSource, EnvCredentials, GenerationDispatcher, SessionStore, SystemClock,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: LaunchConfig,
    pub store: SessionStore,
    pub dispatcher: GenerationDispatcher,
}

impl AppState {
    /// Wire the store, registry and dispatcher from configuration.
    pub fn new(
        config: LaunchConfig,
        credentials: Arc<dyn CredentialSource>,
        store: SessionStore,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.upstream.connect_timeout())
            .timeout(config.upstream.request_timeout())
            .build()
            .map_err(|e| {
                AppError::InternalError(anyhow::anyhow!("Failed to create HTTP client: {}", e))
            })?;

        let registry = ProviderRegistry::with_base_urls(&config.upstream.base_urls);
        let dispatcher = GenerationDispatcher::new(registry, credentials, store.clone(), client);

        Ok(Self {
            config,
            store,
            dispatcher,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/providers", get(handlers::list_providers))
        .route("/generate", post(handlers::generate))
        .route("/status/:session_id", get(handlers::session_status))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with environment credentials and the wall clock.
    pub async fn build(config: LaunchConfig) -> Result<Self, AppError> {
        let store = SessionStore::new(Arc::new(SystemClock), config.sessions.ttl());
        let state = AppState::new(config, Arc::new(EnvCredentials), store)?;
        Self::build_with_state(state).await
    }

    pub async fn build_with_state(state: AppState) -> Result<Self, AppError> {
        // Port 0 binds a random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            session_ttl_secs = state.config.sessions.ttl_secs,
            sweep_interval_secs = state.config.sessions.sweep_interval_secs,
            "Launch service listening"
        );

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn store(&self) -> &SessionStore {
        &self.state.store
    }

    /// Serve until Ctrl+C / SIGTERM, running the session sweeper alongside.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let shutdown = CancellationToken::new();
        let sweeper = self
            .state
            .store
            .spawn_sweeper(self.state.config.sessions.sweep_interval(), shutdown.clone());

        let router = build_router(self.state);
        let result = axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        shutdown.cancel();
        if let Err(e) = sweeper.await {
            tracing::warn!("Session sweeper ended abnormally: {}", e);
        }

        result.map_err(|e| {
            tracing::error!("HTTP server error: {}", e);
            e
        })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

//! Application startup and lifecycle management.

use crate::config::RelayConfig;
use crate::handlers::{
    app::{health_check, index, metrics, readiness_check},
    relay::generate_story,
};
use crate::services::providers::gemini::GeminiClient;
use crate::services::providers::{GenerativeModel, ProviderError, SafetyPolicy};
use crate::services::ShutdownTrigger;
use crate::AppState;
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ai", post(generate_story))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Opens the Gemini session and binds the listener.
    ///
    /// Fails without binding anything when the session cannot be
    /// established.
    pub async fn build(config: RelayConfig) -> Result<Self, AppError> {
        let gemini = GeminiClient::connect(config.gemini.provider_config(), SafetyPolicy::default())
            .await
            .map_err(|e| {
                tracing::error!(model = %config.gemini.model, "Failed to open Gemini session: {}", e);
                startup_error(e)
            })?;

        Self::with_provider(&config, Arc::new(gemini)).await
    }

    /// Binds the listener around an already established provider session.
    pub async fn with_provider(
        config: &RelayConfig,
        provider: Arc<dyn GenerativeModel>,
    ) -> Result<Self, AppError> {
        let address = config.common.address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        let state = AppState::new(
            provider,
            ShutdownTrigger::new(),
            config.relay.fatal_on_generation_error,
        );

        tracing::info!(
            port,
            model = %state.provider.model(),
            fatal_on_generation_error = state.fatal_on_generation_error,
            "Relay service bound"
        );

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Handle that stops the server when triggered.
    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        self.state.shutdown.clone()
    }

    /// Serves until a signal or the shutdown trigger fires, then closes the
    /// provider session.
    ///
    /// Returns an error if the server stopped because of a fatal generation
    /// failure or if the session could not be closed.
    pub async fn run_until_stopped(self) -> Result<(), AppError> {
        let shutdown = self.state.shutdown.clone();
        let provider = self.state.provider.clone();
        let router = build_router(self.state);

        let served = axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
            .await;

        teardown(served, provider.as_ref(), &shutdown).await
    }
}

/// Closes the provider session on every exit path, then reports the first
/// failure: serve error, fatal generation error, failed close.
async fn teardown(
    served: std::io::Result<()>,
    provider: &dyn GenerativeModel,
    shutdown: &ShutdownTrigger,
) -> Result<(), AppError> {
    let closed = provider.close().await;

    served.map_err(|e| {
        tracing::error!("Server error: {}", e);
        if let Err(close_err) = &closed {
            tracing::error!("Failed to close generation session: {}", close_err);
        }
        AppError::from(e)
    })?;

    if let Some(reason) = shutdown.fatal_reason() {
        return Err(AppError::InternalError(anyhow::anyhow!(
            "Stopped after fatal generation error: {}",
            reason
        )));
    }

    closed.map_err(|e| {
        tracing::error!("Failed to close generation session: {}", e);
        AppError::InternalError(anyhow::anyhow!("Failed to close generation session: {}", e))
    })?;

    tracing::info!("Relay service shutdown complete");
    Ok(())
}

fn startup_error(err: ProviderError) -> AppError {
    match err {
        ProviderError::NotConfigured(_) => AppError::ConfigError(anyhow::Error::new(err)),
        other => AppError::BadGateway(other.to_string()),
    }
}

async fn shutdown_signal(trigger: ShutdownTrigger) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
        _ = trigger.triggered() => {
            tracing::info!(fatal = trigger.fatal_reason().is_some(), "Shutdown triggered");
        },
    }
}

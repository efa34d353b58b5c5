use crate::AppState;
use askama::Template;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {}

pub async fn index() -> impl IntoResponse {
    IndexTemplate {}
}

/// Liveness probe.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "relay-service",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.provider.model(),
    }))
}

/// Readiness probe: ready while the generation session is open.
pub async fn readiness_check(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    if state.provider.is_open() && !state.shutdown.is_triggered() {
        Ok(StatusCode::OK)
    } else {
        Err(AppError::ServiceUnavailable)
    }
}

pub async fn metrics() -> impl IntoResponse {
    crate::services::get_metrics()
}

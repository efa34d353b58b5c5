//! HTTP handlers for the relay service.

pub mod app;
pub mod relay;

use crate::services::providers::ProviderError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Request-scoped relay failures, rendered as plain text instead of a
/// template.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Generation failed: {0}")]
    Generation(#[from] ProviderError),

    #[error("No content returned by the model{}", blocked_suffix(.block_reason))]
    NoContent { block_reason: Option<String> },

    #[error("{0}")]
    Serialization(#[from] serde_json::Error),
}

fn blocked_suffix(block_reason: &Option<String>) -> String {
    block_reason
        .as_deref()
        .map(|reason| format!(" (prompt blocked: {})", reason))
        .unwrap_or_default()
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Generation(_) | RelayError::NoContent { .. } => StatusCode::BAD_GATEWAY,
            RelayError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label used for the outcome metric.
    pub fn outcome(&self) -> &'static str {
        match self {
            RelayError::Generation(_) => "generation_error",
            RelayError::NoContent { .. } => "no_content",
            RelayError::Serialization(_) => "serialization_error",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

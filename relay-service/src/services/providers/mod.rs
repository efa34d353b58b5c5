//! Generative model abstraction and implementations.
//!
//! Handlers talk to a `GenerativeModel` trait object so the Gemini client can
//! be swapped for the mock in tests.

pub mod gemini;
pub mod mock;
pub mod safety;

use crate::models::GenerationResult;
use async_trait::async_trait;
use thiserror::Error;

pub use safety::{HarmBlockThreshold, HarmCategory, SafetyPolicy, SafetySetting};

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Provider session is closed")]
    Closed,
}

/// A session with a remote generative model.
///
/// The model id and safety policy are fixed when the session is created.
/// Implementations hold no per-request state and are shared across requests.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Sends `prompt` as the only content of a single generation call.
    ///
    /// Exactly one round trip; no retries.
    async fn generate(&self, prompt: &str) -> Result<GenerationResult, ProviderError>;

    /// Model identifier used for every call.
    fn model(&self) -> &str;

    /// False once `close` has been called.
    fn is_open(&self) -> bool;

    /// Releases the session. Closing twice is an error.
    async fn close(&self) -> Result<(), ProviderError>;
}

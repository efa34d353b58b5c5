//! Mock model for tests.

use super::{GenerativeModel, ProviderError};
use crate::models::GenerationResult;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Behavior {
    /// Replies with the prompt as a single text part.
    Echo,
    Fixed(GenerationResult),
    Fail(String),
}

/// In-process `GenerativeModel` that records every prompt it receives.
#[derive(Debug)]
pub struct MockModel {
    behavior: Behavior,
    calls: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl MockModel {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn echo() -> Self {
        Self::with_behavior(Behavior::Echo)
    }

    pub fn returning(result: GenerationResult) -> Self {
        Self::with_behavior(Behavior::Fixed(result))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Fail(message.into()))
    }

    /// Prompts received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult, ProviderError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProviderError::Closed);
        }

        if let Ok(mut calls) = self.calls.lock() {
            calls.push(prompt.to_string());
        }

        // Yield so concurrent callers interleave.
        tokio::task::yield_now().await;

        match &self.behavior {
            Behavior::Echo => Ok(GenerationResult::from_text(prompt)),
            Behavior::Fixed(result) => Ok(result.clone()),
            Behavior::Fail(message) => Err(ProviderError::ApiError(message.clone())),
        }
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), ProviderError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(ProviderError::Closed);
        }
        Ok(())
    }
}

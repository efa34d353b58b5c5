//! Process-wide stop signal shared between the server and handlers.

use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

/// Cloneable handle that stops the HTTP server when triggered.
///
/// A fatal trigger also records the reason so `main` can exit non-zero.
#[derive(Debug, Clone, Default)]
pub struct ShutdownTrigger {
    token: CancellationToken,
    fatal_reason: Arc<OnceLock<String>>,
}

impl ShutdownTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graceful stop (signals, tests).
    pub fn request_stop(&self) {
        self.token.cancel();
    }

    /// Stop because of an unrecoverable error. The first reason wins.
    pub fn fatal(&self, reason: impl Into<String>) {
        let _ = self.fatal_reason.set(reason.into());
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn fatal_reason(&self) -> Option<&str> {
        self.fatal_reason.get().map(String::as_str)
    }

    /// Resolves once any clone has triggered.
    pub async fn triggered(&self) {
        self.token.cancelled().await
    }
}

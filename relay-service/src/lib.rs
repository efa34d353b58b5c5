pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

use services::providers::GenerativeModel;
use services::ShutdownTrigger;
use std::sync::Arc;

/// Shared application state handed to every request.
///
/// Nothing here changes per request; the provider and its safety policy are
/// read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn GenerativeModel>,
    pub shutdown: ShutdownTrigger,
    pub fatal_on_generation_error: bool,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn GenerativeModel>,
        shutdown: ShutdownTrigger,
        fatal_on_generation_error: bool,
    ) -> Self {
        Self {
            provider,
            shutdown,
            fatal_on_generation_error,
        }
    }
}

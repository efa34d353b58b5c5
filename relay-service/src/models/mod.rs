//! Request-scoped domain types for the relay.

pub mod generation;
pub mod prompt;

pub use generation::{
    Candidate, Content, FinishReason, GenerationResult, Part, PromptFeedback, UsageMetadata,
};
pub use prompt::Prompt;

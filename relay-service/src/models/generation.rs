//! Provider-neutral view of a generation response.
//!
//! The Gemini wire format is decoded in the provider module and converted
//! into these types, so handlers never see provider JSON directly.

use serde::Serialize;

/// Result of one generation call: candidates in provider order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationResult {
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub usage: Option<UsageMetadata>,
}

impl GenerationResult {
    /// Single candidate holding a single text part.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Content {
                    role: Some("model".to_string()),
                    parts: vec![Part::Text(text.into())],
                },
                finish_reason: Some(FinishReason::Stop),
            }],
            ..Default::default()
        }
    }

    /// First part of the first candidate, if the provider returned one.
    pub fn first_part(&self) -> Option<&Part> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.parts.first())
    }

    /// Reason the provider refused the prompt, when it reported one.
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub content: Content,
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Content {
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

/// One segment of a candidate's content.
///
/// Serializes the way the relay renders it: a text part is a bare JSON
/// string, other parts are objects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text(String),
    InlineData {
        #[serde(rename = "mimeType")]
        mime_type: String,
        data: String,
    },
    FunctionCall {
        name: String,
        args: serde_json::Value,
    },
    /// Part shapes this relay does not model, kept as raw JSON.
    Other(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Other(String),
}

impl From<&str> for FinishReason {
    fn from(value: &str) -> Self {
        match value {
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::MaxTokens,
            "SAFETY" => FinishReason::Safety,
            "RECITATION" => FinishReason::Recitation,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageMetadata {
    pub prompt_tokens: i32,
    pub candidate_tokens: i32,
    pub total_tokens: i32,
}

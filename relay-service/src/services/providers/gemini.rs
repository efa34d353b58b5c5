//! Gemini provider implementation.
//!
//! Talks to the `generateContent` REST endpoint. The session is verified
//! against the models endpoint when it is created, so a bad key or model
//! fails at startup rather than on the first request.

use super::{GenerativeModel, ProviderError, SafetyPolicy, SafetySetting};
use crate::models::{
    Candidate, Content, FinishReason, GenerationResult, Part, PromptFeedback, UsageMetadata,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Gemini API base URL.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Secret<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

/// A verified Gemini session bound to one model and safety policy.
#[derive(Debug)]
pub struct GeminiClient {
    config: GeminiConfig,
    safety: SafetyPolicy,
    client: Client,
    closed: AtomicBool,
}

impl GeminiClient {
    /// Creates the HTTP client and checks that the key can see the model.
    pub async fn connect(config: GeminiConfig, safety: SafetyPolicy) -> Result<Self, ProviderError> {
        if config.api_key.expose_secret().trim().is_empty() {
            return Err(ProviderError::NotConfigured(
                "Gemini API key not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e)))?;

        let provider = Self {
            config,
            safety,
            client,
            closed: AtomicBool::new(false),
        };

        provider.verify_session().await?;

        tracing::info!(
            model = %provider.config.model,
            safety_overrides = provider.safety.settings().len(),
            "Gemini session established"
        );

        Ok(provider)
    }

    pub fn safety_policy(&self) -> &SafetyPolicy {
        &self.safety
    }

    /// Build the API URL for the configured model, optionally with a method.
    fn api_url(&self, method: Option<&str>) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match method {
            Some(method) => format!("{}/models/{}:{}", base, self.config.model, method),
            None => format!("{}/models/{}", base, self.config.model),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, self.config.api_key.expose_secret())
    }

    async fn verify_session(&self) -> Result<(), ProviderError> {
        let response = self
            .authorized(self.client.get(self.api_url(None)))
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(api_error("Session check failed", response).await)
        }
    }

    fn ensure_open(&self) -> Result<(), ProviderError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(ProviderError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult, ProviderError> {
        self.ensure_open()?;

        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            safety_settings: self.safety.settings(),
        };

        tracing::debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Sending request to Gemini API"
        );

        let response = self
            .authorized(self.client.post(self.api_url(Some("generateContent"))))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            if response.status().as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }
            return Err(api_error("Gemini API error", response).await);
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

        let result = GenerationResult::from(api_response);

        tracing::debug!(
            model = %self.config.model,
            candidates = result.candidates.len(),
            finish_reason = ?result.candidates.first().and_then(|c| c.finish_reason.as_ref()),
            input_tokens = result.usage.map(|u| u.prompt_tokens).unwrap_or(0),
            output_tokens = result.usage.map(|u| u.candidate_tokens).unwrap_or(0),
            "Received Gemini response"
        );

        Ok(result)
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), ProviderError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(ProviderError::Closed);
        }
        tracing::info!(model = %self.config.model, "Gemini session closed");
        Ok(())
    }
}

async fn api_error(context: &str, response: Response) -> ProviderError {
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    ProviderError::ApiError(format!("{} {}: {}", context, status, error_text))
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "no_overrides")]
    safety_settings: &'a [SafetySetting],
}

fn no_overrides(settings: &&[SafetySetting]) -> bool {
    settings.is_empty()
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<ApiPromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<ApiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCandidate {
    #[serde(default)]
    content: Option<ApiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiContent {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: ApiInlineData,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: ApiFunctionCall,
    },
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ApiUsageMetadata {
    prompt_token_count: Option<i32>,
    candidates_token_count: Option<i32>,
    total_token_count: Option<i32>,
}

impl From<GenerateContentResponse> for GenerationResult {
    fn from(response: GenerateContentResponse) -> Self {
        GenerationResult {
            candidates: response.candidates.into_iter().map(Candidate::from).collect(),
            prompt_feedback: response.prompt_feedback.map(|f| PromptFeedback {
                block_reason: f.block_reason,
            }),
            usage: response.usage_metadata.map(|u| UsageMetadata {
                prompt_tokens: u.prompt_token_count.unwrap_or(0),
                candidate_tokens: u.candidates_token_count.unwrap_or(0),
                total_tokens: u.total_token_count.unwrap_or(0),
            }),
        }
    }
}

impl From<ApiCandidate> for Candidate {
    fn from(candidate: ApiCandidate) -> Self {
        let content = candidate
            .content
            .map(|c| Content {
                role: c.role,
                parts: c.parts.into_iter().map(Part::from).collect(),
            })
            .unwrap_or_default();

        Candidate {
            content,
            finish_reason: candidate.finish_reason.as_deref().map(FinishReason::from),
        }
    }
}

impl From<ApiPart> for Part {
    fn from(part: ApiPart) -> Self {
        match part {
            ApiPart::Text { text } => Part::Text(text),
            ApiPart::InlineData { inline_data } => Part::InlineData {
                mime_type: inline_data.mime_type,
                data: inline_data.data,
            },
            ApiPart::FunctionCall { function_call } => Part::FunctionCall {
                name: function_call.name,
                args: function_call.args,
            },
            ApiPart::Other(value) => Part::Other(value),
        }
    }
}

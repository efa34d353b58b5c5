//! The relay path: form prompt in, rendered story fragment out.

use super::RelayError;
use crate::models::Prompt;
use crate::services::record_generation;
use crate::AppState;
use askama::Template;
use axum::{extract::State, Form};
use serde::Serialize;

/// Name of the form field carrying the prompt.
pub const PROMPT_FIELD: &str = "chat-prompt";

#[derive(Template)]
#[template(path = "ai-response.html")]
pub struct StoryTemplate {
    pub story: String,
}

/// Decoded urlencoded body, in submission order. Repeated keys are kept.
pub type FormFields = Vec<(String, String)>;

/// First value submitted for `name`, if any.
pub fn first_field(fields: &[(String, String)], name: &str) -> Option<String> {
    fields
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.clone())
}

/// `POST /ai`
///
/// A body that is not a urlencoded form counts as a missing field.
pub async fn generate_story(
    State(state): State<AppState>,
    form: Option<Form<FormFields>>,
) -> Result<StoryTemplate, RelayError> {
    let field = form.and_then(|Form(fields)| first_field(&fields, PROMPT_FIELD));
    if field.is_none() {
        tracing::debug!(field = PROMPT_FIELD, "Prompt field missing, using empty prompt");
    }

    let prompt = Prompt::from_field(field);
    tracing::debug!(
        prompt_len = prompt.len(),
        empty = prompt.is_empty(),
        "Relaying prompt"
    );
    let result = relay(&state, &prompt).await;

    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => e.outcome(),
    };
    record_generation(state.provider.model(), outcome);

    result
}

/// Runs one prompt through the model and builds the render payload.
pub async fn relay(state: &AppState, prompt: &Prompt) -> Result<StoryTemplate, RelayError> {
    let result = match state.provider.generate(prompt.as_str()).await {
        Ok(result) => result,
        Err(e) => {
            if state.fatal_on_generation_error {
                tracing::error!(
                    model = %state.provider.model(),
                    error = %e,
                    "Generation failed, stopping server"
                );
                state.shutdown.fatal(e.to_string());
            } else {
                tracing::warn!(
                    model = %state.provider.model(),
                    error = %e,
                    "Generation failed"
                );
            }
            return Err(RelayError::Generation(e));
        }
    };

    let part = result.first_part().ok_or_else(|| {
        tracing::warn!(
            candidates = result.candidates.len(),
            block_reason = ?result.block_reason(),
            "Generation returned no content"
        );
        RelayError::NoContent {
            block_reason: result.block_reason().map(str::to_string),
        }
    })?;

    let story = render_story(part).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialize generated content");
        RelayError::Serialization(e)
    })?;

    Ok(StoryTemplate { story })
}

/// Serializes a content part to JSON and turns it into an HTML fragment.
pub fn render_story<T: Serialize + ?Sized>(part: &T) -> Result<String, serde_json::Error> {
    let serialized = serde_json::to_string(part)?;
    Ok(line_breaks_to_html(&escape_html_in_json(&serialized)))
}

/// Rewrites `<`, `>`, `&` and the U+2028/U+2029 separators as JSON unicode
/// escapes.
///
/// Only valid on serialized JSON, where those characters can only occur
/// inside string literals.
pub fn escape_html_in_json(json: &str) -> String {
    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Replaces each escaped newline (the two characters `\` `n`) with a
/// `<br />` tag.
pub fn line_breaks_to_html(text: &str) -> String {
    text.replace("\\n", "<br />")
}

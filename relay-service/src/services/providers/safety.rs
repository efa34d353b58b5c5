//! Safety settings attached to every generation call.

use serde::{Deserialize, Serialize};

/// Harm categories recognised by the Gemini API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmCategory {
    HarmCategoryHarassment,
    HarmCategoryHateSpeech,
    HarmCategorySexuallyExplicit,
    HarmCategoryDangerousContent,
    HarmCategoryCivicIntegrity,
}

/// Blocking threshold for a harm category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    HarmBlockThresholdUnspecified,
    BlockLowAndAbove,
    BlockMediumAndAbove,
    BlockOnlyHigh,
    BlockNone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// Category → threshold overrides. Categories not listed keep the
/// provider's default threshold.
///
/// Built once at startup and then only read; the adapter owns it and every
/// request shares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyPolicy {
    settings: Vec<SafetySetting>,
}

impl SafetyPolicy {
    /// No overrides: the provider default applies to every category.
    pub fn provider_defaults() -> Self {
        Self {
            settings: Vec::new(),
        }
    }

    /// Sets the threshold for `category`, replacing any earlier override.
    pub fn with(mut self, category: HarmCategory, threshold: HarmBlockThreshold) -> Self {
        match self.settings.iter_mut().find(|s| s.category == category) {
            Some(existing) => existing.threshold = threshold,
            None => self.settings.push(SafetySetting {
                category,
                threshold,
            }),
        }
        self
    }

    pub fn settings(&self) -> &[SafetySetting] {
        &self.settings
    }
}

impl Default for SafetyPolicy {
    /// Sexually explicit content is not blocked; everything else uses the
    /// provider default.
    fn default() -> Self {
        Self::provider_defaults().with(
            HarmCategory::HarmCategorySexuallyExplicit,
            HarmBlockThreshold::BlockNone,
        )
    }
}

use crate::services::providers::gemini::{GeminiConfig, GEMINI_API_BASE};
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub common: core_config::Config,
    pub gemini: GeminiSettings,
    pub relay: RelaySettings,
    pub observability: ObservabilitySettings,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Secret<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Halt the whole process when a generation call fails instead of
    /// answering that request with a 502.
    pub fatal_on_generation_error: bool,
}

#[derive(Debug, Clone)]
pub struct ObservabilitySettings {
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
}

impl RelayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_prod = lookup("ENVIRONMENT").unwrap_or_else(|| "dev".to_string()) == "prod";
        let get = |key: &str, default: Option<&str>| get_var(&lookup, key, default, is_prod);

        let timeout_secs = get("GEMINI_TIMEOUT_SECS", Some(&DEFAULT_TIMEOUT_SECS.to_string()))?;
        let timeout_secs = timeout_secs.parse::<u64>().map_err(|_| {
            AppError::ConfigError(anyhow::anyhow!(
                "GEMINI_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                timeout_secs
            ))
        })?;

        let fatal_flag = get("RELAY_FATAL_ON_GENERATION_ERROR", Some("false"))?;

        Ok(RelayConfig {
            common,
            gemini: GeminiSettings {
                api_key: Secret::new(get("GEMINI_API_KEY", None)?),
                model: get("GEMINI_MODEL", Some(DEFAULT_MODEL))?,
                base_url: get("GEMINI_API_BASE", Some(GEMINI_API_BASE))?,
                timeout_secs,
            },
            relay: RelaySettings {
                fatal_on_generation_error: parse_flag("RELAY_FATAL_ON_GENERATION_ERROR", &fatal_flag)?,
            },
            observability: ObservabilitySettings {
                log_level: get("LOG_LEVEL", Some("info"))?,
                otlp_endpoint: lookup("OTLP_ENDPOINT").filter(|v| !v.is_empty()),
            },
        })
    }
}

impl GeminiSettings {
    pub fn provider_config(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

fn get_var<F>(lookup: &F, key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::ConfigError(anyhow::anyhow!(
            "{} must be a boolean, got '{}'",
            key,
            other
        ))),
    }
}

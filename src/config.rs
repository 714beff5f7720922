//! Startup configuration
//!
//! Everything the process needs from its environment is read exactly once,
//! validated, and handed to constructors as plain immutable values. Nothing
//! downstream reads environment variables.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_SEARCH_URL: &str = "https://api.tavily.com/search";
pub const DEFAULT_CHAT_URL: &str = "http://127.0.0.1:1200/chat";
pub const DEFAULT_PORT: u16 = 1200;
pub const DEFAULT_MAX_COMPLETION_TOKENS: u32 = 256;
pub const DEFAULT_RETRY_BUDGET: u32 = 2;
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(60);
/// Ceiling on any provider-requested wait before a retry
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);
pub const DEFAULT_SEARCH_MAX_RESULTS: u32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid conversation setup: {0}")]
    Setup(String),
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// A credential that never shows up in logs or `Debug` output
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Hosted LLM endpoint settings
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: Secret,
    pub base_url: String,
    pub model: String,
    /// Models the chat endpoint accepts; always contains `model`
    pub allowed_models: Vec<String>,
    pub max_completion_tokens: u32,
}

/// Web search settings. Absent when no search key is configured.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub api_key: Secret,
    pub endpoint: String,
    pub max_results: u32,
}

/// Defaults applied to every conversation loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopDefaults {
    pub retry_budget: u32,
    pub response_timeout: Duration,
}

impl Default for LoopDefaults {
    fn default() -> Self {
        Self {
            retry_budget: DEFAULT_RETRY_BUDGET,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

/// Front-end client settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub chat_url: String,
}

impl ClientSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            chat_url: non_empty(&lookup, "PARLEY_CHAT_URL")
                .unwrap_or_else(|| DEFAULT_CHAT_URL.to_string()),
        }
    }
}

/// Full process configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmSettings,
    pub search: Option<SearchSettings>,
    pub loop_defaults: LoopDefaults,
    pub port: u16,
}

impl Config {
    /// Read the configuration from the process environment.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honored.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = non_empty(&lookup, "GROQ_API_KEY").ok_or(ConfigError::Missing("GROQ_API_KEY"))?;

        let model = non_empty(&lookup, "PARLEY_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let base_url = non_empty(&lookup, "PARLEY_LLM_BASE_URL")
            .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string());
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::invalid(
                "PARLEY_LLM_BASE_URL",
                &base_url,
                "must be an http(s) URL",
            ));
        }

        let mut allowed_models: Vec<String> = non_empty(&lookup, "PARLEY_ALLOWED_MODELS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        if !allowed_models.contains(&model) {
            allowed_models.insert(0, model.clone());
        }

        let max_completion_tokens = parse_or(
            &lookup,
            "PARLEY_MAX_COMPLETION_TOKENS",
            DEFAULT_MAX_COMPLETION_TOKENS,
        )?;
        if max_completion_tokens == 0 {
            return Err(ConfigError::invalid(
                "PARLEY_MAX_COMPLETION_TOKENS",
                "0",
                "must be positive",
            ));
        }

        let search = non_empty(&lookup, "TAVILY_API_KEY").map(|key| SearchSettings {
            api_key: Secret::new(key),
            endpoint: non_empty(&lookup, "PARLEY_SEARCH_URL")
                .unwrap_or_else(|| DEFAULT_SEARCH_URL.to_string()),
            max_results: DEFAULT_SEARCH_MAX_RESULTS,
        });

        let retry_budget = parse_or(&lookup, "PARLEY_RETRY_BUDGET", DEFAULT_RETRY_BUDGET)?;
        let timeout_secs = parse_or(
            &lookup,
            "PARLEY_RESPONSE_TIMEOUT_SECS",
            DEFAULT_RESPONSE_TIMEOUT.as_secs(),
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "PARLEY_RESPONSE_TIMEOUT_SECS",
                "0",
                "must be positive",
            ));
        }

        let port = parse_or(&lookup, "PARLEY_PORT", DEFAULT_PORT)?;

        Ok(Self {
            llm: LlmSettings {
                api_key: Secret::new(api_key),
                base_url,
                model,
                allowed_models,
                max_completion_tokens,
            },
            search,
            loop_defaults: LoopDefaults {
                retry_budget,
                response_timeout: Duration::from_secs(timeout_secs),
            },
            port,
        })
    }

    /// Search settings, or a configuration error naming the missing key
    pub fn require_search(&self) -> Result<&SearchSettings, ConfigError> {
        self.search
            .as_ref()
            .ok_or(ConfigError::Missing("TAVILY_API_KEY"))
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match non_empty(lookup, key) {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(key, &raw, e.to_string())),
        None => Ok(default),
    }
}

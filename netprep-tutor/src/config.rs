//! Configuration for the tutor pipeline
//!
//! Everything tunable lives in [`TutorConfig`]: upstream endpoint and
//! credentials, generation budgets, continuation bounds, and cache sizing.
//! The binary loads it from the environment (`GEMINI_API_KEY` plus optional
//! `NETPREP_*` overrides); tests construct it directly and override fields.

use crate::error::{Result, TutorError};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Configuration for the tutor pipeline and its upstream client
#[derive(Debug, Clone)]
pub struct TutorConfig {
    /// API key for the generative-language endpoint.
    /// An empty key is a configuration error, not a retryable condition.
    pub api_key: String,

    /// Model identifier, e.g. "gemini-1.5-flash"
    pub model: String,

    /// Base URL of the generative-language API
    pub base_url: String,

    /// Client-side timeout for a single upstream call
    pub request_timeout: Duration,

    /// Token budget per generation call
    pub max_output_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Card context is truncated to this many characters before it is
    /// embedded in the prompt
    pub max_context_chars: usize,

    /// Upper bound on continuation rounds after a truncated response
    pub max_continuations: u32,

    /// Upper bound on accumulated response size across continuations
    pub max_total_chars: usize,

    /// Retry a failed call exactly once on 5xx or transport errors.
    /// Never applies to 4xx responses or timeouts.
    pub retry_once_on_server_error: bool,

    /// Time-to-live for cached tutor cards
    pub cache_ttl: Duration,

    /// Entry cap for the in-memory response cache
    pub cache_max_entries: usize,
}

impl TutorConfig {
    /// Create a configuration with the given API key and default settings.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            request_timeout: Duration::from_secs(20),
            max_output_tokens: 1024,
            temperature: 0.4,
            max_context_chars: 800,
            max_continuations: 3,
            max_total_chars: 16_000,
            retry_once_on_server_error: true,
            cache_ttl: Duration::from_secs(30 * 60),
            cache_max_entries: 1_000,
        }
    }

    /// Load configuration from the environment.
    ///
    /// `GEMINI_API_KEY` is required; `NETPREP_MODEL`, `NETPREP_BASE_URL`,
    /// `NETPREP_TIMEOUT_SECS`, `NETPREP_MAX_OUTPUT_TOKENS`,
    /// `NETPREP_TEMPERATURE`, `NETPREP_MAX_CONTINUATIONS`,
    /// `NETPREP_CACHE_TTL_SECS` and `NETPREP_CACHE_MAX_ENTRIES` override
    /// the defaults when present.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| TutorError::ConfigError("GEMINI_API_KEY is not set".to_string()))?;

        let mut config = Self::new(api_key);

        if let Some(model) = env_string("NETPREP_MODEL") {
            config.model = model;
        }
        if let Some(url) = env_string("NETPREP_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = env_parse::<u64>("NETPREP_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(tokens) = env_parse::<u32>("NETPREP_MAX_OUTPUT_TOKENS")? {
            config.max_output_tokens = tokens;
        }
        if let Some(temperature) = env_parse::<f32>("NETPREP_TEMPERATURE")? {
            config.temperature = temperature;
        }
        if let Some(rounds) = env_parse::<u32>("NETPREP_MAX_CONTINUATIONS")? {
            config.max_continuations = rounds;
        }
        if let Some(secs) = env_parse::<u64>("NETPREP_CACHE_TTL_SECS")? {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(entries) = env_parse::<usize>("NETPREP_CACHE_MAX_ENTRIES")? {
            config.cache_max_entries = entries;
        }

        config.validate()?;
        Ok(config)
    }

    /// Override the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the endpoint base URL (used by tests to point at a mock).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let url: String = base_url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Override the per-call timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override the cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(TutorError::ConfigError("api_key must not be empty".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(TutorError::ConfigError("model must not be empty".to_string()));
        }
        if !self.base_url.starts_with("http") {
            return Err(TutorError::ConfigError(format!(
                "base_url must be an http(s) URL, got: {}",
                self.base_url
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(TutorError::ConfigError(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        if self.max_output_tokens == 0 {
            return Err(TutorError::ConfigError(
                "max_output_tokens must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(TutorError::ConfigError(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }
        if self.max_total_chars == 0 {
            return Err(TutorError::ConfigError(
                "max_total_chars must be greater than 0".to_string(),
            ));
        }
        if self.cache_max_entries == 0 {
            return Err(TutorError::ConfigError(
                "cache_max_entries must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| TutorError::ConfigError(format!("{} is invalid: {}", name, e))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TutorConfig::new("test-key");
        assert_eq!(config.model, "gemini-1.5-flash");
        assert_eq!(config.request_timeout, Duration::from_secs(20));
        assert_eq!(config.max_context_chars, 800);
        assert_eq!(config.max_continuations, 3);
        assert_eq!(config.cache_ttl, Duration::from_secs(1800));
        assert!(config.retry_once_on_server_error);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        assert!(TutorConfig::new("  ").validate().is_err());

        let mut config = TutorConfig::new("key");
        config.temperature = 3.5;
        assert!(config.validate().is_err());

        let mut config = TutorConfig::new("key");
        config.max_output_tokens = 0;
        assert!(config.validate().is_err());

        let config = TutorConfig::new("key").with_base_url("ftp://somewhere");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_overrides() {
        let config = TutorConfig::new("key")
            .with_model("gemini-1.5-pro")
            .with_base_url("http://127.0.0.1:9090/v1beta/")
            .with_request_timeout(Duration::from_secs(5));

        assert_eq!(config.model, "gemini-1.5-pro");
        // Trailing slash is normalized away so URL joining stays simple.
        assert_eq!(config.base_url, "http://127.0.0.1:9090/v1beta");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }
}

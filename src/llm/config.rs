//! Inference client configuration.

use serde::{Deserialize, Serialize};

use crate::rate_limit::DEFAULT_MAX_REQUESTS_PER_MINUTE;

/// Default model served by the local runtime.
pub const DEFAULT_MODEL: &str = "llama3:8b";

/// Default per-call timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Configuration for the inference client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama API endpoint (default: http://localhost:11434)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Model to use for analysis
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens in response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature for generation (0.0 - 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Seconds before an inference call is abandoned
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Inference requests allowed per minute
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: u32,
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_max_requests_per_minute() -> u32 {
    DEFAULT_MAX_REQUESTS_PER_MINUTE
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout_seconds(),
            max_requests_per_minute: default_max_requests_per_minute(),
        }
    }
}

impl LlmConfig {
    /// Check if the config equals the default (for skip_serializing_if).
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `LLM_ENDPOINT`: API endpoint
    /// - `LLM_MODEL`: Model name
    /// - `LLM_MAX_TOKENS`: Maximum tokens in response
    /// - `LLM_TEMPERATURE`: Generation temperature (0.0-1.0)
    /// - `LLM_TIMEOUT_SECONDS`: Per-call timeout
    /// - `LLM_MAX_REQUESTS_PER_MINUTE`: Inference rate limit
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides read through `lookup`. Empty or unparsable values
    /// are ignored.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(val) = var("LLM_ENDPOINT") {
            self.endpoint = val.trim_end_matches('/').to_string();
        }
        if let Some(val) = var("LLM_MODEL") {
            self.model = val;
        }
        if let Some(n) = var("LLM_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.max_tokens = n;
        }
        if let Some(t) = var("LLM_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.temperature = t;
        }
        if let Some(n) = var("LLM_TIMEOUT_SECONDS").and_then(|v| v.parse().ok()) {
            self.timeout_seconds = n;
        }
        if let Some(n) = var("LLM_MAX_REQUESTS_PER_MINUTE").and_then(|v| v.parse().ok()) {
            self.max_requests_per_minute = n;
        }
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Hint shown when the runtime cannot be reached.
    pub fn availability_hint(&self) -> String {
        format!(
            "Ollama not reachable at {}. Start it with `ollama serve` and pull the model with `ollama pull {}`.",
            self.endpoint, self.model
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LlmConfig::default();
        assert_eq!(config.model, "llama3:8b");
        assert_eq!(config.timeout_seconds, 120);
        assert_eq!(config.max_requests_per_minute, 10);
        assert!(config.is_default());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: LlmConfig = toml::from_str("model = \"mistral:7b\"").unwrap();
        assert_eq!(config.model, "mistral:7b");
        assert_eq!(config.endpoint, "http://localhost:11434");
        assert!(!config.is_default());
    }

    #[test]
    fn test_with_endpoint_trims_slash() {
        let config = LlmConfig::default().with_endpoint("http://gpu-box:11434/");
        assert_eq!(config.endpoint, "http://gpu-box:11434");
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = LlmConfig::default().with_overrides_from(|name| {
            match name {
                "LLM_ENDPOINT" => Some("http://gpu-box:11434/".to_string()),
                "LLM_MODEL" => Some("mistral:7b".to_string()),
                "LLM_TIMEOUT_SECONDS" => Some("30".to_string()),
                "LLM_MAX_REQUESTS_PER_MINUTE" => Some("4".to_string()),
                "LLM_TEMPERATURE" => Some("warm".to_string()),
                "LLM_MAX_TOKENS" => Some(String::new()),
                _ => None,
            }
        });
        assert_eq!(config.endpoint, "http://gpu-box:11434");
        assert_eq!(config.model, "mistral:7b");
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.max_requests_per_minute, 4);
        assert_eq!(config.temperature, LlmConfig::default().temperature);
        assert_eq!(config.max_tokens, LlmConfig::default().max_tokens);
    }
}

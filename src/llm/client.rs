//! Ollama client with rate limiting, bounded timeouts and sanitized output.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::config::LlmConfig;
use crate::rate_limit::{RateLimitConfig, RateLimitError, RateLimiter};
use crate::sanitize::sanitize_output;

/// Upper bound for the `/api/tags` liveness check.
pub const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Anything that turns a prompt into text.
#[async_trait]
pub trait Inference: Send + Sync {
    /// Model identifier, for reports.
    fn model(&self) -> &str;

    /// Run one generation and return sanitized text.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Errors that can occur during LLM operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Failed to connect to LLM service
    #[error("Connection error: {0}")]
    Connection(String),
    /// Call exceeded the configured timeout
    #[error("Inference timed out after {0:?}")]
    Timeout(Duration),
    /// API returned an error
    #[error("API error: {0}")]
    Api(String),
    /// Failed to parse response
    #[error("Parse error: {0}")]
    Parse(String),
    /// Request refused by the rate limiter
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
}

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    name: String,
}

/// Inference client for a local Ollama runtime.
#[derive(Clone)]
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
    rate_limiter: RateLimiter,
}

impl LlmClient {
    /// Create a new client with its own rate limiter built from the config.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let rate_limiter =
            RateLimiter::with_config(RateLimitConfig::per_minute(config.max_requests_per_minute));
        Self::with_rate_limiter(config, rate_limiter)
    }

    /// Create a new client sharing an existing rate limiter.
    pub fn with_rate_limiter(config: LlmConfig, rate_limiter: RateLimiter) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| LlmError::Connection(e.to_string()))?;

        Ok(Self {
            config,
            client,
            rate_limiter,
        })
    }

    /// Get the config.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }

    /// Check if the LLM service is available, waiting at most
    /// `AVAILABILITY_TIMEOUT`.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.config.endpoint);
        match self
            .client
            .get(&url)
            .timeout(AVAILABILITY_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// List available models.
    pub async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.config.endpoint);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !resp.status().is_success() {
            return Err(LlmError::Api(format!("HTTP {}", resp.status())));
        }

        let tags: TagsResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn map_send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout(self.timeout())
        } else {
            LlmError::Connection(e.to_string())
        }
    }

    /// Call Ollama API with a prompt.
    async fn call_ollama(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.config.endpoint);
        self.rate_limiter.acquire(&url).await?;

        let request = OllamaRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        debug!(
            "Sending {} byte prompt to {} ({})",
            prompt.len(),
            url,
            self.config.model
        );

        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!(
                "HTTP {}: {}",
                status,
                sanitize_output(&body)
            )));
        }

        let ollama_resp: OllamaResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(self.timeout())
            } else {
                LlmError::Parse(e.to_string())
            }
        })?;

        Ok(ollama_resp.response)
    }
}

#[async_trait]
impl Inference for LlmClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let raw = self.call_ollama(prompt).await?;
        let text = sanitize_output(&raw).trim().to_string();
        if text.is_empty() {
            return Err(LlmError::Parse("Empty response from model".to_string()));
        }
        info!("Model returned {} characters", text.chars().count());
        Ok(text)
    }
}

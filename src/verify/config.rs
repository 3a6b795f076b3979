//! Citation verification configuration.

use serde::{Deserialize, Serialize};

/// Default CourtListener REST API base.
pub const DEFAULT_API_URL: &str = "https://www.courtlistener.com/api/rest/v4";

/// Default number of citations checked per document.
pub const DEFAULT_MAX_CITATIONS: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourtListenerConfig {
    /// Verify citations at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// API token (optional; anonymous access is heavily throttled)
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    /// Where verification results are cached (None = no cache)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,
    #[serde(default = "default_max_citations")]
    pub max_citations: usize,
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_max_citations() -> usize {
    DEFAULT_MAX_CITATIONS
}

fn default_max_requests_per_minute() -> u32 {
    60
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for CourtListenerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            api_url: default_api_url(),
            token: None,
            cache_dir: None,
            max_citations: default_max_citations(),
            max_requests_per_minute: default_max_requests_per_minute(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl CourtListenerConfig {
    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `COURTLISTENER_API_URL`: API base URL
    /// - `COURTLISTENER_TOKEN`: API token
    /// - `COURTLISTENER_API_KEY`: alias for the token, used when
    ///   `COURTLISTENER_TOKEN` is unset or empty
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides read through `lookup`. Empty values count as unset.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(val) = var("COURTLISTENER_API_URL") {
            self.api_url = val.trim_end_matches('/').to_string();
        }
        if let Some(token) = var("COURTLISTENER_TOKEN").or_else(|| var("COURTLISTENER_API_KEY")) {
            self.token = Some(token);
        }
        self
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CourtListenerConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_citations, 15);
        assert_eq!(config.max_requests_per_minute, 60);
        assert_eq!(config.timeout_seconds, 30);
        assert!(!config.has_token());
    }

    #[test]
    fn test_token_never_serialized() {
        let config = CourtListenerConfig::default().with_token(Some("secret".to_string()));
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
        assert!(config.has_token());
    }

    #[test]
    fn test_partial_toml() {
        let config: CourtListenerConfig =
            toml::from_str("enabled = false\nmax_citations = 5").unwrap();
        assert!(!config.enabled);
        assert_eq!(config.max_citations, 5);
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn token_from(pairs: &[(&str, &str)]) -> Option<String> {
        CourtListenerConfig::default()
            .with_overrides_from(vars(pairs))
            .token
    }

    #[test]
    fn test_token_env_precedence() {
        assert_eq!(token_from(&[("COURTLISTENER_TOKEN", "tok")]).as_deref(), Some("tok"));
        assert_eq!(token_from(&[("COURTLISTENER_API_KEY", "key")]).as_deref(), Some("key"));
        assert_eq!(
            token_from(&[("COURTLISTENER_TOKEN", "tok"), ("COURTLISTENER_API_KEY", "key")])
                .as_deref(),
            Some("tok")
        );
        assert_eq!(token_from(&[]), None);
    }

    #[test]
    fn test_empty_token_falls_back_to_api_key() {
        assert_eq!(
            token_from(&[("COURTLISTENER_TOKEN", ""), ("COURTLISTENER_API_KEY", "key")]).as_deref(),
            Some("key")
        );
        assert_eq!(token_from(&[("COURTLISTENER_TOKEN", "  ")]), None);
    }

    #[test]
    fn test_env_keeps_configured_token_when_unset() {
        let config = CourtListenerConfig::default()
            .with_token(Some("from-file".to_string()))
            .with_overrides_from(vars(&[("COURTLISTENER_API_URL", "http://mirror.local/api/")]));
        assert_eq!(config.token.as_deref(), Some("from-file"));
        assert_eq!(config.api_url, "http://mirror.local/api");
    }
}

//! Configuration management for legalcheck using the prefer crate.
//!
//! Resolution order: built-in defaults, then the config file (discovered by
//! prefer, or given with `--config`), then environment variables, then
//! command-line flags (applied by the CLI).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::guard::DEFAULT_MAX_INPUT_BYTES;
use crate::llm::LlmConfig;
use crate::verify::CourtListenerConfig;

/// Name used for config discovery and the cache directory.
pub const APP_NAME: &str = "legalcheck";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {format} config {path}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },
}

/// Resolved application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub llm: LlmConfig,
    pub courtlistener: CourtListenerConfig,
    /// Largest accepted input document, in bytes.
    pub max_input_bytes: usize,
    /// Verification cache directory (None disables caching).
    pub cache_dir: Option<PathBuf>,
    /// JSON Lines audit log (None = tracing only).
    pub audit_log: Option<PathBuf>,
}

/// Default cache location: the platform cache dir, falling back to the
/// home directory.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            courtlistener: CourtListenerConfig::default(),
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            cache_dir: Some(default_cache_dir()),
            audit_log: None,
        }
    }
}

impl Settings {
    /// Apply environment variable overrides.
    ///
    /// Besides the `LLM_*` and `COURTLISTENER_*` variables handled by the
    /// sub-configs:
    /// - `LEGALCHECK_MAX_INPUT_BYTES`: input size limit
    /// - `LEGALCHECK_CACHE_DIR`: verification cache directory
    /// - `LEGALCHECK_AUDIT_LOG`: audit log path
    pub fn with_env_overrides(mut self) -> Self {
        self.llm = self.llm.with_env_overrides();
        self.courtlistener = self.courtlistener.with_env_overrides();

        if let Some(n) = env_var("LEGALCHECK_MAX_INPUT_BYTES").and_then(|v| v.parse().ok()) {
            self.max_input_bytes = n;
        }
        if let Some(dir) = env_var("LEGALCHECK_CACHE_DIR") {
            debug!("Using LEGALCHECK_CACHE_DIR from environment: {}", dir);
            self.cache_dir = Some(expand(&dir));
        }
        if let Some(path) = env_var("LEGALCHECK_AUDIT_LOG") {
            debug!("Using LEGALCHECK_AUDIT_LOG from environment: {}", path);
            self.audit_log = Some(expand(&path));
        }
        self
    }

    /// CourtListener config with the resolved cache directory filled in.
    pub fn verifier_config(&self) -> CourtListenerConfig {
        let mut config = self.courtlistener.clone();
        config.cache_dir = self
            .cache_dir
            .as_ref()
            .map(|d| d.display().to_string());
        config
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Configuration file contents. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model served by the inference runtime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Inference runtime endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_input_bytes: Option<usize>,
    /// Per-call inference timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    /// Inference requests allowed per minute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_requests_per_minute: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courtlistener: Option<CourtListenerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_log: Option<String>,
    /// Path the config was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Discover and load a config file with prefer.
    /// Falls back to defaults when none is found or it cannot be parsed.
    pub async fn load() -> Self {
        match prefer::load(APP_NAME).await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            warn!("Ignoring config file: {}", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// The format follows the extension: TOML, YAML, or JSON otherwise.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

        let parse_error = |format: &'static str, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        };

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents).map_err(|e| parse_error("TOML", e.to_string()))?,
            "yaml" | "yml" => {
                serde_yaml::from_str(&contents).map_err(|e| parse_error("YAML", e.to_string()))?
            }
            _ => serde_json::from_str(&contents).map_err(|e| parse_error("JSON", e.to_string()))?,
        };

        debug!("Loaded config from {}", path.display());
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory of the config file, for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are joined onto `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = expand(path_str);
        if expanded.is_absolute() {
            expanded
        } else {
            base_dir.join(expanded)
        }
    }

    /// Apply file values onto settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref model) = self.model {
            settings.llm.model = model.clone();
        }
        if let Some(ref endpoint) = self.endpoint {
            settings.llm = settings.llm.clone().with_endpoint(endpoint);
        }
        if let Some(timeout) = self.timeout_seconds {
            settings.llm.timeout_seconds = timeout;
        }
        if let Some(rpm) = self.max_requests_per_minute {
            settings.llm.max_requests_per_minute = rpm;
        }
        if let Some(max_tokens) = self.max_tokens {
            settings.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            settings.llm.temperature = temperature;
        }
        if let Some(max) = self.max_input_bytes {
            settings.max_input_bytes = max;
        }
        if let Some(ref courtlistener) = self.courtlistener {
            if let Some(ref dir) = courtlistener.cache_dir {
                settings.cache_dir = Some(self.resolve_path(dir, base_dir));
            }
            settings.courtlistener = courtlistener.clone();
        }
        if let Some(ref audit_log) = self.audit_log {
            settings.audit_log = Some(self.resolve_path(audit_log, base_dir));
        }
    }
}

/// Load settings from an explicit config file, or discover one.
///
/// An explicit path that cannot be read or parsed is an error; a
/// discovered one is skipped with a warning.
pub async fn load_settings(config_path: Option<&Path>) -> Result<(Settings, Config), ConfigError> {
    let config = match config_path {
        Some(path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    let settings = settings.with_env_overrides();

    Ok((settings, config))
}

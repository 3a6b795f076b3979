//! Sliding-window rate limiter keyed by host.
//!
//! Caps outbound requests per host within a time window. Callers either
//! queue (`acquire`) or are refused immediately (`try_acquire`). Hosts that
//! answer 429/503 are blocked for the Retry-After period, backing off further
//! on repeated hits and recovering on success.

mod config;
mod window;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

pub use config::{HostStats, RateLimitConfig, DEFAULT_MAX_REQUESTS_PER_MINUTE};
use window::WindowState;

/// Errors from admission control.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit exceeded for {host}, retry after {retry_after:?}")]
    Throttled { host: String, retry_after: Duration },
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

/// Rate limiter shared by every clone.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    hosts: Arc<RwLock<HashMap<String, WindowState>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with default config.
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default())
    }

    /// Create a new rate limiter with custom config.
    pub fn with_config(mut config: RateLimitConfig) -> Self {
        config.max_requests = config.max_requests.max(1);
        Self {
            config,
            hosts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Extract host (with port, if any) from URL.
    pub fn extract_host(url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?;
        Some(match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }

    fn host_for(url: &str) -> Result<String, RateLimitError> {
        Self::extract_host(url).ok_or_else(|| RateLimitError::InvalidUrl(url.to_string()))
    }

    /// Compute the wait for `host`, admitting the request if no wait is needed.
    async fn reserve(&self, host: &str) -> Duration {
        let mut hosts = self.hosts.write().await;
        let state = hosts
            .entry(host.to_string())
            .or_insert_with(|| WindowState::new(self.config.base_backoff));

        let now = Instant::now();
        state.prune(now, self.config.window);
        let wait = state.time_until_ready(now, self.config.max_requests, self.config.window);
        if wait.is_zero() {
            state.admit(now);
        }
        wait
    }

    async fn record_throttled(&self, host: &str) {
        let mut hosts = self.hosts.write().await;
        if let Some(state) = hosts.get_mut(host) {
            state.throttled += 1;
        }
    }

    /// Wait for a free slot, then admit the request.
    ///
    /// Returns the host the request was counted against. Fails with
    /// `Throttled` when the wait would exceed `max_wait`.
    pub async fn acquire(&self, url: &str) -> Result<String, RateLimitError> {
        let host = Self::host_for(url)?;
        let deadline = self.config.max_wait.map(|max| Instant::now() + max);

        loop {
            let wait = self.reserve(&host).await;
            if wait.is_zero() {
                return Ok(host);
            }

            if let Some(deadline) = deadline {
                if Instant::now() + wait > deadline {
                    self.record_throttled(&host).await;
                    warn!("Refusing request to {}: next slot in {:?}", host, wait);
                    return Err(RateLimitError::Throttled {
                        host,
                        retry_after: wait,
                    });
                }
            }

            debug!("Rate limiting {}: waiting {:?}", host, wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Admit the request only if a slot is free right now.
    pub async fn try_acquire(&self, url: &str) -> Result<String, RateLimitError> {
        let host = Self::host_for(url)?;
        let wait = self.reserve(&host).await;
        if wait.is_zero() {
            return Ok(host);
        }
        self.record_throttled(&host).await;
        debug!("Throttled request to {} ({:?} until next slot)", host, wait);
        Err(RateLimitError::Throttled {
            host,
            retry_after: wait,
        })
    }

    /// Report a successful response, clearing any backoff.
    pub async fn report_success(&self, host: &str) {
        let mut hosts = self.hosts.write().await;
        if let Some(state) = hosts.get_mut(host) {
            if state.blocked_until.take().is_some()
                || state.current_backoff != self.config.base_backoff
            {
                info!("Host {} recovered from rate limit backoff", host);
            }
            state.current_backoff = self.config.base_backoff;
        }
    }

    /// Report a 429/503 response. Blocks the host for `retry_after`, or the
    /// current backoff delay when the server gave none.
    pub async fn report_rate_limit(
        &self,
        host: &str,
        status_code: u16,
        retry_after: Option<Duration>,
    ) {
        let mut hosts = self.hosts.write().await;
        let state = hosts
            .entry(host.to_string())
            .or_insert_with(|| WindowState::new(self.config.base_backoff));

        let delay = retry_after
            .unwrap_or(state.current_backoff)
            .min(self.config.max_backoff);
        state.blocked_until = Some(Instant::now() + delay);
        state.rate_limit_hits += 1;

        let next = Duration::from_secs_f64(
            state.current_backoff.as_secs_f64() * self.config.backoff_multiplier,
        );
        state.current_backoff = next.min(self.config.max_backoff);

        warn!(
            "Rate limited by {} (HTTP {}), blocking for {:?}",
            host, status_code, delay
        );
    }

    /// Check if a status code is a rate limit response.
    pub fn is_rate_limit_status(status_code: u16) -> bool {
        matches!(status_code, 429 | 503)
    }

    /// Get statistics for all hosts.
    pub async fn stats(&self) -> HashMap<String, HostStats> {
        let mut hosts = self.hosts.write().await;
        let now = Instant::now();
        hosts
            .iter_mut()
            .map(|(k, v)| {
                v.prune(now, self.config.window);
                (
                    k.clone(),
                    HostStats {
                        in_window: v.requests.len(),
                        total_requests: v.total_requests,
                        throttled: v.throttled,
                        rate_limit_hits: v.rate_limit_hits,
                        in_backoff: v.in_backoff(now),
                        current_backoff: v.current_backoff,
                    },
                )
            })
            .collect()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse Retry-After header value (seconds), capped at 60 seconds.
pub fn parse_retry_after(header_value: Option<&str>) -> Option<Duration> {
    let value = header_value?;
    value
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| Duration::from_secs(secs.min(60)))
}

//! Rate limiter configuration and statistics types.

use std::time::Duration;

/// Default number of inference requests allowed per window.
pub const DEFAULT_MAX_REQUESTS_PER_MINUTE: u32 = 10;

/// Configuration for a sliding-window rate limiter.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per host within `window`.
    pub max_requests: u32,
    /// Length of the sliding window.
    pub window: Duration,
    /// Longest a caller may be queued before the request is refused.
    /// `None` queues indefinitely.
    pub max_wait: Option<Duration>,
    /// First backoff delay after a 429/503 without Retry-After.
    pub base_backoff: Duration,
    /// Multiplier applied to the backoff on repeated rate limit hits.
    pub backoff_multiplier: f64,
    /// Upper bound for the backoff delay.
    pub max_backoff: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::per_minute(DEFAULT_MAX_REQUESTS_PER_MINUTE)
    }
}

impl RateLimitConfig {
    /// Config allowing `max_requests` per 60 second window.
    pub fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
            max_wait: None,
            base_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(120),
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }
}

/// Statistics for a host.
#[derive(Debug, Clone)]
pub struct HostStats {
    /// Requests currently counted in the window.
    pub in_window: usize,
    /// Requests admitted since the limiter was created.
    pub total_requests: u64,
    /// Requests refused.
    pub throttled: u64,
    /// 429/503 responses reported by callers.
    pub rate_limit_hits: u64,
    pub in_backoff: bool,
    pub current_backoff: Duration,
}

//! Per-host sliding window state.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// State for a single host.
#[derive(Debug, Clone)]
pub struct WindowState {
    /// Admission times within the current window, oldest first.
    pub requests: VecDeque<Instant>,
    /// Requests are blocked until this instant after a rate limit response.
    pub blocked_until: Option<Instant>,
    /// Delay applied on the next rate limit response without Retry-After.
    pub current_backoff: Duration,
    pub total_requests: u64,
    pub throttled: u64,
    pub rate_limit_hits: u64,
}

impl WindowState {
    pub fn new(base_backoff: Duration) -> Self {
        Self {
            requests: VecDeque::new(),
            blocked_until: None,
            current_backoff: base_backoff,
            total_requests: 0,
            throttled: 0,
            rate_limit_hits: 0,
        }
    }

    /// Drop admissions older than the window.
    pub fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.requests.front() {
            if now.duration_since(oldest) >= window {
                self.requests.pop_front();
            } else {
                break;
            }
        }
    }

    /// Time until a request may be admitted. Call `prune` first.
    pub fn time_until_ready(&self, now: Instant, max_requests: u32, window: Duration) -> Duration {
        let backoff_wait = self
            .blocked_until
            .map(|until| until.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO);

        let window_wait = if self.requests.len() < max_requests as usize {
            Duration::ZERO
        } else {
            // The slot frees when the oldest admission that keeps us at the cap leaves.
            let idx = self.requests.len() - max_requests as usize;
            self.requests
                .get(idx)
                .map(|t| (*t + window).saturating_duration_since(now))
                .unwrap_or(Duration::ZERO)
        };

        backoff_wait.max(window_wait)
    }

    /// Record an admitted request.
    pub fn admit(&mut self, now: Instant) {
        self.requests.push_back(now);
        self.total_requests += 1;
    }

    pub fn in_backoff(&self, now: Instant) -> bool {
        self.blocked_until.is_some_and(|until| until > now)
    }
}

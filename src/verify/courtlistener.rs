//! CourtListener REST API (v4) client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use super::config::CourtListenerConfig;
use super::matching::CaseRecord;
use super::{CaseLawSource, VerifyError};
use crate::rate_limit::{parse_retry_after, RateLimitConfig, RateLimiter};
use crate::sanitize::sanitize_output;

pub const USER_AGENT: &str = concat!(
    "legalcheck/",
    env!("CARGO_PKG_VERSION"),
    " (legal citation verification)"
);

/// Longest error body kept in an error message.
const MAX_ERROR_BODY: usize = 200;

#[derive(Clone)]
pub struct CourtListenerClient {
    config: CourtListenerConfig,
    client: Client,
    rate_limiter: RateLimiter,
}

impl CourtListenerClient {
    pub fn new(config: CourtListenerConfig) -> Result<Self, VerifyError> {
        let rate_limiter =
            RateLimiter::with_config(RateLimitConfig::per_minute(config.max_requests_per_minute));
        Self::with_rate_limiter(config, rate_limiter)
    }

    pub fn with_rate_limiter(
        config: CourtListenerConfig,
        rate_limiter: RateLimiter,
    ) -> Result<Self, VerifyError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| VerifyError::Http(e.to_string()))?;

        Ok(Self {
            config,
            client,
            rate_limiter,
        })
    }

    pub fn config(&self) -> &CourtListenerConfig {
        &self.config
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.config.token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => builder.header(AUTHORIZATION, format!("Token {}", token)),
            None => builder,
        }
    }

    /// Send a request through the rate limiter and decode the JSON body.
    async fn send_json(&self, url: &str, builder: RequestBuilder) -> Result<Value, VerifyError> {
        let host = self.rate_limiter.acquire(url).await?;

        let resp = self.authorize(builder).send().await.map_err(|e| {
            if e.is_timeout() {
                VerifyError::Timeout(Duration::from_secs(self.config.timeout_seconds))
            } else {
                VerifyError::Http(e.to_string())
            }
        })?;

        let status = resp.status();
        if RateLimiter::is_rate_limit_status(status.as_u16()) {
            let retry_after = parse_retry_after(
                resp.headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok()),
            );
            self.rate_limiter
                .report_rate_limit(&host, status.as_u16(), retry_after)
                .await;
            return Err(VerifyError::ServerThrottled(status.as_u16()));
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let body: String = sanitize_output(&body).chars().take(MAX_ERROR_BODY).collect();
            return Err(VerifyError::Api(format!("HTTP {}: {}", status, body.trim())));
        }

        self.rate_limiter.report_success(&host).await;
        resp.json()
            .await
            .map_err(|e| VerifyError::Parse(e.to_string()))
    }
}

/// First matched case in a citation-lookup response.
///
/// The v4 endpoint answers with one entry per citation found in the posted
/// text, each carrying a `status` and the matching `clusters`. A plain
/// `{"results": [...]}` object is also accepted.
fn parse_lookup(body: &Value) -> Option<CaseRecord> {
    match body {
        Value::Array(entries) => entries.iter().find_map(|entry| {
            if let Some(status) = entry.get("status").and_then(Value::as_u64) {
                if status != 200 {
                    return None;
                }
            }
            entry
                .get("clusters")
                .and_then(Value::as_array)
                .and_then(|clusters| clusters.first())
                .map(CaseRecord::from_json)
        }),
        Value::Object(_) => body
            .get("results")
            .and_then(Value::as_array)
            .and_then(|results| results.first())
            .map(CaseRecord::from_json),
        _ => None,
    }
}

#[async_trait]
impl CaseLawSource for CourtListenerClient {
    fn name(&self) -> &str {
        "CourtListener"
    }

    async fn lookup_citation(&self, citation: &str) -> Result<Option<CaseRecord>, VerifyError> {
        let url = self.url("citation-lookup/");
        debug!("Citation lookup: {}", citation);
        let builder = self.client.post(&url).form(&[("text", citation)]);
        let body = self.send_json(&url, builder).await?;
        Ok(parse_lookup(&body))
    }

    async fn search_opinions(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<Value>, VerifyError> {
        let url = self.url("search/");
        debug!("Opinion search: {}", query);
        let page_size = max_results.to_string();
        let builder = self.client.get(&url).query(&[
            ("q", query),
            ("type", "o"),
            ("page_size", page_size.as_str()),
        ]);
        let body = self.send_json(&url, builder).await?;

        let mut results = match body.get("results") {
            Some(Value::Array(results)) => results.clone(),
            _ => Vec::new(),
        };
        results.truncate(max_results);
        Ok(results)
    }
}

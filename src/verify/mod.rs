//! Citation verification against an external case-law database.
//!
//! Each citation is checked with the strategies of the source in turn
//! (exact citation lookup, then search), and results are cached on disk.
//! Lookup failures are reported as unverified and never cached.

mod cache;
mod config;
mod courtlistener;
mod matching;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::citations::{Citation, CitationKind};
use crate::rate_limit::RateLimitError;

pub use cache::VerificationCache;
pub use config::{CourtListenerConfig, DEFAULT_API_URL, DEFAULT_MAX_CITATIONS};
pub use courtlistener::{CourtListenerClient, USER_AGENT};
pub use matching::{citation_matches, names_match, CaseRecord};

/// Citations shorter than this are not worth a lookup.
const MIN_CITATION_LENGTH: usize = 5;

const CITATION_SEARCH_RESULTS: usize = 5;
const NAME_SEARCH_RESULTS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Server rate limited the request (HTTP {0})")]
    ServerThrottled(u16),
    #[error("API error: {0}")]
    Api(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
}

/// A searchable case-law database.
#[async_trait]
pub trait CaseLawSource: Send + Sync {
    /// Source name, for reports.
    fn name(&self) -> &str;

    /// Resolve a reporter citation to a case, if the source knows it.
    async fn lookup_citation(&self, citation: &str) -> Result<Option<CaseRecord>, VerifyError>;

    /// Full-text opinion search, returning raw result objects.
    async fn search_opinions(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<Value>, VerifyError>;
}

/// How a citation was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMethod {
    CitationLookup,
    Search,
    NameSearch,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::CitationLookup => "citation-lookup",
            SearchMethod::Search => "search",
            SearchMethod::NameSearch => "name-search",
        }
    }
}

/// Outcome of checking one citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationCheck {
    pub query: String,
    pub kind: CitationKind,
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_filed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docket_number: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub official_citation: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_method: Option<SearchMethod>,
    /// 0-100
    pub confidence: u8,
    /// Why the lookup could not be completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cached: bool,
}

impl CitationCheck {
    pub fn verified(
        query: &str,
        kind: CitationKind,
        record: CaseRecord,
        method: SearchMethod,
        confidence: u8,
    ) -> Self {
        Self {
            query: query.to_string(),
            kind,
            verified: true,
            case_name: record.case_name,
            court: record.court,
            date_filed: record.date_filed,
            docket_number: record.docket_number,
            official_citation: record.citations,
            search_method: Some(method),
            confidence,
            error: None,
            cached: false,
        }
    }

    pub fn unverified(query: &str, kind: CitationKind, error: Option<String>) -> Self {
        Self {
            query: query.to_string(),
            kind,
            verified: false,
            case_name: None,
            court: None,
            date_filed: None,
            docket_number: None,
            official_citation: Vec::new(),
            search_method: None,
            confidence: 0,
            error,
            cached: false,
        }
    }

    /// One line of verification context for prompts and reports.
    pub fn context_line(&self) -> String {
        if self.verified {
            format!(
                "VERIFIED: {} is {} ({}, {})",
                self.query,
                self.case_name.as_deref().unwrap_or("unknown"),
                self.court.as_deref().unwrap_or("unknown"),
                self.date_filed.as_deref().unwrap_or("unknown"),
            )
        } else {
            format!("NOT FOUND: {} could not be verified", self.query)
        }
    }
}

/// Results of verifying a document's citations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSummary {
    /// False when verification was disabled for the run.
    pub performed: bool,
    pub source: String,
    pub total_checked: usize,
    pub verified: Vec<CitationCheck>,
    pub unverified: Vec<CitationCheck>,
    /// Percentage of checked citations that were verified.
    pub verification_rate: f64,
    /// Text block describing each result, fed to the analysis prompts.
    pub context: String,
}

impl VerificationSummary {
    pub fn skipped() -> Self {
        Self {
            performed: false,
            source: String::new(),
            total_checked: 0,
            verified: Vec::new(),
            unverified: Vec::new(),
            verification_rate: 0.0,
            context: "Citation verification was not performed.".to_string(),
        }
    }

    /// Summarize a set of checks made against `source`.
    pub fn from_checks(source: &str, checks: Vec<CitationCheck>) -> Self {
        let total_checked = checks.len();
        let context = if checks.is_empty() {
            "No citations found to verify.".to_string()
        } else {
            checks
                .iter()
                .map(CitationCheck::context_line)
                .collect::<Vec<_>>()
                .join("\n")
        };
        let (verified, unverified): (Vec<_>, Vec<_>) = checks.into_iter().partition(|c| c.verified);
        let verification_rate = verified.len() as f64 / total_checked.max(1) as f64 * 100.0;

        Self {
            performed: true,
            source: source.to_string(),
            total_checked,
            verified,
            unverified,
            verification_rate,
            context,
        }
    }

    pub fn verified_count(&self) -> usize {
        self.verified.len()
    }

    pub fn unverified_count(&self) -> usize {
        self.unverified.len()
    }

    pub fn has_unverified(&self) -> bool {
        !self.unverified.is_empty()
    }
}

/// Verifies citations against a [`CaseLawSource`], with an optional cache.
#[derive(Clone)]
pub struct CitationVerifier {
    source: Arc<dyn CaseLawSource>,
    cache: Option<VerificationCache>,
    max_citations: usize,
}

impl CitationVerifier {
    pub fn new(source: Arc<dyn CaseLawSource>) -> Self {
        Self {
            source,
            cache: None,
            max_citations: DEFAULT_MAX_CITATIONS,
        }
    }

    /// Build a CourtListener-backed verifier from configuration.
    pub fn from_config(config: &CourtListenerConfig) -> Result<Self, VerifyError> {
        let client = CourtListenerClient::new(config.clone())?;
        let mut verifier = Self::new(Arc::new(client)).with_max_citations(config.max_citations);
        if let Some(dir) = &config.cache_dir {
            verifier = verifier.with_cache(VerificationCache::new(dir));
        }
        Ok(verifier)
    }

    pub fn with_cache(mut self, cache: VerificationCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn with_max_citations(mut self, max_citations: usize) -> Self {
        self.max_citations = max_citations;
        self
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn cache(&self) -> Option<&VerificationCache> {
        self.cache.as_ref()
    }

    /// Serve from cache, otherwise run `check` and cache a successful result.
    async fn cached_or<F>(&self, key: &str, query: &str, kind: CitationKind, check: F) -> CitationCheck
    where
        F: Future<Output = Result<CitationCheck, VerifyError>>,
    {
        if let Some(cache) = &self.cache {
            if let Some(mut hit) = cache.get(key).await {
                hit.cached = true;
                return hit;
            }
        }

        match check.await {
            Ok(result) => {
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.put(key, &result).await {
                        warn!("Failed to cache result for {}: {}", query, e);
                    }
                }
                result
            }
            Err(e) => {
                warn!("Verification of {} failed: {}", query, e);
                CitationCheck::unverified(query, kind, Some(format!("Lookup failed: {}", e)))
            }
        }
    }

    async fn check_citation(&self, citation: &str) -> Result<CitationCheck, VerifyError> {
        if let Some(record) = self.source.lookup_citation(citation).await? {
            return Ok(CitationCheck::verified(
                citation,
                CitationKind::Case,
                record,
                SearchMethod::CitationLookup,
                90,
            ));
        }

        let mut results = self
            .source
            .search_opinions(&format!("citation:\"{}\"", citation), CITATION_SEARCH_RESULTS)
            .await?;
        if results.is_empty() {
            results = self
                .source
                .search_opinions(citation, CITATION_SEARCH_RESULTS)
                .await?;
        }

        Ok(results
            .iter()
            .find(|r| citation_matches(citation, r))
            .map(|r| {
                CitationCheck::verified(
                    citation,
                    CitationKind::Case,
                    CaseRecord::from_json(r),
                    SearchMethod::Search,
                    80,
                )
            })
            .unwrap_or_else(|| CitationCheck::unverified(citation, CitationKind::Case, None)))
    }

    async fn check_case_name(&self, name: &str) -> Result<CitationCheck, VerifyError> {
        let results = self.source.search_opinions(name, NAME_SEARCH_RESULTS).await?;

        Ok(results
            .iter()
            .map(CaseRecord::from_json)
            .find(|record| names_match(name, record.case_name.as_deref().unwrap_or("")))
            .map(|record| {
                CitationCheck::verified(
                    name,
                    CitationKind::CaseName,
                    record,
                    SearchMethod::NameSearch,
                    85,
                )
            })
            .unwrap_or_else(|| CitationCheck::unverified(name, CitationKind::CaseName, None)))
    }

    /// Verify a reporter citation such as `347 U.S. 483`.
    pub async fn verify_citation(&self, citation: &str) -> CitationCheck {
        let key = VerificationCache::citation_key(citation);
        self.cached_or(&key, citation, CitationKind::Case, self.check_citation(citation))
            .await
    }

    /// Verify a case name such as `Roe v. Wade`.
    pub async fn verify_case_name(&self, name: &str) -> CitationCheck {
        let key = VerificationCache::name_key(name);
        self.cached_or(&key, name, CitationKind::CaseName, self.check_case_name(name))
            .await
    }

    pub async fn verify(&self, citation: &Citation) -> CitationCheck {
        match citation.kind {
            CitationKind::Case => self.verify_citation(&citation.content).await,
            CitationKind::CaseName => self.verify_case_name(&citation.content).await,
        }
    }

    /// Verify up to `max_citations` citations, in order.
    pub async fn verify_all(&self, citations: &[Citation]) -> VerificationSummary {
        let mut checks = Vec::new();

        for citation in citations.iter().take(self.max_citations) {
            if citation.content.chars().count() < MIN_CITATION_LENGTH {
                continue;
            }
            info!("Verifying: {} (type: {})", citation.content, citation.kind);
            let check = self.verify(citation).await;
            if check.verified {
                info!(
                    "  Verified: {}",
                    check.case_name.as_deref().unwrap_or("unknown")
                );
            } else {
                warn!("  Not found: {}", citation.content);
            }
            checks.push(check);
        }

        if citations.len() > self.max_citations {
            info!(
                "Checked the first {} of {} citations",
                self.max_citations,
                citations.len()
            );
        }

        VerificationSummary::from_checks(self.source.name(), checks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citations::extract_citations;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Knows Brown v. Board by citation and Roe v. Wade by search.
    #[derive(Default)]
    struct FakeSource {
        lookups: AtomicUsize,
        searches: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl CaseLawSource for FakeSource {
        fn name(&self) -> &str {
            "Fake"
        }

        async fn lookup_citation(
            &self,
            citation: &str,
        ) -> Result<Option<CaseRecord>, VerifyError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(VerifyError::Http("connection refused".to_string()));
            }
            Ok((citation == "347 U.S. 483").then(|| CaseRecord {
                case_name: Some("Brown v. Board of Education".to_string()),
                court: Some("scotus".to_string()),
                date_filed: Some("1954-05-17".to_string()),
                ..CaseRecord::default()
            }))
        }

        async fn search_opinions(
            &self,
            query: &str,
            _max_results: usize,
        ) -> Result<Vec<Value>, VerifyError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            if query.contains("410") || query.contains("Roe") {
                Ok(vec![json!({
                    "caseName": "Roe v. Wade",
                    "citation": ["410 U.S. 113"],
                    "court": "Supreme Court of the United States",
                    "dateFiled": "1973-01-22"
                })])
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn verifier(source: FakeSource) -> (CitationVerifier, Arc<FakeSource>) {
        let source = Arc::new(source);
        (CitationVerifier::new(source.clone()), source)
    }

    #[tokio::test]
    async fn test_lookup_strategy() {
        let (verifier, source) = verifier(FakeSource::default());
        let check = verifier.verify_citation("347 U.S. 483").await;
        assert!(check.verified);
        assert_eq!(check.search_method, Some(SearchMethod::CitationLookup));
        assert_eq!(check.confidence, 90);
        assert_eq!(source.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_search_strategy() {
        let (verifier, _) = verifier(FakeSource::default());
        let check = verifier.verify_citation("410 U.S. 113").await;
        assert!(check.verified);
        assert_eq!(check.search_method, Some(SearchMethod::Search));
        assert_eq!(check.confidence, 80);
        assert_eq!(check.official_citation, vec!["410 U.S. 113".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_citation_searches_twice() {
        let (verifier, source) = verifier(FakeSource::default());
        let check = verifier.verify_citation("999 F.3d 1234").await;
        assert!(!check.verified);
        assert!(check.error.is_none());
        assert_eq!(source.searches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_case_name_strategy() {
        let (verifier, _) = verifier(FakeSource::default());
        let check = verifier.verify_case_name("Roe v. Wade").await;
        assert!(check.verified);
        assert_eq!(check.search_method, Some(SearchMethod::NameSearch));
        assert_eq!(check.confidence, 85);

        let check = verifier.verify_case_name("Smith v. Jones").await;
        assert!(!check.verified);
    }

    #[tokio::test]
    async fn test_results_cached() {
        let dir = tempfile::tempdir().unwrap();
        let (verifier, source) = verifier(FakeSource::default());
        let verifier = verifier.with_cache(VerificationCache::new(dir.path()));

        let first = verifier.verify_citation("347 U.S. 483").await;
        let second = verifier.verify_citation("347 U.S. 483").await;
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(second.case_name, first.case_name);
        assert_eq!(source.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = VerificationCache::new(dir.path());
        let (verifier, source) = verifier(FakeSource {
            fail: true,
            ..FakeSource::default()
        });
        let verifier = verifier.with_cache(cache.clone());

        let check = verifier.verify_citation("347 U.S. 483").await;
        assert!(!check.verified);
        assert!(check.error.as_deref().unwrap().starts_with("Lookup failed"));
        assert!(cache.is_empty());

        verifier.verify_citation("347 U.S. 483").await;
        assert_eq!(source.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_verify_all_summary() {
        let (verifier, _) = verifier(FakeSource::default());
        let text = "Brown v. Board of Education, 347 U.S. 483 (1954). See also 999 F.3d 1234.";
        let summary = verifier.verify_all(&extract_citations(text)).await;

        assert!(summary.performed);
        assert_eq!(summary.total_checked, 2);
        assert_eq!(summary.verified_count(), 1);
        assert_eq!(summary.unverified_count(), 1);
        assert!((summary.verification_rate - 50.0).abs() < f64::EPSILON);
        assert!(summary
            .context
            .contains("VERIFIED: 347 U.S. 483 is Brown v. Board of Education (scotus, 1954-05-17)"));
        assert!(summary
            .context
            .contains("NOT FOUND: 999 F.3d 1234 could not be verified"));
    }

    #[tokio::test]
    async fn test_verify_all_respects_limit() {
        let (verifier, source) = verifier(FakeSource::default());
        let verifier = verifier.with_max_citations(1);
        let citations = extract_citations("347 U.S. 483 and 410 U.S. 113");
        let summary = verifier.verify_all(&citations).await;
        assert_eq!(summary.total_checked, 1);
        assert_eq!(source.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_verify_all_empty() {
        let (verifier, _) = verifier(FakeSource::default());
        let summary = verifier.verify_all(&[]).await;
        assert_eq!(summary.total_checked, 0);
        assert_eq!(summary.verification_rate, 0.0);
        assert_eq!(summary.context, "No citations found to verify.");
    }
}

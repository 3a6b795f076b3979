//! Risk and confidence rules.
//!
//! Verification results outrank the model: any unverified citation forces
//! the risk to high or critical and caps confidence at 40.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static CONFIDENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)CONFIDENCE:\s*(\d+)").expect("confidence pattern should compile")
});

static RISK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)RISK:\s*(low|medium|high|critical)").expect("risk pattern should compile")
});

static RECOMMENDATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)RECOMMENDATION:\s*([^\n]+)").expect("recommendation pattern should compile")
});

/// Confidence used when the model gives none.
const DEFAULT_CONFIDENCE: u8 = 50;
/// Ceiling on confidence whenever a citation could not be verified.
const UNVERIFIED_CONFIDENCE_CAP: u8 = 40;

pub const INCOMPLETE_RECOMMENDATION: &str = "Analysis incomplete - verify all citations manually.";
pub const DEFAULT_RECOMMENDATION: &str = "Document appears reliable based on citation verification.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
            RiskLevel::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => RiskLevel::Low,
            "medium" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            "critical" => RiskLevel::Critical,
            _ => RiskLevel::Unknown,
        }
    }

    pub fn is_elevated(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The trailing verdict lines of a synthesis response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Verdict {
    pub confidence: Option<u8>,
    pub risk: Option<RiskLevel>,
    pub recommendation: Option<String>,
}

impl Verdict {
    pub fn parse(response: &str) -> Self {
        let confidence = CONFIDENCE
            .captures(response)
            .and_then(|c| c[1].parse::<u32>().ok())
            .map(|n| n.min(100) as u8);
        let risk = RISK.captures(response).map(|c| RiskLevel::parse(&c[1]));
        let recommendation = RECOMMENDATION
            .captures(response)
            .map(|c| c[1].trim().to_string())
            .filter(|r| !r.is_empty());

        Self {
            confidence,
            risk,
            recommendation,
        }
    }
}

/// Risk dictated by verification alone.
#[derive(Debug, Clone, PartialEq)]
pub struct ForcedRisk {
    pub level: RiskLevel,
    pub reason: String,
}

impl ForcedRisk {
    pub fn from_counts(verified: usize, unverified: usize) -> Self {
        if unverified > verified {
            Self {
                level: RiskLevel::Critical,
                reason: format!(
                    "Majority of citations ({}/{}) could not be verified",
                    unverified,
                    verified + unverified
                ),
            }
        } else if unverified > 0 {
            Self {
                level: RiskLevel::High,
                reason: format!(
                    "{} citation(s) could not be verified - probable hallucination",
                    unverified
                ),
            }
        } else {
            Self {
                level: RiskLevel::Low,
                reason: "All citations verified in CourtListener".to_string(),
            }
        }
    }
}

/// Final determination for a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub risk_level: RiskLevel,
    pub confidence_score: u8,
    pub recommendation: String,
}

impl Assessment {
    /// Combine verification counts with the model's verdict. `None` means
    /// the synthesis stage failed.
    pub fn decide(verified: usize, unverified: usize, verdict: Option<&Verdict>) -> Self {
        let forced = ForcedRisk::from_counts(verified, unverified);

        let Some(verdict) = verdict else {
            return Self {
                risk_level: forced.level,
                confidence_score: if unverified > 0 { 20 } else { DEFAULT_CONFIDENCE },
                recommendation: INCOMPLETE_RECOMMENDATION.to_string(),
            };
        };

        let parsed_confidence = verdict.confidence.unwrap_or(DEFAULT_CONFIDENCE);

        if unverified > 0 {
            let verified_share = (100 * verified / (verified + unverified)) as u8;
            return Self {
                risk_level: forced.level,
                confidence_score: parsed_confidence
                    .min(verified_share)
                    .min(UNVERIFIED_CONFIDENCE_CAP),
                recommendation: format!(
                    "DO NOT RELY ON THIS DOCUMENT - {} citation(s) could not be verified in CourtListener and may be fabricated.",
                    unverified
                ),
            };
        }

        Self {
            risk_level: verdict.risk.unwrap_or(RiskLevel::Unknown),
            confidence_score: parsed_confidence,
            recommendation: verdict
                .recommendation
                .clone()
                .unwrap_or_else(|| DEFAULT_RECOMMENDATION.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = "The document cites real cases.\n\nCONFIDENCE: 85\nRISK: Low\nRECOMMENDATION: Safe to rely on with routine review.\n";

    #[test]
    fn test_parse_verdict() {
        let verdict = Verdict::parse(RESPONSE);
        assert_eq!(verdict.confidence, Some(85));
        assert_eq!(verdict.risk, Some(RiskLevel::Low));
        assert_eq!(
            verdict.recommendation.as_deref(),
            Some("Safe to rely on with routine review.")
        );
    }

    #[test]
    fn test_parse_verdict_missing_lines() {
        let verdict = Verdict::parse("No structured ending.");
        assert_eq!(verdict, Verdict::default());
        assert_eq!(Verdict::parse("confidence: 400").confidence, Some(100));
    }

    #[test]
    fn test_forced_risk() {
        assert_eq!(ForcedRisk::from_counts(1, 2).level, RiskLevel::Critical);
        assert_eq!(ForcedRisk::from_counts(2, 2).level, RiskLevel::High);
        assert_eq!(ForcedRisk::from_counts(3, 0).level, RiskLevel::Low);
        assert_eq!(ForcedRisk::from_counts(0, 0).level, RiskLevel::Low);
    }

    #[test]
    fn test_unverified_overrides_model() {
        let verdict = Verdict::parse(RESPONSE);
        let assessment = Assessment::decide(3, 1, Some(&verdict));
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert_eq!(assessment.confidence_score, 40);
        assert!(assessment.recommendation.starts_with("DO NOT RELY ON THIS DOCUMENT - 1 citation(s)"));

        // 1 of 4 verified caps confidence at 25
        let assessment = Assessment::decide(1, 3, Some(&verdict));
        assert_eq!(assessment.risk_level, RiskLevel::Critical);
        assert_eq!(assessment.confidence_score, 25);
    }

    #[test]
    fn test_all_verified_uses_model() {
        let verdict = Verdict::parse(RESPONSE);
        let assessment = Assessment::decide(2, 0, Some(&verdict));
        assert_eq!(assessment.risk_level, RiskLevel::Low);
        assert_eq!(assessment.confidence_score, 85);
        assert_eq!(assessment.recommendation, "Safe to rely on with routine review.");

        let assessment = Assessment::decide(2, 0, Some(&Verdict::default()));
        assert_eq!(assessment.risk_level, RiskLevel::Unknown);
        assert_eq!(assessment.confidence_score, 50);
        assert_eq!(assessment.recommendation, DEFAULT_RECOMMENDATION);
    }

    #[test]
    fn test_failed_synthesis() {
        let assessment = Assessment::decide(0, 2, None);
        assert_eq!(assessment.risk_level, RiskLevel::Critical);
        assert_eq!(assessment.confidence_score, 20);
        assert_eq!(assessment.recommendation, INCOMPLETE_RECOMMENDATION);

        let assessment = Assessment::decide(2, 0, None);
        assert_eq!(assessment.risk_level, RiskLevel::Low);
        assert_eq!(assessment.confidence_score, 50);
    }
}

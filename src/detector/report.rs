//! Detection report and its text rendering.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::assessment::RiskLevel;
use super::stages::StageOutcomes;
use crate::citations::Citation;
use crate::verify::VerificationSummary;

/// Result of analyzing one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub run_id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    pub processing_time_secs: f64,
    pub input_bytes: usize,
    pub input_sha256: String,
    pub model: String,
    pub citations: Vec<Citation>,
    pub verification: VerificationSummary,
    pub stages: StageOutcomes,
    pub hallucination_detected: bool,
    pub risk_level: RiskLevel,
    pub confidence_score: u8,
    pub recommendation: String,
}

fn rule(out: &mut String, ch: char) {
    out.push_str(&ch.to_string().repeat(70));
    out.push('\n');
}

fn section(out: &mut String, title: &str) {
    rule(out, '-');
    out.push_str(title);
    out.push('\n');
    rule(out, '-');
    out.push('\n');
}

impl DetectionReport {
    /// Plain-text report for terminals.
    pub fn to_text(&self) -> String {
        let mut out = String::from("\n");
        let verification = &self.verification;

        rule(&mut out, '=');
        out.push_str("LEGAL HALLUCINATION DETECTION REPORT\n");
        out.push_str(if self.hallucination_detected {
            "HALLUCINATION LIKELY DETECTED\n"
        } else {
            "NO HALLUCINATIONS DETECTED\n"
        });
        rule(&mut out, '=');
        let _ = writeln!(
            out,
            "Analysis Date: {}",
            self.analyzed_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let _ = writeln!(out, "Processing Time: {:.1} seconds", self.processing_time_secs);
        let _ = writeln!(out, "Model: {}", self.model);
        let _ = writeln!(out, "Citations Found: {}", self.citations.len());
        if verification.performed {
            let _ = writeln!(out, "Verification Rate: {:.1}%", verification.verification_rate);
        } else {
            out.push_str("Verification Rate: not performed\n");
        }
        out.push('\n');

        section(
            &mut out,
            &format!("CITATION VERIFICATION RESULTS (via {})", display_source(verification)),
        );

        if !verification.performed {
            out.push_str("Citation verification was skipped.\n\n");
        }

        if verification.has_unverified() {
            let _ = writeln!(out, "UNVERIFIED CITATIONS: {}\n", verification.unverified_count());
            for check in &verification.unverified {
                let _ = writeln!(out, "   - {}", check.query);
                let _ = writeln!(
                    out,
                    "     Status: {}\n",
                    check.error.as_deref().unwrap_or("Not found in database")
                );
            }
        }

        if verification.verified_count() > 0 {
            let _ = writeln!(out, "VERIFIED CITATIONS: {}\n", verification.verified_count());
            for check in &verification.verified {
                let _ = writeln!(out, "   - {}", check.query);
                let _ = writeln!(out, "     Case: {}", check.case_name.as_deref().unwrap_or("N/A"));
                let _ = writeln!(out, "     Court: {}", check.court.as_deref().unwrap_or("N/A"));
                let _ = writeln!(out, "     Date: {}", check.date_filed.as_deref().unwrap_or("N/A"));
                let _ = writeln!(out, "     Confidence: {}%\n", check.confidence);
            }
        }

        if verification.performed && verification.total_checked == 0 {
            out.push_str("No case citations found in document.\n\n");
        }

        for (title, stage) in [
            ("STAGE 1: INITIAL ASSESSMENT", &self.stages.initial),
            ("STAGE 2: HALLUCINATION ANALYSIS", &self.stages.hallucination),
            ("STAGE 3: FINAL ASSESSMENT", &self.stages.synthesis),
        ] {
            section(&mut out, title);
            let text = if stage.text.is_empty() {
                "No assessment available."
            } else {
                stage.text.as_str()
            };
            let _ = writeln!(out, "{}\n", text);
        }

        rule(&mut out, '=');
        out.push_str("FINAL DETERMINATION\n");
        rule(&mut out, '=');
        out.push('\n');
        let _ = writeln!(out, "CONFIDENCE: {}%", self.confidence_score);
        let _ = writeln!(out, "RISK LEVEL: {}\n", self.risk_level.as_str().to_uppercase());
        let _ = writeln!(out, "RECOMMENDATION: {}\n", self.recommendation);
        rule(&mut out, '=');

        out
    }
}

fn display_source(verification: &VerificationSummary) -> &str {
    if verification.source.is_empty() {
        "CourtListener API"
    } else {
        &verification.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citations::CitationKind;
    use crate::detector::stages::StageOutcome;
    use crate::verify::CitationCheck;

    fn report(unverified: usize) -> DetectionReport {
        let mut verification = VerificationSummary::skipped();
        verification.performed = true;
        verification.source = "CourtListener".to_string();
        verification.unverified = (0..unverified)
            .map(|_| CitationCheck::unverified("999 F.3d 1234", CitationKind::Case, None))
            .collect();
        verification.total_checked = unverified;
        let stage = StageOutcome {
            text: "Looks fabricated.".to_string(),
            error: None,
        };

        DetectionReport {
            run_id: Uuid::new_v4(),
            analyzed_at: Utc::now(),
            processing_time_secs: 1.25,
            input_bytes: 42,
            input_sha256: "ab".repeat(32),
            model: "llama3:8b".to_string(),
            citations: Vec::new(),
            verification,
            stages: StageOutcomes {
                initial: stage.clone(),
                hallucination: stage.clone(),
                synthesis: stage,
            },
            hallucination_detected: unverified > 0,
            risk_level: if unverified > 0 { RiskLevel::Critical } else { RiskLevel::Low },
            confidence_score: 0,
            recommendation: "Do not rely on it.".to_string(),
        }
    }

    #[test]
    fn test_text_report_sections() {
        let text = report(1).to_text();
        assert!(text.contains("HALLUCINATION LIKELY DETECTED"));
        assert!(text.contains("UNVERIFIED CITATIONS: 1"));
        assert!(text.contains("     Status: Not found in database"));
        assert!(text.contains("STAGE 2: HALLUCINATION ANALYSIS"));
        assert!(text.contains("RISK LEVEL: CRITICAL"));
        assert!(text.contains("Processing Time: 1.2 seconds") || text.contains("Processing Time: 1.3 seconds"));
    }

    #[test]
    fn test_text_report_clean_document() {
        let text = report(0).to_text();
        assert!(text.contains("NO HALLUCINATIONS DETECTED"));
        assert!(text.contains("No case citations found in document."));
        assert!(text.contains("RISK LEVEL: LOW"));
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(report(1)).unwrap();
        assert_eq!(json["risk_level"], "critical");
        assert_eq!(json["hallucination_detected"], true);
        assert_eq!(json["stages"]["synthesis"]["text"], "Looks fabricated.");
        assert!(json["stages"]["initial"].get("error").is_none());
    }
}

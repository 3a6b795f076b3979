//! The three LLM analysis stages.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::assessment::{ForcedRisk, Verdict};
use super::prompts::{
    INITIAL_ASSESSMENT_PROMPT, PLAUSIBILITY_REVIEW_PROMPT, SYNTHESIS_PROMPT,
    UNVERIFIED_ANALYSIS_PROMPT,
};
use crate::citations::Citation;
use crate::llm::Inference;
use crate::verify::{CitationCheck, VerificationSummary};

/// Document bytes shown to the initial assessment.
const STAGE1_DOCUMENT_BYTES: usize = 7000;
/// Document bytes shown to the hallucination analysis.
const STAGE2_DOCUMENT_BYTES: usize = 5000;
/// Bytes of each earlier stage carried into the synthesis.
const SYNTHESIS_FINDINGS_BYTES: usize = 1200;

/// Text produced by one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageOutcome {
    fn ok(text: String) -> Self {
        Self { text, error: None }
    }

    fn failed(prefix: &str, error: String) -> Self {
        Self {
            text: format!("{}: {}", prefix, error),
            error: Some(error),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcomes of all stages of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutcomes {
    pub initial: StageOutcome,
    pub hallucination: StageOutcome,
    pub synthesis: StageOutcome,
}

/// Longest prefix of `text` within `max_bytes`, cut on a char boundary.
pub fn head(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn reason(check: &CitationCheck) -> &str {
    check.error.as_deref().unwrap_or("Not found in database")
}

fn unverified_list(summary: &VerificationSummary) -> String {
    summary
        .unverified
        .iter()
        .map(|c| format!("  - {}: {}", c.query, reason(c)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Headline of the verification results for the initial prompt.
pub fn citation_status(summary: &VerificationSummary) -> String {
    if !summary.performed {
        return "\nCitation verification was not performed; citations are unchecked.\n".to_string();
    }

    if summary.has_unverified() {
        let mut status = format!(
            "\nWARNING: {} CITATION(S) COULD NOT BE VERIFIED IN COURTLISTENER:\n",
            summary.unverified_count()
        );
        status.push_str(&unverified_list(summary));
        status.push('\n');
        if summary.verified_count() > 0 {
            status.push_str(&format!(
                "\n{} citation(s) were verified.\n",
                summary.verified_count()
            ));
        }
        status
    } else if summary.verified_count() > 0 {
        format!(
            "\nAll {} citations were verified in CourtListener.\n",
            summary.verified_count()
        )
    } else {
        "\nNo case citations were found to verify.\n".to_string()
    }
}

async fn run(inference: &dyn Inference, stage: u8, prompt: &str, failure_prefix: &str) -> StageOutcome {
    info!("Stage {}: sending {} byte prompt", stage, prompt.len());
    match inference.generate(prompt).await {
        Ok(text) => StageOutcome::ok(text),
        Err(e) => {
            warn!("Stage {} failed: {}", stage, e);
            StageOutcome::failed(failure_prefix, e.to_string())
        }
    }
}

/// Stage 1: initial assessment informed by verification.
pub async fn initial_assessment(
    inference: &dyn Inference,
    text: &str,
    summary: &VerificationSummary,
) -> StageOutcome {
    let prompt = INITIAL_ASSESSMENT_PROMPT
        .replace("{citation_status}", &citation_status(summary))
        .replace("{verification_context}", &summary.context)
        .replace("{document}", head(text, STAGE1_DOCUMENT_BYTES));
    run(inference, 1, &prompt, "Analysis failed").await
}

/// Stage 2: focused hallucination analysis.
///
/// Returns `(outcome, llm_called)`. When every checked citation was
/// verified the outcome is a fixed note and no model call is made.
pub async fn hallucination_analysis(
    inference: &dyn Inference,
    text: &str,
    citations: &[Citation],
    summary: &VerificationSummary,
) -> (StageOutcome, bool) {
    if !summary.performed {
        let listed = if citations.is_empty() {
            "  (none found)".to_string()
        } else {
            citations
                .iter()
                .map(|c| format!("  - {}", c.label()))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let prompt = PLAUSIBILITY_REVIEW_PROMPT
            .replace("{citations}", &listed)
            .replace("{document}", head(text, STAGE2_DOCUMENT_BYTES));
        return (run(inference, 2, &prompt, "Analysis failed").await, true);
    }

    if !summary.has_unverified() {
        let note = format!(
            "All {} case citations were verified against CourtListener. The cited cases exist in legal databases.",
            summary.verified_count()
        );
        return (StageOutcome::ok(note), false);
    }

    let prompt = UNVERIFIED_ANALYSIS_PROMPT
        .replace("{unverified}", &unverified_list(summary))
        .replace("{verified_count}", &summary.verified_count().to_string())
        .replace("{document}", head(text, STAGE2_DOCUMENT_BYTES));
    (run(inference, 2, &prompt, "Analysis failed").await, true)
}

/// Stage 3: synthesis ending in a machine-readable verdict.
///
/// The verdict is `None` when the model call failed.
pub async fn synthesis(
    inference: &dyn Inference,
    initial: &StageOutcome,
    hallucination: &StageOutcome,
    summary: &VerificationSummary,
) -> (StageOutcome, Option<Verdict>) {
    let forced = ForcedRisk::from_counts(summary.verified_count(), summary.unverified_count());
    let risk_reason = if summary.performed {
        forced.reason
    } else {
        "Citations were not checked against a case-law database".to_string()
    };

    let prompt = SYNTHESIS_PROMPT
        .replace("{verified_count}", &summary.verified_count().to_string())
        .replace("{unverified_count}", &summary.unverified_count().to_string())
        .replace(
            "{verification_rate}",
            &format!("{:.1}", summary.verification_rate),
        )
        .replace("{risk_reason}", &risk_reason)
        .replace("{stage1}", head(&initial.text, SYNTHESIS_FINDINGS_BYTES))
        .replace("{stage2}", head(&hallucination.text, SYNTHESIS_FINDINGS_BYTES));

    let outcome = run(inference, 3, &prompt, "Synthesis failed").await;
    let verdict = outcome.succeeded().then(|| Verdict::parse(&outcome.text));
    (outcome, verdict)
}

//! Legal hallucination detection pipeline.
//!
//! guard → extract citations → verify → three LLM stages → assessment.
//! Every step is audited; stage failures end up in the report instead of
//! aborting the run.

mod assessment;
mod prompts;
mod report;
mod stages;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::audit::{AuditError, AuditLogger, AuditOperation, AuditOutcome};
use crate::citations::extract_citations;
use crate::guard::{self, InputError, ValidatedInput, DEFAULT_MAX_INPUT_BYTES};
use crate::llm::Inference;
use crate::verify::{CitationVerifier, VerificationSummary};

pub use assessment::{
    Assessment, ForcedRisk, RiskLevel, Verdict, DEFAULT_RECOMMENDATION, INCOMPLETE_RECOMMENDATION,
};
pub use report::DetectionReport;
pub use stages::{head, StageOutcome, StageOutcomes};

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("Input rejected: {0}")]
    Input(#[from] InputError),
    #[error(transparent)]
    Audit(#[from] AuditError),
}

/// Runs analyses against an inference backend and, optionally, a
/// citation verifier.
pub struct Detector {
    inference: Arc<dyn Inference>,
    verifier: Option<CitationVerifier>,
    audit: AuditLogger,
    max_input_bytes: usize,
}

impl Detector {
    /// Detector without citation verification or an audit file.
    pub fn new(inference: Arc<dyn Inference>) -> Self {
        Self {
            inference,
            verifier: None,
            audit: AuditLogger::disabled(),
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }

    pub fn with_verifier(mut self, verifier: CitationVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_max_input_bytes(mut self, max_input_bytes: usize) -> Self {
        self.max_input_bytes = max_input_bytes;
        self
    }

    pub fn max_input_bytes(&self) -> usize {
        self.max_input_bytes
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Analyze document text.
    pub async fn analyze(&self, text: &str) -> Result<DetectionReport, DetectorError> {
        let run_id = Uuid::new_v4();
        let validated = guard::validate_text(text, self.max_input_bytes);
        let input = self.audit_validation(run_id, validated, None).await?;
        self.run(run_id, &input).await
    }

    /// Analyze raw bytes (e.g. piped stdin), sniffing for binary content.
    pub async fn analyze_bytes(&self, bytes: &[u8]) -> Result<DetectionReport, DetectorError> {
        let run_id = Uuid::new_v4();
        let validated = guard::validate_bytes(bytes, self.max_input_bytes);
        let input = self.audit_validation(run_id, validated, None).await?;
        self.run(run_id, &input).await
    }

    /// Analyze a document file.
    pub async fn analyze_file(&self, path: &Path) -> Result<DetectionReport, DetectorError> {
        let run_id = Uuid::new_v4();
        let validated = guard::read_file(path, self.max_input_bytes).await;
        let input = self
            .audit_validation(run_id, validated, Some(path))
            .await?;
        self.run(run_id, &input).await
    }

    async fn audit_validation(
        &self,
        run_id: Uuid,
        validated: Result<ValidatedInput, InputError>,
        path: Option<&Path>,
    ) -> Result<ValidatedInput, DetectorError> {
        let source = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "text".to_string());

        match validated {
            Ok(input) => {
                self.audit
                    .record(
                        run_id,
                        AuditOperation::InputValidate,
                        AuditOutcome::Success,
                        json!({
                            "source": source,
                            "bytes": input.raw_bytes(),
                            "sha256": input.sha256(),
                            "max_bytes": self.max_input_bytes,
                        }),
                    )
                    .await?;
                Ok(input)
            }
            Err(e) => {
                self.audit
                    .record(
                        run_id,
                        AuditOperation::InputValidate,
                        AuditOutcome::Rejected,
                        json!({
                            "source": source,
                            "reason": e.to_string(),
                            "max_bytes": self.max_input_bytes,
                        }),
                    )
                    .await?;
                Err(e.into())
            }
        }
    }

    async fn record_stage(
        &self,
        run_id: Uuid,
        stage: u8,
        name: &str,
        outcome: &StageOutcome,
        llm_called: bool,
    ) -> Result<(), AuditError> {
        let (result, detail) = match &outcome.error {
            None => (
                AuditOutcome::Success,
                json!({
                    "stage": stage,
                    "name": name,
                    "llm_called": llm_called,
                    "response_chars": outcome.text.chars().count(),
                }),
            ),
            Some(error) => (
                AuditOutcome::Failure,
                json!({
                    "stage": stage,
                    "name": name,
                    "llm_called": llm_called,
                    "error": error,
                }),
            ),
        };
        self.audit
            .record(run_id, AuditOperation::InferenceStage, result, detail)
            .await
    }

    async fn run(&self, run_id: Uuid, input: &ValidatedInput) -> Result<DetectionReport, DetectorError> {
        let started = Instant::now();
        let text = input.text();

        let citations = extract_citations(text);
        info!("Found {} case citations/names", citations.len());
        self.audit
            .record(
                run_id,
                AuditOperation::CitationsExtract,
                AuditOutcome::Success,
                json!({ "count": citations.len() }),
            )
            .await?;

        let verification = match &self.verifier {
            Some(verifier) => {
                info!("Verifying citations with {}", verifier.source_name());
                let summary = verifier.verify_all(&citations).await;
                let failed = summary.unverified.iter().filter(|c| c.error.is_some()).count();
                self.audit
                    .record(
                        run_id,
                        AuditOperation::CitationsVerify,
                        if failed > 0 {
                            AuditOutcome::Failure
                        } else {
                            AuditOutcome::Success
                        },
                        json!({
                            "source": summary.source,
                            "checked": summary.total_checked,
                            "verified": summary.verified_count(),
                            "unverified": summary.unverified_count(),
                            "lookup_errors": failed,
                        }),
                    )
                    .await?;
                summary
            }
            None => VerificationSummary::skipped(),
        };

        let inference = self.inference.as_ref();

        info!("Stage 1: Initial analysis");
        let initial = stages::initial_assessment(inference, text, &verification).await;
        self.record_stage(run_id, 1, "initial", &initial, true).await?;

        info!("Stage 2: Hallucination analysis");
        let (hallucination, llm_called) =
            stages::hallucination_analysis(inference, text, &citations, &verification).await;
        self.record_stage(run_id, 2, "hallucination", &hallucination, llm_called)
            .await?;

        info!("Stage 3: Final synthesis");
        let (synthesis, verdict) =
            stages::synthesis(inference, &initial, &hallucination, &verification).await;
        self.record_stage(run_id, 3, "synthesis", &synthesis, true).await?;

        let assessment = Assessment::decide(
            verification.verified_count(),
            verification.unverified_count(),
            verdict.as_ref(),
        );
        let hallucination_detected = if verification.performed {
            verification.has_unverified()
        } else {
            assessment.risk_level.is_elevated()
        };

        let processing_time_secs = started.elapsed().as_secs_f64();
        info!("Complete in {:.1}s", processing_time_secs);

        let report = DetectionReport {
            run_id,
            analyzed_at: Utc::now(),
            processing_time_secs,
            input_bytes: input.raw_bytes(),
            input_sha256: input.sha256().to_string(),
            model: self.inference.model().to_string(),
            citations,
            verification,
            stages: StageOutcomes {
                initial,
                hallucination,
                synthesis,
            },
            hallucination_detected,
            risk_level: assessment.risk_level,
            confidence_score: assessment.confidence_score,
            recommendation: assessment.recommendation,
        };

        self.audit
            .record(
                run_id,
                AuditOperation::AnalysisComplete,
                AuditOutcome::Success,
                json!({
                    "hallucination_detected": report.hallucination_detected,
                    "risk_level": report.risk_level,
                    "confidence_score": report.confidence_score,
                    "processing_time_secs": report.processing_time_secs,
                }),
            )
            .await?;

        Ok(report)
    }
}

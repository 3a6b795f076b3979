//! Append-only audit trail of security-relevant operations.
//!
//! Records go to a JSON Lines file (one object per line) and to `tracing`.
//! Records describe what happened, never the analyzed document itself.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Audit log I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode audit record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Malformed audit record on line {line}: {message}")]
    Malformed { line: usize, message: String },
}

/// Operations that produce audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOperation {
    #[serde(rename = "input.validate")]
    InputValidate,
    #[serde(rename = "citations.extract")]
    CitationsExtract,
    #[serde(rename = "citations.verify")]
    CitationsVerify,
    #[serde(rename = "inference.stage")]
    InferenceStage,
    #[serde(rename = "analysis.complete")]
    AnalysisComplete,
}

impl AuditOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOperation::InputValidate => "input.validate",
            AuditOperation::CitationsExtract => "citations.extract",
            AuditOperation::CitationsVerify => "citations.verify",
            AuditOperation::InferenceStage => "inference.stage",
            AuditOperation::AnalysisComplete => "analysis.complete",
        }
    }
}

impl fmt::Display for AuditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Success,
    Failure,
    /// Refused by a guard (oversized input, throttled request).
    Rejected,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Success => "success",
            AuditOutcome::Failure => "failure",
            AuditOutcome::Rejected => "rejected",
        }
    }
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub run_id: Uuid,
    pub operation: AuditOperation,
    pub outcome: AuditOutcome,
    /// Operation-specific metadata (sizes, counts, hashes, error messages).
    #[serde(default)]
    pub detail: Value,
}

impl AuditRecord {
    pub fn new(run_id: Uuid, operation: AuditOperation, outcome: AuditOutcome, detail: Value) -> Self {
        Self {
            timestamp: Utc::now(),
            run_id,
            operation,
            outcome,
            detail,
        }
    }
}

/// Audit sink. Cloning shares the underlying file.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    path: Option<PathBuf>,
    file: Option<Arc<Mutex<tokio::fs::File>>>,
}

impl AuditLogger {
    /// Open (or create) a log file for appending.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path: Some(path),
            file: Some(Arc::new(Mutex::new(file))),
        })
    }

    /// Logger that only emits tracing events.
    pub fn disabled() -> Self {
        Self {
            path: None,
            file: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record one operation.
    pub async fn record(
        &self,
        run_id: Uuid,
        operation: AuditOperation,
        outcome: AuditOutcome,
        detail: Value,
    ) -> Result<(), AuditError> {
        let record = AuditRecord::new(run_id, operation, outcome, detail);
        self.write(&record).await
    }

    pub async fn write(&self, record: &AuditRecord) -> Result<(), AuditError> {
        match record.outcome {
            AuditOutcome::Success => info!(
                target: "legalcheck::audit",
                run_id = %record.run_id,
                operation = %record.operation,
                outcome = %record.outcome,
                detail = %record.detail,
                "audit"
            ),
            AuditOutcome::Failure | AuditOutcome::Rejected => warn!(
                target: "legalcheck::audit",
                run_id = %record.run_id,
                operation = %record.operation,
                outcome = %record.outcome,
                detail = %record.detail,
                "audit"
            ),
        }

        let Some(file) = &self.file else {
            return Ok(());
        };

        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut file = file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    /// Parse every record in a log file.
    pub async fn read_all(path: impl AsRef<Path>) -> Result<Vec<AuditRecord>, AuditError> {
        let content = tokio::fs::read_to_string(path).await?;
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| AuditError::Malformed {
                    line: i + 1,
                    message: e.to_string(),
                })
            })
            .collect()
    }
}

//! Shared helpers for CLI commands.

use std::io::IsTerminal;
use std::path::Path;

use anyhow::Context;
use console::style;
use tokio::io::AsyncReadExt;

use legalcheck::audit::AuditLogger;
use legalcheck::config::Settings;
use legalcheck::verify::CitationVerifier;

/// Read a document from stdin, prompting when stdin is a terminal.
///
/// Reads at most one byte past `max_bytes` so oversized input is detected
/// without buffering all of it.
pub async fn read_stdin(max_bytes: usize) -> anyhow::Result<Vec<u8>> {
    if std::io::stdin().is_terminal() {
        eprintln!("{}", style("Legal Hallucination Detector").bold());
        eprintln!("Paste document text, then press Ctrl+D (Unix) or Ctrl+Z (Windows):");
        eprintln!("{}", "-".repeat(60));
    }

    let mut buf = Vec::new();
    tokio::io::stdin()
        .take(max_bytes as u64 + 1)
        .read_to_end(&mut buf)
        .await
        .context("Failed to read stdin")?;
    Ok(buf)
}

/// Open the audit log named in settings, or a tracing-only logger.
pub async fn open_audit(settings: &Settings) -> anyhow::Result<AuditLogger> {
    match settings.audit_log {
        Some(ref path) => AuditLogger::open(path)
            .await
            .with_context(|| format!("Failed to open audit log {}", path.display())),
        None => Ok(AuditLogger::disabled()),
    }
}

/// Build the CourtListener verifier from settings.
pub fn build_verifier(settings: &Settings, no_cache: bool) -> anyhow::Result<CitationVerifier> {
    let config = settings.verifier_config();
    if !config.has_token() {
        tracing::warn!(
            "No COURTLISTENER_TOKEN set; anonymous requests are heavily rate limited"
        );
    }

    let verifier =
        CitationVerifier::from_config(&config).context("Failed to create CourtListener client")?;
    Ok(if no_cache {
        verifier.without_cache()
    } else {
        verifier
    })
}

/// Write output to a file, or stdout when no path is given.
pub async fn write_output(output: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            tokio::fs::write(path, content)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} Report written to {}",
                style("✓").green(),
                path.display()
            );
        }
        None => println!("{}", content),
    }
    Ok(())
}

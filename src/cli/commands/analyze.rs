//! Document analysis command.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use console::style;

use crate::cli::helpers::{build_verifier, open_audit, read_stdin, write_output};
use crate::cli::progress::spinner;
use crate::cli::OutputFormat;
use legalcheck::config::Settings;
use legalcheck::detector::Detector;
use legalcheck::llm::LlmClient;

/// Analyze a document and print the detection report.
pub async fn cmd_analyze(
    settings: &Settings,
    file: Option<&Path>,
    format: OutputFormat,
    no_verify: bool,
    no_cache: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let client = LlmClient::new(settings.llm.clone()).context("Failed to create inference client")?;
    if !client.is_available().await {
        eprintln!(
            "{} {}",
            style("!").yellow(),
            settings.llm.availability_hint()
        );
    }

    let mut detector = Detector::new(Arc::new(client))
        .with_max_input_bytes(settings.max_input_bytes)
        .with_audit(open_audit(settings).await?);

    if no_verify || !settings.courtlistener.enabled {
        tracing::info!("Citation verification disabled");
    } else {
        detector = detector.with_verifier(build_verifier(settings, no_cache)?);
    }

    let report = match file {
        Some(path) => {
            let pb = spinner(&format!("Analyzing {}...", path.display()));
            let result = detector.analyze_file(path).await;
            pb.finish_and_clear();
            result
        }
        None => {
            let bytes = read_stdin(settings.max_input_bytes).await?;
            let pb = spinner("Analyzing document...");
            let result = detector.analyze_bytes(&bytes).await;
            pb.finish_and_clear();
            result
        }
    }
    .context("Analysis failed")?;

    let rendered = match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        }
        OutputFormat::Text => report.to_text(),
    };
    write_output(output, &rendered).await?;

    if report.hallucination_detected {
        eprintln!(
            "{} Hallucination likely detected (risk: {}, confidence: {}%)",
            style("✗").red(),
            report.risk_level,
            report.confidence_score
        );
    } else {
        eprintln!(
            "{} No hallucinations detected (risk: {}, confidence: {}%)",
            style("✓").green(),
            report.risk_level,
            report.confidence_score
        );
    }

    Ok(())
}

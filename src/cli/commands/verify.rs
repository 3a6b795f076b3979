//! Direct citation verification (RAG mode).

use anyhow::Context;
use console::style;
use serde_json::json;
use uuid::Uuid;

use crate::cli::helpers::{build_verifier, open_audit};
use crate::cli::progress::spinner;
use crate::cli::OutputFormat;
use legalcheck::audit::{AuditOperation, AuditOutcome};
use legalcheck::citations::parse_citation_query;
use legalcheck::config::Settings;
use legalcheck::sanitize::sanitize_input;
use legalcheck::verify::VerificationSummary;

/// Verify citations or case names given on the command line.
pub async fn cmd_verify(
    settings: &Settings,
    queries: &[String],
    format: OutputFormat,
    no_cache: bool,
) -> anyhow::Result<()> {
    let verifier = build_verifier(settings, no_cache)?;
    let audit = open_audit(settings).await?;
    let run_id = Uuid::new_v4();

    let mut checks = Vec::with_capacity(queries.len());
    for query in queries {
        let citation = parse_citation_query(&sanitize_input(query));
        let pb = spinner(&format!("Verifying {}...", citation.content));
        let check = verifier.verify(&citation).await;
        pb.finish_and_clear();
        checks.push(check);
    }

    let summary = VerificationSummary::from_checks(verifier.source_name(), checks);
    let lookup_errors = summary.unverified.iter().filter(|c| c.error.is_some()).count();
    audit
        .record(
            run_id,
            AuditOperation::CitationsVerify,
            if lookup_errors > 0 {
                AuditOutcome::Failure
            } else {
                AuditOutcome::Success
            },
            json!({
                "source": summary.source,
                "checked": summary.total_checked,
                "verified": summary.verified_count(),
                "unverified": summary.unverified_count(),
                "lookup_errors": lookup_errors,
            }),
        )
        .await?;

    match format {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&summary).context("Failed to serialize results")?;
            println!("{}", json);
        }
        OutputFormat::Text => print_summary(&summary),
    }

    Ok(())
}

fn print_summary(summary: &VerificationSummary) {
    println!("\n{}", style(format!("Citation Verification ({})", summary.source)).bold());
    println!("{}", "-".repeat(40));

    for check in summary.verified.iter() {
        println!("{} {}", style("✓").green(), check.query);
        println!(
            "  {:<12} {}",
            "Case:",
            check.case_name.as_deref().unwrap_or("N/A")
        );
        println!("  {:<12} {}", "Court:", check.court.as_deref().unwrap_or("N/A"));
        println!(
            "  {:<12} {}",
            "Date:",
            check.date_filed.as_deref().unwrap_or("N/A")
        );
        if !check.official_citation.is_empty() {
            println!("  {:<12} {}", "Citations:", check.official_citation.join("; "));
        }
        println!(
            "  {:<12} {}% via {}{}",
            "Confidence:",
            check.confidence,
            check.search_method.map(|m| m.as_str()).unwrap_or("unknown"),
            if check.cached {
                style(" (cached)").dim().to_string()
            } else {
                String::new()
            }
        );
    }

    for check in summary.unverified.iter() {
        println!("{} {}", style("✗").red(), check.query);
        println!(
            "  {:<12} {}",
            "Status:",
            check.error.as_deref().unwrap_or("Not found in database")
        );
    }

    println!("{}", "-".repeat(40));
    println!(
        "{:<20} {}/{} ({:.1}%)",
        "Verified:",
        summary.verified_count(),
        summary.total_checked,
        summary.verification_rate
    );
}

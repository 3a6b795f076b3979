//! Citation extraction command.

use std::path::Path;

use anyhow::Context;

use crate::cli::helpers::read_stdin;
use legalcheck::citations::extract_citations;
use legalcheck::config::Settings;
use legalcheck::guard;

/// Print the citations found in a document as JSON.
pub async fn cmd_extract(settings: &Settings, file: Option<&Path>) -> anyhow::Result<()> {
    let input = match file {
        Some(path) => guard::read_file(path, settings.max_input_bytes)
            .await
            .with_context(|| format!("Input rejected: {}", path.display()))?,
        None => {
            let bytes = read_stdin(settings.max_input_bytes).await?;
            guard::validate_bytes(&bytes, settings.max_input_bytes).context("Input rejected")?
        }
    };

    let citations = extract_citations(input.text());
    tracing::info!("Found {} citations", citations.len());

    let json = serde_json::to_string_pretty(&citations).context("Failed to serialize citations")?;
    println!("{}", json);
    Ok(())
}

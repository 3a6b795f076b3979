//! Command-line interface.
//!
//! Parses arguments with clap, resolves settings and dispatches to the
//! command modules.

mod commands;
mod helpers;
mod progress;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use legalcheck::config::load_settings;

#[derive(Parser)]
#[command(name = "legalcheck")]
#[command(about = "Detect hallucinated legal citations with a local LLM and CourtListener")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Append audit records to this JSON Lines file
    #[arg(long, global = true, env = "LEGALCHECK_AUDIT_LOG")]
    audit_log: Option<PathBuf>,

    /// Model to use (overrides config)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Inference endpoint (overrides config)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Machine-readable JSON
    #[default]
    Json,
    /// Human-readable report
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a document for hallucinated citations
    Analyze {
        /// Document to analyze (reads stdin if omitted)
        file: Option<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Skip CourtListener verification
        #[arg(long)]
        no_verify: bool,
        /// Do not read or write the verification cache
        #[arg(long)]
        no_cache: bool,
        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify citations or case names directly against CourtListener
    Verify {
        /// Citations (e.g. "347 U.S. 483") or case names (e.g. "Roe v. Wade")
        #[arg(required = true)]
        citations: Vec<String>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Do not read or write the verification cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Print the citations found in a document as JSON
    Extract {
        /// Document to scan (reads stdin if omitted)
        file: Option<PathBuf>,
    },

    /// Show inference configuration and available models
    Models,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut settings, _config) = load_settings(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;

    if let Some(ref model) = cli.model {
        settings.llm = settings.llm.with_model(model);
    }
    if let Some(ref endpoint) = cli.endpoint {
        settings.llm = settings.llm.with_endpoint(endpoint);
    }
    if let Some(path) = cli.audit_log {
        settings.audit_log = Some(path);
    }

    match cli.command {
        Commands::Analyze {
            file,
            format,
            no_verify,
            no_cache,
            output,
        } => {
            commands::cmd_analyze(
                &settings,
                file.as_deref(),
                format,
                no_verify,
                no_cache,
                output.as_deref(),
            )
            .await
        }
        Commands::Verify {
            citations,
            format,
            no_cache,
        } => commands::cmd_verify(&settings, &citations, format, no_cache).await,
        Commands::Extract { file } => commands::cmd_extract(&settings, file.as_deref()).await,
        Commands::Models => commands::cmd_models(&settings).await,
    }
}

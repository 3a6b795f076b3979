//! Inference runtime inspection.

use console::style;

use legalcheck::config::Settings;
use legalcheck::llm::LlmClient;

/// Show the inference configuration and the models the runtime reports.
pub async fn cmd_models(settings: &Settings) -> anyhow::Result<()> {
    let llm = &settings.llm;
    let client = LlmClient::new(llm.clone())?;

    println!("\n{}", style("Inference Configuration").bold());
    println!("{}", "-".repeat(40));
    println!("{:<20} {}", "Endpoint:", llm.endpoint);
    println!("{:<20} {}", "Current Model:", llm.model);
    println!("{:<20} {}", "Max Tokens:", llm.max_tokens);
    println!("{:<20} {:.2}", "Temperature:", llm.temperature);
    println!("{:<20} {}s", "Timeout:", llm.timeout_seconds);
    println!("{:<20} {}/min", "Rate Limit:", llm.max_requests_per_minute);
    println!("{:<20} {} bytes", "Max Input:", settings.max_input_bytes);
    println!(
        "{:<20} {}",
        "CourtListener:",
        if !settings.courtlistener.enabled {
            "Disabled"
        } else if settings.courtlistener.has_token() {
            "Enabled (token set)"
        } else {
            "Enabled (anonymous)"
        }
    );

    if !client.is_available().await {
        println!("\n{} {}", style("!").yellow(), llm.availability_hint());
        return Ok(());
    }

    println!("\n{}", style("Available Models").bold());
    println!("{}", "-".repeat(40));

    match client.list_models().await {
        Ok(models) => {
            if models.is_empty() {
                println!("  No models available");
            } else {
                for model in models {
                    let marker = if model == llm.model {
                        style("*").green().to_string()
                    } else {
                        " ".to_string()
                    };
                    println!("{} {}", marker, model);
                }
            }
        }
        Err(e) => {
            println!("{} Failed to list models: {}", style("✗").red(), e);
        }
    }

    Ok(())
}

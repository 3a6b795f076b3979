//! LLM integration for hallucination analysis.
//!
//! Uses a local LLM (via Ollama) behind the `Inference` trait.

mod client;
mod config;

pub use client::{Inference, LlmClient, LlmError, AVAILABILITY_TIMEOUT};
pub use config::{LlmConfig, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECONDS};

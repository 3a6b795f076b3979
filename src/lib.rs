//! legalcheck - legal hallucination detection.
//!
//! Checks documents produced by language models for fabricated case law:
//! citations are extracted, verified against CourtListener, and reviewed by
//! a local LLM in three stages behind input, rate and output guards.

pub mod audit;
pub mod citations;
pub mod config;
pub mod detector;
pub mod guard;
pub mod llm;
pub mod rate_limit;
pub mod sanitize;
pub mod verify;

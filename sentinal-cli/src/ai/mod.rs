//! Report generation boundary
//!
//! The deterministic pipeline hands its results to a [`ReportGenerator`]
//! and gets free text back. The LLM-backed generator talks to Anthropic or
//! an OpenAI-compatible endpoint with a sync HTTP client; keys come from
//! environment variables (BYOK).
//!
//! # Environment Variables
//!
//! - `ANTHROPIC_API_KEY`: Anthropic backend
//! - `OPENAI_API_KEY`: OpenAI backend
//! - `DEEPINFRA_API_KEY`, `OPENROUTER_API_KEY`: other OpenAI-compatible backends
//! - Ollama runs locally and needs no key
//!
//! When no generator is configured, or the generator fails, the pipeline
//! uses [`fallback_memo`] instead.

mod client;
mod memo;
mod prompts;

pub use client::{AiClient, AiConfig, Completion, LlmBackend, Pricing, TokenUsage};
pub use memo::{fallback_memo, GeneratedReport, LlmReportGenerator, ReportGenerator, ReportRequest};
pub use prompts::{MemoPromptBuilder, MEMO_SYSTEM_PROMPT};

use thiserror::Error;

/// Errors that can occur while generating a report
#[derive(Error, Debug)]
pub enum AiError {
    #[error("Missing API key: {env_var} not set")]
    MissingApiKey { env_var: String },

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

pub type AiResult<T> = Result<T, AiError>;

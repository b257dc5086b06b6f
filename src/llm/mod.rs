//! LLM integration for Triage Assist.
//!
//! Talks to any OpenAI-compatible chat completion endpoint (OpenRouter, Groq,
//! OpenAI, local vLLM/Ollama) through `OpenAiCompatProvider`, which implements
//! our `LlmProvider` trait.

pub mod client;
pub mod openai_compat;
pub mod provider;
pub mod reasoning;

pub use client::{CompletionClient, ERROR_PREFIX, is_error_completion};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::*;
pub use reasoning::{Reasoning, ReasoningContext, RespondOutput, RespondResult, TokenUsage};

use std::sync::Arc;

use crate::error::LlmError;

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Label used in logs and errors.
    pub provider_name: String,
    pub base_url: String,
    pub api_key: secrecy::SecretString,
    pub model: String,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let provider = OpenAiCompatProvider::new(
        config.provider_name.clone(),
        config.base_url.clone(),
        config.api_key.clone(),
        config.model.clone(),
    )?;
    tracing::info!(
        "Using {} at {} (model: {})",
        config.provider_name,
        provider.base_url(),
        config.model
    );
    Ok(Arc::new(provider))
}

//! LLM integration for the synthesizer stages.
//!
//! Every supported backend speaks the OpenAI Chat Completions protocol:
//! - **Groq** (default): hosted Llama models
//! - **OpenAI**: direct API access with your own key
//! - **Ollama**: local model inference
//! - **OpenAI-compatible**: any other endpoint that speaks the OpenAI API

mod costs;
mod generator;
mod openai_compatible;
mod provider;

pub use generator::{DEFAULT_SYSTEM_PROMPT, GenerationSettings, LlmGenerator, TextGenerator};
pub use openai_compatible::OpenAiCompatibleProvider;
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
};

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::LlmError;

/// Create an LLM provider based on configuration.
pub fn create_llm_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let endpoint = config.endpoint.clone();
    tracing::info!(
        "Using {} backend (base_url: {}, model: {})",
        config.backend,
        endpoint.base_url,
        endpoint.model
    );
    Ok(Arc::new(OpenAiCompatibleProvider::new(endpoint)?))
}

/// Create the text generator the pipeline calls, with the configured
/// sampling settings and per-call timeout.
pub fn create_text_generator(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>, LlmError> {
    let provider = create_llm_provider(config)?;
    Ok(Arc::new(LlmGenerator::new(provider, config.generation.clone())))
}

//! The `TextGenerator` capability used by the synthesizer stages.
//!
//! A generator turns one prompt into one string. It may fail at any time
//! and its output is untrusted; callers pass the text through
//! [`crate::extract`] before using it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};

/// Default system message sent ahead of every prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a precise enterprise AI assistant.";

/// Produces free-form text from a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Sampling and timeout settings for [`LlmGenerator`].
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.2,
            max_tokens: None,
            timeout: Duration::from_secs(60),
        }
    }
}

/// A [`TextGenerator`] backed by a chat-completion provider.
pub struct LlmGenerator {
    provider: Arc<dyn LlmProvider>,
    settings: GenerationSettings,
}

impl LlmGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    fn request(&self, prompt: &str) -> CompletionRequest {
        let mut request = CompletionRequest::new(vec![
            ChatMessage::system(self.settings.system_prompt.clone()),
            ChatMessage::user(prompt),
        ])
        .with_temperature(self.settings.temperature);
        if let Some(max) = self.settings.max_tokens {
            request = request.with_max_tokens(max);
        }
        request
    }
}

#[async_trait]
impl TextGenerator for LlmGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request = self.request(prompt);
        let timeout = self.settings.timeout;

        let response = tokio::time::timeout(timeout, self.provider.complete(request))
            .await
            .map_err(|_| LlmError::Timeout {
                provider: self.provider.model_name().to_string(),
                timeout,
            })??;

        tracing::debug!(
            "Completion from {}: {} in / {} out tokens, est. cost ${}, finish {:?}",
            self.provider.model_name(),
            response.input_tokens,
            response.output_tokens,
            self.provider
                .calculate_cost(response.input_tokens, response.output_tokens),
            response.finish_reason
        );

        Ok(response.content)
    }
}

//! Error types for the loyalty intelligence pipeline.

use std::time::Duration;

use crate::pipeline::Stage;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// Text-generation backend errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },
}

/// Failures of a pipeline run.
///
/// Every variant aborts the run; no stage substitutes a default value.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Text generator unavailable during {stage} stage: {reason}")]
    GeneratorUnavailable { stage: Stage, reason: String },

    #[error("Malformed generator output: {reason}")]
    MalformedOutput { reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Run cancelled at {stage} stage")]
    Cancelled { stage: Stage },
}

impl PipelineError {
    /// Wrap a backend failure as `GeneratorUnavailable` for the given stage.
    pub fn unavailable(stage: Stage, err: LlmError) -> Self {
        Self::GeneratorUnavailable {
            stage,
            reason: err.to_string(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedOutput {
            reason: reason.into(),
        }
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;

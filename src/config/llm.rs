use std::time::Duration;

use secrecy::SecretString;

use crate::config::{optional_env, parse_optional_env};
use crate::error::ConfigError;
use crate::llm::{DEFAULT_SYSTEM_PROMPT, GenerationSettings};

/// Which LLM backend to use.
///
/// Defaults to `Groq`. Override with the `LLM_BACKEND` env var.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmBackend {
    /// Groq hosted inference (default)
    #[default]
    Groq,
    /// Direct OpenAI API
    OpenAi,
    /// Local Ollama instance
    Ollama,
    /// Any OpenAI-compatible endpoint (e.g. vLLM, LiteLLM, Together)
    OpenAiCompatible,
}

impl std::str::FromStr for LlmBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            "openai_compatible" | "openai-compatible" | "compatible" => Ok(Self::OpenAiCompatible),
            _ => Err(format!(
                "invalid LLM backend '{}', expected one of: groq, openai, ollama, openai_compatible",
                s
            )),
        }
    }
}

impl std::fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Groq => write!(f, "groq"),
            Self::OpenAi => write!(f, "openai"),
            Self::Ollama => write!(f, "ollama"),
            Self::OpenAiCompatible => write!(f, "openai_compatible"),
        }
    }
}

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    /// Provider label used in logs and errors.
    pub provider: String,
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub model: String,
}

/// LLM configuration: where to send prompts and how to sample.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub endpoint: OpenAiCompatibleConfig,
    pub generation: GenerationSettings,
}

impl LlmConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let backend: LlmBackend = match optional_env("LLM_BACKEND")? {
            Some(b) => b.parse().map_err(|e| ConfigError::InvalidValue {
                key: "LLM_BACKEND".to_string(),
                message: e,
            })?,
            None => LlmBackend::default(),
        };

        let endpoint = match backend {
            LlmBackend::Groq => OpenAiCompatibleConfig {
                provider: backend.to_string(),
                base_url: optional_env("GROQ_BASE_URL")?
                    .unwrap_or_else(|| "https://api.groq.com/openai/v1".to_string()),
                api_key: Some(required_secret("GROQ_API_KEY", backend)?),
                model: optional_env("GROQ_MODEL")?
                    .unwrap_or_else(|| "llama-3.3-70b-versatile".to_string()),
            },
            LlmBackend::OpenAi => OpenAiCompatibleConfig {
                provider: backend.to_string(),
                base_url: optional_env("OPENAI_BASE_URL")?
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                api_key: Some(required_secret("OPENAI_API_KEY", backend)?),
                model: optional_env("OPENAI_MODEL")?.unwrap_or_else(|| "gpt-4o-mini".to_string()),
            },
            LlmBackend::Ollama => OpenAiCompatibleConfig {
                provider: backend.to_string(),
                base_url: optional_env("OLLAMA_BASE_URL")?
                    .unwrap_or_else(|| "http://localhost:11434".to_string()),
                api_key: None,
                model: optional_env("OLLAMA_MODEL")?.unwrap_or_else(|| "llama3.1".to_string()),
            },
            LlmBackend::OpenAiCompatible => OpenAiCompatibleConfig {
                provider: backend.to_string(),
                base_url: optional_env("LLM_BASE_URL")?.ok_or_else(|| {
                    ConfigError::MissingRequired {
                        key: "LLM_BASE_URL".to_string(),
                        hint: "Set LLM_BASE_URL when LLM_BACKEND=openai_compatible".to_string(),
                    }
                })?,
                api_key: optional_env("LLM_API_KEY")?.map(SecretString::from),
                model: optional_env("LLM_MODEL")?.ok_or_else(|| ConfigError::MissingRequired {
                    key: "LLM_MODEL".to_string(),
                    hint: "Set LLM_MODEL when LLM_BACKEND=openai_compatible".to_string(),
                })?,
            },
        };

        let temperature: f32 = parse_optional_env("LLM_TEMPERATURE", 0.2)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue {
                key: "LLM_TEMPERATURE".to_string(),
                message: "must be between 0.0 and 2.0".to_string(),
            });
        }

        let max_tokens = optional_env("LLM_MAX_TOKENS")?
            .map(|s| s.parse::<u32>())
            .transpose()
            .map_err(|e| ConfigError::InvalidValue {
                key: "LLM_MAX_TOKENS".to_string(),
                message: format!("must be a positive integer: {e}"),
            })?;

        let timeout_secs: u64 = parse_optional_env("LLM_TIMEOUT_SECS", 60)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "LLM_TIMEOUT_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        let generation = GenerationSettings {
            system_prompt: optional_env("LLM_SYSTEM_PROMPT")?
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            temperature,
            max_tokens,
            timeout: Duration::from_secs(timeout_secs),
        };

        Ok(Self {
            backend,
            endpoint,
            generation,
        })
    }
}

fn required_secret(key: &str, backend: LlmBackend) -> Result<SecretString, ConfigError> {
    optional_env(key)?
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingRequired {
            key: key.to_string(),
            hint: format!("Set {} when LLM_BACKEND={}", key, backend),
        })
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;
    use crate::config::ENV_LOCK;

    const VARS: &[&str] = &[
        "LLM_BACKEND",
        "GROQ_API_KEY",
        "GROQ_MODEL",
        "GROQ_BASE_URL",
        "LLM_BASE_URL",
        "LLM_MODEL",
        "LLM_API_KEY",
        "LLM_TEMPERATURE",
        "LLM_MAX_TOKENS",
        "LLM_TIMEOUT_SECS",
        "LLM_SYSTEM_PROMPT",
        "OLLAMA_BASE_URL",
        "OLLAMA_MODEL",
    ];

    fn clear_env() {
        for key in VARS {
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    fn backend_parses_aliases() {
        assert_eq!("GROQ".parse::<LlmBackend>().unwrap(), LlmBackend::Groq);
        assert_eq!(
            "openai-compatible".parse::<LlmBackend>().unwrap(),
            LlmBackend::OpenAiCompatible
        );
        assert!("nope".parse::<LlmBackend>().is_err());
    }

    #[test]
    fn groq_is_default_and_requires_key() {
        let _lock = ENV_LOCK.lock();
        clear_env();
        let err = LlmConfig::resolve().unwrap_err();
        match err {
            ConfigError::MissingRequired { key, .. } => assert_eq!(key, "GROQ_API_KEY"),
            other => panic!("expected MissingRequired, got {other:?}"),
        }
    }

    #[test]
    fn groq_defaults_are_applied() {
        let _lock = ENV_LOCK.lock();
        clear_env();
        unsafe { std::env::set_var("GROQ_API_KEY", "gsk-test") };

        let config = LlmConfig::resolve().unwrap();
        assert_eq!(config.backend, LlmBackend::Groq);
        assert_eq!(config.endpoint.model, "llama-3.3-70b-versatile");
        assert_eq!(
            config.endpoint.api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("gsk-test".to_string())
        );
        assert_eq!(config.generation.temperature, 0.2);
        assert_eq!(config.generation.timeout, Duration::from_secs(60));
        assert_eq!(config.generation.system_prompt, DEFAULT_SYSTEM_PROMPT);

        clear_env();
    }

    #[test]
    fn ollama_needs_no_key() {
        let _lock = ENV_LOCK.lock();
        clear_env();
        unsafe { std::env::set_var("LLM_BACKEND", "ollama") };

        let config = LlmConfig::resolve().unwrap();
        assert!(config.endpoint.api_key.is_none());
        assert_eq!(config.endpoint.base_url, "http://localhost:11434");

        clear_env();
    }

    #[test]
    fn compatible_backend_requires_base_url() {
        let _lock = ENV_LOCK.lock();
        clear_env();
        unsafe { std::env::set_var("LLM_BACKEND", "openai_compatible") };
        unsafe { std::env::set_var("LLM_MODEL", "m") };

        let err = LlmConfig::resolve().unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { ref key, .. } if key == "LLM_BASE_URL"));

        clear_env();
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let _lock = ENV_LOCK.lock();
        clear_env();
        unsafe { std::env::set_var("LLM_BACKEND", "ollama") };
        unsafe { std::env::set_var("LLM_TIMEOUT_SECS", "0") };

        let err = LlmConfig::resolve().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        clear_env();
    }

    #[test]
    fn invalid_max_tokens_is_rejected() {
        let _lock = ENV_LOCK.lock();
        clear_env();
        unsafe { std::env::set_var("LLM_BACKEND", "ollama") };
        unsafe { std::env::set_var("LLM_MAX_TOKENS", "lots") };

        let err = LlmConfig::resolve().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "LLM_MAX_TOKENS"));

        clear_env();
    }
}

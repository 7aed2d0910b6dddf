//! Chat completion for the turf advisor
//!
//! Features:
//! - OpenAI-compatible backend with retry/backoff and SSE streaming
//! - System prompts per topic and product need
//! - Message assembly with bounded conversation history
//! - Model selection and the two-attempt generation orchestrator

pub mod backend;
pub mod generation;
pub mod prompt;

pub use backend::{OpenAiChat, OpenAiChatConfig};
pub use generation::{
    Generation, Generator, IntentHints, ModelChoice, ModelSelector, ModelTier, APOLOGY_ANSWER,
    EMPTY_ANSWER,
};
pub use prompt::{estimate_tokens, system_prompt, user_prompt, PromptBuilder};

use thiserror::Error;
use turf_advisor_core::{DegradeKind, Degraded};

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Transport failures worth another try inside one attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Network(_) | LlmError::Timeout | LlmError::RateLimited(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for Degraded {
    fn from(err: LlmError) -> Self {
        let kind = match &err {
            LlmError::Timeout => DegradeKind::Timeout,
            LlmError::RateLimited(_) => DegradeKind::RateLimited,
            LlmError::InvalidResponse(_) => DegradeKind::Malformed,
            _ => DegradeKind::Unavailable,
        };
        Degraded::new("llm", kind, err.to_string())
    }
}

impl From<LlmError> for turf_advisor_core::Error {
    fn from(err: LlmError) -> Self {
        turf_advisor_core::Error::Llm(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_mapping() {
        let d: Degraded = LlmError::Timeout.into();
        assert_eq!(d.kind, DegradeKind::Timeout);
        let d: Degraded = LlmError::InvalidResponse("no choices".into()).into();
        assert_eq!(d.kind, DegradeKind::Malformed);
        let d: Degraded = LlmError::RateLimited("429".into()).into();
        assert_eq!(d.kind, DegradeKind::RateLimited);
        assert_eq!(d.stage, "llm");
    }

    #[test]
    fn test_retryable() {
        assert!(LlmError::Network("reset".into()).is_retryable());
        assert!(!LlmError::Api("400 bad request".into()).is_retryable());
    }
}

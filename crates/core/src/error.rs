//! Error types shared across the advisor crates
//!
//! Two families live here:
//! - [`Error`]: ordinary failures (bad input, configuration, serialization)
//! - [`Degraded`]: a handled "upstream unavailable" value returned at every
//!   network boundary (vector index, embeddings, chat completion, persistence)

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error(transparent)]
    Degraded(#[from] Degraded),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a network-bound stage could not deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradeKind {
    Timeout,
    Unavailable,
    /// Upstream answered but the payload could not be used
    Malformed,
    RateLimited,
    Budget,
}

impl DegradeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegradeKind::Timeout => "timeout",
            DegradeKind::Unavailable => "unavailable",
            DegradeKind::Malformed => "malformed",
            DegradeKind::RateLimited => "rate_limited",
            DegradeKind::Budget => "budget",
        }
    }
}

/// A stage that failed softly.
///
/// Callers are expected to recover locally (empty list, default verdict,
/// fallback answer); `Degraded` never reaches the user.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{stage} degraded ({}): {detail}", kind.as_str())]
pub struct Degraded {
    pub stage: &'static str,
    pub kind: DegradeKind,
    pub detail: String,
}

impl Degraded {
    pub fn new(stage: &'static str, kind: DegradeKind, detail: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            detail: detail.into(),
        }
    }

    pub fn timeout(stage: &'static str, detail: impl Into<String>) -> Self {
        Self::new(stage, DegradeKind::Timeout, detail)
    }

    pub fn unavailable(stage: &'static str, detail: impl Into<String>) -> Self {
        Self::new(stage, DegradeKind::Unavailable, detail)
    }

    pub fn malformed(stage: &'static str, detail: impl Into<String>) -> Self {
        Self::new(stage, DegradeKind::Malformed, detail)
    }

    pub fn rate_limited(stage: &'static str, detail: impl Into<String>) -> Self {
        Self::new(stage, DegradeKind::RateLimited, detail)
    }

    /// Re-tag with the stage that observed the failure
    pub fn at(mut self, stage: &'static str) -> Self {
        self.stage = stage;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_display() {
        let d = Degraded::timeout("embedding", "deadline elapsed after 5s");
        assert_eq!(
            d.to_string(),
            "embedding degraded (timeout): deadline elapsed after 5s"
        );
    }

    #[test]
    fn test_degraded_restage() {
        let d = Degraded::unavailable("http", "connection refused").at("vector_index");
        assert_eq!(d.stage, "vector_index");
        assert_eq!(d.kind, DegradeKind::Unavailable);
    }

    #[test]
    fn test_degraded_into_error() {
        let err: Error = Degraded::malformed("grounding", "not json").into();
        assert!(matches!(err, Error::Degraded(_)));
    }
}

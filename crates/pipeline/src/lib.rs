//! The turf advisor `ask` pipeline
//!
//! This crate wires the stage crates into one request flow:
//! - Answer cache and per-session history
//! - Classifier, feasibility and daily-budget gates
//! - Retrieval, scoring, reranking and context assembly
//! - Model selection, generation and verification
//! - Curated fallback answers when a fresh one cannot be produced
//! - Conversation, feedback and audit logging through a `ConversationSink`

pub mod advisor;
pub mod budget;
pub mod golden;
pub mod session;
pub mod stats;

pub use advisor::{
    AdvisorOptions, AdvisorParts, AskOutcome, AskRequest, Backends, FeedbackRequest, TurfAdvisor,
    RATE_LIMITED_ANSWER,
};
pub use budget::{BudgetStatus, DailyBudget, BUDGET_EXCEEDED_ANSWER};
pub use golden::{GoldenAnswer, GoldenAnswers, GOLDEN_SCORE};
pub use session::{history_messages, SessionStore};

use thiserror::Error;
use turf_advisor_query::QueryError;

/// Pipeline errors
///
/// Upstream outages never surface here; they degrade inside the pipeline.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Invalid feedback: {0}")]
    InvalidFeedback(String),

    #[error("Golden answers: {0}")]
    Golden(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<PipelineError> for turf_advisor_core::Error {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Query(e) => e.into(),
            PipelineError::InvalidFeedback(msg) => turf_advisor_core::Error::InvalidInput(msg),
            PipelineError::Golden(msg) => turf_advisor_core::Error::Config(msg),
        }
    }
}

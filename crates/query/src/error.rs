//! Query understanding errors

use thiserror::Error;

/// Errors that stop a question before any upstream is called.
///
/// Upstream failures (classifier or rewriter timeouts) are not errors here;
/// they fall back to rules or to the original text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Question is empty")]
    EmptyQuestion,

    #[error("Question is not valid text: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, QueryError>;

impl From<QueryError> for turf_advisor_core::Error {
    fn from(err: QueryError) -> Self {
        turf_advisor_core::Error::InvalidInput(err.to_string())
    }
}

//! Persistence errors

use thiserror::Error;
use turf_advisor_core::Degraded;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Connection failed: {0}")]
    Connection(#[from] scylla::transport::errors::NewSessionError),

    #[error("Query failed: {0}")]
    Query(#[from] scylla::transport::errors::QueryError),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PersistenceError {
    /// The soft-fail value handed back to the pipeline
    pub fn degraded(&self) -> Degraded {
        Degraded::unavailable("persistence", self.to_string())
    }
}

impl From<PersistenceError> for turf_advisor_core::Error {
    fn from(err: PersistenceError) -> Self {
        turf_advisor_core::Error::Persistence(err.to_string())
    }
}

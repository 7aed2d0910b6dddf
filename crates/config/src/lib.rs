//! Configuration management for the turf advisor
//!
//! Supports loading configuration from:
//! - YAML files (`config/default.yaml`, `config/{env}.yaml`)
//! - Environment variables (`TURF_ADVISOR__` prefix, `__` separator)
//!
//! Domain vocabulary (product lists, keyword tables, geography) lives in
//! [`constants`]; tuned weights live in [`Settings`].

pub mod constants;
pub mod settings;
pub mod vocabulary;

pub use settings::{
    load_settings, load_settings_from, BudgetConfig, CacheConfig, EmbeddingConfig,
    KnowledgeConfig, LlmSettings, ModelPrice, ObservabilityConfig, PersistenceConfig,
    QueryConfig, RateLimitConfig, RerankerConfig, RetrievalConfig, RuntimeEnvironment, ScoringConfig,
    ServerConfig, Settings, VectorStoreConfig, VerificationConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

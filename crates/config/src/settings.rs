//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use turf_advisor_core::CachePolicy;

use crate::constants::limits;
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Channel sizes, fusion constants and context limits
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Boost/penalty multipliers (empirically tuned)
    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub reranker: RerankerConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub llm: LlmSettings,

    /// Classifier and rewriter behaviour
    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub verification: VerificationConfig,

    #[serde(default)]
    pub budget: BudgetConfig,

    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_retrieval()?;
        self.validate_scoring()?;
        self.validate_cache()?;
        self.validate_verification()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("server.port", "Port cannot be 0"));
        }
        if self.server.max_question_chars == 0 {
            return Err(invalid("server.max_question_chars", "Must be positive"));
        }
        Ok(())
    }

    fn validate_retrieval(&self) -> Result<(), ConfigError> {
        let r = &self.retrieval;
        if r.rrf_k <= 0.0 {
            return Err(invalid(
                "retrieval.rrf_k",
                format!("Must be positive, got {}", r.rrf_k),
            ));
        }
        if !(0.0..=1.0).contains(&r.vector_rank_weight) {
            return Err(invalid(
                "retrieval.vector_rank_weight",
                format!("Must be between 0.0 and 1.0, got {}", r.vector_rank_weight),
            ));
        }
        if r.vector_rank_weight <= 0.5 {
            return Err(invalid(
                "retrieval.vector_rank_weight",
                "Vector ranks must outweigh BM25 ranks (> 0.5)",
            ));
        }
        if !(0.0..=1.0).contains(&r.vector_score_weight) {
            return Err(invalid(
                "retrieval.vector_score_weight",
                format!("Must be between 0.0 and 1.0, got {}", r.vector_score_weight),
            ));
        }
        for (field, value) in [
            ("retrieval.general_top_k", r.general_top_k),
            ("retrieval.product_top_k", r.product_top_k),
            ("retrieval.timing_top_k", r.timing_top_k),
            ("retrieval.max_sources", r.max_sources),
            ("retrieval.max_context_chars", r.max_context_chars),
        ] {
            if value == 0 {
                return Err(invalid(field, "Must be positive"));
            }
        }
        if r.product_keep > r.product_top_k {
            return Err(invalid(
                "retrieval.product_keep",
                "Cannot keep more product matches than are fetched",
            ));
        }
        Ok(())
    }

    fn validate_scoring(&self) -> Result<(), ConfigError> {
        for (field, value) in self.scoring.multipliers() {
            if !(value > 0.0) {
                return Err(invalid(
                    &format!("scoring.{}", field),
                    format!("Multiplier must be positive, got {}", value),
                ));
            }
        }
        Ok(())
    }

    fn validate_cache(&self) -> Result<(), ConfigError> {
        let c = &self.cache;
        for (field, capacity) in [
            ("cache.embedding_capacity", c.embedding_capacity),
            ("cache.search_capacity", c.search_capacity),
            ("cache.answer_capacity", c.answer_capacity),
            ("query.cache_capacity", self.query.cache_capacity),
        ] {
            if capacity == 0 {
                return Err(invalid(field, "Capacity must be positive"));
            }
        }
        Ok(())
    }

    fn validate_verification(&self) -> Result<(), ConfigError> {
        let v = &self.verification;
        if !(0.0..=30.0).contains(&v.hallucination_cap) {
            return Err(invalid(
                "verification.hallucination_cap",
                format!("Must be between 0 and 30, got {}", v.hallucination_cap),
            ));
        }
        if !(0.0..=25.0).contains(&v.validation_cap) {
            return Err(invalid(
                "verification.validation_cap",
                format!("Must be between 0 and 25, got {}", v.validation_cap),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins (empty = localhost only)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Questions longer than this are truncated after sanitizing
    #[serde(default = "default_max_question_chars")]
    pub max_question_chars: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_timeout() -> u64 {
    90
}
fn default_true() -> bool {
    true
}
fn default_max_question_chars() -> usize {
    limits::MAX_QUESTION_CHARS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
            cors_enabled: true,
            cors_origins: Vec::new(),
            max_question_chars: default_max_question_chars(),
        }
    }
}

/// Per-user request rate limiting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests allowed per user in any 60-second window
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

fn default_requests_per_minute() -> u32 {
    20
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

/// Retrieval and fusion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// RRF smoothing constant `k`
    pub rrf_k: f32,
    /// RRF weight of the vector list; BM25 gets the remainder
    pub vector_rank_weight: f32,
    /// Multiplier turning small RRF sums into the score scale of the boost chain
    pub rrf_scale: f32,
    /// Weights for the non-RRF fallback blend
    pub vector_score_weight: f32,
    pub keyword_score_weight: f32,
    pub bm25_k1: f32,
    pub bm25_b: f32,
    pub bm25_top_k: usize,
    pub general_top_k: usize,
    pub algae_top_k: usize,
    pub product_top_k: usize,
    /// Product matches kept after category filtering
    pub product_keep: usize,
    pub timing_top_k: usize,
    /// Results passed through the reranker and safety filter
    pub rerank_top_k: usize,
    pub max_sources: usize,
    pub max_chunk_chars: usize,
    pub max_context_chars: usize,
    /// Rephrase with the LLM and search again when scoring yields nothing
    pub reformulate_on_empty: bool,
    /// Directory holding equipment manual page images
    pub images_dir: Option<String>,
    /// URL fragments a source link must contain to be shown; empty shows all
    pub display_url_prefixes: Vec<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rrf_k: 60.0,
            vector_rank_weight: 0.6,
            rrf_scale: 10.0,
            vector_score_weight: 0.7,
            keyword_score_weight: 0.3,
            bm25_k1: 1.5,
            bm25_b: 0.75,
            bm25_top_k: 50,
            general_top_k: 30,
            algae_top_k: 20,
            product_top_k: 50,
            product_keep: 30,
            timing_top_k: 20,
            rerank_top_k: 20,
            max_sources: limits::MAX_SOURCES,
            max_chunk_chars: limits::MAX_CHUNK_CHARS,
            max_context_chars: limits::MAX_CONTEXT_CHARS,
            reformulate_on_empty: true,
            images_dir: None,
            display_url_prefixes: Vec::new(),
        }
    }
}

/// Boost (>1) and penalty (<1) multipliers of the scoring chain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub high_value_fungicide: f32,
    pub product_label: f32,
    pub keyword_in_source: f32,
    pub grass_match: f32,
    pub state_match: f32,
    pub region_match: f32,
    pub water_match: f32,
    pub synonym_in_source: f32,
    pub problem_in_source: f32,
    pub solution_sheet: f32,
    pub low_quality_source: f32,
    pub wrong_grass: f32,
    pub foreign_product: f32,
    pub wrong_product_type: f32,
    pub wrong_type_keyword: f32,
    pub stale: f32,
    pub very_stale: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            high_value_fungicide: 50.0,
            product_label: 3.0,
            keyword_in_source: 2.0,
            grass_match: 1.3,
            state_match: 2.0,
            region_match: 1.2,
            water_match: 2.0,
            synonym_in_source: 2.0,
            problem_in_source: 1.5,
            solution_sheet: 0.4,
            low_quality_source: 0.1,
            wrong_grass: 0.5,
            foreign_product: 0.1,
            wrong_product_type: 0.05,
            wrong_type_keyword: 0.1,
            stale: 0.7,
            very_stale: 0.5,
        }
    }
}

impl ScoringConfig {
    fn multipliers(&self) -> [(&'static str, f32); 17] {
        [
            ("high_value_fungicide", self.high_value_fungicide),
            ("product_label", self.product_label),
            ("keyword_in_source", self.keyword_in_source),
            ("grass_match", self.grass_match),
            ("state_match", self.state_match),
            ("region_match", self.region_match),
            ("water_match", self.water_match),
            ("synonym_in_source", self.synonym_in_source),
            ("problem_in_source", self.problem_in_source),
            ("solution_sheet", self.solution_sheet),
            ("low_quality_source", self.low_quality_source),
            ("wrong_grass", self.wrong_grass),
            ("foreign_product", self.foreign_product),
            ("wrong_product_type", self.wrong_product_type),
            ("wrong_type_keyword", self.wrong_type_keyword),
            ("stale", self.stale),
            ("very_stale", self.very_stale),
        ]
    }
}

/// Cross-encoder reranker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerConfig {
    pub enabled: bool,
    pub model_path: String,
    pub tokenizer_path: String,
    /// Share of the final score taken from the model
    pub model_weight: f32,
    pub max_seq_len: usize,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model_path: "models/reranker/model.onnx".to_string(),
            tokenizer_path: "models/reranker/tokenizer.json".to_string(),
            model_weight: 0.7,
            max_seq_len: 512,
        }
    }
}

/// Cache capacities and lifetimes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub embedding_capacity: usize,
    pub embedding_ttl_secs: u64,
    pub search_capacity: usize,
    pub search_ttl_secs: u64,
    pub answer_capacity: usize,
    pub answer_ttl_secs: u64,
    /// Answers below this confidence are not cached
    pub answer_min_confidence: f32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            embedding_capacity: 1000,
            embedding_ttl_secs: 2 * 60 * 60,
            search_capacity: 200,
            search_ttl_secs: 300,
            answer_capacity: 300,
            answer_ttl_secs: 3600,
            answer_min_confidence: 50.0,
        }
    }
}

impl CacheConfig {
    pub fn embedding_policy(&self) -> CachePolicy {
        CachePolicy::new(
            self.embedding_capacity,
            Duration::from_secs(self.embedding_ttl_secs),
        )
    }

    pub fn search_policy(&self) -> CachePolicy {
        CachePolicy::new(self.search_capacity, Duration::from_secs(self.search_ttl_secs))
    }

    pub fn answer_policy(&self) -> CachePolicy {
        CachePolicy::new(self.answer_capacity, Duration::from_secs(self.answer_ttl_secs))
    }
}

/// Chat-completion service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Full model for complex and diagnostic questions
    pub model: String,
    /// Cheaper model for lookups and budget downgrade
    pub mini_model: String,
    /// Model for classifier, rewriter and grounding judge
    pub utility_model: String,
    pub first_timeout_secs: u64,
    pub retry_timeout_secs: u64,
    /// Timeout for classifier/rewriter/judge calls
    pub utility_timeout_secs: u64,
    /// Transport-level retries inside the HTTP backend
    pub max_retries: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            model: "gpt-4o".to_string(),
            mini_model: "gpt-4o-mini".to_string(),
            utility_model: "gpt-4o-mini".to_string(),
            first_timeout_secs: 20,
            retry_timeout_secs: 30,
            utility_timeout_secs: 8,
            max_retries: 1,
        }
    }
}

/// Query understanding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Ask the utility model to classify; rules only when false
    pub classifier_enabled: bool,
    pub rewrite_enabled: bool,
    /// Questions longer than this are searched as written
    pub rewrite_skip_chars: usize,
    /// Rewrites longer than this are discarded
    pub rewrite_max_chars: usize,
    /// Shared by the classification and rewrite caches
    pub cache_capacity: usize,
    pub cache_ttl_secs: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            classifier_enabled: true,
            rewrite_enabled: true,
            rewrite_skip_chars: 150,
            rewrite_max_chars: 500,
            cache_capacity: 1000,
            cache_ttl_secs: 24 * 60 * 60,
        }
    }
}

impl QueryConfig {
    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy::new(self.cache_capacity, Duration::from_secs(self.cache_ttl_secs))
    }
}

/// Embedding service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            model: "text-embedding-3-small".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Qdrant vector store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub vector_dim: usize,
    pub timeout_secs: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:6334".to_string(),
            api_key: None,
            collection: "turf_research".to_string(),
            vector_dim: 1536,
            timeout_secs: 5,
        }
    }
}

/// Verification layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    pub grounding_enabled: bool,
    /// Context characters shown to the grounding judge
    pub grounding_context_chars: usize,
    /// Answers shorter than this skip the grounding judge
    pub grounding_min_answer_chars: usize,
    pub hallucination_cap: f32,
    pub validation_cap: f32,
    /// Minimum observations before a calibration curve is applied
    pub calibration_min_points: usize,
    /// JSON file of `{topic: [[predicted, observed], ...]}`
    pub calibration_path: Option<String>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            grounding_enabled: true,
            grounding_context_chars: 4000,
            grounding_min_answer_chars: 50,
            hallucination_cap: 30.0,
            validation_cap: 25.0,
            calibration_min_points: 20,
            calibration_path: None,
        }
    }
}

/// Token prices for one model, USD per 1k tokens
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

/// Daily LLM spend limit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub enabled: bool,
    pub daily_limit_usd: f64,
    /// Fraction of the limit after which the mini model is forced
    pub downgrade_fraction: f64,
    pub prices: HashMap<String, ModelPrice>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        let prices = HashMap::from([
            (
                "gpt-4o".to_string(),
                ModelPrice {
                    input_per_1k: 0.0025,
                    output_per_1k: 0.01,
                },
            ),
            (
                "gpt-4o-mini".to_string(),
                ModelPrice {
                    input_per_1k: 0.00015,
                    output_per_1k: 0.0006,
                },
            ),
        ]);
        Self {
            enabled: true,
            daily_limit_usd: 25.0,
            downgrade_fraction: 0.9,
            prices,
        }
    }
}

/// Curated knowledge files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Directory of product/disease/reference YAML or JSON files
    pub dir: String,
    /// YAML/JSON file of fallback answers keyed by topic
    pub golden_answers_path: Option<String>,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            dir: "knowledge".to_string(),
            golden_answers_path: Some("knowledge/golden_answers.yaml".to_string()),
        }
    }
}

/// Persistence configuration for ScyllaDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Enable ScyllaDB persistence (false = in-memory only)
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_scylla_hosts")]
    pub scylla_hosts: Vec<String>,

    #[serde(default = "default_scylla_keyspace")]
    pub keyspace: String,

    #[serde(default = "default_replication_factor")]
    pub replication_factor: u8,
}

fn default_scylla_hosts() -> Vec<String> {
    std::env::var("SCYLLA_HOSTS")
        .map(|s| s.split(',').map(|h| h.trim().to_string()).collect())
        .unwrap_or_else(|_| vec!["127.0.0.1:9042".to_string()])
}

fn default_scylla_keyspace() -> String {
    std::env::var("SCYLLA_KEYSPACE").unwrap_or_else(|_| "turf_advisor".to_string())
}

fn default_replication_factor() -> u8 {
    1
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scylla_hosts: default_scylla_hosts(),
            keyspace: default_scylla_keyspace(),
            replication_factor: default_replication_factor(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    #[serde(default = "default_true")]
    pub tracing_enabled: bool,

    /// OTLP endpoint for traces
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            tracing_enabled: true,
            otlp_endpoint: None,
            metrics_enabled: true,
        }
    }
}

/// Load settings from `config/default`, `config/{env}` and `TURF_ADVISOR__*` variables
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from("config", env)
}

/// Same as [`load_settings`] with an explicit config directory
pub fn load_settings_from(dir: &str, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name(&format!("{}/default", dir)).required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("{}/{}", dir, env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("TURF_ADVISOR")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;
    tracing::debug!(environment = ?settings.environment, "Settings loaded");

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.retrieval.general_top_k, 30);
        assert!(settings.retrieval.vector_rank_weight > 0.5);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_retrieval_validation() {
        let mut settings = Settings::default();
        settings.retrieval.rrf_k = 0.0;
        assert!(settings.validate().is_err());

        settings.retrieval.rrf_k = 60.0;
        settings.retrieval.vector_rank_weight = 0.4;
        assert!(settings.validate().is_err());

        settings.retrieval.vector_rank_weight = 0.6;
        settings.retrieval.product_keep = 80;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_penalty_caps_validation() {
        let mut settings = Settings::default();
        settings.verification.hallucination_cap = 45.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_scoring_multiplier_validation() {
        let mut settings = Settings::default();
        settings.scoring.wrong_grass = 0.0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("scoring.wrong_grass"));
    }

    #[test]
    fn test_cache_policies() {
        let cache = CacheConfig::default();
        assert_eq!(cache.search_policy().ttl, Duration::from_secs(300));
        assert_eq!(cache.embedding_policy().capacity, 1000);
    }

    #[test]
    fn test_load_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("default.yaml")).unwrap();
        writeln!(f, "server:\n  port: 9191\nretrieval:\n  rrf_k: 30\nscoring:\n  grass_match: 1.5").unwrap();

        let settings = load_settings_from(dir.path().to_str().unwrap(), None).unwrap();
        assert_eq!(settings.server.port, 9191);
        assert_eq!(settings.retrieval.rrf_k, 30.0);
        assert_eq!(settings.scoring.grass_match, 1.5);
        // untouched fields keep their defaults
        assert_eq!(settings.scoring.wrong_grass, 0.5);
        assert_eq!(settings.retrieval.general_top_k, 30);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("default.yaml")).unwrap();
        writeln!(f, "retrieval:\n  vector_rank_weight: 1.7").unwrap();
        assert!(load_settings_from(dir.path().to_str().unwrap(), None).is_err());
    }
}

//! Core traits and types for the turf advisor
//!
//! This crate provides foundational types used across all other crates:
//! - Question and its derived annotations
//! - Retrieval data model (matches, scored results, context bundles)
//! - Verification reports and the `ask` response
//! - Bounded TTL caches and the cache registry
//! - Capability traits for pluggable backends
//! - Error types, including the soft-fail `Degraded` value

pub mod cache;
pub mod chat;
pub mod error;
pub mod knowledge;
pub mod question;
pub mod response;
pub mod retrieval;
pub mod traits;
pub mod verification;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cache::{CachePolicy, CacheRegistry, CacheStats, RegistryStats, TtlCache};
pub use chat::{ChatMessage, Completion, CompletionRequest, Role};
pub use error::{DegradeKind, Degraded, Error, Result};
pub use knowledge::{DiseaseFact, ProductFact};
pub use question::{GrassType, ProductNeed, QueryCategory, Question, Region, Topic};
pub use response::{AskResponse, Confidence, ShortCircuit};
pub use retrieval::{
    Channel, ChannelResults, ChunkMetadata, ContextBundle, Freshness, IndexStats, Match,
    MetadataFilter, ScoredResult, Source,
};
pub use verification::{
    needs_review, CheckReport, GroundingReport, IssueKind, Severity, VerificationIssue,
    VerificationReport,
};

// Trait re-exports
pub use traits::{
    AuditEvent, AuditEventType, ChatCompletion, ConversationRecord, ConversationSink, Embedder,
    FeedbackRecord, KnowledgeStore, VectorIndex,
};

//! Retrieval for the turf advisor
//!
//! Features:
//! - Concurrent general/product/timing vector channels over Qdrant
//! - Per-request BM25 rerank fused with the vector ranking via RRF
//! - Boost/penalty scoring chain and topic safety filter
//! - Optional ONNX cross-encoder reranking
//! - Context assembly with knowledge-base enrichment
//! - File-backed product and disease knowledge store

pub mod bm25;
pub mod context;
pub mod embeddings;
pub mod fusion;
pub mod knowledge;
pub mod reranker;
pub mod retriever;
pub mod safety;
pub mod scoring;
pub mod text;
pub mod vector_store;

pub use bm25::{Bm25Index, Bm25Params};
pub use context::{display_sources, normalize_source_name, truncate_context, ContextAssembler};
pub use embeddings::HttpEmbedder;
pub use fusion::{hybrid_rerank, reciprocal_rank_fusion, FusedMatch, RrfConfig};
pub use knowledge::FileKnowledgeStore;
pub use reranker::{
    blend_scores, build_reranker, CrossEncoderReranker, IdentityReranker, PairScorer, Reranker,
    RerankerStats,
};
#[cfg(feature = "onnx")]
pub use reranker::OnnxPairScorer;
pub use retriever::{HybridRetriever, RetrievalOutcome, RetrievalQuery};
pub use safety::safety_filter;
pub use scoring::{
    combined_relevance_score, keyword_score, phrase_match_score, source_boost, Scorer,
};
pub use vector_store::QdrantIndex;

use thiserror::Error;

/// RAG errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Reranker error: {0}")]
    Reranker(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl From<RagError> for turf_advisor_core::Error {
    fn from(err: RagError) -> Self {
        turf_advisor_core::Error::Retrieval(err.to_string())
    }
}

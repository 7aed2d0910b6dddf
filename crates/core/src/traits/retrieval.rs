//! Retrieval traits

use crate::error::Degraded;
use crate::retrieval::{IndexStats, Match, MetadataFilter};
use async_trait::async_trait;

/// Vector index service
///
/// Implementations:
/// - `QdrantIndex` - Qdrant collection (production)
/// - `InMemoryIndex` - cosine search over a vector (tests)
#[async_trait]
pub trait VectorIndex: Send + Sync + 'static {
    /// Top-`top_k` matches for `vector`, optionally restricted by `filter`.
    ///
    /// An empty result is a valid answer, not a failure.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Match>, Degraded>;

    async fn describe_stats(&self) -> Result<IndexStats, Degraded>;
}

/// Embedding service. Identical input must give identical output.
#[async_trait]
pub trait Embedder: Send + Sync + 'static {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Degraded>;

    /// Model name, part of the embedding cache key
    fn model_name(&self) -> &str;
}

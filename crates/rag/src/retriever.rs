//! Multi-channel retriever
//!
//! Runs the general, product and timing vector searches concurrently. A
//! channel that fails degrades to an empty list; the others still count.

use std::sync::Arc;

use turf_advisor_config::constants::{keywords, products};
use turf_advisor_config::RetrievalConfig;
use turf_advisor_core::{
    CacheRegistry, Channel, ChannelResults, Degraded, Embedder, GrassType, IndexStats, Match,
    MetadataFilter, ProductNeed, Question, VectorIndex,
};

use crate::text::{contains_any, head};

/// Document types searched by the product channel
const PRODUCT_DOC_TYPES: &[&str] = &["pesticide_label", "pesticide_product"];

/// The parts of an analysed question that drive retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalQuery {
    pub rewritten: String,
    pub expanded: String,
    pub product_need: Option<ProductNeed>,
    pub grass_type: Option<GrassType>,
}

impl From<&Question> for RetrievalQuery {
    fn from(q: &Question) -> Self {
        Self {
            rewritten: q.rewritten.clone(),
            expanded: q.expanded.clone(),
            product_need: q.product_need,
            grass_type: q.grass_type,
        }
    }
}

/// Channel results plus what went wrong getting them
#[derive(Debug, Clone, Default)]
pub struct RetrievalOutcome {
    pub results: ChannelResults,
    pub degraded: Vec<Degraded>,
}

impl RetrievalOutcome {
    pub fn all_matches(&self) -> Vec<Match> {
        self.results.iter().cloned().collect()
    }
}

pub struct HybridRetriever {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    caches: Arc<CacheRegistry>,
    config: RetrievalConfig,
}

impl HybridRetriever {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        caches: Arc<CacheRegistry>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            caches,
            config,
        }
    }

    /// Query all applicable channels concurrently.
    ///
    /// Never fails: a channel error is logged, recorded in the outcome and
    /// the channel contributes nothing.
    pub async fn retrieve(&self, query: &RetrievalQuery) -> RetrievalOutcome {
        let lower = query.rewritten.to_lowercase();

        let (general, product, timing) = tokio::join!(
            self.general_channel(&query.expanded, &lower),
            self.product_channel(query, &lower),
            self.timing_channel(query, &lower),
        );

        let mut outcome = RetrievalOutcome::default();
        outcome.results.general = Self::settle(Channel::General, general, &mut outcome.degraded);
        outcome.results.product = Self::settle(Channel::Product, product, &mut outcome.degraded);
        outcome.results.timing = Self::settle(Channel::Timing, timing, &mut outcome.degraded);

        tracing::debug!(
            general = outcome.results.general.len(),
            product = outcome.results.product.len(),
            timing = outcome.results.timing.len(),
            degraded = outcome.degraded.len(),
            "Retrieval complete"
        );
        outcome
    }

    /// General-channel search for a single query string
    pub async fn search_general(&self, query: &str) -> Result<Vec<Match>, Degraded> {
        self.search(Channel::General, query, self.config.general_top_k, None)
            .await
    }

    pub async fn describe_stats(&self) -> Result<IndexStats, Degraded> {
        self.index.describe_stats().await
    }

    fn settle(
        channel: Channel,
        result: Result<Vec<Match>, Degraded>,
        degraded: &mut Vec<Degraded>,
    ) -> Vec<Match> {
        match result {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(channel = channel.as_str(), error = %e, "Retrieval channel degraded");
                degraded.push(e);
                Vec::new()
            }
        }
    }

    async fn general_channel(&self, expanded: &str, lower: &str) -> Result<Vec<Match>, Degraded> {
        if !contains_any(lower, keywords::ALGAE) {
            return self.search_general(expanded).await;
        }

        let algae_query = format!("{} algae moss control cyanobacteria", expanded);
        let (main, algae) = tokio::join!(
            self.search_general(expanded),
            self.search(Channel::General, &algae_query, self.config.algae_top_k, None),
        );
        match (main, algae) {
            (Ok(mut main), Ok(algae)) => {
                main.extend(algae);
                Ok(main)
            }
            (Ok(main), Err(e)) => {
                tracing::warn!(error = %e, "Algae variant search failed");
                Ok(main)
            }
            (Err(e), Ok(algae)) => {
                tracing::warn!(error = %e, "General search failed, keeping algae variant");
                Ok(algae)
            }
            (Err(e), Err(_)) => Err(e),
        }
    }

    async fn product_channel(
        &self,
        query: &RetrievalQuery,
        lower: &str,
    ) -> Result<Vec<Match>, Degraded> {
        if !contains_any(lower, keywords::PRODUCT) {
            return Ok(Vec::new());
        }
        let text = format!("{} product label application rate", query.rewritten);
        let filter = MetadataFilter::any_of("type", PRODUCT_DOC_TYPES);
        let matches = self
            .search(Channel::Product, &text, self.config.product_top_k, Some(&filter))
            .await?;

        Ok(matches
            .into_iter()
            .filter(|m| product_fits_need(m, query.product_need))
            .take(self.config.product_keep)
            .collect())
    }

    async fn timing_channel(
        &self,
        query: &RetrievalQuery,
        lower: &str,
    ) -> Result<Vec<Match>, Degraded> {
        if !contains_any(lower, keywords::TIMING) {
            return Ok(Vec::new());
        }
        let grass = query.grass_type.map(|g| g.as_str()).unwrap_or("");
        let text = format!(
            "{} timing schedule calendar program {}",
            query.rewritten, grass
        );
        self.search(Channel::Timing, text.trim_end(), self.config.timing_top_k, None)
            .await
    }

    async fn search(
        &self,
        channel: Channel,
        query: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Match>, Degraded> {
        let filter_key = filter.map(MetadataFilter::cache_key);
        let key = CacheRegistry::search_key(channel.as_str(), query, filter_key.as_deref());
        if let Some(hit) = self.caches.search.get(&key) {
            return Ok(hit.as_ref().clone());
        }

        let vector = self.embedding(query).await?;
        let matches = self.index.query(&vector, top_k, filter).await?;
        self.caches.search.insert(key, Arc::new(matches.clone()));
        Ok(matches)
    }

    async fn embedding(&self, text: &str) -> Result<Arc<Vec<f32>>, Degraded> {
        let key = CacheRegistry::embedding_key(self.embedder.model_name(), text);
        if let Some(hit) = self.caches.embeddings.get(&key) {
            return Ok(hit);
        }
        let vector = Arc::new(self.embedder.embed(text).await?);
        self.caches.embeddings.insert(key, Arc::clone(&vector));
        Ok(vector)
    }
}

/// Product-channel category filter: a fungicide question drops herbicide and
/// insecticide labels, a herbicide question drops fungicide labels
fn product_fits_need(m: &Match, need: Option<ProductNeed>) -> bool {
    let source = m.metadata.source_lower();
    match need {
        Some(ProductNeed::Fungicide) => {
            let text = m.metadata.text.to_lowercase();
            let opening = head(&text, 200);
            let wrong = |names: &[&str]| contains_any(&source, names) || contains_any(opening, names);
            !wrong(products::HERBICIDES) && !wrong(products::INSECTICIDES)
        }
        Some(ProductNeed::Herbicide) => !contains_any(&source, products::FUNGICIDES),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turf_advisor_core::testing::{FailingEmbedder, HashEmbedder, InMemoryIndex};

    fn index() -> InMemoryIndex {
        InMemoryIndex::new()
            .with_doc("g1", "Dollar Spot Guide", "dollar spot on bentgrass greens", None)
            .with_doc(
                "p1",
                "Banner Maxx Label",
                "propiconazole fungicide label rate dollar spot",
                Some("pesticide_label"),
            )
            .with_doc(
                "p2",
                "Tenacity Label",
                "mesotrione herbicide label rate",
                Some("pesticide_label"),
            )
            .with_doc("t1", "Spray Calendar", "fungicide program timing schedule", None)
    }

    fn retriever(index: InMemoryIndex) -> HybridRetriever {
        HybridRetriever::new(
            Arc::new(index),
            Arc::new(HashEmbedder),
            Arc::new(CacheRegistry::default()),
            RetrievalConfig::default(),
        )
    }

    fn query(text: &str, need: Option<ProductNeed>) -> RetrievalQuery {
        RetrievalQuery {
            rewritten: text.into(),
            expanded: text.to_lowercase(),
            product_need: need,
            grass_type: None,
        }
    }

    #[tokio::test]
    async fn test_channels_selected_by_keywords() {
        let r = retriever(index());
        let out = r
            .retrieve(&query("When to spray fungicide for dollar spot", Some(ProductNeed::Fungicide)))
            .await;
        assert!(!out.results.general.is_empty());
        assert!(!out.results.timing.is_empty());
        assert!(out.results.product.iter().all(|m| m.id != "p2"));
        assert!(out.results.product.iter().any(|m| m.id == "p1"));
        assert!(out.degraded.is_empty());
    }

    #[tokio::test]
    async fn test_product_channel_skipped_without_keywords() {
        let r = retriever(index());
        let out = r.retrieve(&query("dollar spot biology", None)).await;
        assert!(out.results.product.is_empty());
        assert!(out.results.timing.is_empty());
    }

    #[tokio::test]
    async fn test_failing_index_degrades_to_empty() {
        let r = retriever(InMemoryIndex::failing());
        let out = r.retrieve(&query("when to apply fungicide", None)).await;
        assert!(out.results.is_empty());
        assert_eq!(out.degraded.len(), 3);
    }

    #[tokio::test]
    async fn test_failing_embedder_degrades_to_empty() {
        let r = HybridRetriever::new(
            Arc::new(index()),
            Arc::new(FailingEmbedder),
            Arc::new(CacheRegistry::default()),
            RetrievalConfig::default(),
        );
        let out = r.retrieve(&query("dollar spot", None)).await;
        assert!(out.results.is_empty());
        assert_eq!(out.degraded.len(), 1);
    }

    #[tokio::test]
    async fn test_search_cache_avoids_second_query() {
        let idx = Arc::new(index());
        let r = HybridRetriever::new(
            idx.clone(),
            Arc::new(HashEmbedder),
            Arc::new(CacheRegistry::default()),
            RetrievalConfig::default(),
        );
        r.search_general("dollar spot").await.unwrap();
        r.search_general("dollar spot").await.unwrap();
        assert_eq!(idx.query_count(), 1);
    }

    #[test]
    fn test_product_fits_need() {
        let herb = Match {
            id: "x".into(),
            score: 0.5,
            metadata: turf_advisor_core::ChunkMetadata {
                source: "Specticle Label".into(),
                ..Default::default()
            },
        };
        assert!(!product_fits_need(&herb, Some(ProductNeed::Fungicide)));
        assert!(product_fits_need(&herb, Some(ProductNeed::Herbicide)));
        assert!(product_fits_need(&herb, None));
    }
}

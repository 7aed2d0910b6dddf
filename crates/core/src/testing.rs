//! In-memory fakes of the capability traits, for tests in downstream crates

use crate::chat::{Completion, CompletionRequest};
use crate::error::Degraded;
use crate::knowledge::{DiseaseFact, ProductFact};
use crate::retrieval::{ChunkMetadata, IndexStats, Match, MetadataFilter};
use crate::traits::{
    AuditEvent, ChatCompletion, ConversationRecord, ConversationSink, Embedder, FeedbackRecord,
    KnowledgeStore, VectorIndex,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

const DIM: usize = 64;

/// Bag-of-words hashing embedder; deterministic and dependency-free
pub struct HashEmbedder;

impl HashEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; DIM];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
        {
            let mut h: u64 = 0xcbf29ce484222325;
            for b in word.bytes() {
                h ^= b as u64;
                h = h.wrapping_mul(0x100000001b3);
            }
            v[(h % DIM as u64) as usize] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Degraded> {
        Ok(Self::vector(text))
    }

    fn model_name(&self) -> &str {
        "hash-64"
    }
}

/// Embedder that always fails
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, Degraded> {
        Err(Degraded::unavailable("embedding", "embedding service down"))
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Cosine search over documents embedded with [`HashEmbedder`]
#[derive(Default)]
pub struct InMemoryIndex {
    docs: Vec<(Vec<f32>, Match)>,
    fail: bool,
    queries: AtomicUsize,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index that fails every query
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_doc(mut self, id: &str, source: &str, text: &str, doc_type: Option<&str>) -> Self {
        let metadata = ChunkMetadata {
            source: source.to_string(),
            text: text.to_string(),
            doc_type: doc_type.map(str::to_string),
            ..Default::default()
        };
        self.docs.push((
            HashEmbedder::vector(&format!("{} {}", source, text)),
            Match {
                id: id.to_string(),
                score: 0.0,
                metadata,
            },
        ));
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Match>, Degraded> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Degraded::unavailable("vector_index", "index unreachable"));
        }
        let mut hits: Vec<Match> = self
            .docs
            .iter()
            .filter(|(_, m)| filter.map_or(true, |f| f.matches(&m.metadata)))
            .map(|(v, m)| {
                let score = v.iter().zip(vector).map(|(a, b)| a * b).sum::<f32>();
                Match {
                    score,
                    ..m.clone()
                }
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn describe_stats(&self) -> Result<IndexStats, Degraded> {
        Ok(IndexStats {
            total_vectors: self.docs.len() as u64,
        })
    }
}

/// Chat backend that replays scripted replies in order.
///
/// `Err` entries simulate upstream failures. When the script runs out the
/// fallback reply is used.
pub struct ScriptedChat {
    replies: Mutex<VecDeque<Result<String, Degraded>>>,
    fallback: Result<String, Degraded>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedChat {
    pub fn new(replies: Vec<Result<String, Degraded>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: Err(Degraded::unavailable("llm", "script exhausted")),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call returns `reply`
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Ok(reply.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails
    pub fn failing() -> Self {
        Self::new(Vec::new())
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ChatCompletion for ScriptedChat {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, Degraded> {
        let model = request.model.clone();
        self.requests.lock().push(request);
        let next = self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        next.map(|text| Completion {
            completion_tokens: (text.len() / 4) as u32,
            prompt_tokens: 100,
            text,
            model,
        })
    }
}

/// Knowledge store over a fixed list of facts
#[derive(Default)]
pub struct StaticKnowledge {
    pub products: Vec<ProductFact>,
    pub diseases: Vec<DiseaseFact>,
}

impl KnowledgeStore for StaticKnowledge {
    fn product(&self, name: &str) -> Option<ProductFact> {
        let needle = name.to_lowercase();
        self.products
            .iter()
            .find(|p| p.names().iter().any(|n| n.contains(&needle)))
            .cloned()
    }

    fn products_in(&self, text: &str) -> Vec<ProductFact> {
        let lower = text.to_lowercase();
        self.products
            .iter()
            .filter(|p| p.names().iter().any(|n| lower.contains(n.as_str())))
            .cloned()
            .collect()
    }

    fn disease(&self, name: &str) -> Option<DiseaseFact> {
        let needle = name.to_lowercase().replace([' ', '-'], "_");
        self.diseases
            .iter()
            .find(|d| d.name.contains(&needle) || needle.contains(&d.name))
            .cloned()
    }

    fn disease_in(&self, text: &str) -> Option<DiseaseFact> {
        let lower = text.to_lowercase();
        self.diseases
            .iter()
            .find(|d| lower.contains(&d.display_name()) || lower.contains(&d.name))
            .cloned()
    }

    fn reference(&self, _topic: &str) -> Option<String> {
        None
    }

    fn is_known_product(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.products.iter().any(|p| p.names().contains(&lower))
    }

    fn all_products(&self) -> Vec<ProductFact> {
        self.products.clone()
    }
}

/// Sink that keeps everything in memory
#[derive(Default)]
pub struct MemorySink {
    pub conversations: Mutex<Vec<ConversationRecord>>,
    pub feedback: Mutex<Vec<FeedbackRecord>>,
    pub audit: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl ConversationSink for MemorySink {
    async fn record_conversation(&self, record: &ConversationRecord) -> Result<(), Degraded> {
        self.conversations.lock().push(record.clone());
        Ok(())
    }

    async fn record_feedback(&self, feedback: &FeedbackRecord) -> Result<(), Degraded> {
        self.feedback.lock().push(feedback.clone());
        Ok(())
    }

    async fn record_audit(&self, event: &AuditEvent) -> Result<(), Degraded> {
        self.audit.lock().push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_index_ranks_by_overlap() {
        let index = InMemoryIndex::new()
            .with_doc("a", "Dollar Spot Guide", "dollar spot on bentgrass greens", None)
            .with_doc("b", "Irrigation Audit", "sprinkler uniformity and pump pressure", None);
        let q = HashEmbedder::vector("dollar spot bentgrass");
        let hits = index.query(&q, 2, None).await.unwrap();
        assert_eq!(hits[0].id, "a");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_scripted_chat_sequence() {
        let chat = ScriptedChat::new(vec![
            Err(Degraded::timeout("llm", "slow")),
            Ok("second".into()),
        ]);
        let req = CompletionRequest::new("m", vec![]);
        assert!(chat.complete(req.clone()).await.is_err());
        assert_eq!(chat.complete(req.clone()).await.unwrap().text, "second");
        assert!(chat.complete(req).await.is_err());
        assert_eq!(chat.requests().len(), 3);
    }
}

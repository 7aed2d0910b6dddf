//! Cross-encoder reranking
//!
//! The reranker is chosen once at startup. With the `onnx` feature and a
//! model on disk, query/passage pairs are scored by a cross-encoder and
//! blended with the upstream score; otherwise results pass through in order.

use std::sync::Arc;

#[cfg(feature = "onnx")]
use ndarray::Array2;
#[cfg(feature = "onnx")]
use ort::{session::builder::GraphOptimizationLevel, session::Session, value::Tensor};
use parking_lot::Mutex;
#[cfg(feature = "onnx")]
use tokenizers::Tokenizer;
use turf_advisor_config::RerankerConfig;
use turf_advisor_core::ScoredResult;

use crate::RagError;

/// Reorders scored results. Synchronous: the caller runs it off the async
/// executor when the implementation does model inference.
pub trait Reranker: Send + Sync {
    fn rerank(&self, query: &str, results: Vec<ScoredResult>, top_k: usize) -> Vec<ScoredResult>;

    fn name(&self) -> &'static str;
}

/// Keeps the upstream order
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityReranker;

impl Reranker for IdentityReranker {
    fn rerank(&self, _query: &str, mut results: Vec<ScoredResult>, top_k: usize) -> Vec<ScoredResult> {
        results.truncate(top_k);
        results
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}

/// Relevance model over query/passage pairs, one score per passage
pub trait PairScorer: Send + Sync {
    fn score_pairs(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>, RagError>;
}

#[derive(Debug, Clone, Default)]
pub struct RerankerStats {
    pub batches: u64,
    pub passages: u64,
    pub failures: u64,
}

/// Blends model relevance with the upstream score
pub struct CrossEncoderReranker<S: PairScorer> {
    scorer: S,
    model_weight: f32,
    stats: Mutex<RerankerStats>,
}

impl<S: PairScorer> CrossEncoderReranker<S> {
    pub fn new(scorer: S, model_weight: f32) -> Self {
        Self {
            scorer,
            model_weight: model_weight.clamp(0.0, 1.0),
            stats: Mutex::new(RerankerStats::default()),
        }
    }

    pub fn stats(&self) -> RerankerStats {
        self.stats.lock().clone()
    }
}

impl<S: PairScorer> Reranker for CrossEncoderReranker<S> {
    fn rerank(&self, query: &str, mut results: Vec<ScoredResult>, top_k: usize) -> Vec<ScoredResult> {
        if results.is_empty() {
            return results;
        }
        let passages: Vec<&str> = results.iter().map(|r| r.text()).collect();
        let model_scores = match self.scorer.score_pairs(query, &passages) {
            Ok(scores) if scores.len() == results.len() => scores,
            Ok(scores) => {
                tracing::warn!(
                    expected = results.len(),
                    got = scores.len(),
                    "Reranker returned wrong number of scores, keeping upstream order"
                );
                self.stats.lock().failures += 1;
                results.truncate(top_k);
                return results;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Reranker failed, keeping upstream order");
                self.stats.lock().failures += 1;
                results.truncate(top_k);
                return results;
            }
        };

        {
            let mut stats = self.stats.lock();
            stats.batches += 1;
            stats.passages += results.len() as u64;
        }

        let upstream: Vec<f32> = results.iter().map(|r| r.score).collect();
        let blended = blend_scores(&model_scores, &upstream, self.model_weight);
        for (result, score) in results.iter_mut().zip(blended) {
            result.score = score;
        }
        results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        results.truncate(top_k);
        results
    }

    fn name(&self) -> &'static str {
        "cross_encoder"
    }
}

fn min_max(values: &[f32]) -> Vec<f32> {
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    values
        .iter()
        .map(|v| if range > f32::EPSILON { (v - min) / range } else { 1.0 })
        .collect()
}

/// `w * model + (1 - w) * upstream`, both min-max normalised over the batch
pub fn blend_scores(model: &[f32], upstream: &[f32], model_weight: f32) -> Vec<f32> {
    min_max(model)
        .into_iter()
        .zip(min_max(upstream))
        .map(|(m, u)| model_weight * m + (1.0 - model_weight) * u)
        .collect()
}

/// Cross-encoder loaded from an ONNX file
#[cfg(feature = "onnx")]
pub struct OnnxPairScorer {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_seq_len: usize,
}

#[cfg(feature = "onnx")]
impl OnnxPairScorer {
    pub fn load(config: &RerankerConfig) -> Result<Self, RagError> {
        let session = Session::builder()
            .map_err(|e| RagError::Model(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| RagError::Model(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e| RagError::Model(e.to_string()))?
            .commit_from_file(&config.model_path)
            .map_err(|e| RagError::Model(e.to_string()))?;

        let tokenizer = Tokenizer::from_file(&config.tokenizer_path)
            .map_err(|e| RagError::Model(e.to_string()))?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            max_seq_len: config.max_seq_len,
        })
    }

    fn score_pair(&self, query: &str, passage: &str) -> Result<f32, RagError> {
        let encoding = self
            .tokenizer
            .encode((query, passage), true)
            .map_err(|e| RagError::Reranker(e.to_string()))?;

        let ids: Vec<i64> = encoding
            .get_ids()
            .iter()
            .take(self.max_seq_len)
            .map(|&id| id as i64)
            .collect();
        let len = ids.len();
        let input_ids = Array2::from_shape_vec((1, len), ids)
            .map_err(|e| RagError::Reranker(e.to_string()))?;
        let attention = Array2::from_shape_vec((1, len), vec![1i64; len])
            .map_err(|e| RagError::Reranker(e.to_string()))?;

        let input_ids = Tensor::from_array(input_ids).map_err(|e| RagError::Model(e.to_string()))?;
        let attention = Tensor::from_array(attention).map_err(|e| RagError::Model(e.to_string()))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention,
            ])
            .map_err(|e| RagError::Model(e.to_string()))?;

        let (shape, logits) = outputs
            .get("logits")
            .ok_or_else(|| RagError::Model("Missing logits output".to_string()))?
            .try_extract_tensor::<f32>()
            .map_err(|e| RagError::Model(e.to_string()))?;
        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        let view = ndarray::ArrayViewD::from_shape(dims, logits)
            .map_err(|e| RagError::Model(e.to_string()))?;
        Ok(relevance(&view.iter().copied().collect::<Vec<_>>()))
    }
}

#[cfg(feature = "onnx")]
impl PairScorer for OnnxPairScorer {
    fn score_pairs(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>, RagError> {
        passages.iter().map(|p| self.score_pair(query, p)).collect()
    }
}

/// Probability of the "relevant" class: softmax over two logits, sigmoid
/// over one
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
fn relevance(logits: &[f32]) -> f32 {
    match logits.len() {
        0 => 0.0,
        1 => 1.0 / (1.0 + (-logits[0]).exp()),
        _ => {
            let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let exp_sum: f32 = logits.iter().map(|&x| (x - max).exp()).sum();
            (logits[1] - max).exp() / exp_sum
        }
    }
}

/// Reranker for the configured deployment; falls back to [`IdentityReranker`]
/// when disabled or when the model cannot be loaded
pub fn build_reranker(config: &RerankerConfig) -> Arc<dyn Reranker> {
    if !config.enabled {
        return Arc::new(IdentityReranker);
    }

    #[cfg(feature = "onnx")]
    {
        match OnnxPairScorer::load(config) {
            Ok(scorer) => {
                tracing::info!(model = %config.model_path, "Cross-encoder reranker loaded");
                return Arc::new(CrossEncoderReranker::new(scorer, config.model_weight));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cross-encoder unavailable, reranking disabled");
            }
        }
    }

    #[cfg(not(feature = "onnx"))]
    tracing::warn!("Reranker enabled but built without the onnx feature, reranking disabled");

    Arc::new(IdentityReranker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use turf_advisor_core::ChunkMetadata;

    fn result(id: &str, score: f32, text: &str) -> ScoredResult {
        ScoredResult {
            id: id.into(),
            score,
            vector_score: score,
            keyword_score: 0.0,
            rrf_score: 0.0,
            metadata: ChunkMetadata {
                text: text.into(),
                ..Default::default()
            },
        }
    }

    struct OverlapScorer;

    impl PairScorer for OverlapScorer {
        fn score_pairs(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>, RagError> {
            let q = query.to_lowercase();
            Ok(passages
                .iter()
                .map(|p| {
                    p.to_lowercase()
                        .split_whitespace()
                        .filter(|w| q.contains(w))
                        .count() as f32
                })
                .collect())
        }
    }

    struct BrokenScorer;

    impl PairScorer for BrokenScorer {
        fn score_pairs(&self, _query: &str, _passages: &[&str]) -> Result<Vec<f32>, RagError> {
            Err(RagError::Model("no session".into()))
        }
    }

    #[test]
    fn test_identity_truncates() {
        let out = IdentityReranker.rerank(
            "q",
            vec![result("a", 2.0, ""), result("b", 1.0, ""), result("c", 0.5, "")],
            2,
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "a");
    }

    #[test]
    fn test_cross_encoder_reorders() {
        let reranker = CrossEncoderReranker::new(OverlapScorer, 0.7);
        let results = vec![
            result("loose", 1.0, "general turf notes"),
            result("tight", 0.9, "dollar spot fungicide rotation"),
        ];
        let out = reranker.rerank("dollar spot fungicide", results, 20);
        assert_eq!(out[0].id, "tight");
        assert_eq!(reranker.stats().passages, 2);
    }

    #[test]
    fn test_scorer_failure_keeps_order() {
        let reranker = CrossEncoderReranker::new(BrokenScorer, 0.7);
        let out = reranker.rerank(
            "q",
            vec![result("a", 2.0, "x"), result("b", 1.0, "y")],
            20,
        );
        assert_eq!(out[0].id, "a");
        assert_eq!(reranker.stats().failures, 1);
    }

    #[test]
    fn test_blend_weights() {
        let blended = blend_scores(&[0.0, 1.0], &[1.0, 0.0], 0.7);
        assert!((blended[0] - 0.3).abs() < 1e-6);
        assert!((blended[1] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_relevance_from_logits() {
        assert!((relevance(&[0.0]) - 0.5).abs() < 1e-6);
        assert!(relevance(&[-2.0, 2.0]) > 0.9);
        assert_eq!(relevance(&[]), 0.0);
    }

    #[test]
    fn test_disabled_config_is_identity() {
        let reranker = build_reranker(&RerankerConfig::default());
        assert_eq!(reranker.name(), "identity");
    }
}

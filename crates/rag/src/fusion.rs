//! Reciprocal rank fusion of the vector ranking and a BM25 ranking

use std::collections::HashMap;

use turf_advisor_core::Match;

use crate::bm25::{Bm25Index, Bm25Params};

/// Fusion parameters
#[derive(Debug, Clone, Copy)]
pub struct RrfConfig {
    /// Smoothing constant; larger values flatten rank differences
    pub k: f32,
    /// Weight of the vector list, BM25 gets `1 - vector_weight`
    pub vector_weight: f32,
}

impl Default for RrfConfig {
    fn default() -> Self {
        Self {
            k: 60.0,
            vector_weight: 0.6,
        }
    }
}

/// A deduplicated match with its fused score
#[derive(Debug, Clone)]
pub struct FusedMatch {
    pub matched: Match,
    pub rrf_score: f32,
    /// 1-based rank in the BM25 list, if the chunk was ranked
    pub bm25_rank: Option<usize>,
}

/// Weighted RRF: `w / (k + rank)` summed over the lists an id appears in.
///
/// Ranks are 1-based. Only ids in `vector_ranked` are scored; a BM25-only
/// id has no chunk to return.
pub fn reciprocal_rank_fusion(
    vector_ranked: &[&str],
    bm25_ranked: &[&str],
    config: RrfConfig,
) -> HashMap<String, f32> {
    let mut scores: HashMap<String, f32> = HashMap::new();

    for (i, id) in vector_ranked.iter().enumerate() {
        let contribution = config.vector_weight / (config.k + i as f32 + 1.0);
        scores
            .entry(id.to_string())
            .and_modify(|s| *s += contribution)
            .or_insert(contribution);
    }

    for (i, id) in bm25_ranked.iter().enumerate() {
        if let Some(score) = scores.get_mut(*id) {
            *score += (1.0 - config.vector_weight) / (config.k + i as f32 + 1.0);
        }
    }

    scores
}

/// Keep the best-scoring copy of every id, ordered by vector score
pub fn dedup_by_id(matches: impl IntoIterator<Item = Match>) -> Vec<Match> {
    let mut best: HashMap<String, Match> = HashMap::new();
    for m in matches {
        match best.get(&m.id) {
            Some(existing) if existing.score >= m.score => {}
            _ => {
                best.insert(m.id.clone(), m);
            }
        }
    }
    let mut out: Vec<Match> = best.into_values().collect();
    out.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    out
}

/// Rerank vector matches with BM25 over `"{source} {text}"` and fuse the two
/// rankings. Returns at most `top_k` matches, best fused score first.
pub fn hybrid_rerank(
    query: &str,
    matches: Vec<Match>,
    top_k: usize,
    bm25: Bm25Params,
    rrf: RrfConfig,
) -> Vec<FusedMatch> {
    let matches = dedup_by_id(matches);
    if matches.is_empty() {
        return Vec::new();
    }

    let docs: Vec<String> = matches
        .iter()
        .map(|m| format!("{} {}", m.metadata.source, m.metadata.text))
        .collect();
    let index = Bm25Index::fit(docs.iter().map(String::as_str), bm25);
    let bm25_hits = index.search(query, top_k);

    let vector_ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
    let bm25_ids: Vec<&str> = bm25_hits
        .iter()
        .map(|(i, _)| matches[*i].id.as_str())
        .collect();
    let bm25_rank: HashMap<&str, usize> = bm25_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i + 1))
        .collect();
    let fused = reciprocal_rank_fusion(&vector_ids, &bm25_ids, rrf);

    let mut out: Vec<FusedMatch> = matches
        .iter()
        .map(|m| FusedMatch {
            rrf_score: fused.get(&m.id).copied().unwrap_or(0.0),
            bm25_rank: bm25_rank.get(m.id.as_str()).copied(),
            matched: m.clone(),
        })
        .collect();
    out.sort_by(|a, b| {
        b.rrf_score
            .total_cmp(&a.rrf_score)
            .then_with(|| b.matched.score.total_cmp(&a.matched.score))
            .then_with(|| a.matched.id.cmp(&b.matched.id))
    });
    out.truncate(top_k);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use turf_advisor_core::ChunkMetadata;

    fn m(id: &str, score: f32, source: &str, text: &str) -> Match {
        Match {
            id: id.into(),
            score,
            metadata: ChunkMetadata {
                source: source.into(),
                text: text.into(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_rrf_monotone_in_rank() {
        let scores = reciprocal_rank_fusion(&["a", "b", "c"], &[], RrfConfig::default());
        assert!(scores["a"] > scores["b"]);
        assert!(scores["b"] > scores["c"]);
    }

    #[test]
    fn test_rrf_bm25_agreement_lifts_score() {
        let cfg = RrfConfig::default();
        let scores = reciprocal_rank_fusion(&["a", "b"], &["b"], cfg);
        assert!(scores["b"] > scores["a"]);
        let expected_b = 0.6 / 62.0 + 0.4 / 61.0;
        assert!((scores["b"] - expected_b).abs() < 1e-6);
    }

    #[test]
    fn test_rrf_ignores_bm25_only_ids() {
        let scores = reciprocal_rank_fusion(&["a"], &["z"], RrfConfig::default());
        assert!(!scores.contains_key("z"));
    }

    #[test]
    fn test_dedup_keeps_highest() {
        let out = dedup_by_id(vec![m("a", 0.3, "s", "t"), m("a", 0.9, "s", "t"), m("b", 0.5, "s", "t")]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "a");
        assert!((out[0].score - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_hybrid_rerank_prefers_keyword_match_on_ties() {
        let matches = vec![
            m("generic", 0.80, "Turf Notes", "general turf maintenance tips"),
            m("exact", 0.79, "Dollar Spot Guide", "dollar spot fungicide rates"),
        ];
        let out = hybrid_rerank(
            "dollar spot fungicide",
            matches,
            50,
            Bm25Params::default(),
            RrfConfig::default(),
        );
        assert_eq!(out[0].matched.id, "exact");
        assert_eq!(out[0].bm25_rank, Some(1));
        assert_eq!(out[1].bm25_rank, None);
    }
}

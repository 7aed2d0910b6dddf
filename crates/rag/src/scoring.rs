//! Hybrid scoring and the boost/penalty chain
//!
//! Scoring is a pure function of the candidate matches and the analysed
//! question: no I/O, no randomness, and ties are broken by chunk id so the
//! same inputs always produce the same order.

use std::collections::HashSet;

use turf_advisor_config::constants::{geography, grasses, keywords, products, sources};
use turf_advisor_config::vocabulary::{first_synonym_in, is_stop_word};
use turf_advisor_config::{RetrievalConfig, ScoringConfig};
use turf_advisor_core::{ChunkMetadata, Freshness, Match, ProductNeed, Question, ScoredResult};

use crate::bm25::Bm25Params;
use crate::fusion::{hybrid_rerank, RrfConfig};
use crate::text::{contains_any, first_in, head, tokenize};

const BOOST_TERMS: &[&str] = &[
    "heritage", "lexicon", "xzemplar", "headway", "medallion", "daconil", "tenacity",
    "barricade", "dimension", "specticle", "acelepryn", "primo", "azoxystrobin",
    "propiconazole", "chlorothalonil", "fluxapyroxad", "mesotrione", "prodiamine",
    "chlorantraniliprole", "frac", "frac11", "frac3", "frac7", "fracm5",
];

const RATE_TERMS: &[&str] = &[
    "oz", "ounce", "lb", "pound", "gallon", "gal", "rate", "dosage", "application",
];

const PHRASES: &[&str] = &[
    "dollar spot", "brown patch", "fairy ring", "summer patch", "gray leaf spot",
    "spring dead spot", "snow mold", "take-all", "banner maxx", "primo maxx", "drive xlr8",
    "poa annua",
];

fn query_keywords(question: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(question)
        .into_iter()
        .filter(|t| t.chars().count() > 2 && !is_stop_word(t))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Term-frequency relevance of `text` to `question`, in `[0, 1]`.
///
/// Product, disease and rate vocabulary weigh more; the result blends the
/// length-normalised weight with the share of query keywords present.
pub fn keyword_score(text: &str, question: &str) -> f32 {
    let keywords = query_keywords(question);
    if keywords.is_empty() {
        return 0.0;
    }
    let tokens = tokenize(text);

    let mut score = 0.0f32;
    let mut matched = 0usize;
    for kw in &keywords {
        let count = tokens.iter().filter(|t| *t == kw).count();
        if count == 0 {
            continue;
        }
        matched += 1;
        let mut weight = 1.0 + (count as f32).ln();
        if BOOST_TERMS.contains(&kw.as_str()) {
            weight *= 2.0;
        } else if RATE_TERMS.contains(&kw.as_str()) {
            weight *= 1.5;
        }
        score += weight;
    }

    let normalized = score / keywords.len() as f32;
    let coverage = matched as f32 / keywords.len() as f32;
    (0.6 * (normalized / 3.0).min(1.0) + 0.4 * coverage).min(1.0)
}

/// Share of the question's known multi-word phrases that also occur in `text`
pub fn phrase_match_score(text: &str, question: &str) -> f32 {
    let text = text.to_lowercase();
    let question = question.to_lowercase();
    let asked: Vec<&str> = PHRASES
        .iter()
        .copied()
        .filter(|p| question.contains(p))
        .collect();
    if asked.is_empty() {
        return 0.0;
    }
    let found = asked.iter().filter(|p| text.contains(*p)).count();
    found as f32 / asked.len() as f32
}

/// Keyword score, blended with the phrase score when any phrase matched
pub fn combined_relevance_score(text: &str, question: &str) -> f32 {
    let kw = keyword_score(text, question);
    let phrase = phrase_match_score(text, question);
    if phrase > 0.0 {
        0.7 * kw + 0.3 * phrase
    } else {
        kw
    }
}

/// Multiplier for source names that echo the question's product or problem
pub fn source_boost(source: &str, question: &str, scoring: &ScoringConfig) -> f32 {
    let source = source.to_lowercase();
    let question = question.to_lowercase();
    let mut boost = 1.0;
    if let Some(term) = first_synonym_in(&question) {
        if source.contains(term) {
            boost *= scoring.synonym_in_source;
        }
    }
    if let Some(term) = first_in(&question, sources::PROBLEM_TERMS) {
        if source.contains(term) {
            boost *= scoring.problem_in_source;
        }
    }
    boost
}

/// Applies fusion and the boost/penalty chain to retrieved matches
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    retrieval: RetrievalConfig,
    scoring: ScoringConfig,
}

impl Scorer {
    pub fn new(retrieval: RetrievalConfig, scoring: ScoringConfig) -> Self {
        Self { retrieval, scoring }
    }

    /// Score and order `matches` for `question`, best first.
    ///
    /// Duplicated ids across channels collapse to the copy with the highest
    /// vector score. At most `bm25_top_k` results are returned.
    pub fn score_results(&self, matches: Vec<Match>, question: &Question) -> Vec<ScoredResult> {
        let q = question.rewritten.to_lowercase();
        let fused = hybrid_rerank(
            &q,
            matches,
            self.retrieval.bm25_top_k,
            Bm25Params {
                k1: self.retrieval.bm25_k1,
                b: self.retrieval.bm25_b,
            },
            RrfConfig {
                k: self.retrieval.rrf_k,
                vector_weight: self.retrieval.vector_rank_weight,
            },
        );

        let mut results: Vec<ScoredResult> = fused
            .into_iter()
            .map(|f| {
                let meta = &f.matched.metadata;
                let relevance = combined_relevance_score(&meta.text, &q);
                let boost = source_boost(&meta.source, &q, &self.scoring);
                let base = if f.rrf_score > 0.0 {
                    f.rrf_score * self.retrieval.rrf_scale * boost
                } else {
                    (self.retrieval.vector_score_weight * f.matched.score
                        + self.retrieval.keyword_score_weight * relevance)
                        * boost
                };
                let score = base * self.adjustment(meta, question, &q);
                ScoredResult {
                    id: f.matched.id,
                    score,
                    vector_score: f.matched.score,
                    keyword_score: relevance,
                    rrf_score: f.rrf_score,
                    metadata: f.matched.metadata,
                }
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        results
    }

    /// Product of every boost and penalty that applies to one chunk
    fn adjustment(&self, meta: &ChunkMetadata, question: &Question, q: &str) -> f32 {
        let s = &self.scoring;
        let source = meta.source_lower();
        let text = meta.text.to_lowercase();
        let mut factor = 1.0f32;

        if question.product_need == Some(ProductNeed::Fungicide) {
            factor *= self.fungicide_source_factor(meta, &source, q);
        }

        if let Some(grass) = question.grass_type {
            let name = grass.as_str();
            let doc_name = meta
                .extra
                .get("document_name")
                .map(|d| d.to_lowercase())
                .unwrap_or_default();
            if text.contains(name) || source.contains(name) || doc_name.contains(name) {
                factor *= s.grass_match;
            }
        }

        let state_hit = match question.state.as_deref() {
            Some(state) => source.contains(state),
            None => geography::US_STATES
                .iter()
                .any(|state| q.contains(state) && source.contains(state)),
        };
        if state_hit {
            factor *= s.state_match;
        }

        if let Some(region) = question.region {
            if text.contains(region.as_str()) || source.contains(region.as_str()) {
                factor *= s.region_match;
            }
        }

        if contains_any(q, keywords::WATER)
            && (contains_any(&source, keywords::WATER) || contains_any(head(&text, 500), keywords::WATER))
        {
            factor *= s.water_match;
        }

        if let Some(grass) = question.grass_type {
            let opening = head(&text, 200);
            if grasses::SCORED
                .iter()
                .filter(|g| **g != grass.as_str())
                .any(|g| opening.contains(g))
            {
                factor *= s.wrong_grass;
            }
        }

        if meta.country.as_deref() == Some("Canada") {
            factor *= s.foreign_product;
        }

        if let Some(need) = question.product_need {
            if self.has_wrong_category_product(need, &text, &source) {
                factor *= s.wrong_product_type;
            }
            let wrong_keywords = match need {
                ProductNeed::Fungicide => keywords::WRONG_TYPE_FOR_FUNGICIDE,
                ProductNeed::Herbicide => keywords::WRONG_TYPE_FOR_HERBICIDE,
                ProductNeed::Insecticide => keywords::WRONG_TYPE_FOR_INSECTICIDE,
                ProductNeed::Pgr => &[],
            };
            if contains_any(head(&text, 300), wrong_keywords) {
                factor *= s.wrong_type_keyword;
            }
        }

        factor
            * match meta.freshness {
                Freshness::Stale => s.stale,
                Freshness::VeryStale => s.very_stale,
                Freshness::Fresh | Freshness::Aging => 1.0,
            }
    }

    fn fungicide_source_factor(&self, meta: &ChunkMetadata, source: &str, q: &str) -> f32 {
        let s = &self.scoring;
        let mut factor = 1.0;
        if contains_any(source, sources::HIGH_VALUE_FUNGICIDE) {
            factor *= s.high_value_fungicide;
        }
        let doc_type = meta.doc_type_or_default().to_lowercase();
        if doc_type.contains("label") {
            factor *= s.product_label;
        } else if doc_type.contains("solution") || source.contains("solution") || source.contains("sheet") {
            factor *= s.solution_sheet;
        }
        if contains_any(source, sources::LOW_QUALITY) {
            factor *= s.low_quality_source;
        }
        let mut seen = HashSet::new();
        for word in tokenize(q) {
            if word.chars().count() > 4 && seen.insert(word.clone()) && source.contains(word.as_str()) {
                factor *= s.keyword_in_source;
            }
        }
        factor
    }

    /// Names a product from a category other than `need` (the first other
    /// category that matches decides)
    fn has_wrong_category_product(&self, need: ProductNeed, text: &str, source: &str) -> bool {
        let (first, second) = match need {
            ProductNeed::Fungicide => (products::HERBICIDES, products::INSECTICIDES),
            ProductNeed::Herbicide => (products::FUNGICIDES, products::INSECTICIDES),
            ProductNeed::Insecticide => (products::FUNGICIDES, products::HERBICIDES),
            ProductNeed::Pgr => return false,
        };
        [first, second]
            .iter()
            .any(|names| names.iter().any(|n| text.contains(n) || source.contains(n)))
    }
}

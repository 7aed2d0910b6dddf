//! Topic safety filter
//!
//! Drops chunks that would put the wrong product category in front of the
//! generator: herbicide labels for a disease question, pesticide material
//! for an irrigation or equipment question.

use turf_advisor_config::constants::products;
use turf_advisor_core::{ProductNeed, ScoredResult, Topic};

use crate::text::head;

fn names_any(haystack: &str, names: &[&str]) -> bool {
    names.iter().any(|n| haystack.contains(n))
}

fn excluded(result: &ScoredResult, topic: Option<Topic>, need: Option<ProductNeed>) -> bool {
    let source = result.metadata.source_lower();

    if topic.map_or(false, |t| t.is_non_chemical())
        && (names_any(&source, products::HERBICIDES) || names_any(&source, products::FUNGICIDES))
    {
        return true;
    }

    let opening = result.text().to_lowercase();
    let opening = head(&opening, 300);
    match need {
        Some(ProductNeed::Fungicide) => {
            names_any(&source, products::HERBICIDES) || names_any(opening, products::HERBICIDES)
        }
        Some(ProductNeed::Herbicide) => {
            names_any(&source, products::FUNGICIDES) || names_any(opening, products::FUNGICIDES)
        }
        _ => false,
    }
}

/// Remove off-topic product material and keep at most `limit` results.
///
/// Order is preserved. The filter never adds results.
pub fn safety_filter(
    results: Vec<ScoredResult>,
    topic: Option<Topic>,
    product_need: Option<ProductNeed>,
    limit: usize,
) -> Vec<ScoredResult> {
    let before = results.len();
    let kept: Vec<ScoredResult> = results
        .into_iter()
        .filter(|r| !excluded(r, topic, product_need))
        .take(limit)
        .collect();
    tracing::debug!(
        before,
        after = kept.len(),
        topic = topic.map(|t| t.as_str()),
        "Safety filter applied"
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use turf_advisor_core::ChunkMetadata;

    fn result(id: &str, source: &str, text: &str) -> ScoredResult {
        ScoredResult {
            id: id.into(),
            score: 1.0,
            vector_score: 0.8,
            keyword_score: 0.0,
            rrf_score: 0.0,
            metadata: ChunkMetadata {
                source: source.into(),
                text: text.into(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_fungicide_need_drops_herbicide_sources() {
        let results = vec![
            result("1", "Tenacity Herbicide Label", "apply for crabgrass"),
            result("2", "Dollar Spot Guide", "use Banner Maxx preventively"),
            result("3", "Weed Notes", "Specticle provides residual control"),
        ];
        let kept = safety_filter(results, Some(Topic::Disease), Some(ProductNeed::Fungicide), 20);
        let ids: Vec<_> = kept.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2"]);
    }

    #[test]
    fn test_herbicide_need_drops_fungicide_text() {
        let results = vec![
            result("1", "Crabgrass Control", "prodiamine in early spring"),
            result("2", "Spray Program", "heritage and daconil rotation"),
        ];
        let kept = safety_filter(results, Some(Topic::Chemical), Some(ProductNeed::Herbicide), 20);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "1");
    }

    #[test]
    fn test_irrigation_topic_drops_pesticide_sources() {
        let results = vec![
            result("1", "Heritage Label", "water in after application"),
            result("2", "Irrigation Audit Manual", "catch can test"),
        ];
        let kept = safety_filter(results, Some(Topic::Irrigation), None, 20);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "2");
    }

    #[test]
    fn test_limit_and_order_preserved() {
        let results: Vec<_> = (0..30)
            .map(|i| result(&i.to_string(), "Cultural Notes", "mowing height"))
            .collect();
        let kept = safety_filter(results, Some(Topic::Cultural), None, 20);
        assert_eq!(kept.len(), 20);
        assert_eq!(kept[0].id, "0");
        assert_eq!(kept[19].id, "19");
    }
}

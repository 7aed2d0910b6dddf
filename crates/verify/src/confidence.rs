//! Confidence scoring
//!
//! `score = adjust(base) × (1 − hallucination/100) × (1 − validation/100)`,
//! clamped to 0-100. `base` rewards source quality, specific rates and
//! product names, and answer length.

use once_cell::sync::Lazy;
use regex::Regex;
use turf_advisor_config::constants::{products, sources};
use turf_advisor_core::{GroundingReport, Source};

use crate::grounding::grounding_adjustment;
use crate::text::contains_any;

/// Base score when nothing was retrieved
const NO_SOURCE_BASE: f32 = 35.0;
const STARTING_BASE: f32 = 55.0;
const MIN_BASE: f32 = 25.0;
const RATE_QUESTION_PENALTY: f32 = 10.0;

const RATE_UNITS: &[&str] = &[
    "oz", "lb", "fl oz", "pint", "gallon", "acre", "1000 sq ft", "per 1000", "/1000", "/acre",
    "ppm", "percent", "%",
];
const RATE_QUESTION_WORDS: &[&str] =
    &["rate", "how much", "dosage", "application rate", "oz per", "lb per"];

static AMOUNT_WITH_UNIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\.?\d*\s*(oz|lb|gal|pint|acre|sq ft)").expect("valid regex"));

/// Weight of one source: 1.3 authoritative, 1.1 reputable, 0.8 otherwise
pub fn source_quality(source: &Source) -> f32 {
    let name = source.name.to_lowercase();
    let kind = source.source_type.to_lowercase();
    let url = source.url.as_deref().unwrap_or_default().to_lowercase();

    if sources::AUTHORITATIVE
        .iter()
        .any(|k| name.contains(k) || kind.contains(k) || url.contains(k))
    {
        1.3
    } else if sources::REPUTABLE.iter().any(|k| name.contains(k) || kind.contains(k)) {
        1.1
    } else {
        0.8
    }
}

fn names_product(answer: &str) -> bool {
    [products::FUNGICIDES, products::HERBICIDES, products::INSECTICIDES, products::PGRS]
        .iter()
        .any(|list| contains_any(answer, list))
}

/// Pre-verification score from evidence quality and answer specificity
pub fn base_confidence(sources: &[Source], answer: &str, question: &str) -> f32 {
    if sources.is_empty() {
        return NO_SOURCE_BASE;
    }
    let answer_lower = answer.to_lowercase();
    let question_lower = question.to_lowercase();
    let mut score = STARTING_BASE;

    let quality: f32 = sources.iter().map(source_quality).sum();
    score += match quality {
        q if q >= 4.0 => 20.0,
        q if q >= 3.0 => 16.0,
        q if q >= 2.0 => 12.0,
        q if q >= 1.0 => 8.0,
        _ => 4.0,
    };

    let has_rates = contains_any(&answer_lower, RATE_UNITS);
    let has_amounts = AMOUNT_WITH_UNIT.is_match(&answer_lower);
    score += match (has_rates, has_amounts) {
        (true, true) => 12.0,
        (true, false) => 8.0,
        (false, true) => 5.0,
        (false, false) => 0.0,
    };
    if names_product(&answer_lower) {
        score += 5.0;
    }

    let chars = answer.chars().count();
    score += match chars {
        n if n > 400 => 8.0,
        n if n > 250 => 5.0,
        n if n > 100 => 3.0,
        _ => 0.0,
    };

    if contains_any(&question_lower, RATE_QUESTION_WORDS) && !has_rates {
        score -= RATE_QUESTION_PENALTY;
    }

    score.clamp(MIN_BASE, 100.0)
}

/// Combine the base score with the verification results
pub fn combine(
    base: f32,
    grounding: &GroundingReport,
    hallucination_penalty: f32,
    validation_penalty: f32,
) -> f32 {
    let adjusted = grounding_adjustment(base, grounding);
    let h = 1.0 - hallucination_penalty.clamp(0.0, 100.0) / 100.0;
    let v = 1.0 - validation_penalty.clamp(0.0, 100.0) / 100.0;
    (adjusted * h * v).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, kind: &str, url: Option<&str>) -> Source {
        Source {
            number: 1,
            name: name.into(),
            url: url.map(str::to_string),
            source_type: kind.into(),
        }
    }

    #[test]
    fn test_source_quality_tiers() {
        assert_eq!(source_quality(&source("Heritage Label", "pdf", None)), 1.3);
        assert_eq!(source_quality(&source("Notes", "web", Some("https://turf.purdue.edu/x"))), 1.3);
        assert_eq!(source_quality(&source("Syngenta Tech Sheet", "pdf", None)), 1.1);
        assert_eq!(source_quality(&source("Forum post", "web", None)), 0.8);
    }

    #[test]
    fn test_base_rewards_specificity() {
        let sources = vec![
            source("Heritage Label", "label", None),
            source("Rutgers Extension", "web", None),
            source("Syngenta Tech Sheet", "pdf", None),
        ];
        let vague = base_confidence(&sources, "It depends on conditions.", "what should I do");
        let specific = base_confidence(
            &sources,
            "Apply Heritage at 0.2-0.4 oz per 1000 sq ft on a 14-21 day interval when night temperatures stay above 65°F.",
            "what should I do",
        );
        assert!(specific > vague);
        assert_eq!(base_confidence(&[], "anything", "q"), NO_SOURCE_BASE);
    }

    #[test]
    fn test_rate_question_without_rates_penalised() {
        let sources = vec![source("Heritage Label", "label", None)];
        let answer = "Heritage works well for brown patch on bentgrass greens.";
        let plain = base_confidence(&sources, answer, "is heritage good for brown patch");
        let rate = base_confidence(&sources, answer, "what is the heritage rate for brown patch");
        assert_eq!(plain - rate, RATE_QUESTION_PENALTY);
    }

    #[test]
    fn test_combine_bounds_and_order() {
        let grounded = GroundingReport {
            grounded: true,
            confidence: 0.9,
            unsupported_claims: vec![],
            issues: vec![],
            checked: true,
        };
        let clean = combine(90.0, &grounded, 0.0, 0.0);
        let penalised = combine(90.0, &grounded, 0.0, 8.0);
        assert!(penalised < clean);
        assert!(clean <= 100.0);
        assert_eq!(combine(100.0, &grounded, 500.0, 0.0), 0.0);
        assert!(combine(0.0, &GroundingReport::conservative("x"), 30.0, 25.0) >= 0.0);
    }
}

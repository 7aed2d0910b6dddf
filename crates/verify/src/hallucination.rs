//! Deterministic hallucination filter
//!
//! Runs after generation and flags:
//! - dated claims ("a 2024 study") whose year the retrieved text never mentions
//! - product-looking names that are neither indexed nor present in the context
//! - products recommended for the wrong pest category
//! - dangerous mixing advice not phrased as a warning

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use turf_advisor_core::{
    CheckReport, IssueKind, KnowledgeStore, ProductNeed, Severity, VerificationIssue,
};

use crate::text::{contains_any, positions, window};
use crate::CheckOutcome;

const TEMPORAL_PENALTY: f32 = 20.0;
const UNKNOWN_PRODUCT_PENALTY: f32 = 15.0;
const CATEGORY_PENALTY_EACH: f32 = 5.0;
const CATEGORY_PENALTY_CAP: f32 = 15.0;
const MIXING_PENALTY: f32 = 20.0;

static TEMPORAL: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(?:discovered|released|published|found|introduced|identified|developed|launched|announced)\s+in\s+(20[2-3]\d)",
        r"(?i)\bin\s+(20[2-3]\d),?\s+(?:researchers?|scientists?|a\s+(?:new|novel))",
        r"(?i)(?:new|novel|recent)\s+\w+\s+(?:discovered|found|identified)\s+in\s+(20[2-3]\d)",
        r"(?i)\ba\s+(20[2-3]\d)\s+(?:study|research|paper|publication|report|finding)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static PRODUCT_LIKE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b[A-Z][a-z]+(?:[A-Z][a-z]+)+\s+(?:Pro|Plus|Max|Ultra|XR|SC|WG|EW|G|TL)\s*\d*\b",
        r"\b[A-Z][a-z]+\s+[A-Z][a-z]+\s+\d{3,}\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

const DISEASE_TERMS: &[&str] = &[
    "dollar spot", "brown patch", "pythium", "anthracnose", "fairy ring", "disease", "fungus",
    "fungal", "leaf spot", "summer patch", "take-all", "snow mold", "gray leaf spot",
    "spring dead spot",
];
const WEED_TERMS: &[&str] = &[
    "crabgrass", "goosegrass", "poa annua", "weed", "nutsedge", "dandelion", "clover",
    "broadleaf", "pre-emergent", "post-emergent",
];
const INSECT_TERMS: &[&str] = &[
    "grub", "webworm", "chinch bug", "cutworm", "weevil", "insect", "billbug", "beetle",
    "mole cricket",
];
const RECOMMEND_WORDS: &[&str] = &["apply", "use", "recommend", "spray", "treat with", "consider"];

struct DangerousMix {
    chemicals: &'static [&'static str],
    partners: &'static [&'static str],
    issue: &'static str,
}

const DANGEROUS_MIXES: &[DangerousMix] = &[
    DangerousMix {
        chemicals: &["bleach", "chlorine"],
        partners: &["roundup", "glyphosate", "herbicide", "pesticide", "fungicide"],
        issue: "Mixing bleach with pesticides is extremely dangerous and can produce toxic gases.",
    },
    DangerousMix {
        chemicals: &["bleach", "chlorine"],
        partners: &["ammonia", "ammonium"],
        issue: "Mixing bleach with ammonia produces toxic chloramine gas.",
    },
];
const WARNING_PHRASES: &[&str] = &[
    "do not mix", "never mix", "dangerous", "toxic", "don't mix", "avoid mixing", "should not",
    "do not",
];

pub struct HallucinationFilter {
    knowledge: Arc<dyn KnowledgeStore>,
    cap: f32,
}

impl HallucinationFilter {
    pub fn new(knowledge: Arc<dyn KnowledgeStore>, cap: f32) -> Self {
        Self { knowledge, cap }
    }

    pub fn check(&self, answer: &str, question: &str, context: &str) -> CheckOutcome {
        let mut issues = Vec::new();
        let mut notes = Vec::new();
        let mut penalty = 0.0;

        let temporal = self.check_temporal(answer, context, &mut notes);
        if !temporal.is_empty() {
            penalty += TEMPORAL_PENALTY;
            issues.extend(temporal);
        }

        let unknown = self.check_unknown_products(answer, context);
        if !unknown.is_empty() {
            penalty += UNKNOWN_PRODUCT_PENALTY;
            issues.extend(unknown);
        }

        let category = self.check_categories(answer, question);
        if !category.is_empty() {
            penalty += (category.len() as f32 * CATEGORY_PENALTY_EACH).min(CATEGORY_PENALTY_CAP);
            for issue in &category {
                notes.push(format!("**Product check:** {}", issue.message));
            }
            issues.extend(category);
        }

        let mixing = check_mixing(answer);
        if !mixing.is_empty() {
            penalty += MIXING_PENALTY;
            issues.extend(mixing);
        }

        if !issues.is_empty() {
            tracing::info!(issues = issues.len(), penalty, "Hallucination filter flagged answer");
        }
        CheckOutcome {
            report: CheckReport {
                issues,
                penalty: penalty.min(self.cap),
            },
            notes,
        }
    }

    fn check_temporal(&self, answer: &str, context: &str, notes: &mut Vec<String>) -> Vec<VerificationIssue> {
        let context = context.to_lowercase();
        let mut issues = Vec::new();
        for pattern in TEMPORAL.iter() {
            for caps in pattern.captures_iter(answer) {
                let (Some(claim), Some(year)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let year = year.as_str();
                if context.contains(year) {
                    continue;
                }
                issues.push(VerificationIssue::new(
                    IssueKind::UnsupportedTemporal,
                    Severity::Medium,
                    format!(
                        "Temporal claim not supported by sources: '{}'. No retrieved documents reference events in {}.",
                        claim.as_str(),
                        year
                    ),
                ));
                let note = format!(
                    "**Verification Note:** I could not verify the claim about events in {} from the available \
                     sources. Please check recent university extension publications for confirmed information.",
                    year
                );
                if !notes.contains(&note) {
                    notes.push(note);
                }
            }
        }
        issues
    }

    fn check_unknown_products(&self, answer: &str, context: &str) -> Vec<VerificationIssue> {
        let context = context.to_lowercase();
        let mut seen: Vec<String> = Vec::new();
        let mut issues = Vec::new();
        for pattern in PRODUCT_LIKE.iter() {
            for m in pattern.find_iter(answer) {
                let name = m.as_str().trim().to_string();
                let lower = name.to_lowercase();
                if seen.contains(&lower) {
                    continue;
                }
                seen.push(lower.clone());
                let first_word = lower.split_whitespace().next().unwrap_or(&lower);
                let known = self.knowledge.is_known_product(&lower)
                    || self.knowledge.is_known_product(first_word);
                if known || context.contains(&lower) {
                    continue;
                }
                issues.push(VerificationIssue::new(
                    IssueKind::UnknownProduct,
                    Severity::High,
                    format!(
                        "Unrecognized product: '{}' is not in the verified product database or the retrieved sources.",
                        name
                    ),
                ));
            }
        }
        issues
    }

    fn check_categories(&self, answer: &str, question: &str) -> Vec<VerificationIssue> {
        let question = question.to_lowercase();
        let answer_lower = answer.to_lowercase();
        let asks_disease = contains_any(&question, DISEASE_TERMS);
        let asks_weeds = contains_any(&question, WEED_TERMS);
        let asks_insects = contains_any(&question, INSECT_TERMS);
        if !(asks_disease || asks_weeds || asks_insects) {
            return Vec::new();
        }

        let mut issues = Vec::new();
        for product in self.knowledge.products_in(answer) {
            let wrong_for = match product.category {
                ProductNeed::Herbicide | ProductNeed::Insecticide if asks_disease && !asks_weeds && !asks_insects => {
                    Some("disease")
                }
                ProductNeed::Fungicide | ProductNeed::Insecticide if asks_weeds && !asks_disease && !asks_insects => {
                    Some("weed")
                }
                ProductNeed::Fungicide | ProductNeed::Herbicide if asks_insects && !asks_disease && !asks_weeds => {
                    Some("insect")
                }
                _ => None,
            };
            let Some(problem) = wrong_for else {
                continue;
            };
            let recommended = product.names().iter().any(|name| {
                positions(&answer_lower, name)
                    .into_iter()
                    .any(|pos| contains_any(window(&answer_lower, pos, pos + name.len(), 60), RECOMMEND_WORDS))
            });
            if recommended {
                issues.push(VerificationIssue::new(
                    IssueKind::ProductCategory,
                    Severity::High,
                    format!(
                        "{} is {} {}, not a {} control product.",
                        product.display_name(),
                        article(product.category.as_str()),
                        product.category.as_str(),
                        problem
                    ),
                ));
            }
        }
        issues
    }
}

fn article(word: &str) -> &'static str {
    if word.starts_with(&['a', 'e', 'i', 'o', 'u'][..]) {
        "an"
    } else {
        "a"
    }
}

fn check_mixing(answer: &str) -> Vec<VerificationIssue> {
    let lower = answer.to_lowercase();
    if contains_any(&lower, WARNING_PHRASES) {
        return Vec::new();
    }
    DANGEROUS_MIXES
        .iter()
        .filter(|mix| contains_any(&lower, mix.chemicals) && contains_any(&lower, mix.partners))
        .map(|mix| VerificationIssue::new(IssueKind::DangerousMixing, Severity::High, mix.issue))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use turf_advisor_core::testing::StaticKnowledge;
    use turf_advisor_core::ProductFact;

    fn product(ai: &str, trade: &str, category: ProductNeed) -> ProductFact {
        ProductFact {
            active_ingredient: ai.into(),
            category,
            trade_names: vec![trade.into()],
            moa_code: None,
            rates: BTreeMap::new(),
            targets: vec![],
        }
    }

    fn filter() -> HallucinationFilter {
        let knowledge = StaticKnowledge {
            products: vec![
                product("azoxystrobin", "Heritage", ProductNeed::Fungicide),
                product("chlorantraniliprole", "Acelepryn", ProductNeed::Insecticide),
                product("prodiamine", "Barricade", ProductNeed::Herbicide),
            ],
            diseases: vec![],
        };
        HallucinationFilter::new(Arc::new(knowledge), 30.0)
    }

    #[test]
    fn test_clean_answer() {
        let out = filter().check(
            "Apply Heritage at 0.2-0.4 oz/1000 sq ft for brown patch.",
            "brown patch control",
            "Heritage label: 0.2-0.4 oz/1000 sq ft",
        );
        assert!(out.report.is_clean());
        assert_eq!(out.report.penalty, 0.0);
    }

    #[test]
    fn test_unsupported_year() {
        let f = filter();
        let out = f.check("A 2025 study found a new strain of dollar spot.", "dollar spot", "no dates here");
        assert_eq!(out.report.issues[0].kind, IssueKind::UnsupportedTemporal);
        assert_eq!(out.report.penalty, TEMPORAL_PENALTY);
        assert_eq!(out.notes.len(), 1);

        let out = f.check("A 2025 study found a new strain of dollar spot.", "dollar spot", "published 2025");
        assert!(out.report.is_clean());
    }

    #[test]
    fn test_unknown_product_unless_in_context() {
        let f = filter();
        let answer = "For dollar spot try TurfGuard Pro 500 on a 14 day interval.";
        let out = f.check(answer, "dollar spot", "Heritage label");
        assert_eq!(out.report.issues[0].kind, IssueKind::UnknownProduct);

        let out = f.check(answer, "dollar spot", "TurfGuard Pro 500 is labeled for dollar spot");
        assert!(out.report.is_clean());
    }

    #[test]
    fn test_wrong_category_recommendation() {
        let out = filter().check(
            "You should apply Acelepryn to stop the brown patch.",
            "How do I control brown patch?",
            "",
        );
        assert_eq!(out.report.issues.len(), 1);
        assert_eq!(out.report.issues[0].kind, IssueKind::ProductCategory);
        assert!(out.notes[0].starts_with("**Product check:**"));
    }

    #[test]
    fn test_mixing_warning_is_not_flagged() {
        assert_eq!(check_mixing("Mix chlorine bleach with your fungicide").len(), 1);
        assert!(check_mixing("Never mix bleach with any fungicide").is_empty());
    }

    #[test]
    fn test_penalty_is_capped() {
        let out = filter().check(
            "A 2024 study showed that mixing bleach with the fungicide and GreenMax Pro 5 helps. Apply Acelepryn for the dollar spot.",
            "dollar spot",
            "",
        );
        assert!(out.report.issues.len() >= 4);
        assert_eq!(out.report.penalty, 30.0);
    }
}

//! Domain validator
//!
//! Cross-checks the answer against verified product and disease facts:
//! label rates, resistance-group codes, disease/product fit and the
//! crabgrass germination threshold.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use turf_advisor_core::{
    CheckReport, IssueKind, KnowledgeStore, ProductFact, ProductNeed, Severity, VerificationIssue,
};

use crate::text::{contains_any, positions, title_case, window};
use crate::CheckOutcome;

/// Mentioned rates this far over the label maximum are flagged
const LABEL_RATE_SLACK: f32 = 2.5;
/// Tolerance against the highest rate the retrieved text states
const CONTEXT_RATE_SLACK: f32 = 1.1;
const RATE_WINDOW: usize = 80;
const CONTEXT_RATE_WINDOW: usize = 200;
const MOA_DISTANCE: usize = 150;
const RECOMMEND_WINDOW: usize = 60;
const CRABGRASS_GERMINATION_F: i32 = 55;
const GERMINATION_TOLERANCE_F: i32 = 8;

static OUNCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.?\d*)\s*(?:fl\.?\s*)?(?:oz|ounces?)\b").expect("valid regex"));
static MOA_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(frac|hrac|irac)\s*(?:code\s*|group\s*)?(m\d+|p\d+|\d+)\b").expect("valid regex")
});
static FAHRENHEIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)\s*°?\s*f\b").expect("valid regex"));

const RECOMMEND_WORDS: &[&str] = &["apply", "use", "recommend", "spray", "treat with", "consider"];

struct Penalty {
    each: f32,
    cap: f32,
}

const RATE: Penalty = Penalty { each: 8.0, cap: 15.0 };
const MOA: Penalty = Penalty { each: 5.0, cap: 10.0 };
const DISEASE_FIT: Penalty = Penalty { each: 5.0, cap: 10.0 };
const THRESHOLD: Penalty = Penalty { each: 3.0, cap: 5.0 };

impl Penalty {
    fn for_count(&self, n: usize) -> f32 {
        (n as f32 * self.each).min(self.cap)
    }
}

fn ounces_in(text: &str) -> Vec<f32> {
    OUNCES
        .captures_iter(text)
        .filter_map(|c| c.get(1)?.as_str().parse().ok())
        .collect()
}

fn moa_family(category: ProductNeed) -> Option<&'static str> {
    match category {
        ProductNeed::Fungicide => Some("frac"),
        ProductNeed::Herbicide => Some("hrac"),
        ProductNeed::Insecticide => Some("irac"),
        ProductNeed::Pgr => None,
    }
}

pub struct DomainValidator {
    knowledge: Arc<dyn KnowledgeStore>,
    cap: f32,
}

impl DomainValidator {
    pub fn new(knowledge: Arc<dyn KnowledgeStore>, cap: f32) -> Self {
        Self { knowledge, cap }
    }

    pub fn validate(&self, answer: &str, question: &str, context: &str) -> CheckOutcome {
        let answer_lower = answer.to_lowercase();
        let products = self.knowledge.products_in(answer);

        let rates = check_rates(&answer_lower, &context.to_lowercase(), &products);
        let codes = check_moa_codes(answer, &answer_lower, &products);
        let fit = self.check_disease_fit(&answer_lower, question, &products);
        let thresholds = check_germination(answer, &answer_lower);

        let penalty = RATE.for_count(rates.len())
            + MOA.for_count(codes.len())
            + DISEASE_FIT.for_count(fit.len())
            + THRESHOLD.for_count(thresholds.len());

        let issues: Vec<VerificationIssue> = rates
            .into_iter()
            .chain(codes)
            .chain(fit)
            .chain(thresholds)
            .collect();
        if !issues.is_empty() {
            tracing::info!(issues = issues.len(), penalty, "Domain validation flagged answer");
        }

        let notes = correction_note(&issues).into_iter().collect();
        CheckOutcome {
            report: CheckReport {
                issues,
                penalty: penalty.min(self.cap),
            },
            notes,
        }
    }

    fn check_disease_fit(&self, answer: &str, question: &str, products: &[ProductFact]) -> Vec<VerificationIssue> {
        let Some(disease) = self.knowledge.disease_in(question) else {
            return Vec::new();
        };
        let mut issues = Vec::new();
        for product in products
            .iter()
            .filter(|p| matches!(p.category, ProductNeed::Herbicide | ProductNeed::Insecticide))
        {
            let recommended = product.names().iter().any(|name| {
                positions(answer, name).into_iter().any(|pos| {
                    contains_any(window(answer, pos, pos + name.len(), RECOMMEND_WINDOW), RECOMMEND_WORDS)
                })
            });
            if !recommended {
                continue;
            }
            let mut message = format!(
                "{} ({}) is a {}, not a fungicide. It won't control {}.",
                product.display_name(),
                product.active_ingredient,
                product.category.as_str(),
                disease.display_name()
            );
            if !disease.top_products.is_empty() {
                let top: Vec<&str> = disease.top_products.iter().take(3).map(String::as_str).collect();
                message.push_str(&format!(" Effective products include: {}.", top.join(", ")));
            }
            issues.push(VerificationIssue::new(IssueKind::DiseaseProductMismatch, Severity::High, message));
        }
        issues
    }
}

/// Rates near a product name that exceed the label, or exceed what the
/// retrieved text says about that product
fn check_rates(answer: &str, context: &str, products: &[ProductFact]) -> Vec<VerificationIssue> {
    let mut issues = Vec::new();
    let mut flagged: Vec<(String, u32)> = Vec::new();

    for product in products {
        let name = product.display_name().to_string();
        let label_max = product.max_label_rate();
        let context_max = product
            .names()
            .iter()
            .flat_map(|n| {
                positions(context, n)
                    .into_iter()
                    .flat_map(move |pos| ounces_in(window(context, pos, pos + n.len(), CONTEXT_RATE_WINDOW)))
            })
            .reduce(f32::max);

        for n in product.names() {
            for pos in positions(answer, &n) {
                for mentioned in ounces_in(window(answer, pos, pos + n.len(), RATE_WINDOW)) {
                    let key = (name.clone(), (mentioned * 1000.0) as u32);
                    if flagged.contains(&key) {
                        continue;
                    }
                    let message = match (label_max, context_max) {
                        (Some(max), _) if mentioned > max * LABEL_RATE_SLACK && mentioned > 1.0 => format!(
                            "Rate check: {} oz for {} may exceed label rates. Verified rates: {}.",
                            mentioned,
                            title_case(&name),
                            product.rates_summary()
                        ),
                        (_, Some(max)) if mentioned > max * CONTEXT_RATE_SLACK => format!(
                            "Rate check: the answer gives {} oz for {}, but the retrieved label text states at most {} oz.",
                            mentioned,
                            title_case(&name),
                            max
                        ),
                        _ => continue,
                    };
                    flagged.push(key);
                    issues.push(VerificationIssue::new(IssueKind::RateMismatch, Severity::High, message));
                }
            }
        }
    }
    issues
}

/// Each resistance-group mention is checked against the nearest product
/// of the matching category only
fn check_moa_codes(answer: &str, answer_lower: &str, products: &[ProductFact]) -> Vec<VerificationIssue> {
    let located: Vec<(usize, usize, &ProductFact, String)> = products
        .iter()
        .filter(|p| p.moa_code.is_some())
        .flat_map(|p| {
            p.names().into_iter().flat_map(move |n| {
                positions(answer_lower, &n)
                    .into_iter()
                    .map(move |pos| (pos, pos + n.len(), p, n.clone()))
            })
        })
        .collect();
    if located.is_empty() {
        return Vec::new();
    }

    let mut issues = Vec::new();
    let mut seen: Vec<(String, String)> = Vec::new();
    for caps in MOA_CODE.captures_iter(answer) {
        let (Some(whole), Some(family), Some(code)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let family = family.as_str().to_lowercase();
        let mentioned = code.as_str().to_uppercase();

        let closest = located
            .iter()
            .filter(|(_, _, p, _)| moa_family(p.category) == Some(family.as_str()))
            .map(|(start, end, p, name)| {
                let distance = if whole.start() >= *end {
                    whole.start() - end
                } else if *start >= whole.end() {
                    start - whole.end()
                } else {
                    0
                };
                (distance, *p, name)
            })
            .min_by_key(|(distance, _, _)| *distance);

        let Some((distance, product, name)) = closest else {
            continue;
        };
        let Some(actual) = product.moa_code.as_deref() else {
            continue;
        };
        if distance > MOA_DISTANCE || actual.eq_ignore_ascii_case(&mentioned) {
            continue;
        }
        let key = (name.clone(), mentioned.clone());
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        let family = family.to_uppercase();
        issues.push(VerificationIssue::new(
            IssueKind::ModeOfActionMismatch,
            Severity::Medium,
            format!(
                "{} code mismatch: {} is {} {}, not {} {} as stated in the answer.",
                family,
                title_case(name),
                family,
                actual,
                family,
                mentioned
            ),
        ));
    }
    issues
}

fn check_germination(answer: &str, answer_lower: &str) -> Vec<VerificationIssue> {
    if !(answer_lower.contains("crabgrass") && answer_lower.contains("germinat")) {
        return Vec::new();
    }
    let mentioned = FAHRENHEIT
        .captures(answer)
        .and_then(|c| c.get(1)?.as_str().parse::<i32>().ok());
    match mentioned {
        Some(temp) if (temp - CRABGRASS_GERMINATION_F).abs() > GERMINATION_TOLERANCE_F => {
            vec![VerificationIssue::new(
                IssueKind::GerminationTemperature,
                Severity::Low,
                format!(
                    "Crabgrass germination temperature: answer mentions {}°F, standard reference is {}°F soil temperature.",
                    temp, CRABGRASS_GERMINATION_F
                ),
            )]
        }
        _ => Vec::new(),
    }
}

/// Answer note listing each distinct validator finding
pub fn correction_note(issues: &[VerificationIssue]) -> Option<String> {
    let mut unique: Vec<&str> = Vec::new();
    for issue in issues {
        if !unique.contains(&issue.message.as_str()) {
            unique.push(&issue.message);
        }
    }
    match unique.as_slice() {
        [] => None,
        [only] => Some(format!("**Verification Note:** {}", only)),
        many => {
            let mut note = String::from("**Verification Notes:**");
            for message in many {
                note.push_str("\n- ");
                note.push_str(message);
            }
            Some(note)
        }
    }
}

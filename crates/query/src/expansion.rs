//! Synonym expansion, vague-question rewrites and intent hints

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use turf_advisor_config::vocabulary::{is_stop_word, SYNONYMS};

/// Questions longer than this are never treated as vague
const VAGUE_MAX_CHARS: usize = 50;
/// Symptom-only phrasings shorter than this become a diagnosis request
const SYMPTOM_MAX_CHARS: usize = 30;

const VAGUE_DISEASES: &[(&str, &str)] = &[
    ("dollar spot", "What fungicide should I use to control dollar spot? Include rates and timing."),
    ("brown patch", "What fungicide should I use to control brown patch? Include rates and timing."),
    ("pythium", "What fungicide should I use to control pythium blight? Include rates and timing."),
    ("summer patch", "What fungicide should I use to control summer patch? Include rates and timing."),
    ("anthracnose", "What fungicide should I use to control anthracnose? Include rates and timing."),
    ("fairy ring", "How do I control fairy ring? Include both cultural and chemical options."),
    ("snow mold", "What fungicide should I use to prevent snow mold? Include application timing."),
    ("rust", "What fungicide should I use to control rust? Include rates."),
    ("take-all", "How do I manage take-all patch? Include cultural and chemical approaches."),
    ("gray leaf spot", "What fungicide controls gray leaf spot? Include rates and resistance management."),
    ("spring dead spot", "How do I prevent spring dead spot in bermudagrass? Include timing."),
    ("red thread", "What fungicide controls red thread? Include cultural practices."),
    ("leaf spot", "What fungicide controls leaf spot and melting out? Include rates."),
];

const VAGUE_WEEDS: &[(&str, &str)] = &[
    ("crabgrass", "What pre-emergent herbicide should I use for crabgrass control? Include timing and rates."),
    ("poa", "How do I control Poa annua? Include both pre and post-emergent options."),
    ("poa annua", "How do I control Poa annua? Include both pre and post-emergent options."),
    ("goosegrass", "What herbicide should I use for goosegrass? Include timing and rates."),
    ("nutsedge", "What herbicide works for nutsedge? Include rates and timing."),
    ("clover", "What herbicide should I use for clover in turf?"),
    ("dandelion", "What post-emergent herbicide controls dandelions?"),
    ("ground ivy", "What herbicide controls ground ivy (creeping charlie)?"),
    ("sedge", "What herbicide controls sedges? Include nutsedge and kyllinga."),
];

const VAGUE_PRODUCTS: &[&str] = &[
    "heritage", "lexicon", "xzemplar", "primo", "tenacity", "monument", "barricade",
    "dimension", "acelepryn", "medallion", "headway", "banner", "daconil", "secure", "velista",
    "posterity", "tourney", "specticle", "certainty", "dismiss", "drive", "revolver",
];

const HELP_PHRASES: &[&str] = &["help", "help?", "what spray", "what to use", "what do i do"];

const HELP_EXPANSION: &str =
    "I need help with a turf problem. What information do you need from me to give a recommendation?";

const SYMPTOM_WORDS: &[&str] = &["sick", "dying", "dead", "brown", "yellow", "thin", "weak", "wilting"];

const RATE_WORDS: &[&str] = &["rate", "how much", "dosage", "oz", "fl oz", "per 1000", "per acre"];
const CULTURAL_WORDS: &[&str] = &["mow", "water", "irrigat", "fertil", "aerif", "topdress", "overseed"];
const CHEMICAL_WORDS: &[&str] =
    &["spray", "apply", "fungicide", "herbicide", "insecticide", "chemical", "product"];
const DIAGNOSIS_WORDS: &[&str] =
    &["diagnose", "identify", "what is", "what's wrong", "problem", "issue", "dying", "dead"];
const PRODUCT_CATEGORIES: &[&str] = &["fungicide", "herbicide", "insecticide", "PGR"];
const INTENT_DISEASES: &[&str] = &[
    "dollar spot", "brown patch", "pythium", "anthracnose", "fairy ring", "summer patch",
    "snow mold", "gray leaf spot", "spring dead spot", "rust",
];
const INTENT_WEEDS: &[&str] =
    &["crabgrass", "poa", "goosegrass", "nutsedge", "clover", "dandelion", "sedge"];

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").expect("valid regex"));

/// Lowercased question followed by every matching synonym expansion
pub fn expand_query(question: &str) -> String {
    let lower = question.to_lowercase();
    let expansions: Vec<&str> = SYNONYMS
        .iter()
        .filter(|(term, _)| lower.contains(term))
        .map(|(_, expansion)| *expansion)
        .collect();

    if expansions.is_empty() {
        lower
    } else {
        format!("{} {}", lower, expansions.join(" "))
    }
}

/// Content words longer than two characters
pub fn extract_keywords(question: &str) -> Vec<String> {
    let lower = question.to_lowercase();
    WORD.find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| w.len() > 2 && !is_stop_word(w))
        .map(str::to_string)
        .collect()
}

fn bare_match<'a>(lower: &str, table: &'a [(&str, &str)]) -> Option<&'a str> {
    let bare = lower.trim_end_matches('?');
    table.iter().find(|(name, _)| *name == bare).map(|(_, q)| *q)
}

/// Turn a bare disease, weed or product name into an answerable question.
///
/// Returns `None` when the question is already specific enough.
pub fn expand_vague_question(question: &str) -> Option<String> {
    if question.chars().count() > VAGUE_MAX_CHARS {
        return None;
    }
    let lower = question.trim().to_lowercase();

    if let Some(expanded) = bare_match(&lower, VAGUE_DISEASES).or_else(|| bare_match(&lower, VAGUE_WEEDS)) {
        return Some(expanded.to_string());
    }

    if HELP_PHRASES.contains(&lower.as_str()) {
        return Some(HELP_EXPANSION.to_string());
    }

    let bare = lower.trim_end_matches('?');
    if let Some(product) = VAGUE_PRODUCTS.iter().find(|p| **p == bare) {
        let mut name = product.to_string();
        if let Some(first) = name.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        return Some(format!(
            "What is the application rate for {}? Include target pest and turf type safety.",
            name
        ));
    }

    if question.chars().count() < SYMPTOM_MAX_CHARS && SYMPTOM_WORDS.iter().any(|w| lower.contains(w)) {
        return Some(format!(
            "My turf shows these symptoms: {}. Help me diagnose the problem and recommend treatment.",
            question.trim()
        ));
    }

    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    #[default]
    General,
    Rate,
    Cultural,
    Chemical,
    Diagnosis,
}

/// What the user wants out of the answer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryIntent {
    /// Last matching signal wins: diagnosis > chemical > cultural > rate
    pub kind: IntentKind,
    pub wants_rate: bool,
    pub wants_cultural: bool,
    pub wants_chemical: bool,
    pub wants_diagnosis: bool,
    pub product: Option<String>,
    pub disease: Option<String>,
    pub weed: Option<String>,
}

pub fn query_intent(question: &str) -> QueryIntent {
    let lower = question.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    let mut intent = QueryIntent::default();

    if has(RATE_WORDS) {
        intent.wants_rate = true;
        intent.kind = IntentKind::Rate;
    }
    if has(CULTURAL_WORDS) {
        intent.wants_cultural = true;
        intent.kind = IntentKind::Cultural;
    }
    if has(CHEMICAL_WORDS) {
        intent.wants_chemical = true;
        intent.kind = IntentKind::Chemical;
    }
    if has(DIAGNOSIS_WORDS) {
        intent.wants_diagnosis = true;
        intent.kind = IntentKind::Diagnosis;
    }

    intent.product = SYNONYMS
        .iter()
        .find(|(term, expansion)| {
            lower.contains(term) && PRODUCT_CATEGORIES.iter().any(|c| expansion.contains(c))
        })
        .map(|(term, _)| term.to_string());
    intent.disease = INTENT_DISEASES.iter().find(|d| lower.contains(*d)).map(|d| d.to_string());
    intent.weed = INTENT_WEEDS.iter().find(|w| lower.contains(*w)).map(|w| w.to_string());

    intent
}

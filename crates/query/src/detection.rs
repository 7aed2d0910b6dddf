//! Keyword detection over question text
//!
//! All detectors take the question as written and lowercase internally,
//! except [`detect_state`] which also looks for upper-case postal codes.

use once_cell::sync::Lazy;
use regex::Regex;
use turf_advisor_config::constants::{geography, grasses, keywords};
use turf_advisor_core::{GrassType, ProductNeed, Region, Topic};

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn first_in<'a>(haystack: &str, needles: &[&'a str]) -> Option<&'a str> {
    needles.iter().copied().find(|n| haystack.contains(n))
}

const GRASS_TABLE: [(GrassType, &[&str]); 7] = [
    (GrassType::Bentgrass, grasses::BENTGRASS),
    (GrassType::Bermudagrass, grasses::BERMUDAGRASS),
    (GrassType::PoaAnnua, grasses::POA_ANNUA),
    (GrassType::KentuckyBluegrass, grasses::KENTUCKY_BLUEGRASS),
    (GrassType::TallFescue, grasses::TALL_FESCUE),
    (GrassType::PerennialRyegrass, grasses::PERENNIAL_RYEGRASS),
    (GrassType::Zoysiagrass, grasses::ZOYSIAGRASS),
];

const REGION_TABLE: [(Region, &[&str]); 5] = [
    (Region::Northeast, geography::NORTHEAST),
    (Region::Southeast, geography::SOUTHEAST),
    (Region::Midwest, geography::MIDWEST),
    (Region::Southwest, geography::SOUTHWEST),
    (Region::West, geography::WEST),
];

const REGION_WORDS: [(&str, Region); 9] = [
    ("pacific northwest", Region::West),
    ("new england", Region::Northeast),
    ("northeast", Region::Northeast),
    ("southeast", Region::Southeast),
    ("transition zone", Region::Southeast),
    ("midwest", Region::Midwest),
    ("great lakes", Region::Midwest),
    ("southwest", Region::Southwest),
    ("west coast", Region::West),
];

/// Disease names, most specific first
const SPECIFIC_DISEASES: &[&str] = &[
    "pink snow mold", "gray snow mold", "gray leaf spot", "spring dead spot", "necrotic ring spot",
    "dollar spot", "brown patch", "large patch", "summer patch", "take-all", "pythium",
    "anthracnose", "fairy ring", "snow mold", "red thread", "pink patch", "microdochium",
    "typhula", "leaf spot", "fusarium", "rust",
];

const SUBJECT_PRODUCTS: &[&str] = &[
    "heritage", "azoxystrobin", "daconil", "chlorothalonil", "banner maxx", "propiconazole",
    "primo", "trinexapac", "tenacity", "mesotrione", "barricade", "prodiamine", "dimension",
    "dithiopyr", "acclaim", "fenoxaprop", "certainty", "sulfosulfuron", "monument",
    "trifloxysulfuron", "specticle", "indaziflam", "lexicon", "xzemplar", "insignia",
    "pyraclostrobin", "mancozeb", "briskway", "posterity", "rolling", "aerification",
    "topdressing", "verticutting", "overseeding", "dethatching",
];

const SUBJECT_WEEDS: &[&str] = &[
    "annual bluegrass", "poa annua", "annual sedge", "barnyardgrass", "black medic",
    "buckhorn plantain", "canada thistle", "carpetweed", "common chickweed", "common purslane",
    "crabgrass", "dallisgrass", "dandelion", "dollarweed", "doveweed", "florida betony",
    "foxtail", "goosegrass", "green kyllinga", "kyllinga", "ground ivy", "creeping charlie",
    "henbit", "knotweed", "lawn burweed", "nimblewill", "purple nutsedge", "yellow nutsedge",
    "nutsedge", "quackgrass", "poa trivialis", "spotted spurge", "torpedograss",
    "virginia buttonweed", "white clover", "clover", "wild garlic", "wild violet", "oxalis",
    "sedge",
];

const SUBJECT_NEMATODES: &[&str] = &[
    "sting nematode", "lance nematode", "root-knot nematode", "root knot nematode",
    "ring nematode", "spiral nematode", "stubby-root nematode", "stunt nematode",
    "needle nematode", "cyst nematode", "lesion nematode", "nematode", "nematicide",
];

const SUBJECT_PESTS: &[&str] = &[
    "white grub", "grub", "japanese beetle", "fall armyworm", "armyworm", "cutworm",
    "sod webworm", "webworm", "chinch bug", "mole cricket", "hunting billbug", "billbug",
    "annual bluegrass weevil", "crane fly", "fire ant",
];

/// Full state names, longest first so "west virginia" wins over "virginia"
static STATE_NAMES: Lazy<Regex> = Lazy::new(|| {
    let mut names: Vec<&str> = geography::US_STATES.to_vec();
    names.sort_by_key(|n| std::cmp::Reverse(n.len()));
    let alternation = names
        .iter()
        .map(|n| regex::escape(n))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b({})\b", alternation)).expect("valid regex")
});

static STATE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Z]{2})\b").expect("valid regex"));

pub fn detect_grass_type(question: &str) -> Option<GrassType> {
    let lower = question.to_lowercase();
    GRASS_TABLE
        .iter()
        .find(|(_, names)| contains_any(&lower, names))
        .map(|(grass, _)| *grass)
}

/// First US state named in the question, as its lowercase full name
pub fn detect_state(question: &str) -> Option<String> {
    if let Some(m) = STATE_NAMES.find(question) {
        return Some(m.as_str().to_lowercase());
    }
    STATE_CODE.captures_iter(question).find_map(|caps| {
        let code = caps.get(1)?.as_str();
        geography::STATE_CODES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, name)| name.to_string())
    })
}

/// Region from explicit region words, else from the detected state
pub fn detect_region(question: &str, state: Option<&str>) -> Option<Region> {
    let lower = question.to_lowercase();
    if let Some((_, region)) = REGION_WORDS.iter().find(|(word, _)| lower.contains(word)) {
        return Some(*region);
    }
    let state = state?;
    REGION_TABLE
        .iter()
        .find(|(_, states)| states.contains(&state))
        .map(|(region, _)| *region)
}

/// Pesticide category the question needs; fungicide > herbicide > insecticide > PGR
pub fn detect_product_need(question: &str) -> Option<ProductNeed> {
    let lower = question.to_lowercase();
    if contains_any(&lower, keywords::DISEASE_NEED) {
        Some(ProductNeed::Fungicide)
    } else if contains_any(&lower, keywords::WEED_NEED) {
        Some(ProductNeed::Herbicide)
    } else if contains_any(&lower, keywords::INSECT_NEED) {
        Some(ProductNeed::Insecticide)
    } else if contains_any(&lower, keywords::PGR_NEED) {
        Some(ProductNeed::Pgr)
    } else {
        None
    }
}

/// Subject area for prompt selection.
///
/// Symptom language wins over everything so that "brown spots" questions
/// get the diagnostic prompt even when a disease is also named.
pub fn detect_topic(question: &str) -> Option<Topic> {
    let lower = question.to_lowercase();
    let checks: [(&[&str], Topic); 9] = [
        (keywords::DIAGNOSTIC, Topic::Diagnostic),
        (keywords::NEMATODE, Topic::Disease),
        (keywords::DISEASE, Topic::Disease),
        (keywords::ABIOTIC, Topic::Diagnostic),
        (keywords::CHEMICAL, Topic::Chemical),
        (keywords::FERTILIZER, Topic::Fertilizer),
        (keywords::IRRIGATION, Topic::Irrigation),
        (keywords::EQUIPMENT, Topic::Equipment),
        (keywords::CULTURAL, Topic::Cultural),
    ];
    checks
        .iter()
        .find(|(words, _)| contains_any(&lower, words))
        .map(|(_, topic)| *topic)
}

/// Most specific thing the question is about (disease, product, practice, weed, pest)
pub fn detect_subject(question: &str) -> Option<String> {
    let lower = question.to_lowercase();
    [
        SPECIFIC_DISEASES,
        SUBJECT_PRODUCTS,
        SUBJECT_WEEDS,
        SUBJECT_NEMATODES,
        SUBJECT_PESTS,
    ]
    .iter()
    .find_map(|table| first_in(&lower, table))
    .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grass_priority() {
        assert_eq!(
            detect_grass_type("Dollar spot on creeping bent greens"),
            Some(GrassType::Bentgrass)
        );
        assert_eq!(detect_grass_type("bermuda fairways"), Some(GrassType::Bermudagrass));
        assert_eq!(detect_grass_type("KBG lawn"), Some(GrassType::KentuckyBluegrass));
        assert_eq!(detect_grass_type("my zoysia is thin"), Some(GrassType::Zoysiagrass));
        assert_eq!(detect_grass_type("how do I calibrate a sprayer"), None);
    }

    #[test]
    fn test_state_names_use_word_boundaries() {
        assert_eq!(detect_state("greens in Arkansas"), Some("arkansas".to_string()));
        assert_eq!(detect_state("fairways in kansas"), Some("kansas".to_string()));
        assert_eq!(detect_state("West Virginia course"), Some("west virginia".to_string()));
        assert_eq!(detect_state("texasgrass"), None);
    }

    #[test]
    fn test_state_codes() {
        assert_eq!(detect_state("bentgrass greens in NJ"), Some("new jersey".to_string()));
        assert_eq!(detect_state("what should I spray in GA?"), Some("georgia".to_string()));
        // ambiguous codes are ignored
        assert_eq!(detect_state("should I spray OR wait"), None);
        // lower-case two letter words are never codes
        assert_eq!(detect_state("go ahead and spray"), None);
    }

    #[test]
    fn test_region() {
        assert_eq!(detect_region("anything", Some("florida")), Some(Region::Southeast));
        assert_eq!(detect_region("course in the midwest", None), Some(Region::Midwest));
        assert_eq!(
            detect_region("Pacific Northwest moss problem", Some("florida")),
            Some(Region::West)
        );
        assert_eq!(detect_region("no place here", Some("alaska")), None);
    }

    #[test]
    fn test_product_need_priority() {
        assert_eq!(
            detect_product_need("dollar spot and crabgrass"),
            Some(ProductNeed::Fungicide)
        );
        assert_eq!(detect_product_need("crabgrass pre-emergent"), Some(ProductNeed::Herbicide));
        assert_eq!(detect_product_need("grub damage"), Some(ProductNeed::Insecticide));
        assert_eq!(detect_product_need("primo on greens"), Some(ProductNeed::Pgr));
        assert_eq!(detect_product_need("mowing height for tees"), None);
    }

    #[test]
    fn test_topic_order() {
        assert_eq!(
            detect_topic("what's wrong with my green, brown spots"),
            Some(Topic::Diagnostic)
        );
        assert_eq!(detect_topic("nematode sampling"), Some(Topic::Disease));
        assert_eq!(detect_topic("pythium on greens"), Some(Topic::Disease));
        assert_eq!(detect_topic("winter desiccation on greens"), Some(Topic::Diagnostic));
        assert_eq!(detect_topic("tank mix compatibility"), Some(Topic::Chemical));
        assert_eq!(detect_topic("how much nitrogen in june"), Some(Topic::Fertilizer));
        assert_eq!(detect_topic("sprinkler head spacing"), Some(Topic::Irrigation));
        assert_eq!(detect_topic("bedknife adjustment"), Some(Topic::Equipment));
        assert_eq!(detect_topic("when to aerify"), Some(Topic::Cultural));
        assert_eq!(detect_topic("hello there"), None);
    }

    #[test]
    fn test_subject_specificity() {
        assert_eq!(detect_subject("pink snow mold on greens").as_deref(), Some("pink snow mold"));
        assert_eq!(detect_subject("heritage rate").as_deref(), Some("heritage"));
        assert_eq!(detect_subject("yellow nutsedge in fairways").as_deref(), Some("yellow nutsedge"));
        assert_eq!(detect_subject("sting nematode counts").as_deref(), Some("sting nematode"));
        assert_eq!(detect_subject("chinch bug damage").as_deref(), Some("chinch bug"));
        assert_eq!(detect_subject("mowing height"), None);
    }
}

//! Feasibility gate
//!
//! Deterministic checks that run before retrieval and catch questions that
//! cannot be answered as asked: contradictions, impossible scenarios, absurd
//! numbers and unsafe practices. Same input, same verdict.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use turf_advisor_core::{AskResponse, Severity, ShortCircuit};

const WARM_SEASON_GRASSES: &[&str] = &[
    "bermudagrass", "bermuda", "cynodon", "zoysiagrass", "zoysia", "st. augustinegrass",
    "st augustine", "stenotaphrum", "centipedegrass", "centipede", "bahiagrass", "bahia",
    "buffalograss", "buffalo grass", "seashore paspalum", "paspalum",
];

const COOL_SEASON_GRASSES: &[&str] = &[
    "bentgrass", "bent grass", "agrostis", "creeping bent", "kentucky bluegrass", "kbg",
    "poa pratensis", "bluegrass", "tall fescue", "fine fescue", "fescue", "perennial ryegrass",
    "ryegrass", "rye grass",
];

/// States where warm-season turf does not survive winter reliably
const COLD_CLIMATES: &[&str] = &[
    "minnesota", "wisconsin", "michigan", "maine", "vermont", "new hampshire", "north dakota",
    "south dakota", "montana", "wyoming", "alaska", "idaho", "iowa",
];

const WINTER_MONTHS: &[&str] = &["december", "january", "february"];

const PRE_EMERGENT_TERMS: &[&str] = &[
    "pre-emergent", "preemergent", "pre emergent", "barricade", "dimension", "prodiamine",
    "dithiopyr", "pendimethalin", "indaziflam", "specticle",
];

const KILL_TERMS: &[&str] = &["kill all", "kill the", "eliminate", "destroy"];
const KEEP_GREEN_TERMS: &[&str] = &["keep green", "keep it green", "stay green", "looking green"];
const HOME_LAWN_TERMS: &[&str] = &["home lawn", "residential", "home yard", "my lawn", "my yard"];

const DOUBLE_RATE_PHRASES: &[&str] = &[
    "double the rate", "double the fungicide", "double the herbicide", "double the insecticide",
    "twice the rate", "twice the label", "double the application", "2x the rate", "2x the label",
    "triple the rate", "3x the rate",
];
const PRE_RAIN_PHRASES: &[&str] = &[
    "before a heavy rain", "before rain", "before it rains", "before the storm",
    "before a rainstorm", "before heavy rain",
];
const PESTICIDE_TERMS: &[&str] = &[
    "herbicide", "fungicide", "insecticide", "pesticide", "roundup", "glyphosate", "spray",
    "apply",
];
const NEAR_WATER_PHRASES: &[&str] = &[
    "near a pond", "near the pond", "near water", "by the pond", "by the lake", "near the lake",
    "near a lake", "by the stream", "near the creek", "near a creek", "along the water",
    "next to the pond", "next to water",
];
const PPE_DISMISSAL_PHRASES: &[&str] = &[
    "just wear shorts", "without ppe", "no ppe", "don't need ppe", "do i need ppe", "skip ppe",
    "don't need gloves", "without gloves", "no protection", "without protection",
];
const CHEMICAL_TERMS: &[&str] = &[
    "fungicide", "herbicide", "insecticide", "pesticide", "spray", "apply", "daconil",
    "chlorothalonil",
];
const REI_PHRASES: &[&str] = &[
    "play immediately", "golfers play immediately", "play right after", "play right away",
    "let golfers on", "mow right after spray", "no waiting", "no wait time",
];
const SAME_MOA_PHRASES: &[&str] = &[
    "three different dmi", "3 dmi", "three dmi", "back to back to back", "same mode of action",
    "same frac", "same moa", "only dmi", "only strobilurin", "only use frac 3",
    "only use frac 11", "all frac 3", "all frac 11", "all dmi fungicides",
];
const DISPOSAL_PHRASES: &[&str] = &[
    "dump them in", "dump in the ditch", "dump in the drain", "pour down the drain",
    "pour in the ditch", "dump leftover", "pour leftover", "dispose in the ditch",
    "throw away pesticide", "pour out the extra", "dump the extra",
];
const TANK_MIX_TERMS: &[&str] = &["tank mix", "tank-mix", "chlorothalonil", "daconil", "dmi", "triazole"];
const EXPIRED_PHRASES: &[&str] = &[
    "expired", "past expiration", "out of date", "past its date", "shelf life", "old fungicide",
    "old herbicide", "old pesticide", "years old", "year old",
];
const USE_ANYWAY_PHRASES: &[&str] = &[
    "can i use", "still use", "still good", "still work", "still effective", "okay to use",
    "safe to use", "apply it", "spray it", "use it",
];
const MIX_LEFTOVER_PHRASES: &[&str] = &[
    "mix leftover", "mix remaining", "combine leftover", "mix pesticides together",
    "mix different pesticides", "mix them together", "pour them together",
];
const OFF_LABEL_INTENT: &[&str] = &["use it anyway", "apply anyway", "use it on", "can i use"];

/// Highest FRAC group number currently assigned
const MAX_FRAC_GROUP: u32 = 50;

static SEEDING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:over-?seed\w*|re-?seed\w*|seed|seeds|seeding|seeded|establish from seed)\b")
        .expect("valid regex")
});
static SPACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:mars|moon|jupiter|venus|saturn|space station|outer space)\b")
        .expect("valid regex")
});
static PH_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bph\s*(?:of|is|at|=|:)?\s*(\d+\.?\d*)").expect("valid regex"));
static NITROGEN_PER_1000: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+\.?\d*)\s*(?:lbs?|pounds?)\s*(?:of\s+)?(?:nitrogen|n)\s*(?:per|/)\s*(?:1[,.]?000|thousand)")
        .expect("valid regex")
});
static NITROGEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+\.?\d*)\s*(?:lbs?|pounds?)\s*(?:of\s+)?(?:nitrogen|n\b)").expect("valid regex")
});
static MOWING_HEIGHT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:mowing|mow|height|hoc)\s*(?:at|to|of)?\s*(\d*\.?\d+)\s*(?:inch|in\b|")"#)
        .expect("valid regex")
});
static WATER_BEFORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+\.?\d*)\s*inch(?:es)?\s*(?:of\s+)?water\s*(?:per|a|each)?\s*night")
        .expect("valid regex")
});
static WATER_AFTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"water\s+(\d+\.?\d*)\s*inch(?:es)?\s*(?:per|a|each)?\s*night").expect("valid regex")
});
static HERITAGE_RATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"heritage\s*(?:at|@)?\s*(\d+\.?\d*)\s*(?:oz|ounce)").expect("valid regex")
});
static FRAC_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"frac\s*(?:code\s*|group\s*)?(\d+)").expect("valid regex"));
static LABEL_OVERRIDE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"label\s+says?\s+(?:apply\s+)?(?:at\s+)?(\d+\.?\d*)\s*(?:fl\s*)?oz.*?(?:but|want|use|apply)\s+(\d+\.?\d*)\s*(?:fl\s*)?oz",
    )
    .expect("valid regex")
});
static HEAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:9[5-9]|1[01]\d)\s*(?:°\s*f?|degrees|f)\b").expect("valid regex")
});

/// What kind of problem the gate found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeasibilityKind {
    Contradiction,
    GeographicImpossibility,
    GeographicConcern,
    ImpossibleTiming,
    ConflictingActions,
    AbsurdValue,
    ImpossibleScenario,
    NonexistentClassification,
    LabelViolation,
    SafetyLabelViolation,
    SafetyEnvironmental,
    SafetyWaterBuffer,
    SafetyPpeRequired,
    SafetyReiViolation,
    SafetyResistanceRisk,
    SafetyIllegalDisposal,
    SafetyHeatPhytotoxicity,
    SafetyExpiredProduct,
    SafetyDangerousMixing,
}

impl FeasibilityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeasibilityKind::Contradiction => "contradiction",
            FeasibilityKind::GeographicImpossibility => "geographic_impossibility",
            FeasibilityKind::GeographicConcern => "geographic_concern",
            FeasibilityKind::ImpossibleTiming => "impossible_timing",
            FeasibilityKind::ConflictingActions => "conflicting_actions",
            FeasibilityKind::AbsurdValue => "absurd_value",
            FeasibilityKind::ImpossibleScenario => "impossible_scenario",
            FeasibilityKind::NonexistentClassification => "nonexistent_classification",
            FeasibilityKind::LabelViolation => "label_violation",
            FeasibilityKind::SafetyLabelViolation => "safety_label_violation",
            FeasibilityKind::SafetyEnvironmental => "safety_environmental",
            FeasibilityKind::SafetyWaterBuffer => "safety_water_buffer",
            FeasibilityKind::SafetyPpeRequired => "safety_ppe_required",
            FeasibilityKind::SafetyReiViolation => "safety_rei_violation",
            FeasibilityKind::SafetyResistanceRisk => "safety_resistance_risk",
            FeasibilityKind::SafetyIllegalDisposal => "safety_illegal_disposal",
            FeasibilityKind::SafetyHeatPhytotoxicity => "safety_heat_phytotoxicity",
            FeasibilityKind::SafetyExpiredProduct => "safety_expired_product",
            FeasibilityKind::SafetyDangerousMixing => "safety_dangerous_mixing",
        }
    }

    /// Heading shown to the user, e.g. "Absurd Value"
    pub fn title(&self) -> String {
        self.as_str()
            .split('_')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeasibilityIssue {
    pub kind: FeasibilityKind,
    pub severity: Severity,
    pub message: String,
}

impl FeasibilityIssue {
    fn high(kind: FeasibilityKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::High,
            message: message.into(),
        }
    }

    fn medium(kind: FeasibilityKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Medium,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeasibilityVerdict {
    pub issues: Vec<FeasibilityIssue>,
}

impl FeasibilityVerdict {
    pub fn is_feasible(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_high_severity(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::High)
    }

    pub fn issue_types(&self) -> Vec<&'static str> {
        self.issues.iter().map(|i| i.kind.as_str()).collect()
    }

    /// Explanation returned instead of an answer; `None` when feasible
    pub fn response(&self) -> Option<AskResponse> {
        if self.is_feasible() {
            return None;
        }

        let mut parts = Vec::new();
        if self.has_high_severity() {
            parts.push(
                "I noticed some important concerns with your question that I want to address before providing advice:\n"
                    .to_string(),
            );
            for issue in self.issues.iter().filter(|i| i.severity == Severity::High) {
                parts.push(format!("**{}:** {}\n", issue.kind.title(), issue.message));
            }
        }
        for issue in self.issues.iter().filter(|i| i.severity != Severity::High) {
            parts.push(format!("**Note:** {}\n", issue.message));
        }
        parts.push(
            "\nPlease clarify or adjust your question and I'll be happy to help with specific, research-backed recommendations!"
                .to_string(),
        );

        let (label, score) = if self.has_high_severity() {
            ("Issue Detected", 0.0)
        } else {
            ("Needs Clarification", 40.0)
        };
        Some(AskResponse::terminal(parts.join("\n"), label, ShortCircuit::Feasibility).with_score(score))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn title_case(phrase: &str) -> String {
    phrase.split(' ').map(capitalize).collect::<Vec<_>>().join(" ")
}

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| text.contains(p))
}

fn first_in<'a>(text: &str, phrases: &[&'a str]) -> Option<&'a str> {
    phrases.iter().copied().find(|p| text.contains(p))
}

fn captured_number(re: &Regex, text: &str, group: usize) -> Option<f32> {
    re.captures(text)?.get(group)?.as_str().parse().ok()
}

/// The question in the two forms the checks need
struct Probe<'a> {
    lower: String,
    original: &'a str,
}

type Check = fn(&Probe<'_>) -> Vec<FeasibilityIssue>;

const CHECKS: [Check; 7] = [
    check_grass_season,
    check_geography,
    check_conflicting_actions,
    check_absurd_parameters,
    check_impossible_scenarios,
    check_label_category,
    check_safety,
];

/// Run every check over the question
pub fn check_feasibility(question: &str) -> FeasibilityVerdict {
    let probe = Probe {
        lower: question.to_lowercase(),
        original: question,
    };
    let issues: Vec<FeasibilityIssue> = CHECKS.iter().flat_map(|check| check(&probe)).collect();
    if !issues.is_empty() {
        tracing::info!(
            issues = issues.len(),
            kinds = ?issues.iter().map(|i| i.kind.as_str()).collect::<Vec<_>>(),
            "Feasibility gate triggered"
        );
    }
    FeasibilityVerdict { issues }
}

fn check_grass_season(p: &Probe<'_>) -> Vec<FeasibilityIssue> {
    let q = &p.lower;
    let mut issues = Vec::new();

    if q.contains("cool-season") && !q.contains("not cool-season") {
        if let Some(grass) = first_in(q, WARM_SEASON_GRASSES) {
            issues.push(FeasibilityIssue::high(
                FeasibilityKind::Contradiction,
                format!(
                    "{} is a **warm-season** grass, not cool-season. It grows best above 80°F and goes dormant below 60°F.",
                    title_case(grass)
                ),
            ));
        }
    }
    if q.contains("warm-season") && !q.contains("not warm-season") {
        if let Some(grass) = first_in(q, COOL_SEASON_GRASSES) {
            issues.push(FeasibilityIssue::high(
                FeasibilityKind::Contradiction,
                format!(
                    "{} is a **cool-season** grass, not warm-season. It grows best between 60 and 75°F.",
                    title_case(grass)
                ),
            ));
        }
    }
    issues
}

fn check_geography(p: &Probe<'_>) -> Vec<FeasibilityIssue> {
    let q = &p.lower;
    let Some(grass) = first_in(q, WARM_SEASON_GRASSES) else {
        return Vec::new();
    };
    let name = title_case(grass);
    let cold = contains_any(q, COLD_CLIMATES);
    let winter = contains_any(q, WINTER_MONTHS);
    let mut issues = Vec::new();

    if cold && winter {
        issues.push(FeasibilityIssue::high(
            FeasibilityKind::GeographicImpossibility,
            format!(
                "{} is a warm-season grass that goes fully dormant, and may not survive, in cold northern \
                 climates during winter. Dormant turf will not respond to fertilizer or active management.",
                name
            ),
        ));
    } else if cold {
        issues.push(FeasibilityIssue::medium(
            FeasibilityKind::GeographicConcern,
            format!(
                "{} is a warm-season grass with limited cold hardiness. Winter survival is a real risk in \
                 northern climates, so check that it is the right grass for your location.",
                name
            ),
        ));
    }

    if cold && winter && SEEDING.is_match(q) {
        issues.push(FeasibilityIssue::high(
            FeasibilityKind::ImpossibleTiming,
            format!(
                "{} needs soil temperatures above 65°F to germinate. Seeding in a cold-climate winter will \
                 not germinate; wait for late spring or early summer when soils stay warm.",
                name
            ),
        ));
    }
    issues
}

fn check_conflicting_actions(p: &Probe<'_>) -> Vec<FeasibilityIssue> {
    let q = &p.lower;
    let mut issues = Vec::new();

    if contains_any(q, PRE_EMERGENT_TERMS) && SEEDING.is_match(q) {
        issues.push(FeasibilityIssue::high(
            FeasibilityKind::ConflictingActions,
            "**Pre-emergent herbicides and overseeding conflict.** Pre-emergents stop seed germination, \
             including turfgrass seed. Most labels require 8-16 weeks between a pre-emergent and seeding; \
             siduron (Tupersan) is the only pre-emergent safe to use at seeding.",
        ));
    }

    if contains_any(q, KILL_TERMS) && contains_any(q, KEEP_GREEN_TERMS) {
        issues.push(FeasibilityIssue::high(
            FeasibilityKind::Contradiction,
            "Turf cannot be killed and kept green at the same time. Could you clarify the goal?\n\
             - **Renovation**: kill the existing turf, then establish new turf\n\
             - **Transition**: gradually replace one species with another\n\
             - **Selective control**: remove specific weeds and keep the desirable turf",
        ));
    }
    issues
}

fn check_absurd_parameters(p: &Probe<'_>) -> Vec<FeasibilityIssue> {
    let q = &p.lower;
    let mut issues = Vec::new();

    if let Some(ph) = captured_number(&PH_VALUE, q, 1) {
        if !(2.0..=12.0).contains(&ph) {
            issues.push(FeasibilityIssue::high(
                FeasibilityKind::AbsurdValue,
                format!(
                    "A soil pH of {} is not realistic. Soils typically range from 4.0 to 9.0 (turf ideal 6.0-7.0), \
                     so a reading like this usually means a calibration error. Retest with a calibrated meter \
                     or send a sample to a soil lab.",
                    ph
                ),
            ));
        }
    }

    let nitrogen = captured_number(&NITROGEN_PER_1000, q, 1).or_else(|| captured_number(&NITROGEN, q, 1));
    if let Some(n) = nitrogen {
        if n > 5.0 {
            issues.push(FeasibilityIssue::high(
                FeasibilityKind::AbsurdValue,
                format!(
                    "**{} lbs of nitrogen per 1000 sq ft is far too much.** Typical application rates are \
                     0.25-1.5 lbs N per 1000 sq ft, and annual totals rarely exceed 4-6 lbs. A single {} lb \
                     application would burn the turf and leach into groundwater.",
                    n, n
                ),
            ));
        }
    }

    if let Some(height) = captured_number(&MOWING_HEIGHT, q, 1) {
        if height < 0.5 && contains_any(q, HOME_LAWN_TERMS) {
            issues.push(FeasibilityIssue::high(
                FeasibilityKind::AbsurdValue,
                format!(
                    "A mowing height of {} inches is far too low for a home lawn; that is putting green height \
                     (0.100-0.150\"). Mow cool-season lawns at 2.5-4.0 inches and warm-season lawns at 1.0-2.0 inches.",
                    height
                ),
            ));
        }
    }

    let water = captured_number(&WATER_BEFORE, q, 1).or_else(|| captured_number(&WATER_AFTER, q, 1));
    if let Some(inches) = water {
        if inches > 2.0 {
            issues.push(FeasibilityIssue::high(
                FeasibilityKind::AbsurdValue,
                format!(
                    "{} inches of water per night is far too much and invites flooding, root rot and disease. \
                     Most turf needs about 1-1.5 inches per week, typically 0.25-0.5 inches per session.",
                    inches
                ),
            ));
        }
    }

    if let Some(rate) = captured_number(&HERITAGE_RATE, q, 1) {
        if rate > 2.0 {
            issues.push(FeasibilityIssue::high(
                FeasibilityKind::AbsurdValue,
                format!(
                    "Heritage (azoxystrobin) at {} oz/1000 sq ft **far exceeds the label rate** of 0.2-0.4 oz/1000 sq ft. \
                     Applying that much is a label violation and risks phytotoxicity.",
                    rate
                ),
            ));
        }
    }
    issues
}

fn check_impossible_scenarios(p: &Probe<'_>) -> Vec<FeasibilityIssue> {
    let q = &p.lower;
    let mut issues = Vec::new();

    if SPACE.is_match(q) {
        issues.push(FeasibilityIssue::high(
            FeasibilityKind::ImpossibleScenario,
            "Turfgrass needs Earth's atmosphere, soil and climate. There are no established management \
             practices for turf off-planet, but I'm glad to help with any Earth-based turf question.",
        ));
    }

    let frac = FRAC_GROUP
        .captures(q)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok());
    if let Some(group) = frac.filter(|g| *g > MAX_FRAC_GROUP) {
        issues.push(FeasibilityIssue::medium(
            FeasibilityKind::NonexistentClassification,
            format!(
                "FRAC {} is not a recognized fungicide resistance group; the FRAC code list currently runs to about {}. \
                 Common turf groups are FRAC 3 (DMIs), FRAC 7 (SDHIs), FRAC 11 (strobilurins) and FRAC M5 (multi-site).",
                group, MAX_FRAC_GROUP
            ),
        ));
    }
    issues
}

fn check_label_category(p: &Probe<'_>) -> Vec<FeasibilityIssue> {
    let q = &p.lower;
    let cool_label = q.contains("cool-season") || q.contains("cool season");
    if q.contains("zoysia") && cool_label && q.contains("label") && contains_any(q, OFF_LABEL_INTENT) {
        return vec![FeasibilityIssue::high(
            FeasibilityKind::LabelViolation,
            "**Using a product labeled only for cool-season turf on zoysiagrass is an off-label application.** \
             It can injure the turf and violates federal law (FIFRA). Look for a product labeled for \
             warm-season turf or zoysiagrass specifically.",
        )];
    }
    Vec::new()
}

fn check_safety(p: &Probe<'_>) -> Vec<FeasibilityIssue> {
    let q = &p.lower;
    let mut issues = Vec::new();
    let pesticide = contains_any(q, PESTICIDE_TERMS);

    let label_override = LABEL_OVERRIDE.captures(q).and_then(|c| {
        let label: f32 = c.get(1)?.as_str().parse().ok()?;
        let wanted: f32 = c.get(2)?.as_str().parse().ok()?;
        (wanted > label * 1.5).then_some((label, wanted))
    });
    if contains_any(q, DOUBLE_RATE_PHRASES) {
        issues.push(FeasibilityIssue::high(
            FeasibilityKind::SafetyLabelViolation,
            "**Exceeding the label rate violates federal law (FIFRA).** It also risks turf injury, harms the \
             environment and speeds up resistance. If the labeled rate is not controlling the problem, rotate \
             to a different mode of action or revisit cultural practices.",
        ));
    } else if let Some((label, wanted)) = label_override {
        issues.push(FeasibilityIssue::high(
            FeasibilityKind::SafetyLabelViolation,
            format!(
                "**Applying {} oz when the label says {} oz is a federal violation.** The maximum label rate is a \
                 legal limit, and going over it risks phytotoxicity without improving control.",
                wanted, label
            ),
        ));
    }

    if contains_any(q, PRE_RAIN_PHRASES) && pesticide {
        issues.push(FeasibilityIssue::high(
            FeasibilityKind::SafetyEnvironmental,
            "**Applying pesticides right before heavy rain risks runoff.** Rain washes product into drains, \
             ponds and streams. Most labels want 24-48 rain-free hours after application; check the label \
             and the forecast before spraying.",
        ));
    }

    if contains_any(q, NEAR_WATER_PHRASES) && pesticide {
        issues.push(FeasibilityIssue::high(
            FeasibilityKind::SafetyWaterBuffer,
            "**Most pesticide labels require buffer zones near water.** Setbacks of 25-100+ feet from ponds, \
             lakes, streams and wetlands are common, and some products have strict no-spray zones. Check the \
             label and use drift-reducing nozzles.",
        ));
    }

    if contains_any(q, PPE_DISMISSAL_PHRASES) && contains_any(q, CHEMICAL_TERMS) {
        issues.push(FeasibilityIssue::high(
            FeasibilityKind::SafetyPpeRequired,
            "**The PPE listed on the label is a legal requirement.** Most pesticide labels require at least long \
             pants, a long-sleeved shirt, chemical-resistant gloves and closed-toe shoes, and many add eye \
             protection or a respirator.",
        ));
    }

    if contains_any(q, REI_PHRASES) && (pesticide || q.contains("daconil") || q.contains("greens")) {
        issues.push(FeasibilityIssue::high(
            FeasibilityKind::SafetyReiViolation,
            "**Every pesticide has a Re-Entry Interval (REI).** For most turf products it is until the spray \
             has dried, but some run 12-24 hours or longer. Letting golfers or crew onto a freshly treated \
             area before the REI ends is a label violation.",
        ));
    }

    if contains_any(q, SAME_MOA_PHRASES) {
        issues.push(FeasibilityIssue::high(
            FeasibilityKind::SafetyResistanceRisk,
            "**Repeating one mode of action speeds up fungicide resistance.** Rotate FRAC groups, for example \
             FRAC 3 (DMIs), FRAC 11 (strobilurins), FRAC 7 (SDHIs) and multi-site FRAC M5 products, and pair \
             single-site fungicides with a multi-site partner.",
        ));
    }

    if contains_any(q, DISPOSAL_PHRASES) {
        issues.push(FeasibilityIssue::high(
            FeasibilityKind::SafetyIllegalDisposal,
            "**Dumping pesticides into ditches, drains or waterways is illegal.** Apply leftover mix to a \
             labeled site at label rates, store it in the original container, or take it to a hazardous \
             waste collection site. Your state department of agriculture can advise on disposal.",
        ));
    }

    if HEAT.is_match(p.original) && (pesticide || contains_any(q, TANK_MIX_TERMS)) {
        issues.push(FeasibilityIssue::high(
            FeasibilityKind::SafetyHeatPhytotoxicity,
            "**Spraying in extreme heat (above 90°F) sharply raises phytotoxicity risk.** Chlorothalonil plus \
             DMI tank mixes are a well known cause of turf burn in heat. Spray early morning or evening below \
             85°F and hold non-critical applications until temperatures drop.",
        ));
    }

    if contains_any(q, EXPIRED_PHRASES) && contains_any(q, USE_ANYWAY_PHRASES) {
        issues.push(FeasibilityIssue::high(
            FeasibilityKind::SafetyExpiredProduct,
            "**Expired pesticides are not recommended.** Active ingredients degrade, so control becomes \
             unreliable and the product can injure turf or clog equipment. Dispose of it through a \
             hazardous waste program.",
        ));
    }

    if contains_any(q, MIX_LEFTOVER_PHRASES) {
        issues.push(FeasibilityIssue::high(
            FeasibilityKind::SafetyDangerousMixing,
            "**Never mix leftover pesticides together.** Combining products can react, release toxic fumes \
             and break label requirements. Only tank-mix products whose labels both allow the combination.",
        ));
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(question: &str) -> Vec<FeasibilityKind> {
        check_feasibility(question).issues.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_ordinary_question_passes() {
        let verdict = check_feasibility("how do I fix dollar spot on bentgrass");
        assert!(verdict.is_feasible());
        assert!(verdict.response().is_none());
    }

    #[test]
    fn test_nitrogen_absurd_value_cites_typical_range() {
        let verdict = check_feasibility("Can I put down 10 lbs of nitrogen per 1000 sq ft?");
        assert_eq!(verdict.issues.len(), 1);
        let issue = &verdict.issues[0];
        assert_eq!(issue.kind, FeasibilityKind::AbsurdValue);
        assert_eq!(issue.severity, Severity::High);
        assert!(issue.message.contains("0.25-1.5 lbs"));
    }

    #[test]
    fn test_verdict_is_deterministic() {
        let q = "Should I double the rate of Daconil and spray before it rains near the pond at 98°F?";
        assert_eq!(check_feasibility(q), check_feasibility(q));
        let k = kinds(q);
        assert!(k.contains(&FeasibilityKind::SafetyLabelViolation));
        assert!(k.contains(&FeasibilityKind::SafetyEnvironmental));
        assert!(k.contains(&FeasibilityKind::SafetyWaterBuffer));
        assert!(k.contains(&FeasibilityKind::SafetyHeatPhytotoxicity));
    }

    #[test]
    fn test_grass_season_contradiction() {
        assert_eq!(kinds("best fertilizer for cool-season bermudagrass"), vec![FeasibilityKind::Contradiction]);
        assert!(kinds("is bentgrass a warm-season grass or not warm-season").is_empty());
    }

    #[test]
    fn test_geography() {
        let k = kinds("overseeding bermudagrass in Minnesota in January");
        assert!(k.contains(&FeasibilityKind::GeographicImpossibility));
        assert!(k.contains(&FeasibilityKind::ImpossibleTiming));

        let verdict = check_feasibility("growing zoysia in Michigan");
        assert_eq!(verdict.issues.len(), 1);
        assert_eq!(verdict.issues[0].severity, Severity::Medium);
        let response = verdict.response().unwrap();
        assert_eq!(response.confidence.label, "Needs Clarification");
        assert_eq!(response.confidence.score, 40.0);
        assert!(response.answer.contains("**Note:**"));
    }

    #[test]
    fn test_pre_emergent_and_seeding_conflict() {
        assert_eq!(
            kinds("can I apply Barricade and overseed the same week"),
            vec![FeasibilityKind::ConflictingActions]
        );
        // seedheads are not seeding
        assert!(kinds("does dimension suppress poa seedheads").is_empty());
    }

    #[test]
    fn test_absurd_numbers() {
        assert_eq!(kinds("my soil ph is 14"), vec![FeasibilityKind::AbsurdValue]);
        assert!(kinds("my soil ph is 6.5").is_empty());
        assert_eq!(
            kinds("should I mow at 0.125 inches on my lawn"),
            vec![FeasibilityKind::AbsurdValue]
        );
        assert_eq!(kinds("water 3 inches per night"), vec![FeasibilityKind::AbsurdValue]);
        assert_eq!(kinds("heritage at 10 oz per 1000"), vec![FeasibilityKind::AbsurdValue]);
        assert!(kinds("heritage at 0.4 oz per 1000 for brown patch").is_empty());
    }

    #[test]
    fn test_impossible_scenarios() {
        assert_eq!(kinds("growing bentgrass on Mars"), vec![FeasibilityKind::ImpossibleScenario]);
        assert!(kinds("moss in the marsh area").is_empty());
        let verdict = check_feasibility("which products are in FRAC 99");
        assert_eq!(verdict.issues[0].kind, FeasibilityKind::NonexistentClassification);
        assert!(!verdict.has_high_severity());
        assert!(kinds("rotate with frac 11").is_empty());
    }

    #[test]
    fn test_label_override() {
        assert_eq!(
            kinds("the label says 1 oz but I want to use 3 oz"),
            vec![FeasibilityKind::SafetyLabelViolation]
        );
        assert!(kinds("the label says 1 oz but I want to use 1.2 oz").is_empty());
    }

    #[test]
    fn test_safety_phrases() {
        assert_eq!(
            kinds("can I spray fungicide without gloves"),
            vec![FeasibilityKind::SafetyPpeRequired]
        );
        assert_eq!(
            kinds("can golfers play immediately after we spray the greens"),
            vec![FeasibilityKind::SafetyReiViolation]
        );
        assert_eq!(kinds("can I use the same frac all summer"), vec![FeasibilityKind::SafetyResistanceRisk]);
        assert_eq!(
            kinds("can I pour leftover mix in the ditch"),
            vec![FeasibilityKind::SafetyIllegalDisposal]
        );
        assert_eq!(
            kinds("my fungicide expired last year, can I still use it"),
            vec![FeasibilityKind::SafetyExpiredProduct]
        );
        assert_eq!(
            kinds("should I mix leftover products in one jug"),
            vec![FeasibilityKind::SafetyDangerousMixing]
        );
        // distance, not temperature
        assert!(kinds("spray the fairway 100 feet from the clubhouse").is_empty());
    }

    #[test]
    fn test_high_severity_response() {
        let verdict = check_feasibility("growing bentgrass on the moon");
        let response = verdict.response().unwrap();
        assert_eq!(response.confidence.label, "Issue Detected");
        assert_eq!(response.confidence.score, 0.0);
        assert_eq!(response.short_circuit, Some(ShortCircuit::Feasibility));
        assert!(response.answer.contains("**Impossible Scenario:**"));
        assert!(response.sources.is_empty());
        assert_eq!(verdict.issue_types(), vec!["impossible_scenario"]);
    }
}

//! Pipeline metrics, recorded through the `metrics` facade.
//!
//! Nothing is exported unless the host installs a recorder.

use std::time::Duration;

use turf_advisor_core::{Degraded, ShortCircuit};

pub const ASKS: &str = "turf_advisor_asks_total";
pub const SHORT_CIRCUITS: &str = "turf_advisor_short_circuits_total";
pub const DEGRADED: &str = "turf_advisor_degraded_total";
pub const ANSWER_CACHE: &str = "turf_advisor_answer_cache_total";
pub const NEEDS_REVIEW: &str = "turf_advisor_needs_review_total";
pub const STAGE_SECONDS: &str = "turf_advisor_stage_seconds";
pub const CONFIDENCE: &str = "turf_advisor_confidence";
pub const SPEND_MICRODOLLARS: &str = "turf_advisor_llm_spend_microdollars_total";

pub fn record_ask() {
    metrics::counter!(ASKS).increment(1);
}

pub fn record_short_circuit(reason: ShortCircuit) {
    metrics::counter!(SHORT_CIRCUITS, "reason" => reason.as_str()).increment(1);
}

pub fn record_degraded(degraded: &Degraded) {
    metrics::counter!(DEGRADED, "stage" => degraded.stage).increment(1);
}

pub fn record_answer_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!(ANSWER_CACHE, "result" => result).increment(1);
}

pub fn record_stage(stage: &'static str, elapsed: Duration) {
    metrics::histogram!(STAGE_SECONDS, "stage" => stage).record(elapsed.as_secs_f64());
}

pub fn record_answer(confidence: f32, needs_review: bool) {
    metrics::histogram!(CONFIDENCE).record(confidence as f64);
    if needs_review {
        metrics::counter!(NEEDS_REVIEW).increment(1);
    }
}

/// Spend is tracked in micro-dollars so the counter stays integral
pub fn record_spend(cost_usd: f64) {
    metrics::counter!(SPEND_MICRODOLLARS).increment((cost_usd * 1_000_000.0).round() as u64);
}

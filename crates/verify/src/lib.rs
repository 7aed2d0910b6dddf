//! Answer verification for the turf advisor
//!
//! - **Grounding**: utility-model judge of answer against retrieved context
//! - **Hallucination filter**: dated claims, invented products, wrong
//!   product category, dangerous mixing
//! - **Domain validation**: label rates, mode-of-action codes, disease fit,
//!   germination temperatures
//! - **Confidence**: base score, penalties and per-topic calibration

pub mod calibration;
pub mod confidence;
pub mod grounding;
pub mod hallucination;
pub mod validator;

mod error;
mod text;
mod verifier;

use turf_advisor_core::CheckReport;

pub use calibration::{satisfaction, CalibrationCurve, Calibrator};
pub use confidence::{base_confidence, combine, source_quality};
pub use error::{Result, VerifyError};
pub use grounding::{grounding_adjustment, needs_grounding_warning, GroundingJudge, GROUNDING_WARNING};
pub use hallucination::HallucinationFilter;
pub use validator::{correction_note, DomainValidator};
pub use verifier::{VerifiedAnswer, Verifier};

/// Result of one deterministic check
#[derive(Debug, Clone, Default)]
pub struct CheckOutcome {
    pub report: CheckReport,
    /// Notes to append to the answer
    pub notes: Vec<String>,
}

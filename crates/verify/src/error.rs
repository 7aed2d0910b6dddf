//! Verification errors

use thiserror::Error;

/// Checks themselves never fail; only loading and saving calibration data can.
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Calibration file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Calibration data is malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VerifyError>;

impl From<VerifyError> for turf_advisor_core::Error {
    fn from(err: VerifyError) -> Self {
        turf_advisor_core::Error::Config(err.to_string())
    }
}

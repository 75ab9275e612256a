use thiserror::Error;

/// Errors for malformed API usage and configuration failures
///
/// Out-of-calibration inputs, degenerate geometry and unreachable targets
/// are not errors; they come back as advisories, sentinels and
/// [`crate::SolverOutcome::Unreachable`].
#[derive(Error, Debug)]
pub enum SoaError {
    #[error("Non-finite input {name}: {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("Input power must be non-negative, got {0} mW")]
    NegativeInputPower(f64),

    #[error("Invalid sweep: {0}")]
    InvalidSweep(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SoaResult<T> = Result<T, SoaError>;

pub(crate) fn ensure_finite(name: &'static str, value: f64) -> SoaResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SoaError::NonFinite { name, value })
    }
}

use serde::{Deserialize, Serialize};
use soa_core::inverse::SolverOutcome;
use soa_core::{Advisory, DeviceGeometry, OperatingPoint, RunResult, SweepSpec};
use soa_devices::rsm::params::{
    CALIBRATED_LENGTH_MAX_UM, CALIBRATED_LENGTH_MIN_UM, EXTRAPOLATION_CAP_UM,
    VALID_LENGTH_RANGE_UM, VALID_WIDTH_RANGE_UM,
};
use soa_devices::{Power, RsmCoefficients};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvaluateRequest {
    pub geometry: DeviceGeometry,
    pub operating_point: OperatingPoint,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SolveInputPowerRequest {
    pub geometry: DeviceGeometry,
    pub target_output_power: Power,
    pub drive_current_ma: f64,
    pub wavelength_nm: f64,
    pub temperature_c: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SolveInputPowerResponse {
    pub target_output_power: Power,
    pub outcome: SolverOutcome,
    pub advisories: Vec<Advisory>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SweepRequest {
    pub geometry: DeviceGeometry,
    pub operating_point: OperatingPoint,
    pub sweep: SweepSpec,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunResponse {
    pub run_id: usize,
    pub run: RunResult,
}

/// Coefficient table plus the windows it is valid over
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CalibrationResponse {
    pub coefficients: RsmCoefficients,
    pub calibrated_active_length_um: (f64, f64),
    pub extrapolation_cap_um: f64,
    pub valid_length_um: (f64, f64),
    pub valid_width_um: (f64, f64),
}

impl CalibrationResponse {
    pub fn new(coefficients: RsmCoefficients) -> Self {
        CalibrationResponse {
            coefficients,
            calibrated_active_length_um: (CALIBRATED_LENGTH_MIN_UM, CALIBRATED_LENGTH_MAX_UM),
            extrapolation_cap_um: EXTRAPOLATION_CAP_UM,
            valid_length_um: VALID_LENGTH_RANGE_UM,
            valid_width_um: VALID_WIDTH_RANGE_UM,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub details: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

//! RSM calibration coefficients
//!
//! Contains the `RsmCoefficients` table with the shipped calibration and
//! the fixed geometric constants the regression was fitted against.

use serde::{Deserialize, Serialize};

/// Taper length added to the active length in every length-dependent term [um]
pub const TAPER_LENGTH_UM: f64 = 460.0;

/// Calibrated active-length window of the spectral model [um]
pub const CALIBRATED_LENGTH_MIN_UM: f64 = 40.0;
pub const CALIBRATED_LENGTH_MAX_UM: f64 = 440.0;

/// Reference lengths for the long-device extrapolation [um]
pub const EXTRAPOLATION_REF_LONG_UM: f64 = 440.0;
pub const EXTRAPOLATION_REF_SHORT_UM: f64 = 430.0;

/// Lengths beyond this are evaluated as if they were exactly this long [um]
pub const EXTRAPOLATION_CAP_UM: f64 = 900.0;

/// Advisory windows for device geometry [um]
pub const VALID_LENGTH_RANGE_UM: (f64, f64) = (40.0, 900.0);
pub const VALID_WIDTH_RANGE_UM: (f64, f64) = (2.0, 2.7);

/// Floor applied to the spectral width [nm]
pub const FWHM_FLOOR_NM: f64 = 1e-9;

/// Linear gain at or below this has no dB representation
pub const MIN_LINEAR_GAIN: f64 = 1e-9;

/// Identifier of the calibration shipped in [`RsmCoefficients::default`]
pub const CALIBRATION_VERSION: &str = "o-band-2.0um-r3";

/// Number of terms in a full degree-2 polynomial of three variables
pub const POLY_TERMS: usize = 10;

/// Degree-2 response surface in three variables
///
/// Term order: `[1, x1, x2, x3, x1^2, x2^2, x3^2, x1*x2, x1*x3, x2*x3]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quadratic3(pub [f64; POLY_TERMS]);

impl Quadratic3 {
    pub fn eval(&self, x1: f64, x2: f64, x3: f64) -> f64 {
        let c = &self.0;
        c[0] + c[1] * x1
            + c[2] * x2
            + c[3] * x3
            + c[4] * x1 * x1
            + c[5] * x2 * x2
            + c[6] * x3 * x3
            + c[7] * x1 * x2
            + c[8] * x1 * x3
            + c[9] * x2 * x3
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|c| c.is_finite())
    }
}

/// Versioned RSM coefficient table
///
/// The three spectral surfaces are functions of
/// `(T [C], ln J [ln kA/cm^2], L + 460 [um])`:
///
/// - `peak_gain_db`: peak gain of the spectrum [dB]
/// - `peak_wavelength_nm`: wavelength of the gain peak [nm]
/// - `fwhm_nm`: full width at half maximum of the gain spectrum [nm]
///
/// The saturation surface is a function of `(lambda [nm], T [C], J [kA/cm^2])`
/// and has no length dependence:
///
/// - `saturation_power_dbm`: output saturation power [dBm]
///
/// Tables are immutable once handed to an evaluator. A recalibration ships
/// as a new table with a new `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsmCoefficients {
    pub version: String,
    pub peak_gain_db: Quadratic3,
    pub peak_wavelength_nm: Quadratic3,
    pub fwhm_nm: Quadratic3,
    pub saturation_power_dbm: Quadratic3,
}

impl Default for RsmCoefficients {
    fn default() -> Self {
        Self::calibrated()
    }
}

impl RsmCoefficients {
    /// Shipped O-band calibration
    pub fn calibrated() -> Self {
        RsmCoefficients {
            version: CALIBRATION_VERSION.to_string(),
            peak_gain_db: Quadratic3([
                -14.2, 0.05, 4.1, 0.031, -0.0011, -0.62, -4.5e-6, 0.012, -1.2e-4, 0.0062,
            ]),
            peak_wavelength_nm: Quadratic3([
                1268.0, 0.42, -9.5, 0.052, 0.0008, 1.1, -1.8e-5, -0.015, 1.0e-4, 0.0021,
            ]),
            fwhm_nm: Quadratic3([
                22.0, 0.15, 9.0, 0.02, -0.0004, -0.9, -1.2e-5, 0.01, -2.0e-5, 0.004,
            ]),
            saturation_power_dbm: Quadratic3([
                -169.48, 0.266, -0.06, 1.9, -1.0e-4, -2.0e-4, -0.12, 1.0e-5, 2.0e-4, 0.002,
            ]),
        }
    }

    /// Surfaces in table order, used for validation and overrides
    pub fn surfaces(&self) -> [(&'static str, &Quadratic3); 4] {
        [
            ("pg", &self.peak_gain_db),
            ("pw", &self.peak_wavelength_nm),
            ("fw", &self.fwhm_nm),
            ("ps", &self.saturation_power_dbm),
        ]
    }

    pub fn surface_mut(&mut self, prefix: &str) -> Option<&mut Quadratic3> {
        match prefix {
            "pg" => Some(&mut self.peak_gain_db),
            "pw" => Some(&mut self.peak_wavelength_nm),
            "fw" => Some(&mut self.fwhm_nm),
            "ps" => Some(&mut self.saturation_power_dbm),
            _ => None,
        }
    }

    /// True when every coefficient is finite and the version is set
    pub fn is_valid(&self) -> bool {
        !self.version.trim().is_empty() && self.surfaces().iter().all(|(_, s)| s.is_finite())
    }
}

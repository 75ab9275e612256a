//! SOA Response-Surface Model
//!
//! This module implements the calibrated empirical gain model of a
//! semiconductor optical amplifier: three degree-2 surfaces over
//! (T, ln J, L + 460) for the gain spectrum and one over (lambda, T, J)
//! for the output saturation power.
//!
//! ## Module Structure
//!
//! - `params`: Coefficient table (`RsmCoefficients`) and geometric constants
//! - `types`: Unit-tagged `Gain` / `Power` values and `SpectralPoint`
//! - `evaluate`: Spectral evaluator, length extrapolation, saturation power
//!
//! ## Usage
//!
//! ```
//! use soa_devices::rsm::{unsaturated_gain_linear, saturation_power_dbm, RsmCoefficients};
//!
//! let coeffs = RsmCoefficients::default();
//!
//! // 790 um active section, 1310 nm, 40 C, 4 kA/cm^2
//! let (g0, _regime) = unsaturated_gain_linear(&coeffs, 790.0, 1310.0, 40.0, 4.0, 0.0);
//! let psat = saturation_power_dbm(&coeffs, 1310.0, 4.0, 40.0);
//!
//! assert!(g0 > 1.0);
//! assert!(psat > 0.0);
//! ```
//!
//! ## Calibration ranges
//!
//! | quantity       | calibrated        | behaviour outside                       |
//! |----------------|-------------------|-----------------------------------------|
//! | active length  | 40 - 440 um       | extrapolated up to 900 um, flat beyond  |
//! | device length  | 40 - 900 um       | advisory only                           |
//! | ridge width    | 2.0 - 2.7 um      | advisory only                           |

pub mod evaluate;
pub mod params;
pub mod types;

pub use evaluate::{
    direct_gain_linear, evaluate_spectral, length_regime, lorentzian_gain, saturation_power_dbm,
    unsaturated_gain_linear, LengthRegime,
};
pub use params::{Quadratic3, RsmCoefficients, CALIBRATION_VERSION, POLY_TERMS, TAPER_LENGTH_UM};
pub use types::{Gain, GainUnit, Power, PowerUnit, SpectralPoint};

use std::collections::HashMap;
use thiserror::Error;

/// Problems found while applying coefficient overrides
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OverrideError {
    #[error("Unknown coefficient key '{0}'")]
    UnknownKey(String),
    #[error("Invalid value '{value}' for coefficient '{key}'")]
    InvalidValue { key: String, value: String },
}

/// Apply `key -> value` overrides to a coefficient table
///
/// Keys are a surface prefix followed by the term index:
/// `pg` peak gain, `pw` peak wavelength, `fw` FWHM, `ps` saturation power.
/// `pg3` is the linear length term of the peak-gain surface.
///
/// # Arguments
/// * `table` - Table to start from, usually the shipped calibration
/// * `overrides` - HashMap of key -> value string (SI suffixes allowed)
///
/// # Returns
/// * New table with `version` suffixed by `+override`
pub fn apply_overrides(
    table: &RsmCoefficients,
    overrides: &HashMap<String, String>,
) -> Result<RsmCoefficients, OverrideError> {
    let mut out = table.clone();
    if overrides.is_empty() {
        return Ok(out);
    }

    let mut keys: Vec<&String> = overrides.keys().collect();
    keys.sort();
    for key in keys {
        let value = &overrides[key];
        let lower = key.trim().to_ascii_lowercase();
        if lower.len() < 3 {
            return Err(OverrideError::UnknownKey(key.clone()));
        }
        let (prefix, index) = lower.split_at(2);
        let index: usize = index
            .parse()
            .ok()
            .filter(|i| *i < POLY_TERMS)
            .ok_or_else(|| OverrideError::UnknownKey(key.clone()))?;
        let num = parse_number(value).ok_or_else(|| OverrideError::InvalidValue {
            key: key.clone(),
            value: value.clone(),
        })?;
        let surface = out
            .surface_mut(prefix)
            .ok_or_else(|| OverrideError::UnknownKey(key.clone()))?;
        surface.0[index] = num;
    }

    out.version = format!("{}+override", table.version);
    Ok(out)
}

/// Parse a number with optional SI suffix
pub fn parse_number(s: &str) -> Option<f64> {
    let lower = s.to_ascii_lowercase();
    let trimmed = lower.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if trimmed.ends_with("meg") {
        (&trimmed[..trimmed.len() - 3], 1e6)
    } else {
        let last = trimmed.char_indices().last().map(|(i, _)| i).unwrap_or(0);
        let (value_part, suffix) = trimmed.split_at(last);
        match suffix {
            "f" => (value_part, 1e-15),
            "p" => (value_part, 1e-12),
            "n" => (value_part, 1e-9),
            "u" => (value_part, 1e-6),
            "m" => (value_part, 1e-3),
            "k" => (value_part, 1e3),
            "g" => (value_part, 1e9),
            _ => (trimmed, 1.0),
        }
    };

    num_str
        .parse::<f64>()
        .ok()
        .map(|n| n * multiplier)
        .or_else(|| trimmed.parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

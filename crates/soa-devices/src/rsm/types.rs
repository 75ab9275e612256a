//! Unit-tagged gain and power values
//!
//! Gains and powers never cross an API boundary as bare floats. A value
//! always carries its unit, and conversions that have no finite result
//! (0 mW in dBm, zero gain in dB) produce an explicit variant or `None`
//! instead of `-inf`.

use serde::{Deserialize, Serialize};

use super::params::MIN_LINEAR_GAIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GainUnit {
    Linear,
    Db,
}

impl Default for GainUnit {
    fn default() -> Self {
        GainUnit::Db
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUnit {
    Mw,
    Dbm,
}

impl Default for PowerUnit {
    fn default() -> Self {
        PowerUnit::Mw
    }
}

/// Optical gain with an explicit unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gain {
    /// Power ratio, `>= 0`
    Linear(f64),
    /// `10 * log10(ratio)`
    Db(f64),
    /// Linear gain at or below `MIN_LINEAR_GAIN`; has no dB value
    NoMeasurableGain,
}

impl Gain {
    /// Build a linear gain, clamping negative values to zero
    pub fn from_linear(value: f64) -> Self {
        Gain::Linear(value.max(0.0))
    }

    pub fn linear(&self) -> f64 {
        match *self {
            Gain::Linear(v) => v,
            Gain::Db(db) => 10f64.powf(db / 10.0),
            Gain::NoMeasurableGain => 0.0,
        }
    }

    /// Gain in dB, `None` when there is no measurable gain
    pub fn db(&self) -> Option<f64> {
        match *self {
            Gain::Db(db) => Some(db),
            Gain::Linear(v) if v > MIN_LINEAR_GAIN => Some(10.0 * v.log10()),
            Gain::Linear(_) | Gain::NoMeasurableGain => None,
        }
    }

    pub fn to_unit(self, unit: GainUnit) -> Gain {
        match unit {
            GainUnit::Linear => Gain::Linear(self.linear()),
            GainUnit::Db => match self.db() {
                Some(db) => Gain::Db(db),
                None => Gain::NoMeasurableGain,
            },
        }
    }
}

/// Optical power with an explicit unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Power {
    Mw(f64),
    Dbm(f64),
}

impl Power {
    pub const ZERO: Power = Power::Mw(0.0);

    pub fn mw(&self) -> f64 {
        match *self {
            Power::Mw(v) => v,
            Power::Dbm(dbm) => 10f64.powf(dbm / 10.0),
        }
    }

    /// Power in dBm, `None` for zero or negative milliwatts
    pub fn dbm(&self) -> Option<f64> {
        match *self {
            Power::Dbm(dbm) => Some(dbm),
            Power::Mw(v) if v > 0.0 => Some(10.0 * v.log10()),
            Power::Mw(_) => None,
        }
    }

    /// Convert to `unit`; `None` when the value has no dBm representation
    pub fn to_unit(self, unit: PowerUnit) -> Option<Power> {
        match unit {
            PowerUnit::Mw => Some(Power::Mw(self.mw())),
            PowerUnit::Dbm => self.dbm().map(Power::Dbm),
        }
    }

    pub fn is_finite(&self) -> bool {
        match *self {
            Power::Mw(v) | Power::Dbm(v) => v.is_finite(),
        }
    }
}

/// Intermediate response-surface values at one (L, T, J)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpectralPoint {
    /// Peak gain including the process offset [dB]
    pub peak_gain_db: f64,
    /// Wavelength of the gain peak [nm]
    pub peak_wavelength_nm: f64,
    /// Spectral FWHM, floored at `FWHM_FLOOR_NM` [nm]
    pub fwhm_nm: f64,
}

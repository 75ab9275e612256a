use std::fmt;

use serde::{Deserialize, Serialize};
use soa_devices::electrical::{self, DEFAULT_TURN_ON_VOLTAGE, RS_VALID_TOTAL_LENGTH_UM};
use soa_devices::rsm::params::{VALID_LENGTH_RANGE_UM, VALID_WIDTH_RANGE_UM};
use soa_devices::rsm::{LengthRegime, Power, TAPER_LENGTH_UM};

use crate::error::{ensure_finite, SoaError, SoaResult};

/// Physical description of one SOA
///
/// Immutable for the duration of an analysis. Everything that depends on
/// length takes it from here explicitly; nothing is overwritten and
/// restored mid-call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceGeometry {
    /// Active (gain) section length [um]
    pub active_length_um: f64,
    /// Ridge width [um]
    pub width_um: f64,
    /// Diode turn-on voltage [V]
    #[serde(default = "default_turn_on_voltage")]
    pub turn_on_voltage: f64,
    /// Process offset on the turn-on voltage [V]
    #[serde(default)]
    pub delta_turn_on_voltage: f64,
    /// Process offset on the series resistance [ohm]
    #[serde(default)]
    pub delta_series_resistance: f64,
    /// Process offset on the peak gain [dB]
    #[serde(default)]
    pub delta_peak_gain_db: f64,
}

fn default_turn_on_voltage() -> f64 {
    DEFAULT_TURN_ON_VOLTAGE
}

impl DeviceGeometry {
    /// Nominal device with default turn-on voltage and no process offsets
    ///
    /// Only non-finite values are rejected. Out-of-range and even
    /// non-positive dimensions are accepted and handled downstream.
    pub fn new(active_length_um: f64, width_um: f64) -> SoaResult<Self> {
        let geometry = DeviceGeometry {
            active_length_um: ensure_finite("active_length_um", active_length_um)?,
            width_um: ensure_finite("width_um", width_um)?,
            turn_on_voltage: DEFAULT_TURN_ON_VOLTAGE,
            delta_turn_on_voltage: 0.0,
            delta_series_resistance: 0.0,
            delta_peak_gain_db: 0.0,
        };
        Ok(geometry)
    }

    pub fn with_turn_on_voltage(mut self, volts: f64) -> SoaResult<Self> {
        self.turn_on_voltage = ensure_finite("turn_on_voltage", volts)?;
        Ok(self)
    }

    /// Process-variation offsets (turn-on voltage, series resistance, peak gain)
    pub fn with_deltas(mut self, turn_on_v: f64, series_ohm: f64, peak_gain_db: f64) -> SoaResult<Self> {
        self.delta_turn_on_voltage = ensure_finite("delta_turn_on_voltage", turn_on_v)?;
        self.delta_series_resistance = ensure_finite("delta_series_resistance", series_ohm)?;
        self.delta_peak_gain_db = ensure_finite("delta_peak_gain_db", peak_gain_db)?;
        Ok(self)
    }

    /// Check a deserialized geometry the same way [`DeviceGeometry::new`] does
    pub fn validate(&self) -> SoaResult<()> {
        ensure_finite("active_length_um", self.active_length_um)?;
        ensure_finite("width_um", self.width_um)?;
        ensure_finite("turn_on_voltage", self.turn_on_voltage)?;
        ensure_finite("delta_turn_on_voltage", self.delta_turn_on_voltage)?;
        ensure_finite("delta_series_resistance", self.delta_series_resistance)?;
        ensure_finite("delta_peak_gain_db", self.delta_peak_gain_db)?;
        Ok(())
    }

    pub fn taper_length_um(&self) -> f64 {
        TAPER_LENGTH_UM
    }

    pub fn total_length_um(&self) -> f64 {
        electrical::total_length_um(self.active_length_um)
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.active_length_um > 0.0 && self.width_um > 0.0)
    }

    pub fn effective_turn_on_voltage(&self) -> f64 {
        self.turn_on_voltage + self.delta_turn_on_voltage
    }

    /// Calibration advisories for the geometry alone
    pub fn advisories(&self) -> Vec<Advisory> {
        let mut out = Vec::new();
        if self.is_degenerate() {
            out.push(Advisory::DegenerateGeometry {
                active_length_um: self.active_length_um,
                width_um: self.width_um,
            });
            return out;
        }
        let (lmin, lmax) = VALID_LENGTH_RANGE_UM;
        if self.active_length_um < lmin || self.active_length_um > lmax {
            out.push(Advisory::LengthOutOfRange {
                active_length_um: self.active_length_um,
            });
        }
        let (wmin, wmax) = VALID_WIDTH_RANGE_UM;
        if self.width_um < wmin || self.width_um > wmax {
            out.push(Advisory::WidthOutOfRange {
                width_um: self.width_um,
            });
        }
        out
    }

    /// Advisories that apply to the series-resistance fit
    pub fn electrical_advisories(&self) -> Vec<Advisory> {
        let total = self.total_length_um();
        if self.is_degenerate() || electrical::total_length_in_rs_range(total) {
            Vec::new()
        } else {
            vec![Advisory::TotalLengthOutOfRsRange {
                total_length_um: total,
            }]
        }
    }
}

/// Wavelength, temperature, drive and input power of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatingPoint {
    /// [nm]
    pub wavelength_nm: f64,
    /// [C]
    pub temperature_c: f64,
    /// [kA/cm^2]
    pub current_density: f64,
    pub input_power: Power,
}

impl OperatingPoint {
    pub fn new(
        wavelength_nm: f64,
        temperature_c: f64,
        current_density: f64,
        input_power: Power,
    ) -> SoaResult<Self> {
        let op = OperatingPoint {
            wavelength_nm,
            temperature_c,
            current_density,
            input_power,
        };
        op.validate()?;
        Ok(op)
    }

    pub fn validate(&self) -> SoaResult<()> {
        ensure_finite("wavelength_nm", self.wavelength_nm)?;
        ensure_finite("temperature_c", self.temperature_c)?;
        ensure_finite("current_density", self.current_density)?;
        validate_input_power(self.input_power)?;
        Ok(())
    }

    pub fn with_input_power(self, input_power: Power) -> Self {
        OperatingPoint {
            input_power,
            ..self
        }
    }
}

/// Finite, non-negative input power in mW
pub(crate) fn validate_input_power(power: Power) -> SoaResult<f64> {
    if !power.is_finite() {
        return Err(SoaError::NonFinite {
            name: "input_power",
            value: power.mw(),
        });
    }
    let mw = power.mw();
    if mw < 0.0 {
        return Err(SoaError::NegativeInputPower(mw));
    }
    Ok(mw)
}

/// Non-fatal notice that a result was computed outside calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// Active length outside [40, 900] um
    LengthOutOfRange { active_length_um: f64 },
    /// Width outside [2.0, 2.7] um
    WidthOutOfRange { width_um: f64 },
    /// Total length outside the series-resistance fit
    TotalLengthOutOfRsRange { total_length_um: f64 },
    /// Gain obtained from the long-device extrapolation
    LengthExtrapolated { active_length_um: f64, capped: bool },
    /// Zero or negative length or width
    DegenerateGeometry { active_length_um: f64, width_um: f64 },
    /// Zero or negative current density; gain is zero
    NoCurrent { current_density: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
}

impl Advisory {
    pub fn severity(&self) -> Severity {
        match self {
            Advisory::LengthExtrapolated { capped: false, .. } => Severity::Info,
            Advisory::NoCurrent { .. } => Severity::Info,
            _ => Severity::Warning,
        }
    }

    /// Advisory describing the length regime used for a gain evaluation
    pub fn for_regime(active_length_um: f64, regime: LengthRegime) -> Option<Advisory> {
        match regime {
            LengthRegime::Extrapolated { capped } => Some(Advisory::LengthExtrapolated {
                active_length_um,
                capped,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::LengthOutOfRange { active_length_um } => {
                let (lo, hi) = VALID_LENGTH_RANGE_UM;
                write!(
                    f,
                    "active length {} um outside calibrated range [{}, {}] um",
                    active_length_um, lo, hi
                )
            }
            Advisory::WidthOutOfRange { width_um } => {
                let (lo, hi) = VALID_WIDTH_RANGE_UM;
                write!(f, "width {} um outside calibrated range [{}, {}] um", width_um, lo, hi)
            }
            Advisory::TotalLengthOutOfRsRange { total_length_um } => {
                let (lo, hi) = RS_VALID_TOTAL_LENGTH_UM;
                write!(
                    f,
                    "total length {} um outside series-resistance fit [{}, {}] um",
                    total_length_um, lo, hi
                )
            }
            Advisory::LengthExtrapolated {
                active_length_um,
                capped,
            } => {
                if *capped {
                    write!(f, "active length {} um extrapolated, capped at 900 um", active_length_um)
                } else {
                    write!(f, "active length {} um extrapolated from 430/440 um", active_length_um)
                }
            }
            Advisory::DegenerateGeometry {
                active_length_um,
                width_um,
            } => write!(
                f,
                "degenerate geometry L={} um W={} um, gain forced to zero",
                active_length_um, width_um
            ),
            Advisory::NoCurrent { current_density } => {
                write!(f, "current density {} kA/cm^2 gives no gain", current_density)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nominal_geometry_has_no_advisories() {
        let g = DeviceGeometry::new(300.0, 2.2).unwrap();
        assert!(g.advisories().is_empty());
        assert!(g.electrical_advisories().is_empty());
        assert_eq!(g.total_length_um(), 760.0);
    }

    #[test]
    fn out_of_range_geometry_advises() {
        let g = DeviceGeometry::new(1200.0, 3.0).unwrap();
        let adv = g.advisories();
        assert!(adv.contains(&Advisory::LengthOutOfRange { active_length_um: 1200.0 }));
        assert!(adv.contains(&Advisory::WidthOutOfRange { width_um: 3.0 }));
        assert_eq!(g.electrical_advisories().len(), 1);
    }

    #[test]
    fn degenerate_geometry_is_not_an_error() {
        let g = DeviceGeometry::new(0.0, -1.0).unwrap();
        assert!(g.is_degenerate());
        assert!(matches!(g.advisories()[0], Advisory::DegenerateGeometry { .. }));
    }

    #[test]
    fn non_finite_geometry_rejected() {
        assert!(matches!(
            DeviceGeometry::new(f64::NAN, 2.0),
            Err(SoaError::NonFinite { name: "active_length_um", .. })
        ));
        let g = DeviceGeometry::new(300.0, 2.0).unwrap();
        assert!(g.with_deltas(0.0, f64::INFINITY, 0.0).is_err());
    }

    #[test]
    fn operating_point_rejects_negative_power() {
        let err = OperatingPoint::new(1310.0, 25.0, 4.0, Power::Mw(-1.0)).unwrap_err();
        assert!(matches!(err, SoaError::NegativeInputPower(_)));
        assert!(OperatingPoint::new(1310.0, 25.0, 4.0, Power::Dbm(-10.0)).is_ok());
    }

    #[test]
    fn advisory_serializes_with_kind() {
        let json = serde_json::to_string(&Advisory::WidthOutOfRange { width_um: 3.0 }).unwrap();
        assert_eq!(json, r#"{"kind":"width_out_of_range","width_um":3.0}"#);
    }

    #[test]
    fn geometry_json_defaults() {
        let g: DeviceGeometry =
            serde_json::from_str(r#"{"active_length_um":790.0,"width_um":2.0}"#).unwrap();
        assert_eq!(g.turn_on_voltage, DEFAULT_TURN_ON_VOLTAGE);
        assert_eq!(g.delta_peak_gain_db, 0.0);
    }
}

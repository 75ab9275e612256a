use serde::{Deserialize, Serialize};
use soa_devices::electrical;
use soa_devices::rsm::{self, Gain, GainUnit, Power, RsmCoefficients};

use crate::config::EngineConfig;
use crate::device::{validate_input_power, Advisory, DeviceGeometry, OperatingPoint, Severity};
use crate::error::{ensure_finite, SoaError, SoaResult};
use crate::inverse::{compression_input_power, solve_input_power, SolverOutcome};
use crate::newton::{solve_saturated_gain, NewtonResult};

/// Gain with the advisories raised while computing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GainResult {
    pub gain: Gain,
    pub advisories: Vec<Advisory>,
    /// Present for saturated gains
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver: Option<NewtonResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerResult {
    pub power: Power,
    pub advisories: Vec<Advisory>,
}

/// Inverse-solve outcome with the advisories of the device it was solved on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InverseResult {
    pub outcome: SolverOutcome,
    pub advisories: Vec<Advisory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyResult {
    /// [%], zero when the device cannot be driven
    pub wall_plug_efficiency_pct: f64,
    pub advisories: Vec<Advisory>,
}

/// Electrical state at one drive current
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElectricalPoint {
    /// [mA]
    pub current_ma: f64,
    /// [kA/cm^2]
    pub current_density: f64,
    /// [ohm], infinite for degenerate geometry
    pub series_resistance_ohm: f64,
    /// [V]
    pub voltage: f64,
    /// [mW]
    pub electrical_power_mw: f64,
}

/// Complete evaluation of one device at one operating point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingReport {
    pub operating_point: OperatingPoint,
    pub unsaturated_gain: Gain,
    pub saturated_gain: Gain,
    pub saturation_power: Power,
    pub output_power: Power,
    pub electrical: ElectricalPoint,
    pub wall_plug_efficiency_pct: f64,
    pub solver: NewtonResult,
    pub advisories: Vec<Advisory>,
}

/// SOA model facade
///
/// Holds only immutable configuration. Every method is a pure function
/// of its arguments, so one engine can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> SoaResult<Self> {
        config.validate()?;
        log::info!("engine: calibration {}", config.coefficients.version);
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn coefficients(&self) -> &RsmCoefficients {
        &self.config.coefficients
    }

    fn check_conditions(wavelength_nm: f64, temperature_c: f64) -> SoaResult<()> {
        ensure_finite("wavelength_nm", wavelength_nm)?;
        ensure_finite("temperature_c", temperature_c)?;
        Ok(())
    }

    fn unsaturated_linear(
        &self,
        geometry: &DeviceGeometry,
        wavelength_nm: f64,
        temperature_c: f64,
        current_density: f64,
    ) -> (f64, Vec<Advisory>) {
        let mut advisories = geometry.advisories();
        let g0 = if geometry.is_degenerate() {
            0.0
        } else {
            if !(current_density > 0.0) {
                advisories.push(Advisory::NoCurrent { current_density });
            }
            let (g0, regime) = rsm::unsaturated_gain_linear(
                self.coefficients(),
                geometry.active_length_um,
                wavelength_nm,
                temperature_c,
                current_density,
                geometry.delta_peak_gain_db,
            );
            if let Some(advisory) = Advisory::for_regime(geometry.active_length_um, regime) {
                advisories.push(advisory);
            }
            g0
        };
        for advisory in &advisories {
            match advisory.severity() {
                Severity::Warning => log::warn!("engine: {}", advisory),
                Severity::Info => log::debug!("engine: {}", advisory),
            }
        }
        (g0, advisories)
    }

    fn saturation_mw(&self, wavelength_nm: f64, current_density: f64, temperature_c: f64) -> f64 {
        Power::Dbm(rsm::saturation_power_dbm(
            self.coefficients(),
            wavelength_nm,
            current_density,
            temperature_c,
        ))
        .mw()
    }

    fn electrical_point(&self, geometry: &DeviceGeometry, current_ma: f64) -> ElectricalPoint {
        let total = geometry.total_length_um();
        let rs = electrical::series_resistance(
            geometry.width_um,
            total,
            geometry.delta_series_resistance,
        );
        let voltage =
            electrical::operating_voltage(geometry.effective_turn_on_voltage(), rs, current_ma);
        ElectricalPoint {
            current_ma,
            current_density: electrical::current_density(current_ma, geometry.width_um, total),
            series_resistance_ohm: rs,
            voltage,
            electrical_power_mw: voltage * current_ma,
        }
    }

    /// Small-signal gain at (lambda, T, J)
    pub fn unsaturated_gain(
        &self,
        geometry: &DeviceGeometry,
        wavelength_nm: f64,
        temperature_c: f64,
        current_density: f64,
        unit: GainUnit,
    ) -> SoaResult<GainResult> {
        geometry.validate()?;
        Self::check_conditions(wavelength_nm, temperature_c)?;
        ensure_finite("current_density", current_density)?;
        let (g0, advisories) =
            self.unsaturated_linear(geometry, wavelength_nm, temperature_c, current_density);
        Ok(GainResult {
            gain: Gain::from_linear(g0).to_unit(unit),
            advisories,
            solver: None,
        })
    }

    /// Output saturation power, always in dBm
    pub fn output_saturation_power(
        &self,
        wavelength_nm: f64,
        current_density: f64,
        temperature_c: f64,
    ) -> SoaResult<PowerResult> {
        Self::check_conditions(wavelength_nm, temperature_c)?;
        ensure_finite("current_density", current_density)?;
        Ok(PowerResult {
            power: Power::Dbm(rsm::saturation_power_dbm(
                self.coefficients(),
                wavelength_nm,
                current_density,
                temperature_c,
            )),
            advisories: Vec::new(),
        })
    }

    /// Compressed gain at `input_power`
    pub fn saturated_gain(
        &self,
        geometry: &DeviceGeometry,
        wavelength_nm: f64,
        temperature_c: f64,
        current_density: f64,
        input_power: Power,
        unit: GainUnit,
    ) -> SoaResult<GainResult> {
        geometry.validate()?;
        let op = OperatingPoint::new(wavelength_nm, temperature_c, current_density, input_power)?;
        let (g0, advisories) =
            self.unsaturated_linear(geometry, wavelength_nm, temperature_c, current_density);
        let pos = self.saturation_mw(wavelength_nm, current_density, temperature_c);
        let result = solve_saturated_gain(g0, pos, op.input_power.mw(), &self.config.newton);
        Ok(GainResult {
            gain: Gain::from_linear(result.gain).to_unit(unit),
            advisories,
            solver: Some(result),
        })
    }

    /// Electrical operating state at `current_ma`
    pub fn electrical(&self, geometry: &DeviceGeometry, current_ma: f64) -> SoaResult<ElectricalPoint> {
        geometry.validate()?;
        ensure_finite("current_ma", current_ma)?;
        Ok(self.electrical_point(geometry, current_ma))
    }

    /// Wall-plug efficiency [%] at a drive current
    pub fn wall_plug_efficiency(
        &self,
        geometry: &DeviceGeometry,
        drive_current_ma: f64,
        wavelength_nm: f64,
        temperature_c: f64,
        input_power: Power,
    ) -> SoaResult<EfficiencyResult> {
        geometry.validate()?;
        ensure_finite("drive_current_ma", drive_current_ma)?;
        Self::check_conditions(wavelength_nm, temperature_c)?;
        let pin = validate_input_power(input_power)?;
        if geometry.is_degenerate() {
            return Ok(EfficiencyResult {
                wall_plug_efficiency_pct: 0.0,
                advisories: self.unsaturated_linear(geometry, wavelength_nm, temperature_c, 0.0).1,
            });
        }

        let elec = self.electrical_point(geometry, drive_current_ma);
        let (g0, mut advisories) =
            self.unsaturated_linear(geometry, wavelength_nm, temperature_c, elec.current_density);
        advisories.extend(geometry.electrical_advisories());
        if !(drive_current_ma > 0.0) {
            return Ok(EfficiencyResult {
                wall_plug_efficiency_pct: 0.0,
                advisories,
            });
        }
        let pos = self.saturation_mw(wavelength_nm, elec.current_density, temperature_c);
        let gain = solve_saturated_gain(g0, pos, pin, &self.config.newton).gain;
        Ok(EfficiencyResult {
            wall_plug_efficiency_pct: electrical::wall_plug_efficiency(
                pin,
                gain * pin,
                elec.voltage,
                drive_current_ma,
            ),
            advisories,
        })
    }

    /// Input power that produces `target_output_power` at a drive current
    pub fn solve_input_power_for_target_output(
        &self,
        geometry: &DeviceGeometry,
        target_output_power: Power,
        drive_current_ma: f64,
        wavelength_nm: f64,
        temperature_c: f64,
    ) -> SoaResult<InverseResult> {
        geometry.validate()?;
        if !target_output_power.is_finite() {
            return Err(SoaError::NonFinite {
                name: "target_output_power",
                value: target_output_power.mw(),
            });
        }
        ensure_finite("drive_current_ma", drive_current_ma)?;
        Self::check_conditions(wavelength_nm, temperature_c)?;

        let j = self.electrical_point(geometry, drive_current_ma).current_density;
        let (g0, advisories) = self.unsaturated_linear(geometry, wavelength_nm, temperature_c, j);
        let pos = self.saturation_mw(wavelength_nm, j, temperature_c);
        let outcome = solve_input_power(
            g0,
            pos,
            target_output_power.mw(),
            &self.config.newton,
            &self.config.brent,
        );
        Ok(InverseResult {
            outcome,
            advisories,
        })
    }

    /// Input power at which gain is `compression_db` below its small-signal value
    pub fn compression_point(
        &self,
        geometry: &DeviceGeometry,
        wavelength_nm: f64,
        temperature_c: f64,
        current_density: f64,
        compression_db: f64,
    ) -> SoaResult<InverseResult> {
        geometry.validate()?;
        Self::check_conditions(wavelength_nm, temperature_c)?;
        ensure_finite("current_density", current_density)?;
        ensure_finite("compression_db", compression_db)?;

        let (g0, advisories) =
            self.unsaturated_linear(geometry, wavelength_nm, temperature_c, current_density);
        let pos = self.saturation_mw(wavelength_nm, current_density, temperature_c);
        let outcome = compression_input_power(
            g0,
            pos,
            compression_db,
            &self.config.newton,
            &self.config.brent,
        );
        Ok(InverseResult {
            outcome,
            advisories,
        })
    }

    /// Gain, saturation, output power and electrical state in one pass
    pub fn evaluate(&self, geometry: &DeviceGeometry, op: &OperatingPoint) -> SoaResult<OperatingReport> {
        geometry.validate()?;
        op.validate()?;
        let (g0, mut advisories) = self.unsaturated_linear(
            geometry,
            op.wavelength_nm,
            op.temperature_c,
            op.current_density,
        );
        advisories.extend(geometry.electrical_advisories());

        let psat_dbm = rsm::saturation_power_dbm(
            self.coefficients(),
            op.wavelength_nm,
            op.current_density,
            op.temperature_c,
        );
        let pos = Power::Dbm(psat_dbm).mw();
        let pin = op.input_power.mw();
        let solver = solve_saturated_gain(g0, pos, pin, &self.config.newton);
        let pout = solver.gain * pin;

        let current = electrical::current_from_density(
            op.current_density,
            geometry.width_um,
            geometry.total_length_um(),
        );
        let elec = self.electrical_point(geometry, current);
        let wpe = electrical::wall_plug_efficiency(pin, pout, elec.voltage, current);

        Ok(OperatingReport {
            operating_point: *op,
            unsaturated_gain: Gain::from_linear(g0).to_unit(GainUnit::Db),
            saturated_gain: Gain::from_linear(solver.gain).to_unit(GainUnit::Db),
            saturation_power: Power::Dbm(psat_dbm),
            output_power: Power::Mw(pout),
            electrical: elec,
            wall_plug_efficiency_pct: wpe,
            solver,
            advisories,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> DeviceGeometry {
        DeviceGeometry::new(790.0, 2.0).unwrap()
    }

    #[test]
    fn units_are_explicit() {
        let engine = Engine::default();
        let db = engine.unsaturated_gain(&device(), 1310.0, 40.0, 4.0, GainUnit::Db).unwrap();
        let lin = engine
            .unsaturated_gain(&device(), 1310.0, 40.0, 4.0, GainUnit::Linear)
            .unwrap();
        assert!(matches!(db.gain, Gain::Db(_)));
        assert!(matches!(lin.gain, Gain::Linear(_)));
        assert!((db.gain.linear() / lin.gain.linear() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn extrapolated_length_is_advised() {
        let engine = Engine::default();
        let res = engine.unsaturated_gain(&device(), 1310.0, 40.0, 4.0, GainUnit::Db).unwrap();
        assert!(res
            .advisories
            .iter()
            .any(|a| matches!(a, Advisory::LengthExtrapolated { capped: false, .. })));
    }

    #[test]
    fn zero_current_density_is_no_gain() {
        let engine = Engine::default();
        let res = engine.unsaturated_gain(&device(), 1310.0, 40.0, 0.0, GainUnit::Db).unwrap();
        assert_eq!(res.gain, Gain::NoMeasurableGain);
        assert!(res.advisories.contains(&Advisory::NoCurrent { current_density: 0.0 }));
    }

    #[test]
    fn degenerate_device_has_zero_gain_and_infinite_resistance() {
        let engine = Engine::default();
        let dev = DeviceGeometry::new(790.0, 0.0).unwrap();
        let res = engine.unsaturated_gain(&dev, 1310.0, 40.0, 4.0, GainUnit::Linear).unwrap();
        assert_eq!(res.gain, Gain::Linear(0.0));
        let elec = engine.electrical(&dev, 100.0).unwrap();
        assert_eq!(elec.series_resistance_ohm, f64::INFINITY);
        let wpe = engine
            .wall_plug_efficiency(&dev, 100.0, 1310.0, 40.0, Power::Mw(1.0))
            .unwrap();
        assert_eq!(wpe.wall_plug_efficiency_pct, 0.0);
        assert!(matches!(wpe.advisories[0], Advisory::DegenerateGeometry { .. }));
    }

    #[test]
    fn electrical_point_matches_formulas() {
        let engine = Engine::default();
        let e = engine.electrical(&device(), 100.0).unwrap();
        assert!((e.current_density - 4.0).abs() < 1e-12);
        assert!((e.series_resistance_ohm - 3.6).abs() < 1e-12);
        assert!((e.voltage - 1.26).abs() < 1e-12);
        assert!((e.electrical_power_mw - 126.0).abs() < 1e-9);
    }

    #[test]
    fn evaluate_is_consistent_with_parts() {
        let engine = Engine::default();
        let op = OperatingPoint::new(1310.0, 40.0, 4.0, Power::Mw(1.0)).unwrap();
        let report = engine.evaluate(&device(), &op).unwrap();
        let sat = engine
            .saturated_gain(&device(), 1310.0, 40.0, 4.0, Power::Mw(1.0), GainUnit::Db)
            .unwrap();
        assert_eq!(report.saturated_gain, sat.gain);
        assert!((report.output_power.mw() - sat.gain.linear()).abs() < 1e-9);
        assert!((report.electrical.current_ma - 100.0).abs() < 1e-9);
        let wpe = engine
            .wall_plug_efficiency(&device(), 100.0, 1310.0, 40.0, Power::Mw(1.0))
            .unwrap();
        assert!((report.wall_plug_efficiency_pct - wpe.wall_plug_efficiency_pct).abs() < 1e-9);
        assert!(report.wall_plug_efficiency_pct > 0.0);
        assert_eq!(report.advisories, wpe.advisories);
    }

    #[test]
    fn peak_gain_delta_is_applied() {
        let engine = Engine::default();
        let shifted = device().with_deltas(0.0, 0.0, 1.0).unwrap();
        let base = engine.unsaturated_gain(&device(), 1310.0, 25.0, 4.0, GainUnit::Db).unwrap();
        let up = engine.unsaturated_gain(&shifted, 1310.0, 25.0, 4.0, GainUnit::Db).unwrap();
        // the extrapolation is linear in gain, so a uniform dB offset survives it
        assert!((up.gain.db().unwrap() - base.gain.db().unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn non_finite_input_power_is_rejected() {
        let engine = Engine::default();
        let err = engine
            .saturated_gain(&device(), 1310.0, 40.0, 4.0, Power::Mw(f64::NAN), GainUnit::Linear)
            .unwrap_err();
        assert!(matches!(err, SoaError::NonFinite { name: "input_power", .. }));
        let err = engine
            .wall_plug_efficiency(&device(), 100.0, 1310.0, 40.0, Power::Dbm(f64::INFINITY))
            .unwrap_err();
        assert!(matches!(err, SoaError::NonFinite { name: "input_power", .. }));
    }

    #[test]
    fn negative_input_power_is_rejected() {
        let engine = Engine::default();
        let err = engine
            .saturated_gain(&device(), 1310.0, 40.0, 4.0, Power::Mw(-5.0), GainUnit::Linear)
            .unwrap_err();
        assert!(matches!(err, SoaError::NegativeInputPower(p) if p == -5.0));
        let err = engine
            .wall_plug_efficiency(&device(), 100.0, 1310.0, 40.0, Power::Mw(-1.0))
            .unwrap_err();
        assert!(matches!(err, SoaError::NegativeInputPower(_)));
    }

    #[test]
    fn non_finite_wavelength_is_rejected() {
        let engine = Engine::default();
        let err = engine
            .unsaturated_gain(&device(), f64::NAN, 40.0, 4.0, GainUnit::Db)
            .unwrap_err();
        assert!(matches!(err, SoaError::NonFinite { name: "wavelength_nm", .. }));
        assert!(engine
            .solve_input_power_for_target_output(&device(), Power::Mw(10.0), 100.0, f64::NAN, 40.0)
            .is_err());
        assert!(engine.compression_point(&device(), f64::NAN, 40.0, 4.0, 3.0).is_err());
        assert!(engine.output_saturation_power(f64::NAN, 4.0, 40.0).is_err());
    }

    #[test]
    fn non_finite_target_and_current_are_rejected() {
        let engine = Engine::default();
        let err = engine
            .solve_input_power_for_target_output(&device(), Power::Mw(f64::NAN), 100.0, 1310.0, 40.0)
            .unwrap_err();
        assert!(matches!(err, SoaError::NonFinite { name: "target_output_power", .. }));
        let err = engine
            .solve_input_power_for_target_output(&device(), Power::Mw(10.0), f64::INFINITY, 1310.0, 40.0)
            .unwrap_err();
        assert!(matches!(err, SoaError::NonFinite { name: "drive_current_ma", .. }));
        assert!(engine.electrical(&device(), f64::NAN).is_err());
    }

    #[test]
    fn inverse_paths_carry_advisories() {
        let engine = Engine::default();
        let wide_long = DeviceGeometry::new(1500.0, 3.0).unwrap();
        let solved = engine
            .solve_input_power_for_target_output(&wide_long, Power::Mw(10.0), 150.0, 1310.0, 40.0)
            .unwrap();
        assert!(solved.outcome.is_solved());
        assert!(solved
            .advisories
            .contains(&Advisory::LengthOutOfRange { active_length_um: 1500.0 }));
        assert!(solved.advisories.contains(&Advisory::WidthOutOfRange { width_um: 3.0 }));
        assert!(solved
            .advisories
            .iter()
            .any(|a| matches!(a, Advisory::LengthExtrapolated { capped: true, .. })));

        let compression = engine.compression_point(&wide_long, 1310.0, 40.0, 4.0, 3.0).unwrap();
        assert_eq!(compression.advisories.len(), 3);

        let wpe = engine
            .wall_plug_efficiency(&wide_long, 150.0, 1310.0, 40.0, Power::Mw(1.0))
            .unwrap();
        assert!(wpe
            .advisories
            .iter()
            .any(|a| matches!(a, Advisory::TotalLengthOutOfRsRange { .. })));
    }
}

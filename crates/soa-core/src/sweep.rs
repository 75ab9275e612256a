//! Batch sweeps
//!
//! Every point is an independent call to [`Engine::evaluate`], so points
//! are spread over the rayon pool. Results come back in the order of the
//! swept values regardless of how the pool scheduled them.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use soa_devices::electrical;
use soa_devices::rsm::Power;

use crate::device::{DeviceGeometry, OperatingPoint};
use crate::engine::{Engine, OperatingReport};
use crate::error::{SoaError, SoaResult};

/// Largest number of points a single sweep may request
pub const MAX_SWEEP_POINTS: usize = 100_000;

/// Quantity varied by a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    /// Gain spectrum [nm]
    Wavelength,
    /// Transfer curve [mW]
    InputPower,
    /// Drive current [mA]; J follows from the geometry
    Current,
    /// Active length [um]
    ActiveLength,
}

impl SweepKind {
    pub fn name(&self) -> &'static str {
        match self {
            SweepKind::Wavelength => "wavelength",
            SweepKind::InputPower => "input_power",
            SweepKind::Current => "current",
            SweepKind::ActiveLength => "active_length",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            SweepKind::Wavelength => "nm",
            SweepKind::InputPower => "mW",
            SweepKind::Current => "mA",
            SweepKind::ActiveLength => "um",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spacing {
    #[default]
    Linear,
    Log,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSpec {
    pub kind: SweepKind,
    pub start: f64,
    pub stop: f64,
    pub points: usize,
    #[serde(default)]
    pub spacing: Spacing,
}

impl SweepSpec {
    pub fn linear(kind: SweepKind, start: f64, stop: f64, points: usize) -> Self {
        SweepSpec {
            kind,
            start,
            stop,
            points,
            spacing: Spacing::Linear,
        }
    }

    pub fn log(kind: SweepKind, start: f64, stop: f64, points: usize) -> Self {
        SweepSpec {
            spacing: Spacing::Log,
            ..Self::linear(kind, start, stop, points)
        }
    }

    pub fn validate(&self) -> SoaResult<()> {
        if self.points == 0 {
            return Err(SoaError::InvalidSweep("points must be at least 1".into()));
        }
        if self.points > MAX_SWEEP_POINTS {
            return Err(SoaError::InvalidSweep(format!(
                "{} points requested, at most {} allowed",
                self.points, MAX_SWEEP_POINTS
            )));
        }
        if !(self.start.is_finite() && self.stop.is_finite()) {
            return Err(SoaError::InvalidSweep(format!(
                "non-finite range [{}, {}]",
                self.start, self.stop
            )));
        }
        if self.spacing == Spacing::Log && !(self.start > 0.0 && self.stop > 0.0) {
            return Err(SoaError::InvalidSweep(
                "log spacing needs a strictly positive range".into(),
            ));
        }
        if self.kind == SweepKind::InputPower && (self.start < 0.0 || self.stop < 0.0) {
            return Err(SoaError::InvalidSweep(
                "input power sweep must not go negative".into(),
            ));
        }
        Ok(())
    }

    /// Swept values, first and last exactly `start` and `stop`
    pub fn values(&self) -> SoaResult<Vec<f64>> {
        self.validate()?;
        if self.points == 1 {
            return Ok(vec![self.start]);
        }
        let last = (self.points - 1) as f64;
        let values = (0..self.points)
            .map(|i| {
                if i == 0 {
                    return self.start;
                }
                if i == self.points - 1 {
                    return self.stop;
                }
                let t = i as f64 / last;
                match self.spacing {
                    Spacing::Linear => self.start + (self.stop - self.start) * t,
                    Spacing::Log => self.start * (self.stop / self.start).powf(t),
                }
            })
            .collect();
        Ok(values)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    /// Swept value in the unit of the sweep kind
    pub value: f64,
    pub report: OperatingReport,
}

/// Run a sweep around a base device and operating point
pub fn run_sweep(
    engine: &Engine,
    geometry: &DeviceGeometry,
    base: &OperatingPoint,
    spec: &SweepSpec,
) -> SoaResult<Vec<SweepPoint>> {
    geometry.validate()?;
    base.validate()?;
    let values = spec.values()?;
    log::info!(
        "sweep: {:?} {} points over [{}, {}] {}",
        spec.kind,
        values.len(),
        spec.start,
        spec.stop,
        spec.kind.unit()
    );

    let points = values
        .par_iter()
        .map(|&value| -> SoaResult<SweepPoint> {
            let (geometry, op) = point_inputs(geometry, base, spec.kind, value);
            Ok(SweepPoint {
                value,
                report: engine.evaluate(&geometry, &op)?,
            })
        })
        .collect::<SoaResult<Vec<_>>>()?;
    Ok(points)
}

fn point_inputs(
    geometry: &DeviceGeometry,
    base: &OperatingPoint,
    kind: SweepKind,
    value: f64,
) -> (DeviceGeometry, OperatingPoint) {
    let mut geometry = geometry.clone();
    let mut op = *base;
    match kind {
        SweepKind::Wavelength => op.wavelength_nm = value,
        SweepKind::InputPower => op.input_power = Power::Mw(value),
        SweepKind::Current => {
            op.current_density = electrical::current_density(
                value,
                geometry.width_um,
                geometry.total_length_um(),
            )
        }
        SweepKind::ActiveLength => geometry.active_length_um = value,
    }
    (geometry, op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_values_hit_endpoints() {
        let v = SweepSpec::linear(SweepKind::Wavelength, 1260.0, 1360.0, 11)
            .values()
            .unwrap();
        assert_eq!(v.len(), 11);
        assert_eq!(v[0], 1260.0);
        assert_eq!(v[10], 1360.0);
        assert!((v[5] - 1310.0).abs() < 1e-9);
    }

    #[test]
    fn log_values_are_geometric() {
        let v = SweepSpec::log(SweepKind::InputPower, 0.01, 100.0, 5)
            .values()
            .unwrap();
        assert_eq!(v[0], 0.01);
        assert_eq!(v[4], 100.0);
        assert!((v[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_point_is_start() {
        let v = SweepSpec::linear(SweepKind::Current, 80.0, 200.0, 1)
            .values()
            .unwrap();
        assert_eq!(v, vec![80.0]);
    }

    #[test]
    fn invalid_specs_rejected() {
        let bad = [
            SweepSpec::linear(SweepKind::Wavelength, 1260.0, 1360.0, 0),
            SweepSpec::linear(SweepKind::Wavelength, f64::NAN, 1360.0, 3),
            SweepSpec::log(SweepKind::Current, 0.0, 100.0, 3),
            SweepSpec::linear(SweepKind::InputPower, -1.0, 1.0, 3),
            SweepSpec::linear(SweepKind::Wavelength, 1260.0, 1360.0, MAX_SWEEP_POINTS + 1),
            SweepSpec::linear(SweepKind::Wavelength, 1260.0, 1360.0, usize::MAX),
        ];
        for spec in bad {
            assert!(matches!(spec.values(), Err(SoaError::InvalidSweep(_))), "{:?}", spec);
        }
    }

    #[test]
    fn largest_allowed_sweep_is_accepted() {
        let spec = SweepSpec::linear(SweepKind::Wavelength, 1260.0, 1360.0, MAX_SWEEP_POINTS);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn current_point_sets_density() {
        let geometry = DeviceGeometry::new(790.0, 2.0).unwrap();
        let base = OperatingPoint::new(1310.0, 25.0, 1.0, Power::Mw(0.1)).unwrap();
        let (_, op) = point_inputs(&geometry, &base, SweepKind::Current, 100.0);
        assert!((op.current_density - 4.0).abs() < 1e-12);
    }
}

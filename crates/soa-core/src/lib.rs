//! Semiconductor optical amplifier engine.
//!
//! [`Engine`] wraps the response-surface model from `soa-devices` with the
//! saturated-gain Newton solve, the Brent inverse solves, the electrical
//! model and parallel sweeps. Out-of-calibration inputs produce
//! [`Advisory`] values next to the result; only malformed input is an
//! [`SoaError`].

pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod inverse;
pub mod newton;
pub mod result_store;
pub mod solver;
pub mod sweep;
pub mod table;

pub use config::{BrentConfig, EngineConfig, NewtonConfig};
pub use device::{Advisory, DeviceGeometry, OperatingPoint, Severity};
pub use engine::{
    EfficiencyResult, ElectricalPoint, Engine, GainResult, InverseResult, OperatingReport,
    PowerResult,
};
pub use error::{SoaError, SoaResult};
pub use inverse::SolverOutcome;
pub use newton::{NewtonExit, NewtonResult};
pub use result_store::{ResultStore, RunId, RunResult, RunStatus, DEFAULT_MAX_RUNS};
pub use solver::{BrentSolver, RootFinder, SolverError};
pub use sweep::{run_sweep, Spacing, SweepKind, SweepPoint, SweepSpec, MAX_SWEEP_POINTS};

pub use soa_devices::{Gain, GainUnit, Power, PowerUnit, RsmCoefficients};

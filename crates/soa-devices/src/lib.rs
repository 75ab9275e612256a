//! Device-level models for semiconductor optical amplifiers.
//!
//! - [`rsm`]: calibrated response-surface model for unsaturated gain and
//!   output saturation power, plus the unit-tagged `Gain` / `Power` types
//! - [`electrical`]: series resistance, voltage, current density and
//!   wall-plug efficiency
//!
//! Everything here is a pure function of its arguments. Geometry is passed
//! explicitly, never cached, so evaluations are safe to run in parallel.

pub mod electrical;
pub mod rsm;

pub use rsm::{Gain, GainUnit, Power, PowerUnit, RsmCoefficients, SpectralPoint};

//! Inverse power problems
//!
//! Both searches wrap the saturated-gain solver in a bracketed Brent
//! solve over input power:
//!
//! - target output: `h(Pin) = G(Pin) * Pin - Pout_target`
//! - compression:   `c(Pin) = 10*log10(G(Pin) / g0) + compression_db`
//!
//! A missing sign change or a solve that does not converge is a normal
//! outcome, reported as [`SolverOutcome::Unreachable`].

use serde::{Deserialize, Serialize};
use soa_devices::rsm::params::MIN_LINEAR_GAIN;
use soa_devices::rsm::Power;

use crate::config::{BrentConfig, NewtonConfig};
use crate::newton::{solve_saturated_gain, NEGLIGIBLE_MW};
use crate::solver::{BrentSolver, RootFinder, SolverError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SolverOutcome {
    Solved {
        input_power: Power,
        iterations: usize,
    },
    Unreachable {
        reason: SolverError,
    },
}

impl SolverOutcome {
    pub fn input_power(&self) -> Option<Power> {
        match self {
            SolverOutcome::Solved { input_power, .. } => Some(*input_power),
            SolverOutcome::Unreachable { .. } => None,
        }
    }

    pub fn is_solved(&self) -> bool {
        matches!(self, SolverOutcome::Solved { .. })
    }
}

impl From<Result<crate::solver::Root, SolverError>> for SolverOutcome {
    fn from(result: Result<crate::solver::Root, SolverError>) -> Self {
        match result {
            Ok(root) => SolverOutcome::Solved {
                input_power: Power::Mw(root.x),
                iterations: root.iterations,
            },
            Err(reason) => SolverOutcome::Unreachable { reason },
        }
    }
}

/// Input-power bracket for a problem whose natural power scale is `scale_mw`
pub fn bracket(config: &BrentConfig, scale_mw: f64) -> (f64, f64) {
    let hi = (config.upper_factor * scale_mw).max(config.min_upper_mw);
    (config.lower_bracket_mw, hi)
}

/// Input power [mW] that yields `target_mw` at the output
///
/// # Arguments
/// * `g0` - Unsaturated linear gain
/// * `output_saturation_mw` - Output saturation power Pos [mW]
/// * `target_mw` - Requested output power [mW]
pub fn solve_input_power(
    g0: f64,
    output_saturation_mw: f64,
    target_mw: f64,
    newton: &NewtonConfig,
    brent: &BrentConfig,
) -> SolverOutcome {
    if target_mw <= NEGLIGIBLE_MW {
        return SolverOutcome::Solved {
            input_power: Power::ZERO,
            iterations: 0,
        };
    }

    let (lo, hi) = bracket(brent, target_mw);
    let objective = |pin: f64| {
        solve_saturated_gain(g0, output_saturation_mw, pin, newton).gain * pin - target_mw
    };
    let outcome = SolverOutcome::from(BrentSolver::new(brent).find_root(objective, lo, hi));
    if let SolverOutcome::Unreachable { reason } = &outcome {
        log::debug!(
            "inverse: target {:.4e} mW unreachable with g0={:.4e}: {:?}",
            target_mw,
            g0,
            reason
        );
    }
    outcome
}

/// Input power [mW] at which the gain has compressed by `compression_db`
///
/// The bracket scales with the output saturation power. Devices that do
/// not compress (g0 at or below the 3 dB reference) never reach the point.
pub fn compression_input_power(
    g0: f64,
    output_saturation_mw: f64,
    compression_db: f64,
    newton: &NewtonConfig,
    brent: &BrentConfig,
) -> SolverOutcome {
    if compression_db <= 0.0 {
        return SolverOutcome::Solved {
            input_power: Power::ZERO,
            iterations: 0,
        };
    }
    if g0 <= MIN_LINEAR_GAIN {
        return SolverOutcome::Unreachable {
            reason: SolverError::NoSignChange {
                f_lo: compression_db,
                f_hi: compression_db,
            },
        };
    }

    let (lo, hi) = bracket(brent, output_saturation_mw);
    let objective = |pin: f64| {
        let g = solve_saturated_gain(g0, output_saturation_mw, pin, newton).gain;
        10.0 * (g / g0).max(MIN_LINEAR_GAIN).log10() + compression_db
    };
    SolverOutcome::from(BrentSolver::new(brent).find_root(objective, lo, hi))
}

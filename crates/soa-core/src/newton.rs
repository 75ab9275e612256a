//! Saturated-gain solver
//!
//! Solves the gain self-consistency relation
//!
//! ```text
//! g = g0 * exp((1 - g) * Pin / Ps),    Ps = Pos * (g0 - 2) / (g0 * ln 2)
//! ```
//!
//! with Newton-Raphson on `f(g) = g - g0 * exp((1 - g) * Pin / Ps)`.
//! `Ps` is chosen so that the gain has dropped by 3 dB when the output
//! power equals `Pos`.
//!
//! The solver never fails. When it cannot meet tolerance it returns its
//! last estimate and says so in [`NewtonExit`].

use serde::{Deserialize, Serialize};

use crate::config::NewtonConfig;

/// Unsaturated gains at or below this do not compress
pub const MIN_COMPRESSIBLE_GAIN: f64 = 2.000001;

/// Powers and saturation constants at or below this count as zero [mW]
pub const NEGLIGIBLE_MW: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewtonExit {
    /// Residual and step both under tolerance
    Converged,
    /// Closed-form answer, no iteration needed
    Shortcut,
    /// Iteration budget spent
    MaxIters,
    /// A step left the sane bracket; last in-bracket estimate returned
    LeftBracket,
    /// Derivative vanished or overflowed
    NonFinite,
}

impl NewtonExit {
    pub fn is_converged(&self) -> bool {
        matches!(self, NewtonExit::Converged | NewtonExit::Shortcut)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewtonResult {
    /// Saturated linear gain, never negative
    pub gain: f64,
    pub iterations: usize,
    pub exit: NewtonExit,
    /// `|f(g)|` at the returned gain
    pub residual: f64,
}

impl NewtonResult {
    fn shortcut(gain: f64) -> Self {
        NewtonResult {
            gain,
            iterations: 0,
            exit: NewtonExit::Shortcut,
            residual: 0.0,
        }
    }
}

/// `exp(x)` with the argument clamped; beyond the clamp the result is
/// exactly `0` or `+inf`
pub fn clamped_exp(x: f64, clamp: f64) -> f64 {
    if x > clamp {
        f64::INFINITY
    } else if x < -clamp {
        0.0
    } else {
        x.exp()
    }
}

/// Saturation power constant `Ps` [mW] from output saturation power [mW]
pub fn saturation_constant(g0: f64, output_saturation_mw: f64) -> f64 {
    output_saturation_mw * (g0 - 2.0) / (g0 * std::f64::consts::LN_2)
}

/// Saturated linear gain at `input_mw`
///
/// # Arguments
/// * `g0` - Unsaturated linear gain
/// * `output_saturation_mw` - Output saturation power Pos [mW]
/// * `input_mw` - Input power [mW]
/// * `config` - Iteration budget and tolerances
pub fn solve_saturated_gain(
    g0: f64,
    output_saturation_mw: f64,
    input_mw: f64,
    config: &NewtonConfig,
) -> NewtonResult {
    if g0 <= MIN_COMPRESSIBLE_GAIN {
        return NewtonResult::shortcut(g0);
    }
    let ps = saturation_constant(g0, output_saturation_mw);
    if ps <= NEGLIGIBLE_MW {
        let gain = if input_mw > NEGLIGIBLE_MW { 0.0 } else { g0 };
        return NewtonResult::shortcut(gain);
    }
    if input_mw <= NEGLIGIBLE_MW {
        return NewtonResult::shortcut(g0);
    }

    let ratio = input_mw / ps;
    let clamp = config.exp_clamp;
    let lower = -0.1 * g0;
    let upper = 1.5 * g0 + 1.0;
    let residual_at = |g: f64| g - g0 * clamped_exp((1.0 - g) * ratio, clamp);

    let mut g = (config.initial_fraction * g0).max(config.min_guess);
    let mut exit = NewtonExit::MaxIters;
    let mut iterations = 0;

    for iter in 0..config.max_iters {
        iterations = iter + 1;
        let e = clamped_exp((1.0 - g) * ratio, clamp);
        let f = g - g0 * e;
        let df = 1.0 + g0 * ratio * e;
        if !df.is_finite() || df == 0.0 {
            exit = NewtonExit::NonFinite;
            break;
        }

        let step = -f / df;
        let next = g + step;
        if !(next > lower && next < upper) {
            exit = NewtonExit::LeftBracket;
            break;
        }
        g = next;

        if residual_at(g).abs() < config.residual_tol && step.abs() < config.step_tol {
            exit = NewtonExit::Converged;
            break;
        }
    }

    let result = NewtonResult {
        gain: g.max(0.0),
        iterations,
        exit,
        residual: residual_at(g).abs(),
    };
    if !exit.is_converged() {
        log::debug!(
            "newton: g0={:.4e} Pin={:.4e} mW exit={:?} after {} iters, residual {:.3e}",
            g0,
            input_mw,
            exit,
            iterations,
            result.residual
        );
    }
    result
}

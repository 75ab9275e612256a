use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BrentConfig;

#[derive(Error, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SolverError {
    /// `f(lo)` and `f(hi)` have the same sign
    #[error("No sign change over the bracket: f(lo)={f_lo:.4e}, f(hi)={f_hi:.4e}")]
    NoSignChange { f_lo: f64, f_hi: f64 },
    /// Iteration budget spent before the bracket shrank below tolerance
    #[error("Not converged after {iterations} iterations, best estimate {best:.6e}")]
    NotConverged { iterations: usize, best: f64 },
    /// Objective produced NaN or an infinity at an endpoint
    #[error("Objective is not finite at a bracket endpoint")]
    NonFiniteObjective,
    #[error("Invalid bracket [{lo}, {hi}]")]
    InvalidBracket { lo: f64, hi: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Root {
    pub x: f64,
    pub iterations: usize,
    pub evaluations: usize,
}

/// Bracketed scalar root finder
pub trait RootFinder {
    fn find_root<F>(&self, f: F, lo: f64, hi: f64) -> Result<Root, SolverError>
    where
        F: FnMut(f64) -> f64;
}

/// Brent's method: bisection safeguarded inverse quadratic interpolation
#[derive(Debug, Clone)]
pub struct BrentSolver {
    pub max_iters: usize,
    pub xtol: f64,
    pub rtol: f64,
}

impl BrentSolver {
    pub fn new(config: &BrentConfig) -> Self {
        Self {
            max_iters: config.max_iters,
            xtol: config.xtol,
            rtol: config.rtol,
        }
    }
}

impl Default for BrentSolver {
    fn default() -> Self {
        Self::new(&BrentConfig::default())
    }
}

impl RootFinder for BrentSolver {
    fn find_root<F>(&self, mut f: F, lo: f64, hi: f64) -> Result<Root, SolverError>
    where
        F: FnMut(f64) -> f64,
    {
        if !(lo.is_finite() && hi.is_finite()) || lo >= hi {
            return Err(SolverError::InvalidBracket { lo, hi });
        }

        // b is the best estimate, a the previous one, c the contrapoint
        let mut a = lo;
        let mut b = hi;
        let mut fa = f(a);
        let mut fb = f(b);
        let mut evaluations = 2;

        if !(fa.is_finite() && fb.is_finite()) {
            return Err(SolverError::NonFiniteObjective);
        }
        if fa * fb > 0.0 {
            return Err(SolverError::NoSignChange { f_lo: fa, f_hi: fb });
        }
        if fa == 0.0 {
            return Ok(Root { x: a, iterations: 0, evaluations });
        }
        if fb == 0.0 {
            return Ok(Root { x: b, iterations: 0, evaluations });
        }

        let mut c = a;
        let mut fc = fa;
        let mut d = b - a;
        let mut e = d;

        for iter in 0..self.max_iters {
            if fb * fc > 0.0 {
                c = a;
                fc = fa;
                d = b - a;
                e = d;
            }
            if fc.abs() < fb.abs() {
                a = b;
                b = c;
                c = a;
                fa = fb;
                fb = fc;
                fc = fa;
            }

            let tol = 2.0 * self.rtol * b.abs() + 0.5 * self.xtol;
            let m = 0.5 * (c - b);
            if m.abs() <= tol || fb == 0.0 {
                return Ok(Root {
                    x: b,
                    iterations: iter,
                    evaluations,
                });
            }

            if e.abs() >= tol && fa.abs() > fb.abs() {
                let s = fb / fa;
                let mut p;
                let mut q;
                if a == c {
                    // secant
                    p = 2.0 * m * s;
                    q = 1.0 - s;
                } else {
                    // inverse quadratic interpolation
                    let qa = fa / fc;
                    let r = fb / fc;
                    p = s * (2.0 * m * qa * (qa - r) - (b - a) * (r - 1.0));
                    q = (qa - 1.0) * (r - 1.0) * (s - 1.0);
                }
                if p > 0.0 {
                    q = -q;
                } else {
                    p = -p;
                }
                if 2.0 * p < (3.0 * m * q - (tol * q).abs()).min((e * q).abs()) {
                    e = d;
                    d = p / q;
                } else {
                    d = m;
                    e = m;
                }
            } else {
                d = m;
                e = m;
            }

            a = b;
            fa = fb;
            if d.abs() > tol {
                b += d;
            } else {
                b += if m > 0.0 { tol } else { -tol };
            }
            fb = f(b);
            evaluations += 1;
            if !fb.is_finite() {
                return Err(SolverError::NonFiniteObjective);
            }
        }

        log::debug!(
            "brent: no convergence in {} iterations, best x={:.6e} f={:.3e}",
            self.max_iters,
            b,
            fb
        );
        Err(SolverError::NotConverged {
            iterations: self.max_iters,
            best: b,
        })
    }
}

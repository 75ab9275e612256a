use std::path::Path;

use serde::{Deserialize, Serialize};
use soa_devices::rsm::RsmCoefficients;

use crate::error::{SoaError, SoaResult};

/// Newton-Raphson settings for the saturated-gain solve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewtonConfig {
    pub max_iters: usize,
    /// Convergence requires `|f(g)|` below this
    pub residual_tol: f64,
    /// ... and `|dg|` below this
    pub step_tol: f64,
    /// Exponent arguments are clamped to `[-exp_clamp, exp_clamp]`
    pub exp_clamp: f64,
    /// Initial guess as a fraction of g0
    pub initial_fraction: f64,
    /// Floor on the initial guess
    pub min_guess: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iters: 100,
            residual_tol: 1e-5,
            step_tol: 1e-4,
            exp_clamp: 700.0,
            initial_fraction: 0.95,
            min_guess: 1e-9,
        }
    }
}

/// Brent root-finder settings for inverse power problems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrentConfig {
    pub max_iters: usize,
    /// Absolute tolerance on the root [mW]
    pub xtol: f64,
    /// Relative tolerance on the root
    pub rtol: f64,
    /// Lower end of the input-power bracket [mW]
    pub lower_bracket_mw: f64,
    /// Upper end is `upper_factor * target`, at least `min_upper_mw`
    pub upper_factor: f64,
    pub min_upper_mw: f64,
}

impl Default for BrentConfig {
    fn default() -> Self {
        Self {
            max_iters: 100,
            xtol: 2e-12,
            rtol: 4.0 * f64::EPSILON,
            lower_bracket_mw: 1e-7,
            upper_factor: 10.0,
            min_upper_mw: 1e-5,
        }
    }
}

/// Everything the engine needs besides device and operating point
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub coefficients: RsmCoefficients,
    pub newton: NewtonConfig,
    pub brent: BrentConfig,
}

impl EngineConfig {
    pub fn from_json_str(text: &str) -> SoaResult<Self> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> SoaResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        log::info!(
            "config: loaded {} (calibration {})",
            path.display(),
            config.coefficients.version
        );
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> SoaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> SoaResult<()> {
        if !self.coefficients.is_valid() {
            return Err(SoaError::Config(format!(
                "coefficient table '{}' has an empty version or non-finite coefficients",
                self.coefficients.version
            )));
        }

        let n = &self.newton;
        if n.max_iters == 0 {
            return Err(SoaError::Config("newton.max_iters must be at least 1".into()));
        }
        let positive = [
            ("newton.residual_tol", n.residual_tol),
            ("newton.step_tol", n.step_tol),
            ("newton.exp_clamp", n.exp_clamp),
            ("newton.initial_fraction", n.initial_fraction),
            ("newton.min_guess", n.min_guess),
            ("brent.xtol", self.brent.xtol),
            ("brent.rtol", self.brent.rtol),
            ("brent.lower_bracket_mw", self.brent.lower_bracket_mw),
            ("brent.upper_factor", self.brent.upper_factor),
            ("brent.min_upper_mw", self.brent.min_upper_mw),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(SoaError::Config(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }

        let b = &self.brent;
        if b.max_iters == 0 {
            return Err(SoaError::Config("brent.max_iters must be at least 1".into()));
        }
        if b.min_upper_mw <= b.lower_bracket_mw {
            return Err(SoaError::Config(
                "brent.min_upper_mw must exceed brent.lower_bracket_mw".into(),
            ));
        }
        Ok(())
    }
}

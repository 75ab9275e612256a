//! RSM Evaluation
//!
//! Evaluates the calibrated response surfaces and turns them into an
//! unsaturated gain at an arbitrary wavelength.
//!
//! ## Spectral shape
//!
//! ```text
//! f(lambda)  = FWHM / ((lambda_pk - lambda)^2 + (FWHM/2)^2)
//! g0(lambda) = 10^(g_pk/10) * f(lambda) / (4/FWHM)
//! ```
//!
//! so the spectrum peaks at `lambda_pk` with exactly `g_pk` dB.
//!
//! ## Length regimes
//!
//! | active length L0      | evaluation                                           |
//! |-----------------------|------------------------------------------------------|
//! | `L0 <= 0`             | zero gain                                            |
//! | `0 < L0 < 40`         | direct surface at L0 (outside calibration)           |
//! | `40 <= L0 <= 440`     | direct surface at L0                                 |
//! | `L0 > 440`            | linear extrapolation from 430/440 um, capped at 900  |
//!
//! The extrapolation runs on linear gain and its cap makes every device
//! longer than 900 um evaluate identically.

use serde::{Deserialize, Serialize};

use super::params::{
    RsmCoefficients, CALIBRATED_LENGTH_MAX_UM, CALIBRATED_LENGTH_MIN_UM, EXTRAPOLATION_CAP_UM,
    EXTRAPOLATION_REF_LONG_UM, EXTRAPOLATION_REF_SHORT_UM, FWHM_FLOOR_NM, TAPER_LENGTH_UM,
};
use super::types::SpectralPoint;

/// Lorentzian denominators at or below this are treated as a delta peak
const DENOM_FLOOR: f64 = 1e-300;

/// How the active length was mapped onto the calibrated surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthRegime {
    /// Non-positive length, zero gain
    Degenerate,
    /// Shorter than the calibrated window, evaluated directly
    BelowCalibrated,
    Calibrated,
    /// Longer than the calibrated window; `capped` when L0 > 900 um
    Extrapolated { capped: bool },
}

/// Evaluate the three spectral surfaces at (L, T, J)
///
/// # Arguments
/// * `coeffs` - Coefficient table
/// * `active_length_um` - Active length, used as given [um]
/// * `temperature_c` - Temperature [C]
/// * `current_density` - Current density [kA/cm^2]
/// * `peak_gain_delta_db` - Process offset added to the peak gain [dB]
///
/// # Returns
/// * `None` when `current_density <= 0` (no log-current exists)
pub fn evaluate_spectral(
    coeffs: &RsmCoefficients,
    active_length_um: f64,
    temperature_c: f64,
    current_density: f64,
    peak_gain_delta_db: f64,
) -> Option<SpectralPoint> {
    if !(current_density > 0.0) {
        return None;
    }
    let ln_j = current_density.ln();
    let total_length = active_length_um + TAPER_LENGTH_UM;

    let peak_gain_db = coeffs.peak_gain_db.eval(temperature_c, ln_j, total_length)
        + peak_gain_delta_db;
    let peak_wavelength_nm = coeffs
        .peak_wavelength_nm
        .eval(temperature_c, ln_j, total_length);
    let fwhm_nm = coeffs
        .fwhm_nm
        .eval(temperature_c, ln_j, total_length)
        .max(FWHM_FLOOR_NM);

    Some(SpectralPoint {
        peak_gain_db,
        peak_wavelength_nm,
        fwhm_nm,
    })
}

/// Linear gain of a Lorentzian spectrum at `wavelength_nm`
pub fn lorentzian_gain(point: &SpectralPoint, wavelength_nm: f64) -> f64 {
    let peak_linear = 10f64.powf(point.peak_gain_db / 10.0);
    let fwhm = point.fwhm_nm;
    let detuning = point.peak_wavelength_nm - wavelength_nm;
    let denom = detuning * detuning + (fwhm / 2.0) * (fwhm / 2.0);

    if denom <= DENOM_FLOOR {
        return if wavelength_nm == point.peak_wavelength_nm {
            peak_linear
        } else {
            0.0
        };
    }

    let shape = fwhm / denom;
    let shape_peak = 4.0 / fwhm;
    peak_linear * shape / shape_peak
}

/// Unsaturated linear gain straight from the surfaces, no extrapolation
///
/// Zero for non-positive current density.
pub fn direct_gain_linear(
    coeffs: &RsmCoefficients,
    active_length_um: f64,
    wavelength_nm: f64,
    temperature_c: f64,
    current_density: f64,
    peak_gain_delta_db: f64,
) -> f64 {
    match evaluate_spectral(
        coeffs,
        active_length_um,
        temperature_c,
        current_density,
        peak_gain_delta_db,
    ) {
        Some(point) => lorentzian_gain(&point, wavelength_nm),
        None => 0.0,
    }
}

pub fn length_regime(active_length_um: f64) -> LengthRegime {
    if !(active_length_um > 0.0) {
        LengthRegime::Degenerate
    } else if active_length_um < CALIBRATED_LENGTH_MIN_UM {
        LengthRegime::BelowCalibrated
    } else if active_length_um <= CALIBRATED_LENGTH_MAX_UM {
        LengthRegime::Calibrated
    } else {
        LengthRegime::Extrapolated {
            capped: active_length_um > EXTRAPOLATION_CAP_UM,
        }
    }
}

/// Unsaturated linear gain with the length-extrapolation rules applied
///
/// Never negative. The regime tells the caller which branch was used so
/// it can raise calibration advisories.
pub fn unsaturated_gain_linear(
    coeffs: &RsmCoefficients,
    active_length_um: f64,
    wavelength_nm: f64,
    temperature_c: f64,
    current_density: f64,
    peak_gain_delta_db: f64,
) -> (f64, LengthRegime) {
    let regime = length_regime(active_length_um);
    let direct = |length: f64| {
        direct_gain_linear(
            coeffs,
            length,
            wavelength_nm,
            temperature_c,
            current_density,
            peak_gain_delta_db,
        )
    };

    let gain = match regime {
        LengthRegime::Degenerate => 0.0,
        LengthRegime::BelowCalibrated | LengthRegime::Calibrated => direct(active_length_um),
        LengthRegime::Extrapolated { .. } => {
            let capped = active_length_um.min(EXTRAPOLATION_CAP_UM);
            let g_long = direct(EXTRAPOLATION_REF_LONG_UM);
            let g_short = direct(EXTRAPOLATION_REF_SHORT_UM);
            let slope =
                (g_long - g_short) / (EXTRAPOLATION_REF_LONG_UM - EXTRAPOLATION_REF_SHORT_UM);
            log::trace!(
                "rsm: extrapolating L={} (capped {}) slope={:.4e}/um",
                active_length_um,
                capped,
                slope
            );
            g_long + slope * (capped - EXTRAPOLATION_REF_LONG_UM)
        }
    };

    (gain.max(0.0), regime)
}

/// Output saturation power [dBm]
///
/// Closed-form surface in (lambda, T, J), independent of device length.
pub fn saturation_power_dbm(
    coeffs: &RsmCoefficients,
    wavelength_nm: f64,
    current_density: f64,
    temperature_c: f64,
) -> f64 {
    coeffs
        .saturation_power_dbm
        .eval(wavelength_nm, temperature_c, current_density)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RsmCoefficients {
        RsmCoefficients::default()
    }

    #[test]
    fn spectrum_peaks_at_peak_wavelength() {
        let point = evaluate_spectral(&table(), 300.0, 25.0, 4.0, 0.0).unwrap();
        let at_peak = lorentzian_gain(&point, point.peak_wavelength_nm);
        let expected = 10f64.powf(point.peak_gain_db / 10.0);
        assert!((at_peak / expected - 1.0).abs() < 1e-12);

        let off_peak = lorentzian_gain(&point, point.peak_wavelength_nm + 20.0);
        assert!(off_peak < at_peak);
    }

    #[test]
    fn half_width_gives_half_gain() {
        let point = evaluate_spectral(&table(), 300.0, 25.0, 4.0, 0.0).unwrap();
        let at_peak = lorentzian_gain(&point, point.peak_wavelength_nm);
        let at_half = lorentzian_gain(&point, point.peak_wavelength_nm + point.fwhm_nm / 2.0);
        assert!((at_half / at_peak - 0.5).abs() < 1e-12);
    }

    #[test]
    fn non_positive_current_density_is_zero_gain() {
        assert!(evaluate_spectral(&table(), 300.0, 25.0, 0.0, 0.0).is_none());
        assert_eq!(direct_gain_linear(&table(), 300.0, 1310.0, 25.0, -1.0, 0.0), 0.0);
        let (g, _) = unsaturated_gain_linear(&table(), 790.0, 1310.0, 25.0, 0.0, 0.0);
        assert_eq!(g, 0.0);
    }

    #[test]
    fn peak_gain_delta_shifts_peak() {
        let base = evaluate_spectral(&table(), 300.0, 25.0, 4.0, 0.0).unwrap();
        let shifted = evaluate_spectral(&table(), 300.0, 25.0, 4.0, 1.5).unwrap();
        assert!((shifted.peak_gain_db - base.peak_gain_db - 1.5).abs() < 1e-12);
        assert_eq!(shifted.peak_wavelength_nm, base.peak_wavelength_nm);
    }

    #[test]
    fn fwhm_is_floored() {
        let mut coeffs = table();
        coeffs.fwhm_nm.0 = [-5.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let point = evaluate_spectral(&coeffs, 300.0, 25.0, 4.0, 0.0).unwrap();
        assert_eq!(point.fwhm_nm, FWHM_FLOOR_NM);
        let g = lorentzian_gain(&point, point.peak_wavelength_nm + 1.0);
        assert!(g.is_finite());
    }

    #[test]
    fn regimes() {
        assert_eq!(length_regime(0.0), LengthRegime::Degenerate);
        assert_eq!(length_regime(20.0), LengthRegime::BelowCalibrated);
        assert_eq!(length_regime(40.0), LengthRegime::Calibrated);
        assert_eq!(length_regime(440.0), LengthRegime::Calibrated);
        assert_eq!(length_regime(790.0), LengthRegime::Extrapolated { capped: false });
        assert_eq!(length_regime(1200.0), LengthRegime::Extrapolated { capped: true });
    }

    #[test]
    fn calibrated_range_matches_direct() {
        let (g, regime) = unsaturated_gain_linear(&table(), 200.0, 1310.0, 25.0, 4.0, 0.0);
        assert_eq!(regime, LengthRegime::Calibrated);
        assert_eq!(g, direct_gain_linear(&table(), 200.0, 1310.0, 25.0, 4.0, 0.0));
    }

    #[test]
    fn extrapolation_is_continuous_at_440() {
        let (at_edge, _) = unsaturated_gain_linear(&table(), 440.0, 1310.0, 40.0, 4.0, 0.0);
        let (just_past, _) =
            unsaturated_gain_linear(&table(), 440.000001, 1310.0, 40.0, 4.0, 0.0);
        assert!((just_past / at_edge - 1.0).abs() < 1e-6);
    }

    #[test]
    fn extrapolation_is_flat_past_cap() {
        let (g900, _) = unsaturated_gain_linear(&table(), 900.0, 1310.0, 40.0, 4.0, 0.0);
        let (g1500, _) = unsaturated_gain_linear(&table(), 1500.0, 1310.0, 40.0, 4.0, 0.0);
        assert_eq!(g900, g1500);
    }

    #[test]
    fn short_devices_use_direct_surface() {
        let (g, regime) = unsaturated_gain_linear(&table(), 20.0, 1310.0, 25.0, 4.0, 0.0);
        assert_eq!(regime, LengthRegime::BelowCalibrated);
        assert_eq!(g, direct_gain_linear(&table(), 20.0, 1310.0, 25.0, 4.0, 0.0));
    }

    #[test]
    fn saturation_power_has_no_length_input() {
        let p = saturation_power_dbm(&table(), 1310.0, 4.0, 25.0);
        assert!((p - 13.0005).abs() < 1e-9);
    }
}

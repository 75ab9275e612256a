//! Electrical and wall-plug efficiency model
//!
//! Closed-form relations between drive current, current density, series
//! resistance and voltage. Units follow the optical side of the model:
//! currents in mA, powers in mW, lengths and widths in um.

use crate::rsm::params::TAPER_LENGTH_UM;

/// Series-resistance coefficient of the width-scaled term [ohm*um^2]
pub const RS_AREA_COEFF: f64 = 6000.0;
/// Series-resistance coefficient of the length-only term [ohm*um]
pub const RS_LENGTH_COEFF: f64 = 1500.0;
/// Total-length window over which the series-resistance fit was validated [um]
pub const RS_VALID_TOTAL_LENGTH_UM: (f64, f64) = (500.0, 1360.0);
/// Default diode turn-on voltage [V]
pub const DEFAULT_TURN_ON_VOLTAGE: f64 = 0.9;

/// Active length plus both tapers [um]
pub fn total_length_um(active_length_um: f64) -> f64 {
    active_length_um + TAPER_LENGTH_UM
}

/// Current density from drive current
///
/// `J [kA/cm^2] = I [mA] * 100 / (W [um] * L_tot [um])`.
/// Zero when the pumped area is not positive.
pub fn current_density(current_ma: f64, width_um: f64, total_length_um: f64) -> f64 {
    let area = width_um * total_length_um;
    if !(width_um > 0.0 && total_length_um > 0.0) {
        return 0.0;
    }
    current_ma * 100.0 / area
}

/// Drive current for a current density, inverse of [`current_density`] [mA]
pub fn current_from_density(current_density: f64, width_um: f64, total_length_um: f64) -> f64 {
    if !(width_um > 0.0 && total_length_um > 0.0) {
        return 0.0;
    }
    current_density * width_um * total_length_um / 100.0
}

/// Series resistance [ohm]
///
/// `Rs = 6000 / (W * L_tot) + 1500 / L_tot + delta`. Infinite for a
/// device with no width or length.
pub fn series_resistance(width_um: f64, total_length_um: f64, delta_ohm: f64) -> f64 {
    if !(width_um > 0.0 && total_length_um > 0.0) {
        return f64::INFINITY;
    }
    RS_AREA_COEFF / (width_um * total_length_um) + RS_LENGTH_COEFF / total_length_um + delta_ohm
}

pub fn total_length_in_rs_range(total_length_um: f64) -> bool {
    let (lo, hi) = RS_VALID_TOTAL_LENGTH_UM;
    total_length_um >= lo && total_length_um <= hi
}

/// Terminal voltage at drive current [V]
pub fn operating_voltage(turn_on_voltage: f64, series_resistance_ohm: f64, current_ma: f64) -> f64 {
    turn_on_voltage + current_ma * 1e-3 * series_resistance_ohm
}

/// Wall-plug efficiency [%]
///
/// Net optical power added over electrical power drawn. Zero when the
/// device loses optical power or draws no electrical power.
pub fn wall_plug_efficiency(
    input_power_mw: f64,
    output_power_mw: f64,
    voltage: f64,
    current_ma: f64,
) -> f64 {
    let electrical_mw = voltage * current_ma;
    let gained_mw = output_power_mw - input_power_mw;
    if !(electrical_mw > 0.0) || !(gained_mw > 0.0) || !electrical_mw.is_finite() {
        return 0.0;
    }
    gained_mw / electrical_mw * 100.0
}

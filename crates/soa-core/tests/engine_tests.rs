use soa_core::inverse::SolverOutcome;
use soa_core::{
    Advisory, DeviceGeometry, Engine, EngineConfig, Gain, GainUnit, OperatingPoint, Power,
    SoaError, SolverError,
};

fn reference_device() -> DeviceGeometry {
    DeviceGeometry::new(790.0, 2.0).unwrap()
}

#[test]
fn reference_scenario_reproduces_calibration() {
    let engine = Engine::default();
    let g0 = engine
        .unsaturated_gain(&reference_device(), 1310.0, 40.0, 4.0, GainUnit::Db)
        .unwrap();
    let db = g0.gain.db().unwrap();
    assert!((db - 23.62831466724402).abs() < 1e-9, "g0 = {} dB", db);
    assert!((g0.gain.linear() - 230.58522009792563).abs() < 1e-7);

    let psat = engine.output_saturation_power(1310.0, 4.0, 40.0).unwrap();
    assert!(matches!(psat.power, Power::Dbm(_)));
    assert!((psat.power.dbm().unwrap() - 12.222).abs() < 1e-9);
    assert!((psat.power.mw() - 16.680151850853008).abs() < 1e-9);
}

#[test]
fn reference_scenario_saturated_gain_and_wpe() {
    let engine = Engine::default();
    let dev = reference_device();
    let sat = engine
        .saturated_gain(&dev, 1310.0, 40.0, 4.0, Power::Mw(1.0), GainUnit::Linear)
        .unwrap();
    assert!((sat.gain.linear() - 41.76108582754117).abs() < 1e-3);
    assert!(sat.solver.unwrap().exit.is_converged());

    // 100 mA into 2 um x 1250 um is exactly 4 kA/cm^2
    let wpe = engine
        .wall_plug_efficiency(&dev, 100.0, 1310.0, 40.0, Power::Mw(1.0))
        .unwrap()
        .wall_plug_efficiency_pct;
    assert!((wpe - 32.35006811709617).abs() < 1e-3, "wpe = {}", wpe);
}

#[test]
fn dbm_input_equals_mw_input() {
    let engine = Engine::default();
    let dev = reference_device();
    let a = engine
        .saturated_gain(&dev, 1310.0, 40.0, 4.0, Power::Dbm(0.0), GainUnit::Db)
        .unwrap();
    let b = engine
        .saturated_gain(&dev, 1310.0, 40.0, 4.0, Power::Mw(1.0), GainUnit::Db)
        .unwrap();
    assert_eq!(a.gain, b.gain);
}

#[test]
fn target_output_round_trips() {
    let engine = Engine::default();
    let dev = reference_device();
    for target in [0.01, 1.0, 10.0, 100.0, 1000.0] {
        let solved = engine
            .solve_input_power_for_target_output(&dev, Power::Mw(target), 100.0, 1310.0, 40.0)
            .unwrap();
        let pin = solved.outcome.input_power().unwrap();
        let g = engine
            .saturated_gain(&dev, 1310.0, 40.0, 4.0, pin, GainUnit::Linear)
            .unwrap()
            .gain
            .linear();
        let pout = g * pin.mw();
        assert!((pout / target - 1.0).abs() < 1e-3, "target {} got {}", target, pout);
    }
}

#[test]
fn zero_target_needs_no_input() {
    let engine = Engine::default();
    let outcome = engine
        .solve_input_power_for_target_output(&reference_device(), Power::Mw(0.0), 100.0, 1310.0, 40.0)
        .unwrap()
        .outcome;
    assert_eq!(
        outcome,
        SolverOutcome::Solved {
            input_power: Power::ZERO,
            iterations: 0
        }
    );
}

#[test]
fn excessive_target_is_unreachable() {
    let engine = Engine::default();
    let outcome = engine
        .solve_input_power_for_target_output(&reference_device(), Power::Mw(1e5), 100.0, 1310.0, 40.0)
        .unwrap()
        .outcome;
    assert!(matches!(
        outcome,
        SolverOutcome::Unreachable {
            reason: SolverError::NoSignChange { .. }
        }
    ));
    assert_eq!(outcome.input_power(), None);
}

#[test]
fn underdriven_device_is_unreachable() {
    let engine = Engine::default();
    // 2.5 mA is 0.1 kA/cm^2, far below transparency
    let outcome = engine
        .solve_input_power_for_target_output(&reference_device(), Power::Mw(1.0), 2.5, 1310.0, 40.0)
        .unwrap()
        .outcome;
    assert!(!outcome.is_solved());
}

#[test]
fn long_devices_are_flat_beyond_cap() {
    let engine = Engine::default();
    let at_cap = DeviceGeometry::new(900.0, 2.0).unwrap();
    let beyond = DeviceGeometry::new(1500.0, 2.0).unwrap();
    let a = engine
        .unsaturated_gain(&at_cap, 1310.0, 40.0, 4.0, GainUnit::Linear)
        .unwrap();
    let b = engine
        .unsaturated_gain(&beyond, 1310.0, 40.0, 4.0, GainUnit::Linear)
        .unwrap();
    assert_eq!(a.gain, b.gain);
    assert!(b
        .advisories
        .contains(&Advisory::LengthExtrapolated { active_length_um: 1500.0, capped: true }));
    assert!(b
        .advisories
        .contains(&Advisory::LengthOutOfRange { active_length_um: 1500.0 }));
}

#[test]
fn short_device_uses_direct_surface() {
    let engine = Engine::default();
    let dev = DeviceGeometry::new(20.0, 2.0).unwrap();
    let res = engine
        .unsaturated_gain(&dev, 1310.0, 40.0, 4.0, GainUnit::Linear)
        .unwrap();
    assert!((res.gain.linear() - 3.919110152879446).abs() < 1e-9);
    assert!(res
        .advisories
        .contains(&Advisory::LengthOutOfRange { active_length_um: 20.0 }));
}

#[test]
fn no_gain_is_a_sentinel() {
    let engine = Engine::default();
    let res = engine
        .unsaturated_gain(&reference_device(), 1310.0, 40.0, -1.0, GainUnit::Db)
        .unwrap();
    assert_eq!(res.gain, Gain::NoMeasurableGain);
    assert_eq!(res.gain.db(), None);
}

#[test]
fn compression_point_matches_output_saturation() {
    let engine = Engine::default();
    let dev = reference_device();
    let compression = engine.compression_point(&dev, 1310.0, 40.0, 4.0, 3.0).unwrap();
    let pin = compression.outcome.input_power().unwrap();
    let sat = engine
        .saturated_gain(&dev, 1310.0, 40.0, 4.0, pin, GainUnit::Linear)
        .unwrap();
    let pout = sat.gain.linear() * pin.mw();
    assert!((pout / 16.680151850853008 - 1.0).abs() < 0.01, "pout {}", pout);
}

#[test]
fn evaluate_reports_everything() {
    let engine = Engine::default();
    let op = OperatingPoint::new(1310.0, 40.0, 4.0, Power::Mw(1.0)).unwrap();
    let report = engine.evaluate(&reference_device(), &op).unwrap();
    assert!((report.unsaturated_gain.db().unwrap() - 23.62831466724402).abs() < 1e-9);
    assert!((report.saturation_power.dbm().unwrap() - 12.222).abs() < 1e-9);
    assert!((report.output_power.mw() - 41.76108582754117).abs() < 1e-3);
    assert!((report.electrical.voltage - 1.26).abs() < 1e-12);
    assert!(report.solver.exit.is_converged());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["saturation_power"]["dbm"], serde_json::json!(report.saturation_power.dbm().unwrap()));
}

#[test]
fn custom_config_is_used() {
    let mut config = EngineConfig::default();
    config.coefficients.saturation_power_dbm.0[0] += 1.0;
    let engine = Engine::new(config).unwrap();
    let psat = engine.output_saturation_power(1310.0, 4.0, 40.0).unwrap();
    assert!((psat.power.dbm().unwrap() - 13.222).abs() < 1e-9);
}

#[test]
fn malformed_operating_inputs_are_errors() {
    let engine = Engine::default();
    let dev = reference_device();
    assert!(matches!(
        engine.saturated_gain(&dev, 1310.0, 40.0, 4.0, Power::Mw(f64::NAN), GainUnit::Db),
        Err(SoaError::NonFinite { name: "input_power", .. })
    ));
    assert!(matches!(
        engine.saturated_gain(&dev, 1310.0, 40.0, 4.0, Power::Mw(-5.0), GainUnit::Db),
        Err(SoaError::NegativeInputPower(_))
    ));
    assert!(matches!(
        engine.unsaturated_gain(&dev, f64::NAN, 40.0, 4.0, GainUnit::Db),
        Err(SoaError::NonFinite { name: "wavelength_nm", .. })
    ));
    let bad_geometry = DeviceGeometry {
        width_um: f64::NAN,
        ..reference_device()
    };
    assert!(matches!(
        engine.solve_input_power_for_target_output(&bad_geometry, Power::Mw(1.0), 100.0, 1310.0, 40.0),
        Err(SoaError::NonFinite { name: "width_um", .. })
    ));
}

#[test]
fn solve_reports_calibration_advisories() {
    let engine = Engine::default();
    let dev = DeviceGeometry::new(1500.0, 3.0).unwrap();
    let solved = engine
        .solve_input_power_for_target_output(&dev, Power::Mw(10.0), 150.0, 1310.0, 40.0)
        .unwrap();
    let pin = solved.outcome.input_power().unwrap();
    assert!((pin.mw() - 0.2022).abs() < 1e-3, "pin {}", pin.mw());
    assert_eq!(solved.advisories.len(), 3);
    assert!(solved
        .advisories
        .contains(&Advisory::WidthOutOfRange { width_um: 3.0 }));
}

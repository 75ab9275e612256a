use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use soa_api::HttpServerConfig;
use soa_core::inverse::SolverOutcome;
use soa_core::result_store::{ResultStore, RunResult, RunStatus};
use soa_core::table::format_table;
use soa_core::{
    run_sweep, DeviceGeometry, Engine, EngineConfig, GainUnit, OperatingPoint, Power, Spacing,
    SweepKind, SweepSpec,
};
use soa_devices::rsm::apply_overrides;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    println!(
        r#"SOA gain and saturation model

USAGE:
    soa-cli <COMMAND> [OPTIONS]

COMMANDS:
    eval                    Evaluate one operating point
    solve                   Find the input power for a target output power
    sweep                   Sweep one quantity and print a table
    serve                   Run the HTTP API

DEVICE / OPERATING POINT:
    --length <UM>           Active length (default: 790)
    --width <UM>            Ridge width (default: 2.0)
    --von <V>               Turn-on voltage (default: 0.9)
    --wavelength <NM>       Wavelength (default: 1310)
    --temperature <C>       Temperature (default: 25)
    --density <KA/CM2>      Current density (default: 4)
    --current <MA>          Drive current; overrides --density
    --pin <MW>              Input power in mW (default: 0.01)
    --pin-dbm <DBM>         Input power in dBm

SOLVE:
    --target <MW>           Target output power in mW
    --target-dbm <DBM>      Target output power in dBm

SWEEP:
    --kind <KIND>           wavelength, input-power, current, length
    --start <X>             First value
    --stop <X>              Last value
    --points <N>            Number of points (default: 11)
    --log                   Logarithmic spacing
    -o, --table <PATH>      Also write the table to a file

SERVE:
    --bind <ADDR>           Listen address (default: 127.0.0.1:8080)

OPTIONS:
    -h, --help              Print help information
    -V, --version           Print version information
    -c, --config <PATH>     JSON engine configuration
    --coef <KEY=VALUE>      Override one coefficient, e.g. pg0=-14.0 (repeatable)
    --linear                Print gains as linear ratios instead of dB
    --json                  Print JSON instead of text
    --precision <N>         Output precision (1-15 digits, default: 6)
    -v, --verbose           Debug logging (RUST_LOG overrides)

EXAMPLES:
    soa-cli eval --length 790 --temperature 40 --current 100 --pin 1
    soa-cli solve --target-dbm 10 --current 100
    soa-cli sweep --kind input-power --start 0.001 --stop 100 --points 26 --log
    soa-cli serve --bind 0.0.0.0:8080"#
    );
}

fn print_version() {
    println!("soa-cli {}", VERSION);
}

/// Usage error: bad flags or malformed input
fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    std::process::exit(2);
}

/// Runtime failure: unreadable config, I/O, server errors
fn die(message: &str) -> ! {
    eprintln!("{}", message);
    std::process::exit(1);
}

fn take_value(args: &mut impl Iterator<Item = String>, flag: &str) -> String {
    match args.next() {
        Some(value) => value,
        None => fail(&format!("missing value for {}", flag)),
    }
}

/// Plain decimal or exponent notation; no unit suffixes
fn parse_float(value: &str) -> Option<f64> {
    match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => Some(number),
        _ => None,
    }
}

fn take_number(args: &mut impl Iterator<Item = String>, flag: &str) -> f64 {
    let value = take_value(args, flag);
    match parse_float(&value) {
        Some(number) => number,
        None => fail(&format!("invalid number for {}: {}", flag, value)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Eval,
    Solve,
    Sweep,
    Serve,
}

struct Options {
    command: Command,
    config_path: Option<PathBuf>,
    coef_overrides: HashMap<String, String>,
    length_um: f64,
    width_um: f64,
    turn_on_voltage: Option<f64>,
    wavelength_nm: f64,
    temperature_c: f64,
    density: f64,
    current_ma: Option<f64>,
    input_power: Power,
    target: Option<Power>,
    sweep_kind: Option<SweepKind>,
    sweep_start: Option<f64>,
    sweep_stop: Option<f64>,
    sweep_points: usize,
    spacing: Spacing,
    table_path: Option<PathBuf>,
    bind_addr: String,
    gain_unit: GainUnit,
    json: bool,
    precision: usize,
    verbose: bool,
}

impl Options {
    fn new(command: Command) -> Self {
        Options {
            command,
            config_path: None,
            coef_overrides: HashMap::new(),
            length_um: 790.0,
            width_um: 2.0,
            turn_on_voltage: None,
            wavelength_nm: 1310.0,
            temperature_c: 25.0,
            density: 4.0,
            current_ma: None,
            input_power: Power::Mw(0.01),
            target: None,
            sweep_kind: None,
            sweep_start: None,
            sweep_stop: None,
            sweep_points: 11,
            spacing: Spacing::Linear,
            table_path: None,
            bind_addr: "127.0.0.1:8080".to_string(),
            gain_unit: GainUnit::Db,
            json: false,
            precision: 6,
            verbose: false,
        }
    }
}

fn parse_kind(value: &str) -> Option<SweepKind> {
    match value.to_ascii_lowercase().as_str() {
        "wavelength" | "lambda" => Some(SweepKind::Wavelength),
        "input-power" | "input_power" | "pin" => Some(SweepKind::InputPower),
        "current" | "i" => Some(SweepKind::Current),
        "length" | "active-length" | "active_length" => Some(SweepKind::ActiveLength),
        _ => None,
    }
}

fn parse_args() -> Options {
    let mut args = env::args().skip(1);
    let command = match args.next().as_deref() {
        Some("eval") => Command::Eval,
        Some("solve") => Command::Solve,
        Some("sweep") => Command::Sweep,
        Some("serve") => Command::Serve,
        Some("--help") | Some("-h") | None => {
            print_help();
            std::process::exit(0);
        }
        Some("--version") | Some("-V") => {
            print_version();
            std::process::exit(0);
        }
        Some(other) => fail(&format!("unknown command: {} (try --help)", other)),
    };
    let mut opts = Options::new(command);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                print_version();
                std::process::exit(0);
            }
            "--config" | "-c" => opts.config_path = Some(PathBuf::from(take_value(&mut args, &arg))),
            "--coef" => {
                let value = take_value(&mut args, &arg);
                let Some((key, number)) = value.split_once('=') else {
                    fail(&format!("--coef expects KEY=VALUE, got {}", value));
                };
                opts.coef_overrides
                    .insert(key.trim().to_string(), number.trim().to_string());
            }
            "--length" => opts.length_um = take_number(&mut args, &arg),
            "--width" => opts.width_um = take_number(&mut args, &arg),
            "--von" => opts.turn_on_voltage = Some(take_number(&mut args, &arg)),
            "--wavelength" => opts.wavelength_nm = take_number(&mut args, &arg),
            "--temperature" => opts.temperature_c = take_number(&mut args, &arg),
            "--density" => opts.density = take_number(&mut args, &arg),
            "--current" => opts.current_ma = Some(take_number(&mut args, &arg)),
            "--pin" => opts.input_power = Power::Mw(take_number(&mut args, &arg)),
            "--pin-dbm" => opts.input_power = Power::Dbm(take_number(&mut args, &arg)),
            "--target" => opts.target = Some(Power::Mw(take_number(&mut args, &arg))),
            "--target-dbm" => opts.target = Some(Power::Dbm(take_number(&mut args, &arg))),
            "--kind" => {
                let value = take_value(&mut args, &arg);
                opts.sweep_kind = match parse_kind(&value) {
                    Some(kind) => Some(kind),
                    None => fail(&format!("unknown sweep kind: {}", value)),
                };
            }
            "--start" => opts.sweep_start = Some(take_number(&mut args, &arg)),
            "--stop" => opts.sweep_stop = Some(take_number(&mut args, &arg)),
            "--points" => {
                let value = take_value(&mut args, &arg);
                opts.sweep_points = match value.parse::<usize>() {
                    Ok(n) if n > 0 => n,
                    _ => fail("points must be a positive integer"),
                };
            }
            "--log" => opts.spacing = Spacing::Log,
            "--table" | "-o" => opts.table_path = Some(PathBuf::from(take_value(&mut args, &arg))),
            "--bind" => opts.bind_addr = take_value(&mut args, &arg),
            "--linear" => opts.gain_unit = GainUnit::Linear,
            "--json" => opts.json = true,
            "--precision" => {
                let value = take_value(&mut args, &arg);
                opts.precision = match value.parse::<usize>() {
                    Ok(p) if (1..=15).contains(&p) => p,
                    _ => fail("precision must be between 1 and 15"),
                };
            }
            "--verbose" | "-v" => opts.verbose = true,
            _ => fail(&format!("unexpected argument: {}", arg)),
        }
    }
    opts
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn read_config(path: Option<&Path>) -> Result<EngineConfig, String> {
    match path {
        Some(path) => EngineConfig::from_path(path)
            .map_err(|err| format!("failed to load config {}: {}", path.display(), err)),
        None => Ok(EngineConfig::default()),
    }
}

fn load_config(opts: &Options) -> EngineConfig {
    let mut config = match read_config(opts.config_path.as_deref()) {
        Ok(config) => config,
        Err(message) => die(&message),
    };
    if !opts.coef_overrides.is_empty() {
        config.coefficients = match apply_overrides(&config.coefficients, &opts.coef_overrides) {
            Ok(table) => table,
            Err(err) => fail(&format!("invalid coefficient override: {}", err)),
        };
    }
    config
}

fn build_geometry(opts: &Options) -> DeviceGeometry {
    let geometry =
        DeviceGeometry::new(opts.length_um, opts.width_um).and_then(|g| match opts.turn_on_voltage {
            Some(v) => g.with_turn_on_voltage(v),
            None => Ok(g),
        });
    match geometry {
        Ok(geometry) => geometry,
        Err(err) => fail(&err.to_string()),
    }
}

fn operating_point(opts: &Options, engine: &Engine, geometry: &DeviceGeometry) -> OperatingPoint {
    let density = match opts.current_ma {
        Some(current) => match engine.electrical(geometry, current) {
            Ok(point) => point.current_density,
            Err(err) => fail(&err.to_string()),
        },
        None => opts.density,
    };
    match OperatingPoint::new(opts.wavelength_nm, opts.temperature_c, density, opts.input_power) {
        Ok(op) => op,
        Err(err) => fail(&err.to_string()),
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(err) => {
            eprintln!("failed to serialize output: {}", err);
            std::process::exit(1);
        }
    }
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "-inf".to_string(),
    }
}

fn run_eval(opts: &Options, engine: &Engine) {
    let geometry = build_geometry(opts);
    let op = operating_point(opts, engine, &geometry);
    let report = match engine.evaluate(&geometry, &op) {
        Ok(report) => report,
        Err(err) => fail(&err.to_string()),
    };
    if opts.json {
        print_json(&report);
        return;
    }

    let p = opts.precision;
    let (g0, g) = match opts.gain_unit {
        GainUnit::Db => (
            format!("{} dB", fmt_opt(report.unsaturated_gain.db(), p)),
            format!("{} dB", fmt_opt(report.saturated_gain.db(), p)),
        ),
        GainUnit::Linear => (
            format!("{:.*}", p, report.unsaturated_gain.linear()),
            format!("{:.*}", p, report.saturated_gain.linear()),
        ),
    };
    println!("calibration:       {}", engine.coefficients().version);
    println!("current density:   {:.*} kA/cm^2", p, op.current_density);
    println!("unsaturated gain:  {}", g0);
    println!("saturation power:  {} dBm", fmt_opt(report.saturation_power.dbm(), p));
    println!("saturated gain:    {} ({:?}, {} iters)", g, report.solver.exit, report.solver.iterations);
    println!("output power:      {:.*} mW", p, report.output_power.mw());
    println!("drive current:     {:.*} mA", p, report.electrical.current_ma);
    println!("series resistance: {:.*} ohm", p, report.electrical.series_resistance_ohm);
    println!("voltage:           {:.*} V", p, report.electrical.voltage);
    println!("wall-plug eff.:    {:.*} %", p, report.wall_plug_efficiency_pct);
    for advisory in &report.advisories {
        println!("advisory: {}", advisory);
    }
}

fn run_solve(opts: &Options, engine: &Engine) {
    let Some(target) = opts.target else {
        fail("solve requires --target or --target-dbm");
    };
    let Some(current) = opts.current_ma else {
        fail("solve requires --current");
    };
    let geometry = build_geometry(opts);
    let solved = match engine.solve_input_power_for_target_output(
        &geometry,
        target,
        current,
        opts.wavelength_nm,
        opts.temperature_c,
    ) {
        Ok(solved) => solved,
        Err(err) => fail(&err.to_string()),
    };
    if opts.json {
        print_json(&solved);
        if !solved.outcome.is_solved() {
            std::process::exit(1);
        }
        return;
    }
    for advisory in &solved.advisories {
        println!("advisory: {}", advisory);
    }
    let p = opts.precision;
    match solved.outcome {
        SolverOutcome::Solved {
            input_power,
            iterations,
        } => {
            println!(
                "input power: {:.*} mW ({} dBm) after {} iterations",
                p,
                input_power.mw(),
                fmt_opt(input_power.dbm(), p),
                iterations
            );
        }
        SolverOutcome::Unreachable { reason } => {
            println!("target {:.*} mW is unreachable: {}", p, target.mw(), reason);
            std::process::exit(1);
        }
    }
}

fn run_sweep_command(opts: &Options, engine: &Engine) {
    let (Some(kind), Some(start), Some(stop)) = (opts.sweep_kind, opts.sweep_start, opts.sweep_stop)
    else {
        fail("sweep requires --kind, --start and --stop");
    };
    let spec = SweepSpec {
        kind,
        start,
        stop,
        points: opts.sweep_points,
        spacing: opts.spacing,
    };
    let geometry = build_geometry(opts);
    let base = operating_point(opts, engine, &geometry);
    let points = match run_sweep(engine, &geometry, &base, &spec) {
        Ok(points) => points,
        Err(err) => fail(&err.to_string()),
    };

    let mut store = ResultStore::new();
    let run_id = store.add_run(RunResult::new(spec, points));
    let Some(run) = store.get(run_id) else {
        die("sweep result missing");
    };
    if opts.json {
        print_json(run);
    } else {
        print!("{}", format_table(run, opts.precision));
    }
    if !matches!(run.status, RunStatus::Converged) {
        log::warn!("sweep: {}", run.message.as_deref().unwrap_or("not converged"));
    }

    if let Some(path) = &opts.table_path {
        if let Err(err) = store.write_table_text(run_id, path) {
            die(&format!("failed to write table: {}", err));
        }
        println!("table written: {}", path.display());
    }
}

fn run_serve(opts: &Options, config: EngineConfig) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => die(&format!("failed to start runtime: {}", err)),
    };
    let server = HttpServerConfig {
        bind_addr: opts.bind_addr.clone(),
        engine: config,
    };
    if let Err(err) = runtime.block_on(soa_api::run(server)) {
        die(&err);
    }
}

fn main() {
    let opts = parse_args();
    init_logging(opts.verbose);
    let config = load_config(&opts);

    if opts.command == Command::Serve {
        run_serve(&opts, config);
        return;
    }

    let engine = match Engine::new(config) {
        Ok(engine) => engine,
        Err(err) => die(&err.to_string()),
    };
    match opts.command {
        Command::Eval => run_eval(&opts, &engine),
        Command::Solve => run_solve(&opts, &engine),
        Command::Sweep => run_sweep_command(&opts, &engine),
        Command::Serve => {}
    }
}

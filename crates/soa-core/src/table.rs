use crate::result_store::RunResult;
use std::fs;
use std::path::Path;

pub const DEFAULT_PRECISION: usize = 6;

const COLUMNS: [&str; 8] = [
    "g0_db", "gain_db", "psat_dbm", "pout_dbm", "current_ma", "voltage_v", "wpe_pct", "newton",
];

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "-".to_string(),
    }
}

/// Whitespace-separated text table of a sweep run
pub fn format_table(run: &RunResult, precision: usize) -> String {
    let mut out = String::new();
    out.push_str("SOA_SWEEP\n");
    out.push_str(&format!("run={}\n", run.id.0));
    out.push_str(&format!("kind={}\n", run.spec.kind.name()));
    out.push_str(&format!("status={:?}\n", run.status));
    if let Some(message) = &run.message {
        out.push_str(&format!("message={}\n", message));
    }

    out.push_str(&format!("{}_{}", run.spec.kind.name(), run.spec.kind.unit()));
    for column in COLUMNS {
        out.push(' ');
        out.push_str(column);
    }
    out.push('\n');

    for point in &run.points {
        let r = &point.report;
        let row = [
            format!("{:.*}", precision, point.value),
            fmt_opt(r.unsaturated_gain.db(), precision),
            fmt_opt(r.saturated_gain.db(), precision),
            fmt_opt(r.saturation_power.dbm(), precision),
            fmt_opt(r.output_power.dbm(), precision),
            format!("{:.*}", precision, r.electrical.current_ma),
            format!("{:.*}", precision, r.electrical.voltage),
            format!("{:.*}", precision, r.wall_plug_efficiency_pct),
            format!("{:?}", r.solver.exit).to_lowercase(),
        ];
        out.push_str(&row.join(" "));
        out.push('\n');
    }
    out
}

pub fn write_table_text(run: &RunResult, path: &Path, precision: usize) -> std::io::Result<()> {
    fs::write(path, format_table(run, precision))
}

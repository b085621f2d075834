//! `ctxmp` — thin CLI wrapper around the Contextual Matrix Profile engine.
//!
//! Not part of the core: reads a CSV series, synthesizes the single
//! full-day time window and single-cluster mask a standalone run needs
//! (CART segmentation and clustering are external collaborators, out of
//! scope for this crate), runs the pipeline, and writes the anomaly table
//! as JSON.
//!
//! ```text
//! ctxmp input.csv temperature_c out.json --samples-per-day 96
//! ```

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use tracing::{error, info};

use ctxmp::config::EngineConfig;
use ctxmp::types::{ClusterMask, Series, TimeWindow};
use ctxmp::PipelineDriver;

/// Run the Contextual Matrix Profile anomaly engine over a CSV series.
#[derive(Parser, Debug)]
#[command(name = "ctxmp", about = "Contextual Matrix Profile anomaly engine")]
struct CliArgs {
    /// Input CSV path. First column is a timestamp (unused by the core,
    /// passthrough only); remaining columns are named in the header.
    input_file: PathBuf,

    /// Name of the CSV column to analyse.
    variable_name: String,

    /// Output path for the anomaly table (JSON).
    output_file: PathBuf,

    /// ISO country code for holiday filtering. Accepted for interface
    /// compatibility with the upstream CART step; unused by the core.
    #[arg(long)]
    country: Option<String>,

    /// Samples per day (cadence). The core treats this as an authoritative
    /// scalar input; the CLI exposes it as a flag since CSV timestamps
    /// alone don't pin down a cadence.
    #[arg(long, default_value_t = 96)]
    samples_per_day: usize,

    /// Context length in hours for the first time window.
    #[arg(long, default_value_t = 1.0)]
    m_ctx_hours: f64,

    /// Emit the per-window CMP distance matrices alongside the anomaly table.
    #[arg(long)]
    export_matrices: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    if let Err(e) = run(args) {
        error!(error = %e, "ctxmp run failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> anyhow::Result<()> {
    let mut config = EngineConfig::load();
    config.context.default_m_ctx_hours = args.m_ctx_hours;

    let (values, _columns) = read_csv_column(&args.input_file, &args.variable_name)?;
    let series = Series::new(values, args.samples_per_day, None)?;
    info!(
        days = series.num_days(),
        samples_per_day = args.samples_per_day,
        "loaded series"
    );

    let window = TimeWindow {
        from: "00:00".to_string(),
        to: "23:45".to_string(),
        observations: args.samples_per_day,
        label: Some("full day".to_string()),
    };
    let clusters = ClusterMask::from_dense(&vec![vec![true]; series.num_days()])?;

    let driver = PipelineDriver::new(config);
    let start_date = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch date");
    let output = driver.run(&series, &[window], &clusters, start_date, args.export_matrices)?;

    info!(anomalies = output.anomalies.len(), "pipeline run complete");
    let json = serde_json::json!({
        "anomaly_results": output.anomalies,
        "contexts_table": output.contexts_table,
        "cmp_distance_matrix": output.distance_matrices,
    });
    std::fs::write(&args.output_file, serde_json::to_string_pretty(&json)?)?;
    Ok(())
}

/// Parse a header-bearing CSV, returning the named column's values as
/// `f64` and the full header row for diagnostics.
fn read_csv_column(path: &std::path::Path, column: &str) -> anyhow::Result<(Vec<f64>, Vec<String>)> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let mut lines = contents.lines();
    let header = lines
        .next()
        .ok_or_else(|| anyhow::anyhow!("{} is empty", path.display()))?;
    let columns: Vec<String> = header.split(',').map(|s| s.trim().to_string()).collect();
    let idx = columns
        .iter()
        .position(|c| c == column)
        .ok_or_else(|| anyhow::anyhow!("column '{column}' not found in {}", path.display()))?;

    let mut values = Vec::new();
    for (row_num, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        let raw = fields
            .get(idx)
            .ok_or_else(|| anyhow::anyhow!("row {row_num} missing column '{column}'"))?;
        let v: f64 = raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("row {row_num}: '{raw}' is not a valid number"))?;
        values.push(v);
    }
    Ok((values, columns))
}

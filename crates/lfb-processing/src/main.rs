//! CLI entry point for the LFB cleaning pipeline.

use anyhow::{Result, anyhow};
use clap::Parser;
use lfb_processing::reporting::{RunReport, write_csv, write_missing_summary_csv, write_report};
use lfb_processing::utils::has_column;
use lfb_processing::views::{
    FilterOutcome, RowFilter, ViewColumns, apply_filter, mean_by, value_counts,
};
use lfb_processing::{MissingDataSummary, Pipeline, PipelineConfig, PipelineConfigBuilder};
use polars::prelude::*;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "London Fire Brigade incident & mobilisation cleaning pipeline",
    long_about = "Loads incident and mobilisation records, merges them on the incident\n\
                  number, removes duplicates and irrelevant columns, reports missing data\n\
                  and drops rows without a USRN.\n\n\
                  EXAMPLES:\n  \
                  # Two vintages of each entity\n  \
                  lfb-processing --incidents inc_2009.csv inc_2018.xlsx \\\n      \
                  --mobilisation mob_2009.csv mob_2021.xlsx\n\n  \
                  # Reuse a parquet cache between runs\n  \
                  lfb-processing --config lfb.json --cache-dir .cache\n\n  \
                  # Look at one year and incident group\n  \
                  lfb-processing --config lfb.json --year 2018 --incident-group Fire"
)]
struct Args {
    /// Incident source files, unioned in the given order
    #[arg(long, num_args = 1..)]
    incidents: Vec<PathBuf>,

    /// Mobilisation source files, unioned in the given order
    #[arg(long, num_args = 1..)]
    mobilisation: Vec<PathBuf>,

    /// JSON configuration file; command-line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Custom output file name (without extension)
    #[arg(long)]
    output_name: Option<String>,

    /// Directory for the parquet load cache
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Rebuild the load cache from the sources
    #[arg(long)]
    refresh_cache: bool,

    /// Join key column
    #[arg(long)]
    key_column: Option<String>,

    /// Rows with an undefined value in this column are dropped
    #[arg(long)]
    required_column: Option<String>,

    /// Keep `_x` suffixes instead of restoring the plain incident column names
    #[arg(long)]
    keep_suffixes: bool,

    /// Only show rows for this calendar year
    #[arg(long)]
    year: Option<i64>,

    /// Only show rows for this incident group
    #[arg(long)]
    incident_group: Option<String>,

    /// Numeric column to average per incident group
    #[arg(long, default_value = "DelayMinutes")]
    average_column: String,

    /// Number of cleaned rows to print
    #[arg(long, default_value = "5")]
    preview: usize,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Write a detailed JSON report to the output directory
    ///
    /// The report will be saved as <output_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    let config = build_config(&args)?;

    let mut builder = Pipeline::builder().config(config.clone());
    if !args.quiet && !args.json {
        builder = builder.on_stage(|stage, message| {
            info!("[{}] {}", stage.display_name(), message);
        });
    }
    let pipeline = builder.build()?;

    let mut result = match pipeline.run() {
        Ok(result) => result,
        Err(e) => {
            error!("Pipeline failed: {}", e);
            return Err(anyhow!("Pipeline failed: {}", e));
        }
    };

    let csv_path = config.output_csv_path();
    write_csv(&mut result.data, &csv_path)?;
    let missing_path = config
        .output_dir
        .join(format!("{}_missing.csv", config.output_name));
    write_missing_summary_csv(&result.missing_summary, &missing_path)?;

    let report = RunReport::new(&config, &result, Some(csv_path.as_path()));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if args.emit_report {
        let report_path = write_report(&report, &config.output_dir, &config.output_name)?;
        info!("Report written to: {}", report_path.display());
    }

    print_summary(&report);
    print_missing_table(&result.missing_summary);

    if result.is_empty() {
        println!();
        println!(
            "No rows survived cleaning: every merged record lacked a '{}' value.",
            config.required_column
        );
        return Ok(());
    }

    if args.preview > 0 {
        println!();
        println!("PREVIEW (first {} rows)", args.preview);
        println!("{}", "-".repeat(40));
        println!("{}", result.data.head(Some(args.preview)));
    }

    let filter = RowFilter {
        year: args.year,
        incident_group: args.incident_group.clone(),
    };
    let columns = ViewColumns {
        average: args.average_column.clone(),
        ..ViewColumns::default()
    };
    print_view(&result.data, &filter, &columns)?;

    Ok(())
}

/// Merge the optional JSON config with command-line flags.
fn build_config(args: &Args) -> Result<PipelineConfig> {
    let base = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    let mut builder = PipelineConfigBuilder::from_config(base)
        .incident_sources(args.incidents.iter().cloned())
        .mobilisation_sources(args.mobilisation.iter().cloned());

    if let Some(ref dir) = args.output {
        builder = builder.output_dir(dir);
    }
    if let Some(ref name) = args.output_name {
        builder = builder.output_name(name);
    }
    if let Some(ref dir) = args.cache_dir {
        builder = builder.cache_dir(dir);
    }
    if args.refresh_cache {
        builder = builder.refresh_cache(true);
    }
    if let Some(ref key) = args.key_column {
        builder = builder.key_column(key);
    }
    if let Some(ref column) = args.required_column {
        builder = builder.required_column(column);
    }
    if args.keep_suffixes {
        builder = builder.restore_left_names(false);
    }

    Ok(builder.build()?)
}

fn print_summary(report: &RunReport) {
    let summary = &report.summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Incidents:    {} rows", summary.incident_rows);
    println!("Mobilisation: {} rows", summary.mobilisation_rows);
    if let Some(ref output_file) = report.output_file {
        println!(
            "Output: {} ({} rows x {} columns)",
            output_file, report.final_shape.0, report.final_shape.1
        );
    }
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", summary.duration_ms);
    for shape in &summary.shapes {
        println!(
            "  {:<14} {} rows x {} columns",
            shape.stage, shape.rows, shape.columns
        );
    }
    println!(
        "  Duplicate keys removed: {}",
        summary.projection.duplicates_removed
    );
    println!(
        "  Columns dropped: {} ({} not present)",
        summary.projection.dropped_columns.len(),
        summary.projection.skipped_columns.len()
    );
    println!(
        "  Rows without {}: {}",
        report.required_column, summary.rows_missing_required
    );
}

fn print_missing_table(summary: &MissingDataSummary) {
    println!();
    println!("MISSING DATA (before filtering, {} rows)", summary.total_rows);
    println!("{}", "-".repeat(40));

    if summary.with_missing().next().is_none() {
        println!("  No missing values");
        return;
    }

    println!("{:<45} {:>14} {:>10}", "Column", "Missing Values", "Percentage");
    println!("{}", "-".repeat(71));
    for entry in summary.with_missing() {
        println!(
            "{:<45} {:>14} {:>9.2}%",
            truncate_str(&entry.column, 44),
            entry.missing_count,
            entry.missing_percentage
        );
    }
}

fn print_view(df: &DataFrame, filter: &RowFilter, columns: &ViewColumns) -> Result<()> {
    let rows = match apply_filter(df, filter, columns)? {
        FilterOutcome::Rows(rows) => rows,
        FilterOutcome::Empty { criteria } => {
            println!();
            println!("No data available for the selected filters ({}).", criteria);
            return Ok(());
        }
    };

    if !filter.is_unrestricted() {
        println!();
        println!("Filtered ({}): {} rows", filter, rows.height());
    }

    for (title, column) in [
        ("INCIDENTS BY YEAR", &columns.year),
        ("INCIDENT GROUPS", &columns.incident_group),
    ] {
        if !has_column(&rows, column) {
            continue;
        }
        println!();
        println!("{}", title);
        println!("{}", "-".repeat(40));
        for (value, count) in value_counts(&rows, column)? {
            println!("  {:<30} {:>8}", truncate_str(&value, 29), count);
        }
    }

    if has_column(&rows, &columns.average) && has_column(&rows, &columns.incident_group) {
        println!();
        println!("AVERAGE {} BY INCIDENT GROUP", columns.average);
        println!("{}", "-".repeat(40));
        for (group, mean) in mean_by(&rows, &columns.incident_group, &columns.average)? {
            println!("  {:<30} {:>8.2}", truncate_str(&group, 29), mean);
        }
    }

    Ok(())
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

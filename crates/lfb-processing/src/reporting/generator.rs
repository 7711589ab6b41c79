use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::types::{MissingDataSummary, PipelineResult, RunSummary};
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Column headers of the missing-data CSV.
const MISSING_HEADERS: [&str; 3] = ["Column", "Missing Values", "Percentage"];

// ============================================================================
// Run Report
// ============================================================================

/// Everything a run produced apart from the data itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    pub incident_sources: Vec<String>,
    pub mobilisation_sources: Vec<String>,
    /// Path of the cleaned CSV (if written)
    pub output_file: Option<String>,
    pub key_column: String,
    pub required_column: String,
    /// Final shape (rows, columns)
    pub final_shape: (usize, usize),
    pub summary: RunSummary,
    /// Missing-data report computed before the required-column filter
    pub missing_summary: MissingDataSummary,
}

impl RunReport {
    pub fn new(
        config: &PipelineConfig,
        result: &PipelineResult,
        output_file: Option<&Path>,
    ) -> Self {
        let paths = |sources: &[PathBuf]| -> Vec<String> {
            sources.iter().map(|p| p.display().to_string()).collect()
        };

        Self {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            incident_sources: paths(&config.incident_sources),
            mobilisation_sources: paths(&config.mobilisation_sources),
            output_file: output_file.map(|p| p.display().to_string()),
            key_column: config.key_column.clone(),
            required_column: config.required_column.clone(),
            final_shape: result.data.shape(),
            summary: result.summary.clone(),
            missing_summary: result.missing_summary.clone(),
        }
    }
}

// ============================================================================
// Writers
// ============================================================================

/// Write a row-set as CSV with a header row, creating parent directories.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    create_parent(path)?;
    let mut file = File::create(path)?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)?;

    info!("Dataset saved: {}", path.display());
    Ok(())
}

/// The missing-data report as a three-column frame.
pub fn missing_summary_frame(summary: &MissingDataSummary) -> Result<DataFrame> {
    let columns: Vec<&str> = summary.entries.iter().map(|e| e.column.as_str()).collect();
    let counts: Vec<u64> = summary
        .entries
        .iter()
        .map(|e| e.missing_count as u64)
        .collect();
    let percentages: Vec<f64> = summary
        .entries
        .iter()
        .map(|e| e.missing_percentage)
        .collect();

    let df = DataFrame::new(vec![
        Column::new(MISSING_HEADERS[0].into(), columns),
        Column::new(MISSING_HEADERS[1].into(), counts),
        Column::new(MISSING_HEADERS[2].into(), percentages),
    ])?;
    Ok(df)
}

/// Write the missing-data report as CSV.
pub fn write_missing_summary_csv(summary: &MissingDataSummary, path: &Path) -> Result<()> {
    let mut df = missing_summary_frame(summary)?;
    create_parent(path)?;
    let mut file = File::create(path)?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .with_float_precision(Some(2))
        .finish(&mut df)?;

    info!("Missing data summary saved: {}", path.display());
    Ok(())
}

/// Write a run report as `<dir>/<stem>_report.json`.
pub fn write_report(report: &RunReport, dir: &Path, stem: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let report_path = dir.join(format!("{}_report.json", stem));
    let mut file = File::create(&report_path)?;
    file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

    info!("Report saved: {}", report_path.display());

    Ok(report_path)
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| {
            PipelineError::Io(e).with_context(format!("Creating {}", parent.display()))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MissingColumnEntry;
    use pretty_assertions::assert_eq;

    fn summary() -> MissingDataSummary {
        MissingDataSummary {
            total_rows: 4,
            entries: vec![
                MissingColumnEntry {
                    column: "USRN".to_string(),
                    missing_count: 2,
                    missing_percentage: 50.0,
                },
                MissingColumnEntry {
                    column: "IncidentNumber".to_string(),
                    missing_count: 0,
                    missing_percentage: 0.0,
                },
            ],
        }
    }

    #[test]
    fn test_write_csv_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cleaned_data.csv");
        let mut df = df!("IncidentNumber" => ["1", "2"], "USRN" => ["10", "20"]).unwrap();

        write_csv(&mut df, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("IncidentNumber,USRN"));
        assert_eq!(lines.next(), Some("1,10"));
    }

    #[test]
    fn test_missing_summary_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");

        write_missing_summary_csv(&summary(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Column,Missing Values,Percentage",
                "USRN,2,50.00",
                "IncidentNumber,0,0.00"
            ]
        );
    }

    #[test]
    fn test_missing_summary_frame_keeps_order() {
        let df = missing_summary_frame(&summary()).unwrap();
        assert_eq!(df.shape(), (2, 3));
        let first = df.column("Column").unwrap().get(0).unwrap();
        assert_eq!(first, AnyValue::String("USRN"));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::builder()
            .incident_source("incidents.csv")
            .mobilisation_source("mobilisation.csv")
            .build()
            .unwrap();
        let result = PipelineResult {
            data: df!("IncidentNumber" => ["1"], "USRN" => ["10"]).unwrap(),
            missing_summary: summary(),
            summary: RunSummary::new(),
        };

        let report = RunReport::new(&config, &result, None);
        let path = write_report(&report, dir.path(), "cleaned_data").unwrap();

        assert!(path.ends_with("cleaned_data_report.json"));
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["incident_sources"][0], "incidents.csv");
        assert_eq!(json["final_shape"][0], 1);
        assert_eq!(json["missing_summary"]["entries"][0]["column"], "USRN");
    }
}

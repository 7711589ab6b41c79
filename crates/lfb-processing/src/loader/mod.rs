//! Source loading for incident and mobilisation records.
//!
//! Each entity type is spread over several files of differing vintage
//! (delimited text for older years, spreadsheets for newer ones). This
//! module reads every file into a text-typed DataFrame and unions them in
//! append order, optionally memoizing the union in a parquet cache.

mod cache;
mod spreadsheet;

pub use cache::LoadCache;
pub use spreadsheet::{cell_to_text, range_to_dataframe, read_spreadsheet};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::types::EntityKind;
use crate::utils::column_names;
use polars::functions::concat_df_diagonal;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Delimited text with a header row, using the given separator.
    Delimited(u8),
    /// Workbook; the first sheet is read.
    Spreadsheet,
    /// Columnar file, also used for the load cache.
    Parquet,
}

impl SourceFormat {
    /// Detect the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" | "txt" => Ok(Self::Delimited(b',')),
            "tsv" => Ok(Self::Delimited(b'\t')),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Self::Spreadsheet),
            "parquet" => Ok(Self::Parquet),
            _ => Err(PipelineError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Reads and unions source files.
pub struct DataLoader {
    null_markers: Vec<String>,
    cache: Option<LoadCache>,
    refresh_cache: bool,
}

impl DataLoader {
    /// Create a loader without a cache.
    pub fn new(null_markers: Vec<String>) -> Self {
        Self {
            null_markers,
            cache: None,
            refresh_cache: false,
        }
    }

    /// Create a loader using the null markers and cache settings of a config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            null_markers: config.null_markers.clone(),
            cache: config.cache_dir.as_ref().map(LoadCache::new),
            refresh_cache: config.refresh_cache,
        }
    }

    /// Load every source of one entity type and union them.
    ///
    /// Uses the cache when it is enabled and fresh, and rewrites it after a
    /// raw load. Cache problems are logged and never fail the load.
    pub fn load_entity(&self, entity: EntityKind, sources: &[PathBuf]) -> Result<DataFrame> {
        if sources.is_empty() {
            return Err(PipelineError::InvalidConfig(format!(
                "No {} sources configured",
                entity
            )));
        }

        if let Some(cache) = &self.cache
            && !self.refresh_cache
        {
            match cache.read_if_fresh(entity, sources, &self.null_markers) {
                Ok(Some(df)) => {
                    info!(
                        "Loaded {} records from cache: {:?}",
                        entity,
                        df.shape()
                    );
                    return Ok(df);
                }
                Ok(None) => debug!("No fresh {} cache, reading sources", entity),
                Err(e) => warn!("Ignoring unreadable {} cache: {}", entity, e),
            }
        }

        let mut frames = Vec::with_capacity(sources.len());
        for path in sources {
            let df = self
                .load_source(path)
                .map_err(|e| e.with_context(format!("Loading {} data", entity)))?;
            info!(
                "Loaded {} source {}: {:?}",
                entity,
                path.display(),
                df.shape()
            );
            frames.push(df);
        }

        let mut union = union_frames(frames)?;
        info!("Combined {} records: {:?}", entity, union.shape());

        if let Some(cache) = &self.cache {
            match cache.write(entity, sources, &self.null_markers, &mut union) {
                Ok(path) => debug!("Wrote {} cache to {}", entity, path.display()),
                Err(e) => warn!("Failed to write {} cache: {}", entity, e),
            }
        }

        Ok(union)
    }

    /// Load a single source file into a text-typed DataFrame.
    pub fn load_source(&self, path: &Path) -> Result<DataFrame> {
        let format = SourceFormat::from_path(path)?;

        if !path.is_file() {
            return Err(PipelineError::source_unavailable(path, "file not found"));
        }

        let df = match format {
            SourceFormat::Delimited(separator) => self.read_delimited(path, separator),
            SourceFormat::Spreadsheet => read_spreadsheet(path, &self.null_markers),
            SourceFormat::Parquet => read_parquet(path),
        }
        .map_err(|e| match e {
            PipelineError::SourceUnavailable { .. } => e,
            other => PipelineError::source_unavailable(path, other),
        })?;

        to_text_frame(df)
    }

    fn read_delimited(&self, path: &Path, separator: u8) -> Result<DataFrame> {
        let null_values = NullValues::AllColumns(
            self.null_markers
                .iter()
                .map(|m| PlSmallStr::from(m.as_str()))
                .collect(),
        );

        // Schema inference is disabled so every column is read as text.
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_parse_options(
                CsvParseOptions::default()
                    .with_separator(separator)
                    .with_quote_char(Some(b'"'))
                    .with_null_values(Some(null_values)),
            )
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        Ok(df)
    }
}

/// Read a parquet file.
pub fn read_parquet(path: &Path) -> Result<DataFrame> {
    let file = std::fs::File::open(path)?;
    Ok(ParquetReader::new(file).finish()?)
}

/// Cast every non-text column to text.
pub fn to_text_frame(mut df: DataFrame) -> Result<DataFrame> {
    for name in column_names(&df) {
        let column = df.column(&name)?;
        if column.dtype() != &DataType::String {
            let cast = column.as_materialized_series().cast(&DataType::String)?;
            df.replace(&name, cast)?;
        }
    }
    Ok(df)
}

/// Union row-sets of the same entity type in append order.
///
/// Columns missing from some frames are filled with undefined values; the
/// column order is the order of first appearance across frames.
pub fn union_frames(frames: Vec<DataFrame>) -> Result<DataFrame> {
    if frames.is_empty() {
        return Ok(DataFrame::empty());
    }

    // Diagonal concat needs one dtype per column name
    let frames = frames
        .into_iter()
        .map(to_text_frame)
        .collect::<Result<Vec<_>>>()?;

    Ok(concat_df_diagonal(&frames)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_NULL_MARKERS;
    use std::io::Write;

    fn loader() -> DataLoader {
        DataLoader::new(DEFAULT_NULL_MARKERS.iter().map(|s| s.to_string()).collect())
    }

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_source_format_detection() {
        assert_eq!(
            SourceFormat::from_path(Path::new("a.csv")).unwrap(),
            SourceFormat::Delimited(b',')
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("a.TSV")).unwrap(),
            SourceFormat::Delimited(b'\t')
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("LFB Incident data from 2018 onwards.csv.xlsx"))
                .unwrap(),
            SourceFormat::Spreadsheet
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("cache/incidents.parquet")).unwrap(),
            SourceFormat::Parquet
        );
        assert!(matches!(
            SourceFormat::from_path(Path::new("notes.docx")),
            Err(PipelineError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_load_csv_reads_text_and_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "incidents.csv",
            "IncidentNumber,CalYear,USRN\n1001.0,2015,NA\n 002 ,2016,\n",
        );

        let df = loader().load_source(&path).unwrap();

        assert_eq!(df.shape(), (2, 3));
        let key = df.column("IncidentNumber").unwrap();
        assert_eq!(key.dtype(), &DataType::String);
        assert_eq!(key.as_materialized_series().str().unwrap().get(0), Some("1001.0"));
        assert_eq!(key.as_materialized_series().str().unwrap().get(1), Some(" 002 "));
        assert_eq!(df.column("USRN").unwrap().null_count(), 2);
    }

    #[test]
    fn test_missing_source_is_unavailable() {
        let err = loader()
            .load_source(Path::new("/definitely/not/here.csv"))
            .unwrap_err();
        assert_eq!(err.error_code(), "SOURCE_UNAVAILABLE");
    }

    #[test]
    fn test_union_frames_aligns_columns() {
        let a = df!("IncidentNumber" => ["1", "2"], "CalYear" => ["2009", "2010"]).unwrap();
        let b = df!("IncidentNumber" => ["3"], "USRN" => ["77"], "CalYear" => ["2018"]).unwrap();

        let union = union_frames(vec![a, b]).unwrap();

        assert_eq!(column_names(&union), vec!["IncidentNumber", "CalYear", "USRN"]);
        assert_eq!(union.height(), 3);
        let usrn = union.column("USRN").unwrap();
        assert_eq!(usrn.null_count(), 2);
        let keys = union.column("IncidentNumber").unwrap();
        assert_eq!(keys.as_materialized_series().str().unwrap().get(2), Some("3"));
    }

    #[test]
    fn test_union_frames_casts_to_text() {
        let a = df!("IncidentNumber" => [1001i64]).unwrap();
        let b = df!("IncidentNumber" => ["1002"]).unwrap();

        let union = union_frames(vec![a, b]).unwrap();

        let keys = union.column("IncidentNumber").unwrap();
        assert_eq!(keys.dtype(), &DataType::String);
        assert_eq!(keys.as_materialized_series().str().unwrap().get(0), Some("1001"));
    }

    #[test]
    fn test_load_entity_unions_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_file(dir.path(), "a.csv", "IncidentNumber,CalYear\n1,2009\n");
        let second = write_file(dir.path(), "b.csv", "IncidentNumber,CalYear\n2,2018\n");

        let df = loader()
            .load_entity(EntityKind::Incident, &[first, second])
            .unwrap();

        let keys = df.column("IncidentNumber").unwrap();
        assert_eq!(keys.as_materialized_series().str().unwrap().get(0), Some("1"));
        assert_eq!(keys.as_materialized_series().str().unwrap().get(1), Some("2"));
    }

    #[test]
    fn test_load_entity_unions_csv_and_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_file(dir.path(), "a.csv", "IncidentNumber,FRS,USRN\n1001,London,NA\n");
        let xlsx = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/incidents_2021.xlsx");

        let df = loader().load_entity(EntityKind::Incident, &[csv, xlsx]).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(
            column_names(&df),
            vec!["IncidentNumber", "FRS", "USRN", "CalYear", "HourOfCall", "IncidentGroup"]
        );
        assert_eq!(df.column("FRS").unwrap().null_count(), 2);
        // The CSV and the workbook both spell one of their USRNs "NA"
        assert_eq!(df.column("USRN").unwrap().null_count(), 2);
    }

    #[test]
    fn test_load_entity_fails_on_any_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let present = write_file(dir.path(), "a.csv", "IncidentNumber\n1\n");
        let missing = dir.path().join("b.csv");

        let err = loader()
            .load_entity(EntityKind::Mobilisation, &[present, missing])
            .unwrap_err();

        assert!(err.is_source_error());
        assert!(err.to_string().contains("Loading mobilisation data"));
    }
}

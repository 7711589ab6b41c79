//! Configuration types for the cleaning pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup. Configurations can also be
//! read from a JSON file.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Join key shared by incident and mobilisation records.
pub const DEFAULT_KEY_COLUMN: &str = "IncidentNumber";

/// Column that must be defined for a row to survive the final filter.
pub const DEFAULT_REQUIRED_COLUMN: &str = "USRN";

/// Columns deemed irrelevant or redundant after the merge.
pub const DEFAULT_COLUMNS_TO_DROP: [&str; 15] = [
    "DelayCode_Description",
    "DelayCodeId",
    "SpecialServiceType",
    "SecondPumpArriving_DeployedFromStation",
    "SecondPumpArriving_AttendanceTime",
    "DateAndTimeReturned",
    "FRS",
    "Notional Cost (£)",
    "ResourceMobilisationId",
    "Resource_Code",
    "PerformanceReporting",
    "PlusCode_Code",
    "PlusCode_Description",
    "CalYear_y",
    "HourOfCall_y",
];

/// Text values read as undefined from delimited sources.
pub const DEFAULT_NULL_MARKERS: [&str; 6] = ["NA", "N/A", "NaN", "nan", "NULL", "null"];

/// Suffix for incident-side columns whose names collide in the merge.
pub const LEFT_SUFFIX: &str = "_x";

/// Suffix for mobilisation-side columns whose names collide in the merge.
pub const RIGHT_SUFFIX: &str = "_y";

/// Configuration for the cleaning pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lfb_processing::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .incident_source("LFB Incident data from 2009 - 2017.csv")
///     .incident_source("LFB Incident data from 2018 onwards.csv.xlsx")
///     .mobilisation_source("LFB Mobilisation data 2021 - 2024.xlsx")
///     .cache_dir(".cache")
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Incident sources, unioned in the given order.
    pub incident_sources: Vec<PathBuf>,

    /// Mobilisation sources, unioned in the given order.
    pub mobilisation_sources: Vec<PathBuf>,

    /// Join key column present in both entity types.
    /// Default: "IncidentNumber"
    pub key_column: String,

    /// Rows with an undefined value here are dropped after reporting.
    /// Default: "USRN"
    pub required_column: String,

    /// Columns removed after deduplication when present.
    pub columns_to_drop: Vec<String>,

    /// Rename a surviving `<name>_x` back to `<name>` once its `_y`
    /// counterpart has been dropped.
    /// Default: true
    pub restore_left_names: bool,

    /// Text values treated as undefined in delimited sources.
    pub null_markers: Vec<String>,

    /// Directory for the columnar load cache. `None` disables caching.
    /// Default: None
    pub cache_dir: Option<PathBuf>,

    /// Ignore existing cache files and rebuild them from the sources.
    /// Default: false
    pub refresh_cache: bool,

    /// Output directory for the cleaned data and reports.
    /// Default: "output"
    pub output_dir: PathBuf,

    /// Output file name for the cleaned data (without extension).
    /// Default: "cleaned_data"
    pub output_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            incident_sources: Vec::new(),
            mobilisation_sources: Vec::new(),
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            required_column: DEFAULT_REQUIRED_COLUMN.to_string(),
            columns_to_drop: DEFAULT_COLUMNS_TO_DROP.iter().map(|s| s.to_string()).collect(),
            restore_left_names: true,
            null_markers: DEFAULT_NULL_MARKERS.iter().map(|s| s.to_string()).collect(),
            cache_dir: None,
            refresh_cache: false,
            output_dir: PathBuf::from("output"),
            output_name: "cleaned_data".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Read a configuration from a JSON file.
    ///
    /// Missing fields take their default values. The result is not
    /// validated, so callers can still add sources before running.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::source_unavailable(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Path of the cleaned CSV inside the output directory.
    pub fn output_csv_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.csv", self.output_name))
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if self.incident_sources.is_empty() {
            return Err(ConfigValidationError::NoSources("incident".to_string()));
        }

        if self.mobilisation_sources.is_empty() {
            return Err(ConfigValidationError::NoSources("mobilisation".to_string()));
        }

        if self.key_column.trim().is_empty() {
            return Err(ConfigValidationError::EmptyColumnName("key_column".to_string()));
        }

        if self.required_column.trim().is_empty() {
            return Err(ConfigValidationError::EmptyColumnName(
                "required_column".to_string(),
            ));
        }

        if self.columns_to_drop.iter().any(|c| c == &self.key_column) {
            return Err(ConfigValidationError::DropsKeyColumn(self.key_column.clone()));
        }

        if self.output_name.trim().is_empty() {
            return Err(ConfigValidationError::EmptyColumnName("output_name".to_string()));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("No {0} sources configured")]
    NoSources(String),

    #[error("'{0}' must not be empty")]
    EmptyColumnName(String),

    #[error("Join key '{0}' cannot be in the drop list")]
    DropsKeyColumn(String),
}

impl From<ConfigValidationError> for PipelineError {
    fn from(err: ConfigValidationError) -> Self {
        PipelineError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    base: Option<PipelineConfig>,
    incident_sources: Vec<PathBuf>,
    mobilisation_sources: Vec<PathBuf>,
    key_column: Option<String>,
    required_column: Option<String>,
    columns_to_drop: Option<Vec<String>>,
    restore_left_names: Option<bool>,
    null_markers: Option<Vec<String>>,
    cache_dir: Option<PathBuf>,
    refresh_cache: Option<bool>,
    output_dir: Option<PathBuf>,
    output_name: Option<String>,
}

impl PipelineConfigBuilder {
    /// Start from an existing configuration (e.g. one read from JSON).
    ///
    /// Sources added on the builder are appended to the base sources;
    /// every other setter overrides the base value.
    pub fn from_config(config: PipelineConfig) -> Self {
        Self {
            base: Some(config),
            ..Self::default()
        }
    }

    /// Append an incident source.
    pub fn incident_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.incident_sources.push(path.into());
        self
    }

    /// Append several incident sources.
    pub fn incident_sources<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.incident_sources.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Append a mobilisation source.
    pub fn mobilisation_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.mobilisation_sources.push(path.into());
        self
    }

    /// Append several mobilisation sources.
    pub fn mobilisation_sources<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.mobilisation_sources.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Set the join key column.
    pub fn key_column(mut self, column: impl Into<String>) -> Self {
        self.key_column = Some(column.into());
        self
    }

    /// Set the column that must be defined in every output row.
    pub fn required_column(mut self, column: impl Into<String>) -> Self {
        self.required_column = Some(column.into());
        self
    }

    /// Replace the list of columns removed after deduplication.
    pub fn columns_to_drop<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns_to_drop = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Enable or disable renaming `<name>_x` back to `<name>`.
    pub fn restore_left_names(mut self, restore: bool) -> Self {
        self.restore_left_names = Some(restore);
        self
    }

    /// Replace the list of text values read as undefined.
    pub fn null_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_markers = Some(markers.into_iter().map(Into::into).collect());
        self
    }

    /// Enable the load cache in the given directory.
    pub fn cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Force the cache to be rebuilt from the sources.
    pub fn refresh_cache(mut self, refresh: bool) -> Self {
        self.refresh_cache = Some(refresh);
        self
    }

    /// Set the output directory for cleaned data and reports.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set the cleaned data file name (without extension).
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<PipelineConfig, ConfigValidationError> {
        let base = self.base.unwrap_or_default();

        let mut incident_sources = base.incident_sources;
        incident_sources.extend(self.incident_sources);
        let mut mobilisation_sources = base.mobilisation_sources;
        mobilisation_sources.extend(self.mobilisation_sources);

        let config = PipelineConfig {
            incident_sources,
            mobilisation_sources,
            key_column: self.key_column.unwrap_or(base.key_column),
            required_column: self.required_column.unwrap_or(base.required_column),
            columns_to_drop: self.columns_to_drop.unwrap_or(base.columns_to_drop),
            restore_left_names: self.restore_left_names.unwrap_or(base.restore_left_names),
            null_markers: self.null_markers.unwrap_or(base.null_markers),
            cache_dir: self.cache_dir.or(base.cache_dir),
            refresh_cache: self.refresh_cache.unwrap_or(base.refresh_cache),
            output_dir: self.output_dir.unwrap_or(base.output_dir),
            output_name: self.output_name.unwrap_or(base.output_name),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sourced() -> PipelineConfigBuilder {
        PipelineConfig::builder()
            .incident_source("incidents.csv")
            .mobilisation_source("mobilisation.csv")
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.key_column, "IncidentNumber");
        assert_eq!(config.required_column, "USRN");
        assert_eq!(config.columns_to_drop.len(), 15);
        assert!(config.columns_to_drop.contains(&"Notional Cost (£)".to_string()));
        assert!(config.restore_left_names);
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn test_builder_requires_sources() {
        let result = PipelineConfig::builder().build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::NoSources(entity) if entity == "incident"
        ));

        let result = PipelineConfig::builder().incident_source("a.csv").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::NoSources(entity) if entity == "mobilisation"
        ));
    }

    #[test]
    fn test_builder_custom_values() {
        let config = sourced()
            .incident_source("incidents_2018.xlsx")
            .key_column("Id")
            .required_column("Ward")
            .columns_to_drop(["A", "B"])
            .restore_left_names(false)
            .cache_dir("cache")
            .refresh_cache(true)
            .output_name("lfb")
            .build()
            .unwrap();

        assert_eq!(config.incident_sources.len(), 2);
        assert_eq!(config.key_column, "Id");
        assert_eq!(config.required_column, "Ward");
        assert_eq!(config.columns_to_drop, vec!["A".to_string(), "B".to_string()]);
        assert!(!config.restore_left_names);
        assert_eq!(config.cache_dir, Some(PathBuf::from("cache")));
        assert!(config.refresh_cache);
        assert_eq!(config.output_csv_path(), PathBuf::from("output/lfb.csv"));
    }

    #[test]
    fn test_validation_rejects_dropping_key() {
        let result = sourced().columns_to_drop(["IncidentNumber"]).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::DropsKeyColumn(_)
        ));
    }

    #[test]
    fn test_validation_rejects_blank_key() {
        let result = sourced().key_column("  ").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyColumnName(_)
        ));
    }

    #[test]
    fn test_builder_extends_base_config() {
        let base = PipelineConfig {
            incident_sources: vec![PathBuf::from("base.csv")],
            required_column: "Ward".to_string(),
            ..PipelineConfig::default()
        };

        let config = PipelineConfigBuilder::from_config(base)
            .incident_source("extra.csv")
            .mobilisation_source("mob.csv")
            .build()
            .unwrap();

        assert_eq!(
            config.incident_sources,
            vec![PathBuf::from("base.csv"), PathBuf::from("extra.csv")]
        );
        assert_eq!(config.required_column, "Ward");
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{
            "incident_sources": ["inc.csv"],
            "mobilisation_sources": ["mob_a.xlsx", "mob_b.xlsx"],
            "required_column": "UPRN",
            "cache_dir": ".cache"
        }"#;

        let config: PipelineConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.mobilisation_sources.len(), 2);
        assert_eq!(config.required_column, "UPRN");
        assert_eq!(config.key_column, "IncidentNumber");
        assert_eq!(config.cache_dir, Some(PathBuf::from(".cache")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_error_converts_to_pipeline_error() {
        let err: PipelineError = ConfigValidationError::NoSources("incident".to_string()).into();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }
}

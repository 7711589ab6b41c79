//! Error types for the cleaning pipeline.
//!
//! Every stage returns [`PipelineError`]. Fatal conditions (a source that
//! cannot be read, a missing join key) abort the run; optional projection
//! columns are never reported through this type, they are skipped and logged.
//!
//! Errors serialize as `{code, message}` so a presentation layer can show
//! them without matching on the Rust enum.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the cleaning pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required input file is missing or unreadable.
    #[error("Source {path:?} unavailable: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    /// The file extension does not map to a supported reader.
    #[error("Unsupported source format: {0:?}")]
    UnsupportedFormat(PathBuf),

    /// An expected column is absent from a row-set.
    #[error("Column '{column}' not found ({context})")]
    SchemaMismatch { column: String, context: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Spreadsheet reader error.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Shorthand for a [`PipelineError::SchemaMismatch`].
    pub fn schema_mismatch(column: impl Into<String>, context: impl Into<String>) -> Self {
        PipelineError::SchemaMismatch {
            column: column.into(),
            context: context.into(),
        }
    }

    /// Shorthand for a [`PipelineError::SourceUnavailable`].
    pub fn source_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PipelineError::SourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipelineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for presentation-layer handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "SOURCE_UNAVAILABLE",
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Spreadsheet(_) => "SPREADSHEET_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// True when the run failed because an input could not be read.
    pub fn is_source_error(&self) -> bool {
        match self {
            Self::SourceUnavailable { .. } | Self::UnsupportedFormat(_) => true,
            Self::WithContext { source, .. } => source.is_source_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PipelineError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            PipelineError::schema_mismatch("USRN", "required column").error_code(),
            "SCHEMA_MISMATCH"
        );
        assert_eq!(
            PipelineError::source_unavailable("a.csv", "missing").error_code(),
            "SOURCE_UNAVAILABLE"
        );
    }

    #[test]
    fn test_is_source_error() {
        assert!(PipelineError::UnsupportedFormat(PathBuf::from("a.doc")).is_source_error());
        assert!(
            PipelineError::source_unavailable("a.csv", "missing")
                .with_context("Loading incidents")
                .is_source_error()
        );
        assert!(!PipelineError::InvalidConfig("x".to_string()).is_source_error());
    }

    #[test]
    fn test_error_serialization() {
        let error = PipelineError::schema_mismatch("IncidentNumber", "join key");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("SCHEMA_MISMATCH"));
        assert!(json.contains("IncidentNumber"));
    }

    #[test]
    fn test_with_context() {
        let error = PipelineError::source_unavailable("mob.xlsx", "not found")
            .with_context("Loading mobilisation");
        assert!(error.to_string().contains("Loading mobilisation"));
        assert!(error.to_string().contains("mob.xlsx"));
        assert_eq!(error.error_code(), "SOURCE_UNAVAILABLE");
    }
}

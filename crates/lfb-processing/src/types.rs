use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two entity types the pipeline loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Incident,
    Mobilisation,
}

impl EntityKind {
    /// File stem used for this entity's cache file.
    pub fn cache_stem(&self) -> &'static str {
        match self {
            Self::Incident => "incidents",
            Self::Mobilisation => "mobilisation",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incident => write!(f, "incident"),
            Self::Mobilisation => write!(f, "mobilisation"),
        }
    }
}

/// Missing-value statistics for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingColumnEntry {
    pub column: String,
    pub missing_count: usize,
    /// Share of undefined values over all rows, 0.0 - 100.0.
    pub missing_percentage: f64,
}

/// Per-column missing-value report, ordered by descending percentage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingDataSummary {
    /// Rows the report was computed over.
    pub total_rows: usize,
    pub entries: Vec<MissingColumnEntry>,
}

impl MissingDataSummary {
    /// Look up the entry for a column.
    pub fn get(&self, column: &str) -> Option<&MissingColumnEntry> {
        self.entries.iter().find(|e| e.column == column)
    }

    /// Sum of missing counts over all columns.
    pub fn total_missing(&self) -> usize {
        self.entries.iter().map(|e| e.missing_count).sum()
    }

    /// Entries with at least one undefined value.
    pub fn with_missing(&self) -> impl Iterator<Item = &MissingColumnEntry> {
        self.entries.iter().filter(|e| e.missing_count > 0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What the projection step removed or renamed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectionOutcome {
    /// Rows discarded because their key had already been seen.
    pub duplicates_removed: usize,
    /// Columns that were present and removed.
    pub dropped_columns: Vec<String>,
    /// Columns named for removal that were not present.
    pub skipped_columns: Vec<String>,
    /// `(from, to)` renames of suffixed incident-side columns.
    pub renamed_columns: Vec<(String, String)>,
}

/// Shape of the row-set after a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageShape {
    pub stage: String,
    pub rows: usize,
    pub columns: usize,
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub incident_rows: usize,
    pub mobilisation_rows: usize,
    pub shapes: Vec<StageShape>,
    pub projection: ProjectionOutcome,
    /// Rows discarded because the required column was undefined.
    pub rows_missing_required: usize,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the shape of a row-set after a stage.
    pub fn record_shape(&mut self, stage: impl Into<String>, df: &DataFrame) {
        self.shapes.push(StageShape {
            stage: stage.into(),
            rows: df.height(),
            columns: df.width(),
        });
    }

    /// Shape recorded for a stage, if any.
    pub fn shape(&self, stage: &str) -> Option<&StageShape> {
        self.shapes.iter().find(|s| s.stage == stage)
    }
}

/// Result of a full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// The cleaned row-set.
    pub data: DataFrame,
    /// Missing-value report computed before the required-column filter.
    pub missing_summary: MissingDataSummary,
    pub summary: RunSummary,
}

impl PipelineResult {
    /// True when no row survived the pipeline.
    ///
    /// An empty result is a valid outcome, distinct from a failed run.
    pub fn is_empty(&self) -> bool {
        self.data.height() == 0
    }
}

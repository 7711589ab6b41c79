//! Stage reporting for the cleaning pipeline.
//!
//! The pipeline is a fixed linear sequence of stages. A [`StageReporter`]
//! is told when each stage starts and when the run ends.
//!
//! # Example
//!
//! ```rust,ignore
//! use lfb_processing::Pipeline;
//!
//! let result = Pipeline::builder()
//!     .config(config)
//!     .on_stage(|stage, message| {
//!         println!("[{}] {}", stage.display_name(), message);
//!     })
//!     .build()?
//!     .run()?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the cleaning pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Reading and unioning the sources of each entity
    Loading,
    /// Canonicalizing the join key
    Normalizing,
    /// Full outer join of incidents and mobilisation
    Merging,
    /// Keeping the first row per key and dropping columns
    Deduplicating,
    /// Missing-data report and required-column filter
    Reporting,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl PipelineStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Sources",
            Self::Normalizing => "Normalizing Keys",
            Self::Merging => "Merging Records",
            Self::Deduplicating => "Deduplicating",
            Self::Reporting => "Reporting Missing Data",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// The working stages, without the terminal ones.
    pub fn sequence() -> [PipelineStage; 5] {
        [
            Self::Loading,
            Self::Normalizing,
            Self::Merging,
            Self::Deduplicating,
            Self::Reporting,
        ]
    }

    /// True for `Complete` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// Receives stage notifications from a running pipeline.
///
/// Implementations must be `Send + Sync` so the pipeline can be moved to
/// another thread.
pub trait StageReporter: Send + Sync {
    /// Called when a stage starts, and once more with a terminal stage.
    fn report(&self, stage: PipelineStage, message: &str);
}

/// Wrapper that implements [`StageReporter`] using a closure.
pub struct ClosureStageReporter<F>
where
    F: Fn(PipelineStage, &str) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureStageReporter<F>
where
    F: Fn(PipelineStage, &str) + Send + Sync,
{
    /// Creates a new closure-based stage reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> StageReporter for ClosureStageReporter<F>
where
    F: Fn(PipelineStage, &str) + Send + Sync,
{
    fn report(&self, stage: PipelineStage, message: &str) {
        (self.callback)(stage, message);
    }
}

//! Pipeline module.
//!
//! This module provides the cleaning pipeline, its stage functions and
//! stage reporting.

mod builder;
pub mod progress;
mod stages;

pub use builder::{Pipeline, PipelineBuilder};
pub use progress::{ClosureStageReporter, PipelineStage, StageReporter};
pub use stages::{
    deduplicate_and_project, load, merge, normalize_and_merge, normalize_keys, report_and_filter,
};

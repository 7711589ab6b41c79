//! Data quality module.
//!
//! This module provides the missing-data report and the required-column
//! filter that closes the pipeline.

mod missing;

pub use missing::MissingDataReporter;

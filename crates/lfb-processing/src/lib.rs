//! LFB Incident & Mobilisation Cleaning Library
//!
//! Loads London Fire Brigade incident and mobilisation records, merges them
//! on the incident number and cleans the result, built with Rust and Polars.
//!
//! # Overview
//!
//! The pipeline is strictly linear:
//!
//! ```text
//! Load -> Normalize key -> Merge -> Deduplicate + Project -> Report + Filter
//! ```
//!
//! - **Loading**: delimited text, spreadsheets and parquet, unioned per entity,
//!   with an optional parquet cache
//! - **Key Normalization**: `1001.0`, ` 1001 ` and `1001` all become `1001`
//! - **Merging**: full outer join; colliding columns get `_x` / `_y` suffixes
//! - **Deduplication**: first row per incident number, then a fixed set of
//!   irrelevant columns is dropped when present
//! - **Missing Data**: per-column report computed before rows with an
//!   undefined `USRN` are dropped
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lfb_processing::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .incident_source("LFB Incident data from 2009 - 2017.csv")
//!     .incident_source("LFB Incident data from 2018 onwards.csv.xlsx")
//!     .mobilisation_source("LFB Mobilisation data from 2009 - 2014.csv")
//!     .mobilisation_source("LFB Mobilisation data 2021 - 2024.xlsx")
//!     .cache_dir(".cache")
//!     .build()?;
//!
//! let mut result = Pipeline::builder().config(config.clone()).build()?.run()?;
//!
//! for entry in result.missing_summary.with_missing() {
//!     println!("{}: {:.2}%", entry.column, entry.missing_percentage);
//! }
//! lfb_processing::reporting::write_csv(&mut result.data, &config.output_csv_path())?;
//! ```
//!
//! # Views
//!
//! The [`views`] module filters and summarizes the cleaned snapshot without
//! rerunning the pipeline:
//!
//! ```rust,ignore
//! use lfb_processing::views::{apply_filter, value_counts, FilterOutcome, RowFilter, ViewColumns};
//!
//! let filter = RowFilter { year: Some(2018), incident_group: Some("Fire".into()) };
//! match apply_filter(&result.data, &filter, &ViewColumns::default())? {
//!     FilterOutcome::Rows(df) => println!("{:?}", value_counts(&df, "IncidentGroup")?),
//!     FilterOutcome::Empty { criteria } => println!("No data for {}", criteria),
//! }
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod quality;
pub mod reporting;
pub mod types;
pub mod utils;
pub mod views;

// Re-exports for convenient access
pub use cleaner::{DataCleaner, normalize_key, outer_merge};
pub use config::{ConfigValidationError, PipelineConfig, PipelineConfigBuilder};
pub use error::{PipelineError, Result as CleaningResult, ResultExt};
pub use loader::{DataLoader, LoadCache, SourceFormat};
pub use pipeline::{
    ClosureStageReporter, Pipeline, PipelineBuilder, PipelineStage, StageReporter,
};
pub use quality::MissingDataReporter;
pub use reporting::RunReport;
pub use types::{
    EntityKind, MissingColumnEntry, MissingDataSummary, PipelineResult, ProjectionOutcome,
    RunSummary, StageShape,
};
pub use views::{FilterOutcome, RowFilter, ViewColumns};

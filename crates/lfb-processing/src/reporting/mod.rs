//! Export and report module.
//!
//! This module writes the cleaned row-set and the missing-data report,
//! and builds the JSON run report used by both the `--json` and
//! `--emit-report` CLI flags.
//!
//! # Example
//!
//! ```rust,ignore
//! use lfb_processing::reporting::{RunReport, write_csv, write_report};
//!
//! let csv_path = config.output_csv_path();
//! write_csv(&mut result.data, &csv_path)?;
//!
//! let report = RunReport::new(&config, &result, Some(csv_path.as_path()));
//! write_report(&report, &config.output_dir, &config.output_name)?;
//! ```

mod generator;

pub use generator::{
    RunReport, missing_summary_frame, write_csv, write_missing_summary_csv, write_report,
};

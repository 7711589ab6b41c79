//! Cleaning operations for the merged incident/mobilisation row-set.
//!
//! This module provides functionality for:
//! - Canonicalizing the join key
//! - Full outer merge with suffixed collisions
//! - Keeping the first row per key
//! - Capability-checked column removal

mod key;
mod merge;
mod projection;

pub use key::{normalize_key, normalize_key_value};
pub use merge::outer_merge;
pub use projection::{deduplicate_by_key, drop_columns, restore_left_names};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::types::ProjectionOutcome;
use polars::prelude::*;
use tracing::{debug, info};

/// Data cleaner for the deduplicate-and-project step.
pub struct DataCleaner;

impl DataCleaner {
    /// Deduplicate by key, then drop the configured columns.
    ///
    /// This includes:
    /// 1. Keeping the first row per key value
    /// 2. Removing the configured columns that are present
    /// 3. Restoring plain names of suffixed incident columns (if enabled)
    pub fn deduplicate_and_project(
        &self,
        df: DataFrame,
        config: &PipelineConfig,
    ) -> Result<(DataFrame, ProjectionOutcome)> {
        let mut outcome = ProjectionOutcome::default();

        info!("Deduplicating on '{}'...", config.key_column);

        // 1. Keep the first row per key
        let (df, removed) = deduplicate_by_key(df, &config.key_column)?;
        outcome.duplicates_removed = removed;
        if removed > 0 {
            info!("Removed {} duplicate rows", removed);
        } else {
            debug!("No duplicate keys found");
        }

        // 2. Drop configured columns
        let (df, dropped, skipped) = drop_columns(df, &config.columns_to_drop);
        if !dropped.is_empty() {
            info!("Dropped {} columns: {:?}", dropped.len(), dropped);
        }
        outcome.dropped_columns = dropped;
        outcome.skipped_columns = skipped;

        // 3. Restore incident-side names, never to a dropped name
        let df = if config.restore_left_names {
            let (df, renamed) = restore_left_names(df, &config.columns_to_drop)?;
            outcome.renamed_columns = renamed;
            df
        } else {
            df
        };

        Ok((df, outcome))
    }
}

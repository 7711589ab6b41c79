use crate::error::Result;
use crate::types::{MissingColumnEntry, MissingDataSummary};
use crate::utils::require_column;
use polars::prelude::*;
use std::cmp::Ordering;
use tracing::{debug, info};

pub struct MissingDataReporter;

impl MissingDataReporter {
    /// Per-column undefined count and percentage.
    ///
    /// Entries are sorted by descending percentage; ties keep column order.
    /// Over zero rows every percentage is 0.0.
    pub fn summarize_missing(df: &DataFrame) -> MissingDataSummary {
        let total_rows = df.height();

        let mut entries: Vec<MissingColumnEntry> = df
            .get_columns()
            .iter()
            .map(|col| {
                let missing_count = col.null_count();
                let missing_percentage = if total_rows == 0 {
                    0.0
                } else {
                    missing_count as f64 / total_rows as f64 * 100.0
                };
                MissingColumnEntry {
                    column: col.name().to_string(),
                    missing_count,
                    missing_percentage,
                }
            })
            .collect();

        entries.sort_by(|a, b| {
            b.missing_percentage
                .partial_cmp(&a.missing_percentage)
                .unwrap_or(Ordering::Equal)
        });

        MissingDataSummary {
            total_rows,
            entries,
        }
    }

    /// Remove rows whose `column` is undefined. Returns the rows removed.
    pub fn drop_missing_required(df: DataFrame, column: &str) -> Result<(DataFrame, usize)> {
        require_column(&df, column, "required column filter")?;

        let mask = df.column(column)?.as_materialized_series().is_not_null();
        let before = df.height();
        let df = df.filter(&mask)?;
        let removed = before - df.height();

        if removed > 0 {
            info!("Dropped {} rows with undefined '{}'", removed, column);
        } else {
            debug!("No rows with undefined '{}'", column);
        }

        Ok((df, removed))
    }

    /// Build the report over the unfiltered frame, then apply the filter.
    pub fn report_and_filter(
        df: DataFrame,
        required_column: &str,
    ) -> Result<(DataFrame, MissingDataSummary, usize)> {
        require_column(&df, required_column, "required column filter")?;

        let summary = Self::summarize_missing(&df);
        info!(
            "Missing data: {} of {} columns have undefined values",
            summary.with_missing().count(),
            summary.entries.len()
        );

        let (df, removed) = Self::drop_missing_required(df, required_column)?;
        Ok((df, summary, removed))
    }
}

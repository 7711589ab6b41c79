//! Shared utilities for the cleaning pipeline.
//!
//! This module contains column lookup and text conversion helpers used
//! across the loader, cleaner and views.

use crate::error::{PipelineError, Result};
use polars::prelude::*;

// =============================================================================
// Column Utilities
// =============================================================================

/// Column names of a DataFrame as owned strings, in frame order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Check whether a DataFrame has a column with the given name.
#[inline]
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Fail with [`PipelineError::SchemaMismatch`] when a column is absent.
pub fn require_column(df: &DataFrame, name: &str, context: &str) -> Result<()> {
    if has_column(df, name) {
        Ok(())
    } else {
        Err(PipelineError::schema_mismatch(name, context))
    }
}

/// Read a column as text values, whatever its dtype.
///
/// Numbers are rendered the way polars casts them (`1001.0` stays
/// `"1001.0"`), nulls stay `None`.
pub fn text_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::schema_mismatch(name, "reading column values"))?;
    let series = column.as_materialized_series().cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 4] = [',', '£', '%', ' '];

/// Clean a string for numeric parsing by removing formatting characters.
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Try to parse a string as a numeric value (f64).
///
/// Handles thousands separators and currency/percentage symbols.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a calendar year written as an integer or a float-rendered integer.
pub fn parse_year(s: &str) -> Option<i64> {
    let value = parse_numeric_string(s)?;
    if value.fract() != 0.0 {
        return None;
    }
    Some(value as i64)
}

//! Join key canonicalization.
//!
//! Incident numbers arrive as `1001`, `1001.0`, ` 1001 ` or as floats in
//! spreadsheets. They are compared as text, so every variant is reduced to
//! the part before the first `.`.

use crate::error::Result;
use crate::utils::{require_column, text_values};
use polars::prelude::*;
use tracing::debug;

/// Canonicalize a single key value.
///
/// Trims, then truncates at the first `.`. Returns `None` when nothing is
/// left, so empty keys never match in the join.
pub fn normalize_key_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let head = match trimmed.find('.') {
        Some(idx) => &trimmed[..idx],
        None => trimmed,
    };
    let head = head.trim_end();

    if head.is_empty() {
        None
    } else {
        Some(head.to_string())
    }
}

/// Replace the key column with its canonical text form.
///
/// Any dtype is accepted; the result is always a text column. Applying this
/// twice gives the same frame as applying it once.
pub fn normalize_key(mut df: DataFrame, key: &str) -> Result<DataFrame> {
    require_column(&df, key, "normalizing join key")?;

    let raw = text_values(&df, key)?;
    let before_nulls = raw.iter().filter(|v| v.is_none()).count();
    let normalized: Vec<Option<String>> = raw
        .iter()
        .map(|v| v.as_deref().and_then(normalize_key_value))
        .collect();
    let after_nulls = normalized.iter().filter(|v| v.is_none()).count();

    if after_nulls > before_nulls {
        debug!(
            "{} '{}' values became undefined after normalization",
            after_nulls - before_nulls,
            key
        );
    }

    df.replace(key, Series::new(key.into(), normalized))?;
    Ok(df)
}

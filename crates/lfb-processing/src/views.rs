//! Read-only views over the cleaned row-set.
//!
//! Everything here is a pure function over an already-cleaned frame, so a
//! presentation layer can re-filter as often as it likes without rerunning
//! the pipeline.

use crate::error::Result;
use crate::utils::{parse_numeric_string, parse_year, require_column, text_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tracing::debug;

/// Columns the row filter and summaries read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewColumns {
    /// Default: "CalYear"
    pub year: String,
    /// Default: "IncidentGroup"
    pub incident_group: String,
    /// Numeric column averaged per incident group. Default: "DelayMinutes"
    pub average: String,
}

impl Default for ViewColumns {
    fn default() -> Self {
        Self {
            year: "CalYear".to_string(),
            incident_group: "IncidentGroup".to_string(),
            average: "DelayMinutes".to_string(),
        }
    }
}

/// Optional criteria on year and incident group. Unset criteria match all rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFilter {
    pub year: Option<i64>,
    pub incident_group: Option<String>,
}

impl RowFilter {
    pub fn is_unrestricted(&self) -> bool {
        self.year.is_none() && self.incident_group.is_none()
    }
}

impl fmt::Display for RowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(year) = self.year {
            parts.push(format!("year = {}", year));
        }
        if let Some(group) = &self.incident_group {
            parts.push(format!("incident group = '{}'", group));
        }
        if parts.is_empty() {
            write!(f, "no criteria")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Result of filtering: either some rows, or an explicit empty outcome.
#[derive(Debug, Clone)]
pub enum FilterOutcome {
    Rows(DataFrame),
    /// No row matched; `criteria` describes the filter for display.
    Empty { criteria: String },
}

impl FilterOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty { .. })
    }

    /// The matching rows, if any.
    pub fn rows(&self) -> Option<&DataFrame> {
        match self {
            Self::Rows(df) => Some(df),
            Self::Empty { .. } => None,
        }
    }
}

/// Select the rows matching `filter`.
///
/// Years are compared numerically so `2015` and `2015.0` both match. A
/// criterion on a column the frame does not have is a schema mismatch.
pub fn apply_filter(
    df: &DataFrame,
    filter: &RowFilter,
    columns: &ViewColumns,
) -> Result<FilterOutcome> {
    let mut mask = vec![true; df.height()];

    if let Some(year) = filter.year {
        require_column(df, &columns.year, "year filter")?;
        for (keep, value) in mask.iter_mut().zip(text_values(df, &columns.year)?) {
            *keep &= value.as_deref().and_then(parse_year) == Some(year);
        }
    }

    if let Some(group) = &filter.incident_group {
        require_column(df, &columns.incident_group, "incident group filter")?;
        for (keep, value) in mask
            .iter_mut()
            .zip(text_values(df, &columns.incident_group)?)
        {
            *keep &= value.as_deref().map(str::trim) == Some(group.trim());
        }
    }

    let filtered = df.filter(&BooleanChunked::from_slice("mask".into(), &mask))?;
    debug!("Filter ({}) kept {} of {} rows", filter, filtered.height(), df.height());

    if filtered.height() == 0 {
        Ok(FilterOutcome::Empty {
            criteria: filter.to_string(),
        })
    } else {
        Ok(FilterOutcome::Rows(filtered))
    }
}

/// Sorted distinct defined values of a column, for selection lists.
pub fn distinct_values(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    require_column(df, column, "distinct values")?;
    let values: BTreeSet<String> = text_values(df, column)?.into_iter().flatten().collect();
    Ok(values.into_iter().collect())
}

/// Frequency table of a column's defined values.
///
/// Ordered by descending count, ties by value.
pub fn value_counts(df: &DataFrame, column: &str) -> Result<Vec<(String, usize)>> {
    require_column(df, column, "value counts")?;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in text_values(df, column)?.into_iter().flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(counts)
}

/// Mean of a numeric text column per group, ordered by group.
///
/// Undefined groups and unparseable values are ignored; groups with no
/// parseable value are left out.
pub fn mean_by(df: &DataFrame, group: &str, value: &str) -> Result<Vec<(String, f64)>> {
    require_column(df, group, "mean by group")?;
    require_column(df, value, "mean by group")?;

    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for (g, v) in text_values(df, group)?
        .into_iter()
        .zip(text_values(df, value)?)
    {
        let (Some(g), Some(v)) = (g, v.as_deref().and_then(parse_numeric_string)) else {
            continue;
        };
        let entry = sums.entry(g).or_insert((0.0, 0));
        entry.0 += v;
        entry.1 += 1;
    }

    Ok(sums
        .into_iter()
        .map(|(g, (sum, n))| (g, sum / n as f64))
        .collect())
}

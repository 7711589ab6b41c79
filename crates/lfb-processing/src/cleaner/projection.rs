//! Deduplication by key and column projection.

use crate::config::{LEFT_SUFFIX, RIGHT_SUFFIX};
use crate::error::Result;
use crate::utils::{column_names, has_column, require_column};
use polars::prelude::*;
use tracing::debug;

/// Keep the first row for each key value, in input order.
///
/// Undefined keys count as one value. Returns the frame and the number of
/// rows removed.
pub fn deduplicate_by_key(df: DataFrame, key: &str) -> Result<(DataFrame, usize)> {
    require_column(&df, key, "deduplicating by key")?;

    let before = df.height();
    // Stable so the kept row is the first in input order
    let df = df.unique_stable(Some(&[key.to_string()]), UniqueKeepStrategy::First, None)?;
    let removed = before - df.height();

    if removed > 0 {
        debug!("Removed {} rows with a repeated '{}'", removed, key);
    }

    Ok((df, removed))
}

/// Remove the named columns that are present.
///
/// Absent names are skipped, not errors. Returns the frame, the dropped
/// names and the skipped names.
pub fn drop_columns(
    df: DataFrame,
    names: &[String],
) -> (DataFrame, Vec<String>, Vec<String>) {
    let (present, absent): (Vec<String>, Vec<String>) = names
        .iter()
        .cloned()
        .partition(|name| has_column(&df, name));

    for name in &absent {
        debug!("Column '{}' not present, skipping drop", name);
    }

    if present.is_empty() {
        return (df, present, absent);
    }

    let cols: Vec<PlSmallStr> = present.iter().map(|s| s.as_str().into()).collect();
    (df.drop_many(cols), present, absent)
}

/// Rename `<name>_x` to `<name>` when neither `<name>` nor `<name>_y` exists
/// and `<name>` is not in `excluded`.
///
/// After the default drop list removes the mobilisation copies of
/// `CalYear` and `HourOfCall`, this restores their plain names. Passing the
/// drop list as `excluded` keeps a dropped name from reappearing.
pub fn restore_left_names(
    mut df: DataFrame,
    excluded: &[String],
) -> Result<(DataFrame, Vec<(String, String)>)> {
    let mut renamed = Vec::new();

    for name in column_names(&df) {
        let Some(base) = name.strip_suffix(LEFT_SUFFIX) else {
            continue;
        };
        if base.is_empty()
            || excluded.iter().any(|name| name == base)
            || has_column(&df, base)
            || has_column(&df, &format!("{}{}", base, RIGHT_SUFFIX))
        {
            continue;
        }

        df.rename(&name, base.into())?;
        debug!("Renamed '{}' to '{}'", name, base);
        renamed.push((name.clone(), base.to_string()));
    }

    Ok((df, renamed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::text_values;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_deduplicate_keeps_first() {
        let df = df!(
            "IncidentNumber" => ["3003", "3003", "4004"],
            "ResourceId" => ["A", "B", "C"]
        )
        .unwrap();

        let (df, removed) = deduplicate_by_key(df, "IncidentNumber").unwrap();

        assert_eq!(removed, 1);
        assert_eq!(
            text_values(&df, "ResourceId").unwrap(),
            vec![Some("A".to_string()), Some("C".to_string())]
        );
    }

    #[test]
    fn test_deduplicate_treats_undefined_keys_as_one() {
        let df = df!(
            "IncidentNumber" => [None, Some("1"), None],
            "ResourceId" => ["A", "B", "C"]
        )
        .unwrap();

        let (df, removed) = deduplicate_by_key(df, "IncidentNumber").unwrap();

        assert_eq!(removed, 1);
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_deduplicated_keys_are_distinct() {
        let df = df!("IncidentNumber" => ["1", "2", "1", "3", "2", "1"]).unwrap();

        let (df, _) = deduplicate_by_key(df, "IncidentNumber").unwrap();

        let unique: HashSet<Option<String>> =
            text_values(&df, "IncidentNumber").unwrap().into_iter().collect();
        assert_eq!(unique.len(), df.height());
    }

    #[test]
    fn test_drop_columns_skips_absent() {
        let df = df!(
            "IncidentNumber" => ["1"],
            "FRS" => ["London"],
            "USRN" => ["5"]
        )
        .unwrap();

        let (df, dropped, skipped) =
            drop_columns(df, &names(&["FRS", "PlusCode_Code", "CalYear_y"]));

        assert_eq!(column_names(&df), vec!["IncidentNumber", "USRN"]);
        assert_eq!(dropped, names(&["FRS"]));
        assert_eq!(skipped, names(&["PlusCode_Code", "CalYear_y"]));
    }

    #[test]
    fn test_drop_columns_with_nothing_present() {
        let df = df!("IncidentNumber" => ["1"]).unwrap();

        let (df, dropped, skipped) = drop_columns(df, &names(&["FRS"]));

        assert_eq!(df.width(), 1);
        assert!(dropped.is_empty());
        assert_eq!(skipped, names(&["FRS"]));
    }

    #[test]
    fn test_restore_left_names() {
        let df = df!(
            "IncidentNumber" => ["1"],
            "CalYear_x" => ["2015"],
            "HourOfCall_x" => ["3"],
            "HourOfCall_y" => ["3"],
            "Stop_x" => ["a"],
            "Stop" => ["b"]
        )
        .unwrap();

        let (df, renamed) = restore_left_names(df, &[]).unwrap();

        assert_eq!(
            column_names(&df),
            vec!["IncidentNumber", "CalYear", "HourOfCall_x", "HourOfCall_y", "Stop_x", "Stop"]
        );
        assert_eq!(renamed, vec![("CalYear_x".to_string(), "CalYear".to_string())]);
    }

    #[test]
    fn test_restore_left_names_skips_excluded() {
        let df = df!(
            "IncidentNumber" => ["1"],
            "CalYear_x" => ["2015"],
            "HourOfCall_x" => ["3"]
        )
        .unwrap();

        let (df, renamed) = restore_left_names(df, &names(&["CalYear", "CalYear_y"])).unwrap();

        assert_eq!(column_names(&df), vec!["IncidentNumber", "CalYear_x", "HourOfCall"]);
        assert_eq!(
            renamed,
            vec![("HourOfCall_x".to_string(), "HourOfCall".to_string())]
        );
    }
}

//! Full outer merge of incident and mobilisation row-sets.

use crate::config::{LEFT_SUFFIX, RIGHT_SUFFIX};
use crate::error::{Result, ResultExt};
use crate::utils::{column_names, has_column, require_column};
use polars::prelude::*;
use tracing::{debug, info};

const LEFT_ROW: &str = "__left_row";
const RIGHT_ROW: &str = "__right_row";

/// Full outer join of two row-sets on `key`.
///
/// - Matching keys combine into one row per pair (Cartesian product when
///   either side repeats a key).
/// - Unmatched rows appear with the other side undefined.
/// - Undefined keys never match.
/// - The key is coalesced into a single column.
/// - Other columns present on both sides are suffixed `_x` (left) and `_y`
///   (right).
///
/// Rows come out in left order, each left row's matches in right order,
/// followed by right-only rows in right order.
pub fn outer_merge(left: DataFrame, right: DataFrame, key: &str) -> Result<DataFrame> {
    require_column(&left, key, "merge, incident side")?;
    require_column(&right, key, "merge, mobilisation side")?;

    let (mut left, mut right) = (left, right);
    let collisions = suffix_collisions(&mut left, &mut right, key)?;
    if !collisions.is_empty() {
        debug!("Suffixed {} colliding columns: {:?}", collisions.len(), collisions);
    }

    let left = left.with_row_index(LEFT_ROW.into(), None)?;
    let right = right.with_row_index(RIGHT_ROW.into(), None)?;

    let merged = left
        .lazy()
        .join(
            right.lazy(),
            [col(key)],
            [col(key)],
            JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
        )
        .sort(
            [LEFT_ROW, RIGHT_ROW],
            SortMultipleOptions::default()
                .with_nulls_last(true)
                .with_maintain_order(true),
        )
        .collect()
        .context("Merging incident and mobilisation data")?;

    let merged = merged.drop_many([PlSmallStr::from(LEFT_ROW), PlSmallStr::from(RIGHT_ROW)]);

    info!("Merged records: {:?}", merged.shape());
    Ok(merged)
}

/// Rename non-key columns present on both sides. Returns the base names.
fn suffix_collisions(
    left: &mut DataFrame,
    right: &mut DataFrame,
    key: &str,
) -> Result<Vec<String>> {
    let collisions: Vec<String> = column_names(left)
        .into_iter()
        .filter(|name| name != key && has_column(right, name))
        .collect();

    for name in &collisions {
        left.rename(name, format!("{}{}", name, LEFT_SUFFIX).into())?;
        right.rename(name, format!("{}{}", name, RIGHT_SUFFIX).into())?;
    }

    Ok(collisions)
}

//! Workbook sources.
//!
//! The first worksheet is read; its first row is the header. Every cell is
//! rendered as text so spreadsheet sources union cleanly with delimited ones,
//! and text cells equal to a null marker are undefined as in delimited files.

use crate::error::{PipelineError, Result};
use calamine::DataType as _;
use calamine::{Data, Range, Reader, open_workbook_auto};
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

/// Read the first worksheet of a workbook (xlsx, xlsm, xls, xlsb, ods).
pub fn read_spreadsheet(path: &Path, null_markers: &[String]) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet_names = workbook.sheet_names().to_vec();
    let Some(sheet_name) = sheet_names.first() else {
        return Err(PipelineError::source_unavailable(path, "workbook has no sheets"));
    };

    debug!(
        "Reading sheet '{}' (first of {}) from {}",
        sheet_name,
        sheet_names.len(),
        path.display()
    );

    let range = workbook.worksheet_range(sheet_name)?;
    range_to_dataframe(&range, null_markers)
        .map_err(|e| PipelineError::source_unavailable(path, e))
}

/// Convert a cell range into a text-typed DataFrame.
///
/// Blank header cells are named `column_<n>`; repeated names get a `.<n>`
/// suffix so the frame never carries two columns with the same name. Body
/// cells whose text equals one of `null_markers` are undefined.
pub fn range_to_dataframe(range: &Range<Data>, null_markers: &[String]) -> Result<DataFrame> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Err(PipelineError::InvalidConfig(
            "worksheet is empty (no header row)".to_string(),
        ));
    };

    let names = header_names(header);
    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];

    for row in rows {
        for (idx, column) in values.iter_mut().enumerate() {
            let value = row
                .get(idx)
                .and_then(cell_to_text)
                .filter(|text| !null_markers.contains(text));
            column.push(value);
        }
    }

    let columns: Vec<Column> = names
        .iter()
        .zip(values)
        .map(|(name, column)| Series::new(name.as_str().into(), column).into())
        .collect();

    Ok(DataFrame::new(columns)?)
}

/// Render one cell as text. Empty and error cells are undefined.
pub fn cell_to_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", *f as i64)),
        Data::DateTime(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        other => Some(other.to_string()),
    }
}

fn header_names(header: &[Data]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(header.len());
    for (idx, cell) in header.iter().enumerate() {
        let base = cell_to_text(cell)
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| format!("column_{}", idx));

        let mut name = base.clone();
        let mut n = 1;
        while names.contains(&name) {
            name = format!("{}.{}", base, n);
            n += 1;
        }
        names.push(name);
    }
    names
}

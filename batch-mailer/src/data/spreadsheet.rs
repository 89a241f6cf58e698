//! Excel recipient loading using `calamine`.
//!
//! The first worksheet is read; its first row is the header.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::warn;

use super::types::{FieldValue, RecipientSet};
use crate::error::ConfigError;

/// Read the first worksheet of an `.xlsx` or `.xls` workbook.
pub fn read_spreadsheet(path: &Path) -> Result<RecipientSet, ConfigError> {
    let wrap = |source| ConfigError::Spreadsheet {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(wrap)?;
    let Some(range) = workbook.worksheet_range_at(0) else {
        warn!(path = %path.display(), "spreadsheet_has_no_sheets");
        return Ok(RecipientSet::from_values(Vec::new(), Vec::new()));
    };
    let range = range.map_err(wrap)?;

    let mut rows = range.rows();
    let columns = rows
        .next()
        .map(|header| header.iter().map(|cell| cell_value(cell).to_string()).collect())
        .unwrap_or_default();

    let values: Vec<Vec<FieldValue>> = rows
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    Ok(RecipientSet::from_values(columns, values))
}

/// Map a worksheet cell to a field value.
///
/// Whole-number floats are written without a fractional part, so a phone
/// number or id stored as `5551234.0` renders as `5551234`.
fn cell_value(cell: &Data) -> FieldValue {
    match cell {
        Data::Empty => FieldValue::Missing,
        Data::Int(i) => FieldValue::Number(i.to_string()),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
            FieldValue::Number(format!("{}", *f as i64))
        }
        Data::Float(f) => FieldValue::Number(f.to_string()),
        Data::String(s) if s.trim().is_empty() => FieldValue::Missing,
        Data::String(s) => FieldValue::Text(s.clone()),
        other => FieldValue::Text(other.to_string()),
    }
}

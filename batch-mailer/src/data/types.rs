//! Recipient rows and the row set they belong to.

use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;

/// A single cell value.
///
/// Only `Text` counts as a string-typed field; numeric and empty cells can be
/// rendered into templates but never validate as an address.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    /// Numeric cell, keeping its original spelling.
    Number(String),
    Missing,
}

impl FieldValue {
    /// Classify a raw cell. Only finite numbers count as numeric.
    pub fn from_cell(raw: &str) -> Self {
        if raw.trim().is_empty() {
            FieldValue::Missing
        } else if raw.trim().parse::<f64>().is_ok_and(f64::is_finite) {
            FieldValue::Number(raw.to_string())
        } else {
            FieldValue::Text(raw.to_string())
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) | FieldValue::Number(s) => f.write_str(s),
            FieldValue::Missing => Ok(()),
        }
    }
}

/// One input row: its original position plus its values in column order.
#[derive(Debug, Clone)]
pub struct RecipientRow {
    index: usize,
    columns: Arc<[String]>,
    values: Vec<FieldValue>,
}

impl RecipientRow {
    /// Create a row. Short rows are padded with `Missing`, extra values dropped.
    pub fn new(index: usize, columns: Arc<[String]>, mut values: Vec<FieldValue>) -> Self {
        values.resize(columns.len(), FieldValue::Missing);
        Self {
            index,
            columns,
            values,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Column names of the row set this row belongs to.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// Value of the first column with the given name.
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// The ordered recipient set loaded from a data file.
#[derive(Debug, Clone)]
pub struct RecipientSet {
    columns: Arc<[String]>,
    rows: Vec<RecipientRow>,
}

impl RecipientSet {
    /// Build a set from a header and raw records, assigning indices in order.
    pub fn from_records<I, R, S>(columns: Vec<String>, records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_values(
            columns,
            records.into_iter().map(|record| {
                record
                    .into_iter()
                    .map(|cell| FieldValue::from_cell(cell.as_ref()))
                    .collect()
            }),
        )
    }

    /// Build a set from already typed rows.
    pub fn from_values<I>(columns: Vec<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<FieldValue>>,
    {
        let columns: Arc<[String]> = columns.into();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(index, values)| RecipientRow::new(index, Arc::clone(&columns), values))
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[RecipientRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<RecipientRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fail unless the schema contains `column`.
    pub fn require_column(&self, column: &str) -> Result<(), ConfigError> {
        if self.columns.iter().any(|c| c == column) {
            Ok(())
        } else {
            Err(ConfigError::MissingColumn(column.to_string()))
        }
    }

    /// Keep only the first `limit` rows. Indices are left untouched.
    pub fn head(mut self, limit: usize) -> Self {
        self.rows.truncate(limit);
        self
    }
}

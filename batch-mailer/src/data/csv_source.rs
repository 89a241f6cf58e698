//! Recipient loading. CSV is read with the `csv` crate.

use std::io::Read;
use std::path::Path;

use tracing::info;

use super::spreadsheet::read_spreadsheet;
use super::types::RecipientSet;
use crate::error::ConfigError;

/// Load recipients from a data file, dispatching on its extension.
///
/// `.csv`, `.xlsx` and `.xls` are supported. Anything else is rejected up
/// front so the run aborts before any message is sent.
pub fn load_recipients(path: &Path) -> Result<RecipientSet, ConfigError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let set = match extension.as_deref() {
        Some("csv") => {
            let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            read_recipients(file).map_err(|source| ConfigError::Csv {
                path: path.to_path_buf(),
                source,
            })?
        }
        Some("xlsx" | "xls") => read_spreadsheet(path)?,
        _ => {
            return Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };

    info!(
        path = %path.display(),
        columns = set.columns().len(),
        rows = set.len(),
        "recipients_loaded"
    );

    Ok(set)
}

/// Read a headered CSV document into a recipient set.
///
/// Records may be shorter or longer than the header; missing cells become
/// `Missing` and surplus cells are ignored.
pub fn read_recipients<R: Read>(reader: R) -> Result<RecipientSet, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = rdr.headers()?.iter().map(String::from).collect();

    let mut records = Vec::new();
    for record in rdr.records() {
        let record = record?;
        records.push(record.iter().map(String::from).collect::<Vec<_>>());
    }

    Ok(RecipientSet::from_records(columns, records))
}

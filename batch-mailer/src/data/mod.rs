//! Recipient data module.
//!
//! Loads tabular recipient data and exposes it as indexed rows of named
//! fields. A row's index is its position in the input file and never changes.

pub mod csv_source;
pub mod spreadsheet;
pub mod types;

pub use csv_source::{load_recipients, read_recipients};
pub use spreadsheet::read_spreadsheet;
pub use types::{FieldValue, RecipientRow, RecipientSet};

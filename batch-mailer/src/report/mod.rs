//! Result aggregation and reporting.
//!
//! Outcomes are written into a table addressed by row index, then split into
//! all results and failures only, and persisted as two CSV files.

pub mod table;
pub mod writer;

pub use table::{RecordError, ResultRecord, ResultsTable, RunResults};
pub use writer::{ResultPaths, ResultWriter, RESULT_COLUMNS};

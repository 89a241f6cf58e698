//! Results table keyed by original row index.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::data::RecipientRow;
use crate::dispatch::DispatchOutcome;

/// Why an outcome could not be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("No row with index {0}")]
    UnknownIndex(usize),
    #[error("Row {0} already has an outcome")]
    AlreadyRecorded(usize),
}

/// One row of the results table.
#[derive(Debug, Clone)]
pub struct ResultRecord {
    pub row: RecipientRow,
    pub success: bool,
    /// When the outcome arrived; `None` until then.
    pub timestamp: Option<DateTime<Utc>>,
    pub message: String,
    pub subject: String,
}

impl ResultRecord {
    pub fn index(&self) -> usize {
        self.row.index()
    }

    pub fn is_recorded(&self) -> bool {
        self.timestamp.is_some()
    }
}

/// Per-row outcome state for a run.
///
/// Every row has an entry from the start, marked unsuccessful. Each entry
/// takes exactly one outcome.
#[derive(Debug, Clone)]
pub struct ResultsTable {
    columns: Arc<[String]>,
    records: BTreeMap<usize, ResultRecord>,
}

impl ResultsTable {
    pub fn new(columns: &[String], rows: &[RecipientRow], subject: &str) -> Self {
        let records = rows
            .iter()
            .map(|row| {
                (
                    row.index(),
                    ResultRecord {
                        row: row.clone(),
                        success: false,
                        timestamp: None,
                        message: String::new(),
                        subject: subject.to_string(),
                    },
                )
            })
            .collect();

        Self {
            columns: columns.into(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ResultRecord> {
        self.records.get(&index)
    }

    /// Record an outcome, stamped with the current time.
    pub fn record(&mut self, outcome: DispatchOutcome) -> Result<(), RecordError> {
        self.record_at(outcome, Utc::now())
    }

    pub fn record_at(
        &mut self,
        outcome: DispatchOutcome,
        at: DateTime<Utc>,
    ) -> Result<(), RecordError> {
        let record = self
            .records
            .get_mut(&outcome.index)
            .ok_or(RecordError::UnknownIndex(outcome.index))?;

        if record.is_recorded() {
            return Err(RecordError::AlreadyRecorded(outcome.index));
        }

        record.success = outcome.success;
        record.message = outcome.message;
        record.timestamp = Some(at);
        Ok(())
    }

    /// Split into all rows and failed rows, both in index order.
    pub fn finalize(self) -> RunResults {
        let all: Vec<ResultRecord> = self.records.into_values().collect();
        let failures = all.iter().filter(|r| !r.success).cloned().collect();

        RunResults {
            columns: self.columns,
            all,
            failures,
        }
    }
}

/// The two views of a finished run.
#[derive(Debug, Clone)]
pub struct RunResults {
    pub columns: Arc<[String]>,
    pub all: Vec<ResultRecord>,
    pub failures: Vec<ResultRecord>,
}

impl RunResults {
    pub fn total(&self) -> usize {
        self.all.len()
    }

    pub fn succeeded(&self) -> usize {
        self.all.len() - self.failures.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

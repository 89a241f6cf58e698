//! CSV persistence of the results tables.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use super::table::{ResultRecord, RunResults};
use crate::error::ReportError;

/// Columns appended after the input columns.
pub const RESULT_COLUMNS: [&str; 4] = ["success", "timestamp", "message", "subject"];

/// Paths written for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPaths {
    pub all: PathBuf,
    pub failures: PathBuf,
}

/// Writes `<stem>_results_<ts>.csv` and `<stem>_failures_<ts>.csv`.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    dir: PathBuf,
    stem: String,
}

impl ResultWriter {
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
        }
    }

    /// Name files after the input data file.
    pub fn for_data_file(dir: impl Into<PathBuf>, data_file: &Path) -> Self {
        let stem = data_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "batch".to_string());
        Self::new(dir, stem)
    }

    pub fn write(&self, results: &RunResults) -> Result<ResultPaths, ReportError> {
        self.write_at(results, Utc::now())
    }

    pub fn write_at(
        &self,
        results: &RunResults,
        at: DateTime<Utc>,
    ) -> Result<ResultPaths, ReportError> {
        let stamp = at.format("%Y%m%d_%H%M%S");
        let paths = ResultPaths {
            all: self.dir.join(format!("{}_results_{stamp}.csv", self.stem)),
            failures: self.dir.join(format!("{}_failures_{stamp}.csv", self.stem)),
        };

        write_table(&paths.all, &results.columns, &results.all)?;
        write_table(&paths.failures, &results.columns, &results.failures)?;

        info!(
            all = %paths.all.display(),
            failures = %paths.failures.display(),
            rows = results.total(),
            failed = results.failed(),
            "results_written"
        );

        Ok(paths)
    }
}

fn write_table(path: &Path, columns: &[String], records: &[ResultRecord]) -> Result<(), ReportError> {
    let err = |source| ReportError {
        path: path.to_path_buf(),
        source,
    };

    let mut wtr = csv::Writer::from_path(path).map_err(err)?;

    let header = columns
        .iter()
        .map(String::as_str)
        .chain(RESULT_COLUMNS.iter().copied());
    wtr.write_record(header).map_err(err)?;

    for record in records {
        let timestamp = record
            .timestamp
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_default();

        let fields = record
            .row
            .values()
            .iter()
            .map(ToString::to_string)
            .chain([
                record.success.to_string(),
                timestamp,
                record.message.clone(),
                record.subject.clone(),
            ]);
        wtr.write_record(fields).map_err(err)?;
    }

    wtr.flush().map_err(|e| err(e.into()))?;
    Ok(())
}

//! BatchMail - concurrent batch email sender for the Gmail API.
//!
//! This library provides the modules behind the `batchmail` binary:
//! - `data`: recipient rows loaded from CSV or Excel
//! - `template`: `{column}` placeholder rendering
//! - `gmail`: MIME building, token loading and the Gmail REST client
//! - `dispatch`: per-row worker and the batch scheduler
//! - `report`: results table and CSV result files
//! - `runner`: validation and the end-to-end run
//!
//! ## Architecture
//!
//! ```text
//! CSV/XLSX → RecipientSet → BatchScheduler ─┬─ worker ─┐
//!                               │           ├─ worker ─┼→ outcomes → ResultsTable → CSV
//!                               │           └─ worker ─┘
//!                               └── pause between batches
//! ```

pub mod config;
pub mod data;
pub mod dispatch;
pub mod error;
pub mod gmail;
pub mod report;
pub mod runner;
pub mod template;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::Config;
pub use data::{load_recipients, FieldValue, RecipientRow, RecipientSet};
pub use dispatch::{BatchScheduler, BatchSettings, DispatchOutcome, RunSummary};
pub use error::{ConfigError, RemoteError, ReportError, RunError};
pub use gmail::{GmailService, MailService, MailSession};
pub use report::{ResultWriter, RunResults};
pub use runner::{execute, prepare, send_batch, PreparedRun, Progress, RunReport, SendOptions};

//! End-to-end batch send.
//!
//! ## Flow
//!
//! ```text
//! prepare():  data file → rows (+limit) → template, attachments → sender
//! execute():  rows → BatchScheduler → outcomes → ResultsTable → CSV files
//! ```
//!
//! Everything that can be wrong with the input is found in `prepare`, before
//! the first message goes out. Once `execute` starts, problems only ever fail
//! individual rows.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::data::{load_recipients, RecipientRow};
use crate::dispatch::{
    BatchScheduler, BatchSettings, DispatchContext, DispatchOutcome, MailDispatcher, RunSummary,
};
use crate::error::{ConfigError, RunError};
use crate::gmail::{Attachment, MailService, Sender};
use crate::report::{ResultPaths, ResultWriter, ResultsTable, RunResults};

pub const DEFAULT_SUBJECT: &str = "A message for you";

/// Sender used in a dry run when no account is available to ask.
const UNAUTHENTICATED_SENDER: &str = "me";

/// What to send and to whom.
#[derive(Debug, Clone)]
pub struct SendOptions {
    pub data_file: PathBuf,
    pub email_column: String,
    pub template_file: Option<PathBuf>,
    pub subject: String,
    pub attachments: Vec<PathBuf>,
    pub reply_to: Option<String>,
    pub send_as: Option<String>,
    pub test_mode: bool,
    pub limit: Option<usize>,
    pub batch: BatchSettings,
}

impl SendOptions {
    pub fn new(data_file: impl Into<PathBuf>, email_column: impl Into<String>) -> Self {
        Self {
            data_file: data_file.into(),
            email_column: email_column.into(),
            template_file: None,
            subject: DEFAULT_SUBJECT.to_string(),
            attachments: Vec::new(),
            reply_to: None,
            send_as: None,
            test_mode: false,
            limit: None,
            batch: BatchSettings::default(),
        }
    }
}

/// A validated run, ready to dispatch.
pub struct PreparedRun {
    data_file: PathBuf,
    columns: Vec<String>,
    rows: Vec<RecipientRow>,
    context: DispatchContext,
    service: Option<Arc<dyn MailService>>,
    batch: BatchSettings,
}

impl PreparedRun {
    pub fn total(&self) -> usize {
        self.rows.len()
    }

    pub fn sender(&self) -> &Sender {
        &self.context.sender
    }

    pub fn test_mode(&self) -> bool {
        self.context.test_mode
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }
}

/// Running totals handed to the progress observer after each outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    pub results: RunResults,
    pub summary: RunSummary,
    /// Written result files, when a writer was given.
    pub paths: Option<ResultPaths>,
}

/// Validate inputs and resolve the sender.
///
/// `service` may be `None` only in test mode.
pub async fn prepare(
    config: &Config,
    options: SendOptions,
    service: Option<Arc<dyn MailService>>,
) -> Result<PreparedRun, RunError> {
    let set = load_recipients(&options.data_file)?;
    set.require_column(&options.email_column)?;

    let set = match options.limit {
        Some(limit) => set.head(limit),
        None => set,
    };

    let template = options
        .template_file
        .as_deref()
        .map(read_template)
        .transpose()?;

    let attachments = options
        .attachments
        .iter()
        .map(|path| Attachment::load(path))
        .collect::<Result<Vec<_>, _>>()?;

    let address = resolve_sender(
        service.as_deref(),
        options.send_as.as_deref(),
        options.test_mode,
    )
    .await?;
    let sender = Sender::new(config.sender_name.clone(), address);

    info!(
        data_file = %options.data_file.display(),
        rows = set.len(),
        sender = %sender,
        attachments = attachments.len(),
        templated = template.is_some(),
        test_mode = options.test_mode,
        "run_prepared"
    );

    let context = DispatchContext {
        email_column: options.email_column,
        template,
        subject: options.subject,
        sender,
        reply_to: options.reply_to,
        attachments: attachments.into(),
        test_mode: options.test_mode,
    };

    Ok(PreparedRun {
        data_file: options.data_file,
        columns: set.columns().to_vec(),
        rows: set.into_rows(),
        context,
        service,
        batch: options.batch,
    })
}

fn read_template(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// The address messages go out from.
async fn resolve_sender(
    service: Option<&dyn MailService>,
    send_as: Option<&str>,
    test_mode: bool,
) -> Result<String, RunError> {
    let Some(service) = service else {
        if !test_mode {
            return Err(ConfigError::MissingCredentials.into());
        }
        if let Some(alias) = send_as {
            warn!(send_as = %alias, "send_as_unverified");
        }
        return Ok(send_as.unwrap_or(UNAUTHENTICATED_SENDER).to_string());
    };

    let primary = service.sender_address().await.map_err(RunError::Auth)?;

    let Some(alias) = send_as else {
        return Ok(primary);
    };

    let aliases = service.send_as_aliases().await.map_err(RunError::Auth)?;
    match aliases.into_iter().find(|a| a.eq_ignore_ascii_case(alias)) {
        Some(found) => {
            info!(primary = %primary, send_as = %found, "send_as_verified");
            Ok(found)
        }
        None => Err(ConfigError::InvalidSendAs(alias.to_string()).into()),
    }
}

/// Dispatch every row and collect the results.
///
/// `progress` is called once per row as outcomes arrive.
pub async fn execute<F>(
    run: PreparedRun,
    writer: Option<&ResultWriter>,
    mut progress: F,
) -> Result<RunReport, RunError>
where
    F: FnMut(&DispatchOutcome, Progress),
{
    let PreparedRun {
        columns,
        rows,
        context,
        service,
        batch,
        ..
    } = run;

    let mut table = ResultsTable::new(&columns, &rows, &context.subject);
    let mut state = Progress {
        done: 0,
        total: rows.len(),
        succeeded: 0,
        failed: 0,
    };

    let scheduler = BatchScheduler::new(MailDispatcher::new(context, service), batch);
    let summary = scheduler
        .run(rows, |outcome| {
            state.done += 1;
            if outcome.success {
                state.succeeded += 1;
            } else {
                state.failed += 1;
            }
            progress(&outcome, state);

            let index = outcome.index;
            if let Err(e) = table.record(outcome) {
                warn!(index = index, error = %e, "outcome_not_recorded");
            }
        })
        .await;

    let results = table.finalize();
    let paths = writer.map(|w| w.write(&results)).transpose()?;

    info!(
        total = results.total(),
        succeeded = results.succeeded(),
        failed = results.failed(),
        "run_completed"
    );

    Ok(RunReport {
        results,
        summary,
        paths,
    })
}

/// Prepare, confirm and execute in one call.
///
/// `confirm` sees the prepared run before anything is sent; returning
/// `false` aborts with [`RunError::Cancelled`].
pub async fn send_batch<C, F>(
    config: &Config,
    options: SendOptions,
    service: Option<Arc<dyn MailService>>,
    confirm: C,
    progress: F,
) -> Result<RunReport, RunError>
where
    C: FnOnce(&PreparedRun) -> bool,
    F: FnMut(&DispatchOutcome, Progress),
{
    let run = prepare(config, options, service).await?;

    if !confirm(&run) {
        info!(rows = run.total(), "run_cancelled");
        return Err(RunError::Cancelled);
    }

    let writer = ResultWriter::for_data_file(&config.results_dir, run.data_file());
    execute(run, Some(&writer), progress).await
}

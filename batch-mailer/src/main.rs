//! BatchMail CLI - send a personalized email to every row of a CSV or Excel file.
//!
//! This binary:
//! 1. Validates the run (data file, column, template, attachments, sender)
//! 2. Asks for confirmation
//! 3. Sends in timed batches through a bounded worker pool, with a progress bar
//! 4. Writes all results and the failures to CSV files
//!
//! Logs go to stderr as JSON, `warn` and above unless `RUST_LOG` says otherwise.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use batchmail::gmail::{parse_base_url, AccessToken};
use batchmail::runner::{self, PreparedRun, Progress, SendOptions, DEFAULT_SUBJECT};
use batchmail::{
    Config, ConfigError, DispatchOutcome, GmailService, MailService, RunError, RunReport,
};

#[derive(Parser)]
#[command(name = "batchmail")]
#[command(version)]
#[command(about = "Send personalized emails to every row of a CSV or Excel file", long_about = None)]
struct Cli {
    /// CSV, XLSX or XLS file with one recipient per row
    data_file: PathBuf,

    /// Column holding the recipient address
    email_column: String,

    /// HTML template with {column} placeholders
    #[arg(long)]
    template: Option<PathBuf>,

    /// Email subject
    #[arg(long, default_value = DEFAULT_SUBJECT)]
    subject: String,

    /// Files attached to every message
    #[arg(long, num_args = 1..)]
    attachments: Vec<PathBuf>,

    /// Reply-To address
    #[arg(long)]
    reply_to: Option<String>,

    /// Send from a configured send-as alias
    #[arg(long)]
    send_as: Option<String>,

    /// Dry run: render and validate, but send nothing
    #[arg(long)]
    test: bool,

    /// Only process the first N rows
    #[arg(long)]
    limit: Option<usize>,

    /// Seconds between batches (overrides SEND_DELAY_SECONDS)
    #[arg(long)]
    delay: Option<f64>,

    /// Concurrent sends per batch (overrides MAX_WORKERS)
    #[arg(long)]
    max_workers: Option<usize>,

    /// Rows per batch (overrides BATCH_SIZE)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Structured JSON logging on stderr, quiet by default so the progress bar stays readable
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .json()
                .flatten_event(true)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(delay) = cli.delay {
        config.send_delay_secs = delay;
    }
    if let Some(max_workers) = cli.max_workers {
        config.max_workers = max_workers;
    }
    if let Some(batch_size) = cli.batch_size {
        config.batch_size = batch_size;
    }

    info!(
        batch_size = config.batch_size,
        max_workers = config.max_workers,
        delay_secs = config.send_delay_secs,
        request_timeout_ms = config.request_timeout_ms,
        results_dir = %config.results_dir.display(),
        "config_loaded"
    );

    run(cli, config).await
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let service = connect(&config, cli.test)?;
    if service.is_some() {
        println!("Authenticating with Gmail API...");
    }

    let options = SendOptions {
        data_file: cli.data_file,
        email_column: cli.email_column,
        template_file: cli.template,
        subject: cli.subject,
        attachments: cli.attachments,
        reply_to: cli.reply_to,
        send_as: cli.send_as,
        test_mode: cli.test,
        limit: cli.limit,
        batch: config.batch_settings(),
    };

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}] {msg}")
            .context("Failed to set progress style")?,
    );

    let confirm = |prepared: &PreparedRun| {
        println!(
            "Preparing to send {} emails from {}",
            style(prepared.total()).bold(),
            style(prepared.sender()).cyan()
        );
        if prepared.test_mode() {
            println!(
                "{}",
                style("TEST MODE: Emails will not actually be sent").yellow().bold()
            );
        }

        let proceed = cli.yes || ask_to_proceed();
        if proceed {
            pb.set_length(prepared.total() as u64);
        }
        proceed
    };

    let on_progress = |outcome: &DispatchOutcome, progress: Progress| {
        if !outcome.success {
            pb.println(format!(
                "{} row {}: {}",
                style("✗").red(),
                outcome.index,
                outcome.message
            ));
        }
        pb.set_position(progress.done as u64);
        pb.set_message(format!("{} sent, {} failed", progress.succeeded, progress.failed));
    };

    let result = runner::send_batch(&config, options, service, confirm, on_progress).await;
    pb.finish_and_clear();

    match result {
        Ok(report) => {
            print_summary(&report, cli.test);
            Ok(())
        }
        Err(RunError::Cancelled) => {
            println!("Operation cancelled");
            Ok(())
        }
        Err(e) => Err(e).context("Batch send failed"),
    }
}

/// Build the mail service, or `None` for a dry run without credentials.
fn connect(config: &Config, test_mode: bool) -> Result<Option<Arc<dyn MailService>>> {
    let base_url = parse_base_url(&config.api_base_url)?;

    match AccessToken::resolve(config.access_token.as_deref(), &config.token_file) {
        Ok(token) => {
            let service: Arc<dyn MailService> =
                Arc::new(GmailService::new(base_url, token, config.request_timeout()));
            Ok(Some(service))
        }
        Err(ConfigError::MissingCredentials) if test_mode => {
            warn!("credentials_missing_dry_run");
            Ok(None)
        }
        Err(e) => Err(e).context("Failed to load Gmail credentials"),
    }
}

/// Interactive yes/no. An unreadable terminal counts as no.
fn ask_to_proceed() -> bool {
    Confirm::new()
        .with_prompt("Do you want to proceed?")
        .default(false)
        .interact()
        .unwrap_or_else(|e| {
            warn!(error = %e, "confirmation_unavailable");
            false
        })
}

fn print_summary(report: &RunReport, test_mode: bool) {
    let results = &report.results;
    let verb = if test_mode { "would be sent" } else { "sent" };

    println!();
    println!(
        "{} {} of {} emails {} successfully",
        style("Completed:").green().bold(),
        results.succeeded(),
        results.total(),
        verb
    );
    if results.failed() > 0 {
        println!("{} {}", style("Failed:").red().bold(), results.failed());
    }

    if let Some(paths) = &report.paths {
        println!("Results written to {}", paths.all.display());
        println!("Failures written to {}", paths.failures.display());
    }
}

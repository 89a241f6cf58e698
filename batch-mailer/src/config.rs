//! Configuration module for environment variable parsing.
//!
//! Everything the CLI does not take as a flag comes from the environment.
//! Flags given on the command line override the batch settings read here.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::dispatch::BatchSettings;
use crate::gmail::DEFAULT_BASE_URL;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the Gmail REST API
    pub api_base_url: String,

    /// Bearer token given directly; wins over the token file
    pub access_token: Option<String>,

    /// JSON file holding an already issued access token
    pub token_file: PathBuf,

    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Display name put in front of the sender address
    pub sender_name: Option<String>,

    /// Where result CSV files are written
    pub results_dir: PathBuf,

    /// Rows per batch
    pub batch_size: usize,

    /// Maximum concurrent sends within a batch
    pub max_workers: usize,

    /// Pause between batches in seconds
    pub send_delay_secs: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            access_token: None,
            token_file: PathBuf::from("token.json"),
            request_timeout_ms: 30_000,
            sender_name: None,
            results_dir: PathBuf::from("."),
            batch_size: 10,
            max_workers: 10,
            send_delay_secs: 6.0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            api_base_url: env::var("GMAIL_API_BASE_URL").unwrap_or(defaults.api_base_url),

            access_token: non_empty("GMAIL_ACCESS_TOKEN"),

            token_file: env::var("GMAIL_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.token_file),

            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", defaults.request_timeout_ms, |v| {
                *v > 0
            }),

            sender_name: non_empty("SENDER_NAME"),

            results_dir: env::var("RESULTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.results_dir),

            batch_size: parse_or("BATCH_SIZE", defaults.batch_size, |v| *v > 0),

            max_workers: parse_or("MAX_WORKERS", defaults.max_workers, |v| *v > 0),

            send_delay_secs: parse_or("SEND_DELAY_SECONDS", defaults.send_delay_secs, |v| {
                v.is_finite() && *v >= 0.0
            }),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn batch_settings(&self) -> BatchSettings {
        BatchSettings {
            batch_size: self.batch_size.max(1),
            max_workers: self.max_workers.max(1),
            delay: delay_from_secs(self.send_delay_secs),
        }
    }
}

/// Seconds to a `Duration`, treating negative or non-finite input as zero.
pub fn delay_from_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a variable, falling back to `default` when unset or rejected.
fn parse_or<T, F>(name: &str, default: T, valid: F) -> T
where
    T: FromStr,
    F: Fn(&T) -> bool,
{
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

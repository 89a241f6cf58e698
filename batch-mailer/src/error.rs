//! Error types for configuration, remote API calls and whole runs.
//!
//! Only configuration errors abort a run. Remote errors are always scoped to a
//! single recipient and end up as the message of a failed outcome.

use std::path::PathBuf;

use thiserror::Error;

/// Problems detected before any message is dispatched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unsupported file format for {}. Please use .csv, .xlsx or .xls", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to read spreadsheet {}: {source}", path.display())]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("Email column '{0}' not found in the data file")]
    MissingColumn(String),

    #[error("Send-as alias '{0}' is not configured for the authenticated account")]
    InvalidSendAs(String),

    #[error("No Gmail access token found. Set GMAIL_ACCESS_TOKEN or provide a token file")]
    MissingCredentials,

    #[error("Invalid token file {}: {reason}", path.display())]
    InvalidToken { path: PathBuf, reason: String },

    #[error("Invalid API base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// A failed call to the mail API, classified by the response status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded, retry later: {0}")]
    RateLimited(String),

    #[error("{0}")]
    Other(String),
}

impl RemoteError {
    /// Classify an HTTP error status.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 => RemoteError::InvalidRequest(message),
            401 | 403 => RemoteError::PermissionDenied(message),
            404 => RemoteError::NotFound(message),
            429 => RemoteError::RateLimited(message),
            _ => RemoteError::Other(format!("HTTP {status}: {message}")),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RemoteError::Other(format!("Request timed out: {e}"))
        } else if let Some(status) = e.status() {
            RemoteError::from_status(status.as_u16(), e.to_string())
        } else {
            RemoteError::Other(e.to_string())
        }
    }
}

/// Failure of a result table write.
#[derive(Debug, Error)]
#[error("Failed to write results to {}: {source}", path.display())]
pub struct ReportError {
    pub path: PathBuf,
    #[source]
    pub source: csv::Error,
}

/// Errors that abort a run as a whole.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Authentication failed: {0}")]
    Auth(#[source] RemoteError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("Operation cancelled")]
    Cancelled,
}

//! Access token loading.
//!
//! Token acquisition and refresh happen outside this crate. We only pick up
//! an already issued bearer token, either from the environment or from a
//! JSON token file written by an OAuth helper.

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::ConfigError;

/// OAuth bearer token for the Gmail API.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    /// Prefer an explicit token, then fall back to the token file.
    pub fn resolve(explicit: Option<&str>, token_file: &Path) -> Result<Self, ConfigError> {
        if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
            info!(source = "env", "access_token_resolved");
            return Ok(Self::new(token));
        }

        if !token_file.exists() {
            return Err(ConfigError::MissingCredentials);
        }

        let token = Self::from_file(token_file)?;
        info!(source = "file", path = %token_file.display(), "access_token_resolved");
        Ok(token)
    }

    /// Read `access_token` (or `token`, as written by google-auth) from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let file: TokenFile =
            serde_json::from_str(&raw).map_err(|e| ConfigError::InvalidToken {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        file.access_token
            .or(file.token)
            .filter(|t| !t.trim().is_empty())
            .map(Self::new)
            .ok_or_else(|| ConfigError::InvalidToken {
                path: path.to_path_buf(),
                reason: "no access_token or token field".to_string(),
            })
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[derive(Debug, Deserialize)]
struct TokenFile {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

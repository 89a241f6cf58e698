//! Session interface between dispatch workers and the mail API.
//!
//! A `MailService` hands out independent sessions. Sessions are not assumed to
//! be shareable, so every worker opens its own on first use and keeps it for
//! the rest of its life.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use url::Url;

use super::auth::AccessToken;
use super::client::GmailClient;
use super::message::OutgoingMessage;
use crate::error::RemoteError;

/// An authenticated, single-owner connection to the mail API.
#[async_trait]
pub trait MailSession: Send {
    /// Submit one message, returning the id assigned by the API.
    async fn submit(&mut self, message: &OutgoingMessage) -> Result<Option<String>, RemoteError>;
}

/// The authenticated account, able to open sessions.
#[async_trait]
pub trait MailService: Send + Sync {
    /// Open a new independent session.
    async fn connect(&self) -> Result<Box<dyn MailSession>, RemoteError>;

    /// Primary address of the authenticated account.
    async fn sender_address(&self) -> Result<String, RemoteError>;

    /// Addresses the account may send as.
    async fn send_as_aliases(&self) -> Result<Vec<String>, RemoteError>;
}

#[async_trait]
impl MailSession for GmailClient {
    async fn submit(&mut self, message: &OutgoingMessage) -> Result<Option<String>, RemoteError> {
        self.send(message).await
    }
}

/// Gmail-backed service. Each session is a separate `GmailClient`.
#[derive(Debug, Clone)]
pub struct GmailService {
    base_url: Url,
    token: AccessToken,
    timeout: Duration,
}

impl GmailService {
    pub fn new(base_url: Url, token: AccessToken, timeout: Duration) -> Self {
        Self {
            base_url,
            token,
            timeout,
        }
    }

    fn client(&self) -> Result<GmailClient, RemoteError> {
        GmailClient::new(self.base_url.clone(), self.token.clone(), self.timeout)
    }
}

#[async_trait]
impl MailService for GmailService {
    async fn connect(&self) -> Result<Box<dyn MailSession>, RemoteError> {
        let client = self.client()?;
        info!(base_url = %self.base_url, "gmail_session_opened");
        Ok(Box::new(client))
    }

    async fn sender_address(&self) -> Result<String, RemoteError> {
        Ok(self.client()?.profile().await?.email_address)
    }

    async fn send_as_aliases(&self) -> Result<Vec<String>, RemoteError> {
        let aliases = self.client()?.send_as_aliases().await?;
        Ok(aliases
            .into_iter()
            .filter(|a| a.is_usable())
            .map(|a| a.send_as_email)
            .collect())
    }
}

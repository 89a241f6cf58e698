//! Gmail API integration.
//!
//! This module provides:
//! - MIME message construction for outgoing mail
//! - A REST client for the profile, send-as and send endpoints
//! - The session traits dispatch workers talk to
//!
//! ## Flow
//!
//! ```text
//! OutgoingMessage → build() → to_raw() → MailSession::submit() → message id | RemoteError
//! ```

pub mod auth;
pub mod client;
pub mod message;
pub mod session;
pub mod types;

pub use auth::AccessToken;
pub use client::{parse_base_url, GmailClient, DEFAULT_BASE_URL};
pub use message::{Attachment, OutgoingMessage, Sender};
pub use session::{GmailService, MailService, MailSession};

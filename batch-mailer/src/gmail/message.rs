//! MIME message construction.
//!
//! Messages are built with `lettre` as `multipart/mixed` with an HTML body
//! part and one part per attachment, then base64url encoded for the `raw`
//! field of the Gmail send call.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart};
use lettre::{Address, Message};

use crate::error::{ConfigError, RemoteError};

/// A file attached verbatim to every outgoing message.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content,
        }
    }

    /// Read an attachment from disk, named after the file's base name.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());

        Ok(Self::new(filename, content))
    }
}

/// Sender identity with an optional display name.
///
/// The address is kept as given; it is only parsed when a message is built,
/// so a dry run can name a placeholder sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub name: Option<String>,
    pub address: String,
}

impl Sender {
    pub fn new(name: Option<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.filter(|n| !n.trim().is_empty()),
            address: address.into(),
        }
    }

    /// The `From` mailbox.
    pub fn mailbox(&self) -> Result<Mailbox, RemoteError> {
        let email: Address = self.address.trim().parse().map_err(|e| {
            RemoteError::InvalidRequest(format!("Invalid sender address {}: {e}", self.address))
        })?;
        Ok(Mailbox::new(self.name.clone(), email))
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => {
                let quoted = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{quoted}\" <{}>", self.address)
            }
            None => f.write_str(&self.address),
        }
    }
}

/// A fully rendered message for one recipient.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub from: Sender,
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub reply_to: Option<String>,
    pub attachments: Arc<[Attachment]>,
}

impl OutgoingMessage {
    /// Assemble the MIME message. Unparseable addresses fail this message only.
    pub fn build(&self) -> Result<Message, RemoteError> {
        let mut builder = Message::builder()
            .from(self.from.mailbox()?)
            .to(parse_mailbox(&self.to, "recipient")?)
            .subject(self.subject.as_str());

        if let Some(reply_to) = &self.reply_to {
            builder = builder.reply_to(parse_mailbox(reply_to, "Reply-To")?);
        }

        let mut body = MultiPart::mixed().singlepart(SinglePart::html(self.html_body.clone()));
        for attachment in self.attachments.iter() {
            body = body.singlepart(
                MimeAttachment::new(attachment.filename.clone())
                    .body(attachment.content.clone(), octet_stream()?),
            );
        }

        builder
            .multipart(body)
            .map_err(|e| RemoteError::InvalidRequest(format!("Failed to build message: {e}")))
    }

    /// The RFC 5322 bytes of the message.
    pub fn to_mime(&self) -> Result<Vec<u8>, RemoteError> {
        Ok(self.build()?.formatted())
    }

    /// Base64url encoding of the MIME message, as the API expects.
    pub fn to_raw(&self) -> Result<String, RemoteError> {
        Ok(URL_SAFE.encode(self.to_mime()?))
    }
}

fn parse_mailbox(raw: &str, role: &str) -> Result<Mailbox, RemoteError> {
    raw.trim()
        .parse()
        .map_err(|e| RemoteError::InvalidRequest(format!("Invalid {role} address {raw}: {e}")))
}

fn octet_stream() -> Result<ContentType, RemoteError> {
    ContentType::parse("application/octet-stream")
        .map_err(|e| RemoteError::Other(format!("Invalid attachment content type: {e}")))
}

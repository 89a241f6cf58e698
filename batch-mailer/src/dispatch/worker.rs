//! The unit of work: render, validate and send one message.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::scheduler::Dispatcher;
use super::types::DispatchOutcome;
use crate::data::RecipientRow;
use crate::error::RemoteError;
use crate::gmail::{Attachment, MailService, MailSession, OutgoingMessage, Sender};
use crate::template::{is_valid_recipient, render};

/// Everything a worker needs besides the row itself.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub email_column: String,
    pub template: Option<String>,
    pub subject: String,
    pub sender: Sender,
    pub reply_to: Option<String>,
    pub attachments: Arc<[Attachment]>,
    pub test_mode: bool,
}

/// Worker-local mail session, opened on the worker's first real send.
#[derive(Default)]
pub struct WorkerSession {
    session: Option<Box<dyn MailSession>>,
}

impl WorkerSession {
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Submit through the cached session, opening it first if needed.
    pub async fn submit(
        &mut self,
        service: &dyn MailService,
        message: &OutgoingMessage,
    ) -> Result<Option<String>, RemoteError> {
        if self.session.is_none() {
            debug!("worker_session_opening");
            self.session = Some(service.connect().await?);
        }

        match self.session.as_mut() {
            Some(session) => session.submit(message).await,
            None => Err(RemoteError::Other("Mail session unavailable".to_string())),
        }
    }
}

/// Dispatch one row.
///
/// Never fails: every problem becomes a failed outcome for this row only.
pub async fn dispatch(
    row: &RecipientRow,
    ctx: &DispatchContext,
    service: Option<&dyn MailService>,
    worker: &mut WorkerSession,
) -> DispatchOutcome {
    let index = row.index();

    let recipient = match row.get(&ctx.email_column) {
        Some(value) if is_valid_recipient(value) => value.to_string(),
        other => {
            let shown = other.map(ToString::to_string).unwrap_or_default();
            warn!(index = index, recipient = %shown, "dispatch_invalid_recipient");
            return DispatchOutcome::failure(index, format!("Invalid email address: {shown}"));
        }
    };

    let body = render(ctx.template.as_deref(), row, &recipient);

    if ctx.test_mode {
        info!(
            index = index,
            to = %recipient,
            body_length = body.len(),
            "dispatch_dry_run"
        );
        return DispatchOutcome::success(index, format!("Would send to: {recipient}"));
    }

    let Some(service) = service else {
        return DispatchOutcome::failure(index, "No mail service configured");
    };

    let message = OutgoingMessage {
        from: ctx.sender.clone(),
        to: recipient.clone(),
        subject: ctx.subject.clone(),
        html_body: body,
        reply_to: ctx.reply_to.clone(),
        attachments: Arc::clone(&ctx.attachments),
    };

    let outcome = classify(index, &recipient, worker.submit(service, &message).await);

    if outcome.success {
        info!(index = index, to = %recipient, "dispatch_sent");
    } else {
        warn!(index = index, to = %recipient, reason = %outcome.message, "dispatch_failed");
    }

    outcome
}

/// Map a submission result to an outcome.
fn classify(
    index: usize,
    recipient: &str,
    result: Result<Option<String>, RemoteError>,
) -> DispatchOutcome {
    match result {
        Ok(Some(_id)) => DispatchOutcome::success(index, recipient),
        Ok(None) => DispatchOutcome::failure(index, "Send returned no confirmation id"),
        Err(e) => DispatchOutcome::failure(index, e.to_string()),
    }
}

/// Dispatcher that sends real (or dry-run) mail.
pub struct MailDispatcher {
    context: DispatchContext,
    service: Option<Arc<dyn MailService>>,
}

impl MailDispatcher {
    pub fn new(context: DispatchContext, service: Option<Arc<dyn MailService>>) -> Self {
        Self { context, service }
    }
}

#[async_trait]
impl Dispatcher for MailDispatcher {
    type Worker = WorkerSession;

    async fn dispatch(&self, worker: &mut WorkerSession, row: &RecipientRow) -> DispatchOutcome {
        dispatch(row, &self.context, self.service.as_deref(), worker).await
    }
}

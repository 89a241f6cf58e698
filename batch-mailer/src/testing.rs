//! In-memory mail service for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::data::{RecipientRow, RecipientSet};
use crate::error::RemoteError;
use crate::gmail::{MailService, MailSession, OutgoingMessage};

/// What the mock answers for a given recipient.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Id(String),
    NoId,
    Error(RemoteError),
    Panic,
}

#[derive(Default)]
struct Shared {
    connects: AtomicUsize,
    submits: AtomicUsize,
    responses: Mutex<HashMap<String, MockResponse>>,
    submitted: Mutex<Vec<OutgoingMessage>>,
    delay: Mutex<Option<Duration>>,
}

/// Counts connections and submissions; answers per recipient.
#[derive(Clone, Default)]
pub struct MockMailService {
    shared: Arc<Shared>,
    sender: String,
    aliases: Vec<String>,
    fail_connect: bool,
}

impl MockMailService {
    pub fn new() -> Self {
        Self {
            sender: "me@example.com".to_string(),
            aliases: vec!["me@example.com".to_string()],
            ..Self::default()
        }
    }

    pub fn respond(self, recipient: &str, response: MockResponse) -> Self {
        self.shared
            .responses
            .lock()
            .unwrap()
            .insert(recipient.to_string(), response);
        self
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.shared.delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn connect_count(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    pub fn submit_count(&self) -> usize {
        self.shared.submits.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<OutgoingMessage> {
        self.shared.submitted.lock().unwrap().clone()
    }
}

struct MockSession {
    shared: Arc<Shared>,
}

#[async_trait]
impl MailSession for MockSession {
    async fn submit(&mut self, message: &OutgoingMessage) -> Result<Option<String>, RemoteError> {
        self.shared.submits.fetch_add(1, Ordering::SeqCst);
        self.shared.submitted.lock().unwrap().push(message.clone());

        let delay = *self.shared.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.shared.responses.lock().unwrap().get(&message.to).cloned();
        match response {
            None => Ok(Some(format!("id-{}", message.to))),
            Some(MockResponse::Id(id)) => Ok(Some(id)),
            Some(MockResponse::NoId) => Ok(None),
            Some(MockResponse::Error(e)) => Err(e),
            Some(MockResponse::Panic) => panic!("mock session exploded"),
        }
    }
}

#[async_trait]
impl MailService for MockMailService {
    async fn connect(&self) -> Result<Box<dyn MailSession>, RemoteError> {
        self.shared.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(RemoteError::PermissionDenied("token revoked".into()));
        }
        Ok(Box::new(MockSession {
            shared: Arc::clone(&self.shared),
        }))
    }

    async fn sender_address(&self) -> Result<String, RemoteError> {
        if self.fail_connect {
            return Err(RemoteError::PermissionDenied("token revoked".into()));
        }
        Ok(self.sender.clone())
    }

    async fn send_as_aliases(&self) -> Result<Vec<String>, RemoteError> {
        Ok(self.aliases.clone())
    }
}

/// Rows with `name` and `email` columns.
pub fn recipients(emails: &[&str]) -> Vec<RecipientRow> {
    RecipientSet::from_records(
        vec!["name".to_string(), "email".to_string()],
        emails
            .iter()
            .enumerate()
            .map(|(i, email)| vec![format!("person{i}"), email.to_string()]),
    )
    .into_rows()
}

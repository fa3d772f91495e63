//! In-memory fake transport for development and test assertions.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::MailError;
use crate::message::Email;
use crate::transport::{Delivery, Transport};

#[derive(Debug, Clone)]
enum FailureMode {
    Never,
    Always(String),
    /// Fail the next `n` sends with the given error, then succeed.
    Times(u32, String),
}

impl Default for FailureMode {
    fn default() -> Self {
        Self::Never
    }
}

#[derive(Default)]
struct Inner {
    sent: Mutex<Vec<Email>>,
    calls: Mutex<usize>,
    failure: Mutex<FailureMode>,
}

/// Transport that records every delivered email instead of sending it.
///
/// Clones share the same mailbox, so a test can hand one clone to a
/// [`Mailer`](crate::Mailer) and keep another for assertions. Failure
/// scripting makes retry and failover paths observable:
///
/// ```
/// use courier::transport::MemoryTransport;
///
/// let flaky = MemoryTransport::named("sendgrid").fail_times(2, "rate limited");
/// let down = MemoryTransport::named("ses").fail_with("connection refused");
/// ```
#[derive(Clone)]
pub struct MemoryTransport {
    name: String,
    message_id: Option<String>,
    inner: Arc<Inner>,
}

impl MemoryTransport {
    /// Create a fake transport named `"memory"`.
    pub fn new() -> Self {
        Self::named("memory")
    }

    /// Create a fake transport with an explicit name, letting it stand in
    /// for any provider in a failover chain.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message_id: None,
            inner: Arc::new(Inner::default()),
        }
    }

    /// Fixed message id returned on every successful send.
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Make every send fail with the given error message.
    pub fn fail_with(self, error: impl Into<String>) -> Self {
        *self.inner.failure.lock() = FailureMode::Always(error.into());
        self
    }

    /// Make the next `count` sends fail, then recover.
    pub fn fail_times(self, count: u32, error: impl Into<String>) -> Self {
        *self.inner.failure.lock() = FailureMode::Times(count, error.into());
        self
    }

    /// Emails successfully delivered so far, in order.
    pub fn sent(&self) -> Vec<Email> {
        self.inner.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.inner.sent.lock().len()
    }

    /// Total send invocations, including failed ones.
    pub fn call_count(&self) -> usize {
        *self.inner.calls.lock()
    }

    /// Drop all recorded emails and reset counters.
    pub fn clear(&self) {
        self.inner.sent.lock().clear();
        *self.inner.calls.lock() = 0;
    }

    fn next_outcome(&self) -> Result<(), String> {
        let mut failure = self.inner.failure.lock();
        match &mut *failure {
            FailureMode::Never => Ok(()),
            FailureMode::Always(error) => Err(error.clone()),
            FailureMode::Times(remaining, error) => {
                if *remaining == 0 {
                    Ok(())
                } else {
                    *remaining -= 1;
                    Err(error.clone())
                }
            }
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, email: &Email) -> Result<Delivery, MailError> {
        *self.inner.calls.lock() += 1;

        if let Err(error) = self.next_outcome() {
            return Err(MailError::Delivery(error));
        }

        self.inner.sent.lock().push(email.clone());

        Ok(Delivery {
            message_id: self.message_id.clone(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> Email {
        Email::builder()
            .to("user@example.com")
            .subject("Hi")
            .text("Body")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn records_sent_emails() {
        let transport = MemoryTransport::new().message_id("mem-1");

        let delivery = transport.send(&email()).await.unwrap();

        assert_eq!(delivery.message_id.as_deref(), Some("mem-1"));
        assert_eq!(transport.sent_count(), 1);
        assert_eq!(transport.sent()[0].subject, "Hi");
    }

    #[tokio::test]
    async fn fail_times_recovers_after_budget() {
        let transport = MemoryTransport::new().fail_times(2, "boom");

        assert!(transport.send(&email()).await.is_err());
        assert!(transport.send(&email()).await.is_err());
        assert!(transport.send(&email()).await.is_ok());

        assert_eq!(transport.call_count(), 3);
        assert_eq!(transport.sent_count(), 1);
    }

    #[tokio::test]
    async fn clones_share_the_mailbox() {
        let transport = MemoryTransport::new();
        let observer = transport.clone();

        transport.send(&email()).await.unwrap();

        assert_eq!(observer.sent_count(), 1);
    }
}

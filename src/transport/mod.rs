//! Transport capability and registry.
//!
//! A [`Transport`] is anything that can attempt delivery of one [`Email`]
//! and report the result. The crate ships adapters for SMTP ([`SmtpTransport`]),
//! SendGrid ([`SendGridTransport`]), and Mailgun ([`MailgunTransport`]), plus
//! an in-memory fake ([`MemoryTransport`]) for tests. The failover layer is
//! written against the trait only, never a concrete adapter.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::MailError;
use crate::message::Email;

#[cfg(feature = "smtp")]
mod smtp;
#[cfg(feature = "smtp")]
pub use smtp::{SmtpConfig, SmtpTransport};

#[cfg(feature = "sendgrid")]
mod sendgrid;
#[cfg(feature = "sendgrid")]
pub use sendgrid::SendGridTransport;

#[cfg(feature = "mailgun")]
mod mailgun;
#[cfg(feature = "mailgun")]
pub use mailgun::MailgunTransport;

mod memory;
pub use memory::MemoryTransport;

/// Result of a successful delivery attempt.
#[derive(Debug, Clone, Default)]
pub struct Delivery {
    /// Message id assigned by the provider, when it reports one.
    pub message_id: Option<String>,
}

impl Delivery {
    /// A successful delivery with no provider message id.
    pub fn new() -> Self {
        Self::default()
    }

    /// A successful delivery carrying the provider's message id.
    pub fn with_message_id(message_id: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
        }
    }
}

/// Async email delivery capability.
///
/// Implement this trait to plug in additional backends. Failures of any kind
/// are reported through `Err`; callers above the transport boundary never see
/// a panic from a well-behaved implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Attempt delivery of one email.
    async fn send(&self, email: &Email) -> Result<Delivery, MailError>;

    /// Logical name of this transport (for logging and failover provenance).
    fn name(&self) -> &str;
}

/// Lookup capability mapping a transport name to a usable [`Transport`].
///
/// An `Err` from [`resolve`](ResolveTransport::resolve) means the name is
/// unknown or misconfigured; the failover layer treats that entry as absent.
pub trait ResolveTransport: Send + Sync {
    fn resolve(&self, name: &str) -> Result<Arc<dyn Transport>, MailError>;
}

impl<F> ResolveTransport for F
where
    F: Fn(&str) -> Result<Arc<dyn Transport>, MailError> + Send + Sync,
{
    fn resolve(&self, name: &str) -> Result<Arc<dyn Transport>, MailError> {
        self(name)
    }
}

/// Named transport registry.
///
/// Holds every backend a [`Mailer`](crate::Mailer) can reach, keyed by the
/// transport's own [`name`](Transport::name).
#[derive(Clone, Default)]
pub struct Transports {
    inner: HashMap<String, Arc<dyn Transport>>,
}

impl Transports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transport under its own name, replacing any previous entry.
    pub fn insert(&mut self, transport: impl Transport + 'static) {
        self.insert_arc(Arc::new(transport));
    }

    /// Register an already-shared transport.
    pub fn insert_arc(&mut self, transport: Arc<dyn Transport>) {
        self.inner.insert(transport.name().to_string(), transport);
    }

    /// Look up a transport by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Transport>> {
        self.inner.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Names of all registered transports, in no particular order.
    pub fn names(&self) -> Vec<&str> {
        self.inner.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl ResolveTransport for Transports {
    fn resolve(&self, name: &str) -> Result<Arc<dyn Transport>, MailError> {
        self.get(name)
            .ok_or_else(|| MailError::UnknownTransport(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_by_name() {
        let mut transports = Transports::new();
        transports.insert(MemoryTransport::named("primary"));

        assert!(transports.contains("primary"));
        assert_eq!(transports.resolve("primary").unwrap().name(), "primary");
        assert!(matches!(
            transports.resolve("missing"),
            Err(MailError::UnknownTransport(name)) if name == "missing"
        ));
    }

    #[test]
    fn closures_resolve_transports() {
        let resolver = |name: &str| -> Result<Arc<dyn Transport>, MailError> {
            match name {
                "memory" => Ok(Arc::new(MemoryTransport::new())),
                other => Err(MailError::UnknownTransport(other.to_string())),
            }
        };

        assert!(resolver.resolve("memory").is_ok());
        assert!(resolver.resolve("smtp").is_err());
    }
}

//! # Courier
//!
//! Unified email delivery with pluggable transports and provider failover.
//!
//! One [`Transport`] capability covers every backend — SMTP, HTTP provider
//! APIs, or an in-memory fake for tests. A [`Mailer`] wires a set of named
//! transports to a [`FailoverPolicy`]: the default transport is tried first
//! (with bounded retries), then the configured fallback chain, and the
//! resulting [`SendReport`] records every attempt and which transport
//! ultimately delivered.
//!
//! # Quick Start
//!
//! ```ignore
//! use courier::{Email, FailoverPolicy, Mailer};
//! use courier::transport::{SendGridTransport, SmtpTransport};
//!
//! let mailer = Mailer::builder()
//!     .transport(SendGridTransport::from_env()?)
//!     .transport(SmtpTransport::from_env()?)
//!     .policy(FailoverPolicy::new().chain(["smtp"]))
//!     .build()?;
//!
//! let email = Email::builder()
//!     .to("user@example.com")
//!     .subject("Welcome!")
//!     .text("Thanks for signing up.")
//!     .build()?;
//!
//! let delivery = mailer.send(&email).await?;
//! ```
//!
//! Or configure everything from the environment:
//!
//! ```ignore
//! // MAIL_PROVIDER=sendgrid MAIL_FALLBACK=smtp SENDGRID_API_KEY=... SMTP_HOST=...
//! let mailer = Mailer::from_env()?;
//! ```
//!
//! # Feature Flags
//!
//! - `smtp` (default) — SMTP transport via lettre
//! - `sendgrid` — SendGrid API transport
//! - `mailgun` — Mailgun API transport
//! - `templates` — tera template rendering ([`Mailer::send_template`])
//! - `markdown` — markdown email bodies ([`EmailBuilder::markdown`])
//! - `queue` — background delivery queue ([`queue`])

mod error;
pub mod failover;
mod mailer;
mod message;
pub mod transport;

#[cfg(feature = "markdown")]
pub mod markdown;

#[cfg(feature = "queue")]
pub mod queue;

#[cfg(feature = "templates")]
pub mod template;

pub use error::MailError;
pub use failover::{
    send_with_failover, AttemptRecord, FailoverEvent, FailoverPolicy, SendReport,
};
pub use mailer::{Mailer, MailerBuilder, MailerConfig};
pub use message::{Email, EmailBody, EmailBuilder};
pub use transport::{Delivery, ResolveTransport, Transport, Transports};

#[cfg(feature = "templates")]
pub use template::TemplateEngine;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::failover::{AttemptRecord, FailoverEvent, FailoverPolicy, SendReport};
    pub use crate::transport::{Delivery, MemoryTransport, Transport, Transports};
    pub use crate::{Email, EmailBody, EmailBuilder, MailError, Mailer};

    #[cfg(feature = "smtp")]
    pub use crate::transport::SmtpTransport;

    #[cfg(feature = "templates")]
    pub use crate::TemplateEngine;
}

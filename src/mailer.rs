//! Mailer facade: one place to register transports, set a failover policy,
//! and send.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::Instrument;

use crate::error::MailError;
use crate::failover::{send_with_failover, FailoverPolicy, SendReport};
use crate::message::Email;
#[cfg(feature = "templates")]
use crate::template::{Context, TemplateEngine};
use crate::transport::{Delivery, Transport, Transports};

/// Environment configuration for [`Mailer::from_env`].
#[derive(Debug, Clone, Deserialize)]
pub struct MailerConfig {
    /// Name of the default transport (default: "smtp").
    #[serde(rename = "mail_provider", default = "default_provider")]
    pub provider: String,

    /// Comma-separated fallback transport names, tried in order.
    #[serde(rename = "mail_fallback", default)]
    pub fallback: Option<String>,

    /// Attempts allotted to each transport (default: 1, no retry).
    #[serde(rename = "mail_max_retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause between retries of the same transport, in milliseconds.
    #[serde(rename = "mail_retry_delay_ms", default)]
    pub retry_delay_ms: u64,

    /// Pause before each fallback transport, in milliseconds.
    #[serde(rename = "mail_failover_delay_ms", default)]
    pub failover_delay_ms: u64,
}

fn default_provider() -> String {
    "smtp".to_string()
}

fn default_max_retries() -> u32 {
    1
}

impl MailerConfig {
    fn policy(&self) -> FailoverPolicy {
        let chain: Vec<String> = self
            .fallback
            .as_deref()
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        FailoverPolicy::new()
            .chain(chain)
            .max_retries_per_provider(self.max_retries)
            .retry_delay(Duration::from_millis(self.retry_delay_ms))
            .failover_delay(Duration::from_millis(self.failover_delay_ms))
    }
}

/// Unified email sender.
///
/// Owns a transport registry, a default transport, and a [`FailoverPolicy`].
/// Every send goes through the failover layer; with an empty chain that
/// degenerates to a plain single-transport send.
pub struct Mailer {
    transports: Transports,
    default_transport: String,
    policy: FailoverPolicy,
    #[cfg(feature = "templates")]
    templates: Option<TemplateEngine>,
}

impl Mailer {
    /// Create a mailer builder.
    pub fn builder() -> MailerBuilder {
        MailerBuilder::default()
    }

    /// Create a mailer from environment variables.
    ///
    /// Registers every transport the environment fully configures (SMTP when
    /// `SMTP_HOST` is set, SendGrid when `SENDGRID_API_KEY` is set, Mailgun
    /// when `MAILGUN_API_KEY` is set), selects the default via
    /// `MAIL_PROVIDER`, and reads the failover knobs `MAIL_FALLBACK`,
    /// `MAIL_MAX_RETRIES`, `MAIL_RETRY_DELAY_MS`, `MAIL_FAILOVER_DELAY_MS`.
    pub fn from_env() -> Result<Self, MailError> {
        dotenvy::dotenv().ok();

        let config: MailerConfig =
            serde_env::from_env().map_err(|e| MailError::MissingConfig(e.to_string()))?;

        Self::from_config(config)
    }

    /// Create a mailer from explicit configuration, probing the environment
    /// for each enabled transport's settings.
    pub fn from_config(config: MailerConfig) -> Result<Self, MailError> {
        let mut builder = Mailer::builder();

        #[cfg(feature = "smtp")]
        if std::env::var("SMTP_HOST").is_ok() {
            builder = builder.transport(crate::transport::SmtpTransport::from_env()?);
        }

        #[cfg(feature = "sendgrid")]
        if std::env::var("SENDGRID_API_KEY").is_ok() {
            builder = builder.transport(crate::transport::SendGridTransport::from_env()?);
        }

        #[cfg(feature = "mailgun")]
        if std::env::var("MAILGUN_API_KEY").is_ok() {
            builder = builder.transport(crate::transport::MailgunTransport::from_env()?);
        }

        builder
            .default_transport(&config.provider)
            .policy(config.policy())
            .build()
    }

    /// The registered transports.
    pub fn transports(&self) -> &Transports {
        &self.transports
    }

    /// The active failover policy.
    pub fn policy(&self) -> &FailoverPolicy {
        &self.policy
    }

    /// Send an email, applying the configured failover policy.
    pub async fn send(&self, email: &Email) -> Result<Delivery, MailError> {
        self.send_report(email).await.into_result()
    }

    /// Send an email and return the full [`SendReport`], including the
    /// attempt trail and which transport ultimately delivered.
    pub async fn send_report(&self, email: &Email) -> SendReport {
        let Some(primary) = self.transports.get(&self.default_transport) else {
            // Unreachable through the builder, which validates the default.
            tracing::error!(transport = %self.default_transport, "default transport not registered");
            return SendReport {
                success: false,
                message_id: None,
                error: Some(format!("unknown transport: {}", self.default_transport)),
                provider: self.default_transport.clone(),
                failover_used: false,
                attempts: Vec::new(),
            };
        };

        let span = tracing::info_span!(
            "deliver",
            provider = %self.default_transport,
            subject = %email.subject,
        );

        let report = send_with_failover(
            email,
            &self.default_transport,
            primary.as_ref(),
            &self.policy,
            &self.transports,
        )
        .instrument(span)
        .await;

        if report.success {
            tracing::info!(
                provider = %report.provider,
                failover = report.failover_used,
                "email delivered"
            );
        } else {
            tracing::error!(
                provider = %report.provider,
                attempts = report.attempts.len(),
                "email delivery failed"
            );
        }

        report
    }

    /// Render a template pair and send the result.
    ///
    /// Renders `<template>.html` (and `<template>.txt` when present) through
    /// the configured engine.
    #[cfg(feature = "templates")]
    pub async fn send_template(
        &self,
        template: &str,
        to: &str,
        subject: &str,
        context: &Context,
    ) -> Result<Delivery, MailError> {
        let engine = self
            .templates
            .as_ref()
            .ok_or_else(|| MailError::MissingConfig("template engine not configured".into()))?;

        let (html, text) = engine.render_pair(template, context)?;

        let mut builder = Email::builder().to(to).subject(subject).html(html);
        if let Some(text) = text {
            builder = builder.text(text);
        }

        self.send(&builder.build()?).await
    }
}

/// Builder for [`Mailer`].
#[derive(Default)]
pub struct MailerBuilder {
    transports: Transports,
    default_transport: Option<String>,
    policy: Option<FailoverPolicy>,
    #[cfg(feature = "templates")]
    templates: Option<TemplateEngine>,
}

impl MailerBuilder {
    /// Register a transport. The first registered transport becomes the
    /// default unless [`default_transport`](Self::default_transport) is set.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport_arc(Arc::new(transport))
    }

    /// Register an already-shared transport.
    pub fn transport_arc(mut self, transport: Arc<dyn Transport>) -> Self {
        if self.default_transport.is_none() {
            self.default_transport = Some(transport.name().to_string());
        }
        self.transports.insert_arc(transport);
        self
    }

    /// Name of the transport tried first on every send.
    pub fn default_transport(mut self, name: impl Into<String>) -> Self {
        self.default_transport = Some(name.into());
        self
    }

    /// Failover policy applied to every send (default: no chain, one attempt).
    pub fn policy(mut self, policy: FailoverPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Template engine used by [`Mailer::send_template`].
    #[cfg(feature = "templates")]
    pub fn templates(mut self, engine: TemplateEngine) -> Self {
        self.templates = Some(engine);
        self
    }

    /// Build the mailer, validating that the default transport is registered.
    pub fn build(self) -> Result<Mailer, MailError> {
        let default_transport = self
            .default_transport
            .ok_or_else(|| MailError::MissingConfig("no transport registered".into()))?;

        if !self.transports.contains(&default_transport) {
            return Err(MailError::UnknownTransport(default_transport));
        }

        Ok(Mailer {
            transports: self.transports,
            default_transport,
            policy: self.policy.unwrap_or_default(),
            #[cfg(feature = "templates")]
            templates: self.templates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    #[test]
    fn builder_requires_a_transport() {
        assert!(matches!(
            Mailer::builder().build(),
            Err(MailError::MissingConfig(_))
        ));
    }

    #[test]
    fn first_transport_becomes_default() {
        let mailer = Mailer::builder()
            .transport(MemoryTransport::named("first"))
            .transport(MemoryTransport::named("second"))
            .build()
            .unwrap();

        assert_eq!(mailer.default_transport, "first");
    }

    #[test]
    fn unknown_default_is_rejected() {
        let result = Mailer::builder()
            .transport(MemoryTransport::new())
            .default_transport("sendgrid")
            .build();

        assert!(matches!(result, Err(MailError::UnknownTransport(name)) if name == "sendgrid"));
    }

    #[test]
    fn config_parses_fallback_chain() {
        let config = MailerConfig {
            provider: "sendgrid".into(),
            fallback: Some("ses, smtp,".into()),
            max_retries: 2,
            retry_delay_ms: 50,
            failover_delay_ms: 100,
        };

        let policy = config.policy();
        assert_eq!(policy.chain, vec!["ses".to_string(), "smtp".to_string()]);
        assert_eq!(policy.max_retries_per_provider, 2);
        assert_eq!(policy.retry_delay, Duration::from_millis(50));
        assert_eq!(policy.failover_delay, Duration::from_millis(100));
    }
}

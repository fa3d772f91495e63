//! Mailgun messages API transport.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::MailError;
use crate::message::{Email, EmailBody};
use crate::transport::{Delivery, Transport};

const DEFAULT_BASE_URL: &str = "https://api.mailgun.net";

#[derive(Debug, Deserialize)]
struct MailgunResponse {
    id: Option<String>,
}

/// Transport delivering through the Mailgun HTTP API.
#[derive(Clone)]
pub struct MailgunTransport {
    client: reqwest::Client,
    api_key: String,
    domain: String,
    base_url: String,
    from: String,
}

impl MailgunTransport {
    /// Create a transport with an API key, sending domain, and default sender.
    pub fn new(
        api_key: impl Into<String>,
        domain: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            domain: domain.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            from: from.into(),
        }
    }

    /// Create a transport from `MAILGUN_API_KEY`, `MAILGUN_DOMAIN`, and
    /// `MAIL_FROM`. `MAILGUN_BASE_URL` selects the EU endpoint when set.
    pub fn from_env() -> Result<Self, MailError> {
        dotenvy::dotenv().ok();

        let api_key = std::env::var("MAILGUN_API_KEY")
            .map_err(|_| MailError::MissingConfig("MAILGUN_API_KEY not set".into()))?;
        let domain = std::env::var("MAILGUN_DOMAIN")
            .map_err(|_| MailError::MissingConfig("MAILGUN_DOMAIN not set".into()))?;
        let from = std::env::var("MAIL_FROM")
            .map_err(|_| MailError::MissingConfig("MAIL_FROM not set".into()))?;

        let mut transport = Self::new(api_key, domain, from);
        if let Ok(base_url) = std::env::var("MAILGUN_BASE_URL") {
            transport = transport.base_url(base_url);
        }
        Ok(transport)
    }

    /// Override the API base URL (EU region or tests).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_form(&self, email: &Email) -> Vec<(&'static str, String)> {
        let from = email.from.clone().unwrap_or_else(|| self.from.clone());

        let mut form = vec![("from", from), ("subject", email.subject.clone())];
        for to in &email.to {
            form.push(("to", to.clone()));
        }
        for cc in &email.cc {
            form.push(("cc", cc.clone()));
        }
        for bcc in &email.bcc {
            form.push(("bcc", bcc.clone()));
        }
        if let Some(reply_to) = &email.reply_to {
            form.push(("h:Reply-To", reply_to.clone()));
        }

        match &email.body {
            EmailBody::Text(text) => form.push(("text", text.clone())),
            EmailBody::Html(html) => form.push(("html", html.clone())),
            EmailBody::Multipart { text, html } => {
                form.push(("text", text.clone()));
                form.push(("html", html.clone()));
            }
        }

        form
    }
}

#[async_trait]
impl Transport for MailgunTransport {
    async fn send(&self, email: &Email) -> Result<Delivery, MailError> {
        let response = self
            .client
            .post(format!("{}/v3/{}/messages", self.base_url, self.domain))
            .basic_auth("api", Some(&self.api_key))
            .form(&self.build_form(email))
            .send()
            .await
            .map_err(|e| MailError::Api {
                provider: "mailgun",
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Api {
                provider: "mailgun",
                message: format!("{status}: {body}"),
            });
        }

        let message_id = response
            .json::<MailgunResponse>()
            .await
            .ok()
            .and_then(|r| r.id);

        Ok(Delivery { message_id })
    }

    fn name(&self) -> &str {
        "mailgun"
    }
}

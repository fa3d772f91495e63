//! SendGrid v3 Mail Send API transport.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::MailError;
use crate::message::{Email, EmailBody};
use crate::transport::{Delivery, Transport};

const DEFAULT_BASE_URL: &str = "https://api.sendgrid.com";

/// Transport delivering through the SendGrid HTTP API.
#[derive(Clone)]
pub struct SendGridTransport {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    from: String,
}

impl SendGridTransport {
    /// Create a transport with an API key and default sender address.
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            from: from.into(),
        }
    }

    /// Create a transport from `SENDGRID_API_KEY` and `MAIL_FROM`.
    pub fn from_env() -> Result<Self, MailError> {
        dotenvy::dotenv().ok();

        let api_key = std::env::var("SENDGRID_API_KEY")
            .map_err(|_| MailError::MissingConfig("SENDGRID_API_KEY not set".into()))?;
        let from = std::env::var("MAIL_FROM")
            .map_err(|_| MailError::MissingConfig("MAIL_FROM not set".into()))?;

        Ok(Self::new(api_key, from))
    }

    /// Override the API base URL (for regional endpoints or tests).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_payload(&self, email: &Email) -> Value {
        let recipients = |addresses: &[String]| -> Vec<Value> {
            addresses.iter().map(|a| json!({ "email": a })).collect()
        };

        let mut personalization = json!({ "to": recipients(&email.to) });
        if !email.cc.is_empty() {
            personalization["cc"] = Value::Array(recipients(&email.cc));
        }
        if !email.bcc.is_empty() {
            personalization["bcc"] = Value::Array(recipients(&email.bcc));
        }

        let content = match &email.body {
            EmailBody::Text(text) => vec![json!({ "type": "text/plain", "value": text })],
            EmailBody::Html(html) => vec![json!({ "type": "text/html", "value": html })],
            // SendGrid requires text/plain before text/html.
            EmailBody::Multipart { text, html } => vec![
                json!({ "type": "text/plain", "value": text }),
                json!({ "type": "text/html", "value": html }),
            ],
        };

        let from = email.from.as_deref().unwrap_or(&self.from);

        let mut payload = json!({
            "personalizations": [personalization],
            "from": { "email": from },
            "subject": email.subject,
            "content": content,
        });
        if let Some(reply_to) = &email.reply_to {
            payload["reply_to"] = json!({ "email": reply_to });
        }
        payload
    }
}

#[async_trait]
impl Transport for SendGridTransport {
    async fn send(&self, email: &Email) -> Result<Delivery, MailError> {
        let response = self
            .client
            .post(format!("{}/v3/mail/send", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.build_payload(email))
            .send()
            .await
            .map_err(|e| MailError::Api {
                provider: "sendgrid",
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Api {
                provider: "sendgrid",
                message: format!("{status}: {body}"),
            });
        }

        let message_id = response
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(Delivery { message_id })
    }

    fn name(&self) -> &str {
        "sendgrid"
    }
}

use thiserror::Error;

/// Errors produced while configuring transports or delivering mail.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("missing required config: {0}")]
    MissingConfig(String),

    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("{provider} API error: {message}")]
    Api {
        provider: &'static str,
        message: String,
    },

    #[error("unknown transport: {0}")]
    UnknownTransport(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("{0}")]
    Delivery(String),
}

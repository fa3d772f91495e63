use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::message::Email;

/// Status of a queued email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailStatus {
    Pending,
    Sending,
    Sent,
    Failed,
    Expired,
}

impl std::fmt::Display for MailStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Sending => write!(f, "sending"),
            Self::Sent => write!(f, "sent"),
            Self::Failed => write!(f, "failed"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

// For persistent stores: MailStatus <-> String conversion
impl TryFrom<String> for MailStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "pending" => Ok(Self::Pending),
            "sending" => Ok(Self::Sending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            "expired" => Ok(Self::Expired),
            other => Err(format!("unknown mail status: {other}")),
        }
    }
}

/// Options controlling retry, expiry, and scheduling for a queued email.
#[derive(Debug, Clone)]
pub struct EnqueueOpts {
    /// Maximum number of delivery attempts (including the first).
    pub max_attempts: i32,
    /// If set, the email is dropped when claimed after this duration from
    /// creation.
    pub expires_in: Option<std::time::Duration>,
    /// Delay before the email becomes eligible for delivery.
    pub delay: Option<std::time::Duration>,
}

impl Default for EnqueueOpts {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            expires_in: None,
            delay: None,
        }
    }
}

/// One email waiting in (or processed by) the delivery queue.
///
/// Fields map directly to database columns when backing the queue with a
/// persistent [`QueueStore`](super::QueueStore).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailEntry {
    pub id: Uuid,
    pub email: Email,
    pub status: MailStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub run_at: OffsetDateTime,
    pub expires_at: Option<OffsetDateTime>,
    pub locked_at: Option<OffsetDateTime>,
    pub locked_by: Option<String>,
    pub last_error: Option<String>,
    /// Provider message id recorded on successful delivery.
    pub message_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub completed_at: Option<OffsetDateTime>,
}

impl MailEntry {
    /// Build a fresh pending entry for `email` with the given options.
    pub fn new(email: Email, opts: &EnqueueOpts) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            email,
            status: MailStatus::Pending,
            attempts: 0,
            max_attempts: opts.max_attempts,
            run_at: opts.delay.map(|d| now + d).unwrap_or(now),
            expires_at: opts.expires_in.map(|d| now + d),
            locked_at: None,
            locked_by: None,
            last_error: None,
            message_id: None,
            created_at: now,
            completed_at: None,
        }
    }
}

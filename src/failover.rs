//! Retry and failover orchestration over abstract transports.
//!
//! [`send_with_failover`] drives a bounded-retry-then-failover-chain protocol:
//! try the primary transport up to the policy's retry budget, then walk the
//! configured backup chain in order until one transport delivers or every
//! option is exhausted. Every individual attempt is timed and recorded, and
//! the returned [`SendReport`] names the transport that produced the final
//! outcome.
//!
//! Nothing in this module is fatal: transport failures, unresolvable chain
//! entries, and observer-hook defects are all absorbed into the report or
//! skipped. The operation itself never fails — callers inspect
//! [`SendReport::success`].

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use time::OffsetDateTime;

use crate::error::MailError;
use crate::message::Email;
use crate::transport::{Delivery, ResolveTransport, Transport};

/// Observer invoked once per transport transition. See [`FailoverPolicy::on_failover`].
pub type FailoverHook = Arc<dyn Fn(&FailoverEvent) + Send + Sync>;

/// Configuration for [`send_with_failover`].
#[derive(Clone)]
pub struct FailoverPolicy {
    /// Ordered backup transport names, tried after the primary exhausts its
    /// retries. May be empty, in which case only the primary is tried.
    pub chain: Vec<String>,
    /// Attempts allotted to each transport, including the first. Values
    /// below 1 are treated as 1 (a transport is always tried at least once).
    pub max_retries_per_provider: u32,
    /// Pause between retries of the same transport.
    pub retry_delay: Duration,
    /// Pause between giving up on one transport and trying the next.
    pub failover_delay: Duration,
    /// Best-effort observer called once per transport transition (not per
    /// retry). Panics raised by the hook are swallowed.
    pub on_failover: Option<FailoverHook>,
}

impl Default for FailoverPolicy {
    fn default() -> Self {
        Self {
            chain: Vec::new(),
            max_retries_per_provider: 1,
            retry_delay: Duration::ZERO,
            failover_delay: Duration::ZERO,
            on_failover: None,
        }
    }
}

impl FailoverPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ordered backup chain.
    pub fn chain(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.chain = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the per-transport attempt budget (minimum 1).
    pub fn max_retries_per_provider(mut self, attempts: u32) -> Self {
        self.max_retries_per_provider = attempts.max(1);
        self
    }

    /// Set the pause between retries of the same transport.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the pause before each fallback transport is tried.
    pub fn failover_delay(mut self, delay: Duration) -> Self {
        self.failover_delay = delay;
        self
    }

    /// Install a transition observer.
    pub fn on_failover(mut self, hook: impl Fn(&FailoverEvent) + Send + Sync + 'static) -> Self {
        self.on_failover = Some(Arc::new(hook));
        self
    }

    fn attempts_per_provider(&self) -> u32 {
        self.max_retries_per_provider.max(1)
    }
}

impl fmt::Debug for FailoverPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailoverPolicy")
            .field("chain", &self.chain)
            .field("max_retries_per_provider", &self.max_retries_per_provider)
            .field("retry_delay", &self.retry_delay)
            .field("failover_delay", &self.failover_delay)
            .field("on_failover", &self.on_failover.is_some())
            .finish()
    }
}

/// One logged invocation of a transport, success or failure, with timing.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    /// Name of the transport that was invoked.
    pub transport: String,
    pub success: bool,
    /// Failure detail, when the transport reported any.
    pub error: Option<String>,
    /// Wall-clock duration of this attempt.
    pub duration: Duration,
}

/// Passed to [`FailoverPolicy::on_failover`] on each transport transition.
#[derive(Debug, Clone)]
pub struct FailoverEvent {
    /// The transport that just exhausted its retries.
    pub failed_transport: String,
    /// Error from the last attempt on the failed transport.
    pub error: String,
    /// The transport about to be tried.
    pub next_transport: String,
    /// Number of attempt records accumulated before this transition's own
    /// attempts begin.
    pub attempt_index: usize,
    pub timestamp: OffsetDateTime,
}

/// Final outcome of a failover send, with full attempt provenance.
#[derive(Debug, Clone)]
pub struct SendReport {
    pub success: bool,
    /// Message id from the transport that delivered, when it reported one.
    pub message_id: Option<String>,
    /// Failure detail when `success` is false.
    pub error: Option<String>,
    /// Name of the transport that produced the final outcome. On total
    /// exhaustion this remains the primary's name.
    pub provider: String,
    /// Whether the backup chain was entered.
    pub failover_used: bool,
    /// Every attempt made, in strict chronological order.
    pub attempts: Vec<AttemptRecord>,
}

impl SendReport {
    /// Collapse the report into a plain delivery result.
    pub fn into_result(self) -> Result<Delivery, MailError> {
        if self.success {
            Ok(Delivery {
                message_id: self.message_id,
            })
        } else {
            Err(MailError::Delivery(
                self.error.unwrap_or_else(|| "delivery failed".to_string()),
            ))
        }
    }
}

/// Send `email` through `primary`, falling back along `policy.chain`.
///
/// The primary is tried first with up to
/// [`max_retries_per_provider`](FailoverPolicy::max_retries_per_provider)
/// attempts. On exhaustion each chain entry is resolved through `resolver`
/// and tried with the same budget, in order, until one delivers. Chain
/// entries named like the primary are skipped, as are entries the resolver
/// rejects; neither produces an attempt record.
///
/// This operation never fails: every transport error is captured in the
/// attempt trail and the worst case is a report with `success == false` and
/// `error == "All providers failed"`.
pub async fn send_with_failover(
    email: &Email,
    primary_name: &str,
    primary: &dyn Transport,
    policy: &FailoverPolicy,
    resolver: &dyn ResolveTransport,
) -> SendReport {
    let mut attempts = Vec::new();

    if let Some(delivery) = try_transport(email, primary_name, primary, policy, &mut attempts).await
    {
        return SendReport {
            success: true,
            message_id: delivery.message_id,
            error: None,
            provider: primary_name.to_string(),
            failover_used: false,
            attempts,
        };
    }

    for name in &policy.chain {
        // The primary has already exhausted its budget in this call.
        if name == primary_name {
            tracing::debug!(transport = %name, "skipping chain entry equal to primary");
            continue;
        }

        let transport = match resolver.resolve(name) {
            Ok(transport) => transport,
            Err(error) => {
                tracing::warn!(transport = %name, %error, "skipping unresolvable fallback transport");
                continue;
            }
        };

        notify_failover(policy, &attempts, name);

        if !policy.failover_delay.is_zero() {
            tokio::time::sleep(policy.failover_delay).await;
        }

        if let Some(delivery) =
            try_transport(email, name, transport.as_ref(), policy, &mut attempts).await
        {
            return SendReport {
                success: true,
                message_id: delivery.message_id,
                error: None,
                provider: name.clone(),
                failover_used: true,
                attempts,
            };
        }
    }

    tracing::error!(
        primary = %primary_name,
        attempts = attempts.len(),
        "all providers failed"
    );

    SendReport {
        success: false,
        message_id: None,
        error: Some("All providers failed".to_string()),
        provider: primary_name.to_string(),
        failover_used: true,
        attempts,
    }
}

/// Try one transport up to the policy's attempt budget, appending a record
/// per attempt. Returns the delivery on success, `None` on exhaustion.
async fn try_transport(
    email: &Email,
    name: &str,
    transport: &dyn Transport,
    policy: &FailoverPolicy,
    attempts: &mut Vec<AttemptRecord>,
) -> Option<Delivery> {
    let budget = policy.attempts_per_provider();

    for attempt in 0..budget {
        if attempt > 0 && !policy.retry_delay.is_zero() {
            tokio::time::sleep(policy.retry_delay).await;
        }

        let started = Instant::now();
        let outcome = transport.send(email).await;
        let duration = started.elapsed();

        match outcome {
            Ok(delivery) => {
                tracing::debug!(transport = %name, ?duration, "send attempt succeeded");
                attempts.push(AttemptRecord {
                    transport: name.to_string(),
                    success: true,
                    error: None,
                    duration,
                });
                return Some(delivery);
            }
            Err(error) => {
                tracing::warn!(
                    transport = %name,
                    attempt = attempt + 1,
                    budget,
                    %error,
                    "send attempt failed"
                );
                attempts.push(AttemptRecord {
                    transport: name.to_string(),
                    success: false,
                    error: Some(error.to_string()),
                    duration,
                });
            }
        }
    }

    None
}

/// Fire the transition observer, if any. The hook runs caller code, so it is
/// isolated: a panicking observer must not disturb the failover sequence.
fn notify_failover(policy: &FailoverPolicy, attempts: &[AttemptRecord], next: &str) {
    let Some(hook) = &policy.on_failover else {
        return;
    };
    let Some(last) = attempts.last() else {
        return;
    };

    let event = FailoverEvent {
        failed_transport: last.transport.clone(),
        error: last.error.clone().unwrap_or_default(),
        next_transport: next.to_string(),
        attempt_index: attempts.len(),
        timestamp: OffsetDateTime::now_utc(),
    };

    if catch_unwind(AssertUnwindSafe(|| hook(&event))).is_err() {
        tracing::warn!(next_transport = %next, "failover observer panicked, continuing");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_defaults_to_single_attempt_no_chain() {
        let policy = FailoverPolicy::new();
        assert!(policy.chain.is_empty());
        assert_eq!(policy.attempts_per_provider(), 1);
        assert!(policy.retry_delay.is_zero());
        assert!(policy.failover_delay.is_zero());
        assert!(policy.on_failover.is_none());
    }

    #[test]
    fn zero_retries_clamps_to_one() {
        let policy = FailoverPolicy::new().max_retries_per_provider(0);
        assert_eq!(policy.attempts_per_provider(), 1);
    }

    #[test]
    fn report_collapses_to_result() {
        let success = SendReport {
            success: true,
            message_id: Some("abc".into()),
            error: None,
            provider: "smtp".into(),
            failover_used: false,
            attempts: vec![],
        };
        let delivery = success.into_result().unwrap();
        assert_eq!(delivery.message_id.as_deref(), Some("abc"));

        let failure = SendReport {
            success: false,
            message_id: None,
            error: Some("All providers failed".into()),
            provider: "smtp".into(),
            failover_used: true,
            attempts: vec![],
        };
        assert!(matches!(
            failure.into_result(),
            Err(MailError::Delivery(message)) if message == "All providers failed"
        ));
    }
}

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::Instrument;

use super::entry::MailStatus;
use super::traits::QueueStore;
use crate::mailer::Mailer;

/// Background processor that polls a [`QueueStore`] and delivers claimed
/// entries through a [`Mailer`] (failover included).
///
/// The worker owns all state-transition logic: on success it marks the entry
/// sent, on failure it decides whether to retry (with backoff) or mark it
/// permanently failed, and it checks expiry before delivering.
///
/// ```ignore
/// DeliveryWorker::new(queue, mailer)
///     .concurrency(8)
///     .poll_interval(Duration::from_millis(500))
///     .start();
/// ```
pub struct DeliveryWorker<Q: QueueStore> {
    store: Q,
    mailer: Arc<Mailer>,
    concurrency: usize,
    poll_interval: Duration,
    worker_id: String,
}

impl<Q: QueueStore> DeliveryWorker<Q> {
    pub fn new(store: Q, mailer: Arc<Mailer>) -> Self {
        Self {
            store,
            mailer,
            concurrency: 4,
            poll_interval: Duration::from_secs(1),
            worker_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Maximum number of deliveries processed in parallel (default: 4).
    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    /// How often to poll when idle (default: 1s). Backs off slightly during
    /// idle streaks.
    pub fn poll_interval(mut self, d: Duration) -> Self {
        self.poll_interval = d;
        self
    }

    /// Start the worker loop. Spawns a background tokio task and returns
    /// immediately.
    pub fn start(self) {
        let store = self.store;
        let mailer = self.mailer;
        let concurrency = self.concurrency;
        let poll_interval = self.poll_interval;
        let worker_id = self.worker_id;

        tokio::spawn(async move {
            let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency));
            let mut idle_streak: u32 = 0;

            loop {
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    break;
                };

                let row = store.claim_next(&worker_id).await;

                let mut entry = match row {
                    Ok(Some(e)) => e,
                    Ok(None) => {
                        drop(permit);
                        idle_streak = idle_streak.saturating_add(1);
                        let backoff = poll_interval
                            .mul_f64((1.5_f64).min(1.0 + idle_streak as f64 * 0.1));
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    Err(e) => {
                        drop(permit);
                        tracing::error!(error = %e, "failed to poll mail queue");
                        tokio::time::sleep(poll_interval).await;
                        continue;
                    }
                };

                idle_streak = 0;

                let entry_id = entry.id;

                // Check expiry
                if let Some(exp) = entry.expires_at {
                    if exp < OffsetDateTime::now_utc() {
                        tracing::info!(%entry_id, "queued email expired, skipping");
                        entry.status = MailStatus::Expired;
                        entry.completed_at = Some(OffsetDateTime::now_utc());
                        let _ = store.update(&entry).await;
                        drop(permit);
                        continue;
                    }
                }

                let store2 = store.clone();
                let mailer2 = mailer.clone();

                tokio::spawn(async move {
                    let _permit = permit;

                    let span = tracing::info_span!("deliver_queued", %entry_id);
                    let report = mailer2.send_report(&entry.email).instrument(span).await;

                    if report.success {
                        tracing::info!(%entry_id, provider = %report.provider, "queued email delivered");
                        entry.status = MailStatus::Sent;
                        entry.message_id = report.message_id;
                        entry.last_error = None;
                        entry.completed_at = Some(OffsetDateTime::now_utc());
                        let _ = store2.update(&entry).await;
                    } else {
                        let error_msg = report
                            .error
                            .unwrap_or_else(|| "delivery failed".to_string());
                        entry.last_error = Some(error_msg.clone());
                        entry.locked_at = None;
                        entry.locked_by = None;

                        if entry.attempts < entry.max_attempts {
                            let backoff_secs =
                                (2_u64.saturating_pow(entry.attempts as u32)).min(300);
                            entry.status = MailStatus::Pending;
                            entry.run_at =
                                OffsetDateTime::now_utc() + Duration::from_secs(backoff_secs);
                            tracing::warn!(
                                %entry_id,
                                attempt = entry.attempts,
                                %error_msg,
                                backoff_secs,
                                "delivery failed, scheduling retry"
                            );
                        } else {
                            entry.status = MailStatus::Failed;
                            entry.completed_at = Some(OffsetDateTime::now_utc());
                            tracing::error!(
                                %entry_id,
                                attempts = entry.attempts,
                                %error_msg,
                                "delivery permanently failed"
                            );
                        }
                        let _ = store2.update(&entry).await;
                    }
                });
            }
        });

        tracing::info!("delivery worker running");
    }
}

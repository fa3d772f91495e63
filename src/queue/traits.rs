use async_trait::async_trait;

use super::entry::MailEntry;
use super::QueueError;

/// Backend-agnostic queue storage.
///
/// Implement this trait to plug in any persistence layer (in-memory,
/// Postgres, Redis, etc.). The [`DeliveryWorker`](super::DeliveryWorker)
/// polls a `QueueStore`, handles all state transitions (retry, expiry,
/// completion), and calls `update` with the modified entry.
///
/// Each method maps to a single storage operation, keeping implementations
/// small — for SQL backends, one query per method.
#[async_trait]
pub trait QueueStore: Send + Sync + Clone + 'static {
    /// Insert a new entry into the queue.
    async fn insert(&self, entry: &MailEntry) -> Result<(), QueueError>;

    /// Atomically claim the next eligible entry (status=pending, run_at <= now).
    ///
    /// The implementation must:
    /// - Select a pending entry with `run_at <= now`
    /// - Set `status` to `Sending`, `locked_at` to now, `locked_by` to the
    ///   worker id, and increment `attempts`
    /// - Return `None` when no eligible entries exist
    ///
    /// For Postgres, this is the `SELECT ... FOR UPDATE SKIP LOCKED` pattern.
    async fn claim_next(&self, worker_id: &str) -> Result<Option<MailEntry>, QueueError>;

    /// Persist an updated entry. The worker sets all fields (status,
    /// message id, timestamps) before calling this — the implementation only
    /// needs to write the entry back by id.
    async fn update(&self, entry: &MailEntry) -> Result<(), QueueError>;
}

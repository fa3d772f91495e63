use async_trait::async_trait;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use super::entry::{MailEntry, MailStatus};
use super::traits::QueueStore;
use super::QueueError;

/// In-memory [`QueueStore`] for development and testing.
///
/// Entries are stored in a `Vec` behind a mutex. Not durable — all queued
/// mail is lost on restart.
#[derive(Clone, Default)]
pub struct MemoryQueue {
    entries: Arc<Mutex<Vec<MailEntry>>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently in the given status.
    pub async fn count(&self, status: MailStatus) -> usize {
        let entries = self.entries.lock().await;
        entries.iter().filter(|e| e.status == status).count()
    }

    /// Snapshot of an entry by id.
    pub async fn get(&self, id: uuid::Uuid) -> Option<MailEntry> {
        let entries = self.entries.lock().await;
        entries.iter().find(|e| e.id == id).cloned()
    }
}

#[async_trait]
impl QueueStore for MemoryQueue {
    async fn insert(&self, entry: &MailEntry) -> Result<(), QueueError> {
        let mut entries = self.entries.lock().await;
        entries.push(entry.clone());
        Ok(())
    }

    async fn claim_next(&self, worker_id: &str) -> Result<Option<MailEntry>, QueueError> {
        let mut entries = self.entries.lock().await;
        let now = OffsetDateTime::now_utc();

        let pos = entries
            .iter()
            .position(|e| e.status == MailStatus::Pending && e.run_at <= now);

        if let Some(idx) = pos {
            let entry = &mut entries[idx];
            entry.status = MailStatus::Sending;
            entry.locked_at = Some(now);
            entry.locked_by = Some(worker_id.to_string());
            entry.attempts += 1;
            Ok(Some(entry.clone()))
        } else {
            Ok(None)
        }
    }

    async fn update(&self, entry: &MailEntry) -> Result<(), QueueError> {
        let mut entries = self.entries.lock().await;
        if let Some(existing) = entries.iter_mut().find(|e| e.id == entry.id) {
            *existing = entry.clone();
        }
        Ok(())
    }
}

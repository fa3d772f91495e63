//! Background delivery queue with pluggable storage, retry, and expiry.
//!
//! # Architecture
//!
//! - [`MailEntry`] — The stored representation of a queued email. Maps
//!   directly to a database row when using a persistent backend.
//! - [`QueueStore`] — Backend-agnostic storage trait. Implement for
//!   Postgres, Redis, etc.
//! - [`MemoryQueue`] — In-memory store for development and testing.
//! - [`DeliveryWorker`] — Processor that polls any `QueueStore` and delivers
//!   entries through a [`Mailer`](crate::Mailer), failover included.
//!
//! # Quick Start
//!
//! ```ignore
//! let queue = MemoryQueue::new();
//! let mailer = Arc::new(Mailer::from_env()?);
//!
//! // Enqueue
//! enqueue(&queue, email).await?;
//!
//! // Process
//! DeliveryWorker::new(queue, mailer).start();
//! ```

mod entry;
mod memory;
mod traits;
mod worker;

pub use entry::{EnqueueOpts, MailEntry, MailStatus};
pub use memory::MemoryQueue;
pub use traits::QueueStore;
pub use worker::DeliveryWorker;

use uuid::Uuid;

use crate::message::Email;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("store error: {0}")]
    Store(String),
    #[error("{0}")]
    Other(String),
}

/// Insert an email into the queue with default options.
pub async fn enqueue(store: &impl QueueStore, email: Email) -> Result<Uuid, QueueError> {
    enqueue_with(store, email, EnqueueOpts::default()).await
}

/// Insert an email into the queue with explicit options.
pub async fn enqueue_with(
    store: &impl QueueStore,
    email: Email,
    opts: EnqueueOpts,
) -> Result<Uuid, QueueError> {
    let entry = MailEntry::new(email, &opts);
    let id = entry.id;
    store.insert(&entry).await?;
    Ok(id)
}

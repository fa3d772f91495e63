#![cfg(feature = "queue")]

use std::sync::Arc;
use std::time::Duration;

use courier::queue::{
    enqueue, enqueue_with, DeliveryWorker, EnqueueOpts, MailStatus, MemoryQueue, QueueStore,
};
use courier::transport::MemoryTransport;
use courier::{Email, Mailer};
use uuid::Uuid;

fn email() -> Email {
    Email::builder()
        .to("user@example.com")
        .subject("Queued")
        .text("Body")
        .build()
        .unwrap()
}

fn mailer(transport: MemoryTransport) -> Arc<Mailer> {
    Arc::new(Mailer::builder().transport(transport).build().unwrap())
}

async fn wait_for_terminal_status(queue: &MemoryQueue, id: Uuid) -> MailStatus {
    for _ in 0..500 {
        if let Some(entry) = queue.get(id).await {
            match entry.status {
                MailStatus::Sent | MailStatus::Failed | MailStatus::Expired => {
                    return entry.status;
                }
                _ => {}
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("queued email never reached a terminal status");
}

#[tokio::test]
async fn enqueue_and_claim_transitions_entry() {
    let queue = MemoryQueue::new();

    let id = enqueue(&queue, email()).await.unwrap();
    assert_eq!(queue.count(MailStatus::Pending).await, 1);

    let claimed = queue.claim_next("worker-1").await.unwrap().unwrap();
    assert_eq!(claimed.id, id);
    assert_eq!(claimed.status, MailStatus::Sending);
    assert_eq!(claimed.attempts, 1);
    assert_eq!(claimed.locked_by.as_deref(), Some("worker-1"));

    // Nothing else is eligible while the entry is locked.
    assert!(queue.claim_next("worker-2").await.unwrap().is_none());
}

#[tokio::test]
async fn delayed_entries_are_not_claimable_early() {
    let queue = MemoryQueue::new();

    let opts = EnqueueOpts {
        delay: Some(Duration::from_secs(3600)),
        ..Default::default()
    };
    enqueue_with(&queue, email(), opts).await.unwrap();

    assert!(queue.claim_next("worker-1").await.unwrap().is_none());
}

#[tokio::test]
async fn worker_delivers_pending_mail() {
    let queue = MemoryQueue::new();
    let transport = MemoryTransport::new().message_id("mem-1");
    let mailer = mailer(transport.clone());

    let id = enqueue(&queue, email()).await.unwrap();

    DeliveryWorker::new(queue.clone(), mailer)
        .poll_interval(Duration::from_millis(10))
        .start();

    let status = wait_for_terminal_status(&queue, id).await;
    assert_eq!(status, MailStatus::Sent);

    let entry = queue.get(id).await.unwrap();
    assert_eq!(entry.message_id.as_deref(), Some("mem-1"));
    assert!(entry.completed_at.is_some());
    assert_eq!(transport.sent_count(), 1);
}

#[tokio::test]
async fn worker_marks_exhausted_mail_failed() {
    let queue = MemoryQueue::new();
    let transport = MemoryTransport::new().fail_with("relay refused");
    let mailer = mailer(transport.clone());

    let opts = EnqueueOpts {
        max_attempts: 1,
        ..Default::default()
    };
    let id = enqueue_with(&queue, email(), opts).await.unwrap();

    DeliveryWorker::new(queue.clone(), mailer)
        .poll_interval(Duration::from_millis(10))
        .start();

    let status = wait_for_terminal_status(&queue, id).await;
    assert_eq!(status, MailStatus::Failed);

    let entry = queue.get(id).await.unwrap();
    assert_eq!(entry.last_error.as_deref(), Some("All providers failed"));
    assert_eq!(transport.sent_count(), 0);
}

#[tokio::test]
async fn worker_expires_stale_mail() {
    let queue = MemoryQueue::new();
    let transport = MemoryTransport::new();
    let mailer = mailer(transport.clone());

    let opts = EnqueueOpts {
        expires_in: Some(Duration::ZERO),
        ..Default::default()
    };
    let id = enqueue_with(&queue, email(), opts).await.unwrap();

    // Let the deadline pass before the worker first polls.
    tokio::time::sleep(Duration::from_millis(20)).await;

    DeliveryWorker::new(queue.clone(), mailer)
        .poll_interval(Duration::from_millis(10))
        .start();

    let status = wait_for_terminal_status(&queue, id).await;
    assert_eq!(status, MailStatus::Expired);
    assert_eq!(transport.sent_count(), 0);
}

#[test]
fn mail_status_string_roundtrip() {
    for status in [
        MailStatus::Pending,
        MailStatus::Sending,
        MailStatus::Sent,
        MailStatus::Failed,
        MailStatus::Expired,
    ] {
        let text = status.to_string();
        assert_eq!(MailStatus::try_from(text).unwrap(), status);
    }
}

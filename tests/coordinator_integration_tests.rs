//! End-to-end coordinator tests over the in-memory messaging provider.
//!
//! Each test runs a real coordinator (dispatcher, reply subscription,
//! sweeper) and, where needed, a real worker loop sharing the same queues.

mod common;

use std::collections::HashSet;
use std::time::Duration;

use courier_core::correlation::CorrelationId;
use courier_core::error::CourierError;
use courier_core::messaging::{MessagingService, ReplyMessage};
use courier_core::status_store::RequestStatus;

use common::{Harness, RejectingHandler, UppercaseHandler};

#[tokio::test]
async fn test_submit_then_worker_completes_request() {
    let harness = Harness::with_worker(UppercaseHandler).await;

    let id = harness
        .coordinator
        .submit("hello".to_string())
        .await
        .expect("submit");

    let entry = harness.wait_for_terminal(&id).await;
    assert_eq!(entry.status, RequestStatus::Completed);
    assert_eq!(entry.result.as_deref(), Some("Processed: HELLO"));

    harness.shutdown().await;
}

#[tokio::test]
async fn test_worker_domain_failure_marks_request_failed() {
    let harness = Harness::with_worker(RejectingHandler).await;

    let id = harness
        .coordinator
        .submit("nope".to_string())
        .await
        .expect("submit");

    let entry = harness.wait_for_terminal(&id).await;
    assert_eq!(entry.status, RequestStatus::Failed);
    assert_eq!(entry.result.as_deref(), Some("Error: not found"));

    harness.shutdown().await;
}

#[tokio::test]
async fn test_status_is_processing_immediately_after_submit() {
    let harness = Harness::without_worker().await;

    let id = harness
        .coordinator
        .submit("pending".to_string())
        .await
        .expect("submit");

    let entry = harness.coordinator.status(&id).expect("entry");
    assert_eq!(entry.status, RequestStatus::Processing);
    assert!(entry.result.is_none());

    harness.shutdown().await;
}

#[tokio::test]
async fn test_entry_is_evicted_after_ttl() {
    // No worker, so the entry sits in Processing until the sweeper takes it
    let harness = Harness::without_worker().await;

    let id = harness
        .coordinator
        .submit("stale".to_string())
        .await
        .expect("submit");
    assert!(harness.coordinator.status(&id).is_some());

    harness
        .wait_until("ttl eviction", || harness.coordinator.status(&id).is_none())
        .await;
    assert_eq!(harness.coordinator.entry_count(), 0);

    harness.shutdown().await;
}

#[tokio::test]
async fn test_reply_for_unknown_correlation_id_is_discarded() {
    let harness = Harness::without_worker().await;

    let orphan = ReplyMessage::success(
        "ghost".to_string(),
        &CorrelationId::mint().to_string(),
    );
    harness
        .service
        .send_message("reply_queue", &orphan)
        .await
        .expect("send");

    // The demultiplexer drops it from the queue without creating an entry
    harness.wait_for_empty_queue("reply_queue").await;
    assert_eq!(harness.coordinator.entry_count(), 0);

    harness.shutdown().await;
}

#[tokio::test]
async fn test_reply_without_correlation_id_is_discarded() {
    let harness = Harness::without_worker().await;

    let mut malformed = ReplyMessage::success(
        "ghost".to_string(),
        &CorrelationId::mint().to_string(),
    );
    malformed.metadata.correlation_id = None;
    harness
        .service
        .send_message("reply_queue", &malformed)
        .await
        .expect("send");

    harness.wait_for_empty_queue("reply_queue").await;
    assert_eq!(harness.coordinator.entry_count(), 0);

    harness.shutdown().await;
}

#[tokio::test]
async fn test_duplicate_reply_does_not_overwrite_result() {
    let harness = Harness::without_worker().await;

    let id = harness
        .coordinator
        .submit("once".to_string())
        .await
        .expect("submit");

    let first = ReplyMessage::success("first".to_string(), &id.to_string());
    harness
        .service
        .send_message("reply_queue", &first)
        .await
        .expect("send first");

    let entry = harness.wait_for_terminal(&id).await;
    assert_eq!(entry.status, RequestStatus::Completed);

    // A redelivered or conflicting second reply is acknowledged and ignored
    let second = ReplyMessage::failure("second", &id.to_string());
    harness
        .service
        .send_message("reply_queue", &second)
        .await
        .expect("send second");

    harness.wait_for_empty_queue("reply_queue").await;

    let entry = harness.coordinator.status(&id).expect("entry");
    assert_eq!(entry.status, RequestStatus::Completed);
    assert_eq!(entry.result.as_deref(), Some("first"));

    harness.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_get_distinct_ids_and_all_settle() {
    let harness = Harness::with_worker(UppercaseHandler).await;

    // Race the dispatcher from parallel tasks, not a sequential loop
    let mut submits = Vec::new();
    for i in 0..32 {
        let coordinator = std::sync::Arc::clone(&harness.coordinator);
        submits.push(tokio::spawn(async move {
            let id = coordinator.submit(format!("job-{i}")).await.expect("submit");
            (i, id)
        }));
    }

    let mut ids = Vec::new();
    for submit in submits {
        ids.push(submit.await.expect("submit task"));
    }

    let distinct: HashSet<_> = ids.iter().map(|(_, id)| *id).collect();
    assert_eq!(distinct.len(), 32);

    for (i, id) in &ids {
        let entry = harness.wait_for_terminal(id).await;
        assert_eq!(entry.status, RequestStatus::Completed);
        assert_eq!(
            entry.result.as_deref(),
            Some(&format!("Processed: JOB-{i}")[..])
        );
    }

    harness.shutdown().await;
}

#[tokio::test]
async fn test_malformed_reply_does_not_block_later_replies() {
    let harness = Harness::without_worker().await;

    let id = harness
        .coordinator
        .submit("hello".to_string())
        .await
        .expect("submit");

    // Valid JSON that is not a reply envelope, queued ahead of the real reply
    harness
        .service
        .send_message("reply_queue", &serde_json::json!({"not": "a reply"}))
        .await
        .expect("send poison");

    let reply = ReplyMessage::success("Processed: HELLO".to_string(), &id.to_string());
    harness
        .service
        .send_message("reply_queue", &reply)
        .await
        .expect("send reply");

    // The good reply behind the poison message still lands
    let entry = harness.wait_for_terminal(&id).await;
    assert_eq!(entry.status, RequestStatus::Completed);
    assert_eq!(entry.result.as_deref(), Some("Processed: HELLO"));

    // And the poison message was dropped, not left for redelivery
    harness.wait_for_empty_queue("reply_queue").await;

    harness.shutdown().await;
}

#[tokio::test]
async fn test_failed_dispatch_rolls_back_status_entry() {
    let harness = Harness::without_worker().await;

    harness.service.set_fail_sends(true);
    let result = harness.coordinator.submit("doomed".to_string()).await;
    assert!(matches!(result, Err(CourierError::DispatchFailed { .. })));

    // No half-registered entry is left behind
    assert_eq!(harness.coordinator.entry_count(), 0);

    // Transport recovers; the next submission goes through once the session
    // has re-established itself
    harness.service.set_fail_sends(false);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let id = loop {
        match harness.coordinator.submit("retry".to_string()).await {
            Ok(id) => break id,
            Err(_) if tokio::time::Instant::now() < deadline => {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            Err(e) => panic!("submit never recovered: {e}"),
        }
    };
    let entry = harness.coordinator.status(&id).expect("entry");
    assert_eq!(entry.status, RequestStatus::Processing);

    harness.shutdown().await;
}

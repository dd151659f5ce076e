// crates/draftline-core/tests/publisher.rs
// ============================================================================
// Module: Publish Coordinator Tests
// Description: Exactly-once publication, reply chaining, crash resume.
// ============================================================================
//! ## Overview
//! Exercises the coordinator directly: ordered thread publication with reply
//! chaining, crash-recovery resume that reuses persisted posts, failure
//! marking, and the attempt-numbering rules for explicit resumes.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use common::RecordingSocial;
use common::SteppingClock;
use common::at;
use common::pending_draft;
use draftline_core::AttemptStatus;
use draftline_core::Draft;
use draftline_core::DraftStatus;
use draftline_core::DraftStore;
use draftline_core::InMemoryDraftStore;
use draftline_core::Post;
use draftline_core::PublishAttempt;
use draftline_core::PublishConfig;
use draftline_core::PublishOutcome;
use draftline_core::Publisher;
use draftline_core::RetryPolicy;
use draftline_core::RunId;

/// Builds a live (non-dry-run) publish configuration with fast retries.
fn live_config() -> PublishConfig {
    PublishConfig { dry_run: false, retry: RetryPolicy::immediate(3) }
}

/// Seeds a store with a three-tweet thread draft.
fn seeded_thread() -> (InMemoryDraftStore, Draft) {
    let store = InMemoryDraftStore::new();
    let draft = pending_draft(
        &RunId::new("run-publish"),
        &["first point (1/3)", "second point (2/3)", "third point (3/3)"],
    );
    store.insert_draft(&draft).unwrap();
    (store, draft)
}

/// Tests ordered thread publication with reply chaining (scenario: thread).
#[test]
fn test_thread_publishes_in_order_with_reply_chain() {
    let (store, draft) = seeded_thread();
    let clock = SteppingClock::new(at(1_000), 10);
    let social = RecordingSocial::default();
    let publisher = Publisher::new(&store, &social, &clock, live_config());

    let outcome = publisher.publish_approved(&draft, None).unwrap();
    let PublishOutcome::Published { tweet_ids, dry_run } = outcome else {
        panic!("expected published");
    };
    assert!(!dry_run);
    assert_eq!(tweet_ids, vec!["tweet-1", "tweet-2", "tweet-3"]);

    let calls = social.calls.borrow();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].in_reply_to, None);
    assert_eq!(calls[1].in_reply_to.as_deref(), Some("tweet-1"));
    assert_eq!(calls[2].in_reply_to.as_deref(), Some("tweet-2"));

    let posts = store.posts_for_draft(&draft.id).unwrap();
    assert_eq!(posts.len(), 3);
    for (index, post) in posts.iter().enumerate() {
        let position = u32::try_from(index + 1).unwrap();
        assert_eq!(post.position, position);
        assert_eq!(post.publish_idempotency_key, draft.publish_key(position));
    }

    let updated = store.get_draft(&draft.id).unwrap().unwrap();
    assert_eq!(updated.status, DraftStatus::Posted);
    assert_eq!(updated.published_tweet_ids.unwrap().len(), 3);
}

/// Tests resume after a crash mid-thread reuses the persisted first post.
#[test]
fn test_resume_after_crash_reuses_posts() {
    let (store, draft) = seeded_thread();
    // A worker took the lease, published position 1, and died.
    store
        .begin_publish_attempt(
            &PublishAttempt {
                draft_id: draft.id.clone(),
                attempt: 1,
                owner: Some("crashed-worker".to_string()),
                status: AttemptStatus::Started,
                created_at: at(100),
                completed_at: None,
                last_error: None,
            },
            None,
        )
        .unwrap();
    store
        .insert_post(&Post {
            draft_id: draft.id.clone(),
            position: 1,
            tweet_id: "tweet-1".to_string(),
            content: "first point (1/3)".to_string(),
            posted_at: at(150),
            publish_idempotency_key: draft.publish_key(1),
        })
        .unwrap();

    let clock = SteppingClock::new(at(1_000), 10);
    let social = RecordingSocial::default();
    // Continue the downstream id sequence past the crashed worker's post.
    social.sequence.set(1);
    let publisher = Publisher::new(&store, &social, &clock, live_config());

    let outcome = publisher.resume(&draft.id).unwrap();
    let PublishOutcome::Published { tweet_ids, .. } = outcome else {
        panic!("expected published");
    };
    assert_eq!(tweet_ids, vec!["tweet-1", "tweet-2", "tweet-3"]);

    // Only positions 2 and 3 hit the downstream API, chained off tweet-1.
    let calls = social.calls.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].in_reply_to.as_deref(), Some("tweet-1"));
    assert_eq!(calls[1].in_reply_to.as_deref(), Some("tweet-2"));

    // One attempt row, started → completed.
    let attempts = store.attempts(&draft.id).unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, AttemptStatus::Completed);
    assert_eq!(store.posts_for_draft(&draft.id).unwrap().len(), 3);
}

/// Tests downstream exhaustion fails the attempt and marks the draft.
#[test]
fn test_downstream_failure_marks_attempt_failed() {
    let (store, draft) = seeded_thread();
    let clock = SteppingClock::new(at(1_000), 10);
    let social = RecordingSocial::failing(10);
    let publisher = Publisher::new(&store, &social, &clock, live_config());

    let outcome = publisher.publish_approved(&draft, None).unwrap();
    let PublishOutcome::Failed { error } = outcome else {
        panic!("expected failed");
    };
    assert!(error.contains("downstream unavailable"));

    let updated = store.get_draft(&draft.id).unwrap().unwrap();
    assert_eq!(updated.status, DraftStatus::Error);
    assert!(updated.last_error.is_some());
    let attempts = store.attempts(&draft.id).unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, AttemptStatus::Failed);
    assert!(store.posts_for_draft(&draft.id).unwrap().is_empty());
}

/// Tests resume after failure opens the next attempt number and succeeds.
#[test]
fn test_resume_after_failure_opens_next_attempt() {
    let (store, draft) = seeded_thread();
    let clock = SteppingClock::new(at(1_000), 10);
    let broken = RecordingSocial::failing(10);
    let publisher = Publisher::new(&store, &broken, &clock, live_config());
    assert!(matches!(
        publisher.publish_approved(&draft, None).unwrap(),
        PublishOutcome::Failed { .. }
    ));

    let healthy = RecordingSocial::default();
    let publisher = Publisher::new(&store, &healthy, &clock, live_config());
    let outcome = publisher.resume(&draft.id).unwrap();
    assert!(matches!(outcome, PublishOutcome::Published { .. }));

    let attempts = store.attempts(&draft.id).unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].attempt, 1);
    assert_eq!(attempts[0].status, AttemptStatus::Failed);
    assert_eq!(attempts[1].attempt, 2);
    assert_eq!(attempts[1].status, AttemptStatus::Completed);
    assert_eq!(store.posts_for_draft(&draft.id).unwrap().len(), 3);

    // Approving again after completion is idempotent.
    assert!(matches!(
        publisher.publish_approved(&draft, None).unwrap(),
        PublishOutcome::AlreadyCompleted
    ));
}

/// Tests resume of a completed publication reports idempotent success.
#[test]
fn test_resume_completed_is_idempotent() {
    let (store, draft) = seeded_thread();
    let clock = SteppingClock::new(at(1_000), 10);
    let social = RecordingSocial::default();
    let publisher = Publisher::new(&store, &social, &clock, live_config());
    assert!(matches!(
        publisher.publish_approved(&draft, None).unwrap(),
        PublishOutcome::Published { .. }
    ));
    assert!(matches!(publisher.resume(&draft.id).unwrap(), PublishOutcome::AlreadyCompleted));
    // No duplicate tweets, no duplicate posts.
    assert_eq!(social.calls.borrow().len(), 3);
    assert_eq!(store.posts_for_draft(&draft.id).unwrap().len(), 3);
}

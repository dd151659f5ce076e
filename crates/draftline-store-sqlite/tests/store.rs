// crates/draftline-store-sqlite/tests/store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Round-trip and uniqueness-contract tests for the draft store.
// ============================================================================
//! ## Overview
//! Validates record round-trips and every uniqueness contract the runtime
//! leans on: token hashes, the publish-attempt lease, post positions, and the
//! weekly-report window.

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

use std::collections::BTreeMap;

use draftline_core::ActionToken;
use draftline_core::AttemptStatus;
use draftline_core::Draft;
use draftline_core::DraftId;
use draftline_core::DraftStatus;
use draftline_core::DraftStore;
use draftline_core::Post;
use draftline_core::PublishAttempt;
use draftline_core::Run;
use draftline_core::RunId;
use draftline_core::RunStatus;
use draftline_core::StageLog;
use draftline_core::StoreError;
use draftline_core::Timestamp;
use draftline_core::TokenAction;
use draftline_core::WeeklyReport;
use draftline_core::plan::DraftCandidate;
use draftline_core::plan::DraftCandidates;
use draftline_core::plan::DraftMode;
use draftline_core::plan::EditedDraft;
use draftline_core::plan::StyleProfile;
use draftline_core::plan::ThreadPlan;
use draftline_core::plan::TopicPlan;
use draftline_core::report::PolicyAction;
use draftline_core::report::PolicyReport;
use draftline_core::report::RiskLevel;
use draftline_store_sqlite::SqliteDraftStore;
use draftline_store_sqlite::SqliteStoreConfig;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Fixed test time base.
const T0: i64 = 1_700_000_000_000;

/// Builds a timestamp offset from the base.
fn at(offset_ms: i64) -> Timestamp {
    Timestamp::from_unix_millis(T0 + offset_ms)
}

/// Builds a passing policy report.
fn pass_report() -> PolicyReport {
    PolicyReport {
        checks: Vec::new(),
        risk_level: RiskLevel::Low,
        action: PolicyAction::Pass,
        claims: Vec::new(),
        evidence_map: BTreeMap::new(),
        unsupported_claims: Vec::new(),
        offending_spans: Vec::new(),
    }
}

/// Builds a pending draft owned by `run_id`.
fn draft(run_id: &RunId, thread: bool) -> Draft {
    let tweets = vec!["tweet 1".to_string(), "tweet 2".to_string()];
    Draft {
        id: DraftId::for_run(run_id),
        run_id: run_id.clone(),
        created_at: at(0),
        expires_at: at(0).plus_hours(36),
        status: DraftStatus::Pending,
        token_consumed: false,
        consumed_at: None,
        thread_enabled: thread,
        tweets: thread.then(|| tweets.clone()),
        final_text: if thread { tweets[0].clone() } else { "single tweet".to_string() },
        materials: draftline_core::Materials::default(),
        topic_plan: TopicPlan {
            topic_bucket: 1,
            angles: vec!["angle".to_string()],
            key_points: vec!["point".to_string()],
            evidence_map: BTreeMap::new(),
        },
        style_profile: StyleProfile::default(),
        thread_plan: ThreadPlan::single(true),
        candidates: DraftCandidates {
            candidates: vec![DraftCandidate {
                mode: if thread { DraftMode::Thread } else { DraftMode::Single },
                text: (!thread).then(|| "single tweet".to_string()),
                tweets: thread.then(|| tweets.clone()),
            }],
        },
        edited_draft: EditedDraft {
            mode: if thread { DraftMode::Thread } else { DraftMode::Single },
            selected_candidate_index: 0,
            original: DraftCandidate {
                mode: if thread { DraftMode::Thread } else { DraftMode::Single },
                text: None,
                tweets: None,
            },
            final_text: Some(if thread { tweets[0].clone() } else { "single tweet".to_string() }),
            final_tweets: thread.then(|| tweets),
            numbering_added: false,
            edit_notes: String::new(),
        },
        policy_report: pass_report(),
        published_tweet_ids: None,
        approval_idempotency_key: None,
        last_error: None,
    }
}

/// Opens a store and seeds a run plus its draft.
fn seeded_store(thread: bool) -> (SqliteDraftStore, RunId, Draft) {
    let store = SqliteDraftStore::open_in_memory().unwrap();
    let run_id = RunId::new("run-1");
    store.create_run(&Run::started(run_id.clone(), "test", at(0))).unwrap();
    let draft = draft(&run_id, thread);
    assert!(store.insert_draft(&draft).unwrap());
    (store, run_id, draft)
}

// ============================================================================
// SECTION: Runs and Logs
// ============================================================================

/// Tests run creation, finalization, and stage log replacement.
#[test]
fn test_run_round_trip() {
    let store = SqliteDraftStore::open_in_memory().unwrap();
    let run_id = RunId::new("run-1");
    store.create_run(&Run::started(run_id.clone(), "scheduler", at(0))).unwrap();
    // Creating the same run again is a no-op.
    store.create_run(&Run::started(run_id.clone(), "scheduler", at(5))).unwrap();

    store
        .finish_run(&run_id, RunStatus::Completed, at(1_500), 1_500, None)
        .unwrap();
    let run = store.get_run(&run_id).unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.created_at, at(0));
    assert_eq!(run.duration_ms, Some(1_500));

    let logs = vec![StageLog {
        stage_name: "collector".to_string(),
        start_ts: at(0),
        end_ts: at(100),
        duration_ms: 100,
        input_summary: "sources=2".to_string(),
        output_summary: "Materials(git_commits=1, notes=0, links=0, errors=0)".to_string(),
        errors: None,
        warnings: vec!["source:rss failed: timeout".to_string()],
    }];
    store.replace_stage_logs(&run_id, &logs).unwrap();
    store.replace_stage_logs(&run_id, &logs).unwrap();
    let loaded = store.stage_logs(&run_id).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].warnings, logs[0].warnings);
}

/// Tests a run error is truncated to the storage limit.
#[test]
fn test_run_error_truncated() {
    let store = SqliteDraftStore::open_in_memory().unwrap();
    let run_id = RunId::new("run-err");
    store.create_run(&Run::started(run_id.clone(), "manual", at(0))).unwrap();
    let long_error = "x".repeat(900);
    store
        .finish_run(&run_id, RunStatus::Failed, at(10), 10, Some(&long_error))
        .unwrap();
    let run = store.get_run(&run_id).unwrap().unwrap();
    assert_eq!(run.last_error.unwrap().len(), 500);
}

// ============================================================================
// SECTION: Drafts
// ============================================================================

/// Tests draft insert is idempotent and the snapshot round-trips.
#[test]
fn test_draft_round_trip_and_idempotent_insert() {
    let (store, run_id, draft) = seeded_store(true);
    // Re-inserting the deterministic draft id reports "already present".
    assert!(!store.insert_draft(&draft).unwrap());
    assert_eq!(draft.id, DraftId::for_run(&run_id));

    let loaded = store.get_draft(&draft.id).unwrap().unwrap();
    assert_eq!(loaded, draft);
}

/// Tests text updates and policy updates change status together.
#[test]
fn test_draft_edit_and_policy_update() {
    let (store, _run_id, draft) = seeded_store(false);
    store.update_draft_texts(&draft.id, "edited body", None).unwrap();
    let mut report = pass_report();
    report.action = PolicyAction::Rewrite;
    report.risk_level = RiskLevel::Medium;
    store
        .update_draft_policy(&draft.id, &report, DraftStatus::NeedsHumanAttention, at(50))
        .unwrap();
    let loaded = store.get_draft(&draft.id).unwrap().unwrap();
    assert_eq!(loaded.final_text, "edited body");
    assert_eq!(loaded.status, DraftStatus::NeedsHumanAttention);
    assert_eq!(loaded.policy_report.action, PolicyAction::Rewrite);
}

// ============================================================================
// SECTION: Action Tokens
// ============================================================================

/// Tests the token hash uniqueness contract.
#[test]
fn test_token_hash_unique() {
    let (store, _run_id, draft) = seeded_store(false);
    let token = ActionToken {
        draft_id: draft.id.clone(),
        action: TokenAction::Approve,
        token_hash: "a".repeat(64),
        created_at: at(0),
        expires_at: at(0).plus_hours(36),
        one_time: true,
        consumed_at: None,
    };
    store.insert_action_token(&token).unwrap();
    let second = store.insert_action_token(&token);
    assert!(matches!(second, Err(StoreError::Conflict(_))));

    let found = store
        .find_action_token(TokenAction::Approve, &token.token_hash)
        .unwrap()
        .unwrap();
    assert_eq!(found.draft_id, draft.id);
    assert!(found.one_time);

    store
        .consume_action_token(TokenAction::Approve, &token.token_hash, at(100))
        .unwrap();
    // Consumption is first-writer-wins.
    store
        .consume_action_token(TokenAction::Approve, &token.token_hash, at(200))
        .unwrap();
    let consumed = store
        .find_action_token(TokenAction::Approve, &token.token_hash)
        .unwrap()
        .unwrap();
    assert_eq!(consumed.consumed_at, Some(at(100)));
}

// ============================================================================
// SECTION: Publish Attempts and Posts
// ============================================================================

/// Builds a started attempt row.
fn attempt(draft_id: &DraftId, number: u32) -> PublishAttempt {
    PublishAttempt {
        draft_id: draft_id.clone(),
        attempt: number,
        owner: Some(format!("owner-{number}")),
        status: AttemptStatus::Started,
        created_at: at(0),
        completed_at: None,
        last_error: None,
    }
}

/// Tests the `(draft_id, attempt)` lease rejects a second taker.
#[test]
fn test_publish_attempt_lease() {
    let (store, _run_id, draft) = seeded_store(true);
    store.begin_publish_attempt(&attempt(&draft.id, 1), None).unwrap();
    let second = store.begin_publish_attempt(&attempt(&draft.id, 1), None);
    assert!(matches!(second, Err(StoreError::Conflict(_))));
    let publishing = store.get_draft(&draft.id).unwrap().unwrap();
    assert_eq!(publishing.status, DraftStatus::Publishing);
}

/// Tests the attempt lease consumes the approve token in the same write.
#[test]
fn test_publish_attempt_consumes_token() {
    let (store, _run_id, draft) = seeded_store(true);
    let token = ActionToken {
        draft_id: draft.id.clone(),
        action: TokenAction::Approve,
        token_hash: "b".repeat(64),
        created_at: at(0),
        expires_at: at(0).plus_hours(36),
        one_time: true,
        consumed_at: None,
    };
    store.insert_action_token(&token).unwrap();
    store
        .begin_publish_attempt(&attempt(&draft.id, 1), Some(&token.token_hash))
        .unwrap();
    let consumed = store
        .find_action_token(TokenAction::Approve, &token.token_hash)
        .unwrap()
        .unwrap();
    assert!(consumed.consumed_at.is_some());
}

/// Tests post uniqueness on position, tweet id, and idempotency key.
#[test]
fn test_post_uniqueness_contracts() {
    let (store, _run_id, draft) = seeded_store(true);
    let post = Post {
        draft_id: draft.id.clone(),
        position: 1,
        tweet_id: "tweet-100".to_string(),
        content: "tweet 1".to_string(),
        posted_at: at(10),
        publish_idempotency_key: draft.publish_key(1),
    };
    store.insert_post(&post).unwrap();

    let duplicate_position = Post { tweet_id: "tweet-101".to_string(), ..post.clone() };
    assert!(matches!(store.insert_post(&duplicate_position), Err(StoreError::Conflict(_))));

    let duplicate_tweet = Post {
        position: 2,
        publish_idempotency_key: draft.publish_key(2),
        ..post.clone()
    };
    assert!(matches!(store.insert_post(&duplicate_tweet), Err(StoreError::Conflict(_))));

    let posts = store.posts_for_draft(&draft.id).unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].tweet_id, "tweet-100");
}

/// Tests attempt completion finalizes the draft in the same transaction.
#[test]
fn test_complete_attempt_finalizes_draft() {
    let (store, _run_id, draft) = seeded_store(true);
    store.begin_publish_attempt(&attempt(&draft.id, 1), None).unwrap();
    let ids = vec!["tweet-1".to_string(), "tweet-2".to_string()];
    store
        .complete_publish_attempt(
            &draft.id,
            1,
            at(500),
            DraftStatus::Posted,
            &ids,
            &draft.approval_key(),
        )
        .unwrap();
    let loaded = store.get_draft(&draft.id).unwrap().unwrap();
    assert_eq!(loaded.status, DraftStatus::Posted);
    assert!(loaded.token_consumed);
    assert_eq!(loaded.consumed_at, Some(at(500)));
    assert_eq!(loaded.published_tweet_ids.unwrap(), ids);
    assert_eq!(loaded.approval_idempotency_key.unwrap(), draft.approval_key());
    let latest = store.latest_publish_attempt(&draft.id).unwrap().unwrap();
    assert_eq!(latest.status, AttemptStatus::Completed);
}

/// Tests a failed attempt marks the draft and truncates the error.
#[test]
fn test_fail_attempt_marks_draft_error() {
    let (store, _run_id, draft) = seeded_store(false);
    store.begin_publish_attempt(&attempt(&draft.id, 1), None).unwrap();
    store
        .fail_publish_attempt(&draft.id, 1, at(300), &"boom".repeat(400))
        .unwrap();
    let loaded = store.get_draft(&draft.id).unwrap().unwrap();
    assert_eq!(loaded.status, DraftStatus::Error);
    assert_eq!(loaded.last_error.unwrap().len(), 500);
    let latest = store.latest_publish_attempt(&draft.id).unwrap().unwrap();
    assert_eq!(latest.status, AttemptStatus::Failed);
}

// ============================================================================
// SECTION: Windows, Profiles, Config
// ============================================================================

/// Tests the recent-posts window and ordering.
#[test]
fn test_recent_posts_window() {
    let (store, _run_id, draft) = seeded_store(true);
    for (position, offset) in [(1_u32, 0_i64), (2, 1_000), (3, 2_000)] {
        store
            .insert_post(&Post {
                draft_id: draft.id.clone(),
                position,
                tweet_id: format!("tweet-{position}"),
                content: format!("content {position}"),
                posted_at: at(offset),
                publish_idempotency_key: draft.publish_key(position),
            })
            .unwrap();
    }
    let recent = store.recent_posts(at(500), 10).unwrap();
    assert_eq!(recent, vec!["content 3".to_string(), "content 2".to_string()]);
    let windowed = store.posts_in_window(at(0), at(1_500)).unwrap();
    assert_eq!(windowed, vec!["content 2".to_string(), "content 1".to_string()]);
}

/// Tests the weekly-report window uniqueness contract.
#[test]
fn test_weekly_report_window_unique() {
    let store = SqliteDraftStore::open_in_memory().unwrap();
    let report = WeeklyReport {
        week_start: at(0),
        week_end: at(7 * 24 * 3_600 * 1_000),
        top_topic_buckets: vec!["Engineering".to_string()],
        recommendations: Vec::new(),
        next_week_topics: Vec::new(),
    };
    assert!(store.save_weekly_report(&report, at(0)).unwrap());
    assert!(!store.save_weekly_report(&report, at(10)).unwrap());
}

/// Tests style profiles return the newest row.
#[test]
fn test_latest_style_profile() {
    let store = SqliteDraftStore::open_in_memory().unwrap();
    assert!(store.latest_style_profile().unwrap().is_none());
    let old = StyleProfile {
        preferred_openers: vec!["Old:".to_string()],
        ..StyleProfile::default()
    };
    let new = StyleProfile {
        preferred_openers: vec!["New:".to_string()],
        ..StyleProfile::default()
    };
    store.save_style_profile(&old, at(0)).unwrap();
    store.save_style_profile(&new, at(1_000)).unwrap();
    let latest = store.latest_style_profile().unwrap().unwrap();
    assert_eq!(latest.preferred_openers, vec!["New:".to_string()]);
}

/// Tests app config upsert semantics.
#[test]
fn test_app_config_upsert() {
    let store = SqliteDraftStore::open_in_memory().unwrap();
    assert!(store.get_app_config("REWRITE_MAX").unwrap().is_none());
    store.set_app_config("REWRITE_MAX", &json!({"value": 2}), at(0)).unwrap();
    store.set_app_config("REWRITE_MAX", &json!({"value": 3}), at(10)).unwrap();
    let value = store.get_app_config("REWRITE_MAX").unwrap().unwrap();
    assert_eq!(value, json!({"value": 3}));
}

/// Tests the store opens against a real file path.
#[test]
fn test_opens_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = SqliteStoreConfig::at(dir.path().join("draftline.db"));
    let store = SqliteDraftStore::open(&config).unwrap();
    let run_id = RunId::new("run-disk");
    store.create_run(&Run::started(run_id.clone(), "manual", at(0))).unwrap();
    assert!(store.get_run(&run_id).unwrap().is_some());
}

// crates/draftline-core/tests/tokens.rs
// ============================================================================
// Module: Action Token Tests
// Description: Hashing, TTL, and one-time semantics for action tokens.
// ============================================================================
//! ## Overview
//! Verifies the bearer string never reaches the store, expired tokens resolve
//! without consumption, and one-time tokens resolve exactly once.

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

use common::at;
use common::pending_draft;
use draftline_core::DraftStore;
use draftline_core::InMemoryDraftStore;
use draftline_core::RunId;
use draftline_core::TokenAction;
use draftline_core::hashing::hash_bytes;
use draftline_core::runtime::tokens;
use draftline_core::runtime::tokens::TokenResolution;

/// Seeds a store with one pending draft and its token set.
fn seeded() -> (InMemoryDraftStore, draftline_core::ReviewTokens, draftline_core::DraftId) {
    let store = InMemoryDraftStore::new();
    let run_id = RunId::new("run-tokens");
    let draft = pending_draft(&run_id, &["Fixed login redirect bug and shipped it."]);
    let draft_id = draft.id.clone();
    store.insert_draft(&draft).unwrap();
    let raw =
        tokens::issue_review_tokens(&store, &draft_id, at(0), at(0).plus_hours(36)).unwrap();
    (store, raw, draft_id)
}

/// Tests no bearer string is persisted; only its SHA-256 hash is.
#[test]
fn test_bearer_is_stored_hashed() {
    let (store, raw, draft_id) = seeded();
    let rows = store.tokens_for_draft(&draft_id).unwrap();
    assert_eq!(rows.len(), 5);
    let raws =
        [&raw.view, &raw.edit, &raw.regenerate, &raw.approve, &raw.skip];
    for bearer in raws {
        assert!(rows.iter().all(|row| row.token_hash != *bearer));
        let expected = hash_bytes(bearer.as_bytes()).value;
        assert!(rows.iter().any(|row| row.token_hash == expected));
    }
    // 256-bit bearer material, URL-safe base64 without padding.
    assert_eq!(raw.approve.len(), 43);
    assert!(!raw.approve.contains('='));
}

/// Tests resolution succeeds and returns the bound draft.
#[test]
fn test_resolve_ok() {
    let (store, raw, draft_id) = seeded();
    let resolution =
        tokens::resolve(&store, TokenAction::Approve, &raw.approve, at(1_000)).unwrap();
    match resolution {
        TokenResolution::Ok { draft, token } => {
            assert_eq!(draft.id, draft_id);
            assert_eq!(token.action, TokenAction::Approve);
        }
        other => panic!("expected ok, got {other:?}"),
    }
    // The wrong action namespace does not resolve the same bearer.
    let wrong =
        tokens::resolve(&store, TokenAction::Skip, &raw.approve, at(1_000)).unwrap();
    assert!(matches!(wrong, TokenResolution::NotFound));
}

/// Tests an expired token resolves as expired and is not consumed.
#[test]
fn test_expired_token_not_consumed() {
    let (store, raw, draft_id) = seeded();
    let after_ttl = at(0).plus_hours(37);
    let resolution =
        tokens::resolve(&store, TokenAction::Approve, &raw.approve, after_ttl).unwrap();
    match resolution {
        TokenResolution::Expired(row) => assert!(row.consumed_at.is_none()),
        other => panic!("expected expired, got {other:?}"),
    }
    let rows = store.tokens_for_draft(&draft_id).unwrap();
    assert!(rows.iter().all(|row| row.consumed_at.is_none()));
}

/// Tests one-time tokens resolve as consumed after consumption.
#[test]
fn test_one_time_consumption() {
    let (store, raw, _draft_id) = seeded();
    let resolution =
        tokens::resolve(&store, TokenAction::Approve, &raw.approve, at(1_000)).unwrap();
    let TokenResolution::Ok { token, .. } = resolution else {
        panic!("expected ok resolution");
    };
    tokens::consume(&store, &token, at(2_000)).unwrap();
    let second =
        tokens::resolve(&store, TokenAction::Approve, &raw.approve, at(3_000)).unwrap();
    assert!(matches!(second, TokenResolution::Consumed(_)));
}

/// Tests multi-use tokens survive consumption attempts.
#[test]
fn test_multi_use_tokens_are_not_consumed() {
    let (store, raw, _draft_id) = seeded();
    for _ in 0..3 {
        let resolution =
            tokens::resolve(&store, TokenAction::Edit, &raw.edit, at(1_000)).unwrap();
        let TokenResolution::Ok { token, .. } = resolution else {
            panic!("expected ok resolution");
        };
        // Consumption is a no-op for multi-use actions.
        tokens::consume(&store, &token, at(2_000)).unwrap();
    }
    let last = tokens::resolve(&store, TokenAction::Edit, &raw.edit, at(5_000)).unwrap();
    assert!(matches!(last, TokenResolution::Ok { .. }));
}

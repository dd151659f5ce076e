// crates/draftline-core/src/runtime/tokens.rs
// ============================================================================
// Module: Action Token Runtime
// Description: Issuance, resolution, and consumption of action tokens.
// Purpose: Provide hashed single-use capabilities with TTLs over the store.
// Dependencies: crate::{core, interfaces}, base64, rand
// ============================================================================

//! ## Overview
//! Bearer strings carry 256 bits of OS entropy, URL-safe base64 encoded.
//! Only the SHA-256 hash reaches the store; a hash collision on insert is
//! retried with fresh randomness. Resolution distinguishes `not_found`,
//! `expired`, and `consumed` without mutating anything; consumption is a
//! separate explicit step taken only for one-time actions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::core::draft::Draft;
use crate::core::draft::ReviewTokens;
use crate::core::hashing::hash_bytes;
use crate::core::identifiers::DraftId;
use crate::core::time::Timestamp;
use crate::core::token::ActionToken;
use crate::core::token::TokenAction;
use crate::interfaces::DraftStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Bearer entropy in bytes (256 bits).
const TOKEN_ENTROPY_BYTES: usize = 32;
/// Issuance retries on a hash collision before giving up.
const MAX_COLLISION_RETRIES: u32 = 4;

// ============================================================================
// SECTION: Bearer Helpers
// ============================================================================

/// Generates a fresh URL-safe bearer string.
#[must_use]
pub fn generate_bearer() -> String {
    let mut bytes = [0_u8; TOKEN_ENTROPY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hashes a bearer string to its persisted form.
#[must_use]
pub fn hash_token(raw: &str) -> String {
    hash_bytes(raw.as_bytes()).value
}

// ============================================================================
// SECTION: Issuance
// ============================================================================

/// Issues one token for an action, retrying on hash collisions.
///
/// # Errors
///
/// Returns [`StoreError`] when the insert keeps colliding or the store fails.
fn issue_one<S: DraftStore>(
    store: &S,
    draft_id: &DraftId,
    action: TokenAction,
    created_at: Timestamp,
    expires_at: Timestamp,
) -> Result<String, StoreError> {
    let mut last_conflict: Option<StoreError> = None;
    for _ in 0..MAX_COLLISION_RETRIES {
        let raw = generate_bearer();
        let token = ActionToken {
            draft_id: draft_id.clone(),
            action,
            token_hash: hash_token(&raw),
            created_at,
            expires_at,
            one_time: action.one_time(),
            consumed_at: None,
        };
        match store.insert_action_token(&token) {
            Ok(()) => return Ok(raw),
            Err(StoreError::Conflict(message)) => {
                last_conflict = Some(StoreError::Conflict(message));
            }
            Err(err) => return Err(err),
        }
    }
    Err(last_conflict
        .unwrap_or_else(|| StoreError::Conflict("token issuance exhausted retries".to_string())))
}

/// Issues the full token set for a draft atomically enough for review: the
/// bearer strings are returned once and never persisted.
///
/// # Errors
///
/// Returns [`StoreError`] when any insert fails.
pub fn issue_review_tokens<S: DraftStore>(
    store: &S,
    draft_id: &DraftId,
    created_at: Timestamp,
    expires_at: Timestamp,
) -> Result<ReviewTokens, StoreError> {
    let view = issue_one(store, draft_id, TokenAction::View, created_at, expires_at)?;
    let edit = issue_one(store, draft_id, TokenAction::Edit, created_at, expires_at)?;
    let regenerate =
        issue_one(store, draft_id, TokenAction::Regenerate, created_at, expires_at)?;
    let approve = issue_one(store, draft_id, TokenAction::Approve, created_at, expires_at)?;
    let skip = issue_one(store, draft_id, TokenAction::Skip, created_at, expires_at)?;
    Ok(ReviewTokens { view, edit, regenerate, approve, skip })
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Outcome of resolving a bearer string.
#[derive(Debug)]
pub enum TokenResolution {
    /// No token row matches, or the draft is gone.
    NotFound,
    /// The token exists but its TTL elapsed.
    Expired(ActionToken),
    /// The one-time token was already consumed.
    Consumed(ActionToken),
    /// The token is valid; the draft and row are returned.
    Ok {
        /// The draft the token is bound to.
        draft: Box<Draft>,
        /// The matching token row.
        token: ActionToken,
    },
}

/// Resolves a raw bearer string for an action without mutating state.
///
/// # Errors
///
/// Returns [`StoreError`] when the store fails.
pub fn resolve<S: DraftStore>(
    store: &S,
    action: TokenAction,
    raw: &str,
    now: Timestamp,
) -> Result<TokenResolution, StoreError> {
    let Some(token) = store.find_action_token(action, &hash_token(raw))? else {
        return Ok(TokenResolution::NotFound);
    };
    if now > token.expires_at {
        return Ok(TokenResolution::Expired(token));
    }
    if token.one_time && token.consumed_at.is_some() {
        return Ok(TokenResolution::Consumed(token));
    }
    let Some(draft) = store.get_draft(&token.draft_id)? else {
        return Ok(TokenResolution::NotFound);
    };
    Ok(TokenResolution::Ok { draft: Box::new(draft), token })
}

/// Consumes a token if and only if it is one-time.
///
/// # Errors
///
/// Returns [`StoreError`] when the write fails.
pub fn consume<S: DraftStore>(
    store: &S,
    token: &ActionToken,
    now: Timestamp,
) -> Result<(), StoreError> {
    if token.one_time {
        store.consume_action_token(token.action, &token.token_hash, now)?;
    }
    Ok(())
}

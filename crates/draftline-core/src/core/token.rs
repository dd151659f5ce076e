// crates/draftline-core/src/core/token.rs
// ============================================================================
// Module: Draftline Action Tokens
// Description: Typed, hashed, TTL'd bearer capabilities bound to drafts.
// Purpose: Define the token record and the fixed per-action semantics.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Action tokens are opaque URL-safe random bearer strings. Only their
//! SHA-256 hash is persisted; the bearer string exists in memory and in the
//! out-of-band notification, nowhere else. Token actions have fixed
//! semantics: `view`, `edit`, and `regenerate` are multi-use; `approve` and
//! `skip` are single-use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::DraftId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Token Actions
// ============================================================================

/// The verb a token authorizes against its draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenAction {
    /// Read the draft and its policy report.
    View,
    /// Replace the draft texts.
    Edit,
    /// Publish the draft.
    Approve,
    /// Discard the draft.
    Skip,
    /// Re-run generation from the stored plans.
    Regenerate,
}

impl TokenAction {
    /// Every token action, in issuance order.
    pub const ALL: [Self; 5] =
        [Self::View, Self::Edit, Self::Regenerate, Self::Approve, Self::Skip];

    /// Returns a stable label for the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
            Self::Approve => "approve",
            Self::Skip => "skip",
            Self::Regenerate => "regenerate",
        }
    }

    /// Returns true when tokens for this action are single-use.
    #[must_use]
    pub const fn one_time(self) -> bool {
        matches!(self, Self::Approve | Self::Skip)
    }
}

// ============================================================================
// SECTION: Token Record
// ============================================================================

/// Persisted action token row.
///
/// # Invariants
/// - `token_hash` is unique and is the SHA-256 of the bearer string; the
///   bearer string itself is never persisted.
/// - `consumed_at` is set only for one-time actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionToken {
    /// Owning draft identifier.
    pub draft_id: DraftId,
    /// Authorized action.
    pub action: TokenAction,
    /// Lowercase hex SHA-256 of the bearer string.
    pub token_hash: String,
    /// Issuance timestamp.
    pub created_at: Timestamp,
    /// Expiry timestamp.
    pub expires_at: Timestamp,
    /// True when the token is single-use.
    pub one_time: bool,
    /// Consumption timestamp for one-time tokens.
    pub consumed_at: Option<Timestamp>,
}

// crates/draftline-core/src/core/draft.rs
// ============================================================================
// Module: Draftline Draft Records
// Description: Drafts, published posts, publish attempts, and review packets.
// Purpose: Define the persisted review-and-publish state machine records.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A draft is born on pipeline success and dies by consumption (approve or
//! skip) or TTL. Posts record each published tweet exactly once; publish
//! attempts are the serialization primitive that lets at most one worker
//! publish a given draft at a time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::evidence::Materials;
use crate::core::identifiers::DraftId;
use crate::core::identifiers::RunId;
use crate::core::plan::DraftCandidates;
use crate::core::plan::EditedDraft;
use crate::core::plan::StyleProfile;
use crate::core::plan::ThreadPlan;
use crate::core::plan::TopicPlan;
use crate::core::report::PolicyReport;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Draft Status
// ============================================================================

/// Draft lifecycle status.
///
/// # Invariants
/// - Variants are stable for serialization and storage.
/// - `token_consumed` on the draft is true exactly for the terminal statuses
///   `posted`, `dry_run_posted`, and `skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    /// Awaiting reviewer decision.
    Pending,
    /// Policy held the draft for a human.
    NeedsHumanAttention,
    /// A publish attempt holds the lease.
    Publishing,
    /// Published to the downstream API.
    Posted,
    /// Published in dry-run mode with synthesized ids.
    DryRunPosted,
    /// Reviewer skipped the draft.
    Skipped,
    /// Publication failed after retries.
    Error,
}

impl DraftStatus {
    /// Returns a stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::NeedsHumanAttention => "needs_human_attention",
            Self::Publishing => "publishing",
            Self::Posted => "posted",
            Self::DryRunPosted => "dry_run_posted",
            Self::Skipped => "skipped",
            Self::Error => "error",
        }
    }

    /// Returns true for statuses that end the draft lifecycle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Posted | Self::DryRunPosted | Self::Skipped)
    }
}

// ============================================================================
// SECTION: Draft Record
// ============================================================================

/// A persisted pipeline output awaiting a human decision.
///
/// # Invariants
/// - `thread_enabled` implies `tweets` is non-empty and `final_text` equals
///   the first tweet.
/// - `approval_idempotency_key` is unique across all drafts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Draft identifier, derived deterministically from the run.
    pub id: DraftId,
    /// Owning run identifier.
    pub run_id: RunId,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Expiry timestamp shared with the draft's action tokens.
    pub expires_at: Timestamp,
    /// Lifecycle status.
    pub status: DraftStatus,
    /// True once an approve or skip decision consumed the draft.
    pub token_consumed: bool,
    /// Consumption timestamp, set with `token_consumed`.
    pub consumed_at: Option<Timestamp>,
    /// True when the draft is a thread.
    pub thread_enabled: bool,
    /// Thread tweet bodies, present when `thread_enabled`.
    pub tweets: Option<Vec<String>>,
    /// Final single-post body, or the first tweet in thread mode.
    pub final_text: String,
    /// Materials snapshot the draft was generated from.
    pub materials: Materials,
    /// Topic plan snapshot.
    pub topic_plan: TopicPlan,
    /// Style profile snapshot.
    pub style_profile: StyleProfile,
    /// Thread plan snapshot.
    pub thread_plan: ThreadPlan,
    /// Writer candidate snapshot.
    pub candidates: DraftCandidates,
    /// Critic output snapshot.
    pub edited_draft: EditedDraft,
    /// Latest policy report.
    pub policy_report: PolicyReport,
    /// Tweet ids recorded at successful publication.
    pub published_tweet_ids: Option<Vec<String>>,
    /// Approval idempotency key, set at successful publication.
    pub approval_idempotency_key: Option<String>,
    /// Last publish error, truncated for storage.
    pub last_error: Option<String>,
}

impl Draft {
    /// Returns the approval idempotency key for this draft.
    #[must_use]
    pub fn approval_key(&self) -> String {
        format!("approve:{}", self.id)
    }

    /// Returns the publish idempotency key for a tweet position.
    #[must_use]
    pub fn publish_key(&self, position: u32) -> String {
        format!("{}:{position}", self.id)
    }
}

// ============================================================================
// SECTION: Post Record
// ============================================================================

/// One published tweet.
///
/// # Invariants
/// - `(draft_id, position)` is unique; `tweet_id` is unique;
///   `publish_idempotency_key` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Owning draft identifier.
    pub draft_id: DraftId,
    /// 1-based position within the composed tweet list.
    pub position: u32,
    /// Downstream tweet identifier.
    pub tweet_id: String,
    /// Tweet body as published.
    pub content: String,
    /// Publication timestamp.
    pub posted_at: Timestamp,
    /// Canonical key `"{draft_id}:{position}"` making the insert retry-safe.
    pub publish_idempotency_key: String,
}

// ============================================================================
// SECTION: Publish Attempts
// ============================================================================

/// Publish attempt lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Attempt holds the publish lease.
    Started,
    /// Attempt finished publishing every position.
    Completed,
    /// Attempt gave up after an unrecoverable failure.
    Failed,
}

impl AttemptStatus {
    /// Returns a stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Serialization primitive guarding publication of one draft.
///
/// # Invariants
/// - `(draft_id, attempt)` is unique; the insert is the lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishAttempt {
    /// Owning draft identifier.
    pub draft_id: DraftId,
    /// 1-based attempt number.
    pub attempt: u32,
    /// Worker identity that opened the attempt.
    pub owner: Option<String>,
    /// Attempt lifecycle status.
    pub status: AttemptStatus,
    /// Attempt creation timestamp.
    pub created_at: Timestamp,
    /// Attempt completion timestamp.
    pub completed_at: Option<Timestamp>,
    /// Last error recorded for the attempt, truncated for storage.
    pub last_error: Option<String>,
}

// ============================================================================
// SECTION: Review Packet
// ============================================================================

/// Action links handed to the notifier for one draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewTokens {
    /// Multi-use view token (raw bearer string, never persisted).
    pub view: String,
    /// Multi-use edit token.
    pub edit: String,
    /// Multi-use regenerate token.
    pub regenerate: String,
    /// One-time approve token.
    pub approve: String,
    /// One-time skip token.
    pub skip: String,
}

/// Everything the notifier needs to announce a draft for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPacket {
    /// Draft identifier.
    pub draft_id: DraftId,
    /// Raw bearer tokens for the reviewer links.
    pub tokens: ReviewTokens,
    /// Rendering mode label (`single` or `thread`).
    pub mode: String,
    /// Single-post body, when present.
    pub text: Option<String>,
    /// Thread tweet bodies, when present.
    pub tweets: Option<Vec<String>>,
    /// Policy report attached for reviewer context.
    pub policy_report: PolicyReport,
}

/// Best-effort delivery outcome from the notifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResult {
    /// True when the email channel accepted the message.
    pub email_sent: bool,
    /// True when the webhook channel accepted the message.
    pub webhook_sent: bool,
    /// Per-channel delivery errors.
    #[serde(default)]
    pub errors: Vec<String>,
}

// ============================================================================
// SECTION: Weekly Report
// ============================================================================

/// Weekly content summary generated from the posts in a window.
///
/// # Invariants
/// - `(week_start, week_end)` is unique in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyReport {
    /// Window start (inclusive).
    pub week_start: Timestamp,
    /// Window end (exclusive).
    pub week_end: Timestamp,
    /// Most-covered topic buckets.
    #[serde(default)]
    pub top_topic_buckets: Vec<String>,
    /// Recommendations for the coming week.
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Suggested topics for the coming week.
    #[serde(default)]
    pub next_week_topics: Vec<String>,
}

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// Append-only record of a reviewer action and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event timestamp.
    pub created_at: Timestamp,
    /// Acting principal label (`token`, `session:<user>`, `system`).
    pub actor: String,
    /// Action verb (`approve`, `skip`, `edit`, `regenerate`, `resume`).
    pub action: String,
    /// Subject identifier, usually a draft id.
    pub subject: String,
    /// Outcome detail, terse.
    pub detail: String,
}

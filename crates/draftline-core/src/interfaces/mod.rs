// crates/draftline-core/src/interfaces/mod.rs
// ============================================================================
// Module: Draftline Interfaces
// Description: Backend-agnostic interfaces for storage, models, sources, and delivery.
// Purpose: Define the contract surfaces used by the Draftline runtime.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how Draftline integrates with external systems without
//! embedding backend-specific details. The store is the single source of
//! truth: every method that mutates more than one row must be atomic in the
//! implementing backend, and contended updates rely on unique constraints
//! surfaced as [`StoreError::Conflict`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use thiserror::Error;

use crate::core::draft::AuditEvent;
use crate::core::draft::Draft;
use crate::core::draft::DraftStatus;
use crate::core::draft::NotificationResult;
use crate::core::draft::Post;
use crate::core::draft::PublishAttempt;
use crate::core::draft::ReviewPacket;
use crate::core::draft::WeeklyReport;
use crate::core::evidence::EvidenceItem;
use crate::core::identifiers::DraftId;
use crate::core::identifiers::RunId;
use crate::core::plan::DraftCandidates;
use crate::core::plan::EditedDraft;
use crate::core::plan::StyleProfile;
use crate::core::report::PolicyReport;
use crate::core::run::Run;
use crate::core::run::RunStatus;
use crate::core::run::StageLog;
use crate::core::time::Timestamp;
use crate::core::token::ActionToken;
use crate::core::token::TokenAction;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Host-supplied time source.
///
/// The core never reads wall-clock time directly; orchestration, token TTL
/// checks, and publish finalization all go through this seam so tests can
/// replay fixed timelines.
pub trait Clock {
    /// Returns the current UTC time.
    fn now(&self) -> Timestamp;
}

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Draft store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("draft store io error: {0}")]
    Io(String),
    /// Backend engine error.
    #[error("draft store error: {0}")]
    Store(String),
    /// Stored data is corrupted or fails integrity checks.
    #[error("draft store corruption: {0}")]
    Corrupt(String),
    /// Stored data is invalid.
    #[error("draft store invalid data: {0}")]
    Invalid(String),
    /// A uniqueness contract rejected the write.
    #[error("draft store conflict: {0}")]
    Conflict(String),
}

// ============================================================================
// SECTION: Draft Store
// ============================================================================

/// Durable store for runs, drafts, posts, attempts, tokens, and settings.
///
/// # Invariants
/// - Each method is atomic: either every row it touches is written or none.
/// - Unique-constraint violations surface as [`StoreError::Conflict`].
pub trait DraftStore {
    // ------------------------------------------------------------------
    // Runs
    // ------------------------------------------------------------------

    /// Inserts a new run row. Inserting an existing run id is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn create_run(&self, run: &Run) -> Result<(), StoreError>;

    /// Loads a run by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get_run(&self, run_id: &RunId) -> Result<Option<Run>, StoreError>;

    /// Finalizes a run with status, duration, and optional error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn finish_run(
        &self,
        run_id: &RunId,
        status: RunStatus,
        finished_at: Timestamp,
        duration_ms: i64,
        last_error: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Atomically replaces the stage logs recorded for a run.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn replace_stage_logs(&self, run_id: &RunId, logs: &[StageLog]) -> Result<(), StoreError>;

    /// Loads the stage logs for a run in execution order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn stage_logs(&self, run_id: &RunId) -> Result<Vec<StageLog>, StoreError>;

    // ------------------------------------------------------------------
    // Drafts
    // ------------------------------------------------------------------

    /// Inserts a draft. Returns false when a draft with the same id already
    /// exists (idempotent re-creation within a retried run).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn insert_draft(&self, draft: &Draft) -> Result<bool, StoreError>;

    /// Loads a draft by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get_draft(&self, draft_id: &DraftId) -> Result<Option<Draft>, StoreError>;

    /// Replaces the draft texts (single body or thread bodies).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn update_draft_texts(
        &self,
        draft_id: &DraftId,
        final_text: &str,
        tweets: Option<&[String]>,
    ) -> Result<(), StoreError>;

    /// Stores a fresh policy report, recomputes the draft status, and appends
    /// a `policy_reports` history row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn update_draft_policy(
        &self,
        draft_id: &DraftId,
        report: &PolicyReport,
        status: DraftStatus,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    /// Replaces the generation snapshots after a regenerate.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn update_draft_generation(
        &self,
        draft_id: &DraftId,
        candidates: &DraftCandidates,
        edited: &EditedDraft,
        report: &PolicyReport,
        status: DraftStatus,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    /// Marks a draft skipped and consumed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn mark_draft_skipped(&self, draft_id: &DraftId, now: Timestamp) -> Result<(), StoreError>;

    // ------------------------------------------------------------------
    // Action tokens
    // ------------------------------------------------------------------

    /// Inserts an action token row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] on a `token_hash` collision; callers
    /// retry issuance with fresh randomness.
    fn insert_action_token(&self, token: &ActionToken) -> Result<(), StoreError>;

    /// Looks up a token by action and bearer hash.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn find_action_token(
        &self,
        action: TokenAction,
        token_hash: &str,
    ) -> Result<Option<ActionToken>, StoreError>;

    /// Sets `consumed_at` for a one-time token.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn consume_action_token(
        &self,
        action: TokenAction,
        token_hash: &str,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    // ------------------------------------------------------------------
    // Publication
    // ------------------------------------------------------------------

    /// Loads the publish attempt with the highest attempt number.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn latest_publish_attempt(
        &self,
        draft_id: &DraftId,
    ) -> Result<Option<PublishAttempt>, StoreError>;

    /// Opens a publish attempt: inserts the attempt row, moves the draft to
    /// `publishing`, and consumes the approve token — all in one transaction.
    /// The `(draft_id, attempt)` unique constraint is the lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the attempt row already exists.
    fn begin_publish_attempt(
        &self,
        attempt: &PublishAttempt,
        approve_token_hash: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Finalizes a successful publication: marks the attempt completed and
    /// the draft terminal with its published ids and approval key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn complete_publish_attempt(
        &self,
        draft_id: &DraftId,
        attempt: u32,
        completed_at: Timestamp,
        final_status: DraftStatus,
        published_tweet_ids: &[String],
        approval_idempotency_key: &str,
    ) -> Result<(), StoreError>;

    /// Records an unrecoverable publish failure on the attempt and draft.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn fail_publish_attempt(
        &self,
        draft_id: &DraftId,
        attempt: u32,
        failed_at: Timestamp,
        error: &str,
    ) -> Result<(), StoreError>;

    /// Loads the posts already persisted for a draft, ordered by position.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn posts_for_draft(&self, draft_id: &DraftId) -> Result<Vec<Post>, StoreError>;

    /// Inserts one published post.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when an idempotency key already
    /// exists; callers treat that as success and rehydrate.
    fn insert_post(&self, post: &Post) -> Result<(), StoreError>;

    /// Returns the contents of posts published after `since`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn recent_posts(&self, since: Timestamp, limit: usize) -> Result<Vec<String>, StoreError>;

    /// Returns the contents of posts published in `[start, end)`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn posts_in_window(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<String>, StoreError>;

    // ------------------------------------------------------------------
    // Style, weekly, config, audit
    // ------------------------------------------------------------------

    /// Appends a style profile row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn save_style_profile(
        &self,
        profile: &StyleProfile,
        created_at: Timestamp,
    ) -> Result<(), StoreError>;

    /// Loads the most recently saved style profile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn latest_style_profile(&self) -> Result<Option<StyleProfile>, StoreError>;

    /// Persists a weekly report. Returns false when the window already has a
    /// report (the `(week_start, week_end)` contract).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn save_weekly_report(
        &self,
        report: &WeeklyReport,
        created_at: Timestamp,
    ) -> Result<bool, StoreError>;

    /// Reads a runtime configuration override.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get_app_config(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Writes a runtime configuration override.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn set_app_config(
        &self,
        key: &str,
        value: &Value,
        updated_at: Timestamp,
    ) -> Result<(), StoreError>;

    /// Appends an audit event row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn append_audit(&self, event: &AuditEvent) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Language Model
// ============================================================================

/// Language model adapter errors.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure.
    #[error("llm transport error: {0}")]
    Transport(String),
    /// The response could not be parsed as the requested JSON.
    #[error("llm response parse error: {0}")]
    Parse(String),
}

/// Chat adapter producing JSON-mode completions.
///
/// The model is never on the correctness path: every caller must degrade to a
/// deterministic fallback when this adapter fails.
pub trait LanguageModel {
    /// Sends a prompt and returns the parsed JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] on transport or parse failure.
    fn chat_json(&self, prompt: &str) -> Result<Value, LlmError>;
}

// ============================================================================
// SECTION: Evidence Sources
// ============================================================================

/// Evidence source errors.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Source adapter reported an error.
    #[error("evidence source error: {0}")]
    Fetch(String),
}

/// One pluggable evidence source.
pub trait EvidenceSource {
    /// Returns the stable source name used in evidence items.
    fn name(&self) -> &str;

    /// Fetches the source's current evidence items.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when fetching fails; collection records the
    /// error and continues.
    fn fetch(&self) -> Result<Vec<EvidenceItem>, SourceError>;
}

// ============================================================================
// SECTION: Social Client
// ============================================================================

/// Downstream social API errors.
#[derive(Debug, Error)]
pub enum SocialError {
    /// Transport-level failure.
    #[error("social transport error: {0}")]
    Transport(String),
    /// The API answered without a usable post identifier.
    #[error("social response missing id: {0}")]
    MissingId(String),
}

/// Receipt for one created post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostReceipt {
    /// Downstream post identifier.
    pub id: String,
}

/// Downstream social publish client.
pub trait SocialClient {
    /// Creates one post, optionally replying to a previous post.
    ///
    /// # Errors
    ///
    /// Returns [`SocialError`] when the call fails; the coordinator retries
    /// with bounded backoff.
    fn create_post(
        &self,
        text: &str,
        in_reply_to: Option<&str>,
    ) -> Result<PostReceipt, SocialError>;
}

// ============================================================================
// SECTION: Notifier
// ============================================================================

/// Best-effort out-of-band reviewer notification.
pub trait Notifier {
    /// Delivers the review packet. Failures are reported inside the result,
    /// never as an error; notification must not fail a run.
    fn notify(&self, packet: &ReviewPacket) -> NotificationResult;
}

// crates/draftline-core/src/runtime/memstore.rs
// ============================================================================
// Module: In-Memory Draft Store
// Description: Mutex-guarded DraftStore used by tests and examples.
// Purpose: Mirror the durable store's uniqueness contracts without a database.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! The in-memory store enforces the same uniqueness contracts as the SQLite
//! backend — token hashes, `(draft_id, attempt)`, post positions, tweet ids,
//! idempotency keys, and the weekly-report window — so concurrency tests
//! exercise the identical conflict surface.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde_json::Value;

use crate::core::draft::AttemptStatus;
use crate::core::draft::AuditEvent;
use crate::core::draft::Draft;
use crate::core::draft::DraftStatus;
use crate::core::draft::Post;
use crate::core::draft::PublishAttempt;
use crate::core::draft::WeeklyReport;
use crate::core::identifiers::DraftId;
use crate::core::identifiers::RunId;
use crate::core::plan::DraftCandidates;
use crate::core::plan::DraftMode;
use crate::core::plan::EditedDraft;
use crate::core::plan::StyleProfile;
use crate::core::report::PolicyReport;
use crate::core::run::Run;
use crate::core::run::RunStatus;
use crate::core::run::StageLog;
use crate::core::run::truncate_error;
use crate::core::time::Timestamp;
use crate::core::token::ActionToken;
use crate::core::token::TokenAction;
use crate::interfaces::DraftStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: State
// ============================================================================

/// Mutable state behind the store mutex.
#[derive(Debug, Default)]
struct Inner {
    /// Runs by identifier.
    runs: BTreeMap<RunId, Run>,
    /// Stage logs by run.
    stage_logs: BTreeMap<RunId, Vec<StageLog>>,
    /// Drafts by identifier.
    drafts: BTreeMap<DraftId, Draft>,
    /// Policy report history rows.
    policy_history: Vec<(DraftId, Timestamp, PolicyReport)>,
    /// Action token rows, unique by hash.
    tokens: Vec<ActionToken>,
    /// Publish attempt rows, unique by `(draft_id, attempt)`.
    attempts: Vec<PublishAttempt>,
    /// Published post rows.
    posts: Vec<Post>,
    /// Style profile rows, append-only.
    style_profiles: Vec<(Timestamp, StyleProfile)>,
    /// Weekly report rows, unique by window.
    weekly_reports: Vec<(Timestamp, WeeklyReport)>,
    /// Runtime configuration overrides.
    app_config: BTreeMap<String, Value>,
    /// Audit rows, append-only.
    audit: Vec<AuditEvent>,
}

/// In-memory [`DraftStore`] for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDraftStore {
    /// Shared state behind a mutex.
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryDraftStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the state, mapping poisoning to a store error.
    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Store("memstore mutex poisoned".to_string()))
    }

    /// Returns every audit event recorded so far.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lock is poisoned.
    pub fn audit_events(&self) -> Result<Vec<AuditEvent>, StoreError> {
        Ok(self.lock()?.audit.clone())
    }

    /// Returns every policy report history row for a draft.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lock is poisoned.
    pub fn policy_history(&self, draft_id: &DraftId) -> Result<Vec<PolicyReport>, StoreError> {
        Ok(self
            .lock()?
            .policy_history
            .iter()
            .filter(|(id, _, _)| id == draft_id)
            .map(|(_, _, report)| report.clone())
            .collect())
    }

    /// Returns every publish attempt row for a draft.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lock is poisoned.
    pub fn attempts(&self, draft_id: &DraftId) -> Result<Vec<PublishAttempt>, StoreError> {
        Ok(self
            .lock()?
            .attempts
            .iter()
            .filter(|attempt| &attempt.draft_id == draft_id)
            .cloned()
            .collect())
    }

    /// Returns every token row for a draft.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lock is poisoned.
    pub fn tokens_for_draft(&self, draft_id: &DraftId) -> Result<Vec<ActionToken>, StoreError> {
        Ok(self
            .lock()?
            .tokens
            .iter()
            .filter(|token| &token.draft_id == draft_id)
            .cloned()
            .collect())
    }
}

// ============================================================================
// SECTION: DraftStore Implementation
// ============================================================================

impl DraftStore for InMemoryDraftStore {
    fn create_run(&self, run: &Run) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.runs.entry(run.run_id.clone()).or_insert_with(|| run.clone());
        Ok(())
    }

    fn get_run(&self, run_id: &RunId) -> Result<Option<Run>, StoreError> {
        Ok(self.lock()?.runs.get(run_id).cloned())
    }

    fn finish_run(
        &self,
        run_id: &RunId,
        status: RunStatus,
        finished_at: Timestamp,
        duration_ms: i64,
        last_error: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if let Some(run) = inner.runs.get_mut(run_id) {
            run.status = status;
            run.finished_at = Some(finished_at);
            run.duration_ms = Some(duration_ms);
            run.last_error = last_error.map(truncate_error);
        }
        Ok(())
    }

    fn replace_stage_logs(&self, run_id: &RunId, logs: &[StageLog]) -> Result<(), StoreError> {
        self.lock()?.stage_logs.insert(run_id.clone(), logs.to_vec());
        Ok(())
    }

    fn stage_logs(&self, run_id: &RunId) -> Result<Vec<StageLog>, StoreError> {
        Ok(self.lock()?.stage_logs.get(run_id).cloned().unwrap_or_default())
    }

    fn insert_draft(&self, draft: &Draft) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        if inner.drafts.contains_key(&draft.id) {
            return Ok(false);
        }
        inner.drafts.insert(draft.id.clone(), draft.clone());
        inner.policy_history.push((
            draft.id.clone(),
            draft.created_at,
            draft.policy_report.clone(),
        ));
        Ok(true)
    }

    fn get_draft(&self, draft_id: &DraftId) -> Result<Option<Draft>, StoreError> {
        Ok(self.lock()?.drafts.get(draft_id).cloned())
    }

    fn update_draft_texts(
        &self,
        draft_id: &DraftId,
        final_text: &str,
        tweets: Option<&[String]>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let Some(draft) = inner.drafts.get_mut(draft_id) else {
            return Err(StoreError::Invalid(format!("unknown draft {draft_id}")));
        };
        draft.final_text = final_text.to_string();
        draft.tweets = tweets.map(<[String]>::to_vec);
        Ok(())
    }

    fn update_draft_policy(
        &self,
        draft_id: &DraftId,
        report: &PolicyReport,
        status: DraftStatus,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let Some(draft) = inner.drafts.get_mut(draft_id) else {
            return Err(StoreError::Invalid(format!("unknown draft {draft_id}")));
        };
        draft.policy_report = report.clone();
        draft.status = status;
        inner.policy_history.push((draft_id.clone(), now, report.clone()));
        Ok(())
    }

    fn update_draft_generation(
        &self,
        draft_id: &DraftId,
        candidates: &DraftCandidates,
        edited: &EditedDraft,
        report: &PolicyReport,
        status: DraftStatus,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let Some(draft) = inner.drafts.get_mut(draft_id) else {
            return Err(StoreError::Invalid(format!("unknown draft {draft_id}")));
        };
        draft.candidates = candidates.clone();
        draft.edited_draft = edited.clone();
        draft.policy_report = report.clone();
        draft.status = status;
        let tweets = edited.composed_tweets();
        draft.thread_enabled = edited.mode == DraftMode::Thread;
        draft.tweets = if draft.thread_enabled { Some(tweets.clone()) } else { None };
        draft.final_text = tweets.first().cloned().unwrap_or_default();
        inner.policy_history.push((draft_id.clone(), now, report.clone()));
        Ok(())
    }

    fn mark_draft_skipped(&self, draft_id: &DraftId, now: Timestamp) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let Some(draft) = inner.drafts.get_mut(draft_id) else {
            return Err(StoreError::Invalid(format!("unknown draft {draft_id}")));
        };
        draft.status = DraftStatus::Skipped;
        draft.token_consumed = true;
        draft.consumed_at = Some(now);
        Ok(())
    }

    fn insert_action_token(&self, token: &ActionToken) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner.tokens.iter().any(|existing| existing.token_hash == token.token_hash) {
            return Err(StoreError::Conflict("token_hash already exists".to_string()));
        }
        inner.tokens.push(token.clone());
        Ok(())
    }

    fn find_action_token(
        &self,
        action: TokenAction,
        token_hash: &str,
    ) -> Result<Option<ActionToken>, StoreError> {
        Ok(self
            .lock()?
            .tokens
            .iter()
            .find(|token| token.action == action && token.token_hash == token_hash)
            .cloned())
    }

    fn consume_action_token(
        &self,
        action: TokenAction,
        token_hash: &str,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if let Some(token) = inner
            .tokens
            .iter_mut()
            .find(|token| token.action == action && token.token_hash == token_hash)
            && token.consumed_at.is_none()
        {
            token.consumed_at = Some(now);
        }
        Ok(())
    }

    fn latest_publish_attempt(
        &self,
        draft_id: &DraftId,
    ) -> Result<Option<PublishAttempt>, StoreError> {
        Ok(self
            .lock()?
            .attempts
            .iter()
            .filter(|attempt| &attempt.draft_id == draft_id)
            .max_by_key(|attempt| attempt.attempt)
            .cloned())
    }

    fn begin_publish_attempt(
        &self,
        attempt: &PublishAttempt,
        approve_token_hash: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner.attempts.iter().any(|existing| {
            existing.draft_id == attempt.draft_id && existing.attempt == attempt.attempt
        }) {
            return Err(StoreError::Conflict("publish attempt already exists".to_string()));
        }
        if !inner.drafts.contains_key(&attempt.draft_id) {
            return Err(StoreError::Invalid(format!("unknown draft {}", attempt.draft_id)));
        }
        inner.attempts.push(attempt.clone());
        if let Some(draft) = inner.drafts.get_mut(&attempt.draft_id) {
            draft.status = DraftStatus::Publishing;
        }
        if let Some(hash) = approve_token_hash
            && let Some(token) = inner.tokens.iter_mut().find(|token| {
                token.action == TokenAction::Approve && token.token_hash == hash
            })
            && token.consumed_at.is_none()
        {
            token.consumed_at = Some(attempt.created_at);
        }
        Ok(())
    }

    fn complete_publish_attempt(
        &self,
        draft_id: &DraftId,
        attempt: u32,
        completed_at: Timestamp,
        final_status: DraftStatus,
        published_tweet_ids: &[String],
        approval_idempotency_key: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if let Some(row) = inner
            .attempts
            .iter_mut()
            .find(|row| &row.draft_id == draft_id && row.attempt == attempt)
        {
            row.status = AttemptStatus::Completed;
            row.completed_at = Some(completed_at);
        }
        if let Some(draft) = inner.drafts.get_mut(draft_id) {
            draft.status = final_status;
            draft.token_consumed = true;
            draft.consumed_at = Some(completed_at);
            draft.published_tweet_ids = Some(published_tweet_ids.to_vec());
            draft.approval_idempotency_key = Some(approval_idempotency_key.to_string());
        }
        Ok(())
    }

    fn fail_publish_attempt(
        &self,
        draft_id: &DraftId,
        attempt: u32,
        failed_at: Timestamp,
        error: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if let Some(row) = inner
            .attempts
            .iter_mut()
            .find(|row| &row.draft_id == draft_id && row.attempt == attempt)
        {
            row.status = AttemptStatus::Failed;
            row.completed_at = Some(failed_at);
            row.last_error = Some(truncate_error(error));
        }
        if let Some(draft) = inner.drafts.get_mut(draft_id) {
            draft.status = DraftStatus::Error;
            draft.last_error = Some(truncate_error(error));
        }
        Ok(())
    }

    fn posts_for_draft(&self, draft_id: &DraftId) -> Result<Vec<Post>, StoreError> {
        let mut posts: Vec<Post> = self
            .lock()?
            .posts
            .iter()
            .filter(|post| &post.draft_id == draft_id)
            .cloned()
            .collect();
        posts.sort_by_key(|post| post.position);
        Ok(posts)
    }

    fn insert_post(&self, post: &Post) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let conflict = inner.posts.iter().any(|existing| {
            (existing.draft_id == post.draft_id && existing.position == post.position)
                || existing.tweet_id == post.tweet_id
                || existing.publish_idempotency_key == post.publish_idempotency_key
        });
        if conflict {
            return Err(StoreError::Conflict("post already recorded".to_string()));
        }
        inner.posts.push(post.clone());
        Ok(())
    }

    fn recent_posts(&self, since: Timestamp, limit: usize) -> Result<Vec<String>, StoreError> {
        let mut posts: Vec<(Timestamp, String)> = self
            .lock()?
            .posts
            .iter()
            .filter(|post| post.posted_at > since)
            .map(|post| (post.posted_at, post.content.clone()))
            .collect();
        posts.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(posts.into_iter().take(limit).map(|(_, content)| content).collect())
    }

    fn posts_in_window(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<String>, StoreError> {
        let mut posts: Vec<(Timestamp, String)> = self
            .lock()?
            .posts
            .iter()
            .filter(|post| post.posted_at >= start && post.posted_at < end)
            .map(|post| (post.posted_at, post.content.clone()))
            .collect();
        posts.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(posts.into_iter().map(|(_, content)| content).collect())
    }

    fn save_style_profile(
        &self,
        profile: &StyleProfile,
        created_at: Timestamp,
    ) -> Result<(), StoreError> {
        self.lock()?.style_profiles.push((created_at, profile.clone()));
        Ok(())
    }

    fn latest_style_profile(&self) -> Result<Option<StyleProfile>, StoreError> {
        Ok(self
            .lock()?
            .style_profiles
            .iter()
            .max_by_key(|(created_at, _)| *created_at)
            .map(|(_, profile)| profile.clone()))
    }

    fn save_weekly_report(
        &self,
        report: &WeeklyReport,
        created_at: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        let exists = inner.weekly_reports.iter().any(|(_, existing)| {
            existing.week_start == report.week_start && existing.week_end == report.week_end
        });
        if exists {
            return Ok(false);
        }
        inner.weekly_reports.push((created_at, report.clone()));
        Ok(true)
    }

    fn get_app_config(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.lock()?.app_config.get(key).cloned())
    }

    fn set_app_config(
        &self,
        key: &str,
        value: &Value,
        _updated_at: Timestamp,
    ) -> Result<(), StoreError> {
        self.lock()?.app_config.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn append_audit(&self, event: &AuditEvent) -> Result<(), StoreError> {
        self.lock()?.audit.push(event.clone());
        Ok(())
    }
}

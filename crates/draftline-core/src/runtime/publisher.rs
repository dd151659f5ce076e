// crates/draftline-core/src/runtime/publisher.rs
// ============================================================================
// Module: Publish Coordinator
// Description: Exactly-once, resumable multi-tweet publication.
// Purpose: Guard publication against concurrent approvers, crashes, and retries.
// Dependencies: crate::{core, interfaces, retry}, uuid
// ============================================================================

//! ## Overview
//! Publication is fenced by the `(draft_id, attempt)` unique constraint: the
//! attempt insert is the lock, taken in the same transaction that moves the
//! draft to `publishing` and consumes the approve token. The publish loop is
//! position-ordered and resumable — every already-persisted post is reused as
//! the reply anchor without a downstream call, and a post-insert conflict
//! after a crash rehydrates the recorded tweet id instead of failing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::info;
use tracing::warn;
use uuid::Uuid;

use crate::core::draft::AttemptStatus;
use crate::core::draft::Draft;
use crate::core::draft::DraftStatus;
use crate::core::draft::Post;
use crate::core::draft::PublishAttempt;
use crate::core::identifiers::DraftId;
use crate::core::run::truncate_error;
use crate::interfaces::Clock;
use crate::interfaces::DraftStore;
use crate::interfaces::SocialClient;
use crate::interfaces::StoreError;
use crate::retry::RetryPolicy;
use crate::retry::with_retry;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Publish coordinator configuration.
#[derive(Debug, Clone, Copy)]
pub struct PublishConfig {
    /// When true, tweet ids are synthesized and no downstream call is made.
    pub dry_run: bool,
    /// Retry policy for downstream calls.
    pub retry: RetryPolicy,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self { dry_run: true, retry: RetryPolicy::default() }
    }
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Result of an approve or resume publication request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Publication completed; the draft is terminal.
    Published {
        /// Tweet ids in position order.
        tweet_ids: Vec<String>,
        /// True when the ids were synthesized in dry-run mode.
        dry_run: bool,
    },
    /// A prior attempt already completed; idempotent success.
    AlreadyCompleted,
    /// Another attempt currently holds the lease.
    InProgress,
    /// The latest attempt failed; an explicit resume is required.
    PreviousFailed,
    /// This attempt failed; the draft is in `error`.
    Failed {
        /// The recorded failure.
        error: String,
    },
}

// ============================================================================
// SECTION: Coordinator
// ============================================================================

/// Exactly-once publish coordinator over the store and social client.
pub struct Publisher<'a, S: DraftStore> {
    /// Durable store, the single source of truth.
    store: &'a S,
    /// Downstream social client.
    social: &'a dyn SocialClient,
    /// Host time source.
    clock: &'a dyn Clock,
    /// Coordinator configuration.
    config: PublishConfig,
}

impl<'a, S: DraftStore> Publisher<'a, S> {
    /// Creates a coordinator over the given seams.
    #[must_use]
    pub fn new(
        store: &'a S,
        social: &'a dyn SocialClient,
        clock: &'a dyn Clock,
        config: PublishConfig,
    ) -> Self {
        Self { store, social, clock, config }
    }

    /// Opens attempt 1 for an approved draft and publishes it. The caller
    /// has already validated the approve token and re-checked policy.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store fails outside the publish loop.
    pub fn publish_approved(
        &self,
        draft: &Draft,
        approve_token_hash: Option<&str>,
    ) -> Result<PublishOutcome, StoreError> {
        if let Some(previous) = self.store.latest_publish_attempt(&draft.id)? {
            return Ok(Self::contended(&previous));
        }
        let attempt = self.open_attempt(&draft.id, 1, approve_token_hash)?;
        match attempt {
            Some(number) => self.run_publish_loop(&draft.id, number),
            None => {
                // Lost the race; report what the winner left behind.
                match self.store.latest_publish_attempt(&draft.id)? {
                    Some(previous) => Ok(Self::contended(&previous)),
                    None => Ok(PublishOutcome::InProgress),
                }
            }
        }
    }

    /// Resumes publication after a crash or an explicit failure. A `started`
    /// attempt is re-entered; a `failed` attempt is superseded by the next
    /// attempt number.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store fails outside the publish loop.
    pub fn resume(&self, draft_id: &DraftId) -> Result<PublishOutcome, StoreError> {
        let Some(previous) = self.store.latest_publish_attempt(draft_id)? else {
            return Err(StoreError::Invalid(format!(
                "no publish attempt to resume for draft {draft_id}"
            )));
        };
        match previous.status {
            AttemptStatus::Completed => Ok(PublishOutcome::AlreadyCompleted),
            AttemptStatus::Started => {
                info!(draft_id = %draft_id, attempt = previous.attempt, "resuming attempt");
                self.run_publish_loop(draft_id, previous.attempt)
            }
            AttemptStatus::Failed => {
                let next = previous.attempt + 1;
                match self.open_attempt(draft_id, next, None)? {
                    Some(number) => self.run_publish_loop(draft_id, number),
                    None => Ok(PublishOutcome::InProgress),
                }
            }
        }
    }

    /// Maps an existing attempt row to the contention outcome.
    fn contended(previous: &PublishAttempt) -> PublishOutcome {
        match previous.status {
            AttemptStatus::Completed => PublishOutcome::AlreadyCompleted,
            AttemptStatus::Started => PublishOutcome::InProgress,
            AttemptStatus::Failed => PublishOutcome::PreviousFailed,
        }
    }

    /// Inserts the attempt row, fencing out concurrent approvers. Returns
    /// `None` when the unique constraint rejected the insert.
    fn open_attempt(
        &self,
        draft_id: &DraftId,
        number: u32,
        approve_token_hash: Option<&str>,
    ) -> Result<Option<u32>, StoreError> {
        let attempt = PublishAttempt {
            draft_id: draft_id.clone(),
            attempt: number,
            owner: Some(Uuid::new_v4().to_string()),
            status: AttemptStatus::Started,
            created_at: self.clock.now(),
            completed_at: None,
            last_error: None,
        };
        match self.store.begin_publish_attempt(&attempt, approve_token_hash) {
            Ok(()) => Ok(Some(number)),
            Err(StoreError::Conflict(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Publishes every position, reusing persisted posts, then finalizes.
    fn run_publish_loop(
        &self,
        draft_id: &DraftId,
        attempt: u32,
    ) -> Result<PublishOutcome, StoreError> {
        let Some(draft) = self.store.get_draft(draft_id)? else {
            return Err(StoreError::Invalid(format!("unknown draft {draft_id}")));
        };
        let tweets = Self::composed_tweets(&draft);
        if tweets.is_empty() {
            let error = "draft has no publishable text".to_string();
            self.store.fail_publish_attempt(draft_id, attempt, self.clock.now(), &error)?;
            return Ok(PublishOutcome::Failed { error });
        }

        let mut existing: std::collections::BTreeMap<u32, String> = self
            .store
            .posts_for_draft(draft_id)?
            .into_iter()
            .map(|post| (post.position, post.tweet_id))
            .collect();

        let mut tweet_ids: Vec<String> = Vec::with_capacity(tweets.len());
        let mut reply_to: Option<String> = None;
        for (index, text) in tweets.iter().enumerate() {
            let position = u32::try_from(index + 1)
                .map_err(|_| StoreError::Invalid("thread position overflow".to_string()))?;
            if let Some(tweet_id) = existing.get(&position) {
                reply_to = Some(tweet_id.clone());
                tweet_ids.push(tweet_id.clone());
                continue;
            }

            let tweet_id = if self.config.dry_run {
                format!("dry_{}_{position}", draft.id.short())
            } else {
                let anchor = reply_to.clone();
                let created = with_retry(self.config.retry, || {
                    self.social.create_post(text, anchor.as_deref())
                });
                match created {
                    Ok(receipt) => receipt.id,
                    Err(err) => {
                        let error = truncate_error(&err.to_string());
                        warn!(draft_id = %draft_id, position, error = %error, "publish failed");
                        self.store.fail_publish_attempt(
                            draft_id,
                            attempt,
                            self.clock.now(),
                            &error,
                        )?;
                        return Ok(PublishOutcome::Failed { error });
                    }
                }
            };

            let post = Post {
                draft_id: draft.id.clone(),
                position,
                tweet_id: tweet_id.clone(),
                content: text.clone(),
                posted_at: self.clock.now(),
                publish_idempotency_key: draft.publish_key(position),
            };
            match self.store.insert_post(&post) {
                Ok(()) => {}
                Err(StoreError::Conflict(_)) => {
                    // Crash-recovery: a prior worker persisted this position
                    // after the downstream call. Reuse the recorded id.
                    existing = self
                        .store
                        .posts_for_draft(draft_id)?
                        .into_iter()
                        .map(|row| (row.position, row.tweet_id))
                        .collect();
                    if let Some(recorded) = existing.get(&position) {
                        reply_to = Some(recorded.clone());
                        tweet_ids.push(recorded.clone());
                        continue;
                    }
                    return Err(StoreError::Corrupt(format!(
                        "post conflict without a recorded row at {draft_id}:{position}"
                    )));
                }
                Err(err) => return Err(err),
            }
            reply_to = Some(tweet_id.clone());
            tweet_ids.push(tweet_id);
        }

        let final_status =
            if self.config.dry_run { DraftStatus::DryRunPosted } else { DraftStatus::Posted };
        self.store.complete_publish_attempt(
            draft_id,
            attempt,
            self.clock.now(),
            final_status,
            &tweet_ids,
            &draft.approval_key(),
        )?;
        info!(draft_id = %draft_id, attempt, posts = tweet_ids.len(), "publish completed");
        Ok(PublishOutcome::Published { tweet_ids, dry_run: self.config.dry_run })
    }

    /// Returns the composed tweet list recorded on the draft.
    fn composed_tweets(draft: &Draft) -> Vec<String> {
        let raw: Vec<String> = if draft.thread_enabled {
            draft.tweets.clone().unwrap_or_default()
        } else {
            vec![draft.final_text.clone()]
        };
        raw.into_iter()
            .map(|tweet| tweet.trim().to_string())
            .filter(|tweet| !tweet.is_empty())
            .collect()
    }
}

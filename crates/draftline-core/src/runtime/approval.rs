// crates/draftline-core/src/runtime/approval.rs
// ============================================================================
// Module: Review Flows
// Description: Token-gated approve, edit, regenerate, skip, and resume.
// Purpose: Map reviewer actions onto the draft state machine with typed outcomes.
// Dependencies: crate::{core, interfaces, pipeline, policy, retry, runtime}
// ============================================================================

//! ## Overview
//! Every reviewer entry point validates an action token first, then delegates
//! to the draft state machine. Outcomes are typed and map onto HTTP-style
//! codes: idempotent repeats return the latest terminal state rather than
//! synthesizing a fresh action; expired and consumed tokens return 410 and
//! 200 respectively without mutating anything. Approval re-derives the policy
//! verdict deterministically from the stored snapshots before any publish
//! lease is taken.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use tracing::info;

use crate::core::draft::AuditEvent;
use crate::core::draft::Draft;
use crate::core::draft::DraftStatus;
use crate::core::identifiers::DraftId;
use crate::core::plan::DraftMode;
use crate::core::plan::EditedDraft;
use crate::core::report::PolicyAction;
use crate::core::report::PolicyReport;
use crate::core::report::RiskLevel;
use crate::core::time::Timestamp;
use crate::core::token::TokenAction;
use crate::interfaces::Clock;
use crate::interfaces::DraftStore;
use crate::interfaces::LanguageModel;
use crate::interfaces::SocialClient;
use crate::interfaces::StoreError;
use crate::pipeline::Critic;
use crate::pipeline::Stage;
use crate::pipeline::StageError;
use crate::pipeline::Writer;
use crate::policy::PolicyEngine;
use crate::retry::RetryPolicy;
use crate::runtime::publisher::PublishConfig;
use crate::runtime::publisher::PublishOutcome;
use crate::runtime::publisher::Publisher;
use crate::runtime::ratelimit::RateLimiter;
use crate::runtime::tokens;
use crate::runtime::tokens::TokenResolution;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Reviewer configuration.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    /// Blocked terms for the policy re-check.
    pub blocked_terms: Vec<String>,
    /// Jaccard ceiling against recent posts.
    pub similarity_threshold: f64,
    /// Sliding de-duplication window in days.
    pub recent_posts_days: i64,
    /// Maximum recent posts loaded for de-duplication.
    pub recent_posts_limit: usize,
    /// Retry policy for model calls during regenerate.
    pub retry: RetryPolicy,
    /// Publish coordinator configuration.
    pub publish: PublishConfig,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            blocked_terms: Vec::new(),
            similarity_threshold: crate::policy::DEFAULT_SIMILARITY_THRESHOLD,
            recent_posts_days: 14,
            recent_posts_limit: 200,
            retry: RetryPolicy::default(),
            publish: PublishConfig::default(),
        }
    }
}

// ============================================================================
// SECTION: Errors and Outcomes
// ============================================================================

/// Review flow errors (infrastructure, not verdicts).
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Stage failure during regenerate.
    #[error(transparent)]
    Stage(#[from] StageError),
}

/// Typed outcome of a reviewer action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// Publication completed.
    Published {
        /// Tweet ids in position order.
        tweet_ids: Vec<String>,
        /// True when ids were synthesized in dry-run mode.
        dry_run: bool,
    },
    /// The draft already reached a terminal state; idempotent success.
    AlreadyProcessed {
        /// The terminal status observed.
        status: DraftStatus,
    },
    /// Edit accepted; the fresh policy report is attached.
    Edited {
        /// Report over the edited texts.
        report: PolicyReport,
    },
    /// Regeneration completed; the fresh policy report is attached.
    Regenerated {
        /// Report over the regenerated draft.
        report: PolicyReport,
    },
    /// The draft was skipped and its token consumed.
    Skipped,
    /// Replacement texts were empty after trimming.
    InvalidTexts,
    /// The deterministic policy re-check refused the approval.
    PolicyRefused {
        /// Action the policy engine requested instead.
        action: PolicyAction,
        /// Risk level attached to the refusal.
        risk_level: RiskLevel,
    },
    /// Token or draft not found.
    NotFound,
    /// Contention: another actor holds or held the publish lease.
    Conflict {
        /// Terse contention reason.
        reason: String,
    },
    /// The token TTL elapsed; nothing was mutated.
    Expired,
    /// The per-process rate limit rejected the request.
    RateLimited,
    /// Publication failed after retries; the draft is in `error`.
    PublishFailed {
        /// The recorded failure.
        error: String,
    },
}

impl ReviewOutcome {
    /// Returns the HTTP-style status code for the outcome.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Published { .. }
            | Self::AlreadyProcessed { .. }
            | Self::Edited { .. }
            | Self::Regenerated { .. }
            | Self::Skipped => 200,
            Self::InvalidTexts => 400,
            Self::PolicyRefused { .. } => 403,
            Self::NotFound => 404,
            Self::Conflict { .. } => 409,
            Self::Expired => 410,
            Self::RateLimited => 429,
            Self::PublishFailed { .. } => 500,
        }
    }
}

// ============================================================================
// SECTION: Reviewer
// ============================================================================

/// Token-gated review entry points over the draft state machine.
pub struct Reviewer<'a, S: DraftStore, L: LanguageModel> {
    /// Durable store, the single source of truth.
    store: &'a S,
    /// Language model adapter, used only by regenerate.
    llm: &'a L,
    /// Host time source.
    clock: &'a dyn Clock,
    /// Downstream social client for the approve path.
    social: &'a dyn SocialClient,
    /// Optional per-process rate limiter over reviewer actions.
    limiter: Option<&'a RateLimiter>,
    /// Reviewer configuration.
    config: ReviewConfig,
}

impl<'a, S: DraftStore, L: LanguageModel> Reviewer<'a, S, L> {
    /// Creates a reviewer over the given seams.
    #[must_use]
    pub fn new(
        store: &'a S,
        llm: &'a L,
        clock: &'a dyn Clock,
        social: &'a dyn SocialClient,
        limiter: Option<&'a RateLimiter>,
        config: ReviewConfig,
    ) -> Self {
        Self { store, llm, clock, social, limiter, config }
    }

    // ------------------------------------------------------------------
    // Approve
    // ------------------------------------------------------------------

    /// Approves a draft by its one-time approve token and publishes it.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError`] on infrastructure failure; verdicts and
    /// contention are reported through the outcome.
    pub fn approve(&self, raw_token: &str) -> Result<ReviewOutcome, ReviewError> {
        let now = self.clock.now();
        if !self.allow("approve", now) {
            return Ok(ReviewOutcome::RateLimited);
        }
        let (draft, token) = match tokens::resolve(self.store, TokenAction::Approve, raw_token, now)?
        {
            TokenResolution::NotFound => return Ok(ReviewOutcome::NotFound),
            TokenResolution::Expired(_) => return Ok(ReviewOutcome::Expired),
            TokenResolution::Consumed(token) => {
                let status = self
                    .store
                    .get_draft(&token.draft_id)?
                    .map_or(DraftStatus::Skipped, |draft| draft.status);
                return Ok(ReviewOutcome::AlreadyProcessed { status });
            }
            TokenResolution::Ok { draft, token } => (*draft, token),
        };

        if draft.token_consumed || draft.status.is_terminal() {
            return self.audited(
                "approve",
                &draft.id,
                ReviewOutcome::AlreadyProcessed { status: draft.status },
            );
        }

        let report = self.evaluate_current(&draft)?;
        if report.action != PolicyAction::Pass {
            return self.audited(
                "approve",
                &draft.id,
                ReviewOutcome::PolicyRefused {
                    action: report.action,
                    risk_level: report.risk_level,
                },
            );
        }

        let publisher =
            Publisher::new(self.store, self.social, self.clock, self.config.publish);
        let outcome = publisher.publish_approved(&draft, Some(&token.token_hash))?;
        self.audited("approve", &draft.id, Self::from_publish(self.store, &draft.id, outcome)?)
    }

    /// Resumes a crashed or failed publication for a draft. This entry point
    /// is session-gated by the caller, not token-gated.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError`] on infrastructure failure.
    pub fn resume(&self, draft_id: &DraftId) -> Result<ReviewOutcome, ReviewError> {
        let now = self.clock.now();
        if !self.allow("resume", now) {
            return Ok(ReviewOutcome::RateLimited);
        }
        if self.store.get_draft(draft_id)?.is_none() {
            return Ok(ReviewOutcome::NotFound);
        }
        let publisher =
            Publisher::new(self.store, self.social, self.clock, self.config.publish);
        let outcome = match publisher.resume(draft_id) {
            Ok(outcome) => outcome,
            Err(StoreError::Invalid(reason)) => {
                return self.audited("resume", draft_id, ReviewOutcome::Conflict { reason });
            }
            Err(err) => return Err(err.into()),
        };
        self.audited("resume", draft_id, Self::from_publish(self.store, draft_id, outcome)?)
    }

    // ------------------------------------------------------------------
    // Edit
    // ------------------------------------------------------------------

    /// Replaces the draft texts and re-runs policy.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError`] on infrastructure failure.
    pub fn edit(
        &self,
        raw_token: &str,
        new_texts: &[String],
    ) -> Result<ReviewOutcome, ReviewError> {
        let now = self.clock.now();
        if !self.allow("edit", now) {
            return Ok(ReviewOutcome::RateLimited);
        }
        let draft = match tokens::resolve(self.store, TokenAction::Edit, raw_token, now)? {
            TokenResolution::NotFound => return Ok(ReviewOutcome::NotFound),
            TokenResolution::Expired(_) => return Ok(ReviewOutcome::Expired),
            TokenResolution::Consumed(_) => {
                return Ok(ReviewOutcome::Conflict { reason: "token consumed".to_string() });
            }
            TokenResolution::Ok { draft, .. } => *draft,
        };
        if draft.token_consumed {
            return self.audited(
                "edit",
                &draft.id,
                ReviewOutcome::Conflict { reason: "draft already consumed".to_string() },
            );
        }

        let trimmed: Vec<String> = new_texts
            .iter()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .collect();
        let Some(first) = trimmed.first().cloned() else {
            return Ok(ReviewOutcome::InvalidTexts);
        };

        let (final_text, tweets) = if draft.thread_enabled {
            (first, Some(trimmed.clone()))
        } else {
            (first, None)
        };
        self.store.update_draft_texts(&draft.id, &final_text, tweets.as_deref())?;

        let mut updated = draft.clone();
        updated.final_text = final_text;
        updated.tweets = tweets;
        let report = self.evaluate_current(&updated)?;
        let status = Self::status_for(report.action);
        self.store.update_draft_policy(&draft.id, &report, status, now)?;
        self.audited("edit", &draft.id, ReviewOutcome::Edited { report })
    }

    // ------------------------------------------------------------------
    // Regenerate
    // ------------------------------------------------------------------

    /// Re-runs Writer → Critic → Policy from the stored plans and materials.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError`] on infrastructure or stage failure.
    pub fn regenerate(&self, raw_token: &str) -> Result<ReviewOutcome, ReviewError> {
        let now = self.clock.now();
        if !self.allow("regenerate", now) {
            return Ok(ReviewOutcome::RateLimited);
        }
        let draft = match tokens::resolve(self.store, TokenAction::Regenerate, raw_token, now)? {
            TokenResolution::NotFound => return Ok(ReviewOutcome::NotFound),
            TokenResolution::Expired(_) => return Ok(ReviewOutcome::Expired),
            TokenResolution::Consumed(_) => {
                return Ok(ReviewOutcome::Conflict { reason: "token consumed".to_string() });
            }
            TokenResolution::Ok { draft, .. } => *draft,
        };
        if draft.token_consumed {
            return self.audited(
                "regenerate",
                &draft.id,
                ReviewOutcome::Conflict { reason: "draft already consumed".to_string() },
            );
        }

        let writer = Writer::new(self.llm, self.config.retry);
        let candidates = writer.run((
            draft.topic_plan.clone(),
            draft.thread_plan.clone(),
            draft.style_profile.clone(),
            draft.materials.clone(),
        ))?;
        let critic = Critic::new(self.llm, self.config.retry);
        let edited = critic.run((
            candidates.clone(),
            draft.materials.clone(),
            draft.style_profile.clone(),
            draft.thread_plan.clone(),
        ))?;
        let engine = self.engine();
        let recent = self.recent_posts()?;
        let report =
            engine.evaluate(&edited, &draft.materials, &recent, &draft.style_profile);
        let status = Self::status_for(report.action);
        self.store.update_draft_generation(
            &draft.id,
            &candidates,
            &edited,
            &report,
            status,
            now,
        )?;
        info!(draft_id = %draft.id, action = report.action.as_str(), "draft regenerated");
        self.audited("regenerate", &draft.id, ReviewOutcome::Regenerated { report })
    }

    // ------------------------------------------------------------------
    // Skip
    // ------------------------------------------------------------------

    /// Skips a draft by its one-time skip token.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError`] on infrastructure failure.
    pub fn skip(&self, raw_token: &str) -> Result<ReviewOutcome, ReviewError> {
        let now = self.clock.now();
        if !self.allow("skip", now) {
            return Ok(ReviewOutcome::RateLimited);
        }
        let (draft, token) = match tokens::resolve(self.store, TokenAction::Skip, raw_token, now)? {
            TokenResolution::NotFound => return Ok(ReviewOutcome::NotFound),
            TokenResolution::Expired(_) => return Ok(ReviewOutcome::Expired),
            TokenResolution::Consumed(token) => {
                let status = self
                    .store
                    .get_draft(&token.draft_id)?
                    .map_or(DraftStatus::Skipped, |draft| draft.status);
                return Ok(ReviewOutcome::AlreadyProcessed { status });
            }
            TokenResolution::Ok { draft, token } => (*draft, token),
        };
        if draft.token_consumed || draft.status.is_terminal() {
            return self.audited(
                "skip",
                &draft.id,
                ReviewOutcome::AlreadyProcessed { status: draft.status },
            );
        }
        self.store.mark_draft_skipped(&draft.id, now)?;
        tokens::consume(self.store, &token, now)?;
        self.audited("skip", &draft.id, ReviewOutcome::Skipped)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Consults the optional rate limiter.
    fn allow(&self, action: &str, now: Timestamp) -> bool {
        self.limiter.is_none_or(|limiter| limiter.allow(action, now))
    }

    /// Builds the policy engine from the reviewer configuration.
    fn engine(&self) -> PolicyEngine<'_> {
        PolicyEngine::new(self.config.blocked_terms.clone(), self.config.similarity_threshold)
    }

    /// Loads the de-duplication window of recent posts.
    fn recent_posts(&self) -> Result<Vec<String>, StoreError> {
        let cutoff = self.clock.now().minus_days(self.config.recent_posts_days);
        self.store.recent_posts(cutoff, self.config.recent_posts_limit)
    }

    /// Re-derives the current edited draft from the stored snapshot plus the
    /// live text columns, then evaluates policy deterministically.
    fn evaluate_current(&self, draft: &Draft) -> Result<PolicyReport, ReviewError> {
        let mut edited: EditedDraft = draft.edited_draft.clone();
        edited.final_text = Some(draft.final_text.clone());
        edited.final_tweets = draft.tweets.clone();
        edited.mode = if draft.thread_enabled { DraftMode::Thread } else { DraftMode::Single };
        let recent = self.recent_posts()?;
        Ok(self.engine().evaluate(&edited, &draft.materials, &recent, &draft.style_profile))
    }

    /// Maps a policy action onto the draft status it implies.
    const fn status_for(action: PolicyAction) -> DraftStatus {
        match action {
            PolicyAction::Pass => DraftStatus::Pending,
            PolicyAction::Rewrite | PolicyAction::Hold => DraftStatus::NeedsHumanAttention,
        }
    }

    /// Converts a publish outcome, reloading the draft for terminal status.
    fn from_publish(
        store: &S,
        draft_id: &DraftId,
        outcome: PublishOutcome,
    ) -> Result<ReviewOutcome, ReviewError> {
        Ok(match outcome {
            PublishOutcome::Published { tweet_ids, dry_run } => {
                ReviewOutcome::Published { tweet_ids, dry_run }
            }
            PublishOutcome::AlreadyCompleted => {
                let status = store
                    .get_draft(draft_id)?
                    .map_or(DraftStatus::Posted, |draft| draft.status);
                ReviewOutcome::AlreadyProcessed { status }
            }
            PublishOutcome::InProgress => {
                ReviewOutcome::Conflict { reason: "publish_in_progress".to_string() }
            }
            PublishOutcome::PreviousFailed => ReviewOutcome::Conflict {
                reason: "previous_attempt_failed; use resume".to_string(),
            },
            PublishOutcome::Failed { error } => ReviewOutcome::PublishFailed { error },
        })
    }

    /// Appends an audit row for the action and returns the outcome.
    fn audited(
        &self,
        action: &str,
        draft_id: &DraftId,
        outcome: ReviewOutcome,
    ) -> Result<ReviewOutcome, ReviewError> {
        let actor = if action == "resume" { "session" } else { "token" };
        self.store.append_audit(&AuditEvent {
            created_at: self.clock.now(),
            actor: actor.to_string(),
            action: action.to_string(),
            subject: draft_id.to_string(),
            detail: format!("code={}", outcome.status_code()),
        })?;
        Ok(outcome)
    }
}

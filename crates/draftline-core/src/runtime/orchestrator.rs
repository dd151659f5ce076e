// crates/draftline-core/src/runtime/orchestrator.rs
// ============================================================================
// Module: Run Orchestrator
// Description: Deterministic state machine driving the generation pipeline.
// Purpose: Execute stages in order, bound rewrites, persist progress, finalize.
// Dependencies: crate::{core, interfaces, pipeline, policy, runtime}
// ============================================================================

//! ## Overview
//! The orchestrator owns one run end to end: it creates the run row, executes
//! Collector → Curator → ThreadPlanner → (Writer → Critic → Policy) with the
//! bounded rewrite loop, persists stage logs after every stage, creates the
//! draft with its action tokens, notifies the reviewer best-effort, and
//! finalizes the run exactly once. A crash between stages leaves the run
//! `running`; the external runtime may retry under a new run id — generation
//! is never partially resumed, only publication is.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use tracing::info;
use tracing::warn;

use crate::core::draft::Draft;
use crate::core::draft::DraftStatus;
use crate::core::draft::ReviewPacket;
use crate::core::draft::WeeklyReport;
use crate::core::evidence::Materials;
use crate::core::identifiers::DraftId;
use crate::core::identifiers::RunId;
use crate::core::plan::DraftCandidates;
use crate::core::plan::DraftMode;
use crate::core::plan::EditedDraft;
use crate::core::plan::StyleProfile;
use crate::core::plan::ThreadPlan;
use crate::core::plan::TopicPlan;
use crate::core::report::PolicyAction;
use crate::core::report::PolicyReport;
use crate::core::run::Run;
use crate::core::run::RunStatus;
use crate::core::run::StageLog;
use crate::core::run::truncate_error;
use crate::core::run::truncate_summary;
use crate::core::time::Timestamp;
use crate::interfaces::Clock;
use crate::interfaces::DraftStore;
use crate::interfaces::EvidenceSource;
use crate::interfaces::LanguageModel;
use crate::interfaces::Notifier;
use crate::interfaces::StoreError;
use crate::pipeline::Collector;
use crate::pipeline::Critic;
use crate::pipeline::Curator;
use crate::pipeline::StageError;
use crate::pipeline::StyleLearner;
use crate::pipeline::ThreadPlanner;
use crate::pipeline::ThreadPolicy;
use crate::pipeline::WeeklyAnalyst;
use crate::pipeline::Writer;
use crate::pipeline::execute;
use crate::policy::PolicyEngine;
use crate::policy::PolicyStage;
use crate::retry::RetryPolicy;
use crate::runtime::tokens::issue_review_tokens;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Runtime-tunable settings the orchestrator reads.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Policy-REWRITE loop bound.
    pub rewrite_max: u32,
    /// Action-token and draft lifetime in hours.
    pub token_ttl_hours: i64,
    /// Sliding de-duplication window over posted content, in days.
    pub recent_posts_days: i64,
    /// Maximum recent posts loaded for de-duplication.
    pub recent_posts_limit: usize,
    /// Posts fed into style learning.
    pub style_input_posts: usize,
    /// Jaccard ceiling against recent posts.
    pub similarity_threshold: f64,
    /// Blocked terms for the sensitive-content check.
    pub blocked_terms: Vec<String>,
    /// Thread policy for the planner.
    pub thread_policy: ThreadPolicy,
    /// Retry policy for model calls.
    pub retry: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            rewrite_max: 1,
            token_ttl_hours: 36,
            recent_posts_days: 14,
            recent_posts_limit: 200,
            style_input_posts: 30,
            similarity_threshold: crate::policy::DEFAULT_SIMILARITY_THRESHOLD,
            blocked_terms: Vec::new(),
            thread_policy: ThreadPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Orchestrator errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Stage failure without a fallback.
    #[error(transparent)]
    Stage(#[from] StageError),
    /// Pipeline produced an invalid artifact.
    #[error("orchestrator invalid state: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Drives the generation pipeline against the store and adapters.
pub struct Orchestrator<'a, S: DraftStore, L: LanguageModel> {
    /// Durable store, the single source of truth.
    store: &'a S,
    /// Language model adapter.
    llm: &'a L,
    /// Host time source.
    clock: &'a dyn Clock,
    /// Enabled evidence sources.
    sources: Vec<&'a dyn EvidenceSource>,
    /// Best-effort reviewer notifier.
    notifier: &'a dyn Notifier,
    /// Runtime configuration.
    config: OrchestratorConfig,
}

/// Artifacts accumulated by the rewrite loop.
struct GenerationArtifacts {
    /// Writer output from the final iteration.
    candidates: DraftCandidates,
    /// Critic output from the final iteration.
    edited: EditedDraft,
    /// Policy verdict from the final iteration.
    report: PolicyReport,
}

impl<'a, S: DraftStore, L: LanguageModel> Orchestrator<'a, S, L> {
    /// Creates an orchestrator over the given seams.
    #[must_use]
    pub fn new(
        store: &'a S,
        llm: &'a L,
        clock: &'a dyn Clock,
        sources: Vec<&'a dyn EvidenceSource>,
        notifier: &'a dyn Notifier,
        config: OrchestratorConfig,
    ) -> Self {
        Self { store, llm, clock, sources, notifier, config }
    }

    /// Starts a run, executes the pipeline to completion or failure, and
    /// finalizes the run exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when the pipeline fails; the run row is
    /// finalized as `failed` with the error recorded before returning.
    pub fn start_run(
        &self,
        source: &str,
        run_id: Option<RunId>,
    ) -> Result<RunId, OrchestratorError> {
        let run_id = run_id.unwrap_or_else(RunId::generate);
        let started_at = self.clock.now();
        self.store.create_run(&Run::started(run_id.clone(), source, started_at))?;
        info!(run_id = %run_id, source, "run started");

        let mut logs: Vec<StageLog> = Vec::new();
        let result = self.execute_pipeline(&run_id, &mut logs);

        let finished_at = self.clock.now();
        let duration_ms = finished_at.millis_since(started_at);
        match &result {
            Ok(draft_id) => {
                self.store.finish_run(
                    &run_id,
                    RunStatus::Completed,
                    finished_at,
                    duration_ms,
                    None,
                )?;
                info!(run_id = %run_id, draft_id = %draft_id, duration_ms, "run completed");
            }
            Err(err) => {
                self.store.finish_run(
                    &run_id,
                    RunStatus::Failed,
                    finished_at,
                    duration_ms,
                    Some(&truncate_error(&err.to_string())),
                )?;
                warn!(run_id = %run_id, error = %err, "run failed");
            }
        }
        self.store.replace_stage_logs(&run_id, &logs)?;
        result.map(|_| run_id)
    }

    /// Executes the staged pipeline and creates the draft.
    fn execute_pipeline(
        &self,
        run_id: &RunId,
        logs: &mut Vec<StageLog>,
    ) -> Result<DraftId, OrchestratorError> {
        let collector = Collector::new(self.sources.clone());
        let (materials, log) = execute(&collector, self.clock, ());
        self.push_log(run_id, logs, log)?;
        let materials = materials?;

        let recent_posts = self.recent_posts()?;

        let curator = Curator::new(self.llm, self.config.retry);
        let (topic_plan, log) =
            execute(&curator, self.clock, (materials.clone(), recent_posts.clone()));
        self.push_log(run_id, logs, log)?;
        let topic_plan = topic_plan?;

        let style_profile = self.style_profile()?;

        let planner =
            ThreadPlanner::new(self.llm, self.config.retry, self.config.thread_policy);
        let (thread_plan, log) =
            execute(&planner, self.clock, (topic_plan.clone(), materials.clone()));
        self.push_log(run_id, logs, log)?;
        let thread_plan = thread_plan?;

        let artifacts = self.rewrite_loop(
            run_id,
            logs,
            &topic_plan,
            &thread_plan,
            &style_profile,
            &materials,
            &recent_posts,
        )?;

        let (draft_id, expires_at) = self.create_draft(
            run_id,
            &materials,
            &topic_plan,
            &style_profile,
            &thread_plan,
            &artifacts,
        )?;

        self.notify(run_id, logs, &draft_id, expires_at, &artifacts)?;
        Ok(draft_id)
    }

    /// Runs Writer → Critic → Policy with the bounded rewrite loop.
    ///
    /// The writer executes at most `rewrite_max + 1` times.
    #[allow(
        clippy::too_many_arguments,
        reason = "The loop reads every accumulated pipeline artifact."
    )]
    fn rewrite_loop(
        &self,
        run_id: &RunId,
        logs: &mut Vec<StageLog>,
        topic_plan: &TopicPlan,
        thread_plan: &ThreadPlan,
        style_profile: &StyleProfile,
        materials: &Materials,
        recent_posts: &[String],
    ) -> Result<GenerationArtifacts, OrchestratorError> {
        let writer = Writer::new(self.llm, self.config.retry);
        let critic = Critic::new(self.llm, self.config.retry);
        let engine = PolicyEngine::new(
            self.config.blocked_terms.clone(),
            self.config.similarity_threshold,
        );
        let policy_stage = PolicyStage::new(&engine);

        let mut rewrites = 0_u32;
        loop {
            let (candidates, log) = execute(
                &writer,
                self.clock,
                (
                    topic_plan.clone(),
                    thread_plan.clone(),
                    style_profile.clone(),
                    materials.clone(),
                ),
            );
            self.push_log(run_id, logs, log)?;
            let candidates = candidates?;

            let (edited, log) = execute(
                &critic,
                self.clock,
                (
                    candidates.clone(),
                    materials.clone(),
                    style_profile.clone(),
                    thread_plan.clone(),
                ),
            );
            self.push_log(run_id, logs, log)?;
            let edited = edited?;

            let (report, log) = execute(
                &policy_stage,
                self.clock,
                (
                    edited.clone(),
                    materials.clone(),
                    recent_posts.to_vec(),
                    style_profile.clone(),
                ),
            );
            self.push_log(run_id, logs, log)?;
            let report = report?;

            match report.action {
                PolicyAction::Pass => {
                    return Ok(GenerationArtifacts { candidates, edited, report });
                }
                PolicyAction::Rewrite if rewrites < self.config.rewrite_max => {
                    rewrites += 1;
                    info!(run_id = %run_id, rewrites, "policy requested rewrite");
                }
                PolicyAction::Rewrite | PolicyAction::Hold => {
                    return Ok(GenerationArtifacts { candidates, edited, report });
                }
            }
        }
    }

    /// Creates the draft row idempotently and issues its action tokens.
    fn create_draft(
        &self,
        run_id: &RunId,
        materials: &Materials,
        topic_plan: &TopicPlan,
        style_profile: &StyleProfile,
        thread_plan: &ThreadPlan,
        artifacts: &GenerationArtifacts,
    ) -> Result<(DraftId, Timestamp), OrchestratorError> {
        let tweets = artifacts.edited.composed_tweets();
        let final_text = tweets
            .first()
            .cloned()
            .ok_or_else(|| OrchestratorError::Invalid("pipeline produced no text".to_string()))?;
        let thread_enabled = artifacts.edited.mode == DraftMode::Thread;

        let now = self.clock.now();
        let draft = Draft {
            id: DraftId::for_run(run_id),
            run_id: run_id.clone(),
            created_at: now,
            expires_at: now.plus_hours(self.config.token_ttl_hours),
            status: if artifacts.report.action == PolicyAction::Pass {
                DraftStatus::Pending
            } else {
                DraftStatus::NeedsHumanAttention
            },
            token_consumed: false,
            consumed_at: None,
            thread_enabled,
            tweets: thread_enabled.then(|| tweets.clone()),
            final_text,
            materials: materials.clone(),
            topic_plan: topic_plan.clone(),
            style_profile: style_profile.clone(),
            thread_plan: thread_plan.clone(),
            candidates: artifacts.candidates.clone(),
            edited_draft: artifacts.edited.clone(),
            policy_report: artifacts.report.clone(),
            published_tweet_ids: None,
            approval_idempotency_key: None,
            last_error: None,
        };
        let expires_at = draft.expires_at;
        let inserted = self.store.insert_draft(&draft)?;
        if !inserted {
            info!(draft_id = %draft.id, "draft already existed, reusing");
        }
        Ok((draft.id, expires_at))
    }

    /// Issues review tokens and delivers the notification best-effort.
    fn notify(
        &self,
        run_id: &RunId,
        logs: &mut Vec<StageLog>,
        draft_id: &DraftId,
        expires_at: Timestamp,
        artifacts: &GenerationArtifacts,
    ) -> Result<(), OrchestratorError> {
        let start_ts = self.clock.now();
        let tokens = issue_review_tokens(self.store, draft_id, start_ts, expires_at)?;
        let packet = ReviewPacket {
            draft_id: draft_id.clone(),
            tokens,
            mode: artifacts.edited.mode.as_str().to_string(),
            text: artifacts.edited.final_text.clone(),
            tweets: artifacts.edited.final_tweets.clone(),
            policy_report: artifacts.report.clone(),
        };
        let result = self.notifier.notify(&packet);
        let end_ts = self.clock.now();
        let log = StageLog {
            stage_name: "notifier".to_string(),
            start_ts,
            end_ts,
            duration_ms: end_ts.millis_since(start_ts),
            input_summary: truncate_summary(&format!("draft={draft_id}")),
            output_summary: truncate_summary(&format!(
                "email_sent={}, webhook_sent={}",
                result.email_sent, result.webhook_sent
            )),
            errors: None,
            warnings: result.errors.iter().map(|err| truncate_summary(err)).collect(),
        };
        self.push_log(run_id, logs, log)?;
        Ok(())
    }

    /// Appends one stage log and persists the buffer.
    fn push_log(
        &self,
        run_id: &RunId,
        logs: &mut Vec<StageLog>,
        log: StageLog,
    ) -> Result<(), StoreError> {
        logs.push(log);
        self.store.replace_stage_logs(run_id, logs)
    }

    /// Loads the de-duplication window of recent posts.
    fn recent_posts(&self) -> Result<Vec<String>, StoreError> {
        let cutoff = self.clock.now().minus_days(self.config.recent_posts_days);
        self.store.recent_posts(cutoff, self.config.recent_posts_limit)
    }

    /// Loads the active style profile, or the built-in default.
    fn style_profile(&self) -> Result<StyleProfile, StoreError> {
        Ok(self.store.latest_style_profile()?.unwrap_or_default())
    }

    // ------------------------------------------------------------------
    // Auxiliary operations
    // ------------------------------------------------------------------

    /// Re-learns the style profile from recent posts and a devlog excerpt.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when persistence fails.
    pub fn update_style_profile(
        &self,
        devlog_excerpt: &str,
    ) -> Result<StyleProfile, OrchestratorError> {
        let cutoff = self.clock.now().minus_days(self.config.recent_posts_days);
        let posts = self.store.recent_posts(cutoff, self.config.style_input_posts)?;
        let learner = StyleLearner::new(self.llm, self.config.retry);
        let (profile, _log) =
            execute(&learner, self.clock, (posts, devlog_excerpt.to_string()));
        let profile = profile?;
        self.store.save_style_profile(&profile, self.clock.now())?;
        Ok(profile)
    }

    /// Generates, persists, and returns the weekly report for the 7-day
    /// window ending now. The report insert is idempotent on the window.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError`] when persistence fails.
    pub fn generate_weekly_report(&self) -> Result<WeeklyReport, OrchestratorError> {
        let week_end = self.clock.now();
        let week_start = week_end.minus_days(7);
        let posts = self.store.posts_in_window(week_start, week_end)?;
        let analyst = WeeklyAnalyst::new(self.llm, self.config.retry);
        let (report, _log) = execute(&analyst, self.clock, (week_start, week_end, posts));
        let report = report?;
        let saved = self.store.save_weekly_report(&report, week_end)?;
        if !saved {
            info!("weekly report window already recorded");
        }
        Ok(report)
    }
}

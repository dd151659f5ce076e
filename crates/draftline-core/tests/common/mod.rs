// crates/draftline-core/tests/common/mod.rs
// ============================================================================
// Module: Shared Test Fixtures
// Description: Clock, model, source, social, and draft fixtures for suites.
// ============================================================================
//! ## Overview
//! Deterministic stand-ins for every external seam: a stepping clock, a
//! scripted language model keyed on prompt markers, fixed evidence sources, a
//! recording social client, and a silent notifier.

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
    dead_code,
    reason = "Test-only fixtures; each suite uses a subset."
)]

use std::cell::Cell;
use std::cell::RefCell;
use std::collections::BTreeMap;

use draftline_core::Clock;
use draftline_core::Draft;
use draftline_core::DraftId;
use draftline_core::DraftStatus;
use draftline_core::EvidenceItem;
use draftline_core::EvidenceSource;
use draftline_core::LanguageModel;
use draftline_core::LlmError;
use draftline_core::Materials;
use draftline_core::NotificationResult;
use draftline_core::Notifier;
use draftline_core::PostReceipt;
use draftline_core::ReviewPacket;
use draftline_core::RunId;
use draftline_core::SocialClient;
use draftline_core::SocialError;
use draftline_core::SourceError;
use draftline_core::Timestamp;
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
use serde_json::Value;
use serde_json::json;

/// Fixed test time base.
pub const T0: i64 = 1_700_000_000_000;

/// Builds a timestamp offset from the base.
pub fn at(offset_ms: i64) -> Timestamp {
    Timestamp::from_unix_millis(T0 + offset_ms)
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Clock that advances a fixed step on every read.
pub struct SteppingClock {
    /// Next value to return, in unix millis.
    now: Cell<i64>,
    /// Step applied after each read.
    step: i64,
}

impl SteppingClock {
    /// Creates a clock starting at the base time.
    pub fn new(start: Timestamp, step_ms: i64) -> Self {
        Self { now: Cell::new(start.unix_millis()), step: step_ms }
    }

    /// Jumps the clock to an absolute time.
    pub fn set(&self, to: Timestamp) {
        self.now.set(to.unix_millis());
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Timestamp {
        let current = self.now.get();
        self.now.set(current + self.step);
        Timestamp::from_unix_millis(current)
    }
}

// ============================================================================
// SECTION: Language Model
// ============================================================================

/// Scripted model that answers by prompt marker and counts writer calls.
pub struct ScriptedModel {
    /// Response for the curator prompt.
    pub topic_plan: Value,
    /// Response for the writer prompt.
    pub candidates: Value,
    /// Response for the critic prompt.
    pub edited: Value,
    /// Number of writer prompts observed.
    pub writer_calls: Cell<u32>,
}

impl ScriptedModel {
    /// Builds the scripted model for the single-mode happy path.
    pub fn happy_single() -> Self {
        Self {
            topic_plan: json!({
                "topic_bucket": 1,
                "angles": ["shipping the fix"],
                "key_points": ["Fixed login redirect bug"],
                "evidence_map": {}
            }),
            candidates: json!({
                "candidates": [
                    {"mode": "single", "text": "Fixed login redirect bug and shipped it."}
                ]
            }),
            edited: json!({
                "mode": "single",
                "selected_candidate_index": 0,
                "original": {
                    "mode": "single",
                    "text": "Fixed login redirect bug and shipped it."
                },
                "final_text": "Fixed login redirect bug and shipped it.",
                "final_tweets": null,
                "numbering_added": false,
                "edit_notes": "tightened"
            }),
            writer_calls: Cell::new(0),
        }
    }
}

impl LanguageModel for ScriptedModel {
    fn chat_json(&self, prompt: &str) -> Result<Value, LlmError> {
        if prompt.contains("content strategist") {
            return Ok(self.topic_plan.clone());
        }
        if prompt.contains("ghostwriter") {
            self.writer_calls.set(self.writer_calls.get() + 1);
            return Ok(self.candidates.clone());
        }
        if prompt.contains("senior editor") {
            return Ok(self.edited.clone());
        }
        Err(LlmError::Transport("unscripted prompt".to_string()))
    }
}

/// Model that fails every call, driving all fallbacks.
pub struct DownModel;

impl LanguageModel for DownModel {
    fn chat_json(&self, _prompt: &str) -> Result<Value, LlmError> {
        Err(LlmError::Transport("model down".to_string()))
    }
}

// ============================================================================
// SECTION: Sources and Notifier
// ============================================================================

/// Source returning a fixed item list.
pub struct FixedSource {
    /// Source name.
    pub source_name: &'static str,
    /// Items returned by fetch.
    pub items: Vec<EvidenceItem>,
}

impl EvidenceSource for FixedSource {
    fn name(&self) -> &str {
        self.source_name
    }

    fn fetch(&self) -> Result<Vec<EvidenceItem>, SourceError> {
        Ok(self.items.clone())
    }
}

/// Builds the git source carrying one commit subject.
pub fn commit_source(subject: &str) -> FixedSource {
    FixedSource {
        source_name: "git",
        items: vec![EvidenceItem {
            source_name: "git".to_string(),
            source_id: "abc123".to_string(),
            timestamp: at(0),
            raw_snippet: subject.to_string(),
            title: Some(subject.to_string()),
            url: None,
        }],
    }
}

/// Notifier that records packets and reports clean delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    /// Packets received.
    pub packets: RefCell<Vec<ReviewPacket>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, packet: &ReviewPacket) -> NotificationResult {
        self.packets.borrow_mut().push(packet.clone());
        NotificationResult { email_sent: true, webhook_sent: false, errors: Vec::new() }
    }
}

// ============================================================================
// SECTION: Social Client
// ============================================================================

/// One recorded downstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialCall {
    /// Posted text.
    pub text: String,
    /// Reply anchor, when chained.
    pub in_reply_to: Option<String>,
}

/// Social client that records calls and can fail the first N of them.
#[derive(Default)]
pub struct RecordingSocial {
    /// Calls observed, in order.
    pub calls: RefCell<Vec<SocialCall>>,
    /// Remaining calls to fail before succeeding.
    pub failures_left: Cell<u32>,
    /// Sequence for generated ids.
    pub sequence: Cell<u32>,
}

impl RecordingSocial {
    /// Builds a client that fails the first `failures` calls.
    pub fn failing(failures: u32) -> Self {
        let client = Self::default();
        client.failures_left.set(failures);
        client
    }
}

impl SocialClient for RecordingSocial {
    fn create_post(
        &self,
        text: &str,
        in_reply_to: Option<&str>,
    ) -> Result<PostReceipt, SocialError> {
        if self.failures_left.get() > 0 {
            self.failures_left.set(self.failures_left.get() - 1);
            return Err(SocialError::Transport("downstream unavailable".to_string()));
        }
        self.calls.borrow_mut().push(SocialCall {
            text: text.to_string(),
            in_reply_to: in_reply_to.map(ToString::to_string),
        });
        let id = self.sequence.get() + 1;
        self.sequence.set(id);
        Ok(PostReceipt { id: format!("tweet-{id}") })
    }
}

// ============================================================================
// SECTION: Draft Fixtures
// ============================================================================

/// Builds a passing policy report.
pub fn pass_report() -> PolicyReport {
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

/// Builds a pending draft with grounded text, single or thread.
pub fn pending_draft(run_id: &RunId, tweets: &[&str]) -> Draft {
    let thread = tweets.len() > 1;
    let bodies: Vec<String> = tweets.iter().map(ToString::to_string).collect();
    let mode = if thread { DraftMode::Thread } else { DraftMode::Single };
    let materials = Materials {
        git_commits: bodies
            .iter()
            .enumerate()
            .map(|(index, body)| EvidenceItem {
                source_name: "git".to_string(),
                source_id: format!("commit-{index}"),
                timestamp: at(0),
                raw_snippet: body.clone(),
                title: None,
                url: None,
            })
            .collect(),
        ..Materials::default()
    };
    Draft {
        id: DraftId::for_run(run_id),
        run_id: run_id.clone(),
        created_at: at(0),
        expires_at: at(0).plus_hours(36),
        status: DraftStatus::Pending,
        token_consumed: false,
        consumed_at: None,
        thread_enabled: thread,
        tweets: thread.then(|| bodies.clone()),
        final_text: bodies[0].clone(),
        materials,
        topic_plan: TopicPlan {
            topic_bucket: 1,
            angles: vec!["angle".to_string()],
            key_points: bodies.clone(),
            evidence_map: BTreeMap::new(),
        },
        style_profile: StyleProfile::default(),
        thread_plan: if thread {
            ThreadPlan {
                enabled: true,
                tweets_count: u32::try_from(bodies.len()).unwrap(),
                numbering_enabled: false,
                reason: "test".to_string(),
                tweet_key_points: bodies.iter().map(|body| vec![body.clone()]).collect(),
                evidence_map: BTreeMap::new(),
            }
        } else {
            ThreadPlan::single(true)
        },
        candidates: DraftCandidates {
            candidates: vec![DraftCandidate {
                mode,
                text: (!thread).then(|| bodies[0].clone()),
                tweets: thread.then(|| bodies.clone()),
            }],
        },
        edited_draft: EditedDraft {
            mode,
            selected_candidate_index: 0,
            original: DraftCandidate { mode, text: None, tweets: None },
            final_text: Some(bodies[0].clone()),
            final_tweets: thread.then(|| bodies),
            numbering_added: false,
            edit_notes: String::new(),
        },
        policy_report: pass_report(),
        published_tweet_ids: None,
        approval_idempotency_key: None,
        last_error: None,
    }
}

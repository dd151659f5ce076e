// crates/draftline-core/src/core/plan.rs
// ============================================================================
// Module: Draftline Pipeline Intermediaries
// Description: Topic plans, style profiles, thread plans, and draft candidates.
// Purpose: Define the schema-enforced artifacts handed between generation stages.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every generation stage consumes and produces one of the types here. The
//! artifacts are persisted verbatim on the draft for post-hoc inspection and
//! for the regenerate flow, which replays Writer → Critic → Policy from the
//! stored [`TopicPlan`] and [`ThreadPlan`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::evidence::EvidenceRef;

// ============================================================================
// SECTION: Topic Plan
// ============================================================================

/// The curator's choice of what to write about today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicPlan {
    /// Coarse topic bucket chosen by the curator.
    pub topic_bucket: u32,
    /// Candidate angles on the topic.
    pub angles: Vec<String>,
    /// Key points the draft should cover.
    pub key_points: Vec<String>,
    /// Optional mapping from key point to supporting evidence.
    #[serde(default)]
    pub evidence_map: BTreeMap<String, Vec<EvidenceRef>>,
}

impl TopicPlan {
    /// Deterministic fallback plan used when materials are empty or the
    /// language model is unavailable.
    #[must_use]
    pub fn reflection() -> Self {
        Self {
            topic_bucket: 3,
            angles: vec!["A small reflection from today".to_string()],
            key_points: vec![
                "A small, honest reflection is better than a vague claim".to_string(),
            ],
            evidence_map: BTreeMap::new(),
        }
    }
}

// ============================================================================
// SECTION: Style Profile
// ============================================================================

/// Learned writing-style profile applied to generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleProfile {
    /// Openers the author tends to use.
    #[serde(default)]
    pub preferred_openers: Vec<String>,
    /// Phrases generation must avoid.
    #[serde(default)]
    pub forbidden_phrases: Vec<String>,
    /// Sentence length preference (`short` or `medium`).
    #[serde(default)]
    pub sentence_length_preference: String,
    /// Freeform tone rules fed to the writer.
    #[serde(default)]
    pub tone_rules: Vec<String>,
    /// Freeform formatting rules fed to the writer.
    #[serde(default)]
    pub formatting_rules: Vec<String>,
}

impl Default for StyleProfile {
    fn default() -> Self {
        Self {
            preferred_openers: vec![
                "Today:".to_string(),
                "One thing I learned:".to_string(),
                "Quick note:".to_string(),
            ],
            forbidden_phrases: vec!["game changer".to_string(), "revolutionary".to_string()],
            sentence_length_preference: "short".to_string(),
            tone_rules: vec![
                "No marketing".to_string(),
                "Prefer concrete trade-offs".to_string(),
                "Avoid exaggeration".to_string(),
            ],
            formatting_rules: vec!["Prefer 1-2 short lines".to_string()],
        }
    }
}

// ============================================================================
// SECTION: Thread Plan
// ============================================================================

/// The planner's decision between a single post and a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadPlan {
    /// True when a thread should be produced.
    pub enabled: bool,
    /// Number of tweets the thread should contain (1 for single mode).
    pub tweets_count: u32,
    /// True when `(i/N)` numbering suffixes are applied.
    #[serde(default = "default_numbering")]
    pub numbering_enabled: bool,
    /// Short reason recorded for the decision.
    #[serde(default)]
    pub reason: String,
    /// Key points assigned to each tweet.
    #[serde(default)]
    pub tweet_key_points: Vec<Vec<String>>,
    /// Optional mapping from tweet topic to supporting evidence.
    #[serde(default)]
    pub evidence_map: BTreeMap<String, Vec<EvidenceRef>>,
}

/// Serde default for `numbering_enabled`.
const fn default_numbering() -> bool {
    true
}

impl ThreadPlan {
    /// Returns a single-post plan.
    #[must_use]
    pub fn single(numbering_enabled: bool) -> Self {
        Self {
            enabled: false,
            tweets_count: 1,
            numbering_enabled,
            reason: "single".to_string(),
            tweet_key_points: Vec::new(),
            evidence_map: BTreeMap::new(),
        }
    }
}

// ============================================================================
// SECTION: Draft Candidates
// ============================================================================

/// Draft rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftMode {
    /// One standalone post.
    Single,
    /// A multi-tweet thread.
    Thread,
}

impl DraftMode {
    /// Returns a stable label for the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Thread => "thread",
        }
    }
}

/// One candidate produced by the writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftCandidate {
    /// Candidate rendering mode.
    pub mode: DraftMode,
    /// Body text for single mode.
    #[serde(default)]
    pub text: Option<String>,
    /// Tweet bodies for thread mode.
    #[serde(default)]
    pub tweets: Option<Vec<String>>,
}

/// The writer's full candidate set.
///
/// # Invariants
/// - The writer must emit at least one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftCandidates {
    /// Candidates in writer order.
    pub candidates: Vec<DraftCandidate>,
}

// ============================================================================
// SECTION: Edited Draft
// ============================================================================

/// The critic's selection and edit of one candidate.
///
/// # Invariants
/// - `mode == Thread` implies `final_tweets` is non-empty and `final_text`
///   equals the first tweet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditedDraft {
    /// Rendering mode carried from the selected candidate.
    pub mode: DraftMode,
    /// Index of the selected candidate within the writer output.
    pub selected_candidate_index: u32,
    /// The unedited original candidate.
    pub original: DraftCandidate,
    /// Final single-post body, or the first tweet in thread mode.
    #[serde(default)]
    pub final_text: Option<String>,
    /// Final tweet bodies in thread mode.
    #[serde(default)]
    pub final_tweets: Option<Vec<String>>,
    /// True when numbering suffixes were applied.
    #[serde(default)]
    pub numbering_added: bool,
    /// Freeform notes from the critic.
    #[serde(default)]
    pub edit_notes: String,
}

impl EditedDraft {
    /// Returns the composed tweet list: the thread bodies, or the single body
    /// as a one-element list. Blank entries are dropped.
    #[must_use]
    pub fn composed_tweets(&self) -> Vec<String> {
        let raw: Vec<String> = match (self.mode, &self.final_tweets, &self.final_text) {
            (DraftMode::Thread, Some(tweets), _) => tweets.clone(),
            (_, _, Some(text)) => vec![text.clone()],
            _ => Vec::new(),
        };
        raw.into_iter()
            .map(|tweet| tweet.trim().to_string())
            .filter(|tweet| !tweet.is_empty())
            .collect()
    }

    /// Returns the canonical final text (first tweet in thread mode).
    #[must_use]
    pub fn canonical_text(&self) -> String {
        if let Some(text) = &self.final_text
            && !text.is_empty()
        {
            return text.clone();
        }
        self.final_tweets
            .as_ref()
            .and_then(|tweets| tweets.first().cloned())
            .unwrap_or_default()
    }
}

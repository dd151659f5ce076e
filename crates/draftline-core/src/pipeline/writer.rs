// crates/draftline-core/src/pipeline/writer.rs
// ============================================================================
// Module: Writer Stage
// Description: Candidate drafting under style and hard content rules.
// Purpose: Emit at least one candidate, degrading to a materials-derived draft.
// Dependencies: crate::{core, interfaces, pipeline, retry}, serde_json
// ============================================================================

//! ## Overview
//! The writer produces candidate posts conditioned on the topic plan, thread
//! plan, style profile, and materials. Hard rules: no marketing tone, no
//! emoji, no hashtags, no fabrication beyond materials; 260 chars per single
//! candidate, 270 per thread tweet (leaving room for numbering). When the
//! model fails after retries the writer composes one deterministic candidate
//! from the plan's key points so the run can still reach policy and review.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::evidence::Materials;
use crate::core::plan::DraftCandidate;
use crate::core::plan::DraftCandidates;
use crate::core::plan::DraftMode;
use crate::core::plan::StyleProfile;
use crate::core::plan::ThreadPlan;
use crate::core::plan::TopicPlan;
use crate::interfaces::LanguageModel;
use crate::pipeline::Stage;
use crate::pipeline::StageError;
use crate::pipeline::prompt_excerpt;
use crate::pipeline::prompt_list;
use crate::retry::RetryPolicy;
use crate::retry::with_retry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Character budget for a single-mode candidate.
const SINGLE_CHAR_BUDGET: usize = 260;
/// Character budget per thread tweet, leaving space for numbering.
const THREAD_CHAR_BUDGET: usize = 270;

// ============================================================================
// SECTION: Writer
// ============================================================================

/// Candidate drafting stage.
pub struct Writer<'a, L: LanguageModel> {
    /// Language model adapter.
    llm: &'a L,
    /// Retry policy for model calls.
    retry: RetryPolicy,
}

impl<'a, L: LanguageModel> Writer<'a, L> {
    /// Creates a writer over the given model.
    #[must_use]
    pub fn new(llm: &'a L, retry: RetryPolicy) -> Self {
        Self { llm, retry }
    }

    /// Builds the single-mode prompt.
    fn single_prompt(
        topic_plan: &TopicPlan,
        style: &StyleProfile,
        materials: &Materials,
    ) -> String {
        let git_subjects: Vec<String> =
            materials.git_commits.iter().map(|c| c.raw_snippet.clone()).collect();
        let notes: Vec<String> = materials.notes.iter().map(|n| n.raw_snippet.clone()).collect();
        format!(
            "You are a ghostwriter for a senior full-stack engineer building in public.\n\n\
             Materials (facts only):\n\
             - git subjects: {git}\n\
             - devlog: {devlog}\n\
             - notes: {notes}\n\n\
             Topic angles: {angles}\n\
             Key points: {points}\n\n\
             Personal style:\n\
             - preferred_openers: {openers}\n\
             - forbidden_phrases: {forbidden}\n\
             - sentence_length_preference: {sentence}\n\
             - tone_rules: {tone}\n\
             - formatting_rules: {formatting}\n\n\
             Hard rules:\n\
             - No emojis. No hashtags. No marketing tone.\n\
             - Do not invent facts. If materials are empty, produce a reflection and clearly \
             label it as opinion.\n\
             - Each candidate must be <= 260 characters.\n\n\
             Return JSON only:\n\
             {{\"candidates\": [{{\"mode\":\"single\",\"text\":\"...\"}}]}}",
            git = prompt_list(&git_subjects, 50),
            devlog = prompt_excerpt(materials.devlog_text(), 2000),
            notes = prompt_list(&notes, 20),
            angles = prompt_list(&topic_plan.angles, 10),
            points = prompt_list(&topic_plan.key_points, 10),
            openers = prompt_list(&style.preferred_openers, 10),
            forbidden = prompt_list(&style.forbidden_phrases, 20),
            sentence = style.sentence_length_preference,
            tone = prompt_list(&style.tone_rules, 10),
            formatting = prompt_list(&style.formatting_rules, 10),
        )
    }

    /// Builds the thread-mode prompt.
    fn thread_prompt(
        thread_plan: &ThreadPlan,
        style: &StyleProfile,
        materials: &Materials,
    ) -> String {
        let git_subjects: Vec<String> =
            materials.git_commits.iter().map(|c| c.raw_snippet.clone()).collect();
        let chunks = serde_json::to_string(&thread_plan.tweet_key_points)
            .unwrap_or_else(|_| "[]".to_string());
        format!(
            "You are a ghostwriter for an X thread (2-5 tweets).\n\n\
             Materials (facts only):\n\
             - git subjects: {git}\n\
             - devlog: {devlog}\n\n\
             Thread plan: tweets_count={count}; tweet_key_points={chunks}\n\
             Personal style:\n\
             - preferred_openers: {openers}\n\
             - forbidden_phrases: {forbidden}\n\n\
             Hard rules:\n\
             - No emojis. No hashtags. No marketing tone.\n\
             - Do not invent facts. If materials are empty, produce opinions and label them as \
             opinion.\n\
             - Produce 3 candidate threads; each thread is a list of {count} tweets.\n\
             - Each tweet must be <= 270 characters (leaving space for numbering if enabled).\n\n\
             Return JSON only:\n\
             {{\"candidates\": [{{\"mode\":\"thread\",\"tweets\":[\"...\",\"...\"]}}]}}",
            git = prompt_list(&git_subjects, 50),
            devlog = prompt_excerpt(materials.devlog_text(), 2000),
            count = thread_plan.tweets_count,
            openers = prompt_list(&style.preferred_openers, 10),
            forbidden = prompt_list(&style.forbidden_phrases, 20),
        )
    }

    /// Keeps only candidates that match the planned mode and carry a body.
    fn usable(candidates: DraftCandidates, thread: bool) -> Vec<DraftCandidate> {
        candidates
            .candidates
            .into_iter()
            .filter(|candidate| {
                if thread {
                    candidate.mode == DraftMode::Thread
                        && candidate
                            .tweets
                            .as_ref()
                            .is_some_and(|tweets| tweets.iter().any(|t| !t.trim().is_empty()))
                } else {
                    candidate.mode == DraftMode::Single
                        && candidate.text.as_ref().is_some_and(|text| !text.trim().is_empty())
                }
            })
            .collect()
    }

    /// Deterministic fallback candidate composed from the plan's key points.
    fn fallback(topic_plan: &TopicPlan, thread_plan: &ThreadPlan) -> DraftCandidate {
        if thread_plan.enabled {
            let tweets: Vec<String> = thread_plan
                .tweet_key_points
                .iter()
                .map(|chunk| clip(&chunk.join(". "), THREAD_CHAR_BUDGET))
                .filter(|tweet| !tweet.is_empty())
                .collect();
            DraftCandidate { mode: DraftMode::Thread, text: None, tweets: Some(tweets) }
        } else {
            let body = if topic_plan.key_points.is_empty() {
                topic_plan.angles.join("; ")
            } else {
                topic_plan.key_points.join("; ")
            };
            DraftCandidate {
                mode: DraftMode::Single,
                text: Some(clip(&body, SINGLE_CHAR_BUDGET)),
                tweets: None,
            }
        }
    }
}

/// Clips a string to a character budget, trimming trailing whitespace.
fn clip(text: &str, budget: usize) -> String {
    let clipped: String = text.chars().take(budget).collect();
    clipped.trim().to_string()
}

impl<L: LanguageModel> Stage for Writer<'_, L> {
    type Input = (TopicPlan, ThreadPlan, StyleProfile, Materials);
    type Output = DraftCandidates;

    fn name(&self) -> &'static str {
        "writer"
    }

    fn input_summary(&self, input: &Self::Input) -> String {
        format!(
            "TopicPlan(key_points={}), thread={}",
            input.0.key_points.len(),
            input.1.enabled
        )
    }

    fn output_summary(&self, output: &Self::Output) -> String {
        format!("DraftCandidates(len={})", output.candidates.len())
    }

    fn warnings(&self, _output: &Self::Output) -> Vec<String> {
        Vec::new()
    }

    fn run(&self, input: Self::Input) -> Result<Self::Output, StageError> {
        let (topic_plan, thread_plan, style, materials) = input;
        let prompt = if thread_plan.enabled {
            Self::thread_prompt(&thread_plan, &style, &materials)
        } else {
            Self::single_prompt(&topic_plan, &style, &materials)
        };
        let parsed = with_retry(self.retry, || self.llm.chat_json(&prompt))
            .ok()
            .and_then(|value| serde_json::from_value::<DraftCandidates>(value).ok())
            .map(|candidates| Self::usable(candidates, thread_plan.enabled))
            .filter(|usable| !usable.is_empty());
        let candidates = parsed
            .unwrap_or_else(|| vec![Self::fallback(&topic_plan, &thread_plan)]);
        Ok(DraftCandidates { candidates })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use std::collections::BTreeMap;

    use serde_json::Value;
    use serde_json::json;

    use crate::core::evidence::Materials;
    use crate::core::plan::DraftMode;
    use crate::core::plan::StyleProfile;
    use crate::core::plan::ThreadPlan;
    use crate::core::plan::TopicPlan;
    use crate::interfaces::LanguageModel;
    use crate::interfaces::LlmError;
    use crate::pipeline::Stage;
    use crate::retry::RetryPolicy;

    use super::Writer;

    /// Model stub returning a fixed JSON value or failing.
    struct StubModel {
        /// Response payload; `None` simulates transport failure.
        response: Option<Value>,
    }

    impl LanguageModel for StubModel {
        fn chat_json(&self, _prompt: &str) -> Result<Value, LlmError> {
            self.response.clone().ok_or_else(|| LlmError::Transport("down".to_string()))
        }
    }

    /// Builds the common topic plan fixture.
    fn topic_plan() -> TopicPlan {
        TopicPlan {
            topic_bucket: 1,
            angles: vec!["shipping".to_string()],
            key_points: vec!["Fixed the login redirect bug".to_string()],
            evidence_map: BTreeMap::new(),
        }
    }

    /// Tests usable model candidates survive filtering.
    #[test]
    fn test_keeps_usable_candidates() {
        let model = StubModel {
            response: Some(json!({
                "candidates": [
                    {"mode": "single", "text": "Fixed the login redirect bug today."},
                    {"mode": "single", "text": "   "},
                    {"mode": "thread", "tweets": ["wrong mode"]}
                ]
            })),
        };
        let writer = Writer::new(&model, RetryPolicy::immediate(1));
        let out = writer
            .run((topic_plan(), ThreadPlan::single(true), StyleProfile::default(), Materials::default()))
            .unwrap();
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].mode, DraftMode::Single);
    }

    /// Tests the deterministic fallback composes from key points.
    #[test]
    fn test_fallback_candidate_from_key_points() {
        let model = StubModel { response: None };
        let writer = Writer::new(&model, RetryPolicy::immediate(2));
        let out = writer
            .run((topic_plan(), ThreadPlan::single(true), StyleProfile::default(), Materials::default()))
            .unwrap();
        assert_eq!(out.candidates.len(), 1);
        let text = out.candidates[0].text.clone().unwrap();
        assert!(text.contains("login redirect"));
        assert!(text.chars().count() <= 260);
    }
}

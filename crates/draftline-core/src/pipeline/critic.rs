// crates/draftline-core/src/pipeline/critic.rs
// ============================================================================
// Module: Critic Stage
// Description: Candidate selection, editing, and thread numbering.
// Purpose: Reduce the candidate set to one edited draft within hard limits.
// Dependencies: crate::{core, interfaces, pipeline, retry}, serde_json
// ============================================================================

//! ## Overview
//! The critic picks the best candidate and tightens it. Numbering is never
//! delegated to the model: when the plan is a numbered thread, the `(i/N)`
//! suffixes are appended here, truncating bodies so each tweet stays within
//! 280 characters. The fallback selects the first candidate unedited.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::evidence::Materials;
use crate::core::plan::DraftCandidate;
use crate::core::plan::DraftCandidates;
use crate::core::plan::DraftMode;
use crate::core::plan::EditedDraft;
use crate::core::plan::StyleProfile;
use crate::core::plan::ThreadPlan;
use crate::interfaces::LanguageModel;
use crate::pipeline::Stage;
use crate::pipeline::StageError;
use crate::pipeline::prompt_list;
use crate::retry::RetryPolicy;
use crate::retry::with_retry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Hard character limit per published tweet.
const TWEET_CHAR_LIMIT: usize = 280;

// ============================================================================
// SECTION: Critic
// ============================================================================

/// Candidate selection and editing stage.
pub struct Critic<'a, L: LanguageModel> {
    /// Language model adapter.
    llm: &'a L,
    /// Retry policy for model calls.
    retry: RetryPolicy,
}

impl<'a, L: LanguageModel> Critic<'a, L> {
    /// Creates a critic over the given model.
    #[must_use]
    pub fn new(llm: &'a L, retry: RetryPolicy) -> Self {
        Self { llm, retry }
    }

    /// Builds the editing prompt.
    fn prompt(
        candidates: &DraftCandidates,
        materials: &Materials,
        style: &StyleProfile,
        thread_plan: &ThreadPlan,
    ) -> String {
        let candidates_json =
            serde_json::to_string(candidates).unwrap_or_else(|_| "{}".to_string());
        format!(
            "You are a senior editor.\n\n\
             Candidates JSON:\n{candidates_json}\n\n\
             Context summary:\n\
             - git commits: {commits}\n\
             - notes: {notes}\n\
             - links: {links}\n\
             - thread_enabled: {thread}\n\
             - numbering_enabled: {numbering}\n\n\
             Personal style:\n\
             - forbidden_phrases: {forbidden}\n\
             - tone_rules: {tone}\n\n\
             Task:\n\
             - Pick the best candidate.\n\
             - Edit to reduce fluff, improve first sentence, and keep it grounded.\n\
             - If thread: ensure consistent flow across tweets.\n\
             - Strict char limit: each final tweet <= 280.\n\n\
             Return JSON only:\n\
             {{\"mode\": \"single\", \"selected_candidate_index\": 0, \"original\": {{}}, \
             \"final_text\": \"...\", \"final_tweets\": [\"...\"], \"numbering_added\": false, \
             \"edit_notes\": \"...\"}}",
            commits = materials.git_commits.len(),
            notes = materials.notes.len(),
            links = materials.links.len(),
            thread = thread_plan.enabled,
            numbering = thread_plan.numbering_enabled,
            forbidden = prompt_list(&style.forbidden_phrases, 20),
            tone = prompt_list(&style.tone_rules, 10),
        )
    }

    /// Fallback: select the first candidate unedited.
    fn fallback(candidates: &DraftCandidates) -> Option<EditedDraft> {
        let first = candidates.candidates.first()?;
        Some(Self::from_candidate(first))
    }

    /// Builds an edited draft that carries a candidate verbatim.
    fn from_candidate(candidate: &DraftCandidate) -> EditedDraft {
        EditedDraft {
            mode: candidate.mode,
            selected_candidate_index: 0,
            original: candidate.clone(),
            final_text: match candidate.mode {
                DraftMode::Single => candidate.text.clone(),
                DraftMode::Thread => {
                    candidate.tweets.as_ref().and_then(|tweets| tweets.first().cloned())
                }
            },
            final_tweets: match candidate.mode {
                DraftMode::Single => None,
                DraftMode::Thread => candidate.tweets.clone(),
            },
            numbering_added: false,
            edit_notes: "fallback: first candidate selected unedited".to_string(),
        }
    }

    /// Validates a model-produced edit against the candidate set.
    fn usable(edited: EditedDraft, thread_plan: &ThreadPlan) -> Option<EditedDraft> {
        let mode_matches = edited.mode
            == if thread_plan.enabled { DraftMode::Thread } else { DraftMode::Single };
        let has_body = !edited.composed_tweets().is_empty();
        (mode_matches && has_body).then_some(edited)
    }
}

/// Appends `(i/N)` numbering suffixes, truncating to the tweet limit.
#[must_use]
pub fn add_numbering(tweets: &[String]) -> Vec<String> {
    let total = tweets.len();
    tweets
        .iter()
        .enumerate()
        .map(|(index, tweet)| {
            let suffix = format!(" ({}/{total})", index + 1);
            let body = tweet.trim();
            let body_chars = body.chars().count();
            let suffix_chars = suffix.chars().count();
            if body_chars + suffix_chars <= TWEET_CHAR_LIMIT {
                format!("{body}{suffix}")
            } else {
                let keep = TWEET_CHAR_LIMIT.saturating_sub(suffix_chars);
                let clipped: String = body.chars().take(keep).collect();
                format!("{}{suffix}", clipped.trim_end())
            }
        })
        .collect()
}

impl<L: LanguageModel> Stage for Critic<'_, L> {
    type Input = (DraftCandidates, Materials, StyleProfile, ThreadPlan);
    type Output = EditedDraft;

    fn name(&self) -> &'static str {
        "critic"
    }

    fn input_summary(&self, input: &Self::Input) -> String {
        format!("DraftCandidates(len={})", input.0.candidates.len())
    }

    fn output_summary(&self, output: &Self::Output) -> String {
        format!(
            "EditedDraft(mode={}, tweets={})",
            output.mode.as_str(),
            output.composed_tweets().len()
        )
    }

    fn warnings(&self, _output: &Self::Output) -> Vec<String> {
        Vec::new()
    }

    fn run(&self, input: Self::Input) -> Result<Self::Output, StageError> {
        let (candidates, materials, style, thread_plan) = input;
        if candidates.candidates.is_empty() {
            return Err(StageError::Invalid("critic received no candidates".to_string()));
        }
        let prompt = Self::prompt(&candidates, &materials, &style, &thread_plan);
        let edited = with_retry(self.retry, || self.llm.chat_json(&prompt))
            .ok()
            .and_then(|value| serde_json::from_value::<EditedDraft>(value).ok())
            .and_then(|edited| Self::usable(edited, &thread_plan))
            .or_else(|| Self::fallback(&candidates));
        let Some(mut edited) = edited else {
            return Err(StageError::Invalid("critic produced no usable draft".to_string()));
        };

        if edited.mode == DraftMode::Thread {
            if thread_plan.numbering_enabled && let Some(tweets) = edited.final_tweets.clone() {
                let numbered = add_numbering(&tweets);
                edited.final_text = numbered.first().cloned();
                edited.final_tweets = Some(numbered);
                edited.numbering_added = true;
            } else if let Some(first) =
                edited.final_tweets.as_ref().and_then(|tweets| tweets.first().cloned())
            {
                edited.final_text = Some(first);
            }
        }
        Ok(edited)
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

    use serde_json::Value;

    use crate::core::evidence::Materials;
    use crate::core::plan::DraftCandidate;
    use crate::core::plan::DraftCandidates;
    use crate::core::plan::DraftMode;
    use crate::core::plan::StyleProfile;
    use crate::core::plan::ThreadPlan;
    use crate::interfaces::LanguageModel;
    use crate::interfaces::LlmError;
    use crate::pipeline::Stage;
    use crate::retry::RetryPolicy;

    use super::Critic;
    use super::add_numbering;

    /// Model stub that always fails, forcing the fallback path.
    struct FailingModel;

    impl LanguageModel for FailingModel {
        fn chat_json(&self, _prompt: &str) -> Result<Value, LlmError> {
            Err(LlmError::Transport("down".to_string()))
        }
    }

    /// Tests numbering suffixes and the first-tweet mirror.
    #[test]
    fn test_numbering_suffixes() {
        let tweets =
            vec!["first point".to_string(), "second point".to_string(), "third".to_string()];
        let numbered = add_numbering(&tweets);
        assert_eq!(numbered[0], "first point (1/3)");
        assert_eq!(numbered[2], "third (3/3)");
    }

    /// Tests numbering truncates to the 280-char hard limit.
    #[test]
    fn test_numbering_truncates_long_tweet() {
        let long = "x".repeat(300);
        let numbered = add_numbering(&[long]);
        assert_eq!(numbered[0].chars().count(), 280);
        assert!(numbered[0].ends_with(" (1/1)"));
    }

    /// Tests the thread fallback numbers the first candidate.
    #[test]
    fn test_fallback_thread_gets_numbering() {
        let model = FailingModel;
        let critic = Critic::new(&model, RetryPolicy::immediate(1));
        let candidates = DraftCandidates {
            candidates: vec![DraftCandidate {
                mode: DraftMode::Thread,
                text: None,
                tweets: Some(vec!["one".to_string(), "two".to_string()]),
            }],
        };
        let thread_plan = ThreadPlan {
            enabled: true,
            tweets_count: 2,
            numbering_enabled: true,
            reason: String::new(),
            tweet_key_points: Vec::new(),
            evidence_map: std::collections::BTreeMap::new(),
        };
        let edited = critic
            .run((candidates, Materials::default(), StyleProfile::default(), thread_plan))
            .unwrap();
        assert!(edited.numbering_added);
        let tweets = edited.final_tweets.unwrap();
        assert_eq!(tweets, vec!["one (1/2)".to_string(), "two (2/2)".to_string()]);
        assert_eq!(edited.final_text.unwrap(), "one (1/2)");
    }
}

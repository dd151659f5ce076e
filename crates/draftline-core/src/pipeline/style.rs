// crates/draftline-core/src/pipeline/style.rs
// ============================================================================
// Module: Style Learner Stage
// Description: Style profile learning from recent posts and the devlog.
// Purpose: Keep the writer conditioned on the author's observed voice.
// Dependencies: crate::{core, interfaces, pipeline, retry}, serde_json
// ============================================================================

//! ## Overview
//! The style learner periodically distills recent posted texts and a devlog
//! excerpt into a [`StyleProfile`]. On model failure the built-in default
//! profile is returned; generation never blocks on style learning.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::plan::StyleProfile;
use crate::interfaces::LanguageModel;
use crate::pipeline::Stage;
use crate::pipeline::StageError;
use crate::pipeline::prompt_excerpt;
use crate::pipeline::prompt_list;
use crate::retry::RetryPolicy;
use crate::retry::with_retry;

// ============================================================================
// SECTION: Style Learner
// ============================================================================

/// Style-learning stage.
pub struct StyleLearner<'a, L: LanguageModel> {
    /// Language model adapter.
    llm: &'a L,
    /// Retry policy for model calls.
    retry: RetryPolicy,
}

impl<'a, L: LanguageModel> StyleLearner<'a, L> {
    /// Creates a style learner over the given model.
    #[must_use]
    pub fn new(llm: &'a L, retry: RetryPolicy) -> Self {
        Self { llm, retry }
    }

    /// Builds the learning prompt.
    fn prompt(posts: &[String], devlog_excerpt: &str) -> String {
        format!(
            "You are learning a writer's personal style.\n\n\
             Inputs:\n\
             - Approved/posted tweets (most recent first): {posts}\n\
             - Devlog excerpt (may be empty): {devlog}\n\n\
             Output a JSON style profile:\n\
             {{\"preferred_openers\": [\"...\"], \"forbidden_phrases\": [\"...\"], \
             \"sentence_length_preference\": \"short\", \"tone_rules\": [\"...\"], \
             \"formatting_rules\": [\"...\"]}}",
            posts = prompt_list(posts, 50),
            devlog = prompt_excerpt(devlog_excerpt, 2000),
        )
    }
}

impl<L: LanguageModel> Stage for StyleLearner<'_, L> {
    type Input = (Vec<String>, String);
    type Output = StyleProfile;

    fn name(&self) -> &'static str {
        "style"
    }

    fn input_summary(&self, input: &Self::Input) -> String {
        format!("posts={}, devlog_chars={}", input.0.len(), input.1.len())
    }

    fn output_summary(&self, output: &Self::Output) -> String {
        format!(
            "StyleProfile(openers={}, forbidden={})",
            output.preferred_openers.len(),
            output.forbidden_phrases.len()
        )
    }

    fn warnings(&self, _output: &Self::Output) -> Vec<String> {
        Vec::new()
    }

    fn run(&self, input: Self::Input) -> Result<Self::Output, StageError> {
        let (posts, devlog_excerpt) = input;
        let prompt = Self::prompt(&posts, &devlog_excerpt);
        let profile = with_retry(self.retry, || self.llm.chat_json(&prompt))
            .ok()
            .and_then(|value| serde_json::from_value::<StyleProfile>(value).ok());
        Ok(profile.unwrap_or_default())
    }
}

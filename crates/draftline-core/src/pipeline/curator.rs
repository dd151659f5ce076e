// crates/draftline-core/src/pipeline/curator.rs
// ============================================================================
// Module: Curator Stage
// Description: Topic selection over the collected materials.
// Purpose: Produce a TopicPlan, or a reflection plan when materials are empty.
// Dependencies: crate::{core, interfaces, pipeline, retry}, serde_json
// ============================================================================

//! ## Overview
//! The curator asks the language model to choose a topic plan from the
//! materials and recent posts. It degrades to the deterministic reflection
//! plan when the model fails or returns an unusable payload.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::evidence::Materials;
use crate::core::plan::TopicPlan;
use crate::interfaces::LanguageModel;
use crate::pipeline::Stage;
use crate::pipeline::StageError;
use crate::pipeline::prompt_excerpt;
use crate::pipeline::prompt_list;
use crate::retry::RetryPolicy;
use crate::retry::with_retry;

// ============================================================================
// SECTION: Curator
// ============================================================================

/// Topic-selection stage.
pub struct Curator<'a, L: LanguageModel> {
    /// Language model adapter.
    llm: &'a L,
    /// Retry policy for model calls.
    retry: RetryPolicy,
}

impl<'a, L: LanguageModel> Curator<'a, L> {
    /// Creates a curator over the given model.
    #[must_use]
    pub fn new(llm: &'a L, retry: RetryPolicy) -> Self {
        Self { llm, retry }
    }

    /// Builds the curator prompt.
    fn prompt(materials: &Materials, recent_posts: &[String]) -> String {
        let git_subjects: Vec<String> =
            materials.git_commits.iter().map(|c| c.raw_snippet.clone()).collect();
        let notes: Vec<String> = materials.notes.iter().map(|n| n.raw_snippet.clone()).collect();
        let links: Vec<String> = materials
            .links
            .iter()
            .map(|l| {
                format!(
                    "{} {}",
                    l.title.clone().unwrap_or_default(),
                    l.url.clone().unwrap_or_default()
                )
                .trim()
                .to_string()
            })
            .collect();
        format!(
            "You are a content strategist for a developer building in public.\n\n\
             Materials (last 24h):\n\
             - Git commit subjects: {git}\n\
             - Devlog excerpt: {devlog}\n\
             - Notes: {notes}\n\
             - Links: {links}\n\n\
             Recent approved/posted texts (avoid repeating):\n{recent}\n\n\
             Task:\n\
             - Choose a topic plan for today.\n\
             - If materials are empty, choose a reflection/lesson and clearly label it as an opinion.\n\
             - Produce 2-3 possible angles.\n\n\
             Output JSON only:\n\
             {{\"topic_bucket\": 1, \"angles\": [\"...\"], \"key_points\": [\"...\"], \
             \"evidence_map\": {{}}}}",
            git = prompt_list(&git_subjects, 50),
            devlog = prompt_excerpt(materials.devlog_text(), 2000),
            notes = prompt_list(&notes, 20),
            links = prompt_list(&links, 20),
            recent = prompt_list(recent_posts, 50),
        )
    }
}

impl<L: LanguageModel> Stage for Curator<'_, L> {
    type Input = (Materials, Vec<String>);
    type Output = TopicPlan;

    fn name(&self) -> &'static str {
        "curator"
    }

    fn input_summary(&self, input: &Self::Input) -> String {
        format!(
            "Materials(git_commits={}, notes={}, links={}, errors={}), recent={}",
            input.0.git_commits.len(),
            input.0.notes.len(),
            input.0.links.len(),
            input.0.errors.len(),
            input.1.len()
        )
    }

    fn output_summary(&self, output: &Self::Output) -> String {
        format!(
            "TopicPlan(bucket={}, angles={}, key_points={})",
            output.topic_bucket,
            output.angles.len(),
            output.key_points.len()
        )
    }

    fn warnings(&self, _output: &Self::Output) -> Vec<String> {
        Vec::new()
    }

    fn run(&self, input: Self::Input) -> Result<Self::Output, StageError> {
        let (materials, recent_posts) = input;
        let prompt = Self::prompt(&materials, &recent_posts);
        let plan = with_retry(self.retry, || self.llm.chat_json(&prompt))
            .ok()
            .and_then(|value| serde_json::from_value::<TopicPlan>(value).ok());
        Ok(plan.unwrap_or_else(TopicPlan::reflection))
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
    use serde_json::json;

    use crate::core::evidence::Materials;
    use crate::interfaces::LanguageModel;
    use crate::interfaces::LlmError;
    use crate::pipeline::Stage;
    use crate::retry::RetryPolicy;

    use super::Curator;

    /// Model stub returning a fixed JSON value or failing.
    struct StubModel {
        /// Response payload; `None` simulates transport failure.
        response: Option<Value>,
    }

    impl LanguageModel for StubModel {
        fn chat_json(&self, _prompt: &str) -> Result<Value, LlmError> {
            self.response
                .clone()
                .ok_or_else(|| LlmError::Transport("unreachable host".to_string()))
        }
    }

    /// Tests a well-formed response becomes a topic plan.
    #[test]
    fn test_parses_model_plan() {
        let model = StubModel {
            response: Some(json!({
                "topic_bucket": 2,
                "angles": ["shipping small"],
                "key_points": ["shipped the retry helper", "fixed the login redirect"],
                "evidence_map": {}
            })),
        };
        let curator = Curator::new(&model, RetryPolicy::immediate(3));
        let plan = curator.run((Materials::default(), Vec::new())).unwrap();
        assert_eq!(plan.topic_bucket, 2);
        assert_eq!(plan.key_points.len(), 2);
    }

    /// Tests transport failure degrades to the reflection plan.
    #[test]
    fn test_falls_back_to_reflection() {
        let model = StubModel { response: None };
        let curator = Curator::new(&model, RetryPolicy::immediate(2));
        let plan = curator.run((Materials::default(), Vec::new())).unwrap();
        assert_eq!(plan.topic_bucket, 3);
        assert_eq!(plan.angles, vec!["A small reflection from today".to_string()]);
    }
}

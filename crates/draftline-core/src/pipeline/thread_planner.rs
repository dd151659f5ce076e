// crates/draftline-core/src/pipeline/thread_planner.rs
// ============================================================================
// Module: Thread Planner Stage
// Description: Single-versus-thread decision and per-tweet point assignment.
// Purpose: Decide deterministically, then plan tweet contents with a fallback.
// Dependencies: crate::{core, interfaces, pipeline, retry}, serde_json
// ============================================================================

//! ## Overview
//! The single/thread decision is deterministic: threads require the feature
//! flag, plus either three key points or an explicit `THREAD: true` marker in
//! the devlog. Only the assignment of key points to tweets consults the
//! language model, with a one-point-per-tweet heuristic as fallback.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;

use crate::core::evidence::Materials;
use crate::core::plan::ThreadPlan;
use crate::core::plan::TopicPlan;
use crate::interfaces::LanguageModel;
use crate::pipeline::Stage;
use crate::pipeline::StageError;
use crate::pipeline::prompt_list;
use crate::retry::RetryPolicy;
use crate::retry::with_retry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Devlog marker that forces thread mode.
const THREAD_MARKER: &str = "THREAD: true";
/// Minimum key points that justify a thread.
const THREAD_KEY_POINT_FLOOR: usize = 3;
/// Smallest allowed thread.
const MIN_THREAD_TWEETS: u32 = 2;
/// Largest thread the planner will consider before the configured cap.
const MAX_PLANNED_TWEETS: u32 = 5;

// ============================================================================
// SECTION: Thread Policy
// ============================================================================

/// Configured thread policy for the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadPolicy {
    /// Master switch for thread output.
    pub enabled: bool,
    /// Upper bound on tweets per thread.
    pub max_tweets: u32,
    /// Whether `(i/N)` numbering is applied by the critic.
    pub numbering_enabled: bool,
}

impl Default for ThreadPolicy {
    fn default() -> Self {
        Self { enabled: false, max_tweets: 5, numbering_enabled: true }
    }
}

// ============================================================================
// SECTION: Thread Planner
// ============================================================================

/// Single-versus-thread planning stage.
pub struct ThreadPlanner<'a, L: LanguageModel> {
    /// Language model adapter.
    llm: &'a L,
    /// Retry policy for model calls.
    retry: RetryPolicy,
    /// Configured thread policy.
    policy: ThreadPolicy,
}

/// Model payload for the thread plan (decision fields are not trusted).
#[derive(Debug, Deserialize)]
struct PlannedTweets {
    /// Key points assigned per tweet.
    #[serde(default)]
    tweet_key_points: Vec<Vec<String>>,
    /// Planner reasoning, recorded verbatim.
    #[serde(default)]
    reason: String,
}

impl<'a, L: LanguageModel> ThreadPlanner<'a, L> {
    /// Creates a planner with the given policy.
    #[must_use]
    pub fn new(llm: &'a L, retry: RetryPolicy, policy: ThreadPolicy) -> Self {
        Self { llm, retry, policy }
    }

    /// Deterministic heuristic chunks: one key point per tweet.
    fn heuristic_chunks(topic_plan: &TopicPlan, tweets_count: u32) -> Vec<Vec<String>> {
        let count = tweets_count as usize;
        let points: Vec<String> = topic_plan.key_points.iter().take(count).cloned().collect();
        (0..count)
            .map(|i| points.get(i).map_or_else(Vec::new, |point| vec![point.clone()]))
            .collect()
    }

    /// Builds the planning prompt.
    fn prompt(topic_plan: &TopicPlan, tweets_count: u32) -> String {
        format!(
            "You are planning an X thread.\n\n\
             Topic angles: {angles}\n\
             Key points: {points}\n\n\
             Return JSON:\n\
             {{\"tweet_key_points\": [[\"...\"],[\"...\"]], \"reason\": \"...\"}}\n\
             The list must contain exactly {tweets_count} entries.",
            angles = prompt_list(&topic_plan.angles, 10),
            points = prompt_list(&topic_plan.key_points, 10),
        )
    }
}

impl<L: LanguageModel> Stage for ThreadPlanner<'_, L> {
    type Input = (TopicPlan, Materials);
    type Output = ThreadPlan;

    fn name(&self) -> &'static str {
        "thread_planner"
    }

    fn input_summary(&self, input: &Self::Input) -> String {
        format!("TopicPlan(key_points={})", input.0.key_points.len())
    }

    fn output_summary(&self, output: &Self::Output) -> String {
        format!("ThreadPlan(enabled={}, tweets_count={})", output.enabled, output.tweets_count)
    }

    fn warnings(&self, _output: &Self::Output) -> Vec<String> {
        Vec::new()
    }

    fn run(&self, input: Self::Input) -> Result<Self::Output, StageError> {
        let (topic_plan, materials) = input;
        let forced = materials.devlog_text().contains(THREAD_MARKER);
        let should_thread = self.policy.enabled
            && (forced || topic_plan.key_points.len() >= THREAD_KEY_POINT_FLOOR);
        if !should_thread {
            return Ok(ThreadPlan::single(self.policy.numbering_enabled));
        }

        let natural = u32::try_from(topic_plan.key_points.len())
            .unwrap_or(MAX_PLANNED_TWEETS)
            .clamp(MIN_THREAD_TWEETS, MAX_PLANNED_TWEETS);
        let tweets_count = natural.min(self.policy.max_tweets.max(MIN_THREAD_TWEETS));

        let prompt = Self::prompt(&topic_plan, tweets_count);
        let planned = with_retry(self.retry, || self.llm.chat_json(&prompt))
            .ok()
            .and_then(|value| serde_json::from_value::<PlannedTweets>(value).ok())
            .filter(|planned| planned.tweet_key_points.len() == tweets_count as usize);

        let (tweet_key_points, reason) = match planned {
            Some(planned) => (planned.tweet_key_points, planned.reason),
            None => (
                Self::heuristic_chunks(&topic_plan, tweets_count),
                "heuristic".to_string(),
            ),
        };

        Ok(ThreadPlan {
            enabled: true,
            tweets_count,
            numbering_enabled: self.policy.numbering_enabled,
            reason,
            tweet_key_points,
            evidence_map: topic_plan.evidence_map,
        })
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

    use crate::core::evidence::EvidenceItem;
    use crate::core::evidence::Materials;
    use crate::core::plan::TopicPlan;
    use crate::core::time::Timestamp;
    use crate::interfaces::LanguageModel;
    use crate::interfaces::LlmError;
    use crate::pipeline::Stage;
    use crate::retry::RetryPolicy;

    use super::ThreadPlanner;
    use super::ThreadPolicy;

    /// Model stub that always fails, forcing the heuristic path.
    struct FailingModel;

    impl LanguageModel for FailingModel {
        fn chat_json(&self, _prompt: &str) -> Result<Value, LlmError> {
            Err(LlmError::Transport("down".to_string()))
        }
    }

    /// Builds a topic plan with the given key points.
    fn plan_with_points(points: &[&str]) -> TopicPlan {
        TopicPlan {
            topic_bucket: 1,
            angles: vec!["angle".to_string()],
            key_points: points.iter().map(ToString::to_string).collect(),
            evidence_map: BTreeMap::new(),
        }
    }

    /// Tests two key points stay single even with threads enabled.
    #[test]
    fn test_few_points_stay_single() {
        let model = FailingModel;
        let policy = ThreadPolicy { enabled: true, max_tweets: 5, numbering_enabled: true };
        let planner = ThreadPlanner::new(&model, RetryPolicy::immediate(1), policy);
        let plan = planner.run((plan_with_points(&["a", "b"]), Materials::default())).unwrap();
        assert!(!plan.enabled);
        assert_eq!(plan.tweets_count, 1);
    }

    /// Tests three key points trigger a thread with heuristic chunks.
    #[test]
    fn test_three_points_thread_with_heuristic() {
        let model = FailingModel;
        let policy = ThreadPolicy { enabled: true, max_tweets: 5, numbering_enabled: true };
        let planner = ThreadPlanner::new(&model, RetryPolicy::immediate(1), policy);
        let plan =
            planner.run((plan_with_points(&["a", "b", "c"]), Materials::default())).unwrap();
        assert!(plan.enabled);
        assert_eq!(plan.tweets_count, 3);
        assert_eq!(plan.reason, "heuristic");
        assert_eq!(plan.tweet_key_points.len(), 3);
    }

    /// Tests the devlog marker forces a thread regardless of key points.
    #[test]
    fn test_devlog_marker_forces_thread() {
        let model = FailingModel;
        let policy = ThreadPolicy { enabled: true, max_tweets: 4, numbering_enabled: false };
        let planner = ThreadPlanner::new(&model, RetryPolicy::immediate(1), policy);
        let materials = Materials {
            devlog: Some(EvidenceItem {
                source_name: "devlog".to_string(),
                source_id: "devlog.md".to_string(),
                timestamp: Timestamp::from_unix_millis(0),
                raw_snippet: "today\nTHREAD: true\nmore".to_string(),
                title: None,
                url: None,
            }),
            ..Materials::default()
        };
        let plan = planner.run((plan_with_points(&["a"]), materials)).unwrap();
        assert!(plan.enabled);
        assert_eq!(plan.tweets_count, 2);
    }

    /// Tests thread mode is off when the feature flag is off.
    #[test]
    fn test_disabled_policy_is_single() {
        let model = FailingModel;
        let planner =
            ThreadPlanner::new(&model, RetryPolicy::immediate(1), ThreadPolicy::default());
        let plan = planner
            .run((plan_with_points(&["a", "b", "c", "d"]), Materials::default()))
            .unwrap();
        assert!(!plan.enabled);
    }
}

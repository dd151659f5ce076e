// crates/draftline-core/src/pipeline/weekly.rs
// ============================================================================
// Module: Weekly Analyst Stage
// Description: Weekly content summary over the posts in a window.
// Purpose: Produce topic buckets, recommendations, and next-week topics.
// Dependencies: crate::{core, interfaces, pipeline, retry}, serde_json
// ============================================================================

//! ## Overview
//! The weekly analyst summarizes one week of posted content. The model path
//! produces buckets and recommendations; the fallback is a fixed set of
//! suggestions so the weekly report always exists.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;

use crate::core::draft::WeeklyReport;
use crate::core::time::Timestamp;
use crate::interfaces::LanguageModel;
use crate::pipeline::Stage;
use crate::pipeline::StageError;
use crate::pipeline::prompt_list;
use crate::retry::RetryPolicy;
use crate::retry::with_retry;

// ============================================================================
// SECTION: Weekly Analyst
// ============================================================================

/// Weekly summary stage.
pub struct WeeklyAnalyst<'a, L: LanguageModel> {
    /// Language model adapter.
    llm: &'a L,
    /// Retry policy for model calls.
    retry: RetryPolicy,
}

/// Model payload for the weekly report (window fields are not trusted).
#[derive(Debug, Deserialize)]
struct AnalystPayload {
    /// Most-covered topic buckets.
    #[serde(default)]
    top_topic_buckets: Vec<String>,
    /// Recommendations for the coming week.
    #[serde(default)]
    recommendations: Vec<String>,
    /// Suggested topics for the coming week.
    #[serde(default)]
    next_week_topics: Vec<String>,
}

impl<'a, L: LanguageModel> WeeklyAnalyst<'a, L> {
    /// Creates a weekly analyst over the given model.
    #[must_use]
    pub fn new(llm: &'a L, retry: RetryPolicy) -> Self {
        Self { llm, retry }
    }

    /// Builds the analysis prompt.
    fn prompt(week_start: Timestamp, week_end: Timestamp, posts: &[String]) -> String {
        format!(
            "You are an analyst for weekly content performance.\n\n\
             Week window: {week_start} to {week_end}\n\
             Posted texts: {posts}\n\n\
             Generate a weekly report JSON:\n\
             {{\"top_topic_buckets\": [\"...\"], \"recommendations\": [\"...\"], \
             \"next_week_topics\": [\"...\"]}}",
            posts = prompt_list(posts, 100),
        )
    }

    /// Deterministic fallback report.
    fn fallback(week_start: Timestamp, week_end: Timestamp) -> WeeklyReport {
        WeeklyReport {
            week_start,
            week_end,
            top_topic_buckets: vec!["Engineering".to_string()],
            recommendations: vec!["Ship smaller updates more consistently.".to_string()],
            next_week_topics: vec![
                "A trade-off I made".to_string(),
                "A debugging lesson".to_string(),
                "A small refactor".to_string(),
            ],
        }
    }
}

impl<L: LanguageModel> Stage for WeeklyAnalyst<'_, L> {
    type Input = (Timestamp, Timestamp, Vec<String>);
    type Output = WeeklyReport;

    fn name(&self) -> &'static str {
        "weekly_analyst"
    }

    fn input_summary(&self, input: &Self::Input) -> String {
        format!("posts={}", input.2.len())
    }

    fn output_summary(&self, output: &Self::Output) -> String {
        format!(
            "WeeklyReport(buckets={}, recommendations={})",
            output.top_topic_buckets.len(),
            output.recommendations.len()
        )
    }

    fn warnings(&self, _output: &Self::Output) -> Vec<String> {
        Vec::new()
    }

    fn run(&self, input: Self::Input) -> Result<Self::Output, StageError> {
        let (week_start, week_end, posts) = input;
        let prompt = Self::prompt(week_start, week_end, &posts);
        let payload = with_retry(self.retry, || self.llm.chat_json(&prompt))
            .ok()
            .and_then(|value| serde_json::from_value::<AnalystPayload>(value).ok());
        Ok(payload.map_or_else(
            || Self::fallback(week_start, week_end),
            |payload| WeeklyReport {
                week_start,
                week_end,
                top_topic_buckets: payload.top_topic_buckets,
                recommendations: payload.recommendations,
                next_week_topics: payload.next_week_topics,
            },
        ))
    }
}

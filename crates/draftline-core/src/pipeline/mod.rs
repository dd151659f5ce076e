// crates/draftline-core/src/pipeline/mod.rs
// ============================================================================
// Module: Draftline Generation Pipeline
// Description: Uniform stage shape and the concrete generation stages.
// Purpose: Provide pure per-stage transformations with telemetry wrapping.
// Dependencies: crate::{core, interfaces}, thiserror
// ============================================================================

//! ## Overview
//! Every generation stage has the same shape: a pure function from typed
//! input to typed output plus a log. Stages share no mutable state; the
//! orchestrator owns the accumulated pipeline state and appends each stage's
//! output to it. Stages that call the language model retry with bounded
//! backoff and degrade to deterministic fallbacks; the collector treats every
//! per-source failure as a warning, never as a stage error.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod collector;
pub mod critic;
pub mod curator;
pub mod style;
pub mod thread_planner;
pub mod weekly;
pub mod writer;

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::run::StageLog;
use crate::core::run::truncate_error;
use crate::core::run::truncate_summary;
use crate::interfaces::Clock;
use crate::interfaces::LlmError;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use collector::Collector;
pub use critic::Critic;
pub use curator::Curator;
pub use style::StyleLearner;
pub use thread_planner::ThreadPlanner;
pub use thread_planner::ThreadPolicy;
pub use weekly::WeeklyAnalyst;
pub use writer::Writer;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Stage execution errors.
#[derive(Debug, Error)]
pub enum StageError {
    /// Language model failure that had no deterministic fallback.
    #[error("stage llm error: {0}")]
    Llm(#[from] LlmError),
    /// Stage produced or received invalid data.
    #[error("stage invalid data: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Stage Shape
// ============================================================================

/// Uniform shape for one pipeline stage.
///
/// # Invariants
/// - `run` is a pure function of its input plus the stage's configuration.
/// - Stages never touch the store; persistence belongs to the orchestrator.
pub trait Stage {
    /// Typed input consumed by the stage.
    type Input;
    /// Typed output produced by the stage.
    type Output;

    /// Returns the stable stage name recorded in logs.
    fn name(&self) -> &'static str;

    /// Returns a short input description for the stage log.
    fn input_summary(&self, input: &Self::Input) -> String;

    /// Returns a short output description for the stage log.
    fn output_summary(&self, output: &Self::Output) -> String;

    /// Returns non-fatal warnings carried by the output.
    fn warnings(&self, output: &Self::Output) -> Vec<String>;

    /// Executes the stage.
    ///
    /// # Errors
    ///
    /// Returns [`StageError`] when the stage fails without a fallback.
    fn run(&self, input: Self::Input) -> Result<Self::Output, StageError>;
}

/// Executes a stage and records its [`StageLog`], mirroring success and
/// failure alike into the log.
pub fn execute<S: Stage>(
    stage: &S,
    clock: &dyn Clock,
    input: S::Input,
) -> (Result<S::Output, StageError>, StageLog) {
    let start_ts = clock.now();
    let input_summary = truncate_summary(&stage.input_summary(&input));
    let result = stage.run(input);
    let end_ts = clock.now();
    let (output_summary, errors, warnings) = match &result {
        Ok(output) => (
            truncate_summary(&stage.output_summary(output)),
            None,
            stage
                .warnings(output)
                .into_iter()
                .map(|warning| truncate_summary(&warning))
                .collect(),
        ),
        Err(err) => ("none".to_string(), Some(truncate_error(&err.to_string())), Vec::new()),
    };
    let log = StageLog {
        stage_name: stage.name().to_string(),
        start_ts,
        end_ts,
        duration_ms: end_ts.millis_since(start_ts),
        input_summary,
        output_summary,
        errors,
        warnings,
    };
    (result, log)
}

// ============================================================================
// SECTION: Prompt Helpers
// ============================================================================

/// Renders a bounded, JSON-quoted list of strings for prompt interpolation.
pub(crate) fn prompt_list(items: &[String], limit: usize) -> String {
    let bounded: Vec<&String> = items.iter().take(limit).collect();
    serde_json::to_string(&bounded).unwrap_or_else(|_| "[]".to_string())
}

/// Clips a text excerpt to a character bound for prompt interpolation.
pub(crate) fn prompt_excerpt(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

// crates/draftline-core/src/core/run.rs
// ============================================================================
// Module: Draftline Run Records
// Description: Run lifecycle rows and per-stage execution logs.
// Purpose: Capture one pipeline invocation and its stage-by-stage telemetry.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A run is born at orchestration start, mutated only by the orchestrator that
//! owns it, and finalized exactly once. Stage logs are buffered in memory
//! while the pipeline executes and bulk-replaced on the run at finalize.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::RunId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum persisted length for error strings.
pub const MAX_ERROR_LENGTH: usize = 500;
/// Maximum persisted length for stage log summaries.
pub const MAX_SUMMARY_LENGTH: usize = 200;

/// Truncates an error string to the persisted limit on a char boundary.
#[must_use]
pub fn truncate_error(error: &str) -> String {
    truncate_chars(error, MAX_ERROR_LENGTH)
}

/// Truncates a summary string to the persisted limit on a char boundary.
#[must_use]
pub fn truncate_summary(summary: &str) -> String {
    truncate_chars(summary, MAX_SUMMARY_LENGTH)
}

/// Truncates a string to at most `limit` characters.
fn truncate_chars(input: &str, limit: usize) -> String {
    input.chars().take(limit).collect()
}

// ============================================================================
// SECTION: Run Status
// ============================================================================

/// Run lifecycle status.
///
/// # Invariants
/// - Variants are stable for serialization and storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run is executing.
    Running,
    /// Run finished successfully.
    Completed,
    /// Run finished with a fatal error.
    Failed,
}

impl RunStatus {
    /// Returns a stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

// ============================================================================
// SECTION: Run Record
// ============================================================================

/// One pipeline invocation, scheduled or manual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    /// Run identifier.
    pub run_id: RunId,
    /// Invocation source label (`scheduler`, `manual`, ...).
    pub source: String,
    /// Lifecycle status.
    pub status: RunStatus,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Finalization timestamp, set exactly once.
    pub finished_at: Option<Timestamp>,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: Option<i64>,
    /// First fatal error, truncated to [`MAX_ERROR_LENGTH`] chars.
    pub last_error: Option<String>,
}

impl Run {
    /// Creates a new running run record.
    #[must_use]
    pub fn started(run_id: RunId, source: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            run_id,
            source: source.into(),
            status: RunStatus::Running,
            created_at,
            finished_at: None,
            duration_ms: None,
            last_error: None,
        }
    }
}

// ============================================================================
// SECTION: Stage Logs
// ============================================================================

/// Append-only telemetry record for one pipeline stage execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageLog {
    /// Stage name (`collector`, `curator`, ...).
    pub stage_name: String,
    /// Stage start timestamp.
    pub start_ts: Timestamp,
    /// Stage end timestamp.
    pub end_ts: Timestamp,
    /// Stage duration in milliseconds.
    pub duration_ms: i64,
    /// Short input description, truncated to [`MAX_SUMMARY_LENGTH`] chars.
    pub input_summary: String,
    /// Short output description, truncated to [`MAX_SUMMARY_LENGTH`] chars.
    pub output_summary: String,
    /// Stage error, when the stage failed.
    pub errors: Option<String>,
    /// Non-fatal warnings surfaced by the stage.
    #[serde(default)]
    pub warnings: Vec<String>,
}

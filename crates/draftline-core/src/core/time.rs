// crates/draftline-core/src/core/time.rs
// ============================================================================
// Module: Draftline Time Model
// Description: Canonical UTC timestamps for runs, drafts, and tokens.
// Purpose: Provide deterministic, replayable time values across Draftline records.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Draftline stores all timestamps as UTC unix milliseconds. The core never
//! reads wall-clock time directly; hosts supply time through the
//! [`crate::interfaces::Clock`] seam so that pipeline execution, token TTL
//! checks, and publish finalization stay replayable in tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Milliseconds per second.
const MILLIS_PER_SECOND: i64 = 1_000;
/// Milliseconds per hour.
const MILLIS_PER_HOUR: i64 = 60 * 60 * MILLIS_PER_SECOND;
/// Milliseconds per day.
const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when parsing or formatting timestamps.
#[derive(Debug, Error)]
pub enum TimeError {
    /// RFC 3339 parse failure.
    #[error("invalid rfc3339 timestamp: {0}")]
    Parse(String),
    /// Value is outside the representable range.
    #[error("timestamp out of range: {0}")]
    OutOfRange(String),
}

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical UTC timestamp in unix milliseconds.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads wall-clock time.
/// - Ordering is total and matches chronological order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix milliseconds.
    #[must_use]
    pub const fn unix_millis(self) -> i64 {
        self.0
    }

    /// Parses an RFC 3339 timestamp string.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::Parse`] when the input is not valid RFC 3339.
    pub fn parse_rfc3339(input: &str) -> Result<Self, TimeError> {
        let parsed = OffsetDateTime::parse(input, &Rfc3339)
            .map_err(|err| TimeError::Parse(err.to_string()))?;
        let millis = parsed.unix_timestamp_nanos() / 1_000_000;
        let millis =
            i64::try_from(millis).map_err(|_| TimeError::OutOfRange(input.to_string()))?;
        Ok(Self(millis))
    }

    /// Formats the timestamp as RFC 3339 with millisecond precision.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::OutOfRange`] when the value cannot be represented.
    pub fn to_rfc3339(self) -> Result<String, TimeError> {
        let nanos = i128::from(self.0) * 1_000_000;
        let datetime = OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map_err(|err| TimeError::OutOfRange(err.to_string()))?;
        datetime.format(&Rfc3339).map_err(|err| TimeError::OutOfRange(err.to_string()))
    }

    /// Returns a timestamp shifted forward by the given hours, saturating.
    #[must_use]
    pub const fn plus_hours(self, hours: i64) -> Self {
        Self(self.0.saturating_add(hours.saturating_mul(MILLIS_PER_HOUR)))
    }

    /// Returns a timestamp shifted backward by the given days, saturating.
    #[must_use]
    pub const fn minus_days(self, days: i64) -> Self {
        Self(self.0.saturating_sub(days.saturating_mul(MILLIS_PER_DAY)))
    }

    /// Returns the whole milliseconds elapsed since `earlier`, saturating at zero.
    #[must_use]
    pub const fn millis_since(self, earlier: Self) -> i64 {
        let delta = self.0.saturating_sub(earlier.0);
        if delta < 0 { 0 } else { delta }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_rfc3339() {
            Ok(rendered) => f.write_str(&rendered),
            Err(_) => self.0.fmt(f),
        }
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

    use super::Timestamp;

    /// Tests RFC 3339 round-trip at millisecond precision.
    #[test]
    fn test_rfc3339_round_trip() {
        let ts = Timestamp::from_unix_millis(1_700_000_123_456);
        let rendered = ts.to_rfc3339().unwrap();
        let parsed = Timestamp::parse_rfc3339(&rendered).unwrap();
        assert_eq!(ts, parsed);
    }

    /// Tests arithmetic helpers saturate instead of wrapping.
    #[test]
    fn test_arithmetic_saturates() {
        let ts = Timestamp::from_unix_millis(i64::MAX);
        assert_eq!(ts.plus_hours(1).unix_millis(), i64::MAX);
        let early = Timestamp::from_unix_millis(10);
        let late = Timestamp::from_unix_millis(25);
        assert_eq!(late.millis_since(early), 15);
        assert_eq!(early.millis_since(late), 0);
    }
}

// crates/draftline-core/src/retry.rs
// ============================================================================
// Module: Draftline Bounded Retry
// Description: Bounded exponential-backoff retry for external calls.
// Purpose: Give every outbound call the same bounded retry discipline.
// Dependencies: std
// ============================================================================

//! ## Overview
//! External calls (language model, social API) are retried with bounded
//! exponential backoff. Three attempts with a 0.5s base delay is the default
//! everywhere; tests use a zero base delay.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread;
use std::time::Duration;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Bounded retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (>= 1).
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_millis(500) }
    }
}

impl RetryPolicy {
    /// Policy with no delay, for tests.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self { max_attempts, base_delay: Duration::ZERO }
    }
}

// ============================================================================
// SECTION: Retry Helper
// ============================================================================

/// Runs `operation` under the policy, returning the first success or the
/// final error.
///
/// # Errors
///
/// Returns the last error after `max_attempts` failures.
pub fn with_retry<T, E, F>(policy: RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
{
    let attempts = policy.max_attempts.max(1);
    let mut delay = policy.base_delay;
    let mut result = operation();
    let mut attempt = 1;
    while result.is_err() && attempt < attempts {
        if !delay.is_zero() {
            thread::sleep(delay);
            delay = delay.saturating_mul(2);
        }
        result = operation();
        attempt += 1;
    }
    result
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

    use std::cell::Cell;

    use super::RetryPolicy;
    use super::with_retry;

    /// Tests the helper stops at the first success.
    #[test]
    fn test_succeeds_after_failures() {
        let calls = Cell::new(0_u32);
        let result: Result<u32, &str> = with_retry(RetryPolicy::immediate(3), || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 { Err("transient") } else { Ok(7) }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 3);
    }

    /// Tests the helper surfaces the last error once attempts are exhausted.
    #[test]
    fn test_exhausts_attempts() {
        let calls = Cell::new(0_u32);
        let result: Result<u32, String> = with_retry(RetryPolicy::immediate(3), || {
            calls.set(calls.get() + 1);
            Err(format!("attempt {}", calls.get()))
        });
        assert_eq!(result.unwrap_err(), "attempt 3");
        assert_eq!(calls.get(), 3);
    }
}

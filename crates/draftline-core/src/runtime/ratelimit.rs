// crates/draftline-core/src/runtime/ratelimit.rs
// ============================================================================
// Module: Sliding-Window Rate Limiter
// Description: Per-process request limiting over keyed sliding windows.
// Purpose: Bound local abuse of reviewer actions; never a global limit.
// Dependencies: crate::core, std
// ============================================================================

//! ## Overview
//! The limiter tracks event timestamps per key in a bounded map. It bounds
//! abuse within this process only; global fairness is not its job. Entry
//! count is capped so a key-spraying caller cannot grow memory without bound.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default window length in milliseconds.
const DEFAULT_WINDOW_MS: i64 = 60_000;
/// Default events allowed per window.
const DEFAULT_MAX_EVENTS: usize = 30;
/// Maximum tracked keys before the oldest entry is evicted.
const MAX_TRACKED_KEYS: usize = 4_096;

// ============================================================================
// SECTION: Limiter
// ============================================================================

/// Per-process sliding-window rate limiter.
pub struct RateLimiter {
    /// Window length in milliseconds.
    window_ms: i64,
    /// Events allowed per key per window.
    max_events: usize,
    /// Event timestamps per key.
    entries: Mutex<BTreeMap<String, VecDeque<Timestamp>>>,
}

impl RateLimiter {
    /// Creates a limiter with the given window and budget.
    #[must_use]
    pub fn new(window_ms: i64, max_events: usize) -> Self {
        Self { window_ms, max_events, entries: Mutex::new(BTreeMap::new()) }
    }

    /// Records an event for `key` and returns whether it fits the window.
    ///
    /// A poisoned lock fails open: limiting is a local-abuse bound, not a
    /// correctness gate.
    #[must_use]
    pub fn allow(&self, key: &str, now: Timestamp) -> bool {
        let Ok(mut entries) = self.entries.lock() else {
            return true;
        };
        if !entries.contains_key(key) && entries.len() >= MAX_TRACKED_KEYS {
            let oldest = entries.keys().next().cloned();
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        let events = entries.entry(key.to_string()).or_default();
        let cutoff = Timestamp::from_unix_millis(
            now.unix_millis().saturating_sub(self.window_ms),
        );
        while events.front().is_some_and(|event| *event <= cutoff) {
            events.pop_front();
        }
        if events.len() >= self.max_events {
            return false;
        }
        events.push_back(now);
        true
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_MS, DEFAULT_MAX_EVENTS)
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

    use crate::core::time::Timestamp;

    use super::RateLimiter;

    /// Tests the budget is enforced within a window and recovers after it.
    #[test]
    fn test_window_budget_and_recovery() {
        let limiter = RateLimiter::new(1_000, 2);
        let t0 = Timestamp::from_unix_millis(10_000);
        assert!(limiter.allow("approve", t0));
        assert!(limiter.allow("approve", t0));
        assert!(!limiter.allow("approve", t0));
        // A different key has its own budget.
        assert!(limiter.allow("edit", t0));
        // After the window slides past, the key recovers.
        let later = Timestamp::from_unix_millis(11_001);
        assert!(limiter.allow("approve", later));
    }
}

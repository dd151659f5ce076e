// crates/draftline-core/src/runtime/mod.rs
// ============================================================================
// Module: Draftline Runtime
// Description: Orchestration, review flows, publication, and token runtime.
// Purpose: Group the stateful services driving the draft state machine.
// Dependencies: crate::{core, interfaces} plus runtime submodules
// ============================================================================

//! ## Overview
//! The runtime holds every stateful service: the run orchestrator, the
//! token-gated review flows, the exactly-once publish coordinator, action
//! token issuance and resolution, the worker-pool dispatcher, the rate
//! limiter, and the in-memory store used by tests.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod approval;
pub mod dispatch;
pub mod memstore;
pub mod orchestrator;
pub mod publisher;
pub mod ratelimit;
pub mod tokens;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::core::time::Timestamp;
use crate::interfaces::Clock;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use approval::ReviewConfig;
pub use approval::ReviewError;
pub use approval::ReviewOutcome;
pub use approval::Reviewer;
pub use dispatch::RunDispatcher;
pub use memstore::InMemoryDraftStore;
pub use orchestrator::Orchestrator;
pub use orchestrator::OrchestratorConfig;
pub use orchestrator::OrchestratorError;
pub use publisher::PublishConfig;
pub use publisher::PublishOutcome;
pub use publisher::Publisher;
pub use ratelimit::RateLimiter;
pub use tokens::TokenResolution;

// ============================================================================
// SECTION: System Clock
// ============================================================================

/// Wall-clock [`Clock`] for production hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Timestamp::from_unix_millis(millis)
    }
}

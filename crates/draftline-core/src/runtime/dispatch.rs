// crates/draftline-core/src/runtime/dispatch.rs
// ============================================================================
// Module: Run Dispatcher
// Description: Worker-pool submission for background pipeline runs.
// Purpose: Submit a run, return its identifier immediately, join on demand.
// Dependencies: crate::core, threadpool
// ============================================================================

//! ## Overview
//! A pipeline run executes in one worker end to end. The dispatcher
//! pre-allocates the run identifier, hands the job to the pool, and returns
//! the identifier without blocking; callers poll the store or join the pool.

// ============================================================================
// SECTION: Imports
// ============================================================================

use threadpool::ThreadPool;

use crate::core::identifiers::RunId;

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Worker pool that executes pipeline runs in the background.
pub struct RunDispatcher {
    /// Backing thread pool.
    pool: ThreadPool,
}

impl RunDispatcher {
    /// Creates a dispatcher with the given worker count (minimum one).
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self { pool: ThreadPool::new(workers.max(1)) }
    }

    /// Submits a run job and returns its pre-allocated identifier without
    /// blocking. The job receives the identifier it must run under.
    pub fn submit<F>(&self, job: F) -> RunId
    where
        F: FnOnce(RunId) + Send + 'static,
    {
        let run_id = RunId::generate();
        let handed = run_id.clone();
        self.pool.execute(move || job(handed));
        run_id
    }

    /// Blocks until every submitted job has finished.
    pub fn join(&self) {
        self.pool.join();
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

    use std::sync::Arc;
    use std::sync::Mutex;

    use super::RunDispatcher;

    /// Tests submitted jobs run with the identifier they were handed.
    #[test]
    fn test_submit_hands_run_id_to_job() {
        let dispatcher = RunDispatcher::new(2);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let run_id = dispatcher.submit(move |id| {
            sink.lock().unwrap().push(id);
        });
        dispatcher.join();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[run_id]);
    }
}

// crates/draftline-store-sqlite/src/lib.rs
// ============================================================================
// Module: Draftline SQLite Store Library
// Description: Public API surface for the SQLite-backed draft store.
// Purpose: Expose the durable store and its configuration.
// Dependencies: crate::store
// ============================================================================

//! ## Overview
//! This crate implements the durable [`draftline_core::DraftStore`] over
//! SQLite with WAL journaling. Uniqueness constraints carry the concurrency
//! contracts: the publish-attempt lease, token hashes, post positions, and
//! idempotency keys.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteDraftStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;

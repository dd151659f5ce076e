// crates/draftline-core/src/core/mod.rs
// ============================================================================
// Module: Draftline Core Types
// Description: Canonical domain records shared across the workspace.
// Purpose: Group identifiers, time, hashing, and persisted record types.
// Dependencies: crate::core submodules
// ============================================================================

//! ## Overview
//! The `core` module holds the canonical data model: identifiers, UTC
//! timestamps, hashing helpers, evidence, pipeline intermediaries, policy
//! reports, and the persisted run/draft/token records.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod draft;
pub mod evidence;
pub mod hashing;
pub mod identifiers;
pub mod plan;
pub mod report;
pub mod run;
pub mod time;
pub mod token;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use draft::AttemptStatus;
pub use draft::AuditEvent;
pub use draft::Draft;
pub use draft::DraftStatus;
pub use draft::NotificationResult;
pub use draft::Post;
pub use draft::PublishAttempt;
pub use draft::ReviewPacket;
pub use draft::ReviewTokens;
pub use draft::WeeklyReport;
pub use evidence::EvidenceItem;
pub use evidence::EvidenceRef;
pub use evidence::Materials;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use identifiers::DraftId;
pub use identifiers::RunId;
pub use plan::DraftCandidate;
pub use plan::DraftCandidates;
pub use plan::DraftMode;
pub use plan::EditedDraft;
pub use plan::StyleProfile;
pub use plan::ThreadPlan;
pub use plan::TopicPlan;
pub use report::PolicyAction;
pub use report::PolicyCheck;
pub use report::PolicyReport;
pub use report::RiskLevel;
pub use run::MAX_ERROR_LENGTH;
pub use run::MAX_SUMMARY_LENGTH;
pub use run::Run;
pub use run::RunStatus;
pub use run::StageLog;
pub use run::truncate_error;
pub use run::truncate_summary;
pub use time::TimeError;
pub use time::Timestamp;
pub use token::ActionToken;
pub use token::TokenAction;

// crates/draftline-core/src/core/report.rs
// ============================================================================
// Module: Draftline Policy Report
// Description: Typed verdicts emitted by the policy engine.
// Purpose: Capture per-check results, risk, action, and the claim evidence map.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`PolicyReport`] is immutable per generation; edit and regenerate flows
//! emit a fresh report instead of mutating the stored one. Reports are
//! deterministic for fixed inputs, which approval re-checks rely on.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::evidence::EvidenceRef;

// ============================================================================
// SECTION: Verdict Enums
// ============================================================================

/// Aggregate risk classification for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    /// No failing checks.
    #[serde(rename = "LOW")]
    Low,
    /// Stylistic or repetition failures.
    #[serde(rename = "MEDIUM")]
    Medium,
    /// Safety, leakage, or grounding failures.
    #[serde(rename = "HIGH")]
    High,
}

impl RiskLevel {
    /// Returns a stable label for the risk level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

/// Action the policy engine requests from the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyAction {
    /// Candidate may proceed to review.
    #[serde(rename = "PASS")]
    Pass,
    /// Candidate should be rewritten.
    #[serde(rename = "REWRITE")]
    Rewrite,
    /// Candidate must be held for a human.
    #[serde(rename = "HOLD")]
    Hold,
}

impl PolicyAction {
    /// Returns a stable label for the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Rewrite => "REWRITE",
            Self::Hold => "HOLD",
        }
    }
}

// ============================================================================
// SECTION: Check Results
// ============================================================================

/// Result of one independent policy check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyCheck {
    /// Stable check name (`length_ok`, `sensitive_ok`, ...).
    pub check_name: String,
    /// True when the check passed.
    pub passed: bool,
    /// Terse diagnostic detail.
    pub details: String,
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Full verdict emitted by the policy engine.
///
/// # Invariants
/// - Immutable per generation; a new report is emitted on edit or regenerate.
/// - Checks appear in a fixed order; claims are capped at 20.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyReport {
    /// All check results, in fixed engine order.
    pub checks: Vec<PolicyCheck>,
    /// Aggregate risk classification.
    pub risk_level: RiskLevel,
    /// Requested orchestrator action.
    pub action: PolicyAction,
    /// Factual claims extracted from the candidate.
    #[serde(default)]
    pub claims: Vec<String>,
    /// Claim to supporting-evidence mapping.
    #[serde(default)]
    pub evidence_map: BTreeMap<String, Vec<EvidenceRef>>,
    /// Claims with no evidence at or above the grounding floor.
    #[serde(default)]
    pub unsupported_claims: Vec<String>,
    /// Spans that triggered failing checks.
    #[serde(default)]
    pub offending_spans: Vec<String>,
}

impl PolicyReport {
    /// Returns the names of the failing checks.
    #[must_use]
    pub fn failing_checks(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|check| !check.passed)
            .map(|check| check.check_name.as_str())
            .collect()
    }
}

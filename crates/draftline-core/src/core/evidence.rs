// crates/draftline-core/src/core/evidence.rs
// ============================================================================
// Module: Draftline Evidence Model
// Description: Evidence items collected from external sources and their aggregate.
// Purpose: Provide the immutable factual base every draft must be grounded in.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Evidence is collected once per run and never mutated afterwards. The
//! [`Materials`] aggregate travels in memory through the pipeline and is
//! persisted verbatim on the draft so that edit and regenerate flows re-check
//! grounding against exactly what generation saw.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Evidence Items
// ============================================================================

/// A single piece of evidence from an external source.
///
/// # Invariants
/// - Immutable once collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Source adapter name (`git`, `devlog`, `github`, `rss`, ...).
    pub source_name: String,
    /// Source-scoped identifier (commit hash, item url, file path).
    pub source_id: String,
    /// Evidence timestamp.
    pub timestamp: Timestamp,
    /// Raw textual snippet carried as grounding material.
    pub raw_snippet: String,
    /// Optional human-readable title.
    pub title: Option<String>,
    /// Optional canonical URL.
    pub url: Option<String>,
}

/// A reference from a claim back to supporting evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRef {
    /// Source adapter name of the referenced item.
    pub source_name: String,
    /// Source-scoped identifier of the referenced item.
    pub source_id: String,
    /// Short quote from the referenced snippet.
    pub quote: String,
}

// ============================================================================
// SECTION: Materials
// ============================================================================

/// Aggregate of the evidence collected for one run.
///
/// # Invariants
/// - Carried in-memory during a run and persisted as part of the draft snapshot.
/// - Per-source collection failures land in `errors` and are never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Materials {
    /// Git commit subjects from the working repository.
    #[serde(default)]
    pub git_commits: Vec<EvidenceItem>,
    /// Tail of the devlog file, when present.
    #[serde(default)]
    pub devlog: Option<EvidenceItem>,
    /// Note-like items without a URL.
    #[serde(default)]
    pub notes: Vec<EvidenceItem>,
    /// Link-like items carrying a URL.
    #[serde(default)]
    pub links: Vec<EvidenceItem>,
    /// Non-fatal per-source collection errors.
    #[serde(default)]
    pub errors: Vec<String>,
}

impl Materials {
    /// Returns true when no evidence of any kind was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.git_commits.is_empty()
            && self.devlog.is_none()
            && self.notes.is_empty()
            && self.links.is_empty()
    }

    /// Returns every evidence item in a stable order for grounding checks.
    #[must_use]
    pub fn evidence_items(&self) -> Vec<&EvidenceItem> {
        let mut items: Vec<&EvidenceItem> = Vec::new();
        items.extend(self.git_commits.iter());
        if let Some(devlog) = &self.devlog {
            items.push(devlog);
        }
        items.extend(self.notes.iter());
        items.extend(self.links.iter());
        items
    }

    /// Returns the devlog snippet or an empty string.
    #[must_use]
    pub fn devlog_text(&self) -> &str {
        self.devlog.as_ref().map_or("", |item| item.raw_snippet.as_str())
    }
}

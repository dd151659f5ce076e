// crates/draftline-config/src/blocked_terms.rs
// ============================================================================
// Module: Blocked Terms
// Description: Blocked-term list loading for the sensitive-content check.
// Purpose: Load the YAML term file with a fixed fallback list.
// Dependencies: serde, serde_yaml
// ============================================================================

//! ## Overview
//! Blocked terms live in a YAML file (`blocked_terms:` list). A missing or
//! unreadable file falls back to the built-in sensitive-word list so the
//! check never runs empty. Store-backed app config may override the file
//! contents entirely; that resolution happens at wiring time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use serde::Deserialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fallback terms when no file is available.
const DEFAULT_BLOCKED_TERMS: [&str; 4] = ["password", "secret", "token", "api_key"];

// ============================================================================
// SECTION: Loading
// ============================================================================

/// YAML document shape for the blocked-terms file.
#[derive(Debug, Deserialize)]
struct BlockedTermsFile {
    /// Case-insensitive substrings the policy engine rejects.
    #[serde(default)]
    blocked_terms: Vec<String>,
}

/// Loads blocked terms from the YAML file, lowercased and trimmed, falling
/// back to the built-in list when the file is missing or malformed.
#[must_use]
pub fn load_blocked_terms(path: &Path) -> Vec<String> {
    let parsed = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_yaml::from_str::<BlockedTermsFile>(&raw).ok())
        .map(|file| normalize(file.blocked_terms))
        .filter(|terms| !terms.is_empty());
    parsed.unwrap_or_else(|| {
        normalize(DEFAULT_BLOCKED_TERMS.iter().map(ToString::to_string).collect())
    })
}

/// Lowercases, trims, and drops empty terms.
fn normalize(terms: Vec<String>) -> Vec<String> {
    terms
        .into_iter()
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
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

    use std::io::Write;

    use super::load_blocked_terms;

    /// Tests a well-formed file is loaded and normalized.
    #[test]
    fn test_loads_yaml_terms() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "blocked_terms:\n  - ' Password '\n  - internal codename\n  - ''")
            .unwrap();
        let terms = load_blocked_terms(file.path());
        assert_eq!(terms, vec!["password".to_string(), "internal codename".to_string()]);
    }

    /// Tests a missing file falls back to the built-in list.
    #[test]
    fn test_missing_file_falls_back() {
        let terms = load_blocked_terms(std::path::Path::new("/nonexistent/terms.yaml"));
        assert_eq!(terms, vec!["password", "secret", "token", "api_key"]);
    }
}

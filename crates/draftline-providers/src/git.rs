// crates/draftline-providers/src/git.rs
// ============================================================================
// Module: Git and Devlog Sources
// Description: Local evidence: recent commit subjects and the devlog tail.
// Purpose: Feed the collector from the working repository without a network.
// Dependencies: draftline-core, std
// ============================================================================

//! ## Overview
//! The git source shells out to `git log` with a 24-hour window and a
//! `%H|%ct|%s` pretty format; a directory without `.git` yields no items.
//! The devlog source reads the last 2000 characters of the devlog file. Both
//! report failures as source errors that the collector records and survives.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::UNIX_EPOCH;

use draftline_core::EvidenceItem;
use draftline_core::EvidenceSource;
use draftline_core::SourceError;
use draftline_core::Timestamp;
use tracing::debug;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Commit window in hours.
const DEFAULT_WINDOW_HOURS: u32 = 24;
/// Devlog tail length in characters.
const DEVLOG_TAIL_CHARS: usize = 2_000;

// ============================================================================
// SECTION: Git Commit Source
// ============================================================================

/// Evidence source over recent local git commits.
pub struct GitCommitSource {
    /// Repository working directory.
    repo_path: PathBuf,
    /// Commit window in hours.
    window_hours: u32,
}

impl GitCommitSource {
    /// Creates a git source over the repository path.
    #[must_use]
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self { repo_path: repo_path.into(), window_hours: DEFAULT_WINDOW_HOURS }
    }

    /// Parses one `%H|%ct|%s` log line.
    fn parse_line(line: &str) -> Option<EvidenceItem> {
        let mut parts = line.splitn(3, '|');
        let hash = parts.next()?.trim();
        let epoch = parts.next()?.trim().parse::<i64>().ok()?;
        let subject = parts.next()?.trim();
        if hash.is_empty() || subject.is_empty() {
            return None;
        }
        Some(EvidenceItem {
            source_name: "git".to_string(),
            source_id: hash.to_string(),
            timestamp: Timestamp::from_unix_millis(epoch.saturating_mul(1_000)),
            raw_snippet: subject.to_string(),
            title: Some(subject.to_string()),
            url: None,
        })
    }
}

impl EvidenceSource for GitCommitSource {
    fn name(&self) -> &str {
        "git"
    }

    fn fetch(&self) -> Result<Vec<EvidenceItem>, SourceError> {
        if !self.repo_path.join(".git").is_dir() {
            debug!(path = %self.repo_path.display(), "no git repository, skipping");
            return Ok(Vec::new());
        }
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_path)
            .arg("log")
            .arg(format!("--since={}hours", self.window_hours))
            .arg("--pretty=format:%H|%ct|%s")
            .output()
            .map_err(|err| SourceError::Fetch(format!("git log spawn: {err}")))?;
        if !output.status.success() {
            return Err(SourceError::Fetch(format!(
                "git log exited with {}",
                output.status
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().filter_map(Self::parse_line).collect())
    }
}

// ============================================================================
// SECTION: Devlog Source
// ============================================================================

/// Evidence source over the tail of the devlog file.
pub struct DevlogSource {
    /// Devlog file path.
    path: PathBuf,
}

impl DevlogSource {
    /// Creates a devlog source over the file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EvidenceSource for DevlogSource {
    fn name(&self) -> &str {
        "devlog"
    }

    fn fetch(&self) -> Result<Vec<EvidenceItem>, SourceError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|err| SourceError::Fetch(format!("read devlog: {err}")))?;
        let tail: String = content
            .chars()
            .rev()
            .take(DEVLOG_TAIL_CHARS)
            .collect::<Vec<char>>()
            .into_iter()
            .rev()
            .collect();
        let tail = tail.trim().to_string();
        if tail.is_empty() {
            return Ok(Vec::new());
        }
        let modified = fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .and_then(|elapsed| i64::try_from(elapsed.as_millis()).ok())
            .unwrap_or(0);
        Ok(vec![EvidenceItem {
            source_name: "devlog".to_string(),
            source_id: self.path.display().to_string(),
            timestamp: Timestamp::from_unix_millis(modified),
            raw_snippet: tail,
            title: self.path.file_name().map(|name| name.to_string_lossy().into_owned()),
            url: None,
        }])
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

    use std::io::Write;

    use draftline_core::EvidenceSource;

    use super::DevlogSource;
    use super::GitCommitSource;

    /// Tests git log line parsing.
    #[test]
    fn test_parse_log_line() {
        let item =
            GitCommitSource::parse_line("abc123|1700000000|Fix login redirect bug").unwrap();
        assert_eq!(item.source_id, "abc123");
        assert_eq!(item.raw_snippet, "Fix login redirect bug");
        assert_eq!(item.timestamp.unix_millis(), 1_700_000_000_000);
        assert!(GitCommitSource::parse_line("malformed line").is_none());
    }

    /// Tests a non-repository path yields no items.
    #[test]
    fn test_missing_repo_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = GitCommitSource::new(dir.path());
        assert!(source.fetch().unwrap().is_empty());
    }

    /// Tests the devlog tail is clipped and trimmed.
    #[test]
    fn test_devlog_tail() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let body = format!("{}END", "x".repeat(3_000));
        file.write_all(body.as_bytes()).unwrap();
        let source = DevlogSource::new(file.path());
        let items = source.fetch().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].raw_snippet.chars().count(), 2_000);
        assert!(items[0].raw_snippet.ends_with("END"));
    }
}

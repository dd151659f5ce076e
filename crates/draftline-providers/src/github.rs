// crates/draftline-providers/src/github.rs
// ============================================================================
// Module: GitHub Source
// Description: Evidence from recently updated pull requests and issues.
// Purpose: Feed the collector from a GitHub repository with strict limits.
// Dependencies: draftline-core, reqwest, serde, time
// ============================================================================

//! ## Overview
//! The GitHub source reads the 20 most recently updated pull requests and
//! issues, keeping those updated within the last 24 hours. Pull requests that
//! appear in the issues listing are dropped there. Failures surface as source
//! errors the collector records and survives.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use draftline_core::EvidenceItem;
use draftline_core::EvidenceSource;
use draftline_core::SourceError;
use draftline_core::Timestamp;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde::Deserialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Items requested per listing.
const PER_PAGE: u32 = 20;
/// Update window in hours.
const WINDOW_HOURS: i64 = 24;
/// Body excerpt carried into a snippet.
const BODY_EXCERPT_CHARS: usize = 280;

// ============================================================================
// SECTION: Source
// ============================================================================

/// Evidence source over a GitHub repository.
pub struct GithubSource {
    /// Repository in `owner/repo` form.
    repo: String,
    /// Bearer token for the API.
    token: String,
    /// HTTP client used for outbound requests.
    client: Client,
    /// Host time in unix milliseconds, captured at construction.
    now_ms: i64,
}

/// Pull request listing item.
#[derive(Debug, Deserialize)]
struct PullItem {
    /// Pull request number.
    number: u64,
    /// Title line.
    #[serde(default)]
    title: String,
    /// Body text.
    #[serde(default)]
    body: Option<String>,
    /// Web URL.
    #[serde(default)]
    html_url: Option<String>,
    /// Last update timestamp, RFC 3339.
    #[serde(default)]
    updated_at: Option<String>,
}

/// Issue listing item.
#[derive(Debug, Deserialize)]
struct IssueItem {
    /// Issue number.
    number: u64,
    /// Title line.
    #[serde(default)]
    title: String,
    /// Body text.
    #[serde(default)]
    body: Option<String>,
    /// Web URL.
    #[serde(default)]
    html_url: Option<String>,
    /// Last update timestamp, RFC 3339.
    #[serde(default)]
    updated_at: Option<String>,
    /// Present when the "issue" is actually a pull request.
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

impl GithubSource {
    /// Creates a GitHub source for the repository.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the HTTP client cannot be built.
    pub fn new(
        repo: impl Into<String>,
        token: impl Into<String>,
        timeout_ms: u64,
        now: Timestamp,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(Policy::none())
            .user_agent("draftline/0.1")
            .build()
            .map_err(|_| SourceError::Fetch("http client build failed".to_string()))?;
        Ok(Self { repo: repo.into(), token: token.into(), client, now_ms: now.unix_millis() })
    }

    /// Returns the cutoff for "recently updated".
    fn cutoff(&self) -> Timestamp {
        Timestamp::from_unix_millis(self.now_ms).plus_hours(-WINDOW_HOURS)
    }

    /// Fetches and parses one listing endpoint.
    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .map_err(|err| SourceError::Fetch(err.to_string()))?;
        if !response.status().is_success() {
            return Err(SourceError::Fetch(format!(
                "github status {}",
                response.status().as_u16()
            )));
        }
        response.json().map_err(|err| SourceError::Fetch(err.to_string()))
    }

    /// Builds a snippet from a kind label, number, title, and body.
    fn snippet(kind: &str, number: u64, title: &str, body: Option<&str>) -> String {
        let excerpt: String =
            body.unwrap_or_default().chars().take(BODY_EXCERPT_CHARS).collect();
        format!("{kind} #{number}: {title}\n{excerpt}").trim().to_string()
    }
}

impl EvidenceSource for GithubSource {
    fn name(&self) -> &str {
        "github"
    }

    fn fetch(&self) -> Result<Vec<EvidenceItem>, SourceError> {
        if self.repo.is_empty() || self.token.is_empty() {
            return Err(SourceError::Fetch("github repo or token not configured".to_string()));
        }
        let cutoff = self.cutoff();
        let base = format!("https://api.github.com/repos/{}", self.repo.trim());
        let mut items = Vec::new();

        let pulls: Vec<PullItem> = self.get_json(&format!(
            "{base}/pulls?state=all&per_page={PER_PAGE}&sort=updated&direction=desc"
        ))?;
        for pull in pulls {
            let updated = parse_rfc3339(pull.updated_at.as_deref());
            if updated.is_some_and(|ts| ts < cutoff) {
                continue;
            }
            items.push(EvidenceItem {
                source_name: "github".to_string(),
                source_id: format!("pr:{}", pull.number),
                timestamp: updated.unwrap_or(Timestamp::from_unix_millis(self.now_ms)),
                raw_snippet: Self::snippet("PR", pull.number, &pull.title, pull.body.as_deref()),
                title: Some(pull.title),
                url: pull.html_url,
            });
        }

        let issues: Vec<IssueItem> =
            self.get_json(&format!("{base}/issues?state=all&per_page={PER_PAGE}"))?;
        for issue in issues {
            if issue.pull_request.is_some() {
                continue;
            }
            let updated = parse_rfc3339(issue.updated_at.as_deref());
            if updated.is_some_and(|ts| ts < cutoff) {
                continue;
            }
            items.push(EvidenceItem {
                source_name: "github".to_string(),
                source_id: format!("issue:{}", issue.number),
                timestamp: updated.unwrap_or(Timestamp::from_unix_millis(self.now_ms)),
                raw_snippet: Self::snippet(
                    "Issue",
                    issue.number,
                    &issue.title,
                    issue.body.as_deref(),
                ),
                title: Some(issue.title),
                url: issue.html_url,
            });
        }

        Ok(items)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses an optional RFC 3339 timestamp.
fn parse_rfc3339(raw: Option<&str>) -> Option<Timestamp> {
    raw.and_then(|value| Timestamp::parse_rfc3339(value).ok())
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

    use super::GithubSource;
    use super::parse_rfc3339;

    /// Tests snippet composition with a clipped body.
    #[test]
    fn test_snippet_clips_body() {
        let body = "b".repeat(500);
        let snippet = GithubSource::snippet("PR", 7, "Add retry helper", Some(&body));
        assert!(snippet.starts_with("PR #7: Add retry helper\n"));
        assert!(snippet.chars().count() <= 24 + 280);
    }

    /// Tests timestamp parsing tolerates absence and junk.
    #[test]
    fn test_parse_rfc3339() {
        assert!(parse_rfc3339(Some("2026-01-02T03:04:05Z")).is_some());
        assert!(parse_rfc3339(Some("not a date")).is_none());
        assert!(parse_rfc3339(None).is_none());
    }
}

// crates/draftline-providers/src/rss.rs
// ============================================================================
// Module: RSS Source
// Description: Evidence from recent RSS feed entries.
// Purpose: Feed the collector from configured feeds with strict limits.
// Dependencies: draftline-core, regex, reqwest, time
// ============================================================================

//! ## Overview
//! The RSS source fetches each configured feed with a bounded GET, extracts
//! up to 30 `<item>` entries, and keeps those published within the last 24
//! hours (entries without a parsable date are kept). Extraction is a narrow
//! pattern scan over title, link, guid, description, and pubDate; feeds are
//! untrusted input and anything unexpected is simply skipped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::LazyLock;
use std::time::Duration;

use draftline_core::EvidenceItem;
use draftline_core::EvidenceSource;
use draftline_core::SourceError;
use draftline_core::Timestamp;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc2822;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Entries read per feed.
const MAX_ENTRIES_PER_FEED: usize = 30;
/// Publication window in hours.
const WINDOW_HOURS: i64 = 24;
/// Snippet budget in characters.
const SNIPPET_CHARS: usize = 500;
/// Source identifier budget in characters.
const SOURCE_ID_CHARS: usize = 120;
/// Maximum feed body read, in bytes.
const MAX_FEED_BYTES: u64 = 1024 * 1024;

/// Item block pattern.
static ITEM_BLOCK: LazyLock<Regex> = LazyLock::new(|| compile(r"(?s)<item[ >](.*?)</item>"));
/// Title field pattern.
static TITLE_FIELD: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?s)<title[^>]*>(.*?)</title>"));
/// Link field pattern.
static LINK_FIELD: LazyLock<Regex> = LazyLock::new(|| compile(r"(?s)<link[^>]*>(.*?)</link>"));
/// Guid field pattern.
static GUID_FIELD: LazyLock<Regex> = LazyLock::new(|| compile(r"(?s)<guid[^>]*>(.*?)</guid>"));
/// Description field pattern.
static DESCRIPTION_FIELD: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?s)<description[^>]*>(.*?)</description>"));
/// Publication date field pattern.
static PUBDATE_FIELD: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?s)<pubDate[^>]*>(.*?)</pubDate>"));

/// Compiles a constant pattern.
#[allow(clippy::unwrap_used, reason = "Patterns are compile-time constants.")]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

// ============================================================================
// SECTION: Source
// ============================================================================

/// Evidence source over configured RSS feeds.
pub struct RssSource {
    /// Feed URLs, fetched in order.
    feed_urls: Vec<String>,
    /// HTTP client used for outbound requests.
    client: Client,
    /// Host time in unix milliseconds, captured at construction.
    now_ms: i64,
}

impl RssSource {
    /// Creates an RSS source over the feed URLs.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the HTTP client cannot be built.
    pub fn new(
        feed_urls: Vec<String>,
        timeout_ms: u64,
        now: Timestamp,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(Policy::none())
            .user_agent("draftline/0.1")
            .build()
            .map_err(|_| SourceError::Fetch("http client build failed".to_string()))?;
        Ok(Self { feed_urls, client, now_ms: now.unix_millis() })
    }

    /// Extracts evidence items from one feed body.
    fn extract(&self, body: &str) -> Vec<EvidenceItem> {
        let cutoff = Timestamp::from_unix_millis(self.now_ms).plus_hours(-WINDOW_HOURS);
        let mut items = Vec::new();
        for capture in ITEM_BLOCK.captures_iter(body).take(MAX_ENTRIES_PER_FEED) {
            let Some(block) = capture.get(1).map(|m| m.as_str()) else {
                continue;
            };
            let title = field(&TITLE_FIELD, block);
            let link = field(&LINK_FIELD, block);
            let guid = field(&GUID_FIELD, block);
            let description = field(&DESCRIPTION_FIELD, block);
            let published = field(&PUBDATE_FIELD, block).and_then(|raw| parse_rfc2822(&raw));
            if published.is_some_and(|ts| ts < cutoff) {
                continue;
            }
            let title = title.unwrap_or_default();
            let snippet: String = format!("{title}\n{}", description.unwrap_or_default())
                .trim()
                .chars()
                .take(SNIPPET_CHARS)
                .collect();
            if snippet.is_empty() {
                continue;
            }
            let source_id: String = guid
                .or_else(|| link.clone())
                .unwrap_or_else(|| title.clone())
                .chars()
                .take(SOURCE_ID_CHARS)
                .collect();
            items.push(EvidenceItem {
                source_name: "rss".to_string(),
                source_id,
                timestamp: published.unwrap_or(Timestamp::from_unix_millis(self.now_ms)),
                raw_snippet: snippet,
                title: Some(title),
                url: link,
            });
        }
        items
    }
}

impl EvidenceSource for RssSource {
    fn name(&self) -> &str {
        "rss"
    }

    fn fetch(&self) -> Result<Vec<EvidenceItem>, SourceError> {
        if self.feed_urls.is_empty() {
            return Err(SourceError::Fetch("rss feed urls not configured".to_string()));
        }
        let mut items = Vec::new();
        for url in &self.feed_urls {
            let response = self
                .client
                .get(url)
                .send()
                .map_err(|err| SourceError::Fetch(format!("{url}: {err}")))?;
            if !response.status().is_success() {
                return Err(SourceError::Fetch(format!(
                    "{url}: status {}",
                    response.status().as_u16()
                )));
            }
            let mut body = String::new();
            use std::io::Read as _;
            response
                .take(MAX_FEED_BYTES)
                .read_to_string(&mut body)
                .map_err(|err| SourceError::Fetch(format!("{url}: read body: {err}")))?;
            items.extend(self.extract(&body));
        }
        Ok(items)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts a trimmed field from an item block, unwrapping CDATA.
fn field(pattern: &Regex, block: &str) -> Option<String> {
    let raw = pattern.captures(block)?.get(1)?.as_str().trim();
    let unwrapped = raw
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
        .unwrap_or(raw)
        .trim();
    (!unwrapped.is_empty()).then(|| unwrapped.to_string())
}

/// Parses an RFC 2822 publication date.
fn parse_rfc2822(raw: &str) -> Option<Timestamp> {
    let parsed = OffsetDateTime::parse(raw, &Rfc2822).ok()?;
    let millis = i64::try_from(parsed.unix_timestamp_nanos() / 1_000_000).ok()?;
    Some(Timestamp::from_unix_millis(millis))
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

    use draftline_core::Timestamp;

    use super::RssSource;

    /// A small two-item feed body for extraction tests.
    const FEED: &str = "<rss><channel>\
        <item><title>Shipped the retry helper</title>\
        <link>https://blog.example.test/retry</link>\
        <guid>post-1</guid>\
        <description><![CDATA[Details about the retry helper.]]></description>\
        <pubDate>Mon, 01 Jan 2120 00:00:00 +0000</pubDate></item>\
        <item><title>Ancient post</title>\
        <pubDate>Mon, 01 Jan 2001 00:00:00 +0000</pubDate>\
        <description>old</description></item>\
        </channel></rss>";

    /// Tests extraction keeps recent items and drops stale ones.
    #[test]
    fn test_extract_filters_by_window() {
        let now = Timestamp::parse_rfc3339("2119-12-31T12:00:00Z").unwrap();
        let source = RssSource::new(vec!["https://unused.test".to_string()], 5_000, now).unwrap();
        let items = source.extract(FEED);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source_id, "post-1");
        assert_eq!(items[0].url.as_deref(), Some("https://blog.example.test/retry"));
        assert!(items[0].raw_snippet.contains("retry helper"));
    }
}

// crates/draftline-core/src/pipeline/collector.rs
// ============================================================================
// Module: Collector Stage
// Description: Evidence collection from the enabled source adapters.
// Purpose: Aggregate per-source evidence into Materials with non-fatal errors.
// Dependencies: crate::{core, interfaces, pipeline}
// ============================================================================

//! ## Overview
//! The collector reads every enabled source adapter and routes items into the
//! [`Materials`] aggregate: `git` items become commits, the first `devlog`
//! item becomes the devlog excerpt, items with a URL become links, and the
//! rest become notes. A failing source contributes an entry to
//! `Materials.errors` and nothing else; collection never fails the run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::evidence::Materials;
use crate::core::run::truncate_summary;
use crate::interfaces::EvidenceSource;
use crate::pipeline::Stage;
use crate::pipeline::StageError;

// ============================================================================
// SECTION: Collector
// ============================================================================

/// Evidence collection stage over the enabled source adapters.
pub struct Collector<'a> {
    /// Enabled sources, queried in order.
    sources: Vec<&'a dyn EvidenceSource>,
}

impl<'a> Collector<'a> {
    /// Creates a collector over the given sources.
    #[must_use]
    pub fn new(sources: Vec<&'a dyn EvidenceSource>) -> Self {
        Self { sources }
    }
}

impl Stage for Collector<'_> {
    type Input = ();
    type Output = Materials;

    fn name(&self) -> &'static str {
        "collector"
    }

    fn input_summary(&self, (): &Self::Input) -> String {
        format!("sources={}", self.sources.len())
    }

    fn output_summary(&self, output: &Self::Output) -> String {
        format!(
            "Materials(git_commits={}, notes={}, links={}, errors={})",
            output.git_commits.len(),
            output.notes.len(),
            output.links.len(),
            output.errors.len()
        )
    }

    fn warnings(&self, output: &Self::Output) -> Vec<String> {
        output.errors.clone()
    }

    fn run(&self, (): Self::Input) -> Result<Self::Output, StageError> {
        let mut materials = Materials::default();
        for source in &self.sources {
            match source.fetch() {
                Ok(items) => {
                    for item in items {
                        match source.name() {
                            "git" => materials.git_commits.push(item),
                            "devlog" => {
                                if materials.devlog.is_none() {
                                    materials.devlog = Some(item);
                                }
                            }
                            _ if item.url.is_some() => materials.links.push(item),
                            _ => materials.notes.push(item),
                        }
                    }
                }
                Err(err) => {
                    materials.errors.push(truncate_summary(&format!(
                        "source:{} failed: {err}",
                        source.name()
                    )));
                }
            }
        }
        Ok(materials)
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

    use crate::core::evidence::EvidenceItem;
    use crate::core::time::Timestamp;
    use crate::interfaces::EvidenceSource;
    use crate::interfaces::SourceError;
    use crate::pipeline::Stage;

    use super::Collector;

    /// Source stub returning fixed items.
    struct FixedSource {
        /// Source name.
        name: &'static str,
        /// Items to return.
        items: Vec<EvidenceItem>,
    }

    impl EvidenceSource for FixedSource {
        fn name(&self) -> &str {
            self.name
        }

        fn fetch(&self) -> Result<Vec<EvidenceItem>, SourceError> {
            Ok(self.items.clone())
        }
    }

    /// Source stub that always fails.
    struct BrokenSource;

    impl EvidenceSource for BrokenSource {
        fn name(&self) -> &str {
            "rss"
        }

        fn fetch(&self) -> Result<Vec<EvidenceItem>, SourceError> {
            Err(SourceError::Fetch("connection refused".to_string()))
        }
    }

    /// Builds an evidence item for tests.
    fn item(source: &str, id: &str, url: Option<&str>) -> EvidenceItem {
        EvidenceItem {
            source_name: source.to_string(),
            source_id: id.to_string(),
            timestamp: Timestamp::from_unix_millis(0),
            raw_snippet: format!("snippet {id}"),
            title: None,
            url: url.map(ToString::to_string),
        }
    }

    /// Tests routing into commits, notes, links, and devlog.
    #[test]
    fn test_routes_items_by_source() {
        let git = FixedSource { name: "git", items: vec![item("git", "abc", None)] };
        let devlog = FixedSource {
            name: "devlog",
            items: vec![item("devlog", "devlog.md", None)],
        };
        let github = FixedSource {
            name: "github",
            items: vec![
                item("github", "pr-1", Some("https://example.test/pr/1")),
                item("github", "note-1", None),
            ],
        };
        let collector = Collector::new(vec![&git, &devlog, &github]);
        let materials = collector.run(()).unwrap();
        assert_eq!(materials.git_commits.len(), 1);
        assert!(materials.devlog.is_some());
        assert_eq!(materials.links.len(), 1);
        assert_eq!(materials.notes.len(), 1);
        assert!(materials.errors.is_empty());
    }

    /// Tests a failing source is recorded and never fatal.
    #[test]
    fn test_source_failure_is_warning() {
        let git = FixedSource { name: "git", items: vec![item("git", "abc", None)] };
        let broken = BrokenSource;
        let collector = Collector::new(vec![&git, &broken]);
        let materials = collector.run(()).unwrap();
        assert_eq!(materials.git_commits.len(), 1);
        assert_eq!(materials.errors.len(), 1);
        assert!(materials.errors[0].starts_with("source:rss failed"));
    }
}

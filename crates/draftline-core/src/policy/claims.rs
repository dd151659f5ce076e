// crates/draftline-core/src/policy/claims.rs
// ============================================================================
// Module: Policy Claim Extraction
// Description: Deterministic claim splitting, tokenization, and evidence mapping.
// Purpose: Ground every factual claim in collected evidence or flag it.
// Dependencies: crate::core, regex
// ============================================================================

//! ## Overview
//! Claims are sentences split on newline and terminal punctuation, with
//! opinion-marked and very short sentences excluded, capped at 20. Evidence
//! mapping scores each claim against every evidence snippet by Jaccard
//! similarity over word tokens and keeps the top two matches at or above the
//! grounding floor. An optional model-backed extractor may replace the
//! splitter; it falls back silently on any error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::evidence::EvidenceRef;
use crate::core::evidence::Materials;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of extracted claims.
pub const MAX_CLAIMS: usize = 20;
/// Minimum token count for a sentence to count as a claim.
const MIN_CLAIM_TOKENS: usize = 4;
/// Jaccard floor for evidence to support a claim.
pub const GROUNDING_FLOOR: f64 = 0.2;
/// Evidence references kept per claim.
const TOP_EVIDENCE: usize = 2;
/// Maximum quote length carried into an evidence reference.
const QUOTE_LIMIT: usize = 180;

/// Opinion markers that exclude a sentence from claim extraction.
const OPINION_MARKERS: [&str; 6] =
    ["i think", "i feel", "my take", "opinion", "i learned", "lesson"];

/// Word-token pattern for similarity and grounding.
static WORD_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| crate::policy::compile_pattern(r"[A-Za-z0-9_]+"));

// ============================================================================
// SECTION: Tokenization
// ============================================================================

/// Tokenizes text into the lowercase word set used for similarity.
///
/// Tokens shorter than three characters are dropped.
#[must_use]
pub fn tokenize(text: &str) -> BTreeSet<String> {
    WORD_TOKEN
        .find_iter(&text.to_lowercase())
        .map(|token| token.as_str().to_string())
        .filter(|token| token.len() >= 3)
        .collect()
}

/// Jaccard similarity over two token sets.
#[must_use]
#[allow(clippy::cast_precision_loss, reason = "Token set sizes are far below 2^52.")]
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

// ============================================================================
// SECTION: Claim Extraction
// ============================================================================

/// Returns true when the sentence reads as an opinion rather than a claim.
fn looks_like_opinion(sentence: &str) -> bool {
    let low = sentence.to_lowercase();
    OPINION_MARKERS.iter().any(|marker| low.contains(marker))
}

/// Extracts factual claims from the composed tweet list.
#[must_use]
pub fn extract_claims(tweets: &[String]) -> Vec<String> {
    let mut claims = Vec::new();
    for tweet in tweets {
        for part in tweet.split(['\n', '.', '!', '?']) {
            let sentence = part.trim();
            if sentence.is_empty() || looks_like_opinion(sentence) {
                continue;
            }
            if tokenize(sentence).len() < MIN_CLAIM_TOKENS {
                continue;
            }
            claims.push(sentence.to_string());
            if claims.len() == MAX_CLAIMS {
                return claims;
            }
        }
    }
    claims
}

// ============================================================================
// SECTION: Evidence Mapping
// ============================================================================

/// Maps claims to their best supporting evidence; unmatched claims are
/// returned as unsupported.
#[must_use]
pub fn map_evidence(
    claims: &[String],
    materials: &Materials,
) -> (BTreeMap<String, Vec<EvidenceRef>>, Vec<String>) {
    let items = materials.evidence_items();
    let item_tokens: Vec<BTreeSet<String>> =
        items.iter().map(|item| tokenize(&item.raw_snippet)).collect();

    let mut evidence_map = BTreeMap::new();
    let mut unsupported = Vec::new();
    for claim in claims {
        let claim_tokens = tokenize(claim);
        let mut scored: Vec<(f64, usize)> = items
            .iter()
            .enumerate()
            .map(|(index, _)| (jaccard(&claim_tokens, &item_tokens[index]), index))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        let refs: Vec<EvidenceRef> = scored
            .into_iter()
            .take(TOP_EVIDENCE)
            .filter(|(score, _)| *score >= GROUNDING_FLOOR)
            .map(|(_, index)| {
                let item = items[index];
                EvidenceRef {
                    source_name: item.source_name.clone(),
                    source_id: item.source_id.clone(),
                    quote: item.raw_snippet.chars().take(QUOTE_LIMIT).collect(),
                }
            })
            .collect();
        if refs.is_empty() {
            unsupported.push(claim.clone());
        } else {
            evidence_map.insert(claim.clone(), refs);
        }
    }
    (evidence_map, unsupported)
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
        clippy::float_cmp,
        clippy::missing_docs_in_private_items,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use crate::core::evidence::EvidenceItem;
    use crate::core::evidence::Materials;
    use crate::core::time::Timestamp;

    use super::extract_claims;
    use super::jaccard;
    use super::map_evidence;
    use super::tokenize;

    /// Tests tokenization drops short tokens and lowercases.
    #[test]
    fn test_tokenize_filters_short_tokens() {
        let tokens = tokenize("Fixed a DB bug in IO path");
        assert!(tokens.contains("fixed"));
        assert!(tokens.contains("bug"));
        assert!(tokens.contains("path"));
        assert!(!tokens.contains("a"));
        assert!(!tokens.contains("db"));
    }

    /// Tests identical texts score 1.0.
    #[test]
    fn test_jaccard_identity() {
        let a = tokenize("shipped the retry helper today");
        assert_eq!(jaccard(&a, &a), 1.0);
        assert_eq!(jaccard(&a, &tokenize("")), 0.0);
    }

    /// Tests opinion and short sentences are excluded from claims.
    #[test]
    fn test_extract_claims_excludes_opinions() {
        let tweets = vec![
            "Fixed the login redirect bug in the session layer. I think this was overdue."
                .to_string(),
            "Short one.".to_string(),
        ];
        let claims = extract_claims(&tweets);
        assert_eq!(claims, vec!["Fixed the login redirect bug in the session layer".to_string()]);
    }

    /// Tests the claim cap at twenty.
    #[test]
    fn test_extract_claims_caps_at_twenty() {
        let sentence = "another concrete fact about the deploy pipeline";
        let tweet = (0..30).map(|_| sentence).collect::<Vec<_>>().join(". ");
        let claims = extract_claims(&[tweet]);
        assert_eq!(claims.len(), 20);
    }

    /// Tests grounding maps a claim to its commit evidence.
    #[test]
    fn test_map_evidence_grounds_matching_claim() {
        let materials = Materials {
            git_commits: vec![EvidenceItem {
                source_name: "git".to_string(),
                source_id: "abc123".to_string(),
                timestamp: Timestamp::from_unix_millis(0),
                raw_snippet: "Fix login redirect bug".to_string(),
                title: None,
                url: None,
            }],
            ..Materials::default()
        };
        let claims = vec!["Fixed login redirect bug and shipped it".to_string()];
        let (map, unsupported) = map_evidence(&claims, &materials);
        assert!(unsupported.is_empty());
        let refs = map.get(&claims[0]).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].source_id, "abc123");
    }

    /// Tests an ungrounded claim lands in unsupported.
    #[test]
    fn test_map_evidence_flags_unsupported() {
        let claims = vec!["Completely unrelated statement about databases here".to_string()];
        let (map, unsupported) = map_evidence(&claims, &Materials::default());
        assert!(map.is_empty());
        assert_eq!(unsupported.len(), 1);
    }
}

// crates/draftline-core/tests/properties.rs
// ============================================================================
// Module: Property Tests
// Description: Property checks over similarity, numbering, and tokens.
// ============================================================================
//! ## Overview
//! Property-based checks for the arithmetic the policy engine and critic
//! lean on: Jaccard bounds and identity, similarity monotonicity against a
//! duplicated candidate, numbering length bounds, and token hash stability.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use draftline_core::pipeline::critic::add_numbering;
use draftline_core::policy::checks::check_similarity;
use draftline_core::policy::claims::jaccard;
use draftline_core::policy::claims::tokenize;
use draftline_core::runtime::tokens::generate_bearer;
use draftline_core::runtime::tokens::hash_token;
use proptest::prelude::*;

/// Strategy for short word-ish sentences.
fn sentence() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z]{3,8}", 1..12).prop_map(|words| words.join(" "))
}

proptest! {
    /// Jaccard stays within [0, 1] and is symmetric.
    #[test]
    fn prop_jaccard_bounds(a in sentence(), b in sentence()) {
        let ta = tokenize(&a);
        let tb = tokenize(&b);
        let forward = jaccard(&ta, &tb);
        let backward = jaccard(&tb, &ta);
        prop_assert!((0.0..=1.0).contains(&forward));
        prop_assert!((forward - backward).abs() < f64::EPSILON);
    }

    /// A candidate identical to a recent post always fails similarity.
    #[test]
    fn prop_duplicate_recent_post_fails(text in sentence()) {
        let tweets = vec![text.clone()];
        let (ok_without, _) = check_similarity(&tweets, &[], 0.6);
        prop_assert!(ok_without);
        let (ok_with, detail) = check_similarity(&tweets, &[text], 0.6);
        prop_assert!(!ok_with);
        prop_assert!(detail.starts_with("jaccard=1.00"));
    }

    /// Numbered tweets never exceed the 280-char hard limit and keep their
    /// suffix.
    #[test]
    fn prop_numbering_bounds(bodies in proptest::collection::vec(".{0,400}", 1..6)) {
        let numbered = add_numbering(&bodies);
        prop_assert_eq!(numbered.len(), bodies.len());
        let total = bodies.len();
        for (index, tweet) in numbered.iter().enumerate() {
            prop_assert!(tweet.chars().count() <= 280);
            let suffix = format!("({}/{total})", index + 1);
            prop_assert!(tweet.ends_with(&suffix));
        }
    }

    /// Token hashing is stable and never echoes the bearer.
    #[test]
    fn prop_token_hash_stable(_seed in 0_u8..4) {
        let bearer = generate_bearer();
        let hash = hash_token(&bearer);
        prop_assert_eq!(hash.clone(), hash_token(&bearer));
        prop_assert_eq!(hash.len(), 64);
        prop_assert!(hash != bearer);
    }
}

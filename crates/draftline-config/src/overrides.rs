// crates/draftline-config/src/overrides.rs
// ============================================================================
// Module: Runtime Overrides
// Description: Store-backed app-config overrides for runtime-tunable keys.
// Purpose: Read overrides fresh from the store on every use, no caching.
// Dependencies: draftline-core, serde_json
// ============================================================================

//! ## Overview
//! App-config rows hold `{"value": <bool|int|float|string>}` payloads keyed
//! by the setting name. Reads always go to the store so operator changes take
//! effect immediately; a missing or mistyped value falls back to the caller's
//! default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use draftline_core::DraftStore;
use serde_json::Value;

// ============================================================================
// SECTION: Readers
// ============================================================================

/// Reads the raw override payload value for a key.
fn raw_value<S: DraftStore>(store: &S, key: &str) -> Option<Value> {
    store
        .get_app_config(key)
        .ok()
        .flatten()
        .and_then(|payload| payload.get("value").cloned())
}

/// Reads a boolean override, accepting booleans, `"true"`, and integers.
#[must_use]
pub fn runtime_bool<S: DraftStore>(store: &S, key: &str, default: bool) -> bool {
    match raw_value(store, key) {
        Some(Value::Bool(value)) => value,
        Some(Value::String(value)) => value.eq_ignore_ascii_case("true"),
        Some(Value::Number(value)) => value.as_i64().is_some_and(|n| n != 0),
        _ => default,
    }
}

/// Reads an integer override, accepting integers and numeric strings.
#[must_use]
pub fn runtime_i64<S: DraftStore>(store: &S, key: &str, default: i64) -> i64 {
    match raw_value(store, key) {
        Some(Value::Number(value)) => value.as_i64().unwrap_or(default),
        Some(Value::String(value)) => value.trim().parse().unwrap_or(default),
        _ => default,
    }
}

/// Reads a float override, accepting numbers and numeric strings.
#[must_use]
pub fn runtime_f64<S: DraftStore>(store: &S, key: &str, default: f64) -> f64 {
    match raw_value(store, key) {
        Some(Value::Number(value)) => value.as_f64().unwrap_or(default),
        Some(Value::String(value)) => value.trim().parse().unwrap_or(default),
        _ => default,
    }
}

/// Reads a string override.
#[must_use]
pub fn runtime_string<S: DraftStore>(store: &S, key: &str, default: &str) -> String {
    match raw_value(store, key) {
        Some(Value::String(value)) => value,
        _ => default.to_string(),
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

    use draftline_core::DraftStore;
    use draftline_core::InMemoryDraftStore;
    use draftline_core::Timestamp;
    use serde_json::json;

    use super::runtime_bool;
    use super::runtime_f64;
    use super::runtime_i64;
    use super::runtime_string;

    /// Tests overrides are read fresh and coerced by type.
    #[test]
    fn test_override_coercion() {
        let store = InMemoryDraftStore::new();
        let now = Timestamp::from_unix_millis(0);
        assert_eq!(runtime_i64(&store, "REWRITE_MAX", 1), 1);

        store.set_app_config("REWRITE_MAX", &json!({"value": "2"}), now).unwrap();
        store.set_app_config("DRY_RUN", &json!({"value": false}), now).unwrap();
        store
            .set_app_config("SIMILARITY_THRESHOLD", &json!({"value": 0.4}), now)
            .unwrap();
        store
            .set_app_config("BLOCKED_TERMS_PATH", &json!({"value": "/etc/terms.yaml"}), now)
            .unwrap();

        assert_eq!(runtime_i64(&store, "REWRITE_MAX", 1), 2);
        assert!(!runtime_bool(&store, "DRY_RUN", true));
        assert!((runtime_f64(&store, "SIMILARITY_THRESHOLD", 0.6) - 0.4).abs() < f64::EPSILON);
        assert_eq!(
            runtime_string(&store, "BLOCKED_TERMS_PATH", "./blocked_terms.yaml"),
            "/etc/terms.yaml"
        );
        // A non-string payload falls back to the caller's default.
        assert_eq!(runtime_string(&store, "DRY_RUN", "fallback"), "fallback".to_string());
    }
}

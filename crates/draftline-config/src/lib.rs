// crates/draftline-config/src/lib.rs
// ============================================================================
// Module: Draftline Config Library
// Description: Public API surface for configuration loading and validation.
// Purpose: Expose the settings model, blocked-terms loading, and overrides.
// Dependencies: crate::{blocked_terms, config, overrides}
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size limits and
//! environment overrides, and fails closed on invalid values. Secrets are
//! never stored in the file: credential fields name the environment variable
//! that carries the secret. Runtime-tunable keys can additionally be
//! overridden through the store-backed app config, read fresh on every use.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod blocked_terms;
pub mod config;
pub mod overrides;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use blocked_terms::load_blocked_terms;
pub use config::ConfigError;
pub use config::LlmSettings;
pub use config::NotifySettings;
pub use config::PipelineSettings;
pub use config::PublishSettings;
pub use config::Settings;
pub use config::SourceSettings;
pub use config::StoreSettings;
pub use config::ThreadSettings;
pub use overrides::runtime_bool;
pub use overrides::runtime_f64;
pub use overrides::runtime_i64;
pub use overrides::runtime_string;

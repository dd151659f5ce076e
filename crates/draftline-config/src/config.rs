// crates/draftline-config/src/config.rs
// ============================================================================
// Module: Draftline Configuration
// Description: Configuration loading and validation for Draftline.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: draftline-core, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size limits, then
//! overridden by `DRAFTLINE_*` environment variables for the runtime-tunable
//! keys. Missing or invalid configuration fails closed. Credential fields
//! name environment variables; secret material never lives in the file or in
//! this struct.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "draftline.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "DRAFTLINE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum rewrite-loop bound accepted from configuration.
const MAX_REWRITE_MAX: u32 = 5;
/// Maximum token TTL in hours accepted from configuration.
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 30;
/// Maximum thread length accepted from configuration.
const MAX_THREAD_TWEETS: u32 = 5;
/// Minimum outbound timeout in milliseconds.
const MIN_TIMEOUT_MS: u64 = 1_000;
/// Maximum outbound timeout in milliseconds.
const MAX_TIMEOUT_MS: u64 = 60_000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// File could not be parsed as TOML.
    #[error("config parse error: {0}")]
    Parse(String),
    /// A value failed validation.
    #[error("config invalid value: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// Store settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSettings {
    /// SQLite database path.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

/// Serde default for the store path.
fn default_store_path() -> PathBuf {
    PathBuf::from("draftline.db")
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { path: default_store_path() }
    }
}

/// Language model adapter settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmSettings {
    /// Chat completions base URL.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    /// Model identifier sent with each request.
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Environment variable carrying the API key.
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Serde default for the LLM base URL.
fn default_llm_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

/// Serde default for the model identifier.
fn default_llm_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

/// Serde default for the API key environment variable.
fn default_llm_key_env() -> String {
    "DRAFTLINE_OPENROUTER_API_KEY".to_string()
}

/// Serde default for outbound timeouts.
const fn default_timeout_ms() -> u64 {
    15_000
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key_env: default_llm_key_env(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Pipeline settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineSettings {
    /// Policy-REWRITE loop bound.
    #[serde(default = "default_rewrite_max")]
    pub rewrite_max: u32,
    /// Jaccard ceiling against recent posts.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Action-token and draft lifetime in hours.
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    /// Sliding de-duplication window in days.
    #[serde(default = "default_recent_posts_days")]
    pub recent_posts_days: i64,
    /// Maximum recent posts loaded for de-duplication.
    #[serde(default = "default_recent_posts_limit")]
    pub recent_posts_limit: usize,
    /// Posts fed into style learning.
    #[serde(default = "default_style_input_posts")]
    pub style_input_posts: usize,
    /// Path to the blocked-terms YAML file.
    #[serde(default = "default_blocked_terms_path")]
    pub blocked_terms_path: PathBuf,
}

/// Serde default for the rewrite bound.
const fn default_rewrite_max() -> u32 {
    1
}

/// Serde default for the similarity threshold.
const fn default_similarity_threshold() -> f64 {
    0.6
}

/// Serde default for the token TTL.
const fn default_token_ttl_hours() -> i64 {
    36
}

/// Serde default for the de-duplication window.
const fn default_recent_posts_days() -> i64 {
    14
}

/// Serde default for the recent-posts limit.
const fn default_recent_posts_limit() -> usize {
    200
}

/// Serde default for the style input size.
const fn default_style_input_posts() -> usize {
    30
}

/// Serde default for the blocked-terms path.
fn default_blocked_terms_path() -> PathBuf {
    PathBuf::from("./blocked_terms.yaml")
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            rewrite_max: default_rewrite_max(),
            similarity_threshold: default_similarity_threshold(),
            token_ttl_hours: default_token_ttl_hours(),
            recent_posts_days: default_recent_posts_days(),
            recent_posts_limit: default_recent_posts_limit(),
            style_input_posts: default_style_input_posts(),
            blocked_terms_path: default_blocked_terms_path(),
        }
    }
}

/// Thread policy settings.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThreadSettings {
    /// Master switch for thread output.
    #[serde(default)]
    pub enabled: bool,
    /// Upper bound on tweets per thread.
    #[serde(default = "default_thread_max_tweets")]
    pub max_tweets: u32,
    /// Whether `(i/N)` numbering is applied.
    #[serde(default = "default_true")]
    pub numbering_enabled: bool,
}

/// Serde default for the thread length cap.
const fn default_thread_max_tweets() -> u32 {
    5
}

/// Serde default for enabled booleans.
const fn default_true() -> bool {
    true
}

impl Default for ThreadSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_tweets: default_thread_max_tweets(),
            numbering_enabled: true,
        }
    }
}

/// Publish settings for the downstream social API.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishSettings {
    /// When true, publication synthesizes ids and skips the downstream call.
    #[serde(default = "default_true")]
    pub dry_run: bool,
    /// Social API base URL.
    #[serde(default = "default_social_base_url")]
    pub base_url: String,
    /// Environment variable carrying the bearer token.
    #[serde(default = "default_social_token_env")]
    pub bearer_token_env: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Serde default for the social base URL.
fn default_social_base_url() -> String {
    "https://api.x.com".to_string()
}

/// Serde default for the social token environment variable.
fn default_social_token_env() -> String {
    "DRAFTLINE_X_BEARER_TOKEN".to_string()
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            dry_run: true,
            base_url: default_social_base_url(),
            bearer_token_env: default_social_token_env(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Evidence source settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSettings {
    /// Local git repository scanned for commits.
    #[serde(default = "default_git_repo_path")]
    pub git_repo_path: PathBuf,
    /// Devlog file whose tail is collected.
    #[serde(default = "default_devlog_path")]
    pub devlog_path: PathBuf,
    /// Enables the GitHub commits source.
    #[serde(default)]
    pub enable_github: bool,
    /// GitHub `owner/repo` for the commits source.
    #[serde(default)]
    pub github_repo: String,
    /// Environment variable carrying the GitHub token.
    #[serde(default)]
    pub github_token_env: String,
    /// Enables the RSS source.
    #[serde(default)]
    pub enable_rss: bool,
    /// RSS feed URLs.
    #[serde(default)]
    pub rss_feed_urls: Vec<String>,
    /// Request timeout in milliseconds for HTTP sources.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Serde default for the git repository path.
fn default_git_repo_path() -> PathBuf {
    PathBuf::from(".")
}

/// Serde default for the devlog path.
fn default_devlog_path() -> PathBuf {
    PathBuf::from("devlog.md")
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            git_repo_path: default_git_repo_path(),
            devlog_path: default_devlog_path(),
            enable_github: false,
            github_repo: String::new(),
            github_token_env: String::new(),
            enable_rss: false,
            rss_feed_urls: Vec::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Notification settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifySettings {
    /// Public base URL used to build reviewer action links.
    #[serde(default = "default_base_public_url")]
    pub base_public_url: String,
    /// Enables the email channel.
    #[serde(default)]
    pub email_enabled: bool,
    /// Mail API endpoint (SendGrid-style JSON).
    #[serde(default)]
    pub email_api_url: String,
    /// Environment variable carrying the mail API key.
    #[serde(default)]
    pub email_api_key_env: String,
    /// Sender address.
    #[serde(default)]
    pub email_from: String,
    /// Recipient address.
    #[serde(default)]
    pub email_to: String,
    /// Enables the webhook channel.
    #[serde(default)]
    pub webhook_enabled: bool,
    /// Webhook endpoint receiving the review packet summary.
    #[serde(default)]
    pub webhook_url: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Serde default for the public base URL.
fn default_base_public_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            base_public_url: default_base_public_url(),
            email_enabled: false,
            email_api_url: String::new(),
            email_api_key_env: String::new(),
            email_from: String::new(),
            email_to: String::new(),
            webhook_enabled: false,
            webhook_url: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Full Draftline settings model.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Store settings.
    #[serde(default)]
    pub store: StoreSettings,
    /// Language model settings.
    #[serde(default)]
    pub llm: LlmSettings,
    /// Pipeline settings.
    #[serde(default)]
    pub pipeline: PipelineSettings,
    /// Thread policy settings.
    #[serde(default)]
    pub thread: ThreadSettings,
    /// Publish settings.
    #[serde(default)]
    pub publish: PublishSettings,
    /// Evidence source settings.
    #[serde(default)]
    pub sources: SourceSettings,
    /// Notification settings.
    #[serde(default)]
    pub notify: NotifySettings,
}

impl Settings {
    /// Loads settings from the given path, the `DRAFTLINE_CONFIG` variable,
    /// or `draftline.toml`, then applies environment overrides and validates.
    /// A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable, unparsable, or
    /// fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = path.map_or_else(
            || {
                env::var(CONFIG_ENV_VAR)
                    .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_NAME), PathBuf::from)
            },
            Path::to_path_buf,
        );
        let mut settings = if resolved.exists() {
            let raw = fs::read_to_string(&resolved)
                .map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?;
            if raw.len() > MAX_CONFIG_FILE_SIZE {
                return Err(ConfigError::Invalid(format!(
                    "config file exceeds {MAX_CONFIG_FILE_SIZE} bytes"
                )));
            }
            toml::from_str(&raw).map_err(|err| ConfigError::Parse(err.to_string()))?
        } else {
            Self::default()
        };
        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    /// Applies `DRAFTLINE_*` environment overrides for runtime-tunable keys.
    fn apply_env_overrides(&mut self) {
        if let Some(value) = env_bool("DRAFTLINE_DRY_RUN") {
            self.publish.dry_run = value;
        }
        if let Some(value) = env_parse::<u32>("DRAFTLINE_REWRITE_MAX") {
            self.pipeline.rewrite_max = value;
        }
        if let Some(value) = env_parse::<f64>("DRAFTLINE_SIMILARITY_THRESHOLD") {
            self.pipeline.similarity_threshold = value;
        }
        if let Some(value) = env_parse::<i64>("DRAFTLINE_TOKEN_TTL_HOURS") {
            self.pipeline.token_ttl_hours = value;
        }
        if let Some(value) = env_bool("DRAFTLINE_THREAD_ENABLED") {
            self.thread.enabled = value;
        }
        if let Some(value) = env_parse::<u32>("DRAFTLINE_THREAD_MAX_TWEETS") {
            self.thread.max_tweets = value;
        }
        if let Some(value) = env_bool("DRAFTLINE_THREAD_NUMBERING_ENABLED") {
            self.thread.numbering_enabled = value;
        }
        if let Some(value) = env::var("DRAFTLINE_BLOCKED_TERMS_PATH").ok().filter(|v| !v.is_empty())
        {
            self.pipeline.blocked_terms_path = PathBuf::from(value);
        }
    }

    /// Validates every bounded value, failing closed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.rewrite_max > MAX_REWRITE_MAX {
            return Err(ConfigError::Invalid(format!(
                "rewrite_max {} exceeds {MAX_REWRITE_MAX}",
                self.pipeline.rewrite_max
            )));
        }
        if !(0.0..=1.0).contains(&self.pipeline.similarity_threshold) {
            return Err(ConfigError::Invalid(format!(
                "similarity_threshold {} outside [0, 1]",
                self.pipeline.similarity_threshold
            )));
        }
        if self.pipeline.token_ttl_hours < 1
            || self.pipeline.token_ttl_hours > MAX_TOKEN_TTL_HOURS
        {
            return Err(ConfigError::Invalid(format!(
                "token_ttl_hours {} outside [1, {MAX_TOKEN_TTL_HOURS}]",
                self.pipeline.token_ttl_hours
            )));
        }
        if self.thread.max_tweets < 2 || self.thread.max_tweets > MAX_THREAD_TWEETS {
            return Err(ConfigError::Invalid(format!(
                "thread max_tweets {} outside [2, {MAX_THREAD_TWEETS}]",
                self.thread.max_tweets
            )));
        }
        validate_url("llm.base_url", &self.llm.base_url)?;
        validate_url("publish.base_url", &self.publish.base_url)?;
        for feed in &self.sources.rss_feed_urls {
            validate_url("sources.rss_feed_urls", feed)?;
        }
        if self.notify.email_enabled {
            validate_url("notify.email_api_url", &self.notify.email_api_url)?;
        }
        if self.notify.webhook_enabled {
            validate_url("notify.webhook_url", &self.notify.webhook_url)?;
        }
        for (name, timeout) in [
            ("llm.timeout_ms", self.llm.timeout_ms),
            ("publish.timeout_ms", self.publish.timeout_ms),
            ("sources.timeout_ms", self.sources.timeout_ms),
            ("notify.timeout_ms", self.notify.timeout_ms),
        ] {
            if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&timeout) {
                return Err(ConfigError::Invalid(format!(
                    "{name} {timeout} outside [{MIN_TIMEOUT_MS}, {MAX_TIMEOUT_MS}]"
                )));
            }
        }
        Ok(())
    }

    /// Reads a secret from the environment variable a settings field names.
    /// Empty values count as absent.
    #[must_use]
    pub fn secret_from_env(variable: &str) -> Option<String> {
        if variable.is_empty() {
            return None;
        }
        env::var(variable).ok().filter(|value| !value.is_empty())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates an https/http URL string.
fn validate_url(field: &str, raw: &str) -> Result<(), ConfigError> {
    let url =
        Url::parse(raw).map_err(|err| ConfigError::Invalid(format!("{field}: {err}")))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::Invalid(format!("{field}: unsupported scheme")));
    }
    Ok(())
}

/// Reads a boolean environment override.
fn env_bool(name: &str) -> Option<bool> {
    env::var(name).ok().map(|value| value.trim().eq_ignore_ascii_case("true"))
}

/// Reads a parsed environment override, ignoring malformed values.
fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.trim().parse().ok())
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

    use super::Settings;

    /// Tests defaults validate cleanly.
    #[test]
    fn test_defaults_validate() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.pipeline.rewrite_max, 1);
        assert!((settings.pipeline.similarity_threshold - 0.6).abs() < f64::EPSILON);
        assert_eq!(settings.pipeline.token_ttl_hours, 36);
        assert!(settings.publish.dry_run);
    }

    /// Tests out-of-range values fail closed.
    #[test]
    fn test_invalid_values_fail() {
        let bad_threshold = Settings {
            pipeline: super::PipelineSettings {
                similarity_threshold: 1.5,
                ..super::PipelineSettings::default()
            },
            ..Settings::default()
        };
        assert!(bad_threshold.validate().is_err());

        let bad_rewrites = Settings {
            pipeline: super::PipelineSettings {
                rewrite_max: 99,
                ..super::PipelineSettings::default()
            },
            ..Settings::default()
        };
        assert!(bad_rewrites.validate().is_err());

        let bad_scheme = Settings {
            llm: super::LlmSettings {
                base_url: "ftp://example.test".to_string(),
                ..super::LlmSettings::default()
            },
            ..Settings::default()
        };
        assert!(bad_scheme.validate().is_err());
    }
}

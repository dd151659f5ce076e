// crates/draftline-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Draft Store
// Description: Durable DraftStore backed by SQLite WAL.
// Purpose: Persist runs, drafts, posts, attempts, and tokens with uniqueness contracts.
// Dependencies: draftline-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`DraftStore`] using SQLite. Every
//! multi-row mutation runs inside one transaction; every uniqueness contract
//! from the schema — the `(draft_id, attempt)` publish lease, token hashes,
//! post positions, tweet ids, idempotency keys, and the weekly-report window
//! — surfaces as a typed conflict. Stored JSON is untrusted on load and fails
//! closed on corruption.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use draftline_core::AttemptStatus;
use draftline_core::AuditEvent;
use draftline_core::Draft;
use draftline_core::DraftId;
use draftline_core::DraftStatus;
use draftline_core::DraftStore;
use draftline_core::Post;
use draftline_core::PublishAttempt;
use draftline_core::Run;
use draftline_core::RunId;
use draftline_core::RunStatus;
use draftline_core::StageLog;
use draftline_core::StoreError;
use draftline_core::Timestamp;
use draftline_core::TokenAction;
use draftline_core::WeeklyReport;
use draftline_core::plan::DraftCandidates;
use draftline_core::plan::EditedDraft;
use draftline_core::plan::StyleProfile;
use draftline_core::report::PolicyReport;
use draftline_core::run::truncate_error;
use draftline_core::token::ActionToken;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::Transaction;
use rusqlite::params;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// SQLite schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// SQLite journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to SQLite `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the SQLite pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// SQLite sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to SQLite `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the SQLite pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the SQLite draft store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Database file path.
    pub path: PathBuf,
    /// Journal mode.
    #[serde(default)]
    pub mode: SqliteStoreMode,
    /// Synchronous mode.
    #[serde(default)]
    pub sync: SqliteSyncMode,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

/// Serde default for the busy timeout.
const fn default_busy_timeout() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl SqliteStoreConfig {
    /// Builds a config with defaults for the given path.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mode: SqliteStoreMode::default(),
            sync: SqliteSyncMode::default(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// SQLite store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// SQLite engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or parse failure.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// A uniqueness contract rejected the write.
    #[error("sqlite store conflict: {0}")]
    Conflict(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Conflict(message) => Self::Conflict(message),
        }
    }
}

/// Maps a rusqlite error, turning constraint violations into conflicts.
fn map_db(context: &str, err: &rusqlite::Error) -> SqliteStoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = err
        && failure.code == ErrorCode::ConstraintViolation
    {
        return SqliteStoreError::Conflict(format!("{context}: constraint violation"));
    }
    SqliteStoreError::Db(format!("{context}: {err}"))
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// SQLite-backed draft store with WAL support.
#[derive(Clone)]
pub struct SqliteDraftStore {
    /// Shared SQLite connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteDraftStore {
    /// Opens an SQLite-backed draft store and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self { connection: Arc::new(Mutex::new(connection)) })
    }

    /// Opens an in-memory store, for tests.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when initialization fails.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let mut connection = Connection::open_in_memory()
            .map_err(|err| SqliteStoreError::Db(format!("open in-memory: {err}")))?;
        initialize_schema(&mut connection)?;
        Ok(Self { connection: Arc::new(Mutex::new(connection)) })
    }

    /// Locks the connection, mapping poisoning to a store error.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("connection mutex poisoned".to_string()))
    }
}

// ============================================================================
// SECTION: Connection Setup
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|err| SqliteStoreError::Io(format!("create store directory: {err}")))?;
    }
    Ok(())
}

/// Opens the connection and applies pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(format!("open database: {err}")))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(format!("busy timeout: {err}")))?;
    connection
        .pragma_update(None, "journal_mode", config.mode.pragma_value())
        .map_err(|err| SqliteStoreError::Db(format!("journal_mode: {err}")))?;
    connection
        .pragma_update(None, "synchronous", config.sync.pragma_value())
        .map_err(|err| SqliteStoreError::Db(format!("synchronous: {err}")))?;
    connection
        .pragma_update(None, "foreign_keys", "on")
        .map_err(|err| SqliteStoreError::Db(format!("foreign_keys: {err}")))?;
    Ok(connection)
}

/// Creates the canonical schema idempotently.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection
        .transaction()
        .map_err(|err| SqliteStoreError::Db(format!("schema transaction: {err}")))?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);

         CREATE TABLE IF NOT EXISTS runs (
             run_id TEXT PRIMARY KEY,
             source TEXT NOT NULL,
             status TEXT NOT NULL,
             created_at INTEGER NOT NULL,
             finished_at INTEGER,
             duration_ms INTEGER,
             last_error TEXT
         );

         CREATE TABLE IF NOT EXISTS agent_logs (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             run_id TEXT NOT NULL REFERENCES runs(run_id),
             stage_name TEXT NOT NULL,
             start_ts INTEGER NOT NULL,
             end_ts INTEGER NOT NULL,
             duration_ms INTEGER NOT NULL,
             input_summary TEXT NOT NULL,
             output_summary TEXT NOT NULL,
             errors TEXT,
             warnings_json TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS ix_agent_logs_run_id ON agent_logs(run_id);

         CREATE TABLE IF NOT EXISTS drafts (
             id TEXT PRIMARY KEY,
             run_id TEXT NOT NULL REFERENCES runs(run_id),
             created_at INTEGER NOT NULL,
             expires_at INTEGER NOT NULL,
             status TEXT NOT NULL,
             token_consumed INTEGER NOT NULL DEFAULT 0,
             consumed_at INTEGER,
             thread_enabled INTEGER NOT NULL DEFAULT 0,
             tweets_json TEXT,
             final_text TEXT NOT NULL DEFAULT '',
             materials_json TEXT NOT NULL,
             topic_plan_json TEXT NOT NULL,
             style_profile_json TEXT NOT NULL,
             thread_plan_json TEXT NOT NULL,
             candidates_json TEXT NOT NULL,
             edited_draft_json TEXT NOT NULL,
             policy_report_json TEXT NOT NULL,
             published_tweet_ids_json TEXT,
             approval_idempotency_key TEXT UNIQUE,
             last_error TEXT
         );
         CREATE INDEX IF NOT EXISTS ix_drafts_run_id ON drafts(run_id);
         CREATE INDEX IF NOT EXISTS ix_drafts_status ON drafts(status);
         CREATE INDEX IF NOT EXISTS ix_drafts_created_at ON drafts(created_at);

         CREATE TABLE IF NOT EXISTS posts (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             draft_id TEXT NOT NULL REFERENCES drafts(id),
             position INTEGER NOT NULL,
             tweet_id TEXT NOT NULL UNIQUE,
             content TEXT NOT NULL,
             posted_at INTEGER NOT NULL,
             publish_idempotency_key TEXT NOT NULL UNIQUE
         );
         CREATE INDEX IF NOT EXISTS ix_posts_draft_id ON posts(draft_id);
         CREATE INDEX IF NOT EXISTS ix_posts_posted_at ON posts(posted_at);
         CREATE UNIQUE INDEX IF NOT EXISTS ix_posts_draft_position
             ON posts(draft_id, position);

         CREATE TABLE IF NOT EXISTS publish_attempts (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             draft_id TEXT NOT NULL REFERENCES drafts(id),
             attempt INTEGER NOT NULL,
             owner TEXT,
             status TEXT NOT NULL DEFAULT 'started',
             created_at INTEGER NOT NULL,
             completed_at INTEGER,
             last_error TEXT
         );
         CREATE INDEX IF NOT EXISTS ix_publish_attempts_draft_id
             ON publish_attempts(draft_id);
         CREATE INDEX IF NOT EXISTS ix_publish_attempts_status
             ON publish_attempts(status);
         CREATE UNIQUE INDEX IF NOT EXISTS ix_publish_attempts_draft_attempt
             ON publish_attempts(draft_id, attempt);

         CREATE TABLE IF NOT EXISTS action_tokens (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             draft_id TEXT NOT NULL REFERENCES drafts(id),
             action TEXT NOT NULL,
             token_hash TEXT NOT NULL,
             created_at INTEGER NOT NULL,
             expires_at INTEGER NOT NULL,
             one_time INTEGER NOT NULL DEFAULT 1,
             consumed_at INTEGER,
             CONSTRAINT uq_action_tokens_token_hash UNIQUE (token_hash)
         );
         CREATE INDEX IF NOT EXISTS ix_action_tokens_draft_id
             ON action_tokens(draft_id);
         CREATE INDEX IF NOT EXISTS ix_action_tokens_action
             ON action_tokens(action);
         CREATE INDEX IF NOT EXISTS ix_action_tokens_action_draft
             ON action_tokens(action, draft_id);

         CREATE TABLE IF NOT EXISTS policy_reports (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             draft_id TEXT NOT NULL REFERENCES drafts(id),
             created_at INTEGER NOT NULL,
             action TEXT NOT NULL,
             risk_level TEXT NOT NULL,
             report_json TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS ix_policy_reports_draft_id
             ON policy_reports(draft_id);

         CREATE TABLE IF NOT EXISTS style_profiles (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             created_at INTEGER NOT NULL,
             profile_json TEXT NOT NULL
         );

         CREATE TABLE IF NOT EXISTS weekly_reports (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             week_start INTEGER NOT NULL,
             week_end INTEGER NOT NULL,
             created_at INTEGER NOT NULL,
             report_json TEXT NOT NULL
         );
         CREATE UNIQUE INDEX IF NOT EXISTS ix_weekly_reports_window
             ON weekly_reports(week_start, week_end);

         CREATE TABLE IF NOT EXISTS users (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             username TEXT NOT NULL UNIQUE,
             password_hash TEXT NOT NULL,
             created_at INTEGER NOT NULL
         );

         CREATE TABLE IF NOT EXISTS user_sessions (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             user_id INTEGER NOT NULL REFERENCES users(id),
             session_token_hash TEXT NOT NULL UNIQUE,
             created_at INTEGER NOT NULL,
             expires_at INTEGER NOT NULL
         );

         CREATE TABLE IF NOT EXISTS audit_logs (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             created_at INTEGER NOT NULL,
             actor TEXT NOT NULL,
             action TEXT NOT NULL,
             subject TEXT NOT NULL,
             detail TEXT NOT NULL
         );

         CREATE TABLE IF NOT EXISTS app_config (
             key TEXT PRIMARY KEY,
             value_json TEXT NOT NULL,
             updated_at INTEGER NOT NULL
         );",
    )
    .map_err(|err| SqliteStoreError::Db(format!("create schema: {err}")))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(format!("read schema version: {err}")))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(format!("write schema version: {err}")))?;
        }
        Some(found) if found == SCHEMA_VERSION => {}
        Some(found) => {
            return Err(SqliteStoreError::Invalid(format!(
                "schema version mismatch: found {found}, expected {SCHEMA_VERSION}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(format!("commit schema: {err}")))
}

// ============================================================================
// SECTION: JSON and Label Helpers
// ============================================================================

/// Serializes a value to a JSON column.
fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, SqliteStoreError> {
    serde_json::to_string(value)
        .map_err(|err| SqliteStoreError::Invalid(format!("serialize json: {err}")))
}

/// Parses a JSON column, failing closed on corruption.
fn from_json<T: DeserializeOwned>(raw: &str, what: &str) -> Result<T, SqliteStoreError> {
    serde_json::from_str(raw)
        .map_err(|err| SqliteStoreError::Corrupt(format!("parse {what}: {err}")))
}

/// Parses a stored run status label.
fn parse_run_status(raw: &str) -> Result<RunStatus, SqliteStoreError> {
    match raw {
        "running" => Ok(RunStatus::Running),
        "completed" => Ok(RunStatus::Completed),
        "failed" => Ok(RunStatus::Failed),
        other => Err(SqliteStoreError::Corrupt(format!("unknown run status {other}"))),
    }
}

/// Parses a stored draft status label.
fn parse_draft_status(raw: &str) -> Result<DraftStatus, SqliteStoreError> {
    match raw {
        "pending" => Ok(DraftStatus::Pending),
        "needs_human_attention" => Ok(DraftStatus::NeedsHumanAttention),
        "publishing" => Ok(DraftStatus::Publishing),
        "posted" => Ok(DraftStatus::Posted),
        "dry_run_posted" => Ok(DraftStatus::DryRunPosted),
        "skipped" => Ok(DraftStatus::Skipped),
        "error" => Ok(DraftStatus::Error),
        other => Err(SqliteStoreError::Corrupt(format!("unknown draft status {other}"))),
    }
}

/// Parses a stored attempt status label.
fn parse_attempt_status(raw: &str) -> Result<AttemptStatus, SqliteStoreError> {
    match raw {
        "started" => Ok(AttemptStatus::Started),
        "completed" => Ok(AttemptStatus::Completed),
        "failed" => Ok(AttemptStatus::Failed),
        other => Err(SqliteStoreError::Corrupt(format!("unknown attempt status {other}"))),
    }
}

/// Parses a stored token action label.
fn parse_token_action(raw: &str) -> Result<TokenAction, SqliteStoreError> {
    match raw {
        "view" => Ok(TokenAction::View),
        "edit" => Ok(TokenAction::Edit),
        "approve" => Ok(TokenAction::Approve),
        "skip" => Ok(TokenAction::Skip),
        "regenerate" => Ok(TokenAction::Regenerate),
        other => Err(SqliteStoreError::Corrupt(format!("unknown token action {other}"))),
    }
}

/// Converts a nullable millis column to a timestamp.
fn opt_timestamp(raw: Option<i64>) -> Option<Timestamp> {
    raw.map(Timestamp::from_unix_millis)
}

// ============================================================================
// SECTION: Row Mappers
// ============================================================================

/// Columns selected for a full draft row, in mapper order.
const DRAFT_COLUMNS: &str = "id, run_id, created_at, expires_at, status, token_consumed, \
     consumed_at, thread_enabled, tweets_json, final_text, materials_json, topic_plan_json, \
     style_profile_json, thread_plan_json, candidates_json, edited_draft_json, \
     policy_report_json, published_tweet_ids_json, approval_idempotency_key, last_error";

/// Maps a full draft row.
fn draft_from_row(row: &Row<'_>) -> Result<Draft, SqliteStoreError> {
    let id: String = get(row, 0)?;
    let run_id: String = get(row, 1)?;
    let created_at: i64 = get(row, 2)?;
    let expires_at: i64 = get(row, 3)?;
    let status: String = get(row, 4)?;
    let token_consumed: bool = get(row, 5)?;
    let consumed_at: Option<i64> = get(row, 6)?;
    let thread_enabled: bool = get(row, 7)?;
    let tweets_json: Option<String> = get(row, 8)?;
    let final_text: String = get(row, 9)?;
    let materials_json: String = get(row, 10)?;
    let topic_plan_json: String = get(row, 11)?;
    let style_profile_json: String = get(row, 12)?;
    let thread_plan_json: String = get(row, 13)?;
    let candidates_json: String = get(row, 14)?;
    let edited_draft_json: String = get(row, 15)?;
    let policy_report_json: String = get(row, 16)?;
    let published_json: Option<String> = get(row, 17)?;
    let approval_key: Option<String> = get(row, 18)?;
    let last_error: Option<String> = get(row, 19)?;

    Ok(Draft {
        id: DraftId::new(id),
        run_id: RunId::new(run_id),
        created_at: Timestamp::from_unix_millis(created_at),
        expires_at: Timestamp::from_unix_millis(expires_at),
        status: parse_draft_status(&status)?,
        token_consumed,
        consumed_at: opt_timestamp(consumed_at),
        thread_enabled,
        tweets: tweets_json.as_deref().map(|raw| from_json(raw, "tweets")).transpose()?,
        final_text,
        materials: from_json(&materials_json, "materials")?,
        topic_plan: from_json(&topic_plan_json, "topic plan")?,
        style_profile: from_json(&style_profile_json, "style profile")?,
        thread_plan: from_json(&thread_plan_json, "thread plan")?,
        candidates: from_json(&candidates_json, "candidates")?,
        edited_draft: from_json(&edited_draft_json, "edited draft")?,
        policy_report: from_json(&policy_report_json, "policy report")?,
        published_tweet_ids: published_json
            .as_deref()
            .map(|raw| from_json(raw, "published tweet ids"))
            .transpose()?,
        approval_idempotency_key: approval_key,
        last_error,
    })
}

/// Reads one column, mapping driver errors.
fn get<T: rusqlite::types::FromSql>(row: &Row<'_>, index: usize) -> Result<T, SqliteStoreError> {
    row.get(index).map_err(|err| SqliteStoreError::Db(format!("read column {index}: {err}")))
}

/// Maps an attempt row.
fn attempt_from_row(row: &Row<'_>) -> Result<PublishAttempt, SqliteStoreError> {
    let draft_id: String = get(row, 0)?;
    let attempt: u32 = get(row, 1)?;
    let owner: Option<String> = get(row, 2)?;
    let status: String = get(row, 3)?;
    let created_at: i64 = get(row, 4)?;
    let completed_at: Option<i64> = get(row, 5)?;
    let last_error: Option<String> = get(row, 6)?;
    Ok(PublishAttempt {
        draft_id: DraftId::new(draft_id),
        attempt,
        owner,
        status: parse_attempt_status(&status)?,
        created_at: Timestamp::from_unix_millis(created_at),
        completed_at: opt_timestamp(completed_at),
        last_error,
    })
}

/// Appends a policy report history row inside a transaction.
fn insert_policy_history(
    tx: &Transaction<'_>,
    draft_id: &DraftId,
    report: &PolicyReport,
    created_at: Timestamp,
) -> Result<(), SqliteStoreError> {
    tx.execute(
        "INSERT INTO policy_reports (draft_id, created_at, action, risk_level, report_json)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            draft_id.as_str(),
            created_at.unix_millis(),
            report.action.as_str(),
            report.risk_level.as_str(),
            to_json(report)?,
        ],
    )
    .map_err(|err| map_db("insert policy report", &err))?;
    Ok(())
}

// ============================================================================
// SECTION: DraftStore Implementation
// ============================================================================

impl DraftStore for SqliteDraftStore {
    fn create_run(&self, run: &Run) -> Result<(), StoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT OR IGNORE INTO runs (run_id, source, status, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    run.run_id.as_str(),
                    run.source,
                    run.status.as_str(),
                    run.created_at.unix_millis(),
                ],
            )
            .map_err(|err| map_db("insert run", &err))?;
        Ok(())
    }

    fn get_run(&self, run_id: &RunId) -> Result<Option<Run>, StoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                "SELECT run_id, source, status, created_at, finished_at, duration_ms, last_error
                 FROM runs WHERE run_id = ?1",
                params![run_id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                        row.get::<_, Option<i64>>(5)?,
                        row.get::<_, Option<String>>(6)?,
                    ))
                },
            )
            .optional()
            .map_err(|err| map_db("select run", &err))?;
        let Some((id, source, status, created_at, finished_at, duration_ms, last_error)) = row
        else {
            return Ok(None);
        };
        Ok(Some(Run {
            run_id: RunId::new(id),
            source,
            status: parse_run_status(&status).map_err(StoreError::from)?,
            created_at: Timestamp::from_unix_millis(created_at),
            finished_at: opt_timestamp(finished_at),
            duration_ms,
            last_error,
        }))
    }

    fn finish_run(
        &self,
        run_id: &RunId,
        status: RunStatus,
        finished_at: Timestamp,
        duration_ms: i64,
        last_error: Option<&str>,
    ) -> Result<(), StoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "UPDATE runs SET status = ?2, finished_at = ?3, duration_ms = ?4,
                 last_error = ?5 WHERE run_id = ?1",
                params![
                    run_id.as_str(),
                    status.as_str(),
                    finished_at.unix_millis(),
                    duration_ms,
                    last_error.map(truncate_error),
                ],
            )
            .map_err(|err| map_db("finish run", &err))?;
        Ok(())
    }

    fn replace_stage_logs(&self, run_id: &RunId, logs: &[StageLog]) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let tx = guard
            .transaction()
            .map_err(|err| SqliteStoreError::Db(format!("log transaction: {err}")))?;
        tx.execute("DELETE FROM agent_logs WHERE run_id = ?1", params![run_id.as_str()])
            .map_err(|err| map_db("clear stage logs", &err))?;
        for log in logs {
            tx.execute(
                "INSERT INTO agent_logs (run_id, stage_name, start_ts, end_ts, duration_ms,
                 input_summary, output_summary, errors, warnings_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    run_id.as_str(),
                    log.stage_name,
                    log.start_ts.unix_millis(),
                    log.end_ts.unix_millis(),
                    log.duration_ms,
                    log.input_summary,
                    log.output_summary,
                    log.errors,
                    to_json(&log.warnings)?,
                ],
            )
            .map_err(|err| map_db("insert stage log", &err))?;
        }
        tx.commit().map_err(|err| SqliteStoreError::Db(format!("commit stage logs: {err}")))?;
        Ok(())
    }

    fn stage_logs(&self, run_id: &RunId) -> Result<Vec<StageLog>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT stage_name, start_ts, end_ts, duration_ms, input_summary,
                 output_summary, errors, warnings_json
                 FROM agent_logs WHERE run_id = ?1 ORDER BY id ASC",
            )
            .map_err(|err| map_db("prepare stage logs", &err))?;
        let rows = statement
            .query_map(params![run_id.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, String>(7)?,
                ))
            })
            .map_err(|err| map_db("select stage logs", &err))?;
        let mut logs = Vec::new();
        for row in rows {
            let (stage_name, start_ts, end_ts, duration_ms, input, output, errors, warnings) =
                row.map_err(|err| map_db("read stage log", &err))?;
            logs.push(StageLog {
                stage_name,
                start_ts: Timestamp::from_unix_millis(start_ts),
                end_ts: Timestamp::from_unix_millis(end_ts),
                duration_ms,
                input_summary: input,
                output_summary: output,
                errors,
                warnings: from_json(&warnings, "stage warnings")?,
            });
        }
        Ok(logs)
    }

    fn insert_draft(&self, draft: &Draft) -> Result<bool, StoreError> {
        let mut guard = self.lock()?;
        let tx = guard
            .transaction()
            .map_err(|err| SqliteStoreError::Db(format!("draft transaction: {err}")))?;
        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM drafts WHERE id = ?1",
                params![draft.id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| map_db("check draft", &err))?;
        if exists.is_some() {
            tx.commit()
                .map_err(|err| SqliteStoreError::Db(format!("commit draft check: {err}")))?;
            return Ok(false);
        }
        tx.execute(
            "INSERT INTO drafts (id, run_id, created_at, expires_at, status, token_consumed,
             consumed_at, thread_enabled, tweets_json, final_text, materials_json,
             topic_plan_json, style_profile_json, thread_plan_json, candidates_json,
             edited_draft_json, policy_report_json, published_tweet_ids_json,
             approval_idempotency_key, last_error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
             ?17, ?18, ?19, ?20)",
            params![
                draft.id.as_str(),
                draft.run_id.as_str(),
                draft.created_at.unix_millis(),
                draft.expires_at.unix_millis(),
                draft.status.as_str(),
                draft.token_consumed,
                draft.consumed_at.map(Timestamp::unix_millis),
                draft.thread_enabled,
                draft.tweets.as_ref().map(to_json).transpose()?,
                draft.final_text,
                to_json(&draft.materials)?,
                to_json(&draft.topic_plan)?,
                to_json(&draft.style_profile)?,
                to_json(&draft.thread_plan)?,
                to_json(&draft.candidates)?,
                to_json(&draft.edited_draft)?,
                to_json(&draft.policy_report)?,
                draft.published_tweet_ids.as_ref().map(to_json).transpose()?,
                draft.approval_idempotency_key,
                draft.last_error,
            ],
        )
        .map_err(|err| map_db("insert draft", &err))?;
        insert_policy_history(&tx, &draft.id, &draft.policy_report, draft.created_at)?;
        tx.commit().map_err(|err| SqliteStoreError::Db(format!("commit draft: {err}")))?;
        Ok(true)
    }

    fn get_draft(&self, draft_id: &DraftId) -> Result<Option<Draft>, StoreError> {
        let guard = self.lock()?;
        let sql = format!("SELECT {DRAFT_COLUMNS} FROM drafts WHERE id = ?1");
        let mut statement =
            guard.prepare(&sql).map_err(|err| map_db("prepare draft", &err))?;
        let mut rows =
            statement.query(params![draft_id.as_str()]).map_err(|err| map_db("query draft", &err))?;
        let Some(row) = rows.next().map_err(|err| map_db("read draft", &err))? else {
            return Ok(None);
        };
        Ok(Some(draft_from_row(row)?))
    }

    fn update_draft_texts(
        &self,
        draft_id: &DraftId,
        final_text: &str,
        tweets: Option<&[String]>,
    ) -> Result<(), StoreError> {
        let guard = self.lock()?;
        let changed = guard
            .execute(
                "UPDATE drafts SET final_text = ?2, tweets_json = ?3 WHERE id = ?1",
                params![
                    draft_id.as_str(),
                    final_text,
                    tweets.map(to_json).transpose()?,
                ],
            )
            .map_err(|err| map_db("update draft texts", &err))?;
        if changed == 0 {
            return Err(StoreError::Invalid(format!("unknown draft {draft_id}")));
        }
        Ok(())
    }

    fn update_draft_policy(
        &self,
        draft_id: &DraftId,
        report: &PolicyReport,
        status: DraftStatus,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let tx = guard
            .transaction()
            .map_err(|err| SqliteStoreError::Db(format!("policy transaction: {err}")))?;
        let changed = tx
            .execute(
                "UPDATE drafts SET policy_report_json = ?2, status = ?3 WHERE id = ?1",
                params![draft_id.as_str(), to_json(report)?, status.as_str()],
            )
            .map_err(|err| map_db("update draft policy", &err))?;
        if changed == 0 {
            return Err(StoreError::Invalid(format!("unknown draft {draft_id}")));
        }
        insert_policy_history(&tx, draft_id, report, now)?;
        tx.commit().map_err(|err| SqliteStoreError::Db(format!("commit policy: {err}")))?;
        Ok(())
    }

    fn update_draft_generation(
        &self,
        draft_id: &DraftId,
        candidates: &DraftCandidates,
        edited: &EditedDraft,
        report: &PolicyReport,
        status: DraftStatus,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let tweets = edited.composed_tweets();
        let thread_enabled = edited.mode == draftline_core::DraftMode::Thread;
        let final_text = tweets.first().cloned().unwrap_or_default();
        let mut guard = self.lock()?;
        let tx = guard
            .transaction()
            .map_err(|err| SqliteStoreError::Db(format!("generation transaction: {err}")))?;
        let changed = tx
            .execute(
                "UPDATE drafts SET candidates_json = ?2, edited_draft_json = ?3,
                 policy_report_json = ?4, status = ?5, thread_enabled = ?6, tweets_json = ?7,
                 final_text = ?8 WHERE id = ?1",
                params![
                    draft_id.as_str(),
                    to_json(candidates)?,
                    to_json(edited)?,
                    to_json(report)?,
                    status.as_str(),
                    thread_enabled,
                    thread_enabled.then(|| to_json(&tweets)).transpose()?,
                    final_text,
                ],
            )
            .map_err(|err| map_db("update draft generation", &err))?;
        if changed == 0 {
            return Err(StoreError::Invalid(format!("unknown draft {draft_id}")));
        }
        insert_policy_history(&tx, draft_id, report, now)?;
        tx.commit().map_err(|err| SqliteStoreError::Db(format!("commit generation: {err}")))?;
        Ok(())
    }

    fn mark_draft_skipped(&self, draft_id: &DraftId, now: Timestamp) -> Result<(), StoreError> {
        let guard = self.lock()?;
        let changed = guard
            .execute(
                "UPDATE drafts SET status = 'skipped', token_consumed = 1, consumed_at = ?2
                 WHERE id = ?1",
                params![draft_id.as_str(), now.unix_millis()],
            )
            .map_err(|err| map_db("mark draft skipped", &err))?;
        if changed == 0 {
            return Err(StoreError::Invalid(format!("unknown draft {draft_id}")));
        }
        Ok(())
    }

    fn insert_action_token(&self, token: &ActionToken) -> Result<(), StoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO action_tokens (draft_id, action, token_hash, created_at,
                 expires_at, one_time, consumed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    token.draft_id.as_str(),
                    token.action.as_str(),
                    token.token_hash,
                    token.created_at.unix_millis(),
                    token.expires_at.unix_millis(),
                    token.one_time,
                    token.consumed_at.map(Timestamp::unix_millis),
                ],
            )
            .map_err(|err| map_db("insert action token", &err))?;
        Ok(())
    }

    fn find_action_token(
        &self,
        action: TokenAction,
        token_hash: &str,
    ) -> Result<Option<ActionToken>, StoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                "SELECT draft_id, action, token_hash, created_at, expires_at, one_time,
                 consumed_at FROM action_tokens WHERE action = ?1 AND token_hash = ?2",
                params![action.as_str(), token_hash],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, bool>(5)?,
                        row.get::<_, Option<i64>>(6)?,
                    ))
                },
            )
            .optional()
            .map_err(|err| map_db("select action token", &err))?;
        let Some((draft_id, action_raw, hash, created_at, expires_at, one_time, consumed_at)) =
            row
        else {
            return Ok(None);
        };
        Ok(Some(ActionToken {
            draft_id: DraftId::new(draft_id),
            action: parse_token_action(&action_raw).map_err(StoreError::from)?,
            token_hash: hash,
            created_at: Timestamp::from_unix_millis(created_at),
            expires_at: Timestamp::from_unix_millis(expires_at),
            one_time,
            consumed_at: opt_timestamp(consumed_at),
        }))
    }

    fn consume_action_token(
        &self,
        action: TokenAction,
        token_hash: &str,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "UPDATE action_tokens SET consumed_at = ?3
                 WHERE action = ?1 AND token_hash = ?2 AND consumed_at IS NULL",
                params![action.as_str(), token_hash, now.unix_millis()],
            )
            .map_err(|err| map_db("consume action token", &err))?;
        Ok(())
    }

    fn latest_publish_attempt(
        &self,
        draft_id: &DraftId,
    ) -> Result<Option<PublishAttempt>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT draft_id, attempt, owner, status, created_at, completed_at, last_error
                 FROM publish_attempts WHERE draft_id = ?1 ORDER BY attempt DESC LIMIT 1",
            )
            .map_err(|err| map_db("prepare latest attempt", &err))?;
        let mut rows = statement
            .query(params![draft_id.as_str()])
            .map_err(|err| map_db("query latest attempt", &err))?;
        let Some(row) = rows.next().map_err(|err| map_db("read latest attempt", &err))? else {
            return Ok(None);
        };
        Ok(Some(attempt_from_row(row)?))
    }

    fn begin_publish_attempt(
        &self,
        attempt: &PublishAttempt,
        approve_token_hash: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let tx = guard
            .transaction()
            .map_err(|err| SqliteStoreError::Db(format!("attempt transaction: {err}")))?;
        tx.execute(
            "INSERT INTO publish_attempts (draft_id, attempt, owner, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                attempt.draft_id.as_str(),
                attempt.attempt,
                attempt.owner,
                attempt.status.as_str(),
                attempt.created_at.unix_millis(),
            ],
        )
        .map_err(|err| map_db("insert publish attempt", &err))?;
        let changed = tx
            .execute(
                "UPDATE drafts SET status = 'publishing' WHERE id = ?1",
                params![attempt.draft_id.as_str()],
            )
            .map_err(|err| map_db("mark draft publishing", &err))?;
        if changed == 0 {
            return Err(StoreError::Invalid(format!("unknown draft {}", attempt.draft_id)));
        }
        if let Some(hash) = approve_token_hash {
            tx.execute(
                "UPDATE action_tokens SET consumed_at = ?2
                 WHERE action = 'approve' AND token_hash = ?1 AND consumed_at IS NULL",
                params![hash, attempt.created_at.unix_millis()],
            )
            .map_err(|err| map_db("consume approve token", &err))?;
        }
        tx.commit().map_err(|err| SqliteStoreError::Db(format!("commit attempt: {err}")))?;
        Ok(())
    }

    fn complete_publish_attempt(
        &self,
        draft_id: &DraftId,
        attempt: u32,
        completed_at: Timestamp,
        final_status: DraftStatus,
        published_tweet_ids: &[String],
        approval_idempotency_key: &str,
    ) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let tx = guard
            .transaction()
            .map_err(|err| SqliteStoreError::Db(format!("complete transaction: {err}")))?;
        tx.execute(
            "UPDATE publish_attempts SET status = 'completed', completed_at = ?3
             WHERE draft_id = ?1 AND attempt = ?2",
            params![draft_id.as_str(), attempt, completed_at.unix_millis()],
        )
        .map_err(|err| map_db("complete attempt", &err))?;
        tx.execute(
            "UPDATE drafts SET status = ?2, token_consumed = 1, consumed_at = ?3,
             published_tweet_ids_json = ?4, approval_idempotency_key = ?5, last_error = NULL
             WHERE id = ?1",
            params![
                draft_id.as_str(),
                final_status.as_str(),
                completed_at.unix_millis(),
                to_json(&published_tweet_ids)?,
                approval_idempotency_key,
            ],
        )
        .map_err(|err| map_db("finalize draft", &err))?;
        tx.commit().map_err(|err| SqliteStoreError::Db(format!("commit complete: {err}")))?;
        Ok(())
    }

    fn fail_publish_attempt(
        &self,
        draft_id: &DraftId,
        attempt: u32,
        failed_at: Timestamp,
        error: &str,
    ) -> Result<(), StoreError> {
        let truncated = truncate_error(error);
        let mut guard = self.lock()?;
        let tx = guard
            .transaction()
            .map_err(|err| SqliteStoreError::Db(format!("fail transaction: {err}")))?;
        tx.execute(
            "UPDATE publish_attempts SET status = 'failed', completed_at = ?3, last_error = ?4
             WHERE draft_id = ?1 AND attempt = ?2",
            params![draft_id.as_str(), attempt, failed_at.unix_millis(), truncated],
        )
        .map_err(|err| map_db("fail attempt", &err))?;
        tx.execute(
            "UPDATE drafts SET status = 'error', last_error = ?2 WHERE id = ?1",
            params![draft_id.as_str(), truncated],
        )
        .map_err(|err| map_db("mark draft error", &err))?;
        tx.commit().map_err(|err| SqliteStoreError::Db(format!("commit fail: {err}")))?;
        Ok(())
    }

    fn posts_for_draft(&self, draft_id: &DraftId) -> Result<Vec<Post>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT draft_id, position, tweet_id, content, posted_at,
                 publish_idempotency_key
                 FROM posts WHERE draft_id = ?1 ORDER BY position ASC",
            )
            .map_err(|err| map_db("prepare posts", &err))?;
        let rows = statement
            .query_map(params![draft_id.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(|err| map_db("select posts", &err))?;
        let mut posts = Vec::new();
        for row in rows {
            let (id, position, tweet_id, content, posted_at, key) =
                row.map_err(|err| map_db("read post", &err))?;
            posts.push(Post {
                draft_id: DraftId::new(id),
                position,
                tweet_id,
                content,
                posted_at: Timestamp::from_unix_millis(posted_at),
                publish_idempotency_key: key,
            });
        }
        Ok(posts)
    }

    fn insert_post(&self, post: &Post) -> Result<(), StoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO posts (draft_id, position, tweet_id, content, posted_at,
                 publish_idempotency_key)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    post.draft_id.as_str(),
                    post.position,
                    post.tweet_id,
                    post.content,
                    post.posted_at.unix_millis(),
                    post.publish_idempotency_key,
                ],
            )
            .map_err(|err| map_db("insert post", &err))?;
        Ok(())
    }

    fn recent_posts(&self, since: Timestamp, limit: usize) -> Result<Vec<String>, StoreError> {
        let guard = self.lock()?;
        let limit = i64::try_from(limit)
            .map_err(|_| StoreError::Invalid("recent posts limit too large".to_string()))?;
        let mut statement = guard
            .prepare(
                "SELECT content FROM posts WHERE posted_at > ?1
                 ORDER BY posted_at DESC LIMIT ?2",
            )
            .map_err(|err| map_db("prepare recent posts", &err))?;
        let rows = statement
            .query_map(params![since.unix_millis(), limit], |row| row.get::<_, String>(0))
            .map_err(|err| map_db("select recent posts", &err))?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row.map_err(|err| map_db("read recent post", &err))?);
        }
        Ok(posts)
    }

    fn posts_in_window(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<String>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT content FROM posts WHERE posted_at >= ?1 AND posted_at < ?2
                 ORDER BY posted_at DESC",
            )
            .map_err(|err| map_db("prepare window posts", &err))?;
        let rows = statement
            .query_map(params![start.unix_millis(), end.unix_millis()], |row| {
                row.get::<_, String>(0)
            })
            .map_err(|err| map_db("select window posts", &err))?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row.map_err(|err| map_db("read window post", &err))?);
        }
        Ok(posts)
    }

    fn save_style_profile(
        &self,
        profile: &StyleProfile,
        created_at: Timestamp,
    ) -> Result<(), StoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO style_profiles (created_at, profile_json) VALUES (?1, ?2)",
                params![created_at.unix_millis(), to_json(profile)?],
            )
            .map_err(|err| map_db("insert style profile", &err))?;
        Ok(())
    }

    fn latest_style_profile(&self) -> Result<Option<StyleProfile>, StoreError> {
        let guard = self.lock()?;
        let row: Option<String> = guard
            .query_row(
                "SELECT profile_json FROM style_profiles ORDER BY created_at DESC, id DESC
                 LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| map_db("select style profile", &err))?;
        row.as_deref()
            .map(|raw| from_json(raw, "style profile"))
            .transpose()
            .map_err(StoreError::from)
    }

    fn save_weekly_report(
        &self,
        report: &WeeklyReport,
        created_at: Timestamp,
    ) -> Result<bool, StoreError> {
        let guard = self.lock()?;
        let result = guard.execute(
            "INSERT INTO weekly_reports (week_start, week_end, created_at, report_json)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                report.week_start.unix_millis(),
                report.week_end.unix_millis(),
                created_at.unix_millis(),
                to_json(report)?,
            ],
        );
        match result {
            Ok(_) => Ok(true),
            Err(err) => match map_db("insert weekly report", &err) {
                SqliteStoreError::Conflict(_) => Ok(false),
                other => Err(other.into()),
            },
        }
    }

    fn get_app_config(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let guard = self.lock()?;
        let row: Option<String> = guard
            .query_row(
                "SELECT value_json FROM app_config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| map_db("select app config", &err))?;
        row.as_deref()
            .map(|raw| from_json(raw, "app config"))
            .transpose()
            .map_err(StoreError::from)
    }

    fn set_app_config(
        &self,
        key: &str,
        value: &Value,
        updated_at: Timestamp,
    ) -> Result<(), StoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO app_config (key, value_json, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json,
                 updated_at = excluded.updated_at",
                params![key, to_json(value)?, updated_at.unix_millis()],
            )
            .map_err(|err| map_db("set app config", &err))?;
        Ok(())
    }

    fn append_audit(&self, event: &AuditEvent) -> Result<(), StoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO audit_logs (created_at, actor, action, subject, detail)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    event.created_at.unix_millis(),
                    event.actor,
                    event.action,
                    event.subject,
                    event.detail,
                ],
            )
            .map_err(|err| map_db("insert audit event", &err))?;
        Ok(())
    }
}

// crates/quality-gate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Quality Store
// Description: Durable content/evaluation/rewrite store backed by SQLite WAL.
// Purpose: Persist the data model with storage-enforced immutability rules.
// Dependencies: quality-gate-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! One SQLite database implements all three store traits. The schema's
//! triggers are the canonical enforcement of write-once and partial
//! immutability (see `schema.rs`); this module validates caller contracts,
//! maps constraint failures onto the shared error taxonomy, and keeps every
//! mutation inside a transaction on one mutex-guarded connection. Nothing is
//! retried here: constraint races surface as conflicts for the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use quality_gate_core::Actor;
use quality_gate_core::ActorId;
use quality_gate_core::ActorRole;
use quality_gate_core::AeoRationale;
use quality_gate_core::AeoScore;
use quality_gate_core::ApprovalAttempt;
use quality_gate_core::ApprovalId;
use quality_gate_core::ApprovalState;
use quality_gate_core::AttemptResult;
use quality_gate_core::Blog;
use quality_gate_core::BlogId;
use quality_gate_core::Clock;
use quality_gate_core::ContentSource;
use quality_gate_core::CycleCompletion;
use quality_gate_core::CycleId;
use quality_gate_core::DetectorDetails;
use quality_gate_core::DetectorScore;
use quality_gate_core::Escalation;
use quality_gate_core::EscalationId;
use quality_gate_core::EscalationReason;
use quality_gate_core::EscalationStatus;
use quality_gate_core::EvaluationRun;
use quality_gate_core::HashAlgorithm;
use quality_gate_core::HashDigest;
use quality_gate_core::HumanReviewAction;
use quality_gate_core::ModelConfigSnapshot;
use quality_gate_core::NewActor;
use quality_gate_core::NewApproval;
use quality_gate_core::NewApprovalAttempt;
use quality_gate_core::NewEscalation;
use quality_gate_core::NewEvaluationRun;
use quality_gate_core::NewReviewAction;
use quality_gate_core::NewRewriteCycle;
use quality_gate_core::NewVersion;
use quality_gate_core::ProjectId;
use quality_gate_core::ReviewActionKind;
use quality_gate_core::ReviewState;
use quality_gate_core::ReviewTransition;
use quality_gate_core::RewriteCycle;
use quality_gate_core::RewriteStatus;
use quality_gate_core::RunId;
use quality_gate_core::RunStatus;
use quality_gate_core::ScoreSnapshot;
use quality_gate_core::StopReason;
use quality_gate_core::StoreError;
use quality_gate_core::Timestamp;
use quality_gate_core::TrendOutcome;
use quality_gate_core::Version;
use quality_gate_core::VersionId;
use quality_gate_core::core::hashing::DEFAULT_HASH_ALGORITHM;
use quality_gate_core::core::hashing::hash_bytes;
use quality_gate_core::interfaces::ContentStore;
use quality_gate_core::interfaces::EvaluationStore;
use quality_gate_core::interfaces::RewriteStore;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::Transaction;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

use crate::schema::initialize_schema;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum content size accepted for a version.
pub const MAX_CONTENT_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl JournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` quality store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: JournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SyncMode,
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store open/initialization errors.
///
/// # Invariants
/// - Error messages avoid embedding content bodies.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store configuration.
    #[error("sqlite store invalid config: {0}")]
    Invalid(String),
}

/// Maps a runtime `SQLite` failure onto the shared store error taxonomy.
///
/// Trigger guards raise constraint failures whose message names the guard;
/// those are invariant violations (engine bugs), not retryable conflicts.
fn map_sql_error(error: &rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = error {
        if failure.code == ErrorCode::ConstraintViolation {
            if message.contains("immutability guard") {
                return StoreError::Invariant(message.clone());
            }
            if message.contains("human gate") {
                return StoreError::Forbidden("User is not marked as human".to_string());
            }
            return StoreError::Conflict(message.clone());
        }
        return StoreError::Unavailable(message.clone());
    }
    StoreError::Unavailable(error.to_string())
}

/// Serializes a JSON-typed column value.
fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value)
        .map_err(|err| StoreError::Invariant(format!("json serialization failed: {err}")))
}

/// Deserializes a JSON-typed column value.
fn from_json<T: serde::de::DeserializeOwned>(raw: &str, what: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw)
        .map_err(|err| StoreError::Invariant(format!("stored {what} is unreadable: {err}")))
}

/// Converts a stored rowid into a typed identifier.
fn typed_id<T>(raw: i64, build: fn(u64) -> Option<T>, what: &str) -> Result<T, StoreError> {
    u64::try_from(raw)
        .ok()
        .and_then(build)
        .ok_or_else(|| StoreError::Invariant(format!("invalid stored {what} id: {raw}")))
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed quality store implementing every storage trait.
///
/// # Invariants
/// - All access serializes through one mutex-guarded connection.
/// - Row timestamps come from the injected clock, one reading per operation.
pub struct SqliteQualityStore {
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
    /// Injected clock used to stamp rows.
    clock: Arc<dyn Clock>,
}

impl SqliteQualityStore {
    /// Opens (or creates) the store at the configured path.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on path, pragma, or schema failures.
    pub fn open(
        config: &SqliteStoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
        let mut connection = Connection::open_with_flags(&config.path, flags)
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        apply_pragmas(&connection, config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            clock,
        })
    }

    /// Opens an in-memory store for tests.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on schema failures.
    pub fn open_in_memory(clock: Arc<dyn Clock>) -> Result<Self, SqliteStoreError> {
        let mut connection =
            Connection::open_in_memory().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        connection
            .execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            clock,
        })
    }

    /// Locks the connection, mapping poisoning onto `Unavailable`.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }

    /// Returns the current clock reading as unix milliseconds.
    fn now_millis(&self) -> i64 {
        self.clock.now().as_unix_millis()
    }
}

/// Validates the store path for basic safety.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Creates the parent directory for the database file when missing.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Maps an actor row.
fn actor_from_row(row: &Row<'_>) -> Result<Actor, StoreError> {
    let id: i64 = row.get(0).map_err(|err| map_sql_error(&err))?;
    let email: String = row.get(1).map_err(|err| map_sql_error(&err))?;
    let role: String = row.get(2).map_err(|err| map_sql_error(&err))?;
    let is_human: bool = row.get(3).map_err(|err| map_sql_error(&err))?;
    let created_at: i64 = row.get(4).map_err(|err| map_sql_error(&err))?;
    Ok(Actor {
        id: typed_id(id, ActorId::from_raw, "actor")?,
        email,
        role: ActorRole::parse(&role)
            .ok_or_else(|| StoreError::Invariant(format!("unknown stored role: {role}")))?,
        is_human,
        created_at: Timestamp::from_unix_millis(created_at),
    })
}

/// Maps a blog row.
fn blog_from_row(row: &Row<'_>) -> Result<Blog, StoreError> {
    let id: i64 = row.get(0).map_err(|err| map_sql_error(&err))?;
    let name: String = row.get(1).map_err(|err| map_sql_error(&err))?;
    let created_by: i64 = row.get(2).map_err(|err| map_sql_error(&err))?;
    let created_at: i64 = row.get(3).map_err(|err| map_sql_error(&err))?;
    let project_id: Option<String> = row.get(4).map_err(|err| map_sql_error(&err))?;
    Ok(Blog {
        id: typed_id(id, BlogId::from_raw, "blog")?,
        name,
        created_by: typed_id(created_by, ActorId::from_raw, "actor")?,
        created_at: Timestamp::from_unix_millis(created_at),
        project_id: project_id.map(ProjectId::new),
    })
}

/// Maps a version row.
fn version_from_row(row: &Row<'_>) -> Result<Version, StoreError> {
    let id: i64 = row.get(0).map_err(|err| map_sql_error(&err))?;
    let blog_id: i64 = row.get(1).map_err(|err| map_sql_error(&err))?;
    let parent: Option<i64> = row.get(2).map_err(|err| map_sql_error(&err))?;
    let content: String = row.get(3).map_err(|err| map_sql_error(&err))?;
    let content_hash: String = row.get(4).map_err(|err| map_sql_error(&err))?;
    let version_number: i64 = row.get(6).map_err(|err| map_sql_error(&err))?;
    let source: String = row.get(7).map_err(|err| map_sql_error(&err))?;
    let cycle: Option<i64> = row.get(8).map_err(|err| map_sql_error(&err))?;
    let change_reason: Option<String> = row.get(9).map_err(|err| map_sql_error(&err))?;
    let created_by: i64 = row.get(10).map_err(|err| map_sql_error(&err))?;
    let created_at: i64 = row.get(11).map_err(|err| map_sql_error(&err))?;
    Ok(Version {
        id: typed_id(id, VersionId::from_raw, "version")?,
        blog_id: typed_id(blog_id, BlogId::from_raw, "blog")?,
        parent_version_id: parent
            .map(|raw| typed_id(raw, VersionId::from_raw, "version"))
            .transpose()?,
        content,
        content_hash: HashDigest {
            algorithm: HashAlgorithm::Sha256,
            value: content_hash,
        },
        version_number: u32::try_from(version_number)
            .map_err(|_| StoreError::Invariant(format!("bad version number: {version_number}")))?,
        source: ContentSource::parse(&source)
            .ok_or_else(|| StoreError::Invariant(format!("unknown stored source: {source}")))?,
        source_rewrite_cycle_id: cycle
            .map(|raw| typed_id(raw, CycleId::from_raw, "cycle"))
            .transpose()?,
        change_reason,
        created_by: typed_id(created_by, ActorId::from_raw, "actor")?,
        created_at: Timestamp::from_unix_millis(created_at),
    })
}

/// Maps an evaluation run row.
fn run_from_row(row: &Row<'_>) -> Result<EvaluationRun, StoreError> {
    let id: i64 = row.get(0).map_err(|err| map_sql_error(&err))?;
    let version_id: i64 = row.get(1).map_err(|err| map_sql_error(&err))?;
    let run_at: i64 = row.get(2).map_err(|err| map_sql_error(&err))?;
    let triggered_by: Option<i64> = row.get(3).map_err(|err| map_sql_error(&err))?;
    let model_config: String = row.get(4).map_err(|err| map_sql_error(&err))?;
    let status: String = row.get(5).map_err(|err| map_sql_error(&err))?;
    let completed_at: Option<i64> = row.get(6).map_err(|err| map_sql_error(&err))?;
    Ok(EvaluationRun {
        id: typed_id(id, RunId::from_raw, "run")?,
        blog_version_id: typed_id(version_id, VersionId::from_raw, "version")?,
        run_at: Timestamp::from_unix_millis(run_at),
        triggered_by: triggered_by
            .map(|raw| typed_id(raw, ActorId::from_raw, "actor"))
            .transpose()?,
        model_config: from_json::<ModelConfigSnapshot>(&model_config, "model_config")?,
        status: RunStatus::parse(&status)
            .ok_or_else(|| StoreError::Invariant(format!("unknown stored status: {status}")))?,
        completed_at: completed_at.map(Timestamp::from_unix_millis),
    })
}

/// Maps a rewrite cycle row.
fn cycle_from_row(row: &Row<'_>) -> Result<RewriteCycle, StoreError> {
    let id: i64 = row.get(0).map_err(|err| map_sql_error(&err))?;
    let parent: i64 = row.get(1).map_err(|err| map_sql_error(&err))?;
    let child: Option<i64> = row.get(2).map_err(|err| map_sql_error(&err))?;
    let cycle_number: i64 = row.get(3).map_err(|err| map_sql_error(&err))?;
    let trigger_reasons: String = row.get(4).map_err(|err| map_sql_error(&err))?;
    let trigger_data: String = row.get(5).map_err(|err| map_sql_error(&err))?;
    let rewrite_prompt: String = row.get(6).map_err(|err| map_sql_error(&err))?;
    let parent_scores: Option<String> = row.get(7).map_err(|err| map_sql_error(&err))?;
    let child_scores: Option<String> = row.get(8).map_err(|err| map_sql_error(&err))?;
    let trend: Option<String> = row.get(9).map_err(|err| map_sql_error(&err))?;
    let status: String = row.get(10).map_err(|err| map_sql_error(&err))?;
    let stop_reason: Option<String> = row.get(11).map_err(|err| map_sql_error(&err))?;
    let created_at: i64 = row.get(12).map_err(|err| map_sql_error(&err))?;
    Ok(RewriteCycle {
        id: typed_id(id, CycleId::from_raw, "cycle")?,
        parent_version_id: typed_id(parent, VersionId::from_raw, "version")?,
        child_version_id: child
            .map(|raw| typed_id(raw, VersionId::from_raw, "version"))
            .transpose()?,
        cycle_number: u32::try_from(cycle_number)
            .map_err(|_| StoreError::Invariant(format!("bad cycle number: {cycle_number}")))?,
        trigger_reasons: from_json(&trigger_reasons, "trigger_reasons")?,
        trigger_data: from_json(&trigger_data, "trigger_data")?,
        rewrite_prompt,
        parent_scores: parent_scores
            .as_deref()
            .map(|raw| from_json::<ScoreSnapshot>(raw, "parent_scores"))
            .transpose()?,
        child_scores: child_scores
            .as_deref()
            .map(|raw| from_json::<ScoreSnapshot>(raw, "child_scores"))
            .transpose()?,
        trend_outcome: trend
            .as_deref()
            .map(|label| {
                TrendOutcome::parse(label).ok_or_else(|| {
                    StoreError::Invariant(format!("unknown stored trend: {label}"))
                })
            })
            .transpose()?,
        rewrite_status: RewriteStatus::parse(&status)
            .ok_or_else(|| StoreError::Invariant(format!("unknown stored status: {status}")))?,
        stop_reason: stop_reason
            .as_deref()
            .map(|label| {
                StopReason::parse(label).ok_or_else(|| {
                    StoreError::Invariant(format!("unknown stored stop reason: {label}"))
                })
            })
            .transpose()?,
        created_at: Timestamp::from_unix_millis(created_at),
    })
}

/// Maps an approval row.
fn approval_from_row(row: &Row<'_>) -> Result<ApprovalState, StoreError> {
    let id: i64 = row.get(0).map_err(|err| map_sql_error(&err))?;
    let blog_id: i64 = row.get(1).map_err(|err| map_sql_error(&err))?;
    let version_id: i64 = row.get(2).map_err(|err| map_sql_error(&err))?;
    let approver_id: i64 = row.get(3).map_err(|err| map_sql_error(&err))?;
    let approved_at: i64 = row.get(4).map_err(|err| map_sql_error(&err))?;
    let revoked_at: Option<i64> = row.get(5).map_err(|err| map_sql_error(&err))?;
    let revoked_by: Option<i64> = row.get(6).map_err(|err| map_sql_error(&err))?;
    let revocation_reason: Option<String> = row.get(7).map_err(|err| map_sql_error(&err))?;
    let notes: Option<String> = row.get(8).map_err(|err| map_sql_error(&err))?;
    Ok(ApprovalState {
        id: typed_id(id, ApprovalId::from_raw, "approval")?,
        blog_id: typed_id(blog_id, BlogId::from_raw, "blog")?,
        approved_version_id: typed_id(version_id, VersionId::from_raw, "version")?,
        approver_id: typed_id(approver_id, ActorId::from_raw, "actor")?,
        approved_at: Timestamp::from_unix_millis(approved_at),
        revoked_at: revoked_at.map(Timestamp::from_unix_millis),
        revoked_by: revoked_by
            .map(|raw| typed_id(raw, ActorId::from_raw, "actor"))
            .transpose()?,
        revocation_reason,
        notes,
    })
}

/// Maps an approval attempt row.
fn attempt_from_row(row: &Row<'_>) -> Result<ApprovalAttempt, StoreError> {
    let blog_id: i64 = row.get(1).map_err(|err| map_sql_error(&err))?;
    let attempted_by: i64 = row.get(2).map_err(|err| map_sql_error(&err))?;
    let is_human_snapshot: bool = row.get(3).map_err(|err| map_sql_error(&err))?;
    let result: String = row.get(4).map_err(|err| map_sql_error(&err))?;
    let attempted_at: i64 = row.get(5).map_err(|err| map_sql_error(&err))?;
    let failure_reason: Option<String> = row.get(6).map_err(|err| map_sql_error(&err))?;
    Ok(ApprovalAttempt {
        blog_id: typed_id(blog_id, BlogId::from_raw, "blog")?,
        attempted_by: typed_id(attempted_by, ActorId::from_raw, "actor")?,
        is_human_snapshot,
        result: AttemptResult::parse(&result)
            .ok_or_else(|| StoreError::Invariant(format!("unknown stored result: {result}")))?,
        attempted_at: Timestamp::from_unix_millis(attempted_at),
        failure_reason,
    })
}

/// Maps a review action row.
fn action_from_row(row: &Row<'_>) -> Result<HumanReviewAction, StoreError> {
    let blog_id: i64 = row.get(1).map_err(|err| map_sql_error(&err))?;
    let version_id: i64 = row.get(2).map_err(|err| map_sql_error(&err))?;
    let reviewer_id: i64 = row.get(3).map_err(|err| map_sql_error(&err))?;
    let action: String = row.get(4).map_err(|err| map_sql_error(&err))?;
    let comments: Option<String> = row.get(5).map_err(|err| map_sql_error(&err))?;
    let is_override: bool = row.get(6).map_err(|err| map_sql_error(&err))?;
    let occurred_at: i64 = row.get(7).map_err(|err| map_sql_error(&err))?;
    Ok(HumanReviewAction {
        blog_id: typed_id(blog_id, BlogId::from_raw, "blog")?,
        version_id: typed_id(version_id, VersionId::from_raw, "version")?,
        reviewer_id: typed_id(reviewer_id, ActorId::from_raw, "actor")?,
        action: ReviewActionKind::parse(&action)
            .ok_or_else(|| StoreError::Invariant(format!("unknown stored action: {action}")))?,
        comments,
        is_override,
        occurred_at: Timestamp::from_unix_millis(occurred_at),
    })
}

/// Maps an escalation row.
fn escalation_from_row(row: &Row<'_>) -> Result<Escalation, StoreError> {
    let id: i64 = row.get(0).map_err(|err| map_sql_error(&err))?;
    let blog_id: i64 = row.get(1).map_err(|err| map_sql_error(&err))?;
    let version_id: i64 = row.get(2).map_err(|err| map_sql_error(&err))?;
    let reason: String = row.get(3).map_err(|err| map_sql_error(&err))?;
    let details: String = row.get(4).map_err(|err| map_sql_error(&err))?;
    let status: String = row.get(5).map_err(|err| map_sql_error(&err))?;
    let created_at: i64 = row.get(6).map_err(|err| map_sql_error(&err))?;
    let resolved_at: Option<i64> = row.get(7).map_err(|err| map_sql_error(&err))?;
    let resolved_by: Option<i64> = row.get(8).map_err(|err| map_sql_error(&err))?;
    Ok(Escalation {
        id: typed_id(id, EscalationId::from_raw, "escalation")?,
        blog_id: typed_id(blog_id, BlogId::from_raw, "blog")?,
        version_id: typed_id(version_id, VersionId::from_raw, "version")?,
        reason: EscalationReason::parse(&reason)
            .ok_or_else(|| StoreError::Invariant(format!("unknown stored reason: {reason}")))?,
        details: from_json(&details, "escalation details")?,
        status: EscalationStatus::parse(&status)
            .ok_or_else(|| StoreError::Invariant(format!("unknown stored status: {status}")))?,
        created_at: Timestamp::from_unix_millis(created_at),
        resolved_at: resolved_at.map(Timestamp::from_unix_millis),
        resolved_by: resolved_by
            .map(|raw| typed_id(raw, ActorId::from_raw, "actor"))
            .transpose()?,
    })
}

// ============================================================================
// SECTION: Query Helpers
// ============================================================================

/// Current-approval query shared by reads and the revocation path.
const CURRENT_APPROVAL_SQL: &str = "SELECT id, blog_id, approved_version_id, approver_id, \
                                    approved_at, revoked_at, revoked_by, revocation_reason, \
                                    notes FROM approvals a WHERE a.blog_id = ?1 AND a.revoked_at \
                                    IS NULL AND NOT EXISTS (SELECT 1 FROM approvals r WHERE \
                                    r.blog_id = a.blog_id AND r.approved_version_id = \
                                    a.approved_version_id AND r.revoked_at IS NOT NULL AND r.id \
                                    > a.id) ORDER BY a.approved_at DESC, a.id DESC LIMIT 1";

/// Reads the current approval inside an open transaction.
fn current_approval_tx(
    tx: &Transaction<'_>,
    blog_id: BlogId,
) -> Result<Option<ApprovalState>, StoreError> {
    tx.query_row(CURRENT_APPROVAL_SQL, params![i64_id(blog_id.get())?], |row| {
        Ok(approval_from_row(row))
    })
    .optional()
    .map_err(|err| map_sql_error(&err))?
    .transpose()
}

/// Converts a typed identifier value into an `i64` column value.
fn i64_id(raw: u64) -> Result<i64, StoreError> {
    i64::try_from(raw).map_err(|_| StoreError::Invariant(format!("id out of range: {raw}")))
}

// ============================================================================
// SECTION: Content Store Implementation
// ============================================================================

impl ContentStore for SqliteQualityStore {
    fn create_actor(&self, new: NewActor) -> Result<Actor, StoreError> {
        if new.email.trim().is_empty() {
            return Err(StoreError::Validation("actor email must not be empty".to_string()));
        }
        if new.role == ActorRole::System && new.is_human {
            return Err(StoreError::Validation(
                "system actors cannot be marked human".to_string(),
            ));
        }
        let now = self.now_millis();
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO actors (email, role, is_human, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![new.email, new.role.as_str(), new.is_human, now],
            )
            .map_err(|err| map_sql_error(&err))?;
        let id = guard.last_insert_rowid();
        guard
            .query_row(
                "SELECT id, email, role, is_human, created_at FROM actors WHERE id = ?1",
                params![id],
                |row| Ok(actor_from_row(row)),
            )
            .map_err(|err| map_sql_error(&err))?
    }

    fn get_actor(&self, id: ActorId) -> Result<Option<Actor>, StoreError> {
        let guard = self.lock()?;
        guard
            .query_row(
                "SELECT id, email, role, is_human, created_at FROM actors WHERE id = ?1",
                params![i64_id(id.get())?],
                |row| Ok(actor_from_row(row)),
            )
            .optional()
            .map_err(|err| map_sql_error(&err))?
            .transpose()
    }

    fn set_actor_human(
        &self,
        admin_id: ActorId,
        actor_id: ActorId,
        is_human: bool,
    ) -> Result<Actor, StoreError> {
        let admin = self
            .get_actor(admin_id)?
            .ok_or_else(|| StoreError::NotFound(format!("actor {admin_id}")))?;
        if admin.role != ActorRole::Admin {
            return Err(StoreError::Forbidden(format!(
                "actor {admin_id} is not an admin and cannot toggle is_human"
            )));
        }
        let target = self
            .get_actor(actor_id)?
            .ok_or_else(|| StoreError::NotFound(format!("actor {actor_id}")))?;
        if target.role == ActorRole::System && is_human {
            return Err(StoreError::Validation(
                "system actors cannot be marked human".to_string(),
            ));
        }
        {
            let guard = self.lock()?;
            guard
                .execute(
                    "UPDATE actors SET is_human = ?1 WHERE id = ?2",
                    params![is_human, i64_id(actor_id.get())?],
                )
                .map_err(|err| map_sql_error(&err))?;
        }
        self.get_actor(actor_id)?
            .ok_or_else(|| StoreError::NotFound(format!("actor {actor_id}")))
    }

    fn create_blog(
        &self,
        name: &str,
        created_by: ActorId,
        project_id: Option<ProjectId>,
    ) -> Result<Blog, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::Validation("blog name must not be empty".to_string()));
        }
        let now = self.now_millis();
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO blogs (name, created_by, created_at, project_id) VALUES (?1, ?2, \
                 ?3, ?4)",
                params![
                    name,
                    i64_id(created_by.get())?,
                    now,
                    project_id.as_ref().map(|id| id.as_str().to_string())
                ],
            )
            .map_err(|err| map_sql_error(&err))?;
        let id = guard.last_insert_rowid();
        guard
            .query_row(
                "SELECT id, name, created_by, created_at, project_id FROM blogs WHERE id = ?1",
                params![id],
                |row| Ok(blog_from_row(row)),
            )
            .map_err(|err| map_sql_error(&err))?
    }

    fn get_blog(&self, id: BlogId) -> Result<Option<Blog>, StoreError> {
        let guard = self.lock()?;
        guard
            .query_row(
                "SELECT id, name, created_by, created_at, project_id FROM blogs WHERE id = ?1",
                params![i64_id(id.get())?],
                |row| Ok(blog_from_row(row)),
            )
            .optional()
            .map_err(|err| map_sql_error(&err))?
            .transpose()
    }

    fn append_version(&self, new: NewVersion) -> Result<Version, StoreError> {
        if new.content.len() > MAX_CONTENT_BYTES {
            return Err(StoreError::Validation(format!(
                "content exceeds size limit: {} bytes (max {MAX_CONTENT_BYTES})",
                new.content.len()
            )));
        }
        match (new.source, new.source_rewrite_cycle_id) {
            (ContentSource::AiRewrite, None) => {
                return Err(StoreError::Validation(
                    "ai_rewrite versions require a source rewrite cycle".to_string(),
                ));
            }
            (ContentSource::HumanPaste | ContentSource::HumanEdit, Some(_)) => {
                return Err(StoreError::Validation(
                    "only ai_rewrite versions may reference a rewrite cycle".to_string(),
                ));
            }
            _ => {}
        }
        let now = self.now_millis();
        let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, new.content.as_bytes());

        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| map_sql_error(&err))?;

        let blog_exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM blogs WHERE id = ?1",
                params![i64_id(new.blog_id.get())?],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| map_sql_error(&err))?;
        if blog_exists.is_none() {
            return Err(StoreError::NotFound(format!("blog {}", new.blog_id)));
        }

        let version_number: i64 = tx
            .query_row(
                "SELECT COALESCE(MAX(version_number), 0) + 1 FROM versions WHERE blog_id = ?1",
                params![i64_id(new.blog_id.get())?],
                |row| row.get(0),
            )
            .map_err(|err| map_sql_error(&err))?;

        match new.parent_version_id {
            None if version_number > 1 => {
                return Err(StoreError::Validation(
                    "only the root version may omit a parent".to_string(),
                ));
            }
            Some(_) if version_number == 1 => {
                return Err(StoreError::Validation(
                    "the root version cannot have a parent".to_string(),
                ));
            }
            Some(parent_id) => {
                let parent_blog: Option<i64> = tx
                    .query_row(
                        "SELECT blog_id FROM versions WHERE id = ?1",
                        params![i64_id(parent_id.get())?],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(|err| map_sql_error(&err))?;
                let Some(parent_blog) = parent_blog else {
                    return Err(StoreError::NotFound(format!("version {parent_id}")));
                };
                if parent_blog != i64_id(new.blog_id.get())? {
                    return Err(StoreError::Validation(format!(
                        "parent version {parent_id} belongs to a different blog"
                    )));
                }
            }
            None => {}
        }

        tx.execute(
            "INSERT INTO versions (blog_id, parent_version_id, content, content_hash, \
             hash_algorithm, version_number, source, source_rewrite_cycle_id, change_reason, \
             created_by, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                i64_id(new.blog_id.get())?,
                new.parent_version_id.map(|id| i64_id(id.get())).transpose()?,
                new.content,
                digest.value,
                digest.algorithm.label(),
                version_number,
                new.source.as_str(),
                new.source_rewrite_cycle_id.map(|id| i64_id(id.get())).transpose()?,
                new.change_reason,
                i64_id(new.created_by.get())?,
                now
            ],
        )
        .map_err(|err| map_sql_error(&err))?;
        let id = tx.last_insert_rowid();
        let version = tx
            .query_row(
                "SELECT id, blog_id, parent_version_id, content, content_hash, hash_algorithm, \
                 version_number, source, source_rewrite_cycle_id, change_reason, created_by, \
                 created_at FROM versions WHERE id = ?1",
                params![id],
                |row| Ok(version_from_row(row)),
            )
            .map_err(|err| map_sql_error(&err))??;
        tx.commit().map_err(|err| map_sql_error(&err))?;
        Ok(version)
    }

    fn get_version(&self, id: VersionId) -> Result<Option<Version>, StoreError> {
        let guard = self.lock()?;
        guard
            .query_row(
                "SELECT id, blog_id, parent_version_id, content, content_hash, hash_algorithm, \
                 version_number, source, source_rewrite_cycle_id, change_reason, created_by, \
                 created_at FROM versions WHERE id = ?1",
                params![i64_id(id.get())?],
                |row| Ok(version_from_row(row)),
            )
            .optional()
            .map_err(|err| map_sql_error(&err))?
            .transpose()
    }

    fn list_versions(&self, blog_id: BlogId) -> Result<Vec<Version>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT id, blog_id, parent_version_id, content, content_hash, hash_algorithm, \
                 version_number, source, source_rewrite_cycle_id, change_reason, created_by, \
                 created_at FROM versions WHERE blog_id = ?1 ORDER BY version_number ASC, \
                 created_at ASC",
            )
            .map_err(|err| map_sql_error(&err))?;
        let rows = statement
            .query_map(params![i64_id(blog_id.get())?], |row| Ok(version_from_row(row)))
            .map_err(|err| map_sql_error(&err))?;
        let mut versions = Vec::new();
        for row in rows {
            versions.push(row.map_err(|err| map_sql_error(&err))??);
        }
        Ok(versions)
    }

    fn record_approval(&self, new: NewApproval) -> Result<ApprovalState, StoreError> {
        let now = self.now_millis();
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| map_sql_error(&err))?;

        let approver: Option<(String, bool)> = tx
            .query_row(
                "SELECT role, is_human FROM actors WHERE id = ?1",
                params![i64_id(new.approver_id.get())?],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|err| map_sql_error(&err))?;
        let Some((_, is_human)) = approver else {
            return Err(StoreError::NotFound(format!("actor {}", new.approver_id)));
        };
        if !is_human {
            return Err(StoreError::Forbidden("User is not marked as human".to_string()));
        }

        let belongs: Option<i64> = tx
            .query_row(
                "SELECT id FROM versions WHERE id = ?1 AND blog_id = ?2",
                params![i64_id(new.approved_version_id.get())?, i64_id(new.blog_id.get())?],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| map_sql_error(&err))?;
        if belongs.is_none() {
            return Err(StoreError::Validation(format!(
                "version {} does not belong to blog {}",
                new.approved_version_id, new.blog_id
            )));
        }

        if let Some(current) = current_approval_tx(&tx, new.blog_id)?
            && current.approved_version_id == new.approved_version_id
            && current.approver_id == new.approver_id
        {
            // Idempotent repeat of the same logical approval.
            tx.commit().map_err(|err| map_sql_error(&err))?;
            return Ok(current);
        }

        tx.execute(
            "INSERT INTO approvals (blog_id, approved_version_id, approver_id, approved_at, \
             notes) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                i64_id(new.blog_id.get())?,
                i64_id(new.approved_version_id.get())?,
                i64_id(new.approver_id.get())?,
                now,
                new.notes
            ],
        )
        .map_err(|err| map_sql_error(&err))?;
        let id = tx.last_insert_rowid();
        let approval = tx
            .query_row(
                "SELECT id, blog_id, approved_version_id, approver_id, approved_at, revoked_at, \
                 revoked_by, revocation_reason, notes FROM approvals WHERE id = ?1",
                params![id],
                |row| Ok(approval_from_row(row)),
            )
            .map_err(|err| map_sql_error(&err))??;
        tx.commit().map_err(|err| map_sql_error(&err))?;
        Ok(approval)
    }

    fn revoke_approval(
        &self,
        blog_id: BlogId,
        revoked_by: ActorId,
        reason: &str,
    ) -> Result<ApprovalState, StoreError> {
        let now = self.now_millis();
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| map_sql_error(&err))?;
        let Some(current) = current_approval_tx(&tx, blog_id)? else {
            return Err(StoreError::Validation(format!(
                "blog {blog_id} has no current approval to revoke"
            )));
        };
        tx.execute(
            "INSERT INTO approvals (blog_id, approved_version_id, approver_id, approved_at, \
             revoked_at, revoked_by, revocation_reason) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                i64_id(blog_id.get())?,
                i64_id(current.approved_version_id.get())?,
                i64_id(revoked_by.get())?,
                now,
                now,
                i64_id(revoked_by.get())?,
                reason
            ],
        )
        .map_err(|err| map_sql_error(&err))?;
        let id = tx.last_insert_rowid();
        let revocation = tx
            .query_row(
                "SELECT id, blog_id, approved_version_id, approver_id, approved_at, revoked_at, \
                 revoked_by, revocation_reason, notes FROM approvals WHERE id = ?1",
                params![id],
                |row| Ok(approval_from_row(row)),
            )
            .map_err(|err| map_sql_error(&err))??;
        tx.commit().map_err(|err| map_sql_error(&err))?;
        Ok(revocation)
    }

    fn current_approval(&self, blog_id: BlogId) -> Result<Option<ApprovalState>, StoreError> {
        let guard = self.lock()?;
        guard
            .query_row(CURRENT_APPROVAL_SQL, params![i64_id(blog_id.get())?], |row| {
                Ok(approval_from_row(row))
            })
            .optional()
            .map_err(|err| map_sql_error(&err))?
            .transpose()
    }

    fn log_attempt(&self, new: NewApprovalAttempt) -> Result<ApprovalAttempt, StoreError> {
        let now = self.now_millis();
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO approval_attempts (blog_id, attempted_by, is_human_snapshot, \
                 result, attempted_at, failure_reason) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    i64_id(new.blog_id.get())?,
                    i64_id(new.attempted_by.get())?,
                    new.is_human_snapshot,
                    new.result.as_str(),
                    now,
                    new.failure_reason
                ],
            )
            .map_err(|err| map_sql_error(&err))?;
        let id = guard.last_insert_rowid();
        guard
            .query_row(
                "SELECT id, blog_id, attempted_by, is_human_snapshot, result, attempted_at, \
                 failure_reason FROM approval_attempts WHERE id = ?1",
                params![id],
                |row| Ok(attempt_from_row(row)),
            )
            .map_err(|err| map_sql_error(&err))?
    }

    fn list_attempts(&self, blog_id: BlogId) -> Result<Vec<ApprovalAttempt>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT id, blog_id, attempted_by, is_human_snapshot, result, attempted_at, \
                 failure_reason FROM approval_attempts WHERE blog_id = ?1 ORDER BY id ASC",
            )
            .map_err(|err| map_sql_error(&err))?;
        let rows = statement
            .query_map(params![i64_id(blog_id.get())?], |row| Ok(attempt_from_row(row)))
            .map_err(|err| map_sql_error(&err))?;
        let mut attempts = Vec::new();
        for row in rows {
            attempts.push(row.map_err(|err| map_sql_error(&err))??);
        }
        Ok(attempts)
    }

    fn log_review_action(&self, new: NewReviewAction) -> Result<HumanReviewAction, StoreError> {
        let now = self.now_millis();
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO review_actions (blog_id, version_id, reviewer_id, action, \
                 comments, is_override, occurred_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    i64_id(new.blog_id.get())?,
                    i64_id(new.version_id.get())?,
                    i64_id(new.reviewer_id.get())?,
                    new.action.as_str(),
                    new.comments,
                    new.is_override,
                    now
                ],
            )
            .map_err(|err| map_sql_error(&err))?;
        let id = guard.last_insert_rowid();
        guard
            .query_row(
                "SELECT id, blog_id, version_id, reviewer_id, action, comments, is_override, \
                 occurred_at FROM review_actions WHERE id = ?1",
                params![id],
                |row| Ok(action_from_row(row)),
            )
            .map_err(|err| map_sql_error(&err))?
    }

    fn record_transition(
        &self,
        version_id: VersionId,
        from_state: ReviewState,
        to_state: ReviewState,
        actor_id: ActorId,
    ) -> Result<ReviewTransition, StoreError> {
        if !from_state.can_transition(to_state) {
            return Err(StoreError::Validation(format!(
                "transition {} -> {} is not permitted",
                from_state.as_str(),
                to_state.as_str()
            )));
        }
        let now = self.now_millis();
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| map_sql_error(&err))?;
        let version_exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM versions WHERE id = ?1",
                params![i64_id(version_id.get())?],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| map_sql_error(&err))?;
        if version_exists.is_none() {
            return Err(StoreError::NotFound(format!("version {version_id}")));
        }
        let current: Option<String> = tx
            .query_row(
                "SELECT to_state FROM review_transitions WHERE version_id = ?1 ORDER BY id DESC \
                 LIMIT 1",
                params![i64_id(version_id.get())?],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| map_sql_error(&err))?;
        let current_state = current
            .as_deref()
            .map_or(Some(ReviewState::Draft), ReviewState::parse)
            .ok_or_else(|| StoreError::Invariant("unknown stored review state".to_string()))?;
        if current_state != from_state {
            return Err(StoreError::Conflict(format!(
                "version {version_id} is {} (expected {})",
                current_state.as_str(),
                from_state.as_str()
            )));
        }
        tx.execute(
            "INSERT INTO review_transitions (version_id, from_state, to_state, actor_id, \
             occurred_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                i64_id(version_id.get())?,
                from_state.as_str(),
                to_state.as_str(),
                i64_id(actor_id.get())?,
                now
            ],
        )
        .map_err(|err| map_sql_error(&err))?;
        tx.commit().map_err(|err| map_sql_error(&err))?;
        Ok(ReviewTransition {
            version_id,
            from_state,
            to_state,
            actor_id,
            occurred_at: Timestamp::from_unix_millis(now),
        })
    }

    fn current_review_state(&self, version_id: VersionId) -> Result<ReviewState, StoreError> {
        let guard = self.lock()?;
        let current: Option<String> = guard
            .query_row(
                "SELECT to_state FROM review_transitions WHERE version_id = ?1 ORDER BY id DESC \
                 LIMIT 1",
                params![i64_id(version_id.get())?],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| map_sql_error(&err))?;
        current
            .as_deref()
            .map_or(Some(ReviewState::Draft), ReviewState::parse)
            .ok_or_else(|| StoreError::Invariant("unknown stored review state".to_string()))
    }

    fn review_started_at(&self, version_id: VersionId) -> Result<Option<Timestamp>, StoreError> {
        let guard = self.lock()?;
        let started: Option<i64> = guard
            .query_row(
                "SELECT occurred_at FROM review_transitions WHERE version_id = ?1 AND to_state \
                 = 'in_review' ORDER BY id DESC LIMIT 1",
                params![i64_id(version_id.get())?],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| map_sql_error(&err))?;
        Ok(started.map(Timestamp::from_unix_millis))
    }

    fn count_review_cycles(&self, blog_id: BlogId) -> Result<u64, StoreError> {
        let guard = self.lock()?;
        let count: i64 = guard
            .query_row(
                "SELECT COUNT(1) FROM review_actions WHERE blog_id = ?1 AND action = \
                 'submit_for_review'",
                params![i64_id(blog_id.get())?],
                |row| row.get(0),
            )
            .map_err(|err| map_sql_error(&err))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn count_rejections_since(
        &self,
        reviewer_id: ActorId,
        since: Timestamp,
    ) -> Result<u64, StoreError> {
        let guard = self.lock()?;
        let count: i64 = guard
            .query_row(
                "SELECT COUNT(1) FROM review_actions WHERE reviewer_id = ?1 AND action = \
                 'reject' AND occurred_at >= ?2",
                params![i64_id(reviewer_id.get())?, since.as_unix_millis()],
                |row| row.get(0),
            )
            .map_err(|err| map_sql_error(&err))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn count_fast_approvals_since(
        &self,
        reviewer_id: ActorId,
        since: Timestamp,
    ) -> Result<u64, StoreError> {
        let guard = self.lock()?;
        let count: i64 = guard
            .query_row(
                "SELECT COUNT(1) FROM review_actions WHERE reviewer_id = ?1 AND action = \
                 'fast_approval_flag' AND occurred_at >= ?2",
                params![i64_id(reviewer_id.get())?, since.as_unix_millis()],
                |row| row.get(0),
            )
            .map_err(|err| map_sql_error(&err))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn stale_reviews(&self, cutoff: Timestamp) -> Result<Vec<VersionId>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT rt.version_id, rt.to_state, rt.occurred_at FROM review_transitions rt \
                 WHERE rt.id = (SELECT MAX(id) FROM review_transitions WHERE version_id = \
                 rt.version_id) ORDER BY rt.version_id ASC",
            )
            .map_err(|err| map_sql_error(&err))?;
        let rows = statement
            .query_map(params![], |row| {
                let version_id: i64 = row.get(0)?;
                let to_state: String = row.get(1)?;
                let occurred_at: i64 = row.get(2)?;
                Ok((version_id, to_state, occurred_at))
            })
            .map_err(|err| map_sql_error(&err))?;
        let mut stale = Vec::new();
        for row in rows {
            let (version_id, to_state, occurred_at) = row.map_err(|err| map_sql_error(&err))?;
            if to_state == ReviewState::InReview.as_str()
                && occurred_at <= cutoff.as_unix_millis()
            {
                stale.push(typed_id(version_id, VersionId::from_raw, "version")?);
            }
        }
        Ok(stale)
    }

    fn open_escalation(&self, new: NewEscalation) -> Result<Escalation, StoreError> {
        let now = self.now_millis();
        let details = to_json(&new.details)?;
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO escalations (blog_id, version_id, reason, details, status, \
                 created_at) VALUES (?1, ?2, ?3, ?4, 'pending_review', ?5)",
                params![
                    i64_id(new.blog_id.get())?,
                    i64_id(new.version_id.get())?,
                    new.reason.as_str(),
                    details,
                    now
                ],
            )
            .map_err(|err| map_sql_error(&err))?;
        let id = guard.last_insert_rowid();
        guard
            .query_row(
                "SELECT id, blog_id, version_id, reason, details, status, created_at, \
                 resolved_at, resolved_by FROM escalations WHERE id = ?1",
                params![id],
                |row| Ok(escalation_from_row(row)),
            )
            .map_err(|err| map_sql_error(&err))?
    }

    fn resolve_escalation(
        &self,
        id: EscalationId,
        resolved_by: ActorId,
        status: EscalationStatus,
    ) -> Result<Escalation, StoreError> {
        if status == EscalationStatus::PendingReview {
            return Err(StoreError::Validation(
                "escalations cannot be resolved back to pending_review".to_string(),
            ));
        }
        let now = self.now_millis();
        let guard = self.lock()?;
        let changed = guard
            .execute(
                "UPDATE escalations SET status = ?1, resolved_at = ?2, resolved_by = ?3 WHERE \
                 id = ?4 AND status = 'pending_review'",
                params![status.as_str(), now, i64_id(resolved_by.get())?, i64_id(id.get())?],
            )
            .map_err(|err| map_sql_error(&err))?;
        if changed == 0 {
            return Err(StoreError::Validation(format!(
                "escalation {id} is unknown or already closed"
            )));
        }
        guard
            .query_row(
                "SELECT id, blog_id, version_id, reason, details, status, created_at, \
                 resolved_at, resolved_by FROM escalations WHERE id = ?1",
                params![i64_id(id.get())?],
                |row| Ok(escalation_from_row(row)),
            )
            .map_err(|err| map_sql_error(&err))?
    }

    fn is_escalated(&self, blog_id: BlogId) -> Result<bool, StoreError> {
        let guard = self.lock()?;
        let count: i64 = guard
            .query_row(
                "SELECT COUNT(1) FROM escalations WHERE blog_id = ?1 AND status = \
                 'pending_review'",
                params![i64_id(blog_id.get())?],
                |row| row.get(0),
            )
            .map_err(|err| map_sql_error(&err))?;
        Ok(count > 0)
    }

    fn list_escalations(&self, blog_id: BlogId) -> Result<Vec<Escalation>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT id, blog_id, version_id, reason, details, status, created_at, \
                 resolved_at, resolved_by FROM escalations WHERE blog_id = ?1 ORDER BY id ASC",
            )
            .map_err(|err| map_sql_error(&err))?;
        let rows = statement
            .query_map(params![i64_id(blog_id.get())?], |row| Ok(escalation_from_row(row)))
            .map_err(|err| map_sql_error(&err))?;
        let mut escalations = Vec::new();
        for row in rows {
            escalations.push(row.map_err(|err| map_sql_error(&err))??);
        }
        Ok(escalations)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        let guard = self.lock()?;
        guard
            .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| {
                row.get::<_, i64>(0)
            })
            .map_err(|err| map_sql_error(&err))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Evaluation Store Implementation
// ============================================================================

impl EvaluationStore for SqliteQualityStore {
    fn insert_run(&self, new: NewEvaluationRun) -> Result<EvaluationRun, StoreError> {
        let now = self.now_millis();
        let model_config = to_json(&new.model_config)?;
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO evaluation_runs (blog_version_id, run_at, triggered_by, \
                 model_config, status) VALUES (?1, ?2, ?3, ?4, 'processing')",
                params![
                    i64_id(new.blog_version_id.get())?,
                    now,
                    new.triggered_by.map(|id| i64_id(id.get())).transpose()?,
                    model_config
                ],
            )
            .map_err(|err| map_sql_error(&err))?;
        let id = guard.last_insert_rowid();
        guard
            .query_row(
                "SELECT id, blog_version_id, run_at, triggered_by, model_config, status, \
                 completed_at FROM evaluation_runs WHERE id = ?1",
                params![id],
                |row| Ok(run_from_row(row)),
            )
            .map_err(|err| map_sql_error(&err))?
    }

    fn get_run(&self, id: RunId) -> Result<Option<EvaluationRun>, StoreError> {
        let guard = self.lock()?;
        guard
            .query_row(
                "SELECT id, blog_version_id, run_at, triggered_by, model_config, status, \
                 completed_at FROM evaluation_runs WHERE id = ?1",
                params![i64_id(id.get())?],
                |row| Ok(run_from_row(row)),
            )
            .optional()
            .map_err(|err| map_sql_error(&err))?
            .transpose()
    }

    fn processing_run_for_version(
        &self,
        version_id: VersionId,
    ) -> Result<Option<EvaluationRun>, StoreError> {
        let guard = self.lock()?;
        guard
            .query_row(
                "SELECT id, blog_version_id, run_at, triggered_by, model_config, status, \
                 completed_at FROM evaluation_runs WHERE blog_version_id = ?1 AND status = \
                 'processing' ORDER BY run_at DESC, id DESC LIMIT 1",
                params![i64_id(version_id.get())?],
                |row| Ok(run_from_row(row)),
            )
            .optional()
            .map_err(|err| map_sql_error(&err))?
            .transpose()
    }

    fn finalize_run(
        &self,
        id: RunId,
        status: RunStatus,
        completed_at: Timestamp,
    ) -> Result<EvaluationRun, StoreError> {
        if !status.is_finished() {
            return Err(StoreError::Validation(
                "runs can only be finalized to a finished status".to_string(),
            ));
        }
        let guard = self.lock()?;
        let changed = guard
            .execute(
                "UPDATE evaluation_runs SET status = ?1, completed_at = ?2 WHERE id = ?3 AND \
                 status = 'processing'",
                params![status.as_str(), completed_at.as_unix_millis(), i64_id(id.get())?],
            )
            .map_err(|err| map_sql_error(&err))?;
        if changed == 0 {
            return Err(StoreError::Conflict(format!(
                "run {id} is unknown or already finalized"
            )));
        }
        guard
            .query_row(
                "SELECT id, blog_version_id, run_at, triggered_by, model_config, status, \
                 completed_at FROM evaluation_runs WHERE id = ?1",
                params![i64_id(id.get())?],
                |row| Ok(run_from_row(row)),
            )
            .map_err(|err| map_sql_error(&err))?
    }

    fn insert_detector_score(&self, score: DetectorScore) -> Result<(), StoreError> {
        if !(0.0..=100.0).contains(&score.score) {
            return Err(StoreError::Validation(format!(
                "detector score out of range: {}",
                score.score
            )));
        }
        let details = to_json(&score.details)?;
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO detector_scores (run_id, provider, score, details) VALUES (?1, \
                 ?2, ?3, ?4)",
                params![i64_id(score.run_id.get())?, score.provider, score.score, details],
            )
            .map_err(|err| map_sql_error(&err))?;
        Ok(())
    }

    fn detector_score(
        &self,
        run_id: RunId,
        provider: &str,
    ) -> Result<Option<DetectorScore>, StoreError> {
        let guard = self.lock()?;
        let row: Option<(String, f64, String)> = guard
            .query_row(
                "SELECT provider, score, details FROM detector_scores WHERE run_id = ?1 AND \
                 provider = ?2",
                params![i64_id(run_id.get())?, provider],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|err| map_sql_error(&err))?;
        row.map(|(provider, score, details)| {
            Ok(DetectorScore {
                run_id,
                provider,
                score,
                details: from_json::<DetectorDetails>(&details, "detector details")?,
            })
        })
        .transpose()
    }

    fn list_detector_scores(&self, run_id: RunId) -> Result<Vec<DetectorScore>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT provider, score, details FROM detector_scores WHERE run_id = ?1 ORDER \
                 BY provider ASC",
            )
            .map_err(|err| map_sql_error(&err))?;
        let rows = statement
            .query_map(params![i64_id(run_id.get())?], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?, row.get::<_, String>(2)?))
            })
            .map_err(|err| map_sql_error(&err))?;
        let mut scores = Vec::new();
        for row in rows {
            let (provider, score, details) = row.map_err(|err| map_sql_error(&err))?;
            scores.push(DetectorScore {
                run_id,
                provider,
                score,
                details: from_json::<DetectorDetails>(&details, "detector details")?,
            });
        }
        Ok(scores)
    }

    fn insert_aeo_score(&self, score: AeoScore) -> Result<(), StoreError> {
        if !(0.0..=100.0).contains(&score.score) {
            return Err(StoreError::Validation(format!(
                "aeo score out of range: {}",
                score.score
            )));
        }
        let rationale = to_json(&score.rationale)?;
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO aeo_scores (run_id, query_intent, score, rationale) VALUES (?1, \
                 ?2, ?3, ?4)",
                params![i64_id(score.run_id.get())?, score.query_intent, score.score, rationale],
            )
            .map_err(|err| map_sql_error(&err))?;
        Ok(())
    }

    fn aeo_score(
        &self,
        run_id: RunId,
        query_intent: &str,
    ) -> Result<Option<AeoScore>, StoreError> {
        let guard = self.lock()?;
        let row: Option<(String, f64, String)> = guard
            .query_row(
                "SELECT query_intent, score, rationale FROM aeo_scores WHERE run_id = ?1 AND \
                 query_intent = ?2",
                params![i64_id(run_id.get())?, query_intent],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|err| map_sql_error(&err))?;
        row.map(|(query_intent, score, rationale)| {
            Ok(AeoScore {
                run_id,
                query_intent,
                score,
                rationale: from_json::<AeoRationale>(&rationale, "aeo rationale")?,
            })
        })
        .transpose()
    }

    fn list_aeo_scores(&self, run_id: RunId) -> Result<Vec<AeoScore>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT query_intent, score, rationale FROM aeo_scores WHERE run_id = ?1 ORDER \
                 BY query_intent ASC",
            )
            .map_err(|err| map_sql_error(&err))?;
        let rows = statement
            .query_map(params![i64_id(run_id.get())?], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?, row.get::<_, String>(2)?))
            })
            .map_err(|err| map_sql_error(&err))?;
        let mut scores = Vec::new();
        for row in rows {
            let (query_intent, score, rationale) = row.map_err(|err| map_sql_error(&err))?;
            scores.push(AeoScore {
                run_id,
                query_intent,
                score,
                rationale: from_json::<AeoRationale>(&rationale, "aeo rationale")?,
            });
        }
        Ok(scores)
    }

    fn previous_scored_run(
        &self,
        blog_id: BlogId,
        before: RunId,
    ) -> Result<Option<EvaluationRun>, StoreError> {
        let guard = self.lock()?;
        let anchor: Option<i64> = guard
            .query_row(
                "SELECT run_at FROM evaluation_runs WHERE id = ?1",
                params![i64_id(before.get())?],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| map_sql_error(&err))?;
        let Some(anchor_run_at) = anchor else {
            return Err(StoreError::NotFound(format!("run {before}")));
        };
        guard
            .query_row(
                "SELECT r.id, r.blog_version_id, r.run_at, r.triggered_by, r.model_config, \
                 r.status, r.completed_at FROM evaluation_runs r JOIN versions v ON v.id = \
                 r.blog_version_id WHERE v.blog_id = ?1 AND r.status = 'completed' AND \
                 (r.run_at < ?2 OR (r.run_at = ?2 AND r.id < ?3)) ORDER BY r.run_at DESC, \
                 r.id DESC LIMIT 1",
                params![i64_id(blog_id.get())?, anchor_run_at, i64_id(before.get())?],
                |row| Ok(run_from_row(row)),
            )
            .optional()
            .map_err(|err| map_sql_error(&err))?
            .transpose()
    }

    fn latest_scored_run_for_version(
        &self,
        version_id: VersionId,
    ) -> Result<Option<EvaluationRun>, StoreError> {
        let guard = self.lock()?;
        guard
            .query_row(
                "SELECT id, blog_version_id, run_at, triggered_by, model_config, status, \
                 completed_at FROM evaluation_runs WHERE blog_version_id = ?1 AND status IN \
                 ('completed', 'partial_failure') ORDER BY run_at DESC, id DESC LIMIT 1",
                params![i64_id(version_id.get())?],
                |row| Ok(run_from_row(row)),
            )
            .optional()
            .map_err(|err| map_sql_error(&err))?
            .transpose()
    }
}

// ============================================================================
// SECTION: Rewrite Store Implementation
// ============================================================================

impl RewriteStore for SqliteQualityStore {
    fn insert_cycle(&self, new: NewRewriteCycle) -> Result<RewriteCycle, StoreError> {
        let now = self.now_millis();
        let trigger_reasons = to_json(&new.trigger_reasons)?;
        let trigger_data = to_json(&new.trigger_data)?;
        let parent_scores = new.parent_scores.as_ref().map(to_json).transpose()?;
        let status = if new.stop_reason.is_some() {
            RewriteStatus::Terminal
        } else {
            RewriteStatus::Pending
        };

        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| map_sql_error(&err))?;
        let parent_exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM versions WHERE id = ?1",
                params![i64_id(new.parent_version_id.get())?],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| map_sql_error(&err))?;
        if parent_exists.is_none() {
            return Err(StoreError::NotFound(format!("version {}", new.parent_version_id)));
        }
        let cycle_number: i64 = tx
            .query_row(
                "SELECT COALESCE(MAX(cycle_number), 0) + 1 FROM rewrite_cycles WHERE \
                 parent_version_id = ?1",
                params![i64_id(new.parent_version_id.get())?],
                |row| row.get(0),
            )
            .map_err(|err| map_sql_error(&err))?;
        tx.execute(
            "INSERT INTO rewrite_cycles (parent_version_id, cycle_number, trigger_reasons, \
             trigger_data, rewrite_prompt, parent_scores, rewrite_status, stop_reason, \
             created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                i64_id(new.parent_version_id.get())?,
                cycle_number,
                trigger_reasons,
                trigger_data,
                new.rewrite_prompt,
                parent_scores,
                status.as_str(),
                new.stop_reason.map(StopReason::as_str),
                now
            ],
        )
        .map_err(|err| map_sql_error(&err))?;
        let id = tx.last_insert_rowid();
        let cycle = tx
            .query_row(
                "SELECT id, parent_version_id, child_version_id, cycle_number, \
                 trigger_reasons, trigger_data, rewrite_prompt, parent_scores, child_scores, \
                 trend_outcome, rewrite_status, stop_reason, created_at FROM rewrite_cycles \
                 WHERE id = ?1",
                params![id],
                |row| Ok(cycle_from_row(row)),
            )
            .map_err(|err| map_sql_error(&err))??;
        tx.commit().map_err(|err| map_sql_error(&err))?;
        Ok(cycle)
    }

    fn get_cycle(&self, id: CycleId) -> Result<Option<RewriteCycle>, StoreError> {
        let guard = self.lock()?;
        guard
            .query_row(
                "SELECT id, parent_version_id, child_version_id, cycle_number, \
                 trigger_reasons, trigger_data, rewrite_prompt, parent_scores, child_scores, \
                 trend_outcome, rewrite_status, stop_reason, created_at FROM rewrite_cycles \
                 WHERE id = ?1",
                params![i64_id(id.get())?],
                |row| Ok(cycle_from_row(row)),
            )
            .optional()
            .map_err(|err| map_sql_error(&err))?
            .transpose()
    }

    fn cycles_for_parent(
        &self,
        parent_version_id: VersionId,
    ) -> Result<Vec<RewriteCycle>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT id, parent_version_id, child_version_id, cycle_number, \
                 trigger_reasons, trigger_data, rewrite_prompt, parent_scores, child_scores, \
                 trend_outcome, rewrite_status, stop_reason, created_at FROM rewrite_cycles \
                 WHERE parent_version_id = ?1 ORDER BY cycle_number ASC",
            )
            .map_err(|err| map_sql_error(&err))?;
        let rows = statement
            .query_map(params![i64_id(parent_version_id.get())?], |row| Ok(cycle_from_row(row)))
            .map_err(|err| map_sql_error(&err))?;
        let mut cycles = Vec::new();
        for row in rows {
            cycles.push(row.map_err(|err| map_sql_error(&err))??);
        }
        Ok(cycles)
    }

    fn cycles_for_blog(&self, blog_id: BlogId) -> Result<Vec<RewriteCycle>, StoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT c.id, c.parent_version_id, c.child_version_id, c.cycle_number, \
                 c.trigger_reasons, c.trigger_data, c.rewrite_prompt, c.parent_scores, \
                 c.child_scores, c.trend_outcome, c.rewrite_status, c.stop_reason, \
                 c.created_at FROM rewrite_cycles c JOIN versions v ON v.id = \
                 c.parent_version_id WHERE v.blog_id = ?1 ORDER BY c.created_at ASC, c.id ASC",
            )
            .map_err(|err| map_sql_error(&err))?;
        let rows = statement
            .query_map(params![i64_id(blog_id.get())?], |row| Ok(cycle_from_row(row)))
            .map_err(|err| map_sql_error(&err))?;
        let mut cycles = Vec::new();
        for row in rows {
            cycles.push(row.map_err(|err| map_sql_error(&err))??);
        }
        Ok(cycles)
    }

    fn complete_cycle(&self, completion: CycleCompletion) -> Result<RewriteCycle, StoreError> {
        let child_scores = to_json(&completion.child_scores)?;
        {
            let guard = self.lock()?;
            let changed = guard
                .execute(
                    "UPDATE rewrite_cycles SET child_version_id = ?1, child_scores = ?2, \
                     trend_outcome = ?3, rewrite_status = 'completed' WHERE id = ?4 AND \
                     rewrite_status = 'pending'",
                    params![
                        i64_id(completion.child_version_id.get())?,
                        child_scores,
                        completion.trend_outcome.as_str(),
                        i64_id(completion.cycle_id.get())?
                    ],
                )
                .map_err(|err| map_sql_error(&err))?;
            if changed == 0 {
                return Err(StoreError::Conflict(format!(
                    "cycle {} is unknown or not pending",
                    completion.cycle_id
                )));
            }
        }
        self.get_cycle(completion.cycle_id)?
            .ok_or_else(|| StoreError::NotFound(format!("cycle {}", completion.cycle_id)))
    }

    fn terminate_cycle(
        &self,
        id: CycleId,
        stop_reason: StopReason,
    ) -> Result<RewriteCycle, StoreError> {
        {
            let guard = self.lock()?;
            let changed = guard
                .execute(
                    "UPDATE rewrite_cycles SET rewrite_status = 'terminal', stop_reason = ?1 \
                     WHERE id = ?2 AND rewrite_status = 'pending'",
                    params![stop_reason.as_str(), i64_id(id.get())?],
                )
                .map_err(|err| map_sql_error(&err))?;
            if changed == 0 {
                return Err(StoreError::Conflict(format!("cycle {id} is unknown or not pending")));
            }
        }
        self.get_cycle(id)?.ok_or_else(|| StoreError::NotFound(format!("cycle {id}")))
    }
}

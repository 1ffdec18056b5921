// crates/quality-gate-store-sqlite/src/schema.rs
// ============================================================================
// Module: SQLite Schema
// Description: DDL and immutability triggers for the quality store.
// Purpose: Make write-once and partial-immutability rules canonical at the DB.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! The storage-layer constraints are the canonical enforcement of the data
//! model: write-once tables reject every UPDATE and DELETE via triggers,
//! evaluation runs allow only a forward status transition plus a write-once
//! `completed_at`, and the approver human gate runs inside the database so
//! no code path can bypass it. Engine-level checks are defense-in-depth on
//! top of these triggers, never a replacement.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::store::SqliteStoreError;

// ============================================================================
// SECTION: Version
// ============================================================================

/// Schema version for the store.
pub const SCHEMA_VERSION: i64 = 1;

// ============================================================================
// SECTION: DDL
// ============================================================================

/// Table definitions.
const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS actors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    role TEXT NOT NULL CHECK (role IN ('writer', 'reviewer', 'admin', 'system')),
    is_human INTEGER NOT NULL CHECK (is_human IN (0, 1)),
    created_at INTEGER NOT NULL,
    CHECK (role <> 'system' OR is_human = 0)
);
CREATE TABLE IF NOT EXISTS blogs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    created_by INTEGER NOT NULL REFERENCES actors (id),
    created_at INTEGER NOT NULL,
    project_id TEXT
);
CREATE TABLE IF NOT EXISTS versions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    blog_id INTEGER NOT NULL REFERENCES blogs (id),
    parent_version_id INTEGER REFERENCES versions (id),
    content TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    hash_algorithm TEXT NOT NULL,
    version_number INTEGER NOT NULL CHECK (version_number >= 1),
    source TEXT NOT NULL CHECK (source IN ('human_paste', 'ai_rewrite', 'human_edit')),
    source_rewrite_cycle_id INTEGER,
    change_reason TEXT,
    created_by INTEGER NOT NULL REFERENCES actors (id),
    created_at INTEGER NOT NULL,
    UNIQUE (blog_id, version_number),
    CHECK ((source = 'ai_rewrite') = (source_rewrite_cycle_id IS NOT NULL)),
    CHECK ((version_number = 1) = (parent_version_id IS NULL))
);
CREATE INDEX IF NOT EXISTS idx_versions_blog ON versions (blog_id, version_number);
CREATE TABLE IF NOT EXISTS evaluation_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    blog_version_id INTEGER NOT NULL REFERENCES versions (id),
    run_at INTEGER NOT NULL,
    triggered_by INTEGER REFERENCES actors (id),
    model_config TEXT NOT NULL,
    status TEXT NOT NULL
        CHECK (status IN ('processing', 'completed', 'partial_failure', 'failed')),
    completed_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_runs_version ON evaluation_runs (blog_version_id, run_at);
CREATE TABLE IF NOT EXISTS detector_scores (
    run_id INTEGER NOT NULL REFERENCES evaluation_runs (id),
    provider TEXT NOT NULL,
    score REAL NOT NULL CHECK (score >= 0 AND score <= 100),
    details TEXT NOT NULL,
    PRIMARY KEY (run_id, provider)
);
CREATE TABLE IF NOT EXISTS aeo_scores (
    run_id INTEGER NOT NULL REFERENCES evaluation_runs (id),
    query_intent TEXT NOT NULL,
    score REAL NOT NULL CHECK (score >= 0 AND score <= 100),
    rationale TEXT NOT NULL,
    PRIMARY KEY (run_id, query_intent)
);
CREATE TABLE IF NOT EXISTS rewrite_cycles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_version_id INTEGER NOT NULL REFERENCES versions (id),
    child_version_id INTEGER REFERENCES versions (id),
    cycle_number INTEGER NOT NULL CHECK (cycle_number >= 1),
    trigger_reasons TEXT NOT NULL,
    trigger_data TEXT NOT NULL,
    rewrite_prompt TEXT NOT NULL,
    parent_scores TEXT,
    child_scores TEXT,
    trend_outcome TEXT CHECK (
        trend_outcome IS NULL
        OR trend_outcome IN ('improving', 'partial_improvement', 'stagnant', 'regressing')
    ),
    rewrite_status TEXT NOT NULL
        CHECK (rewrite_status IN ('pending', 'completed', 'terminal')),
    stop_reason TEXT,
    created_at INTEGER NOT NULL,
    UNIQUE (parent_version_id, cycle_number)
);
CREATE TABLE IF NOT EXISTS approvals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    blog_id INTEGER NOT NULL REFERENCES blogs (id),
    approved_version_id INTEGER NOT NULL REFERENCES versions (id),
    approver_id INTEGER NOT NULL REFERENCES actors (id),
    approved_at INTEGER NOT NULL,
    revoked_at INTEGER,
    revoked_by INTEGER REFERENCES actors (id),
    revocation_reason TEXT,
    notes TEXT,
    CHECK ((revoked_at IS NULL) = (revoked_by IS NULL)),
    CHECK ((revoked_at IS NULL) = (revocation_reason IS NULL))
);
CREATE INDEX IF NOT EXISTS idx_approvals_blog ON approvals (blog_id, approved_at);
CREATE TABLE IF NOT EXISTS approval_attempts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    blog_id INTEGER NOT NULL REFERENCES blogs (id),
    attempted_by INTEGER NOT NULL REFERENCES actors (id),
    is_human_snapshot INTEGER NOT NULL CHECK (is_human_snapshot IN (0, 1)),
    result TEXT NOT NULL
        CHECK (result IN ('success', 'forbidden', 'invalid_state', 'invalid_version')),
    attempted_at INTEGER NOT NULL,
    failure_reason TEXT
);
CREATE TABLE IF NOT EXISTS review_actions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    blog_id INTEGER NOT NULL REFERENCES blogs (id),
    version_id INTEGER NOT NULL REFERENCES versions (id),
    reviewer_id INTEGER NOT NULL REFERENCES actors (id),
    action TEXT NOT NULL CHECK (action IN (
        'comment', 'request_changes', 'approve_intent', 'reject',
        'override', 'fast_approval_flag', 'submit_for_review'
    )),
    comments TEXT,
    is_override INTEGER NOT NULL CHECK (is_override IN (0, 1)),
    occurred_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_review_actions_reviewer
    ON review_actions (reviewer_id, action, occurred_at);
CREATE TABLE IF NOT EXISTS review_transitions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id INTEGER NOT NULL REFERENCES versions (id),
    from_state TEXT NOT NULL
        CHECK (from_state IN ('draft', 'in_review', 'approved', 'rejected', 'archived')),
    to_state TEXT NOT NULL
        CHECK (to_state IN ('draft', 'in_review', 'approved', 'rejected', 'archived')),
    actor_id INTEGER NOT NULL REFERENCES actors (id),
    occurred_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_transitions_version ON review_transitions (version_id, id);
CREATE TABLE IF NOT EXISTS escalations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    blog_id INTEGER NOT NULL REFERENCES blogs (id),
    version_id INTEGER NOT NULL REFERENCES versions (id),
    reason TEXT NOT NULL
        CHECK (reason IN ('score_regression', 'policy_violation', 'ambiguity', 'low_quality')),
    details TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('pending_review', 'resolved', 'dismissed')),
    created_at INTEGER NOT NULL,
    resolved_at INTEGER,
    resolved_by INTEGER REFERENCES actors (id)
);
CREATE INDEX IF NOT EXISTS idx_escalations_blog ON escalations (blog_id, status);
";

/// Immutability triggers.
///
/// `RAISE(ABORT)` surfaces as a constraint failure whose message carries the
/// guard name, so the store maps these onto invariant errors rather than
/// retryable conflicts.
const CREATE_TRIGGERS: &str = "
CREATE TRIGGER IF NOT EXISTS actors_update_guard BEFORE UPDATE ON actors
WHEN NEW.id <> OLD.id OR NEW.email <> OLD.email OR NEW.role <> OLD.role
    OR NEW.created_at <> OLD.created_at
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: actors allow only is_human updates');
END;
CREATE TRIGGER IF NOT EXISTS actors_delete_guard BEFORE DELETE ON actors
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: actors are never deleted');
END;
CREATE TRIGGER IF NOT EXISTS blogs_update_guard BEFORE UPDATE ON blogs
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: blogs are write-once');
END;
CREATE TRIGGER IF NOT EXISTS blogs_delete_guard BEFORE DELETE ON blogs
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: blogs are never deleted');
END;
CREATE TRIGGER IF NOT EXISTS versions_update_guard BEFORE UPDATE ON versions
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: versions are write-once');
END;
CREATE TRIGGER IF NOT EXISTS versions_delete_guard BEFORE DELETE ON versions
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: versions are never deleted');
END;
CREATE TRIGGER IF NOT EXISTS runs_immutable_guard BEFORE UPDATE ON evaluation_runs
WHEN NEW.id <> OLD.id OR NEW.blog_version_id <> OLD.blog_version_id
    OR NEW.run_at <> OLD.run_at
    OR COALESCE(NEW.triggered_by, -1) <> COALESCE(OLD.triggered_by, -1)
    OR NEW.model_config <> OLD.model_config
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: run columns other than status are frozen');
END;
CREATE TRIGGER IF NOT EXISTS runs_status_guard BEFORE UPDATE ON evaluation_runs
WHEN OLD.status <> 'processing'
    AND (NEW.status <> OLD.status
        OR COALESCE(NEW.completed_at, -1) <> COALESCE(OLD.completed_at, -1))
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: run status only advances from processing');
END;
CREATE TRIGGER IF NOT EXISTS runs_completed_at_guard BEFORE UPDATE ON evaluation_runs
WHEN OLD.completed_at IS NOT NULL
    AND COALESCE(NEW.completed_at, -1) <> OLD.completed_at
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: completed_at is write-once');
END;
CREATE TRIGGER IF NOT EXISTS runs_delete_guard BEFORE DELETE ON evaluation_runs
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: runs are never deleted');
END;
CREATE TRIGGER IF NOT EXISTS detector_scores_update_guard BEFORE UPDATE ON detector_scores
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: detector scores are write-once');
END;
CREATE TRIGGER IF NOT EXISTS detector_scores_delete_guard BEFORE DELETE ON detector_scores
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: detector scores are never deleted');
END;
CREATE TRIGGER IF NOT EXISTS aeo_scores_update_guard BEFORE UPDATE ON aeo_scores
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: aeo scores are write-once');
END;
CREATE TRIGGER IF NOT EXISTS aeo_scores_delete_guard BEFORE DELETE ON aeo_scores
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: aeo scores are never deleted');
END;
CREATE TRIGGER IF NOT EXISTS cycles_immutable_guard BEFORE UPDATE ON rewrite_cycles
WHEN NEW.id <> OLD.id OR NEW.parent_version_id <> OLD.parent_version_id
    OR NEW.cycle_number <> OLD.cycle_number
    OR NEW.trigger_reasons <> OLD.trigger_reasons
    OR NEW.trigger_data <> OLD.trigger_data
    OR NEW.rewrite_prompt <> OLD.rewrite_prompt
    OR COALESCE(NEW.parent_scores, '') <> COALESCE(OLD.parent_scores, '')
    OR NEW.created_at <> OLD.created_at
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: cycle prompt and snapshots are frozen');
END;
CREATE TRIGGER IF NOT EXISTS cycles_status_guard BEFORE UPDATE ON rewrite_cycles
WHEN OLD.rewrite_status <> 'pending'
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: cycle status only advances from pending');
END;
CREATE TRIGGER IF NOT EXISTS cycles_delete_guard BEFORE DELETE ON rewrite_cycles
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: cycles are never deleted');
END;
CREATE TRIGGER IF NOT EXISTS approvals_update_guard BEFORE UPDATE ON approvals
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: approvals are write-once');
END;
CREATE TRIGGER IF NOT EXISTS approvals_delete_guard BEFORE DELETE ON approvals
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: approvals are never deleted');
END;
CREATE TRIGGER IF NOT EXISTS approvals_human_gate BEFORE INSERT ON approvals
WHEN (SELECT is_human FROM actors WHERE id = NEW.approver_id) <> 1
BEGIN
    SELECT RAISE(ABORT, 'human gate: approver must be a human actor');
END;
CREATE TRIGGER IF NOT EXISTS attempts_update_guard BEFORE UPDATE ON approval_attempts
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: approval attempts are append-only');
END;
CREATE TRIGGER IF NOT EXISTS attempts_delete_guard BEFORE DELETE ON approval_attempts
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: approval attempts are never deleted');
END;
CREATE TRIGGER IF NOT EXISTS actions_update_guard BEFORE UPDATE ON review_actions
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: review actions are append-only');
END;
CREATE TRIGGER IF NOT EXISTS actions_delete_guard BEFORE DELETE ON review_actions
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: review actions are never deleted');
END;
CREATE TRIGGER IF NOT EXISTS transitions_update_guard BEFORE UPDATE ON review_transitions
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: review transitions are append-only');
END;
CREATE TRIGGER IF NOT EXISTS transitions_delete_guard BEFORE DELETE ON review_transitions
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: review transitions are never deleted');
END;
CREATE TRIGGER IF NOT EXISTS escalations_immutable_guard BEFORE UPDATE ON escalations
WHEN NEW.id <> OLD.id OR NEW.blog_id <> OLD.blog_id OR NEW.version_id <> OLD.version_id
    OR NEW.reason <> OLD.reason OR NEW.details <> OLD.details
    OR NEW.created_at <> OLD.created_at
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: escalation facts are frozen');
END;
CREATE TRIGGER IF NOT EXISTS escalations_status_guard BEFORE UPDATE ON escalations
WHEN OLD.status <> 'pending_review'
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: closed escalations are frozen');
END;
CREATE TRIGGER IF NOT EXISTS escalations_delete_guard BEFORE DELETE ON escalations
BEGIN
    SELECT RAISE(ABORT, 'immutability guard: escalations are never deleted');
END;
";

// ============================================================================
// SECTION: Initialization
// ============================================================================

/// Initializes the schema or validates an existing version.
///
/// # Errors
///
/// Returns [`SqliteStoreError::VersionMismatch`] for unknown schema versions
/// and [`SqliteStoreError::Db`] on engine failures.
pub fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(CREATE_TABLES)
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(CREATE_TRIGGERS)
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

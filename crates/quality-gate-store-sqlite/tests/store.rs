// crates/quality-gate-store-sqlite/tests/store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Write-once triggers, partial immutability, derived queries.
// Purpose: Prove the storage layer enforces the data model on its own.
// Dependencies: quality-gate-store-sqlite, quality-gate-core, rusqlite, tempfile
// ============================================================================

//! ## Overview
//! Exercises the durable store through its trait surface and, separately,
//! attacks the immutability triggers through a raw second connection: even
//! SQL that bypasses the Rust layer cannot update a version row, rewind a
//! run status, or insert an approval for a non-human actor.

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
    clippy::missing_docs_in_private_items,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::path::PathBuf;
use std::sync::Arc;

use quality_gate_core::Actor;
use quality_gate_core::ActorRole;
use quality_gate_core::Blog;
use quality_gate_core::ContentSource;
use quality_gate_core::ModelConfigSnapshot;
use quality_gate_core::NewActor;
use quality_gate_core::NewApproval;
use quality_gate_core::NewEvaluationRun;
use quality_gate_core::NewVersion;
use quality_gate_core::RunStatus;
use quality_gate_core::StoreError;
use quality_gate_core::SystemClock;
use quality_gate_core::Timestamp;
use quality_gate_core::Version;
use quality_gate_core::interfaces::ContentStore;
use quality_gate_core::interfaces::EvaluationStore;
use quality_gate_store_sqlite::JournalMode;
use quality_gate_store_sqlite::SqliteQualityStore;
use quality_gate_store_sqlite::SqliteStoreConfig;
use quality_gate_store_sqlite::SyncMode;
use tempfile::TempDir;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Durable store rooted in a temp directory.
struct Fixture {
    /// Keeps the directory alive for the test duration.
    _dir: TempDir,
    /// Database path for raw-connection attacks.
    path: PathBuf,
    /// Store under test.
    store: SqliteQualityStore,
    /// Seeded human writer.
    writer: Actor,
    /// Seeded non-human service account.
    service: Actor,
    /// Seeded blog.
    blog: Blog,
    /// Seeded root version.
    version: Version,
}

/// Opens a store in a temp directory and seeds one blog and version.
fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quality.db");
    let config = SqliteStoreConfig {
        path: path.clone(),
        busy_timeout_ms: 1_000,
        journal_mode: JournalMode::Wal,
        sync_mode: SyncMode::Normal,
    };
    let store = SqliteQualityStore::open(&config, Arc::new(SystemClock)).unwrap();
    let writer = store
        .create_actor(NewActor {
            email: "writer@example.com".to_string(),
            role: ActorRole::Writer,
            is_human: true,
        })
        .unwrap();
    let service = store
        .create_actor(NewActor {
            email: "bot@example.com".to_string(),
            role: ActorRole::System,
            is_human: false,
        })
        .unwrap();
    let blog = store.create_blog("Launch Notes", writer.id, None).unwrap();
    let version = store
        .append_version(NewVersion {
            blog_id: blog.id,
            content: "The first immutable snapshot of the launch notes.".to_string(),
            source: ContentSource::HumanPaste,
            parent_version_id: None,
            source_rewrite_cycle_id: None,
            change_reason: None,
            created_by: writer.id,
        })
        .unwrap();
    Fixture {
        _dir: dir,
        path,
        store,
        writer,
        service,
        blog,
        version,
    }
}

/// Opens a raw second connection to the fixture database.
fn raw_connection(fixture: &Fixture) -> rusqlite::Connection {
    let connection = rusqlite::Connection::open(&fixture.path).unwrap();
    connection.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    connection
}

// ============================================================================
// SECTION: Version Semantics
// ============================================================================

#[test]
fn versions_number_monotonically_and_hash_content() {
    let fixture = fixture();
    assert_eq!(fixture.version.version_number, 1);
    assert_eq!(fixture.version.content_hash.value.len(), 64);

    let second = fixture
        .store
        .append_version(NewVersion {
            blog_id: fixture.blog.id,
            content: "A second snapshot with different bytes.".to_string(),
            source: ContentSource::HumanEdit,
            parent_version_id: Some(fixture.version.id),
            source_rewrite_cycle_id: None,
            change_reason: Some("edit".to_string()),
            created_by: fixture.writer.id,
        })
        .unwrap();
    assert_eq!(second.version_number, 2);
    assert_ne!(second.content_hash.value, fixture.version.content_hash.value);

    let listed = fixture.store.list_versions(fixture.blog.id).unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed[0].version_number < listed[1].version_number);
}

#[test]
fn non_root_versions_require_a_same_blog_parent() {
    let fixture = fixture();
    let missing_parent = fixture.store.append_version(NewVersion {
        blog_id: fixture.blog.id,
        content: "A snapshot with no declared parent.".to_string(),
        source: ContentSource::HumanEdit,
        parent_version_id: None,
        source_rewrite_cycle_id: None,
        change_reason: None,
        created_by: fixture.writer.id,
    });
    assert!(matches!(missing_parent, Err(StoreError::Validation(_))));

    let other_blog = fixture.store.create_blog("Other", fixture.writer.id, None).unwrap();
    let other_root = fixture
        .store
        .append_version(NewVersion {
            blog_id: other_blog.id,
            content: "The other blog's own root snapshot.".to_string(),
            source: ContentSource::HumanPaste,
            parent_version_id: None,
            source_rewrite_cycle_id: None,
            change_reason: None,
            created_by: fixture.writer.id,
        })
        .unwrap();
    let cross_blog = fixture.store.append_version(NewVersion {
        blog_id: fixture.blog.id,
        content: "A snapshot pointing across blogs.".to_string(),
        source: ContentSource::HumanEdit,
        parent_version_id: Some(other_root.id),
        source_rewrite_cycle_id: None,
        change_reason: None,
        created_by: fixture.writer.id,
    });
    assert!(matches!(cross_blog, Err(StoreError::Validation(_))));
}

#[test]
fn ai_rewrite_versions_require_a_cycle_reference() {
    let fixture = fixture();
    let orphan = fixture.store.append_version(NewVersion {
        blog_id: fixture.blog.id,
        content: "A rewrite with no cycle provenance.".to_string(),
        source: ContentSource::AiRewrite,
        parent_version_id: Some(fixture.version.id),
        source_rewrite_cycle_id: None,
        change_reason: None,
        created_by: fixture.writer.id,
    });
    assert!(matches!(orphan, Err(StoreError::Validation(_))));
}

// ============================================================================
// SECTION: Trigger Enforcement
// ============================================================================

#[test]
fn version_rows_reject_raw_updates_and_deletes() {
    let fixture = fixture();
    let raw = raw_connection(&fixture);

    let update = raw.execute("UPDATE versions SET content = 'tampered' WHERE id = 1", []);
    let message = update.unwrap_err().to_string();
    assert!(message.contains("immutability guard"), "unexpected error: {message}");

    let delete = raw.execute("DELETE FROM versions WHERE id = 1", []);
    let message = delete.unwrap_err().to_string();
    assert!(message.contains("immutability guard"), "unexpected error: {message}");
}

#[test]
fn run_columns_other_than_status_are_frozen() {
    let fixture = fixture();
    let run = fixture
        .store
        .insert_run(NewEvaluationRun {
            blog_version_id: fixture.version.id,
            triggered_by: Some(fixture.writer.id),
            model_config: ModelConfigSnapshot {
                detectors: Vec::new(),
            },
        })
        .unwrap();

    let raw = raw_connection(&fixture);
    let tamper = raw.execute("UPDATE evaluation_runs SET run_at = 0 WHERE id = 1", []);
    assert!(tamper.unwrap_err().to_string().contains("immutability guard"));

    // Forward finalization is permitted once.
    let finalized = fixture
        .store
        .finalize_run(run.id, RunStatus::Completed, Timestamp::from_unix_millis(1))
        .unwrap();
    assert_eq!(finalized.status, RunStatus::Completed);

    // A second finalization conflicts at the store surface.
    let again =
        fixture.store.finalize_run(run.id, RunStatus::Failed, Timestamp::from_unix_millis(2));
    assert!(matches!(again, Err(StoreError::Conflict(_))));

    // Raw SQL cannot rewind the status either.
    let rewind =
        raw.execute("UPDATE evaluation_runs SET status = 'processing' WHERE id = 1", []);
    assert!(rewind.unwrap_err().to_string().contains("immutability guard"));
}

#[test]
fn raw_duplicate_version_numbers_violate_uniqueness() {
    let fixture = fixture();
    let raw = raw_connection(&fixture);
    let duplicate = raw.execute(
        "INSERT INTO versions (blog_id, parent_version_id, content, content_hash, \
         hash_algorithm, version_number, source, change_reason, created_by, created_at) \
         VALUES (1, NULL, 'dup', 'hash', 'sha256', 1, 'human_paste', NULL, 1, 0)",
        [],
    );
    assert!(duplicate.is_err());
}

#[test]
fn the_database_rejects_non_human_approvers() {
    let fixture = fixture();

    // Through the store surface.
    let through_api = fixture.store.record_approval(NewApproval {
        blog_id: fixture.blog.id,
        approved_version_id: fixture.version.id,
        approver_id: fixture.service.id,
        notes: None,
    });
    assert!(matches!(through_api, Err(StoreError::Forbidden(_))));

    // Straight through SQL, bypassing the Rust checks entirely.
    let raw = raw_connection(&fixture);
    let through_sql = raw.execute(
        "INSERT INTO approvals (blog_id, approved_version_id, approver_id, approved_at) \
         VALUES (1, 1, 2, 0)",
        [],
    );
    assert!(through_sql.unwrap_err().to_string().contains("human gate"));
}

// ============================================================================
// SECTION: Approval Queries
// ============================================================================

#[test]
fn current_approval_follows_the_revocation_chain() {
    let fixture = fixture();
    let approval = fixture
        .store
        .record_approval(NewApproval {
            blog_id: fixture.blog.id,
            approved_version_id: fixture.version.id,
            approver_id: fixture.writer.id,
            notes: Some("looks good".to_string()),
        })
        .unwrap();
    let current = fixture.store.current_approval(fixture.blog.id).unwrap().unwrap();
    assert_eq!(current.id, approval.id);

    // Idempotent repeat returns the existing row.
    let repeat = fixture
        .store
        .record_approval(NewApproval {
            blog_id: fixture.blog.id,
            approved_version_id: fixture.version.id,
            approver_id: fixture.writer.id,
            notes: None,
        })
        .unwrap();
    assert_eq!(repeat.id, approval.id);

    let revocation = fixture
        .store
        .revoke_approval(fixture.blog.id, fixture.writer.id, "stale numbers")
        .unwrap();
    assert!(revocation.revoked_at.is_some());
    assert_eq!(revocation.approved_version_id, fixture.version.id);
    assert!(fixture.store.current_approval(fixture.blog.id).unwrap().is_none());

    // A fresh approval of the same version is current again.
    let fresh = fixture
        .store
        .record_approval(NewApproval {
            blog_id: fixture.blog.id,
            approved_version_id: fixture.version.id,
            approver_id: fixture.writer.id,
            notes: None,
        })
        .unwrap();
    assert!(fresh.id > revocation.id);
    let current = fixture.store.current_approval(fixture.blog.id).unwrap().unwrap();
    assert_eq!(current.id, fresh.id);
}

// ============================================================================
// SECTION: Store Hygiene
// ============================================================================

#[test]
fn readiness_and_reopen_preserve_data() {
    let fixture = fixture();
    ContentStore::readiness(&fixture.store).unwrap();
    let config = SqliteStoreConfig {
        path: fixture.path.clone(),
        busy_timeout_ms: 1_000,
        journal_mode: JournalMode::Wal,
        sync_mode: SyncMode::Normal,
    };
    // Reopen against the same file while the directory is still alive.
    let reopened = SqliteQualityStore::open(&config, Arc::new(SystemClock)).unwrap();
    let listed = reopened.list_versions(fixture.blog.id).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].content_hash.value, fixture.version.content_hash.value);
}

#[test]
fn oversized_content_is_rejected() {
    let fixture = fixture();
    let oversized = "x".repeat(quality_gate_store_sqlite::MAX_CONTENT_BYTES + 1);
    let result = fixture.store.append_version(NewVersion {
        blog_id: fixture.blog.id,
        content: oversized,
        source: ContentSource::HumanEdit,
        parent_version_id: Some(fixture.version.id),
        source_rewrite_cycle_id: None,
        change_reason: None,
        created_by: fixture.writer.id,
    });
    assert!(matches!(result, Err(StoreError::Validation(_))));
}

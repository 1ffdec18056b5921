// crates/quality-gate-store-sqlite/src/lib.rs
// ============================================================================
// Module: Quality Gate SQLite Store
// Description: Durable storage backend for the content quality engine.
// Purpose: Enforce the data model's immutability rules at the database layer.
// Dependencies: quality-gate-core, rusqlite, serde, serde_json
// ============================================================================

//! ## Overview
//! This crate implements the core storage traits over one `SQLite` database
//! with WAL journaling. Write-once tables, the evaluation runs' partial
//! immutability, and the approver human gate are enforced by SQL triggers,
//! making the database the canonical boundary for the audit guarantees.
//! Invariants:
//! - Constraint races surface as conflicts; trigger guard hits surface as
//!   invariant violations and indicate an engine bug.
//! - Nothing is retried inside the store.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod schema;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::JournalMode;
pub use store::MAX_CONTENT_BYTES;
pub use store::SqliteQualityStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SyncMode;

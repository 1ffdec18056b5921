// crates/quality-gate-core/src/error.rs
// ============================================================================
// Module: Quality Gate Error Taxonomy
// Description: Caller-distinguishable error kinds for all engine operations.
// Purpose: Keep failure semantics stable and auditable across components.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every engine operation fails with an [`EngineError`] whose kind callers
//! can match on programmatically. Invariant violations are never worked
//! around silently: partial success is modeled as run status, audit tables
//! record human-visible failures, and `Internal` marks engine bugs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Error Kinds
// ============================================================================

/// Stable error kind labels for programmatic matching and audit records.
///
/// # Invariants
/// - Labels never change; new kinds may only be appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input violates a contract.
    Validation,
    /// Constraint race; caller may retry with refreshed state.
    Conflict,
    /// Non-human attempting a human action, or co-signature required.
    Forbidden,
    /// State-machine or timer violation.
    InvalidState,
    /// Version/blog mismatch.
    InvalidVersion,
    /// Blog was approved after the operation was queued.
    ApprovedContent,
    /// Rewrite cap hit.
    CapExceeded,
    /// External call exceeded its deadline.
    Timeout,
    /// Storage or external dependency down.
    Unavailable,
    /// Invariant violation inside the engine.
    Internal,
}

impl ErrorKind {
    /// Returns the stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::Forbidden => "forbidden",
            Self::InvalidState => "invalid_state",
            Self::InvalidVersion => "invalid_version",
            Self::ApprovedContent => "approved_content",
            Self::CapExceeded => "cap_exceeded",
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
        }
    }
}

// ============================================================================
// SECTION: Engine Error
// ============================================================================

/// Engine operation error.
///
/// # Invariants
/// - Messages avoid embedding raw content bodies.
/// - `InvalidState` carries the remaining timer seconds when a timer gate
///   caused the failure, so callers never compute eligibility themselves.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Input violates a contract.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Constraint race; caller may retry with refreshed state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Non-human attempting a human action, or co-signature required.
    #[error("forbidden: {reason}")]
    Forbidden {
        /// Stable failure reason.
        reason: String,
    },
    /// State-machine or timer violation.
    #[error("invalid state: {reason}")]
    InvalidState {
        /// Stable failure reason.
        reason: String,
        /// Remaining review-timer seconds when a timer gate fired.
        retry_after_seconds: Option<u64>,
    },
    /// Version/blog mismatch.
    #[error("invalid version: {0}")]
    InvalidVersion(String),
    /// Blog was approved after the operation was queued.
    #[error("approved content: {0}")]
    ApprovedContent(String),
    /// Rewrite cap hit.
    #[error("rewrite cap exceeded: {0}")]
    CapExceeded(String),
    /// External call exceeded its deadline.
    #[error("timeout after {timeout_seconds}s: {operation}")]
    Timeout {
        /// Operation that timed out.
        operation: String,
        /// Deadline that was exceeded, in seconds.
        timeout_seconds: u64,
    },
    /// Storage or external dependency down.
    #[error("unavailable: {0}")]
    Unavailable(String),
    /// Invariant violation inside the engine.
    #[error("internal invariant violation: {0}")]
    Internal(String),
}

impl EngineError {
    /// Returns the stable kind of the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Forbidden {
                ..
            } => ErrorKind::Forbidden,
            Self::InvalidState {
                ..
            } => ErrorKind::InvalidState,
            Self::InvalidVersion(_) => ErrorKind::InvalidVersion,
            Self::ApprovedContent(_) => ErrorKind::ApprovedContent,
            Self::CapExceeded(_) => ErrorKind::CapExceeded,
            Self::Timeout {
                ..
            } => ErrorKind::Timeout,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

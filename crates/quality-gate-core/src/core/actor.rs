// crates/quality-gate-core/src/core/actor.rs
// ============================================================================
// Module: Quality Gate Actor Registry Types
// Description: Principals acting on content, with the human verification flag.
// Purpose: Model who performs actions so approvals can be provably human.
// Dependencies: crate::core::{identifiers, time}, serde
// ============================================================================

//! ## Overview
//! Actors are principals: human writers and reviewers, administrators, and
//! service accounts. The `is_human` flag is the load-bearing attribute. The
//! storage boundary rejects approvals from non-human actors, and every
//! approval attempt snapshots the flag for audit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ActorId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Roles
// ============================================================================

/// Role attached to an actor.
///
/// # Invariants
/// - Variants are stable for serialization and audit records.
/// - `System` actors can never have `is_human = true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Content author.
    Writer,
    /// Content reviewer.
    Reviewer,
    /// Administrator; may toggle `is_human` and co-sign gated approvals.
    Admin,
    /// Automated service account.
    System,
}

impl ActorRole {
    /// Returns the stable persistence label for the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Writer => "writer",
            Self::Reviewer => "reviewer",
            Self::Admin => "admin",
            Self::System => "system",
        }
    }

    /// Parses a persistence label back into a role.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "writer" => Some(Self::Writer),
            "reviewer" => Some(Self::Reviewer),
            "admin" => Some(Self::Admin),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Actor Records
// ============================================================================

/// A registered principal.
///
/// # Invariants
/// - `email` is unique within the registry.
/// - `role == System` implies `is_human == false`.
/// - Rows are never deleted; only `is_human` is mutable, and only by admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Actor identifier.
    pub id: ActorId,
    /// Unique email address.
    pub email: String,
    /// Actor role.
    pub role: ActorRole,
    /// Whether the actor is a verified human.
    pub is_human: bool,
    /// Creation timestamp.
    pub created_at: Timestamp,
}

/// Parameters for registering a new actor.
///
/// # Invariants
/// - `email` must be non-empty; uniqueness is enforced by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActor {
    /// Unique email address.
    pub email: String,
    /// Actor role.
    pub role: ActorRole,
    /// Whether the actor is a verified human.
    pub is_human: bool,
}

// crates/quality-gate-core/src/core/content.rs
// ============================================================================
// Module: Quality Gate Content Model
// Description: Blogs and their immutable version history.
// Purpose: Capture append-only content lineage with integrity hashes.
// Dependencies: crate::core::{hashing, identifiers, time}, serde
// ============================================================================

//! ## Overview
//! A blog is a stable content identity; versions are immutable snapshots
//! forming a lineage rooted at version number 1. Version rows are write-once
//! at the storage layer, carry a SHA-256 digest over their content, and order
//! totally by `(version_number, created_at)` within a blog.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::HashDigest;
use crate::core::identifiers::ActorId;
use crate::core::identifiers::BlogId;
use crate::core::identifiers::CycleId;
use crate::core::identifiers::ProjectId;
use crate::core::identifiers::VersionId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Blog
// ============================================================================

/// Stable content identity.
///
/// # Invariants
/// - `name` is non-empty and never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blog {
    /// Blog identifier.
    pub id: BlogId,
    /// Human-provided, immutable name.
    pub name: String,
    /// Creating actor.
    pub created_by: ActorId,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Optional project grouping key.
    pub project_id: Option<ProjectId>,
}

// ============================================================================
// SECTION: Version Source
// ============================================================================

/// Origin of a version's content.
///
/// # Invariants
/// - Variants are stable for serialization and audit records.
/// - `AiRewrite` versions must reference the producing rewrite cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    /// Content pasted in by a human.
    HumanPaste,
    /// Content produced by an orchestrated rewrite.
    AiRewrite,
    /// Content edited by a human during review.
    HumanEdit,
}

impl ContentSource {
    /// Returns the stable persistence label for the source.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HumanPaste => "human_paste",
            Self::AiRewrite => "ai_rewrite",
            Self::HumanEdit => "human_edit",
        }
    }

    /// Parses a persistence label back into a source.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "human_paste" => Some(Self::HumanPaste),
            "ai_rewrite" => Some(Self::AiRewrite),
            "human_edit" => Some(Self::HumanEdit),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Version
// ============================================================================

/// Immutable content snapshot of a blog.
///
/// # Invariants
/// - `(blog_id, version_number)` is unique; `version_number` >= 1.
/// - `parent_version_id` is `None` iff `version_number == 1` and otherwise
///   references a version of the same blog.
/// - `content_hash` is the SHA-256 digest of `content`.
/// - `source_rewrite_cycle_id` is present iff `source == AiRewrite`.
/// - Rows are write-once after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Version identifier.
    pub id: VersionId,
    /// Owning blog.
    pub blog_id: BlogId,
    /// Parent version within the same blog, absent only for roots.
    pub parent_version_id: Option<VersionId>,
    /// Content text.
    pub content: String,
    /// SHA-256 digest over `content`.
    pub content_hash: HashDigest,
    /// Per-blog version number (1-based, strictly monotone, gaps tolerated).
    pub version_number: u32,
    /// Origin of the content.
    pub source: ContentSource,
    /// Producing rewrite cycle, required for `AiRewrite` versions.
    pub source_rewrite_cycle_id: Option<CycleId>,
    /// Optional reason for the change.
    pub change_reason: Option<String>,
    /// Creating actor.
    pub created_by: ActorId,
    /// Creation timestamp.
    pub created_at: Timestamp,
}

/// Parameters for appending a new version.
///
/// # Invariants
/// - The store computes `version_number`, `content_hash`, and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVersion {
    /// Owning blog.
    pub blog_id: BlogId,
    /// Content text.
    pub content: String,
    /// Origin of the content.
    pub source: ContentSource,
    /// Parent version within the same blog.
    pub parent_version_id: Option<VersionId>,
    /// Producing rewrite cycle, required for `AiRewrite` versions.
    pub source_rewrite_cycle_id: Option<CycleId>,
    /// Optional reason for the change.
    pub change_reason: Option<String>,
    /// Creating actor.
    pub created_by: ActorId,
}

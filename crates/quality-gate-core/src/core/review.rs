// crates/quality-gate-core/src/core/review.rs
// ============================================================================
// Module: Quality Gate Review Records
// Description: Review states, approvals, attempt audits, and escalations.
// Purpose: Model the human-in-the-loop surface with append-only audit rows.
// Dependencies: crate::core::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! Review state is derived from an append-only transition log; approvals and
//! their revocations are write-once rows of one table; every approve/reject
//! attempt is audited with its final result; escalations are open records
//! whose existence (not a flag) makes a blog "escalated".

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::ActorId;
use crate::core::identifiers::ApprovalId;
use crate::core::identifiers::BlogId;
use crate::core::identifiers::EscalationId;
use crate::core::identifiers::VersionId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Review States
// ============================================================================

/// Per-version review state.
///
/// # Invariants
/// - `Approved`, `Rejected`, and `Archived` are terminal.
/// - Backward transitions are forbidden; edits create new versions instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// Initial state of every version.
    Draft,
    /// Under review; the review timer runs from the transition.
    InReview,
    /// Terminal: approved.
    Approved,
    /// Terminal: rejected.
    Rejected,
    /// Terminal: archived without a decision.
    Archived,
}

impl ReviewState {
    /// Returns the stable persistence label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InReview => "in_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Archived => "archived",
        }
    }

    /// Parses a persistence label back into a state.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "draft" => Some(Self::Draft),
            "in_review" => Some(Self::InReview),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    /// Returns true when the state permits a transition to `next`.
    #[must_use]
    pub const fn can_transition(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::InReview)
                | (Self::InReview, Self::Approved | Self::Rejected | Self::Archived)
        )
    }

    /// Returns true when no further transitions are permitted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Archived)
    }
}

/// Append-only review state transition.
///
/// # Invariants
/// - The newest transition for a version defines its current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewTransition {
    /// Version whose state changed.
    pub version_id: VersionId,
    /// State before the transition.
    pub from_state: ReviewState,
    /// State after the transition.
    pub to_state: ReviewState,
    /// Acting principal.
    pub actor_id: ActorId,
    /// Server-clock timestamp of the transition.
    pub occurred_at: Timestamp,
}

// ============================================================================
// SECTION: Approvals
// ============================================================================

/// Write-once approval (or revocation) row.
///
/// # Invariants
/// - `approver_id` references an actor with `is_human = true` at insert time.
/// - Revocation rows carry all three revocation fields and supersede earlier
///   approval rows for the same version.
/// - An approval of version V does not imply V is the blog's latest version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalState {
    /// Approval row identifier.
    pub id: ApprovalId,
    /// Blog the declaration applies to.
    pub blog_id: BlogId,
    /// Approved version.
    pub approved_version_id: VersionId,
    /// Declaring human actor.
    pub approver_id: ActorId,
    /// Declaration timestamp.
    pub approved_at: Timestamp,
    /// Revocation timestamp, set only on revocation rows.
    pub revoked_at: Option<Timestamp>,
    /// Revoking actor, set only on revocation rows.
    pub revoked_by: Option<ActorId>,
    /// Revocation reason, set only on revocation rows.
    pub revocation_reason: Option<String>,
    /// Optional notes (e.g. the fast-approval marker).
    pub notes: Option<String>,
}

/// Parameters for recording a new approval.
///
/// # Invariants
/// - The store verifies the approver is human and the version belongs to the
///   blog before inserting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApproval {
    /// Blog the declaration applies to.
    pub blog_id: BlogId,
    /// Approved version.
    pub approved_version_id: VersionId,
    /// Declaring human actor.
    pub approver_id: ActorId,
    /// Optional notes.
    pub notes: Option<String>,
}

// ============================================================================
// SECTION: Approval Attempts
// ============================================================================

/// Final result of an approve/reject attempt.
///
/// # Invariants
/// - Variants are stable for audit queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptResult {
    /// Attempt succeeded.
    Success,
    /// Actor was not permitted (non-human, or co-signature required).
    Forbidden,
    /// State machine or timer forbade the transition.
    InvalidState,
    /// Version does not belong to the target blog.
    InvalidVersion,
}

impl AttemptResult {
    /// Returns the stable persistence label for the result.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Forbidden => "forbidden",
            Self::InvalidState => "invalid_state",
            Self::InvalidVersion => "invalid_version",
        }
    }

    /// Parses a persistence label back into a result.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "success" => Some(Self::Success),
            "forbidden" => Some(Self::Forbidden),
            "invalid_state" => Some(Self::InvalidState),
            "invalid_version" => Some(Self::InvalidVersion),
            _ => None,
        }
    }
}

/// Append-only audit row for one approve/reject attempt.
///
/// # Invariants
/// - Inserted once with the final result; there is no pending state.
/// - `is_human_snapshot` captures the actor flag at attempt time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalAttempt {
    /// Blog the attempt targeted.
    pub blog_id: BlogId,
    /// Attempting actor.
    pub attempted_by: ActorId,
    /// `is_human` flag of the actor at attempt time.
    pub is_human_snapshot: bool,
    /// Final attempt result.
    pub result: AttemptResult,
    /// Attempt timestamp.
    pub attempted_at: Timestamp,
    /// Failure reason for unsuccessful attempts.
    pub failure_reason: Option<String>,
}

/// Parameters for logging an approval attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApprovalAttempt {
    /// Blog the attempt targeted.
    pub blog_id: BlogId,
    /// Attempting actor.
    pub attempted_by: ActorId,
    /// `is_human` flag of the actor at attempt time.
    pub is_human_snapshot: bool,
    /// Final attempt result.
    pub result: AttemptResult,
    /// Failure reason for unsuccessful attempts.
    pub failure_reason: Option<String>,
}

// ============================================================================
// SECTION: Review Actions
// ============================================================================

/// Kind of logged human review action.
///
/// # Invariants
/// - Variants are stable for audit queries; counters (review cycles, fast
///   approvals) derive from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewActionKind {
    /// Free-form reviewer comment.
    Comment,
    /// Reviewer requested changes.
    RequestChanges,
    /// Reviewer declared intent to approve.
    ApproveIntent,
    /// Reviewer rejected the version.
    Reject,
    /// Override path was exercised.
    Override,
    /// Rubber-stamp audit marker for a fast approval.
    FastApprovalFlag,
    /// Version was submitted for review.
    SubmitForReview,
}

impl ReviewActionKind {
    /// Returns the stable persistence label for the action kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::RequestChanges => "request_changes",
            Self::ApproveIntent => "approve_intent",
            Self::Reject => "reject",
            Self::Override => "override",
            Self::FastApprovalFlag => "fast_approval_flag",
            Self::SubmitForReview => "submit_for_review",
        }
    }

    /// Parses a persistence label back into an action kind.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "comment" => Some(Self::Comment),
            "request_changes" => Some(Self::RequestChanges),
            "approve_intent" => Some(Self::ApproveIntent),
            "reject" => Some(Self::Reject),
            "override" => Some(Self::Override),
            "fast_approval_flag" => Some(Self::FastApprovalFlag),
            "submit_for_review" => Some(Self::SubmitForReview),
            _ => None,
        }
    }
}

/// Append-only logged human review event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanReviewAction {
    /// Blog the action applies to.
    pub blog_id: BlogId,
    /// Version the action applies to.
    pub version_id: VersionId,
    /// Acting reviewer.
    pub reviewer_id: ActorId,
    /// Action kind.
    pub action: ReviewActionKind,
    /// Free-form comments.
    pub comments: Option<String>,
    /// Marks actions taken through the override path.
    pub is_override: bool,
    /// Action timestamp.
    pub occurred_at: Timestamp,
}

/// Parameters for logging a human review action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReviewAction {
    /// Blog the action applies to.
    pub blog_id: BlogId,
    /// Version the action applies to.
    pub version_id: VersionId,
    /// Acting reviewer.
    pub reviewer_id: ActorId,
    /// Action kind.
    pub action: ReviewActionKind,
    /// Free-form comments.
    pub comments: Option<String>,
    /// Marks actions taken through the override path.
    pub is_override: bool,
}

// ============================================================================
// SECTION: Escalations
// ============================================================================

/// Reason an escalation was opened.
///
/// # Invariants
/// - Variants are stable for audit queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    /// Evaluation metrics dropped past the regression threshold.
    ScoreRegression,
    /// A policy bound (e.g. review-cycle cap) was exceeded.
    PolicyViolation,
    /// Conflicting human signals need another reviewer.
    Ambiguity,
    /// Content quality is persistently low.
    LowQuality,
}

impl EscalationReason {
    /// Returns the stable persistence label for the reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ScoreRegression => "score_regression",
            Self::PolicyViolation => "policy_violation",
            Self::Ambiguity => "ambiguity",
            Self::LowQuality => "low_quality",
        }
    }

    /// Parses a persistence label back into a reason.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "score_regression" => Some(Self::ScoreRegression),
            "policy_violation" => Some(Self::PolicyViolation),
            "ambiguity" => Some(Self::Ambiguity),
            "low_quality" => Some(Self::LowQuality),
            _ => None,
        }
    }
}

/// Escalation lifecycle status.
///
/// # Invariants
/// - Only `PendingReview` escalations make a blog "escalated".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStatus {
    /// Awaiting human intervention.
    PendingReview,
    /// Resolved by a human.
    Resolved,
    /// Dismissed by a human.
    Dismissed,
}

impl EscalationStatus {
    /// Returns the stable persistence label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingReview => "pending_review",
            Self::Resolved => "resolved",
            Self::Dismissed => "dismissed",
        }
    }

    /// Parses a persistence label back into a status.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "pending_review" => Some(Self::PendingReview),
            "resolved" => Some(Self::Resolved),
            "dismissed" => Some(Self::Dismissed),
            _ => None,
        }
    }
}

/// Automation hard-stop awaiting human intervention.
///
/// # Invariants
/// - "Escalated" is derived by querying open escalations; no flag column
///   exists anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escalation {
    /// Escalation identifier.
    pub id: EscalationId,
    /// Blog the escalation applies to.
    pub blog_id: BlogId,
    /// Version the escalation applies to.
    pub version_id: VersionId,
    /// Escalation reason.
    pub reason: EscalationReason,
    /// Structured details supporting the reason.
    pub details: Value,
    /// Lifecycle status.
    pub status: EscalationStatus,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Resolution timestamp.
    pub resolved_at: Option<Timestamp>,
    /// Resolving actor.
    pub resolved_by: Option<ActorId>,
}

/// Parameters for opening an escalation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEscalation {
    /// Blog the escalation applies to.
    pub blog_id: BlogId,
    /// Version the escalation applies to.
    pub version_id: VersionId,
    /// Escalation reason.
    pub reason: EscalationReason,
    /// Structured details supporting the reason.
    pub details: Value,
}

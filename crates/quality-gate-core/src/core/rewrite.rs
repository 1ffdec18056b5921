// crates/quality-gate-core/src/core/rewrite.rs
// ============================================================================
// Module: Quality Gate Rewrite Records
// Description: Rewrite cycles, trend outcomes, and stop reasons.
// Purpose: Model one orchestrated rewrite attempt with audit-grade snapshots.
// Dependencies: crate::core::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! A rewrite cycle records one orchestrated attempt to produce a child
//! version from a parent version. The filled prompt, trigger reasons, and
//! score snapshots are write-once; only the status may advance, and only from
//! `Pending`. Refused attempts are recorded as terminal cycles so every
//! automation decision is auditable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::CycleId;
use crate::core::identifiers::VersionId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Trend Classification
// ============================================================================

/// Trend outcome comparing a child version's scores against its parent's.
///
/// # Invariants
/// - `code()` values are stable: 1..=4 in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendOutcome {
    /// Both AEO and AI-likeness improved meaningfully.
    Improving,
    /// AEO improved meaningfully; AI-likeness did not.
    PartialImprovement,
    /// AEO moved less than the meaningful-change threshold.
    Stagnant,
    /// AEO or AI-likeness regressed meaningfully.
    Regressing,
}

impl TrendOutcome {
    /// Returns the stable numeric code for the outcome.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Improving => 1,
            Self::PartialImprovement => 2,
            Self::Stagnant => 3,
            Self::Regressing => 4,
        }
    }

    /// Returns the stable persistence label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::PartialImprovement => "partial_improvement",
            Self::Stagnant => "stagnant",
            Self::Regressing => "regressing",
        }
    }

    /// Parses a persistence label back into an outcome.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "improving" => Some(Self::Improving),
            "partial_improvement" => Some(Self::PartialImprovement),
            "stagnant" => Some(Self::Stagnant),
            "regressing" => Some(Self::Regressing),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Cycle Status and Stop Reasons
// ============================================================================

/// Rewrite cycle lifecycle status.
///
/// # Invariants
/// - Status only advances `Pending -> {Completed, Terminal}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteStatus {
    /// Cycle inserted; external rewrite not yet finished.
    Pending,
    /// Child appended and evaluated.
    Completed,
    /// Cycle stopped without a usable child.
    Terminal,
}

impl RewriteStatus {
    /// Returns the stable persistence label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Terminal => "terminal",
        }
    }

    /// Parses a persistence label back into a status.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "terminal" => Some(Self::Terminal),
            _ => None,
        }
    }
}

/// Reason a cycle stopped without producing further rewrites.
///
/// # Invariants
/// - Labels are stable for persistence and audit queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Per-parent cycle ceiling reached.
    MaxCyclesReached,
    /// Two consecutive stagnant cycles.
    NoImprovement,
    /// Latest cycle regressed.
    QualityDegradation,
    /// Recent child AEO totals oscillate within a narrow band.
    OscillationDetected,
    /// Blog was approved while the rewrite was queued.
    ApprovedContent,
    /// Per-blog rewrite cap reached.
    CapExceeded,
    /// External rewriter exceeded its deadline.
    Timeout,
    /// External rewriter failed.
    RewriterError,
}

impl StopReason {
    /// Returns the stable persistence label for the reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MaxCyclesReached => "max_cycles_reached",
            Self::NoImprovement => "no_improvement",
            Self::QualityDegradation => "quality_degradation",
            Self::OscillationDetected => "oscillation_detected",
            Self::ApprovedContent => "approved_content",
            Self::CapExceeded => "cap_exceeded",
            Self::Timeout => "timeout",
            Self::RewriterError => "rewriter_error",
        }
    }

    /// Parses a persistence label back into a reason.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "max_cycles_reached" => Some(Self::MaxCyclesReached),
            "no_improvement" => Some(Self::NoImprovement),
            "quality_degradation" => Some(Self::QualityDegradation),
            "oscillation_detected" => Some(Self::OscillationDetected),
            "approved_content" => Some(Self::ApprovedContent),
            "cap_exceeded" => Some(Self::CapExceeded),
            "timeout" => Some(Self::Timeout),
            "rewriter_error" => Some(Self::RewriterError),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Score Snapshots
// ============================================================================

/// Aggregate score snapshot frozen onto a cycle.
///
/// # Invariants
/// - Values are copied from evaluation aggregates at snapshot time and never
///   recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    /// AEO total for the primary intent.
    pub aeo_total: f64,
    /// Mean AI-likeness detector score.
    pub ai_likeness_total: f64,
}

// ============================================================================
// SECTION: Rewrite Cycle
// ============================================================================

/// One orchestrated rewrite attempt.
///
/// # Invariants
/// - `(parent_version_id, cycle_number)` is unique; `cycle_number` >= 1.
/// - `rewrite_prompt`, `trigger_reasons`, `trigger_data`, and score snapshots
///   are write-once.
/// - `child_version_id` is set at most once, on completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteCycle {
    /// Cycle identifier.
    pub id: CycleId,
    /// Parent version the rewrite starts from.
    pub parent_version_id: VersionId,
    /// Appended child version, absent until completion.
    pub child_version_id: Option<VersionId>,
    /// Per-parent attempt number (1-based).
    pub cycle_number: u32,
    /// Stable trigger reason labels that fired.
    pub trigger_reasons: Vec<String>,
    /// Structured trigger evidence.
    pub trigger_data: Value,
    /// Verbatim filled prompt, stored before the external call.
    pub rewrite_prompt: String,
    /// Parent aggregate scores at trigger time.
    pub parent_scores: Option<ScoreSnapshot>,
    /// Child aggregate scores after evaluation.
    pub child_scores: Option<ScoreSnapshot>,
    /// Trend classification of the child against the parent.
    pub trend_outcome: Option<TrendOutcome>,
    /// Lifecycle status.
    pub rewrite_status: RewriteStatus,
    /// Stop reason for terminal cycles.
    pub stop_reason: Option<StopReason>,
    /// Creation timestamp.
    pub created_at: Timestamp,
}

/// Parameters for inserting a new rewrite cycle.
///
/// # Invariants
/// - The store computes `cycle_number` and stamps `created_at`; the cycle
///   starts `Pending` unless a stop reason marks it terminal at insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRewriteCycle {
    /// Parent version the rewrite starts from.
    pub parent_version_id: VersionId,
    /// Stable trigger reason labels that fired.
    pub trigger_reasons: Vec<String>,
    /// Structured trigger evidence.
    pub trigger_data: Value,
    /// Verbatim filled prompt.
    pub rewrite_prompt: String,
    /// Parent aggregate scores at trigger time.
    pub parent_scores: Option<ScoreSnapshot>,
    /// Stop reason when the cycle is refused at insert.
    pub stop_reason: Option<StopReason>,
}

/// Completion update linking a child version onto a pending cycle.
///
/// # Invariants
/// - Applied exactly once per cycle; the store rejects repeat completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleCompletion {
    /// Cycle to complete.
    pub cycle_id: CycleId,
    /// Appended child version.
    pub child_version_id: VersionId,
    /// Child aggregate scores after evaluation.
    pub child_scores: ScoreSnapshot,
    /// Trend classification of the child against the parent.
    pub trend_outcome: TrendOutcome,
}

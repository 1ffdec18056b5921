// crates/quality-gate-core/src/telemetry.rs
// ============================================================================
// Module: Quality Gate Telemetry
// Description: Structured observability events for engine decisions.
// Purpose: Provide decision visibility without hard logging dependencies.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! This module exposes a thin telemetry interface for engine lifecycle and
//! decision events. It is intentionally dependency-light so deployments can
//! plug in their logging or metrics stack without redesign; the default sink
//! drops events. Audit tables remain the authoritative record: telemetry is
//! visibility, never evidence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::core::AttemptResult;
use crate::core::BlogId;
use crate::core::CycleId;
use crate::core::EscalationReason;
use crate::core::ReviewState;
use crate::core::RunId;
use crate::core::RunStatus;
use crate::core::ScorerId;
use crate::core::StopReason;
use crate::core::VersionId;
use crate::core::identifiers::ActorId;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Structured telemetry event emitted by engine components.
///
/// # Invariants
/// - Events carry identifiers and stable labels, never raw content bodies.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// An evaluation run was created.
    EvaluationStarted {
        /// Run identifier.
        run_id: RunId,
        /// Evaluated version.
        version_id: VersionId,
        /// Number of scorer tasks fanned out.
        scorer_count: usize,
    },
    /// A scorer task failed after its retry budget.
    ScorerFailed {
        /// Run identifier.
        run_id: RunId,
        /// Failing scorer.
        scorer_id: ScorerId,
        /// Failure message.
        message: String,
    },
    /// An evaluation run was finalized.
    EvaluationFinalized {
        /// Run identifier.
        run_id: RunId,
        /// Final status.
        status: RunStatus,
    },
    /// Regression detection skipped a metric.
    RegressionMetricSkipped {
        /// Run identifier.
        run_id: RunId,
        /// Skipped metric label.
        metric: String,
        /// Skip reason.
        reason: String,
    },
    /// Regression detection opened an escalation.
    RegressionEscalated {
        /// Run identifier.
        run_id: RunId,
        /// Affected blog.
        blog_id: BlogId,
        /// Metric that regressed.
        metric: String,
        /// Observed drop in points.
        drop: f64,
    },
    /// The orchestrator decided no rewrite was required.
    RewriteNotRequired {
        /// Parent version inspected.
        version_id: VersionId,
    },
    /// The orchestrator refused or stopped a cycle.
    RewriteStopped {
        /// Cycle identifier when a terminal cycle was recorded.
        cycle_id: Option<CycleId>,
        /// Parent version inspected.
        version_id: VersionId,
        /// Stop reason.
        stop_reason: StopReason,
    },
    /// The orchestrator completed a cycle.
    RewriteCompleted {
        /// Cycle identifier.
        cycle_id: CycleId,
        /// Appended child version.
        child_version_id: VersionId,
        /// Trend code (1..=4).
        trend_code: u8,
    },
    /// A review state transition was recorded.
    ReviewTransitioned {
        /// Version whose state changed.
        version_id: VersionId,
        /// New state.
        to_state: ReviewState,
    },
    /// An approval attempt concluded.
    ApprovalAttempted {
        /// Target blog.
        blog_id: BlogId,
        /// Attempting actor.
        attempted_by: ActorId,
        /// Final attempt result.
        result: AttemptResult,
    },
    /// An escalation was opened.
    EscalationOpened {
        /// Affected blog.
        blog_id: BlogId,
        /// Escalation reason.
        reason: EscalationReason,
    },
}

// ============================================================================
// SECTION: Sink
// ============================================================================

/// Telemetry sink capability.
pub trait TelemetrySink: Send + Sync {
    /// Records one event. Implementations must not block the engine.
    fn record(&self, event: &TelemetryEvent);
}

/// Default sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn record(&self, _event: &TelemetryEvent) {}
}

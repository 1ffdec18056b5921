// crates/quality-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Quality Gate Interfaces
// Description: Backend-agnostic contracts for storage, scoring, rewriting, and tasks.
// Purpose: Define the seams the engine consumes without embedding backend details.
// Dependencies: crate::core, crate::error, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the engine integrates with persistence, scorers, the
//! external rewriter, and the background workflow runner. Implementations
//! must be deterministic where the contract says so and fail closed on
//! missing or invalid data. The stores enforce write-once and
//! partial-immutability rules at their own boundary; engine-level checks are
//! defense-in-depth, never the only line.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::core::Actor;
use crate::core::AeoRationale;
use crate::core::AeoScore;
use crate::core::ApprovalAttempt;
use crate::core::ApprovalState;
use crate::core::Blog;
use crate::core::BlogId;
use crate::core::CycleCompletion;
use crate::core::CycleId;
use crate::core::DetectorScore;
use crate::core::Escalation;
use crate::core::EscalationId;
use crate::core::EscalationStatus;
use crate::core::EvaluationRun;
use crate::core::HumanReviewAction;
use crate::core::NewActor;
use crate::core::NewApproval;
use crate::core::NewApprovalAttempt;
use crate::core::NewEscalation;
use crate::core::NewEvaluationRun;
use crate::core::NewReviewAction;
use crate::core::NewRewriteCycle;
use crate::core::NewVersion;
use crate::core::ProjectId;
use crate::core::ReviewState;
use crate::core::ReviewTransition;
use crate::core::RewriteCycle;
use crate::core::RunId;
use crate::core::RunStatus;
use crate::core::ScorerId;
use crate::core::StopReason;
use crate::core::Timestamp;
use crate::core::Version;
use crate::core::VersionId;
use crate::core::identifiers::ActorId;
use crate::error::EngineError;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Store errors shared by all storage traits.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages avoid embedding raw content bodies.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Storage backend is unavailable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Constraint race (duplicate key, concurrent transition).
    #[error("store conflict: {0}")]
    Conflict(String),
    /// Input violates a storage-enforced contract.
    #[error("store validation failed: {0}")]
    Validation(String),
    /// Referenced row does not exist.
    #[error("store row not found: {0}")]
    NotFound(String),
    /// Storage-boundary permission check failed (e.g. non-human approver).
    #[error("store forbidden: {0}")]
    Forbidden(String),
    /// Write-once or partial-immutability guard fired; indicates an engine bug.
    #[error("store invariant violation: {0}")]
    Invariant(String),
}

impl From<StoreError> for EngineError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable(message) => Self::Unavailable(message),
            StoreError::Conflict(message) => Self::Conflict(message),
            StoreError::Validation(message) => Self::Validation(message),
            StoreError::NotFound(message) => Self::Validation(message),
            StoreError::Forbidden(message) => Self::Forbidden {
                reason: message,
            },
            StoreError::Invariant(message) => Self::Internal(message),
        }
    }
}

// ============================================================================
// SECTION: Content Store
// ============================================================================

/// Content store owning blogs, versions, approvals, review audits, and
/// escalations.
///
/// # Invariants
/// - Version, approval, attempt, action, and transition rows are write-once.
/// - `record_approval` verifies the approver is human and the version belongs
///   to the blog at the storage boundary.
/// - "Current approval" and "escalated" are derived; no mutable flags exist.
pub trait ContentStore: Send + Sync {
    /// Registers a new actor.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when validation or uniqueness checks fail.
    fn create_actor(&self, new: NewActor) -> Result<Actor, StoreError>;

    /// Loads an actor by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get_actor(&self, id: ActorId) -> Result<Option<Actor>, StoreError>;

    /// Toggles an actor's `is_human` flag; only admins may do this.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Forbidden`] when `admin_id` is not an admin, and
    /// [`StoreError::Validation`] when the change would mark a system actor
    /// as human.
    fn set_actor_human(
        &self,
        admin_id: ActorId,
        actor_id: ActorId,
        is_human: bool,
    ) -> Result<Actor, StoreError>;

    /// Creates a blog with an immutable name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when the name is empty.
    fn create_blog(
        &self,
        name: &str,
        created_by: ActorId,
        project_id: Option<ProjectId>,
    ) -> Result<Blog, StoreError>;

    /// Loads a blog by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get_blog(&self, id: BlogId) -> Result<Option<Blog>, StoreError>;

    /// Appends an immutable version; the store computes the version number
    /// and content hash.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] on a concurrent version-number race
    /// and [`StoreError::Validation`] on contract violations (missing cycle
    /// id for AI rewrites, cross-blog parent).
    fn append_version(&self, new: NewVersion) -> Result<Version, StoreError>;

    /// Loads a version by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get_version(&self, id: VersionId) -> Result<Option<Version>, StoreError>;

    /// Lists versions of a blog ordered by `(version_number, created_at)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list_versions(&self, blog_id: BlogId) -> Result<Vec<Version>, StoreError>;

    /// Records an approval after storage-boundary checks. A repeat call with
    /// identical arguments while that approval is still current returns the
    /// existing row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Forbidden`] for non-human approvers and
    /// [`StoreError::Validation`] for version/blog mismatches.
    fn record_approval(&self, new: NewApproval) -> Result<ApprovalState, StoreError>;

    /// Revokes the current approval by inserting a revocation row pointing at
    /// its version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when no current approval exists.
    fn revoke_approval(
        &self,
        blog_id: BlogId,
        revoked_by: ActorId,
        reason: &str,
    ) -> Result<ApprovalState, StoreError>;

    /// Returns the current approval: the newest non-revoked approval row not
    /// superseded by a later revocation row for the same version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn current_approval(&self, blog_id: BlogId) -> Result<Option<ApprovalState>, StoreError>;

    /// Logs an approval attempt with its final result.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn log_attempt(&self, new: NewApprovalAttempt) -> Result<ApprovalAttempt, StoreError>;

    /// Lists approval attempts for a blog in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list_attempts(&self, blog_id: BlogId) -> Result<Vec<ApprovalAttempt>, StoreError>;

    /// Logs a human review action.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn log_review_action(&self, new: NewReviewAction) -> Result<HumanReviewAction, StoreError>;

    /// Appends a review state transition. The store rejects transitions whose
    /// `from_state` does not match the version's current derived state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] on a stale `from_state`.
    fn record_transition(
        &self,
        version_id: VersionId,
        from_state: ReviewState,
        to_state: ReviewState,
        actor_id: ActorId,
    ) -> Result<ReviewTransition, StoreError>;

    /// Returns the current derived review state of a version (`Draft` when no
    /// transition exists).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn current_review_state(&self, version_id: VersionId) -> Result<ReviewState, StoreError>;

    /// Returns the timestamp of the newest transition into review, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn review_started_at(&self, version_id: VersionId) -> Result<Option<Timestamp>, StoreError>;

    /// Counts submit-for-review events for a blog.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn count_review_cycles(&self, blog_id: BlogId) -> Result<u64, StoreError>;

    /// Counts rejections by a reviewer at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn count_rejections_since(
        &self,
        reviewer_id: ActorId,
        since: Timestamp,
    ) -> Result<u64, StoreError>;

    /// Counts fast-approval audit flags for a reviewer at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn count_fast_approvals_since(
        &self,
        reviewer_id: ActorId,
        since: Timestamp,
    ) -> Result<u64, StoreError>;

    /// Lists versions in review whose review started at or before `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn stale_reviews(&self, cutoff: Timestamp) -> Result<Vec<VersionId>, StoreError>;

    /// Opens an escalation in `PendingReview`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn open_escalation(&self, new: NewEscalation) -> Result<Escalation, StoreError>;

    /// Resolves or dismisses an escalation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when the escalation is already
    /// closed or the target status is `PendingReview`.
    fn resolve_escalation(
        &self,
        id: EscalationId,
        resolved_by: ActorId,
        status: EscalationStatus,
    ) -> Result<Escalation, StoreError>;

    /// Returns true when the blog has any open escalation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn is_escalated(&self, blog_id: BlogId) -> Result<bool, StoreError>;

    /// Lists escalations for a blog in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list_escalations(&self, blog_id: BlogId) -> Result<Vec<Escalation>, StoreError>;

    /// Reports store readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Evaluation Store
// ============================================================================

/// Evaluation store owning runs and their write-once score rows.
///
/// # Invariants
/// - Run columns other than `status`/`completed_at` are immutable; status
///   never moves backward; `completed_at` is write-once.
/// - Score rows are write-once and unique per `(run, provider)` /
///   `(run, query_intent)`.
pub trait EvaluationStore: Send + Sync {
    /// Inserts a new run in `Processing`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn insert_run(&self, new: NewEvaluationRun) -> Result<EvaluationRun, StoreError>;

    /// Loads a run by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get_run(&self, id: RunId) -> Result<Option<EvaluationRun>, StoreError>;

    /// Returns the processing run for a version, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn processing_run_for_version(
        &self,
        version_id: VersionId,
    ) -> Result<Option<EvaluationRun>, StoreError>;

    /// Finalizes a run: advances status out of `Processing` and stamps
    /// `completed_at` exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the run already left
    /// `Processing` and [`StoreError::Validation`] when `status` is
    /// `Processing`.
    fn finalize_run(
        &self,
        id: RunId,
        status: RunStatus,
        completed_at: Timestamp,
    ) -> Result<EvaluationRun, StoreError>;

    /// Inserts a detector score row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when `(run_id, provider)` exists.
    fn insert_detector_score(&self, score: DetectorScore) -> Result<(), StoreError>;

    /// Loads a detector score row by natural key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn detector_score(
        &self,
        run_id: RunId,
        provider: &str,
    ) -> Result<Option<DetectorScore>, StoreError>;

    /// Lists detector score rows for a run ordered by provider.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list_detector_scores(&self, run_id: RunId) -> Result<Vec<DetectorScore>, StoreError>;

    /// Inserts an AEO score row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when `(run_id, query_intent)` exists.
    fn insert_aeo_score(&self, score: AeoScore) -> Result<(), StoreError>;

    /// Loads an AEO score row by natural key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn aeo_score(
        &self,
        run_id: RunId,
        query_intent: &str,
    ) -> Result<Option<AeoScore>, StoreError>;

    /// Lists AEO score rows for a run ordered by query intent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list_aeo_scores(&self, run_id: RunId) -> Result<Vec<AeoScore>, StoreError>;

    /// Returns the newest fully completed run for any version of the blog
    /// whose `(run_at, id)` precedes the given run. Used as the regression
    /// baseline; partial-failure runs never serve as the baseline.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn previous_scored_run(
        &self,
        blog_id: BlogId,
        before: RunId,
    ) -> Result<Option<EvaluationRun>, StoreError>;

    /// Returns the newest finished run with scores for a specific version.
    /// Used by the rewrite orchestrator's trigger evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn latest_scored_run_for_version(
        &self,
        version_id: VersionId,
    ) -> Result<Option<EvaluationRun>, StoreError>;

    /// Reports store readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Rewrite Store
// ============================================================================

/// Rewrite store owning cycle rows.
///
/// # Invariants
/// - `(parent_version_id, cycle_number)` is unique; prompt, reasons, and
///   snapshots are write-once; status only advances from `Pending`.
pub trait RewriteStore: Send + Sync {
    /// Inserts a cycle with the next per-parent cycle number. A present
    /// `stop_reason` inserts the cycle directly as `Terminal`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] on a concurrent cycle-number race.
    fn insert_cycle(&self, new: NewRewriteCycle) -> Result<RewriteCycle, StoreError>;

    /// Loads a cycle by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn get_cycle(&self, id: CycleId) -> Result<Option<RewriteCycle>, StoreError>;

    /// Lists cycles for a parent version ordered by cycle number.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn cycles_for_parent(
        &self,
        parent_version_id: VersionId,
    ) -> Result<Vec<RewriteCycle>, StoreError>;

    /// Lists every cycle across a blog's versions ordered by `(created_at, id)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn cycles_for_blog(&self, blog_id: BlogId) -> Result<Vec<RewriteCycle>, StoreError>;

    /// Completes a pending cycle: links the child, freezes child scores, and
    /// records the trend.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the cycle is not pending.
    fn complete_cycle(&self, completion: CycleCompletion) -> Result<RewriteCycle, StoreError>;

    /// Terminates a pending cycle with a stop reason.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the cycle is not pending.
    fn terminate_cycle(
        &self,
        id: CycleId,
        stop_reason: StopReason,
    ) -> Result<RewriteCycle, StoreError>;

    /// Reports store readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Scorer Capability
// ============================================================================

/// Scorer metadata exposed by the registry.
///
/// # Invariants
/// - `version` is the frozen rubric version string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScorerMetadata {
    /// Human-readable scorer name.
    pub name: String,
    /// Scorer rubric version.
    pub version: String,
}

/// Detector finding produced by an AI-likeness style scorer.
///
/// # Invariants
/// - `score` lies in `[0, 100]`; `raw_response` preserves the full rubric
///   breakdown verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorFinding {
    /// Provider identifier for the `(run, provider)` key.
    pub provider: String,
    /// Score in `[0, 100]`.
    pub score: f64,
    /// Scorer model or rubric version string.
    pub model_version: String,
    /// Full raw scorer response.
    pub raw_response: Value,
    /// Scoring timestamp (RFC3339).
    pub timestamp: String,
}

/// AEO finding produced by the AEO scorer.
///
/// # Invariants
/// - `total_score` lies in `[0, 100]` with two-decimal precision.
#[derive(Debug, Clone, PartialEq)]
pub struct AeoFinding {
    /// Query intent the score answers for.
    pub query_intent: String,
    /// Total score in `[0, 100]`.
    pub total_score: f64,
    /// Structured per-pillar rationale.
    pub rationale: AeoRationale,
}

/// Output of one scorer invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ScorerOutput {
    /// AI-likeness style detector output.
    Detector(DetectorFinding),
    /// AEO rubric output.
    Aeo(AeoFinding),
}

/// Scorer errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScorerError {
    /// Input text violates the scorer contract.
    #[error("scorer validation failed: {0}")]
    Validation(String),
    /// Scoring-logic invariant violation (e.g. subscores exceed the cap).
    #[error("scorer internal error: {0}")]
    Internal(String),
}

/// Pluggable deterministic scorer capability.
///
/// # Invariants
/// - Same input text produces identical output aside from the timestamp.
/// - No I/O, no randomness, no logging inside `score`.
pub trait Scorer: Send + Sync {
    /// Returns the stable scorer identifier.
    fn id(&self) -> ScorerId;

    /// Returns scorer metadata.
    fn metadata(&self) -> ScorerMetadata;

    /// Scores the provided text.
    ///
    /// # Errors
    ///
    /// Returns [`ScorerError`] on contract violations or internal bugs.
    fn score(&self, text: &str) -> Result<ScorerOutput, ScorerError>;
}

// ============================================================================
// SECTION: Rewriter Capability
// ============================================================================

/// Rewriter errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RewriterError {
    /// The rewriter exceeded its deadline.
    #[error("rewriter timed out after {timeout_seconds}s")]
    Timeout {
        /// Deadline that was exceeded, in seconds.
        timeout_seconds: u64,
    },
    /// The rewriter failed.
    #[error("rewriter error: {0}")]
    Failed(String),
}

/// External rewrite capability.
///
/// # Invariants
/// - Implementations must honor the explicit timeout; the orchestrator never
///   waits longer than the deadline it passes.
pub trait Rewriter: Send + Sync {
    /// Generates a rewritten body for the provided verbatim prompt.
    ///
    /// # Errors
    ///
    /// Returns [`RewriterError`] on timeout or generation failure.
    fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, RewriterError>;
}

// ============================================================================
// SECTION: Workflow Runner Capability
// ============================================================================

/// Descriptor submitted with every background task.
///
/// # Invariants
/// - `idempotency_key` is unique per logical unit of work; resubmitting a
///   completed key must not re-execute the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescriptor {
    /// Idempotency key for at-least-once deduplication.
    pub idempotency_key: String,
    /// Maximum retry count after the first attempt.
    pub max_retries: u32,
    /// Deadline for a single attempt.
    pub timeout: Duration,
}

/// Task execution errors reported by jobs.
///
/// # Invariants
/// - `Retryable` failures may be re-attempted up to the descriptor's retry
///   budget; `Fatal` failures never retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Transient failure; the runner may retry.
    #[error("task failed (retryable): {0}")]
    Retryable(String),
    /// Permanent failure; the runner must not retry.
    #[error("task failed: {0}")]
    Fatal(String),
}

/// Job closure executed by the workflow runner.
///
/// Jobs must be idempotent when their descriptor allows retries.
pub type TaskJob = Box<dyn FnMut() -> Result<(), TaskError> + Send>;

/// Final outcome of a submitted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Job ran to completion.
    Completed,
    /// Job exhausted its retry budget or failed fatally.
    Failed(String),
    /// Idempotency key was already completed; the job did not run again.
    Deduplicated,
}

/// Joinable handle for a submitted task.
pub trait TaskHandle: Send {
    /// Blocks until the task reports its outcome.
    fn wait(&self) -> TaskOutcome;
}

/// Workflow runner errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunnerError {
    /// Queue is full; the caller should retry after the hint.
    #[error("workflow runner overloaded")]
    Overloaded {
        /// Optional retry delay hint in milliseconds.
        retry_after_ms: Option<u64>,
    },
    /// Runner is shutting down and no longer accepts work.
    #[error("workflow runner terminated")]
    Terminated,
    /// Descriptor is invalid.
    #[error("workflow runner invalid task: {0}")]
    Invalid(String),
}

impl From<RunnerError> for EngineError {
    fn from(error: RunnerError) -> Self {
        match error {
            RunnerError::Overloaded {
                ..
            }
            | RunnerError::Terminated => Self::Unavailable(error.to_string()),
            RunnerError::Invalid(message) => Self::Internal(message),
        }
    }
}

/// Background task runner with at-least-once delivery.
///
/// # Invariants
/// - Completed idempotency keys are not re-executed.
/// - Retries honor the descriptor's budget with backoff between attempts.
pub trait WorkflowRunner: Send + Sync {
    /// Submits a task for execution.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] when the task cannot be accepted.
    fn submit(
        &self,
        descriptor: TaskDescriptor,
        job: TaskJob,
    ) -> Result<Box<dyn TaskHandle>, RunnerError>;
}

// crates/quality-gate-core/src/runtime/review.rs
// ============================================================================
// Module: Review State Machine Service
// Description: Timer-gated, human-only review transitions with full audit.
// Purpose: Enforce the approval gates and record every attempt's final result.
// Dependencies: crate::core, crate::interfaces, crate::telemetry, serde_json
// ============================================================================

//! ## Overview
//! The review service drives the per-version state machine
//! `draft -> in_review -> {approved | rejected | archived}`. Approvals pass a
//! fixed gate sequence: human verification, version/blog match, state
//! machine, review timer, rubber-stamp detection, and the co-signature gate.
//! Every attempt is logged with its final result before the caller sees the
//! error, and eligibility snapshots are computed here so callers never
//! duplicate timer arithmetic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::core::Actor;
use crate::core::ActorRole;
use crate::core::ApprovalState;
use crate::core::AttemptResult;
use crate::core::BlogId;
use crate::core::Clock;
use crate::core::ContentSource;
use crate::core::EscalationReason;
use crate::core::NewApproval;
use crate::core::NewApprovalAttempt;
use crate::core::NewEscalation;
use crate::core::NewReviewAction;
use crate::core::NewVersion;
use crate::core::ReviewActionKind;
use crate::core::ReviewState;
use crate::core::ReviewTransition;
use crate::core::Timestamp;
use crate::core::Version;
use crate::core::VersionId;
use crate::core::identifiers::ActorId;
use crate::error::EngineError;
use crate::interfaces::ContentStore;
use crate::telemetry::TelemetryEvent;
use crate::telemetry::TelemetrySink;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Review service configuration.
///
/// # Invariants
/// - Durations are positive; limits are >= 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewConfig {
    /// Minimum time a version must sit in review before approve/reject.
    pub min_review_duration: Duration,
    /// Approvals faster than this after version creation are rubber-stamps.
    pub fast_approval_threshold: Duration,
    /// Submit-for-review events per blog before escalation.
    pub max_review_cycles_per_blog: u64,
    /// Minimum rationale length for approve/reject.
    pub min_rationale_length: usize,
    /// Window for counting a reviewer's fast approvals.
    pub fast_approval_window: Duration,
    /// Fast approvals inside the window before co-signature is required.
    pub cosign_fast_approval_limit: u64,
    /// Window for counting a reviewer's rejections.
    pub repeat_rejection_window: Duration,
    /// Rejections inside the window before escalation.
    pub repeat_rejection_limit: u64,
    /// Age after which an in-review version is auto-archived.
    pub stale_review_age: Duration,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            min_review_duration: Duration::from_secs(300),
            fast_approval_threshold: Duration::from_secs(30),
            max_review_cycles_per_blog: 5,
            min_rationale_length: 20,
            fast_approval_window: Duration::from_secs(24 * 60 * 60),
            cosign_fast_approval_limit: 3,
            repeat_rejection_window: Duration::from_secs(7 * 24 * 60 * 60),
            repeat_rejection_limit: 3,
            stale_review_age: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

// ============================================================================
// SECTION: Eligibility Snapshot
// ============================================================================

/// Authoritative review eligibility snapshot for a version.
///
/// # Invariants
/// - `remaining_seconds` is zero exactly when the timer gate is satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewEligibility {
    /// Current derived review state.
    pub state: ReviewState,
    /// Start of the current review window, when in review.
    pub review_started_at: Option<Timestamp>,
    /// Seconds left before approve/reject is permitted.
    pub remaining_seconds: u64,
    /// True when the state and timer both permit approve/reject.
    pub can_act: bool,
}

// ============================================================================
// SECTION: Review Service
// ============================================================================

/// Review state machine service.
///
/// # Invariants
/// - Every approve/reject attempt inserts exactly one attempt row with its
///   final result, including failures.
pub struct ReviewService {
    /// Content store owning all review rows.
    content: Arc<dyn ContentStore>,
    /// Injected clock.
    clock: Arc<dyn Clock>,
    /// Telemetry sink.
    telemetry: Arc<dyn TelemetrySink>,
    /// Review configuration.
    config: ReviewConfig,
}

/// Outcome of the ordered approval gate sequence.
struct GatePass {
    /// Whether the rubber-stamp threshold fired.
    fast: bool,
    /// Snapshot of the elapsed review duration in seconds.
    review_duration_seconds: u64,
}

/// First failing gate with its audit classification.
struct GateFailure {
    /// Attempt result recorded in the audit row.
    result: AttemptResult,
    /// Stable failure reason.
    reason: String,
    /// Remaining timer seconds for timer failures.
    retry_after_seconds: Option<u64>,
}

impl ReviewService {
    /// Creates a review service over the provided store.
    #[must_use]
    pub fn new(
        content: Arc<dyn ContentStore>,
        clock: Arc<dyn Clock>,
        telemetry: Arc<dyn TelemetrySink>,
        config: ReviewConfig,
    ) -> Self {
        Self {
            content,
            clock,
            telemetry,
            config,
        }
    }

    /// Submits a version for review, starting its review timer.
    ///
    /// Exceeding the per-blog review-cycle bound opens an escalation but does
    /// not block the submission; the open escalation is the hard-stop signal.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] when the version is not in
    /// `Draft` and [`EngineError::Validation`] for unknown rows.
    pub fn submit_for_review(
        &self,
        version_id: VersionId,
        actor_id: ActorId,
    ) -> Result<ReviewTransition, EngineError> {
        let version = self.require_version(version_id)?;
        let state = self.content.current_review_state(version_id)?;
        if !state.can_transition(ReviewState::InReview) {
            return Err(EngineError::InvalidState {
                reason: format!("cannot submit a {} version for review", state.as_str()),
                retry_after_seconds: None,
            });
        }
        let transition = self.content.record_transition(
            version_id,
            state,
            ReviewState::InReview,
            actor_id,
        )?;
        self.content.log_review_action(NewReviewAction {
            blog_id: version.blog_id,
            version_id,
            reviewer_id: actor_id,
            action: ReviewActionKind::SubmitForReview,
            comments: None,
            is_override: false,
        })?;
        self.telemetry.record(&TelemetryEvent::ReviewTransitioned {
            version_id,
            to_state: ReviewState::InReview,
        });

        let cycles = self.content.count_review_cycles(version.blog_id)?;
        if cycles > self.config.max_review_cycles_per_blog {
            self.escalate(
                version.blog_id,
                version_id,
                EscalationReason::PolicyViolation,
                json!({
                    "rule": "max_review_cycles_per_blog",
                    "count": cycles,
                    "limit": self.config.max_review_cycles_per_blog,
                }),
            )?;
        }
        Ok(transition)
    }

    /// Returns the authoritative eligibility snapshot for a version.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for unknown versions.
    pub fn eligibility(&self, version_id: VersionId) -> Result<ReviewEligibility, EngineError> {
        self.require_version(version_id)?;
        let state = self.content.current_review_state(version_id)?;
        let review_started_at = self.content.review_started_at(version_id)?;
        let remaining_seconds = match (state, review_started_at) {
            (ReviewState::InReview, Some(started)) => {
                let elapsed = self.clock.now().seconds_since(started);
                let required = self.config.min_review_duration.as_secs();
                required.saturating_sub(u64::try_from(elapsed).unwrap_or(0))
            }
            _ => 0,
        };
        Ok(ReviewEligibility {
            state,
            review_started_at,
            remaining_seconds,
            can_act: state == ReviewState::InReview && remaining_seconds == 0,
        })
    }

    /// Approves a version after the full gate sequence.
    ///
    /// A co-signing admin is required once the reviewer accumulated too many
    /// fast approvals inside the configured window.
    ///
    /// # Errors
    ///
    /// Returns the gate failure as [`EngineError`]; the attempt row is
    /// written with the same classification before this returns.
    pub fn approve(
        &self,
        blog_id: BlogId,
        version_id: VersionId,
        reviewer_id: ActorId,
        rationale: &str,
        cosigner_id: Option<ActorId>,
        notes: Option<String>,
    ) -> Result<ApprovalState, EngineError> {
        let version = self.require_version(version_id)?;
        let reviewer = self.require_actor(reviewer_id)?;
        let now = self.clock.now();

        let gates = self.approval_gates(
            &version,
            blog_id,
            &reviewer,
            rationale,
            cosigner_id,
            now,
            ReviewState::Approved,
        );
        match gates {
            Err(failure) => {
                self.log_attempt_outcome(blog_id, &reviewer, &failure)?;
                Err(self.gate_error(failure))
            }
            Ok(pass) => {
                self.log_attempt_success(blog_id, &reviewer)?;
                let state = self.content.current_review_state(version_id)?;
                self.content.record_transition(
                    version_id,
                    state,
                    ReviewState::Approved,
                    reviewer_id,
                )?;
                if pass.fast {
                    self.content.log_review_action(NewReviewAction {
                        blog_id,
                        version_id,
                        reviewer_id,
                        action: ReviewActionKind::FastApprovalFlag,
                        comments: Some(
                            json!({
                                "age_seconds": now.seconds_since(version.created_at),
                                "threshold_seconds":
                                    self.config.fast_approval_threshold.as_secs(),
                            })
                            .to_string(),
                        ),
                        is_override: false,
                    })?;
                }
                self.content.log_review_action(NewReviewAction {
                    blog_id,
                    version_id,
                    reviewer_id,
                    action: ReviewActionKind::ApproveIntent,
                    comments: Some(
                        json!({
                            "rationale": rationale,
                            "review_duration_seconds": pass.review_duration_seconds,
                        })
                        .to_string(),
                    ),
                    is_override: false,
                })?;
                let approval_notes = if pass.fast {
                    Some("fast approval".to_string())
                } else {
                    notes
                };
                let approval = self.content.record_approval(NewApproval {
                    blog_id,
                    approved_version_id: version_id,
                    approver_id: reviewer_id,
                    notes: approval_notes,
                })?;
                self.telemetry.record(&TelemetryEvent::ReviewTransitioned {
                    version_id,
                    to_state: ReviewState::Approved,
                });
                Ok(approval)
            }
        }
    }

    /// Rejects a version after the shared gate sequence; terminal.
    ///
    /// # Errors
    ///
    /// Returns the gate failure as [`EngineError`]; the attempt row is
    /// written with the same classification before this returns.
    pub fn reject(
        &self,
        blog_id: BlogId,
        version_id: VersionId,
        reviewer_id: ActorId,
        rationale: &str,
    ) -> Result<ReviewTransition, EngineError> {
        let version = self.require_version(version_id)?;
        let reviewer = self.require_actor(reviewer_id)?;
        let now = self.clock.now();

        let gates = self.approval_gates(
            &version,
            blog_id,
            &reviewer,
            rationale,
            None,
            now,
            ReviewState::Rejected,
        );
        match gates {
            Err(failure) => {
                self.log_attempt_outcome(blog_id, &reviewer, &failure)?;
                Err(self.gate_error(failure))
            }
            Ok(pass) => {
                self.log_attempt_success(blog_id, &reviewer)?;
                let state = self.content.current_review_state(version_id)?;
                let transition = self.content.record_transition(
                    version_id,
                    state,
                    ReviewState::Rejected,
                    reviewer_id,
                )?;
                self.content.log_review_action(NewReviewAction {
                    blog_id,
                    version_id,
                    reviewer_id,
                    action: ReviewActionKind::Reject,
                    comments: Some(
                        json!({
                            "rationale": rationale,
                            "review_duration_seconds": pass.review_duration_seconds,
                        })
                        .to_string(),
                    ),
                    is_override: false,
                })?;
                self.telemetry.record(&TelemetryEvent::ReviewTransitioned {
                    version_id,
                    to_state: ReviewState::Rejected,
                });

                let since = now.saturating_sub(self.config.repeat_rejection_window);
                let rejections = self.content.count_rejections_since(reviewer_id, since)?;
                if rejections >= self.config.repeat_rejection_limit {
                    self.escalate(
                        blog_id,
                        version_id,
                        EscalationReason::Ambiguity,
                        json!({
                            "rule": "repeat_rejections",
                            "reviewer_id": reviewer_id,
                            "count": rejections,
                            "limit": self.config.repeat_rejection_limit,
                        }),
                    )?;
                }
                Ok(transition)
            }
        }
    }

    /// Records an audited override approval.
    ///
    /// The override path bypasses the review timer and co-signature gates
    /// but still requires a human actor, a version in review, and both the
    /// justification and the risk acceptance note.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when either note is missing and
    /// the usual gate failures otherwise.
    pub fn request_override(
        &self,
        blog_id: BlogId,
        version_id: VersionId,
        actor_id: ActorId,
        justification: &str,
        risk_acceptance_note: &str,
    ) -> Result<ApprovalState, EngineError> {
        if justification.trim().is_empty() {
            return Err(EngineError::Validation("override justification is required".to_string()));
        }
        if risk_acceptance_note.trim().is_empty() {
            return Err(EngineError::Validation(
                "override risk acceptance note is required".to_string(),
            ));
        }
        let version = self.require_version(version_id)?;
        let actor = self.require_actor(actor_id)?;

        if !actor.is_human {
            let failure = GateFailure {
                result: AttemptResult::Forbidden,
                reason: "User is not marked as human".to_string(),
                retry_after_seconds: None,
            };
            self.log_attempt_outcome(blog_id, &actor, &failure)?;
            return Err(self.gate_error(failure));
        }
        if version.blog_id != blog_id {
            let failure = GateFailure {
                result: AttemptResult::InvalidVersion,
                reason: format!("version {version_id} does not belong to blog {blog_id}"),
                retry_after_seconds: None,
            };
            self.log_attempt_outcome(blog_id, &actor, &failure)?;
            return Err(self.gate_error(failure));
        }
        let state = self.content.current_review_state(version_id)?;
        if !state.can_transition(ReviewState::Approved) {
            let failure = GateFailure {
                result: AttemptResult::InvalidState,
                reason: format!("cannot override-approve a {} version", state.as_str()),
                retry_after_seconds: None,
            };
            self.log_attempt_outcome(blog_id, &actor, &failure)?;
            return Err(self.gate_error(failure));
        }

        self.log_attempt_success(blog_id, &actor)?;
        self.content.record_transition(version_id, state, ReviewState::Approved, actor_id)?;
        self.content.log_review_action(NewReviewAction {
            blog_id,
            version_id,
            reviewer_id: actor_id,
            action: ReviewActionKind::Override,
            comments: Some(
                json!({
                    "justification": justification,
                    "risk_acceptance_note": risk_acceptance_note,
                })
                .to_string(),
            ),
            is_override: true,
        })?;
        let approval = self.content.record_approval(NewApproval {
            blog_id,
            approved_version_id: version_id,
            approver_id: actor_id,
            notes: Some("override".to_string()),
        })?;
        self.telemetry.record(&TelemetryEvent::ReviewTransitioned {
            version_id,
            to_state: ReviewState::Approved,
        });
        Ok(approval)
    }

    /// Appends a human edit of a version that is currently in review.
    ///
    /// The in-review version keeps its state; the new version starts in
    /// `Draft` with a fresh review timer.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidState`] when the version is not in
    /// review.
    pub fn edit_during_review(
        &self,
        version_id: VersionId,
        content: String,
        actor_id: ActorId,
        change_reason: Option<String>,
    ) -> Result<Version, EngineError> {
        let version = self.require_version(version_id)?;
        let state = self.content.current_review_state(version_id)?;
        if state != ReviewState::InReview {
            return Err(EngineError::InvalidState {
                reason: format!("version {version_id} is {} and cannot be edited in review", state.as_str()),
                retry_after_seconds: None,
            });
        }
        let edited = self.content.append_version(NewVersion {
            blog_id: version.blog_id,
            content,
            source: ContentSource::HumanEdit,
            parent_version_id: Some(version_id),
            source_rewrite_cycle_id: None,
            change_reason,
            created_by: actor_id,
        })?;
        Ok(edited)
    }

    /// Archives every version that sat in review past the stale age.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] conversions when transitions fail.
    pub fn archive_stale_reviews(&self, actor_id: ActorId) -> Result<Vec<VersionId>, EngineError> {
        let cutoff = self.clock.now().saturating_sub(self.config.stale_review_age);
        let stale = self.content.stale_reviews(cutoff)?;
        let mut archived = Vec::with_capacity(stale.len());
        for version_id in stale {
            self.content.record_transition(
                version_id,
                ReviewState::InReview,
                ReviewState::Archived,
                actor_id,
            )?;
            self.telemetry.record(&TelemetryEvent::ReviewTransitioned {
                version_id,
                to_state: ReviewState::Archived,
            });
            archived.push(version_id);
        }
        Ok(archived)
    }

    // ------------------------------------------------------------------
    // Gate evaluation
    // ------------------------------------------------------------------

    /// Runs the ordered gate sequence shared by approve and reject.
    #[allow(clippy::too_many_arguments, reason = "Gate inputs are intentionally explicit.")]
    fn approval_gates(
        &self,
        version: &Version,
        blog_id: BlogId,
        reviewer: &Actor,
        rationale: &str,
        cosigner_id: Option<ActorId>,
        now: Timestamp,
        target: ReviewState,
    ) -> Result<GatePass, GateFailure> {
        if !reviewer.is_human {
            return Err(GateFailure {
                result: AttemptResult::Forbidden,
                reason: "User is not marked as human".to_string(),
                retry_after_seconds: None,
            });
        }
        if version.blog_id != blog_id {
            return Err(GateFailure {
                result: AttemptResult::InvalidVersion,
                reason: format!("version {} does not belong to blog {blog_id}", version.id),
                retry_after_seconds: None,
            });
        }
        let state = self
            .content
            .current_review_state(version.id)
            .map_err(|err| GateFailure {
                result: AttemptResult::InvalidState,
                reason: err.to_string(),
                retry_after_seconds: None,
            })?;
        if !state.can_transition(target) {
            return Err(GateFailure {
                result: AttemptResult::InvalidState,
                reason: format!("state {} does not permit {}", state.as_str(), target.as_str()),
                retry_after_seconds: None,
            });
        }
        let started = self
            .content
            .review_started_at(version.id)
            .map_err(|err| GateFailure {
                result: AttemptResult::InvalidState,
                reason: err.to_string(),
                retry_after_seconds: None,
            })?
            .ok_or_else(|| GateFailure {
                result: AttemptResult::InvalidState,
                reason: "review has not started".to_string(),
                retry_after_seconds: None,
            })?;
        let elapsed = u64::try_from(now.seconds_since(started)).unwrap_or(0);
        let required = self.config.min_review_duration.as_secs();
        if elapsed < required {
            return Err(GateFailure {
                result: AttemptResult::InvalidState,
                reason: "timer".to_string(),
                retry_after_seconds: Some(required - elapsed),
            });
        }
        let fast = target == ReviewState::Approved
            && now.seconds_since(version.created_at)
                < i64::try_from(self.config.fast_approval_threshold.as_secs()).unwrap_or(i64::MAX);

        if target == ReviewState::Approved {
            let since = now.saturating_sub(self.config.fast_approval_window);
            let fast_count = self
                .content
                .count_fast_approvals_since(reviewer.id, since)
                .map_err(|err| GateFailure {
                    result: AttemptResult::InvalidState,
                    reason: err.to_string(),
                    retry_after_seconds: None,
                })?;
            if fast_count >= self.config.cosign_fast_approval_limit
                && !self.cosigner_is_senior(cosigner_id)
            {
                return Err(GateFailure {
                    result: AttemptResult::Forbidden,
                    reason: "cosign_required".to_string(),
                    retry_after_seconds: None,
                });
            }
        }

        // The rationale is the final gate: a co-signature refusal must win
        // over a short rationale.
        if rationale.trim().len() < self.config.min_rationale_length {
            return Err(GateFailure {
                result: AttemptResult::InvalidState,
                reason: format!(
                    "rationale too short (min {} chars)",
                    self.config.min_rationale_length
                ),
                retry_after_seconds: None,
            });
        }

        Ok(GatePass {
            fast,
            review_duration_seconds: elapsed,
        })
    }

    /// Returns true when the co-signer is a human admin.
    fn cosigner_is_senior(&self, cosigner_id: Option<ActorId>) -> bool {
        let Some(id) = cosigner_id else {
            return false;
        };
        matches!(
            self.content.get_actor(id),
            Ok(Some(actor)) if actor.is_human && actor.role == ActorRole::Admin
        )
    }

    // ------------------------------------------------------------------
    // Audit helpers
    // ------------------------------------------------------------------

    /// Logs a failed attempt with its final classification.
    fn log_attempt_outcome(
        &self,
        blog_id: BlogId,
        actor: &Actor,
        failure: &GateFailure,
    ) -> Result<(), EngineError> {
        self.content.log_attempt(NewApprovalAttempt {
            blog_id,
            attempted_by: actor.id,
            is_human_snapshot: actor.is_human,
            result: failure.result,
            failure_reason: Some(failure.reason.clone()),
        })?;
        self.telemetry.record(&TelemetryEvent::ApprovalAttempted {
            blog_id,
            attempted_by: actor.id,
            result: failure.result,
        });
        Ok(())
    }

    /// Logs a successful attempt.
    fn log_attempt_success(&self, blog_id: BlogId, actor: &Actor) -> Result<(), EngineError> {
        self.content.log_attempt(NewApprovalAttempt {
            blog_id,
            attempted_by: actor.id,
            is_human_snapshot: actor.is_human,
            result: AttemptResult::Success,
            failure_reason: None,
        })?;
        self.telemetry.record(&TelemetryEvent::ApprovalAttempted {
            blog_id,
            attempted_by: actor.id,
            result: AttemptResult::Success,
        });
        Ok(())
    }

    /// Converts a gate failure into the matching engine error.
    fn gate_error(&self, failure: GateFailure) -> EngineError {
        match failure.result {
            AttemptResult::Forbidden => EngineError::Forbidden {
                reason: failure.reason,
            },
            AttemptResult::InvalidVersion => EngineError::InvalidVersion(failure.reason),
            AttemptResult::InvalidState | AttemptResult::Success => EngineError::InvalidState {
                reason: failure.reason,
                retry_after_seconds: failure.retry_after_seconds,
            },
        }
    }

    /// Opens an escalation and emits its telemetry event.
    fn escalate(
        &self,
        blog_id: BlogId,
        version_id: VersionId,
        reason: EscalationReason,
        details: serde_json::Value,
    ) -> Result<(), EngineError> {
        self.content.open_escalation(NewEscalation {
            blog_id,
            version_id,
            reason,
            details,
        })?;
        self.telemetry.record(&TelemetryEvent::EscalationOpened {
            blog_id,
            reason,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Loads a version or fails with `validation`.
    fn require_version(&self, version_id: VersionId) -> Result<Version, EngineError> {
        self.content
            .get_version(version_id)?
            .ok_or_else(|| EngineError::Validation(format!("unknown version: {version_id}")))
    }

    /// Loads an actor or fails with `validation`.
    fn require_actor(&self, actor_id: ActorId) -> Result<Actor, EngineError> {
        self.content
            .get_actor(actor_id)?
            .ok_or_else(|| EngineError::Validation(format!("unknown actor: {actor_id}")))
    }
}

// crates/quality-gate-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Quality Store
// Description: Reference store implementation with full invariant checks.
// Purpose: Provide a deterministic storage backend for engine tests and examples.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The in-memory store implements every storage trait with the same
//! semantics the durable store enforces: write-once rows, partial
//! immutability on runs, derived review state, and the append-only approval
//! model. Row identifiers are 1-based insertion indices, matching the
//! durable store's rowid behavior.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::Actor;
use crate::core::ActorRole;
use crate::core::AeoScore;
use crate::core::ApprovalAttempt;
use crate::core::ApprovalState;
use crate::core::Blog;
use crate::core::BlogId;
use crate::core::Clock;
use crate::core::ContentSource;
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
use crate::core::ReviewActionKind;
use crate::core::ReviewState;
use crate::core::ReviewTransition;
use crate::core::RewriteCycle;
use crate::core::RewriteStatus;
use crate::core::RunId;
use crate::core::RunStatus;
use crate::core::StopReason;
use crate::core::Timestamp;
use crate::core::Version;
use crate::core::VersionId;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::hash_bytes;
use crate::core::identifiers::ActorId;
use crate::core::identifiers::ApprovalId;
use crate::interfaces::ContentStore;
use crate::interfaces::EvaluationStore;
use crate::interfaces::RewriteStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: State
// ============================================================================

/// Mutable store state guarded by one mutex.
#[derive(Default)]
struct MemoryState {
    /// Actor registry rows.
    actors: Vec<Actor>,
    /// Blog rows.
    blogs: Vec<Blog>,
    /// Version rows (write-once).
    versions: Vec<Version>,
    /// Approval rows (write-once, revocation by companion row).
    approvals: Vec<ApprovalState>,
    /// Approval attempt audit rows.
    attempts: Vec<ApprovalAttempt>,
    /// Human review action rows.
    actions: Vec<HumanReviewAction>,
    /// Review transition rows.
    transitions: Vec<ReviewTransition>,
    /// Escalation rows.
    escalations: Vec<Escalation>,
    /// Evaluation run rows (partially immutable).
    runs: Vec<EvaluationRun>,
    /// Detector score rows (write-once).
    detector_scores: Vec<DetectorScore>,
    /// AEO score rows (write-once).
    aeo_scores: Vec<AeoScore>,
    /// Rewrite cycle rows.
    cycles: Vec<RewriteCycle>,
}

/// In-memory store implementing every storage trait.
///
/// # Invariants
/// - All mutation goes through one mutex; row identifiers are 1-based
///   insertion indices and never reused.
pub struct InMemoryStore {
    /// Injected clock used to stamp rows.
    clock: Arc<dyn Clock>,
    /// Guarded state.
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    /// Creates an empty store stamping rows from the provided clock.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Locks the state, mapping poisoning onto `Unavailable`.
    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }

    /// Returns the next 1-based identifier for a row vector.
    fn next_id<T>(rows: &[T]) -> Result<u64, StoreError> {
        u64::try_from(rows.len() + 1)
            .map_err(|_| StoreError::Invariant("row identifier overflow".to_string()))
    }
}

// ============================================================================
// SECTION: Derived Queries
// ============================================================================

/// Computes the current approval under the append-only revocation model.
fn current_approval_of(state: &MemoryState, blog_id: BlogId) -> Option<ApprovalState> {
    let rows: Vec<&ApprovalState> =
        state.approvals.iter().filter(|row| row.blog_id == blog_id).collect();
    rows.iter()
        .filter(|row| row.revoked_at.is_none())
        .filter(|row| {
            // A later revocation row for the same version supersedes this
            // approval.
            !rows.iter().any(|other| {
                other.revoked_at.is_some()
                    && other.approved_version_id == row.approved_version_id
                    && other.id > row.id
            })
        })
        .max_by_key(|row| (row.approved_at, row.id))
        .map(|row| (*row).clone())
}

/// Returns the derived review state of a version.
fn review_state_of(state: &MemoryState, version_id: VersionId) -> ReviewState {
    state
        .transitions
        .iter()
        .rev()
        .find(|transition| transition.version_id == version_id)
        .map_or(ReviewState::Draft, |transition| transition.to_state)
}

/// Returns the start of the newest review window of a version.
fn review_started_of(state: &MemoryState, version_id: VersionId) -> Option<Timestamp> {
    state
        .transitions
        .iter()
        .rev()
        .find(|transition| {
            transition.version_id == version_id && transition.to_state == ReviewState::InReview
        })
        .map(|transition| transition.occurred_at)
}

/// Returns the blog owning a version, when known.
fn blog_of_version(state: &MemoryState, version_id: VersionId) -> Option<BlogId> {
    state
        .versions
        .iter()
        .find(|version| version.id == version_id)
        .map(|version| version.blog_id)
}

// ============================================================================
// SECTION: Content Store Implementation
// ============================================================================

impl ContentStore for InMemoryStore {
    fn create_actor(&self, new: NewActor) -> Result<Actor, StoreError> {
        if new.email.trim().is_empty() {
            return Err(StoreError::Validation("actor email must not be empty".to_string()));
        }
        if new.role == ActorRole::System && new.is_human {
            return Err(StoreError::Validation(
                "system actors cannot be marked human".to_string(),
            ));
        }
        let mut state = self.lock()?;
        if state.actors.iter().any(|actor| actor.email == new.email) {
            return Err(StoreError::Conflict(format!("actor email exists: {}", new.email)));
        }
        let id = ActorId::from_raw(Self::next_id(&state.actors)?)
            .ok_or_else(|| StoreError::Invariant("zero actor id".to_string()))?;
        let actor = Actor {
            id,
            email: new.email,
            role: new.role,
            is_human: new.is_human,
            created_at: self.clock.now(),
        };
        state.actors.push(actor.clone());
        Ok(actor)
    }

    fn get_actor(&self, id: ActorId) -> Result<Option<Actor>, StoreError> {
        let state = self.lock()?;
        Ok(state.actors.iter().find(|actor| actor.id == id).cloned())
    }

    fn set_actor_human(
        &self,
        admin_id: ActorId,
        actor_id: ActorId,
        is_human: bool,
    ) -> Result<Actor, StoreError> {
        let mut state = self.lock()?;
        let admin = state
            .actors
            .iter()
            .find(|actor| actor.id == admin_id)
            .ok_or_else(|| StoreError::NotFound(format!("actor {admin_id}")))?;
        if admin.role != ActorRole::Admin {
            return Err(StoreError::Forbidden(format!(
                "actor {admin_id} is not an admin and cannot toggle is_human"
            )));
        }
        let actor = state
            .actors
            .iter_mut()
            .find(|actor| actor.id == actor_id)
            .ok_or_else(|| StoreError::NotFound(format!("actor {actor_id}")))?;
        if actor.role == ActorRole::System && is_human {
            return Err(StoreError::Validation(
                "system actors cannot be marked human".to_string(),
            ));
        }
        actor.is_human = is_human;
        Ok(actor.clone())
    }

    fn create_blog(
        &self,
        name: &str,
        created_by: ActorId,
        project_id: Option<ProjectId>,
    ) -> Result<Blog, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::Validation("blog name must not be empty".to_string()));
        }
        let mut state = self.lock()?;
        let id = BlogId::from_raw(Self::next_id(&state.blogs)?)
            .ok_or_else(|| StoreError::Invariant("zero blog id".to_string()))?;
        let blog = Blog {
            id,
            name: name.to_string(),
            created_by,
            created_at: self.clock.now(),
            project_id,
        };
        state.blogs.push(blog.clone());
        Ok(blog)
    }

    fn get_blog(&self, id: BlogId) -> Result<Option<Blog>, StoreError> {
        let state = self.lock()?;
        Ok(state.blogs.iter().find(|blog| blog.id == id).cloned())
    }

    fn append_version(&self, new: NewVersion) -> Result<Version, StoreError> {
        let mut state = self.lock()?;
        if !state.blogs.iter().any(|blog| blog.id == new.blog_id) {
            return Err(StoreError::NotFound(format!("blog {}", new.blog_id)));
        }
        match (new.source, new.source_rewrite_cycle_id) {
            (ContentSource::AiRewrite, None) => {
                return Err(StoreError::Validation(
                    "ai_rewrite versions require a source rewrite cycle".to_string(),
                ));
            }
            (ContentSource::HumanPaste | ContentSource::HumanEdit, Some(_)) => {
                return Err(StoreError::Validation(
                    "only ai_rewrite versions may reference a rewrite cycle".to_string(),
                ));
            }
            _ => {}
        }

        let version_number = state
            .versions
            .iter()
            .filter(|version| version.blog_id == new.blog_id)
            .map(|version| version.version_number)
            .max()
            .unwrap_or(0)
            + 1;
        match new.parent_version_id {
            None if version_number > 1 => {
                return Err(StoreError::Validation(
                    "only the root version may omit a parent".to_string(),
                ));
            }
            Some(_) if version_number == 1 => {
                return Err(StoreError::Validation(
                    "the root version cannot have a parent".to_string(),
                ));
            }
            Some(parent_id) => {
                let parent = state
                    .versions
                    .iter()
                    .find(|version| version.id == parent_id)
                    .ok_or_else(|| StoreError::NotFound(format!("version {parent_id}")))?;
                if parent.blog_id != new.blog_id {
                    return Err(StoreError::Validation(format!(
                        "parent version {parent_id} belongs to a different blog"
                    )));
                }
            }
            None => {}
        }

        let id = VersionId::from_raw(Self::next_id(&state.versions)?)
            .ok_or_else(|| StoreError::Invariant("zero version id".to_string()))?;
        let version = Version {
            id,
            blog_id: new.blog_id,
            parent_version_id: new.parent_version_id,
            content_hash: hash_bytes(DEFAULT_HASH_ALGORITHM, new.content.as_bytes()),
            content: new.content,
            version_number,
            source: new.source,
            source_rewrite_cycle_id: new.source_rewrite_cycle_id,
            change_reason: new.change_reason,
            created_by: new.created_by,
            created_at: self.clock.now(),
        };
        state.versions.push(version.clone());
        Ok(version)
    }

    fn get_version(&self, id: VersionId) -> Result<Option<Version>, StoreError> {
        let state = self.lock()?;
        Ok(state.versions.iter().find(|version| version.id == id).cloned())
    }

    fn list_versions(&self, blog_id: BlogId) -> Result<Vec<Version>, StoreError> {
        let state = self.lock()?;
        let mut versions: Vec<Version> = state
            .versions
            .iter()
            .filter(|version| version.blog_id == blog_id)
            .cloned()
            .collect();
        versions.sort_by_key(|version| (version.version_number, version.created_at));
        Ok(versions)
    }

    fn record_approval(&self, new: NewApproval) -> Result<ApprovalState, StoreError> {
        let mut state = self.lock()?;
        let approver = state
            .actors
            .iter()
            .find(|actor| actor.id == new.approver_id)
            .ok_or_else(|| StoreError::NotFound(format!("actor {}", new.approver_id)))?;
        if !approver.is_human {
            return Err(StoreError::Forbidden("User is not marked as human".to_string()));
        }
        let belongs = state
            .versions
            .iter()
            .any(|version| version.id == new.approved_version_id && version.blog_id == new.blog_id);
        if !belongs {
            return Err(StoreError::Validation(format!(
                "version {} does not belong to blog {}",
                new.approved_version_id, new.blog_id
            )));
        }
        if let Some(current) = current_approval_of(&state, new.blog_id)
            && current.approved_version_id == new.approved_version_id
            && current.approver_id == new.approver_id
        {
            // Idempotent repeat of the same logical approval.
            return Ok(current);
        }
        let id = ApprovalId::from_raw(Self::next_id(&state.approvals)?)
            .ok_or_else(|| StoreError::Invariant("zero approval id".to_string()))?;
        let approval = ApprovalState {
            id,
            blog_id: new.blog_id,
            approved_version_id: new.approved_version_id,
            approver_id: new.approver_id,
            approved_at: self.clock.now(),
            revoked_at: None,
            revoked_by: None,
            revocation_reason: None,
            notes: new.notes,
        };
        state.approvals.push(approval.clone());
        Ok(approval)
    }

    fn revoke_approval(
        &self,
        blog_id: BlogId,
        revoked_by: ActorId,
        reason: &str,
    ) -> Result<ApprovalState, StoreError> {
        let mut state = self.lock()?;
        let current = current_approval_of(&state, blog_id).ok_or_else(|| {
            StoreError::Validation(format!("blog {blog_id} has no current approval to revoke"))
        })?;
        let id = ApprovalId::from_raw(Self::next_id(&state.approvals)?)
            .ok_or_else(|| StoreError::Invariant("zero approval id".to_string()))?;
        let now = self.clock.now();
        let revocation = ApprovalState {
            id,
            blog_id,
            approved_version_id: current.approved_version_id,
            approver_id: revoked_by,
            approved_at: now,
            revoked_at: Some(now),
            revoked_by: Some(revoked_by),
            revocation_reason: Some(reason.to_string()),
            notes: None,
        };
        state.approvals.push(revocation.clone());
        Ok(revocation)
    }

    fn current_approval(&self, blog_id: BlogId) -> Result<Option<ApprovalState>, StoreError> {
        let state = self.lock()?;
        Ok(current_approval_of(&state, blog_id))
    }

    fn log_attempt(&self, new: NewApprovalAttempt) -> Result<ApprovalAttempt, StoreError> {
        let mut state = self.lock()?;
        let attempt = ApprovalAttempt {
            blog_id: new.blog_id,
            attempted_by: new.attempted_by,
            is_human_snapshot: new.is_human_snapshot,
            result: new.result,
            attempted_at: self.clock.now(),
            failure_reason: new.failure_reason,
        };
        state.attempts.push(attempt.clone());
        Ok(attempt)
    }

    fn list_attempts(&self, blog_id: BlogId) -> Result<Vec<ApprovalAttempt>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .attempts
            .iter()
            .filter(|attempt| attempt.blog_id == blog_id)
            .cloned()
            .collect())
    }

    fn log_review_action(&self, new: NewReviewAction) -> Result<HumanReviewAction, StoreError> {
        let mut state = self.lock()?;
        let action = HumanReviewAction {
            blog_id: new.blog_id,
            version_id: new.version_id,
            reviewer_id: new.reviewer_id,
            action: new.action,
            comments: new.comments,
            is_override: new.is_override,
            occurred_at: self.clock.now(),
        };
        state.actions.push(action.clone());
        Ok(action)
    }

    fn record_transition(
        &self,
        version_id: VersionId,
        from_state: ReviewState,
        to_state: ReviewState,
        actor_id: ActorId,
    ) -> Result<ReviewTransition, StoreError> {
        let mut state = self.lock()?;
        if !state.versions.iter().any(|version| version.id == version_id) {
            return Err(StoreError::NotFound(format!("version {version_id}")));
        }
        let current = review_state_of(&state, version_id);
        if current != from_state {
            return Err(StoreError::Conflict(format!(
                "version {version_id} is {} (expected {})",
                current.as_str(),
                from_state.as_str()
            )));
        }
        if !from_state.can_transition(to_state) {
            return Err(StoreError::Validation(format!(
                "transition {} -> {} is not permitted",
                from_state.as_str(),
                to_state.as_str()
            )));
        }
        let transition = ReviewTransition {
            version_id,
            from_state,
            to_state,
            actor_id,
            occurred_at: self.clock.now(),
        };
        state.transitions.push(transition.clone());
        Ok(transition)
    }

    fn current_review_state(&self, version_id: VersionId) -> Result<ReviewState, StoreError> {
        let state = self.lock()?;
        Ok(review_state_of(&state, version_id))
    }

    fn review_started_at(&self, version_id: VersionId) -> Result<Option<Timestamp>, StoreError> {
        let state = self.lock()?;
        Ok(review_started_of(&state, version_id))
    }

    fn count_review_cycles(&self, blog_id: BlogId) -> Result<u64, StoreError> {
        let state = self.lock()?;
        let count = state
            .actions
            .iter()
            .filter(|action| {
                action.blog_id == blog_id && action.action == ReviewActionKind::SubmitForReview
            })
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    fn count_rejections_since(
        &self,
        reviewer_id: ActorId,
        since: Timestamp,
    ) -> Result<u64, StoreError> {
        let state = self.lock()?;
        let count = state
            .actions
            .iter()
            .filter(|action| {
                action.reviewer_id == reviewer_id
                    && action.action == ReviewActionKind::Reject
                    && action.occurred_at >= since
            })
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    fn count_fast_approvals_since(
        &self,
        reviewer_id: ActorId,
        since: Timestamp,
    ) -> Result<u64, StoreError> {
        let state = self.lock()?;
        let count = state
            .actions
            .iter()
            .filter(|action| {
                action.reviewer_id == reviewer_id
                    && action.action == ReviewActionKind::FastApprovalFlag
                    && action.occurred_at >= since
            })
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    fn stale_reviews(&self, cutoff: Timestamp) -> Result<Vec<VersionId>, StoreError> {
        let state = self.lock()?;
        let mut stale = Vec::new();
        for version in &state.versions {
            if review_state_of(&state, version.id) != ReviewState::InReview {
                continue;
            }
            if let Some(started) = review_started_of(&state, version.id)
                && started <= cutoff
            {
                stale.push(version.id);
            }
        }
        Ok(stale)
    }

    fn open_escalation(&self, new: NewEscalation) -> Result<Escalation, StoreError> {
        let mut state = self.lock()?;
        let id = EscalationId::from_raw(Self::next_id(&state.escalations)?)
            .ok_or_else(|| StoreError::Invariant("zero escalation id".to_string()))?;
        let escalation = Escalation {
            id,
            blog_id: new.blog_id,
            version_id: new.version_id,
            reason: new.reason,
            details: new.details,
            status: EscalationStatus::PendingReview,
            created_at: self.clock.now(),
            resolved_at: None,
            resolved_by: None,
        };
        state.escalations.push(escalation.clone());
        Ok(escalation)
    }

    fn resolve_escalation(
        &self,
        id: EscalationId,
        resolved_by: ActorId,
        status: EscalationStatus,
    ) -> Result<Escalation, StoreError> {
        if status == EscalationStatus::PendingReview {
            return Err(StoreError::Validation(
                "escalations cannot be resolved back to pending_review".to_string(),
            ));
        }
        let now = self.clock.now();
        let mut state = self.lock()?;
        let escalation = state
            .escalations
            .iter_mut()
            .find(|escalation| escalation.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("escalation {id}")))?;
        if escalation.status != EscalationStatus::PendingReview {
            return Err(StoreError::Validation(format!("escalation {id} is already closed")));
        }
        escalation.status = status;
        escalation.resolved_at = Some(now);
        escalation.resolved_by = Some(resolved_by);
        Ok(escalation.clone())
    }

    fn is_escalated(&self, blog_id: BlogId) -> Result<bool, StoreError> {
        let state = self.lock()?;
        Ok(state.escalations.iter().any(|escalation| {
            escalation.blog_id == blog_id && escalation.status == EscalationStatus::PendingReview
        }))
    }

    fn list_escalations(&self, blog_id: BlogId) -> Result<Vec<Escalation>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .escalations
            .iter()
            .filter(|escalation| escalation.blog_id == blog_id)
            .cloned()
            .collect())
    }
}

// ============================================================================
// SECTION: Evaluation Store Implementation
// ============================================================================

impl EvaluationStore for InMemoryStore {
    fn insert_run(&self, new: NewEvaluationRun) -> Result<EvaluationRun, StoreError> {
        let mut state = self.lock()?;
        if !state.versions.iter().any(|version| version.id == new.blog_version_id) {
            return Err(StoreError::NotFound(format!("version {}", new.blog_version_id)));
        }
        let id = RunId::from_raw(Self::next_id(&state.runs)?)
            .ok_or_else(|| StoreError::Invariant("zero run id".to_string()))?;
        let run = EvaluationRun {
            id,
            blog_version_id: new.blog_version_id,
            run_at: self.clock.now(),
            triggered_by: new.triggered_by,
            model_config: new.model_config,
            status: RunStatus::Processing,
            completed_at: None,
        };
        state.runs.push(run.clone());
        Ok(run)
    }

    fn get_run(&self, id: RunId) -> Result<Option<EvaluationRun>, StoreError> {
        let state = self.lock()?;
        Ok(state.runs.iter().find(|run| run.id == id).cloned())
    }

    fn processing_run_for_version(
        &self,
        version_id: VersionId,
    ) -> Result<Option<EvaluationRun>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .runs
            .iter()
            .filter(|run| {
                run.blog_version_id == version_id && run.status == RunStatus::Processing
            })
            .max_by_key(|run| (run.run_at, run.id))
            .cloned())
    }

    fn finalize_run(
        &self,
        id: RunId,
        status: RunStatus,
        completed_at: Timestamp,
    ) -> Result<EvaluationRun, StoreError> {
        if !status.is_finished() {
            return Err(StoreError::Validation(
                "runs can only be finalized to a finished status".to_string(),
            ));
        }
        let mut state = self.lock()?;
        let run = state
            .runs
            .iter_mut()
            .find(|run| run.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("run {id}")))?;
        if run.status != RunStatus::Processing {
            return Err(StoreError::Conflict(format!(
                "run {id} already finalized as {}",
                run.status.as_str()
            )));
        }
        run.status = status;
        run.completed_at = Some(completed_at);
        Ok(run.clone())
    }

    fn insert_detector_score(&self, score: DetectorScore) -> Result<(), StoreError> {
        if !(0.0..=100.0).contains(&score.score) {
            return Err(StoreError::Validation(format!(
                "detector score out of range: {}",
                score.score
            )));
        }
        let mut state = self.lock()?;
        if !state.runs.iter().any(|run| run.id == score.run_id) {
            return Err(StoreError::NotFound(format!("run {}", score.run_id)));
        }
        let duplicate = state
            .detector_scores
            .iter()
            .any(|row| row.run_id == score.run_id && row.provider == score.provider);
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "detector score exists for run {} provider {}",
                score.run_id, score.provider
            )));
        }
        state.detector_scores.push(score);
        Ok(())
    }

    fn detector_score(
        &self,
        run_id: RunId,
        provider: &str,
    ) -> Result<Option<DetectorScore>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .detector_scores
            .iter()
            .find(|row| row.run_id == run_id && row.provider == provider)
            .cloned())
    }

    fn list_detector_scores(&self, run_id: RunId) -> Result<Vec<DetectorScore>, StoreError> {
        let state = self.lock()?;
        let mut rows: Vec<DetectorScore> = state
            .detector_scores
            .iter()
            .filter(|row| row.run_id == run_id)
            .cloned()
            .collect();
        rows.sort_by(|left, right| left.provider.cmp(&right.provider));
        Ok(rows)
    }

    fn insert_aeo_score(&self, score: AeoScore) -> Result<(), StoreError> {
        if !(0.0..=100.0).contains(&score.score) {
            return Err(StoreError::Validation(format!(
                "aeo score out of range: {}",
                score.score
            )));
        }
        let mut state = self.lock()?;
        if !state.runs.iter().any(|run| run.id == score.run_id) {
            return Err(StoreError::NotFound(format!("run {}", score.run_id)));
        }
        let duplicate = state
            .aeo_scores
            .iter()
            .any(|row| row.run_id == score.run_id && row.query_intent == score.query_intent);
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "aeo score exists for run {} intent {}",
                score.run_id, score.query_intent
            )));
        }
        state.aeo_scores.push(score);
        Ok(())
    }

    fn aeo_score(
        &self,
        run_id: RunId,
        query_intent: &str,
    ) -> Result<Option<AeoScore>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .aeo_scores
            .iter()
            .find(|row| row.run_id == run_id && row.query_intent == query_intent)
            .cloned())
    }

    fn list_aeo_scores(&self, run_id: RunId) -> Result<Vec<AeoScore>, StoreError> {
        let state = self.lock()?;
        let mut rows: Vec<AeoScore> =
            state.aeo_scores.iter().filter(|row| row.run_id == run_id).cloned().collect();
        rows.sort_by(|left, right| left.query_intent.cmp(&right.query_intent));
        Ok(rows)
    }

    fn previous_scored_run(
        &self,
        blog_id: BlogId,
        before: RunId,
    ) -> Result<Option<EvaluationRun>, StoreError> {
        let state = self.lock()?;
        let anchor = state
            .runs
            .iter()
            .find(|run| run.id == before)
            .ok_or_else(|| StoreError::NotFound(format!("run {before}")))?;
        let anchor_key = (anchor.run_at, anchor.id);
        Ok(state
            .runs
            .iter()
            .filter(|run| run.status == RunStatus::Completed)
            .filter(|run| (run.run_at, run.id) < anchor_key)
            .filter(|run| blog_of_version(&state, run.blog_version_id) == Some(blog_id))
            .max_by_key(|run| (run.run_at, run.id))
            .cloned())
    }

    fn latest_scored_run_for_version(
        &self,
        version_id: VersionId,
    ) -> Result<Option<EvaluationRun>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .runs
            .iter()
            .filter(|run| run.blog_version_id == version_id && run.status.has_scores())
            .max_by_key(|run| (run.run_at, run.id))
            .cloned())
    }
}

// ============================================================================
// SECTION: Rewrite Store Implementation
// ============================================================================

impl RewriteStore for InMemoryStore {
    fn insert_cycle(&self, new: NewRewriteCycle) -> Result<RewriteCycle, StoreError> {
        let mut state = self.lock()?;
        if !state.versions.iter().any(|version| version.id == new.parent_version_id) {
            return Err(StoreError::NotFound(format!("version {}", new.parent_version_id)));
        }
        let cycle_number = state
            .cycles
            .iter()
            .filter(|cycle| cycle.parent_version_id == new.parent_version_id)
            .map(|cycle| cycle.cycle_number)
            .max()
            .unwrap_or(0)
            + 1;
        let id = CycleId::from_raw(Self::next_id(&state.cycles)?)
            .ok_or_else(|| StoreError::Invariant("zero cycle id".to_string()))?;
        let status = if new.stop_reason.is_some() {
            RewriteStatus::Terminal
        } else {
            RewriteStatus::Pending
        };
        let cycle = RewriteCycle {
            id,
            parent_version_id: new.parent_version_id,
            child_version_id: None,
            cycle_number,
            trigger_reasons: new.trigger_reasons,
            trigger_data: new.trigger_data,
            rewrite_prompt: new.rewrite_prompt,
            parent_scores: new.parent_scores,
            child_scores: None,
            trend_outcome: None,
            rewrite_status: status,
            stop_reason: new.stop_reason,
            created_at: self.clock.now(),
        };
        state.cycles.push(cycle.clone());
        Ok(cycle)
    }

    fn get_cycle(&self, id: CycleId) -> Result<Option<RewriteCycle>, StoreError> {
        let state = self.lock()?;
        Ok(state.cycles.iter().find(|cycle| cycle.id == id).cloned())
    }

    fn cycles_for_parent(
        &self,
        parent_version_id: VersionId,
    ) -> Result<Vec<RewriteCycle>, StoreError> {
        let state = self.lock()?;
        let mut cycles: Vec<RewriteCycle> = state
            .cycles
            .iter()
            .filter(|cycle| cycle.parent_version_id == parent_version_id)
            .cloned()
            .collect();
        cycles.sort_by_key(|cycle| cycle.cycle_number);
        Ok(cycles)
    }

    fn cycles_for_blog(&self, blog_id: BlogId) -> Result<Vec<RewriteCycle>, StoreError> {
        let state = self.lock()?;
        let mut cycles: Vec<RewriteCycle> = state
            .cycles
            .iter()
            .filter(|cycle| blog_of_version(&state, cycle.parent_version_id) == Some(blog_id))
            .cloned()
            .collect();
        cycles.sort_by_key(|cycle| (cycle.created_at, cycle.id));
        Ok(cycles)
    }

    fn complete_cycle(&self, completion: CycleCompletion) -> Result<RewriteCycle, StoreError> {
        let mut state = self.lock()?;
        let cycle = state
            .cycles
            .iter_mut()
            .find(|cycle| cycle.id == completion.cycle_id)
            .ok_or_else(|| StoreError::NotFound(format!("cycle {}", completion.cycle_id)))?;
        if cycle.rewrite_status != RewriteStatus::Pending {
            return Err(StoreError::Conflict(format!(
                "cycle {} is {} and cannot be completed",
                cycle.id,
                cycle.rewrite_status.as_str()
            )));
        }
        cycle.child_version_id = Some(completion.child_version_id);
        cycle.child_scores = Some(completion.child_scores);
        cycle.trend_outcome = Some(completion.trend_outcome);
        cycle.rewrite_status = RewriteStatus::Completed;
        Ok(cycle.clone())
    }

    fn terminate_cycle(
        &self,
        id: CycleId,
        stop_reason: StopReason,
    ) -> Result<RewriteCycle, StoreError> {
        let mut state = self.lock()?;
        let cycle = state
            .cycles
            .iter_mut()
            .find(|cycle| cycle.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("cycle {id}")))?;
        if cycle.rewrite_status != RewriteStatus::Pending {
            return Err(StoreError::Conflict(format!(
                "cycle {id} is {} and cannot be terminated",
                cycle.rewrite_status.as_str()
            )));
        }
        cycle.rewrite_status = RewriteStatus::Terminal;
        cycle.stop_reason = Some(stop_reason);
        Ok(cycle.clone())
    }
}

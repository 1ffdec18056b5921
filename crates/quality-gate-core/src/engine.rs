// crates/quality-gate-core/src/engine.rs
// ============================================================================
// Module: Quality Engine Facade
// Description: Caller-facing operation surface wiring stores and engines.
// Purpose: Expose the transport-neutral operation set behind one handle.
// Dependencies: crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! [`QualityEngine`] is the composition point: it wires the stores, scorers,
//! rewriter, workflow runner, clock, and telemetry into the evaluation
//! pipeline, rewrite orchestrator, and review service, and exposes the
//! transport-neutral operations callers consume. Hosts build it once at
//! startup via [`QualityEngineBuilder`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use thiserror::Error;

use crate::core::AeoScore;
use crate::core::ApprovalState;
use crate::core::Blog;
use crate::core::BlogId;
use crate::core::Clock;
use crate::core::DetectorScore;
use crate::core::Escalation;
use crate::core::EvaluationRun;
use crate::core::NewVersion;
use crate::core::ProjectId;
use crate::core::ReviewTransition;
use crate::core::RunId;
use crate::core::ScorerId;
use crate::core::Version;
use crate::core::VersionId;
use crate::core::identifiers::ActorId;
use crate::error::EngineError;
use crate::interfaces::ContentStore;
use crate::interfaces::EvaluationStore;
use crate::interfaces::Rewriter;
use crate::interfaces::RewriteStore;
use crate::interfaces::Scorer;
use crate::interfaces::ScorerError;
use crate::interfaces::ScorerOutput;
use crate::interfaces::TaskDescriptor;
use crate::interfaces::TaskError;
use crate::interfaces::WorkflowRunner;
use crate::runtime::EvaluationPipeline;
use crate::runtime::OrchestratorConfig;
use crate::runtime::ReviewConfig;
use crate::runtime::ReviewEligibility;
use crate::runtime::ReviewService;
use crate::runtime::RewriteOrchestrator;
use crate::runtime::RewriteOutcome;
use crate::telemetry::NoopTelemetry;
use crate::telemetry::TelemetrySink;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Deployment-tunable limits accepted by the engine.
///
/// # Invariants
/// - All values are positive; validation happens in the configuration crate
///   before the limits reach the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineLimits {
    /// Minimum review duration in seconds.
    pub min_review_duration_seconds: u64,
    /// Fast-approval threshold in seconds.
    pub fast_approval_threshold_seconds: u64,
    /// Per-blog rewrite cycle cap.
    pub max_rewrite_cycles: u32,
    /// Per-blog review cycle cap.
    pub max_review_cycles_per_blog: u64,
    /// Rewriter deadline in seconds.
    pub rewriter_timeout_seconds: u64,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            min_review_duration_seconds: 300,
            fast_approval_threshold_seconds: 30,
            max_rewrite_cycles: 10,
            max_review_cycles_per_blog: 5,
            rewriter_timeout_seconds: 120,
        }
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineBuildError {
    /// A required component was not supplied.
    #[error("engine builder is missing: {0}")]
    Missing(&'static str),
}

/// Builder for [`QualityEngine`].
///
/// # Invariants
/// - `build` succeeds only when stores, rewriter, runner, clock, and the
///   system actor are configured; telemetry defaults to the no-op sink.
#[derive(Default)]
pub struct QualityEngineBuilder {
    /// Content store.
    content: Option<Arc<dyn ContentStore>>,
    /// Evaluation store.
    evals: Option<Arc<dyn EvaluationStore>>,
    /// Rewrite store.
    rewrites: Option<Arc<dyn RewriteStore>>,
    /// Active scorers in execution order.
    scorers: Vec<Arc<dyn Scorer>>,
    /// External rewriter.
    rewriter: Option<Arc<dyn Rewriter>>,
    /// Workflow runner.
    runner: Option<Arc<dyn WorkflowRunner>>,
    /// Injected clock.
    clock: Option<Arc<dyn Clock>>,
    /// Telemetry sink.
    telemetry: Option<Arc<dyn TelemetrySink>>,
    /// System actor owning AI-rewrite versions.
    system_actor: Option<ActorId>,
    /// Deployment limits.
    limits: EngineLimits,
}

impl QualityEngineBuilder {
    /// Registers the content store.
    #[must_use]
    pub fn content_store(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.content = Some(store);
        self
    }

    /// Registers the evaluation store.
    #[must_use]
    pub fn evaluation_store(mut self, store: Arc<dyn EvaluationStore>) -> Self {
        self.evals = Some(store);
        self
    }

    /// Registers the rewrite store.
    #[must_use]
    pub fn rewrite_store(mut self, store: Arc<dyn RewriteStore>) -> Self {
        self.rewrites = Some(store);
        self
    }

    /// Appends a scorer in execution order.
    #[must_use]
    pub fn scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorers.push(scorer);
        self
    }

    /// Registers the external rewriter.
    #[must_use]
    pub fn rewriter(mut self, rewriter: Arc<dyn Rewriter>) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    /// Registers the workflow runner.
    #[must_use]
    pub fn workflow_runner(mut self, runner: Arc<dyn WorkflowRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Registers the clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Registers the telemetry sink.
    #[must_use]
    pub fn telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Registers the system actor owning AI-rewrite versions.
    #[must_use]
    pub fn system_actor(mut self, actor: ActorId) -> Self {
        self.system_actor = Some(actor);
        self
    }

    /// Overrides the deployment limits.
    #[must_use]
    pub fn limits(mut self, limits: EngineLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Builds the engine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineBuildError::Missing`] when a required component was
    /// not supplied.
    pub fn build(self) -> Result<QualityEngine, EngineBuildError> {
        let content = self.content.ok_or(EngineBuildError::Missing("content store"))?;
        let evals = self.evals.ok_or(EngineBuildError::Missing("evaluation store"))?;
        let rewrites = self.rewrites.ok_or(EngineBuildError::Missing("rewrite store"))?;
        let rewriter = self.rewriter.ok_or(EngineBuildError::Missing("rewriter"))?;
        let runner = self.runner.ok_or(EngineBuildError::Missing("workflow runner"))?;
        let clock = self.clock.ok_or(EngineBuildError::Missing("clock"))?;
        let system_actor =
            self.system_actor.ok_or(EngineBuildError::Missing("system actor"))?;
        let telemetry =
            self.telemetry.unwrap_or_else(|| Arc::new(NoopTelemetry) as Arc<dyn TelemetrySink>);

        let pipeline = Arc::new(EvaluationPipeline::new(
            Arc::clone(&content),
            Arc::clone(&evals),
            self.scorers.clone(),
            Arc::clone(&runner),
            Arc::clone(&clock),
            Arc::clone(&telemetry),
        ));
        let orchestrator = Arc::new(RewriteOrchestrator::new(
            Arc::clone(&content),
            Arc::clone(&evals),
            Arc::clone(&rewrites),
            Arc::clone(&pipeline),
            rewriter,
            Arc::clone(&telemetry),
            OrchestratorConfig {
                max_cycles_per_blog: self.limits.max_rewrite_cycles,
                rewriter_timeout: Duration::from_secs(self.limits.rewriter_timeout_seconds),
                system_actor,
            },
        ));
        let review = ReviewService::new(
            Arc::clone(&content),
            Arc::clone(&clock),
            Arc::clone(&telemetry),
            ReviewConfig {
                min_review_duration: Duration::from_secs(
                    self.limits.min_review_duration_seconds,
                ),
                fast_approval_threshold: Duration::from_secs(
                    self.limits.fast_approval_threshold_seconds,
                ),
                max_review_cycles_per_blog: self.limits.max_review_cycles_per_blog,
                ..ReviewConfig::default()
            },
        );

        Ok(QualityEngine {
            content,
            evals,
            scorers: self.scorers,
            runner,
            pipeline,
            orchestrator,
            review,
            rewrite_seq: AtomicU64::new(0),
        })
    }
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Evaluation run with its attached score rows.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    /// The run envelope.
    pub run: EvaluationRun,
    /// Detector score rows ordered by provider.
    pub detector_scores: Vec<DetectorScore>,
    /// AEO score rows ordered by query intent.
    pub aeo_scores: Vec<AeoScore>,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Caller-facing engine facade.
///
/// # Invariants
/// - Construction happens once at startup; all shared state lives in the
///   stores.
pub struct QualityEngine {
    /// Content store.
    content: Arc<dyn ContentStore>,
    /// Evaluation store.
    evals: Arc<dyn EvaluationStore>,
    /// Active scorers in execution order.
    scorers: Vec<Arc<dyn Scorer>>,
    /// Workflow runner for rewrite submissions.
    runner: Arc<dyn WorkflowRunner>,
    /// Evaluation pipeline.
    pipeline: Arc<EvaluationPipeline>,
    /// Rewrite orchestrator.
    orchestrator: Arc<RewriteOrchestrator>,
    /// Review state machine service.
    review: ReviewService,
    /// Per-submission sequence distinguishing rewrite task keys.
    rewrite_seq: AtomicU64,
}

impl QualityEngine {
    /// Returns a builder for the engine.
    #[must_use]
    pub fn builder() -> QualityEngineBuilder {
        QualityEngineBuilder::default()
    }

    /// Creates a blog with an immutable name.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when the name is empty.
    pub fn create_blog(
        &self,
        name: &str,
        actor: ActorId,
        project_id: Option<ProjectId>,
    ) -> Result<Blog, EngineError> {
        Ok(self.content.create_blog(name, actor, project_id)?)
    }

    /// Appends a version to a blog.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Conflict`] on version-number races and
    /// [`EngineError::Validation`] on contract violations.
    pub fn append_version(&self, new: NewVersion) -> Result<Version, EngineError> {
        Ok(self.content.append_version(new)?)
    }

    /// Loads a version.
    ///
    /// # Errors
    ///
    /// Returns store errors as [`EngineError`].
    pub fn get_version(&self, id: VersionId) -> Result<Option<Version>, EngineError> {
        Ok(self.content.get_version(id)?)
    }

    /// Lists a blog's versions in lineage order.
    ///
    /// # Errors
    ///
    /// Returns store errors as [`EngineError`].
    pub fn list_versions(&self, blog_id: BlogId) -> Result<Vec<Version>, EngineError> {
        Ok(self.content.list_versions(blog_id)?)
    }

    /// Starts an evaluation run for a version.
    ///
    /// # Errors
    ///
    /// See [`EvaluationPipeline::start_evaluation`].
    pub fn start_evaluation(
        &self,
        version_id: VersionId,
        actor: Option<ActorId>,
    ) -> Result<EvaluationRun, EngineError> {
        self.pipeline.start_evaluation(version_id, actor)
    }

    /// Loads an evaluation run with its attached scores.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for unknown runs.
    pub fn get_evaluation(&self, run_id: RunId) -> Result<EvaluationReport, EngineError> {
        let run = self
            .evals
            .get_run(run_id)?
            .ok_or_else(|| EngineError::Validation(format!("unknown run: {run_id}")))?;
        Ok(EvaluationReport {
            detector_scores: self.evals.list_detector_scores(run_id)?,
            aeo_scores: self.evals.list_aeo_scores(run_id)?,
            run,
        })
    }

    /// Orchestrates one bounded rewrite pass through the workflow runner.
    ///
    /// Rewrite tasks are not idempotent, so they retry at most once and only
    /// on transient failures.
    ///
    /// # Errors
    ///
    /// See [`RewriteOrchestrator::orchestrate`]; runner rejections surface as
    /// [`EngineError::Unavailable`].
    pub fn orchestrate_rewrite(
        &self,
        version_id: VersionId,
    ) -> Result<RewriteOutcome, EngineError> {
        let outcome: Arc<Mutex<Option<Result<RewriteOutcome, EngineError>>>> =
            Arc::new(Mutex::new(None));
        let slot = Arc::clone(&outcome);
        let orchestrator = Arc::clone(&self.orchestrator);
        // Each submission gets its own key: orchestration attempts are not
        // idempotent across calls, only across runner redeliveries.
        let seq = self.rewrite_seq.fetch_add(1, Ordering::Relaxed);
        let descriptor = TaskDescriptor {
            idempotency_key: format!("rewrite/{version_id}/{seq}"),
            max_retries: 1,
            timeout: Duration::from_secs(600),
        };
        let handle = self.runner.submit(
            descriptor,
            Box::new(move || {
                let result = orchestrator.orchestrate(version_id);
                let task_result = match &result {
                    Ok(_) => Ok(()),
                    Err(
                        err @ (EngineError::Timeout {
                            ..
                        }
                        | EngineError::Unavailable(_)),
                    ) => Err(TaskError::Retryable(err.to_string())),
                    Err(other) => Err(TaskError::Fatal(other.to_string())),
                };
                if let Ok(mut guard) = slot.lock() {
                    *guard = Some(result);
                }
                task_result
            }),
        )?;
        let _finished = handle.wait();
        let mut guard = outcome
            .lock()
            .map_err(|_| EngineError::Internal("rewrite outcome mutex poisoned".to_string()))?;
        guard
            .take()
            .unwrap_or_else(|| Err(EngineError::Internal("rewrite task never ran".to_string())))
    }

    /// Submits a version for review.
    ///
    /// # Errors
    ///
    /// See [`ReviewService::submit_for_review`].
    pub fn start_review(
        &self,
        version_id: VersionId,
        actor: ActorId,
    ) -> Result<ReviewTransition, EngineError> {
        self.review.submit_for_review(version_id, actor)
    }

    /// Returns the authoritative review eligibility snapshot for a version.
    ///
    /// # Errors
    ///
    /// See [`ReviewService::eligibility`].
    pub fn review_eligibility(
        &self,
        version_id: VersionId,
    ) -> Result<ReviewEligibility, EngineError> {
        self.review.eligibility(version_id)
    }

    /// Approves a version.
    ///
    /// # Errors
    ///
    /// See [`ReviewService::approve`].
    pub fn approve(
        &self,
        blog_id: BlogId,
        version_id: VersionId,
        reviewer: ActorId,
        rationale: &str,
        cosigner: Option<ActorId>,
    ) -> Result<ApprovalState, EngineError> {
        self.review.approve(blog_id, version_id, reviewer, rationale, cosigner, None)
    }

    /// Rejects a version; terminal.
    ///
    /// # Errors
    ///
    /// See [`ReviewService::reject`].
    pub fn reject(
        &self,
        blog_id: BlogId,
        version_id: VersionId,
        reviewer: ActorId,
        rationale: &str,
    ) -> Result<ReviewTransition, EngineError> {
        self.review.reject(blog_id, version_id, reviewer, rationale)
    }

    /// Records an audited override approval.
    ///
    /// # Errors
    ///
    /// See [`ReviewService::request_override`].
    pub fn request_override(
        &self,
        blog_id: BlogId,
        version_id: VersionId,
        actor: ActorId,
        justification: &str,
        risk_acceptance_note: &str,
    ) -> Result<ApprovalState, EngineError> {
        self.review.request_override(
            blog_id,
            version_id,
            actor,
            justification,
            risk_acceptance_note,
        )
    }

    /// Appends a human edit of an in-review version.
    ///
    /// # Errors
    ///
    /// See [`ReviewService::edit_during_review`].
    pub fn edit_during_review(
        &self,
        version_id: VersionId,
        content: String,
        actor: ActorId,
        change_reason: Option<String>,
    ) -> Result<Version, EngineError> {
        self.review.edit_during_review(version_id, content, actor, change_reason)
    }

    /// Archives versions stuck in review past the stale age.
    ///
    /// # Errors
    ///
    /// See [`ReviewService::archive_stale_reviews`].
    pub fn archive_stale_reviews(&self, actor: ActorId) -> Result<Vec<VersionId>, EngineError> {
        self.review.archive_stale_reviews(actor)
    }

    /// Returns the current approval for a blog.
    ///
    /// # Errors
    ///
    /// Returns store errors as [`EngineError`].
    pub fn current_approval(
        &self,
        blog_id: BlogId,
    ) -> Result<Option<ApprovalState>, EngineError> {
        Ok(self.content.current_approval(blog_id)?)
    }

    /// Revokes a blog's current approval.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when no current approval exists.
    pub fn revoke_approval(
        &self,
        blog_id: BlogId,
        revoked_by: ActorId,
        reason: &str,
    ) -> Result<ApprovalState, EngineError> {
        Ok(self.content.revoke_approval(blog_id, revoked_by, reason)?)
    }

    /// Returns whether the blog has an open escalation.
    ///
    /// # Errors
    ///
    /// Returns store errors as [`EngineError`].
    pub fn is_escalated(&self, blog_id: BlogId) -> Result<bool, EngineError> {
        Ok(self.content.is_escalated(blog_id)?)
    }

    /// Lists a blog's escalations.
    ///
    /// # Errors
    ///
    /// Returns store errors as [`EngineError`].
    pub fn list_escalations(&self, blog_id: BlogId) -> Result<Vec<Escalation>, EngineError> {
        Ok(self.content.list_escalations(blog_id)?)
    }

    /// Scores text with one of the configured scorers, without persistence.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for unknown scorer identifiers or
    /// scorer contract violations and [`EngineError::Internal`] for scorer
    /// bugs.
    pub fn score(&self, scorer_id: &ScorerId, text: &str) -> Result<ScorerOutput, EngineError> {
        let scorer = self
            .scorers
            .iter()
            .find(|scorer| scorer.id() == *scorer_id)
            .ok_or_else(|| EngineError::Validation(format!("unknown scorer: {scorer_id}")))?;
        scorer.score(text).map_err(|err| match err {
            ScorerError::Validation(message) => EngineError::Validation(message),
            ScorerError::Internal(message) => EngineError::Internal(message),
        })
    }
}

// crates/quality-gate-core/src/runtime/pipeline.rs
// ============================================================================
// Module: Evaluation Pipeline
// Description: Fan-out/fan-in evaluation runs over pluggable scorers.
// Purpose: Create runs, write score rows idempotently, finalize, and detect regressions.
// Dependencies: crate::core, crate::interfaces, crate::telemetry, serde_json
// ============================================================================

//! ## Overview
//! The pipeline creates one evaluation run per request, fans scorer tasks out
//! through the workflow runner, and finalizes the run when every task has
//! reported. Scorer tasks are idempotent by check-then-insert, so at-least-
//! once delivery never produces duplicate score rows. Finalization is
//! followed by regression detection against the blog's previous completed run;
//! metrics with mismatched rubric versions are skipped with a warning rather
//! than compared.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::json;

use crate::core::AeoScore;
use crate::core::BlogId;
use crate::core::Clock;
use crate::core::DetectorDetails;
use crate::core::DetectorScore;
use crate::core::EscalationReason;
use crate::core::EvaluationRun;
use crate::core::ModelConfigSnapshot;
use crate::core::NewEscalation;
use crate::core::NewEvaluationRun;
use crate::core::RunAggregates;
use crate::core::RunId;
use crate::core::RunStatus;
use crate::core::ScorerId;
use crate::core::SnapshotScorer;
use crate::core::Version;
use crate::core::VersionId;
use crate::core::identifiers::ActorId;
use crate::error::EngineError;
use crate::interfaces::ContentStore;
use crate::interfaces::EvaluationStore;
use crate::interfaces::Scorer;
use crate::interfaces::ScorerError;
use crate::interfaces::ScorerOutput;
use crate::interfaces::StoreError;
use crate::interfaces::TaskDescriptor;
use crate::interfaces::TaskError;
use crate::interfaces::TaskHandle;
use crate::interfaces::WorkflowRunner;
use crate::telemetry::TelemetryEvent;
use crate::telemetry::TelemetrySink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Retry budget for idempotent scorer tasks.
pub const SCORER_MAX_RETRIES: u32 = 3;
/// Per-attempt deadline for one scoring unit.
pub const SCORER_TIMEOUT: Duration = Duration::from_secs(60);
/// Point drop that counts as a score regression.
pub const REGRESSION_THRESHOLD: f64 = 10.0;

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Evaluation pipeline fanning out to the configured scorers.
///
/// # Invariants
/// - At most one `Processing` run exists per version; a second start returns
///   the existing run (state-based deduplication).
/// - The scorer list is frozen at construction; runs snapshot it into their
///   `model_config`.
pub struct EvaluationPipeline {
    /// Content store for version and approval lookups.
    content: Arc<dyn ContentStore>,
    /// Evaluation store owning runs and score rows.
    evals: Arc<dyn EvaluationStore>,
    /// Active scorers in configured execution order.
    scorers: Vec<Arc<dyn Scorer>>,
    /// Workflow runner executing scorer tasks.
    runner: Arc<dyn WorkflowRunner>,
    /// Injected clock.
    clock: Arc<dyn Clock>,
    /// Telemetry sink.
    telemetry: Arc<dyn TelemetrySink>,
}

impl EvaluationPipeline {
    /// Creates a pipeline over the provided stores, scorers, and runner.
    #[must_use]
    pub fn new(
        content: Arc<dyn ContentStore>,
        evals: Arc<dyn EvaluationStore>,
        scorers: Vec<Arc<dyn Scorer>>,
        runner: Arc<dyn WorkflowRunner>,
        clock: Arc<dyn Clock>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            content,
            evals,
            scorers,
            runner,
            clock,
            telemetry,
        }
    }

    /// Starts an evaluation run for a version and returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for unknown versions,
    /// [`EngineError::ApprovedContent`] when the version is the blog's
    /// current approval, and store/runner errors otherwise.
    pub fn start_evaluation(
        &self,
        version_id: VersionId,
        triggered_by: Option<ActorId>,
    ) -> Result<EvaluationRun, EngineError> {
        let (run, _handles) = self.start_with_handles(version_id, triggered_by)?;
        Ok(run)
    }

    /// Starts an evaluation run and blocks until every scorer task reported
    /// and the run is finalized. Returns the finalized run.
    ///
    /// # Errors
    ///
    /// As [`Self::start_evaluation`]; additionally returns
    /// [`EngineError::Internal`] when the finalized run cannot be re-read.
    pub fn evaluate_now(
        &self,
        version_id: VersionId,
        triggered_by: Option<ActorId>,
    ) -> Result<EvaluationRun, EngineError> {
        let (run, handles) = self.start_with_handles(version_id, triggered_by)?;
        for handle in handles {
            // Outcomes are recorded on the run itself; a failed handle shows
            // up as a partial_failure or failed status.
            let _outcome = handle.wait();
        }
        let finalized = self
            .evals
            .get_run(run.id)?
            .ok_or_else(|| EngineError::Internal(format!("run {} vanished", run.id)))?;
        Ok(finalized)
    }

    /// Shared start path returning the run and its task handles.
    fn start_with_handles(
        &self,
        version_id: VersionId,
        triggered_by: Option<ActorId>,
    ) -> Result<(EvaluationRun, Vec<Box<dyn TaskHandle>>), EngineError> {
        let version = self
            .content
            .get_version(version_id)?
            .ok_or_else(|| EngineError::Validation(format!("unknown version: {version_id}")))?;

        if let Some(approval) = self.content.current_approval(version.blog_id)?
            && approval.approved_version_id == version_id
        {
            return Err(EngineError::ApprovedContent(format!(
                "version {version_id} is the current approval of blog {}",
                version.blog_id
            )));
        }

        if let Some(existing) = self.evals.processing_run_for_version(version_id)? {
            return Ok((existing, Vec::new()));
        }

        let run = self.evals.insert_run(NewEvaluationRun {
            blog_version_id: version_id,
            triggered_by,
            model_config: self.model_config_snapshot(),
        })?;
        self.telemetry.record(&TelemetryEvent::EvaluationStarted {
            run_id: run.id,
            version_id,
            scorer_count: self.scorers.len(),
        });

        let handles = self.fan_out(&run, &version)?;
        Ok((run, handles))
    }

    /// Builds the immutable scorer configuration snapshot.
    fn model_config_snapshot(&self) -> ModelConfigSnapshot {
        ModelConfigSnapshot {
            detectors: self
                .scorers
                .iter()
                .map(|scorer| {
                    let metadata = scorer.metadata();
                    SnapshotScorer {
                        id: scorer.id(),
                        name: metadata.name,
                        version: metadata.version,
                    }
                })
                .collect(),
        }
    }

    /// Fans scorer tasks out through the workflow runner.
    fn fan_out(
        &self,
        run: &EvaluationRun,
        version: &Version,
    ) -> Result<Vec<Box<dyn TaskHandle>>, EngineError> {
        let collector = Arc::new(FanInCollector {
            run_id: run.id,
            blog_id: version.blog_id,
            version_id: version.id,
            expected: self.scorers.len(),
            content: Arc::clone(&self.content),
            evals: Arc::clone(&self.evals),
            clock: Arc::clone(&self.clock),
            telemetry: Arc::clone(&self.telemetry),
            state: Mutex::new(FanInState::default()),
        });

        if self.scorers.is_empty() {
            // Zero scorers means zero successes: finalize as failed now.
            collector.finalize_now()?;
            return Ok(Vec::new());
        }

        let mut handles = Vec::with_capacity(self.scorers.len());
        for scorer in &self.scorers {
            let descriptor = TaskDescriptor {
                idempotency_key: format!("eval/{}/{}", run.id, scorer.id()),
                max_retries: SCORER_MAX_RETRIES,
                timeout: SCORER_TIMEOUT,
            };
            let job = scorer_job(
                Arc::clone(scorer),
                version.content.clone(),
                run.id,
                Arc::clone(&self.evals),
                Arc::clone(&collector),
                SCORER_MAX_RETRIES,
            );
            let handle = self.runner.submit(descriptor, job)?;
            handles.push(handle);
        }
        Ok(handles)
    }
}

// ============================================================================
// SECTION: Scorer Tasks
// ============================================================================

/// Builds the idempotent job closure for one scorer task.
///
/// The closure tracks its own attempt count so the terminal failure is
/// reported to the collector exactly once, on the final attempt.
fn scorer_job(
    scorer: Arc<dyn Scorer>,
    text: String,
    run_id: RunId,
    evals: Arc<dyn EvaluationStore>,
    collector: Arc<FanInCollector>,
    max_retries: u32,
) -> Box<dyn FnMut() -> Result<(), TaskError> + Send> {
    let mut attempts: u32 = 0;
    Box::new(move || {
        attempts = attempts.saturating_add(1);
        match score_once(scorer.as_ref(), &text, run_id, evals.as_ref()) {
            Ok(()) => {
                collector
                    .report(scorer.id().as_str(), true, None)
                    .map_err(|err| TaskError::Retryable(err.to_string()))?;
                Ok(())
            }
            Err(failure) => {
                let out_of_budget = attempts > max_retries;
                if failure.retryable && !out_of_budget {
                    return Err(TaskError::Retryable(failure.message));
                }
                collector
                    .report(scorer.id().as_str(), false, Some(failure.message.clone()))
                    .map_err(|err| TaskError::Retryable(err.to_string()))?;
                Err(TaskError::Fatal(failure.message))
            }
        }
    })
}

/// One scorer attempt failure.
struct AttemptFailure {
    /// Whether the runner may retry the attempt.
    retryable: bool,
    /// Failure message reported to the finalizer.
    message: String,
}

/// Executes one scoring attempt with check-then-insert idempotency.
fn score_once(
    scorer: &dyn Scorer,
    text: &str,
    run_id: RunId,
    evals: &dyn EvaluationStore,
) -> Result<(), AttemptFailure> {
    let output = scorer.score(text).map_err(|err| AttemptFailure {
        retryable: false,
        message: scorer_error_message(&err),
    })?;

    match output {
        ScorerOutput::Detector(finding) => {
            let existing = evals
                .detector_score(run_id, &finding.provider)
                .map_err(store_failure)?;
            if existing.is_some() {
                return Ok(());
            }
            let insert = evals.insert_detector_score(DetectorScore {
                run_id,
                provider: finding.provider,
                score: finding.score,
                details: DetectorDetails {
                    model_version: finding.model_version,
                    raw_response: finding.raw_response,
                    timestamp: finding.timestamp,
                },
            });
            absorb_duplicate(insert)
        }
        ScorerOutput::Aeo(finding) => {
            let existing =
                evals.aeo_score(run_id, &finding.query_intent).map_err(store_failure)?;
            if existing.is_some() {
                return Ok(());
            }
            let insert = evals.insert_aeo_score(AeoScore {
                run_id,
                query_intent: finding.query_intent,
                score: finding.total_score,
                rationale: finding.rationale,
            });
            absorb_duplicate(insert)
        }
    }
}

/// Treats duplicate-row conflicts as success; a concurrent retry already won.
fn absorb_duplicate(result: Result<(), StoreError>) -> Result<(), AttemptFailure> {
    match result {
        Ok(()) | Err(StoreError::Conflict(_)) => Ok(()),
        Err(other) => Err(store_failure(other)),
    }
}

/// Maps a store error onto an attempt failure.
fn store_failure(error: StoreError) -> AttemptFailure {
    let retryable = matches!(error, StoreError::Unavailable(_));
    AttemptFailure {
        retryable,
        message: error.to_string(),
    }
}

/// Renders a scorer error for the finalizer record.
fn scorer_error_message(error: &ScorerError) -> String {
    error.to_string()
}

// ============================================================================
// SECTION: Fan-In Collector
// ============================================================================

/// Mutable fan-in state guarded by the collector mutex.
#[derive(Default)]
struct FanInState {
    /// Reported outcome per scorer identifier (true = success).
    outcomes: BTreeMap<String, (bool, Option<String>)>,
    /// Set once finalization has succeeded.
    finalized: bool,
}

/// Fan-in collector finalizing the run when every scorer has reported.
///
/// # Invariants
/// - `finalized` is set only after the store accepted the status transition,
///   so a failed finalization is retried by the reporting task.
struct FanInCollector {
    /// Run being finalized.
    run_id: RunId,
    /// Blog owning the evaluated version.
    blog_id: BlogId,
    /// Evaluated version.
    version_id: VersionId,
    /// Number of scorer reports awaited.
    expected: usize,
    /// Content store for approval lookups during regression detection.
    content: Arc<dyn ContentStore>,
    /// Evaluation store owning the run.
    evals: Arc<dyn EvaluationStore>,
    /// Injected clock.
    clock: Arc<dyn Clock>,
    /// Telemetry sink.
    telemetry: Arc<dyn TelemetrySink>,
    /// Guarded fan-in state.
    state: Mutex<FanInState>,
}

impl FanInCollector {
    /// Records one scorer outcome and finalizes when all are in.
    fn report(
        &self,
        scorer_id: &str,
        success: bool,
        message: Option<String>,
    ) -> Result<(), StoreError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Unavailable("fan-in mutex poisoned".to_string()))?;
        state
            .outcomes
            .entry(scorer_id.to_string())
            .or_insert((success, message.clone()));
        if !success && let Some(text) = message {
            self.telemetry.record(&TelemetryEvent::ScorerFailed {
                run_id: self.run_id,
                scorer_id: ScorerId::new(scorer_id),
                message: text,
            });
        }
        if state.outcomes.len() < self.expected || state.finalized {
            return Ok(());
        }
        self.finalize_locked(&mut state)
    }

    /// Finalizes immediately; used when the pipeline has zero scorers.
    fn finalize_now(&self) -> Result<(), StoreError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::Unavailable("fan-in mutex poisoned".to_string()))?;
        self.finalize_locked(&mut state)
    }

    /// Finalizes the run and triggers regression detection.
    fn finalize_locked(&self, state: &mut FanInState) -> Result<(), StoreError> {
        let successes = state.outcomes.values().filter(|(success, _)| *success).count();
        let failures = state.outcomes.len() - successes;
        let status = if successes == 0 {
            RunStatus::Failed
        } else if failures == 0 {
            RunStatus::Completed
        } else {
            RunStatus::PartialFailure
        };

        match self.evals.finalize_run(self.run_id, status, self.clock.now()) {
            Ok(_) => {}
            // A duplicate task set already finalized the run; nothing to do.
            Err(StoreError::Conflict(_)) => {
                state.finalized = true;
                return Ok(());
            }
            Err(other) => return Err(other),
        }
        state.finalized = true;
        self.telemetry.record(&TelemetryEvent::EvaluationFinalized {
            run_id: self.run_id,
            status,
        });

        if status.has_scores() {
            self.detect_regression()?;
        }
        Ok(())
    }

    /// Compares the finalized run against the blog's previous completed run and
    /// escalates on regressions when the blog is unapproved.
    fn detect_regression(&self) -> Result<(), StoreError> {
        let Some(prior) = self.evals.previous_scored_run(self.blog_id, self.run_id)? else {
            return Ok(());
        };

        let mut regressions: Vec<(String, f64)> = Vec::new();

        if let Some(drop) = self.detector_regression(prior.id)?
            && drop > REGRESSION_THRESHOLD
        {
            regressions.push(("detector_mean".to_string(), drop));
        }
        if let Some(drop) = self.aeo_regression(prior.id)?
            && drop > REGRESSION_THRESHOLD
        {
            regressions.push(("aeo_total".to_string(), drop));
        }

        if regressions.is_empty() {
            return Ok(());
        }
        // Human override governs: approved blogs are never auto-escalated.
        if self.content.current_approval(self.blog_id)?.is_some() {
            return Ok(());
        }
        for (metric, drop) in &regressions {
            self.telemetry.record(&TelemetryEvent::RegressionEscalated {
                run_id: self.run_id,
                blog_id: self.blog_id,
                metric: metric.clone(),
                drop: *drop,
            });
        }
        self.content.open_escalation(NewEscalation {
            blog_id: self.blog_id,
            version_id: self.version_id,
            reason: EscalationReason::ScoreRegression,
            details: json!({
                "run_id": self.run_id,
                "regressions": regressions
                    .iter()
                    .map(|(metric, drop)| json!({"metric": metric, "drop": drop}))
                    .collect::<Vec<_>>(),
                "threshold": REGRESSION_THRESHOLD,
            }),
        })?;
        Ok(())
    }

    /// Computes the detector-mean quality drop against the prior run.
    ///
    /// AI-likeness is better when lower, so the drop in quality is the rise
    /// in mean score. Providers are compared only when their model versions
    /// match between runs.
    fn detector_regression(&self, prior_run: RunId) -> Result<Option<f64>, StoreError> {
        let current = self.evals.list_detector_scores(self.run_id)?;
        let prior = self.evals.list_detector_scores(prior_run)?;
        if current.is_empty() || prior.is_empty() {
            return Ok(None);
        }

        let prior_by_provider: BTreeMap<&str, &DetectorScore> =
            prior.iter().map(|score| (score.provider.as_str(), score)).collect();
        let mut current_sum = 0.0;
        let mut prior_sum = 0.0;
        let mut comparable = 0usize;
        for score in &current {
            let Some(previous) = prior_by_provider.get(score.provider.as_str()) else {
                continue;
            };
            if previous.details.model_version != score.details.model_version {
                self.telemetry.record(&TelemetryEvent::RegressionMetricSkipped {
                    run_id: self.run_id,
                    metric: format!("detector:{}", score.provider),
                    reason: "model_version mismatch".to_string(),
                });
                continue;
            }
            current_sum += score.score;
            prior_sum += previous.score;
            comparable += 1;
        }
        if comparable == 0 {
            self.telemetry.record(&TelemetryEvent::RegressionMetricSkipped {
                run_id: self.run_id,
                metric: "detector_mean".to_string(),
                reason: "no comparable providers".to_string(),
            });
            return Ok(None);
        }
        #[allow(clippy::cast_precision_loss, reason = "Provider counts are tiny.")]
        let divisor = comparable as f64;
        Ok(Some(current_sum / divisor - prior_sum / divisor))
    }

    /// Computes the AEO total drop against the prior run.
    fn aeo_regression(&self, prior_run: RunId) -> Result<Option<f64>, StoreError> {
        let current = self.evals.list_aeo_scores(self.run_id)?;
        let prior = self.evals.list_aeo_scores(prior_run)?;
        let (Some(current_row), Some(prior_row)) = (current.first(), prior.first()) else {
            return Ok(None);
        };
        if current_row.rationale.rubric_version != prior_row.rationale.rubric_version {
            self.telemetry.record(&TelemetryEvent::RegressionMetricSkipped {
                run_id: self.run_id,
                metric: "aeo_total".to_string(),
                reason: "rubric_version mismatch".to_string(),
            });
            return Ok(None);
        }
        Ok(Some(prior_row.score - current_row.score))
    }
}

// ============================================================================
// SECTION: Aggregates
// ============================================================================

/// Derives aggregate metrics from a run's score rows.
///
/// # Errors
///
/// Returns [`StoreError`] when the score rows cannot be read.
pub fn run_aggregates(
    evals: &dyn EvaluationStore,
    run_id: RunId,
) -> Result<RunAggregates, StoreError> {
    let detectors = evals.list_detector_scores(run_id)?;
    let detector_mean = if detectors.is_empty() {
        None
    } else {
        #[allow(clippy::cast_precision_loss, reason = "Provider counts are tiny.")]
        let divisor = detectors.len() as f64;
        Some(detectors.iter().map(|score| score.score).sum::<f64>() / divisor)
    };
    let aeo_total = evals.list_aeo_scores(run_id)?.first().map(|row| row.score);
    Ok(RunAggregates {
        detector_mean,
        aeo_total,
    })
}

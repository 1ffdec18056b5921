// crates/quality-gate-core/src/runtime/orchestrator.rs
// ============================================================================
// Module: Rewrite Orchestrator
// Description: Deterministic, bounded rewrite cycles over the external rewriter.
// Purpose: Fire trigger rules, run the rewrite, and classify the outcome.
// Dependencies: crate::core, crate::interfaces, crate::runtime, serde_json
// ============================================================================

//! ## Overview
//! The orchestrator is deterministic except for the injected
//! [`Rewriter::generate`] call. It evaluates trigger rules over the parent
//! version's latest scored run, re-checks approval state and the rewrite cap
//! inside the task immediately before side effects, records every refusal as
//! a terminal cycle, stores the filled prompt verbatim before the external
//! call, and classifies the child's trend after a fresh evaluation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use serde_json::json;

use crate::core::AiLikenessBreakdown;
use crate::core::ContentSource;
use crate::core::CycleCompletion;
use crate::core::EvaluationRun;
use crate::core::NewRewriteCycle;
use crate::core::NewVersion;
use crate::core::RewriteCycle;
use crate::core::RunId;
use crate::core::ScoreSnapshot;
use crate::core::StopReason;
use crate::core::Version;
use crate::core::VersionId;
use crate::core::evaluation::AI_LIKENESS_PROVIDER;
use crate::core::identifiers::ActorId;
use crate::error::EngineError;
use crate::interfaces::ContentStore;
use crate::interfaces::EvaluationStore;
use crate::interfaces::Rewriter;
use crate::interfaces::RewriterError;
use crate::interfaces::RewriteStore;
use crate::runtime::pipeline::EvaluationPipeline;
use crate::runtime::pipeline::run_aggregates;
use crate::runtime::prompt::build_rewrite_prompt;
use crate::runtime::trend::classify_trend;
use crate::runtime::trend::evaluate_stop;
use crate::runtime::triggers::TriggerEvalError;
use crate::runtime::triggers::TriggerFinding;
use crate::runtime::triggers::TriggerInputs;
use crate::runtime::triggers::evaluate_triggers;
use crate::telemetry::TelemetryEvent;
use crate::telemetry::TelemetrySink;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default per-blog rewrite cap.
pub const DEFAULT_MAX_REWRITE_CYCLES: u32 = 10;
/// Default rewriter deadline.
pub const DEFAULT_REWRITER_TIMEOUT: Duration = Duration::from_secs(120);

/// Orchestrator configuration.
///
/// # Invariants
/// - `max_cycles_per_blog` >= 1; `rewriter_timeout` > 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Per-blog rewrite attempt cap.
    pub max_cycles_per_blog: u32,
    /// Deadline passed to the external rewriter.
    pub rewriter_timeout: Duration,
    /// System actor that owns AI-rewrite versions.
    pub system_actor: ActorId,
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Result of one orchestration request.
#[derive(Debug, Clone, PartialEq)]
pub enum RewriteOutcome {
    /// A child version was appended, evaluated, and classified.
    Completed(RewriteCycle),
    /// No trigger fired; nothing was recorded beyond a telemetry decision.
    NotRequired,
    /// A loop-breaking rule refused the cycle; a terminal cycle was recorded.
    Stopped(RewriteCycle),
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Deterministic rewrite orchestrator.
///
/// # Invariants
/// - Only one pending cycle exists per parent version at a time.
/// - Approval state is re-checked inside the task immediately before any
///   side-effecting call.
pub struct RewriteOrchestrator {
    /// Content store for versions and approvals.
    content: Arc<dyn ContentStore>,
    /// Evaluation store for trigger inputs.
    evals: Arc<dyn EvaluationStore>,
    /// Rewrite store owning cycle rows.
    rewrites: Arc<dyn RewriteStore>,
    /// Pipeline used for the child version's evaluation.
    pipeline: Arc<EvaluationPipeline>,
    /// Injected external rewriter.
    rewriter: Arc<dyn Rewriter>,
    /// Telemetry sink.
    telemetry: Arc<dyn TelemetrySink>,
    /// Orchestrator configuration.
    config: OrchestratorConfig,
}

impl RewriteOrchestrator {
    /// Creates an orchestrator over the provided stores and capabilities.
    #[must_use]
    pub fn new(
        content: Arc<dyn ContentStore>,
        evals: Arc<dyn EvaluationStore>,
        rewrites: Arc<dyn RewriteStore>,
        pipeline: Arc<EvaluationPipeline>,
        rewriter: Arc<dyn Rewriter>,
        telemetry: Arc<dyn TelemetrySink>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            content,
            evals,
            rewrites,
            pipeline,
            rewriter,
            telemetry,
            config,
        }
    }

    /// Runs one orchestration pass for the given parent version.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when the parent has no evaluable
    /// scores, [`EngineError::ApprovedContent`] on the TOCTOU re-check,
    /// [`EngineError::CapExceeded`] on cycle ceilings, and
    /// [`EngineError::Timeout`]/[`EngineError::Unavailable`] on rewriter
    /// failures. Every refusal past trigger evaluation records a terminal
    /// cycle.
    pub fn orchestrate(&self, parent_version_id: VersionId) -> Result<RewriteOutcome, EngineError> {
        let parent = self.content.get_version(parent_version_id)?.ok_or_else(|| {
            EngineError::Validation(format!("unknown version: {parent_version_id}"))
        })?;

        let run = self
            .evals
            .latest_scored_run_for_version(parent_version_id)?
            .ok_or_else(|| {
                EngineError::Validation(format!(
                    "version {parent_version_id} has no scored evaluation run"
                ))
            })?;
        let (inputs, parent_snapshot) = self.trigger_inputs(&run)?;

        let findings = match evaluate_triggers(&inputs) {
            Ok(findings) => findings,
            Err(TriggerEvalError::NotEvaluable(metric)) => {
                return Err(EngineError::Validation(format!(
                    "trigger not evaluable for version {parent_version_id}: missing {metric}"
                )));
            }
        };
        if findings.is_empty() {
            self.telemetry.record(&TelemetryEvent::RewriteNotRequired {
                version_id: parent_version_id,
            });
            return Ok(RewriteOutcome::NotRequired);
        }

        let prompt = build_rewrite_prompt(&parent.content, &findings);
        let reasons: Vec<String> =
            findings.iter().map(|finding| finding.reason.clone()).collect();
        let trigger_data = trigger_data(&findings);

        // TOCTOU re-check: the blog may have been approved while this task
        // sat in the queue.
        if self.content.current_approval(parent.blog_id)?.is_some() {
            self.refuse(
                &parent,
                &reasons,
                &trigger_data,
                &prompt,
                parent_snapshot,
                StopReason::ApprovedContent,
            )?;
            return Err(EngineError::ApprovedContent(format!(
                "blog {} was approved while the rewrite was queued",
                parent.blog_id
            )));
        }

        // Cap re-check: defense-in-depth against direct task invocation.
        let blog_cycles = self.rewrites.cycles_for_blog(parent.blog_id)?;
        let attempts = blog_cycles.iter().filter(|cycle| is_attempt(cycle)).count();
        if attempts >= self.config.max_cycles_per_blog as usize {
            self.refuse(
                &parent,
                &reasons,
                &trigger_data,
                &prompt,
                parent_snapshot,
                StopReason::CapExceeded,
            )?;
            return Err(EngineError::CapExceeded(format!(
                "blog {} reached the rewrite cap of {}",
                parent.blog_id, self.config.max_cycles_per_blog
            )));
        }

        // Loop-breaking over recorded history, before producing a new cycle.
        let parent_cycles = self.rewrites.cycles_for_parent(parent_version_id)?;
        if let Some(stop_reason) = evaluate_stop(&parent_cycles, &blog_cycles) {
            let cycle = self.refuse(
                &parent,
                &reasons,
                &trigger_data,
                &prompt,
                parent_snapshot,
                stop_reason,
            )?;
            if stop_reason == StopReason::MaxCyclesReached {
                return Err(EngineError::CapExceeded(format!(
                    "parent version {parent_version_id} reached its cycle ceiling"
                )));
            }
            return Ok(RewriteOutcome::Stopped(cycle));
        }

        let cycle = self.rewrites.insert_cycle(NewRewriteCycle {
            parent_version_id,
            trigger_reasons: reasons,
            trigger_data,
            rewrite_prompt: prompt.clone(),
            parent_scores: Some(parent_snapshot),
            stop_reason: None,
        })?;

        let rewritten = match self.rewriter.generate(&prompt, self.config.rewriter_timeout) {
            Ok(body) => body,
            Err(RewriterError::Timeout {
                timeout_seconds,
            }) => {
                let terminal = self.rewrites.terminate_cycle(cycle.id, StopReason::Timeout)?;
                self.record_stop(&terminal);
                return Err(EngineError::Timeout {
                    operation: "rewriter.generate".to_string(),
                    timeout_seconds,
                });
            }
            Err(RewriterError::Failed(message)) => {
                let terminal =
                    self.rewrites.terminate_cycle(cycle.id, StopReason::RewriterError)?;
                self.record_stop(&terminal);
                return Err(EngineError::Unavailable(format!("rewriter failed: {message}")));
            }
        };

        let child = self.content.append_version(NewVersion {
            blog_id: parent.blog_id,
            content: rewritten,
            source: ContentSource::AiRewrite,
            parent_version_id: Some(parent_version_id),
            source_rewrite_cycle_id: Some(cycle.id),
            change_reason: Some("automated rewrite".to_string()),
            created_by: self.config.system_actor,
        })?;

        let child_run = self.pipeline.evaluate_now(child.id, None)?;
        let child_aggregates = run_aggregates(self.evals.as_ref(), child_run.id)?;
        let (Some(child_aeo), Some(_)) =
            (child_aggregates.aeo_total, child_aggregates.detector_mean)
        else {
            let terminal = self.rewrites.terminate_cycle(cycle.id, StopReason::RewriterError)?;
            self.record_stop(&terminal);
            return Err(EngineError::Unavailable(format!(
                "child version {} produced no comparable scores",
                child.id
            )));
        };
        let child_snapshot = ScoreSnapshot {
            aeo_total: child_aeo,
            ai_likeness_total: self
                .ai_total_for_run(child_run.id)?
                .unwrap_or(parent_snapshot.ai_likeness_total),
        };

        let trend = classify_trend(parent_snapshot, child_snapshot);
        let completed = self.rewrites.complete_cycle(CycleCompletion {
            cycle_id: cycle.id,
            child_version_id: child.id,
            child_scores: child_snapshot,
            trend_outcome: trend,
        })?;
        self.telemetry.record(&TelemetryEvent::RewriteCompleted {
            cycle_id: completed.id,
            child_version_id: child.id,
            trend_code: trend.code(),
        });
        Ok(RewriteOutcome::Completed(completed))
    }

    /// Assembles trigger inputs and the parent score snapshot from one run.
    fn trigger_inputs(
        &self,
        run: &EvaluationRun,
    ) -> Result<(TriggerInputs, ScoreSnapshot), EngineError> {
        let aeo_rows = self.evals.list_aeo_scores(run.id)?;
        let aeo = aeo_rows.first().ok_or_else(|| {
            EngineError::Validation(format!("run {} has no aeo score; trigger not evaluable", run.id))
        })?;

        let detector = self.evals.detector_score(run.id, AI_LIKENESS_PROVIDER)?.ok_or_else(
            || {
                EngineError::Validation(format!(
                    "run {} has no {AI_LIKENESS_PROVIDER} score; trigger not evaluable",
                    run.id
                ))
            },
        )?;
        let breakdown: AiLikenessBreakdown =
            serde_json::from_value(detector.details.raw_response.clone()).map_err(|err| {
                EngineError::Validation(format!(
                    "run {} has an unreadable {AI_LIKENESS_PROVIDER} breakdown: {err}",
                    run.id
                ))
            })?;

        let snapshot = ScoreSnapshot {
            aeo_total: aeo.score,
            ai_likeness_total: breakdown.total_score,
        };
        let inputs = TriggerInputs {
            aeo_total: aeo.score,
            pillars: aeo.rationale.pillars.clone(),
            ai: breakdown,
        };
        Ok((inputs, snapshot))
    }

    /// Reads the AI-likeness total for a run, when present.
    fn ai_total_for_run(&self, run_id: RunId) -> Result<Option<f64>, EngineError> {
        let Some(detector) = self.evals.detector_score(run_id, AI_LIKENESS_PROVIDER)? else {
            return Ok(None);
        };
        let breakdown: Result<AiLikenessBreakdown, _> =
            serde_json::from_value(detector.details.raw_response.clone());
        Ok(breakdown.ok().map(|parsed| parsed.total_score))
    }

    /// Records a refused attempt as a terminal cycle.
    fn refuse(
        &self,
        parent: &Version,
        reasons: &[String],
        trigger_data: &Value,
        prompt: &str,
        parent_snapshot: ScoreSnapshot,
        stop_reason: StopReason,
    ) -> Result<RewriteCycle, EngineError> {
        let cycle = self.rewrites.insert_cycle(NewRewriteCycle {
            parent_version_id: parent.id,
            trigger_reasons: reasons.to_vec(),
            trigger_data: trigger_data.clone(),
            rewrite_prompt: prompt.to_string(),
            parent_scores: Some(parent_snapshot),
            stop_reason: Some(stop_reason),
        })?;
        self.record_stop(&cycle);
        Ok(cycle)
    }

    /// Emits the stop telemetry event for a terminal cycle.
    fn record_stop(&self, cycle: &RewriteCycle) {
        if let Some(stop_reason) = cycle.stop_reason {
            self.telemetry.record(&TelemetryEvent::RewriteStopped {
                cycle_id: Some(cycle.id),
                version_id: cycle.parent_version_id,
                stop_reason,
            });
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when a cycle consumed a real rewrite attempt.
///
/// Refusal rows (approval races, caps, loop breaks) do not count against the
/// per-blog cap; cycles that reached the rewriter do, whatever their outcome.
fn is_attempt(cycle: &RewriteCycle) -> bool {
    !matches!(
        cycle.stop_reason,
        Some(
            StopReason::ApprovedContent
                | StopReason::CapExceeded
                | StopReason::MaxCyclesReached
                | StopReason::NoImprovement
                | StopReason::QualityDegradation
                | StopReason::OscillationDetected
        )
    )
}

/// Serializes findings into the cycle's structured trigger data.
fn trigger_data(findings: &[TriggerFinding]) -> Value {
    json!({
        "triggers": findings
            .iter()
            .map(|finding| {
                json!({
                    "type": finding.trigger_type.as_str(),
                    "reason": finding.reason,
                    "data": finding.data,
                })
            })
            .collect::<Vec<_>>(),
    })
}

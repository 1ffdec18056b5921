// crates/quality-gate-core/src/core/evaluation.rs
// ============================================================================
// Module: Quality Gate Evaluation Records
// Description: Evaluation runs and their write-once score rows.
// Purpose: Model one evaluation pass with frozen config and partial-failure status.
// Dependencies: crate::core::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! An evaluation run is the orchestration envelope for one scoring pass over
//! one version. The run snapshots its scorer configuration at creation so the
//! stored scores stay interpretable after configuration changes. Score rows
//! are write-once and unique per `(run, provider)` or `(run, query intent)`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::ActorId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::ScorerId;
use crate::core::identifiers::VersionId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Run Status
// ============================================================================

/// Evaluation run lifecycle status.
///
/// # Invariants
/// - Status only advances `Processing -> {Completed, PartialFailure, Failed}`.
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Scorer tasks are in flight.
    Processing,
    /// Every scorer succeeded.
    Completed,
    /// Some scorers succeeded, some failed.
    PartialFailure,
    /// No scorer succeeded.
    Failed,
}

impl RunStatus {
    /// Returns the stable persistence label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::PartialFailure => "partial_failure",
            Self::Failed => "failed",
        }
    }

    /// Parses a persistence label back into a status.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "partial_failure" => Some(Self::PartialFailure),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns true when the run has left the processing state.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        !matches!(self, Self::Processing)
    }

    /// Returns true when the run finished with at least one scorer success.
    #[must_use]
    pub const fn has_scores(self) -> bool {
        matches!(self, Self::Completed | Self::PartialFailure)
    }
}

// ============================================================================
// SECTION: Model Config Snapshot
// ============================================================================

/// Scorer metadata frozen into a run's config snapshot.
///
/// # Invariants
/// - `version` is the scorer's rubric version string at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotScorer {
    /// Scorer identifier.
    pub id: ScorerId,
    /// Human-readable scorer name.
    pub name: String,
    /// Scorer rubric version.
    pub version: String,
}

/// Immutable configuration snapshot stored on each run.
///
/// # Invariants
/// - `detectors` preserves the configured execution order.
/// - Serialized canonically so the persisted form is byte-stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfigSnapshot {
    /// Enabled scorers in execution order.
    pub detectors: Vec<SnapshotScorer>,
}

// ============================================================================
// SECTION: Evaluation Run
// ============================================================================

/// Orchestration envelope of one evaluation pass.
///
/// # Invariants
/// - `id`, `blog_version_id`, `run_at`, `triggered_by`, and `model_config`
///   never change after insert.
/// - `status` only advances from `Processing`; `completed_at` is write-once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRun {
    /// Run identifier.
    pub id: RunId,
    /// Evaluated version.
    pub blog_version_id: VersionId,
    /// Server-clock creation timestamp.
    pub run_at: Timestamp,
    /// Triggering actor; `None` means the system triggered the run.
    pub triggered_by: Option<ActorId>,
    /// Immutable scorer configuration snapshot.
    pub model_config: ModelConfigSnapshot,
    /// Lifecycle status.
    pub status: RunStatus,
    /// Write-once finalization timestamp.
    pub completed_at: Option<Timestamp>,
}

/// Parameters for inserting a new evaluation run.
///
/// # Invariants
/// - The store stamps `run_at` and starts the run in `Processing`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvaluationRun {
    /// Evaluated version.
    pub blog_version_id: VersionId,
    /// Triggering actor; `None` means the system triggered the run.
    pub triggered_by: Option<ActorId>,
    /// Immutable scorer configuration snapshot.
    pub model_config: ModelConfigSnapshot,
}

// ============================================================================
// SECTION: Detector Scores
// ============================================================================

/// Structured details attached to a detector score row.
///
/// # Invariants
/// - All three fields are required by the detector-score contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorDetails {
    /// Scorer model or rubric version string.
    pub model_version: String,
    /// Full raw scorer response, preserved verbatim.
    pub raw_response: Value,
    /// Scoring timestamp (RFC3339).
    pub timestamp: String,
}

/// Write-once AI-likeness score row for one provider.
///
/// # Invariants
/// - `(run_id, provider)` is unique; `0 <= score <= 100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorScore {
    /// Owning run.
    pub run_id: RunId,
    /// Producing provider identifier.
    pub provider: String,
    /// Score in `[0, 100]`.
    pub score: f64,
    /// Structured evidence-bearing details.
    pub details: DetectorDetails,
}

// ============================================================================
// SECTION: AEO Scores
// ============================================================================

/// Per-pillar score included in AEO rationale.
///
/// # Invariants
/// - `score <= max_score`; `reasons` enumerate deterministically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillarScore {
    /// Stable pillar name.
    pub name: String,
    /// Awarded points.
    pub score: f64,
    /// Maximum points for the pillar.
    pub max_score: f64,
    /// Concrete reasons supporting the awarded points.
    pub reasons: Vec<String>,
}

/// Structured rationale persisted with each AEO score row.
///
/// # Invariants
/// - `rubric_version` identifies the frozen weight table.
/// - Pillar maxima sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AeoRationale {
    /// Rubric version that produced the breakdown.
    pub rubric_version: String,
    /// Per-pillar breakdown in rubric order.
    pub pillars: Vec<PillarScore>,
}

/// Write-once AEO score row for one query intent.
///
/// # Invariants
/// - `(run_id, query_intent)` is unique; `0 <= score <= 100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AeoScore {
    /// Owning run.
    pub run_id: RunId,
    /// Query intent the score answers for.
    pub query_intent: String,
    /// Total score in `[0, 100]`, two decimals.
    pub score: f64,
    /// Structured per-pillar rationale.
    pub rationale: AeoRationale,
}

// ============================================================================
// SECTION: Rubric Names
// ============================================================================

/// Provider identifier emitted by the built-in AI-likeness scorer.
pub const AI_LIKENESS_PROVIDER: &str = "ai_likeness";

/// AEO pillar: answerability and intent match.
pub const PILLAR_ANSWERABILITY: &str = "answerability_intent_match";
/// AEO pillar: structural extractability.
pub const PILLAR_STRUCTURE: &str = "structural_extractability";
/// AEO pillar: specificity and factual density.
pub const PILLAR_SPECIFICITY: &str = "specificity_factual_density";
/// AEO pillar: trust and authority.
pub const PILLAR_TRUST: &str = "trust_authority";
/// AEO pillar: query coverage breadth.
pub const PILLAR_COVERAGE: &str = "query_coverage_breadth";
/// AEO pillar: freshness.
pub const PILLAR_FRESHNESS: &str = "freshness";
/// AEO pillar: machine readability.
pub const PILLAR_READABILITY: &str = "machine_readability";

/// AI-likeness category: predictability and entropy.
pub const CATEGORY_PREDICTABILITY: &str = "predictability_entropy";
/// AI-likeness category: sentence/paragraph uniformity.
pub const CATEGORY_UNIFORMITY: &str = "uniformity";
/// AI-likeness category: generic language and cliches.
pub const CATEGORY_GENERIC_LANGUAGE: &str = "generic_language";
/// AI-likeness category: structural template signals.
pub const CATEGORY_TEMPLATE: &str = "structural_template";
/// AI-likeness category: lack of human friction.
pub const CATEGORY_HUMAN_FRICTION: &str = "human_friction";
/// AI-likeness category: over-polish and safety tone.
pub const CATEGORY_OVER_POLISH: &str = "over_polish";

// ============================================================================
// SECTION: AI-Likeness Breakdown
// ============================================================================

/// One category subscore inside an AI-likeness raw response.
///
/// # Invariants
/// - `score <= max_score`; `percentage` is `score / max_score * 100`.
/// - `evidence` enumerates deterministically for identical input text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// Awarded points.
    pub score: f64,
    /// Maximum points for the category.
    pub max_score: f64,
    /// Awarded points as a percentage of the maximum.
    pub percentage: f64,
    /// Human-readable explanation of the award.
    pub explanation: String,
    /// Concrete textual evidence (excerpts and counts).
    pub evidence: Vec<String>,
}

/// Text metadata attached to an AI-likeness raw response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMetadata {
    /// Input length in characters.
    pub text_length: usize,
    /// Input length in whitespace-delimited tokens.
    pub word_count: usize,
}

/// Full AI-likeness raw response persisted inside detector details.
///
/// # Invariants
/// - `total_score` equals the sum of subscore points and never exceeds 100.
/// - Subscores are keyed by the stable `CATEGORY_*` names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiLikenessBreakdown {
    /// Rubric version that produced the breakdown.
    pub rubric_version: String,
    /// Total score in `[0, 100]`.
    pub total_score: f64,
    /// Per-category subscores keyed by stable category name.
    pub subscores: std::collections::BTreeMap<String, CategoryScore>,
    /// Input text metadata.
    pub metadata: TextMetadata,
}

// ============================================================================
// SECTION: Run Aggregates
// ============================================================================

/// Aggregate metrics derived from a run's score rows.
///
/// # Invariants
/// - `detector_mean` is `None` when the run has no detector rows; likewise
///   `aeo_total` for AEO rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunAggregates {
    /// Mean detector score across providers.
    pub detector_mean: Option<f64>,
    /// AEO total for the primary intent.
    pub aeo_total: Option<f64>,
}

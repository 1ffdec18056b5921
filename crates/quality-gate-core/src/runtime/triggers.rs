// crates/quality-gate-core/src/runtime/triggers.rs
// ============================================================================
// Module: Rewrite Trigger Rules
// Description: Deterministic threshold rules deciding when a rewrite fires.
// Purpose: Convert frozen evaluation results into trigger findings and fixes.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Trigger evaluation is a pure function over the parent version's latest
//! scored results. Each rule compares one metric against a literal threshold;
//! a missing metric makes the rule set not evaluable and the orchestrator
//! refuses rather than firing on partial inputs. Findings carry stable reason
//! labels and structured evidence for the cycle audit row.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::core::AiLikenessBreakdown;
use crate::core::PillarScore;
use crate::core::evaluation::CATEGORY_GENERIC_LANGUAGE;
use crate::core::evaluation::CATEGORY_HUMAN_FRICTION;
use crate::core::evaluation::CATEGORY_OVER_POLISH;
use crate::core::evaluation::CATEGORY_PREDICTABILITY;
use crate::core::evaluation::CATEGORY_TEMPLATE;
use crate::core::evaluation::CATEGORY_UNIFORMITY;
use crate::core::evaluation::PILLAR_ANSWERABILITY;
use crate::core::evaluation::PILLAR_STRUCTURE;

// ============================================================================
// SECTION: Thresholds
// ============================================================================

/// AEO totals below this floor trigger a rewrite.
pub const AEO_TOTAL_FLOOR: f64 = 70.0;
/// Answerability pillar scores below this floor trigger a rewrite.
pub const ANSWERABILITY_FLOOR: f64 = 15.0;
/// Structure pillar scores below this floor trigger a rewrite.
pub const STRUCTURE_FLOOR: f64 = 12.0;
/// AI-likeness totals above this ceiling trigger a rewrite.
pub const AI_TOTAL_CEILING: f64 = 60.0;
/// AI-likeness categories above this share of their maximum trigger a rewrite.
pub const AI_CATEGORY_CRITICAL_RATIO: f64 = 0.70;

// ============================================================================
// SECTION: Trigger Types
// ============================================================================

/// Trigger type labels attached to findings.
///
/// # Invariants
/// - Labels are stable for persistence in cycle trigger reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerType {
    /// Overall AEO total under the floor.
    AeoTotalLow,
    /// A critical AEO pillar under its floor.
    AeoPillarCritical,
    /// Overall AI-likeness above the ceiling.
    AiLikenessHigh,
    /// An AI-likeness category above the critical share of its maximum.
    AiCategoryCritical,
}

impl TriggerType {
    /// Returns the stable label for the trigger type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AeoTotalLow => "aeo_total_low",
            Self::AeoPillarCritical => "aeo_pillar_critical",
            Self::AiLikenessHigh => "ai_likeness_high",
            Self::AiCategoryCritical => "ai_category_critical",
        }
    }
}

/// One fired trigger with structured evidence.
///
/// # Invariants
/// - `reason` is the stable label persisted into the cycle's reason list.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerFinding {
    /// Trigger type.
    pub trigger_type: TriggerType,
    /// Stable reason label (type label, optionally suffixed with the metric).
    pub reason: String,
    /// Structured evidence for the cycle audit row.
    pub data: Value,
}

/// Inputs required to evaluate the full trigger rule set.
///
/// # Invariants
/// - Both score families must come from the same evaluation run of the
///   parent version.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerInputs {
    /// AEO total for the primary intent.
    pub aeo_total: f64,
    /// AEO pillar breakdown in rubric order.
    pub pillars: Vec<PillarScore>,
    /// Full AI-likeness breakdown.
    pub ai: AiLikenessBreakdown,
}

/// Trigger evaluation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TriggerEvalError {
    /// A rule's input metric is missing from the latest run.
    #[error("trigger not evaluable: missing metric {0}")]
    NotEvaluable(String),
}

// ============================================================================
// SECTION: Rule Evaluation
// ============================================================================

/// Evaluates the full trigger rule set against the provided inputs.
///
/// Returns the fired findings in fixed rule order; an empty vector means no
/// rewrite is required.
///
/// # Errors
///
/// Returns [`TriggerEvalError::NotEvaluable`] when a rule's input pillar is
/// absent from the breakdown.
pub fn evaluate_triggers(inputs: &TriggerInputs) -> Result<Vec<TriggerFinding>, TriggerEvalError> {
    let mut findings = Vec::new();

    if inputs.aeo_total < AEO_TOTAL_FLOOR {
        findings.push(TriggerFinding {
            trigger_type: TriggerType::AeoTotalLow,
            reason: TriggerType::AeoTotalLow.as_str().to_string(),
            data: json!({
                "metric": "aeo_total",
                "value": inputs.aeo_total,
                "threshold": AEO_TOTAL_FLOOR,
            }),
        });
    }

    let answerability = pillar_score(&inputs.pillars, PILLAR_ANSWERABILITY)?;
    if answerability < ANSWERABILITY_FLOOR {
        findings.push(pillar_finding(PILLAR_ANSWERABILITY, answerability, ANSWERABILITY_FLOOR));
    }

    let structure = pillar_score(&inputs.pillars, PILLAR_STRUCTURE)?;
    if structure < STRUCTURE_FLOOR {
        findings.push(pillar_finding(PILLAR_STRUCTURE, structure, STRUCTURE_FLOOR));
    }

    if inputs.ai.total_score > AI_TOTAL_CEILING {
        findings.push(TriggerFinding {
            trigger_type: TriggerType::AiLikenessHigh,
            reason: TriggerType::AiLikenessHigh.as_str().to_string(),
            data: json!({
                "metric": "ai_likeness_total",
                "value": inputs.ai.total_score,
                "threshold": AI_TOTAL_CEILING,
            }),
        });
    }

    // BTreeMap iteration keeps category findings in stable name order.
    for (name, category) in &inputs.ai.subscores {
        if category.max_score > 0.0
            && category.score > category.max_score * AI_CATEGORY_CRITICAL_RATIO
        {
            findings.push(TriggerFinding {
                trigger_type: TriggerType::AiCategoryCritical,
                reason: format!("{}:{name}", TriggerType::AiCategoryCritical.as_str()),
                data: json!({
                    "metric": name,
                    "value": category.score,
                    "max_score": category.max_score,
                    "critical_ratio": AI_CATEGORY_CRITICAL_RATIO,
                }),
            });
        }
    }

    Ok(findings)
}

/// Looks up a pillar score by stable name.
fn pillar_score(pillars: &[PillarScore], name: &str) -> Result<f64, TriggerEvalError> {
    pillars
        .iter()
        .find(|pillar| pillar.name == name)
        .map(|pillar| pillar.score)
        .ok_or_else(|| TriggerEvalError::NotEvaluable(name.to_string()))
}

/// Builds a pillar-critical finding.
fn pillar_finding(name: &str, value: f64, threshold: f64) -> TriggerFinding {
    TriggerFinding {
        trigger_type: TriggerType::AeoPillarCritical,
        reason: format!("{}:{name}", TriggerType::AeoPillarCritical.as_str()),
        data: json!({
            "metric": name,
            "value": value,
            "threshold": threshold,
        }),
    }
}

// ============================================================================
// SECTION: Required Fixes
// ============================================================================

/// Maps fired findings onto the fixed required-fix instruction table.
///
/// The result preserves rule order and deduplicates repeated instructions.
#[must_use]
pub fn required_fixes(findings: &[TriggerFinding]) -> Vec<String> {
    let mut fixes: Vec<String> = Vec::new();
    for finding in findings {
        let fix = fix_for(finding);
        if !fixes.iter().any(|existing| existing == &fix) {
            fixes.push(fix);
        }
    }
    fixes
}

/// Returns the fix instruction for one finding.
fn fix_for(finding: &TriggerFinding) -> String {
    match finding.trigger_type {
        TriggerType::AeoTotalLow => {
            "Lead with the answer, tighten every section, and remove filler so the piece \
             directly serves its core query."
                .to_string()
        }
        TriggerType::AeoPillarCritical => {
            let metric = finding
                .data
                .get("metric")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if metric == PILLAR_STRUCTURE {
                "Add descriptive headings and break dense paragraphs into bullet lists so key \
                 points are extractable."
                    .to_string()
            } else {
                "Move a direct answer to the core question into the first 120 words.".to_string()
            }
        }
        TriggerType::AiLikenessHigh => {
            "Vary sentence structure and length, and add concrete examples grounded in the \
             existing facts."
                .to_string()
        }
        TriggerType::AiCategoryCritical => {
            let metric = finding
                .data
                .get("metric")
                .and_then(Value::as_str)
                .unwrap_or_default();
            category_fix(metric)
        }
    }
}

/// Returns the fix instruction for a critical AI-likeness category.
fn category_fix(category: &str) -> String {
    let fix = match category {
        CATEGORY_PREDICTABILITY => {
            "Broaden the vocabulary and avoid repeating the same words and word shapes."
        }
        CATEGORY_UNIFORMITY => {
            "Mix short and long sentences and vary paragraph sizes instead of uniform blocks."
        }
        CATEGORY_GENERIC_LANGUAGE => {
            "Replace stock phrases and cliches with specific, concrete statements."
        }
        CATEGORY_TEMPLATE => {
            "Drop the formulaic opening and template transitions; start from the subject itself."
        }
        CATEGORY_HUMAN_FRICTION => {
            "Allow natural contractions and an occasional informal aside where appropriate."
        }
        CATEGORY_OVER_POLISH => {
            "Cut hedging and disclaimers; state what the content actually claims."
        }
        other => return format!("Reduce the {other} signal flagged by the AI-likeness rubric."),
    };
    fix.to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

// crates/quality-gate-core/src/runtime/trend.rs
// ============================================================================
// Module: Rewrite Trend Classification
// Description: Trend outcomes and loop-breaking rules over cycle history.
// Purpose: Bound rewrite loops deterministically before they burn cycles.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Trend classification compares a child version's aggregates against its
//! parent's: AEO gains and AI-likeness reductions are both improvements.
//! Loop-breaking inspects the blog's cycle history before any new cycle is
//! produced and stops on cycle ceilings, consecutive stagnation, regression,
//! or oscillation inside a narrow score band.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::RewriteCycle;
use crate::core::RewriteStatus;
use crate::core::ScoreSnapshot;
use crate::core::StopReason;
use crate::core::TrendOutcome;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Minimum delta treated as a meaningful score change.
pub const MEANINGFUL_DELTA: f64 = 5.0;
/// Per-parent cycle ceiling; reaching it stops further rewrites.
pub const MAX_CYCLE_NUMBER: u32 = 3;
/// Consecutive stagnant cycles that stop further rewrites.
pub const STAGNANT_CYCLE_LIMIT: usize = 2;
/// Number of recent child AEO totals inspected for oscillation.
pub const OSCILLATION_WINDOW: usize = 3;
/// Maximum AEO span inside the oscillation window before stopping.
pub const OSCILLATION_SPAN: f64 = 3.0;

// ============================================================================
// SECTION: Trend Classification
// ============================================================================

/// Classifies the trend of a child snapshot against its parent snapshot.
///
/// Lower AI-likeness is better, so the AI delta is parent minus child.
#[must_use]
pub fn classify_trend(parent: ScoreSnapshot, child: ScoreSnapshot) -> TrendOutcome {
    let aeo_delta = child.aeo_total - parent.aeo_total;
    let ai_delta = parent.ai_likeness_total - child.ai_likeness_total;

    if aeo_delta >= MEANINGFUL_DELTA && ai_delta >= MEANINGFUL_DELTA {
        TrendOutcome::Improving
    } else if aeo_delta <= -MEANINGFUL_DELTA || ai_delta <= -MEANINGFUL_DELTA {
        TrendOutcome::Regressing
    } else if aeo_delta >= MEANINGFUL_DELTA {
        TrendOutcome::PartialImprovement
    } else {
        TrendOutcome::Stagnant
    }
}

// ============================================================================
// SECTION: Loop Breaking
// ============================================================================

/// Evaluates the loop-breaking rules before a new cycle is produced.
///
/// `parent_cycles` are the cycles already recorded for the target parent
/// version; `blog_cycles` are every cycle across the blog ordered by
/// `(created_at, id)`. Returns the first stop reason that applies.
#[must_use]
pub fn evaluate_stop(
    parent_cycles: &[RewriteCycle],
    blog_cycles: &[RewriteCycle],
) -> Option<StopReason> {
    let max_parent_cycle =
        parent_cycles.iter().map(|cycle| cycle.cycle_number).max().unwrap_or(0);
    if max_parent_cycle >= MAX_CYCLE_NUMBER {
        return Some(StopReason::MaxCyclesReached);
    }

    let classified: Vec<&RewriteCycle> = blog_cycles
        .iter()
        .filter(|cycle| cycle.trend_outcome.is_some())
        .collect();

    if classified.len() >= STAGNANT_CYCLE_LIMIT
        && classified[classified.len() - STAGNANT_CYCLE_LIMIT..]
            .iter()
            .all(|cycle| cycle.trend_outcome == Some(TrendOutcome::Stagnant))
    {
        return Some(StopReason::NoImprovement);
    }

    if let Some(last) = classified.last()
        && last.trend_outcome == Some(TrendOutcome::Regressing)
    {
        return Some(StopReason::QualityDegradation);
    }

    let child_totals: Vec<f64> = blog_cycles
        .iter()
        .filter(|cycle| cycle.rewrite_status == RewriteStatus::Completed)
        .filter_map(|cycle| cycle.child_scores.map(|scores| scores.aeo_total))
        .collect();
    if child_totals.len() >= OSCILLATION_WINDOW {
        let window = &child_totals[child_totals.len() - OSCILLATION_WINDOW..];
        let mut low = f64::INFINITY;
        let mut high = f64::NEG_INFINITY;
        for total in window {
            low = low.min(*total);
            high = high.max(*total);
        }
        if high - low < OSCILLATION_SPAN {
            return Some(StopReason::OscillationDetected);
        }
    }

    None
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use serde_json::json;

    use super::*;
    use crate::core::CycleId;
    use crate::core::Timestamp;
    use crate::core::VersionId;

    /// Builds a snapshot from totals.
    const fn snapshot(aeo_total: f64, ai_likeness_total: f64) -> ScoreSnapshot {
        ScoreSnapshot {
            aeo_total,
            ai_likeness_total,
        }
    }

    /// Builds a completed cycle with the given trend and child AEO total.
    fn completed_cycle(id: u64, trend: TrendOutcome, child_aeo: f64) -> RewriteCycle {
        RewriteCycle {
            id: CycleId::from_raw(id).unwrap(),
            parent_version_id: VersionId::from_raw(id).unwrap(),
            child_version_id: VersionId::from_raw(id + 1),
            cycle_number: 1,
            trigger_reasons: vec!["aeo_total_low".to_string()],
            trigger_data: json!({}),
            rewrite_prompt: "prompt".to_string(),
            parent_scores: Some(snapshot(60.0, 50.0)),
            child_scores: Some(snapshot(child_aeo, 45.0)),
            trend_outcome: Some(trend),
            rewrite_status: RewriteStatus::Completed,
            stop_reason: None,
            created_at: Timestamp::from_unix_millis(i64::try_from(id).unwrap() * 1_000),
        }
    }

    #[test]
    fn improving_requires_both_meaningful_deltas() {
        let outcome = classify_trend(snapshot(65.0, 45.0), snapshot(72.0, 38.0));
        assert_eq!(outcome, TrendOutcome::Improving);
        assert_eq!(outcome.code(), 1);
    }

    #[test]
    fn aeo_only_gain_is_partial_improvement() {
        let outcome = classify_trend(snapshot(65.0, 45.0), snapshot(72.0, 42.0));
        assert_eq!(outcome, TrendOutcome::PartialImprovement);
        assert_eq!(outcome.code(), 2);
    }

    #[test]
    fn small_aeo_moves_are_stagnant() {
        let outcome = classify_trend(snapshot(65.0, 45.0), snapshot(68.0, 44.0));
        assert_eq!(outcome, TrendOutcome::Stagnant);
        assert_eq!(outcome.code(), 3);
    }

    #[test]
    fn ai_likeness_spike_is_regressing_even_with_aeo_gain() {
        let outcome = classify_trend(snapshot(65.0, 45.0), snapshot(72.0, 51.0));
        assert_eq!(outcome, TrendOutcome::Regressing);
        assert_eq!(outcome.code(), 4);
    }

    #[test]
    fn parent_cycle_ceiling_stops_first() {
        let mut third = completed_cycle(1, TrendOutcome::Improving, 80.0);
        third.cycle_number = 3;
        let parent_cycles = vec![third.clone()];
        let stop = evaluate_stop(&parent_cycles, &[third]);
        assert_eq!(stop, Some(StopReason::MaxCyclesReached));
    }

    #[test]
    fn two_consecutive_stagnant_cycles_stop() {
        let blog_cycles = vec![
            completed_cycle(1, TrendOutcome::Improving, 70.0),
            completed_cycle(2, TrendOutcome::Stagnant, 71.0),
            completed_cycle(3, TrendOutcome::Stagnant, 79.0),
        ];
        let stop = evaluate_stop(&[], &blog_cycles);
        assert_eq!(stop, Some(StopReason::NoImprovement));
    }

    #[test]
    fn latest_regressing_cycle_stops() {
        let blog_cycles = vec![
            completed_cycle(1, TrendOutcome::Improving, 70.0),
            completed_cycle(2, TrendOutcome::Regressing, 58.0),
        ];
        let stop = evaluate_stop(&[], &blog_cycles);
        assert_eq!(stop, Some(StopReason::QualityDegradation));
    }

    #[test]
    fn narrow_aeo_band_is_oscillation() {
        let blog_cycles = vec![
            completed_cycle(1, TrendOutcome::PartialImprovement, 71.0),
            completed_cycle(2, TrendOutcome::PartialImprovement, 72.5),
            completed_cycle(3, TrendOutcome::PartialImprovement, 70.8),
        ];
        let stop = evaluate_stop(&[], &blog_cycles);
        assert_eq!(stop, Some(StopReason::OscillationDetected));
    }

    #[test]
    fn wide_aeo_band_does_not_oscillate() {
        let blog_cycles = vec![
            completed_cycle(1, TrendOutcome::PartialImprovement, 65.0),
            completed_cycle(2, TrendOutcome::PartialImprovement, 72.5),
            completed_cycle(3, TrendOutcome::PartialImprovement, 70.8),
        ];
        assert_eq!(evaluate_stop(&[], &blog_cycles), None);
    }
}

// crates/quality-gate-core/tests/proptest_trend.rs
// ============================================================================
// Module: Trend Classification Property Tests
// Description: Invariants of trend classification over arbitrary snapshots.
// Purpose: Check exhaustiveness and symmetry properties of the trend table.
// Dependencies: quality-gate-core, proptest
// ============================================================================

//! ## Overview
//! Property tests over the trend classifier: every snapshot pair classifies
//! into exactly one outcome, regression dominates whenever either metric
//! falls past the meaningful delta, and improvement requires both metrics to
//! clear it.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only panic-based assertions are permitted."
)]

use proptest::prelude::*;
use quality_gate_core::ScoreSnapshot;
use quality_gate_core::TrendOutcome;
use quality_gate_core::runtime::classify_trend;

proptest! {
    #[test]
    fn codes_stay_in_range(
        parent_aeo in 0.0f64..100.0,
        parent_ai in 0.0f64..100.0,
        child_aeo in 0.0f64..100.0,
        child_ai in 0.0f64..100.0,
    ) {
        let outcome = classify_trend(
            ScoreSnapshot { aeo_total: parent_aeo, ai_likeness_total: parent_ai },
            ScoreSnapshot { aeo_total: child_aeo, ai_likeness_total: child_ai },
        );
        prop_assert!((1..=4).contains(&outcome.code()));
    }

    #[test]
    fn regression_dominates_ai_spikes(
        parent_aeo in 0.0f64..100.0,
        parent_ai in 0.0f64..90.0,
        aeo_gain in 5.0f64..30.0,
        ai_spike in 5.0f64..10.0,
    ) {
        // Even with a meaningful AEO gain, a meaningful AI-likeness rise is
        // a regression.
        let outcome = classify_trend(
            ScoreSnapshot { aeo_total: parent_aeo, ai_likeness_total: parent_ai },
            ScoreSnapshot {
                aeo_total: parent_aeo + aeo_gain,
                ai_likeness_total: parent_ai + ai_spike,
            },
        );
        prop_assert_eq!(outcome, TrendOutcome::Regressing);
    }

    #[test]
    fn improvement_requires_both_deltas(
        parent_aeo in 0.0f64..90.0,
        parent_ai in 10.0f64..100.0,
        aeo_gain in 5.0f64..10.0,
        ai_drop in 5.0f64..10.0,
    ) {
        let outcome = classify_trend(
            ScoreSnapshot { aeo_total: parent_aeo, ai_likeness_total: parent_ai },
            ScoreSnapshot {
                aeo_total: parent_aeo + aeo_gain,
                ai_likeness_total: parent_ai - ai_drop,
            },
        );
        prop_assert_eq!(outcome, TrendOutcome::Improving);
    }

    #[test]
    fn tiny_moves_are_stagnant(
        parent_aeo in 10.0f64..90.0,
        parent_ai in 10.0f64..90.0,
        aeo_wiggle in -4.9f64..4.9,
        ai_wiggle in -4.9f64..4.9,
    ) {
        let outcome = classify_trend(
            ScoreSnapshot { aeo_total: parent_aeo, ai_likeness_total: parent_ai },
            ScoreSnapshot {
                aeo_total: parent_aeo + aeo_wiggle,
                ai_likeness_total: parent_ai + ai_wiggle,
            },
        );
        prop_assert_eq!(outcome, TrendOutcome::Stagnant);
    }
}

// crates/quality-gate-scorers/tests/proptest_bounds.rs
// ============================================================================
// Module: Scorer Property Tests
// Description: Bound and determinism laws over arbitrary input text.
// Purpose: Check that no input drives either rubric outside its contract.
// Dependencies: quality-gate-scorers, quality-gate-core, proptest
// ============================================================================

//! ## Overview
//! Property tests over both rubric engines: totals stay inside `[0, 100]`
//! for arbitrary token streams, repeated scoring is componentwise identical,
//! and the AI-likeness accounting identity holds everywhere.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only panic-based assertions are permitted."
)]

use proptest::prelude::*;
use quality_gate_core::Timestamp;
use quality_gate_scorers::score_aeo;
use quality_gate_scorers::score_ai_likeness_at;

proptest! {
    #[test]
    fn ai_likeness_stays_in_bounds_and_is_deterministic(
        tokens in proptest::collection::vec("[a-zA-Z]{1,12}", 5..120),
    ) {
        let text = tokens.join(" ");
        let at = Timestamp::from_unix_millis(0);
        let first = score_ai_likeness_at(&text, at).unwrap();
        prop_assert!((0.0..=100.0).contains(&first.score));
        let sum: f64 =
            first.raw_response.subscores.values().map(|category| category.score).sum();
        prop_assert!((first.score - sum).abs() < f64::EPSILON);

        let second = score_ai_likeness_at(&text, at).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn aeo_stays_in_bounds_and_is_deterministic(
        tokens in proptest::collection::vec("[a-zA-Z0-9#.,-]{1,12}", 1..150),
    ) {
        let text = tokens.join(" ");
        if text.trim().is_empty() {
            return Ok(());
        }
        let first = score_aeo(&text).unwrap();
        prop_assert!((0.0..=100.0).contains(&first.total_score));
        let second = score_aeo(&text).unwrap();
        prop_assert_eq!(first, second);
    }
}

// crates/quality-gate-scorers/tests/aeo.rs
// ============================================================================
// Module: AEO Rubric Tests
// Description: Pillar accounting, determinism, and signal checks for 1.0.0.
// Purpose: Validate the frozen AEO scoring surface.
// Dependencies: quality-gate-scorers, quality-gate-core
// ============================================================================

//! ## Overview
//! Exercises the AEO rubric: the empty-content validation, the 100-point
//! pillar weight identity, two-decimal totals, subject detection feeding the
//! query intent, per-pillar signal checks, and the expected ordering between
//! well-structured and unstructured content.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use quality_gate_core::PillarScore;
use quality_gate_core::core::evaluation::PILLAR_ANSWERABILITY;
use quality_gate_core::core::evaluation::PILLAR_FRESHNESS;
use quality_gate_core::core::evaluation::PILLAR_READABILITY;
use quality_gate_core::core::evaluation::PILLAR_STRUCTURE;
use quality_gate_core::interfaces::ScorerError;
use quality_gate_scorers::AeoResult;
use quality_gate_scorers::score_aeo;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Structured, answer-first markdown content.
const STRUCTURED: &str = "# Postgres Vacuum Tuning\n\nPostgres autovacuum is the background \
                          process that reclaims dead tuples and keeps table bloat under \
                          control. Tuning it well in 2024 means adjusting three settings for \
                          tables over 50 million rows.\n\n## Key Settings\n\n- \
                          autovacuum_vacuum_scale_factor: lower it from 0.2 to 0.01\n- \
                          autovacuum_vacuum_cost_limit: raise it to 2000\n- \
                          autovacuum_naptime: keep the 60 second default\n- \
                          autovacuum_freeze_max_age: leave it at 200 million\n\n## \
                          Monitoring\n\n- track dead tuples via \
                          [pg_stat_user_tables](https://example.com/docs)\n- alert when bloat \
                          passes 20 percent\n- compare against the \
                          [bloat estimator](https://example.com/bloat)\n- re-check after the \
                          2025 upgrade\n\nPostgres teams that applied these numbers cut vacuum \
                          time by 40 percent.";

/// Unstructured rambling prose.
const UNSTRUCTURED: &str = "so we were thinking about databases and how they get slow \
                            sometimes and maybe there are ways to make them less slow but it \
                            depends on lots of things and nobody really knows until you try \
                            which is kind of the point anyway things got better eventually \
                            after we poked at settings for a while and waited";

/// Returns a pillar by name.
fn pillar<'a>(result: &'a AeoResult, name: &str) -> &'a PillarScore {
    result.pillars.iter().find(|pillar| pillar.name == name).unwrap()
}

// ============================================================================
// SECTION: Validation and Accounting
// ============================================================================

#[test]
fn empty_content_fails_validation() {
    assert!(matches!(score_aeo(""), Err(ScorerError::Validation(_))));
    assert!(matches!(score_aeo("  \n "), Err(ScorerError::Validation(_))));
}

#[test]
fn pillar_maxima_sum_to_one_hundred() {
    let result = score_aeo(STRUCTURED).unwrap();
    let max_total: f64 = result.pillars.iter().map(|pillar| pillar.max_score).sum();
    assert!((max_total - 100.0).abs() < f64::EPSILON);
    assert_eq!(result.pillars.len(), 7);
}

#[test]
fn totals_are_rounded_to_two_decimals() {
    let result = score_aeo(STRUCTURED).unwrap();
    let scaled = result.total_score * 100.0;
    assert!((scaled - scaled.round()).abs() < 1e-9);
    assert!((0.0..=100.0).contains(&result.total_score));
}

#[test]
fn identical_content_scores_identically() {
    let first = score_aeo(STRUCTURED).unwrap();
    let second = score_aeo(STRUCTURED).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.rubric_version, "1.0.0");
}

// ============================================================================
// SECTION: Signals
// ============================================================================

#[test]
fn query_intent_comes_from_the_first_heading() {
    let result = score_aeo(STRUCTURED).unwrap();
    assert_eq!(result.query_intent, "postgres vacuum tuning");
}

#[test]
fn unstructured_content_falls_back_to_the_primary_intent() {
    let result = score_aeo(UNSTRUCTURED).unwrap();
    assert_eq!(result.query_intent, "primary");
}

#[test]
fn answer_first_content_earns_the_answerability_points() {
    let result = score_aeo(STRUCTURED).unwrap();
    let answerability = pillar(&result, PILLAR_ANSWERABILITY);
    assert!(answerability.score >= 15.0);
    assert!(
        answerability
            .reasons
            .iter()
            .any(|reason| reason.contains("direct answer within first 120 words"))
    );
}

#[test]
fn headings_and_lists_earn_the_structure_points() {
    let result = score_aeo(STRUCTURED).unwrap();
    let structure = pillar(&result, PILLAR_STRUCTURE);
    assert!((structure.score - 20.0).abs() < f64::EPSILON);
}

#[test]
fn year_mentions_drive_freshness() {
    let result = score_aeo(STRUCTURED).unwrap();
    assert!((pillar(&result, PILLAR_FRESHNESS).score - 5.0).abs() < f64::EPSILON);

    let single_year = score_aeo("The 2024 report covers revenue and churn for the year.").unwrap();
    assert!((pillar(&single_year, PILLAR_FRESHNESS).score - 3.0).abs() < f64::EPSILON);

    let no_years = score_aeo(UNSTRUCTURED).unwrap();
    assert!(pillar(&no_years, PILLAR_FRESHNESS).score.abs() < f64::EPSILON);
}

#[test]
fn readability_rewards_the_sentence_length_sweet_spot() {
    let in_band = score_aeo(
        "The cache keeps hot rows in memory so that repeated reads stay fast. Every miss \
         falls through to the primary store and pays the full disk cost. Eviction follows a \
         least recently used policy with a small protected segment.",
    )
    .unwrap();
    assert!((pillar(&in_band, PILLAR_READABILITY).score - 5.0).abs() < f64::EPSILON);
}

// ============================================================================
// SECTION: Discrimination
// ============================================================================

#[test]
fn structured_content_outscores_rambling_prose() {
    let structured = score_aeo(STRUCTURED).unwrap();
    let unstructured = score_aeo(UNSTRUCTURED).unwrap();
    assert!(
        structured.total_score > unstructured.total_score,
        "expected structured ({}) > unstructured ({})",
        structured.total_score,
        unstructured.total_score
    );
}

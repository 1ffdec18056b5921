// crates/quality-gate-scorers/tests/ai_likeness.rs
// ============================================================================
// Module: AI-Likeness Rubric Tests
// Description: Determinism, boundaries, and evidence of rubric 1.0.0.
// Purpose: Validate the frozen AI-likeness scoring surface.
// Dependencies: quality-gate-scorers, quality-gate-core
// ============================================================================

//! ## Overview
//! Exercises the AI-likeness rubric: the five-token validation boundary,
//! componentwise determinism, the total/subscore accounting identity,
//! evidence content, and the expected ordering between obviously generated
//! and obviously human prose.

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

use quality_gate_core::Timestamp;
use quality_gate_core::core::evaluation::CATEGORY_GENERIC_LANGUAGE;
use quality_gate_core::core::evaluation::CATEGORY_OVER_POLISH;
use quality_gate_core::core::evaluation::CATEGORY_PREDICTABILITY;
use quality_gate_core::interfaces::ScorerError;
use quality_gate_scorers::score_ai_likeness_at;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Fixed timestamp keeping results fully deterministic.
const AT: Timestamp = Timestamp::from_unix_millis(1_700_000_000_000);

/// Prose saturated with generated-text signals.
const GENERATED: &str = "In today's fast-paced world, it is important to note that automation \
                         can potentially transform documentation. Furthermore, it is worth \
                         noting that outcomes may vary across teams. Moreover, generally \
                         speaking, the landscape of tooling typically continues to evolve. \
                         Additionally, in most cases, teams can seamlessly integrate robust \
                         solutions. In conclusion, one should consult a professional and do \
                         your own research before adopting changes.";

/// Prose with ordinary human friction.
const HUMAN: &str = "Honestly, the deploy went sideways on Tuesday. We hadn't planned for the \
                     cache stampede - rookie mistake, and I'll own that one. Sam spotted it \
                     around 2am. The fix wasn't pretty: we pinned the fleet to the old build, \
                     drained the queue by hand, then shipped a tiny patch. Total downtime? \
                     Eleven minutes. Could've been worse.";

// ============================================================================
// SECTION: Validation Boundaries
// ============================================================================

#[test]
fn four_tokens_fail_validation() {
    let error = score_ai_likeness_at("one two three four", AT).unwrap_err();
    assert!(matches!(error, ScorerError::Validation(_)));
}

#[test]
fn five_tokens_pass_validation() {
    let result = score_ai_likeness_at("one two three four five", AT).unwrap();
    assert!((0.0..=100.0).contains(&result.score));
}

#[test]
fn empty_and_whitespace_text_fail_validation() {
    assert!(matches!(score_ai_likeness_at("", AT), Err(ScorerError::Validation(_))));
    assert!(matches!(score_ai_likeness_at("   \n\t  ", AT), Err(ScorerError::Validation(_))));
}

// ============================================================================
// SECTION: Determinism and Accounting
// ============================================================================

#[test]
fn identical_text_scores_identically() {
    let first = score_ai_likeness_at(GENERATED, AT).unwrap();
    let second = score_ai_likeness_at(GENERATED, AT).unwrap();
    assert_eq!(first, second);
}

#[test]
fn total_equals_the_sum_of_subscores() {
    let result = score_ai_likeness_at(GENERATED, AT).unwrap();
    let sum: f64 = result.raw_response.subscores.values().map(|category| category.score).sum();
    assert!((result.score - sum).abs() < f64::EPSILON);
    assert!(result.score <= 100.0);
}

#[test]
fn versions_are_frozen_on_the_result() {
    let result = score_ai_likeness_at(GENERATED, AT).unwrap();
    assert_eq!(result.model_version, "rubric_v1.0.0");
    assert_eq!(result.raw_response.rubric_version, "1.0.0");
    assert_eq!(result.raw_response.metadata.word_count, GENERATED.split_whitespace().count());
}

#[test]
fn every_category_respects_its_cap() {
    let result = score_ai_likeness_at(GENERATED, AT).unwrap();
    assert_eq!(result.raw_response.subscores.len(), 6);
    for category in result.raw_response.subscores.values() {
        assert!(category.score >= 0.0);
        assert!(category.score <= category.max_score);
        assert!(!category.evidence.is_empty());
    }
}

// ============================================================================
// SECTION: Evidence
// ============================================================================

#[test]
fn predictability_evidence_names_the_repeated_word() {
    let result = score_ai_likeness_at(GENERATED, AT).unwrap();
    let category = &result.raw_response.subscores[CATEGORY_PREDICTABILITY];
    assert!(category.evidence.iter().any(|line| line.starts_with("most repeated: '")));
    assert!(category.evidence.iter().any(|line| line.starts_with("type-token ratio ")));
}

#[test]
fn generated_phrases_appear_in_the_evidence() {
    let result = score_ai_likeness_at(GENERATED, AT).unwrap();
    let category = &result.raw_response.subscores[CATEGORY_GENERIC_LANGUAGE];
    assert!(category.score > 0.0);
    assert!(category.evidence.iter().any(|line| line.contains("in today's fast-paced world")));
}

#[test]
fn hedging_evidence_lists_the_first_hedges() {
    let result = score_ai_likeness_at(GENERATED, AT).unwrap();
    let category = &result.raw_response.subscores[CATEGORY_OVER_POLISH];
    assert!(category.score > 0.0);
    let hedges: Vec<&String> =
        category.evidence.iter().filter(|line| line.starts_with("hedge '")).collect();
    assert!(!hedges.is_empty());
    assert!(hedges.len() <= 3);
}

// ============================================================================
// SECTION: Discrimination
// ============================================================================

#[test]
fn generated_prose_outscores_human_prose() {
    let generated = score_ai_likeness_at(GENERATED, AT).unwrap();
    let human = score_ai_likeness_at(HUMAN, AT).unwrap();
    assert!(
        generated.score > human.score,
        "expected generated ({}) > human ({})",
        generated.score,
        human.score
    );
}

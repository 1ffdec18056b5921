// crates/quality-gate-config/tests/boundary_validation.rs
// ============================================================================
// Module: Config Boundary Tests
// Description: Zero and duplicate values rejected at load time.
// Purpose: Prove misconfiguration fails at startup, not mid-operation.
// Dependencies: quality-gate-config
// ============================================================================

//! ## Overview
//! Every numeric knob rejects zero, detector lists reject empty and
//! duplicate identifiers, and the store section rejects a zero busy
//! timeout. Validation errors name the violated key.

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

use quality_gate_config::ConfigError;
use quality_gate_config::EngineConfig;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Asserts a document fails validation naming the given key.
fn assert_invalid(document: &str, key: &str) {
    let error = EngineConfig::from_toml_str(document).unwrap_err();
    let ConfigError::Invalid(message) = &error else {
        panic!("expected an invalid-config error for {key}, got {error:?}");
    };
    assert!(message.contains(key), "message {message:?} does not name {key}");
}

// ============================================================================
// SECTION: Zero Boundaries
// ============================================================================

#[test]
fn zero_review_duration_is_rejected() {
    assert_invalid("min_review_duration_seconds = 0\n", "min_review_duration_seconds");
}

#[test]
fn zero_fast_approval_threshold_is_rejected() {
    assert_invalid(
        "fast_approval_threshold_seconds = 0\n",
        "fast_approval_threshold_seconds",
    );
}

#[test]
fn zero_rewrite_cycles_are_rejected() {
    assert_invalid("max_rewrite_cycles = 0\n", "max_rewrite_cycles");
}

#[test]
fn zero_review_cycles_are_rejected() {
    assert_invalid("max_review_cycles_per_blog = 0\n", "max_review_cycles_per_blog");
}

#[test]
fn zero_rewriter_timeout_is_rejected() {
    assert_invalid("rewriter_timeout_seconds = 0\n", "rewriter_timeout_seconds");
}

#[test]
fn zero_runner_workers_are_rejected() {
    assert_invalid("[runner]\nworkers = 0\n", "runner.workers");
}

#[test]
fn zero_runner_queue_capacity_is_rejected() {
    assert_invalid("[runner]\nqueue_capacity = 0\n", "runner.queue_capacity");
}

#[test]
fn zero_store_busy_timeout_is_rejected() {
    assert_invalid(
        "[store]\npath = \"/tmp/q.db\"\nbusy_timeout_ms = 0\n",
        "store.busy_timeout_ms",
    );
}

// ============================================================================
// SECTION: Detector Lists
// ============================================================================

#[test]
fn empty_detector_ids_are_rejected() {
    assert_invalid("enabled_detectors = [\"ai_likeness\", \"\"]\n", "enabled_detectors");
}

#[test]
fn duplicate_detector_ids_are_rejected() {
    assert_invalid(
        "enabled_detectors = [\"ai_likeness\", \"aeo\", \"ai_likeness\"]\n",
        "duplicate",
    );
}

// ============================================================================
// SECTION: One-Past Boundaries
// ============================================================================

#[test]
fn the_smallest_positive_values_are_accepted() {
    let document = "min_review_duration_seconds = 1\nfast_approval_threshold_seconds = \
                    1\nmax_rewrite_cycles = 1\nmax_review_cycles_per_blog = \
                    1\nrewriter_timeout_seconds = 1\n";
    let config = EngineConfig::from_toml_str(document).unwrap();
    assert_eq!(config.limits().min_review_duration_seconds, 1);
}

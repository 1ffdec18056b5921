// crates/quality-gate-runner/tests/runner.rs
// ============================================================================
// Module: Workflow Runner Tests
// Description: Retry budgets, idempotency keys, and overload behavior.
// Purpose: Validate at-least-once semantics for both runner implementations.
// Dependencies: quality-gate-runner, quality-gate-core
// ============================================================================

//! ## Overview
//! Exercises both runners: completion and failure outcomes, retry budgets
//! with retryable versus fatal errors, completed-key deduplication, and the
//! pooled runner's bounded-queue overload rejection.

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

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::time::Duration;

use quality_gate_core::RunnerError;
use quality_gate_core::TaskDescriptor;
use quality_gate_core::TaskError;
use quality_gate_core::TaskOutcome;
use quality_gate_core::WorkflowRunner;
use quality_gate_runner::InlineRunner;
use quality_gate_runner::PooledRunner;
use quality_gate_runner::PooledRunnerConfig;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Descriptor with the given key and retry budget.
fn descriptor(key: &str, max_retries: u32) -> TaskDescriptor {
    TaskDescriptor {
        idempotency_key: key.to_string(),
        max_retries,
        timeout: Duration::from_secs(5),
    }
}

// ============================================================================
// SECTION: Inline Runner
// ============================================================================

#[test]
fn inline_runner_completes_synchronously() {
    let runner = InlineRunner::new();
    let ran = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&ran);
    let handle = runner
        .submit(
            descriptor("task-1", 0),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        )
        .unwrap();
    assert_eq!(handle.wait(), TaskOutcome::Completed);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn inline_runner_retries_until_the_budget_is_spent() {
    let runner = InlineRunner::new();
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);
    let handle = runner
        .submit(
            descriptor("flaky", 3),
            Box::new(move || {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    Err(TaskError::Retryable("not yet".to_string()))
                } else {
                    Ok(())
                }
            }),
        )
        .unwrap();
    assert_eq!(handle.wait(), TaskOutcome::Completed);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[test]
fn inline_runner_never_retries_fatal_errors() {
    let runner = InlineRunner::new();
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);
    let handle = runner
        .submit(
            descriptor("fatal", 3),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TaskError::Fatal("broken".to_string()))
            }),
        )
        .unwrap();
    assert_eq!(handle.wait(), TaskOutcome::Failed("broken".to_string()));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[test]
fn inline_runner_deduplicates_completed_keys() {
    let runner = InlineRunner::new();
    let ran = Arc::new(AtomicU32::new(0));
    let first_counter = Arc::clone(&ran);
    runner
        .submit(
            descriptor("same-key", 0),
            Box::new(move || {
                first_counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        )
        .unwrap();

    let second_counter = Arc::clone(&ran);
    let handle = runner
        .submit(
            descriptor("same-key", 0),
            Box::new(move || {
                second_counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        )
        .unwrap();
    assert_eq!(handle.wait(), TaskOutcome::Deduplicated);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn empty_idempotency_keys_are_invalid() {
    let runner = InlineRunner::new();
    let error = match runner.submit(descriptor("", 0), Box::new(|| Ok(()))) {
        Err(error) => error,
        Ok(_) => panic!("expected RunnerError::Invalid"),
    };
    assert!(matches!(error, RunnerError::Invalid(_)));
}

// ============================================================================
// SECTION: Pooled Runner
// ============================================================================

#[test]
fn pooled_runner_completes_and_joins() {
    let runner = PooledRunner::new(PooledRunnerConfig {
        workers: 2,
        queue_capacity: 8,
    });
    let ran = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&ran);
    let handle = runner
        .submit(
            descriptor("pooled-1", 0),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        )
        .unwrap();
    assert_eq!(handle.wait(), TaskOutcome::Completed);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn pooled_runner_retries_retryable_failures() {
    let runner = PooledRunner::new(PooledRunnerConfig {
        workers: 1,
        queue_capacity: 8,
    });
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);
    let handle = runner
        .submit(
            descriptor("pooled-flaky", 2),
            Box::new(move || {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                if attempt == 0 {
                    Err(TaskError::Retryable("transient".to_string()))
                } else {
                    Ok(())
                }
            }),
        )
        .unwrap();
    assert_eq!(handle.wait(), TaskOutcome::Completed);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn pooled_runner_deduplicates_completed_keys() {
    let runner = PooledRunner::new(PooledRunnerConfig {
        workers: 1,
        queue_capacity: 8,
    });
    let first = runner.submit(descriptor("pooled-same", 0), Box::new(|| Ok(()))).unwrap();
    assert_eq!(first.wait(), TaskOutcome::Completed);

    let ran = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&ran);
    let second = runner
        .submit(
            descriptor("pooled-same", 0),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        )
        .unwrap();
    assert_eq!(second.wait(), TaskOutcome::Deduplicated);
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn pooled_runner_rejects_when_the_queue_is_full() {
    let runner = PooledRunner::new(PooledRunnerConfig {
        workers: 1,
        queue_capacity: 1,
    });

    // Block the only worker until the test releases it.
    let (release, released) = mpsc::channel::<()>();
    let released = Arc::new(Mutex::new(released));
    let blocker_gate = Arc::clone(&released);
    let blocker = runner
        .submit(
            descriptor("blocker", 0),
            Box::new(move || {
                let gate = blocker_gate.lock().map_err(|_| {
                    TaskError::Fatal("gate mutex poisoned".to_string())
                })?;
                gate.recv().map_err(|_| TaskError::Fatal("gate closed".to_string()))?;
                Ok(())
            }),
        )
        .unwrap();

    // Fill the queue, then expect an overload rejection.
    let mut saw_overload = false;
    for index in 0..8 {
        match runner.submit(descriptor(&format!("filler-{index}"), 0), Box::new(|| Ok(()))) {
            Ok(_) => {}
            Err(RunnerError::Overloaded {
                retry_after_ms,
            }) => {
                assert!(retry_after_ms.is_some());
                saw_overload = true;
                break;
            }
            Err(other) => panic!("unexpected runner error: {other:?}"),
        }
    }
    assert!(saw_overload);

    release.send(()).unwrap();
    assert_eq!(blocker.wait(), TaskOutcome::Completed);
}

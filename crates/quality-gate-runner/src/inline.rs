// crates/quality-gate-runner/src/inline.rs
// ============================================================================
// Module: Inline Workflow Runner
// Description: Synchronous runner executing tasks on the caller's thread.
// Purpose: Deterministic task execution for tests and nested evaluations.
// Dependencies: quality-gate-core
// ============================================================================

//! ## Overview
//! The inline runner executes each job synchronously inside `submit`, with
//! the same retry and idempotency-key semantics as the pooled runner but no
//! concurrency and no backoff sleeps. Engine behavior under the inline
//! runner is fully deterministic, which is what the test suites and the
//! orchestrator's nested child evaluations need.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;

use quality_gate_core::RunnerError;
use quality_gate_core::TaskDescriptor;
use quality_gate_core::TaskError;
use quality_gate_core::TaskHandle;
use quality_gate_core::TaskJob;
use quality_gate_core::TaskOutcome;
use quality_gate_core::WorkflowRunner;

// ============================================================================
// SECTION: Inline Runner
// ============================================================================

/// Handle resolving to an already-computed outcome.
struct InlineHandle {
    /// Final outcome.
    outcome: TaskOutcome,
}

impl TaskHandle for InlineHandle {
    fn wait(&self) -> TaskOutcome {
        self.outcome.clone()
    }
}

/// Synchronous workflow runner.
///
/// # Invariants
/// - Jobs run to completion before `submit` returns.
/// - Completed idempotency keys never re-execute their jobs.
#[derive(Default)]
pub struct InlineRunner {
    /// Outcomes of completed idempotency keys.
    completed: Mutex<BTreeMap<String, TaskOutcome>>,
}

impl InlineRunner {
    /// Creates an inline runner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkflowRunner for InlineRunner {
    fn submit(
        &self,
        descriptor: TaskDescriptor,
        mut job: TaskJob,
    ) -> Result<Box<dyn TaskHandle>, RunnerError> {
        if descriptor.idempotency_key.is_empty() {
            return Err(RunnerError::Invalid("idempotency key must not be empty".to_string()));
        }
        {
            let completed = self
                .completed
                .lock()
                .map_err(|_| RunnerError::Invalid("key registry poisoned".to_string()))?;
            if completed.contains_key(&descriptor.idempotency_key) {
                return Ok(Box::new(InlineHandle {
                    outcome: TaskOutcome::Deduplicated,
                }));
            }
        }

        let mut attempt: u32 = 0;
        let outcome = loop {
            match job() {
                Ok(()) => break TaskOutcome::Completed,
                Err(TaskError::Fatal(message)) => break TaskOutcome::Failed(message),
                Err(TaskError::Retryable(message)) => {
                    if attempt >= descriptor.max_retries {
                        break TaskOutcome::Failed(message);
                    }
                    attempt += 1;
                }
            }
        };

        let mut completed = self
            .completed
            .lock()
            .map_err(|_| RunnerError::Invalid("key registry poisoned".to_string()))?;
        completed.insert(descriptor.idempotency_key, outcome.clone());
        Ok(Box::new(InlineHandle {
            outcome,
        }))
    }
}

// crates/quality-gate-runner/src/pooled.rs
// ============================================================================
// Module: Pooled Workflow Runner
// Description: Bounded worker pool with retries, backoff, and key dedup.
// Purpose: Execute engine tasks at-least-once without unbounded queueing.
// Dependencies: quality-gate-core
// ============================================================================

//! ## Overview
//! The pooled runner queues tasks onto a bounded channel drained by a fixed
//! set of worker threads. Submission fails fast with an overload error when
//! the queue is full. Retryable failures back off exponentially inside the
//! owning worker; completed idempotency keys are remembered so a resubmitted
//! key resolves without running its job again. The descriptor timeout is a
//! deadline for the job's own external calls; a synchronous job cannot be
//! preempted, so jobs must enforce their deadlines internally.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::SyncSender;
use std::sync::mpsc::TrySendError;
use std::thread;
use std::time::Duration;

use quality_gate_core::RunnerError;
use quality_gate_core::TaskDescriptor;
use quality_gate_core::TaskError;
use quality_gate_core::TaskHandle;
use quality_gate_core::TaskJob;
use quality_gate_core::TaskOutcome;
use quality_gate_core::WorkflowRunner;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default worker thread count.
const DEFAULT_WORKERS: usize = 4;
/// Default queue capacity.
const DEFAULT_QUEUE_CAPACITY: usize = 256;
/// Base backoff between retry attempts.
const BASE_BACKOFF: Duration = Duration::from_millis(50);
/// Upper bound for a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(5);
/// Retry-after hint returned on overload.
const OVERLOAD_RETRY_AFTER_MS: u64 = 100;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Pooled runner configuration.
///
/// # Invariants
/// - `workers` and `queue_capacity` are greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PooledRunnerConfig {
    /// Worker thread count.
    pub workers: usize,
    /// Bounded queue capacity.
    pub queue_capacity: usize,
}

impl Default for PooledRunnerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

// ============================================================================
// SECTION: Task State
// ============================================================================

/// Shared completion state for one submitted task.
struct TaskState {
    /// Final outcome, set exactly once.
    outcome: Mutex<Option<TaskOutcome>>,
    /// Signaled when the outcome is set.
    signal: Condvar,
}

impl TaskState {
    /// Creates an unresolved state.
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            signal: Condvar::new(),
        }
    }

    /// Resolves the state; later resolutions are ignored.
    fn complete(&self, outcome: TaskOutcome) {
        if let Ok(mut guard) = self.outcome.lock() {
            if guard.is_none() {
                *guard = Some(outcome);
            }
            self.signal.notify_all();
        }
    }

    /// Blocks until the state resolves.
    fn wait(&self) -> TaskOutcome {
        let Ok(mut guard) = self.outcome.lock() else {
            return TaskOutcome::Failed("task state mutex poisoned".to_string());
        };
        loop {
            if let Some(outcome) = guard.clone() {
                return outcome;
            }
            match self.signal.wait(guard) {
                Ok(next) => guard = next,
                Err(_) => return TaskOutcome::Failed("task state mutex poisoned".to_string()),
            }
        }
    }
}

/// Joinable handle over the shared state.
struct PooledHandle {
    /// Shared completion state.
    state: Arc<TaskState>,
}

impl TaskHandle for PooledHandle {
    fn wait(&self) -> TaskOutcome {
        self.state.wait()
    }
}

/// Handle that resolves immediately with a fixed outcome.
struct ResolvedHandle {
    /// Fixed outcome.
    outcome: TaskOutcome,
}

impl TaskHandle for ResolvedHandle {
    fn wait(&self) -> TaskOutcome {
        self.outcome.clone()
    }
}

/// One queued unit of work.
struct QueuedTask {
    /// Submission descriptor.
    descriptor: TaskDescriptor,
    /// Job closure.
    job: TaskJob,
    /// Shared completion state.
    state: Arc<TaskState>,
}

// ============================================================================
// SECTION: Pooled Runner
// ============================================================================

/// Key registry shared between submitters and workers.
type KeyRegistry = Arc<Mutex<BTreeMap<String, Arc<TaskState>>>>;

/// Bounded worker-pool workflow runner.
///
/// # Invariants
/// - Completed idempotency keys never re-execute their jobs.
/// - A key submitted while its first task is in flight shares that task's
///   outcome instead of enqueueing a duplicate.
pub struct PooledRunner {
    /// Bounded task queue.
    sender: SyncSender<QueuedTask>,
    /// Idempotency-key registry.
    keys: KeyRegistry,
    /// Worker join handles, taken on drop.
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl PooledRunner {
    /// Creates a runner with the provided configuration.
    #[must_use]
    pub fn new(config: PooledRunnerConfig) -> Self {
        let workers = config.workers.max(1);
        let capacity = config.queue_capacity.max(1);
        let (sender, receiver) = mpsc::sync_channel::<QueuedTask>(capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let worker_receiver = Arc::clone(&receiver);
            handles.push(thread::spawn(move || worker_loop(&worker_receiver)));
        }
        Self {
            sender,
            keys: Arc::new(Mutex::new(BTreeMap::new())),
            workers: Mutex::new(handles),
        }
    }
}

impl Default for PooledRunner {
    fn default() -> Self {
        Self::new(PooledRunnerConfig::default())
    }
}

impl WorkflowRunner for PooledRunner {
    fn submit(
        &self,
        descriptor: TaskDescriptor,
        job: TaskJob,
    ) -> Result<Box<dyn TaskHandle>, RunnerError> {
        if descriptor.idempotency_key.is_empty() {
            return Err(RunnerError::Invalid("idempotency key must not be empty".to_string()));
        }

        let state = {
            let mut keys = self
                .keys
                .lock()
                .map_err(|_| RunnerError::Invalid("key registry poisoned".to_string()))?;
            if let Some(existing) = keys.get(&descriptor.idempotency_key) {
                let resolved = existing
                    .outcome
                    .lock()
                    .ok()
                    .and_then(|outcome| outcome.clone());
                if resolved.is_some() {
                    // Completed key: resolve without re-running the job.
                    return Ok(Box::new(ResolvedHandle {
                        outcome: TaskOutcome::Deduplicated,
                    }));
                }
                // In-flight key: share the original task's outcome.
                return Ok(Box::new(PooledHandle {
                    state: Arc::clone(existing),
                }));
            }
            let state = Arc::new(TaskState::new());
            keys.insert(descriptor.idempotency_key.clone(), Arc::clone(&state));
            state
        };

        let queued = QueuedTask {
            descriptor,
            job,
            state: Arc::clone(&state),
        };
        match self.sender.try_send(queued) {
            Ok(()) => Ok(Box::new(PooledHandle {
                state,
            })),
            Err(TrySendError::Full(rejected)) => {
                self.forget_key(&rejected.descriptor.idempotency_key);
                Err(RunnerError::Overloaded {
                    retry_after_ms: Some(OVERLOAD_RETRY_AFTER_MS),
                })
            }
            Err(TrySendError::Disconnected(rejected)) => {
                self.forget_key(&rejected.descriptor.idempotency_key);
                Err(RunnerError::Terminated)
            }
        }
    }
}

impl PooledRunner {
    /// Removes a key reservation after a failed enqueue.
    fn forget_key(&self, key: &str) {
        if let Ok(mut keys) = self.keys.lock() {
            keys.remove(key);
        }
    }
}

impl Drop for PooledRunner {
    fn drop(&mut self) {
        // Closing the channel lets workers drain the queue and exit.
        let (closed_sender, _) = mpsc::sync_channel::<QueuedTask>(1);
        let open_sender = std::mem::replace(&mut self.sender, closed_sender);
        drop(open_sender);
        if let Ok(mut workers) = self.workers.lock() {
            for handle in workers.drain(..) {
                let _ = handle.join();
            }
        }
    }
}

// ============================================================================
// SECTION: Worker Loop
// ============================================================================

/// Drains queued tasks until the channel closes.
fn worker_loop(receiver: &Mutex<Receiver<QueuedTask>>) {
    loop {
        let task = {
            let Ok(guard) = receiver.lock() else {
                return;
            };
            guard.recv()
        };
        let Ok(mut task) = task else {
            return;
        };
        let outcome = run_with_retries(&task.descriptor, &mut task.job);
        task.state.complete(outcome);
    }
}

/// Runs a job honoring its retry budget with exponential backoff.
fn run_with_retries(descriptor: &TaskDescriptor, job: &mut TaskJob) -> TaskOutcome {
    let mut attempt: u32 = 0;
    loop {
        match job() {
            Ok(()) => return TaskOutcome::Completed,
            Err(TaskError::Fatal(message)) => return TaskOutcome::Failed(message),
            Err(TaskError::Retryable(message)) => {
                if attempt >= descriptor.max_retries {
                    return TaskOutcome::Failed(message);
                }
                thread::sleep(backoff_delay(attempt));
                attempt += 1;
            }
        }
    }
}

/// Exponential backoff with a hard cap.
fn backoff_delay(attempt: u32) -> Duration {
    let multiplier = 2u32.saturating_pow(attempt.min(16));
    BASE_BACKOFF.saturating_mul(multiplier).min(MAX_BACKOFF)
}

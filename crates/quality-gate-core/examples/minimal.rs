// crates/quality-gate-core/examples/minimal.rs
// ============================================================================
// Module: Quality Gate Minimal Example
// Description: Minimal end-to-end content flow using in-memory adapters.
// Purpose: Demonstrate paste, evaluate, review, and approve without a database.
// Dependencies: quality-gate-core, quality-gate-runner
// ============================================================================

//! ## Overview
//! Runs the full content lifecycle against the in-memory store with stub
//! scorer and rewriter capabilities: create a blog, paste a version,
//! evaluate it, submit it for review, and approve it after the timer. The
//! example is backend-agnostic and suitable for quick verification.

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use quality_gate_core::ActorRole;
use quality_gate_core::AeoRationale;
use quality_gate_core::Clock;
use quality_gate_core::ContentSource;
use quality_gate_core::EngineLimits;
use quality_gate_core::NewActor;
use quality_gate_core::NewVersion;
use quality_gate_core::PillarScore;
use quality_gate_core::QualityEngine;
use quality_gate_core::RunStatus;
use quality_gate_core::ScorerId;
use quality_gate_core::ScorerMetadata;
use quality_gate_core::Timestamp;
use quality_gate_core::interfaces::AeoFinding;
use quality_gate_core::interfaces::ContentStore;
use quality_gate_core::interfaces::Rewriter;
use quality_gate_core::interfaces::RewriterError;
use quality_gate_core::interfaces::Scorer;
use quality_gate_core::interfaces::ScorerError;
use quality_gate_core::interfaces::ScorerOutput;
use quality_gate_core::runtime::InMemoryStore;
use quality_gate_runner::InlineRunner;

/// Error type for example preconditions.
#[derive(Debug)]
struct ExampleError(&'static str);

impl fmt::Display for ExampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Error for ExampleError {}

/// Manually advanced clock so the review timer elapses without sleeping.
struct ExampleClock {
    /// Current unix-millisecond reading.
    now: Mutex<i64>,
}

impl ExampleClock {
    /// Advances the clock by the given duration.
    fn advance(&self, duration: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += i64::try_from(duration.as_millis()).unwrap_or(0);
        }
    }
}

impl Clock for ExampleClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_unix_millis(self.now.lock().map(|now| *now).unwrap_or_default())
    }
}

/// Scorer that returns a fixed AEO result.
struct ExampleScorer;

impl Scorer for ExampleScorer {
    fn id(&self) -> ScorerId {
        ScorerId::new("aeo")
    }

    fn metadata(&self) -> ScorerMetadata {
        ScorerMetadata {
            name: "Example AEO".to_string(),
            version: "1.0.0".to_string(),
        }
    }

    fn score(&self, _text: &str) -> Result<ScorerOutput, ScorerError> {
        Ok(ScorerOutput::Aeo(AeoFinding {
            query_intent: "primary".to_string(),
            total_score: 82.5,
            rationale: AeoRationale {
                rubric_version: "1.0.0".to_string(),
                pillars: vec![PillarScore {
                    name: "answerability_intent_match".to_string(),
                    score: 22.0,
                    max_score: 25.0,
                    reasons: vec!["example reason".to_string()],
                }],
            },
        }))
    }
}

/// Rewriter that echoes the request; unused on this healthy content.
struct ExampleRewriter;

impl Rewriter for ExampleRewriter {
    fn generate(&self, _prompt: &str, _timeout: Duration) -> Result<String, RewriterError> {
        Err(RewriterError::Failed("the example never rewrites".to_string()))
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let clock = Arc::new(ExampleClock {
        now: Mutex::new(1_700_000_000_000),
    });
    let store = Arc::new(InMemoryStore::new(clock.clone()));

    let writer = store.create_actor(NewActor {
        email: "writer@example.com".to_string(),
        role: ActorRole::Writer,
        is_human: true,
    })?;
    let reviewer = store.create_actor(NewActor {
        email: "reviewer@example.com".to_string(),
        role: ActorRole::Reviewer,
        is_human: true,
    })?;
    let system = store.create_actor(NewActor {
        email: "automation@example.com".to_string(),
        role: ActorRole::System,
        is_human: false,
    })?;

    let engine = QualityEngine::builder()
        .content_store(store.clone())
        .evaluation_store(store.clone())
        .rewrite_store(store)
        .scorer(Arc::new(ExampleScorer))
        .rewriter(Arc::new(ExampleRewriter))
        .workflow_runner(Arc::new(InlineRunner::new()))
        .clock(clock.clone())
        .system_actor(system.id)
        .limits(EngineLimits::default())
        .build()?;

    let blog = engine.create_blog("Launch Notes", writer.id, None)?;
    let version = engine.append_version(NewVersion {
        blog_id: blog.id,
        content: "The launch notes describe the rollout plan in detail.".to_string(),
        source: ContentSource::HumanPaste,
        parent_version_id: None,
        source_rewrite_cycle_id: None,
        change_reason: None,
        created_by: writer.id,
    })?;

    let run = engine.start_evaluation(version.id, Some(writer.id))?;
    let report = engine.get_evaluation(run.id)?;
    if report.run.status != RunStatus::Completed {
        return Err(Box::new(ExampleError("evaluation did not complete")));
    }
    if report.aeo_scores.len() != 1 {
        return Err(Box::new(ExampleError("expected one aeo score row")));
    }

    engine.start_review(version.id, writer.id)?;
    clock.advance(Duration::from_secs(300));
    let approval = engine.approve(
        blog.id,
        version.id,
        reviewer.id,
        "Meets the editorial quality standard.",
        None,
    )?;
    if approval.approved_version_id != version.id {
        return Err(Box::new(ExampleError("approval points at the wrong version")));
    }
    let current = engine
        .current_approval(blog.id)?
        .ok_or(ExampleError("expected a current approval"))?;
    if current.id != approval.id {
        return Err(Box::new(ExampleError("current approval mismatch")));
    }
    Ok(())
}

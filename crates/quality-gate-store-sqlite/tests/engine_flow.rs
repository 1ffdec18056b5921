// crates/quality-gate-store-sqlite/tests/engine_flow.rs
// ============================================================================
// Module: Durable Engine Flow Tests
// Description: End-to-end engine scenarios over the SQLite store.
// Purpose: Prove the full stack composes: store, scorers, runner, engines.
// Dependencies: quality-gate-store-sqlite, quality-gate-core, quality-gate-runner,
// quality-gate-scorers, tempfile
// ============================================================================

//! ## Overview
//! Drives the engine facade against the durable store with the real rubric
//! engines and the inline runner: paste and evaluate, orchestrate a rewrite
//! of weak content, review and approve under the timer, and confirm the
//! approval blocks later automation.

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
use std::time::Duration;

use quality_gate_core::Actor;
use quality_gate_core::ActorRole;
use quality_gate_core::Blog;
use quality_gate_core::Clock;
use quality_gate_core::ContentSource;
use quality_gate_core::ErrorKind;
use quality_gate_core::NewActor;
use quality_gate_core::NewVersion;
use quality_gate_core::QualityEngine;
use quality_gate_core::ReviewState;
use quality_gate_core::RewriteStatus;
use quality_gate_core::RunStatus;
use quality_gate_core::Timestamp;
use quality_gate_core::interfaces::ContentStore;
use quality_gate_core::interfaces::Rewriter;
use quality_gate_core::interfaces::RewriterError;
use quality_gate_core::runtime::RewriteOutcome;
use quality_gate_runner::InlineRunner;
use quality_gate_scorers::ScorerRegistry;
use quality_gate_store_sqlite::JournalMode;
use quality_gate_store_sqlite::SqliteQualityStore;
use quality_gate_store_sqlite::SqliteStoreConfig;
use quality_gate_store_sqlite::SyncMode;
use tempfile::TempDir;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Weak draft: unstructured, answer-free, stuffed with generated phrasing.
const WEAK_DRAFT: &str = "In today's fast-paced world, it is important to note that content \
                          strategy can potentially matter. Generally speaking, teams typically \
                          explore the landscape of options. Furthermore, it is worth noting \
                          that results may vary. Moreover, in most cases, one should consult a \
                          professional before deciding anything about anything at all.";

/// Structured rewrite the scripted rewriter returns.
const STRONG_REWRITE: &str = "# Content Strategy Checklist\n\nContent strategy is the plan \
                              that decides what gets written, for whom, and when it ships. \
                              The checklist below covers the 5 decisions that matter in \
                              2025.\n\n## Decisions\n\n- pick 3 audience segments and name \
                              them\n- set a cadence of 2 posts per week\n- assign 1 owner per \
                              channel\n- review metrics every 30 days\n\n## Metrics\n\n- \
                              organic visits per post\n- conversion rate per segment\n- decay \
                              after 90 days\n\nTeams using this checklist cut planning time by \
                              40 percent in 2024.";

/// Manual clock shared by the store and the review timer.
struct TestClock {
    /// Current unix-millisecond reading.
    now: Mutex<i64>,
}

impl TestClock {
    /// Creates the clock at a fixed epoch.
    fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(1_700_000_000_000),
        })
    }

    /// Advances the clock.
    fn advance(&self, duration: Duration) {
        *self.now.lock().unwrap() += i64::try_from(duration.as_millis()).unwrap();
    }
}

impl Clock for TestClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_unix_millis(*self.now.lock().unwrap())
    }
}

/// Rewriter returning the canned strong rewrite.
struct CannedRewriter;

impl Rewriter for CannedRewriter {
    fn generate(&self, _prompt: &str, _timeout: Duration) -> Result<String, RewriterError> {
        Ok(STRONG_REWRITE.to_string())
    }
}

/// Full durable engine fixture.
struct Fixture {
    /// Keeps the database directory alive.
    _dir: TempDir,
    /// Shared durable store.
    store: Arc<SqliteQualityStore>,
    /// Shared clock.
    clock: Arc<TestClock>,
    /// Engine facade under test.
    engine: QualityEngine,
    /// Human writer.
    writer: Actor,
    /// Human reviewer.
    reviewer: Actor,
    /// Seeded blog.
    blog: Blog,
}

/// Builds the engine over a fresh database with the built-in scorers.
fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let clock = TestClock::new();
    let config = SqliteStoreConfig {
        path: dir.path().join("quality.db"),
        busy_timeout_ms: 1_000,
        journal_mode: JournalMode::Wal,
        sync_mode: SyncMode::Normal,
    };
    let store = Arc::new(SqliteQualityStore::open(&config, clock.clone()).unwrap());

    let actor = |email: &str, role, is_human| {
        store
            .create_actor(NewActor {
                email: email.to_string(),
                role,
                is_human,
            })
            .unwrap()
    };
    let writer = actor("writer@example.com", ActorRole::Writer, true);
    let reviewer = actor("alice@example.com", ActorRole::Reviewer, true);
    let system = actor("automation@example.com", ActorRole::System, false);

    let registry = ScorerRegistry::with_builtin_scorers(clock.clone()).unwrap();
    let enabled = registry.list_registered();
    let scorers = registry.active(Some(enabled.as_slice())).unwrap();

    let mut builder = QualityEngine::builder()
        .content_store(store.clone())
        .evaluation_store(store.clone())
        .rewrite_store(store.clone())
        .rewriter(Arc::new(CannedRewriter))
        .workflow_runner(Arc::new(InlineRunner::new()))
        .clock(clock.clone())
        .system_actor(system.id);
    for scorer in scorers {
        builder = builder.scorer(scorer);
    }
    let engine = builder.build().unwrap();

    let blog = engine.create_blog("Launch Notes", writer.id, None).unwrap();
    Fixture {
        _dir: dir,
        store,
        clock,
        engine,
        writer,
        reviewer,
        blog,
    }
}

// ============================================================================
// SECTION: Scenarios
// ============================================================================

#[test]
fn paste_evaluate_review_and_approve() {
    let fixture = fixture();
    let version = fixture
        .engine
        .append_version(NewVersion {
            blog_id: fixture.blog.id,
            content: WEAK_DRAFT.to_string(),
            source: ContentSource::HumanPaste,
            parent_version_id: None,
            source_rewrite_cycle_id: None,
            change_reason: None,
            created_by: fixture.writer.id,
        })
        .unwrap();

    let run = fixture.engine.start_evaluation(version.id, Some(fixture.writer.id)).unwrap();
    let report = fixture.engine.get_evaluation(run.id).unwrap();
    assert_eq!(report.run.status, RunStatus::Completed);
    assert_eq!(report.detector_scores.len(), 1);
    assert_eq!(report.detector_scores[0].details.model_version, "rubric_v1.0.0");
    assert_eq!(report.aeo_scores.len(), 1);
    assert_eq!(report.aeo_scores[0].rationale.rubric_version, "1.0.0");

    fixture.engine.start_review(version.id, fixture.writer.id).unwrap();
    fixture.clock.advance(Duration::from_secs(300));
    let approval = fixture
        .engine
        .approve(
            fixture.blog.id,
            version.id,
            fixture.reviewer.id,
            "Meets the editorial quality standard.",
            None,
        )
        .unwrap();
    assert_eq!(approval.approved_version_id, version.id);
    let current = fixture.engine.current_approval(fixture.blog.id).unwrap().unwrap();
    assert_eq!(current.approved_version_id, version.id);
    assert_eq!(
        fixture.store.current_review_state(version.id).unwrap(),
        ReviewState::Approved
    );
}

#[test]
fn weak_content_is_rewritten_then_approval_blocks_automation() {
    let fixture = fixture();
    let version = fixture
        .engine
        .append_version(NewVersion {
            blog_id: fixture.blog.id,
            content: WEAK_DRAFT.to_string(),
            source: ContentSource::HumanPaste,
            parent_version_id: None,
            source_rewrite_cycle_id: None,
            change_reason: None,
            created_by: fixture.writer.id,
        })
        .unwrap();
    fixture.engine.start_evaluation(version.id, None).unwrap();

    // The weak draft trips the rewrite triggers; the cycle completes with a
    // child version and a fresh evaluation.
    let outcome = fixture.engine.orchestrate_rewrite(version.id).unwrap();
    let RewriteOutcome::Completed(cycle) = outcome else {
        panic!("expected a completed rewrite cycle, got {outcome:?}");
    };
    assert_eq!(cycle.rewrite_status, RewriteStatus::Completed);
    assert!(cycle.rewrite_prompt.contains(WEAK_DRAFT));
    let child = fixture
        .engine
        .get_version(cycle.child_version_id.unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(child.source, ContentSource::AiRewrite);
    assert_eq!(child.content, STRONG_REWRITE);
    assert!(cycle.child_scores.unwrap().aeo_total > cycle.parent_scores.unwrap().aeo_total);

    // Approving the child freezes the blog against further automation.
    fixture.engine.start_review(child.id, fixture.writer.id).unwrap();
    fixture.clock.advance(Duration::from_secs(300));
    fixture
        .engine
        .approve(
            fixture.blog.id,
            child.id,
            fixture.reviewer.id,
            "The rewrite resolved the structural issues.",
            None,
        )
        .unwrap();

    let error = fixture.engine.orchestrate_rewrite(version.id).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ApprovedContent);
}

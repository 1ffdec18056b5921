// crates/quality-gate-core/src/lib.rs
// ============================================================================
// Module: Quality Gate Core
// Description: Domain model, interfaces, and runtime engines for the quality gate.
// Purpose: Provide the backend-agnostic core of the content quality engine.
// Dependencies: serde, serde_json, serde_jcs, sha2, thiserror, time
// ============================================================================

//! ## Overview
//! This crate is the core of the Quality Gate content engine: an immutable
//! versioned content model, a fan-out/fan-in evaluation pipeline over
//! pluggable deterministic scorers, a bounded rewrite orchestrator, and a
//! timer-gated human review state machine with audit-grade records.
//!
//! Invariants:
//! - Persisted rows are write-once or partially immutable as documented on
//!   each record type; stores enforce this at their own boundary.
//! - Engines read time only through the injected [`Clock`].
//! - No engine decision depends on in-process mutable state; the store is
//!   the single source of truth.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod engine;
pub mod error;
pub mod interfaces;
pub mod runtime;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::Actor;
pub use core::ActorId;
pub use core::ActorRole;
pub use core::AeoRationale;
pub use core::AeoScore;
pub use core::AiLikenessBreakdown;
pub use core::ApprovalAttempt;
pub use core::ApprovalId;
pub use core::ApprovalState;
pub use core::AttemptResult;
pub use core::Blog;
pub use core::BlogId;
pub use core::CategoryScore;
pub use core::Clock;
pub use core::ContentSource;
pub use core::CycleCompletion;
pub use core::CycleId;
pub use core::DetectorDetails;
pub use core::DetectorScore;
pub use core::Escalation;
pub use core::EscalationId;
pub use core::EscalationReason;
pub use core::EscalationStatus;
pub use core::EvaluationRun;
pub use core::HashAlgorithm;
pub use core::HashDigest;
pub use core::HumanReviewAction;
pub use core::ModelConfigSnapshot;
pub use core::NewActor;
pub use core::NewApproval;
pub use core::NewApprovalAttempt;
pub use core::NewEscalation;
pub use core::NewEvaluationRun;
pub use core::NewReviewAction;
pub use core::NewRewriteCycle;
pub use core::NewVersion;
pub use core::PillarScore;
pub use core::ProjectId;
pub use core::ReviewActionKind;
pub use core::ReviewState;
pub use core::ReviewTransition;
pub use core::RewriteCycle;
pub use core::RewriteStatus;
pub use core::RunAggregates;
pub use core::RunId;
pub use core::RunStatus;
pub use core::ScoreSnapshot;
pub use core::ScorerId;
pub use core::SnapshotScorer;
pub use core::StopReason;
pub use core::SystemClock;
pub use core::TextMetadata;
pub use core::Timestamp;
pub use core::TrendOutcome;
pub use core::Version;
pub use core::VersionId;
pub use engine::EngineBuildError;
pub use engine::EngineLimits;
pub use engine::EvaluationReport;
pub use engine::QualityEngine;
pub use engine::QualityEngineBuilder;
pub use error::EngineError;
pub use error::ErrorKind;
pub use interfaces::AeoFinding;
pub use interfaces::ContentStore;
pub use interfaces::DetectorFinding;
pub use interfaces::EvaluationStore;
pub use interfaces::Rewriter;
pub use interfaces::RewriterError;
pub use interfaces::RewriteStore;
pub use interfaces::RunnerError;
pub use interfaces::Scorer;
pub use interfaces::ScorerError;
pub use interfaces::ScorerMetadata;
pub use interfaces::ScorerOutput;
pub use interfaces::StoreError;
pub use interfaces::TaskDescriptor;
pub use interfaces::TaskError;
pub use interfaces::TaskHandle;
pub use interfaces::TaskJob;
pub use interfaces::TaskOutcome;
pub use interfaces::WorkflowRunner;
pub use telemetry::NoopTelemetry;
pub use telemetry::TelemetryEvent;
pub use telemetry::TelemetrySink;

// crates/quality-gate-core/src/core/mod.rs
// ============================================================================
// Module: Quality Gate Core Types
// Description: Domain records, identifiers, hashing, and time primitives.
// Purpose: Aggregate the persisted data model shared by all engine components.
// Dependencies: serde, serde_json, sha2, time
// ============================================================================

//! ## Overview
//! The `core` module holds the persisted data model: actors, blogs and
//! versions, evaluation runs and score rows, rewrite cycles, and the review
//! audit surface, together with the identifier, timestamp, and hashing
//! primitives they build on.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod actor;
pub mod content;
pub mod evaluation;
pub mod hashing;
pub mod identifiers;
pub mod review;
pub mod rewrite;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use actor::Actor;
pub use actor::ActorRole;
pub use actor::NewActor;
pub use content::Blog;
pub use content::ContentSource;
pub use content::NewVersion;
pub use content::Version;
pub use evaluation::AeoRationale;
pub use evaluation::AeoScore;
pub use evaluation::AiLikenessBreakdown;
pub use evaluation::CategoryScore;
pub use evaluation::DetectorDetails;
pub use evaluation::DetectorScore;
pub use evaluation::EvaluationRun;
pub use evaluation::ModelConfigSnapshot;
pub use evaluation::NewEvaluationRun;
pub use evaluation::PillarScore;
pub use evaluation::RunAggregates;
pub use evaluation::RunStatus;
pub use evaluation::SnapshotScorer;
pub use evaluation::TextMetadata;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use identifiers::ActorId;
pub use identifiers::ApprovalId;
pub use identifiers::BlogId;
pub use identifiers::CycleId;
pub use identifiers::EscalationId;
pub use identifiers::ProjectId;
pub use identifiers::RunId;
pub use identifiers::ScorerId;
pub use identifiers::VersionId;
pub use review::ApprovalAttempt;
pub use review::ApprovalState;
pub use review::AttemptResult;
pub use review::Escalation;
pub use review::EscalationReason;
pub use review::EscalationStatus;
pub use review::HumanReviewAction;
pub use review::NewApproval;
pub use review::NewApprovalAttempt;
pub use review::NewEscalation;
pub use review::NewReviewAction;
pub use review::ReviewActionKind;
pub use review::ReviewState;
pub use review::ReviewTransition;
pub use rewrite::CycleCompletion;
pub use rewrite::NewRewriteCycle;
pub use rewrite::RewriteCycle;
pub use rewrite::RewriteStatus;
pub use rewrite::ScoreSnapshot;
pub use rewrite::StopReason;
pub use rewrite::TrendOutcome;
pub use time::Clock;
pub use time::SystemClock;
pub use time::Timestamp;

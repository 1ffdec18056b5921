// crates/quality-gate-core/tests/review.rs
// ============================================================================
// Module: Review State Machine Integration Tests
// Description: Timer gates, human verification, rubber-stamps, escalations.
// Purpose: Validate the approval gate sequence and its audit trail.
// Dependencies: quality-gate-core
// ============================================================================

//! ## Overview
//! Exercises the review service over the in-memory store with a manual
//! clock: the full approve flow, timer boundaries at both the 30 s and 300 s
//! deployment configurations, rubber-stamp auditing, the co-signature gate,
//! service-account refusal, repeat-rejection escalation, in-review edits,
//! stale-review archival, and append-only revocation.

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

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::ManualClock;
use quality_gate_core::Actor;
use quality_gate_core::ActorRole;
use quality_gate_core::AttemptResult;
use quality_gate_core::Blog;
use quality_gate_core::ContentSource;
use quality_gate_core::EngineError;
use quality_gate_core::ErrorKind;
use quality_gate_core::EscalationReason;
use quality_gate_core::NewActor;
use quality_gate_core::NewVersion;
use quality_gate_core::NoopTelemetry;
use quality_gate_core::ReviewState;
use quality_gate_core::Version;
use quality_gate_core::interfaces::ContentStore;
use quality_gate_core::runtime::InMemoryStore;
use quality_gate_core::runtime::ReviewConfig;
use quality_gate_core::runtime::ReviewService;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// A valid approval rationale (>= 20 characters).
const RATIONALE: &str = "Meets the editorial quality standard.";

/// Seeded store with reviewer, writer, admin, and service actors.
struct Fixture {
    /// Shared store.
    store: Arc<InMemoryStore>,
    /// Manual clock.
    clock: Arc<ManualClock>,
    /// Human writer.
    writer: Actor,
    /// Human reviewer.
    reviewer: Actor,
    /// Human admin (co-signer).
    admin: Actor,
    /// Non-human service account.
    service: Actor,
    /// Seeded blog.
    blog: Blog,
    /// Seeded root version.
    version: Version,
}

/// Seeds actors, one blog, and one root version.
fn fixture() -> Fixture {
    let clock = ManualClock::at(1_700_000_000_000);
    let store = Arc::new(InMemoryStore::new(clock.clone()));
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
    let admin = actor("admin@example.com", ActorRole::Admin, true);
    let service = actor("bot@example.com", ActorRole::System, false);
    let blog = store.create_blog("Launch Notes", writer.id, None).unwrap();
    let version = store
        .append_version(NewVersion {
            blog_id: blog.id,
            content: "The launch notes describe the release in detail.".to_string(),
            source: ContentSource::HumanPaste,
            parent_version_id: None,
            source_rewrite_cycle_id: None,
            change_reason: None,
            created_by: writer.id,
        })
        .unwrap();
    Fixture {
        store,
        clock,
        writer,
        reviewer,
        admin,
        service,
        blog,
        version,
    }
}

/// Builds a review service with the default 300 s timer.
fn service(fixture: &Fixture) -> ReviewService {
    service_with(fixture, ReviewConfig::default())
}

/// Builds a review service with a custom configuration.
fn service_with(fixture: &Fixture, config: ReviewConfig) -> ReviewService {
    ReviewService::new(
        fixture.store.clone(),
        fixture.clock.clone(),
        Arc::new(NoopTelemetry),
        config,
    )
}

/// Appends another draft version chained onto the given parent.
fn append_draft(fixture: &Fixture, parent: &Version, content: &str) -> Version {
    fixture
        .store
        .append_version(NewVersion {
            blog_id: fixture.blog.id,
            content: content.to_string(),
            source: ContentSource::HumanEdit,
            parent_version_id: Some(parent.id),
            source_rewrite_cycle_id: None,
            change_reason: None,
            created_by: fixture.writer.id,
        })
        .unwrap()
}

// ============================================================================
// SECTION: Approve Flow
// ============================================================================

#[test]
fn full_review_flow_approves_after_the_timer() {
    let fixture = fixture();
    let review = service(&fixture);
    review.submit_for_review(fixture.version.id, fixture.writer.id).unwrap();
    fixture.clock.advance(Duration::from_secs(300));

    let approval = review
        .approve(fixture.blog.id, fixture.version.id, fixture.reviewer.id, RATIONALE, None, None)
        .unwrap();
    assert_eq!(approval.approved_version_id, fixture.version.id);
    assert!(approval.revoked_at.is_none());

    let current = fixture.store.current_approval(fixture.blog.id).unwrap().unwrap();
    assert_eq!(current.id, approval.id);
    assert_eq!(
        fixture.store.current_review_state(fixture.version.id).unwrap(),
        ReviewState::Approved
    );
    let attempts = fixture.store.list_attempts(fixture.blog.id).unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].result, AttemptResult::Success);
    assert!(attempts[0].is_human_snapshot);
}

#[test]
fn timer_boundary_blocks_at_one_second_short() {
    let fixture = fixture();
    let review = service(&fixture);
    review.submit_for_review(fixture.version.id, fixture.writer.id).unwrap();
    fixture.clock.advance(Duration::from_secs(299));

    let error = review
        .approve(fixture.blog.id, fixture.version.id, fixture.reviewer.id, RATIONALE, None, None)
        .unwrap_err();
    let EngineError::InvalidState {
        reason,
        retry_after_seconds,
    } = &error
    else {
        panic!("expected a timer failure, got {error:?}");
    };
    assert_eq!(reason, "timer");
    assert_eq!(*retry_after_seconds, Some(1));

    fixture.clock.advance(Duration::from_secs(1));
    review
        .approve(fixture.blog.id, fixture.version.id, fixture.reviewer.id, RATIONALE, None, None)
        .unwrap();
}

#[test]
fn short_timer_deployments_gate_at_thirty_seconds() {
    let fixture = fixture();
    let review = service_with(
        &fixture,
        ReviewConfig {
            min_review_duration: Duration::from_secs(30),
            ..ReviewConfig::default()
        },
    );
    review.submit_for_review(fixture.version.id, fixture.writer.id).unwrap();
    fixture.clock.advance(Duration::from_secs(29));
    let error = review
        .approve(fixture.blog.id, fixture.version.id, fixture.reviewer.id, RATIONALE, None, None)
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidState);

    fixture.clock.advance(Duration::from_secs(1));
    review
        .approve(fixture.blog.id, fixture.version.id, fixture.reviewer.id, RATIONALE, None, None)
        .unwrap();
}

#[test]
fn eligibility_snapshot_reports_remaining_seconds() {
    let fixture = fixture();
    let review = service(&fixture);
    let before = review.eligibility(fixture.version.id).unwrap();
    assert_eq!(before.state, ReviewState::Draft);
    assert!(!before.can_act);

    review.submit_for_review(fixture.version.id, fixture.writer.id).unwrap();
    fixture.clock.advance(Duration::from_secs(120));
    let during = review.eligibility(fixture.version.id).unwrap();
    assert_eq!(during.state, ReviewState::InReview);
    assert_eq!(during.remaining_seconds, 180);
    assert!(!during.can_act);

    fixture.clock.advance(Duration::from_secs(180));
    let ready = review.eligibility(fixture.version.id).unwrap();
    assert_eq!(ready.remaining_seconds, 0);
    assert!(ready.can_act);
}

// ============================================================================
// SECTION: Rubber Stamps and Co-Signatures
// ============================================================================

#[test]
fn fast_approval_is_marked_and_audited() {
    let fixture = fixture();
    // A 5 s deployment: the timer passes, but the 30 s rubber-stamp
    // threshold still applies against the version's creation time.
    let review = service_with(
        &fixture,
        ReviewConfig {
            min_review_duration: Duration::from_secs(5),
            ..ReviewConfig::default()
        },
    );
    fixture.clock.advance(Duration::from_secs(1));
    review.submit_for_review(fixture.version.id, fixture.writer.id).unwrap();
    fixture.clock.advance(Duration::from_secs(5));

    let approval = review
        .approve(fixture.blog.id, fixture.version.id, fixture.reviewer.id, RATIONALE, None, None)
        .unwrap();
    assert_eq!(approval.notes.as_deref(), Some("fast approval"));
    assert_eq!(
        fixture.store.count_fast_approvals_since(
            fixture.reviewer.id,
            quality_gate_core::Timestamp::from_unix_millis(0)
        ),
        Ok(1)
    );
}

#[test]
fn repeated_fast_approvals_require_a_cosigner() {
    let fixture = fixture();
    let review = service_with(
        &fixture,
        ReviewConfig {
            min_review_duration: Duration::from_secs(1),
            ..ReviewConfig::default()
        },
    );

    let mut parent = fixture.version.clone();
    // Three fast approvals inside the 24 h window.
    for index in 0..3 {
        let target = if index == 0 {
            parent.clone()
        } else {
            let draft = append_draft(&fixture, &parent, &format!("fast draft number {index}"));
            parent = draft.clone();
            draft
        };
        review.submit_for_review(target.id, fixture.writer.id).unwrap();
        fixture.clock.advance(Duration::from_secs(1));
        review
            .approve(fixture.blog.id, target.id, fixture.reviewer.id, RATIONALE, None, None)
            .unwrap();
    }

    let fourth = append_draft(&fixture, &parent, "a fourth suspiciously fast draft");
    review.submit_for_review(fourth.id, fixture.writer.id).unwrap();
    fixture.clock.advance(Duration::from_secs(1));

    let error = review
        .approve(fixture.blog.id, fourth.id, fixture.reviewer.id, RATIONALE, None, None)
        .unwrap_err();
    assert_eq!(
        error,
        EngineError::Forbidden {
            reason: "cosign_required".to_string()
        }
    );

    // A human admin co-signature unlocks the gate.
    review
        .approve(
            fixture.blog.id,
            fourth.id,
            fixture.reviewer.id,
            RATIONALE,
            Some(fixture.admin.id),
            None,
        )
        .unwrap();
}

#[test]
fn cosign_refusal_wins_over_a_short_rationale() {
    let fixture = fixture();
    let review = service_with(
        &fixture,
        ReviewConfig {
            min_review_duration: Duration::from_secs(1),
            ..ReviewConfig::default()
        },
    );

    let mut parent = fixture.version.clone();
    for index in 0..3 {
        let target = if index == 0 {
            parent.clone()
        } else {
            let draft = append_draft(&fixture, &parent, &format!("fast draft number {index}"));
            parent = draft.clone();
            draft
        };
        review.submit_for_review(target.id, fixture.writer.id).unwrap();
        fixture.clock.advance(Duration::from_secs(1));
        review
            .approve(fixture.blog.id, target.id, fixture.reviewer.id, RATIONALE, None, None)
            .unwrap();
    }

    let fourth = append_draft(&fixture, &parent, "a fourth suspiciously fast draft");
    review.submit_for_review(fourth.id, fixture.writer.id).unwrap();
    fixture.clock.advance(Duration::from_secs(1));

    // The co-signature gate comes before the rationale gate, so a reviewer
    // who needs a co-signer sees cosign_required even with a bad rationale.
    let error = review
        .approve(fixture.blog.id, fourth.id, fixture.reviewer.id, "too short", None, None)
        .unwrap_err();
    assert_eq!(
        error,
        EngineError::Forbidden {
            reason: "cosign_required".to_string()
        }
    );

    // With a co-signer supplied, the rationale gate is the one that fires.
    let error = review
        .approve(
            fixture.blog.id,
            fourth.id,
            fixture.reviewer.id,
            "too short",
            Some(fixture.admin.id),
            None,
        )
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidState);
    let attempts = fixture.store.list_attempts(fixture.blog.id).unwrap();
    let last = attempts.last().unwrap();
    assert!(last.failure_reason.as_deref().unwrap().contains("rationale"));
}

// ============================================================================
// SECTION: Gate Failures
// ============================================================================

#[test]
fn service_accounts_cannot_approve() {
    let fixture = fixture();
    let review = service(&fixture);
    review.submit_for_review(fixture.version.id, fixture.writer.id).unwrap();
    fixture.clock.advance(Duration::from_secs(300));

    let error = review
        .approve(fixture.blog.id, fixture.version.id, fixture.service.id, RATIONALE, None, None)
        .unwrap_err();
    assert_eq!(
        error,
        EngineError::Forbidden {
            reason: "User is not marked as human".to_string()
        }
    );

    let attempts = fixture.store.list_attempts(fixture.blog.id).unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].result, AttemptResult::Forbidden);
    assert!(!attempts[0].is_human_snapshot);
    assert_eq!(attempts[0].failure_reason.as_deref(), Some("User is not marked as human"));
    assert!(fixture.store.current_approval(fixture.blog.id).unwrap().is_none());
}

#[test]
fn cross_blog_versions_are_invalid() {
    let fixture = fixture();
    let other_blog = fixture.store.create_blog("Other", fixture.writer.id, None).unwrap();
    let review = service(&fixture);
    review.submit_for_review(fixture.version.id, fixture.writer.id).unwrap();
    fixture.clock.advance(Duration::from_secs(300));

    let error = review
        .approve(other_blog.id, fixture.version.id, fixture.reviewer.id, RATIONALE, None, None)
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidVersion);
    let attempts = fixture.store.list_attempts(other_blog.id).unwrap();
    assert_eq!(attempts[0].result, AttemptResult::InvalidVersion);
}

#[test]
fn draft_versions_cannot_be_approved() {
    let fixture = fixture();
    let review = service(&fixture);
    let error = review
        .approve(fixture.blog.id, fixture.version.id, fixture.reviewer.id, RATIONALE, None, None)
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidState);
    let attempts = fixture.store.list_attempts(fixture.blog.id).unwrap();
    assert_eq!(attempts[0].result, AttemptResult::InvalidState);
}

#[test]
fn short_rationales_are_rejected_and_audited() {
    let fixture = fixture();
    let review = service(&fixture);
    review.submit_for_review(fixture.version.id, fixture.writer.id).unwrap();
    fixture.clock.advance(Duration::from_secs(300));

    let error = review
        .approve(fixture.blog.id, fixture.version.id, fixture.reviewer.id, "too short", None, None)
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidState);
    let attempts = fixture.store.list_attempts(fixture.blog.id).unwrap();
    assert!(attempts[0].failure_reason.as_deref().unwrap().contains("rationale"));
}

// ============================================================================
// SECTION: Rejection and Escalation
// ============================================================================

#[test]
fn rejection_is_terminal_for_the_version() {
    let fixture = fixture();
    let review = service(&fixture);
    review.submit_for_review(fixture.version.id, fixture.writer.id).unwrap();
    fixture.clock.advance(Duration::from_secs(300));
    review
        .reject(fixture.blog.id, fixture.version.id, fixture.reviewer.id, RATIONALE)
        .unwrap();
    assert_eq!(
        fixture.store.current_review_state(fixture.version.id).unwrap(),
        ReviewState::Rejected
    );

    let error = review
        .approve(fixture.blog.id, fixture.version.id, fixture.reviewer.id, RATIONALE, None, None)
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidState);
}

#[test]
fn three_rejections_by_one_reviewer_escalate() {
    let fixture = fixture();
    let review = service(&fixture);
    let mut parent = fixture.version.clone();
    for index in 0..3 {
        let target = if index == 0 {
            parent.clone()
        } else {
            let draft = append_draft(&fixture, &parent, &format!("rejected draft {index}"));
            parent = draft.clone();
            draft
        };
        review.submit_for_review(target.id, fixture.writer.id).unwrap();
        fixture.clock.advance(Duration::from_secs(300));
        review.reject(fixture.blog.id, target.id, fixture.reviewer.id, RATIONALE).unwrap();
    }

    let escalations = fixture.store.list_escalations(fixture.blog.id).unwrap();
    assert!(
        escalations
            .iter()
            .any(|escalation| escalation.reason == EscalationReason::Ambiguity)
    );
}

#[test]
fn exceeding_the_review_cycle_cap_escalates() {
    let fixture = fixture();
    let review = service_with(
        &fixture,
        ReviewConfig {
            max_review_cycles_per_blog: 2,
            ..ReviewConfig::default()
        },
    );
    review.submit_for_review(fixture.version.id, fixture.writer.id).unwrap();
    let second = append_draft(&fixture, &fixture.version, "second draft for review");
    review.submit_for_review(second.id, fixture.writer.id).unwrap();
    assert!(fixture.store.list_escalations(fixture.blog.id).unwrap().is_empty());

    let third = append_draft(&fixture, &second, "third draft for review");
    review.submit_for_review(third.id, fixture.writer.id).unwrap();
    let escalations = fixture.store.list_escalations(fixture.blog.id).unwrap();
    assert_eq!(escalations.len(), 1);
    assert_eq!(escalations[0].reason, EscalationReason::PolicyViolation);
}

// ============================================================================
// SECTION: Edits, Archival, Overrides, Revocation
// ============================================================================

#[test]
fn edits_during_review_start_a_fresh_draft() {
    let fixture = fixture();
    let review = service(&fixture);
    review.submit_for_review(fixture.version.id, fixture.writer.id).unwrap();

    let edited = review
        .edit_during_review(
            fixture.version.id,
            "The launch notes, now with a clarified rollout plan.".to_string(),
            fixture.writer.id,
            Some("clarify rollout".to_string()),
        )
        .unwrap();
    assert_eq!(edited.source, ContentSource::HumanEdit);
    assert_eq!(edited.parent_version_id, Some(fixture.version.id));
    assert_eq!(fixture.store.current_review_state(edited.id).unwrap(), ReviewState::Draft);
    // The prior version keeps its own state and timer.
    assert_eq!(
        fixture.store.current_review_state(fixture.version.id).unwrap(),
        ReviewState::InReview
    );

    let error = review
        .edit_during_review(edited.id, "not in review".to_string(), fixture.writer.id, None)
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidState);
}

#[test]
fn week_old_reviews_are_archived() {
    let fixture = fixture();
    let review = service(&fixture);
    review.submit_for_review(fixture.version.id, fixture.writer.id).unwrap();
    fixture.clock.advance(Duration::from_secs(8 * 24 * 60 * 60));

    let archived = review.archive_stale_reviews(fixture.admin.id).unwrap();
    assert_eq!(archived, vec![fixture.version.id]);
    assert_eq!(
        fixture.store.current_review_state(fixture.version.id).unwrap(),
        ReviewState::Archived
    );
}

#[test]
fn override_requires_both_notes_and_is_audited() {
    let fixture = fixture();
    let review = service(&fixture);
    review.submit_for_review(fixture.version.id, fixture.writer.id).unwrap();

    let error = review
        .request_override(
            fixture.blog.id,
            fixture.version.id,
            fixture.admin.id,
            "urgent legal deadline requires immediate publication",
            "",
        )
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Validation);

    let approval = review
        .request_override(
            fixture.blog.id,
            fixture.version.id,
            fixture.admin.id,
            "urgent legal deadline requires immediate publication",
            "risk accepted by the content owner",
        )
        .unwrap();
    assert_eq!(approval.notes.as_deref(), Some("override"));
    assert_eq!(
        fixture.store.current_review_state(fixture.version.id).unwrap(),
        ReviewState::Approved
    );
}

#[test]
fn revocation_is_append_only_and_reapproval_works() {
    let fixture = fixture();
    let review = service(&fixture);
    review.submit_for_review(fixture.version.id, fixture.writer.id).unwrap();
    fixture.clock.advance(Duration::from_secs(300));
    review
        .approve(fixture.blog.id, fixture.version.id, fixture.reviewer.id, RATIONALE, None, None)
        .unwrap();

    let revocation = fixture
        .store
        .revoke_approval(fixture.blog.id, fixture.admin.id, "factual error found")
        .unwrap();
    assert!(revocation.revoked_at.is_some());
    assert!(fixture.store.current_approval(fixture.blog.id).unwrap().is_none());

    // A fresh approval of a newer version becomes current again.
    let second = append_draft(&fixture, &fixture.version, "corrected draft of the notes");
    review.submit_for_review(second.id, fixture.writer.id).unwrap();
    fixture.clock.advance(Duration::from_secs(300));
    review
        .approve(fixture.blog.id, second.id, fixture.reviewer.id, RATIONALE, None, None)
        .unwrap();
    let current = fixture.store.current_approval(fixture.blog.id).unwrap().unwrap();
    assert_eq!(current.approved_version_id, second.id);
}

// crates/quality-gate-core/tests/common/mod.rs
// ============================================================================
// Module: Core Test Helpers
// Description: Manual clock, scripted scorers, and scripted rewriter.
// Purpose: Deterministic fixtures shared by the engine integration tests.
// Dependencies: quality-gate-core, quality-gate-runner, serde_json
// ============================================================================

//! ## Overview
//! Fixtures keep engine tests deterministic: a manual clock advanced
//! explicitly, scorers scripted as pure functions of the input text, and a
//! rewriter returning canned bodies while recording the prompts it received.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    dead_code,
    reason = "Test-only helpers; each integration test uses a subset."
)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use quality_gate_core::AeoRationale;
use quality_gate_core::AiLikenessBreakdown;
use quality_gate_core::CategoryScore;
use quality_gate_core::Clock;
use quality_gate_core::PillarScore;
use quality_gate_core::ScorerId;
use quality_gate_core::ScorerMetadata;
use quality_gate_core::TextMetadata;
use quality_gate_core::Timestamp;
use quality_gate_core::core::evaluation::AI_LIKENESS_PROVIDER;
use quality_gate_core::core::evaluation::CATEGORY_GENERIC_LANGUAGE;
use quality_gate_core::core::evaluation::CATEGORY_HUMAN_FRICTION;
use quality_gate_core::core::evaluation::CATEGORY_OVER_POLISH;
use quality_gate_core::core::evaluation::CATEGORY_PREDICTABILITY;
use quality_gate_core::core::evaluation::CATEGORY_TEMPLATE;
use quality_gate_core::core::evaluation::CATEGORY_UNIFORMITY;
use quality_gate_core::core::evaluation::PILLAR_ANSWERABILITY;
use quality_gate_core::core::evaluation::PILLAR_COVERAGE;
use quality_gate_core::core::evaluation::PILLAR_FRESHNESS;
use quality_gate_core::core::evaluation::PILLAR_READABILITY;
use quality_gate_core::core::evaluation::PILLAR_SPECIFICITY;
use quality_gate_core::core::evaluation::PILLAR_STRUCTURE;
use quality_gate_core::core::evaluation::PILLAR_TRUST;
use quality_gate_core::interfaces::AeoFinding;
use quality_gate_core::interfaces::DetectorFinding;
use quality_gate_core::interfaces::Rewriter;
use quality_gate_core::interfaces::RewriterError;
use quality_gate_core::interfaces::Scorer;
use quality_gate_core::interfaces::ScorerError;
use quality_gate_core::interfaces::ScorerOutput;

// ============================================================================
// SECTION: Manual Clock
// ============================================================================

/// Clock advanced explicitly by tests.
pub struct ManualClock {
    /// Current reading in unix milliseconds.
    now: Mutex<i64>,
}

impl ManualClock {
    /// Creates a clock at the provided unix-millisecond reading.
    pub fn at(millis: i64) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(millis),
        })
    }

    /// Advances the clock.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += i64::try_from(duration.as_millis()).unwrap();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_unix_millis(*self.now.lock().unwrap())
    }
}

// ============================================================================
// SECTION: Scripted Scores
// ============================================================================

/// Scores a scripted AEO scorer returns for one text.
#[derive(Debug, Clone, Copy)]
pub struct AeoProfile {
    /// Total score.
    pub total: f64,
    /// Answerability pillar score (max 25).
    pub answerability: f64,
    /// Structure pillar score (max 20).
    pub structure: f64,
}

/// Builds a full seven-pillar rationale around the scripted pillar values.
pub fn rationale_for(profile: AeoProfile) -> AeoRationale {
    let pillar = |name: &str, score: f64, max_score: f64| PillarScore {
        name: name.to_string(),
        score,
        max_score,
        reasons: vec![format!("scripted {name}")],
    };
    AeoRationale {
        rubric_version: "1.0.0".to_string(),
        pillars: vec![
            pillar(PILLAR_ANSWERABILITY, profile.answerability, 25.0),
            pillar(PILLAR_STRUCTURE, profile.structure, 20.0),
            pillar(PILLAR_SPECIFICITY, 15.0, 20.0),
            pillar(PILLAR_TRUST, 12.0, 15.0),
            pillar(PILLAR_COVERAGE, 7.0, 10.0),
            pillar(PILLAR_FRESHNESS, 3.0, 5.0),
            pillar(PILLAR_READABILITY, 4.0, 5.0),
        ],
    }
}

/// Builds a full six-category breakdown with the given total.
///
/// The total is spread over the first category so category-critical tests
/// can push one category past its threshold via `category_override`.
pub fn breakdown_for(total: f64, category_override: Option<(&str, f64)>) -> AiLikenessBreakdown {
    let category = |score: f64, max_score: f64| CategoryScore {
        score,
        max_score,
        percentage: if max_score > 0.0 { score / max_score * 100.0 } else { 0.0 },
        explanation: "scripted".to_string(),
        evidence: vec!["scripted evidence".to_string()],
    };
    let mut subscores = BTreeMap::new();
    subscores.insert(CATEGORY_PREDICTABILITY.to_string(), category(total.min(25.0), 25.0));
    subscores
        .insert(CATEGORY_UNIFORMITY.to_string(), category((total - 25.0).clamp(0.0, 20.0), 20.0));
    subscores.insert(
        CATEGORY_GENERIC_LANGUAGE.to_string(),
        category((total - 45.0).clamp(0.0, 20.0), 20.0),
    );
    subscores
        .insert(CATEGORY_TEMPLATE.to_string(), category((total - 65.0).clamp(0.0, 15.0), 15.0));
    subscores.insert(
        CATEGORY_HUMAN_FRICTION.to_string(),
        category((total - 80.0).clamp(0.0, 10.0), 10.0),
    );
    subscores
        .insert(CATEGORY_OVER_POLISH.to_string(), category((total - 90.0).clamp(0.0, 10.0), 10.0));
    if let Some((name, score)) = category_override
        && let Some(entry) = subscores.get_mut(name)
    {
        entry.score = score;
        entry.percentage = score / entry.max_score * 100.0;
    }
    AiLikenessBreakdown {
        rubric_version: "1.0.0".to_string(),
        total_score: total,
        subscores,
        metadata: TextMetadata {
            text_length: 100,
            word_count: 20,
        },
    }
}

// ============================================================================
// SECTION: Scripted Scorers
// ============================================================================

/// AEO scorer scripted as a pure function of the input text.
pub struct ScriptedAeoScorer {
    /// Profile function.
    profile: Box<dyn Fn(&str) -> AeoProfile + Send + Sync>,
}

impl ScriptedAeoScorer {
    /// Creates a scorer from a profile function.
    pub fn new(profile: impl Fn(&str) -> AeoProfile + Send + Sync + 'static) -> Self {
        Self {
            profile: Box::new(profile),
        }
    }

    /// Creates a scorer returning one fixed profile.
    pub fn fixed(profile: AeoProfile) -> Self {
        Self::new(move |_| profile)
    }
}

impl Scorer for ScriptedAeoScorer {
    fn id(&self) -> ScorerId {
        ScorerId::new("aeo")
    }

    fn metadata(&self) -> ScorerMetadata {
        ScorerMetadata {
            name: "Scripted AEO".to_string(),
            version: "1.0.0".to_string(),
        }
    }

    fn score(&self, text: &str) -> Result<ScorerOutput, ScorerError> {
        let profile = (self.profile)(text);
        Ok(ScorerOutput::Aeo(AeoFinding {
            query_intent: "primary".to_string(),
            total_score: profile.total,
            rationale: rationale_for(profile),
        }))
    }
}

/// Detector scorer scripted as a pure function of the input text.
pub struct ScriptedDetectorScorer {
    /// Total-score function.
    total: Box<dyn Fn(&str) -> f64 + Send + Sync>,
    /// Optional category override applied to every breakdown.
    category_override: Option<(String, f64)>,
    /// Model version stamped on findings.
    model_version: String,
}

impl ScriptedDetectorScorer {
    /// Creates a scorer from a total-score function.
    pub fn new(total: impl Fn(&str) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            total: Box::new(total),
            category_override: None,
            model_version: "rubric_v1.0.0".to_string(),
        }
    }

    /// Creates a scorer returning one fixed total.
    pub fn fixed(total: f64) -> Self {
        Self::new(move |_| total)
    }

    /// Overrides one category score in every breakdown.
    pub fn with_category(mut self, name: &str, score: f64) -> Self {
        self.category_override = Some((name.to_string(), score));
        self
    }

    /// Overrides the stamped model version.
    pub fn with_model_version(mut self, version: &str) -> Self {
        self.model_version = version.to_string();
        self
    }
}

impl Scorer for ScriptedDetectorScorer {
    fn id(&self) -> ScorerId {
        ScorerId::new(AI_LIKENESS_PROVIDER)
    }

    fn metadata(&self) -> ScorerMetadata {
        ScorerMetadata {
            name: "Scripted Detector".to_string(),
            version: self.model_version.clone(),
        }
    }

    fn score(&self, text: &str) -> Result<ScorerOutput, ScorerError> {
        let total = (self.total)(text);
        let override_ref = self
            .category_override
            .as_ref()
            .map(|(name, score)| (name.as_str(), *score));
        let breakdown = breakdown_for(total, override_ref);
        Ok(ScorerOutput::Detector(DetectorFinding {
            provider: AI_LIKENESS_PROVIDER.to_string(),
            score: total,
            model_version: self.model_version.clone(),
            raw_response: serde_json::to_value(&breakdown).unwrap(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
        }))
    }
}

/// Scorer that always fails with a validation error.
pub struct FailingScorer {
    /// Scorer identifier.
    pub id: &'static str,
}

impl Scorer for FailingScorer {
    fn id(&self) -> ScorerId {
        ScorerId::new(self.id)
    }

    fn metadata(&self) -> ScorerMetadata {
        ScorerMetadata {
            name: "Failing".to_string(),
            version: "1.0.0".to_string(),
        }
    }

    fn score(&self, _text: &str) -> Result<ScorerOutput, ScorerError> {
        Err(ScorerError::Validation("scripted failure".to_string()))
    }
}

// ============================================================================
// SECTION: Scripted Rewriter
// ============================================================================

/// Rewriter returning canned bodies and recording received prompts.
pub struct ScriptedRewriter {
    /// Bodies returned in order; the last repeats.
    outputs: Vec<String>,
    /// Prompts received so far.
    pub prompts: Mutex<Vec<String>>,
    /// Number of generate calls so far.
    calls: Mutex<usize>,
}

impl ScriptedRewriter {
    /// Creates a rewriter cycling through the provided bodies.
    pub fn new(outputs: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            outputs: outputs.into_iter().map(str::to_string).collect(),
            prompts: Mutex::new(Vec::new()),
            calls: Mutex::new(0),
        })
    }
}

impl Rewriter for ScriptedRewriter {
    fn generate(&self, prompt: &str, _timeout: Duration) -> Result<String, RewriterError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut calls = self.calls.lock().unwrap();
        let index = (*calls).min(self.outputs.len().saturating_sub(1));
        *calls += 1;
        self.outputs
            .get(index)
            .cloned()
            .ok_or_else(|| RewriterError::Failed("no scripted output".to_string()))
    }
}

/// Rewriter that always times out.
pub struct TimeoutRewriter;

impl Rewriter for TimeoutRewriter {
    fn generate(&self, _prompt: &str, timeout: Duration) -> Result<String, RewriterError> {
        Err(RewriterError::Timeout {
            timeout_seconds: timeout.as_secs(),
        })
    }
}

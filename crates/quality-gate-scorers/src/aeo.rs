// crates/quality-gate-scorers/src/aeo.rs
// ============================================================================
// Module: AEO Rubric Engine
// Description: Deterministic seven-pillar answer-engine-optimization scoring.
// Purpose: Measure how extractable and answerable content is, rubric 1.0.0.
// Dependencies: quality-gate-core
// ============================================================================

//! ## Overview
//! `score_aeo` is a pure function over the content text. Seven pillars with
//! weights 25/20/20/15/10/5/5 (verified to sum to 100 at scoring time) carry
//! per-pillar reasons so the rewrite orchestrator can read pillar inputs back
//! from the persisted rationale. All thresholds are literal constants frozen
//! under rubric version 1.0.0.

// ============================================================================
// SECTION: Imports
// ============================================================================

use quality_gate_core::AeoRationale;
use quality_gate_core::PillarScore;
use quality_gate_core::ScorerId;
use quality_gate_core::ScorerMetadata;
use quality_gate_core::core::evaluation::PILLAR_ANSWERABILITY;
use quality_gate_core::core::evaluation::PILLAR_COVERAGE;
use quality_gate_core::core::evaluation::PILLAR_FRESHNESS;
use quality_gate_core::core::evaluation::PILLAR_READABILITY;
use quality_gate_core::core::evaluation::PILLAR_SPECIFICITY;
use quality_gate_core::core::evaluation::PILLAR_STRUCTURE;
use quality_gate_core::core::evaluation::PILLAR_TRUST;
use quality_gate_core::interfaces::AeoFinding;
use quality_gate_core::interfaces::Scorer;
use quality_gate_core::interfaces::ScorerError;
use quality_gate_core::interfaces::ScorerOutput;

use crate::lexicon::FLUFF_PHRASES;
use crate::text::as_f64;
use crate::text::count_phrase;
use crate::text::lines;
use crate::text::mean;
use crate::text::paragraphs;
use crate::text::sentences;
use crate::text::words;

// ============================================================================
// SECTION: Version Constants
// ============================================================================

/// Rubric version emitted on AEO results.
pub const AEO_RUBRIC_VERSION: &str = "1.0.0";
/// Scorer identifier for the AEO engine.
pub const AEO_SCORER_ID: &str = "aeo";
/// Default query intent when no subject is detected.
pub const DEFAULT_QUERY_INTENT: &str = "primary";
/// Word window inspected for a direct answer.
const ANSWER_WINDOW_WORDS: usize = 120;

// ============================================================================
// SECTION: Result
// ============================================================================

/// Full AEO scoring result.
///
/// # Invariants
/// - `total_score` is the two-decimal-rounded pillar sum in `[0, 100]`.
/// - Pillar maxima sum to exactly 100.
#[derive(Debug, Clone, PartialEq)]
pub struct AeoResult {
    /// Total score in `[0, 100]`, two decimals.
    pub total_score: f64,
    /// Rubric version identifier.
    pub rubric_version: String,
    /// Detected query intent (subject) or `primary`.
    pub query_intent: String,
    /// Per-pillar breakdown in rubric order.
    pub pillars: Vec<PillarScore>,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Scores content against the seven AEO pillars; fully deterministic.
///
/// # Errors
///
/// Returns [`ScorerError::Validation`] for empty content and
/// [`ScorerError::Internal`] when the pillar weight table does not sum to
/// 100 (a rubric bug).
pub fn score_aeo(content: &str) -> Result<AeoResult, ScorerError> {
    if content.trim().is_empty() {
        return Err(ScorerError::Validation("content must not be empty".to_string()));
    }

    let word_list = words(content);
    let sentence_list = sentences(content);
    let line_list = lines(content);
    let lower = content.to_lowercase();
    let (query_intent, subject_mentions) = detect_subject(content, &lower);

    let pillars = vec![
        answerability(content, &sentence_list, subject_mentions),
        structure(&line_list),
        specificity(content, &word_list),
        trust(content, &lower),
        coverage(&word_list, &line_list),
        freshness(&word_list),
        readability(&sentence_list),
    ];

    let max_total: f64 = pillars.iter().map(|pillar| pillar.max_score).sum();
    if (max_total - 100.0).abs() > f64::EPSILON {
        return Err(ScorerError::Internal(format!(
            "pillar maxima sum to {max_total}, expected 100"
        )));
    }

    let raw_total: f64 = pillars.iter().map(|pillar| pillar.score).sum();
    let total_score = (raw_total * 100.0).round() / 100.0;
    Ok(AeoResult {
        total_score,
        rubric_version: AEO_RUBRIC_VERSION.to_string(),
        query_intent,
        pillars,
    })
}

// ============================================================================
// SECTION: Subject Detection
// ============================================================================

/// Detects the content subject and counts its mentions.
///
/// The subject is the first markdown heading when present, otherwise the
/// longest run of capitalized words in the first sentence. Falls back to
/// [`DEFAULT_QUERY_INTENT`] with zero mentions.
fn detect_subject(content: &str, lower: &str) -> (String, usize) {
    let heading = content
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with('#'))
        .map(|line| line.trim_start_matches('#').trim().to_string())
        .filter(|title| !title.is_empty());

    let candidate = heading.or_else(|| {
        let first_sentence = sentences(content).into_iter().next().unwrap_or_default();
        longest_capitalized_run(&first_sentence)
    });

    match candidate {
        Some(subject) => {
            let mentions = count_phrase(lower, &subject.to_lowercase());
            (subject.to_lowercase(), mentions)
        }
        None => (DEFAULT_QUERY_INTENT.to_string(), 0),
    }
}

/// Returns the longest run of consecutive capitalized words, when any.
///
/// The sentence-initial token is skipped: ordinary capitalization at the
/// start of a sentence is not a subject signal.
fn longest_capitalized_run(sentence: &str) -> Option<String> {
    let mut best: Vec<&str> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for token in sentence.split_whitespace().skip(1) {
        let cleaned = token.trim_matches(|ch: char| !ch.is_alphanumeric());
        if cleaned.len() > 2 && cleaned.chars().next().is_some_and(char::is_uppercase) {
            current.push(cleaned);
            if current.len() > best.len() {
                best.clone_from(&current);
            }
        } else {
            current.clear();
        }
    }
    if best.is_empty() {
        None
    } else {
        Some(best.join(" "))
    }
}

// ============================================================================
// SECTION: Answerability & Intent Match (25)
// ============================================================================

/// Scores whether a core answer appears early and the subject is clear.
fn answerability(content: &str, sentence_list: &[String], subject_mentions: usize) -> PillarScore {
    let mut reasons = Vec::new();

    let mut window_sentences: Vec<&String> = Vec::new();
    let mut consumed_words = 0usize;
    for sentence in sentence_list {
        if consumed_words >= ANSWER_WINDOW_WORDS {
            break;
        }
        consumed_words += words(sentence).len();
        window_sentences.push(sentence);
    }
    let direct_answer = window_sentences.iter().find(|sentence| {
        let sentence_words = words(sentence);
        let lower_sentence = sentence.to_lowercase();
        sentence_words.len() >= 8
            && (lower_sentence.contains(" is ")
                || lower_sentence.contains(" are ")
                || lower_sentence.contains(" means ")
                || lower_sentence.contains(" refers to ")
                || sentence_words.iter().any(|word| word.chars().any(|ch| ch.is_ascii_digit())))
    });
    let answer_points = if let Some(sentence) = direct_answer {
        let snippet: String = sentence.chars().take(60).collect();
        reasons.push(format!("direct answer within first {ANSWER_WINDOW_WORDS} words: '{snippet}'"));
        15.0
    } else if paragraphs(content).first().is_some_and(|first| words(first).len() >= 40) {
        reasons.push("substantial opening paragraph but no direct answer pattern".to_string());
        7.0
    } else {
        reasons.push(format!("no direct answer within the first {ANSWER_WINDOW_WORDS} words"));
        0.0
    };

    let subject_points = if subject_mentions >= 3 {
        reasons.push(format!("clear subject repeated {subject_mentions}x"));
        10.0
    } else if subject_mentions == 2 {
        reasons.push("subject mentioned twice".to_string());
        5.0
    } else {
        reasons.push("no clearly repeated subject".to_string());
        0.0
    };

    PillarScore {
        name: PILLAR_ANSWERABILITY.to_string(),
        score: answer_points + subject_points,
        max_score: 25.0,
        reasons,
    }
}

// ============================================================================
// SECTION: Structural Extractability (20)
// ============================================================================

/// Scores heading hierarchy and list/table density.
fn structure(line_list: &[&str]) -> PillarScore {
    let mut reasons = Vec::new();

    let headings: Vec<&&str> = line_list.iter().filter(|line| line.starts_with('#')).collect();
    let has_sublevel = headings.iter().any(|line| line.starts_with("##"));
    let heading_points = if headings.len() >= 3 && has_sublevel {
        reasons.push(format!("{} headings with a sub-level hierarchy", headings.len()));
        10.0
    } else if !headings.is_empty() {
        reasons.push(format!("{} headings, flat hierarchy", headings.len()));
        5.0
    } else {
        reasons.push("no headings".to_string());
        0.0
    };

    let items = line_list
        .iter()
        .filter(|line| {
            line.starts_with("- ")
                || line.starts_with("* ")
                || line.starts_with('|')
                || line
                    .split_once(['.', ')'])
                    .is_some_and(|(prefix, _)| {
                        !prefix.is_empty() && prefix.chars().all(|ch| ch.is_ascii_digit())
                    })
        })
        .count();
    let item_points = if items >= 8 {
        10.0
    } else if items >= 4 {
        6.0
    } else if items >= 1 {
        3.0
    } else {
        0.0
    };
    reasons.push(format!("{items} list/table lines"));

    PillarScore {
        name: PILLAR_STRUCTURE.to_string(),
        score: heading_points + item_points,
        max_score: 20.0,
        reasons,
    }
}

// ============================================================================
// SECTION: Specificity & Factual Density (20)
// ============================================================================

/// Scores numeric facts and distinct entity clusters.
fn specificity(content: &str, word_list: &[String]) -> PillarScore {
    let mut reasons = Vec::new();

    let numeric = word_list
        .iter()
        .filter(|word| word.chars().any(|ch| ch.is_ascii_digit()))
        .count();
    let numeric_points = if numeric >= 10 {
        10.0
    } else if numeric >= 5 {
        7.0
    } else if numeric >= 2 {
        4.0
    } else if numeric >= 1 {
        2.0
    } else {
        0.0
    };
    reasons.push(format!("{numeric} numeric facts"));

    let mut entities = std::collections::BTreeSet::new();
    for sentence in sentences(content) {
        let sentence_tokens: Vec<&str> = sentence.split_whitespace().collect();
        let mut run: Vec<&str> = Vec::new();
        // Skip the sentence-initial token so ordinary capitalization does not
        // count as an entity.
        for token in sentence_tokens.iter().skip(1) {
            let cleaned = token.trim_matches(|ch: char| !ch.is_alphanumeric());
            if cleaned.len() > 1 && cleaned.chars().next().is_some_and(char::is_uppercase) {
                run.push(cleaned);
            } else {
                if !run.is_empty() {
                    entities.insert(run.join(" "));
                }
                run.clear();
            }
        }
        if !run.is_empty() {
            entities.insert(run.join(" "));
        }
    }
    let entity_points = if entities.len() >= 8 {
        10.0
    } else if entities.len() >= 4 {
        6.0
    } else if !entities.is_empty() {
        3.0
    } else {
        0.0
    };
    reasons.push(format!("{} distinct named entities", entities.len()));

    PillarScore {
        name: PILLAR_SPECIFICITY.to_string(),
        score: numeric_points + entity_points,
        max_score: 20.0,
        reasons,
    }
}

// ============================================================================
// SECTION: Trust & Authority (15)
// ============================================================================

/// Scores outbound citations minus fluff-phrase penalties.
fn trust(content: &str, lower: &str) -> PillarScore {
    let mut reasons = Vec::new();

    let citations = count_phrase(content, "](") + count_phrase(content, "http://")
        + count_phrase(content, "https://");
    let citation_points: f64 = if citations >= 5 {
        10.0
    } else if citations >= 2 {
        6.0
    } else if citations >= 1 {
        3.0
    } else {
        0.0
    };
    reasons.push(format!("{citations} outbound citations"));

    let fluff: usize = FLUFF_PHRASES.iter().map(|phrase| count_phrase(lower, phrase)).sum();
    let fluff_penalty: f64 = if fluff >= 3 {
        5.0
    } else if fluff >= 1 {
        2.0
    } else {
        0.0
    };
    reasons.push(format!("{fluff} fluff phrases (-{fluff_penalty} points)"));

    PillarScore {
        name: PILLAR_TRUST.to_string(),
        score: (citation_points + 5.0 - fluff_penalty).max(0.0),
        max_score: 15.0,
        reasons,
    }
}

// ============================================================================
// SECTION: Query Coverage Breadth (10)
// ============================================================================

/// Scores depth by structured length.
fn coverage(word_list: &[String], line_list: &[&str]) -> PillarScore {
    let word_count = word_list.len();
    let headings = line_list.iter().filter(|line| line.starts_with('#')).count();
    let points = if word_count >= 1200 && headings >= 4 {
        10.0
    } else if word_count >= 600 && headings >= 2 {
        7.0
    } else if word_count >= 300 {
        4.0
    } else if word_count >= 120 {
        2.0
    } else {
        0.0
    };
    PillarScore {
        name: PILLAR_COVERAGE.to_string(),
        score: points,
        max_score: 10.0,
        reasons: vec![format!("{word_count} words under {headings} headings")],
    }
}

// ============================================================================
// SECTION: Freshness (5)
// ============================================================================

/// Scores explicit year mentions between 1900 and 2099.
fn freshness(word_list: &[String]) -> PillarScore {
    let mut years = std::collections::BTreeSet::new();
    for word in word_list {
        let digits: String = word.chars().filter(char::is_ascii_digit).collect();
        if digits.len() == 4
            && let Ok(year) = digits.parse::<u32>()
            && (1900..=2099).contains(&year)
        {
            years.insert(year);
        }
    }
    let points = match years.len() {
        0 => 0.0,
        1 => 3.0,
        _ => 5.0,
    };
    let reason = if years.is_empty() {
        "no explicit year mentions".to_string()
    } else {
        let rendered: Vec<String> = years.iter().map(u32::to_string).collect();
        format!("year mentions: {}", rendered.join(", "))
    };
    PillarScore {
        name: PILLAR_FRESHNESS.to_string(),
        score: points,
        max_score: 5.0,
        reasons: vec![reason],
    }
}

// ============================================================================
// SECTION: Machine Readability (5)
// ============================================================================

/// Scores mean sentence length against the extractability sweet spot.
fn readability(sentence_list: &[String]) -> PillarScore {
    let sentence_lengths: Vec<f64> =
        sentence_list.iter().map(|sentence| as_f64(words(sentence).len())).collect();
    let average = mean(&sentence_lengths);
    let points = if (10.0..=20.0).contains(&average) {
        5.0
    } else if (8.0..=24.0).contains(&average) {
        2.0
    } else {
        0.0
    };
    PillarScore {
        name: PILLAR_READABILITY.to_string(),
        score: points,
        max_score: 5.0,
        reasons: vec![format!("mean sentence length {average:.1} words")],
    }
}

// ============================================================================
// SECTION: Scorer Capability
// ============================================================================

/// AEO scorer registered under the `aeo` id.
#[derive(Debug, Clone, Copy, Default)]
pub struct AeoScorer;

impl Scorer for AeoScorer {
    fn id(&self) -> ScorerId {
        ScorerId::new(AEO_SCORER_ID)
    }

    fn metadata(&self) -> ScorerMetadata {
        ScorerMetadata {
            name: "AEO Rubric".to_string(),
            version: AEO_RUBRIC_VERSION.to_string(),
        }
    }

    fn score(&self, text: &str) -> Result<ScorerOutput, ScorerError> {
        let result = score_aeo(text)?;
        Ok(ScorerOutput::Aeo(AeoFinding {
            query_intent: result.query_intent,
            total_score: result.total_score,
            rationale: AeoRationale {
                rubric_version: result.rubric_version,
                pillars: result.pillars,
            },
        }))
    }
}

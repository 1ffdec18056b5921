// crates/quality-gate-scorers/src/ai_likeness.rs
// ============================================================================
// Module: AI-Likeness Rubric Engine
// Description: Deterministic six-category AI-likeness scoring, rubric 1.0.0.
// Purpose: Produce evidence-bearing, versioned likeness scores from text alone.
// Dependencies: quality-gate-core, serde_json
// ============================================================================

//! ## Overview
//! `score_ai_likeness_at` is a pure function: identical text yields an
//! identical breakdown, and only the caller-supplied timestamp varies between
//! invocations. Every threshold below is a literal constant frozen under
//! rubric version 1.0.0; changing one requires bumping the version strings.
//! Each category subscore carries concrete textual evidence so a reviewer can
//! audit the award without re-running the rubric.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use quality_gate_core::AiLikenessBreakdown;
use quality_gate_core::CategoryScore;
use quality_gate_core::Clock;
use quality_gate_core::ScorerId;
use quality_gate_core::ScorerMetadata;
use quality_gate_core::SystemClock;
use quality_gate_core::TextMetadata;
use quality_gate_core::Timestamp;
use quality_gate_core::core::evaluation::AI_LIKENESS_PROVIDER;
use quality_gate_core::core::evaluation::CATEGORY_GENERIC_LANGUAGE;
use quality_gate_core::core::evaluation::CATEGORY_HUMAN_FRICTION;
use quality_gate_core::core::evaluation::CATEGORY_OVER_POLISH;
use quality_gate_core::core::evaluation::CATEGORY_PREDICTABILITY;
use quality_gate_core::core::evaluation::CATEGORY_TEMPLATE;
use quality_gate_core::core::evaluation::CATEGORY_UNIFORMITY;
use quality_gate_core::interfaces::DetectorFinding;
use quality_gate_core::interfaces::Scorer;
use quality_gate_core::interfaces::ScorerError;
use quality_gate_core::interfaces::ScorerOutput;

use crate::lexicon::AI_PHRASES;
use crate::lexicon::DISCLAIMER_PHRASES;
use crate::lexicon::FORMULAIC_OPENINGS;
use crate::lexicon::HEDGING_PHRASES;
use crate::lexicon::INFORMAL_MARKERS;
use crate::lexicon::NON_ADVERB_LY_WORDS;
use crate::lexicon::TRANSITION_PHRASES;
use crate::text::as_f64;
use crate::text::coefficient_of_variation;
use crate::text::count_phrase;
use crate::text::lines;
use crate::text::paragraphs;
use crate::text::sentences;
use crate::text::stddev;
use crate::text::tokens;
use crate::text::words;

// ============================================================================
// SECTION: Version Constants
// ============================================================================

/// Model version emitted on detector rows.
pub const AI_LIKENESS_MODEL_VERSION: &str = "rubric_v1.0.0";
/// Rubric version emitted inside the raw response.
pub const AI_LIKENESS_RUBRIC_VERSION: &str = "1.0.0";
/// Minimum whitespace-delimited tokens accepted by the rubric.
pub const MIN_TOKENS: usize = 5;

// ============================================================================
// SECTION: Result
// ============================================================================

/// Full AI-likeness scoring result.
///
/// # Invariants
/// - `score` equals `raw_response.total_score` and never exceeds 100.
#[derive(Debug, Clone, PartialEq)]
pub struct AiLikenessResult {
    /// Model version identifier (`rubric_v1.0.0`).
    pub model_version: String,
    /// Scoring timestamp (RFC3339).
    pub timestamp: String,
    /// Total score in `[0, 100]`.
    pub score: f64,
    /// Full structured breakdown.
    pub raw_response: AiLikenessBreakdown,
}

// ============================================================================
// SECTION: Entry Points
// ============================================================================

/// Scores text with the caller-supplied timestamp; fully deterministic.
///
/// # Errors
///
/// Returns [`ScorerError::Validation`] for empty text or fewer than
/// [`MIN_TOKENS`] tokens, and [`ScorerError::Internal`] when the subscores
/// exceed 100 points (a rubric bug, never silently clamped).
pub fn score_ai_likeness_at(
    text: &str,
    timestamp: Timestamp,
) -> Result<AiLikenessResult, ScorerError> {
    if text.trim().is_empty() {
        return Err(ScorerError::Validation("text must not be empty".to_string()));
    }
    let token_count = tokens(text).len();
    if token_count < MIN_TOKENS {
        return Err(ScorerError::Validation(format!(
            "text must contain at least {MIN_TOKENS} tokens (got {token_count})"
        )));
    }

    let word_list = words(text);
    let sentence_list = sentences(text);
    let paragraph_list = paragraphs(text);
    let lower = text.to_lowercase();

    let mut subscores = BTreeMap::new();
    subscores.insert(CATEGORY_PREDICTABILITY.to_string(), predictability(&word_list));
    subscores.insert(
        CATEGORY_UNIFORMITY.to_string(),
        uniformity(&sentence_list, &paragraph_list),
    );
    subscores.insert(
        CATEGORY_GENERIC_LANGUAGE.to_string(),
        generic_language(&lower, &word_list),
    );
    subscores.insert(
        CATEGORY_TEMPLATE.to_string(),
        structural_template(text, &sentence_list),
    );
    subscores.insert(
        CATEGORY_HUMAN_FRICTION.to_string(),
        human_friction(&sentence_list, &word_list, &lower),
    );
    subscores.insert(CATEGORY_OVER_POLISH.to_string(), over_polish(&lower));

    let total_score: f64 = subscores.values().map(|category| category.score).sum();
    if total_score > 100.0 {
        return Err(ScorerError::Internal(format!(
            "subscores sum to {total_score}, exceeding the 100-point cap"
        )));
    }

    let breakdown = AiLikenessBreakdown {
        rubric_version: AI_LIKENESS_RUBRIC_VERSION.to_string(),
        total_score,
        subscores,
        metadata: TextMetadata {
            text_length: text.len(),
            word_count: token_count,
        },
    };
    Ok(AiLikenessResult {
        model_version: AI_LIKENESS_MODEL_VERSION.to_string(),
        timestamp: timestamp.to_rfc3339(),
        score: total_score,
        raw_response: breakdown,
    })
}

/// Scores text stamping the current wall-clock time.
///
/// # Errors
///
/// See [`score_ai_likeness_at`].
pub fn score_ai_likeness(text: &str) -> Result<AiLikenessResult, ScorerError> {
    score_ai_likeness_at(text, SystemClock.now())
}

// ============================================================================
// SECTION: Predictability & Entropy (25)
// ============================================================================

/// Scores lexical diversity, word-length spread, and top-word dominance.
fn predictability(word_list: &[String]) -> CategoryScore {
    let total = word_list.len();
    let unique = word_list.iter().collect::<std::collections::BTreeSet<_>>().len();
    let ttr = if total == 0 { 1.0 } else { as_f64(unique) / as_f64(total) };
    let diversity_points = if ttr < 0.35 {
        10.0
    } else if ttr < 0.45 {
        7.0
    } else if ttr < 0.55 {
        4.0
    } else {
        0.0
    };

    let lengths: Vec<f64> = word_list.iter().map(|word| as_f64(word.chars().count())).collect();
    let length_spread = stddev(&lengths);
    let spread_points = if length_spread < 1.60 {
        8.0
    } else if length_spread < 2.10 {
        5.0
    } else if length_spread < 2.60 {
        2.0
    } else {
        0.0
    };

    let mut frequencies: BTreeMap<&str, usize> = BTreeMap::new();
    for word in word_list {
        *frequencies.entry(word.as_str()).or_insert(0) += 1;
    }
    // BTreeMap order makes the tie-break lexicographic and stable.
    let (top_word, top_count) = frequencies
        .iter()
        .max_by(|left, right| left.1.cmp(right.1).then(right.0.cmp(left.0)))
        .map_or(("", 0), |(word, count)| (*word, *count));
    let top_ratio = if total == 0 { 0.0 } else { as_f64(top_count) / as_f64(total) };
    let dominance_points = if top_ratio >= 0.08 {
        7.0
    } else if top_ratio >= 0.06 {
        5.0
    } else if top_ratio >= 0.04 {
        2.0
    } else {
        0.0
    };

    let score = diversity_points + spread_points + dominance_points;
    CategoryScore {
        score,
        max_score: 25.0,
        percentage: score / 25.0 * 100.0,
        explanation: "Low vocabulary variety, uniform word shapes, and a dominant repeated word \
                      all make prose statistically predictable."
            .to_string(),
        evidence: vec![
            format!("type-token ratio {ttr:.2} ({unique} unique / {total} words)"),
            format!("word length stddev {length_spread:.2}"),
            format!("most repeated: '{top_word}' ({top_count}x)"),
        ],
    }
}

// ============================================================================
// SECTION: Sentence/Paragraph Uniformity (20)
// ============================================================================

/// Scores sentence-length and paragraph-length uniformity.
fn uniformity(sentence_list: &[String], paragraph_list: &[String]) -> CategoryScore {
    let sentence_lengths: Vec<f64> =
        sentence_list.iter().map(|sentence| as_f64(words(sentence).len())).collect();
    let mut evidence = Vec::new();

    let sentence_points = if sentence_lengths.len() < 3 {
        evidence.push(format!(
            "only {} sentences; sentence uniformity not assessed",
            sentence_lengths.len()
        ));
        0.0
    } else {
        let cv = coefficient_of_variation(&sentence_lengths);
        evidence.push(format!(
            "sentence length CV {cv:.2} across {} sentences",
            sentence_lengths.len()
        ));
        if cv < 0.25 {
            12.0
        } else if cv < 0.40 {
            8.0
        } else if cv < 0.55 {
            4.0
        } else {
            0.0
        }
    };

    let paragraph_lengths: Vec<f64> =
        paragraph_list.iter().map(|paragraph| as_f64(words(paragraph).len())).collect();
    let paragraph_points = if paragraph_lengths.len() < 2 {
        evidence.push(format!(
            "{} paragraph(s); paragraph uniformity not assessed",
            paragraph_lengths.len()
        ));
        0.0
    } else {
        let cv = coefficient_of_variation(&paragraph_lengths);
        evidence.push(format!(
            "paragraph length CV {cv:.2} across {} paragraphs",
            paragraph_lengths.len()
        ));
        if cv < 0.20 {
            8.0
        } else if cv < 0.35 {
            5.0
        } else if cv < 0.50 {
            2.0
        } else {
            0.0
        }
    };

    let score = sentence_points + paragraph_points;
    CategoryScore {
        score,
        max_score: 20.0,
        percentage: score / 20.0 * 100.0,
        explanation: "Evenly sized sentences and paragraphs are a hallmark of template \
                      generation; human drafts vary block sizes."
            .to_string(),
        evidence,
    }
}

// ============================================================================
// SECTION: Generic Language & Cliches (20)
// ============================================================================

/// Scores stock-phrase density and adverb ratio.
///
/// Adverbs that double as transitions are counted here and again in the
/// structural-template category; the dual counting is intentional and part
/// of the frozen rubric.
fn generic_language(lower: &str, word_list: &[String]) -> CategoryScore {
    let mut matched: Vec<(usize, &str)> = Vec::new();
    let mut phrase_total = 0;
    for phrase in AI_PHRASES {
        let count = count_phrase(lower, phrase);
        if count > 0 {
            phrase_total += count;
            matched.push((count, phrase));
        }
    }
    let phrase_points = if phrase_total >= 8 {
        15.0
    } else if phrase_total >= 5 {
        11.0
    } else if phrase_total >= 3 {
        7.0
    } else if phrase_total >= 1 {
        3.0
    } else {
        0.0
    };

    let adverb_count = word_list
        .iter()
        .filter(|word| {
            word.ends_with("ly")
                && word.chars().count() > 3
                && !NON_ADVERB_LY_WORDS.contains(&word.as_str())
        })
        .count();
    let adverb_ratio = if word_list.is_empty() {
        0.0
    } else {
        as_f64(adverb_count) / as_f64(word_list.len())
    };
    let adverb_points = if adverb_ratio >= 0.06 {
        5.0
    } else if adverb_ratio >= 0.04 {
        3.0
    } else if adverb_ratio >= 0.025 {
        1.0
    } else {
        0.0
    };

    let mut evidence: Vec<String> = matched
        .iter()
        .take(3)
        .map(|(count, phrase)| format!("'{phrase}' ({count}x)"))
        .collect();
    if evidence.is_empty() {
        evidence.push("no stock phrases found".to_string());
    }
    evidence.push(format!(
        "adverb ratio {adverb_ratio:.3} ({adverb_count}/{} words)",
        word_list.len()
    ));

    let score = phrase_points + adverb_points;
    CategoryScore {
        score,
        max_score: 20.0,
        percentage: score / 20.0 * 100.0,
        explanation: "Stock phrases and adverb-heavy prose read as generated filler rather than \
                      specific human claims."
            .to_string(),
        evidence,
    }
}

// ============================================================================
// SECTION: Structural Template Signals (15)
// ============================================================================

/// Scores formulaic openings, list density, and transition phrases.
fn structural_template(text: &str, sentence_list: &[String]) -> CategoryScore {
    let mut evidence = Vec::new();

    let first_sentence = sentence_list.first().map(String::as_str).unwrap_or_default();
    let first_lower = first_sentence.to_lowercase();
    let opening_match =
        FORMULAIC_OPENINGS.iter().find(|opening| first_lower.starts_with(*opening));
    let opening_points = if let Some(opening) = opening_match {
        evidence.push(format!("formulaic opening '{opening}'"));
        8.0
    } else {
        evidence.push("opening is not formulaic".to_string());
        0.0
    };

    let line_list = lines(text);
    let list_lines = line_list
        .iter()
        .filter(|line| {
            line.starts_with("- ")
                || line.starts_with("* ")
                || line
                    .split_once(['.', ')'])
                    .is_some_and(|(prefix, _)| !prefix.is_empty() && prefix.chars().all(|ch| ch.is_ascii_digit()))
        })
        .count();
    let list_density = if line_list.is_empty() {
        0.0
    } else {
        as_f64(list_lines) / as_f64(line_list.len())
    };
    let list_points = if list_density >= 0.5 {
        4.0
    } else if list_density >= 0.3 {
        2.0
    } else {
        0.0
    };
    evidence.push(format!("{list_lines} of {} lines are list items", line_list.len()));

    let mut transition_hits: Vec<&str> = Vec::new();
    let mut transition_total = 0;
    for sentence in sentence_list {
        let sentence_lower = sentence.to_lowercase();
        for phrase in TRANSITION_PHRASES {
            if sentence_lower.starts_with(phrase) {
                transition_total += 1;
                if transition_hits.len() < 3 {
                    transition_hits.push(phrase);
                }
                break;
            }
        }
    }
    let transition_points = if transition_total >= 5 {
        3.0
    } else if transition_total >= 3 {
        2.0
    } else if transition_total >= 1 {
        1.0
    } else {
        0.0
    };
    if transition_hits.is_empty() {
        evidence.push("no sentence-initial transitions".to_string());
    } else {
        evidence.push(format!(
            "{transition_total} sentence-initial transitions ({})",
            transition_hits.join(", ")
        ));
    }

    let score = opening_points + list_points + transition_points;
    CategoryScore {
        score,
        max_score: 15.0,
        percentage: score / 15.0 * 100.0,
        explanation: "Template openings, dense bullet scaffolding, and mechanical transitions \
                      mirror common generation patterns."
            .to_string(),
        evidence,
    }
}

// ============================================================================
// SECTION: Lack of Human Friction (10)
// ============================================================================

/// Scores perfect capitalization, contraction absence, and missing informal
/// markers.
fn human_friction(sentence_list: &[String], word_list: &[String], lower: &str) -> CategoryScore {
    let mut evidence = Vec::new();

    let capitalized = sentence_list
        .iter()
        .filter(|sentence| {
            sentence.chars().next().is_some_and(char::is_uppercase)
        })
        .count();
    let capitalization_points =
        if sentence_list.len() >= 3 && capitalized == sentence_list.len() {
            evidence.push(format!(
                "all {} sentences start with perfect capitalization",
                sentence_list.len()
            ));
            4.0
        } else {
            evidence.push(format!(
                "{capitalized} of {} sentences start capitalized",
                sentence_list.len()
            ));
            0.0
        };

    let contraction_count =
        word_list.iter().filter(|word| word.contains('\'')).count();
    let contraction_points = match contraction_count {
        0 => 3.0,
        1 | 2 => 1.0,
        _ => 0.0,
    };
    evidence.push(format!("{contraction_count} contractions"));

    let informal_found: Vec<&str> = INFORMAL_MARKERS
        .iter()
        .filter(|marker| count_phrase(lower, marker) > 0)
        .copied()
        .collect();
    let informal_points = if informal_found.is_empty() { 3.0 } else { 0.0 };
    if informal_found.is_empty() {
        evidence.push("no informal markers found".to_string());
    } else {
        evidence.push(format!("informal markers present ({})", informal_found.join(", ")));
    }

    let score = capitalization_points + contraction_points + informal_points;
    CategoryScore {
        score,
        max_score: 10.0,
        percentage: score / 10.0 * 100.0,
        explanation: "Human drafts carry small frictions: a contraction, an aside, an uneven \
                      capital. Their total absence is a machine signal."
            .to_string(),
        evidence,
    }
}

// ============================================================================
// SECTION: Over-Polish & Safety Tone (10)
// ============================================================================

/// Scores hedging density and disclaimer boilerplate.
fn over_polish(lower: &str) -> CategoryScore {
    let mut hedges: Vec<(usize, &str)> = Vec::new();
    let mut hedge_total = 0;
    for phrase in HEDGING_PHRASES {
        let count = count_phrase(lower, phrase);
        if count > 0 {
            hedge_total += count;
            hedges.push((count, phrase));
        }
    }
    let hedge_points = if hedge_total >= 6 {
        7.0
    } else if hedge_total >= 4 {
        5.0
    } else if hedge_total >= 2 {
        3.0
    } else if hedge_total >= 1 {
        1.0
    } else {
        0.0
    };

    let disclaimer_total: usize =
        DISCLAIMER_PHRASES.iter().map(|phrase| count_phrase(lower, phrase)).sum();
    let disclaimer_points = match disclaimer_total {
        0 => 0.0,
        1 => 2.0,
        _ => 3.0,
    };

    let mut evidence: Vec<String> = hedges
        .iter()
        .take(3)
        .map(|(count, phrase)| format!("hedge '{phrase}' ({count}x)"))
        .collect();
    if evidence.is_empty() {
        evidence.push("no hedging phrases found".to_string());
    }
    evidence.push(format!("{disclaimer_total} disclaimer phrases"));

    let score = hedge_points + disclaimer_points;
    CategoryScore {
        score,
        max_score: 10.0,
        percentage: score / 10.0 * 100.0,
        explanation: "Persistent hedging and boilerplate disclaimers mark safety-tuned \
                      generation rather than a human voice."
            .to_string(),
        evidence,
    }
}

// ============================================================================
// SECTION: Scorer Capability
// ============================================================================

/// AI-likeness scorer registered under the `ai_likeness` provider id.
pub struct AiLikenessScorer {
    /// Clock stamping result timestamps.
    clock: Arc<dyn Clock>,
}

impl AiLikenessScorer {
    /// Creates the scorer with the provided clock.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
        }
    }
}

impl Scorer for AiLikenessScorer {
    fn id(&self) -> ScorerId {
        ScorerId::new(AI_LIKENESS_PROVIDER)
    }

    fn metadata(&self) -> ScorerMetadata {
        ScorerMetadata {
            name: "AI Likeness Rubric".to_string(),
            version: AI_LIKENESS_MODEL_VERSION.to_string(),
        }
    }

    fn score(&self, text: &str) -> Result<ScorerOutput, ScorerError> {
        let result = score_ai_likeness_at(text, self.clock.now())?;
        let raw_response = serde_json::to_value(&result.raw_response)
            .map_err(|err| ScorerError::Internal(format!("breakdown serialization: {err}")))?;
        Ok(ScorerOutput::Detector(DetectorFinding {
            provider: AI_LIKENESS_PROVIDER.to_string(),
            score: result.score,
            model_version: result.model_version,
            raw_response,
            timestamp: result.timestamp,
        }))
    }
}

// crates/quality-gate-scorers/src/text.rs
// ============================================================================
// Module: Text Statistics
// Description: Deterministic tokenization and descriptive statistics.
// Purpose: Shared text decomposition for both rubric engines.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Both rubrics decompose input the same way: whitespace tokens, normalized
//! lowercase words, naive sentence and paragraph splits, and population
//! statistics over the resulting lengths. All helpers are pure and
//! allocation is kept to what the evidence strings need.

// ============================================================================
// SECTION: Tokenization
// ============================================================================

/// Splits text into whitespace-delimited tokens.
#[must_use]
pub fn tokens(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Normalizes tokens into lowercase words with punctuation trimmed.
#[must_use]
pub fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|token| token.trim_matches(|ch: char| !ch.is_alphanumeric() && ch != '\''))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Splits text into trimmed, non-empty sentences on terminal punctuation.
#[must_use]
pub fn sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits text into trimmed, non-empty paragraphs on blank lines.
#[must_use]
pub fn paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(str::to_string)
        .collect()
}

/// Returns trimmed, non-empty lines.
#[must_use]
pub fn lines(text: &str) -> Vec<&str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty()).collect()
}

// ============================================================================
// SECTION: Statistics
// ============================================================================

/// Population mean; zero for empty input.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss, reason = "Sample counts are tiny.")]
    let divisor = values.len() as f64;
    values.iter().sum::<f64>() / divisor
}

/// Population standard deviation; zero for empty input.
#[must_use]
pub fn stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let center = mean(values);
    #[allow(clippy::cast_precision_loss, reason = "Sample counts are tiny.")]
    let divisor = values.len() as f64;
    let variance =
        values.iter().map(|value| (value - center).powi(2)).sum::<f64>() / divisor;
    variance.sqrt()
}

/// Coefficient of variation; zero when the mean is zero.
#[must_use]
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let center = mean(values);
    if center == 0.0 {
        return 0.0;
    }
    stddev(values) / center
}

/// Converts a usize count into f64 for ratio arithmetic.
#[must_use]
pub fn as_f64(count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss, reason = "Text counts are far below 2^52.")]
    let value = count as f64;
    value
}

// ============================================================================
// SECTION: Phrase Counting
// ============================================================================

/// Counts non-overlapping occurrences of a phrase in lowercased text.
#[must_use]
pub fn count_phrase(lower_text: &str, phrase: &str) -> usize {
    if phrase.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut rest = lower_text;
    while let Some(position) = rest.find(phrase) {
        count += 1;
        rest = &rest[position + phrase.len()..];
    }
    count
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        reason = "Test-only panic-based assertions on exact constants are permitted."
    )]

    use super::*;

    #[test]
    fn words_normalize_case_and_punctuation() {
        let parsed = words("The engine, it's \"Fast\" (really).");
        assert_eq!(parsed, vec!["the", "engine", "it's", "fast", "really"]);
    }

    #[test]
    fn sentences_split_on_terminal_punctuation() {
        let parsed = sentences("One sentence. Another one! A third? ");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[2], "A third");
    }

    #[test]
    fn statistics_handle_uniform_input() {
        let values = [4.0, 4.0, 4.0];
        assert_eq!(mean(&values), 4.0);
        assert_eq!(stddev(&values), 0.0);
        assert_eq!(coefficient_of_variation(&values), 0.0);
    }

    #[test]
    fn phrase_counting_is_non_overlapping() {
        assert_eq!(count_phrase("aaaa", "aa"), 2);
        assert_eq!(count_phrase("delve into the topic to delve into", "delve into"), 2);
        assert_eq!(count_phrase("anything", ""), 0);
    }
}

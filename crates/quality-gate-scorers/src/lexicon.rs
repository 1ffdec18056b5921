// crates/quality-gate-scorers/src/lexicon.rs
// ============================================================================
// Module: Rubric Lexicons
// Description: Frozen phrase tables backing rubric version 1.0.0.
// Purpose: Keep every rubric signal list literal, ordered, and versioned.
// Dependencies: none
// ============================================================================

//! ## Overview
//! These tables are part of the frozen 1.0.0 rubric surface. Entries are
//! lowercase; matching happens against lowercased input, in table order, so
//! evidence enumeration is deterministic. Changing any entry requires a
//! bumped rubric version string.

// ============================================================================
// SECTION: AI-Likeness Tables
// ============================================================================

/// Stock phrases characteristic of model-generated prose.
pub const AI_PHRASES: &[&str] = &[
    "delve into",
    "delve deeper",
    "in today's fast-paced world",
    "in today's digital age",
    "it's important to note",
    "it is important to note",
    "unlock the potential",
    "unlock the power",
    "a testament to",
    "the landscape of",
    "navigate the complexities",
    "game-changer",
    "in the realm of",
    "embark on a journey",
    "treasure trove",
    "seamlessly integrate",
    "leverage the power",
    "harness the power",
    "revolutionize the way",
    "elevate your",
    "robust solution",
    "dive deep",
    "at the end of the day",
    "needless to say",
];

/// Hedging phrases typical of over-cautious generated prose.
pub const HEDGING_PHRASES: &[&str] = &[
    "it's worth noting",
    "it is worth noting",
    "generally speaking",
    "in most cases",
    "in many cases",
    "typically",
    "may vary",
    "it depends",
    "can potentially",
    "tends to",
    "often considered",
    "results may vary",
    "more or less",
    "to some extent",
];

/// Disclaimer phrases appended by safety-tuned generators.
pub const DISCLAIMER_PHRASES: &[&str] = &[
    "consult a professional",
    "consult with a professional",
    "not financial advice",
    "not legal advice",
    "not medical advice",
    "do your own research",
    "for informational purposes only",
    "seek professional advice",
];

/// Transition phrases counted at sentence starts.
pub const TRANSITION_PHRASES: &[&str] = &[
    "furthermore",
    "moreover",
    "additionally",
    "in conclusion",
    "in summary",
    "however",
    "firstly",
    "secondly",
    "finally",
    "overall",
    "on the other hand",
    "as a result",
];

/// Formulaic openings matched against the start of the first sentence.
pub const FORMULAIC_OPENINGS: &[&str] = &[
    "in today's",
    "in the world of",
    "in the realm of",
    "in this article",
    "in this post",
    "in an era",
    "in the ever-evolving",
    "have you ever",
    "imagine a world",
    "whether you're",
    "when it comes to",
];

/// Informal markers whose absence signals machine polish.
pub const INFORMAL_MARKERS: &[&str] = &[
    "honestly",
    "frankly",
    "i think",
    "i guess",
    "i reckon",
    "kinda",
    "sort of",
    "you know",
    "to be fair",
    "anyway",
    "stuff",
];

/// Words ending in "ly" that are not adverbs; excluded from the adverb ratio.
pub const NON_ADVERB_LY_WORDS: &[&str] = &[
    "family",
    "only",
    "supply",
    "apply",
    "reply",
    "assembly",
    "early",
    "belly",
    "jelly",
    "rally",
    "bully",
    "italy",
    "july",
];

// ============================================================================
// SECTION: AEO Tables
// ============================================================================

/// Fluff phrases penalized by the trust pillar.
pub const FLUFF_PHRASES: &[&str] = &[
    "best ever",
    "world-class",
    "cutting-edge",
    "state-of-the-art",
    "game-changing",
    "revolutionary",
    "unleash",
    "supercharge",
    "next-level",
    "one-stop shop",
];

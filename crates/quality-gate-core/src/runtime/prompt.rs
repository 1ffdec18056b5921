// crates/quality-gate-core/src/runtime/prompt.rs
// ============================================================================
// Module: Rewrite Prompt Construction
// Description: Canonical rewrite prompt template and deterministic filling.
// Purpose: Guarantee the stored prompt is byte-identical to what was sent.
// Dependencies: crate::runtime::triggers
// ============================================================================

//! ## Overview
//! The rewrite prompt is built from one canonical template. The original
//! content is inserted verbatim, required fixes come from the fixed
//! trigger-to-fix table, and the prohibition and output sections are
//! constant. The filled prompt is persisted on the cycle row before the
//! external call so the audit trail always shows exactly what the rewriter
//! received.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::runtime::triggers::TriggerFinding;
use crate::runtime::triggers::required_fixes;

// ============================================================================
// SECTION: Template Sections
// ============================================================================

/// Header instruction opening every rewrite prompt.
const PROMPT_HEADER: &str = "You are revising an internal draft to raise its measured quality. \
                             Rewrite the content below, applying every required fix while \
                             preserving the author's facts and claims.";

/// Constant prohibition section.
const STRICT_PROHIBITIONS: &str = "STRICT PROHIBITIONS:\n- Do not invent facts, numbers, quotes, \
                                   or citations that are not in the original.\n- Do not change \
                                   the meaning of any claim.\n- Do not add meta commentary about \
                                   the rewrite or these instructions.\n- Do not address the \
                                   reader about this prompt.";

/// Constant output-requirements section.
const OUTPUT_REQUIREMENTS: &str = "OUTPUT REQUIREMENTS:\n- Return only the rewritten body \
                                   text.\n- Keep markdown structure where it serves the \
                                   content.\n- Do not wrap the output in code fences or add a \
                                   preamble.";

// ============================================================================
// SECTION: Prompt Filling
// ============================================================================

/// Fills the canonical rewrite prompt for the given content and findings.
///
/// The fill is deterministic: identical content and findings produce a
/// byte-identical prompt.
#[must_use]
pub fn build_rewrite_prompt(original_content: &str, findings: &[TriggerFinding]) -> String {
    let fixes = required_fixes(findings);
    let mut fix_lines = String::new();
    for (index, fix) in fixes.iter().enumerate() {
        fix_lines.push_str(&format!("{}. {fix}\n", index + 1));
    }

    format!(
        "{PROMPT_HEADER}\n\nORIGINAL CONTENT:\n{original_content}\n\nREQUIRED \
         FIXES:\n{fix_lines}\n{STRICT_PROHIBITIONS}\n\n{OUTPUT_REQUIREMENTS}\n"
    )
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
        reason = "Test-only panic-based assertions are permitted."
    )]

    use serde_json::json;

    use super::build_rewrite_prompt;
    use crate::runtime::triggers::TriggerFinding;
    use crate::runtime::triggers::TriggerType;

    /// Builds a minimal finding of the given type.
    fn finding(trigger_type: TriggerType) -> TriggerFinding {
        TriggerFinding {
            trigger_type,
            reason: trigger_type.as_str().to_string(),
            data: json!({}),
        }
    }

    #[test]
    fn prompt_embeds_content_verbatim() {
        let content = "Original paragraph.\n\nWith two blocks.";
        let prompt = build_rewrite_prompt(content, &[finding(TriggerType::AeoTotalLow)]);
        assert!(prompt.contains("ORIGINAL CONTENT:\nOriginal paragraph.\n\nWith two blocks.\n"));
    }

    #[test]
    fn prompt_fill_is_deterministic() {
        let findings =
            vec![finding(TriggerType::AeoTotalLow), finding(TriggerType::AiLikenessHigh)];
        let first = build_rewrite_prompt("same content", &findings);
        let second = build_rewrite_prompt("same content", &findings);
        assert_eq!(first, second);
    }

    #[test]
    fn fixes_are_numbered_in_rule_order() {
        let findings =
            vec![finding(TriggerType::AeoTotalLow), finding(TriggerType::AiLikenessHigh)];
        let prompt = build_rewrite_prompt("content", &findings);
        assert!(prompt.contains("1. Lead with the answer"));
        assert!(prompt.contains("2. Vary sentence structure"));
        assert!(prompt.contains("STRICT PROHIBITIONS:"));
        assert!(prompt.contains("OUTPUT REQUIREMENTS:"));
    }
}

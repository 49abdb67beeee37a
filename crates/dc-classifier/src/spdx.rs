// spdx.rs — SPDX resolution with confidence (spec §4.1 "SPDX resolution
// with confidence").
//
// The confidence function is this crate's resolution of spec.md's open
// question: `spdx_hint` hits are always 1.0; a normalization-rule hit is
// 1.0 when the matched phrase covers at least 80% of the evidence text
// (an "exact long-phrase" match), otherwise
// `clamp(0.5 + 0.1 * min(hit_phrase_word_count, 5), 0.5, 1.0)` — monotone
// in phrase specificity, never scoring a longer/more-complete match lower
// than a shorter one.

use dc_core::hash::collapse_whitespace;

use crate::model::NormalizationRule;

#[derive(Debug, Clone, PartialEq)]
pub struct SpdxResolution {
    pub spdx: String,
    pub confidence: f64,
    pub source: String,
}

fn is_concrete_hint(hint: &str) -> bool {
    let upper = hint.trim().to_uppercase();
    !upper.is_empty() && upper != "UNKNOWN" && upper != "MIXED"
}

fn rule_confidence(phrase: &str, evidence_text: &str) -> f64 {
    let phrase_len = phrase.len() as f64;
    let text_len = evidence_text.len().max(1) as f64;
    if phrase_len / text_len >= 0.8 {
        return 1.0;
    }
    let word_count = phrase.split_whitespace().count().min(5) as f64;
    (0.5 + 0.1 * word_count).clamp(0.5, 1.0)
}

/// Resolve the SPDX identifier for a target, in priority order: concrete
/// `spdx_hint`, then the first matching normalization rule, then
/// `"UNKNOWN"` with zero confidence.
pub fn resolve(spdx_hint: Option<&str>, evidence_text: &str, rules: &[NormalizationRule]) -> SpdxResolution {
    if let Some(hint) = spdx_hint {
        if is_concrete_hint(hint) {
            return SpdxResolution {
                spdx: hint.trim().to_string(),
                confidence: 1.0,
                source: "hint".to_string(),
            };
        }
    }

    let collapsed_evidence = collapse_whitespace(evidence_text);
    let haystack = collapsed_evidence.to_lowercase();

    for (index, rule) in rules.iter().enumerate() {
        for phrase in &rule.match_any {
            let collapsed_phrase = collapse_whitespace(phrase);
            if collapsed_phrase.is_empty() {
                continue;
            }
            if haystack.contains(&collapsed_phrase.to_lowercase()) {
                return SpdxResolution {
                    spdx: rule.spdx.clone(),
                    confidence: rule_confidence(&collapsed_phrase, &collapsed_evidence),
                    source: format!("rule:{index}"),
                };
            }
        }
    }

    SpdxResolution {
        spdx: "UNKNOWN".to_string(),
        confidence: 0.0,
        source: "no_rule_hit".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concrete_hint_wins_outright() {
        let resolution = resolve(Some("MIT"), "irrelevant text", &[]);
        assert_eq!(resolution.spdx, "MIT");
        assert_eq!(resolution.confidence, 1.0);
        assert_eq!(resolution.source, "hint");
    }

    #[test]
    fn unknown_and_mixed_hints_fall_through_to_rules() {
        let rules = vec![NormalizationRule {
            match_any: vec!["creative commons attribution".to_string()],
            spdx: "CC-BY-4.0".to_string(),
        }];
        let resolution = resolve(Some("UNKNOWN"), "Licensed under Creative Commons Attribution 4.0", &rules);
        assert_eq!(resolution.spdx, "CC-BY-4.0");
        assert!(resolution.confidence >= 0.5);
    }

    #[test]
    fn no_hint_no_rule_hit_is_unknown_zero_confidence() {
        let resolution = resolve(None, "no license information present", &[]);
        assert_eq!(resolution.spdx, "UNKNOWN");
        assert_eq!(resolution.confidence, 0.0);
        assert_eq!(resolution.source, "no_rule_hit");
    }

    #[test]
    fn exact_long_phrase_scores_full_confidence() {
        let phrase = "this entire evidence document is the mit license and nothing else at all here";
        let rules = vec![NormalizationRule {
            match_any: vec![phrase.to_string()],
            spdx: "MIT".to_string(),
        }];
        let resolution = resolve(None, phrase, &rules);
        assert_eq!(resolution.confidence, 1.0);
    }

    #[test]
    fn longer_phrase_never_scores_below_shorter_one() {
        let short_rules = vec![NormalizationRule {
            match_any: vec!["mit".to_string()],
            spdx: "MIT".to_string(),
        }];
        let long_rules = vec![NormalizationRule {
            match_any: vec!["licensed under the mit license terms".to_string()],
            spdx: "MIT".to_string(),
        }];
        let text = "Some long document. Licensed under the MIT license terms. More filler text padding this out so the phrase is not 80 percent of the document body.";
        let short = resolve(None, text, &short_rules);
        let long = resolve(None, text, &long_rules);
        assert!(long.confidence >= short.confidence);
    }
}

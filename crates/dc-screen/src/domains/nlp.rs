// nlp.rs — general natural-language domain: a light quality gate ahead
// of the standard behavior — pitches text too short to be useful and
// text that is mostly non-alphabetic (boilerplate, tables, markup dumps
// that slipped past extraction).

use super::{text_field, DomainModule};
use crate::error::ScreenError;
use crate::model::{FilterDecision, OutputRecord, ScreenContext};

const MIN_CHARS: usize = 40;
const MIN_ALPHA_RATIO: f64 = 0.5;

fn alpha_ratio(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let alpha = text.chars().filter(|c| c.is_alphabetic()).count();
    alpha as f64 / total as f64
}

pub struct NlpDomain;

impl DomainModule for NlpDomain {
    fn name(&self) -> &'static str {
        "nlp"
    }

    fn filter_record(&self, raw: &serde_json::Value, _ctx: &ScreenContext) -> FilterDecision {
        let Some(text) = text_field(raw) else {
            return FilterDecision::reject("nlp record has no text/content/body field");
        };
        if text.chars().count() < MIN_CHARS {
            return FilterDecision::reject(format!("text is shorter than the {MIN_CHARS}-character minimum"));
        }
        if alpha_ratio(text) < MIN_ALPHA_RATIO {
            return FilterDecision::reject("text is mostly non-alphabetic content");
        }
        let mut decision = FilterDecision::allow();
        decision.text = Some(text.to_string());
        decision
    }

    fn transform_record(
        &self,
        _raw: &serde_json::Value,
        decision: &FilterDecision,
        ctx: &ScreenContext,
        row_index: usize,
    ) -> Result<OutputRecord, ScreenError> {
        let text = decision.text.clone().unwrap_or_default();
        Ok(ctx.build_record(row_index, &text, decision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> ScreenContext {
        crate::domains::test_support::sample_context("nlp")
    }

    #[test]
    fn rejects_short_text() {
        let domain = NlpDomain;
        let decision = domain.filter_record(&json!({"text": "too short"}), &ctx());
        assert!(!decision.allow);
    }

    #[test]
    fn rejects_mostly_non_alphabetic_text() {
        let domain = NlpDomain;
        let raw = json!({"text": "1234567890 !@#$%^&*() 1234567890 !@#$%^&*()"});
        assert!(!domain.filter_record(&raw, &ctx()).allow);
    }

    #[test]
    fn accepts_ordinary_prose() {
        let domain = NlpDomain;
        let raw = json!({"text": "The quick brown fox jumps over the lazy dog near the riverbank at dawn."});
        assert!(domain.filter_record(&raw, &ctx()).allow);
    }
}

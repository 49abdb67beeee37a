// safety.rs — safety/harms domain: pitches records tagged with a
// disallowed harm category unless the source catalog marks them
// `reviewed_safe` (a human reviewer has already signed off on keeping
// sensitive-but-legitimate material, e.g. a poison-control reference).

use super::{str_field, DomainModule};
use crate::error::ScreenError;
use crate::model::{FilterDecision, OutputRecord, ScreenContext};

const DISALLOWED_CATEGORIES: &[&str] = &["self_harm_instructions", "weapons_synthesis", "csam"];

pub struct SafetyDomain;

impl DomainModule for SafetyDomain {
    fn name(&self) -> &'static str {
        "safety"
    }

    fn filter_record(&self, raw: &serde_json::Value, _ctx: &ScreenContext) -> FilterDecision {
        let reviewed_safe = raw.get("reviewed_safe").and_then(|v| v.as_bool()).unwrap_or(false);
        if !reviewed_safe {
            if let Some(category) = str_field(raw, "harm_category") {
                if DISALLOWED_CATEGORIES.contains(&category.to_ascii_lowercase().as_str()) {
                    return FilterDecision::reject(format!("harm_category '{category}' is disallowed without review"));
                }
            }
        }
        let Some(text) = super::text_field(raw) else {
            return FilterDecision::reject("safety record has no text/content/body field");
        };
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
        crate::domains::test_support::sample_context("safety")
    }

    #[test]
    fn blocks_unreviewed_disallowed_category() {
        let domain = SafetyDomain;
        let raw = json!({"text": "...", "harm_category": "weapons_synthesis"});
        assert!(!domain.filter_record(&raw, &ctx()).allow);
    }

    #[test]
    fn allows_reviewed_disallowed_category() {
        let domain = SafetyDomain;
        let raw = json!({"text": "poison control antidote reference", "harm_category": "weapons_synthesis", "reviewed_safe": true});
        assert!(domain.filter_record(&raw, &ctx()).allow);
    }

    #[test]
    fn allows_plain_record() {
        let domain = SafetyDomain;
        let raw = json!({"text": "general safety guidance"});
        assert!(domain.filter_record(&raw, &ctx()).allow);
    }
}

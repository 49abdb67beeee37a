// standard.rs — the fallback domain: keeps any record with non-empty
// text and performs no domain-specific filtering. Used for targets whose
// records already arrive pre-screened upstream.

use super::{text_field, DomainModule};
use crate::error::ScreenError;
use crate::model::{FilterDecision, OutputRecord, ScreenContext};

pub struct StandardDomain;

impl DomainModule for StandardDomain {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn filter_record(&self, raw: &serde_json::Value, _ctx: &ScreenContext) -> FilterDecision {
        match text_field(raw) {
            Some(text) => {
                let mut decision = FilterDecision::allow();
                decision.text = Some(text.to_string());
                decision
            }
            None => FilterDecision::reject("record has no non-empty text/content/body field"),
        }
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
        crate::domains::test_support::sample_context("standard")
    }

    #[test]
    fn keeps_records_with_text() {
        let domain = StandardDomain;
        let decision = domain.filter_record(&json!({"text": "hello"}), &ctx());
        assert!(decision.allow);
        assert_eq!(decision.text.as_deref(), Some("hello"));
    }

    #[test]
    fn rejects_records_without_text() {
        let domain = StandardDomain;
        let decision = domain.filter_record(&json!({"other": 1}), &ctx());
        assert!(!decision.allow);
    }
}

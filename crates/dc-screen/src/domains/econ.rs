// econ.rs — economics/finance domain: requires a numeric `value` field
// alongside the narrative text, since downstream analysis joins on it;
// records missing it are pitched rather than silently zero-filled.

use super::DomainModule;
use crate::error::ScreenError;
use crate::model::{FilterDecision, OutputRecord, ScreenContext};

pub struct EconDomain;

impl DomainModule for EconDomain {
    fn name(&self) -> &'static str {
        "econ"
    }

    fn filter_record(&self, raw: &serde_json::Value, _ctx: &ScreenContext) -> FilterDecision {
        let Some(text) = super::text_field(raw) else {
            return FilterDecision::reject("econ record has no narrative text");
        };
        if raw.get("value").and_then(|v| v.as_f64()).is_none() {
            return FilterDecision::reject("econ record is missing a numeric 'value' field");
        }
        let mut decision = FilterDecision::allow();
        decision.text = Some(text.to_string());
        decision
    }

    fn transform_record(
        &self,
        raw: &serde_json::Value,
        decision: &FilterDecision,
        ctx: &ScreenContext,
        row_index: usize,
    ) -> Result<OutputRecord, ScreenError> {
        let text = decision.text.clone().unwrap_or_default();
        let mut record = ctx.build_record(row_index, &text, decision);
        if let Some(value) = raw.get("value") {
            record.extra.insert("value".to_string(), value.clone());
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> ScreenContext {
        crate::domains::test_support::sample_context("econ")
    }

    #[test]
    fn rejects_record_without_numeric_value() {
        let domain = EconDomain;
        let decision = domain.filter_record(&json!({"text": "GDP commentary"}), &ctx());
        assert!(!decision.allow);
    }

    #[test]
    fn accepts_record_with_value_and_carries_it_through() {
        let domain = EconDomain;
        let raw = json!({"text": "Q2 GDP growth", "value": 2.4});
        let decision = domain.filter_record(&raw, &ctx());
        assert!(decision.allow);
        let record = domain.transform_record(&raw, &decision, &ctx(), 0).unwrap();
        assert_eq!(record.extra.get("value").and_then(|v| v.as_f64()), Some(2.4));
    }
}

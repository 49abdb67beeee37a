// biology.rs — biology domain: pitches sequence records flagged as
// select-agent material, and dedupes identical sequences within a run.

use super::{str_field, DomainModule};
use crate::error::ScreenError;
use crate::model::{FilterDecision, OutputRecord, ScreenContext};

pub struct BiologyDomain;

impl DomainModule for BiologyDomain {
    fn name(&self) -> &'static str {
        "biology"
    }

    fn filter_record(&self, raw: &serde_json::Value, _ctx: &ScreenContext) -> FilterDecision {
        if raw.get("select_agent").and_then(|v| v.as_bool()).unwrap_or(false) {
            return FilterDecision::reject("sequence is flagged as select-agent material");
        }
        let Some(text) = super::text_field(raw).or_else(|| str_field(raw, "sequence")) else {
            return FilterDecision::reject("biology record has no sequence or description text");
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

    fn dedupe_key(&self, _raw: &serde_json::Value, decision: &FilterDecision) -> Option<String> {
        decision.text.as_ref().map(|t| dc_core::hash::hash_str(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> ScreenContext {
        crate::domains::test_support::sample_context("biology")
    }

    #[test]
    fn blocks_select_agent_flagged_records() {
        let domain = BiologyDomain;
        let decision = domain.filter_record(&json!({"sequence": "ATCG", "select_agent": true}), &ctx());
        assert!(!decision.allow);
    }

    #[test]
    fn allows_plain_sequence_record() {
        let domain = BiologyDomain;
        let decision = domain.filter_record(&json!({"sequence": "ATCGATCG"}), &ctx());
        assert!(decision.allow);
        assert_eq!(decision.text.as_deref(), Some("ATCGATCG"));
    }
}

// kg_nav.rs — knowledge-graph navigation domain: records are
// subject/relation/object triples rather than free text; a malformed
// triple (any leg missing) is pitched, and the rendered text is the
// triple's canonical `subject relation object` form.

use super::str_field;
use super::DomainModule;
use crate::error::ScreenError;
use crate::model::{FilterDecision, OutputRecord, ScreenContext};

pub struct KgNavDomain;

impl DomainModule for KgNavDomain {
    fn name(&self) -> &'static str {
        "kg_nav"
    }

    fn filter_record(&self, raw: &serde_json::Value, _ctx: &ScreenContext) -> FilterDecision {
        let subject = str_field(raw, "subject");
        let relation = str_field(raw, "relation");
        let object = str_field(raw, "object");
        match (subject, relation, object) {
            (Some(s), Some(r), Some(o)) if !s.is_empty() && !r.is_empty() && !o.is_empty() => {
                let mut decision = FilterDecision::allow();
                decision.text = Some(format!("{s} {r} {o}"));
                decision
            }
            _ => FilterDecision::reject("triple is missing subject, relation, or object"),
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

    fn dedupe_key(&self, _raw: &serde_json::Value, decision: &FilterDecision) -> Option<String> {
        decision.text.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> ScreenContext {
        crate::domains::test_support::sample_context("kg_nav")
    }

    #[test]
    fn rejects_incomplete_triple() {
        let domain = KgNavDomain;
        let decision = domain.filter_record(&json!({"subject": "Paris", "relation": "capital_of"}), &ctx());
        assert!(!decision.allow);
    }

    #[test]
    fn accepts_complete_triple_and_renders_canonical_text() {
        let domain = KgNavDomain;
        let raw = json!({"subject": "Paris", "relation": "capital_of", "object": "France"});
        let decision = domain.filter_record(&raw, &ctx());
        assert!(decision.allow);
        assert_eq!(decision.text.as_deref(), Some("Paris capital_of France"));
    }
}

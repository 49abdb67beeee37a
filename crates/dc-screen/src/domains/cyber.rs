// cyber.rs — security-research domain: keeps defensive material
// (advisories, detection rules, CVE writeups) but pitches records
// offering a working exploit without a corresponding `defensive_only`
// tag from the source catalog.

use super::{str_field, DomainModule};
use crate::error::ScreenError;
use crate::model::{FilterDecision, OutputRecord, ScreenContext};

const WEAPONIZED_MARKERS: &[&str] = &["weaponized_poc", "working_exploit", "ready_to_run_payload"];

pub struct CyberDomain;

impl DomainModule for CyberDomain {
    fn name(&self) -> &'static str {
        "cyber"
    }

    fn filter_record(&self, raw: &serde_json::Value, _ctx: &ScreenContext) -> FilterDecision {
        let defensive_only = raw.get("defensive_only").and_then(|v| v.as_bool()).unwrap_or(false);
        if !defensive_only {
            if let Some(category) = str_field(raw, "category") {
                if WEAPONIZED_MARKERS.contains(&category.to_ascii_lowercase().as_str()) {
                    return FilterDecision::reject(format!("category '{category}' is not marked defensive_only"));
                }
            }
        }
        let Some(text) = super::text_field(raw) else {
            return FilterDecision::reject("cyber record has no advisory/description text");
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
        crate::domains::test_support::sample_context("cyber")
    }

    #[test]
    fn blocks_unflagged_weaponized_poc() {
        let domain = CyberDomain;
        let raw = json!({"text": "...", "category": "weaponized_poc"});
        assert!(!domain.filter_record(&raw, &ctx()).allow);
    }

    #[test]
    fn allows_weaponized_poc_marked_defensive_only() {
        let domain = CyberDomain;
        let raw = json!({"text": "detection signature for CVE-2026-0001", "category": "weaponized_poc", "defensive_only": true});
        assert!(domain.filter_record(&raw, &ctx()).allow);
    }

    #[test]
    fn allows_plain_advisory() {
        let domain = CyberDomain;
        let raw = json!({"text": "CVE-2026-0002 advisory", "category": "advisory"});
        assert!(domain.filter_record(&raw, &ctx()).allow);
    }
}

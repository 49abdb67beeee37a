// chem.rs — chemistry domain: drops records whose hazard annotation
// marks them above the configured tolerance, and dedupes by InChIKey
// when the source provides one (many chemistry corpora carry duplicate
// entries for the same compound under different identifiers).

use super::{str_field, DomainModule};
use crate::error::ScreenError;
use crate::model::{FilterDecision, OutputRecord, ScreenContext};

/// Hazard tiers a record may self-report; anything at or above `Restricted`
/// is pitched rather than screened through.
const BLOCKED_HAZARD_LEVELS: &[&str] = &["restricted", "select_agent_precursor", "extremely_hazardous"];

pub struct ChemDomain;

impl DomainModule for ChemDomain {
    fn name(&self) -> &'static str {
        "chem"
    }

    fn filter_record(&self, raw: &serde_json::Value, _ctx: &ScreenContext) -> FilterDecision {
        if let Some(level) = str_field(raw, "hazard_level") {
            let normalized = level.to_ascii_lowercase();
            if BLOCKED_HAZARD_LEVELS.contains(&normalized.as_str()) {
                return FilterDecision::reject(format!("hazard_level '{level}' exceeds the allowed tier"));
            }
        }
        let Some(text) = super::text_field(raw) else {
            return FilterDecision::reject("chemistry record has no description text");
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

    fn dedupe_key(&self, raw: &serde_json::Value, _decision: &FilterDecision) -> Option<String> {
        str_field(raw, "inchi_key").map(|s| s.to_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> ScreenContext {
        crate::domains::test_support::sample_context("chem")
    }

    #[test]
    fn blocks_restricted_hazard_level() {
        let domain = ChemDomain;
        let decision = domain.filter_record(&json!({"text": "x", "hazard_level": "Restricted"}), &ctx());
        assert!(!decision.allow);
    }

    #[test]
    fn allows_unflagged_record_and_exposes_dedupe_key() {
        let domain = ChemDomain;
        let raw = json!({"text": "Sodium chloride is a salt.", "inchi_key": "faceb00c"});
        let decision = domain.filter_record(&raw, &ctx());
        assert!(decision.allow);
        assert_eq!(domain.dedupe_key(&raw, &decision), Some("FACEB00C".to_string()));
    }
}

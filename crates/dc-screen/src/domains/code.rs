// code.rs — source-code domain: drops files under a denylisted license
// header or obvious vendored/generated paths, and dedupes by exact
// content hash (source trees routinely vendor the same file twice).

use super::{str_field, DomainModule};
use crate::error::ScreenError;
use crate::model::{FilterDecision, OutputRecord, ScreenContext};

const DENIED_LICENSES: &[&str] = &["proprietary", "unlicensed", "all-rights-reserved"];
const SKIPPED_PATH_MARKERS: &[&str] = &["/vendor/", "/node_modules/", "/.git/", "/dist/", "/build/"];

pub struct CodeDomain;

impl DomainModule for CodeDomain {
    fn name(&self) -> &'static str {
        "code"
    }

    fn filter_record(&self, raw: &serde_json::Value, _ctx: &ScreenContext) -> FilterDecision {
        if let Some(license) = str_field(raw, "license") {
            if DENIED_LICENSES.contains(&license.to_ascii_lowercase().as_str()) {
                return FilterDecision::reject(format!("license '{license}' is not redistributable"));
            }
        }
        if let Some(path) = str_field(raw, "path") {
            if SKIPPED_PATH_MARKERS.iter().any(|marker| path.contains(marker)) {
                return FilterDecision::reject(format!("path '{path}' matches a vendored/generated marker"));
            }
        }
        let Some(text) = super::text_field(raw) else {
            return FilterDecision::reject("code record has no source text");
        };
        if text.trim().is_empty() {
            return FilterDecision::reject("source text is empty after trimming");
        }
        let mut decision = FilterDecision::allow();
        decision.text = Some(text.to_string());
        if let Some(license) = str_field(raw, "license") {
            decision.license_spdx = Some(license.to_string());
        }
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
        decision.text.as_ref().map(|t| dc_core::hash::content_sha256(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> ScreenContext {
        crate::domains::test_support::sample_context("code")
    }

    #[test]
    fn rejects_proprietary_license() {
        let domain = CodeDomain;
        let decision = domain.filter_record(&json!({"text": "fn main() {}", "license": "Proprietary"}), &ctx());
        assert!(!decision.allow);
    }

    #[test]
    fn rejects_vendored_paths() {
        let domain = CodeDomain;
        let raw = json!({"text": "fn main() {}", "path": "repo/vendor/lib.rs"});
        assert!(!domain.filter_record(&raw, &ctx()).allow);
    }

    #[test]
    fn allows_plain_source_and_dedupes_by_content() {
        let domain = CodeDomain;
        let raw = json!({"text": "fn main() {}", "license": "MIT"});
        let decision = domain.filter_record(&raw, &ctx());
        assert!(decision.allow);
        assert_eq!(decision.license_spdx.as_deref(), Some("MIT"));
        assert!(domain.dedupe_key(&raw, &decision).is_some());
    }
}

// domains/mod.rs — pluggable domain modules for the yellow-screen stage
// (spec §4.3: "the screen engine is agnostic to which domain is
// configured"). Mirrors the teacher's output-adapter trait-plus-factory
// idiom: one trait, one impl per domain, one registry keyed by name.

mod biology;
mod chem;
mod code;
mod cyber;
mod econ;
mod kg_nav;
mod nlp;
mod safety;
mod standard;

use std::collections::HashMap;

use crate::error::ScreenError;
use crate::model::{FilterDecision, OutputRecord, ScreenContext};

/// A domain's screening policy: what to keep, what to drop, how to shape
/// the accepted record. Implementations are free to be stateless; the
/// registry hands out one boxed instance per name, not per record.
pub trait DomainModule: Send + Sync {
    /// Short, stable name used in config and logs.
    fn name(&self) -> &'static str;

    /// Optional one-time check run before any record in a target is
    /// screened (e.g. verifying a required lexicon file is present).
    /// Default: nothing to check.
    fn domain_preflight(&self, _ctx: &ScreenContext) -> Result<(), ScreenError> {
        Ok(())
    }

    /// Decide whether `raw` should be kept, and what text/metadata to
    /// carry forward if so.
    fn filter_record(&self, raw: &serde_json::Value, ctx: &ScreenContext) -> FilterDecision;

    /// Build the final `OutputRecord` for an accepted record. Called only
    /// when `filter_record` returned `allow: true` for the same `raw`.
    fn transform_record(
        &self,
        raw: &serde_json::Value,
        decision: &FilterDecision,
        ctx: &ScreenContext,
        row_index: usize,
    ) -> Result<OutputRecord, ScreenError>;

    /// Optional stable key used for in-run dedupe before a record is
    /// written to a shard. Default: no domain-level dedupe.
    fn dedupe_key(&self, _raw: &serde_json::Value, _decision: &FilterDecision) -> Option<String> {
        None
    }
}

/// A name-keyed set of domain modules, built once per process.
pub struct DomainRegistry {
    modules: HashMap<&'static str, Box<dyn DomainModule>>,
}

impl DomainRegistry {
    pub fn new() -> Self {
        DomainRegistry { modules: HashMap::new() }
    }

    pub fn register(&mut self, module: Box<dyn DomainModule>) {
        self.modules.insert(module.name(), module);
    }

    pub fn get(&self, name: &str) -> Result<&dyn DomainModule, ScreenError> {
        self.modules.get(name).map(|b| b.as_ref()).ok_or_else(|| ScreenError::UnknownDomain { name: name.to_string() })
    }

    /// The registry pre-populated with every built-in domain module
    /// (spec §4.3: chem, biology, code, cyber, econ, kg_nav, nlp, safety,
    /// plus the `standard` fallback for everything else).
    pub fn with_defaults() -> Self {
        let mut registry = DomainRegistry::new();
        registry.register(Box::new(standard::StandardDomain));
        registry.register(Box::new(chem::ChemDomain));
        registry.register(Box::new(biology::BiologyDomain));
        registry.register(Box::new(code::CodeDomain));
        registry.register(Box::new(cyber::CyberDomain));
        registry.register(Box::new(econ::EconDomain));
        registry.register(Box::new(kg_nav::KgNavDomain));
        registry.register(Box::new(nlp::NlpDomain));
        registry.register(Box::new(safety::SafetyDomain));
        registry
    }
}

impl Default for DomainRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Pull a record's text out of whichever of the common field names the
/// raw JSON uses. Domain modules that need something more specific read
/// `raw` directly instead.
pub(crate) fn text_field(raw: &serde_json::Value) -> Option<&str> {
    for key in ["text", "content", "body"] {
        if let Some(s) = raw.get(key).and_then(|v| v.as_str()) {
            if !s.is_empty() {
                return Some(s);
            }
        }
    }
    None
}

pub(crate) fn str_field<'a>(raw: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    raw.get(key).and_then(|v| v.as_str())
}

#[cfg(test)]
pub(crate) mod test_support {
    use dc_classifier::{OutputPool, Routing};

    use crate::model::ScreenContext;

    pub fn sample_context(domain: &str) -> ScreenContext {
        ScreenContext {
            target_id: format!("{domain}_target"),
            target_name: format!("{domain} sample target"),
            dataset_id: "sample-dataset".to_string(),
            split: "train".to_string(),
            config: "default".to_string(),
            pipeline: "yellow_screen".to_string(),
            pool: OutputPool::Permissive,
            license_profile: "permissive".to_string(),
            resolved_spdx: "CC-BY-4.0".to_string(),
            license_evidence_url: None,
            routing: Routing::default(),
            source_url: "https://example.test/source".to_string(),
            origin: domain.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_defaults_registers_every_built_in_domain() {
        let registry = DomainRegistry::with_defaults();
        for name in ["standard", "chem", "biology", "code", "cyber", "econ", "kg_nav", "nlp", "safety"] {
            assert!(registry.get(name).is_ok(), "missing domain '{name}'");
        }
    }

    #[test]
    fn unknown_domain_is_an_error() {
        let registry = DomainRegistry::with_defaults();
        assert!(matches!(registry.get("no_such_domain"), Err(ScreenError::UnknownDomain { .. })));
    }
}

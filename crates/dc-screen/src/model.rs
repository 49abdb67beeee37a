// model.rs — yellow-screen data model (spec §3.1 OutputRecord, §4.3). A
// domain module's `filter_record` returns a `FilterDecision`; on `allow`,
// `transform_record` must produce an `OutputRecord` satisfying the output
// contract (validated by [`validate_output_record`] before it ever reaches
// a shard — spec invariant 1).

use std::collections::HashMap;

use dc_classifier::{OutputPool, Routing};
use serde::{Deserialize, Serialize};

use crate::error::ScreenError;

/// The two hashes every accepted record carries, duplicated at the top
/// level and nested here for the reference implementation's `hash{}` sub-object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordHash {
    pub content_sha256: String,
    pub normalized_sha256: String,
}

/// Provenance sub-object (spec §3.1 OutputRecord.source).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSource {
    pub target_id: String,
    pub origin: String,
    pub source_url: String,
    pub license_spdx: String,
    pub license_profile: String,
    #[serde(default)]
    pub license_evidence: Option<String>,
    pub retrieved_at_utc: chrono::DateTime<chrono::Utc>,
}

/// The canonical screened record (spec §3.1 OutputRecord). A record that
/// doesn't satisfy this contract must never reach a shard — invariant 1
/// treats that as a programmer bug, not a data-quality pitch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputRecord {
    pub dataset_id: String,
    pub split: String,
    pub config: String,
    pub row_id: String,
    pub license_spdx: String,
    pub license_profile: String,
    pub source_urls: Vec<String>,
    #[serde(default)]
    pub reviewer_notes: String,
    pub content_sha256: String,
    pub normalized_sha256: String,
    pub pool: String,
    pub pipeline: String,
    pub target_name: String,
    pub timestamp_created: chrono::DateTime<chrono::Utc>,
    pub timestamp_updated: chrono::DateTime<chrono::Utc>,
    pub text: String,
    pub source: RecordSource,
    #[serde(default)]
    pub routing: Routing,
    pub hash: RecordHash,
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Required, non-empty string fields of the output contract (spec §3.1:
/// "required fields and types"). `split`/`config`/`reviewer_notes` may
/// legitimately be empty, so they're excluded from the non-empty check.
const REQUIRED_NON_EMPTY: &[(&str, fn(&OutputRecord) -> &str)] = &[
    ("dataset_id", |r| r.dataset_id.as_str()),
    ("row_id", |r| r.row_id.as_str()),
    ("license_spdx", |r| r.license_spdx.as_str()),
    ("license_profile", |r| r.license_profile.as_str()),
    ("content_sha256", |r| r.content_sha256.as_str()),
    ("normalized_sha256", |r| r.normalized_sha256.as_str()),
    ("pool", |r| r.pool.as_str()),
    ("pipeline", |r| r.pipeline.as_str()),
    ("target_name", |r| r.target_name.as_str()),
];

/// Validate a record against the OutputRecord contract (spec invariant 1).
/// A violation here means the domain module's `transform_record`
/// implementation has a bug — the stage aborts rather than pitching it.
pub fn validate_output_record(record: &OutputRecord, target_id: &str, row_index: usize) -> Result<(), ScreenError> {
    for (field, get) in REQUIRED_NON_EMPTY {
        if get(record).is_empty() {
            return Err(ScreenError::ContractViolation {
                target_id: target_id.to_string(),
                row_index,
                reason: format!("required field '{field}' is empty"),
            });
        }
    }
    if record.hash.content_sha256 != record.content_sha256 {
        return Err(ScreenError::ContractViolation {
            target_id: target_id.to_string(),
            row_index,
            reason: "hash.content_sha256 does not match top-level content_sha256".to_string(),
        });
    }
    if record.hash.normalized_sha256 != record.normalized_sha256 {
        return Err(ScreenError::ContractViolation {
            target_id: target_id.to_string(),
            row_index,
            reason: "hash.normalized_sha256 does not match top-level normalized_sha256".to_string(),
        });
    }
    Ok(())
}

/// What a domain module's `filter_record` returns for one raw record.
#[derive(Debug, Clone, Default)]
pub struct FilterDecision {
    pub allow: bool,
    pub reason: Option<String>,
    pub text: Option<String>,
    pub license_spdx: Option<String>,
    pub extra: HashMap<String, serde_json::Value>,
    pub sample_extra: Option<serde_json::Value>,
}

impl FilterDecision {
    pub fn allow() -> Self {
        FilterDecision { allow: true, ..Default::default() }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        FilterDecision { allow: false, reason: Some(reason.into()), ..Default::default() }
    }
}

/// Per-target context threaded through every domain-module call (spec
/// §4.3: "the screen engine is agnostic to which domain is configured").
#[derive(Debug, Clone)]
pub struct ScreenContext {
    pub target_id: String,
    pub target_name: String,
    pub dataset_id: String,
    pub split: String,
    pub config: String,
    pub pipeline: String,
    pub pool: OutputPool,
    pub license_profile: String,
    pub resolved_spdx: String,
    pub license_evidence_url: Option<String>,
    pub routing: Routing,
    pub source_url: String,
    pub origin: String,
}

pub fn pool_label(pool: OutputPool) -> &'static str {
    match pool {
        OutputPool::Permissive => "permissive",
        OutputPool::Copyleft => "copyleft",
        OutputPool::Quarantine => "quarantine",
    }
}

impl ScreenContext {
    /// Assemble the common shape of an accepted record. Domain modules
    /// call this from `transform_record` and only need to supply the
    /// final `text` and any domain-specific `extra` fields — every other
    /// contract field is derived from context plus the hashing
    /// invariants (spec invariant 2).
    pub fn build_record(&self, row_index: usize, text: &str, decision: &FilterDecision) -> OutputRecord {
        let content_sha256 = dc_core::hash::content_sha256(text);
        let normalized_sha256 = dc_core::normalize::normalized_sha256(text);
        let now = chrono::Utc::now();
        let license_spdx = decision.license_spdx.clone().unwrap_or_else(|| self.resolved_spdx.clone());

        OutputRecord {
            dataset_id: self.dataset_id.clone(),
            split: self.split.clone(),
            config: self.config.clone(),
            row_id: format!("{}:{row_index}", self.target_id),
            license_spdx: license_spdx.clone(),
            license_profile: self.license_profile.clone(),
            source_urls: vec![self.source_url.clone()],
            reviewer_notes: String::new(),
            content_sha256: content_sha256.clone(),
            normalized_sha256: normalized_sha256.clone(),
            pool: pool_label(self.pool).to_string(),
            pipeline: self.pipeline.clone(),
            target_name: self.target_name.clone(),
            timestamp_created: now,
            timestamp_updated: now,
            text: text.to_string(),
            source: RecordSource {
                target_id: self.target_id.clone(),
                origin: self.origin.clone(),
                source_url: self.source_url.clone(),
                license_spdx,
                license_profile: self.license_profile.clone(),
                license_evidence: self.license_evidence_url.clone(),
                retrieved_at_utc: now,
            },
            routing: self.routing.clone(),
            hash: RecordHash { content_sha256, normalized_sha256 },
            extra: decision.extra.clone(),
        }
    }
}

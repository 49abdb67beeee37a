// model.rs — Target/LicenseMap/EvidenceSnapshot/DecisionBundle data model
// (spec §3.1). These are the on-disk JSON/YAML shapes; every field name
// here is part of the wire contract other stages and human reviewers read.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How a target's declared license stance maps to an output pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseProfile {
    Permissive,
    PublicDomain,
    Copyleft,
    RecordLevel,
    Unknown,
    Deny,
}

/// Where a target's payload lands once acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputPool {
    Permissive,
    Copyleft,
    Quarantine,
}

impl LicenseProfile {
    /// Default pool mapping absent an explicit override in the license
    /// map's profile table.
    pub fn default_pool(self) -> OutputPool {
        match self {
            LicenseProfile::Permissive | LicenseProfile::PublicDomain => OutputPool::Permissive,
            LicenseProfile::Copyleft => OutputPool::Copyleft,
            LicenseProfile::RecordLevel | LicenseProfile::Unknown | LicenseProfile::Deny => OutputPool::Quarantine,
        }
    }
}

/// Recognized acquisition strategies (spec §3.1 / §4.2.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStrategy {
    Http,
    Ftp,
    Git,
    Zenodo,
    Figshare,
    HuggingfaceDatasets,
    S3Sync,
    AwsRequesterPays,
    Torrent,
    GithubRelease,
    None,
}

/// Ordered license gates a target may require before GREEN is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseGate {
    SnapshotTerms,
    RestrictionPhraseScan,
    ManualLegalReview,
}

/// What a content check's outcome does to the bucket decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCheckAction {
    Ok,
    Warn,
    Quarantine,
    Block,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LicenseEvidence {
    #[serde(default)]
    pub spdx_hint: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadSpec {
    pub strategy: Option<DownloadStrategy>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub urls: Option<Vec<String>>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub filenames: Option<Vec<String>>,
    #[serde(default)]
    pub expected_size: Option<u64>,
    #[serde(default)]
    pub expected_sha256: Option<String>,
    #[serde(default)]
    pub max_bytes: Option<u64>,
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

impl DownloadSpec {
    /// The set of URLs to act on, merging the singular and plural forms.
    pub fn urls(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(u) = &self.url {
            out.push(u.clone());
        }
        if let Some(us) = &self.urls {
            out.extend(us.iter().cloned());
        }
        out
    }

    pub fn filenames(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(f) = &self.filename {
            out.push(f.clone());
        }
        if let Some(fs) = &self.filenames {
            out.extend(fs.iter().cloned());
        }
        out
    }

    pub fn strategy_name(&self) -> &'static str {
        match self.strategy {
            Some(DownloadStrategy::Http) => "http",
            Some(DownloadStrategy::Ftp) => "ftp",
            Some(DownloadStrategy::Git) => "git",
            Some(DownloadStrategy::Zenodo) => "zenodo",
            Some(DownloadStrategy::Figshare) => "figshare",
            Some(DownloadStrategy::HuggingfaceDatasets) => "huggingface_datasets",
            Some(DownloadStrategy::S3Sync) => "s3_sync",
            Some(DownloadStrategy::AwsRequesterPays) => "aws_requester_pays",
            Some(DownloadStrategy::Torrent) => "torrent",
            Some(DownloadStrategy::GithubRelease) => "github_release",
            Some(DownloadStrategy::None) | None => "none",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Routing {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub granularity: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}

fn default_true() -> bool {
    true
}

/// The declarative acquisition unit (spec §3.1). Targets are immutable
/// inputs — the classifier never writes back into a target catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub license_profile: LicenseProfile,
    #[serde(default)]
    pub license_evidence: LicenseEvidence,
    #[serde(default)]
    pub download: DownloadSpec,
    #[serde(default)]
    pub license_gates: Vec<LicenseGate>,
    #[serde(default)]
    pub content_checks: Vec<String>,
    #[serde(default)]
    pub content_check_actions: HashMap<String, ContentCheckAction>,
    #[serde(default)]
    pub routing: Routing,
    #[serde(default)]
    pub review_required: bool,
    #[serde(default)]
    pub split_group_id: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
}

/// A `{match_any: [phrase…], spdx}` normalization rule, tried in declared
/// order; the first whose phrase occurs wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationRule {
    pub match_any: Vec<String>,
    pub spdx: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceChangePolicy {
    Raw,
    Normalized,
    Either,
}

impl Default for EvidenceChangePolicy {
    fn default() -> Self {
        EvidenceChangePolicy::Either
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CosmeticChangePolicy {
    WarnOnly,
    TreatAsChanged,
}

impl Default for CosmeticChangePolicy {
    fn default() -> Self {
        CosmeticChangePolicy::WarnOnly
    }
}

/// Ordered decision table governing SPDX resolution and bucket gating
/// (spec §3.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LicenseMap {
    #[serde(default)]
    pub allowlist_spdx: Vec<String>,
    #[serde(default)]
    pub conditional_spdx: Vec<String>,
    #[serde(default)]
    pub deny_prefixes: Vec<String>,
    #[serde(default)]
    pub normalization_rules: Vec<NormalizationRule>,
    #[serde(default)]
    pub restriction_phrases: Vec<String>,
    #[serde(default)]
    pub profile_pool_overrides: HashMap<String, OutputPool>,
    #[serde(default = "default_min_confidence")]
    pub min_license_confidence: f64,
    #[serde(default)]
    pub evidence_change_policy: EvidenceChangePolicy,
    #[serde(default)]
    pub cosmetic_change_policy: CosmeticChangePolicy,
    #[serde(default)]
    pub require_yellow_signoff: bool,
}

fn default_min_confidence() -> f64 {
    0.5
}

/// One fetch of a target's license evidence (spec §3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceSnapshot {
    pub url: String,
    pub status: String,
    pub fetched_at_utc: chrono::DateTime<chrono::Utc>,
    pub content_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<Vec<u8>>,
    pub raw_sha256: String,
    pub normalized_sha256: String,
    #[serde(default)]
    pub normalized_hash_fallback: Option<String>,
    #[serde(default)]
    pub text_extracted: Option<String>,
    #[serde(default)]
    pub text_extraction_failed: bool,
    #[serde(default)]
    pub raw_changed_from_previous: Option<bool>,
    #[serde(default)]
    pub normalized_changed_from_previous: Option<bool>,
    #[serde(default)]
    pub cosmetic_change: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub headers_used_redacted: HashMap<String, String>,
}

/// One tie-break rule that fired during bucket decision (spec §3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleFired {
    pub rule_id: String,
    pub rule_type: String,
    pub severity: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    pub reason: String,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Bucket {
    Green,
    Yellow,
    Red,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signoff {
    pub status: String,
    pub by: String,
    pub at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub raw_sha256: Option<String>,
    #[serde(default)]
    pub normalized_sha256: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Override {
    pub rule_id: String,
    pub justification: String,
    #[serde(default)]
    pub link: Option<String>,
}

/// Per-target audit record (spec §3.1) — the authoritative explanation for
/// why a target landed in its bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionBundle {
    pub target_id: String,
    pub decision: Bucket,
    pub decided_at_utc: chrono::DateTime<chrono::Utc>,
    pub decided_by: String,
    pub rules_fired: Vec<RuleFired>,
    pub primary_rule: Option<String>,
    pub evidence_snapshot: Option<EvidenceSnapshot>,
    pub denylist_matches: Vec<dc_denylist::DenylistHit>,
    pub content_checks: HashMap<String, ContentCheckAction>,
    #[serde(default)]
    pub signoff: Option<Signoff>,
    #[serde(default)]
    pub r#override: Option<Override>,
    pub bundle_schema_version: u32,
}

pub const BUNDLE_SCHEMA_VERSION: u32 = 1;

/// The flattened JSONL row written to one of the three queues (spec
/// §3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueRow {
    pub id: String,
    pub name: String,
    pub bucket: Bucket,
    pub license_profile: LicenseProfile,
    pub resolved_spdx: String,
    pub resolved_spdx_confidence: f64,
    pub restriction_hits: Vec<String>,
    pub license_evidence_url: Option<String>,
    pub manifest_dir: String,
    pub download: DownloadSpec,
    pub enabled: bool,
    pub content_checks: Vec<String>,
    pub content_check_actions: HashMap<String, ContentCheckAction>,
    pub routing: Routing,
    #[serde(default)]
    pub signoff_raw_sha256: Option<String>,
    #[serde(default)]
    pub signoff_normalized_sha256: Option<String>,
    #[serde(default)]
    pub signoff_is_stale: bool,
    pub output_pool: OutputPool,
    pub signals: HashMap<String, serde_json::Value>,
    pub bucket_reason: String,
}

// manifest.rs — Output path layout and run-level summary (spec §4.1
// "Outputs written (atomic)").

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use dc_core::paths::safe_filename;
use serde::{Deserialize, Serialize};

use crate::model::Bucket;

pub fn manifest_dir(manifests_root: &Path, target_id: &str) -> PathBuf {
    manifests_root.join(safe_filename(target_id))
}

pub fn evaluation_path(manifests_root: &Path, target_id: &str) -> PathBuf {
    manifest_dir(manifests_root, target_id).join("evaluation.json")
}

pub fn evidence_json_path(manifests_root: &Path, target_id: &str) -> PathBuf {
    manifest_dir(manifests_root, target_id).join("license_evidence.json")
}

pub fn evidence_text_path(manifests_root: &Path, target_id: &str) -> PathBuf {
    manifest_dir(manifests_root, target_id).join("license_evidence.txt")
}

pub fn evidence_bin_path(manifests_root: &Path, target_id: &str) -> PathBuf {
    manifest_dir(manifests_root, target_id).join("license_evidence.bin")
}

pub fn signoff_path(manifests_root: &Path, target_id: &str) -> PathBuf {
    manifest_dir(manifests_root, target_id).join("review_signoff.json")
}

pub fn queue_path(queues_root: &Path, bucket: Bucket) -> PathBuf {
    let name = match bucket {
        Bucket::Green => "green_download.jsonl",
        Bucket::Yellow => "yellow_pipeline.jsonl",
        Bucket::Red | Bucket::Unknown => "red_rejected.jsonl",
    };
    queues_root.join(name)
}

pub fn run_summary_path(queues_root: &Path) -> PathBuf {
    queues_root.join("run_summary.json")
}

pub fn dry_run_report_path(queues_root: &Path) -> PathBuf {
    queues_root.join("dry_run_report.txt")
}

pub fn policy_snapshot_path(ledger_root: &Path, run_id: &str) -> PathBuf {
    ledger_root.join(run_id).join("policy_snapshot.json")
}

pub fn metrics_path(ledger_root: &Path, run_id: &str) -> PathBuf {
    ledger_root.join(run_id).join("metrics.json")
}

pub fn evidence_changes_path(ledger_root: &Path, run_id: &str) -> PathBuf {
    ledger_root.join(run_id).join("evidence_changes.jsonl")
}

pub fn content_check_path(ledger_root: &Path, run_id: &str, target_id: &str, check: &str) -> PathBuf {
    ledger_root
        .join(run_id)
        .join(safe_filename(target_id))
        .join("checks")
        .join(format!("{}.json", safe_filename(check)))
}

/// Run-level rollup written once per classifier invocation (spec §4.1
/// "Outputs written").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub total_targets: u64,
    pub counts: HashMap<String, u64>,
    pub errors: u64,
}

impl RunSummary {
    pub fn record(&mut self, bucket: Bucket) {
        self.total_targets += 1;
        let key = match bucket {
            Bucket::Green => "GREEN",
            Bucket::Yellow => "YELLOW",
            Bucket::Red => "RED",
            Bucket::Unknown => "UNKNOWN",
        };
        *self.counts.entry(key.to_string()).or_insert(0) += 1;
    }
}

/// One ledger row appended to `evidence_changes.jsonl` when a target's
/// evidence changed since its last signoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceChangeRecord {
    pub target_id: String,
    pub recorded_at_utc: chrono::DateTime<chrono::Utc>,
    pub raw_mismatch: bool,
    pub normalized_mismatch: bool,
    pub cosmetic_change: bool,
}

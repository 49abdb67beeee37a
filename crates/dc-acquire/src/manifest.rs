// manifest.rs — output path layout for the acquire worker (spec §6.1):
// `raw/<bucket>/<pool>/<tid>/` payloads, `_manifests/<tid>/{acquire_done,
// download_manifest}.json` audit trail.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use dc_classifier::OutputPool;
use dc_core::paths::safe_filename;
use serde::{Deserialize, Serialize};

fn bucket_dir(bucket: &str) -> &'static str {
    match bucket {
        "GREEN" => "green",
        _ => "yellow",
    }
}

fn pool_dir(pool: OutputPool) -> &'static str {
    match pool {
        OutputPool::Permissive => "permissive",
        OutputPool::Copyleft => "copyleft",
        OutputPool::Quarantine => "quarantine",
    }
}

/// `<raw_root>/<bucket>/<pool>/<sanitized_tid>/` (spec §6.1).
pub fn output_dir(raw_root: &Path, bucket: &str, pool: OutputPool, target_id: &str) -> PathBuf {
    raw_root.join(bucket_dir(bucket)).join(pool_dir(pool)).join(safe_filename(target_id))
}

pub fn manifest_dir(manifests_root: &Path, target_id: &str) -> PathBuf {
    manifests_root.join(safe_filename(target_id))
}

pub fn download_manifest_path(manifests_root: &Path, target_id: &str) -> PathBuf {
    manifest_dir(manifests_root, target_id).join("download_manifest.json")
}

pub fn acquire_done_path(manifests_root: &Path, target_id: &str) -> PathBuf {
    manifest_dir(manifests_root, target_id).join("acquire_done.json")
}

pub fn acquire_summary_path(logs_root: &Path, bucket: &str) -> PathBuf {
    logs_root.join(format!("acquire_summary_{}.json", bucket_dir(bucket)))
}

/// Run-level rollup written once per acquire invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcquireSummary {
    pub run_id: String,
    pub bucket: String,
    pub total_targets: u64,
    pub counts: HashMap<String, u64>,
    pub bytes_total: u64,
}

impl AcquireSummary {
    pub fn record(&mut self, status: &str, bytes: u64) {
        self.total_targets += 1;
        self.bytes_total += bytes;
        *self.counts.entry(status.to_string()).or_insert(0) += 1;
    }
}

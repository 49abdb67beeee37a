// model.rs — acquire-worker data model (spec §4.2). A handler returns one
// `FileResult` per file it touched; the dispatcher rolls those up into a
// single `TargetAcquireResult` per the "any ok wins, all noop is noop,
// else first non-ok propagates" rule.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use dc_core::budget::RunByteBudget;
use dc_net::InternalMirrorAllowlist;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerStatus {
    Ok,
    Cached,
    Noop,
    Error,
}

impl HandlerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HandlerStatus::Ok => "ok",
            HandlerStatus::Cached => "cached",
            HandlerStatus::Noop => "noop",
            HandlerStatus::Error => "error",
        }
    }
}

/// One file produced (or not) by a strategy handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResult {
    pub status: HandlerStatus,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl FileResult {
    pub fn ok(path: impl Into<String>, bytes: u64, sha256: impl Into<String>, source_url: impl Into<String>) -> Self {
        FileResult {
            status: HandlerStatus::Ok,
            path: Some(path.into()),
            bytes: Some(bytes),
            sha256: Some(sha256.into()),
            source_url: Some(source_url.into()),
            reason: None,
        }
    }

    pub fn cached(path: impl Into<String>, bytes: u64) -> Self {
        FileResult {
            status: HandlerStatus::Cached,
            path: Some(path.into()),
            bytes: Some(bytes),
            sha256: None,
            source_url: None,
            reason: Some("already present, not overwritten".to_string()),
        }
    }

    pub fn noop(reason: impl Into<String>) -> Self {
        FileResult {
            status: HandlerStatus::Noop,
            path: None,
            bytes: None,
            sha256: None,
            source_url: None,
            reason: Some(reason.into()),
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        FileResult {
            status: HandlerStatus::Error,
            path: None,
            bytes: None,
            sha256: None,
            source_url: None,
            reason: Some(reason.into()),
        }
    }
}

/// Per-target rollup, one entry per queue row processed (spec §4.2.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetAcquireResult {
    pub target_id: String,
    pub status: HandlerStatus,
    pub strategy: String,
    pub output_dir: String,
    pub files: Vec<FileResult>,
    #[serde(default)]
    pub reason: Option<String>,
    pub started_at_utc: chrono::DateTime<chrono::Utc>,
    pub finished_at_utc: chrono::DateTime<chrono::Utc>,
    pub bytes_total: u64,
}

/// Rolls a handler's per-file results into one target-level status
/// (spec §4.2.1: "≥1 ok => ok, all noop => noop, else first non-ok wins").
pub fn rollup_status(files: &[FileResult]) -> (HandlerStatus, Option<String>) {
    if files.iter().any(|f| matches!(f.status, HandlerStatus::Ok | HandlerStatus::Cached)) {
        return (HandlerStatus::Ok, None);
    }
    if files.iter().all(|f| f.status == HandlerStatus::Noop) {
        let reason = files.first().and_then(|f| f.reason.clone());
        return (HandlerStatus::Noop, reason);
    }
    let first_bad = files.iter().find(|f| f.status == HandlerStatus::Error);
    match first_bad {
        Some(f) => (HandlerStatus::Error, f.reason.clone()),
        None => (HandlerStatus::Noop, None),
    }
}

/// Run-scoped configuration and shared state passed to every strategy
/// handler (spec §4.2.5: per-target limiter is owned exclusively by the
/// worker thread; only the byte budget is shared).
pub struct AcquireContext {
    pub raw_root: PathBuf,
    pub manifests_root: PathBuf,
    pub ledger_root: PathBuf,
    pub run_id: String,
    /// When `false`, strategy handlers are not invoked at all and no
    /// manifest/done-marker is written (spec §3.2 invariant 4).
    pub execute: bool,
    pub overwrite: bool,
    pub verify_sha256: bool,
    pub verify_zenodo_md5: bool,
    pub retry_max: u32,
    pub retry_backoff_base: std::time::Duration,
    pub allow_non_global_hosts: bool,
    pub internal_mirror_allowlist: InternalMirrorAllowlist,
    pub limit_files: Option<u64>,
    pub max_bytes_per_target: Option<u64>,
    pub run_budget: Arc<RunByteBudget>,
    pub client: Option<reqwest::blocking::Client>,
    pub obs: dc_core::obs::ObsCtx,
    pub extra_env: HashMap<String, String>,
}

/// Written to `<manifests_root>/<tid>/download_manifest.json` after a
/// successful acquisition (spec §6.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadManifest {
    pub target_id: String,
    pub strategy: String,
    pub output_dir: String,
    pub files: Vec<FileResult>,
    pub bytes_total: u64,
    pub completed_at_utc: chrono::DateTime<chrono::Utc>,
}

pub type SharedLock<T> = Arc<Mutex<T>>;

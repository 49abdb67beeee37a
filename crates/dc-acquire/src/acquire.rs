// acquire.rs — run_acquire(queue_path, bucket, context, ...): the
// worker's single operation (spec §4.2.1). Reads the queue, resolves
// each row's output directory and strategy handler, dispatches through
// the bounded worker pool, and writes the per-target and run-level
// audit trail.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dc_classifier::{Bucket, QueueRow};
use dc_core::budget::{RunByteBudget, TargetLimitEnforcer};
use dc_core::ledger::write_json_atomic;
use dc_net::InternalMirrorAllowlist;
use tracing::{info, warn};

use crate::error::AcquireError;
use crate::manifest::{acquire_done_path, acquire_summary_path, download_manifest_path, output_dir, AcquireSummary};
use crate::model::{rollup_status, AcquireContext, DownloadManifest, HandlerStatus, TargetAcquireResult};
use crate::registry::StrategyRegistry;
use crate::worker::run_pool;

pub struct AcquireConfig {
    pub queue_path: PathBuf,
    pub bucket: String,
    pub raw_root: PathBuf,
    pub manifests_root: PathBuf,
    pub ledger_root: PathBuf,
    pub logs_root: PathBuf,
    pub run_id: String,
    /// Actually dispatch strategy handlers and write manifests/done
    /// markers. When `false`, the worker reports what it would acquire
    /// without touching the network or the filesystem (spec §3.2
    /// invariant 4: the done marker is written iff `execute == true`).
    pub execute: bool,
    pub workers: usize,
    pub overwrite: bool,
    pub verify_sha256: bool,
    pub verify_zenodo_md5: bool,
    pub retry_max: u32,
    pub retry_backoff_base_ms: u64,
    pub run_byte_budget: u64,
    pub limit_targets: Option<usize>,
    pub limit_files: Option<u64>,
    pub max_bytes_per_target: Option<u64>,
    pub allow_non_global_hosts: bool,
    pub internal_mirror_allowlist: Vec<String>,
    pub no_fetch: bool,
}

fn build_context(config: &AcquireConfig) -> Result<AcquireContext, AcquireError> {
    let client = if config.no_fetch { None } else { Some(dc_net::build_client(Duration::from_secs(60))?) };
    Ok(AcquireContext {
        raw_root: config.raw_root.clone(),
        manifests_root: config.manifests_root.clone(),
        ledger_root: config.ledger_root.clone(),
        run_id: config.run_id.clone(),
        execute: config.execute,
        overwrite: config.overwrite,
        verify_sha256: config.verify_sha256,
        verify_zenodo_md5: config.verify_zenodo_md5,
        retry_max: config.retry_max,
        retry_backoff_base: Duration::from_millis(config.retry_backoff_base_ms),
        allow_non_global_hosts: config.allow_non_global_hosts,
        internal_mirror_allowlist: InternalMirrorAllowlist::parse(&config.internal_mirror_allowlist),
        limit_files: config.limit_files,
        max_bytes_per_target: config.max_bytes_per_target,
        run_budget: Arc::new(RunByteBudget::new(config.run_byte_budget)),
        client,
        obs: dc_core::obs::ObsCtx::noop("acquire"),
        extra_env: Default::default(),
    })
}

fn bucket_label(bucket: Bucket) -> &'static str {
    match bucket {
        Bucket::Green => "GREEN",
        Bucket::Yellow => "YELLOW",
        Bucket::Red => "RED",
        Bucket::Unknown => "UNKNOWN",
    }
}

fn process_one(row: &QueueRow, ctx: &AcquireContext, registry: &StrategyRegistry) -> TargetAcquireResult {
    let started_at_utc = Utc::now();
    let strategy_name = row.download.strategy_name();
    let out_dir = output_dir(&ctx.raw_root, bucket_label(row.bucket), row.output_pool, &row.id);

    let Some(strategy) = registry.get(strategy_name) else {
        return TargetAcquireResult {
            target_id: row.id.clone(),
            status: HandlerStatus::Noop,
            strategy: strategy_name.to_string(),
            output_dir: out_dir.to_string_lossy().to_string(),
            files: Vec::new(),
            reason: Some(format!("unsupported: {strategy_name}")),
            started_at_utc,
            finished_at_utc: Utc::now(),
            bytes_total: 0,
        };
    };

    let mut limiter = TargetLimitEnforcer::new(
        row.id.clone(),
        ctx.limit_files,
        ctx.max_bytes_per_target,
        None,
        Some((*ctx.run_budget).clone()),
    )
    .with_download_cap(row.download.max_bytes);

    let files = if !ctx.execute {
        vec![crate::model::FileResult::noop(format!("dry run: would acquire via {strategy_name}"))]
    } else {
        match strategy.acquire(row, &out_dir, &mut limiter, ctx) {
            Ok(files) => files,
            Err(e) => {
                warn!(target_id = %row.id, error = %e, "acquire strategy failed");
                vec![crate::model::FileResult::error(e.to_string())]
            }
        }
    };

    let (status, reason) = rollup_status(&files);
    let bytes_total = files.iter().filter_map(|f| f.bytes).sum();

    if ctx.execute && status == HandlerStatus::Ok {
        let manifest = DownloadManifest {
            target_id: row.id.clone(),
            strategy: strategy_name.to_string(),
            output_dir: out_dir.to_string_lossy().to_string(),
            files: files.clone(),
            bytes_total,
            completed_at_utc: Utc::now(),
        };
        if let Err(e) = write_json_atomic(&download_manifest_path(&ctx.manifests_root, &row.id), &manifest) {
            warn!(target_id = %row.id, error = %e, "failed to write download manifest");
        } else if let Err(e) = dc_core::ledger::write_completion_marker(&acquire_done_path(&ctx.manifests_root, &row.id), &manifest) {
            warn!(target_id = %row.id, error = %e, "failed to write acquire completion marker");
        }
        ctx.obs.metrics().files_downloaded("acquire", strategy_name);
        ctx.obs.metrics().bytes_downloaded("acquire", bytes_total);
    } else if ctx.execute && status == HandlerStatus::Error {
        ctx.obs.metrics().errors("acquire", strategy_name);
    }

    TargetAcquireResult {
        target_id: row.id.clone(),
        status,
        strategy: strategy_name.to_string(),
        output_dir: out_dir.to_string_lossy().to_string(),
        files,
        reason,
        started_at_utc,
        finished_at_utc: Utc::now(),
        bytes_total,
    }
}

/// The acquire worker's single operation (spec §4.2.1): dispatch every
/// queued target through its configured strategy, bounded by `workers`
/// concurrent threads and the shared run byte budget.
pub fn run_acquire(config: &AcquireConfig, registry: Arc<StrategyRegistry>) -> Result<AcquireSummary, AcquireError> {
    let mut rows: Vec<QueueRow> = dc_core::ledger::read_jsonl(&config.queue_path)?;
    if let Some(limit) = config.limit_targets {
        rows.truncate(limit);
    }
    let total = rows.len();

    let ctx = Arc::new(build_context(config)?);
    let results = run_pool(rows, config.workers, Arc::clone(&ctx), registry, process_one);

    let mut summary = AcquireSummary { run_id: config.run_id.clone(), bucket: config.bucket.clone(), ..Default::default() };
    for result in &results {
        summary.record(result.status.as_str(), result.bytes_total);
    }
    write_json_atomic(&acquire_summary_path(&config.logs_root, &config.bucket), &summary)?;

    info!(
        run_id = %config.run_id,
        bucket = %config.bucket,
        total,
        bytes = summary.bytes_total,
        "acquire run complete"
    );
    Ok(summary)
}

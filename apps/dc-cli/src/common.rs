// common.rs — CLI flag set shared across stages (spec §6.3) plus the
// builders that turn it into each stage's `*Config`. Kept here rather
// than duplicated per binary so `dc classify`/`dc-classify` agree on
// defaults.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use dc_acquire::AcquireConfig;
use dc_classifier::{Bucket, ClassifierConfig};
use dc_dedupe::DedupeConfig;
use dc_screen::{PitchConfig, ScreenConfig, ShardConfig};

/// Flags shared by every stage (spec §6.3 "CLI surface (key flags, shared
/// across stages)"). Each binary embeds this via `#[command(flatten)]`.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Target catalog path (classifier input).
    #[arg(long, global = true)]
    pub targets: Option<PathBuf>,

    /// Explicit queue file path. When omitted, derived from
    /// `--queues-root`/`--bucket`.
    #[arg(long, global = true)]
    pub queue: Option<PathBuf>,

    /// Which bucket's queue to act on (acquire/screen).
    #[arg(long, value_enum, default_value_t = BucketArg::Yellow, global = true)]
    pub bucket: BucketArg,

    /// Root directory the other `*-root` flags default under.
    #[arg(long, default_value = ".dc", global = true)]
    pub dataset_root: PathBuf,
    #[arg(long, global = true)]
    pub raw_root: Option<PathBuf>,
    #[arg(long, global = true)]
    pub manifests_root: Option<PathBuf>,
    #[arg(long, global = true)]
    pub ledger_root: Option<PathBuf>,
    #[arg(long, global = true)]
    pub queues_root: Option<PathBuf>,
    #[arg(long, global = true)]
    pub logs_root: Option<PathBuf>,
    /// Permit roots outside `--dataset-root` (repeatable).
    #[arg(long = "allow-data-root", global = true)]
    pub allow_data_roots: Vec<PathBuf>,

    /// Actually write output; otherwise the stage only reports what it
    /// would do (classifier: `dry_run_report.txt`).
    #[arg(long, global = true)]
    pub execute: bool,
    #[arg(long, global = true)]
    pub overwrite: bool,
    /// Accepted for symmetry with `--no-resume`; resuming from the last
    /// checkpoint is already the default.
    #[arg(long, global = true, conflicts_with = "no_resume")]
    pub resume: bool,
    #[arg(long, global = true)]
    pub no_resume: bool,
    #[arg(long, default_value_t = 1, global = true)]
    pub workers: usize,
    /// Turn any per-target error into process exit code 1.
    #[arg(long, global = true)]
    pub strict: bool,
    #[arg(long, global = true)]
    pub quiet: bool,

    #[arg(long, global = true)]
    pub verify_sha256: bool,
    #[arg(long, global = true)]
    pub verify_zenodo_md5: bool,

    #[arg(long, global = true)]
    pub limit_targets: Option<usize>,
    #[arg(long, global = true)]
    pub limit_files: Option<u64>,
    #[arg(long, global = true)]
    pub max_bytes_per_target: Option<u64>,
    /// Run-wide byte budget enforced by `RunByteBudget` (acquire).
    #[arg(long, default_value_t = u64::MAX, global = true)]
    pub run_byte_budget: u64,

    #[arg(long, env = "PIPELINE_RETRY_MAX", default_value_t = 5, global = true)]
    pub retry_max: u32,
    #[arg(long, env = "PIPELINE_RETRY_BACKOFF", default_value_t = 500, global = true)]
    pub retry_backoff: u64,

    #[arg(long, global = true)]
    pub allow_non_global_download_hosts: bool,
    #[arg(long = "internal-mirror-allowlist", global = true)]
    pub internal_mirror_allowlist: Vec<String>,

    #[arg(long, global = true)]
    pub no_fetch: bool,
    /// Extra evidence-request header, `KEY=VALUE` (repeatable).
    #[arg(long = "evidence-header", value_parser = parse_header, global = true)]
    pub evidence_headers: Vec<(String, String)>,
    #[arg(long, global = true)]
    pub allow_private_evidence_hosts: bool,
    #[arg(long, global = true)]
    pub min_license_confidence: Option<f64>,

    /// Denylist file(s) consulted during classification (repeatable).
    #[arg(long = "denylist", global = true)]
    pub denylist_paths: Vec<PathBuf>,
    /// License map path (classifier input).
    #[arg(long, global = true)]
    pub license_map: Option<PathBuf>,

    /// Identifies this invocation across its checkpoint/ledger entries.
    /// Generated if omitted.
    #[arg(long, global = true)]
    pub run_id: Option<String>,
    #[arg(long, default_value = "dc-pipeline", global = true)]
    pub pipeline_id: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketArg {
    Green,
    Yellow,
}

impl BucketArg {
    pub fn as_bucket(self) -> Bucket {
        match self {
            BucketArg::Green => Bucket::Green,
            BucketArg::Yellow => Bucket::Yellow,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BucketArg::Green => "green",
            BucketArg::Yellow => "yellow",
        }
    }
}

fn parse_header(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("expected KEY=VALUE, got '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Initialize `tracing-subscriber` the way `ta-daemon` does: env-filter
/// driven, writing to stderr so stdout stays free for structured output.
/// `OTEL_SERVICE_NAME` (if set) becomes the span field every log line
/// carries; actual OTLP export is out of scope (spec §1 non-goals).
pub fn init_logging(quiet: bool) {
    let default_directive = if quiet { "warn" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    let service_name = std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "dc-cli".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
    tracing::debug!(service_name = %service_name, otel_endpoint = ?std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(), "logging initialized");
    if std::env::var("DC_METRICS_SERVER").as_deref() == Ok("1") {
        tracing::warn!("DC_METRICS_SERVER=1 requested but no metrics exporter is wired into this build");
    }
}

impl CommonArgs {
    pub fn resume(&self) -> bool {
        !self.no_resume
    }

    pub fn run_id(&self) -> String {
        self.run_id.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }

    fn root_or_default(&self, override_path: &Option<PathBuf>, subdir: &str) -> PathBuf {
        override_path.clone().unwrap_or_else(|| self.dataset_root.join(subdir))
    }

    pub fn raw_root(&self) -> PathBuf {
        self.root_or_default(&self.raw_root, "raw")
    }

    pub fn manifests_root(&self) -> PathBuf {
        self.root_or_default(&self.manifests_root, "_manifests")
    }

    pub fn ledger_root(&self) -> PathBuf {
        self.root_or_default(&self.ledger_root, "_ledger")
    }

    pub fn queues_root(&self) -> PathBuf {
        self.root_or_default(&self.queues_root, "queues")
    }

    pub fn logs_root(&self) -> PathBuf {
        self.root_or_default(&self.logs_root, "_logs")
    }

    pub fn checkpoint_root(&self) -> PathBuf {
        self.root_or_default(&None, "_checkpoints")
    }

    /// Every root must resolve under `--dataset-root` unless explicitly
    /// permitted via a (possibly not-yet-existing) `--allow-data-root`.
    /// Mirrors `dc_core::paths::safe_join`'s lexical-prefix containment
    /// check, applied to CLI-supplied roots instead of archive members.
    pub fn validate_roots(&self) -> Result<()> {
        let dataset_root = lexical_normalize(&self.dataset_root);
        let allowed: Vec<PathBuf> = self.allow_data_roots.iter().map(|p| lexical_normalize(p)).collect();
        let roots = [
            ("--raw-root", self.raw_root()),
            ("--manifests-root", self.manifests_root()),
            ("--ledger-root", self.ledger_root()),
            ("--queues-root", self.queues_root()),
            ("--logs-root", self.logs_root()),
        ];
        for (flag, root) in roots {
            let normalized = lexical_normalize(&root);
            let within_dataset_root = normalized.starts_with(&dataset_root);
            let within_allowed = allowed.iter().any(|a| normalized.starts_with(a));
            if !within_dataset_root && !within_allowed {
                bail!(
                    "{flag} '{}' is outside --dataset-root '{}' and not covered by --allow-data-root",
                    root.display(),
                    self.dataset_root.display()
                );
            }
        }
        Ok(())
    }

    pub fn queue_path(&self) -> PathBuf {
        self.queue.clone().unwrap_or_else(|| dc_classifier::manifest::queue_path(&self.queues_root(), self.bucket.as_bucket()))
    }

    pub fn dedupe_config(&self) -> DedupeConfig {
        DedupeConfig::default()
    }

    /// Build the classifier's config from common flags plus its required
    /// inputs. `--allow-private-evidence-hosts` maps onto
    /// `allow_non_global_hosts`: that field is evidence-fetch-specific
    /// within `ClassifierConfig`'s scope, distinct from the download-side
    /// `--allow-non-global-download-hosts` consumed by `acquire_config`.
    pub fn classifier_config(&self, targets: &Path, license_map: &Path) -> ClassifierConfig {
        ClassifierConfig {
            targets_path: targets.to_path_buf(),
            denylist_paths: self.denylist_paths.clone(),
            license_map_path: license_map.to_path_buf(),
            manifests_root: self.manifests_root(),
            queues_root: self.queues_root(),
            ledger_root: self.ledger_root(),
            checkpoint_root: self.checkpoint_root(),
            run_id: self.run_id(),
            pipeline_id: self.pipeline_id.clone(),
            no_fetch: self.no_fetch,
            allow_non_global_hosts: self.allow_private_evidence_hosts,
            internal_mirror_allowlist: self.internal_mirror_allowlist.clone(),
            dry_run: !self.execute,
            evidence_headers: self.evidence_headers.clone(),
            min_license_confidence_override: self.min_license_confidence,
        }
    }

    pub fn acquire_config(&self) -> AcquireConfig {
        AcquireConfig {
            queue_path: self.queue_path(),
            bucket: self.bucket.as_str().to_string(),
            raw_root: self.raw_root(),
            manifests_root: self.manifests_root(),
            ledger_root: self.ledger_root(),
            logs_root: self.logs_root(),
            run_id: self.run_id(),
            execute: self.execute,
            workers: self.workers.max(1),
            overwrite: self.overwrite,
            verify_sha256: self.verify_sha256,
            verify_zenodo_md5: self.verify_zenodo_md5,
            retry_max: self.retry_max,
            retry_backoff_base_ms: self.retry_backoff,
            run_byte_budget: self.run_byte_budget,
            limit_targets: self.limit_targets,
            limit_files: self.limit_files,
            max_bytes_per_target: self.max_bytes_per_target,
            allow_non_global_hosts: self.allow_non_global_download_hosts,
            internal_mirror_allowlist: self.internal_mirror_allowlist.clone(),
            no_fetch: self.no_fetch,
        }
    }

    pub fn screen_config(&self) -> ScreenConfig {
        ScreenConfig {
            raw_root: self.raw_root(),
            dataset_root: self.dataset_root.clone(),
            manifests_root: self.manifests_root(),
            ledger_root: self.ledger_root(),
            queues_root: self.queues_root(),
            checkpoint_root: self.checkpoint_root(),
            run_id: self.run_id(),
            pipeline_id: self.pipeline_id.clone(),
            require_yellow_signoff: true,
            allow_without_signoff: false,
            pitch: PitchConfig::default(),
            shard: ShardConfig::default(),
            dedupe: self.dedupe_config(),
        }
    }

    /// `--no-resume`: drop any prior checkpoint so the stage starts over,
    /// instead of skipping targets it already completed.
    pub fn reset_checkpoint_if_requested(&self) -> Result<()> {
        if self.resume() {
            return Ok(());
        }
        let path = dc_core::checkpoint::checkpoint_path(&self.checkpoint_root(), &self.pipeline_id);
        dc_core::checkpoint::cleanup_checkpoint(&path).context("failed to reset checkpoint for --no-resume")
    }

    pub fn require_targets(&self) -> Result<PathBuf> {
        self.targets.clone().ok_or_else(|| anyhow::anyhow!("--targets <path> is required"))
    }

    pub fn require_license_map(&self) -> Result<PathBuf> {
        self.license_map.clone().ok_or_else(|| anyhow::anyhow!("--license-map <path> is required"))
    }
}

fn lexical_normalize(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Spec §5 "Cancellation & timeouts" (b): `--strict` turns any per-target
/// error into process exit code 1 once the run has otherwise completed.
pub fn exit_code(strict: bool, had_errors: bool) -> i32 {
    if strict && had_errors {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_header_splits_on_first_equals() {
        assert_eq!(parse_header("X-Api-Key=abc=def").unwrap(), ("X-Api-Key".to_string(), "abc=def".to_string()));
    }

    #[test]
    fn parse_header_rejects_missing_equals() {
        assert!(parse_header("no-equals-sign").is_err());
    }

    #[test]
    fn parse_header_rejects_empty_key() {
        assert!(parse_header("=value").is_err());
    }

    #[test]
    fn bucket_arg_maps_to_classifier_bucket() {
        assert_eq!(BucketArg::Green.as_bucket(), Bucket::Green);
        assert_eq!(BucketArg::Yellow.as_bucket(), Bucket::Yellow);
    }
}

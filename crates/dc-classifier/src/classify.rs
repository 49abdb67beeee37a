// classify.rs — classify(config): the classifier's single entry point
// (spec §4.1). Reads targets, fetches evidence, resolves SPDX, runs the
// denylist, applies the bucket tie-break and content-check downgrades,
// and writes the three queues plus every per-target audit artifact.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dc_core::checkpoint::{init_checkpoint, load_checkpoint, save_checkpoint, CheckpointState};
use dc_core::ledger::{append_jsonl, read_json_opt, write_json_atomic};
use dc_core::obs::ObsCtx;
use dc_denylist::{build_haystack, denylist_hits, Denylist};
use dc_net::InternalMirrorAllowlist;
use tracing::{info, warn};

use crate::decision::{apply_content_checks, decide_bucket, evaluate_evidence_change, BucketInputs};
use crate::error::ClassifierError;
use crate::evidence::{fetch_evidence, FetchConfig};
use crate::manifest::{
    evaluation_path, evidence_bin_path, evidence_changes_path, evidence_json_path, evidence_text_path, manifest_dir,
    queue_path, run_summary_path, signoff_path, EvidenceChangeRecord, RunSummary,
};
use crate::model::{Bucket, DecisionBundle, EvidenceSnapshot, LicenseMap, OutputPool, QueueRow, Signoff, Target, BUNDLE_SCHEMA_VERSION};
use crate::spdx;

pub struct ClassifierConfig {
    pub targets_path: PathBuf,
    pub denylist_paths: Vec<PathBuf>,
    pub license_map_path: PathBuf,
    pub manifests_root: PathBuf,
    pub queues_root: PathBuf,
    pub ledger_root: PathBuf,
    pub checkpoint_root: PathBuf,
    pub run_id: String,
    pub pipeline_id: String,
    pub no_fetch: bool,
    pub allow_non_global_hosts: bool,
    pub internal_mirror_allowlist: Vec<String>,
    pub dry_run: bool,
    /// Extra headers sent with every evidence request (`--evidence-header`).
    pub evidence_headers: Vec<(String, String)>,
    /// Overrides the license map's `min_license_confidence` when set
    /// (`--min-license-confidence`).
    pub min_license_confidence_override: Option<f64>,
}

pub fn load_targets(path: &Path) -> Result<Vec<Target>, ClassifierError> {
    let content = fs::read_to_string(path).map_err(|e| ClassifierError::io(path, e))?;
    serde_yaml::from_str(&content).map_err(|source| ClassifierError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_license_map(path: &Path) -> Result<LicenseMap, ClassifierError> {
    let content = fs::read_to_string(path).map_err(|e| ClassifierError::io(path, e))?;
    serde_yaml::from_str(&content).map_err(|source| ClassifierError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

fn output_pool_for(target: &Target, license_map: &LicenseMap, forced_quarantine: bool) -> OutputPool {
    if forced_quarantine {
        return OutputPool::Quarantine;
    }
    let key = format!("{:?}", target.license_profile).to_lowercase();
    license_map
        .profile_pool_overrides
        .get(&key)
        .copied()
        .unwrap_or_else(|| target.license_profile.default_pool())
}

/// Evaluate one target: fetch evidence (or read an offline snapshot),
/// resolve SPDX, run the denylist, apply the bucket tie-break, and
/// persist every artifact. Returns the finished `QueueRow`.
fn evaluate_target(
    target: &Target,
    license_map: &LicenseMap,
    denylist: &Denylist,
    client: Option<&reqwest::blocking::Client>,
    fetch_config: &FetchConfig,
    config: &ClassifierConfig,
    obs: &ObsCtx,
) -> Result<QueueRow, ClassifierError> {
    let dir = manifest_dir(&config.manifests_root, &target.id);
    fs::create_dir_all(&dir).map_err(|e| ClassifierError::io(&dir, e))?;

    let evidence_url = target.license_evidence.url.clone();
    let mut no_fetch_missing_evidence = false;

    let snapshot: Option<EvidenceSnapshot> = match (&evidence_url, config.no_fetch) {
        (None, _) => None,
        (Some(_), true) => {
            let prior: Option<EvidenceSnapshot> = read_json_opt(&evidence_json_path(&config.manifests_root, &target.id))?;
            if prior.is_none() {
                no_fetch_missing_evidence = true;
            }
            prior
        }
        (Some(url), false) => {
            let client = client.expect("HTTP client must be present when fetching is enabled");
            Some(fetch_evidence(client, url, fetch_config))
        }
    };

    if let Some(snap) = &snapshot {
        write_json_atomic(&evidence_json_path(&config.manifests_root, &target.id), snap)?;
        if let Some(text) = &snap.text_extracted {
            fs::write(evidence_text_path(&config.manifests_root, &target.id), text).map_err(|e| {
                ClassifierError::io(evidence_text_path(&config.manifests_root, &target.id), e)
            })?;
        }
        if let Some(bytes) = &snap.bytes {
            fs::write(evidence_bin_path(&config.manifests_root, &target.id), bytes).map_err(|e| {
                ClassifierError::io(evidence_bin_path(&config.manifests_root, &target.id), e)
            })?;
        }
    }

    let evidence_text = snapshot
        .as_ref()
        .and_then(|s| s.text_extracted.clone())
        .unwrap_or_default();
    let evidence_errored = snapshot.as_ref().map(|s| s.error.is_some()).unwrap_or(false) || no_fetch_missing_evidence;

    let resolution = spdx::resolve(target.license_evidence.spdx_hint.as_deref(), &evidence_text, &license_map.normalization_rules);

    let download_urls = target.download.urls();
    let haystack = build_haystack(
        &target.id,
        &target.name,
        evidence_url.as_deref().unwrap_or(""),
        &download_urls,
        target.publisher.as_deref().unwrap_or(""),
    );
    let dl_hits = denylist_hits(denylist, &haystack);

    let signoff: Option<Signoff> = read_json_opt(&signoff_path(&config.manifests_root, &target.id))?;
    let signoff_approved = signoff.as_ref().map(|s| s.status == "approved").unwrap_or(false);

    let evidence_change = snapshot.as_ref().and_then(|snap| {
        signoff.as_ref().map(|so| {
            evaluate_evidence_change(
                so.raw_sha256.as_deref(),
                so.normalized_sha256.as_deref(),
                snap,
                license_map.evidence_change_policy,
                license_map.cosmetic_change_policy,
            )
        })
    });

    let mut review_required = target.review_required;
    if let Some(change) = &evidence_change {
        if change.changed_requires_review {
            review_required = true;
        }
    }

    let bucket_result = decide_bucket(&BucketInputs {
        dl_hits: &dl_hits,
        resolved_spdx: &resolution.spdx,
        resolved_confidence: resolution.confidence,
        evidence_text: &evidence_text,
        evidence_errored,
        license_map,
        license_gates: &target.license_gates,
        review_required,
        signoff_approved,
    });

    let mut bucket = bucket_result.bucket;
    if let Some(change) = &evidence_change {
        if change.changed_requires_review && bucket == Bucket::Green {
            bucket = Bucket::Yellow;
        }
    }

    let (bucket, forced_quarantine) = apply_content_checks(bucket, &target.content_check_actions);

    if license_map.require_yellow_signoff && bucket == Bucket::Yellow && !signoff_approved {
        review_required = true;
    }

    if let Some(change) = &evidence_change {
        if change.changed_requires_review {
            append_jsonl(
                &evidence_changes_path(&config.ledger_root, &config.run_id),
                &EvidenceChangeRecord {
                    target_id: target.id.clone(),
                    recorded_at_utc: chrono::Utc::now(),
                    raw_mismatch: change.raw_mismatch,
                    normalized_mismatch: change.normalized_mismatch,
                    cosmetic_change: change.cosmetic_change,
                },
            )?;
        }
    }

    let bundle = DecisionBundle {
        target_id: target.id.clone(),
        decision: bucket,
        decided_at_utc: chrono::Utc::now(),
        decided_by: "dc-classifier".to_string(),
        rules_fired: bucket_result.rules_fired,
        primary_rule: bucket_result.primary_rule,
        evidence_snapshot: snapshot,
        denylist_matches: dl_hits,
        content_checks: target.content_check_actions.clone(),
        signoff,
        r#override: None,
        bundle_schema_version: BUNDLE_SCHEMA_VERSION,
    };
    write_json_atomic(&evaluation_path(&config.manifests_root, &target.id), &bundle)?;

    obs.metrics().targets_processed("classifier", bucket_label(bucket));

    let output_pool = output_pool_for(target, license_map, forced_quarantine);
    Ok(QueueRow {
        id: target.id.clone(),
        name: target.name.clone(),
        bucket,
        license_profile: target.license_profile,
        resolved_spdx: resolution.spdx,
        resolved_spdx_confidence: resolution.confidence,
        restriction_hits: bucket_result.restriction_hits,
        license_evidence_url: evidence_url,
        manifest_dir: dir.to_string_lossy().to_string(),
        download: target.download.clone(),
        enabled: target.enabled,
        content_checks: target.content_checks.clone(),
        content_check_actions: target.content_check_actions.clone(),
        routing: target.routing.clone(),
        signoff_raw_sha256: bundle.signoff.as_ref().and_then(|s| s.raw_sha256.clone()),
        signoff_normalized_sha256: bundle.signoff.as_ref().and_then(|s| s.normalized_sha256.clone()),
        signoff_is_stale: evidence_change.map(|c| c.changed_requires_review).unwrap_or(false),
        output_pool,
        signals: Default::default(),
        bucket_reason: bundle.primary_rule.clone().unwrap_or_default(),
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

/// The classifier's single operation (spec §4.1): read targets, evaluate
/// each, and write the three queues plus the run summary.
pub fn classify(config: &ClassifierConfig) -> Result<RunSummary, ClassifierError> {
    let obs = ObsCtx::noop("classifier");
    let targets = load_targets(&config.targets_path)?;
    let mut license_map = load_license_map(&config.license_map_path)?;
    if let Some(min_confidence) = config.min_license_confidence_override {
        license_map.min_license_confidence = min_confidence;
    }
    let denylist = dc_denylist::load_denylists(&config.denylist_paths)?;

    let client = if config.no_fetch {
        None
    } else {
        Some(dc_net::build_client(Duration::from_secs(60))?)
    };
    let fetch_config = FetchConfig {
        allowlist: InternalMirrorAllowlist::parse(&config.internal_mirror_allowlist),
        allow_non_global_hosts: config.allow_non_global_hosts,
        extra_headers: config.evidence_headers.clone(),
        ..FetchConfig::default()
    };

    let checkpoint_path = dc_core::checkpoint::checkpoint_path(&config.checkpoint_root, &config.pipeline_id);
    let mut checkpoint = load_checkpoint(&checkpoint_path)?
        .unwrap_or_else(|| CheckpointState::new(config.run_id.clone(), config.pipeline_id.clone()));
    if checkpoint.completed_targets.is_empty() {
        checkpoint = init_checkpoint(&checkpoint_path, &config.pipeline_id, &config.run_id)?;
    }

    let mut summary = RunSummary {
        run_id: config.run_id.clone(),
        ..Default::default()
    };

    for target in &targets {
        if !target.enabled {
            continue;
        }
        if checkpoint.is_completed(&target.id) {
            continue;
        }
        let row = match evaluate_target(target, &license_map, &denylist, client.as_ref(), &fetch_config, config, &obs) {
            Ok(row) => row,
            Err(e) => {
                warn!(target_id = %target.id, error = %e, "classification failed for target");
                obs.metrics().errors("classifier", "evaluate_target");
                summary.errors += 1;
                continue;
            }
        };

        if !config.dry_run {
            append_jsonl(&queue_path(&config.queues_root, row.bucket), &row)?;
        }
        summary.record(row.bucket);
        checkpoint.record_target(&target.id, Some(bucket_label(row.bucket)));
        save_checkpoint(&checkpoint_path, &checkpoint)?;
    }

    if !config.dry_run {
        write_json_atomic(&run_summary_path(&config.queues_root), &summary)?;
    }
    info!(run_id = %config.run_id, total = summary.total_targets, "classifier run complete");
    Ok(summary)
}

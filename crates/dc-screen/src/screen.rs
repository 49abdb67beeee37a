// screen.rs — screen(config): the yellow-screen stage's single entry
// point (spec §4.3). For every target in the yellow queue: enforce
// signoff, walk its raw records, run them through the configured domain
// module, pitch rejects to the ledger/sample, and shard accepted
// records into the output pool's shard sequence.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use dc_classifier::manifest::{queue_path, signoff_path};
use dc_classifier::model::{Bucket, QueueRow, Signoff};
use dc_core::checkpoint::{init_checkpoint, load_checkpoint, save_checkpoint, CheckpointState};
use dc_core::ledger::{read_json_opt, read_jsonl, write_json_atomic};
use dc_core::obs::ObsCtx;
use dc_core::paths::safe_filename;
use dc_dedupe::{load_combined_dedupe, save_combined_dedupe, DedupeConfig, JaccardIndex};
use tracing::{info, warn};

use crate::domains::DomainRegistry;
use crate::error::ScreenError;
use crate::manifest::{
    combined_dedupe_path, ledger_dir, pitches_dir, shard_dir, yellow_screen_done_path, yellow_screen_summary_path,
    ScreenSummary, YellowScreenDone,
};
use crate::model::{pool_label, ScreenContext};
use crate::pitch::{record_passed, PassedLedgerRow, PitchConfig, PitchTracker};
use crate::sharder::{ShardConfig, Sharder};

pub struct ScreenConfig {
    pub raw_root: PathBuf,
    pub dataset_root: PathBuf,
    pub manifests_root: PathBuf,
    pub ledger_root: PathBuf,
    pub queues_root: PathBuf,
    pub checkpoint_root: PathBuf,
    pub run_id: String,
    pub pipeline_id: String,
    pub require_yellow_signoff: bool,
    pub allow_without_signoff: bool,
    pub pitch: PitchConfig,
    pub shard: ShardConfig,
    pub dedupe: DedupeConfig,
}

/// Discover every JSONL/JSONL.gz file under a target's raw directory,
/// including one level into `split_*` subdirectories (the layout a saved
/// Hugging Face dataset dump or a sharded export tends to use), sorted
/// for deterministic row-id assignment.
fn discover_input_files(target_dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = fs::read_dir(target_dir) else { return files };
    let mut top_level: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    top_level.sort();
    for path in top_level {
        if path.is_dir() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.starts_with("split_") {
                if let Ok(sub_entries) = fs::read_dir(&path) {
                    let mut sub: Vec<PathBuf> = sub_entries.flatten().map(|e| e.path()).collect();
                    sub.sort();
                    files.extend(sub.into_iter().filter(|p| is_jsonl_path(p)));
                }
            }
        } else if is_jsonl_path(&path) {
            files.push(path);
        }
    }
    files
}

fn is_jsonl_path(path: &Path) -> bool {
    let name = path.to_string_lossy();
    name.ends_with(".jsonl") || name.ends_with(".jsonl.gz")
}

struct TargetOutcome {
    accepted: u64,
    pitched: u64,
    pitch_reasons: HashMap<String, u64>,
}

#[allow(clippy::too_many_arguments)]
fn screen_target(
    row: &QueueRow,
    registry: &DomainRegistry,
    config: &ScreenConfig,
    sharders: &mut HashMap<String, Sharder>,
    dedupe_index: &mut JaccardIndex,
    obs: &ObsCtx,
) -> Result<Option<TargetOutcome>, ScreenError> {
    let signoff: Option<Signoff> = read_json_opt(&signoff_path(&config.manifests_root, &row.id))?;
    let signoff_approved = signoff.as_ref().map(|s| s.status == "approved").unwrap_or(false);
    if config.require_yellow_signoff && !signoff_approved && !config.allow_without_signoff {
        info!(target_id = %row.id, "yellow screen skipped: signoff not approved");
        write_json_atomic(
            &yellow_screen_done_path(&config.manifests_root, &row.id),
            &YellowScreenDone {
                target_id: row.id.clone(),
                run_id: config.run_id.clone(),
                completed_at_utc: chrono::Utc::now(),
                records_accepted: 0,
                records_pitched: 0,
                shards_written: 0,
            },
        )?;
        return Ok(None);
    }

    let pool = pool_label(row.output_pool);
    let domain_name = row.routing.domain.as_deref().unwrap_or("standard");
    let domain = registry.get(domain_name)?;

    let ctx = ScreenContext {
        target_id: row.id.clone(),
        target_name: row.name.clone(),
        dataset_id: row.id.clone(),
        split: "train".to_string(),
        config: "default".to_string(),
        pipeline: config.pipeline_id.clone(),
        pool: row.output_pool,
        license_profile: format!("{:?}", row.license_profile).to_lowercase(),
        resolved_spdx: row.resolved_spdx.clone(),
        license_evidence_url: row.license_evidence_url.clone(),
        routing: row.routing.clone(),
        source_url: row.download.urls().into_iter().next().unwrap_or_default(),
        origin: domain_name.to_string(),
    };
    domain.domain_preflight(&ctx)?;

    let target_dir = config.raw_root.join("yellow").join(pool).join(safe_filename(&row.id));
    let files = discover_input_files(&target_dir);

    let ledger_dir = ledger_dir(&config.ledger_root, &config.run_id);
    let pitches_dir = pitches_dir(&config.ledger_root, &config.run_id);
    let mut pitch_tracker = PitchTracker::new(&ledger_dir, &pitches_dir, config.pitch.clone());

    let mut accepted = 0u64;
    let mut pitched = 0u64;
    let mut pitch_reasons: HashMap<String, u64> = HashMap::new();
    let mut seen_keys: HashSet<String> = HashSet::new();
    let mut row_index = 0usize;

    for file in files {
        let raw_records: Vec<serde_json::Value> = match read_jsonl(&file) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(target_id = %row.id, file = %file.display(), error = %e, "skipping unreadable input file");
                obs.metrics().errors("yellow_screen", "read_input_file");
                continue;
            }
        };

        for raw in raw_records {
            let decision = domain.filter_record(&raw, &ctx);
            if !decision.allow {
                let reason = decision.reason.clone().unwrap_or_else(|| "rejected".to_string());
                pitch_tracker.record(&row.id, row_index, &reason, decision.text.as_deref(), decision.sample_extra.clone())?;
                pitched += 1;
                *pitch_reasons.entry(reason).or_insert(0) += 1;
                row_index += 1;
                continue;
            }

            if let Some(key) = domain.dedupe_key(&raw, &decision) {
                if !seen_keys.insert(key) {
                    pitch_tracker.record(&row.id, row_index, "duplicate_within_target", decision.text.as_deref(), None)?;
                    pitched += 1;
                    *pitch_reasons.entry("duplicate_within_target".to_string()).or_insert(0) += 1;
                    row_index += 1;
                    continue;
                }
            }

            let record = domain.transform_record(&raw, &decision, &ctx, row_index)?;
            crate::model::validate_output_record(&record, &row.id, row_index)?;

            let (near_dup_score, near_dup_match, _) = dedupe_index.query(&record.text);
            if near_dup_score >= config.dedupe.threshold {
                let reason = "near_duplicate";
                pitch_tracker.record(
                    &row.id,
                    row_index,
                    reason,
                    Some(record.text.as_str()),
                    near_dup_match.map(|id| serde_json::json!({ "matched_doc_id": id, "score": near_dup_score })),
                )?;
                pitched += 1;
                *pitch_reasons.entry(reason.to_string()).or_insert(0) += 1;
                row_index += 1;
                continue;
            }
            dedupe_index.add(format!("{}:{}", row.id, record.row_id), &record.text);

            let sharder = sharders.entry(pool.to_string()).or_insert_with(|| {
                Sharder::new(shard_dir(&config.dataset_root, pool), config.shard.clone())
            });
            sharder.append(&record)?;

            record_passed(
                &ledger_dir,
                &PassedLedgerRow {
                    target_id: row.id.clone(),
                    row_index,
                    dataset_id: record.dataset_id.clone(),
                    row_id: record.row_id.clone(),
                    shard_path: pool.to_string(),
                    recorded_at_utc: chrono::Utc::now(),
                },
            )?;

            accepted += 1;
            row_index += 1;
        }
    }

    write_json_atomic(
        &yellow_screen_done_path(&config.manifests_root, &row.id),
        &YellowScreenDone {
            target_id: row.id.clone(),
            run_id: config.run_id.clone(),
            completed_at_utc: chrono::Utc::now(),
            records_accepted: accepted,
            records_pitched: pitched,
            shards_written: sharders.get(pool).map(|s| s.shards_written).unwrap_or(0),
        },
    )?;
    obs.metrics().targets_processed("yellow_screen", "screened");

    Ok(Some(TargetOutcome { accepted, pitched, pitch_reasons }))
}

/// The yellow-screen stage's single operation (spec §4.3): screen every
/// target in the yellow queue and write the run-level summary.
pub fn screen(config: &ScreenConfig) -> Result<ScreenSummary, ScreenError> {
    let obs = ObsCtx::noop("yellow_screen");
    let registry = DomainRegistry::with_defaults();
    let rows: Vec<QueueRow> = read_jsonl(&queue_path(&config.queues_root, Bucket::Yellow))?;

    let checkpoint_path = dc_core::checkpoint::checkpoint_path(&config.checkpoint_root, &config.pipeline_id);
    let mut checkpoint = load_checkpoint(&checkpoint_path)?
        .unwrap_or_else(|| CheckpointState::new(config.run_id.clone(), config.pipeline_id.clone()));
    if checkpoint.completed_targets.is_empty() {
        checkpoint = init_checkpoint(&checkpoint_path, &config.pipeline_id, &config.run_id)?;
    }

    let mut summary = ScreenSummary { run_id: config.run_id.clone(), ..Default::default() };
    let mut sharders: HashMap<String, Sharder> = HashMap::new();

    let combined_path = combined_dedupe_path(&config.ledger_root, &config.run_id);
    let mut dedupe_index = load_combined_dedupe(&combined_path, &config.dedupe)?.unwrap_or_else(|| JaccardIndex::new(&config.dedupe));

    for row in &rows {
        if !row.enabled || checkpoint.is_completed(&row.id) {
            continue;
        }
        match screen_target(row, &registry, config, &mut sharders, &mut dedupe_index, &obs) {
            Ok(Some(outcome)) => {
                summary.record_target(outcome.accepted, outcome.pitched);
                summary.merge_pitch_reasons(&outcome.pitch_reasons);
            }
            Ok(None) => summary.record_skip(),
            Err(e) => return Err(e),
        }
        checkpoint.record_target(&row.id, Some("SCREENED"));
        save_checkpoint(&checkpoint_path, &checkpoint)?;
        save_combined_dedupe(&combined_path, &dedupe_index, &config.dedupe)?;
    }

    for sharder in sharders.values_mut() {
        sharder.finish()?;
    }

    write_json_atomic(&yellow_screen_summary_path(&config.queues_root), &summary)?;
    info!(run_id = %config.run_id, total = summary.total_targets, "yellow screen run complete");
    Ok(summary)
}

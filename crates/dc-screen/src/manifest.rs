// manifest.rs — output path layout and run-level summary for the
// yellow-screen stage (spec §4.3 "Outputs written").

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use dc_core::paths::safe_filename;
use serde::{Deserialize, Serialize};

pub fn target_manifest_dir(manifests_root: &Path, target_id: &str) -> PathBuf {
    manifests_root.join(safe_filename(target_id))
}

pub fn yellow_screen_done_path(manifests_root: &Path, target_id: &str) -> PathBuf {
    target_manifest_dir(manifests_root, target_id).join("yellow_screen_done.json")
}

pub fn yellow_screen_summary_path(queues_root: &Path) -> PathBuf {
    queues_root.join("yellow_screen_summary.json")
}

pub fn ledger_dir(ledger_root: &Path, run_id: &str) -> PathBuf {
    ledger_root.join(run_id).join("_ledger")
}

pub fn pitches_dir(ledger_root: &Path, run_id: &str) -> PathBuf {
    ledger_root.join(run_id).join("_pitches")
}

pub fn shard_dir(dataset_root: &Path, pool: &str) -> PathBuf {
    dataset_root.join("screened_yellow").join(pool).join("shards")
}

/// Run-combined near-duplicate index (spec §4.4, §6.1): kept under the
/// run's ledger directory, not per-target, since it dedupes across every
/// target screened in the run.
pub fn combined_dedupe_path(ledger_root: &Path, run_id: &str) -> PathBuf {
    ledger_dir(ledger_root, run_id).join("combined_dedupe.sqlite")
}

/// Per-target completion record (spec §4.3 step 3): written once a
/// target's records have all been filtered/transformed/sharded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YellowScreenDone {
    pub target_id: String,
    pub run_id: String,
    pub completed_at_utc: chrono::DateTime<chrono::Utc>,
    pub records_accepted: u64,
    pub records_pitched: u64,
    pub shards_written: u32,
}

/// Run-level rollup across every target screened in one invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenSummary {
    pub run_id: String,
    pub total_targets: u64,
    pub records_accepted: u64,
    pub records_pitched: u64,
    pub records_skipped: u64,
    pub pitch_reasons: HashMap<String, u64>,
    pub errors: u64,
}

impl ScreenSummary {
    pub fn record_target(&mut self, accepted: u64, pitched: u64) {
        self.total_targets += 1;
        self.records_accepted += accepted;
        self.records_pitched += pitched;
    }

    pub fn record_skip(&mut self) {
        self.total_targets += 1;
        self.records_skipped += 1;
    }

    pub fn record_pitch_reason(&mut self, reason: &str) {
        *self.pitch_reasons.entry(reason.to_string()).or_insert(0) += 1;
    }

    pub fn merge_pitch_reasons(&mut self, reasons: &HashMap<String, u64>) {
        for (reason, count) in reasons {
            *self.pitch_reasons.entry(reason.clone()).or_insert(0) += count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_accumulates_across_targets() {
        let mut summary = ScreenSummary { run_id: "run-1".to_string(), ..Default::default() };
        summary.record_target(10, 2);
        summary.record_target(5, 0);
        summary.record_pitch_reason("too_short");
        summary.record_pitch_reason("too_short");
        assert_eq!(summary.total_targets, 2);
        assert_eq!(summary.records_accepted, 15);
        assert_eq!(summary.records_pitched, 2);
        assert_eq!(summary.pitch_reasons.get("too_short"), Some(&2));
    }
}

// pitch.rs — the rejected-record ledger and sample (spec §4.3, §5):
// every reject appends a compact row to `_ledger/yellow_pitched.jsonl`,
// and up to `pitch_sample_limit` rejects per reason get a fuller,
// text-truncated sample in `_pitches/yellow_pitch.jsonl` for reviewer
// spot-checks. Multiple external-orchestration workers may write these
// shared files concurrently, so every append is taken under a
// `FileLock` (spec §5: "ledger appends from concurrent workers are
// serialized by file-level advisory lock").

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use dc_core::lock::{FileLock, DEFAULT_LOCK_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};

use crate::error::ScreenError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PitchLedgerRow {
    pub target_id: String,
    pub row_index: usize,
    pub reason: String,
    pub recorded_at_utc: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PitchSample {
    pub target_id: String,
    pub row_index: usize,
    pub reason: String,
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
    pub recorded_at_utc: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct PitchConfig {
    pub pitch_sample_limit: u64,
    pub pitch_text_limit: usize,
}

impl Default for PitchConfig {
    fn default() -> Self {
        PitchConfig { pitch_sample_limit: 20, pitch_text_limit: 2_000 }
    }
}

fn append_locked<T: Serialize>(path: &Path, row: &T) -> Result<(), ScreenError> {
    let _lock = FileLock::acquire(path, Duration::from_secs(DEFAULT_LOCK_TIMEOUT_SECS))?;
    dc_core::ledger::append_jsonl(path, row)?;
    Ok(())
}

fn truncate_text(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        text.chars().take(limit).collect()
    }
}

/// Tracks how many samples have been taken per reject reason so far in
/// this run, so sampling stays capped at `pitch_sample_limit` per reason
/// without scanning the sample file back.
pub struct PitchTracker {
    ledger_path: std::path::PathBuf,
    sample_path: std::path::PathBuf,
    config: PitchConfig,
    sampled_per_reason: HashMap<String, u64>,
}

impl PitchTracker {
    pub fn new(ledger_dir: &Path, pitches_dir: &Path, config: PitchConfig) -> Self {
        PitchTracker {
            ledger_path: ledger_dir.join("yellow_pitched.jsonl"),
            sample_path: pitches_dir.join("yellow_pitch.jsonl"),
            config,
            sampled_per_reason: HashMap::new(),
        }
    }

    /// Record one rejected record: always appends the compact ledger row,
    /// and appends a fuller sample only while under `pitch_sample_limit`
    /// for that reason.
    pub fn record(
        &mut self,
        target_id: &str,
        row_index: usize,
        reason: &str,
        text: Option<&str>,
        extra: Option<serde_json::Value>,
    ) -> Result<(), ScreenError> {
        let now = chrono::Utc::now();
        append_locked(
            &self.ledger_path,
            &PitchLedgerRow { target_id: target_id.to_string(), row_index, reason: reason.to_string(), recorded_at_utc: now },
        )?;

        let count = self.sampled_per_reason.entry(reason.to_string()).or_insert(0);
        if *count < self.config.pitch_sample_limit {
            let sample = PitchSample {
                target_id: target_id.to_string(),
                row_index,
                reason: reason.to_string(),
                text: text.map(|t| truncate_text(t, self.config.pitch_text_limit)),
                extra,
                recorded_at_utc: now,
            };
            append_locked(&self.sample_path, &sample)?;
            *count += 1;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassedLedgerRow {
    pub target_id: String,
    pub row_index: usize,
    pub dataset_id: String,
    pub row_id: String,
    pub shard_path: String,
    pub recorded_at_utc: chrono::DateTime<chrono::Utc>,
}

pub fn record_passed(ledger_dir: &Path, row: &PassedLedgerRow) -> Result<(), ScreenError> {
    append_locked(&ledger_dir.join("yellow_passed.jsonl"), row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_text_respects_char_limit() {
        assert_eq!(truncate_text("hello world", 5), "hello");
        assert_eq!(truncate_text("hi", 5), "hi");
    }

    #[test]
    fn sample_cap_limits_samples_but_not_ledger_rows() {
        let dir = tempfile::tempdir().unwrap();
        let ledger_dir = dir.path().join("_ledger");
        let pitches_dir = dir.path().join("_pitches");
        let mut tracker = PitchTracker::new(&ledger_dir, &pitches_dir, PitchConfig { pitch_sample_limit: 1, pitch_text_limit: 100 });

        tracker.record("t1", 0, "too_short", Some("a"), None).unwrap();
        tracker.record("t1", 1, "too_short", Some("b"), None).unwrap();

        let ledger_rows: Vec<PitchLedgerRow> = dc_core::ledger::read_jsonl(&ledger_dir.join("yellow_pitched.jsonl")).unwrap();
        assert_eq!(ledger_rows.len(), 2);

        let samples: Vec<PitchSample> = dc_core::ledger::read_jsonl(&pitches_dir.join("yellow_pitch.jsonl")).unwrap();
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn distinct_reasons_each_get_their_own_sample_budget() {
        let dir = tempfile::tempdir().unwrap();
        let ledger_dir = dir.path().join("_ledger");
        let pitches_dir = dir.path().join("_pitches");
        let mut tracker = PitchTracker::new(&ledger_dir, &pitches_dir, PitchConfig { pitch_sample_limit: 1, pitch_text_limit: 100 });

        tracker.record("t1", 0, "reason_a", Some("a"), None).unwrap();
        tracker.record("t1", 1, "reason_b", Some("b"), None).unwrap();

        let samples: Vec<PitchSample> = dc_core::ledger::read_jsonl(&pitches_dir.join("yellow_pitch.jsonl")).unwrap();
        assert_eq!(samples.len(), 2);
    }
}

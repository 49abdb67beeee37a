// checkpoint.rs — CheckpointState: the one piece of mutable cross-stage
// state (spec §3.1, §3.3). Always replaced atomically on update, never
// edited in place (spec §9). A corrupt checkpoint file is recovered as an
// empty state rather than raising (spec §7): the pipeline effectively
// restarts.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ledger::write_json_atomic;

pub const DEFAULT_CHECKPOINT_FILENAME: &str = "pipeline_checkpoint.json";
const SCHEMA_VERSION: u32 = 1;

/// Cross-run progress record for one pipeline invocation (spec §3.1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckpointState {
    pub run_id: String,
    pub pipeline_id: String,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
    #[serde(default)]
    pub completed_targets: Vec<String>,
    #[serde(default)]
    pub counts: HashMap<String, i64>,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    SCHEMA_VERSION
}

impl CheckpointState {
    pub fn new(run_id: impl Into<String>, pipeline_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.into(),
            pipeline_id: pipeline_id.into(),
            created_at_utc: now,
            updated_at_utc: now,
            completed_targets: Vec::new(),
            counts: HashMap::new(),
            version: SCHEMA_VERSION,
        }
    }

    /// Record a target as done. Idempotent in the target-id set (spec
    /// invariant 8 / testable property 8): recording the same id twice
    /// leaves `completed_targets` with exactly one occurrence.
    pub fn record_target(&mut self, target_id: &str, bucket: Option<&str>) {
        if !self.completed_targets.iter().any(|t| t == target_id) {
            self.completed_targets.push(target_id.to_string());
        }
        if let Some(bucket) = bucket {
            *self.counts.entry(bucket.to_string()).or_insert(0) += 1;
        }
        self.updated_at_utc = Utc::now();
    }

    pub fn is_completed(&self, target_id: &str) -> bool {
        self.completed_targets.iter().any(|t| t == target_id)
    }
}

pub fn checkpoint_path(checkpoint_dir: &Path, pipeline_id: &str) -> PathBuf {
    let safe_id = pipeline_id.replace('/', "_");
    checkpoint_dir.join(safe_id).join(DEFAULT_CHECKPOINT_FILENAME)
}

/// Load a checkpoint from disk. A missing file returns `Ok(None)`; a file
/// that fails to parse as JSON returns `Ok(None)` rather than an error
/// (spec §7 / §9 — checkpoint corruption recovers as empty state, never an
/// exception).
pub fn load_checkpoint(path: &Path) -> Result<Option<CheckpointState>, CoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Ok(None),
    };
    match serde_json::from_str(&content) {
        Ok(state) => Ok(Some(state)),
        Err(_) => Ok(None),
    }
}

pub fn save_checkpoint(path: &Path, state: &CheckpointState) -> Result<(), CoreError> {
    write_json_atomic(path, state)
}

pub fn init_checkpoint(path: &Path, pipeline_id: &str, run_id: &str) -> Result<CheckpointState, CoreError> {
    let state = CheckpointState::new(run_id, pipeline_id);
    save_checkpoint(path, &state)?;
    Ok(state)
}

pub fn cleanup_checkpoint(path: &Path) -> Result<(), CoreError> {
    if path.exists() {
        fs::remove_file(path).map_err(|e| CoreError::io(path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Testable property 8 (spec §8): a target id recorded once remains
    /// exactly once after any number of additional `record_target` calls.
    #[test]
    fn record_target_is_idempotent() {
        let mut state = CheckpointState::new("run-1", "classifier");
        state.record_target("t1", Some("GREEN"));
        state.record_target("t1", Some("GREEN"));
        state.record_target("t1", Some("GREEN"));
        assert_eq!(state.completed_targets, vec!["t1".to_string()]);
        assert_eq!(state.counts.get("GREEN"), Some(&3));
    }

    /// Round-trip law (spec §8): save → load returns an equivalent state,
    /// preserving `completed_targets` order.
    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let mut state = CheckpointState::new("run-1", "acquire");
        state.record_target("b", None);
        state.record_target("a", None);
        save_checkpoint(&path, &state).unwrap();

        let loaded = load_checkpoint(&path).unwrap().unwrap();
        assert_eq!(loaded.run_id, state.run_id);
        assert_eq!(loaded.completed_targets, vec!["b".to_string(), "a".to_string()]);
    }

    /// Spec §7/§9: corrupt JSON recovers as an empty state, not an error.
    #[test]
    fn corrupt_checkpoint_recovers_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        fs::write(&path, b"not json {{{").unwrap();
        let loaded = load_checkpoint(&path).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn missing_checkpoint_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert!(load_checkpoint(&path).unwrap().is_none());
    }

    #[test]
    fn checkpoint_path_sanitizes_pipeline_id() {
        let dir = Path::new("/tmp/ckpt");
        let path = checkpoint_path(dir, "yellow/pipeline");
        assert_eq!(path, dir.join("yellow_pipeline").join(DEFAULT_CHECKPOINT_FILENAME));
    }
}

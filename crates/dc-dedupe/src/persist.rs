// persist.rs — snapshot/restore for the Jaccard index's corpus. The
// on-disk layout names this file `combined_dedupe.sqlite`; no sqlite
// crate exists anywhere in this workspace's dependency stack, so the
// snapshot is a JSON envelope written atomically at that path rather
// than an actual SQLite database — the filename is kept only for
// on-disk layout compatibility with the rest of the pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::jaccard::JaccardIndex;
use crate::model::DedupeConfig;

#[derive(Debug, Serialize, Deserialize)]
struct DedupeSnapshot {
    shingle_size: usize,
    entries: Vec<(String, Vec<u64>)>,
}

pub fn save_combined_dedupe(path: &Path, index: &JaccardIndex, config: &DedupeConfig) -> Result<(), dc_core::CoreError> {
    let snapshot = DedupeSnapshot { shingle_size: config.shingle_size, entries: index.snapshot() };
    dc_core::ledger::write_json_atomic(path, &snapshot)
}

/// Returns `None` if no snapshot exists yet at `path`, mirroring the
/// checkpoint-load convention elsewhere in this workspace.
pub fn load_combined_dedupe(path: &Path, config: &DedupeConfig) -> Result<Option<JaccardIndex>, dc_core::CoreError> {
    let snapshot: Option<DedupeSnapshot> = dc_core::ledger::read_json_opt(path)?;
    Ok(snapshot.map(|s| JaccardIndex::restore(config, s.entries)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_snapshot_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combined_dedupe.sqlite");
        let config = DedupeConfig::default();
        assert!(load_combined_dedupe(&path, &config).unwrap().is_none());
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combined_dedupe.sqlite");
        let config = DedupeConfig::default();

        let mut index = JaccardIndex::new(&config);
        index.add("doc-1".to_string(), "the quick brown fox jumps over the lazy dog");
        save_combined_dedupe(&path, &index, &config).unwrap();

        let restored = load_combined_dedupe(&path, &config).unwrap().expect("snapshot written above");
        let (score, match_id, _) = restored.query("the quick brown fox jumps over the lazy dog");
        assert_eq!(score, 1.0);
        assert_eq!(match_id, Some("doc-1".to_string()));
    }
}

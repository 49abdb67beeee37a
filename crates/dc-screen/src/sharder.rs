// sharder.rs — size-capped, atomically-flushed output shards (spec
// §4.3, §6.2 "Shard completion marker"). No dedicated sharding crate
// exists in the corpus; this is built directly on the atomic-write
// (`.tmp` + fsync + rename) and completion-marker primitives `dc_core`
// already uses for acquire manifests.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::ScreenError;
use crate::model::OutputRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardCompression {
    Plain,
    Gzip,
}

impl ShardCompression {
    fn extension(self) -> &'static str {
        match self {
            ShardCompression::Plain => "jsonl",
            ShardCompression::Gzip => "jsonl.gz",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShardConfig {
    pub max_records_per_shard: u64,
    pub compression: ShardCompression,
    pub prefix: String,
}

impl Default for ShardConfig {
    fn default() -> Self {
        ShardConfig { max_records_per_shard: 50_000, compression: ShardCompression::Gzip, prefix: "yellow_shard".to_string() }
    }
}

/// Completion-marker payload written alongside a finished shard (spec
/// §6.2): its presence is the only thing that makes a shard readable by
/// a downstream consumer — invariant 3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardCompletionMarker {
    pub shard_path: String,
    pub completed_at: chrono::DateTime<chrono::Utc>,
    pub shard_size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_count: Option<u64>,
}

enum ShardWriter {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl ShardWriter {
    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        match self {
            ShardWriter::Plain(w) => writeln!(w, "{line}"),
            ShardWriter::Gzip(w) => writeln!(w, "{line}"),
        }
    }

    fn finish(self) -> std::io::Result<()> {
        match self {
            ShardWriter::Plain(mut w) => w.flush(),
            ShardWriter::Gzip(w) => w.finish().map(|_| ()),
        }
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

/// Appends `OutputRecord`s to `max_records_per_shard`-capped shards under
/// `base_dir`. A shard accumulates in a `.tmp` sibling and is only
/// renamed into its final `prefix_NNNNN.jsonl[.gz]` name, with a
/// completion marker, once it reaches capacity or [`Sharder::finish`] is
/// called — callers must call `finish` once at the end of a run or a
/// partially-filled shard is silently dropped (never half-written).
pub struct Sharder {
    base_dir: PathBuf,
    config: ShardConfig,
    shard_index: u32,
    records_in_shard: u64,
    writer: Option<ShardWriter>,
    tmp_path: Option<PathBuf>,
    final_path: Option<PathBuf>,
    pub total_records: u64,
    pub shards_written: u32,
}

impl Sharder {
    pub fn new(base_dir: PathBuf, config: ShardConfig) -> Self {
        Sharder {
            base_dir,
            config,
            shard_index: 0,
            records_in_shard: 0,
            writer: None,
            tmp_path: None,
            final_path: None,
            total_records: 0,
            shards_written: 0,
        }
    }

    fn shard_name(&self, index: u32) -> String {
        format!("{}_{:05}.{}", self.config.prefix, index, self.config.compression.extension())
    }

    fn open_next_shard(&mut self) -> Result<(), ScreenError> {
        fs::create_dir_all(&self.base_dir).map_err(|e| ScreenError::io(self.base_dir.clone(), e))?;
        let final_path = self.base_dir.join(self.shard_name(self.shard_index));
        let tmp_path = tmp_sibling(&final_path);
        let file = File::create(&tmp_path).map_err(|e| ScreenError::io(tmp_path.clone(), e))?;
        let writer = match self.config.compression {
            ShardCompression::Plain => ShardWriter::Plain(BufWriter::new(file)),
            ShardCompression::Gzip => ShardWriter::Gzip(GzEncoder::new(BufWriter::new(file), Compression::default())),
        };
        self.writer = Some(writer);
        self.tmp_path = Some(tmp_path);
        self.final_path = Some(final_path);
        self.records_in_shard = 0;
        Ok(())
    }

    pub fn append(&mut self, record: &OutputRecord) -> Result<(), ScreenError> {
        if self.writer.is_none() {
            self.open_next_shard()?;
        }
        let line = serde_json::to_string(record)?;
        let tmp_path = self.tmp_path.clone().expect("shard opened above");
        self.writer.as_mut().expect("shard opened above").write_line(&line).map_err(|e| ScreenError::io(tmp_path, e))?;
        self.records_in_shard += 1;
        self.total_records += 1;
        if self.records_in_shard >= self.config.max_records_per_shard.max(1) {
            self.flush_current()?;
        }
        Ok(())
    }

    fn flush_current(&mut self) -> Result<(), ScreenError> {
        let Some(writer) = self.writer.take() else { return Ok(()) };
        let tmp_path = self.tmp_path.take().expect("tmp path set alongside writer");
        let final_path = self.final_path.take().expect("final path set alongside writer");
        let record_count = self.records_in_shard;
        writer.finish().map_err(|e| ScreenError::io(tmp_path.clone(), e))?;
        fs::rename(&tmp_path, &final_path).map_err(|e| ScreenError::io(final_path.clone(), e))?;
        let shard_size_bytes = fs::metadata(&final_path).map(|m| m.len()).unwrap_or(0);
        let marker = ShardCompletionMarker {
            shard_path: final_path.to_string_lossy().to_string(),
            completed_at: chrono::Utc::now(),
            shard_size_bytes,
            record_count: Some(record_count),
        };
        dc_core::ledger::write_completion_marker(&final_path, &marker)?;
        self.shard_index += 1;
        self.records_in_shard = 0;
        self.shards_written += 1;
        Ok(())
    }

    /// Flush and finalize a partially-filled shard. A no-op if the
    /// current shard is empty or already flushed.
    pub fn finish(&mut self) -> Result<(), ScreenError> {
        if self.writer.is_some() && self.records_in_shard > 0 {
            self.flush_current()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RecordHash, RecordSource};

    fn sample_record(row_id: &str) -> OutputRecord {
        let now = chrono::Utc::now();
        OutputRecord {
            dataset_id: "ds".to_string(),
            split: "train".to_string(),
            config: "default".to_string(),
            row_id: row_id.to_string(),
            license_spdx: "CC-BY-4.0".to_string(),
            license_profile: "permissive".to_string(),
            source_urls: vec!["https://example.test".to_string()],
            reviewer_notes: String::new(),
            content_sha256: "abc".to_string(),
            normalized_sha256: "def".to_string(),
            pool: "permissive".to_string(),
            pipeline: "yellow_screen".to_string(),
            target_name: "sample".to_string(),
            timestamp_created: now,
            timestamp_updated: now,
            text: "hello world".to_string(),
            source: RecordSource {
                target_id: "t1".to_string(),
                origin: "standard".to_string(),
                source_url: "https://example.test".to_string(),
                license_spdx: "CC-BY-4.0".to_string(),
                license_profile: "permissive".to_string(),
                license_evidence: None,
                retrieved_at_utc: now,
            },
            routing: Default::default(),
            hash: RecordHash { content_sha256: "abc".to_string(), normalized_sha256: "def".to_string() },
            extra: Default::default(),
        }
    }

    #[test]
    fn flushes_a_shard_once_it_hits_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let config = ShardConfig { max_records_per_shard: 2, compression: ShardCompression::Plain, prefix: "shard".to_string() };
        let mut sharder = Sharder::new(dir.path().to_path_buf(), config);
        sharder.append(&sample_record("r0")).unwrap();
        assert_eq!(sharder.shards_written, 0);
        sharder.append(&sample_record("r1")).unwrap();
        assert_eq!(sharder.shards_written, 1);

        let shard_path = dir.path().join("shard_00000.jsonl");
        assert!(shard_path.exists());
        assert!(dc_core::ledger::completion_marker_path(&shard_path).exists());
        assert!(!dir.path().join("shard_00000.jsonl.tmp").exists());
    }

    #[test]
    fn finish_flushes_a_partial_shard() {
        let dir = tempfile::tempdir().unwrap();
        let config = ShardConfig { max_records_per_shard: 10, compression: ShardCompression::Plain, prefix: "shard".to_string() };
        let mut sharder = Sharder::new(dir.path().to_path_buf(), config);
        sharder.append(&sample_record("r0")).unwrap();
        assert_eq!(sharder.shards_written, 0);
        sharder.finish().unwrap();
        assert_eq!(sharder.shards_written, 1);
        assert!(dir.path().join("shard_00000.jsonl").exists());
    }

    #[test]
    fn gzip_shard_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let config = ShardConfig { max_records_per_shard: 1, compression: ShardCompression::Gzip, prefix: "shard".to_string() };
        let mut sharder = Sharder::new(dir.path().to_path_buf(), config);
        sharder.append(&sample_record("r0")).unwrap();
        let shard_path = dir.path().join("shard_00000.jsonl.gz");
        let bytes = fs::read(&shard_path).unwrap();
        let mut decoder = flate2::read::GzDecoder::new(&bytes[..]);
        let mut decoded = String::new();
        std::io::Read::read_to_string(&mut decoder, &mut decoded).unwrap();
        assert!(decoded.contains("\"row_id\":\"r0\""));
    }
}

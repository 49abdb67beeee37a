// huggingface.rs — Hugging Face datasets strategy (spec §4.2.4): shells
// out to `huggingface-cli download`, which already handles resumable,
// parallel chunked transfer for the hub's repo format. `download.config`
// carries the optional `revision` and `repo_type` overrides.

use std::path::Path;
use std::process::Command;

use dc_classifier::QueueRow;
use dc_core::budget::TargetLimitEnforcer;

use crate::error::AcquireError;
use crate::model::{AcquireContext, FileResult};
use crate::registry::Strategy;
use crate::strategies::support::dir_size;

pub struct HuggingfaceStrategy;

impl Strategy for HuggingfaceStrategy {
    fn name(&self) -> &'static str {
        "huggingface_datasets"
    }

    fn acquire(
        &self,
        row: &QueueRow,
        out_dir: &Path,
        limiter: &mut TargetLimitEnforcer,
        _ctx: &AcquireContext,
    ) -> Result<Vec<FileResult>, AcquireError> {
        let Some(repo_id) = row.download.urls().into_iter().next() else {
            return Ok(vec![FileResult::noop("no dataset repo id declared for huggingface_datasets strategy")]);
        };

        if let Some(v) = limiter.start_file(Some(&repo_id)) {
            return Ok(vec![FileResult::error(v.message())]);
        }
        std::fs::create_dir_all(out_dir).map_err(|e| AcquireError::io(out_dir, e))?;

        let repo_type = row.download.config.get("repo_type").and_then(|v| v.as_str()).unwrap_or("dataset");
        let revision = row.download.config.get("revision").and_then(|v| v.as_str());

        let mut cmd = Command::new("huggingface-cli");
        cmd.arg("download").arg(&repo_id).arg("--repo-type").arg(repo_type).arg("--local-dir").arg(out_dir);
        if let Some(revision) = revision {
            cmd.arg("--revision").arg(revision);
        }

        let output = cmd.output().map_err(|e| AcquireError::Subprocess {
            command: "huggingface-cli download".to_string(),
            detail: e.to_string(),
        })?;
        if !output.status.success() {
            return Ok(vec![FileResult::error(format!(
                "huggingface-cli download failed for {repo_id}: {}",
                String::from_utf8_lossy(&output.stderr)
            ))]);
        }

        let size = dir_size(out_dir);
        if let Some(v) = limiter.record_bytes(size, Some(&repo_id)) {
            return Ok(vec![FileResult::error(v.message())]);
        }
        Ok(vec![FileResult::ok(out_dir.to_string_lossy().to_string(), size, String::new(), repo_id)])
    }
}


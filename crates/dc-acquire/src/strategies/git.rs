// git.rs — shallow-clone strategy (spec §4.2.4): `git clone --depth 1`
// into the target's output directory, then a post-clone size check
// against the shared byte budget (git itself doesn't expose a
// content-length hint we can check in advance).

use std::path::Path;
use std::process::Command;

use dc_classifier::QueueRow;
use dc_core::budget::TargetLimitEnforcer;

use crate::error::AcquireError;
use crate::model::{AcquireContext, FileResult};
use crate::registry::Strategy;
use crate::strategies::support::dir_size;

pub struct GitStrategy;

impl Strategy for GitStrategy {
    fn name(&self) -> &'static str {
        "git"
    }

    fn acquire(
        &self,
        row: &QueueRow,
        out_dir: &Path,
        limiter: &mut TargetLimitEnforcer,
        _ctx: &AcquireContext,
    ) -> Result<Vec<FileResult>, AcquireError> {
        let urls = row.download.urls();
        let Some(repo_url) = urls.first() else {
            return Ok(vec![FileResult::noop("no repository url declared for git strategy")]);
        };

        if let Some(v) = limiter.start_file(Some(repo_url)) {
            return Ok(vec![FileResult::error(v.message())]);
        }

        if out_dir.join(".git").exists() {
            let size = dir_size(out_dir);
            return Ok(vec![FileResult::cached(out_dir.to_string_lossy().to_string(), size)]);
        }
        std::fs::create_dir_all(out_dir).map_err(|e| AcquireError::io(out_dir, e))?;

        let refspec = row.download.config.get("ref").and_then(|v| v.as_str());
        let mut cmd = Command::new("git");
        cmd.arg("clone").arg("--depth").arg("1");
        if let Some(refspec) = refspec {
            cmd.arg("--branch").arg(refspec);
        }
        cmd.arg(repo_url).arg(out_dir);

        let output = cmd.output().map_err(|e| AcquireError::Subprocess {
            command: "git clone".to_string(),
            detail: e.to_string(),
        })?;
        if !output.status.success() {
            return Ok(vec![FileResult::error(format!(
                "git clone failed for {repo_url}: {}",
                String::from_utf8_lossy(&output.stderr)
            ))]);
        }

        let size = dir_size(out_dir);
        if let Some(v) = limiter.record_bytes(size, Some(repo_url)) {
            return Ok(vec![FileResult::error(v.message())]);
        }
        Ok(vec![FileResult::ok(out_dir.to_string_lossy().to_string(), size, String::new(), repo_url.clone())])
    }
}


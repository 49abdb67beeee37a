// http.rs — the HTTP download strategy (spec §4.2.3, "the hardest one"):
// resolves one output filename per URL, resumes a `.part` file across
// retries, verifies size/sha256, and reports one `FileResult` per URL.

use std::path::Path;

use dc_classifier::QueueRow;
use dc_core::budget::TargetLimitEnforcer;

use crate::error::AcquireError;
use crate::model::{AcquireContext, FileResult};
use crate::registry::Strategy;

use super::support::{download_one, resolve_filename};

pub struct HttpStrategy;

impl Strategy for HttpStrategy {
    fn name(&self) -> &'static str {
        "http"
    }

    fn acquire(
        &self,
        row: &QueueRow,
        out_dir: &Path,
        limiter: &mut TargetLimitEnforcer,
        ctx: &AcquireContext,
    ) -> Result<Vec<FileResult>, AcquireError> {
        let urls = row.download.urls();
        if urls.is_empty() {
            return Ok(vec![FileResult::noop("no urls declared for http strategy")]);
        }
        let client = ctx
            .client
            .as_ref()
            .expect("http strategy requires a built client unless --no-fetch is set");
        let filenames = row.download.filenames();

        let mut out = Vec::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            let explicit = filenames.get(i).map(String::as_str);
            let filename = resolve_filename(url, explicit, i);
            let final_path = out_dir.join(&filename);

            let expect_sha256 = if urls.len() == 1 { row.download.expected_sha256.as_deref() } else { None };
            let expect_size = if urls.len() == 1 { row.download.expected_size } else { None };

            let result =
                download_one(client, url, &final_path, &row.id, limiter, ctx, expect_sha256, expect_size, true, explicit.is_some())?;
            out.push(result);
        }
        Ok(out)
    }
}

// github_release.rs — GitHub release-asset strategy (spec §4.2.4): one
// GitHub API call resolves the release's asset list, then each asset is
// fetched the same way the `http` strategy fetches anything else.

use std::path::Path;

use dc_classifier::QueueRow;
use dc_core::budget::TargetLimitEnforcer;
use dc_net::client::get_validated;
use serde::Deserialize;

use crate::error::AcquireError;
use crate::model::{AcquireContext, FileResult};
use crate::registry::Strategy;

use super::support::download_one;

#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Deserialize)]
struct ReleaseAsset {
    name: String,
    size: u64,
    browser_download_url: String,
}

pub struct GithubReleaseStrategy;

impl Strategy for GithubReleaseStrategy {
    fn name(&self) -> &'static str {
        "github_release"
    }

    fn acquire(
        &self,
        row: &QueueRow,
        out_dir: &Path,
        limiter: &mut TargetLimitEnforcer,
        ctx: &AcquireContext,
    ) -> Result<Vec<FileResult>, AcquireError> {
        let Some(api_url) = row.download.urls().into_iter().next() else {
            return Ok(vec![FileResult::noop("no github releases api url declared")]);
        };
        let client = ctx.client.as_ref().expect("github_release strategy requires a built client unless --no-fetch is set");

        let response = match get_validated(client, &api_url, &ctx.internal_mirror_allowlist, ctx.allow_non_global_hosts, None) {
            Ok(r) => r,
            Err(e) => return Ok(vec![FileResult::error(e.to_string())]),
        };
        if !response.status().is_success() {
            return Ok(vec![FileResult::error(format!("github release lookup failed for {api_url}: status {}", response.status()))]);
        }
        let release: Release = match response.json() {
            Ok(r) => r,
            Err(e) => return Ok(vec![FileResult::error(format!("failed to parse release metadata from {api_url}: {e}"))]),
        };
        if release.assets.is_empty() {
            return Ok(vec![FileResult::noop("release has no assets")]);
        }

        let name_filter = row.download.filenames();
        let mut out = Vec::new();
        for asset in release.assets {
            if !name_filter.is_empty() && !name_filter.iter().any(|n| n == &asset.name) {
                continue;
            }
            let final_path = out_dir.join(dc_core::paths::safe_filename(&asset.name));
            out.push(download_one(
                client,
                &asset.browser_download_url,
                &final_path,
                &row.id,
                limiter,
                ctx,
                None,
                Some(asset.size),
                true,
                true,
            )?);
        }
        if out.is_empty() {
            return Ok(vec![FileResult::noop("no release asset matched the configured filenames")]);
        }
        Ok(out)
    }
}

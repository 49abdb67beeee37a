// zenodo.rs — Zenodo and Figshare strategies (spec §4.2.4): each record
// is a small JSON API call describing a set of files, which are then
// fetched the same way the `http` strategy fetches anything else.
// Zenodo additionally supports optional md5 verification against the
// checksum the API reports (`--verify-zenodo-md5`).

use std::path::Path;

use dc_classifier::QueueRow;
use dc_core::budget::TargetLimitEnforcer;
use dc_net::client::get_validated;
use serde::Deserialize;

use crate::error::AcquireError;
use crate::model::{AcquireContext, FileResult, HandlerStatus};
use crate::registry::Strategy;

use super::support::download_one;

struct RemoteFile {
    name: String,
    url: String,
    size: Option<u64>,
    md5: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ZenodoRecord {
    #[serde(default)]
    files: Vec<ZenodoFile>,
}

#[derive(Debug, Deserialize)]
struct ZenodoFile {
    key: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    checksum: Option<String>,
    links: ZenodoFileLinks,
}

#[derive(Debug, Deserialize)]
struct ZenodoFileLinks {
    #[serde(rename = "self")]
    self_url: String,
}

#[derive(Debug, Deserialize)]
struct FigshareArticle {
    #[serde(default)]
    files: Vec<FigshareFile>,
}

#[derive(Debug, Deserialize)]
struct FigshareFile {
    name: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    computed_md5: Option<String>,
    download_url: String,
}

fn fetch_json<T: for<'de> Deserialize<'de>>(ctx: &AcquireContext, api_url: &str) -> Result<T, String> {
    let client = ctx.client.as_ref().ok_or_else(|| "no http client available".to_string())?;
    let response = get_validated(client, api_url, &ctx.internal_mirror_allowlist, ctx.allow_non_global_hosts, None)
        .map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("metadata fetch failed for {api_url}: status {}", response.status()));
    }
    response.json::<T>().map_err(|e| format!("failed to parse metadata from {api_url}: {e}"))
}

fn run_files(
    files: Vec<RemoteFile>,
    out_dir: &Path,
    target_id: &str,
    limiter: &mut TargetLimitEnforcer,
    ctx: &AcquireContext,
    verify_md5: bool,
) -> Result<Vec<FileResult>, AcquireError> {
    if files.is_empty() {
        return Ok(vec![FileResult::noop("record metadata listed no files")]);
    }
    let client = ctx.client.as_ref().expect("strategy requires a built client unless --no-fetch is set");
    let mut out = Vec::with_capacity(files.len());
    for remote in files {
        let final_path = out_dir.join(dc_core::paths::safe_filename(&remote.name));
        let mut result = download_one(
            client,
            &remote.url,
            &final_path,
            target_id,
            limiter,
            ctx,
            None,
            remote.size,
            true,
            true,
        )?;
        if verify_md5 && result.status == HandlerStatus::Ok {
            if let Some(expected) = &remote.md5 {
                match verify_file_md5(&final_path, expected) {
                    Ok(true) => {}
                    Ok(false) => {
                        let _ = std::fs::remove_file(&final_path);
                        result = FileResult::error(format!("md5 mismatch for {}", remote.name));
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        out.push(result);
    }
    Ok(out)
}

fn verify_file_md5(path: &Path, expected: &str) -> Result<bool, AcquireError> {
    let bytes = std::fs::read(path).map_err(|e| AcquireError::io(path, e))?;
    let digest = format!("{:x}", md5::compute(&bytes));
    let expected = expected.trim_start_matches("md5:");
    Ok(digest.eq_ignore_ascii_case(expected))
}

pub struct ZenodoStrategy;

impl Strategy for ZenodoStrategy {
    fn name(&self) -> &'static str {
        "zenodo"
    }

    fn acquire(
        &self,
        row: &QueueRow,
        out_dir: &Path,
        limiter: &mut TargetLimitEnforcer,
        ctx: &AcquireContext,
    ) -> Result<Vec<FileResult>, AcquireError> {
        let Some(api_url) = row.download.urls().into_iter().next() else {
            return Ok(vec![FileResult::noop("no zenodo record url declared")]);
        };
        let record: ZenodoRecord = match fetch_json(ctx, &api_url) {
            Ok(r) => r,
            Err(e) => return Ok(vec![FileResult::error(e)]),
        };
        let files = record
            .files
            .into_iter()
            .map(|f| RemoteFile { name: f.key, url: f.links.self_url, size: f.size, md5: f.checksum })
            .collect();
        run_files(files, out_dir, &row.id, limiter, ctx, ctx.verify_zenodo_md5)
    }
}

pub struct FigshareStrategy;

impl Strategy for FigshareStrategy {
    fn name(&self) -> &'static str {
        "figshare"
    }

    fn acquire(
        &self,
        row: &QueueRow,
        out_dir: &Path,
        limiter: &mut TargetLimitEnforcer,
        ctx: &AcquireContext,
    ) -> Result<Vec<FileResult>, AcquireError> {
        let Some(api_url) = row.download.urls().into_iter().next() else {
            return Ok(vec![FileResult::noop("no figshare article url declared")]);
        };
        let article: FigshareArticle = match fetch_json(ctx, &api_url) {
            Ok(a) => a,
            Err(e) => return Ok(vec![FileResult::error(e)]),
        };
        let files = article
            .files
            .into_iter()
            .map(|f| RemoteFile { name: f.name, url: f.download_url, size: f.size, md5: f.computed_md5 })
            .collect();
        run_files(files, out_dir, &row.id, limiter, ctx, false)
    }
}

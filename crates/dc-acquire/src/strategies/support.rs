// support.rs — shared download plumbing used by the `http` strategy and
// every strategy that ultimately moves bytes over HTTP (`zenodo`,
// `figshare`, `github_release`): filename resolution, the resumable
// `.part` download loop, and size/hash verification (spec §4.2.3).

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use dc_core::budget::TargetLimitEnforcer;
use dc_net::client::{backoff_delay, get_validated, is_transient_status};
use reqwest::blocking::Client;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::AcquireError;
use crate::model::{AcquireContext, FileResult};

pub const DEFAULT_CONTENT_TYPE_BLOCKLIST: &[&str] = &["text/html", "application/javascript"];

/// Filename-resolution priority (spec §4.2.3): an explicit filename at
/// this index wins outright; otherwise the sanitized last path segment of
/// the URL; otherwise a positional fallback. `content-disposition` can
/// still override this once the response headers are in hand — see
/// [`filename_from_content_disposition`].
pub fn resolve_filename(url: &str, explicit: Option<&str>, index: usize) -> String {
    if let Some(name) = explicit {
        if !name.is_empty() {
            return dc_core::paths::safe_filename(name);
        }
    }
    let last_segment = url.split(['?', '#']).next().unwrap_or(url).rsplit('/').next().unwrap_or("");
    if !last_segment.is_empty() {
        return dc_core::paths::safe_filename(last_segment);
    }
    format!("payload_{index}.bin")
}

/// RFC 5987 `filename*=UTF-8''...` extraction, falling back to the plain
/// `filename=` parameter. `None` means the header didn't override
/// anything — the caller keeps its `resolve_filename` guess.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    for part in header.split(';').map(str::trim) {
        if let Some(rest) = part.strip_prefix("filename*=") {
            let rest = rest.trim_start_matches("UTF-8''").trim_start_matches("utf-8''");
            let decoded = percent_decode(rest);
            if !decoded.is_empty() {
                return Some(dc_core::paths::safe_filename(&decoded));
            }
        }
    }
    for part in header.split(';').map(str::trim) {
        if let Some(rest) = part.strip_prefix("filename=") {
            let unquoted = rest.trim_matches('"');
            if !unquoted.is_empty() {
                return Some(dc_core::paths::safe_filename(unquoted));
            }
        }
    }
    None
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).to_string()
}

/// Recursive directory size, used by the strategies that shell out to an
/// external sync tool (`git`, `s3_sync`, `aws_requester_pays`,
/// `huggingface_datasets`) and so have no per-file content-length hint to
/// check against the byte budget in advance.
pub fn dir_size(dir: &Path) -> u64 {
    let mut total = 0u64;
    let Ok(entries) = fs::read_dir(dir) else { return 0 };
    for entry in entries.flatten() {
        let path = entry.path();
        if let Ok(meta) = entry.metadata() {
            if meta.is_dir() {
                total += dir_size(&path);
            } else {
                total += meta.len();
            }
        }
    }
    total
}

fn sha256_of_file(path: &Path) -> Result<String, AcquireError> {
    let mut file = File::open(path).map_err(|e| AcquireError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(|e| AcquireError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// What a single download attempt should do next.
enum AttemptOutcome {
    Done,
    Retry,
    ContentRejected(String),
}

/// Download `url` into `final_path`, resuming from a `.part` sibling if
/// one exists, retrying transient failures up to `ctx.retry_max` times,
/// and verifying size/sha256 once the body is fully written (spec
/// §4.2.3). `expect_data` gates the content-type blocklist: strategies
/// fetching HTML landing pages by design (none do today) would pass
/// `false`.
#[allow(clippy::too_many_arguments)]
pub fn download_one(
    client: &Client,
    url: &str,
    final_path: &Path,
    _target_id: &str,
    limiter: &mut TargetLimitEnforcer,
    ctx: &AcquireContext,
    expect_sha256: Option<&str>,
    expect_size: Option<u64>,
    expect_data: bool,
    filename_is_explicit: bool,
) -> Result<FileResult, AcquireError> {
    if final_path.exists() && !ctx.overwrite {
        let bytes = fs::metadata(final_path).map(|m| m.len()).unwrap_or(0);
        return Ok(FileResult::cached(final_path.to_string_lossy().to_string(), bytes));
    }

    if let Some(v) = limiter.start_file(Some(url)) {
        return Ok(FileResult::error(v.message()));
    }
    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent).map_err(|e| AcquireError::io(parent, e))?;
    }

    let mut final_path = final_path.to_path_buf();
    let mut part_path = final_path.with_extension(format!(
        "{}.part",
        final_path.extension().and_then(|e| e.to_str()).unwrap_or("bin")
    ));
    let mut renamed_from_content_disposition = false;

    let mut attempt = 0u32;
    loop {
        let resume_from = fs::metadata(&part_path).map(|m| m.len()).ok().filter(|&n| n > 0);

        let response = match get_validated(
            client,
            url,
            &ctx.internal_mirror_allowlist,
            ctx.allow_non_global_hosts,
            resume_from,
        ) {
            Ok(r) => r,
            Err(e) if attempt < ctx.retry_max => {
                warn!(url, attempt, error = %e, "transient network error, retrying");
                std::thread::sleep(backoff_delay(attempt));
                attempt += 1;
                continue;
            }
            Err(e) => return Ok(FileResult::error(e.to_string())),
        };

        let status = response.status();
        if is_transient_status(status.as_u16()) && attempt < ctx.retry_max {
            std::thread::sleep(backoff_delay(attempt));
            attempt += 1;
            continue;
        }
        if !status.is_success() && status.as_u16() != 206 {
            return Ok(FileResult::error(format!("unexpected status {status} fetching {url}")));
        }

        if expect_data {
            if let Some(ct) = response.headers().get(reqwest::header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
                let base = ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase();
                if DEFAULT_CONTENT_TYPE_BLOCKLIST.contains(&base.as_str()) {
                    return Ok(FileResult::error(format!("blocked content-type '{base}' for {url}")));
                }
            }
        }

        // Content-Disposition overrides the URL-derived filename guess
        // (spec §4.2.3), but never an explicit filename from the queue
        // row, and only on the first attempt of a fresh download — once
        // a `.part` file is in progress the name it's keyed under stays
        // fixed for the life of that resume chain.
        if !filename_is_explicit && !renamed_from_content_disposition && resume_from.is_none() {
            if let Some(cd) = response
                .headers()
                .get(reqwest::header::CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok())
                .and_then(filename_from_content_disposition)
            {
                if let Some(parent) = final_path.parent() {
                    final_path = parent.join(&cd);
                    part_path = final_path.with_extension(format!(
                        "{}.part",
                        final_path.extension().and_then(|e| e.to_str()).unwrap_or("bin")
                    ));
                }
            }
            renamed_from_content_disposition = true;
        }

        // The reference behavior: a `Range` request that the server
        // answers with 200 instead of 206 means it ignored the range —
        // restart from scratch. A 206 whose `Content-Range` doesn't
        // actually start where we asked means the server is confused;
        // abort rather than silently corrupt the file.
        if resume_from.is_some() {
            if status.as_u16() == 200 {
                let _ = fs::remove_file(&part_path);
            } else if status.as_u16() == 206 {
                let expected_prefix = format!("bytes {}", resume_from.unwrap());
                let content_range = response
                    .headers()
                    .get(reqwest::header::CONTENT_RANGE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("");
                if !content_range.starts_with(&expected_prefix) {
                    return Ok(FileResult::error(format!(
                        "content-range mismatch resuming {url}: got '{content_range}'"
                    )));
                }
            }
        }

        let size_hint = response.content_length();
        if let Some(v) = limiter.check_size_hint(size_hint, Some(url)) {
            return Ok(FileResult::error(v.message()));
        }

        match write_body(response, &part_path, resume_from.is_some() && status.as_u16() == 206, limiter, url) {
            Ok(AttemptOutcome::Done) => break,
            Ok(AttemptOutcome::Retry) if attempt < ctx.retry_max => {
                std::thread::sleep(backoff_delay(attempt));
                attempt += 1;
                continue;
            }
            Ok(AttemptOutcome::Retry) => return Ok(FileResult::error(format!("retries exhausted downloading {url}"))),
            Ok(AttemptOutcome::ContentRejected(reason)) => {
                let _ = fs::remove_file(&part_path);
                return Ok(FileResult::error(reason));
            }
            Err(e) => return Err(e),
        }
    }

    let written = fs::metadata(&part_path).map(|m| m.len()).map_err(|e| AcquireError::io(&part_path, e))?;
    if let Some(expected) = expect_size {
        if expected != written {
            let _ = fs::remove_file(&part_path);
            return Ok(FileResult::error(format!(
                "size mismatch for {url}: expected {expected}, got {written}"
            )));
        }
    }

    let digest = if ctx.verify_sha256 || expect_sha256.is_some() {
        Some(sha256_of_file(&part_path)?)
    } else {
        None
    };
    if let (Some(expected), Some(actual)) = (expect_sha256, &digest) {
        if !expected.eq_ignore_ascii_case(actual) {
            let _ = fs::remove_file(&part_path);
            return Ok(FileResult::error(format!(
                "sha256 mismatch for {url}: expected {expected}, got {actual}"
            )));
        }
    }

    fs::rename(&part_path, &final_path).map_err(|e| AcquireError::io(&final_path, e))?;

    Ok(FileResult::ok(
        final_path.to_string_lossy().to_string(),
        written,
        digest.unwrap_or_default(),
        url,
    ))
}

fn write_body(
    response: reqwest::blocking::Response,
    part_path: &Path,
    append: bool,
    limiter: &mut TargetLimitEnforcer,
    url: &str,
) -> Result<AttemptOutcome, AcquireError> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(!append)
        .open(part_path)
        .map_err(|e| AcquireError::io(part_path, e))?;
    if append {
        file.seek(SeekFrom::End(0)).map_err(|e| AcquireError::io(part_path, e))?;
    }

    let mut reader = response;
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            // A mid-stream disconnect surfaces as a plain io::Error from
            // reqwest's Read impl; treat it as transient and let the
            // caller retry from the `.part` file already on disk.
            Err(_) => return Ok(AttemptOutcome::Retry),
        };
        file.write_all(&buf[..n]).map_err(|e| AcquireError::io(part_path, e))?;
        if let Some(v) = limiter.record_bytes(n as u64, Some(url)) {
            return Ok(AttemptOutcome::ContentRejected(v.message()));
        }
    }
    Ok(AttemptOutcome::Done)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_resolution_prefers_explicit_then_last_segment() {
        assert_eq!(resolve_filename("https://x.example/a/b.zip", Some("custom.zip"), 0), "custom.zip");
        assert_eq!(resolve_filename("https://x.example/a/b.zip?x=1", None, 0), "b.zip");
        assert_eq!(resolve_filename("https://x.example/", None, 2), "payload_2.bin");
    }

    #[test]
    fn content_disposition_rfc5987_wins_over_plain_filename() {
        let header = r#"attachment; filename="plain.zip"; filename*=UTF-8''fancy%20name.zip"#;
        assert_eq!(filename_from_content_disposition(header), Some("fancy name.zip".to_string()));
    }

    #[test]
    fn content_disposition_falls_back_to_plain_filename() {
        let header = r#"attachment; filename="plain.zip""#;
        assert_eq!(filename_from_content_disposition(header), Some("plain.zip".to_string()));
    }

    #[test]
    fn content_disposition_absent_returns_none() {
        assert_eq!(filename_from_content_disposition("attachment"), None);
    }
}

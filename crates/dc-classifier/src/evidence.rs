// evidence.rs — License-evidence fetching (spec §4.1 "Evidence fetching").
//
// One GET per target, with header redaction, a response-size cap, retry
// with exponential backoff on transient failures, and SSRF checks on
// every redirect hop (delegated to `dc-net`). Two hashes are always
// recorded: `raw_sha256` over untransformed bytes, `normalized_sha256`
// over whitespace-collapsed, timestamp/querystring-stripped extracted
// text — falling back to the raw hash when text extraction fails.

use std::collections::HashMap;
use std::io::Read;

use dc_core::hash::hash_bytes;
use dc_core::normalize::normalized_sha256;
use dc_net::{backoff_delay, get_validated_with_headers, is_transient_error, is_transient_status, InternalMirrorAllowlist};
use reqwest::blocking::Client;

use crate::model::EvidenceSnapshot;

pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 20 * 1024 * 1024;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const REDACTED_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie"];

/// Fetch behavior, shared across targets in one classifier run.
pub struct FetchConfig {
    pub allowlist: InternalMirrorAllowlist,
    pub allow_non_global_hosts: bool,
    pub max_response_bytes: u64,
    pub max_attempts: u32,
    /// Extra headers sent with every evidence request (`--evidence-header`).
    pub extra_headers: Vec<(String, String)>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            allowlist: InternalMirrorAllowlist::default(),
            allow_non_global_hosts: false,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            extra_headers: Vec::new(),
        }
    }
}

enum AttemptOutcome {
    Ok(EvidenceSnapshot),
    Transient(String),
    Permanent(String),
}

/// Fetch one target's license evidence, retrying transient failures with
/// exponential backoff up to `config.max_attempts`.
pub fn fetch_evidence(client: &Client, url: &str, config: &FetchConfig) -> EvidenceSnapshot {
    let mut last_error = String::from("unknown error");
    for attempt in 0..config.max_attempts {
        match try_fetch_once(client, url, config) {
            AttemptOutcome::Ok(snapshot) => return snapshot,
            AttemptOutcome::Transient(msg) => {
                last_error = msg;
                if attempt + 1 < config.max_attempts {
                    std::thread::sleep(backoff_delay(attempt));
                }
            }
            AttemptOutcome::Permanent(msg) => {
                last_error = msg;
                break;
            }
        }
    }
    error_snapshot(url, last_error)
}

fn error_snapshot(url: &str, error: String) -> EvidenceSnapshot {
    EvidenceSnapshot {
        url: url.to_string(),
        status: "error".to_string(),
        fetched_at_utc: chrono::Utc::now(),
        content_length: None,
        bytes: None,
        raw_sha256: String::new(),
        normalized_sha256: String::new(),
        normalized_hash_fallback: None,
        text_extracted: None,
        text_extraction_failed: false,
        raw_changed_from_previous: None,
        normalized_changed_from_previous: None,
        cosmetic_change: false,
        error: Some(error),
        headers_used_redacted: HashMap::new(),
    }
}

fn try_fetch_once(client: &Client, url: &str, config: &FetchConfig) -> AttemptOutcome {
    let response = match get_validated_with_headers(client, url, &config.allowlist, config.allow_non_global_hosts, None, &config.extra_headers)
    {
        Ok(r) => r,
        Err(dc_net::NetError::Request(e)) if is_transient_error(&e) => {
            return AttemptOutcome::Transient(e.to_string())
        }
        Err(e) => return AttemptOutcome::Permanent(e.to_string()),
    };

    let status = response.status();
    if is_transient_status(status.as_u16()) {
        return AttemptOutcome::Transient(format!("transient HTTP status {status}"));
    }
    if !status.is_success() {
        return AttemptOutcome::Permanent(format!("HTTP status {status}"));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let headers_used_redacted = redact_headers(response.headers());

    let mut limited = response.take(config.max_response_bytes + 1);
    let mut bytes = Vec::new();
    if let Err(e) = limited.read_to_end(&mut bytes) {
        return AttemptOutcome::Transient(e.to_string());
    }
    if bytes.len() as u64 > config.max_response_bytes {
        bytes.truncate(config.max_response_bytes as usize);
    }

    let raw_sha256 = hash_bytes(&bytes);
    let (normalized_sha256_value, text_extracted, text_extraction_failed, fallback) = match extract_text(&content_type, &bytes) {
        Some(text) => (normalized_sha256(&text), Some(text), false, None),
        None => (raw_sha256.clone(), None, true, Some("raw_bytes".to_string())),
    };

    AttemptOutcome::Ok(EvidenceSnapshot {
        url: url.to_string(),
        status: "ok".to_string(),
        fetched_at_utc: chrono::Utc::now(),
        content_length: Some(bytes.len() as u64),
        bytes: Some(bytes),
        raw_sha256,
        normalized_sha256: normalized_sha256_value,
        normalized_hash_fallback: fallback,
        text_extracted,
        text_extraction_failed,
        raw_changed_from_previous: None,
        normalized_changed_from_previous: None,
        cosmetic_change: false,
        error: None,
        headers_used_redacted,
    })
}

fn redact_headers(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let value = if REDACTED_HEADERS.contains(&name_lower.as_str()) {
                "[redacted]".to_string()
            } else {
                value.to_str().unwrap_or("[binary]").to_string()
            };
            (name_lower, value)
        })
        .collect()
}

/// Best-effort text extraction: strips HTML tags for `text/html` bodies,
/// otherwise decodes as UTF-8. Returns `None` (extraction failed) for
/// non-UTF-8 binary bodies.
fn extract_text(content_type: &str, bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8(bytes.to_vec()).ok()?;
    if content_type.to_lowercase().contains("html") {
        Some(strip_html_tags(&text))
    } else {
        Some(text)
    }
}

fn strip_html_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_html_tags_removes_markup() {
        assert_eq!(strip_html_tags("<p>MIT <b>License</b></p>"), "MIT License");
    }

    #[test]
    fn extract_text_fails_on_non_utf8_binary() {
        let bytes = [0xff, 0xfe, 0x00, 0xff];
        assert!(extract_text("application/octet-stream", &bytes).is_none());
    }

    #[test]
    fn extract_text_decodes_plain_utf8() {
        let result = extract_text("text/plain", b"hello world").unwrap();
        assert_eq!(result, "hello world");
    }
}

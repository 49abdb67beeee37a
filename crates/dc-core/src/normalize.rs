// normalize.rs — Evidence-text normalization.
//
// Evidence-change detection (spec §4.1 / §9) requires a reproducible
// normalizer: the same closed, ordered set of substitutions on every run,
// so that `normalized_sha256` only changes when the substantive content of
// a license page changes, not its timestamp or a tracking querystring.
//
// The substitution order is significant and must not be reordered:
// querystring-stripping runs first (it only touches matched URLs), then
// the five timestamp/date patterns, then whitespace collapse.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::hash::{collapse_whitespace, hash_str};

static URL_QUERYSTRING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(https?://[^\s?#]+)\?[^\s#]+").expect("valid regex"));

static TIMESTAMP_ISO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?\b")
        .expect("valid regex")
});
static DATE_ISO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("valid regex"));
static DATE_SLASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}/\d{1,2}/\d{4}\b").expect("valid regex"));
static TIME_HMS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{2}:\d{2}:\d{2}\b").expect("valid regex"));
static TIME_HM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{2}:\d{2}\b").expect("valid regex"));

/// Normalize evidence text for change detection: strip URL querystrings
/// and timestamp/date/time patterns, then collapse whitespace.
///
/// The pattern list is closed and ordered — see the module docs. Any
/// additional pattern would change historical `normalized_sha256` values
/// and must be treated as a breaking change to the evidence-change policy.
pub fn normalize_evidence_text(text: &str) -> String {
    let mut cleaned = URL_QUERYSTRING_RE.replace_all(text, "$1").into_owned();
    cleaned = TIMESTAMP_ISO_RE.replace_all(&cleaned, " ").into_owned();
    cleaned = DATE_ISO_RE.replace_all(&cleaned, " ").into_owned();
    cleaned = DATE_SLASH_RE.replace_all(&cleaned, " ").into_owned();
    cleaned = TIME_HMS_RE.replace_all(&cleaned, " ").into_owned();
    cleaned = TIME_HM_RE.replace_all(&cleaned, " ").into_owned();
    collapse_whitespace(&cleaned)
}

/// SHA-256 of the normalized evidence text.
pub fn normalized_sha256(text: &str) -> String {
    hash_str(&normalize_evidence_text(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_querystring_but_keeps_path() {
        let text = "See https://example.test/license?utm_source=x&ref=y for terms.";
        assert_eq!(
            normalize_evidence_text(text),
            "See https://example.test/license for terms."
        );
    }

    #[test]
    fn strips_iso_timestamp() {
        let text = "Fetched 2026-07-28T12:30:00Z from the mirror.";
        assert_eq!(normalize_evidence_text(text), "Fetched from the mirror.");
    }

    #[test]
    fn strips_bare_date_and_time() {
        let text = "Updated on 2026-07-28 at 12:30:00 (also 12:30).";
        assert_eq!(normalize_evidence_text(text), "Updated on at (also ).");
    }

    #[test]
    fn strips_slash_date() {
        let text = "Revision 7/28/2026 applied.";
        assert_eq!(normalize_evidence_text(text), "Revision applied.");
    }

    #[test]
    fn is_idempotent() {
        let text = "MIT License. Copyright 2026-07-28T00:00:00Z example.";
        let once = normalize_evidence_text(text);
        let twice = normalize_evidence_text(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn cosmetic_only_change_yields_same_normalized_hash() {
        let before = "MIT License.\nFetched 2026-07-28T00:00:00Z.";
        let after = "MIT License.\nFetched 2026-07-29T08:15:00Z.";
        assert_eq!(normalized_sha256(before), normalized_sha256(after));
    }
}

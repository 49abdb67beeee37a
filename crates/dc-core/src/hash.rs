// hash.rs — SHA-256 hashing utilities.
//
// All content hashes in the dataset collector are SHA-256, hex-encoded.
// `content_sha256` (invariant 2 in spec §3.2) is always computed over the
// whitespace-collapsed form of the text, never the raw bytes, so that two
// records differing only in incidental whitespace hash identically.

use sha2::{Digest, Sha256};

/// Hash arbitrary bytes, returning a lowercase hex-encoded SHA-256 string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Hash a UTF-8 string's raw bytes.
pub fn hash_str(s: &str) -> String {
    hash_bytes(s.as_bytes())
}

/// Collapse all whitespace runs (spaces, tabs, newlines) to a single ASCII
/// space and trim the ends. This is the canonical whitespace-collapse used
/// for `content_sha256` and for evidence-text normalization.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !last_was_space && !out.is_empty() {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

/// SHA-256 of the whitespace-collapsed form of `text`. This is
/// `content_sha256` per spec invariant 2: rewrites that only touch
/// whitespace must hash identically.
pub fn content_sha256(text: &str) -> String {
    hash_str(&collapse_whitespace(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_determinism() {
        let input = b"hello world";
        assert_eq!(hash_bytes(input), hash_bytes(input));
    }

    #[test]
    fn hash_uniqueness() {
        assert_ne!(hash_bytes(b"hello"), hash_bytes(b"world"));
    }

    #[test]
    fn hash_is_hex_sha256() {
        let hash = hash_str("test");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }

    #[test]
    fn hash_known_value() {
        // SHA-256("") = e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855
        assert_eq!(
            hash_str(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn collapse_whitespace_collapses_runs() {
        assert_eq!(collapse_whitespace("a   b\t\tc\n\nd"), "a b c d");
        assert_eq!(collapse_whitespace("  leading and trailing  "), "leading and trailing");
    }

    /// Invariant 2 (spec §3.2 / §8): whitespace-only rewrites must not
    /// change `content_sha256`.
    #[test]
    fn content_sha256_is_whitespace_invariant() {
        let a = "Sample text.\nWith a newline.";
        let b = "Sample   text.  With a newline.";
        assert_eq!(content_sha256(a), content_sha256(b));
    }

    #[test]
    fn content_sha256_differs_on_real_changes() {
        assert_ne!(content_sha256("Sample."), content_sha256("Sampl."));
    }
}

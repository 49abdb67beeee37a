//! Denylist pattern matching: substring, regex, domain, and publisher
//! patterns, each carrying a severity (`hard_red` dominates every other
//! classification; `force_yellow` forces YELLOW absent a hard-red hit) and
//! provenance (`link`, `rationale`) for the decision bundle's audit trail.

pub mod error;
pub mod matcher;
pub mod pattern;

use std::fs;
use std::path::Path;

pub use error::DenylistError;
pub use matcher::{build_haystack, denylist_hits, has_force_yellow, has_hard_red, DenylistHit, Haystack};
pub use pattern::{Denylist, DomainPattern, Pattern, PatternKind, PublisherPattern, Severity};

/// Load a denylist from a single YAML file.
pub fn load_denylist(path: &Path) -> Result<Denylist, DenylistError> {
    let content = fs::read_to_string(path).map_err(|e| DenylistError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    load_denylist_str(&content, path)
}

/// Load and merge denylists from multiple YAML files (e.g. a shared base
/// plus a per-run override), concatenating each pattern family in order.
pub fn load_denylists(paths: &[impl AsRef<Path>]) -> Result<Denylist, DenylistError> {
    let mut merged = Denylist::default();
    for path in paths {
        let loaded = load_denylist(path.as_ref())?;
        merged.patterns.extend(loaded.patterns);
        merged.domain_patterns.extend(loaded.domain_patterns);
        merged.publisher_patterns.extend(loaded.publisher_patterns);
    }
    Ok(merged)
}

fn load_denylist_str(content: &str, path: &Path) -> Result<Denylist, DenylistError> {
    serde_yaml::from_str(content).map_err(|e| DenylistError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_v09_denylist_with_defaults() {
        let yaml = r#"
patterns:
  - type: substring
    value: sci-hub
    severity: hard_red
domain_patterns:
  - domain: bad-mirror.example
publisher_patterns:
  - publisher: Shady Corp
    severity: force_yellow
"#;
        let denylist = load_denylist_str(yaml, Path::new("denylist.yaml")).unwrap();
        assert_eq!(denylist.patterns.len(), 1);
        assert_eq!(denylist.patterns[0].fields.len(), 5, "missing fields should default to the standard set");
        assert_eq!(denylist.domain_patterns[0].severity, Severity::HardRed);
        assert_eq!(denylist.publisher_patterns[0].severity, Severity::ForceYellow);
    }

    #[test]
    fn empty_denylist_parses_to_no_patterns() {
        let denylist = load_denylist_str("{}", Path::new("denylist.yaml")).unwrap();
        assert!(denylist.patterns.is_empty());
        assert!(denylist.domain_patterns.is_empty());
        assert!(denylist.publisher_patterns.is_empty());
    }

    #[test]
    fn merging_two_files_concatenates_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.yaml");
        let b = dir.path().join("b.yaml");
        fs::write(&a, "patterns:\n  - value: foo\n").unwrap();
        fs::write(&b, "patterns:\n  - value: bar\n").unwrap();
        let merged = load_denylists(&[&a, &b]).unwrap();
        assert_eq!(merged.patterns.len(), 2);
    }
}

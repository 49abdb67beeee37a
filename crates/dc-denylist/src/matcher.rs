// matcher.rs — Haystack construction and hit detection, mirroring the
// reference implementation's `denylist_hits`/`build_denylist_haystack`:
// for each pattern family, stop at the first matching field/value so a
// target trips at most one hit per pattern entry.

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::pattern::{Denylist, PatternKind, Severity};

/// Target metadata assembled into named fields for matching. Built by
/// [`build_haystack`].
#[derive(Debug, Clone, Default)]
pub struct Haystack {
    pub id: String,
    pub name: String,
    pub license_evidence_url: String,
    pub download_urls: Vec<String>,
    pub download_blob: String,
    pub publisher: String,
}

impl Haystack {
    fn field_values(&self, field: &str) -> Vec<String> {
        match field {
            "id" => vec![self.id.clone()],
            "name" => vec![self.name.clone()],
            "license_evidence_url" => vec![self.license_evidence_url.clone()],
            "download_urls" => self.download_urls.clone(),
            "download_blob" => vec![self.download_blob.clone()],
            "publisher" => vec![self.publisher.clone()],
            _ => Vec::new(),
        }
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect()
    }
}

/// Assemble a [`Haystack`] from target metadata, joining `download_urls`
/// with spaces into `download_blob` for substring/regex matching across
/// the whole set at once.
pub fn build_haystack(
    target_id: &str,
    name: &str,
    evidence_url: &str,
    download_urls: &[String],
    publisher: &str,
) -> Haystack {
    Haystack {
        id: target_id.to_string(),
        name: name.to_string(),
        license_evidence_url: evidence_url.to_string(),
        download_urls: download_urls.to_vec(),
        download_blob: download_urls.join(" "),
        publisher: publisher.to_string(),
    }
}

/// A single matched denylist entry, ready to become a `RuleFired` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenylistHit {
    pub field: String,
    pub pattern: String,
    pub kind: String,
    pub severity: Severity,
    pub reason: String,
    pub link: String,
    pub rationale: String,
}

/// Extract the hostname from a URL without pulling in a full URL-parsing
/// dependency: strip the scheme, then take everything up to the first
/// `/`, `?`, or `#`, then drop a trailing `:port`.
fn extract_domain(url: &str) -> String {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("");
    let host = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);
    let host = if host.starts_with('[') {
        host.split_once(']').map(|(h, _)| &h[1..]).unwrap_or(host)
    } else {
        host.split_once(':').map(|(h, _)| h).unwrap_or(host)
    };
    host.to_lowercase()
}

fn domain_matches(host: &str, target: &str) -> bool {
    if host.is_empty() || target.is_empty() {
        return false;
    }
    let host = host.to_lowercase();
    let target = target.to_lowercase();
    host == target || host.ends_with(&format!(".{target}"))
}

/// Evaluate every pattern family against `hay`, returning every hit found.
/// Matches the reference's field-by-field short-circuit: within one
/// pattern entry, the first matching field/value wins and later fields
/// aren't checked.
pub fn denylist_hits(denylist: &Denylist, hay: &Haystack) -> Vec<DenylistHit> {
    let mut hits = Vec::new();

    for pattern in &denylist.patterns {
        'fields: for field in &pattern.fields {
            for value in hay.field_values(field) {
                let matched = match pattern.kind {
                    PatternKind::Regex => RegexBuilder::new(&pattern.value)
                        .case_insensitive(true)
                        .build()
                        .map(|re| re.is_match(&value))
                        .unwrap_or(false),
                    PatternKind::Domain => domain_matches(&extract_domain(&value), &pattern.value),
                    PatternKind::Substring => value.to_lowercase().contains(&pattern.value.to_lowercase()),
                };
                if matched {
                    hits.push(DenylistHit {
                        field: field.clone(),
                        pattern: pattern.value.clone(),
                        kind: pattern.kind.as_str().to_string(),
                        severity: pattern.severity,
                        reason: pattern.reason.clone(),
                        link: pattern.link.clone(),
                        rationale: pattern.rationale.clone(),
                    });
                    break 'fields;
                }
            }
        }
    }

    const URL_FIELDS: &[&str] = &["license_evidence_url", "download_urls"];
    for domain_pattern in &denylist.domain_patterns {
        if domain_pattern.domain.is_empty() {
            continue;
        }
        'url_fields: for field in URL_FIELDS {
            for value in hay.field_values(field) {
                if domain_matches(&extract_domain(&value), &domain_pattern.domain) {
                    hits.push(DenylistHit {
                        field: field.to_string(),
                        pattern: domain_pattern.domain.clone(),
                        kind: "domain".to_string(),
                        severity: domain_pattern.severity,
                        reason: domain_pattern.rationale.clone(),
                        link: domain_pattern.link.clone(),
                        rationale: domain_pattern.rationale.clone(),
                    });
                    break 'url_fields;
                }
            }
        }
    }

    if !hay.publisher.is_empty() {
        for publisher_pattern in &denylist.publisher_patterns {
            if !publisher_pattern.publisher.is_empty()
                && hay
                    .publisher
                    .to_lowercase()
                    .contains(&publisher_pattern.publisher.to_lowercase())
            {
                hits.push(DenylistHit {
                    field: "publisher".to_string(),
                    pattern: publisher_pattern.publisher.clone(),
                    kind: "publisher".to_string(),
                    severity: publisher_pattern.severity,
                    reason: publisher_pattern.rationale.clone(),
                    link: publisher_pattern.link.clone(),
                    rationale: publisher_pattern.rationale.clone(),
                });
            }
        }
    }

    hits
}

/// `true` if any hit carries [`Severity::HardRed`].
pub fn has_hard_red(hits: &[DenylistHit]) -> bool {
    hits.iter().any(|h| h.severity == Severity::HardRed)
}

/// `true` if any hit carries [`Severity::ForceYellow`].
pub fn has_force_yellow(hits: &[DenylistHit]) -> bool {
    hits.iter().any(|h| h.severity == Severity::ForceYellow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{DomainPattern, Pattern, PublisherPattern};

    #[test]
    fn substring_hit_on_id() {
        let denylist = Denylist {
            patterns: vec![Pattern {
                kind: PatternKind::Substring,
                value: "sci-hub".to_string(),
                fields: vec!["id".to_string()],
                severity: Severity::HardRed,
                reason: String::new(),
                link: String::new(),
                rationale: String::new(),
            }],
            ..Default::default()
        };
        let hay = build_haystack("sci-hub-mirror", "", "", &[], "");
        let hits = denylist_hits(&denylist, &hay);
        assert_eq!(hits.len(), 1);
        assert!(has_hard_red(&hits));
    }

    #[test]
    fn regex_is_case_insensitive() {
        let denylist = Denylist {
            patterns: vec![Pattern {
                kind: PatternKind::Regex,
                value: r"^pirate-.*$".to_string(),
                fields: vec!["name".to_string()],
                severity: Severity::ForceYellow,
                reason: String::new(),
                link: String::new(),
                rationale: String::new(),
            }],
            ..Default::default()
        };
        let hay = build_haystack("t1", "PIRATE-Dataset", "", &[], "");
        let hits = denylist_hits(&denylist, &hay);
        assert_eq!(hits.len(), 1);
        assert!(has_force_yellow(&hits));
        assert!(!has_hard_red(&hits));
    }

    #[test]
    fn domain_pattern_matches_subdomain_not_lookalike() {
        let denylist = Denylist {
            domain_patterns: vec![DomainPattern {
                domain: "bad-mirror.example".to_string(),
                severity: Severity::HardRed,
                link: String::new(),
                rationale: String::new(),
            }],
            ..Default::default()
        };
        let hay = build_haystack(
            "t1",
            "",
            "https://cdn.bad-mirror.example/file.zip",
            &[],
            "",
        );
        assert_eq!(denylist_hits(&denylist, &hay).len(), 1);

        let hay_lookalike = build_haystack(
            "t1",
            "",
            "https://notbad-mirror.example/file.zip",
            &[],
            "",
        );
        assert!(denylist_hits(&denylist, &hay_lookalike).is_empty());
    }

    #[test]
    fn publisher_pattern_is_substring() {
        let denylist = Denylist {
            publisher_patterns: vec![PublisherPattern {
                publisher: "Shady Corp".to_string(),
                severity: Severity::HardRed,
                link: String::new(),
                rationale: String::new(),
            }],
            ..Default::default()
        };
        let hay = build_haystack("t1", "", "", &[], "Shady Corp International");
        assert_eq!(denylist_hits(&denylist, &hay).len(), 1);
    }

    #[test]
    fn download_urls_join_into_blob_field() {
        let denylist = Denylist {
            patterns: vec![Pattern {
                kind: PatternKind::Substring,
                value: "torrent-tracker".to_string(),
                fields: vec!["download_blob".to_string()],
                severity: Severity::HardRed,
                reason: String::new(),
                link: String::new(),
                rationale: String::new(),
            }],
            ..Default::default()
        };
        let urls = vec!["https://good.example/a".to_string(), "https://torrent-tracker.example/b".to_string()];
        let hay = build_haystack("t1", "", "", &urls, "");
        assert_eq!(denylist_hits(&denylist, &hay).len(), 1);
    }
}

// pattern.rs — Denylist schema: three independent pattern families, each
// carrying severity and provenance (link/rationale).

use serde::{Deserialize, Serialize};

/// How strongly a hit should affect the final bucket decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// A match here dominates every other classification: the target is RED.
    HardRed,
    /// A match here forces YELLOW unless a `HardRed` hit already applies.
    ForceYellow,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::HardRed
    }
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::HardRed => "hard_red",
            Severity::ForceYellow => "force_yellow",
        }
    }
}

/// How a `patterns` entry's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Substring,
    Regex,
    Domain,
}

impl Default for PatternKind {
    fn default() -> Self {
        PatternKind::Substring
    }
}

impl PatternKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternKind::Substring => "substring",
            PatternKind::Regex => "regex",
            PatternKind::Domain => "domain",
        }
    }
}

fn default_fields() -> Vec<String> {
    ["id", "name", "license_evidence_url", "download_urls", "download_blob"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// One entry of the `patterns` family: matched against named target-metadata
/// fields using `kind`'s interpretation of `value`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Pattern {
    #[serde(rename = "type", default)]
    pub kind: PatternKind,
    pub value: String,
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub rationale: String,
}

/// One entry of the `domain_patterns` family: matched against the extracted
/// hostname of URL-valued fields (exact match or dotted-suffix subdomain).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DomainPattern {
    pub domain: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub rationale: String,
}

/// One entry of the `publisher_patterns` family: substring-matched against
/// the target's publisher field.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublisherPattern {
    pub publisher: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub rationale: String,
}

/// The full denylist: all three pattern families, loaded from YAML.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Denylist {
    #[serde(default)]
    pub patterns: Vec<Pattern>,
    #[serde(default)]
    pub domain_patterns: Vec<DomainPattern>,
    #[serde(default)]
    pub publisher_patterns: Vec<PublisherPattern>,
}

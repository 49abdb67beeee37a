// decision.rs — Bucket tie-break (spec §4.1 "Bucket decision"), content
// check downgrades, and evidence-change policy (spec §4.1 "Evidence-change
// policy"). Pure functions over already-computed inputs so they're cheap
// to unit test independently of fetching or denylist matching.

use std::collections::HashMap;

use dc_core::hash::collapse_whitespace;
use dc_denylist::{has_force_yellow, has_hard_red, DenylistHit};

use crate::model::{Bucket, ContentCheckAction, EvidenceChangePolicy, EvidenceSnapshot, LicenseGate, LicenseMap, RuleFired};

/// Everything the tie-break needs, gathered by the orchestrator so this
/// function stays a pure decision (spec §4.1 rules 1-7).
pub struct BucketInputs<'a> {
    pub dl_hits: &'a [DenylistHit],
    pub resolved_spdx: &'a str,
    pub resolved_confidence: f64,
    pub evidence_text: &'a str,
    pub evidence_errored: bool,
    pub license_map: &'a LicenseMap,
    pub license_gates: &'a [LicenseGate],
    pub review_required: bool,
    pub signoff_approved: bool,
}

pub struct BucketResult {
    pub bucket: Bucket,
    pub rules_fired: Vec<RuleFired>,
    pub primary_rule: Option<String>,
    pub restriction_hits: Vec<String>,
}

fn gate(gates: &[LicenseGate], target: LicenseGate) -> bool {
    gates.contains(&target)
}

fn restriction_hits(evidence_text: &str, phrases: &[String]) -> Vec<String> {
    let haystack = collapse_whitespace(evidence_text).to_lowercase();
    phrases
        .iter()
        .filter(|phrase| {
            let needle = collapse_whitespace(phrase).to_lowercase();
            !needle.is_empty() && haystack.contains(&needle)
        })
        .cloned()
        .collect()
}

fn spdx_allowed(resolved: &str, license_map: &LicenseMap) -> bool {
    let in_allowlist = license_map.allowlist_spdx.iter().any(|s| s == resolved);
    let denied = license_map.deny_prefixes.iter().any(|prefix| resolved.starts_with(prefix.as_str()));
    in_allowlist && !denied
}

/// Evaluate the tie-break chain (spec §4.1 rules 1-7), first match wins.
pub fn decide_bucket(inputs: &BucketInputs) -> BucketResult {
    let mut rules_fired = Vec::new();
    let hits = restriction_hits(inputs.evidence_text, &inputs.license_map.restriction_phrases);

    // Rule 1: hard_red denylist hit dominates everything.
    if has_hard_red(inputs.dl_hits) {
        for hit in inputs.dl_hits.iter().filter(|h| matches!(h.severity, dc_denylist::Severity::HardRed)) {
            rules_fired.push(RuleFired {
                rule_id: format!("denylist.{}.{}", hit.kind, hit.pattern),
                rule_type: "denylist".to_string(),
                severity: Some("hard_red".to_string()),
                field: Some(hit.field.clone()),
                pattern: Some(hit.pattern.clone()),
                reason: hit.reason.clone(),
                link: if hit.link.is_empty() { None } else { Some(hit.link.clone()) },
            });
        }
        let primary = rules_fired.first().map(|r| r.rule_id.clone());
        return BucketResult {
            bucket: Bucket::Red,
            rules_fired,
            primary_rule: primary,
            restriction_hits: hits,
        };
    }

    // Rule 2: resolved SPDX matches a deny prefix.
    if let Some(prefix) = inputs.license_map.deny_prefixes.iter().find(|p| inputs.resolved_spdx.starts_with(p.as_str())) {
        let rule = RuleFired {
            rule_id: format!("license.deny_prefix.{prefix}"),
            rule_type: "license_deny_prefix".to_string(),
            severity: None,
            field: None,
            pattern: Some(prefix.clone()),
            reason: format!("resolved SPDX '{}' matches deny prefix '{}'", inputs.resolved_spdx, prefix),
            link: None,
        };
        let primary = rule.rule_id.clone();
        rules_fired.push(rule);
        return BucketResult {
            bucket: Bucket::Red,
            rules_fired,
            primary_rule: Some(primary),
            restriction_hits: hits,
        };
    }

    // Rule 3: evidence fetch errored and the snapshot_terms gate is required.
    if inputs.evidence_errored && gate(inputs.license_gates, LicenseGate::SnapshotTerms) {
        let rule = RuleFired {
            rule_id: "gate.snapshot_terms.fetch_error".to_string(),
            rule_type: "evidence_fetch_error".to_string(),
            severity: None,
            field: None,
            pattern: None,
            reason: "evidence fetch errored while snapshot_terms gate is required".to_string(),
            link: None,
        };
        let primary = rule.rule_id.clone();
        rules_fired.push(rule);
        return BucketResult {
            bucket: Bucket::Yellow,
            rules_fired,
            primary_rule: Some(primary),
            restriction_hits: hits,
        };
    }

    // Rule 4: force_yellow denylist hit.
    if has_force_yellow(inputs.dl_hits) {
        for hit in inputs.dl_hits.iter().filter(|h| matches!(h.severity, dc_denylist::Severity::ForceYellow)) {
            rules_fired.push(RuleFired {
                rule_id: format!("denylist.{}.{}", hit.kind, hit.pattern),
                rule_type: "denylist".to_string(),
                severity: Some("force_yellow".to_string()),
                field: Some(hit.field.clone()),
                pattern: Some(hit.pattern.clone()),
                reason: hit.reason.clone(),
                link: if hit.link.is_empty() { None } else { Some(hit.link.clone()) },
            });
        }
        let primary = rules_fired.first().map(|r| r.rule_id.clone());
        return BucketResult {
            bucket: Bucket::Yellow,
            rules_fired,
            primary_rule: primary,
            restriction_hits: hits,
        };
    }

    // Rule 5: restriction-phrase scan gate with hits.
    if gate(inputs.license_gates, LicenseGate::RestrictionPhraseScan) && !hits.is_empty() {
        let rule = RuleFired {
            rule_id: "gate.restriction_phrase_scan".to_string(),
            rule_type: "restriction_phrase_scan".to_string(),
            severity: None,
            field: None,
            pattern: Some(hits.join(", ")),
            reason: format!("{} restriction phrase(s) found in evidence", hits.len()),
            link: None,
        };
        let primary = rule.rule_id.clone();
        rules_fired.push(rule);
        return BucketResult {
            bucket: Bucket::Yellow,
            rules_fired,
            primary_rule: Some(primary),
            restriction_hits: hits,
        };
    }

    // Rule 6: clean GREEN path.
    let conf_ok = inputs.resolved_confidence >= inputs.license_map.min_license_confidence;
    let manual_review_required = gate(inputs.license_gates, LicenseGate::ManualLegalReview);
    let review_satisfied = !inputs.review_required || inputs.signoff_approved;
    if spdx_allowed(inputs.resolved_spdx, inputs.license_map) && conf_ok && !manual_review_required && review_satisfied {
        let rule = RuleFired {
            rule_id: "license.allowed".to_string(),
            rule_type: "license_allowlist".to_string(),
            severity: None,
            field: None,
            pattern: Some(inputs.resolved_spdx.to_string()),
            reason: "resolved SPDX is allowlisted with sufficient confidence".to_string(),
            link: None,
        };
        let primary = rule.rule_id.clone();
        rules_fired.push(rule);
        return BucketResult {
            bucket: Bucket::Green,
            rules_fired,
            primary_rule: Some(primary),
            restriction_hits: hits,
        };
    }

    // Rule 7: default YELLOW.
    let rule = RuleFired {
        rule_id: "license.default_yellow".to_string(),
        rule_type: "default".to_string(),
        severity: None,
        field: None,
        pattern: None,
        reason: "no allow path matched; routed to manual review".to_string(),
        link: None,
    };
    let primary = rule.rule_id.clone();
    rules_fired.push(rule);
    BucketResult {
        bucket: Bucket::Yellow,
        rules_fired,
        primary_rule: Some(primary),
        restriction_hits: hits,
    }
}

/// Apply content-check downgrades: `block` forces RED; `quarantine`
/// downgrades GREEN to YELLOW and forces the quarantine output pool.
/// Returns the (possibly downgraded) bucket and whether quarantine pool
/// routing is forced.
pub fn apply_content_checks(bucket: Bucket, content_checks: &HashMap<String, ContentCheckAction>) -> (Bucket, bool) {
    if content_checks.values().any(|a| matches!(a, ContentCheckAction::Block)) {
        return (Bucket::Red, false);
    }
    let force_quarantine = content_checks.values().any(|a| matches!(a, ContentCheckAction::Quarantine));
    if force_quarantine && bucket == Bucket::Green {
        return (Bucket::Yellow, true);
    }
    (bucket, force_quarantine)
}

/// The outcome of comparing a signoff's recorded hashes to a fresh
/// evidence snapshot (spec §4.1 "Evidence-change policy").
#[derive(Debug, Clone, Copy, Default)]
pub struct EvidenceChangeResult {
    pub raw_mismatch: bool,
    pub normalized_mismatch: bool,
    pub cosmetic_change: bool,
    pub changed_requires_review: bool,
}

pub fn evaluate_evidence_change(
    signoff_raw_sha: Option<&str>,
    signoff_normalized_sha: Option<&str>,
    snapshot: &EvidenceSnapshot,
    policy: EvidenceChangePolicy,
    cosmetic_policy: crate::model::CosmeticChangePolicy,
) -> EvidenceChangeResult {
    let (Some(prior_raw), Some(prior_normalized)) = (signoff_raw_sha, signoff_normalized_sha) else {
        return EvidenceChangeResult::default();
    };

    let raw_mismatch = prior_raw != snapshot.raw_sha256;
    let normalized_mismatch = prior_normalized != snapshot.normalized_sha256;
    let both_normalized_present = !prior_normalized.is_empty() && !snapshot.normalized_sha256.is_empty();
    let cosmetic_change = raw_mismatch && !normalized_mismatch && both_normalized_present && !snapshot.text_extraction_failed;

    let mut changed_requires_review = match policy {
        EvidenceChangePolicy::Raw => raw_mismatch,
        EvidenceChangePolicy::Normalized => normalized_mismatch,
        EvidenceChangePolicy::Either => raw_mismatch || normalized_mismatch,
    };
    if cosmetic_change && matches!(cosmetic_policy, crate::model::CosmeticChangePolicy::TreatAsChanged) {
        changed_requires_review = true;
    }

    EvidenceChangeResult {
        raw_mismatch,
        normalized_mismatch,
        cosmetic_change,
        changed_requires_review,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CosmeticChangePolicy;
    use chrono::Utc;
    use std::collections::HashMap as Map;

    fn snapshot(raw: &str, normalized: &str, extraction_failed: bool) -> EvidenceSnapshot {
        EvidenceSnapshot {
            url: "https://e.test".to_string(),
            status: "ok".to_string(),
            fetched_at_utc: Utc::now(),
            content_length: Some(10),
            bytes: None,
            raw_sha256: raw.to_string(),
            normalized_sha256: normalized.to_string(),
            normalized_hash_fallback: None,
            text_extracted: Some("x".to_string()),
            text_extraction_failed: extraction_failed,
            raw_changed_from_previous: None,
            normalized_changed_from_previous: None,
            cosmetic_change: false,
            error: None,
            headers_used_redacted: Map::new(),
        }
    }

    #[test]
    fn hard_red_denylist_dominates() {
        let license_map = LicenseMap {
            allowlist_spdx: vec!["MIT".to_string()],
            ..Default::default()
        };
        let hits = vec![DenylistHit {
            field: "id".to_string(),
            pattern: "sci-hub".to_string(),
            kind: "substring".to_string(),
            severity: dc_denylist::Severity::HardRed,
            reason: "known pirate mirror".to_string(),
            link: String::new(),
            rationale: String::new(),
        }];
        let result = decide_bucket(&BucketInputs {
            dl_hits: &hits,
            resolved_spdx: "MIT",
            resolved_confidence: 1.0,
            evidence_text: "",
            evidence_errored: false,
            license_map: &license_map,
            license_gates: &[],
            review_required: false,
            signoff_approved: false,
        });
        assert_eq!(result.bucket, Bucket::Red);
        assert_eq!(result.primary_rule.unwrap(), "denylist.substring.sci-hub");
    }

    #[test]
    fn clean_allowlisted_target_is_green() {
        let license_map = LicenseMap {
            allowlist_spdx: vec!["MIT".to_string()],
            min_license_confidence: 0.5,
            ..Default::default()
        };
        let result = decide_bucket(&BucketInputs {
            dl_hits: &[],
            resolved_spdx: "MIT",
            resolved_confidence: 1.0,
            evidence_text: "MIT License",
            evidence_errored: false,
            license_map: &license_map,
            license_gates: &[],
            review_required: false,
            signoff_approved: false,
        });
        assert_eq!(result.bucket, Bucket::Green);
    }

    #[test]
    fn unreviewed_target_requiring_review_is_yellow_not_green() {
        let license_map = LicenseMap {
            allowlist_spdx: vec!["MIT".to_string()],
            min_license_confidence: 0.5,
            ..Default::default()
        };
        let result = decide_bucket(&BucketInputs {
            dl_hits: &[],
            resolved_spdx: "MIT",
            resolved_confidence: 1.0,
            evidence_text: "MIT License",
            evidence_errored: false,
            license_map: &license_map,
            license_gates: &[],
            review_required: true,
            signoff_approved: false,
        });
        assert_eq!(result.bucket, Bucket::Yellow);
    }

    #[test]
    fn block_content_check_forces_red_even_from_green() {
        let mut checks = Map::new();
        checks.insert("malware_scan".to_string(), ContentCheckAction::Block);
        let (bucket, _) = apply_content_checks(Bucket::Green, &checks);
        assert_eq!(bucket, Bucket::Red);
    }

    #[test]
    fn quarantine_content_check_downgrades_green_to_yellow() {
        let mut checks = Map::new();
        checks.insert("pii_scan".to_string(), ContentCheckAction::Quarantine);
        let (bucket, forced_pool) = apply_content_checks(Bucket::Green, &checks);
        assert_eq!(bucket, Bucket::Yellow);
        assert!(forced_pool);
    }

    #[test]
    fn whitespace_only_change_is_cosmetic_not_review_triggering_under_warn_only() {
        let snap = snapshot("raw2", "norm1", false);
        let result = evaluate_evidence_change(
            Some("raw1"),
            Some("norm1"),
            &snap,
            EvidenceChangePolicy::Either,
            CosmeticChangePolicy::WarnOnly,
        );
        assert!(result.cosmetic_change);
        assert!(result.changed_requires_review, "raw_mismatch under Either policy still requires review");
    }

    #[test]
    fn normalized_policy_ignores_cosmetic_raw_changes() {
        let snap = snapshot("raw2", "norm1", false);
        let result = evaluate_evidence_change(
            Some("raw1"),
            Some("norm1"),
            &snap,
            EvidenceChangePolicy::Normalized,
            CosmeticChangePolicy::WarnOnly,
        );
        assert!(!result.changed_requires_review);
    }
}

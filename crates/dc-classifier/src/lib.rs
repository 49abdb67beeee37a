//! License-classification pipeline (spec §4.1): reads a target catalog,
//! resolves each target's license posture against allow/deny rules and the
//! denylist, and emits GREEN/YELLOW/RED queues with a full audit trail.

pub mod classify;
pub mod decision;
pub mod error;
pub mod evidence;
pub mod manifest;
pub mod model;
pub mod spdx;

pub use classify::{classify, load_license_map, load_targets, ClassifierConfig};
pub use decision::{apply_content_checks, decide_bucket, evaluate_evidence_change, BucketInputs, BucketResult, EvidenceChangeResult};
pub use error::ClassifierError;
pub use evidence::{fetch_evidence, FetchConfig};
pub use manifest::RunSummary;
pub use model::{
    Bucket, ContentCheckAction, DecisionBundle, DownloadSpec, DownloadStrategy, EvidenceChangePolicy, EvidenceSnapshot,
    LicenseEvidence, LicenseGate, LicenseMap, LicenseProfile, NormalizationRule, Override, OutputPool, QueueRow, Routing,
    RuleFired, Signoff, Target,
};
pub use spdx::{resolve as resolve_spdx, SpdxResolution};

// budget.rs — Resource budgets: per-run byte budget and per-target limit
// enforcement (spec §3.1 RunByteBudget / LimitEnforcer, §4.2.5 concurrency,
// §7 limit_exceeded errors).
//
// `RunByteBudget` is the one piece of mutable state shared across worker
// threads in the acquire worker (spec §5 "Shared resources"); every other
// structure here is owned by a single worker.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// The specific limit that was breached, matching the `limit_type` values
/// named in spec §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitType {
    FilesPerTarget,
    BytesPerFile,
    BytesPerTarget,
    RunByteBudget,
}

impl LimitType {
    pub fn as_str(self) -> &'static str {
        match self {
            LimitType::FilesPerTarget => "files_per_target",
            LimitType::BytesPerFile => "bytes_per_file",
            LimitType::BytesPerTarget => "bytes_per_target",
            LimitType::RunByteBudget => "run_byte_budget",
        }
    }
}

/// A structured `limit_exceeded` violation, identifying exactly which
/// budget was breached (spec §3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitViolation {
    pub target_id: String,
    pub limit_type: LimitType,
    pub limit: u64,
    pub observed: u64,
    pub file_label: Option<String>,
}

impl LimitViolation {
    pub fn message(&self) -> String {
        format!(
            "Limit exceeded ({}) for target {}. limit={} observed={}.",
            self.limit_type.as_str(),
            self.target_id,
            self.limit,
            self.observed
        )
    }
}

/// Shared, mutex-guarded run-level byte budget (spec §3.1 / §5). Checked
/// both on size hints before work begins and incrementally after each
/// handler result (spec invariant 7).
#[derive(Debug, Clone)]
pub struct RunByteBudget {
    inner: Arc<Mutex<u64>>,
    limit: u64,
}

impl RunByteBudget {
    pub fn new(limit: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(0)),
            limit,
        }
    }

    pub fn bytes_seen(&self) -> u64 {
        *self.inner.lock().expect("run budget mutex poisoned")
    }

    pub fn exhausted(&self) -> bool {
        self.bytes_seen() >= self.limit
    }

    pub fn check_remaining(&self, target_id: &str, file_label: Option<&str>) -> Option<LimitViolation> {
        let seen = self.bytes_seen();
        if seen >= self.limit {
            Some(LimitViolation {
                target_id: target_id.to_string(),
                limit_type: LimitType::RunByteBudget,
                limit: self.limit,
                observed: seen,
                file_label: file_label.map(str::to_string),
            })
        } else {
            None
        }
    }

    pub fn check_size_hint(&self, target_id: &str, size: u64, file_label: Option<&str>) -> Option<LimitViolation> {
        let seen = self.bytes_seen();
        let projected = seen + size;
        if projected > self.limit {
            Some(LimitViolation {
                target_id: target_id.to_string(),
                limit_type: LimitType::RunByteBudget,
                limit: self.limit,
                observed: projected,
                file_label: file_label.map(str::to_string),
            })
        } else {
            None
        }
    }

    /// Record `size` bytes against the run budget. Returns a violation if
    /// the budget is now over limit — the caller must still have written
    /// the bytes (accounting happens after the fact per spec invariant 7)
    /// but must delete the output it just created.
    pub fn record_bytes(&self, target_id: &str, size: u64, file_label: Option<&str>) -> Option<LimitViolation> {
        let mut guard = self.inner.lock().expect("run budget mutex poisoned");
        *guard += size;
        let seen = *guard;
        drop(guard);
        if seen > self.limit {
            Some(LimitViolation {
                target_id: target_id.to_string(),
                limit_type: LimitType::RunByteBudget,
                limit: self.limit,
                observed: seen,
                file_label: file_label.map(str::to_string),
            })
        } else {
            None
        }
    }
}

/// Per-target limit enforcer: file count, per-file byte cap, per-target
/// byte cap, delegating to the shared `RunByteBudget` when present. Owned
/// exclusively by the worker handling one target (spec §4.2.5: "per-target
/// enforcer is owned by the worker, no sharing").
#[derive(Debug, Clone)]
pub struct TargetLimitEnforcer {
    pub target_id: String,
    pub limit_files: Option<u64>,
    pub max_bytes_per_target: Option<u64>,
    pub max_bytes_per_file: Option<u64>,
    pub run_budget: Option<RunByteBudget>,
    files_seen: u64,
    bytes_seen: u64,
}

impl TargetLimitEnforcer {
    pub fn new(
        target_id: impl Into<String>,
        limit_files: Option<u64>,
        max_bytes_per_target: Option<u64>,
        max_bytes_per_file: Option<u64>,
        run_budget: Option<RunByteBudget>,
    ) -> Self {
        Self {
            target_id: target_id.into(),
            limit_files,
            max_bytes_per_target,
            max_bytes_per_file,
            run_budget,
            files_seen: 0,
            bytes_seen: 0,
        }
    }

    /// Combine an explicit `max_bytes_per_target` override with the
    /// target's own `download.max_bytes`, taking the stricter of the two —
    /// mirrors the reference implementation's `build_target_limit_enforcer`.
    pub fn with_download_cap(mut self, download_max_bytes: Option<u64>) -> Self {
        self.max_bytes_per_target = match (self.max_bytes_per_target, download_max_bytes) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (None, Some(b)) => Some(b),
            (a, None) => a,
        };
        self
    }

    pub fn bytes_seen(&self) -> u64 {
        self.bytes_seen
    }

    pub fn start_file(&mut self, file_label: Option<&str>) -> Option<LimitViolation> {
        if let Some(limit) = self.limit_files {
            if self.files_seen >= limit {
                return Some(LimitViolation {
                    target_id: self.target_id.clone(),
                    limit_type: LimitType::FilesPerTarget,
                    limit,
                    observed: self.files_seen,
                    file_label: file_label.map(str::to_string),
                });
            }
        }
        self.files_seen += 1;
        None
    }

    pub fn check_remaining_bytes(&self, file_label: Option<&str>) -> Option<LimitViolation> {
        if let Some(budget) = &self.run_budget {
            if let Some(v) = budget.check_remaining(&self.target_id, file_label) {
                return Some(v);
            }
        }
        if let Some(limit) = self.max_bytes_per_target {
            if self.bytes_seen >= limit {
                return Some(LimitViolation {
                    target_id: self.target_id.clone(),
                    limit_type: LimitType::BytesPerTarget,
                    limit,
                    observed: self.bytes_seen,
                    file_label: file_label.map(str::to_string),
                });
            }
        }
        None
    }

    pub fn check_size_hint(&self, size: Option<u64>, file_label: Option<&str>) -> Option<LimitViolation> {
        let size = size?;
        if let Some(budget) = &self.run_budget {
            if let Some(v) = budget.check_size_hint(&self.target_id, size, file_label) {
                return Some(v);
            }
        }
        if let Some(limit) = self.max_bytes_per_file {
            if size > limit {
                return Some(LimitViolation {
                    target_id: self.target_id.clone(),
                    limit_type: LimitType::BytesPerFile,
                    limit,
                    observed: size,
                    file_label: file_label.map(str::to_string),
                });
            }
        }
        if let Some(limit) = self.max_bytes_per_target {
            if self.bytes_seen + size > limit {
                return Some(LimitViolation {
                    target_id: self.target_id.clone(),
                    limit_type: LimitType::BytesPerTarget,
                    limit,
                    observed: self.bytes_seen + size,
                    file_label: file_label.map(str::to_string),
                });
            }
        }
        None
    }

    /// Record bytes actually transferred. Mirrors the Python reference:
    /// accounting happens after the write, so a breach here means the
    /// caller must delete what it just wrote (spec invariant 7).
    pub fn record_bytes(&mut self, size: u64, file_label: Option<&str>) -> Option<LimitViolation> {
        self.bytes_seen += size;
        let run_violation = self
            .run_budget
            .as_ref()
            .and_then(|b| b.record_bytes(&self.target_id, size, file_label));

        if let Some(limit) = self.max_bytes_per_file {
            if size > limit {
                return Some(LimitViolation {
                    target_id: self.target_id.clone(),
                    limit_type: LimitType::BytesPerFile,
                    limit,
                    observed: size,
                    file_label: file_label.map(str::to_string),
                });
            }
        }
        if let Some(limit) = self.max_bytes_per_target {
            if self.bytes_seen > limit {
                return Some(LimitViolation {
                    target_id: self.target_id.clone(),
                    limit_type: LimitType::BytesPerTarget,
                    limit,
                    observed: self.bytes_seen,
                    file_label: file_label.map(str::to_string),
                });
            }
        }
        run_violation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_per_target_is_enforced() {
        let mut enforcer = TargetLimitEnforcer::new("t1", Some(1), None, None, None);
        assert!(enforcer.start_file(None).is_none());
        let violation = enforcer.start_file(None).unwrap();
        assert_eq!(violation.limit_type, LimitType::FilesPerTarget);
    }

    #[test]
    fn bytes_per_file_is_enforced_on_size_hint() {
        let enforcer = TargetLimitEnforcer::new("t1", None, None, Some(100), None);
        assert!(enforcer.check_size_hint(Some(50), None).is_none());
        let violation = enforcer.check_size_hint(Some(200), None).unwrap();
        assert_eq!(violation.limit_type, LimitType::BytesPerFile);
    }

    /// Testable property 4 (spec §8): sum(content_length) must stay within
    /// per-target and run budgets; breach surfaces as `limit_exceeded`.
    #[test]
    fn run_budget_shared_across_targets() {
        let run_budget = RunByteBudget::new(150);
        let mut a = TargetLimitEnforcer::new("a", None, None, None, Some(run_budget.clone()));
        let mut b = TargetLimitEnforcer::new("b", None, None, None, Some(run_budget.clone()));

        assert!(a.record_bytes(100, None).is_none());
        assert!(!run_budget.exhausted());
        let violation = b.record_bytes(100, None).unwrap();
        assert_eq!(violation.limit_type, LimitType::RunByteBudget);
        assert!(run_budget.exhausted());
    }

    #[test]
    fn download_cap_takes_the_stricter_limit() {
        let enforcer = TargetLimitEnforcer::new("t1", None, Some(1000), None, None).with_download_cap(Some(500));
        assert_eq!(enforcer.max_bytes_per_target, Some(500));
        let enforcer = TargetLimitEnforcer::new("t1", None, None, None, None).with_download_cap(Some(500));
        assert_eq!(enforcer.max_bytes_per_target, Some(500));
    }
}

// none.rs — the explicit "no download" strategy, and the fallback used
// for any strategy name the registry doesn't recognize (spec §4.2.1:
// "unknown or `none` strategy => {status: noop, reason: unsupported: ...}").

use std::path::Path;

use dc_classifier::QueueRow;
use dc_core::budget::TargetLimitEnforcer;

use crate::error::AcquireError;
use crate::model::{AcquireContext, FileResult};
use crate::registry::Strategy;

pub struct NoneStrategy;

impl Strategy for NoneStrategy {
    fn name(&self) -> &'static str {
        "none"
    }

    fn acquire(
        &self,
        _row: &QueueRow,
        _out_dir: &Path,
        _limiter: &mut TargetLimitEnforcer,
        _ctx: &AcquireContext,
    ) -> Result<Vec<FileResult>, AcquireError> {
        Ok(vec![FileResult::noop("strategy is 'none'; no download configured")])
    }
}

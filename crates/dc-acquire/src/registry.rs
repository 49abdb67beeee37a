// registry.rs — the strategy trait and name-keyed dispatch table (spec
// §4.2.1: "unknown or `none` strategy => noop with reason").

use std::collections::HashMap;
use std::path::Path;

use dc_classifier::QueueRow;
use dc_core::budget::TargetLimitEnforcer;

use crate::error::AcquireError;
use crate::model::{AcquireContext, FileResult};

/// One acquisition strategy. Implementations write into `out_dir` and
/// report per-file outcomes; they never decide the target-level rollup
/// (that's `rollup_status`, applied by the dispatcher).
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn acquire(
        &self,
        row: &QueueRow,
        out_dir: &Path,
        limiter: &mut TargetLimitEnforcer,
        ctx: &AcquireContext,
    ) -> Result<Vec<FileResult>, AcquireError>;
}

pub struct StrategyRegistry {
    strategies: HashMap<&'static str, Box<dyn Strategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self { strategies: HashMap::new() }
    }

    pub fn register(&mut self, strategy: Box<dyn Strategy>) -> &mut Self {
        self.strategies.insert(strategy.name(), strategy);
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Strategy> {
        self.strategies.get(name).map(|b| b.as_ref())
    }

    /// The full set of strategies described by spec §4.2.4, registered
    /// under the worker's default configuration.
    pub fn default_set() -> Self {
        let mut reg = Self::new();
        reg.register(Box::new(crate::strategies::http::HttpStrategy))
            .register(Box::new(crate::strategies::ftp::FtpStrategy))
            .register(Box::new(crate::strategies::git::GitStrategy))
            .register(Box::new(crate::strategies::zenodo::ZenodoStrategy))
            .register(Box::new(crate::strategies::zenodo::FigshareStrategy))
            .register(Box::new(crate::strategies::s3::S3SyncStrategy))
            .register(Box::new(crate::strategies::s3::AwsRequesterPaysStrategy))
            .register(Box::new(crate::strategies::huggingface::HuggingfaceStrategy))
            .register(Box::new(crate::strategies::torrent::TorrentStrategy))
            .register(Box::new(crate::strategies::github_release::GithubReleaseStrategy))
            .register(Box::new(crate::strategies::none::NoneStrategy));
        reg
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::default_set()
    }
}

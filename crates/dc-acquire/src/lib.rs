//! The acquire worker (spec §4.2): reads a GREEN/YELLOW queue written by
//! the classifier and fetches each target's payload through a strategy
//! handler, bounded by a shared run byte budget and a configurable
//! worker pool.

pub mod acquire;
pub mod error;
pub mod manifest;
pub mod model;
pub mod registry;
pub mod strategies;
pub mod worker;

pub use acquire::{run_acquire, AcquireConfig};
pub use error::AcquireError;
pub use manifest::{acquire_done_path, download_manifest_path, output_dir, AcquireSummary};
pub use model::{rollup_status, AcquireContext, DownloadManifest, FileResult, HandlerStatus, TargetAcquireResult};
pub use registry::{Strategy, StrategyRegistry};

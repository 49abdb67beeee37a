//! `dc-acquire` — thin wrapper around `dc_acquire::run_acquire` (spec
//! §4.2). Standalone sibling of `dc acquire`; same flags, same config
//! builder.

use std::sync::Arc;

use clap::Parser;
use dc_acquire::StrategyRegistry;
use dc_cli::common::{exit_code, init_logging, CommonArgs};

/// Download every GREEN/approved-YELLOW target in a queue.
#[derive(Parser)]
#[command(name = "dc-acquire", version, about)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.common.quiet);
    cli.common.validate_roots()?;

    let config = cli.common.acquire_config();
    let registry = Arc::new(StrategyRegistry::default_set());

    let summary = dc_acquire::run_acquire(&config, registry)?;
    let errors = summary.counts.get("error").copied().unwrap_or(0);
    if !cli.common.quiet {
        println!(
            "acquired {} target(s) ({} byte(s)): {:?}",
            summary.total_targets, summary.bytes_total, summary.counts
        );
    }
    std::process::exit(exit_code(cli.common.strict, errors > 0));
}

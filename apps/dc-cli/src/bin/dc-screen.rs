//! `dc-screen` — thin wrapper around `dc_screen::screen` (spec §4.3).
//! Standalone sibling of `dc screen`; same flags, same config builder.

use clap::Parser;
use dc_cli::common::{exit_code, init_logging, CommonArgs};

/// Filter/transform a yellow queue's raw records into sharded output.
#[derive(Parser)]
#[command(name = "dc-screen", version, about)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.common.quiet);
    cli.common.validate_roots()?;
    cli.common.reset_checkpoint_if_requested()?;

    let config = cli.common.screen_config();
    let summary = dc_screen::screen(&config)?;
    if !cli.common.quiet {
        println!(
            "screened {} target(s): {} accepted, {} pitched ({} error(s))",
            summary.total_targets, summary.records_accepted, summary.records_pitched, summary.errors
        );
    }
    std::process::exit(exit_code(cli.common.strict, summary.errors > 0));
}

//! `dc-classify` — thin wrapper around `dc_classifier::classify` (spec
//! §4.1). Standalone sibling of `dc classify`; same flags, same config
//! builder.

use clap::Parser;
use dc_cli::common::{exit_code, init_logging, CommonArgs};

/// Evaluate a target catalog's license posture into GREEN/YELLOW/RED queues.
#[derive(Parser)]
#[command(name = "dc-classify", version, about)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.common.quiet);
    cli.common.validate_roots()?;
    cli.common.reset_checkpoint_if_requested()?;

    let targets = cli.common.require_targets()?;
    let license_map = cli.common.require_license_map()?;
    let config = cli.common.classifier_config(&targets, &license_map);

    let summary = dc_classifier::classify(&config)?;
    if !cli.common.quiet {
        println!(
            "classified {} target(s): {:?} ({} error(s))",
            summary.total_targets, summary.counts, summary.errors
        );
    }
    std::process::exit(exit_code(cli.common.strict, summary.errors > 0));
}

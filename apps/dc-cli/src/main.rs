//! # dc
//!
//! Command-line interface for the dataset-collector pipeline.
//!
//! - `dc classify` — evaluate a target catalog into GREEN/YELLOW/RED queues
//! - `dc acquire` — download a queue's targets to the staged raw layout
//! - `dc screen` — filter/transform a yellow queue into sharded output
//!
//! Each subcommand is also available as a standalone binary
//! (`dc-classify`, `dc-acquire`, `dc-screen`) taking the same flags.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use dc_acquire::StrategyRegistry;
use dc_cli::common::{exit_code, init_logging, CommonArgs};

#[derive(Parser)]
#[command(name = "dc", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a target catalog's license posture into GREEN/YELLOW/RED.
    Classify {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Download a queue's GREEN/approved-YELLOW targets.
    Acquire {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Filter/transform a yellow queue's raw records into sharded output.
    Screen {
        #[command(flatten)]
        common: CommonArgs,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Classify { common } => {
            init_logging(common.quiet);
            common.validate_roots()?;
            common.reset_checkpoint_if_requested()?;

            let targets = common.require_targets()?;
            let license_map = common.require_license_map()?;
            let config = common.classifier_config(&targets, &license_map);

            let summary = dc_classifier::classify(&config)?;
            if !common.quiet {
                println!(
                    "classified {} target(s): {:?} ({} error(s))",
                    summary.total_targets, summary.counts, summary.errors
                );
            }
            std::process::exit(exit_code(common.strict, summary.errors > 0));
        }
        Commands::Acquire { common } => {
            init_logging(common.quiet);
            common.validate_roots()?;

            let config = common.acquire_config();
            let registry = Arc::new(StrategyRegistry::default_set());
            let summary = dc_acquire::run_acquire(&config, registry)?;
            let errors = summary.counts.get("error").copied().unwrap_or(0);
            if !common.quiet {
                println!(
                    "acquired {} target(s) ({} byte(s)): {:?}",
                    summary.total_targets, summary.bytes_total, summary.counts
                );
            }
            std::process::exit(exit_code(common.strict, errors > 0));
        }
        Commands::Screen { common } => {
            init_logging(common.quiet);
            common.validate_roots()?;
            common.reset_checkpoint_if_requested()?;

            let config = common.screen_config();
            let summary = dc_screen::screen(&config)?;
            if !common.quiet {
                println!(
                    "screened {} target(s): {} accepted, {} pitched ({} error(s))",
                    summary.total_targets, summary.records_accepted, summary.records_pitched, summary.errors
                );
            }
            std::process::exit(exit_code(common.strict, summary.errors > 0));
        }
    }
}

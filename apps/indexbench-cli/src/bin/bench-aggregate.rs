//! Cross-run aggregator
//!
//! Reduces the final value of one statistics column across every repeat of
//! each config and appends `mean,stddev` cells for the label to a results
//! table.
//!
//! Long flags take one or two dashes, so configs written for
//! `-testdir out -column avg_mb_per_second -configs ram,mmap` keep working.

use anyhow::{bail, Result};
use clap::Parser;
use indexbench_cli::{init_tracing, parse_args, parse_configs};
use indexbench_core::aggregate::{self, AggregateRequest};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "bench-aggregate")]
#[command(version, about = "Aggregate repeated benchmark runs into a results table")]
struct Cli {
    /// Directory holding <label>/<config>/<run>/<filename>
    #[arg(long)]
    testdir: PathBuf,

    /// Statistics column to aggregate
    #[arg(long)]
    column: String,

    /// Comma separated configs, in results table order
    #[arg(long)]
    configs: String,

    /// Results table to append to
    #[arg(long)]
    source: PathBuf,

    /// Statistics file name in each run directory
    #[arg(long)]
    filename: String,

    /// Label of the row to append
    #[arg(long)]
    label: String,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn run(cli: Cli) -> Result<()> {
    let configs = parse_configs(&cli.configs);
    if configs.is_empty() {
        bail!("--configs names no configs");
    }

    let request = AggregateRequest {
        testdir: cli.testdir,
        label: cli.label,
        configs,
        column: cli.column,
        filename: cli.filename,
        source: cli.source,
    };
    let outcome = aggregate::run(&request)?;

    for (config, summary) in &outcome.summaries {
        info!(
            "{}: mean {:.6}, stddev {:.6} over {} runs",
            config, summary.mean, summary.std_dev, summary.count
        );
    }
    info!("Appended row for '{}' to {}", request.label, request.source.display());
    Ok(())
}

fn main() -> ExitCode {
    let cli: Cli = parse_args();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("bench-aggregate failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

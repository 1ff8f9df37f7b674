//! Benchmark orchestrator
//!
//! Runs every test of a JSON configuration: setup once per config, the test
//! commands `repeat` times per config, then the aggregate commands.
//!
//! Long flags take one or two dashes: `bench-runner -config tests.json -only indexing`.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use indexbench_cli::{init_tracing, parse_args};
use indexbench_core::orchestrator::{ProcessRunner, RunOrchestrator, TestConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "bench-runner")]
#[command(version, about = "Run benchmark tests across configs and repeats")]
struct Cli {
    /// Test configuration file (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Label for this execution (default: today's date)
    #[arg(long)]
    label: Option<String>,

    /// Run only this test
    #[arg(long)]
    only: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn run(cli: Cli) -> Result<()> {
    let config = TestConfig::from_file(&cli.config)
        .with_context(|| format!("loading test config {}", cli.config.display()))?;
    let label = cli
        .label
        .unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string());

    let mut orchestrator =
        RunOrchestrator::new(config, label, ProcessRunner::new()).only(cli.only);
    let report = orchestrator.run()?;

    info!(
        "Ran {} tests ({} skipped), {} commands",
        report.tests_run.len(),
        report.tests_skipped.len(),
        report.commands_run
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli: Cli = parse_args();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("bench-runner failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

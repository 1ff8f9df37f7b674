//! Shared plumbing for the `bench-*` command line tools
//!
//! Every tool takes its long flags with either one or two dashes, so
//! `bench-aggregate -testdir out -label v1` and
//! `bench-aggregate --testdir out --label v1` are the same invocation.

use anyhow::{bail, Context, Result};
use clap::{Command, Parser};
use indexbench_core::QueryKind;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the stderr log subscriber.
///
/// Logs go to stderr so stdout stays free for statistics CSV and echoed
/// command output. A set `RUST_LOG` replaces the level chosen by `verbose`.
pub fn init_tracing(verbose: bool) {
    tracing_subscriber::registry()
        .with(log_filter(verbose))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Parse the process arguments, accepting single-dash long flags
pub fn parse_args<P: Parser>() -> P {
    let command = P::command();
    P::parse_from(single_dash_to_long(std::env::args_os(), &command))
}

/// Rewrite `-name` and `-name=value` to `--name` forms when `name` is a long
/// flag of `command` or one of its subcommands.
///
/// The program name, short flags, values and everything after `--` are left
/// alone.
pub fn single_dash_to_long<I>(args: I, command: &Command) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut longs = Vec::new();
    collect_long_flags(command, &mut longs);

    let mut passthrough = false;
    args.into_iter()
        .enumerate()
        .map(|(position, arg)| {
            if position == 0 || passthrough {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }
            let Some(flag) = text.strip_prefix('-').filter(|rest| !rest.starts_with('-')) else {
                return arg;
            };
            let name = flag.split_once('=').map_or(flag, |(name, _)| name);
            if name.len() > 1 && longs.iter().any(|long| long == name) {
                OsString::from(format!("-{}", text))
            } else {
                arg
            }
        })
        .collect()
}

fn collect_long_flags(command: &Command, longs: &mut Vec<String>) {
    for arg in command.get_arguments() {
        longs.extend(arg.get_long().map(str::to_string));
        longs.extend(arg.get_all_aliases().into_iter().flatten().map(str::to_string));
    }
    for subcommand in command.get_subcommands() {
        collect_long_flags(subcommand, longs);
    }
}

fn log_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Parse `500ms`, `30s`, `2m`, `1h` or a bare number of seconds
pub fn parse_duration(input: &str) -> Result<Duration> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(input.len());
    let (number, unit) = input.split_at(split);
    if number.is_empty() {
        bail!("'{}' does not start with a number", input);
    }
    let value: f64 = number
        .parse()
        .with_context(|| format!("invalid number in duration '{}'", input))?;

    let seconds = match unit.trim() {
        "" | "s" => value,
        "ms" => value / 1_000.0,
        "m" => value * 60.0,
        "h" => value * 3_600.0,
        other => bail!("unknown duration unit '{}' in '{}'", other, input),
    };
    Duration::try_from_secs_f64(seconds)
        .with_context(|| format!("duration '{}' is out of range", input))
}

pub fn parse_query_kind(input: &str) -> Result<QueryKind> {
    Ok(input.trim().parse()?)
}

/// `stats.csv` becomes `stats-<phase>.csv`
pub fn phase_path(path: &Path, phase: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, phase, ext.to_string_lossy()),
        None => format!("{}-{}", stem, phase),
    };
    path.with_file_name(name)
}

/// Split a comma separated config list, dropping empty entries
pub fn parse_configs(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|config| !config.is_empty())
        .map(str::to_string)
        .collect()
}

/// Statistics destination: the given file (parent directories created) or stdout
pub fn stats_writer(path: Option<&Path>) -> Result<Box<dyn Write + Send>> {
    let Some(path) = path else {
        return Ok(Box::new(io::stdout()));
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("creating statistics file {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

//! Rendering and executing configured commands.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::process;
use tracing::{debug, info};

use super::config::Command;
use super::vars::Variables;
use crate::error::{BenchError, Result};

/// A [`Command`] with every template resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCommand {
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl Command {
    /// Resolve every argument and environment value against `vars`.
    ///
    /// Nothing is looked up or spawned here, so an unknown variable fails
    /// before any side effect.
    pub fn render(&self, vars: &Variables) -> Result<RenderedCommand> {
        let args = self
            .args
            .iter()
            .map(|arg| vars.resolve(arg))
            .collect::<Result<Vec<_>>>()?;
        let env = self
            .env
            .iter()
            .map(|(key, value)| Ok((key.clone(), vars.resolve(value)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(RenderedCommand {
            command: self.name.clone(),
            args,
            env,
        })
    }
}

/// Executes rendered commands for the orchestrator
pub trait CommandRunner {
    fn run(&mut self, command: &RenderedCommand) -> Result<()>;
}

/// Runs commands as child processes.
///
/// The child inherits this process's environment plus the command's own
/// entries. Its stdout and stderr share one pipe, so the captured output keeps
/// the order the child wrote it in. The output is echoed to `echo` once the
/// child exits and logged at debug level.
pub struct ProcessRunner<W: Write = io::Stdout> {
    echo: W,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self { echo: io::stdout() }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> ProcessRunner<W> {
    pub fn with_echo(echo: W) -> Self {
        Self { echo }
    }

    pub fn into_echo(self) -> W {
        self.echo
    }
}

impl<W: Write> CommandRunner for ProcessRunner<W> {
    fn run(&mut self, command: &RenderedCommand) -> Result<()> {
        let path = which::which(&command.command).map_err(|e| BenchError::CommandLookup {
            command: command.command.clone(),
            message: e.to_string(),
        })?;
        info!("Using command: {}", path.display());
        info!("With args: {:?}", command.args);

        let failed = |e: io::Error, output: String| BenchError::CommandExecution {
            command: command.command.clone(),
            message: e.to_string(),
            output,
        };

        let (mut reader, writer) = io::pipe().map_err(|e| failed(e, String::new()))?;
        let stdout = writer.try_clone().map_err(|e| failed(e, String::new()))?;
        // The builder owns both write ends and is dropped with this statement,
        // so the read below ends when the child exits
        let mut child = process::Command::new(&path)
            .args(&command.args)
            .envs(&command.env)
            .stdout(stdout)
            .stderr(writer)
            .spawn()
            .map_err(|e| failed(e, String::new()))?;

        let mut captured = Vec::new();
        let read = reader.read_to_end(&mut captured);
        let status = child.wait();
        let combined = String::from_utf8_lossy(&captured).into_owned();

        self.echo.write_all(combined.as_bytes())?;
        self.echo.flush()?;
        debug!("Output of {}:\n{}", command.command, combined);

        read.map_err(|e| failed(e, combined.clone()))?;
        let status = status.map_err(|e| failed(e, combined.clone()))?;
        if !status.success() {
            return Err(BenchError::CommandExecution {
                command: command.command.clone(),
                message: format!("exited with {}", status),
                output: combined,
            });
        }
        Ok(())
    }
}

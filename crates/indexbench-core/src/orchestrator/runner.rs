//! Test, config and repeat sequencing.

use std::path::PathBuf;
use tempfile::TempDir;
use tracing::{error, info, instrument};

use super::command::CommandRunner;
use super::config::{Command, TestConfig, TestSpec};
use super::vars::{
    Variables, ALL_CONFIGS, CONFIG_NAME, CONFIG_TMP_DIR, EXEC_LABEL, RUN_NUMBER, TEST_NAME,
    TMP_DIR,
};
use crate::error::{BenchError, Result};

const TEMP_PREFIX: &str = "indexbench";

/// What an orchestrator run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Tests executed, in order
    pub tests_run: Vec<String>,
    /// Tests skipped because of an `only` filter
    pub tests_skipped: Vec<String>,
    pub commands_run: usize,
}

/// Drives every test of a [`TestConfig`] through a [`CommandRunner`].
///
/// For each test (in name order), for each config: a config-scoped temp
/// directory is created and setup runs once; then every repeat gets a fresh
/// temp directory and runs the test commands. After all configs,
/// `allConfigs` is set and the aggregate commands run once. Temp
/// directories are removed on every path out, including failure. The first
/// failing command stops the whole run.
pub struct RunOrchestrator<R: CommandRunner> {
    config: TestConfig,
    label: String,
    runner: R,
    only: Option<String>,
    temp_root: Option<PathBuf>,
    vars: Variables,
    commands_run: usize,
}

impl<R: CommandRunner> RunOrchestrator<R> {
    pub fn new(config: TestConfig, label: impl Into<String>, runner: R) -> Self {
        let vars = Variables::new(config.vars.clone());
        Self {
            config,
            label: label.into(),
            runner,
            only: None,
            temp_root: None,
            vars,
            commands_run: 0,
        }
    }

    /// Run only the named test
    pub fn only(mut self, test: Option<String>) -> Self {
        self.only = test.filter(|name| !name.is_empty());
        self
    }

    /// Create temp directories under `root` instead of the system temp dir
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    /// Variables as the last executed command saw them
    pub fn variables(&self) -> &Variables {
        &self.vars
    }

    pub fn into_runner(self) -> R {
        self.runner
    }

    pub fn run(&mut self) -> Result<RunReport> {
        if let Some(only) = &self.only {
            if !self.config.tests.contains_key(only) {
                return Err(BenchError::config(
                    "only",
                    format!("no test named '{}'", only),
                ));
            }
        }

        info!("Using label: {}", self.label);
        self.vars.set(EXEC_LABEL, self.label.clone());

        let mut report = RunReport::default();
        let tests: Vec<(String, TestSpec)> = self
            .config
            .tests
            .iter()
            .map(|(name, spec)| (name.clone(), spec.clone()))
            .collect();

        for (name, spec) in tests {
            if self.only.as_deref().is_some_and(|only| only != name) {
                info!("Skipping test: {}", name);
                report.tests_skipped.push(name);
                continue;
            }
            self.run_test(&name, &spec)?;
            report.tests_run.push(name);
        }

        report.commands_run = self.commands_run;
        info!(
            "Run complete: {} tests, {} commands",
            report.tests_run.len(),
            report.commands_run
        );
        Ok(report)
    }

    #[instrument(skip(self, spec))]
    fn run_test(&mut self, test: &str, spec: &TestSpec) -> Result<()> {
        info!("Preparing for test {}", test);
        self.vars.set(TEST_NAME, test);

        for config in &spec.configs {
            self.run_config(config, spec)?;
        }

        self.vars.set(ALL_CONFIGS, spec.configs.join(","));
        info!("Running {} aggregates", spec.aggregates.len());
        self.execute_all(&spec.aggregates)
    }

    #[instrument(skip(self, spec))]
    fn run_config(&mut self, config: &str, spec: &TestSpec) -> Result<()> {
        info!("Preparing configuration '{}'", config);
        self.vars.set(CONFIG_NAME, config);

        let config_dir = self.temp_dir()?;
        let config_path = config_dir.path().to_string_lossy().into_owned();
        self.vars.set(CONFIG_TMP_DIR, config_path.clone());
        self.vars.set(TMP_DIR, config_path);

        let outcome = self.run_setup_and_repeats(spec);
        info!("Removing config tmpDir: {}", config_dir.path().display());
        let cleanup = config_dir.close();
        outcome?;
        cleanup?;
        Ok(())
    }

    fn run_setup_and_repeats(&mut self, spec: &TestSpec) -> Result<()> {
        info!("Running setup");
        self.execute_all(&spec.setup)?;

        info!("Running the requested {} times", spec.repeat);
        for run in 0..spec.repeat {
            self.vars.set(RUN_NUMBER, run.to_string());
            let run_dir = self.temp_dir()?;
            self.vars
                .set(TMP_DIR, run_dir.path().to_string_lossy().into_owned());

            let outcome = self.execute_all(&spec.tests);
            let cleanup = run_dir.close();
            outcome?;
            cleanup?;
            info!("Finished run {}", run);
        }
        Ok(())
    }

    fn execute_all(&mut self, commands: &[Command]) -> Result<()> {
        commands.iter().try_for_each(|command| self.execute(command))
    }

    fn execute(&mut self, command: &Command) -> Result<()> {
        let rendered = command.render(&self.vars)?;
        if let Err(e) = self.runner.run(&rendered) {
            error!(
                "Command '{}' failed (test {:?}, config {:?}, run {:?}): {}",
                rendered.command,
                self.vars.get(TEST_NAME),
                self.vars.get(CONFIG_NAME),
                self.vars.get(RUN_NUMBER),
                e
            );
            return Err(e);
        }
        self.commands_run += 1;
        Ok(())
    }

    fn temp_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX);
        let dir = match &self.temp_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }
}

//! Orchestrator sequencing tests
//!
//! Drives a full test configuration through a recording runner, so no
//! processes are spawned.
//!
//! Run with: cargo test -p indexbench-core --test orchestrator_flow

use indexbench_core::orchestrator::{
    CommandRunner, RenderedCommand, RunOrchestrator, TestConfig,
};
use indexbench_core::{BenchError, Result};
use pretty_assertions::assert_eq;
use std::path::Path;

/// Records each command along with whether its temp dir existed at the time
#[derive(Default)]
struct RecordingRunner {
    calls: Vec<(RenderedCommand, bool)>,
}

impl CommandRunner for RecordingRunner {
    fn run(&mut self, command: &RenderedCommand) -> Result<()> {
        let dir_exists = command
            .env
            .get("DIR")
            .map(|dir| Path::new(dir).is_dir())
            .unwrap_or(false);
        self.calls.push((command.clone(), dir_exists));
        Ok(())
    }
}

impl RecordingRunner {
    fn phase(&self, name: &str) -> Vec<&RenderedCommand> {
        self.calls
            .iter()
            .map(|(command, _)| command)
            .filter(|command| command.command == name)
            .collect()
    }
}

const CONFIG: &str = r#"{
    "vars": { "corpus": "/data/enwiki.txt" },
    "tests": {
        "indexing": {
            "setup": [
                { "command": "setup", "args": ["{{configName}}", "{{configTmpDir}}"],
                  "env": { "DIR": "{{tmpDir}}" } }
            ],
            "tests": [
                { "command": "test",
                  "args": ["{{ .corpus }}", "{{configName}}", "{{runNumber}}", "{{execLabel}}", "{{testName}}"],
                  "env": { "DIR": "{{tmpDir}}" } }
            ],
            "repeat": 3,
            "configs": ["A", "B"],
            "aggregates": [
                { "command": "aggregate", "args": ["--configs", "{{allConfigs}}", "--label", "{{execLabel}}"] }
            ]
        }
    }
}"#;

// ============================================================================
// Sequencing
// ============================================================================

#[test]
fn test_setup_repeat_and_aggregate_counts() {
    let temp_root = tempfile::tempdir().unwrap();
    let config = TestConfig::from_str(CONFIG).unwrap();
    let mut orchestrator = RunOrchestrator::new(config, "v1.0", RecordingRunner::default())
        .with_temp_root(temp_root.path());

    let report = orchestrator.run().unwrap();
    assert_eq!(report.tests_run, vec!["indexing"]);
    assert_eq!(report.commands_run, 2 + 6 + 1);

    let runner = orchestrator.into_runner();

    let setups: Vec<&str> = runner
        .phase("setup")
        .iter()
        .map(|c| c.args[0].as_str())
        .collect();
    assert_eq!(setups, vec!["A", "B"]);

    let runs: Vec<(String, String)> = runner
        .phase("test")
        .iter()
        .map(|c| (c.args[1].clone(), c.args[2].clone()))
        .collect();
    let expected: Vec<(String, String)> = ["A", "B"]
        .iter()
        .flat_map(|config| (0..3).map(move |run| (config.to_string(), run.to_string())))
        .collect();
    assert_eq!(runs, expected);

    for test in runner.phase("test") {
        assert_eq!(test.args[0], "/data/enwiki.txt");
        assert_eq!(test.args[3], "v1.0");
        assert_eq!(test.args[4], "indexing");
    }

    let aggregates = runner.phase("aggregate");
    assert_eq!(aggregates.len(), 1);
    assert_eq!(aggregates[0].args, vec!["--configs", "A,B", "--label", "v1.0"]);

    // Aggregates run after every config finished
    let (last, _) = runner.calls.last().unwrap();
    assert_eq!(last.command, "aggregate");
}

#[test]
fn test_temp_dirs_fresh_per_repeat_and_removed() {
    let temp_root = tempfile::tempdir().unwrap();
    let config = TestConfig::from_str(CONFIG).unwrap();
    let mut orchestrator = RunOrchestrator::new(config, "v1.0", RecordingRunner::default())
        .with_temp_root(temp_root.path());
    orchestrator.run().unwrap();
    let runner = orchestrator.into_runner();

    // Every setup and test command saw an existing directory
    assert!(runner
        .calls
        .iter()
        .filter(|(c, _)| c.command != "aggregate")
        .all(|(_, existed)| *existed));

    let run_dirs: Vec<&String> = runner.phase("test").iter().map(|c| &c.env["DIR"]).collect();
    let mut unique = run_dirs.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 6);

    // Setup sees the config directory, tests never do
    for setup in runner.phase("setup") {
        assert_eq!(setup.env["DIR"], setup.args[1]);
        assert!(!run_dirs.contains(&&setup.args[1]));
    }

    for dir in run_dirs {
        assert!(!Path::new(dir).exists());
        assert!(Path::new(dir)
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("indexbench"));
    }
    assert!(std::fs::read_dir(temp_root.path()).unwrap().next().is_none());
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_unresolved_variable_spawns_nothing() {
    let config = TestConfig::from_str(
        r#"{ "tests": { "t": {
            "tests": [{ "command": "test", "args": ["{{undefinedVar}}"] }],
            "repeat": 1, "configs": ["A"] } } }"#,
    )
    .unwrap();
    let mut orchestrator = RunOrchestrator::new(config, "l", RecordingRunner::default());

    match orchestrator.run() {
        Err(BenchError::TemplateResolution { template, message }) => {
            assert_eq!(template, "{{undefinedVar}}");
            assert!(message.contains("undefinedVar"));
        }
        other => panic!("Expected TemplateResolution error, got {:?}", other),
    }
    assert!(orchestrator.into_runner().calls.is_empty());
}

#[test]
fn test_all_configs_unavailable_before_aggregates() {
    let config = TestConfig::from_str(
        r#"{ "tests": { "t": {
            "tests": [{ "command": "test", "args": ["{{allConfigs}}"] }],
            "repeat": 1, "configs": ["A"] } } }"#,
    )
    .unwrap();
    let mut orchestrator = RunOrchestrator::new(config, "l", RecordingRunner::default());
    assert!(matches!(
        orchestrator.run(),
        Err(BenchError::TemplateResolution { .. })
    ));
}

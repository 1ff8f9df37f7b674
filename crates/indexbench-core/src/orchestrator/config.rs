//! Declarative test configuration
//!
//! ```json
//! {
//!   "vars": { "source": "/data/enwiki.txt" },
//!   "tests": {
//!     "indexing": {
//!       "setup": [{ "command": "mkdir", "args": ["-p", "out"] }],
//!       "tests": [{ "command": "bench-pipeline", "args": ["index", "--source", "{{source}}"] }],
//!       "repeat": 3,
//!       "configs": ["mmap", "ram"],
//!       "aggregates": []
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::debug;

use super::template::Template;
use crate::error::{BenchError, Result};

/// Top-level orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestConfig {
    /// Base variables available to every template
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    /// Tests by name; they run in name order
    pub tests: BTreeMap<String, TestSpec>,
}

/// One named test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSpec {
    /// Run once per config, before its repeats
    #[serde(default)]
    pub setup: Vec<Command>,
    /// Run once per repeat
    pub tests: Vec<Command>,
    /// Repeats per config
    pub repeat: u32,
    /// Config names, run in the order given
    pub configs: Vec<String>,
    /// Run once after every config finished
    #[serde(default)]
    pub aggregates: Vec<Command>,
}

/// External command with templated arguments and environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Executable name, looked up on the search path
    #[serde(rename = "command")]
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl TestConfig {
    /// Load and validate configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The JSON is malformed or a required field is missing
    /// - Validation fails (see [`TestConfig::validate`])
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading test config {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse and validate configuration from a JSON string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: TestConfig =
            serde_json::from_str(content).map_err(|e| BenchError::config("config", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the constraints serde cannot express.
    ///
    /// Rejects an empty `tests` map, empty or duplicate `configs`, a zero
    /// `repeat`, empty command names and templates that do not parse.
    pub fn validate(&self) -> Result<()> {
        if self.tests.is_empty() {
            return Err(BenchError::config("tests", "at least one test is required"));
        }

        for (name, spec) in &self.tests {
            let field = |suffix: &str| format!("tests.{}.{}", name, suffix);

            if spec.repeat == 0 {
                return Err(BenchError::config(field("repeat"), "must be at least 1"));
            }
            if spec.configs.is_empty() {
                return Err(BenchError::config(
                    field("configs"),
                    "at least one config is required",
                ));
            }
            let mut seen = BTreeSet::new();
            for config in &spec.configs {
                if config.is_empty() {
                    return Err(BenchError::config(field("configs"), "config names cannot be empty"));
                }
                if !seen.insert(config.as_str()) {
                    return Err(BenchError::config(
                        field("configs"),
                        format!("duplicate config '{}'", config),
                    ));
                }
            }

            let phases = [
                ("setup", &spec.setup),
                ("tests", &spec.tests),
                ("aggregates", &spec.aggregates),
            ];
            for (phase, commands) in phases {
                for (i, command) in commands.iter().enumerate() {
                    command.validate(&field(&format!("{}[{}]", phase, i)))?;
                }
            }
        }
        Ok(())
    }
}

impl Command {
    pub fn new(name: impl Into<String>, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            env: BTreeMap::new(),
        }
    }

    fn validate(&self, field: &str) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(BenchError::config(
                format!("{}.command", field),
                "command name cannot be empty",
            ));
        }
        for template in self.args.iter().chain(self.env.values()) {
            Template::parse(template)?;
        }
        Ok(())
    }
}

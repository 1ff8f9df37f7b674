//! Variable environment seen by command templates.

use std::collections::BTreeMap;

use super::template::Template;
use crate::error::Result;

/// Label of this orchestrator execution
pub const EXEC_LABEL: &str = "execLabel";
/// Test currently running
pub const TEST_NAME: &str = "testName";
/// Config currently running
pub const CONFIG_NAME: &str = "configName";
/// Repeat index, starting at 0
pub const RUN_NUMBER: &str = "runNumber";
/// Scratch directory of the current repeat (or of the config, during setup)
pub const TMP_DIR: &str = "tmpDir";
/// Scratch directory shared by setup and every repeat of a config
pub const CONFIG_TMP_DIR: &str = "configTmpDir";
/// Comma-joined config names of the test, set before its aggregates run
pub const ALL_CONFIGS: &str = "allConfigs";

/// Name to value mapping, seeded from the config file's `vars`.
///
/// Later writes to the same name replace earlier ones. A command sees the
/// values as they are at the moment it is rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    values: BTreeMap<String, String>,
}

impl Variables {
    pub fn new(base: BTreeMap<String, String>) -> Self {
        Self { values: base }
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Parse `template` and render it against the current values
    pub fn resolve(&self, template: &str) -> Result<String> {
        Template::parse(template)?.render(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for Variables {
    fn from(values: BTreeMap<String, String>) -> Self {
        Self::new(values)
    }
}

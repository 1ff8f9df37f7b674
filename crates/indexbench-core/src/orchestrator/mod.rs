//! Run orchestration
//!
//! Reads a [`TestConfig`] and, for every test, config and repeat, renders
//! the configured commands against a [`Variables`] environment and hands
//! them to a [`CommandRunner`]. The environment starts from the config's
//! `vars` and is extended as the run progresses:
//!
//! | Variable       | Set when                                  |
//! |----------------|-------------------------------------------|
//! | `execLabel`    | run start                                 |
//! | `testName`     | each test                                 |
//! | `configName`   | each config                               |
//! | `configTmpDir` | each config                               |
//! | `tmpDir`       | each config (for setup), then each repeat |
//! | `runNumber`    | each repeat, from 0                       |
//! | `allConfigs`   | after every config of the test finished   |

mod command;
mod config;
mod runner;
mod template;
mod vars;

pub use command::{CommandRunner, ProcessRunner, RenderedCommand};
pub use config::{Command, TestConfig, TestSpec};
pub use runner::{RunOrchestrator, RunReport};
pub use template::Template;
pub use vars::{
    Variables, ALL_CONFIGS, CONFIG_NAME, CONFIG_TMP_DIR, EXEC_LABEL, RUN_NUMBER, TEST_NAME,
    TMP_DIR,
};

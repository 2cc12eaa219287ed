//! Nightly stage definitions and configuration.

use std::collections::BTreeMap;

use nightly_core::scan::BUILD_FAILED_MARKER;
use nightly_core::NightlyConfig;
use serde::{Deserialize, Serialize};

/// Builtin nightly stages, in pipeline order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinStage {
    /// svn update
    Sync,

    /// ant clean dist-large
    Build,

    /// ant -DrunSlowTests=false test-all
    Test,

    /// ant -f javadoc.xml
    Javadoc,

    /// ant -f javadoc.xml doccheck
    Doccheck,

    /// ant -f pmd.xml pmd
    Analysis,
}

impl BuiltinStage {
    /// Stages that only run after a successful build, independent of each other.
    pub const QUALITY: [BuiltinStage; 4] = [
        BuiltinStage::Test,
        BuiltinStage::Javadoc,
        BuiltinStage::Doccheck,
        BuiltinStage::Analysis,
    ];

    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinStage::Sync => "sync",
            BuiltinStage::Build => "build",
            BuiltinStage::Test => "test",
            BuiltinStage::Javadoc => "javadoc",
            BuiltinStage::Doccheck => "doccheck",
            BuiltinStage::Analysis => "analysis",
        }
    }

    /// Log file the stage's combined output goes to.
    pub fn log_file(&self) -> &'static str {
        match self {
            BuiltinStage::Sync => "svn.log",
            BuiltinStage::Build => "build.log",
            BuiltinStage::Test => "test.log",
            BuiltinStage::Javadoc => "javadoc.log",
            BuiltinStage::Doccheck => "doccheck.log",
            BuiltinStage::Analysis => "pmd.log",
        }
    }

    /// How the stage's success is judged.
    ///
    /// The sync client reports through its exit status; every build-tool stage
    /// is judged by scanning its log.
    pub fn failure_check(&self) -> FailureCheck {
        match self {
            BuiltinStage::Sync => FailureCheck::ExitStatus,
            _ => FailureCheck::LogMarker(BUILD_FAILED_MARKER.to_string()),
        }
    }

    /// Get the stage's command from the run configuration.
    pub fn command(&self, config: &NightlyConfig) -> Vec<String> {
        let commands = &config.commands;
        match self {
            BuiltinStage::Sync => commands.sync.clone(),
            BuiltinStage::Build => commands.build.clone(),
            BuiltinStage::Test => commands.test.clone(),
            BuiltinStage::Javadoc => commands.javadoc.clone(),
            BuiltinStage::Doccheck => commands.doccheck.clone(),
            BuiltinStage::Analysis => commands.analysis.clone(),
        }
    }
}

/// Rule deciding whether a finished command failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureCheck {
    /// Non-zero exit status fails the command.
    ExitStatus,

    /// The marker appearing anywhere in the log fails the command; the exit
    /// status is ignored.
    LogMarker(String),
}

/// Configuration for one external tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Human-readable stage name.
    pub name: String,

    /// Command to execute (first element is executable).
    pub command: Vec<String>,

    /// Extra environment variables.
    pub env: BTreeMap<String, String>,

    /// File name, inside the log directory, receiving the output.
    pub log_file: String,

    /// Timeout in seconds; zero waits forever.
    pub timeout_secs: u64,

    pub check: FailureCheck,

    /// Send stderr to the log as well; otherwise it is discarded.
    pub merge_stderr: bool,
}

impl StageConfig {
    /// Create a stage configuration from a builtin stage.
    pub fn from_builtin(stage: BuiltinStage, config: &NightlyConfig) -> Self {
        let env = match stage {
            BuiltinStage::Test => config.commands.test_env.clone(),
            _ => BTreeMap::new(),
        };
        Self {
            name: stage.name().to_string(),
            command: stage.command(config),
            env,
            log_file: stage.log_file().to_string(),
            timeout_secs: config.timeout_secs,
            check: stage.failure_check(),
            merge_stderr: true,
        }
    }

    /// Create a custom stage configuration judged by exit status.
    pub fn custom(name: String, command: Vec<String>, log_file: String, timeout_secs: u64) -> Self {
        Self {
            name,
            command,
            env: BTreeMap::new(),
            log_file,
            timeout_secs,
            check: FailureCheck::ExitStatus,
            merge_stderr: true,
        }
    }

    pub fn with_check(mut self, check: FailureCheck) -> Self {
        self.check = check;
        self
    }

    /// Keep stderr out of the log, for commands whose stdout is data.
    pub fn stdout_only(mut self) -> Self {
        self.merge_stderr = false;
        self
    }
}

//! Run configuration.
//!
//! A [`NightlyConfig`] is built once at startup (JSON file, then CLI/env
//! overrides), validated, and passed by reference to every stage.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NightlyError, Result};

/// Links rendered per line before a `<br>` when nothing else is configured.
pub const DEFAULT_LINKS_PER_LINE: usize = 4;

/// Per-subprocess timeout when nothing else is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Top-level configuration for one nightly run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NightlyConfig {
    /// Working copy that gets synced and built.
    pub source_dir: PathBuf,

    /// Scratch area holding stage logs.
    pub log_dir: PathBuf,

    /// Web-served directory receiving the status page and artifacts.
    pub publish_dir: PathBuf,

    /// Scripting interpreter archive used by the dependency-graph generator.
    #[serde(default)]
    pub interpreter_jar: Option<PathBuf>,

    /// Graph library archive used by the dependency-graph generator.
    #[serde(default)]
    pub graph_jar: Option<PathBuf>,

    /// Number of links per line in the link lists of the report.
    #[serde(default = "default_links_per_line")]
    pub links_per_line: usize,

    /// Timeout applied to every external tool invocation.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub layout: SourceLayout,

    #[serde(default)]
    pub commands: CommandsConfig,
}

fn default_links_per_line() -> usize {
    DEFAULT_LINKS_PER_LINE
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for NightlyConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("source"),
            log_dir: PathBuf::from("logs"),
            publish_dir: PathBuf::from("public"),
            interpreter_jar: None,
            graph_jar: None,
            links_per_line: DEFAULT_LINKS_PER_LINE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            project: ProjectConfig::default(),
            layout: SourceLayout::default(),
            commands: CommandsConfig::default(),
        }
    }
}

/// Naming and branding of the published page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfig {
    /// Shown in the page title, e.g. "CDK Nightly Build".
    #[serde(default = "ProjectConfig::default_name")]
    pub name: String,

    /// Distribution jar stem; the published jar is `<artifact_name>-<YYYYMMDD>.jar`.
    #[serde(default = "ProjectConfig::default_artifact_name")]
    pub artifact_name: String,

    /// Project home page, linked from the footer logo.
    #[serde(default)]
    pub project_url: Option<String>,

    /// Footer logo image.
    #[serde(default)]
    pub logo_url: Option<String>,

    /// Lines of the "Build details" footer row.
    #[serde(default)]
    pub build_details: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            artifact_name: Self::default_artifact_name(),
            project_url: None,
            logo_url: None,
            build_details: vec![],
        }
    }
}

impl ProjectConfig {
    fn default_name() -> String {
        "CDK".to_string()
    }

    fn default_artifact_name() -> String {
        "cdk-svn".to_string()
    }
}

/// Where the build tool leaves its outputs, relative to `source_dir`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceLayout {
    #[serde(default = "SourceLayout::default_dist_dir")]
    pub dist_dir: PathBuf,

    /// Parent of the generated `api/` tree.
    #[serde(default = "SourceLayout::default_doc_dir")]
    pub doc_dir: PathBuf,

    /// Holds `result-*` test files, `javadoc/` and `pmd/`.
    #[serde(default = "SourceLayout::default_reports_dir")]
    pub reports_dir: PathBuf,

    /// XSLT turning analysis XML into HTML.
    #[serde(default = "SourceLayout::default_stylesheet")]
    pub stylesheet: PathBuf,

    /// Script printing the module dependency graph in dot format.
    #[serde(default = "SourceLayout::default_depgraph_script")]
    pub depgraph_script: PathBuf,
}

impl Default for SourceLayout {
    fn default() -> Self {
        Self {
            dist_dir: Self::default_dist_dir(),
            doc_dir: Self::default_doc_dir(),
            reports_dir: Self::default_reports_dir(),
            stylesheet: Self::default_stylesheet(),
            depgraph_script: Self::default_depgraph_script(),
        }
    }
}

impl SourceLayout {
    fn default_dist_dir() -> PathBuf {
        PathBuf::from("dist/jar")
    }

    fn default_doc_dir() -> PathBuf {
        PathBuf::from("doc")
    }

    fn default_reports_dir() -> PathBuf {
        PathBuf::from("reports")
    }

    fn default_stylesheet() -> PathBuf {
        PathBuf::from("pmd/wz-pmd-report.xslt")
    }

    fn default_depgraph_script() -> PathBuf {
        PathBuf::from("deptodot.bsh")
    }
}

/// Argument vectors of the external tools, first element is the executable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandsConfig {
    #[serde(default = "CommandsConfig::default_sync")]
    pub sync: Vec<String>,

    #[serde(default = "CommandsConfig::default_build")]
    pub build: Vec<String>,

    #[serde(default = "CommandsConfig::default_test")]
    pub test: Vec<String>,

    /// Extra environment for the test stage.
    #[serde(default = "CommandsConfig::default_test_env")]
    pub test_env: BTreeMap<String, String>,

    #[serde(default = "CommandsConfig::default_javadoc")]
    pub javadoc: Vec<String>,

    #[serde(default = "CommandsConfig::default_doccheck")]
    pub doccheck: Vec<String>,

    #[serde(default = "CommandsConfig::default_analysis")]
    pub analysis: Vec<String>,

    /// JVM running the dependency-graph script.
    #[serde(default = "CommandsConfig::default_java")]
    pub java: String,

    /// Graph layout tool rendering the dependency graph.
    #[serde(default = "CommandsConfig::default_dot")]
    pub dot: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            sync: Self::default_sync(),
            build: Self::default_build(),
            test: Self::default_test(),
            test_env: Self::default_test_env(),
            javadoc: Self::default_javadoc(),
            doccheck: Self::default_doccheck(),
            analysis: Self::default_analysis(),
            java: Self::default_java(),
            dot: Self::default_dot(),
        }
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

impl CommandsConfig {
    fn default_sync() -> Vec<String> {
        argv(&["svn", "update"])
    }

    fn default_build() -> Vec<String> {
        argv(&["ant", "clean", "dist-large"])
    }

    fn default_test() -> Vec<String> {
        argv(&["ant", "-DrunSlowTests=false", "test-all"])
    }

    fn default_test_env() -> BTreeMap<String, String> {
        BTreeMap::from([("R_HOME".to_string(), "/usr/local/lib/R".to_string())])
    }

    fn default_javadoc() -> Vec<String> {
        argv(&["ant", "-f", "javadoc.xml"])
    }

    fn default_doccheck() -> Vec<String> {
        argv(&["ant", "-f", "javadoc.xml", "doccheck"])
    }

    fn default_analysis() -> Vec<String> {
        argv(&["ant", "-f", "pmd.xml", "pmd"])
    }

    fn default_java() -> String {
        "java".to_string()
    }

    fn default_dot() -> String {
        "dot".to_string()
    }
}

impl NightlyConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Check required paths and values before any stage runs.
    pub fn validate(&self) -> Result<()> {
        if !self.source_dir.is_dir() {
            return Err(NightlyError::MissingPath(self.source_dir.clone()));
        }
        if !self.log_dir.is_dir() {
            return Err(NightlyError::MissingPath(self.log_dir.clone()));
        }
        match self.publish_dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
                return Err(NightlyError::MissingPath(parent.to_path_buf()));
            }
            _ => {}
        }
        if self.links_per_line == 0 {
            return Err(NightlyError::InvalidConfig(
                "links_per_line must be greater than zero".to_string(),
            ));
        }
        if self.project.name.trim().is_empty() {
            return Err(NightlyError::InvalidConfig(
                "project name must not be empty".to_string(),
            ));
        }

        let commands = [
            ("sync", &self.commands.sync),
            ("build", &self.commands.build),
            ("test", &self.commands.test),
            ("javadoc", &self.commands.javadoc),
            ("doccheck", &self.commands.doccheck),
            ("analysis", &self.commands.analysis),
        ];
        for (name, command) in commands {
            if command.is_empty() {
                return Err(NightlyError::InvalidConfig(format!(
                    "{name} command must not be empty"
                )));
            }
        }

        Ok(())
    }

    /// Classpath for the dependency-graph generator.
    ///
    /// `None` unless both auxiliary libraries are configured and present.
    pub fn depgraph_classpath(&self) -> Option<String> {
        let interpreter = self.interpreter_jar.as_ref().filter(|p| p.is_file())?;
        let graph = self.graph_jar.as_ref().filter(|p| p.is_file())?;
        Some(format!("{}:{}", interpreter.display(), graph.display()))
    }

    /// Full path of a log file in the log directory.
    pub fn log_path(&self, file_name: &str) -> PathBuf {
        self.log_dir.join(file_name)
    }

    /// Directory holding the build tool's reports.
    pub fn reports_dir(&self) -> PathBuf {
        self.source_dir.join(&self.layout.reports_dir)
    }

    /// Pretty JSON form, published next to the page for traceability.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

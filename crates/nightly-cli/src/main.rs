//! Nightly - build orchestrator CLI
//!
//! The `nightly` command syncs the working copy, drives the build tool and
//! publishes the status page.
//!
//! ## Modes
//!
//! - no mode: full run
//! - `dryrun` / `--dry-run`: rebuild the page from the previous run's artifacts
//! - `help` / `--help`: usage

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, ValueEnum};
use nightly_ci::{NightlyPipeline, RunOptions, RunOutcome, RunReport, SummaryStatus};
use nightly_core::{NightlyConfig, NightlyError, RunDate};
use std::path::PathBuf;
use tracing::{warn, Level};

#[derive(Parser, Debug)]
#[command(name = "nightly")]
#[command(author = "Nightly Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Nightly build: sync, build, test and publish a status page", long_about = None)]
struct Cli {
    /// `help` prints this message, `dryrun` is the same as --dry-run
    #[arg(value_enum)]
    mode: Option<Mode>,

    /// Skip sync, build and quality stages; reuse the previous run's artifacts
    #[arg(long)]
    dry_run: bool,

    /// JSON configuration file
    #[arg(short, long, env = "NIGHTLY_CONFIG")]
    config: Option<PathBuf>,

    /// Working copy to sync and build
    #[arg(long, env = "NIGHTLY_SOURCE_DIR")]
    source_dir: Option<PathBuf>,

    /// Directory receiving the stage logs
    #[arg(long, env = "NIGHTLY_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Web-served directory the site is published into
    #[arg(long, env = "NIGHTLY_PUBLISH_DIR")]
    publish_dir: Option<PathBuf>,

    /// Scripting interpreter archive for the dependency graph
    #[arg(long, env = "NIGHTLY_INTERPRETER_JAR")]
    interpreter_jar: Option<PathBuf>,

    /// Graph library archive for the dependency graph
    #[arg(long, env = "NIGHTLY_GRAPH_JAR")]
    graph_jar: Option<PathBuf>,

    /// Links per line in the report's link lists
    #[arg(long, env = "NIGHTLY_LINKS_PER_LINE")]
    links_per_line: Option<usize>,

    /// Timeout for each external tool, in seconds
    #[arg(long, env = "NIGHTLY_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines and a JSON run report
    #[arg(long)]
    json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Help,
    Dryrun,
}

impl Cli {
    fn is_dry_run(&self) -> bool {
        self.dry_run || self.mode == Some(Mode::Dryrun)
    }

    /// Configuration file (or defaults) with the command-line overrides applied.
    fn load_config(&self) -> Result<NightlyConfig> {
        let mut config = match &self.config {
            Some(path) => NightlyConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => NightlyConfig::default(),
        };

        if let Some(dir) = &self.source_dir {
            config.source_dir = dir.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = dir.clone();
        }
        if let Some(dir) = &self.publish_dir {
            config.publish_dir = dir.clone();
        }
        if let Some(jar) = &self.interpreter_jar {
            config.interpreter_jar = Some(jar.clone());
        }
        if let Some(jar) = &self.graph_jar {
            config.graph_jar = Some(jar.clone());
        }
        if let Some(n) = self.links_per_line {
            config.links_per_line = n;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = secs;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.mode == Some(Mode::Help) {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    }

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    nightly_core::init_tracing(cli.json, level);

    let config = cli.load_config()?;
    let options = if cli.is_dry_run() {
        RunOptions::dry_run(RunDate::today())
    } else {
        RunOptions::full(RunDate::today())
    };

    match NightlyPipeline::run(&config, options).await {
        Ok(report) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(())
        }
        Err(e) => match e.downcast_ref::<NightlyError>() {
            Some(NightlyError::RunInProgress(lock)) => {
                warn!(lock = %lock.display(), "Another nightly run is in progress, exiting");
                Ok(())
            }
            _ => Err(e.context("Nightly run failed")),
        },
    }
}

fn outcome_line(outcome: RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::Published => "✓ PUBLISHED",
        RunOutcome::StaleBuild => "✗ SYNC FAILED (previous build marked stale)",
        RunOutcome::BuildFailed => "✗ BUILD FAILED (build log published)",
    }
}

fn print_report(report: &RunReport) {
    println!("Run ID: {}", report.run_id);
    println!("Status: {}", outcome_line(report.outcome));
    println!("Duration: {}ms", report.duration_ms);
    println!();

    for stage in &report.stages {
        let status = if stage.passed() { "✓" } else { "✗" };
        if stage.reused {
            println!("  {} {} (reused)", status, stage.stage_name);
        } else {
            println!(
                "  {} {} ({}ms, log: {})",
                status,
                stage.stage_name,
                stage.duration_ms,
                stage.log_path.display()
            );
        }
        if stage.segv_detected {
            println!("      crash marker found in log");
        }
    }

    println!();
    println!(
        "Summary: {}/{} stages passed",
        report.passed_count(),
        report.stages.len()
    );

    match &report.summary {
        Some(SummaryStatus::Parsed { rows }) => {
            let failing = rows.iter().filter(|r| r.failures + r.errors > 0).count();
            println!("Tests: {} modules, {} with failures or errors", rows.len(), failing);
        }
        Some(SummaryStatus::Malformed { error }) => println!("Tests: summary unavailable ({error})"),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_legacy_positional_modes() {
        let cli = Cli::try_parse_from(["nightly", "dryrun"]).unwrap();
        assert!(cli.is_dry_run());

        let cli = Cli::try_parse_from(["nightly", "help"]).unwrap();
        assert_eq!(cli.mode, Some(Mode::Help));
        assert!(!cli.is_dry_run());

        let cli = Cli::try_parse_from(["nightly", "--dry-run"]).unwrap();
        assert!(cli.is_dry_run());

        let cli = Cli::try_parse_from(["nightly"]).unwrap();
        assert!(!cli.is_dry_run());
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["nightly", "deploy"]).is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nightly.json");
        std::fs::write(
            &path,
            r#"{
                "source_dir": "/srv/cdk",
                "log_dir": "/srv/nightly",
                "publish_dir": "/var/www/nightly",
                "links_per_line": 6
            }"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "nightly",
            "--config",
            path.to_str().unwrap(),
            "--publish-dir",
            "/tmp/web",
            "--timeout-secs",
            "120",
            "--graph-jar",
            "/opt/jgrapht.jar",
        ])
        .unwrap();
        let config = cli.load_config().unwrap();

        assert_eq!(config.source_dir, PathBuf::from("/srv/cdk"));
        assert_eq!(config.publish_dir, PathBuf::from("/tmp/web"));
        assert_eq!(config.links_per_line, 6);
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.graph_jar, Some(PathBuf::from("/opt/jgrapht.jar")));
        assert_eq!(config.interpreter_jar, None);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        let cli = Cli::try_parse_from(["nightly", "--config", missing.to_str().unwrap()]).unwrap();
        let err = cli.load_config().unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }

    #[test]
    fn test_outcome_lines() {
        assert!(outcome_line(RunOutcome::Published).starts_with('✓'));
        assert!(outcome_line(RunOutcome::BuildFailed).contains("BUILD FAILED"));
    }
}

//! Stage execution: run a command with its output captured to a log file,
//! then judge it.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::Context;
use nightly_core::obs;
use nightly_core::scan::{read_log_lossy, segv_detected};
use nightly_core::{FailureDetector, MarkerScan};
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::stage::{FailureCheck, StageConfig};

/// How an external tool invocation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum TaskOutcome {
    Success,
    Failure { reason: String },
    Timeout { after_secs: u64 },
}

/// Result of a stage execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage name.
    pub stage_name: String,

    pub outcome: TaskOutcome,

    /// Log holding the stage's captured output.
    pub log_path: PathBuf,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether the crash marker showed up in the log. Informational.
    pub segv_detected: bool,

    /// The stage was not run; a previous run's artifacts stand in for it.
    pub reused: bool,
}

impl StageResult {
    /// Whether this stage passed.
    pub fn passed(&self) -> bool {
        self.outcome == TaskOutcome::Success
    }

    /// A stage skipped by a dry run and assumed to have succeeded.
    pub fn reused(stage_name: &str, log_path: PathBuf) -> Self {
        Self {
            stage_name: stage_name.to_string(),
            outcome: TaskOutcome::Success,
            log_path,
            duration_ms: 0,
            segv_detected: false,
            reused: true,
        }
    }
}

/// Runner executing one stage at a time.
pub struct CiRunner;

impl CiRunner {
    /// Execute a single stage in `workdir`, its output going to `log_dir`.
    ///
    /// Spawn failures and timeouts come back as failed results. Only failing
    /// to create the log file is an error.
    pub async fn execute_stage(
        config: &StageConfig,
        workdir: &Path,
        log_dir: &Path,
    ) -> anyhow::Result<StageResult> {
        let start = Instant::now();
        let log_path = log_dir.join(&config.log_file);
        obs::emit_stage_started(&config.name, &config.log_file);

        let exit = Self::run_command(config, workdir, &log_path).await?;

        let log_text = read_log_lossy(&log_path);
        let outcome = match (exit, &config.check) {
            (Exit::Status(status), FailureCheck::ExitStatus) if !status.success() => {
                TaskOutcome::Failure {
                    reason: format!("exited with {status}"),
                }
            }
            (Exit::Status(_), FailureCheck::LogMarker(marker))
                if MarkerScan::new(marker.as_str()).did_stage_fail(&log_text) =>
            {
                TaskOutcome::Failure {
                    reason: format!("log contains {marker:?}"),
                }
            }
            (Exit::Status(_), _) => TaskOutcome::Success,
            (Exit::NotStarted(reason), _) => TaskOutcome::Failure { reason },
            (Exit::TimedOut, _) => TaskOutcome::Timeout {
                after_secs: config.timeout_secs,
            },
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let segv = segv_detected(&log_text);
        if segv {
            obs::emit_segv_detected(&config.name);
        }
        let result = StageResult {
            stage_name: config.name.clone(),
            outcome,
            log_path,
            duration_ms,
            segv_detected: segv,
            reused: false,
        };
        obs::emit_stage_finished(&config.name, result.passed(), duration_ms);
        Ok(result)
    }

    async fn run_command(
        config: &StageConfig,
        workdir: &Path,
        log_path: &Path,
    ) -> anyhow::Result<Exit> {
        let log = File::create(log_path)
            .with_context(|| format!("create log {}", log_path.display()))?;

        let Some((exe, args)) = config.command.split_first() else {
            drop(log);
            let reason = format!("stage {} has empty command", config.name);
            append_note(log_path, &reason)?;
            return Ok(Exit::NotStarted(reason));
        };

        let stderr = if config.merge_stderr {
            Stdio::from(log.try_clone().context("clone log handle")?)
        } else {
            Stdio::null()
        };

        let mut command = Command::new(exe);
        command
            .args(args)
            .current_dir(workdir)
            .envs(&config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(stderr)
            .kill_on_drop(true);
        // Each stage leads its own process group.
        #[cfg(unix)]
        command.process_group(0);
        let spawned = command.spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                let reason = format!("failed to spawn {exe}: {e}");
                append_note(log_path, &reason)?;
                return Ok(Exit::NotStarted(reason));
            }
        };

        if config.timeout_secs == 0 {
            return Ok(Exit::Status(child.wait().await?));
        }

        let limit = Duration::from_secs(config.timeout_secs);
        match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => Ok(Exit::Status(status?)),
            Err(_) => {
                kill_process_group(&child);
                child.kill().await.ok();
                append_note(
                    log_path,
                    &format!("nightly: killed after {} seconds", config.timeout_secs),
                )?;
                Ok(Exit::TimedOut)
            }
        }
    }
}

/// How the child process ended, before the stage's check is applied.
enum Exit {
    Status(std::process::ExitStatus),
    NotStarted(String),
    TimedOut,
}

#[cfg(unix)]
fn kill_process_group(child: &tokio::process::Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            tracing::debug!(pid, error = %e, "process group already gone");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &tokio::process::Child) {}

/// Append a line of our own to a stage log.
fn append_note(log_path: &Path, note: &str) -> anyhow::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("append to {}", log_path.display()))?;
    writeln!(file, "{note}")?;
    Ok(())
}

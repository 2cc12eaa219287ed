//! Nightly pipeline orchestration.
//!
//! Sync, build, the quality stages, report assembly and publish, in that
//! order. Sync and build failures end the run early with a banner on the
//! previous page; quality-stage failures only drop their section.

use std::fs;
use std::time::{Duration, Instant};

use anyhow::Context;
use nightly_core::config::DEFAULT_TIMEOUT_SECS;
use nightly_core::obs;
use nightly_core::publish::{clear_logs, copy_file, write_atomic};
use nightly_core::report::{build_failed_page, placeholder_page, stale_build_page};
use nightly_core::{NightlyConfig, RunDate, RunLock, StagingArea, XmlTransform, Xsltproc};
use serde::Serialize;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::assemble::{ReportAssembler, StageFlags, SummaryStatus, CONFIG_FILE, INDEX_PAGE};
use crate::runner::{CiRunner, StageResult};
use crate::stage::{BuiltinStage, StageConfig};

/// Per-run switches.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Skip sync, build and the quality stages and rebuild the page from
    /// whatever artifacts are already on disk.
    pub dry_run: bool,

    /// Date stamped on artifacts and headings.
    pub date: RunDate,
}

impl RunOptions {
    pub fn full(date: RunDate) -> Self {
        Self {
            dry_run: false,
            date,
        }
    }

    pub fn dry_run(date: RunDate) -> Self {
        Self {
            dry_run: true,
            date,
        }
    }
}

/// Which page a run left in the publish directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// A freshly assembled site was swapped in.
    Published,

    /// Sync failed; the previous page carries the stale-build banner.
    StaleBuild,

    /// Build failed; the previous page links the build log.
    BuildFailed,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Published => "published",
            RunOutcome::StaleBuild => "stale_build",
            RunOutcome::BuildFailed => "build_failed",
        }
    }
}

/// Result of a complete nightly run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub outcome: RunOutcome,

    /// Results of the stages that ran, in pipeline order.
    pub stages: Vec<StageResult>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,

    /// Test summary, when the test section was published.
    pub summary: Option<SummaryStatus>,
}

impl RunReport {
    /// Number of stages that passed.
    pub fn passed_count(&self) -> usize {
        self.stages.iter().filter(|s| s.passed()).count()
    }

    /// Number of stages that failed.
    pub fn failed_count(&self) -> usize {
        self.stages.iter().filter(|s| !s.passed()).count()
    }
}

/// Nightly pipeline orchestrator.
pub struct NightlyPipeline;

impl NightlyPipeline {
    /// Run the pipeline, transforming analysis reports with `xsltproc`.
    pub async fn run(config: &NightlyConfig, options: RunOptions) -> anyhow::Result<RunReport> {
        let timeout = match config.timeout_secs {
            0 => DEFAULT_TIMEOUT_SECS,
            secs => secs,
        };
        let xsltproc = Xsltproc::new(Duration::from_secs(timeout));
        Self::run_with_transform(config, options, &xsltproc).await
    }

    /// Run the pipeline with an explicit stylesheet processor.
    ///
    /// Fails before any stage runs if the configuration is invalid or another
    /// run holds the lock.
    pub async fn run_with_transform(
        config: &NightlyConfig,
        options: RunOptions,
        transform: &dyn XmlTransform,
    ) -> anyhow::Result<RunReport> {
        config.validate()?;
        let _lock = RunLock::acquire(&config.log_dir)?;

        let run_id = Uuid::new_v4().to_string();
        let span = obs::run_span(&run_id, options.dry_run);
        Self::execute(config, options, transform, run_id)
            .instrument(span)
            .await
    }

    async fn execute(
        config: &NightlyConfig,
        options: RunOptions,
        transform: &dyn XmlTransform,
        run_id: String,
    ) -> anyhow::Result<RunReport> {
        let start = Instant::now();
        info!(
            source_dir = %config.source_dir.display(),
            publish_dir = %config.publish_dir.display(),
            "Starting nightly run"
        );
        fs::create_dir_all(&config.publish_dir)
            .with_context(|| format!("create {}", config.publish_dir.display()))?;

        let mut stages = Vec::new();
        let finish = |outcome: RunOutcome,
                      stages: Vec<StageResult>,
                      summary: Option<SummaryStatus>| {
            let duration_ms = start.elapsed().as_millis() as u64;
            obs::emit_run_finished(outcome.as_str(), duration_ms);
            RunReport {
                run_id: run_id.clone(),
                outcome,
                stages,
                duration_ms,
                summary,
            }
        };

        if options.dry_run {
            info!("Dry run, reusing artifacts of the previous run");
            for stage in [BuiltinStage::Sync, BuiltinStage::Build]
                .into_iter()
                .chain(BuiltinStage::QUALITY)
            {
                stages.push(StageResult::reused(
                    stage.name(),
                    config.log_path(stage.log_file()),
                ));
            }
        } else {
            let removed = clear_logs(&config.log_dir).context("clear stale logs")?;
            debug!(removed, "Cleared stale logs");

            let sync = run_builtin(BuiltinStage::Sync, config).await?;
            let synced = sync.passed();
            stages.push(sync);
            if !synced {
                warn!("Source sync failed, marking the published build stale");
                publish_stale_build(config)?;
                return Ok(finish(RunOutcome::StaleBuild, stages, None));
            }

            let build = run_builtin(BuiltinStage::Build, config).await?;
            let built = build.passed();
            stages.push(build);
            if !built {
                warn!("Build failed, publishing the build log");
                publish_build_failed(config)?;
                return Ok(finish(RunOutcome::BuildFailed, stages, None));
            }

            for stage in BuiltinStage::QUALITY {
                let result = run_builtin(stage, config).await?;
                if !result.passed() {
                    warn!(
                        stage = stage.name(),
                        outcome = ?result.outcome,
                        "Quality stage failed, its section is dropped"
                    );
                }
                stages.push(result);
            }
        }

        let index = config.publish_dir.join(INDEX_PAGE);
        write_atomic(&index, &placeholder_page(&config.project.name))
            .context("write placeholder page")?;

        let staging = StagingArea::create(&config.publish_dir).context("create staging area")?;
        let assembly = ReportAssembler::new(config, options.date, transform)
            .assemble(stage_flags(&stages), staging.path())
            .await?;
        write_atomic(&staging.path().join(INDEX_PAGE), &assembly.index_html)?;
        write_atomic(&staging.path().join(CONFIG_FILE), &config.to_json_pretty()?)?;

        let entries = staging
            .swap_into_place()
            .with_context(|| format!("publish into {}", config.publish_dir.display()))?;
        obs::emit_publish_swapped(&config.publish_dir.display().to_string(), entries);

        Ok(finish(RunOutcome::Published, stages, assembly.summary))
    }
}

async fn run_builtin(stage: BuiltinStage, config: &NightlyConfig) -> anyhow::Result<StageResult> {
    let stage_config = StageConfig::from_builtin(stage, config);
    CiRunner::execute_stage(&stage_config, &config.source_dir, &config.log_dir).await
}

/// Sections to render, from the stages that passed.
fn stage_flags(stages: &[StageResult]) -> StageFlags {
    let passed = |stage: BuiltinStage| {
        stages
            .iter()
            .any(|r| r.stage_name == stage.name() && r.passed())
    };
    StageFlags {
        dist: passed(BuiltinStage::Build),
        test: passed(BuiltinStage::Test),
        javadoc: passed(BuiltinStage::Javadoc),
        doccheck: passed(BuiltinStage::Doccheck),
        analysis: passed(BuiltinStage::Analysis),
    }
}

fn previous_page(config: &NightlyConfig) -> Option<String> {
    fs::read_to_string(config.publish_dir.join(INDEX_PAGE)).ok()
}

fn publish_stale_build(config: &NightlyConfig) -> anyhow::Result<()> {
    let page = stale_build_page(previous_page(config).as_deref(), &config.project.name);
    write_atomic(&config.publish_dir.join(INDEX_PAGE), &page).context("write stale-build page")?;
    Ok(())
}

fn publish_build_failed(config: &NightlyConfig) -> anyhow::Result<()> {
    let log_name = BuiltinStage::Build.log_file();
    let log = config.log_path(log_name);
    if log.is_file() {
        copy_file(&log, &config.publish_dir.join(log_name)).context("copy build log")?;
    } else {
        warn!("build.log missing, failure page links nothing");
    }
    let page = build_failed_page(previous_page(config).as_deref(), &config.project.name, log_name);
    write_atomic(&config.publish_dir.join(INDEX_PAGE), &page)
        .context("write build-failed page")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::TaskOutcome;
    use std::path::PathBuf;

    fn result(stage: BuiltinStage, outcome: TaskOutcome) -> StageResult {
        StageResult {
            stage_name: stage.name().to_string(),
            outcome,
            log_path: PathBuf::from(stage.log_file()),
            duration_ms: 10,
            segv_detected: false,
            reused: false,
        }
    }

    fn failure() -> TaskOutcome {
        TaskOutcome::Failure {
            reason: "log contains \"BUILD FAILED\"".to_string(),
        }
    }

    #[test]
    fn test_stage_flags_follow_results() {
        let stages = vec![
            result(BuiltinStage::Sync, TaskOutcome::Success),
            result(BuiltinStage::Build, TaskOutcome::Success),
            result(BuiltinStage::Test, failure()),
            result(BuiltinStage::Javadoc, TaskOutcome::Success),
            result(BuiltinStage::Doccheck, TaskOutcome::Timeout { after_secs: 3600 }),
            result(BuiltinStage::Analysis, TaskOutcome::Success),
        ];
        let flags = stage_flags(&stages);
        assert_eq!(
            flags,
            StageFlags {
                dist: true,
                test: false,
                javadoc: true,
                doccheck: false,
                analysis: true,
            }
        );
    }

    #[test]
    fn test_reused_stages_enable_every_section() {
        let stages: Vec<_> = BuiltinStage::QUALITY
            .iter()
            .chain([BuiltinStage::Build].iter())
            .map(|s| StageResult::reused(s.name(), PathBuf::from(s.log_file())))
            .collect();
        assert_eq!(stage_flags(&stages), StageFlags::all());
    }

    #[test]
    fn test_run_report_counts() {
        let report = RunReport {
            run_id: "run123".to_string(),
            outcome: RunOutcome::BuildFailed,
            stages: vec![
                result(BuiltinStage::Sync, TaskOutcome::Success),
                result(BuiltinStage::Build, failure()),
            ],
            duration_ms: 300,
            summary: None,
        };
        assert_eq!(report.passed_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.outcome.as_str(), "build_failed");
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_running() {
        let dir = tempfile::tempdir().unwrap();
        let config = NightlyConfig {
            source_dir: dir.path().join("missing"),
            log_dir: dir.path().to_path_buf(),
            publish_dir: dir.path().join("web"),
            ..NightlyConfig::default()
        };
        let err = NightlyPipeline::run(&config, RunOptions::full(RunDate::today()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
        assert!(!dir.path().join("web").exists());
    }
}

//! Structured observability hooks for the nightly run lifecycle.
//!
//! Events are emitted at `info!` level unless noted; filter them with
//! `RUST_LOG`.

use tracing::{info, warn};

/// Run-scoped span tagged with the run id; instrument the run future with it.
pub fn run_span(run_id: &str, dry_run: bool) -> tracing::Span {
    tracing::info_span!("nightly.run", run_id = %run_id, dry_run = dry_run)
}

/// Emit event: a stage is about to run.
pub fn emit_stage_started(stage: &str, log_file: &str) {
    info!(event = "stage.started", stage = %stage, log_file = %log_file);
}

/// Emit event: a stage finished, with its verdict and duration.
pub fn emit_stage_finished(stage: &str, succeeded: bool, duration_ms: u64) {
    info!(
        event = "stage.finished",
        stage = %stage,
        succeeded = succeeded,
        duration_ms = duration_ms,
    );
}

/// Emit event: the crash marker showed up in a stage log (warning level).
pub fn emit_segv_detected(stage: &str) {
    warn!(event = "stage.segv", stage = %stage);
}

/// Emit event: the staged site replaced the live publish directory.
pub fn emit_publish_swapped(publish_dir: &str, entries: usize) {
    info!(event = "publish.swapped", publish_dir = %publish_dir, entries = entries);
}

/// Emit event: the run ended, with the terminal page that was published.
pub fn emit_run_finished(outcome: &str, duration_ms: u64) {
    info!(event = "run.finished", outcome = %outcome, duration_ms = duration_ms);
}

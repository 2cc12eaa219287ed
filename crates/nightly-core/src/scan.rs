//! Log scanning: classify a finished stage by searching its captured output.

use std::fs;
use std::path::Path;

/// Token the build tool prints when a target fails.
pub const BUILD_FAILED_MARKER: &str = "BUILD FAILED";

/// Token a crashed JVM leaves in its output.
pub const SEGV_MARKER: &str = "SIGSEGV";

/// Decides from a stage's log text whether the stage failed.
///
/// The pipeline only talks to this trait, so marker scanning can be swapped
/// for another policy without touching the driver.
pub trait FailureDetector: Send + Sync {
    fn did_stage_fail(&self, log_text: &str) -> bool;
}

/// Fails a stage when a fixed marker appears anywhere in its log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerScan {
    marker: String,
}

impl MarkerScan {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl Default for MarkerScan {
    fn default() -> Self {
        Self::new(BUILD_FAILED_MARKER)
    }
}

impl FailureDetector for MarkerScan {
    fn did_stage_fail(&self, log_text: &str) -> bool {
        log_text.contains(&self.marker)
    }
}

/// True iff the build-failure marker appears in `log`.
pub fn job_failed(log: &str) -> bool {
    MarkerScan::default().did_stage_fail(log)
}

/// True iff the crash marker appears in `log`.
pub fn segv_detected(log: &str) -> bool {
    log.contains(SEGV_MARKER)
}

/// Read a log file for scanning. A missing or unreadable file scans as empty.
pub fn read_log_lossy(path: &Path) -> String {
    match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}

/// [`job_failed`] over a log file; a missing file counts as marker absent.
pub fn log_file_failed(path: &Path) -> bool {
    job_failed(&read_log_lossy(path))
}

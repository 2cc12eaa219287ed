//! Static-analysis report publishing: XML through an XSLT stylesheet, or the
//! raw XML when no transform is available.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{NightlyError, Result};

/// Text the stylesheet puts at the end of the report title.
pub const REPORT_TITLE_MARKER: &str = "Report</div>";

/// An XML-to-HTML stylesheet processor.
#[async_trait]
pub trait XmlTransform: Send + Sync {
    /// Whether the processor can run at all on this host.
    async fn is_available(&self) -> bool;

    /// Apply `stylesheet` to `source` and return the resulting document.
    async fn transform(&self, stylesheet: &Path, source: &Path) -> Result<String>;
}

/// Runs the `xsltproc` command-line processor.
#[derive(Debug, Clone)]
pub struct Xsltproc {
    program: String,
    timeout: Duration,
}

impl Xsltproc {
    pub fn new(timeout: Duration) -> Self {
        Self::with_program("xsltproc", timeout)
    }

    pub fn with_program(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl XmlTransform for Xsltproc {
    async fn is_available(&self) -> bool {
        let version = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();
        match tokio::time::timeout(self.timeout, version).await {
            Ok(Ok(status)) => status.success(),
            _ => false,
        }
    }

    async fn transform(&self, stylesheet: &Path, source: &Path) -> Result<String> {
        let fail = |reason: String| NightlyError::Transform {
            source_file: source.to_path_buf(),
            reason,
        };

        let run = Command::new(&self.program)
            .arg(stylesheet)
            .arg(source)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();
        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| fail(format!("timed out after {} seconds", self.timeout.as_secs())))?
            .map_err(|e| fail(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(fail(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// File name of a report up to its first `.`; names the module.
pub fn report_prefix(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.split_once('.') {
        Some((prefix, _)) => prefix.to_string(),
        None => name,
    }
}

/// Name the originating module in the report title.
pub fn splice_module_title(html: &str, module: &str) -> String {
    html.replace(
        REPORT_TITLE_MARKER,
        &format!("Report [<i>module - {module}</i>]</div>"),
    )
}

/// A report written to the publish area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedReport {
    pub module: String,
    pub file_name: String,
    pub transformed: bool,
}

/// Publish one XML report into `dest_dir`.
///
/// With a transform, writes `<module>.html` with the module spliced into the
/// title. Without one, or when the transform fails, copies `<module>.xml`.
pub async fn publish_report(
    transform: Option<(&dyn XmlTransform, &Path)>,
    source: &Path,
    dest_dir: &Path,
) -> Result<PublishedReport> {
    let module = report_prefix(source);

    if let Some((processor, stylesheet)) = transform {
        match processor.transform(stylesheet, source).await {
            Ok(html) => {
                let file_name = format!("{module}.html");
                std::fs::write(dest_dir.join(&file_name), splice_module_title(&html, &module))?;
                debug!(module = %module, "transformed analysis report");
                return Ok(PublishedReport {
                    module,
                    file_name,
                    transformed: true,
                });
            }
            Err(e) => warn!(module = %module, error = %e, "transform failed, copying raw XML"),
        }
    }

    let file_name = format!("{module}.xml");
    std::fs::copy(source, dest_dir.join(&file_name))?;
    Ok(PublishedReport {
        module,
        file_name,
        transformed: false,
    })
}

/// Stylesheet path when both it and the processor are usable.
pub async fn resolve_transform(processor: &dyn XmlTransform, stylesheet: &Path) -> Option<PathBuf> {
    if !stylesheet.is_file() {
        warn!(stylesheet = %stylesheet.display(), "stylesheet missing, analysis reports stay XML");
        return None;
    }
    if !processor.is_available().await {
        warn!("no XSLT processor available, analysis reports stay XML");
        return None;
    }
    Some(stylesheet.to_path_buf())
}

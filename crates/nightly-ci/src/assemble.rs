//! Report assembly: copy each successful stage's artifacts into the site
//! directory and append its section to the status page.

use std::fs;
use std::path::Path;

use anyhow::Context;
use nightly_core::junit::parse_test_log;
use nightly_core::publish::{copy_file, copy_tree, sorted_entries, write_atomic};
use nightly_core::report::{render_summary_unavailable, render_test_summary};
use nightly_core::transform::{publish_report, resolve_transform};
use nightly_core::{Link, NightlyConfig, ReportPage, RunDate, TestSummaryRow, XmlTransform};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::depgraph;
use crate::runner::CiRunner;
use crate::stage::StageConfig;

/// File the effective configuration is published under.
pub const CONFIG_FILE: &str = "nightly.json";

pub const INDEX_PAGE: &str = "index.html";
pub const SUMMARY_PAGE: &str = "junitsummary.html";

/// Which stages succeeded, and so get a section on the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFlags {
    pub dist: bool,
    pub test: bool,
    pub javadoc: bool,
    pub doccheck: bool,
    pub analysis: bool,
}

impl StageFlags {
    pub fn all() -> Self {
        Self {
            dist: true,
            test: true,
            javadoc: true,
            doccheck: true,
            analysis: true,
        }
    }
}

/// What became of the test log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum SummaryStatus {
    Parsed { rows: Vec<TestSummaryRow> },
    Malformed { error: String },
}

/// Output of one assembly pass.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub index_html: String,
    pub summary: Option<SummaryStatus>,
}

/// Builds the site for one run into a directory.
pub struct ReportAssembler<'a> {
    config: &'a NightlyConfig,
    date: RunDate,
    transform: &'a dyn XmlTransform,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(config: &'a NightlyConfig, date: RunDate, transform: &'a dyn XmlTransform) -> Self {
        Self {
            config,
            date,
            transform,
        }
    }

    /// Copy artifacts into `site` and render the page, sections in pipeline order.
    ///
    /// The page itself is returned, not written.
    pub async fn assemble(&self, flags: StageFlags, site: &Path) -> anyhow::Result<Assembly> {
        let config = self.config;
        let mut page = ReportPage::new(&config.project.name, &self.date);

        if flags.dist {
            self.distribution(&mut page, site)?;
        }
        if flags.javadoc {
            self.javadoc(&mut page, site).await?;
        }
        if depgraph::generate(config, site).await? {
            page.push_dependency_graph(depgraph::GRAPH_PNG, depgraph::GRAPH_PS);
        }
        let summary = if flags.test {
            self.test_results(&mut page, site)?
        } else {
            None
        };
        if flags.doccheck {
            self.doccheck(&mut page, site)?;
        }
        if flags.analysis {
            self.analysis(&mut page, site).await?;
        }

        Ok(Assembly {
            index_html: page.finish(&config.project, CONFIG_FILE),
            summary,
        })
    }

    fn distribution(&self, page: &mut ReportPage, site: &Path) -> anyhow::Result<()> {
        let project = &self.config.project;
        let jar_name = format!("{}-{}.jar", project.artifact_name, self.date.stamp());
        let jar = self
            .config
            .source_dir
            .join(&self.config.layout.dist_dir)
            .join(&jar_name);
        if !jar.is_file() {
            warn!(jar = %jar.display(), "distribution jar missing, no link published");
            return Ok(());
        }
        copy_file(&jar, &site.join(&jar_name)).with_context(|| format!("copy {}", jar.display()))?;

        let log = self.copy_log("build.log", site)?;
        page.push_distribution(&project.name, &jar_name, log.as_deref());
        Ok(())
    }

    async fn javadoc(&self, page: &mut ReportPage, site: &Path) -> anyhow::Result<()> {
        let doc_dir = self.config.source_dir.join(&self.config.layout.doc_dir);
        let api = doc_dir.join("api");
        if !api.is_dir() {
            warn!(api = %api.display(), "API documentation missing, no link published");
            return Ok(());
        }

        let tarball = format!("javadoc-{}.tgz", self.date.stamp());
        let tar = StageConfig::custom(
            "tarball".to_string(),
            vec![
                "nice".to_string(),
                "-n".to_string(),
                "19".to_string(),
                "tar".to_string(),
                "-zcvf".to_string(),
                site.join(&tarball).to_string_lossy().into_owned(),
                "-C".to_string(),
                doc_dir.to_string_lossy().into_owned(),
                "api".to_string(),
            ],
            "tar.log".to_string(),
            self.config.timeout_secs,
        );
        let packed = CiRunner::execute_stage(&tar, &self.config.source_dir, &self.config.log_dir)
            .await?
            .passed();
        if !packed {
            warn!("javadoc tarball failed, see tar.log");
        }

        copy_tree(&api, &site.join("api")).context("copy API documentation")?;
        let log = self.copy_log("javadoc.log", site)?;
        page.push_javadoc(packed.then_some(tarball.as_str()), "api", log.as_deref());
        Ok(())
    }

    fn test_results(
        &self,
        page: &mut ReportPage,
        site: &Path,
    ) -> anyhow::Result<Option<SummaryStatus>> {
        let reports = self.config.reports_dir();
        if !reports.is_dir() {
            warn!(reports = %reports.display(), "reports directory missing, no test results published");
            return Ok(None);
        }

        let test_dir = site.join("test");
        fs::create_dir_all(&test_dir)?;
        for name in sorted_entries(&reports, |n| n.starts_with("result-"))? {
            let src = reports.join(&name);
            if src.is_dir() {
                copy_tree(&src, &test_dir.join(&name))?;
            } else {
                copy_file(&src, &test_dir.join(&name))?;
            }
        }
        let result_files = sorted_entries(&reports, |n| {
            n.starts_with("result-") && n.ends_with(".txt")
        })?;
        let links: Vec<Link> = result_files
            .into_iter()
            .map(|name| {
                let label = test_title(&name);
                Link::new(format!("test/{name}"), label)
            })
            .collect();

        let test_log = self.config.log_path("test.log");
        if !test_log.is_file() {
            warn!("test.log missing, no test summary published");
            page.push_test_results(&links, self.config.links_per_line, None);
            return Ok(None);
        }
        copy_file(&test_log, &site.join("test.log"))?;

        let text = String::from_utf8_lossy(&fs::read(&test_log)?).into_owned();
        let (html, status) = match parse_test_log(&text) {
            Ok(rows) => {
                info!(modules = rows.len(), "parsed test summary");
                (
                    render_test_summary(&self.config.project.name, &self.date, &rows),
                    SummaryStatus::Parsed { rows },
                )
            }
            Err(e) => {
                error!(error = %e, "test log is malformed, publishing summary-unavailable page");
                (
                    render_summary_unavailable(&self.config.project.name, &self.date, &e),
                    SummaryStatus::Malformed {
                        error: e.to_string(),
                    },
                )
            }
        };
        write_atomic(&site.join(SUMMARY_PAGE), &html)?;

        page.push_test_results(
            &links,
            self.config.links_per_line,
            Some(("test.log", SUMMARY_PAGE)),
        );
        Ok(Some(status))
    }

    fn doccheck(&self, page: &mut ReportPage, site: &Path) -> anyhow::Result<()> {
        let reports = self.config.reports_dir().join("javadoc");
        if !reports.is_dir() {
            warn!(reports = %reports.display(), "doccheck reports missing, no links published");
            return Ok(());
        }
        copy_tree(&reports, &site.join("javadoc")).context("copy doccheck reports")?;

        let links: Vec<Link> = sorted_entries(&reports, |_| true)?
            .into_iter()
            .map(|name| Link::new(format!("javadoc/{name}"), name))
            .collect();
        page.push_doccheck(&links, self.config.links_per_line);
        Ok(())
    }

    async fn analysis(&self, page: &mut ReportPage, site: &Path) -> anyhow::Result<()> {
        let reports = self.config.reports_dir().join("pmd");
        if !reports.is_dir() {
            warn!(reports = %reports.display(), "analysis reports missing, no links published");
            return Ok(());
        }
        let dest = site.join("pmd");
        fs::create_dir_all(&dest)?;

        let stylesheet = self.config.source_dir.join(&self.config.layout.stylesheet);
        let stylesheet = resolve_transform(self.transform, &stylesheet).await;

        let mut links = Vec::new();
        for name in sorted_entries(&reports, |n| n.ends_with(".xml"))? {
            let published = publish_report(
                stylesheet.as_deref().map(|s| (self.transform, s)),
                &reports.join(&name),
                &dest,
            )
            .await
            .with_context(|| format!("publish analysis report {name}"))?;
            links.push(Link::new(
                format!("pmd/{}", published.file_name),
                published.module,
            ));
        }
        page.push_analysis(&links, self.config.links_per_line);
        Ok(())
    }

    /// Copy a stage log next to the page. `None` when the log is absent.
    fn copy_log(&self, name: &str, site: &Path) -> anyhow::Result<Option<String>> {
        let log = self.config.log_path(name);
        if !log.is_file() {
            warn!(log = %name, "stage log missing, not linked");
            return Ok(None);
        }
        copy_file(&log, &site.join(name)).with_context(|| format!("copy {name}"))?;
        Ok(Some(name.to_string()))
    }
}

/// Link label of a test result file: the text between the first `-` and the
/// first `.`.
pub fn test_title(file_name: &str) -> String {
    let stem = file_name.split('.').next().unwrap_or(file_name);
    match stem.split_once('-') {
        Some((_, title)) => title.to_string(),
        None => stem.to_string(),
    }
}

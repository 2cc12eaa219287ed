//! The cumulative status page.
//!
//! Sections are appended in pipeline order as each stage resolves and the
//! page is closed exactly once by [`ReportPage::finish`].

use super::links::{render_link_lines, Link};
use super::{escape_html, page_head};
use crate::config::ProjectConfig;
use crate::date::RunDate;

pub const JUNIT_HOME: &str = "http://www.junit.org/index.htm";
pub const DOCCHECK_HOME: &str = "http://java.sun.com/j2se/javadoc/doccheck/index.html";
pub const PMD_HOME: &str = "http://pmd.sourceforge.net/";

/// Opening tag of the results table holding every stage section.
pub const RESULTS_TABLE: &str = "<table border=0 cellspacing=5>";

/// HTML page under construction.
#[derive(Debug, Clone)]
pub struct ReportPage {
    html: String,
}

impl ReportPage {
    /// Open the page: head, title bar, and the results table header.
    pub fn new(project_name: &str, date: &RunDate) -> Self {
        let title = format!("{} Nightly Build - {}", escape_html(project_name), date.heading());
        let mut html = page_head(&title);
        html.push_str(&format!(
            "<body>\n<center>\n<h2>{title}</h2>\n{RESULTS_TABLE}\n<thead>\n<tr>\n<th></th>\n<th></th>\n<th>Extra Info</th>\n</tr>\n</thead>\n"
        ));
        Self { html }
    }

    /// Distribution jar row, with the build log in the extra-info column.
    pub fn push_distribution(&mut self, project_name: &str, jar_name: &str, build_log: Option<&str>) {
        let jar = escape_html(jar_name);
        self.html.push_str(&format!(
            "<tr>\n<td>Combined {} jar files:</td><td> <a href=\"{jar}\">{jar}</a></td>\n",
            escape_html(project_name)
        ));
        self.push_log_cell(build_log);
    }

    /// API documentation row: tarball, browsable tree and the javadoc log.
    pub fn push_javadoc(&mut self, tarball: Option<&str>, api_dir: &str, javadoc_log: Option<&str>) {
        self.html.push_str("<tr>\n<td valign=\"top\">Javadocs:</td>\n<td>");
        if let Some(tarball) = tarball {
            self.html
                .push_str(&format!("<a href=\"{}\">Tarball</a><br>\n", escape_html(tarball)));
        }
        self.html.push_str(&format!(
            "<a href=\"{}\">Browse online</a></td>\n",
            escape_html(api_dir)
        ));
        self.push_log_cell(javadoc_log);
        self.push_rule();
    }

    /// Dependency graph row linking the rendered images.
    pub fn push_dependency_graph(&mut self, png: &str, ps: &str) {
        self.html.push_str(&format!(
            "<tr>\n<td valign=\"top\">Dependency Graph:</td>\n<td>\n<a href=\"{}\">PNG</a>\n<a href=\"{}\">PS</a>\n</td>\n</tr>\n",
            escape_html(png),
            escape_html(ps)
        ));
    }

    /// Per-module test result links plus the raw log and summary links.
    pub fn push_test_results(
        &mut self,
        links: &[Link],
        per_line: usize,
        log_and_summary: Option<(&str, &str)>,
    ) {
        self.html.push_str(&format!(
            "<tr>\n<td valign=\"top\"><a href=\"{JUNIT_HOME}\">JUnit</a> results:</td><td> {}</td>",
            render_link_lines(links, per_line)
        ));
        match log_and_summary {
            Some((log, summary)) => self.html.push_str(&format!(
                "\n<td valign=\"top\">\n<a href=\"{log}\">{log}</a><br>\n<a href=\"{summary}\">Summary</a>\n</td></tr>\n",
                log = escape_html(log),
                summary = escape_html(summary)
            )),
            None => self.html.push_str("</tr>\n"),
        }
    }

    /// Documentation-check links, one per report entry.
    pub fn push_doccheck(&mut self, links: &[Link], per_line: usize) {
        self.html.push_str(&format!(
            "<tr>\n<td valign=\"top\"><a href=\"{DOCCHECK_HOME}\">DocCheck</a> results:</td><td> {}</td></tr>\n",
            render_link_lines(links, per_line)
        ));
    }

    /// Static-analysis report links, one per module.
    pub fn push_analysis(&mut self, links: &[Link], per_line: usize) {
        self.html.push_str(&format!(
            "<tr>\n<td valign=\"top\"><a href=\"{PMD_HOME}\">PMD</a> results:</td><td> {}</td></tr>\n",
            render_link_lines(links, per_line)
        ));
    }

    /// Close the table, add the footer, and return the finished HTML.
    pub fn finish(mut self, project: &ProjectConfig, generated_by: &str) -> String {
        self.push_rule();
        if !project.build_details.is_empty() {
            let details: Vec<String> = project.build_details.iter().map(|d| escape_html(d)).collect();
            self.html.push_str(&format!(
                "<tr>\n<td valign=\"top\"><i>Build details</i></td>\n<td><i>{}</i></td>\n</tr>\n",
                details.join("<br>\n")
            ));
        }
        let generated_by = escape_html(generated_by);
        self.html.push_str(&format!(
            "</table>\n<br><br><br>Generated by <a href=\"{generated_by}\">{generated_by}</a>\n<p>\n"
        ));
        if let Some(url) = &project.project_url {
            let inner = match &project.logo_url {
                Some(logo) => format!(
                    "<img alt=\"{} Logo\" border=\"0\" height=\"31\" width=\"88\" src=\"{}\">",
                    escape_html(&project.name),
                    escape_html(logo)
                ),
                None => escape_html(&project.name),
            };
            self.html
                .push_str(&format!("<a href=\"{}\">{inner}</a>\n", escape_html(url)));
        }
        self.html.push_str("</center>\n</body>\n</html>\n");
        self.html
    }

    /// The HTML accumulated so far.
    pub fn as_str(&self) -> &str {
        &self.html
    }

    fn push_log_cell(&mut self, log: Option<&str>) {
        match log {
            Some(name) => {
                let name = escape_html(name);
                self.html.push_str(&format!(
                    "<td valign=\"top\"><a href=\"{name}\">{name}</a></td></tr>\n"
                ));
            }
            None => self.html.push_str("</tr>\n"),
        }
    }

    fn push_rule(&mut self) {
        self.html.push_str("<tr><td colspan=3><hr></td></tr>\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> RunDate {
        RunDate::from_ymd(2006, 5, 1).unwrap()
    }

    #[test]
    fn test_header_carries_title_and_date() {
        let page = ReportPage::new("CDK", &date());
        assert!(page.as_str().contains("<title>CDK Nightly Build - 05 / 01 / 2006</title>"));
        assert!(page.as_str().contains("<h2>CDK Nightly Build - 05 / 01 / 2006</h2>"));
        assert!(page.as_str().contains("<th>Extra Info</th>"));
    }

    #[test]
    fn test_distribution_row_with_and_without_log() {
        let mut page = ReportPage::new("CDK", &date());
        page.push_distribution("CDK", "cdk-svn-20060501.jar", Some("build.log"));
        assert!(page
            .as_str()
            .contains("<a href=\"cdk-svn-20060501.jar\">cdk-svn-20060501.jar</a>"));
        assert!(page.as_str().contains("<a href=\"build.log\">build.log</a></td></tr>"));

        let mut bare = ReportPage::new("CDK", &date());
        bare.push_distribution("CDK", "cdk-svn-20060501.jar", None);
        assert!(!bare.as_str().contains("build.log"));
        assert!(bare.as_str().ends_with("</td>\n</tr>\n"));
    }

    #[test]
    fn test_javadoc_row_without_tarball() {
        let mut page = ReportPage::new("CDK", &date());
        page.push_javadoc(None, "api", Some("javadoc.log"));
        assert!(!page.as_str().contains("Tarball"));
        assert!(page.as_str().contains("<a href=\"api\">Browse online</a>"));
        assert!(page.as_str().ends_with("<tr><td colspan=3><hr></td></tr>\n"));
    }

    #[test]
    fn test_test_results_row_links_summary() {
        let mut page = ReportPage::new("CDK", &date());
        let links = vec![Link::new("test/result-core.txt", "core")];
        page.push_test_results(&links, 4, Some(("test.log", "junitsummary.html")));
        let html = page.as_str();
        assert!(html.contains("<a href=\"test/result-core.txt\">core</a>"));
        assert!(html.contains("<a href=\"junitsummary.html\">Summary</a>"));
    }

    #[test]
    fn test_finish_footer() {
        let project = ProjectConfig {
            build_details: vec!["Fedora Core 5".to_string(), "Ant 1.6.2".to_string()],
            project_url: Some("http://sourceforge.net/projects/cdk/".to_string()),
            ..ProjectConfig::default()
        };
        let html = ReportPage::new("CDK", &date()).finish(&project, "nightly.json");
        assert!(html.contains("<i>Fedora Core 5<br>\nAnt 1.6.2</i>"));
        assert!(html.contains("Generated by <a href=\"nightly.json\">nightly.json</a>"));
        assert!(html.contains("<a href=\"http://sourceforge.net/projects/cdk/\">CDK</a>"));
        assert!(html.ends_with("</html>\n"));
    }

    #[test]
    fn test_finish_without_details_has_no_details_row() {
        let html = ReportPage::new("CDK", &date()).finish(&ProjectConfig::default(), "nightly.json");
        assert!(!html.contains("Build details"));
    }
}

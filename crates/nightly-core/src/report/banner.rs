//! Degenerate pages: the placeholder shown while a run assembles, and the
//! banners laid over the previous run's page when a run ends early.

use super::page::RESULTS_TABLE;
use super::{escape_html, page_head};

/// Opens a banner block so a later run can replace it instead of stacking.
pub const BANNER_START: &str = "<!-- nightly:banner -->";
pub const BANNER_END: &str = "<!-- /nightly:banner -->";

/// Why the previous page is being republished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    /// The source sync failed; yesterday's build is still shown.
    StaleBuild,
    /// The build failed; the banner links the published build log.
    BuildFailed { log_href: String },
}

impl Banner {
    pub fn html(&self) -> String {
        let message = match self {
            Banner::StaleBuild => {
                "Could not connect to the source repository. Using yesterday's build".to_string()
            }
            Banner::BuildFailed { log_href } => {
                let href = escape_html(log_href);
                format!("Could not compile the sources - <a href=\"{href}\">{href}</a>")
            }
        };
        format!("{BANNER_START}\n<center><b><h3>{message}</h3></b></center>\n<hr>\n<p>\n{BANNER_END}\n")
    }
}

/// Start of the page heading every site page carries.
pub fn heading_marker(project_name: &str) -> String {
    format!("<h2>{} Nightly Build", escape_html(project_name))
}

/// Page shown while the run rebuilds the site.
pub fn placeholder_page(project_name: &str) -> String {
    let title = format!("{} Nightly Build", escape_html(project_name));
    let mut html = page_head(&title);
    html.push_str(&format!(
        "<body>\n<center>\n<h2>{title}</h2>\n<p>\n<br><br>\nRegenerating Build - Please come back in a while\n</center>\n</body>\n</html>\n"
    ));
    html
}

/// Previous page with the stale-build banner.
pub fn stale_build_page(previous: Option<&str>, project_name: &str) -> String {
    insert_banner(previous, project_name, &Banner::StaleBuild)
}

/// Previous page with the build-failed banner linking `log_href`.
///
/// The previous results table is dropped; the heading and footer remain.
pub fn build_failed_page(previous: Option<&str>, project_name: &str, log_href: &str) -> String {
    let stripped = previous.map(strip_results);
    insert_banner(
        stripped.as_deref(),
        project_name,
        &Banner::BuildFailed {
            log_href: log_href.to_string(),
        },
    )
}

/// Insert `banner` once, ahead of the first page heading of `previous`.
///
/// A banner left by an earlier early-ending run is replaced. Without a
/// heading the banner goes right after `<body>`, or in front of everything.
/// Without a previous page a minimal page carrying the banner is produced.
pub fn insert_banner(previous: Option<&str>, project_name: &str, banner: &Banner) -> String {
    let banner_html = banner.html();
    let Some(previous) = previous else {
        let title = format!("{} Nightly Build", escape_html(project_name));
        let mut html = page_head(&title);
        html.push_str(&format!(
            "<body>\n<center>\n{banner_html}<h2>{title}</h2>\n</center>\n</body>\n</html>\n"
        ));
        return html;
    };

    let page = strip_banner(previous);
    let marker = heading_marker(project_name);
    if let Some(pos) = page.find(&marker) {
        let mut out = String::with_capacity(page.len() + banner_html.len());
        out.push_str(&page[..pos]);
        out.push_str(&banner_html);
        out.push_str(&page[pos..]);
        return out;
    }
    if let Some(pos) = page.find("<body>") {
        let at = pos + "<body>".len();
        return format!("{}\n{}{}", &page[..at], banner_html, &page[at..]);
    }
    format!("{banner_html}{page}")
}

/// Remove the results table, keeping the heading and the footer.
fn strip_results(page: &str) -> String {
    let Some(start) = page.find(RESULTS_TABLE) else {
        return page.to_string();
    };
    let Some(end_rel) = page[start..].find("</table>") else {
        return page.to_string();
    };
    let mut end = start + end_rel + "</table>".len();
    if page[end..].starts_with('\n') {
        end += 1;
    }
    format!("{}{}", &page[..start], &page[end..])
}

fn strip_banner(page: &str) -> String {
    let Some(start) = page.find(BANNER_START) else {
        return page.to_string();
    };
    let Some(end_rel) = page[start..].find(BANNER_END) else {
        return page.to_string();
    };
    let mut end = start + end_rel + BANNER_END.len();
    if page[end..].starts_with('\n') {
        end += 1;
    }
    format!("{}{}", &page[..start], &page[end..])
}

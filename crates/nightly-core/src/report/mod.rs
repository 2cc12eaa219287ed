//! HTML rendering for the nightly site.

pub mod banner;
pub mod links;
pub mod page;
pub mod summary;

pub use banner::{build_failed_page, placeholder_page, stale_build_page, Banner};
pub use links::{render_link_lines, Link};
pub use page::ReportPage;
pub use summary::{render_summary_unavailable, render_test_summary};

/// Escape text for use in HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// `<html>` and `<head>` shared by every page the site publishes.
pub(crate) fn page_head(title: &str) -> String {
    format!(
        "<html>\n<head>\n  <title>{title}</title>\n  <style>\n  <!--\n    tr:hover {{ background-color: #efefef; }}\n  //-->\n  </style>\n</head>\n"
    )
}

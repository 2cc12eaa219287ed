//! Link lists broken into lines of N entries.

use super::escape_html;

/// One anchor in a link list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    pub label: String,
}

impl Link {
    pub fn new(href: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            label: label.into(),
        }
    }
}

/// Render `links` with a `<br>` after every `per_line`-th link.
///
/// No break follows a trailing link whose position is not a multiple of
/// `per_line`. A `per_line` of zero renders everything on one line.
pub fn render_link_lines(links: &[Link], per_line: usize) -> String {
    let mut out = String::new();
    for (idx, link) in links.iter().enumerate() {
        out.push_str(&format!(
            "\n    <a href=\"{}\">{}</a> ",
            escape_html(&link.href),
            escape_html(&link.label)
        ));
        let position = idx + 1;
        if per_line > 0 && position % per_line == 0 {
            out.push_str("<br>");
        }
    }
    out
}

//! `junitsummary.html`: per-module test counts.

use super::{escape_html, page_head};
use crate::date::RunDate;
use crate::error::NightlyError;
use crate::junit::TestSummaryRow;

/// Render the summary table, rows in the order given.
pub fn render_test_summary(project_name: &str, date: &RunDate, rows: &[TestSummaryRow]) -> String {
    let title = format!(
        "{} JUnit Test Summary ({})",
        escape_html(project_name),
        date.heading()
    );
    let mut html = page_head(&title);
    html.push_str(&format!(
        "<body>\n<center>\n<h2>{title}</h2>\n<table border=0 cellspacing=5>\n<thead>\n<tr>\n<td><b>Module</b></td><td><b>Number of Tests</b></td><td><b>Failed</b></td><td><b>Errors</b></td>\n</tr>\n</thead>\n<tr>\n<td colspan=4><hr></td>\n</tr>\n"
    ));
    for row in rows {
        html.push_str(&format!(
            "<tr><td align=\"left\">{}</td><td align=\"center\">{}</td><td align=\"center\">{}</td><td align=\"center\">{}</td></tr>\n",
            escape_html(&row.module),
            row.tests_run,
            row.failures,
            row.errors
        ));
    }
    html.push_str("<tr>\n<td colspan=4><hr></td>\n</tr>\n</table>\n</center>\n</body>\n</html>\n");
    html
}

/// Page published in place of the table when the test log could not be parsed.
pub fn render_summary_unavailable(project_name: &str, date: &RunDate, error: &NightlyError) -> String {
    let title = format!(
        "{} JUnit Test Summary ({})",
        escape_html(project_name),
        date.heading()
    );
    let mut html = page_head(&title);
    html.push_str(&format!(
        "<body>\n<center>\n<h2>{title}</h2>\n<h3>Test summary unavailable</h3>\n<p><code>{}</code></p>\n<p>See <a href=\"test.log\">test.log</a>.</p>\n</center>\n</body>\n</html>\n",
        escape_html(&error.to_string())
    ));
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_render_in_order() {
        let date = RunDate::from_ymd(2006, 5, 1).unwrap();
        let rows = vec![TestSummaryRow::new("A", 10, 1, 0), TestSummaryRow::new("B", 5, 0, 2)];
        let html = render_test_summary("CDK", &date, &rows);

        assert!(html.contains("<h2>CDK JUnit Test Summary (05 / 01 / 2006)</h2>"));
        let a = html.find("<td align=\"left\">A</td>").unwrap();
        let b = html.find("<td align=\"left\">B</td>").unwrap();
        assert!(a < b);
        assert!(html.contains(
            "<td align=\"left\">B</td><td align=\"center\">5</td><td align=\"center\">0</td><td align=\"center\">2</td>"
        ));
    }

    #[test]
    fn test_unavailable_page_is_distinct_from_empty_table() {
        let date = RunDate::from_ymd(2006, 5, 1).unwrap();
        let err = NightlyError::MalformedTestLog {
            line: 4,
            reason: "module core has no statistics line before end of log".to_string(),
        };
        let broken = render_summary_unavailable("CDK", &date, &err);
        let empty = render_test_summary("CDK", &date, &[]);

        assert!(broken.contains("Test summary unavailable"));
        assert!(broken.contains("line 4"));
        assert!(!empty.contains("Test summary unavailable"));
        assert!(empty.contains("<b>Number of Tests</b>"));
    }
}

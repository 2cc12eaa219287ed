//! Rendering tests across the page, summary and banner builders.

use nightly_core::report::banner::BANNER_START;
use nightly_core::report::{
    build_failed_page, placeholder_page, render_link_lines, render_summary_unavailable,
    stale_build_page,
};
use nightly_core::{
    job_failed, parse_test_log, FailureDetector, Link, MarkerScan, NightlyError, ProjectConfig,
    ReportPage, RunDate,
};

fn date() -> RunDate {
    RunDate::from_ymd(2006, 5, 1).unwrap()
}

fn full_page() -> String {
    let mut page = ReportPage::new("CDK", &date());
    page.push_distribution("CDK", "cdk-svn-20060501.jar", Some("build.log"));
    page.push_javadoc(Some("javadoc-20060501.tgz"), "api", Some("javadoc.log"));
    let tests: Vec<Link> = ["core", "io", "smiles"]
        .iter()
        .map(|m| Link::new(format!("test/result-{m}.txt"), *m))
        .collect();
    page.push_test_results(&tests, 4, Some(("test.log", "junitsummary.html")));
    page.finish(&ProjectConfig::default(), "nightly.json")
}

/// Test: sections appear in pipeline order
#[test]
fn test_sections_in_pipeline_order() {
    let html = full_page();
    let jar = html.find("Combined CDK jar files").unwrap();
    let docs = html.find("Javadocs:").unwrap();
    let tests = html.find("JUnit</a> results").unwrap();
    let footer = html.find("Generated by").unwrap();
    assert!(jar < docs && docs < tests && tests < footer);
}

/// Test: identical inputs render identical bytes
#[test]
fn test_rendering_is_deterministic() {
    assert_eq!(full_page(), full_page());
}

/// Test: a stale banner on a real page sits before the heading, once
#[test]
fn test_repeated_stale_banner_does_not_stack() {
    let previous = full_page();
    let once = stale_build_page(Some(&previous), "CDK");
    let twice = stale_build_page(Some(&once), "CDK");
    assert_eq!(once, twice);
    assert_eq!(twice.matches(BANNER_START).count(), 1);
    assert!(twice.find(BANNER_START).unwrap() < twice.find("<h2>CDK Nightly Build").unwrap());
}

/// Test: a build-failed banner replaces an earlier stale banner
#[test]
fn test_build_failed_replaces_stale_banner() {
    let stale = stale_build_page(Some(&full_page()), "CDK");
    let failed = build_failed_page(Some(&stale), "CDK", "build.log");
    assert_eq!(failed.matches(BANNER_START).count(), 1);
    assert!(!failed.contains("yesterday's build"));
    assert!(failed.contains("<a href=\"build.log\">build.log</a></h3>"));
}

/// Test: the placeholder carries its heading, so a banner can land on it
#[test]
fn test_banner_over_placeholder() {
    let placeholder = placeholder_page("CDK");
    assert!(placeholder.contains("Regenerating Build - Please come back in a while"));
    let page = stale_build_page(Some(&placeholder), "CDK");
    assert!(page.find(BANNER_START).unwrap() < page.find("<h2>CDK Nightly Build").unwrap());
}

/// Test: parsing feeds straight into the summary pages
#[test]
fn test_malformed_log_renders_distinct_page() {
    let log = "test-module:\n     [echo] Running tests for module io\n    \
               [junit] Tests run: ten, Failures: 0, Errors: 0\n";
    let err = parse_test_log(log).unwrap_err();
    assert!(matches!(err, NightlyError::MalformedTestLog { line: 3, .. }));

    let html = render_summary_unavailable("CDK", &date(), &err);
    assert!(html.contains("Test summary unavailable"));
    assert!(!html.contains("Number of Tests"));

    assert!(parse_test_log("BUILD SUCCESSFUL\n").unwrap().is_empty());
}

/// Test: the default detector agrees with the plain marker check
#[test]
fn test_detector_matches_marker_check() {
    let detector = MarkerScan::default();
    for log in ["", "BUILD SUCCESSFUL", "x\nBUILD FAILED\ny", "BUILD FAILED"] {
        assert_eq!(detector.did_stage_fail(log), job_failed(log));
    }
}

/// Test: link lists of nine break after the fourth and eighth link only
#[test]
fn test_link_breaks() {
    let links: Vec<Link> = (1..=9)
        .map(|i| Link::new(format!("pmd/m{i}.html"), format!("m{i}")))
        .collect();
    let html = render_link_lines(&links, 4);
    assert_eq!(html.matches("<br>").count(), 2);
    assert!(!html.trim_end().ends_with("<br>"));
}

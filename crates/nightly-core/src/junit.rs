//! Test summary parsing.
//!
//! The test target prints one block per module:
//!
//! ```text
//! test-module:
//!      [echo] Running tests for module core
//!     [junit] Running org.openscience.cdk.modulesuites.McoreTests
//!     [junit] Tests run: 812, Failures: 3, Errors: 1, Time elapsed: 41.2 sec
//! ```
//!
//! The layout is positional: the module name is the sixth word of the line
//! after the marker, and the counts sit at fixed word positions of the first
//! statistics line that follows.

use serde::{Deserialize, Serialize};

use crate::error::{NightlyError, Result};

/// Prefix of the line opening a module block.
pub const MODULE_START: &str = "test-module";

/// Substring identifying the statistics line of a module block.
pub const STATS_MARKER: &str = "[junit] Tests run:";

const NAME_WORD: usize = 5;
const RUN_WORD: usize = 3;
const FAILURES_WORD: usize = 5;
const ERRORS_WORD: usize = 7;

/// Test counts of one build module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSummaryRow {
    pub module: String,
    pub tests_run: u32,
    pub failures: u32,
    pub errors: u32,
}

impl TestSummaryRow {
    pub fn new(module: impl Into<String>, tests_run: u32, failures: u32, errors: u32) -> Self {
        Self {
            module: module.into(),
            tests_run,
            failures,
            errors,
        }
    }
}

/// Parse every module block of a test-run log, in log order.
///
/// A log without module blocks yields an empty list. Any malformed block
/// fails the whole parse with [`NightlyError::MalformedTestLog`].
pub fn parse_test_log(text: &str) -> Result<Vec<TestSummaryRow>> {
    let lines: Vec<&str> = text.lines().collect();
    let mut rows = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if !lines[i].starts_with(MODULE_START) {
            i += 1;
            continue;
        }

        let name_idx = i + 1;
        let name_line = lines
            .get(name_idx)
            .ok_or_else(|| malformed(i + 1, "log ends right after a module marker".to_string()))?;
        let module = name_line
            .split_whitespace()
            .nth(NAME_WORD)
            .ok_or_else(|| {
                malformed(
                    name_idx + 1,
                    format!("module name line is too short: {:?}", name_line.trim()),
                )
            })?
            .to_string();

        let mut stats_idx = None;
        for (j, line) in lines.iter().enumerate().skip(name_idx + 1) {
            if line.contains(STATS_MARKER) {
                stats_idx = Some(j);
                break;
            }
            if line.starts_with(MODULE_START) {
                return Err(malformed(
                    j + 1,
                    format!("module {module} has no statistics line before the next module"),
                ));
            }
        }
        let stats_idx = stats_idx.ok_or_else(|| {
            malformed(
                lines.len(),
                format!("module {module} has no statistics line before end of log"),
            )
        })?;

        rows.push(parse_stats_line(&module, lines[stats_idx], stats_idx + 1)?);
        i = stats_idx + 1;
    }

    Ok(rows)
}

fn parse_stats_line(module: &str, line: &str, line_no: usize) -> Result<TestSummaryRow> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let shape_ok = words.len() > ERRORS_WORD
        && words[0] == "[junit]"
        && words[1] == "Tests"
        && words[2] == "run:"
        && words[FAILURES_WORD - 1] == "Failures:"
        && words[ERRORS_WORD - 1] == "Errors:";
    if !shape_ok {
        return Err(malformed(
            line_no,
            format!(
                "statistics line of module {module} has unexpected layout: {:?}",
                line.trim()
            ),
        ));
    }

    let count = |idx: usize| -> Result<u32> {
        let raw = words[idx].trim_end_matches(|c: char| c == ',' || c == ';');
        raw.parse::<u32>().map_err(|_| {
            malformed(
                line_no,
                format!("count {:?} of module {module} is not a number", words[idx]),
            )
        })
    };

    Ok(TestSummaryRow {
        module: module.to_string(),
        tests_run: count(RUN_WORD)?,
        failures: count(FAILURES_WORD)?,
        errors: count(ERRORS_WORD)?,
    })
}

fn malformed(line: usize, reason: String) -> NightlyError {
    NightlyError::MalformedTestLog { line, reason }
}

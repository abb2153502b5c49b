//! Result tree and reports.
//!
//! A [`RunReport`] mirrors the registered suite tree: one [`SuiteReport`] per
//! suite, one [`TestResult`] per executed test. Results hold only owned data
//! (names, outcome, history) so they outlive the sessions that produced them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

use crate::classify::Outcome;
use crate::result::EnsayoResult;
use crate::session::HistoryEntry;
use crate::suite::full_path;

/// Result of running a single test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Enclosing suite names, outermost first
    pub path: Vec<String>,
    /// Test name
    pub name: String,
    /// Classified outcome
    pub outcome: Outcome,
    /// Wall time from session open to close
    pub elapsed: Duration,
    /// Steps started, the failing one included
    pub steps_run: usize,
    /// Steps declared
    pub steps_total: usize,
    /// URL of the last successful navigation
    pub final_url: Option<String>,
    /// Step the test stopped at, when it did not pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<FailedStep>,
    /// Actions and assertions attempted on the session
    pub history: Vec<HistoryEntry>,
    /// Raw failure message
    pub error: Option<String>,
}

/// Where in its body a test stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedStep {
    /// Zero-based position in the test body
    pub index: usize,
    /// Step description
    pub step: String,
}

impl TestResult {
    /// `Suite > Nested > test`
    #[must_use]
    pub fn full_name(&self) -> String {
        full_path(&self.path, &self.name)
    }

    /// Whether the test passed
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.outcome.is_passed()
    }

    /// Steps never started because an earlier one failed
    #[must_use]
    pub const fn steps_skipped(&self) -> usize {
        self.steps_total.saturating_sub(self.steps_run)
    }
}

/// Results for one suite and its nested suites
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Suite name
    pub name: String,
    /// Direct test results, in declaration order
    pub tests: Vec<TestResult>,
    /// Nested suite reports, in declaration order
    pub suites: Vec<SuiteReport>,
}

impl SuiteReport {
    /// Empty report for a suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: Vec::new(),
            suites: Vec::new(),
        }
    }

    /// Number of results, nested suites included
    #[must_use]
    pub fn test_count(&self) -> usize {
        self.tests.len() + self.suites.iter().map(Self::test_count).sum::<usize>()
    }

    /// Results depth-first: a suite's own tests, then each nested suite in turn
    pub fn results(&self) -> Box<dyn Iterator<Item = &TestResult> + '_> {
        Box::new(
            self.tests
                .iter()
                .chain(self.suites.iter().flat_map(|s| s.results())),
        )
    }
}

/// Counts by outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// All results
    pub total: usize,
    /// `Passed`
    pub passed: usize,
    /// `Failed`, infrastructure included
    pub failed: usize,
    /// `TimedOut`
    pub timed_out: usize,
    /// `TargetNotFound`
    pub target_not_found: usize,
    /// `Failed` caused by the environment
    pub infrastructure: usize,
}

impl RunSummary {
    /// Fraction of passing results (1.0 for an empty run)
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.passed as f64 / self.total as f64
        }
    }
}

/// Results of one registry run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run identifier
    pub run_id: Uuid,
    /// Wall-clock start
    pub started_at: DateTime<Utc>,
    /// Total run duration
    pub elapsed: Duration,
    /// Top-level suites, in registration order
    pub suites: Vec<SuiteReport>,
}

impl RunReport {
    /// Empty report stamped with a fresh id and the current time
    #[must_use]
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
            suites: Vec::new(),
        }
    }

    /// Every result, depth-first in declaration order
    pub fn results(&self) -> impl Iterator<Item = &TestResult> + '_ {
        self.suites.iter().flat_map(SuiteReport::results)
    }

    /// Non-passing results
    pub fn failures(&self) -> impl Iterator<Item = &TestResult> + '_ {
        self.results().filter(|r| !r.passed())
    }

    /// Result by full name (`Suite > test`)
    #[must_use]
    pub fn find(&self, full_name: &str) -> Option<&TestResult> {
        self.results().find(|r| r.full_name() == full_name)
    }

    /// Top-level suite report by name
    #[must_use]
    pub fn suite(&self, name: &str) -> Option<&SuiteReport> {
        self.suites.iter().find(|s| s.name == name)
    }

    /// Counts by outcome
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        self.results().fold(RunSummary::default(), |mut acc, r| {
            acc.total += 1;
            match &r.outcome {
                Outcome::Passed => acc.passed += 1,
                Outcome::Failed { .. } => {
                    acc.failed += 1;
                    if r.outcome.is_infrastructure() {
                        acc.infrastructure += 1;
                    }
                }
                Outcome::TimedOut { .. } => acc.timed_out += 1,
                Outcome::TargetNotFound { .. } => acc.target_not_found += 1,
            }
            acc
        })
    }

    /// Whether every result passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results().all(TestResult::passed)
    }

    /// One-line summary
    #[must_use]
    pub fn summary_line(&self) -> String {
        let s = self.summary();
        format!(
            "{}/{} passed ({:.1}%), {} failed, {} timed out, {} target not found in {:.2}s",
            s.passed,
            s.total,
            s.pass_rate() * 100.0,
            s.failed,
            s.timed_out,
            s.target_not_found,
            self.elapsed.as_secs_f64()
        )
    }

    /// Indented tree of outcomes
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for suite in &self.suites {
            render_suite(suite, 0, &mut out);
        }
        out.push_str(&self.summary_line());
        out.push('\n');
        out
    }

    /// Render the report as JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> EnsayoResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render JUnit XML content, one `<testsuite>` per top-level suite
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        let summary = self.summary();
        xml.push_str(&format!(
            r#"<testsuites name="{}" tests="{}" failures="{}" time="{:.3}">"#,
            self.run_id,
            summary.total,
            summary.total - summary.passed,
            self.elapsed.as_secs_f64()
        ));
        xml.push('\n');

        for suite in &self.suites {
            let results: Vec<&TestResult> = suite.results().collect();
            let failures = results.iter().filter(|r| !r.passed()).count();
            xml.push_str(&format!(
                r#"  <testsuite name="{}" tests="{}" failures="{}">"#,
                escape_xml(&suite.name),
                results.len(),
                failures
            ));
            xml.push('\n');
            for result in results {
                xml.push_str(&format!(
                    r#"    <testcase classname="{}" name="{}" time="{:.3}">"#,
                    escape_xml(&result.path.join(".")),
                    escape_xml(&result.name),
                    result.elapsed.as_secs_f64()
                ));
                xml.push('\n');
                if !result.passed() {
                    let message = result.error.as_deref().unwrap_or_default();
                    xml.push_str(&format!(
                        r#"      <failure type="{}" message="{}">{}</failure>"#,
                        result.outcome.label(),
                        escape_xml(&result.outcome.to_string()),
                        escape_xml(message)
                    ));
                    xml.push('\n');
                }
                xml.push_str("    </testcase>\n");
            }
            xml.push_str("  </testsuite>\n");
        }

        xml.push_str("</testsuites>\n");
        xml
    }

    /// Write JUnit XML to a file
    ///
    /// # Errors
    ///
    /// Returns error if file writing fails
    pub fn write_junit(&self, output_path: &Path) -> EnsayoResult<()> {
        std::fs::write(output_path, self.render_junit())?;
        Ok(())
    }
}

fn render_suite(suite: &SuiteReport, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!("{indent}{}\n", suite.name));
    for test in &suite.tests {
        let mark = if test.passed() { "✓" } else { "✗" };
        out.push_str(&format!(
            "{indent}  {mark} {} ({}ms)",
            test.name,
            test.elapsed.as_millis()
        ));
        if !test.passed() {
            out.push_str(&format!(": {}", test.outcome));
        }
        out.push('\n');
    }
    for nested in &suite.suites {
        render_suite(nested, depth + 1, out);
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

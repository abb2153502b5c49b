//! Failure records for downstream triage.
//!
//! Every non-passing [`TestResult`] becomes one [`TriageRecord`]: a flat,
//! JSON-serialisable description carrying the error message, a short log and
//! the category of failure. Sending records anywhere is the caller's business.
//!
//! Records point back at the failing step: `stack_trace` names it and
//! `script_url` is a `file://` URL to the plan with a `#step-N` fragment.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::classify::Outcome;
use crate::reporter::{RunReport, TestResult};
use crate::suite::{full_path, PATH_SEPARATOR};

/// Labels attached when the caller supplies none
pub const DEFAULT_LABELS: &[&str] = &["ensayo", "automated", "ui"];

/// Coarse failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageCategory {
    /// Observed state differed from the expectation
    Assertion,
    /// A deadline passed
    Timeout,
    /// An action target never appeared
    MissingTarget,
    /// Page, network or session failure
    Infrastructure,
}

impl TriageCategory {
    /// Category of an outcome; `None` for `Passed`
    #[must_use]
    pub const fn of(outcome: &Outcome) -> Option<Self> {
        match outcome {
            Outcome::Passed => None,
            Outcome::Failed { .. } if outcome.is_infrastructure() => Some(Self::Infrastructure),
            Outcome::Failed { .. } => Some(Self::Assertion),
            Outcome::TimedOut { .. } => Some(Self::Timeout),
            Outcome::TargetNotFound { .. } => Some(Self::MissingTarget),
        }
    }
}

/// One failing test, flattened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageRecord {
    /// Test name
    pub test_name: String,
    /// Enclosing suites joined with ` > `
    pub suite_path: String,
    /// Source the test was declared in
    pub file_path: String,
    /// `failed` or `timedOut`
    pub status: String,
    /// Failure category
    pub category: TriageCategory,
    /// First failure message
    pub error_message: String,
    /// Multi-line log of the run
    pub logs: String,
    /// Error followed by the failing step and the test it belongs to
    pub stack_trace: String,
    /// `file://` URL of the plan, pointing at the failing step when known
    pub script_url: Option<String>,
    /// Free-form labels
    pub labels: Vec<String>,
    /// Last URL the test reached
    pub test_url: Option<String>,
}

impl TriageRecord {
    /// Build a record for a non-passing result
    #[must_use]
    pub fn from_result(
        result: &TestResult,
        file_path: &str,
        labels: &[&str],
        at: DateTime<Utc>,
    ) -> Option<Self> {
        let category = TriageCategory::of(&result.outcome)?;
        let status = match result.outcome {
            Outcome::TimedOut { .. } => "timedOut",
            _ => "failed",
        };
        let error_message = result
            .error
            .clone()
            .unwrap_or_else(|| result.outcome.to_string());
        let labels = if labels.is_empty() { DEFAULT_LABELS } else { labels };

        Some(Self {
            test_name: result.name.clone(),
            suite_path: result.path.join(PATH_SEPARATOR),
            file_path: file_path.to_string(),
            status: status.to_string(),
            category,
            logs: render_logs(result, status, &error_message, at),
            stack_trace: render_stack(result, file_path, &error_message),
            script_url: script_url(result, file_path),
            error_message,
            labels: labels.iter().map(|l| (*l).to_string()).collect(),
            test_url: result.final_url.clone(),
        })
    }
}

fn render_logs(result: &TestResult, status: &str, error: &str, at: DateTime<Utc>) -> String {
    let mut lines = vec![
        format!("[{}] Test: {}", at.format("%Y-%m-%d %H:%M:%S"), result.name),
        format!("Status: {status}"),
        format!("Duration: {}ms", result.elapsed.as_millis()),
        format!("Error: {error}"),
    ];
    for entry in &result.history {
        lines.push(format!("  Step: {}", entry.step));
        if let Some(err) = &entry.error {
            lines.push(format!("    Error: {err}"));
        }
    }
    lines.join("\n")
}

fn render_stack(result: &TestResult, file_path: &str, error: &str) -> String {
    let mut lines = vec![error.to_string()];
    if let Some(failed) = &result.failed_step {
        lines.push(format!("    at step {}: {}", failed.index + 1, failed.step));
    }
    lines.push(format!(
        "    at {} ({file_path})",
        full_path(&result.path, &result.name)
    ));
    lines.join("\n")
}

fn script_url(result: &TestResult, file_path: &str) -> Option<String> {
    if file_path.is_empty() {
        return None;
    }
    let path = absolute(Path::new(file_path))?;
    let mut url = Url::from_file_path(path).ok()?;
    if let Some(failed) = &result.failed_step {
        url.set_fragment(Some(&format!("step-{}", failed.index + 1)));
    }
    Some(url.into())
}

fn absolute(path: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        return Some(path.to_path_buf());
    }
    std::env::current_dir().ok().map(|dir| dir.join(path))
}

impl RunReport {
    /// Triage records for every non-passing result, in result order
    #[must_use]
    pub fn triage_records(&self, file_path: &str, labels: &[&str]) -> Vec<TriageRecord> {
        self.results()
            .filter_map(|r| TriageRecord::from_result(r, file_path, labels, self.started_at))
            .collect()
    }
}

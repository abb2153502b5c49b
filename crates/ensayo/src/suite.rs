//! Suites, test cases and the registry.
//!
//! Registration is pure data accumulation: nothing touches a page until
//! [`SuiteRegistry::run_all`] hands each [`TestCase`] to a [`TestRunner`].
//!
//! ## Example
//!
//! ```rust
//! use ensayo::{Assertion, SuiteRegistry};
//!
//! let mut registry = SuiteRegistry::new();
//! registry
//!     .register("Passing Tests", |s| {
//!         s.test("should load the page", |t| {
//!             Ok(t.goto("/todomvc")
//!                 .expect(Assertion::title_matches("TodoMVC")?)
//!                 .expect(Assertion::visible(".new-todo")))
//!         });
//!     })
//!     .unwrap();
//! assert_eq!(registry.test_count(), 1);
//! ```

use futures::stream::{self, StreamExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

use crate::action::Action;
use crate::assertion::Assertion;
use crate::harness::TestRunner;
use crate::reporter::{RunReport, SuiteReport, TestResult};
use crate::result::{EnsayoError, EnsayoResult};

/// Separator used when rendering suite paths
pub const PATH_SEPARATOR: &str = " > ";

/// One step of a test body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Perform an action
    Act {
        /// Action to perform
        action: Action,
    },
    /// Check an assertion
    Expect {
        /// Assertion to check
        assertion: Assertion,
        /// Overrides the test's assertion timeout
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<Duration>,
    },
}

impl Step {
    /// Selector the step targets, if any
    #[must_use]
    pub fn selector(&self) -> Option<&str> {
        match self {
            Self::Act { action } => action.selector(),
            Self::Expect { assertion, .. } => assertion.selector(),
        }
    }
}

impl From<Action> for Step {
    fn from(action: Action) -> Self {
        Self::Act { action }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Act { action } => write!(f, "{action}"),
            Self::Expect { assertion, .. } => write!(f, "{assertion}"),
        }
    }
}

/// A named, ordered sequence of steps
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TestCase {
    /// Test name
    pub name: String,
    /// Steps in program order
    pub steps: Vec<Step>,
    /// Test timeout; `None` uses the run default, zero disables it
    pub timeout: Option<Duration>,
    /// Default assertion timeout for this test
    pub expect_timeout: Option<Duration>,
}

impl TestCase {
    /// Create an empty test case
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append a step
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append an action
    #[must_use]
    pub fn act(self, action: Action) -> Self {
        self.step(Step::Act { action })
    }

    /// Navigate to a URL
    #[must_use]
    pub fn goto(self, url: impl Into<String>) -> Self {
        self.act(Action::navigate(url))
    }

    /// Fill an input
    #[must_use]
    pub fn fill(self, selector: impl Into<String>, value: impl Into<String>) -> Self {
        self.act(Action::fill(selector, value))
    }

    /// Click an element
    #[must_use]
    pub fn click(self, selector: impl Into<String>) -> Self {
        self.act(Action::click(selector))
    }

    /// Press a key on an element
    #[must_use]
    pub fn press(self, selector: impl Into<String>, key: impl Into<String>) -> Self {
        self.act(Action::press(selector, key))
    }

    /// Issue a GET request
    #[must_use]
    pub fn request_get(self, url: impl Into<String>) -> Self {
        self.act(Action::request_get(url))
    }

    /// Issue a GET request and remember the response under `alias`
    #[must_use]
    pub fn request_get_as(self, url: impl Into<String>, alias: impl Into<String>) -> Self {
        self.act(Action::RequestGet {
            url: url.into(),
            alias: Some(alias.into()),
        })
    }

    /// Check an assertion with the test's assertion timeout
    #[must_use]
    pub fn expect(self, assertion: Assertion) -> Self {
        self.step(Step::Expect {
            assertion,
            timeout: None,
        })
    }

    /// Check an assertion with its own timeout
    #[must_use]
    pub fn expect_within(self, assertion: Assertion, timeout: Duration) -> Self {
        self.step(Step::Expect {
            assertion,
            timeout: Some(timeout),
        })
    }

    /// Set the test timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the default assertion timeout
    #[must_use]
    pub const fn with_expect_timeout(mut self, timeout: Duration) -> Self {
        self.expect_timeout = Some(timeout);
        self
    }

    fn validate(&self, path: &str) -> EnsayoResult<()> {
        if self.name.trim().is_empty() {
            return Err(EnsayoError::EmptyName {
                context: format!("test in '{path}'"),
            });
        }
        if self.steps.iter().any(|s| s.selector() == Some("")) {
            return Err(EnsayoError::EmptySelector {
                test: format!("{path}{PATH_SEPARATOR}{}", self.name),
            });
        }
        Ok(())
    }
}

/// Entry of a suite, in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuiteItem {
    /// A test case
    Test(TestCase),
    /// A nested suite
    Suite(Suite),
}

/// A named, ordered grouping of tests and nested suites
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suite {
    /// Suite name
    pub name: String,
    /// Items in declaration order
    pub items: Vec<SuiteItem>,
}

impl Suite {
    /// Create an empty suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    /// Add a test case
    #[must_use]
    pub fn with_test(mut self, test: TestCase) -> Self {
        self.items.push(SuiteItem::Test(test));
        self
    }

    /// Add a nested suite
    #[must_use]
    pub fn with_suite(mut self, suite: Self) -> Self {
        self.items.push(SuiteItem::Suite(suite));
        self
    }

    /// Number of tests, nested suites included
    #[must_use]
    pub fn test_count(&self) -> usize {
        self.items
            .iter()
            .map(|item| match item {
                SuiteItem::Test(_) => 1,
                SuiteItem::Suite(suite) => suite.test_count(),
            })
            .sum()
    }

    fn validate(&self, parent: &str) -> EnsayoResult<()> {
        if self.name.trim().is_empty() {
            return Err(EnsayoError::EmptyName {
                context: if parent.is_empty() {
                    "top-level suite".to_string()
                } else {
                    format!("suite in '{parent}'")
                },
            });
        }
        let path = join_path(parent, &self.name);
        let mut suites = HashSet::new();
        let mut tests = HashSet::new();
        for item in &self.items {
            match item {
                SuiteItem::Test(test) => {
                    test.validate(&path)?;
                    if !tests.insert(test.name.as_str()) {
                        return Err(EnsayoError::DuplicateTest {
                            suite: path,
                            name: test.name.clone(),
                        });
                    }
                }
                SuiteItem::Suite(suite) => {
                    suite.validate(&path)?;
                    if !suites.insert(suite.name.as_str()) {
                        return Err(EnsayoError::DuplicateSuite {
                            parent: path,
                            name: suite.name.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}{PATH_SEPARATOR}{name}")
    }
}

/// Collects the body of a `register`/`describe` block.
///
/// The first error raised inside the block is kept and surfaced by
/// [`SuiteRegistry::register`].
#[derive(Debug)]
pub struct SuiteBuilder {
    suite: Suite,
    error: Option<EnsayoError>,
}

impl SuiteBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            suite: Suite::new(name),
            error: None,
        }
    }

    /// Declare a test
    pub fn test<F>(&mut self, name: impl Into<String>, body: F) -> &mut Self
    where
        F: FnOnce(TestCase) -> EnsayoResult<TestCase>,
    {
        match body(TestCase::new(name)) {
            Ok(test) => self.suite.items.push(SuiteItem::Test(test)),
            Err(err) => self.keep_first(err),
        }
        self
    }

    /// Declare a nested suite
    pub fn describe<F>(&mut self, name: impl Into<String>, body: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        let mut nested = Self::new(name);
        body(&mut nested);
        if let Some(err) = nested.error {
            self.keep_first(err);
        }
        self.suite.items.push(SuiteItem::Suite(nested.suite));
        self
    }

    /// Add a prebuilt test case
    pub fn add_test(&mut self, test: TestCase) -> &mut Self {
        self.suite.items.push(SuiteItem::Test(test));
        self
    }

    /// Add a prebuilt suite
    pub fn add_suite(&mut self, suite: Suite) -> &mut Self {
        self.suite.items.push(SuiteItem::Suite(suite));
        self
    }

    fn keep_first(&mut self, err: EnsayoError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

/// Selects which tests a run executes
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    suites: Vec<String>,
    grep: Option<Regex>,
}

impl RunFilter {
    /// Filter that selects everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a top-level suite; may be called repeatedly
    #[must_use]
    pub fn with_suite(mut self, name: impl Into<String>) -> Self {
        self.suites.push(name.into());
        self
    }

    /// Restrict to tests whose full path matches `pattern`
    pub fn with_grep(mut self, pattern: &str) -> EnsayoResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| EnsayoError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        self.grep = Some(regex);
        Ok(self)
    }

    /// Whether the filter selects everything
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.suites.is_empty() && self.grep.is_none()
    }

    fn selects_suite(&self, name: &str) -> bool {
        self.suites.is_empty() || self.suites.iter().any(|s| s == name)
    }

    fn selects_test(&self, full_path: &str) -> bool {
        self.grep.as_ref().map_or(true, |re| re.is_match(full_path))
    }
}

/// Registered top-level suites, in registration order
#[derive(Debug, Clone, Default)]
pub struct SuiteRegistry {
    suites: Vec<Suite>,
}

impl SuiteRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a top-level suite declared by `body`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised inside `body`, or a validation error
    /// for empty names, empty selectors and duplicate sibling names.
    pub fn register<F>(&mut self, name: impl Into<String>, body: F) -> EnsayoResult<()>
    where
        F: FnOnce(&mut SuiteBuilder),
    {
        let mut builder = SuiteBuilder::new(name);
        body(&mut builder);
        if let Some(err) = builder.error {
            return Err(err);
        }
        self.add_suite(builder.suite)
    }

    /// Register a prebuilt suite
    ///
    /// # Errors
    ///
    /// Same validation as [`SuiteRegistry::register`].
    pub fn add_suite(&mut self, suite: Suite) -> EnsayoResult<()> {
        suite.validate("")?;
        if self.suites.iter().any(|s| s.name == suite.name) {
            return Err(EnsayoError::DuplicateSuite {
                parent: "<root>".to_string(),
                name: suite.name,
            });
        }
        tracing::debug!(suite = %suite.name, tests = suite.test_count(), "registered suite");
        self.suites.push(suite);
        Ok(())
    }

    /// Registered suites
    #[must_use]
    pub fn suites(&self) -> &[Suite] {
        &self.suites
    }

    /// Number of registered tests
    #[must_use]
    pub fn test_count(&self) -> usize {
        self.suites.iter().map(Suite::test_count).sum()
    }

    /// Run every test the runner's configuration selects.
    ///
    /// Tests run depth-first in declaration order; the report mirrors the
    /// suite tree and holds exactly one result per selected test.
    ///
    /// # Errors
    /// Returns error if the configured `grep` does not compile.
    pub async fn run_all(&self, runner: &TestRunner) -> EnsayoResult<RunReport> {
        let filter = runner.config().filter()?;
        Ok(self.run_filtered(runner, &filter).await)
    }

    /// Run the tests selected by `filter`; unselected tests are not reported
    pub async fn run_filtered(&self, runner: &TestRunner, filter: &RunFilter) -> RunReport {
        let mut report = RunReport::start();
        let started = Instant::now();

        let mut jobs = Vec::new();
        let selected: Vec<&Suite> = self
            .suites
            .iter()
            .filter(|s| filter.selects_suite(&s.name))
            .collect();
        for suite in &selected {
            collect_jobs(suite, &mut Vec::new(), filter, &mut jobs);
        }

        tracing::info!(
            run_id = %report.run_id,
            tests = jobs.len(),
            workers = runner.workers(),
            "starting run"
        );

        let results: Vec<TestResult> = stream::iter(jobs)
            .map(|(path, test)| async move { runner.run(test, &path).await })
            .buffered(runner.workers())
            .collect()
            .await;

        let mut results = results.into_iter();
        for suite in selected {
            if let Some(node) = assemble(suite, &mut Vec::new(), filter, &mut results) {
                report.suites.push(node);
            }
        }
        report.elapsed = started.elapsed();

        let summary = report.summary();
        tracing::info!(
            run_id = %report.run_id,
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            timed_out = summary.timed_out,
            target_not_found = summary.target_not_found,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "run finished"
        );
        report
    }
}

fn collect_jobs<'a>(
    suite: &'a Suite,
    path: &mut Vec<String>,
    filter: &RunFilter,
    jobs: &mut Vec<(Vec<String>, &'a TestCase)>,
) {
    path.push(suite.name.clone());
    for item in &suite.items {
        match item {
            SuiteItem::Test(test) => {
                if filter.selects_test(&full_path(path, &test.name)) {
                    jobs.push((path.clone(), test));
                }
            }
            SuiteItem::Suite(nested) => collect_jobs(nested, path, filter, jobs),
        }
    }
    path.pop();
}

/// Rebuild the report subtree for `suite`, consuming results in job order.
///
/// Under a grep filter, suites with no selected test are dropped.
fn assemble(
    suite: &Suite,
    path: &mut Vec<String>,
    filter: &RunFilter,
    results: &mut impl Iterator<Item = TestResult>,
) -> Option<SuiteReport> {
    path.push(suite.name.clone());
    let mut node = SuiteReport::new(&suite.name);
    for item in &suite.items {
        match item {
            SuiteItem::Test(test) => {
                // same walk and predicate as collect_jobs, so results line up
                if filter.selects_test(&full_path(path, &test.name)) {
                    if let Some(result) = results.next() {
                        node.tests.push(result);
                    }
                }
            }
            SuiteItem::Suite(nested) => {
                if let Some(child) = assemble(nested, path, filter, results) {
                    node.suites.push(child);
                }
            }
        }
    }
    path.pop();
    (filter.grep.is_none() || node.test_count() > 0).then_some(node)
}

/// Render `path` plus `name` as `A > B > name`
#[must_use]
pub fn full_path(path: &[String], name: &str) -> String {
    path.iter()
        .map(String::as_str)
        .chain(std::iter::once(name))
        .collect::<Vec<_>>()
        .join(PATH_SEPARATOR)
}

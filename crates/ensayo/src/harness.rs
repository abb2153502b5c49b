//! Test case runner.
//!
//! [`TestRunner::run`] executes one [`TestCase`] against a fresh
//! [`PageSession`]:
//!
//! 1. open a session (failure is an infrastructure `Failed`)
//! 2. run steps in program order, stopping at the first failure
//! 3. close the session on every exit path
//! 4. classify the first failure into an [`Outcome`]
//!
//! The test timeout bounds opening the page and the body. Closing gets what
//! is left of it, or a one second grace once it has expired, so a hung
//! collaborator cannot stall a run.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;

use crate::classify::{classify, Outcome, StepFailure};
use crate::config::RunConfig;
use crate::driver::BrowserDriver;
use crate::network::NetworkClient;
use crate::reporter::{FailedStep, TestResult};
use crate::session::PageSession;
use crate::suite::{full_path, Step, TestCase};

/// Step named when the test timeout expires while opening the page
const OPEN_STEP: &str = "open page";

/// Step named when closing the page outlives the test timeout
const CLOSE_STEP: &str = "close page";

/// Extra time a page gets to close once the test timeout has expired
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Runs test cases against page sessions from a browser
#[derive(Clone)]
pub struct TestRunner {
    browser: Arc<dyn BrowserDriver>,
    network: Arc<dyn NetworkClient>,
    config: RunConfig,
}

impl std::fmt::Debug for TestRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestRunner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TestRunner {
    /// Create a runner with default configuration
    #[must_use]
    pub fn new(browser: Arc<dyn BrowserDriver>, network: Arc<dyn NetworkClient>) -> Self {
        Self {
            browser,
            network,
            config: RunConfig::default(),
        }
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Tests executed concurrently by the registry
    #[must_use]
    pub fn workers(&self) -> usize {
        self.config.workers.max(1)
    }

    /// Run one test case; always yields exactly one result
    pub async fn run(&self, case: &TestCase, path: &[String]) -> TestResult {
        let span = tracing::info_span!("test", name = %full_path(path, &case.name));
        self.run_inner(case, path).instrument(span).await
    }

    async fn run_inner(&self, case: &TestCase, path: &[String]) -> TestResult {
        let started = Instant::now();
        let limit = case.timeout.unwrap_or_else(|| self.config.test_timeout());
        let deadline = (!limit.is_zero()).then(|| started + limit);
        let timed_out = |step: &str| StepFailure::TestTimedOut {
            step: step.to_string(),
            elapsed: started.elapsed(),
            limit,
        };
        let mut result = TestResult {
            path: path.to_vec(),
            name: case.name.clone(),
            outcome: Outcome::Passed,
            elapsed: Duration::ZERO,
            steps_run: 0,
            steps_total: case.steps.len(),
            final_url: None,
            failed_step: None,
            history: Vec::new(),
            error: None,
        };

        let opened = within(
            deadline,
            PageSession::open(
                self.browser.as_ref(),
                Arc::clone(&self.network),
                self.config.session_options(),
            ),
        )
        .await;
        let mut session = match opened {
            Some(Ok(session)) => session,
            Some(Err(failure)) => {
                result.elapsed = started.elapsed();
                return finish(result, Some(failure));
            }
            None => {
                result.elapsed = started.elapsed();
                return finish(result, Some(timed_out(OPEN_STEP)));
            }
        };

        let expect_default = case
            .expect_timeout
            .unwrap_or_else(|| self.config.expect_timeout());
        let mut cursor = 0;
        let body = execute(&case.steps, &mut session, expect_default, &mut cursor);
        let mut failure = match within(deadline, body).await {
            Some(outcome) => outcome.err(),
            None => {
                let failure = case.steps.get(cursor).map_or_else(
                    || timed_out("test body"),
                    |step| timed_out(&step.to_string()),
                );
                if let Some(step) = case.steps.get(cursor) {
                    session.record_interrupted(step, &failure);
                }
                Some(failure)
            }
        };
        if failure.is_some() {
            result.failed_step = case.steps.get(cursor).map(|step| FailedStep {
                index: cursor,
                step: step.to_string(),
            });
        }

        // A timed-out body still gets a short window to release its page.
        let close_by = deadline.map(|at| at.max(Instant::now() + CLOSE_GRACE));
        if within(close_by, session.close()).await.is_none() {
            tracing::warn!(grace_ms = CLOSE_GRACE.as_millis() as u64, "page close did not finish");
            if failure.is_none() {
                failure = Some(timed_out(CLOSE_STEP));
            }
        }

        result.elapsed = started.elapsed();
        result.steps_run = if failure.is_some() {
            (cursor + 1).min(case.steps.len())
        } else {
            case.steps.len()
        };
        result.final_url = session.current_url().map(str::to_string);
        result.history = session.history().to_vec();
        finish(result, failure)
    }
}

/// Await `fut`, giving up at `deadline` when there is one
async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(at) => tokio::time::timeout_at(at, fut).await.ok(),
        None => Some(fut.await),
    }
}

/// Run steps in order, leaving `cursor` on the step in flight
async fn execute(
    steps: &[Step],
    session: &mut PageSession,
    expect_default: Duration,
    cursor: &mut usize,
) -> Result<(), StepFailure> {
    for (index, step) in steps.iter().enumerate() {
        *cursor = index;
        tracing::debug!(index, step = %step, "running step");
        match step {
            Step::Act { action } => session.perform(action).await?,
            Step::Expect { assertion, timeout } => {
                session
                    .expect(assertion, timeout.unwrap_or(expect_default))
                    .await?;
            }
        }
    }
    Ok(())
}

fn finish(mut result: TestResult, failure: Option<StepFailure>) -> TestResult {
    if let Some(failure) = failure {
        result.outcome = classify(&failure);
        result.error = Some(failure.to_string());
    }
    let elapsed_ms = result.elapsed.as_millis() as u64;
    if result.outcome.is_infrastructure() {
        tracing::warn!(
            outcome = result.outcome.label(),
            elapsed_ms,
            error = result.error.as_deref().unwrap_or_default(),
            "test failed on infrastructure"
        );
    } else {
        tracing::info!(outcome = result.outcome.label(), elapsed_ms, "test finished");
    }
    result
}

//! Assertion evaluation against a live session.

use std::time::Duration;

use super::Assertion;
use crate::classify::StepFailure;
use crate::locator::LocateError;
use crate::session::PageSession;
use crate::wait::{poll_until, Deadline, Poll, WaitOptions, WaitOutcome};

/// Reported when a selector matched nothing
const NOT_FOUND: &str = "<element(s) not found>";

/// Consecutive observations above the target that make `CountEquals` fail
const OVERSHOOT_CONFIRMATIONS: usize = 2;

/// Result of evaluating one assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Predicate held
    Passed,
    /// Predicate is false and waiting will not help
    Failed {
        /// Expected value
        expected: String,
        /// Observed value
        actual: String,
    },
    /// Predicate stayed false until the deadline
    TimedOut {
        /// Time spent polling
        elapsed: Duration,
        /// Last observed value
        last_observed: String,
    },
}

impl Verdict {
    /// Whether the predicate held
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Raw step failure for a non-passing verdict
    #[must_use]
    pub fn into_failure(self, assertion: &Assertion) -> Option<StepFailure> {
        match self {
            Self::Passed => None,
            Self::Failed { expected, actual } => Some(StepFailure::AssertionFailed {
                assertion: assertion.to_string(),
                expected,
                actual,
            }),
            Self::TimedOut {
                elapsed,
                last_observed,
            } => Some(StepFailure::AssertionTimedOut {
                assertion: assertion.to_string(),
                elapsed,
                last_observed,
            }),
        }
    }
}

enum Miss {
    Observed(String),
    Broken(StepFailure),
}

/// Evaluate `assertion` against `session`, waiting at most `timeout`.
///
/// Assertions for which [`Assertion::polls`] is false are observed once and
/// fail on the first mismatch; the rest retry until `timeout`. `Err` is
/// reserved for infrastructure failures (closed session, driver errors) and
/// for status checks with no recorded response.
pub async fn evaluate(
    assertion: &Assertion,
    session: &PageSession,
    timeout: Duration,
) -> Result<Verdict, StepFailure> {
    if let Assertion::CountEquals { selector, count } = assertion {
        return count_equals(session, selector, *count, timeout).await;
    }

    let polls = assertion.polls();
    let options = WaitOptions::new(if polls { timeout } else { Duration::ZERO })
        .with_poll_interval(session.poll_interval());
    let outcome = poll_until(options, || async move {
        match observe(assertion, session).await {
            Poll::Pending(miss) if !polls => Poll::Fail(miss),
            other => other,
        }
    })
    .await;

    match outcome {
        WaitOutcome::Ready(()) => Ok(Verdict::Passed),
        WaitOutcome::Failed(Miss::Observed(actual)) => Ok(Verdict::Failed {
            expected: assertion.expected(),
            actual,
        }),
        WaitOutcome::TimedOut {
            elapsed,
            last: Miss::Observed(last_observed),
        } => Ok(Verdict::TimedOut {
            elapsed,
            last_observed,
        }),
        WaitOutcome::Failed(Miss::Broken(failure))
        | WaitOutcome::TimedOut {
            last: Miss::Broken(failure),
            ..
        } => Err(failure),
    }
}

/// Evaluate and turn any non-passing verdict into a step failure
pub async fn check(
    assertion: &Assertion,
    session: &PageSession,
    timeout: Duration,
) -> Result<(), StepFailure> {
    match evaluate(assertion, session, timeout).await?.into_failure(assertion) {
        None => Ok(()),
        Some(failure) => Err(failure),
    }
}

/// One observation of the assertion's predicate
async fn observe(assertion: &Assertion, session: &PageSession) -> Poll<(), Miss> {
    let observed = match assertion {
        Assertion::TitleEquals { text } => session
            .title()
            .await
            .map(|title| (title == *text, title)),
        Assertion::TitleMatches { pattern } => session
            .title()
            .await
            .map(|title| (pattern.is_match(&title), title)),
        Assertion::UrlMatches { pattern } => session
            .url()
            .await
            .map(|url| (pattern.is_match(&url), url)),
        Assertion::TextContains { selector, text } => {
            located(session.locator(selector).first_text().await, selector).map(|first| {
                match first {
                    Some(actual) => (actual.contains(text.as_str()), actual),
                    None => (false, NOT_FOUND.to_string()),
                }
            })
        }
        Assertion::Visible { selector } => {
            located(session.locator(selector).all().await, selector).map(|found| {
                if found.is_empty() {
                    (false, NOT_FOUND.to_string())
                } else if found.iter().any(|el| el.visible) {
                    (true, "visible".to_string())
                } else {
                    (false, "hidden".to_string())
                }
            })
        }
        Assertion::Hidden { selector } => {
            located(session.locator(selector).all().await, selector).map(|found| {
                if found.iter().any(|el| el.visible) {
                    (false, "visible".to_string())
                } else {
                    (true, "hidden".to_string())
                }
            })
        }
        Assertion::CountEquals { selector, count } => {
            located(session.locator(selector).count().await, selector)
                .map(|found| (found == *count, found.to_string()))
        }
        Assertion::StatusEquals { response, code } => session
            .response(response.as_deref())
            .map(|recorded| (recorded.status == *code, recorded.status.to_string()))
            .ok_or_else(|| StepFailure::MissingResponse {
                alias: response.clone(),
            }),
    };
    match observed {
        Ok((true, _)) => Poll::Ready(()),
        Ok((false, actual)) => Poll::Pending(Miss::Observed(actual)),
        Err(failure) => Poll::Fail(Miss::Broken(failure)),
    }
}

async fn count_equals(
    session: &PageSession,
    selector: &str,
    expected: usize,
    timeout: Duration,
) -> Result<Verdict, StepFailure> {
    let deadline = Deadline::after(timeout);
    let mut overshoot = 0;
    loop {
        let found = located(session.locator(selector).count().await, selector)?;
        if found == expected {
            return Ok(Verdict::Passed);
        }
        overshoot = if found > expected { overshoot + 1 } else { 0 };
        let exhausted = deadline.expired();
        if overshoot >= OVERSHOOT_CONFIRMATIONS || (exhausted && found > expected) {
            return Ok(Verdict::Failed {
                expected: expected.to_string(),
                actual: found.to_string(),
            });
        }
        if exhausted {
            return Ok(Verdict::TimedOut {
                elapsed: deadline.elapsed(),
                last_observed: found.to_string(),
            });
        }
        tokio::time::sleep(session.poll_interval().min(deadline.remaining())).await;
    }
}

fn located<T>(result: Result<T, LocateError>, selector: &str) -> Result<T, StepFailure> {
    result.map_err(|e| match e {
        LocateError::NotFound { selector, waited } => {
            StepFailure::TargetNotFound { selector, waited }
        }
        LocateError::Driver(crate::driver::DriverError::Closed) => StepFailure::SessionClosed,
        LocateError::Driver(err) => StepFailure::Driver {
            step: format!("locator({selector})"),
            message: err.to_string(),
        },
    })
}

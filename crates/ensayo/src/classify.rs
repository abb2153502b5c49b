//! Result classification.
//!
//! Steps fail with a raw [`StepFailure`]. The runner hands the first one to
//! [`classify`], which maps it onto exactly one [`Outcome`] variant. The match
//! is exhaustive, so a new failure kind does not compile until it is
//! classified.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Raw failure raised by a step
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepFailure {
    /// Locator resolution found nothing before its deadline
    #[error("waiting for locator({selector}): resolved to <empty> after {}ms", .waited.as_millis())]
    TargetNotFound {
        /// Selector that did not resolve
        selector: String,
        /// Time spent waiting
        waited: Duration,
    },

    /// Predicate was false and will not become true by waiting
    #[error("{assertion}\nExpected: {expected}\nReceived: {actual}")]
    AssertionFailed {
        /// Assertion description
        assertion: String,
        /// Expected value
        expected: String,
        /// Observed value
        actual: String,
    },

    /// Predicate stayed false until the assertion deadline
    #[error("{assertion}: timeout {}ms exceeded\nLast observed: {last_observed}", .elapsed.as_millis())]
    AssertionTimedOut {
        /// Assertion description
        assertion: String,
        /// Time spent polling
        elapsed: Duration,
        /// Last observed value
        last_observed: String,
    },

    /// Test exceeded its declared timeout
    #[error("Test timeout of {}ms exceeded while running {step}", .limit.as_millis())]
    TestTimedOut {
        /// Step in flight when the timeout fired
        step: String,
        /// Elapsed time at cancellation
        elapsed: Duration,
        /// Declared timeout
        limit: Duration,
    },

    /// Navigation target unreachable
    #[error("page.goto: navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// GET request produced no response
    #[error("request.get: {url} failed: {message}")]
    Network {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Collaborator failed during a step
    #[error("{step}: {message}")]
    Driver {
        /// Step description
        step: String,
        /// Error message
        message: String,
    },

    /// Page session could not be constructed
    #[error("Failed to open page session: {message}")]
    SessionUnavailable {
        /// Error message
        message: String,
    },

    /// Step ran against a closed session
    #[error("Page session is closed")]
    SessionClosed,

    /// Status assertion with no recorded response
    #[error("No response recorded{}", .alias.as_ref().map(|a| format!(" for '{a}'")).unwrap_or_default())]
    MissingResponse {
        /// Alias that was looked up
        alias: Option<String>,
    },
}

/// Category of an infrastructure failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfraKind {
    /// Navigation target unreachable
    Navigation,
    /// HTTP request failed
    Network,
    /// Page session unavailable or closed
    Session,
    /// Collaborator protocol failure
    Driver,
}

/// Why a test failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum FailureReason {
    /// Test logic: observed state differs from the expectation
    Mismatch {
        /// Expected value
        expected: String,
        /// Observed value
        actual: String,
    },
    /// Environment: the page or network was not usable
    Infrastructure {
        /// Failure category
        kind: InfraKind,
        /// Error message
        message: String,
    },
}

/// Classified outcome of one test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Every step succeeded
    Passed,
    /// A step failed
    Failed {
        /// Failure cause
        reason: FailureReason,
    },
    /// A deadline passed
    TimedOut {
        /// Step or assertion that was waiting
        step: String,
        /// Elapsed time
        elapsed: Duration,
    },
    /// An action target never resolved
    TargetNotFound {
        /// Selector that did not resolve
        selector: String,
    },
}

impl Outcome {
    /// Whether the test passed
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Whether the environment, not the test logic, is to blame
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Failed {
                reason: FailureReason::Infrastructure { .. }
            }
        )
    }

    /// Short status label
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed { .. } => "failed",
            Self::TimedOut { .. } => "timedOut",
            Self::TargetNotFound { .. } => "targetNotFound",
        }
    }

    fn infrastructure(kind: InfraKind, message: impl Into<String>) -> Self {
        Self::Failed {
            reason: FailureReason::Infrastructure {
                kind,
                message: message.into(),
            },
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed {
                reason: FailureReason::Mismatch { expected, actual },
            } => write!(f, "failed: expected {expected}, received {actual}"),
            Self::Failed {
                reason: FailureReason::Infrastructure { kind, message },
            } => write!(f, "failed ({kind:?} infrastructure): {message}"),
            Self::TimedOut { step, elapsed } => {
                write!(f, "timed out after {}ms in {step}", elapsed.as_millis())
            }
            Self::TargetNotFound { selector } => write!(f, "target not found: {selector}"),
        }
    }
}

/// Map a raw step failure onto its outcome
#[must_use]
pub fn classify(failure: &StepFailure) -> Outcome {
    match failure {
        StepFailure::TargetNotFound { selector, .. } => Outcome::TargetNotFound {
            selector: selector.clone(),
        },
        StepFailure::AssertionFailed {
            expected, actual, ..
        } => Outcome::Failed {
            reason: FailureReason::Mismatch {
                expected: expected.clone(),
                actual: actual.clone(),
            },
        },
        StepFailure::AssertionTimedOut {
            assertion, elapsed, ..
        } => Outcome::TimedOut {
            step: assertion.clone(),
            elapsed: *elapsed,
        },
        StepFailure::TestTimedOut { step, elapsed, .. } => Outcome::TimedOut {
            step: step.clone(),
            elapsed: *elapsed,
        },
        StepFailure::Navigation { .. } => {
            Outcome::infrastructure(InfraKind::Navigation, failure.to_string())
        }
        StepFailure::Network { .. } => {
            Outcome::infrastructure(InfraKind::Network, failure.to_string())
        }
        StepFailure::Driver { .. } => {
            Outcome::infrastructure(InfraKind::Driver, failure.to_string())
        }
        StepFailure::SessionUnavailable { .. } | StepFailure::SessionClosed => {
            Outcome::infrastructure(InfraKind::Session, failure.to_string())
        }
        StepFailure::MissingResponse { alias } => Outcome::Failed {
            reason: FailureReason::Mismatch {
                expected: alias
                    .as_ref()
                    .map_or_else(|| "a recorded response".to_string(), |a| format!("response '{a}'")),
                actual: "no request issued".to_string(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod classify_tests {
        use super::*;

        #[test]
        fn test_target_not_found() {
            let outcome = classify(&StepFailure::TargetNotFound {
                selector: "#login-button".into(),
                waited: Duration::from_secs(5),
            });
            assert_eq!(
                outcome,
                Outcome::TargetNotFound {
                    selector: "#login-button".into()
                }
            );
        }

        #[test]
        fn test_mismatch_keeps_expected_and_actual() {
            let outcome = classify(&StepFailure::AssertionFailed {
                assertion: "expect(page).toHaveTitle".into(),
                expected: "Login - MyApp".into(),
                actual: "TodoMVC".into(),
            });
            match outcome {
                Outcome::Failed {
                    reason: FailureReason::Mismatch { expected, actual },
                } => {
                    assert_eq!(expected, "Login - MyApp");
                    assert_eq!(actual, "TodoMVC");
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn test_both_timeouts_become_timed_out() {
            let a = classify(&StepFailure::AssertionTimedOut {
                assertion: "visible(#email-input)".into(),
                elapsed: Duration::from_millis(500),
                last_observed: "<element(s) not found>".into(),
            });
            let b = classify(&StepFailure::TestTimedOut {
                step: "navigate(/slow)".into(),
                elapsed: Duration::from_secs(1),
                limit: Duration::from_secs(1),
            });
            assert_eq!(a.label(), "timedOut");
            assert_eq!(b.label(), "timedOut");
        }

        #[test]
        fn test_infrastructure_is_tagged() {
            let nav = classify(&StepFailure::Navigation {
                url: "https://down.invalid".into(),
                message: "dns".into(),
            });
            let net = classify(&StepFailure::Network {
                url: "https://down.invalid/api".into(),
                message: "refused".into(),
            });
            let session = classify(&StepFailure::SessionUnavailable {
                message: "out of contexts".into(),
            });
            assert!(nav.is_infrastructure());
            assert!(net.is_infrastructure());
            assert!(session.is_infrastructure());
            assert!(matches!(
                session,
                Outcome::Failed {
                    reason: FailureReason::Infrastructure {
                        kind: InfraKind::Session,
                        ..
                    }
                }
            ));
        }

        #[test]
        fn test_missing_response_is_test_logic() {
            let outcome = classify(&StepFailure::MissingResponse {
                alias: Some("user".into()),
            });
            assert!(!outcome.is_infrastructure());
            assert_eq!(outcome.label(), "failed");
        }
    }

    #[test]
    fn test_outcome_serializes_with_kind_tag() {
        let json = serde_json::to_string(&Outcome::TargetNotFound {
            selector: ".user-profile".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"target_not_found","selector":".user-profile"}"#);
    }

    #[test]
    fn test_step_failure_messages() {
        let msg = StepFailure::TargetNotFound {
            selector: "#submit-contact".into(),
            waited: Duration::from_millis(5000),
        }
        .to_string();
        assert!(msg.contains("#submit-contact"));
        assert!(msg.contains("5000ms"));
        assert_eq!(
            StepFailure::MissingResponse { alias: None }.to_string(),
            "No response recorded"
        );
    }
}

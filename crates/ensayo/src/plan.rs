//! Declarative test plans.
//!
//! A plan is a YAML document describing suites the same way
//! [`SuiteRegistry::register`] does in code:
//!
//! ```yaml
//! version: "1.0"
//! name: TodoMVC demo
//! file: demo.spec.js
//! suites:
//!   - name: Passing Tests
//!     tests:
//!       - name: should load TodoMVC page
//!         steps:
//!           - type: navigate
//!             url: /todomvc
//!           - type: expect_title_matches
//!             pattern: TodoMVC
//! ```
//!
//! Within a suite, `tests` are declared before nested `suites`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::action::Action;
use crate::assertion::{Assertion, Pattern};
use crate::result::{EnsayoError, EnsayoResult};
use crate::suite::{Step, Suite, SuiteRegistry, TestCase};

/// Supported plan schema version
pub const PLAN_VERSION: &str = "1.0";

/// Root of a plan document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPlan {
    /// Schema version (must be "1.0")
    pub version: String,
    /// Plan name
    #[serde(default)]
    pub name: String,
    /// Source label reported in triage records
    #[serde(default)]
    pub file: Option<String>,
    /// Base for relative URLs
    #[serde(default)]
    pub base_url: Option<String>,
    /// Top-level suites
    #[serde(default)]
    pub suites: Vec<PlanSuite>,
}

/// Suite in a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSuite {
    /// Suite name
    pub name: String,
    /// Tests, in order
    #[serde(default)]
    pub tests: Vec<PlanTest>,
    /// Nested suites, in order
    #[serde(default)]
    pub suites: Vec<PlanSuite>,
}

/// Test in a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTest {
    /// Test name
    pub name: String,
    /// Test timeout in milliseconds (0 disables)
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Default assertion timeout in milliseconds
    #[serde(default)]
    pub expect_timeout_ms: Option<u64>,
    /// Steps, in order
    #[serde(default)]
    pub steps: Vec<PlanStep>,
}

/// Step in a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanStep {
    /// Navigate to a URL
    Navigate { url: String },
    /// Fill an input
    Fill { selector: String, value: String },
    /// Click an element
    Click { selector: String },
    /// Press a key on an element
    Press { selector: String, key: String },
    /// Issue a GET request
    RequestGet {
        url: String,
        #[serde(default)]
        alias: Option<String>,
    },
    /// Title equals text
    ExpectTitle {
        text: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Title matches pattern
    ExpectTitleMatches {
        pattern: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// First match's text contains a substring
    ExpectText {
        selector: String,
        text: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Some match is visible
    ExpectVisible {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// No match is visible
    ExpectHidden {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// URL matches pattern
    ExpectUrl {
        pattern: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Exact match count
    ExpectCount {
        selector: String,
        count: usize,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Response status
    ExpectStatus {
        code: u16,
        #[serde(default)]
        response: Option<String>,
    },
}

impl PlanStep {
    fn into_step(self) -> EnsayoResult<Step> {
        let (assertion, timeout_ms) = match self {
            Self::Navigate { url } => return Ok(act(Action::Navigate { url })),
            Self::Fill { selector, value } => return Ok(act(Action::Fill { selector, value })),
            Self::Click { selector } => return Ok(act(Action::Click { selector })),
            Self::Press { selector, key } => return Ok(act(Action::Press { selector, key })),
            Self::RequestGet { url, alias } => return Ok(act(Action::RequestGet { url, alias })),
            Self::ExpectTitle { text, timeout_ms } => (Assertion::TitleEquals { text }, timeout_ms),
            Self::ExpectTitleMatches {
                pattern,
                timeout_ms,
            } => (
                Assertion::TitleMatches {
                    pattern: Pattern::new(&pattern)?,
                },
                timeout_ms,
            ),
            Self::ExpectText {
                selector,
                text,
                timeout_ms,
            } => (Assertion::TextContains { selector, text }, timeout_ms),
            Self::ExpectVisible {
                selector,
                timeout_ms,
            } => (Assertion::Visible { selector }, timeout_ms),
            Self::ExpectHidden {
                selector,
                timeout_ms,
            } => (Assertion::Hidden { selector }, timeout_ms),
            Self::ExpectUrl {
                pattern,
                timeout_ms,
            } => (
                Assertion::UrlMatches {
                    pattern: Pattern::new(&pattern)?,
                },
                timeout_ms,
            ),
            Self::ExpectCount {
                selector,
                count,
                timeout_ms,
            } => (Assertion::CountEquals { selector, count }, timeout_ms),
            Self::ExpectStatus { code, response } => {
                (Assertion::StatusEquals { response, code }, None)
            }
        };
        Ok(Step::Expect {
            assertion,
            timeout: timeout_ms.map(Duration::from_millis),
        })
    }
}

const fn act(action: Action) -> Step {
    Step::Act { action }
}

impl PlanTest {
    fn into_case(self) -> EnsayoResult<TestCase> {
        let mut case = TestCase::new(self.name);
        case.timeout = self.timeout_ms.map(Duration::from_millis);
        case.expect_timeout = self.expect_timeout_ms.map(Duration::from_millis);
        for step in self.steps {
            case = case.step(step.into_step()?);
        }
        Ok(case)
    }
}

impl PlanSuite {
    fn into_suite(self) -> EnsayoResult<Suite> {
        let mut suite = Suite::new(self.name);
        for test in self.tests {
            suite = suite.with_test(test.into_case()?);
        }
        for nested in self.suites {
            suite = suite.with_suite(nested.into_suite()?);
        }
        Ok(suite)
    }
}

impl TestPlan {
    /// Parse a plan from YAML.
    ///
    /// # Errors
    /// Returns error if YAML is invalid or the version is unsupported.
    pub fn from_yaml(yaml: &str) -> EnsayoResult<Self> {
        let plan: Self = serde_yaml_ng::from_str(yaml).map_err(|e| EnsayoError::PlanParse {
            message: e.to_string(),
        })?;
        if plan.version != PLAN_VERSION {
            return Err(EnsayoError::PlanParse {
                message: format!("unsupported version '{}', expected '{PLAN_VERSION}'", plan.version),
            });
        }
        Ok(plan)
    }

    /// Load a plan from a YAML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> EnsayoResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Number of tests in the plan
    #[must_use]
    pub fn test_count(&self) -> usize {
        fn count(suite: &PlanSuite) -> usize {
            suite.tests.len() + suite.suites.iter().map(count).sum::<usize>()
        }
        self.suites.iter().map(count).sum()
    }

    /// Compile patterns and register every suite.
    ///
    /// # Errors
    /// Returns the first invalid pattern or registration error.
    pub fn into_registry(self) -> EnsayoResult<SuiteRegistry> {
        let mut registry = SuiteRegistry::new();
        for suite in self.suites {
            registry.add_suite(suite.into_suite()?)?;
        }
        Ok(registry)
    }
}

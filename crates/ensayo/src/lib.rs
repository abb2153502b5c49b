//! Ensayo: structured UI-assertion execution engine
//!
//! Ensayo (Spanish: "rehearsal") runs declarative UI test cases against an
//! abstract page collaborator and classifies every result into one of four
//! outcomes: `Passed`, `Failed`, `TimedOut` or `TargetNotFound`.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐  run_all   ┌────────────┐  run(case)  ┌──────────────┐
//! │ SuiteRegistry │───────────►│ TestRunner │────────────►│ PageSession  │
//! │ (suites,      │            │ (timeout,  │             │ (Locator,    │
//! │  test cases)  │            │  classify) │             │  actions)    │
//! └───────────────┘            └─────┬──────┘             └──────┬───────┘
//!                                    │ TestResult                │ PageDriver
//!                                    ▼                           ▼
//!                              ┌────────────┐             ┌──────────────┐
//!                              │ RunReport  │             │ BrowserDriver│
//!                              │ (tree,     │             │ NetworkClient│
//!                              │  triage)   │             └──────────────┘
//!                              └────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ensayo::mock::{MockBrowser, MockElement, MockPageSpec, MockSite};
//! use ensayo::{Assertion, RunConfig, SuiteRegistry, TestRunner};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let site = MockSite::new().with_page(
//!     "https://demo.playwright.dev/todomvc",
//!     MockPageSpec::new("React • TodoMVC").with_element(MockElement::new(".new-todo", "")),
//! );
//! let browser = Arc::new(MockBrowser::new(site));
//! let runner = TestRunner::new(browser.clone(), browser)
//!     .with_config(RunConfig::new().with_base_url("https://demo.playwright.dev"));
//!
//! let mut registry = SuiteRegistry::new();
//! registry
//!     .register("Passing Tests", |s| {
//!         s.test("should load TodoMVC page", |t| {
//!             Ok(t.goto("/todomvc")
//!                 .expect(Assertion::title_matches("TodoMVC")?)
//!                 .expect(Assertion::visible(".new-todo")))
//!         });
//!     })
//!     .unwrap();
//!
//! let report = registry.run_all(&runner).await.unwrap();
//! assert!(report.all_passed());
//! # });
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod action;
mod assertion;
mod classify;
mod config;
mod driver;
#[allow(clippy::missing_errors_doc, clippy::doc_markdown)]
mod harness;
mod locator;
mod network;
#[allow(
    clippy::format_push_string,
    clippy::needless_raw_string_hashes,
    clippy::cast_precision_loss
)]
mod reporter;
mod result;
mod session;
mod suite;
mod wait;

/// In-memory page collaborator for tests and demos
pub mod mock;

/// Declarative YAML test plans
pub mod plan;

/// Logging setup
pub mod tracing_support;

/// Failure records for downstream triage
pub mod triage;

pub use action::Action;
pub use assertion::{check, evaluate, Assertion, Pattern, Verdict};
pub use classify::{classify, FailureReason, InfraKind, Outcome, StepFailure};
pub use config::{LogFormat, RunConfig, DEFAULT_EXPECT_TIMEOUT_MS, DEFAULT_TEST_TIMEOUT_MS};
pub use driver::{BrowserDriver, DriverError, ElementHandle, NavigationResponse, PageDriver};
pub use harness::TestRunner;
pub use locator::{LocateError, Locator};
#[cfg(feature = "http")]
pub use network::HttpClient;
pub use network::{NetworkClient, Response};
pub use reporter::{FailedStep, RunReport, RunSummary, SuiteReport, TestResult};
pub use result::{EnsayoError, EnsayoResult};
pub use session::{HistoryEntry, PageSession, SessionOptions, SessionState, DEFAULT_ACTION_TIMEOUT_MS};
pub use suite::{
    full_path, RunFilter, Step, Suite, SuiteBuilder, SuiteItem, SuiteRegistry, TestCase,
    PATH_SEPARATOR,
};
pub use wait::{poll_until, Deadline, Poll, WaitOptions, WaitOutcome, DEFAULT_POLL_INTERVAL_MS};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::mock::*;
    pub use super::plan::TestPlan;
    pub use super::triage::{TriageCategory, TriageRecord};
    pub use super::{
        Action, Assertion, EnsayoError, EnsayoResult, Outcome, Pattern, RunConfig, RunFilter,
        RunReport, Step, SuiteRegistry, TestCase, TestResult, TestRunner,
    };
}

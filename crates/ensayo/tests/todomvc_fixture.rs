//! TodoMVC fixture plan against an in-memory site.
//!
//! Runs the declarative demo plan end to end and pins the outcome of every
//! test: three pass, the rest fail for the reason their name suggests.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ensayo::mock::{MockBrowser, MockElement, MockPageSpec, MockSite, PressRule};
use ensayo::plan::TestPlan;
use ensayo::triage::TriageCategory;
use ensayo::{FailureReason, Outcome, RunConfig, RunFilter, RunReport, TestRunner};

const TODOMVC: &str = "https://demo.playwright.dev/todomvc";

fn plan_path() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/demos/todomvc.yaml"))
}

fn todomvc_site() -> MockSite {
    MockSite::new().with_page(
        TODOMVC,
        MockPageSpec::new("React • TodoMVC")
            .with_element(MockElement::new("h1", "todos"))
            .with_element(MockElement::new(".new-todo", ""))
            .with_press_rule(PressRule::new(".new-todo", "Enter", ".todo-list li"))
            .with_navigation_delay(Duration::from_millis(20)),
    )
}

fn runner(browser: Arc<MockBrowser>, workers: usize) -> TestRunner {
    TestRunner::new(browser.clone(), browser).with_config(
        RunConfig::new()
            .with_base_url("https://demo.playwright.dev")
            .with_workers(workers),
    )
}

async fn run_plan(workers: usize) -> (RunReport, Arc<MockBrowser>) {
    let plan = TestPlan::from_file(plan_path()).unwrap();
    let registry = plan.into_registry().unwrap();
    let browser = Arc::new(MockBrowser::new(todomvc_site()));
    let report = registry
        .run_all(&runner(browser.clone(), workers))
        .await
        .unwrap();
    (report, browser)
}

fn outcome<'a>(report: &'a RunReport, full_name: &str) -> &'a Outcome {
    &report
        .find(full_name)
        .unwrap_or_else(|| panic!("no result for {full_name}"))
        .outcome
}

#[test]
fn test_plan_shape() {
    let plan = TestPlan::from_file(plan_path()).unwrap();
    assert_eq!(plan.file.as_deref(), Some("demo.spec.js"));
    assert_eq!(plan.suites.len(), 6);
    assert_eq!(plan.test_count(), 14);
}

#[tokio::test(start_paused = true)]
async fn test_every_outcome_is_pinned() {
    let (report, _) = run_plan(4).await;

    let summary = report.summary();
    assert_eq!(summary.total, 14);
    assert_eq!(summary.passed, 3);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.timed_out, 5);
    assert_eq!(summary.target_not_found, 4);
    assert_eq!(summary.infrastructure, 0);

    assert!(matches!(
        outcome(&report, "Login Page Tests > should display correct page title"),
        Outcome::Failed {
            reason: FailureReason::Mismatch { expected, actual }
        } if expected == "Login - MyApp" && actual == "React • TodoMVC"
    ));
    assert_eq!(
        outcome(&report, "Login Page Tests > should find login button"),
        &Outcome::TargetNotFound {
            selector: "#login-button".into()
        }
    );
    assert!(matches!(
        outcome(&report, "Login Page Tests > should validate email input"),
        Outcome::TimedOut { .. }
    ));
    assert!(matches!(
        outcome(&report, "Dashboard Tests > should load user profile"),
        Outcome::TimedOut { elapsed, .. } if *elapsed >= Duration::from_secs(5)
    ));
    assert!(matches!(
        outcome(&report, "Dashboard Tests > should display welcome message"),
        Outcome::TimedOut { .. }
    ));
    assert_eq!(
        outcome(&report, "Form Submission Tests > should submit contact form"),
        &Outcome::TargetNotFound {
            selector: "#contact-name".into()
        }
    );
    assert_eq!(
        outcome(&report, "Form Submission Tests > should validate required fields"),
        &Outcome::TargetNotFound {
            selector: "#submit-form".into()
        }
    );
    assert_eq!(
        outcome(&report, "Navigation Tests > should navigate to settings page"),
        &Outcome::TargetNotFound {
            selector: "a[href=\"/settings\"]".into()
        }
    );
    assert!(matches!(
        outcome(&report, "Navigation Tests > should have working breadcrumbs"),
        Outcome::TimedOut { .. }
    ));
    assert!(matches!(
        outcome(&report, "API Integration Tests > should fetch user data"),
        Outcome::Failed {
            reason: FailureReason::Mismatch { expected, actual }
        } if expected == "200" && actual == "404"
    ));
    assert!(matches!(
        outcome(&report, "API Integration Tests > should handle 404 errors gracefully"),
        Outcome::TimedOut { .. }
    ));
    for name in [
        "Passing Tests > should load the demo page successfully",
        "Passing Tests > should have input field for new todos",
        "Passing Tests > should add a new todo item",
    ] {
        assert_eq!(outcome(&report, name), &Outcome::Passed, "{name}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_steps_skip_the_rest() {
    let (report, _) = run_plan(2).await;
    let contact = report
        .find("Form Submission Tests > should submit contact form")
        .unwrap();
    assert_eq!(contact.steps_total, 4);
    assert_eq!(contact.steps_run, 2);
    assert_eq!(contact.steps_skipped(), 2);
    assert_eq!(contact.final_url.as_deref(), Some(TODOMVC));
}

#[tokio::test(start_paused = true)]
async fn test_results_follow_declaration_order() {
    let (report, browser) = run_plan(4).await;
    let names: Vec<String> = report.results().map(|r| r.name.clone()).collect();
    assert_eq!(names.first().map(String::as_str), Some("should display correct page title"));
    assert_eq!(names.last().map(String::as_str), Some("should add a new todo item"));
    assert_eq!(browser.opened_pages(), 14);
    assert_eq!(browser.closed_pages(), 14);
}

#[tokio::test(start_paused = true)]
async fn test_sessions_are_isolated_between_runs() {
    // The todo added by the first run must not leak into the second.
    let registry = TestPlan::from_file(plan_path())
        .unwrap()
        .into_registry()
        .unwrap();
    let browser = Arc::new(MockBrowser::new(todomvc_site()));
    let shared = runner(browser.clone(), 1);
    let first = registry.run_all(&shared).await.unwrap();
    let second = registry.run_all(&shared).await.unwrap();
    let name = "Passing Tests > should add a new todo item";
    assert_eq!(outcome(&first, name), &Outcome::Passed);
    assert_eq!(outcome(&second, name), &Outcome::Passed);
    assert_eq!(first.summary(), second.summary());
    assert_eq!(browser.closed_pages(), 28);
}

#[tokio::test(start_paused = true)]
async fn test_grep_selects_passing_suite() {
    let registry = TestPlan::from_file(plan_path())
        .unwrap()
        .into_registry()
        .unwrap();
    let browser = Arc::new(MockBrowser::new(todomvc_site()));
    let filter = RunFilter::new().with_grep("todo").unwrap();
    let report = registry
        .run_filtered(&runner(browser, 4), &filter)
        .await;
    assert_eq!(report.suites.len(), 1);
    assert_eq!(report.suites[0].name, "Passing Tests");
    assert_eq!(report.summary().total, 2);
    assert!(report.all_passed());
}

#[tokio::test(start_paused = true)]
async fn test_triage_records_for_failures() {
    let (report, _) = run_plan(4).await;
    let records = report.triage_records("demo.spec.js", &[]);
    assert_eq!(records.len(), 11);

    let count = |category| records.iter().filter(|r| r.category == category).count();
    assert_eq!(count(TriageCategory::Assertion), 2);
    assert_eq!(count(TriageCategory::Timeout), 5);
    assert_eq!(count(TriageCategory::MissingTarget), 4);
    assert_eq!(count(TriageCategory::Infrastructure), 0);

    let login = &records[1];
    assert_eq!(login.test_name, "should find login button");
    assert_eq!(login.suite_path, "Login Page Tests");
    assert_eq!(login.status, "failed");
    assert!(login.logs.contains("Step: click(#login-button)"));
    assert!(login
        .stack_trace
        .contains("at step 2: click(#login-button)"));
    let script = login.script_url.as_deref().unwrap();
    assert!(script.starts_with("file://"));
    assert!(script.ends_with("demo.spec.js#step-2"));
    assert!(records
        .iter()
        .filter(|r| r.category == TriageCategory::Timeout)
        .all(|r| r.status == "timedOut"));
}

#[tokio::test(start_paused = true)]
async fn test_junit_counts_failures() {
    let (report, _) = run_plan(4).await;
    let xml = report.render_junit();
    assert!(xml.contains("tests=\"14\""));
    assert!(xml.contains("name=\"Passing Tests\""));
}

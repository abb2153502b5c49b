//! Example: TodoMVC demo plan
//!
//! Demonstrates: loading a YAML plan, running it against an in-memory site,
//! and emitting the report plus triage records for the failures.
//!
//! Run with: `cargo run --example todomvc_demo [config.yaml]`
//! The optional run config selects suites (`suites`, `grep`) and the log
//! format. Set `RUST_LOG=debug` to see every step.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ensayo::prelude::*;
use ensayo::tracing_support::init_logging;

const PLAN: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/todomvc.yaml");

fn site() -> MockSite {
    MockSite::new().with_page(
        "https://demo.playwright.dev/todomvc",
        MockPageSpec::new("React • TodoMVC")
            .with_element(MockElement::new("h1", "todos"))
            .with_element(MockElement::new(".new-todo", ""))
            .with_press_rule(PressRule::new(".new-todo", "Enter", ".todo-list li"))
            .with_navigation_delay(Duration::from_millis(50)),
    )
}

#[tokio::main]
async fn main() -> EnsayoResult<()> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => RunConfig::from_file(Path::new(&path))?,
        None => RunConfig::new().with_workers(4),
    };
    init_logging(config.log_format)?;

    println!("=== TodoMVC Demo ===\n");

    let plan = TestPlan::from_file(Path::new(PLAN))?;
    let file = plan.file.clone().unwrap_or_else(|| PLAN.to_string());
    if config.base_url.is_none() {
        config.base_url = plan.base_url.clone();
    }
    println!("Plan '{}': {} tests", plan.name, plan.test_count());

    let registry = plan.into_registry()?;
    let browser = Arc::new(MockBrowser::new(site()));
    let runner = TestRunner::new(browser.clone(), browser).with_config(config);

    // Missing targets wait out the 5s action timeout, so this takes a few seconds.
    let report = registry.run_all(&runner).await?;
    println!("\n{}", report.render_text());

    let records = report.triage_records(&file, &[]);
    println!("{} triage records:", records.len());
    println!("{}", serde_json::to_string_pretty(&records)?);

    Ok(())
}

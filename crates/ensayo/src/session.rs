//! Page sessions.
//!
//! A [`PageSession`] is one logical browser context, owned by the runner for
//! the duration of a single test. It wraps the page collaborator with target
//! resolution, URL bookkeeping and an interaction history used for post-mortem
//! diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use url::Url;

use crate::action::Action;
use crate::assertion::{check, Assertion};
use crate::classify::StepFailure;
use crate::driver::{BrowserDriver, DriverError, ElementHandle, NavigationResponse, PageDriver};
use crate::locator::{LocateError, Locator};
use crate::network::{NetworkClient, Response};
use crate::suite::Step;
use crate::wait::DEFAULT_POLL_INTERVAL_MS;

/// Default time an action waits for its target (5 seconds)
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5000;

/// Per-session settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// How long element actions wait for their target
    pub action_timeout: Duration,
    /// Locator polling interval
    pub poll_interval: Duration,
    /// Base for relative URLs
    pub base_url: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            action_timeout: Duration::from_millis(DEFAULT_ACTION_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            base_url: None,
        }
    }
}

impl SessionOptions {
    /// Set action timeout
    #[must_use]
    pub const fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    /// Set polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Accepting actions
    Open,
    /// Closed; every operation fails
    Closed,
}

/// One recorded action or assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// What was attempted
    pub step: Step,
    /// Offset from session open
    pub at: Duration,
    /// Failure message, if the step failed
    pub error: Option<String>,
}

/// A page context owned by one running test
pub struct PageSession {
    driver: Box<dyn PageDriver>,
    network: Arc<dyn NetworkClient>,
    options: SessionOptions,
    state: SessionState,
    current_url: Option<String>,
    history: Vec<HistoryEntry>,
    responses: Vec<(Option<String>, Response)>,
    opened_at: Instant,
}

impl fmt::Debug for PageSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageSession")
            .field("state", &self.state)
            .field("current_url", &self.current_url)
            .field("history", &self.history.len())
            .field("responses", &self.responses.len())
            .finish_non_exhaustive()
    }
}

impl PageSession {
    /// Open a fresh page from the browser.
    ///
    /// Fails with [`StepFailure::SessionUnavailable`] if no page can be created.
    pub async fn open(
        browser: &dyn BrowserDriver,
        network: Arc<dyn NetworkClient>,
        options: SessionOptions,
    ) -> Result<Self, StepFailure> {
        let driver = browser
            .new_page()
            .await
            .map_err(|e| StepFailure::SessionUnavailable {
                message: e.to_string(),
            })?;
        Ok(Self {
            driver,
            network,
            options,
            state: SessionState::Open,
            current_url: None,
            history: Vec::new(),
            responses: Vec::new(),
            opened_at: Instant::now(),
        })
    }

    /// Bind a selector to this session
    #[must_use]
    pub const fn locator<'a>(&'a self, selector: &'a str) -> Locator<'a> {
        Locator::new(self, selector)
    }

    /// Lifecycle state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the session still accepts operations
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// URL of the last successful navigation
    #[must_use]
    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// Every action attempted so far, in order
    #[must_use]
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Locator polling interval
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.options.poll_interval
    }

    /// How long element actions wait for their target
    #[must_use]
    pub const fn action_timeout(&self) -> Duration {
        self.options.action_timeout
    }

    /// Response recorded under `alias`, or the most recent one when `None`
    #[must_use]
    pub fn response(&self, alias: Option<&str>) -> Option<&Response> {
        match alias {
            Some(alias) => self
                .responses
                .iter()
                .rev()
                .find(|(name, _)| name.as_deref() == Some(alias))
                .map(|(_, resp)| resp),
            None => self.responses.last().map(|(_, resp)| resp),
        }
    }

    /// Join a relative URL onto the base URL.
    ///
    /// Anything that parses with a scheme (`https:`, `about:`, `data:`, ...)
    /// is absolute and left alone.
    #[must_use]
    pub fn resolve_url(&self, url: &str) -> String {
        match &self.options.base_url {
            Some(base) if Url::parse(url).is_err() => {
                format!("{}/{}", base.trim_end_matches('/'), url.trim_start_matches('/'))
            }
            _ => url.to_string(),
        }
    }

    pub(crate) async fn query(&self, selector: &str) -> Result<Vec<ElementHandle>, DriverError> {
        if !self.is_open() {
            return Err(DriverError::Closed);
        }
        self.driver.query_all(selector).await
    }

    /// Current document title
    pub async fn title(&self) -> Result<String, StepFailure> {
        self.ensure_open()?;
        self.driver
            .title()
            .await
            .map_err(|e| driver_failure("page.title", e))
    }

    /// Current URL as reported by the page
    pub async fn url(&self) -> Result<String, StepFailure> {
        self.ensure_open()?;
        self.driver
            .current_url()
            .await
            .map_err(|e| driver_failure("page.url", e))
    }

    /// Navigate to URL
    pub async fn navigate(&mut self, url: &str) -> Result<NavigationResponse, StepFailure> {
        let action = Action::navigate(url);
        let result = self.navigate_inner(url).await;
        self.record(action, result.as_ref().err());
        result
    }

    /// Fill an input, waiting for it to exist
    pub async fn fill(&mut self, selector: &str, value: &str) -> Result<(), StepFailure> {
        let action = Action::fill(selector, value);
        let result = self.element_action(&action).await;
        self.record(action, result.as_ref().err());
        result
    }

    /// Click an element, waiting for it to exist
    pub async fn click(&mut self, selector: &str) -> Result<(), StepFailure> {
        let action = Action::click(selector);
        let result = self.element_action(&action).await;
        self.record(action, result.as_ref().err());
        result
    }

    /// Press a key on an element, waiting for it to exist
    pub async fn press(&mut self, selector: &str, key: &str) -> Result<(), StepFailure> {
        let action = Action::press(selector, key);
        let result = self.element_action(&action).await;
        self.record(action, result.as_ref().err());
        result
    }

    /// GET a URL through the network collaborator and remember the response
    pub async fn request_get(
        &mut self,
        url: &str,
        alias: Option<&str>,
    ) -> Result<Response, StepFailure> {
        let action = Action::RequestGet {
            url: url.to_string(),
            alias: alias.map(str::to_string),
        };
        let result = self.request_inner(url, alias).await;
        self.record(action, result.as_ref().err());
        result
    }

    /// Execute an action description
    pub async fn perform(&mut self, action: &Action) -> Result<(), StepFailure> {
        match action {
            Action::Navigate { url } => self.navigate(url).await.map(|_| ()),
            Action::Fill { selector, value } => self.fill(selector, value).await,
            Action::Click { selector } => self.click(selector).await,
            Action::Press { selector, key } => self.press(selector, key).await,
            Action::RequestGet { url, alias } => {
                self.request_get(url, alias.as_deref()).await.map(|_| ())
            }
        }
    }

    /// Check an assertion and record it in the history
    ///
    /// # Errors
    /// Returns the failure when the assertion does not hold in time.
    pub async fn expect(
        &mut self,
        assertion: &Assertion,
        timeout: Duration,
    ) -> Result<(), StepFailure> {
        let result = check(assertion, self, timeout).await;
        let step = Step::Expect {
            assertion: assertion.clone(),
            timeout: Some(timeout),
        };
        self.record(step, result.as_ref().err());
        result
    }

    /// Record a step that was cut short by the test timeout
    pub(crate) fn record_interrupted(&mut self, step: &Step, failure: &StepFailure) {
        self.record(step.clone(), Some(failure));
    }

    /// Close the page. Calling it again does nothing.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        if let Err(err) = self.driver.close().await {
            tracing::warn!(error = %err, "page did not close cleanly");
        }
    }

    fn ensure_open(&self) -> Result<(), StepFailure> {
        if self.is_open() {
            Ok(())
        } else {
            Err(StepFailure::SessionClosed)
        }
    }

    fn record(&mut self, step: impl Into<Step>, error: Option<&StepFailure>) {
        self.history.push(HistoryEntry {
            step: step.into(),
            at: self.opened_at.elapsed(),
            error: error.map(ToString::to_string),
        });
    }

    async fn navigate_inner(&mut self, url: &str) -> Result<NavigationResponse, StepFailure> {
        self.ensure_open()?;
        let target = self.resolve_url(url);
        let response = self.driver.navigate(&target).await.map_err(|e| match e {
            DriverError::Closed => StepFailure::SessionClosed,
            other => StepFailure::Navigation {
                url: target.clone(),
                message: other.to_string(),
            },
        })?;
        let landed = self.driver.current_url().await.unwrap_or_else(|_| target.clone());
        self.current_url = Some(landed);
        Ok(response)
    }

    async fn element_action(&mut self, action: &Action) -> Result<(), StepFailure> {
        self.ensure_open()?;
        let Some(selector) = action.selector() else {
            return Ok(());
        };
        self.locator(selector)
            .resolve(self.options.action_timeout)
            .await
            .map_err(|e| match e {
                LocateError::NotFound { selector, waited } => {
                    StepFailure::TargetNotFound { selector, waited }
                }
                LocateError::Driver(err) => driver_failure(&action.to_string(), err),
            })?;

        let step = action.to_string();
        let result = match action {
            Action::Fill { selector, value } => self.driver.fill(selector, value).await,
            Action::Click { selector } => self.driver.click(selector).await,
            Action::Press { selector, key } => self.driver.press(selector, key).await,
            Action::Navigate { .. } | Action::RequestGet { .. } => Ok(()),
        };
        result.map_err(|e| driver_failure(&step, e))
    }

    async fn request_inner(
        &mut self,
        url: &str,
        alias: Option<&str>,
    ) -> Result<Response, StepFailure> {
        self.ensure_open()?;
        let target = self.resolve_url(url);
        let response = self
            .network
            .get(&target)
            .await
            .map_err(|e| StepFailure::Network {
                url: target.clone(),
                message: e.to_string(),
            })?;
        self.responses
            .push((alias.map(str::to_string), response.clone()));
        Ok(response)
    }
}

fn driver_failure(step: &str, err: DriverError) -> StepFailure {
    match err {
        DriverError::Closed => StepFailure::SessionClosed,
        other => StepFailure::Driver {
            step: step.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBrowser, MockElement, MockPageSpec, MockSite, PressRule};

    const BASE: &str = "https://demo.playwright.dev";
    const URL: &str = "https://demo.playwright.dev/todomvc";

    fn site() -> MockSite {
        MockSite::new()
            .with_page(
                URL,
                MockPageSpec::new("TodoMVC")
                    .with_element(MockElement::new(".new-todo", ""))
                    .with_press_rule(PressRule::new(".new-todo", "Enter", ".todo-list li")),
            )
            .with_endpoint(
                "https://demo.playwright.dev/api/health",
                Response::new("https://demo.playwright.dev/api/health", 200, "ok"),
            )
            .with_unreachable("https://down.invalid")
    }

    async fn open(browser: &Arc<MockBrowser>, options: SessionOptions) -> PageSession {
        PageSession::open(browser.as_ref(), browser.clone(), options)
            .await
            .unwrap()
    }

    mod navigation_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_navigate_sets_url_and_history() {
            let browser = Arc::new(MockBrowser::new(site()));
            let mut session = open(&browser, SessionOptions::default()).await;
            assert_eq!(session.current_url(), None);

            let resp = session.navigate(URL).await.unwrap();
            assert_eq!(resp.status, 200);
            assert_eq!(session.current_url(), Some(URL));
            assert_eq!(session.history().len(), 1);
            assert_eq!(session.history()[0].step, Step::from(Action::navigate(URL)));
            assert!(session.history()[0].error.is_none());
        }

        #[tokio::test(start_paused = true)]
        async fn test_relative_url_joins_base() {
            let browser = Arc::new(MockBrowser::new(site()));
            let mut session = open(&browser, SessionOptions::default().with_base_url(format!("{BASE}/"))).await;
            session.navigate("/todomvc").await.unwrap();
            assert_eq!(session.current_url(), Some(URL));
            assert_eq!(session.title().await.unwrap(), "TodoMVC");
        }

        #[tokio::test(start_paused = true)]
        async fn test_urls_with_a_scheme_are_not_joined() {
            let browser = Arc::new(MockBrowser::new(site()));
            let mut session = open(&browser, SessionOptions::default().with_base_url(BASE)).await;
            assert_eq!(session.resolve_url("/todomvc"), URL);
            assert_eq!(session.resolve_url("todomvc"), URL);
            assert_eq!(session.resolve_url(URL), URL);
            assert_eq!(session.resolve_url("about:blank"), "about:blank");
            assert_eq!(session.resolve_url("data:text/html,<h1>hi</h1>"), "data:text/html,<h1>hi</h1>");
            session.navigate("about:blank").await.unwrap();
            assert_eq!(session.current_url(), Some("about:blank"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_unreachable_is_navigation_error() {
            let browser = Arc::new(MockBrowser::new(site()));
            let mut session = open(&browser, SessionOptions::default()).await;
            let err = session.navigate("https://down.invalid/app").await.unwrap_err();
            assert!(matches!(err, StepFailure::Navigation { .. }));
            assert!(session.history()[0].error.is_some());
            assert_eq!(session.current_url(), None);
        }

        #[tokio::test(start_paused = true)]
        async fn test_unknown_page_navigates_with_404() {
            let browser = Arc::new(MockBrowser::new(site()));
            let mut session = open(&browser, SessionOptions::default()).await;
            let resp = session
                .navigate("https://demo.playwright.dev/nonexistent-page")
                .await
                .unwrap();
            assert_eq!(resp.status, 404);
        }
    }

    mod interaction_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_fill_and_press_adds_item() {
            let browser = Arc::new(MockBrowser::new(site()));
            let mut session = open(&browser, SessionOptions::default()).await;
            session.navigate(URL).await.unwrap();
            session.fill(".new-todo", "Test Todo Item").await.unwrap();
            session.press(".new-todo", "Enter").await.unwrap();

            let items = session.locator(".todo-list li").all().await.unwrap();
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].text, "Test Todo Item");
            assert_eq!(session.history().len(), 3);
        }

        #[tokio::test(start_paused = true)]
        async fn test_click_missing_target_waits_action_timeout() {
            let browser = Arc::new(MockBrowser::new(site()));
            let options = SessionOptions::default().with_action_timeout(Duration::from_millis(300));
            let mut session = open(&browser, options).await;
            session.navigate(URL).await.unwrap();

            let start = Instant::now();
            let err = session.click("#login-button").await.unwrap_err();
            assert_eq!(
                err,
                StepFailure::TargetNotFound {
                    selector: "#login-button".into(),
                    waited: Duration::from_millis(300),
                }
            );
            assert_eq!(start.elapsed(), Duration::from_millis(300));
            assert!(session.history().last().unwrap().error.is_some());
        }

        #[tokio::test(start_paused = true)]
        async fn test_request_get_records_responses() {
            let browser = Arc::new(MockBrowser::new(site()));
            let mut session = open(&browser, SessionOptions::default()).await;

            let ok = session
                .request_get("https://demo.playwright.dev/api/health", Some("health"))
                .await
                .unwrap();
            assert_eq!(ok.status, 200);
            let missing = session
                .request_get("https://demo.playwright.dev/api/user/123", None)
                .await
                .unwrap();
            assert_eq!(missing.status, 404);

            assert_eq!(session.response(Some("health")).unwrap().status, 200);
            assert_eq!(session.response(None).unwrap().status, 404);
            assert!(session.response(Some("other")).is_none());
        }

        #[tokio::test(start_paused = true)]
        async fn test_request_get_unreachable_is_network_error() {
            let browser = Arc::new(MockBrowser::new(site()));
            let mut session = open(&browser, SessionOptions::default()).await;
            let err = session
                .request_get("https://down.invalid/api", None)
                .await
                .unwrap_err();
            assert!(matches!(err, StepFailure::Network { .. }));
        }
    }

    mod lifecycle_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_close_is_idempotent_and_blocks_actions() {
            let browser = Arc::new(MockBrowser::new(site()));
            let mut session = open(&browser, SessionOptions::default()).await;
            session.close().await;
            session.close().await;
            assert_eq!(session.state(), SessionState::Closed);
            assert_eq!(browser.closed_pages(), 1);

            assert_eq!(session.navigate(URL).await.unwrap_err(), StepFailure::SessionClosed);
            assert_eq!(session.click(".new-todo").await.unwrap_err(), StepFailure::SessionClosed);
            assert_eq!(session.title().await.unwrap_err(), StepFailure::SessionClosed);
        }

        #[tokio::test(start_paused = true)]
        async fn test_open_failure_is_session_unavailable() {
            let browser = MockBrowser::new(site()).failing_new_page();
            let network: Arc<dyn NetworkClient> = Arc::new(MockBrowser::new(site()));
            let err = PageSession::open(&browser, network, SessionOptions::default())
                .await
                .unwrap_err();
            assert!(matches!(err, StepFailure::SessionUnavailable { .. }));
        }
    }
}

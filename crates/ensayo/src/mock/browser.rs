//! Mock browser and page drivers.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

use super::site::{MockElement, MockPageSpec, MockSite};
use crate::driver::{BrowserDriver, DriverError, ElementHandle, NavigationResponse, PageDriver};
use crate::network::{NetworkClient, Response};

/// Serves a [`MockSite`] as browser and network collaborator
#[derive(Debug, Clone)]
pub struct MockBrowser {
    site: Arc<MockSite>,
    fail_new_page: bool,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl MockBrowser {
    /// Create a browser over `site`
    #[must_use]
    pub fn new(site: MockSite) -> Self {
        Self {
            site: Arc::new(site),
            fail_new_page: false,
            opened: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every `new_page` call fail
    #[must_use]
    pub const fn failing_new_page(mut self) -> Self {
        self.fail_new_page = true;
        self
    }

    /// Pages opened so far
    #[must_use]
    pub fn opened_pages(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Pages closed so far
    #[must_use]
    pub fn closed_pages(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserDriver for MockBrowser {
    async fn new_page(&self) -> Result<Box<dyn PageDriver>, DriverError> {
        if self.fail_new_page {
            return Err(DriverError::PageUnavailable {
                message: "browser refused to create a context".to_string(),
            });
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockPage {
            site: Arc::clone(&self.site),
            loaded: None,
            closed: false,
            closed_counter: Arc::clone(&self.closed),
        }))
    }
}

#[async_trait]
impl NetworkClient for MockBrowser {
    async fn get(&self, url: &str) -> Result<Response, DriverError> {
        if self.site.is_unreachable(url) {
            return Err(DriverError::Unreachable {
                url: url.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(self
            .site
            .endpoints
            .get(url)
            .cloned()
            .unwrap_or_else(|| Response::not_found(url)))
    }
}

#[derive(Debug)]
struct LoadedPage {
    url: String,
    spec: MockPageSpec,
    loaded_at: Instant,
    values: HashMap<String, String>,
}

impl LoadedPage {
    fn present<'a>(&'a self, selector: &'a str) -> impl Iterator<Item = &'a MockElement> + 'a {
        let since = self.loaded_at.elapsed();
        self.spec.elements.iter().filter(move |el| {
            el.selector == selector && el.appears_after.map_or(true, |delay| since >= delay)
        })
    }
}

/// One page context over a [`MockSite`]
#[derive(Debug)]
pub struct MockPage {
    site: Arc<MockSite>,
    loaded: Option<LoadedPage>,
    closed: bool,
    closed_counter: Arc<AtomicUsize>,
}

impl MockPage {
    fn check_open(&self) -> Result<(), DriverError> {
        if self.closed {
            Err(DriverError::Closed)
        } else {
            Ok(())
        }
    }

    fn require(&self, selector: &str) -> Result<&LoadedPage, DriverError> {
        self.check_open()?;
        let page = self.loaded.as_ref().ok_or_else(|| DriverError::Protocol {
            message: "no document loaded".to_string(),
        })?;
        if page.present(selector).next().is_none() {
            return Err(DriverError::Protocol {
                message: format!("no element matches {selector}"),
            });
        }
        Ok(page)
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn navigate(&mut self, url: &str) -> Result<NavigationResponse, DriverError> {
        self.check_open()?;
        if self.site.is_unreachable(url) {
            return Err(DriverError::Unreachable {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        let spec = self.site.page(url).clone();
        if let Some(delay) = spec.navigation_delay {
            tokio::time::sleep(delay).await;
        }
        let status = spec.status;
        self.loaded = Some(LoadedPage {
            url: url.to_string(),
            spec,
            loaded_at: Instant::now(),
            values: HashMap::new(),
        });
        Ok(NavigationResponse { status })
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DriverError> {
        self.check_open()?;
        Ok(self.loaded.as_ref().map_or_else(Vec::new, |page| {
            page.present(selector)
                .map(|el| ElementHandle::new(&el.selector, &el.text).with_visible(el.visible))
                .collect()
        }))
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), DriverError> {
        self.require(selector)?;
        if let Some(page) = self.loaded.as_mut() {
            page.values.insert(selector.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), DriverError> {
        self.require(selector).map(|_| ())
    }

    async fn press(&mut self, selector: &str, key: &str) -> Result<(), DriverError> {
        self.require(selector)?;
        let Some(page) = self.loaded.as_mut() else {
            return Ok(());
        };
        let rule = page
            .spec
            .press_rules
            .iter()
            .find(|r| r.selector == selector && r.key == key)
            .cloned();
        if let Some(rule) = rule {
            let value = page.values.remove(selector).unwrap_or_default();
            if !value.is_empty() {
                page.spec.elements.push(MockElement::new(rule.append, value));
            }
        }
        Ok(())
    }

    async fn title(&self) -> Result<String, DriverError> {
        self.check_open()?;
        Ok(self
            .loaded
            .as_ref()
            .map(|page| page.spec.title.clone())
            .unwrap_or_default())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        self.check_open()?;
        Ok(self
            .loaded
            .as_ref()
            .map_or_else(|| "about:blank".to_string(), |page| page.url.clone()))
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if !self.closed {
            self.closed = true;
            self.closed_counter.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::PressRule;
    use std::time::Duration;

    const URL: &str = "https://demo.playwright.dev/todomvc";

    fn browser() -> MockBrowser {
        MockBrowser::new(
            MockSite::new().with_page(
                URL,
                MockPageSpec::new("TodoMVC")
                    .with_element(MockElement::new(".new-todo", ""))
                    .with_press_rule(PressRule::new(".new-todo", "Enter", ".todo-list li")),
            ),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_pages_do_not_share_state() {
        let browser = browser();
        let mut first = browser.new_page().await.unwrap();
        first.navigate(URL).await.unwrap();
        first.fill(".new-todo", "one").await.unwrap();
        first.press(".new-todo", "Enter").await.unwrap();
        assert_eq!(first.query_all(".todo-list li").await.unwrap().len(), 1);

        let mut second = browser.new_page().await.unwrap();
        second.navigate(URL).await.unwrap();
        assert!(second.query_all(".todo-list li").await.unwrap().is_empty());
        assert_eq!(browser.opened_pages(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_without_value_adds_nothing() {
        let browser = browser();
        let mut page = browser.new_page().await.unwrap();
        page.navigate(URL).await.unwrap();
        page.press(".new-todo", "Enter").await.unwrap();
        assert!(page.query_all(".todo-list li").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_page_before_navigation() {
        let browser = browser();
        let page = browser.new_page().await.unwrap();
        assert_eq!(page.current_url().await.unwrap(), "about:blank");
        assert_eq!(page.title().await.unwrap(), "");
        assert!(page.query_all("h1").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_delay_uses_tokio_time() {
        let browser = MockBrowser::new(MockSite::new().with_page(
            URL,
            MockPageSpec::new("Slow").with_navigation_delay(Duration::from_secs(3)),
        ));
        let mut page = browser.new_page().await.unwrap();
        let start = Instant::now();
        page.navigate(URL).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_counts_once() {
        let browser = browser();
        let mut page = browser.new_page().await.unwrap();
        page.close().await.unwrap();
        page.close().await.unwrap();
        assert_eq!(browser.closed_pages(), 1);
        assert_eq!(page.title().await.unwrap_err(), DriverError::Closed);
    }

    #[tokio::test]
    async fn test_failing_new_page() {
        let browser = browser().failing_new_page();
        assert!(matches!(
            browser.new_page().await,
            Err(DriverError::PageUnavailable { .. })
        ));
    }
}

//! Static description of a mock site.

use std::collections::HashMap;
use std::time::Duration;

use crate::network::Response;

/// An element on a mock page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    /// Selector the element answers to (matched verbatim)
    pub selector: String,
    /// Text content
    pub text: String,
    /// Whether the element is rendered visibly
    pub visible: bool,
    /// Delay after navigation before the element exists
    pub appears_after: Option<Duration>,
}

impl MockElement {
    /// Visible element present from page load
    #[must_use]
    pub fn new(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: text.into(),
            visible: true,
            appears_after: None,
        }
    }

    /// Mark as present but not visible
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Insert the element only after `delay` has passed since navigation
    #[must_use]
    pub const fn appears_after(mut self, delay: Duration) -> Self {
        self.appears_after = Some(delay);
        self
    }
}

/// Pressing `key` on `selector` appends an element holding the input's value.
///
/// Models the TodoMVC "type, press Enter, item appears" interaction. Empty
/// values are ignored, and the input is cleared afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PressRule {
    /// Input selector
    pub selector: String,
    /// Key name
    pub key: String,
    /// Selector of the appended element
    pub append: String,
}

impl PressRule {
    /// Create a rule
    #[must_use]
    pub fn new(
        selector: impl Into<String>,
        key: impl Into<String>,
        append: impl Into<String>,
    ) -> Self {
        Self {
            selector: selector.into(),
            key: key.into(),
            append: append.into(),
        }
    }
}

/// A page served at one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPageSpec {
    /// Document title
    pub title: String,
    /// HTTP status of the document
    pub status: u16,
    /// Elements in document order
    pub elements: Vec<MockElement>,
    /// Keyboard interactions
    pub press_rules: Vec<PressRule>,
    /// Time navigation takes to complete
    pub navigation_delay: Option<Duration>,
}

impl MockPageSpec {
    /// 200 page with a title and no elements
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: 200,
            elements: Vec::new(),
            press_rules: Vec::new(),
            navigation_delay: None,
        }
    }

    /// Set status
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Add an element
    #[must_use]
    pub fn with_element(mut self, element: MockElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Add a press rule
    #[must_use]
    pub fn with_press_rule(mut self, rule: PressRule) -> Self {
        self.press_rules.push(rule);
        self
    }

    /// Make navigation to this page take `delay`
    #[must_use]
    pub const fn with_navigation_delay(mut self, delay: Duration) -> Self {
        self.navigation_delay = Some(delay);
        self
    }
}

/// Pages, endpoints and unreachable hosts
#[derive(Debug, Clone)]
pub struct MockSite {
    pub(crate) pages: HashMap<String, MockPageSpec>,
    pub(crate) endpoints: HashMap<String, Response>,
    pub(crate) unreachable: Vec<String>,
    pub(crate) not_found: MockPageSpec,
}

impl Default for MockSite {
    fn default() -> Self {
        Self {
            pages: HashMap::new(),
            endpoints: HashMap::new(),
            unreachable: Vec::new(),
            not_found: MockPageSpec::new("404 Not Found")
                .with_status(404)
                .with_element(MockElement::new("h1", "404")),
        }
    }
}

impl MockSite {
    /// Empty site; every URL serves the 404 page
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `spec` at `url`
    #[must_use]
    pub fn with_page(mut self, url: impl Into<String>, spec: MockPageSpec) -> Self {
        self.pages.insert(url.into(), spec);
        self
    }

    /// Answer GET `url` with `response`
    #[must_use]
    pub fn with_endpoint(mut self, url: impl Into<String>, response: Response) -> Self {
        self.endpoints.insert(url.into(), response);
        self
    }

    /// Treat every URL starting with `prefix` as unreachable
    #[must_use]
    pub fn with_unreachable(mut self, prefix: impl Into<String>) -> Self {
        self.unreachable.push(prefix.into());
        self
    }

    /// Replace the page served for unknown URLs
    #[must_use]
    pub fn with_not_found(mut self, spec: MockPageSpec) -> Self {
        self.not_found = spec;
        self
    }

    pub(crate) fn is_unreachable(&self, url: &str) -> bool {
        self.unreachable.iter().any(|prefix| url.starts_with(prefix))
    }

    pub(crate) fn page(&self, url: &str) -> &MockPageSpec {
        self.pages.get(url).unwrap_or(&self.not_found)
    }
}

//! Page automation collaborators.
//!
//! Ensayo never talks to a browser itself. Everything that touches a real (or
//! remote) page goes through these traits, so a CDP backend, a Playwright
//! bridge or the in-memory [`MockBrowser`](crate::mock::MockBrowser) can be
//! swapped in without changing the engine.
//!
//! ```text
//! ┌──────────────┐  new_page()  ┌──────────────┐
//! │ BrowserDriver│─────────────►│  PageDriver  │◄── PageSession (one per test)
//! └──────────────┘              └──────────────┘
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// Target could not be reached (DNS, connection refused, ...)
    #[error("{url} is unreachable: {message}")]
    Unreachable {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Page context could not be created
    #[error("Failed to open page: {message}")]
    PageUnavailable {
        /// Error message
        message: String,
    },

    /// Protocol or evaluation failure inside the page
    #[error("Driver protocol error: {message}")]
    Protocol {
        /// Error message
        message: String,
    },

    /// Operation on a page that was already closed
    #[error("Page is closed")]
    Closed,
}

/// Observation of one element matched by a selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Selector the element was matched by
    pub selector: String,
    /// Text content at observation time
    pub text: String,
    /// Whether the element was visible at observation time
    pub visible: bool,
}

impl ElementHandle {
    /// Create a visible element handle
    #[must_use]
    pub fn new(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: text.into(),
            visible: true,
        }
    }

    /// Set visibility
    #[must_use]
    pub const fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

/// Outcome of a successful navigation
///
/// A 404 page still navigates; only an unreachable target is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationResponse {
    /// HTTP status of the main document
    pub status: u16,
}

impl NavigationResponse {
    /// Whether the status is in the 2xx range
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// One browser page context
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to URL
    async fn navigate(&mut self, url: &str) -> Result<NavigationResponse, DriverError>;

    /// Query all elements currently matching the selector
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>, DriverError>;

    /// Replace the value of an input
    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), DriverError>;

    /// Click an element
    async fn click(&mut self, selector: &str) -> Result<(), DriverError>;

    /// Press a key while an element is focused
    async fn press(&mut self, selector: &str, key: &str) -> Result<(), DriverError>;

    /// Current document title
    async fn title(&self) -> Result<String, DriverError>;

    /// Current URL
    async fn current_url(&self) -> Result<String, DriverError>;

    /// Close the page
    async fn close(&mut self) -> Result<(), DriverError>;
}

/// Factory for independent page contexts
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open a fresh page with no state shared with other pages
    async fn new_page(&self) -> Result<Box<dyn PageDriver>, DriverError>;
}

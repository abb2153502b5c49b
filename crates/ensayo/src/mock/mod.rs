//! In-memory page collaborator.
//!
//! A [`MockSite`] describes pages, API endpoints and unreachable hosts. A
//! [`MockBrowser`] serves it through the [`BrowserDriver`](crate::BrowserDriver)
//! and [`NetworkClient`](crate::NetworkClient) traits, giving every page it
//! opens its own copy of the DOM so tests stay isolated.
//!
//! ## Example
//!
//! ```rust
//! use ensayo::mock::{MockBrowser, MockElement, MockPageSpec, MockSite, PressRule};
//!
//! let site = MockSite::new().with_page(
//!     "https://demo.playwright.dev/todomvc",
//!     MockPageSpec::new("TodoMVC")
//!         .with_element(MockElement::new(".new-todo", ""))
//!         .with_press_rule(PressRule::new(".new-todo", "Enter", ".todo-list li")),
//! );
//! let browser = MockBrowser::new(site);
//! assert_eq!(browser.opened_pages(), 0);
//! ```

mod browser;
mod site;

pub use browser::{MockBrowser, MockPage};
pub use site::{MockElement, MockPageSpec, MockSite, PressRule};

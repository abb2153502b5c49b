//! Page actions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A pure description of something to do to a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Navigate to URL
    Navigate {
        /// Target URL (relative URLs join the configured base URL)
        url: String,
    },
    /// Replace the value of an input
    Fill {
        /// Target selector
        selector: String,
        /// Value to type
        value: String,
    },
    /// Click an element
    Click {
        /// Target selector
        selector: String,
    },
    /// Press a key on an element
    Press {
        /// Target selector
        selector: String,
        /// Key name, e.g. `Enter`
        key: String,
    },
    /// Issue a GET outside the page
    RequestGet {
        /// Target URL
        url: String,
        /// Name to refer to the response by in `StatusEquals`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },
}

impl Action {
    /// Navigate action
    #[must_use]
    pub fn navigate(url: impl Into<String>) -> Self {
        Self::Navigate { url: url.into() }
    }

    /// Fill action
    #[must_use]
    pub fn fill(selector: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Fill {
            selector: selector.into(),
            value: value.into(),
        }
    }

    /// Click action
    #[must_use]
    pub fn click(selector: impl Into<String>) -> Self {
        Self::Click {
            selector: selector.into(),
        }
    }

    /// Press action
    #[must_use]
    pub fn press(selector: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Press {
            selector: selector.into(),
            key: key.into(),
        }
    }

    /// GET action
    #[must_use]
    pub fn request_get(url: impl Into<String>) -> Self {
        Self::RequestGet {
            url: url.into(),
            alias: None,
        }
    }

    /// Selector this action targets, if any
    #[must_use]
    pub fn selector(&self) -> Option<&str> {
        match self {
            Self::Fill { selector, .. } | Self::Click { selector } | Self::Press { selector, .. } => {
                Some(selector)
            }
            Self::Navigate { .. } | Self::RequestGet { .. } => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigate { url } => write!(f, "navigate({url})"),
            Self::Fill { selector, value } => write!(f, "fill({selector}, {value:?})"),
            Self::Click { selector } => write!(f, "click({selector})"),
            Self::Press { selector, key } => write!(f, "press({selector}, {key})"),
            Self::RequestGet { url, .. } => write!(f, "request.get({url})"),
        }
    }
}

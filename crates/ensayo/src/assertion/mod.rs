//! Assertions over page state.
//!
//! [`Assertion`] is a closed set; [`evaluator::evaluate`] matches on it
//! exhaustively, so adding a kind is a compile-checked change.
//!
//! ## Policies
//!
//! | Assertion      | Policy        | When exhausted                    |
//! |----------------|---------------|-----------------------------------|
//! | `TitleEquals`  | single check  | `Failed`                          |
//! | `StatusEquals` | single check  | `Failed`                          |
//! | `TitleMatches` | poll          | `TimedOut`                        |
//! | `UrlMatches`   | poll          | `TimedOut`                        |
//! | `TextContains` | poll          | `TimedOut`                        |
//! | `Visible`      | poll          | `TimedOut`                        |
//! | `Hidden`       | poll          | `TimedOut`                        |
//! | `CountEquals`  | poll          | `Failed` on overshoot, else `TimedOut` |
//!
//! Polling is optimistic: it stops as soon as the predicate holds.

pub mod evaluator;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::result::{EnsayoError, EnsayoResult};

pub use evaluator::{check, evaluate, Verdict};

/// A compiled pattern for `*Matches` assertions.
///
/// Syntax is that of the `regex` crate. Matching is unanchored: the pattern
/// may match anywhere in the observed string, so `TodoMVC` matches
/// `"React • TodoMVC"`. Use `^`/`$` to anchor, and [`Pattern::literal`] to
/// match text containing metacharacters verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern
    pub fn new(source: &str) -> EnsayoResult<Self> {
        let regex = Regex::new(source).map_err(|e| EnsayoError::InvalidPattern {
            pattern: source.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// Pattern matching `text` verbatim
    pub fn literal(text: &str) -> EnsayoResult<Self> {
        Self::new(&regex::escape(text))
    }

    /// Pattern source
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern matches anywhere in `haystack`
    #[must_use]
    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.source)
    }
}

impl TryFrom<String> for Pattern {
    type Error = EnsayoError;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        Self::new(&source)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.source
    }
}

/// A predicate over page state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Assertion {
    /// Title equals text exactly
    TitleEquals {
        /// Expected title
        text: String,
    },
    /// Title matches pattern
    TitleMatches {
        /// Title pattern
        pattern: Pattern,
    },
    /// First matching element's text contains a substring
    TextContains {
        /// Target selector
        selector: String,
        /// Expected substring
        text: String,
    },
    /// Some matching element is visible
    Visible {
        /// Target selector
        selector: String,
    },
    /// No matching element is visible (absent counts as hidden)
    Hidden {
        /// Target selector
        selector: String,
    },
    /// Current URL matches pattern
    UrlMatches {
        /// URL pattern
        pattern: Pattern,
    },
    /// Exactly `count` elements match
    CountEquals {
        /// Target selector
        selector: String,
        /// Expected number of matches
        count: usize,
    },
    /// A recorded response has the given status
    StatusEquals {
        /// Response alias; the most recent response when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<String>,
        /// Expected status code
        code: u16,
    },
}

impl Assertion {
    /// Exact title
    #[must_use]
    pub fn title_equals(text: impl Into<String>) -> Self {
        Self::TitleEquals { text: text.into() }
    }

    /// Title pattern
    pub fn title_matches(pattern: &str) -> EnsayoResult<Self> {
        Ok(Self::TitleMatches {
            pattern: Pattern::new(pattern)?,
        })
    }

    /// Substring of the first match's text
    #[must_use]
    pub fn text_contains(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self::TextContains {
            selector: selector.into(),
            text: text.into(),
        }
    }

    /// Visible target
    #[must_use]
    pub fn visible(selector: impl Into<String>) -> Self {
        Self::Visible {
            selector: selector.into(),
        }
    }

    /// Hidden or absent target
    #[must_use]
    pub fn hidden(selector: impl Into<String>) -> Self {
        Self::Hidden {
            selector: selector.into(),
        }
    }

    /// URL pattern
    pub fn url_matches(pattern: &str) -> EnsayoResult<Self> {
        Ok(Self::UrlMatches {
            pattern: Pattern::new(pattern)?,
        })
    }

    /// Exact match count
    #[must_use]
    pub fn count_equals(selector: impl Into<String>, count: usize) -> Self {
        Self::CountEquals {
            selector: selector.into(),
            count,
        }
    }

    /// Status of the most recent response
    #[must_use]
    pub const fn status_equals(code: u16) -> Self {
        Self::StatusEquals {
            response: None,
            code,
        }
    }

    /// Status of a named response
    #[must_use]
    pub fn status_of(response: impl Into<String>, code: u16) -> Self {
        Self::StatusEquals {
            response: Some(response.into()),
            code,
        }
    }

    /// Selector this assertion observes, if any
    #[must_use]
    pub fn selector(&self) -> Option<&str> {
        match self {
            Self::TextContains { selector, .. }
            | Self::Visible { selector }
            | Self::Hidden { selector }
            | Self::CountEquals { selector, .. } => Some(selector),
            Self::TitleEquals { .. }
            | Self::TitleMatches { .. }
            | Self::UrlMatches { .. }
            | Self::StatusEquals { .. } => None,
        }
    }

    /// Whether the assertion retries until its deadline
    #[must_use]
    pub const fn polls(&self) -> bool {
        !matches!(self, Self::TitleEquals { .. } | Self::StatusEquals { .. })
    }

    /// Expected value, as shown in failure reports
    #[must_use]
    pub fn expected(&self) -> String {
        match self {
            Self::TitleEquals { text } => text.clone(),
            Self::TitleMatches { pattern } | Self::UrlMatches { pattern } => pattern.to_string(),
            Self::TextContains { text, .. } => text.clone(),
            Self::Visible { .. } => "visible".to_string(),
            Self::Hidden { .. } => "hidden".to_string(),
            Self::CountEquals { count, .. } => count.to_string(),
            Self::StatusEquals { code, .. } => code.to_string(),
        }
    }
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TitleEquals { text } => write!(f, "expect(page).toHaveTitle({text:?})"),
            Self::TitleMatches { pattern } => write!(f, "expect(page).toHaveTitle({pattern})"),
            Self::TextContains { selector, text } => {
                write!(f, "expect(locator('{selector}')).toContainText({text:?})")
            }
            Self::Visible { selector } => write!(f, "expect(locator('{selector}')).toBeVisible()"),
            Self::Hidden { selector } => write!(f, "expect(locator('{selector}')).toBeHidden()"),
            Self::UrlMatches { pattern } => write!(f, "expect(page).toHaveURL({pattern})"),
            Self::CountEquals { selector, count } => {
                write!(f, "expect(locator('{selector}')).toHaveCount({count})")
            }
            Self::StatusEquals { response, code } => write!(
                f,
                "expect({}.status()).toBe({code})",
                response.as_deref().unwrap_or("response")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod pattern_tests {
        use super::*;

        #[test]
        fn test_unanchored_match() {
            let p = Pattern::new("TodoMVC").unwrap();
            assert!(p.is_match("React • TodoMVC"));
            assert!(!p.is_match("Login - MyApp"));
        }

        #[test]
        fn test_url_pattern_from_fixture() {
            let p = Pattern::new(".*settings").unwrap();
            assert!(p.is_match("https://demo.playwright.dev/settings"));
            assert!(!p.is_match("https://demo.playwright.dev/todomvc"));
        }

        #[test]
        fn test_literal_escapes_metacharacters() {
            let p = Pattern::literal("a[href=\"/settings\"]").unwrap();
            assert!(p.is_match("link a[href=\"/settings\"] here"));
            assert!(!p.is_match("ahref=/settings"));
        }

        #[test]
        fn test_invalid_pattern_rejected() {
            let err = Pattern::new("(unclosed").unwrap_err();
            assert!(matches!(err, EnsayoError::InvalidPattern { .. }));
        }

        #[test]
        fn test_serde_as_string() {
            let a = Assertion::title_matches("TodoMVC").unwrap();
            let json = serde_json::to_string(&a).unwrap();
            assert_eq!(json, r#"{"type":"title_matches","pattern":"TodoMVC"}"#);
            let back: Assertion = serde_json::from_str(&json).unwrap();
            assert_eq!(back, a);
            assert!(serde_json::from_str::<Assertion>(r#"{"type":"url_matches","pattern":"("}"#).is_err());
        }
    }

    mod assertion_tests {
        use super::*;

        #[test]
        fn test_policies() {
            assert!(!Assertion::title_equals("x").polls());
            assert!(!Assertion::status_equals(200).polls());
            assert!(Assertion::visible("#email-input").polls());
            assert!(Assertion::count_equals(".todo-list li", 1).polls());
        }

        #[test]
        fn test_display_reads_like_playwright() {
            assert_eq!(
                Assertion::title_equals("Login - MyApp").to_string(),
                "expect(page).toHaveTitle(\"Login - MyApp\")"
            );
            assert_eq!(
                Assertion::url_matches(".*settings").unwrap().to_string(),
                "expect(page).toHaveURL(/.*settings/)"
            );
            assert_eq!(
                Assertion::status_of("user", 200).to_string(),
                "expect(user.status()).toBe(200)"
            );
        }

        #[test]
        fn test_selector_and_expected() {
            let a = Assertion::text_contains("h1", "Welcome, User!");
            assert_eq!(a.selector(), Some("h1"));
            assert_eq!(a.expected(), "Welcome, User!");
            assert_eq!(Assertion::title_equals("t").selector(), None);
        }
    }
}

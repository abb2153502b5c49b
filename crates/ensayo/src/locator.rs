//! Locator abstraction for element selection.
//!
//! # Design Philosophy
//!
//! - **Lazy**: a locator is just a selector plus the session it belongs to;
//!   nothing is queried until it is asked to.
//! - **Uncached**: every call observes the page again, since the page may have
//!   changed in between.
//! - **Non-throwing absence**: resolution reports "nothing matched" as a value,
//!   so callers decide whether absence is itself what they expected.

use std::time::Duration;
use thiserror::Error;

use crate::driver::{DriverError, ElementHandle};
use crate::session::PageSession;
use crate::wait::{poll_until, Poll, WaitOptions, WaitOutcome};

/// Why a locator did not resolve
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    /// No element matched before the deadline
    #[error("locator({selector}) resolved to no elements after {}ms", .waited.as_millis())]
    NotFound {
        /// Selector
        selector: String,
        /// Time spent waiting
        waited: Duration,
    },

    /// The page could not be queried at all
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// A selector bound to a page session
#[derive(Debug, Clone, Copy)]
pub struct Locator<'a> {
    session: &'a PageSession,
    selector: &'a str,
}

impl<'a> Locator<'a> {
    pub(crate) const fn new(session: &'a PageSession, selector: &'a str) -> Self {
        Self { session, selector }
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &str {
        self.selector
    }

    /// Observe all matching elements once
    pub async fn all(&self) -> Result<Vec<ElementHandle>, LocateError> {
        if self.selector.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.session.query(self.selector).await?)
    }

    /// Observe the number of matching elements once
    pub async fn count(&self) -> Result<usize, LocateError> {
        Ok(self.all().await?.len())
    }

    /// Whether any matching element is visible right now
    pub async fn is_visible(&self) -> Result<bool, LocateError> {
        Ok(self.all().await?.iter().any(|el| el.visible))
    }

    /// Text of the first matching element right now
    pub async fn first_text(&self) -> Result<Option<String>, LocateError> {
        Ok(self.all().await?.into_iter().next().map(|el| el.text))
    }

    /// Poll until at least one element matches or `timeout` elapses.
    ///
    /// A zero timeout checks once. An empty selector never matches.
    pub async fn resolve(&self, timeout: Duration) -> Result<Vec<ElementHandle>, LocateError> {
        if self.selector.is_empty() {
            return Err(LocateError::NotFound {
                selector: String::new(),
                waited: Duration::ZERO,
            });
        }

        let options = WaitOptions::new(timeout).with_poll_interval(self.session.poll_interval());
        let session = self.session;
        let selector = self.selector;
        let outcome = poll_until(options, || async move {
            match session.query(selector).await {
                Ok(found) if !found.is_empty() => Poll::Ready(found),
                Ok(_) => Poll::Pending(None),
                Err(err) => Poll::Fail(Some(err)),
            }
        })
        .await;

        match outcome {
            WaitOutcome::Ready(found) => Ok(found),
            WaitOutcome::Failed(err) => Err(err.map_or_else(
                || LocateError::NotFound {
                    selector: selector.to_string(),
                    waited: Duration::ZERO,
                },
                LocateError::Driver,
            )),
            WaitOutcome::TimedOut { elapsed, .. } => Err(LocateError::NotFound {
                selector: selector.to_string(),
                waited: elapsed,
            }),
        }
    }
}

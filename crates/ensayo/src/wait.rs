//! Bounded polling.
//!
//! Every wait in Ensayo (locator resolution, condition assertions) is a loop
//! of "observe, decide, sleep" against a [`Deadline`]. Time comes from
//! `tokio::time`, so a paused runtime (`#[tokio::test(start_paused = true)]`)
//! drives the same loops on a virtual clock.

use std::time::Duration;
use tokio::time::Instant;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Options for a polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Total time budget
    pub timeout: Duration,
    /// Interval between observations
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl WaitOptions {
    /// Create options with a timeout and the default interval
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Set polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// A point in time after which a wait gives up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    started: Instant,
    at: Instant,
}

impl Deadline {
    /// Deadline `timeout` from now
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            at: started + timeout,
        }
    }

    /// Whether the deadline has passed
    #[must_use]
    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Time left, zero once expired
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    /// Time since the wait started
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// What one observation decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll<T, E> {
    /// Condition met, stop with a value
    Ready(T),
    /// Condition definitively failed, stop without waiting further
    Fail(E),
    /// Not yet; keep the latest observation for the timeout report
    Pending(E),
}

/// Result of a polling loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome<T, E> {
    /// Observation returned `Ready`
    Ready(T),
    /// Observation returned `Fail`
    Failed(E),
    /// Deadline passed while pending; carries the last observation
    TimedOut {
        /// Time spent waiting
        elapsed: Duration,
        /// Last pending observation
        last: E,
    },
}

/// Observe until ready, failed, or the deadline passes.
///
/// The first observation always happens, so a zero timeout means "check
/// once". Sleeps never overshoot the deadline: the final observation happens
/// exactly when it expires.
pub async fn poll_until<T, E, F, Fut>(options: WaitOptions, mut observe: F) -> WaitOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Poll<T, E>>,
{
    let deadline = Deadline::after(options.timeout);
    loop {
        match observe().await {
            Poll::Ready(value) => return WaitOutcome::Ready(value),
            Poll::Fail(err) => return WaitOutcome::Failed(err),
            Poll::Pending(last) => {
                if deadline.expired() {
                    return WaitOutcome::TimedOut {
                        elapsed: deadline.elapsed(),
                        last,
                    };
                }
                tokio::time::sleep(options.poll_interval.min(deadline.remaining())).await;
            }
        }
    }
}

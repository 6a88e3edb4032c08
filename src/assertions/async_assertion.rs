//! Polling assertions.
//!
//! An [`AsyncAssertion`] is built by [`Harness::eventually`] or
//! [`Harness::consistently`], configured through its fluent setters and
//! consumed by one terminal call.
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//! use testkit_eventually::{matcher::gte, Actual, Harness, PanicFailHandler};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let harness = Harness::new(PanicFailHandler);
//! let counter = AtomicU32::new(0);
//!
//! let held = harness
//!     .eventually(Actual::from_fn(|| counter.fetch_add(1, Ordering::SeqCst)))
//!     .within(Duration::from_secs(1))
//!     .probe_every(Duration::from_millis(1))
//!     .should(gte(3))
//!     .await;
//! assert!(held);
//! # }
//! ```

use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::actual::{Actual, Resolver};
use crate::error::ConfigError;
use crate::harness::Harness;
use crate::matcher::Matcher;
use crate::polling::{LoopState, Mode, PollConfig, PollingLoop, ProgressReporter};
use crate::report::{Description, Failure};

/// A configured, not yet run, polling assertion.
///
/// Setters may be called in any order; the last write wins. Invalid values
/// are remembered and reported by the terminal call before any sampling.
#[must_use = "an assertion does nothing until should() or should_not() is awaited"]
pub struct AsyncAssertion<'a, T> {
    harness: Harness,
    mode: Mode,
    actual: Actual<'a, T>,
    timeout: Result<Duration, ConfigError>,
    polling: Result<Duration, ConfigError>,
    repeats: Result<usize, ConfigError>,
    context: Option<CancellationToken>,
    offset: usize,
    location: &'static Location<'static>,
    progress: ProgressReporter<'a>,
}

impl<'a, T> AsyncAssertion<'a, T> {
    pub(crate) fn new(
        harness: Harness,
        mode: Mode,
        actual: Actual<'a, T>,
        location: &'static Location<'static>,
    ) -> Self {
        let defaults = *harness.defaults();
        Self {
            harness,
            mode,
            actual,
            timeout: positive_timeout(mode, defaults.timeout(mode)),
            polling: positive_polling(mode, defaults.polling(mode)),
            repeats: Ok(1),
            context: None,
            offset: 0,
            location,
            progress: ProgressReporter::new(),
        }
    }

    /// Set the timeout (`eventually`) or duration (`consistently`).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = positive_timeout(self.mode, timeout);
        self
    }

    /// Alias for [`with_timeout`](Self::with_timeout).
    pub fn within(self, timeout: Duration) -> Self {
        self.with_timeout(timeout)
    }

    /// Set the interval between samples.
    pub fn with_polling(mut self, interval: Duration) -> Self {
        self.polling = positive_polling(self.mode, interval);
        self
    }

    /// Alias for [`with_polling`](Self::with_polling).
    pub fn probe_every(self, interval: Duration) -> Self {
        self.with_polling(interval)
    }

    /// Stop waiting once `token` is cancelled.
    ///
    /// Cancellation is a failure in both modes. The token is also handed to
    /// [`Actual::checked_with_context`] producers.
    pub fn with_context(mut self, token: CancellationToken) -> Self {
        self.context = Some(token);
        self
    }

    /// Add extra frames to the caller skip reported with a failure.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Require `count` consecutive passing samples. `eventually` only.
    pub fn must_pass_repeatedly(mut self, count: usize) -> Self {
        self.repeats = match (self.mode, count) {
            (Mode::Consistently, _) => Err(ConfigError::RepeatedPassesWithConsistently),
            (Mode::Eventually, 0) => Err(ConfigError::InvalidRepeatCount { count }),
            (Mode::Eventually, count) => Ok(count),
        };
        self
    }

    /// A handle describing this assertion while it runs.
    pub fn progress_reporter(&self) -> ProgressReporter<'a> {
        self.progress.clone()
    }

    /// The mode this assertion runs in.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Assert that the actual matches.
    ///
    /// Returns `true` if the assertion held. Otherwise the failure has
    /// already been handed to the harness's fail handler.
    ///
    /// # Panics
    ///
    /// Panics if the harness has no fail handler.
    pub async fn should<M>(self, matcher: M) -> bool
    where
        M: Matcher<T> + Send + Sync + 'a,
        T: Send + 'a,
    {
        self.run(matcher, true, Description::default()).await
    }

    /// Assert that the actual does not match.
    ///
    /// # Panics
    ///
    /// Panics if the harness has no fail handler.
    pub async fn should_not<M>(self, matcher: M) -> bool
    where
        M: Matcher<T> + Send + Sync + 'a,
        T: Send + 'a,
    {
        self.run(matcher, false, Description::default()).await
    }

    /// Like [`should`](Self::should), printing `description` above the failure.
    ///
    /// # Panics
    ///
    /// Panics if the harness has no fail handler.
    pub async fn should_with<M>(self, matcher: M, description: impl Into<Description>) -> bool
    where
        M: Matcher<T> + Send + Sync + 'a,
        T: Send + 'a,
    {
        self.run(matcher, true, description.into()).await
    }

    /// Like [`should_not`](Self::should_not), printing `description` above the failure.
    ///
    /// # Panics
    ///
    /// Panics if the harness has no fail handler.
    pub async fn should_not_with<M>(self, matcher: M, description: impl Into<Description>) -> bool
    where
        M: Matcher<T> + Send + Sync + 'a,
        T: Send + 'a,
    {
        self.run(matcher, false, description.into()).await
    }

    async fn run<M>(self, matcher: M, desired: bool, description: Description) -> bool
    where
        M: Matcher<T> + Send + Sync + 'a,
        T: Send + 'a,
    {
        let handler = self.harness.handler();
        let offset = self.offset;
        let location = self.location;
        let mode = self.mode;
        let progress = self.progress.clone();
        let state = Arc::new(LoopState::new(mode, desired, matcher, description, self.harness.time()));

        let outcome = match self.validate() {
            Ok((config, resolver)) => {
                let _installed = progress.install(state.clone());
                PollingLoop::new(&config, &state, resolver).run().await
            }
            Err(err) => Err(err),
        };

        match outcome {
            Ok(()) => true,
            Err(err) => {
                if err.is_config() {
                    warn!(%mode, error = %err, "invalid assertion configuration");
                }
                handler.fail(&Failure::new(state.failure_message(&err), offset, location));
                false
            }
        }
    }

    fn validate(self) -> crate::Result<(PollConfig, Resolver<'a, T>)> {
        let timeout = self.timeout?;
        let polling = self.polling?;
        let must_pass_repeatedly = self.repeats?;
        let resolver = self.actual.into_resolver(self.mode, self.context.as_ref())?;
        let config = PollConfig {
            mode: self.mode,
            timeout,
            polling,
            context: self.context,
            must_pass_repeatedly,
        };
        Ok((config, resolver))
    }
}

fn positive_timeout(mode: Mode, duration: Duration) -> Result<Duration, ConfigError> {
    if duration.is_zero() {
        Err(ConfigError::NonPositiveTimeout { mode, duration })
    } else {
        Ok(duration)
    }
}

fn positive_polling(mode: Mode, duration: Duration) -> Result<Duration, ConfigError> {
    if duration.is_zero() {
        Err(ConfigError::NonPositivePolling { mode, duration })
    } else {
        Ok(duration)
    }
}

impl<T> fmt::Debug for AsyncAssertion<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncAssertion")
            .field("mode", &self.mode)
            .field("actual", &self.actual)
            .field("timeout", &self.timeout)
            .field("polling", &self.polling)
            .field("repeats", &self.repeats)
            .field("context", &self.context.is_some())
            .field("offset", &self.offset)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

//! The assertion context.
//!
//! A [`Harness`] carries everything an assertion needs from its
//! surroundings: where failures go, the default time budgets, and the time
//! source the polling loop runs on. It is cheap to clone.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use testkit_eventually::{Defaults, Harness, PanicFailHandler};
//!
//! let harness = Harness::new(PanicFailHandler).with_defaults(
//!     Defaults::new()
//!         .eventually_timeout(Duration::from_secs(5))
//!         .polling_interval(Duration::from_millis(50)),
//! );
//! assert_eq!(harness.defaults().eventually_timeout, Duration::from_secs(5));
//! ```

use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use crate::assertions::{Actual, AsyncAssertion, Expectation};
use crate::error::ConfigError;
use crate::polling::Mode;
use crate::report::FailHandler;
use crate::runtime::{TimeSource, TokioTime};

/// Default time budgets for new assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaults {
    /// How long `eventually` keeps trying.
    pub eventually_timeout: Duration,
    /// Poll interval for `eventually`.
    pub eventually_polling: Duration,
    /// How long `consistently` keeps verifying.
    pub consistently_duration: Duration,
    /// Poll interval for `consistently`.
    pub consistently_polling: Duration,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            eventually_timeout: Duration::from_secs(1),
            eventually_polling: Duration::from_millis(10),
            consistently_duration: Duration::from_millis(100),
            consistently_polling: Duration::from_millis(10),
        }
    }
}

impl Defaults {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `eventually` timeout.
    #[must_use]
    pub fn eventually_timeout(mut self, timeout: Duration) -> Self {
        self.eventually_timeout = timeout;
        self
    }

    /// Set the `eventually` poll interval.
    #[must_use]
    pub fn eventually_polling(mut self, interval: Duration) -> Self {
        self.eventually_polling = interval;
        self
    }

    /// Set the `consistently` duration.
    #[must_use]
    pub fn consistently_duration(mut self, duration: Duration) -> Self {
        self.consistently_duration = duration;
        self
    }

    /// Set the `consistently` poll interval.
    #[must_use]
    pub fn consistently_polling(mut self, interval: Duration) -> Self {
        self.consistently_polling = interval;
        self
    }

    /// Set the poll interval for both modes.
    #[must_use]
    pub fn polling_interval(self, interval: Duration) -> Self {
        self.eventually_polling(interval).consistently_polling(interval)
    }

    pub(crate) fn timeout(&self, mode: Mode) -> Duration {
        match mode {
            Mode::Eventually => self.eventually_timeout,
            Mode::Consistently => self.consistently_duration,
        }
    }

    pub(crate) fn polling(&self, mode: Mode) -> Duration {
        match mode {
            Mode::Eventually => self.eventually_polling,
            Mode::Consistently => self.consistently_polling,
        }
    }
}

/// Builds assertions and receives their failures.
///
/// `Harness::default()` has no fail handler. Assertions made through it
/// panic with [`ConfigError::MissingFailHandler`] before sampling anything.
#[derive(Clone)]
pub struct Harness {
    handler: Option<Arc<dyn FailHandler>>,
    defaults: Defaults,
    time: Arc<dyn TimeSource>,
}

impl Harness {
    /// Create a harness reporting to `handler`.
    pub fn new(handler: impl FailHandler + 'static) -> Self {
        Self {
            handler: Some(Arc::new(handler)),
            ..Self::default()
        }
    }

    /// Replace the default time budgets.
    #[must_use]
    pub fn with_defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Run polling loops on a different time source.
    #[must_use]
    pub fn with_time_source(mut self, time: impl TimeSource + 'static) -> Self {
        self.time = Arc::new(time);
        self
    }

    /// The default time budgets.
    #[must_use]
    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Returns `true` if a fail handler is installed.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.handler.is_some()
    }

    /// Start an assertion that `actual` eventually matches.
    ///
    /// Nothing is sampled until the assertion is awaited through
    /// [`should`](AsyncAssertion::should) or a sibling.
    #[track_caller]
    pub fn eventually<'a, T>(&self, actual: Actual<'a, T>) -> AsyncAssertion<'a, T> {
        AsyncAssertion::new(self.clone(), Mode::Eventually, actual, Location::caller())
    }

    /// Start an assertion that `actual` keeps matching.
    #[track_caller]
    pub fn consistently<'a, T>(&self, actual: Actual<'a, T>) -> AsyncAssertion<'a, T> {
        AsyncAssertion::new(self.clone(), Mode::Consistently, actual, Location::caller())
    }

    /// Start a synchronous assertion on `actual`.
    #[track_caller]
    pub fn expect<V>(&self, actual: V) -> Expectation<'_, V> {
        Expectation::new(self, actual, Location::caller())
    }

    /// The fail handler.
    ///
    /// # Panics
    ///
    /// Panics with [`ConfigError::MissingFailHandler`] when none is installed.
    pub(crate) fn handler(&self) -> Arc<dyn FailHandler> {
        match &self.handler {
            Some(handler) => Arc::clone(handler),
            None => panic!("{}", ConfigError::MissingFailHandler),
        }
    }

    pub(crate) fn time(&self) -> Arc<dyn TimeSource> {
        Arc::clone(&self.time)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            handler: None,
            defaults: Defaults::default(),
            time: Arc::new(TokioTime::new()),
        }
    }
}

impl fmt::Debug for Harness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harness")
            .field("configured", &self.is_configured())
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

//! State shared between a running polling loop and its progress reporter.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{Mode, SampleError};
use crate::error::Error;
use crate::matcher::Matcher;
use crate::report::{self, Description};
use crate::runtime::TimeSource;

/// The most recently completed sample.
#[derive(Debug)]
pub(crate) struct SampleResult<T> {
    pub(crate) value: Option<T>,
    pub(crate) error: Option<SampleError>,
    /// Time since the loop started.
    pub(crate) captured_at: Duration,
}

struct Shared<T> {
    latest: Option<SampleResult<T>>,
    samples: usize,
    interval_override: Option<Duration>,
}

/// Everything one assertion run needs to judge samples and explain itself.
pub(crate) struct LoopState<T, M> {
    mode: Mode,
    desired: bool,
    matcher: M,
    description: Description,
    time: Arc<dyn TimeSource>,
    started: Duration,
    shared: Mutex<Shared<T>>,
}

impl<T, M> LoopState<T, M>
where
    M: Matcher<T>,
{
    pub(crate) fn new(
        mode: Mode,
        desired: bool,
        matcher: M,
        description: Description,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        let started = time.now();
        Self {
            mode,
            desired,
            matcher,
            description,
            time,
            started,
            shared: Mutex::new(Shared {
                latest: None,
                samples: 0,
                interval_override: None,
            }),
        }
    }

    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }

    pub(crate) fn desired(&self) -> bool {
        self.desired
    }

    pub(crate) fn matcher(&self) -> &M {
        &self.matcher
    }

    pub(crate) fn time(&self) -> &dyn TimeSource {
        self.time.as_ref()
    }

    pub(crate) fn started(&self) -> Duration {
        self.started
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.time.now().saturating_sub(self.started)
    }

    pub(crate) fn samples(&self) -> usize {
        self.shared.lock().samples
    }

    /// Publish a completed sample and return its 1-based number.
    ///
    /// `interval_override` replaces any pending override; it is consumed by
    /// the next wait.
    pub(crate) fn record(
        &self,
        value: Option<T>,
        error: Option<SampleError>,
        interval_override: Option<Duration>,
    ) -> usize {
        let captured_at = self.elapsed();
        let mut shared = self.shared.lock();
        shared.samples += 1;
        shared.interval_override = interval_override;
        shared.latest = Some(SampleResult {
            value,
            error,
            captured_at,
        });
        shared.samples
    }

    pub(crate) fn take_interval_override(&self) -> Option<Duration> {
        self.shared.lock().interval_override.take()
    }

    /// Full failure text for a terminal error.
    pub(crate) fn failure_message(&self, error: &Error) -> String {
        if let Error::Config(config) = error {
            return config.to_string();
        }
        report::compose(error, &self.description, &self.detail())
    }

    fn detail(&self) -> String {
        let shared = self.shared.lock();
        shared
            .latest
            .as_ref()
            .map(|sample| report::sample_detail(self.mode, self.desired, &self.matcher, sample))
            .unwrap_or_default()
    }

    fn snapshot(&self) -> String {
        let header = format!(
            "{} has been polling for {:?} ({} samples).",
            self.mode,
            self.elapsed(),
            self.samples()
        );
        report::compose(&header, &self.description, &self.detail())
    }
}

pub(crate) trait ProgressSource: Send + Sync {
    fn snapshot(&self) -> String;
}

impl<T, M> ProgressSource for LoopState<T, M>
where
    T: Send,
    M: Matcher<T> + Send + Sync,
{
    fn snapshot(&self) -> String {
        LoopState::snapshot(self)
    }
}

/// Mid-flight view of a running assertion.
///
/// Obtained from [`AsyncAssertion::progress_reporter`](crate::AsyncAssertion::progress_reporter)
/// before the assertion is awaited. While the polling loop runs,
/// [`report`](Self::report) describes the latest completed sample using the
/// same text a failure would carry. Before the loop starts and after it
/// finishes, there is nothing to report.
///
/// ```rust
/// use testkit_eventually::{matcher::eq, Actual, Harness, RecordingFailHandler};
///
/// let harness = Harness::new(RecordingFailHandler::new());
/// let assertion = harness.eventually(Actual::value(1));
/// let reporter = assertion.progress_reporter();
/// assert_eq!(reporter.report(), None);
/// # drop(assertion);
/// ```
#[derive(Clone, Default)]
pub struct ProgressReporter<'a> {
    slot: Arc<Mutex<Option<Arc<dyn ProgressSource + 'a>>>>,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Describe the running assertion, or `None` if it is not running.
    #[must_use]
    pub fn report(&self) -> Option<String> {
        let source = self.slot.lock().clone();
        source.map(|source| source.snapshot())
    }

    /// Returns `true` while the assertion is polling.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Publish `source` until the returned guard is dropped.
    pub(crate) fn install(&self, source: Arc<dyn ProgressSource + 'a>) -> Installed<'_, 'a> {
        *self.slot.lock() = Some(source);
        Installed { reporter: self }
    }

    fn clear(&self) {
        self.slot.lock().take();
    }
}

/// Keeps a loop visible through its [`ProgressReporter`].
///
/// Dropping it, including when the assertion future is abandoned mid-flight,
/// releases the loop state.
#[must_use]
pub(crate) struct Installed<'r, 'a> {
    reporter: &'r ProgressReporter<'a>,
}

impl Drop for Installed<'_, '_> {
    fn drop(&mut self) {
        self.reporter.clear();
    }
}

impl fmt::Debug for ProgressReporter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("running", &self.is_running())
            .finish()
    }
}

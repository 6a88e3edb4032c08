//! Fail handlers shipped with the crate.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::Failure;

/// Receives every failed assertion.
///
/// Any `Fn(&Failure) + Send + Sync` closure is a fail handler.
///
/// ```rust
/// use testkit_eventually::{Failure, Harness};
///
/// let harness = Harness::new(|failure: &Failure| eprintln!("{}", failure.message));
/// # let _ = harness;
/// ```
pub trait FailHandler: Send + Sync {
    /// Report one failure.
    fn fail(&self, failure: &Failure);
}

impl<F> FailHandler for F
where
    F: Fn(&Failure) + Send + Sync,
{
    fn fail(&self, failure: &Failure) {
        self(failure);
    }
}

/// Panics with the failure location and message.
///
/// This is the handler installed by `#[testkit_eventually::test]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicFailHandler;

impl FailHandler for PanicFailHandler {
    fn fail(&self, failure: &Failure) {
        panic!("{}: {}", failure.location, failure.message);
    }
}

/// Records failures instead of panicking.
///
/// Clones share the same record, so one clone can be handed to a
/// [`Harness`](crate::Harness) and another kept for inspection.
///
/// # Example
///
/// ```rust
/// use testkit_eventually::{matcher::eq, Harness, RecordingFailHandler};
///
/// let recorder = RecordingFailHandler::new();
/// let harness = Harness::new(recorder.clone());
///
/// harness.expect(1).to(eq(2));
///
/// assert_eq!(recorder.len(), 1);
/// assert_eq!(recorder.last().unwrap().message, "expected 1 to equal 2");
/// ```
#[derive(Clone, Default)]
pub struct RecordingFailHandler {
    failures: Arc<Mutex<Vec<Failure>>>,
}

impl RecordingFailHandler {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded failures, oldest first.
    #[must_use]
    pub fn failures(&self) -> Vec<Failure> {
        self.failures.lock().clone()
    }

    /// The most recent failure.
    #[must_use]
    pub fn last(&self) -> Option<Failure> {
        self.failures.lock().last().cloned()
    }

    /// Number of recorded failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.lock().len()
    }

    /// Returns `true` if nothing has failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.lock().is_empty()
    }

    /// Forget all recorded failures.
    pub fn clear(&self) {
        self.failures.lock().clear();
    }
}

impl FailHandler for RecordingFailHandler {
    fn fail(&self, failure: &Failure) {
        self.failures.lock().push(failure.clone());
    }
}

impl fmt::Debug for RecordingFailHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingFailHandler")
            .field("failures", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::Location;

    fn failure(message: &str) -> Failure {
        Failure::new(message.to_string(), 0, Location::caller())
    }

    #[test]
    fn test_recording_handler_shares_record() {
        let recorder = RecordingFailHandler::new();
        let view = recorder.clone();

        recorder.fail(&failure("first"));
        recorder.fail(&failure("second"));

        assert_eq!(view.len(), 2);
        assert_eq!(view.failures()[0].message, "first");
        assert_eq!(view.last().unwrap().message, "second");

        view.clear();
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_closure_is_a_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = move |failure: &Failure| sink.lock().push(failure.message.clone());

        handler.fail(&failure("from closure"));
        assert_eq!(*seen.lock(), vec!["from closure".to_string()]);
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn test_panic_handler_panics() {
        PanicFailHandler.fail(&failure("boom"));
    }
}

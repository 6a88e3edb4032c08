//! Synchronous assertions.
//!
//! [`Expectation`] is the one-shot assertion made through
//! [`Harness::expect`](crate::Harness::expect); it reports straight to the
//! fail handler. [`Checker`] is the nested-assertion helper handed to
//! [`Actual::checked`](crate::Actual::checked) producers; it records the
//! first failure of the current sample instead, and hands back a [`Stop`]
//! token so the producer can bail out with `?`.

use std::cell::RefCell;
use std::panic::Location;

use thiserror::Error;

use crate::harness::Harness;
use crate::matcher::Matcher;
use crate::polling::SampleError;
use crate::report::Failure;

/// Judge one value against a matcher, returning the failure text on mismatch.
pub(crate) fn judge<V, M>(actual: &V, matcher: &M, desired: bool) -> Result<(), String>
where
    V: ?Sized,
    M: Matcher<V> + ?Sized,
{
    match matcher.matches(actual) {
        Ok(matched) if matched == desired => Ok(()),
        Ok(_) if desired => Err(matcher.failure_message(actual)),
        Ok(_) => Err(matcher.negated_failure_message(actual)),
        Err(err) => Err(format!(
            "The matcher returned the following error:\n    {err:#}"
        )),
    }
}

/// A synchronous assertion reporting to the harness's fail handler.
///
/// ```rust
/// use testkit_eventually::{matcher::eq, Harness, RecordingFailHandler};
///
/// let recorder = RecordingFailHandler::new();
/// let harness = Harness::new(recorder.clone());
///
/// assert!(harness.expect(4).to(eq(4)));
/// assert!(!harness.expect(4).not_to(eq(4)));
/// assert_eq!(recorder.len(), 1);
/// ```
#[must_use = "an expectation does nothing until to() or not_to() is called"]
pub struct Expectation<'h, V> {
    harness: &'h Harness,
    actual: V,
    offset: usize,
    location: &'static Location<'static>,
}

impl<'h, V> Expectation<'h, V> {
    pub(crate) fn new(
        harness: &'h Harness,
        actual: V,
        location: &'static Location<'static>,
    ) -> Self {
        Self {
            harness,
            actual,
            offset: 0,
            location,
        }
    }

    /// Add extra frames to the caller skip reported with a failure.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Assert that the value matches.
    pub fn to<M: Matcher<V>>(self, matcher: M) -> bool {
        self.judge(&matcher, true)
    }

    /// Assert that the value does not match.
    pub fn not_to<M: Matcher<V>>(self, matcher: M) -> bool {
        self.judge(&matcher, false)
    }

    fn judge<M: Matcher<V>>(self, matcher: &M, desired: bool) -> bool {
        let handler = self.harness.handler();
        match judge(&self.actual, matcher, desired) {
            Ok(()) => true,
            Err(message) => {
                handler.fail(&Failure::new(message, self.offset, self.location));
                false
            }
        }
    }
}

/// A failure recorded by a [`Checker`] during one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedFailure {
    /// The failure text.
    pub message: String,
    /// Where the failing nested assertion was made.
    pub location: &'static Location<'static>,
}

/// Returned by a failing [`Checker`] assertion.
///
/// Only this crate can create a `Stop`, so it is never confused with an
/// error raised by user code. Propagate it with `?`; the failure itself is
/// already recorded on the checker.
#[derive(Error, Debug)]
#[error("nested assertion failed")]
pub struct Stop {
    _private: (),
}

/// Nested-assertion helper handed to [`Actual::checked`](crate::Actual::checked)
/// producers.
///
/// A fresh checker is built for every sample. The first failing assertion
/// is recorded and fails the sample; later ones only return [`Stop`].
///
/// ```rust
/// use testkit_eventually::{matcher::{gt, lt}, Actual};
///
/// let actual = Actual::checked(|g| {
///     let reading = 7;
///     g.expect(reading).to(gt(0))?;
///     g.expect(reading).to(lt(10))?;
///     Ok(reading)
/// });
/// # let _ = actual;
/// ```
#[derive(Debug, Default)]
pub struct Checker {
    failure: RefCell<Option<NestedFailure>>,
}

impl Checker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Start an assertion on `actual`.
    #[track_caller]
    pub fn expect<V>(&self, actual: V) -> Check<'_, V> {
        Check {
            checker: self,
            actual,
            location: Location::caller(),
        }
    }

    /// Record a failure directly.
    #[track_caller]
    pub fn fail(&self, message: impl Into<String>) -> Stop {
        self.record(message.into(), Location::caller())
    }

    /// Returns `true` once any assertion on this checker has failed.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.failure.borrow().is_some()
    }

    fn record(&self, message: String, location: &'static Location<'static>) -> Stop {
        let mut failure = self.failure.borrow_mut();
        if failure.is_none() {
            *failure = Some(NestedFailure { message, location });
        }
        Stop { _private: () }
    }

    /// Fold the producer's result with whatever the checker recorded.
    ///
    /// A recorded failure wins over the producer's own result. A [`Stop`]
    /// never leaves this function as anything but [`SampleError::Nested`].
    pub(crate) fn settle<T>(self, result: anyhow::Result<T>) -> Result<T, SampleError> {
        if let Some(failure) = self.failure.into_inner() {
            return Err(SampleError::Nested(failure));
        }
        result.map_err(SampleError::Producer)
    }
}

/// An assertion started with [`Checker::expect`].
#[must_use = "a check does nothing until to() or not_to() is called"]
pub struct Check<'c, V> {
    checker: &'c Checker,
    actual: V,
    location: &'static Location<'static>,
}

impl<V> Check<'_, V> {
    /// Assert that the value matches.
    ///
    /// # Errors
    ///
    /// Returns [`Stop`] after recording the failure on the checker.
    pub fn to<M: Matcher<V>>(self, matcher: M) -> Result<(), Stop> {
        self.judge(&matcher, true)
    }

    /// Assert that the value does not match.
    ///
    /// # Errors
    ///
    /// Returns [`Stop`] after recording the failure on the checker.
    pub fn not_to<M: Matcher<V>>(self, matcher: M) -> Result<(), Stop> {
        self.judge(&matcher, false)
    }

    fn judge<M: Matcher<V>>(self, matcher: &M, desired: bool) -> Result<(), Stop> {
        judge(&self.actual, matcher, desired)
            .map_err(|message| self.checker.record(message, self.location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{eq, gt, try_satisfies};
    use crate::report::RecordingFailHandler;

    #[test]
    fn test_judge_messages() {
        assert_eq!(judge(&1, &eq(1), true), Ok(()));
        assert_eq!(
            judge(&1, &eq(2), true),
            Err("expected 1 to equal 2".to_string())
        );
        assert_eq!(
            judge(&1, &eq(1), false),
            Err("expected 1 not to equal 1".to_string())
        );
        let erroring = try_satisfies(|_: &i32| anyhow::bail!("broken"), "never");
        assert_eq!(
            judge(&1, &erroring, true),
            Err("The matcher returned the following error:\n    broken".to_string())
        );
    }

    #[test]
    fn test_checker_keeps_first_failure() {
        let checker = Checker::new();
        assert!(checker.expect(3).to(gt(1)).is_ok());
        assert!(!checker.failed());

        let first_line = line!() + 1;
        assert!(checker.expect(3).to(eq(4)).is_err());
        assert!(checker.expect(3).to(eq(5)).is_err());
        assert!(checker.failed());

        match checker.settle(Ok(())) {
            Err(SampleError::Nested(failure)) => {
                assert_eq!(failure.message, "expected 3 to equal 4");
                assert_eq!(failure.location.line(), first_line);
                assert_eq!(failure.location.file(), file!());
            }
            other => panic!("unexpected settle result: {other:?}"),
        }
    }

    #[test]
    fn test_checker_passes_producer_result_through() {
        let checker = Checker::new();
        assert_eq!(checker.settle(Ok(9)).unwrap(), 9);

        let checker = Checker::new();
        match checker.settle::<()>(Err(anyhow::anyhow!("io"))) {
            Err(SampleError::Producer(err)) => assert_eq!(err.to_string(), "io"),
            other => panic!("unexpected settle result: {other:?}"),
        }
    }

    #[test]
    fn test_checker_fail_records_message() {
        let checker = Checker::new();
        let stop = checker.fail("custom failure");
        assert_eq!(stop.to_string(), "nested assertion failed");
        assert!(std::error::Error::source(&stop).is_none());
        match checker.settle::<()>(Ok(())) {
            Err(SampleError::Nested(failure)) => assert_eq!(failure.message, "custom failure"),
            other => panic!("unexpected settle result: {other:?}"),
        }
    }

    #[test]
    fn test_expectation_reports_to_handler() {
        let recorder = RecordingFailHandler::new();
        let harness = Harness::new(recorder.clone());

        assert!(harness.expect(5).to(eq(5)));
        assert!(recorder.is_empty());

        assert!(!harness.expect(5).with_offset(2).to(eq(6)));
        let failure = recorder.last().expect("recorded failure");
        assert_eq!(failure.message, "expected 5 to equal 6");
        assert_eq!(failure.caller_skip, crate::report::BASE_CALLER_SKIP + 2);
    }
}

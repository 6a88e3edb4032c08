//! Judging one sample against the matcher.

use std::time::Duration;

use super::signal::PollSignal;
use crate::assertions::NestedFailure;
use crate::matcher::Matcher;

/// Why a sample did not produce a usable verdict.
#[derive(Debug)]
pub(crate) enum SampleError {
    /// The producer returned an error.
    Producer(anyhow::Error),
    /// A [`Checker`](crate::Checker) assertion inside the producer failed.
    Nested(NestedFailure),
    /// The matcher returned an error.
    Matcher(anyhow::Error),
}

impl SampleError {
    /// The control signal carried by this error, if any.
    pub(crate) fn signal(&self) -> Option<&PollSignal> {
        match self {
            Self::Producer(err) | Self::Matcher(err) => PollSignal::find(err),
            Self::Nested(_) => None,
        }
    }
}

/// What the sample asks of the loop beyond its pass/fail verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Control {
    Continue,
    StopTrying(String),
    TryAgainAfter(Duration),
}

/// Outcome of one sample.
#[derive(Debug)]
pub(crate) struct Evaluation<T> {
    pub(crate) value: Option<T>,
    pub(crate) matches: bool,
    pub(crate) error: Option<SampleError>,
}

impl<T> Evaluation<T> {
    pub(crate) fn passed(&self, desired: bool) -> bool {
        self.error.is_none() && self.matches == desired
    }

    pub(crate) fn control(&self) -> Control {
        let Some(signal) = self.error.as_ref().and_then(SampleError::signal) else {
            return Control::Continue;
        };
        match signal.try_again_after() {
            Some(duration) => Control::TryAgainAfter(duration),
            None => Control::StopTrying(signal.message().to_string()),
        }
    }
}

/// Run a resolved sample through the matcher.
///
/// A resolution error skips the matcher entirely.
pub(crate) fn evaluate<T, M>(resolved: Result<T, SampleError>, matcher: &M) -> Evaluation<T>
where
    M: Matcher<T> + ?Sized,
{
    match resolved {
        Err(error) => Evaluation {
            value: None,
            matches: false,
            error: Some(error),
        },
        Ok(value) => match matcher.matches(&value) {
            Ok(matches) => Evaluation {
                value: Some(value),
                matches,
                error: None,
            },
            Err(err) => Evaluation {
                value: Some(value),
                matches: false,
                error: Some(SampleError::Matcher(err)),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{eq, try_satisfies};
    use crate::polling::{stop_trying, try_again_after};
    use anyhow::Context;
    use std::cell::Cell;

    #[test]
    fn test_resolution_error_skips_matcher() {
        let called = Cell::new(false);
        let matcher = try_satisfies(
            |_: &i32| {
                called.set(true);
                Ok(true)
            },
            "anything",
        );
        let evaluation = evaluate(
            Err(SampleError::Producer(anyhow::anyhow!("no value"))),
            &matcher,
        );
        assert!(!called.get());
        assert!(evaluation.value.is_none());
        assert!(!evaluation.passed(true));
        assert!(!evaluation.passed(false));
        assert_eq!(evaluation.control(), Control::Continue);
    }

    #[test]
    fn test_pass_depends_on_desired() {
        let evaluation = evaluate(Ok(3), &eq(3));
        assert!(evaluation.passed(true));
        assert!(!evaluation.passed(false));

        let evaluation = evaluate(Ok(4), &eq(3));
        assert!(!evaluation.passed(true));
        assert!(evaluation.passed(false));
    }

    #[test]
    fn test_matcher_error_fails_either_way() {
        let matcher = try_satisfies(|_: &i32| anyhow::bail!("cannot judge"), "judgeable");
        let evaluation = evaluate(Ok(1), &matcher);
        assert_eq!(evaluation.value, Some(1));
        assert!(!evaluation.passed(true));
        assert!(!evaluation.passed(false));
        assert!(matches!(evaluation.error, Some(SampleError::Matcher(_))));
    }

    #[test]
    fn test_signals_are_decoded_from_both_sides() {
        let stop = evaluate::<i32, _>(
            Err(SampleError::Producer(
                anyhow::Error::from(stop_trying("gone")).context("fetching"),
            )),
            &eq(1),
        );
        assert_eq!(stop.control(), Control::StopTrying("gone".to_string()));

        let matcher = try_satisfies(
            |_: &i32| Err(try_again_after(Duration::from_millis(30))).context("busy"),
            "ready",
        );
        let retry = evaluate(Ok(1), &matcher);
        assert_eq!(
            retry.control(),
            Control::TryAgainAfter(Duration::from_millis(30))
        );
    }

    #[test]
    fn test_nested_failure_carries_no_signal() {
        let failure = NestedFailure {
            message: "inner".to_string(),
            location: std::panic::Location::caller(),
        };
        let evaluation = evaluate::<i32, _>(Err(SampleError::Nested(failure)), &eq(1));
        assert_eq!(evaluation.control(), Control::Continue);
    }
}

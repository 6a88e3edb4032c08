//! Error definitions
//!
//! [`ConfigError`] covers assertions that were built wrong and are never
//! sampled. [`Error`] is the terminal outcome of a polling run; its `Display`
//! is the first line of the failure message.

use std::time::Duration;

use thiserror::Error;

use crate::polling::Mode;

/// An assertion that cannot run because of how it was configured.
///
/// Configuration errors are reported immediately and never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A producer passed through [`Actual::from_fn`](crate::Actual::from_fn) returns `()`.
    #[error(
        "{mode} had an invalid signature: the function passed to {mode} returns nothing. \
         Functions passed to {mode} must either take no arguments and return at least one value, \
         or take a Checker (optionally followed by a CancellationToken)"
    )]
    ProducerReturnsNothing {
        /// Assertion mode the producer was handed to.
        mode: Mode,
    },

    /// A producer asks for a cancellation token but none was configured.
    #[error(
        "{mode} was passed a function that takes a CancellationToken, \
         but no context was provided. Use with_context(token) to provide one"
    )]
    ContextRequired {
        /// Assertion mode the producer was handed to.
        mode: Mode,
    },

    /// Timeout (or duration, for `Consistently`) of zero.
    #[error("{mode} requires a positive timeout, got {duration:?}")]
    NonPositiveTimeout {
        /// Assertion mode being configured.
        mode: Mode,
        /// The rejected value.
        duration: Duration,
    },

    /// Polling interval of zero.
    #[error("{mode} requires a positive polling interval, got {duration:?}")]
    NonPositivePolling {
        /// Assertion mode being configured.
        mode: Mode,
        /// The rejected value.
        duration: Duration,
    },

    /// `must_pass_repeatedly(0)`.
    #[error("must_pass_repeatedly requires a count of at least 1, got {count}")]
    InvalidRepeatCount {
        /// The rejected count.
        count: usize,
    },

    /// `must_pass_repeatedly` has no meaning for `Consistently`.
    #[error("Invalid use of must_pass_repeatedly with Consistently: it has no meaning")]
    RepeatedPassesWithConsistently,

    /// The harness has no fail handler to report to.
    #[error(
        "no fail handler has been registered: build the harness with Harness::new(handler) \
         before making assertions"
    )]
    MissingFailHandler,
}

/// Terminal outcome of a polling run that did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The assertion was misconfigured.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `Eventually` consumed its whole budget without a passing sample.
    #[error("Timed out after {0:?}.")]
    TimedOut(Duration),

    /// `Consistently` saw a failing sample.
    #[error("Failed after {0:?}.")]
    Failed(Duration),

    /// The cancellation token fired before a verdict was reached.
    #[error("Context was cancelled after {0:?}.")]
    Cancelled(Duration),

    /// A sample returned a `StopTrying` signal.
    #[error("{message} after {elapsed:?}.")]
    StoppedTrying {
        /// The signal's message.
        message: String,
        /// Time since the first sample.
        elapsed: Duration,
    },

    /// The matcher reported that a static actual can no longer change.
    #[error("No future change is possible.  Bailing out early after {0:?}.")]
    NoFutureChange(Duration),
}

impl Error {
    /// Time since the first sample, if the run got that far.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            Self::Config(_) => None,
            Self::TimedOut(elapsed)
            | Self::Failed(elapsed)
            | Self::Cancelled(elapsed)
            | Self::NoFutureChange(elapsed)
            | Self::StoppedTrying { elapsed, .. } => Some(*elapsed),
        }
    }

    /// Returns `true` for errors raised before any sample was taken.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_headers() {
        let elapsed = Duration::from_millis(50);
        assert_eq!(Error::TimedOut(elapsed).to_string(), "Timed out after 50ms.");
        assert_eq!(Error::Failed(elapsed).to_string(), "Failed after 50ms.");
        assert_eq!(
            Error::Cancelled(elapsed).to_string(),
            "Context was cancelled after 50ms."
        );
        assert_eq!(
            Error::StoppedTrying {
                message: "gave up".to_string(),
                elapsed
            }
            .to_string(),
            "gave up after 50ms."
        );
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: Error = ConfigError::MissingFailHandler.into();
        assert!(err.is_config());
        assert_eq!(err.elapsed(), None);
        assert!(err.to_string().starts_with("no fail handler"));
    }

    #[test]
    fn test_config_error_names_mode() {
        let err = ConfigError::NonPositiveTimeout {
            mode: Mode::Consistently,
            duration: Duration::ZERO,
        };
        assert_eq!(
            err.to_string(),
            "Consistently requires a positive timeout, got 0ns"
        );
    }
}

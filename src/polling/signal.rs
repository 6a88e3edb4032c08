//! Signal errors that steer the polling loop.
//!
//! A producer or matcher returns a [`PollSignal`] as its error to ask the loop
//! to give up ([`stop_trying`]) or to sample again after a specific delay
//! ([`try_again_after`]). The signal is found anywhere in an
//! [`anyhow::Error`] chain, so it survives `.context(...)` wrapping.
//!
//! ```rust
//! use testkit_eventually::{stop_trying, try_again_after};
//! use std::time::Duration;
//!
//! fn fetch(attempt: u32) -> anyhow::Result<u32> {
//!     match attempt {
//!         0 => Err(try_again_after(Duration::from_millis(50)).into()),
//!         1..=3 => Ok(attempt),
//!         _ => Err(stop_trying("the service went away").into()),
//!     }
//! }
//! # assert!(fetch(0).is_err());
//! ```

use std::error::Error as StdError;
use std::fmt::Debug;
use std::time::Duration;

use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Extra context attached to a [`stop_trying`] signal for the failure message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// What the value is.
    pub description: String,
    /// The value, rendered with `{:#?}` when it was attached.
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignalKind {
    StopTrying,
    TryAgainAfter(Duration),
}

/// A control-flow error understood by the polling loop.
#[derive(Error, Debug)]
#[error("{message}{}", wrapped_suffix(.wrapped))]
pub struct PollSignal {
    kind: SignalKind,
    message: String,
    #[source]
    wrapped: Option<BoxError>,
    attachments: Vec<Attachment>,
}

/// Tell the polling loop to stop and fail now, whichever the mode.
///
/// The message replaces the usual "Timed out"/"Failed" outcome in the
/// failure report.
pub fn stop_trying(message: impl Into<String>) -> PollSignal {
    PollSignal {
        kind: SignalKind::StopTrying,
        message: message.into(),
        wrapped: None,
        attachments: Vec::new(),
    }
}

/// Tell the polling loop to wait `duration` before the next sample.
///
/// Only the next wait is affected and the overall deadline does not move.
/// This is not a failure; in `Consistently` the sample is neither counted as
/// passing nor failing.
pub fn try_again_after(duration: Duration) -> PollSignal {
    PollSignal {
        kind: SignalKind::TryAgainAfter(duration),
        message: format!("told to try again after {duration:?}"),
        wrapped: None,
        attachments: Vec::new(),
    }
}

impl PollSignal {
    /// Wrap an underlying error, reported alongside the signal.
    #[must_use]
    pub fn wrap<E>(mut self, err: E) -> Self
    where
        E: Into<BoxError>,
    {
        self.wrapped = Some(err.into());
        self
    }

    /// Attach a described value to the failure report.
    #[must_use]
    pub fn attach(mut self, description: impl Into<String>, value: &impl Debug) -> Self {
        self.attachments.push(Attachment {
            description: description.into(),
            value: format!("{value:#?}"),
        });
        self
    }

    /// Returns `true` for [`stop_trying`] signals.
    #[must_use]
    pub fn is_stop_trying(&self) -> bool {
        self.kind == SignalKind::StopTrying
    }

    /// The requested delay, for [`try_again_after`] signals.
    #[must_use]
    pub fn try_again_after(&self) -> Option<Duration> {
        match self.kind {
            SignalKind::TryAgainAfter(duration) => Some(duration),
            SignalKind::StopTrying => None,
        }
    }

    /// The signal's own message, without the wrapped error.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The wrapped error, if any.
    #[must_use]
    pub fn wrapped(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.wrapped.as_deref()
    }

    /// Values attached with [`PollSignal::attach`].
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Find a signal anywhere in an error chain.
    pub(crate) fn find(err: &anyhow::Error) -> Option<&PollSignal> {
        err.chain().find_map(|cause| cause.downcast_ref::<PollSignal>())
    }
}

fn wrapped_suffix(wrapped: &Option<BoxError>) -> String {
    wrapped
        .as_ref()
        .map(|err| format!(": {err}"))
        .unwrap_or_default()
}

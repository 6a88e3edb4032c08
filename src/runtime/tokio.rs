//! Tokio-backed time source.

use std::time::Duration;

use ::tokio::time::Instant;

use super::{Sleep, TimeSource};

/// Tokio-based time source.
///
/// Readings come from [`tokio::time::Instant`], so a runtime started with
/// `start_paused = true` (or paused through `tokio::time::pause`) drives the
/// polling loop on virtual time: waits complete as soon as the runtime is
/// idle and elapsed times are exact.
#[derive(Debug, Clone)]
pub struct TokioTime {
    start: Instant,
}

impl TokioTime {
    /// Create a new Tokio time source whose epoch is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for TokioTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for TokioTime {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, duration: Duration) -> Sleep<'_> {
        Box::pin(::tokio::time::sleep(duration))
    }

    fn sleep_until(&self, deadline: Duration) -> Sleep<'_> {
        match self.start.checked_add(deadline) {
            Some(at) => Box::pin(::tokio::time::sleep_until(at)),
            None => Box::pin(std::future::pending()),
        }
    }
}

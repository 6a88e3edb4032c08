//! Time sources for the polling loop.
//!
//! The polling loop never reads the wall clock directly. It asks a
//! [`TimeSource`] for the current time and for sleep futures, so tests can
//! run it against tokio's paused clock or against a source of their own.
//!
//! # Example
//!
//! ```rust,ignore
//! use testkit_eventually::runtime::{TimeSource, TokioTime};
//!
//! let time = TokioTime::new();
//! let before = time.now();
//! time.sleep(Duration::from_millis(10)).await;
//! assert!(time.now() >= before + Duration::from_millis(10));
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

mod tokio;

pub use self::tokio::TokioTime;

/// A boxed sleep future returned by a [`TimeSource`].
pub type Sleep<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// A source of time for async operations.
///
/// `now` is measured from an arbitrary epoch fixed when the source was
/// created; only differences between readings are meaningful.
pub trait TimeSource: Send + Sync {
    /// Get the current time as a duration since the source's epoch.
    fn now(&self) -> Duration;

    /// Create a future that completes after the given duration.
    fn sleep(&self, duration: Duration) -> Sleep<'_>;

    /// Create a future that completes once `now()` reaches `deadline`.
    fn sleep_until(&self, deadline: Duration) -> Sleep<'_> {
        let now = self.now();
        if deadline <= now {
            Box::pin(std::future::ready(()))
        } else {
            self.sleep(deadline - now)
        }
    }
}

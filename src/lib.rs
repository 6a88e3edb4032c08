//! # testkit-eventually
//!
//! > Eventually and consistently assertions for async Rust tests
//!
//! **testkit-eventually** polls a value or a producer function against a
//! matcher until it passes (`eventually`) or for as long as it keeps passing
//! (`consistently`), within a bounded time budget, and reports failures with
//! the matcher's own explanation.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//! use testkit_eventually::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let harness = Harness::new(PanicFailHandler);
//! let attempts = AtomicU32::new(0);
//!
//! harness
//!     .eventually(Actual::from_fn(|| attempts.fetch_add(1, Ordering::SeqCst)))
//!     .within(Duration::from_millis(500))
//!     .probe_every(Duration::from_millis(1))
//!     .should(gte(3))
//!     .await;
//!
//! harness
//!     .consistently(Actual::from_fn(|| attempts.load(Ordering::SeqCst)))
//!     .within(Duration::from_millis(20))
//!     .should(lt(100))
//!     .await;
//! # }
//! ```
//!
//! With the `macros` feature, `#[testkit_eventually::test]` builds the
//! runtime and hands the test a ready harness:
//!
//! ```rust,ignore
//! #[testkit_eventually::test(start_paused = true)]
//! async fn drains(harness: Harness) {
//!     harness.eventually(Actual::from_fn(|| queue.len())).should(eq(0)).await;
//! }
//! ```
//!
//! ## Features
//!
//! - **Polling assertions** - `eventually` and `consistently` with timeouts,
//!   poll intervals and cancellation
//! - **Signals** - [`stop_trying`] and [`try_again_after`] steer the loop from
//!   inside producers and matchers
//! - **Nested assertions** - [`Checker`] lets a producer assert on several
//!   values per sample
//! - **Pluggable failures** - any [`FailHandler`], with panicking and
//!   recording handlers included
//! - **Virtual time** - runs on tokio's clock, so paused-time tests are exact

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assertions;
pub mod error;
pub mod harness;
pub mod polling;
pub mod report;
pub mod runtime;

pub use assertions::matcher;

/// Prelude for convenient imports
///
/// ```rust
/// use testkit_eventually::prelude::*;
/// ```
pub mod prelude {
    pub use crate::assertions::{Actual, AsyncAssertion, Checker};
    pub use crate::error::{ConfigError, Error, Result};
    pub use crate::harness::{Defaults, Harness};
    pub use crate::matcher::*;
    pub use crate::polling::{stop_trying, try_again_after};
    pub use crate::report::{Description, PanicFailHandler, RecordingFailHandler};
}

// Re-exports
pub use assertions::{
    Actual, AsyncAssertion, Check, Checker, Expectation, ExtraValue, NestedFailure, Stop,
    UnexpectedExtraValue, WithExtras,
};
pub use error::{ConfigError, Error, Result};
pub use harness::{Defaults, Harness};
pub use polling::{stop_trying, try_again_after, Attachment, Mode, PollSignal, ProgressReporter};
pub use report::{
    Description, FailHandler, Failure, PanicFailHandler, RecordingFailHandler, BASE_CALLER_SKIP,
};
pub use runtime::{TimeSource, TokioTime};

// Re-export the test macro when macros feature is enabled
#[cfg(feature = "macros")]
pub use testkit_eventually_macros::test;

//! Assertions.
//!
//! This module provides the assertion surface of the crate:
//!
//! - [`Actual`] - The value or producer under assertion
//! - [`AsyncAssertion`] - `eventually` / `consistently` polling assertions
//! - [`Expectation`] - One-shot synchronous assertions
//! - [`Checker`] - Nested assertions inside a polled producer
//! - [`matcher`] - The matcher contract and basic matchers
//!
//! # Polling
//!
//! ```rust
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use testkit_eventually::{matcher::eq, Actual, Harness, RecordingFailHandler};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let recorder = RecordingFailHandler::new();
//! let harness = Harness::new(recorder.clone());
//! let ready = AtomicBool::new(true);
//!
//! assert!(harness
//!     .eventually(Actual::from_fn(|| ready.load(Ordering::SeqCst)))
//!     .should(eq(true))
//!     .await);
//! assert!(recorder.is_empty());
//! # }
//! ```
//!
//! # Nested Assertions
//!
//! ```rust
//! use testkit_eventually::{matcher::{eq, succeed}, Actual, Harness, PanicFailHandler};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let harness = Harness::new(PanicFailHandler);
//! harness
//!     .eventually(Actual::checked(|g| {
//!         let (status, body) = (200, "ok");
//!         g.expect(status).to(eq(200))?;
//!         g.expect(body).to(eq("ok"))?;
//!         Ok(())
//!     }))
//!     .should(succeed())
//!     .await;
//! # }
//! ```

mod actual;
mod async_assertion;
mod extras;
pub mod matcher;
mod sync_assertion;

pub(crate) use actual::Resolver;
pub use actual::Actual;
pub use async_assertion::AsyncAssertion;
pub use extras::{ExtraValue, UnexpectedExtraValue, WithExtras};
pub use sync_assertion::{Check, Checker, Expectation, NestedFailure, Stop};

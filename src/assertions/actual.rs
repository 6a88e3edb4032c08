//! The value or producer under assertion.
//!
//! An [`Actual`] is built through one of its adapter constructors, which fix
//! its shape once: a static value, a producer, or a producer that makes
//! nested assertions through a [`Checker`]. The polling loop turns it into a
//! [`Resolver`] and re-invokes it once per sample.

use std::any::TypeId;
use std::fmt;

use tokio_util::sync::CancellationToken;

use super::extras::WithExtras;
use super::sync_assertion::Checker;
use crate::error::ConfigError;
use crate::polling::{Mode, SampleError};

type Producer<'a, T> = Box<dyn FnMut() -> anyhow::Result<T> + 'a>;
type CheckedProducer<'a, T> = Box<dyn FnMut(&Checker) -> anyhow::Result<T> + 'a>;
type ContextProducer<'a, T> = Box<dyn FnMut(&Checker, &CancellationToken) -> anyhow::Result<T> + 'a>;

enum Source<'a, T> {
    Static(Box<dyn FnMut() -> T + 'a>),
    Producer(Producer<'a, T>),
    Checked(CheckedProducer<'a, T>),
    CheckedWithContext(ContextProducer<'a, T>),
    ReturnsNothing,
}

/// The value or producer function under assertion.
///
/// # Example
///
/// ```rust
/// use testkit_eventually::Actual;
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// let counter = AtomicU32::new(0);
///
/// let fixed = Actual::value(5);
/// let polled = Actual::from_fn(|| counter.fetch_add(1, Ordering::SeqCst));
/// let fallible = Actual::from_fallible(|| "42".parse::<i32>());
/// let checked = Actual::checked(|g| {
///     g.expect(2 + 2).to(testkit_eventually::matcher::eq(4))?;
///     Ok(())
/// });
/// # let _ = (fixed, polled, fallible, checked);
/// ```
pub struct Actual<'a, T> {
    source: Source<'a, T>,
}

impl<'a, T> Actual<'a, T> {
    /// A static value, re-sampled by cloning.
    ///
    /// Static values are the only actuals whose matcher oracle
    /// ([`may_change_in_the_future`](crate::matcher::Matcher::may_change_in_the_future))
    /// is consulted.
    pub fn value(value: T) -> Self
    where
        T: Clone + 'a,
    {
        Self {
            source: Source::Static(Box::new(move || value.clone())),
        }
    }

    /// A producer invoked once per sample.
    ///
    /// A producer returning `()` has nothing to match against and is a
    /// configuration error, reported before any sampling.
    ///
    /// That check compares type ids, so `T` must be `'static`. Producers that
    /// hand out borrowed data go through [`from_fallible`](Self::from_fallible)
    /// or [`checked`](Self::checked) instead:
    ///
    /// ```rust
    /// use std::convert::Infallible;
    /// use testkit_eventually::Actual;
    ///
    /// struct Server {
    ///     status: String,
    /// }
    ///
    /// let server = Server { status: "ready".to_string() };
    /// let actual = Actual::from_fallible(|| Ok::<_, Infallible>(server.status.as_str()));
    /// # let _ = actual;
    /// ```
    pub fn from_fn<F>(mut producer: F) -> Self
    where
        F: FnMut() -> T + 'a,
        T: 'static,
    {
        if TypeId::of::<T>() == TypeId::of::<()>() {
            return Self {
                source: Source::ReturnsNothing,
            };
        }
        Self {
            source: Source::Producer(Box::new(move || Ok(producer()))),
        }
    }

    /// A fallible producer; an `Err` fails the sample without running the matcher.
    ///
    /// The error may be a [`PollSignal`](crate::PollSignal).
    pub fn from_fallible<F, E>(mut producer: F) -> Self
    where
        F: FnMut() -> Result<T, E> + 'a,
        E: Into<anyhow::Error>,
    {
        Self {
            source: Source::Producer(Box::new(move || producer().map_err(Into::into))),
        }
    }

    /// A producer returning the value under test followed by extra values.
    ///
    /// Every extra must be nil/zero (see [`ExtraValue`](crate::ExtraValue));
    /// otherwise the sample fails with an
    /// [`UnexpectedExtraValue`](crate::UnexpectedExtraValue) error.
    pub fn from_tuple_fn<F, R>(mut producer: F) -> Self
    where
        F: FnMut() -> R + 'a,
        R: WithExtras<Value = T>,
    {
        Self {
            source: Source::Producer(Box::new(move || Ok(producer().into_value()?))),
        }
    }

    /// A producer that makes nested assertions through a [`Checker`].
    ///
    /// The first failure recorded by the checker fails the sample, whether or
    /// not the producer returns `Ok`.
    pub fn checked<F>(producer: F) -> Self
    where
        F: FnMut(&Checker) -> anyhow::Result<T> + 'a,
    {
        Self {
            source: Source::Checked(Box::new(producer)),
        }
    }

    /// Like [`Actual::checked`], also handing the producer the assertion's
    /// cancellation token.
    ///
    /// The assertion must be configured with
    /// [`with_context`](crate::AsyncAssertion::with_context).
    pub fn checked_with_context<F>(producer: F) -> Self
    where
        F: FnMut(&Checker, &CancellationToken) -> anyhow::Result<T> + 'a,
    {
        Self {
            source: Source::CheckedWithContext(Box::new(producer)),
        }
    }

    /// Returns `true` for [`Actual::value`].
    #[must_use]
    pub fn is_static(&self) -> bool {
        matches!(self.source, Source::Static(_))
    }

    pub(crate) fn into_resolver(
        self,
        mode: Mode,
        context: Option<&CancellationToken>,
    ) -> Result<Resolver<'a, T>, ConfigError> {
        let sampler = match self.source {
            Source::ReturnsNothing => return Err(ConfigError::ProducerReturnsNothing { mode }),
            Source::CheckedWithContext(produce) => match context {
                Some(token) => Sampler::CheckedWithContext(produce, token.clone()),
                None => return Err(ConfigError::ContextRequired { mode }),
            },
            Source::Static(produce) => Sampler::Static(produce),
            Source::Producer(produce) => Sampler::Producer(produce),
            Source::Checked(produce) => Sampler::Checked(produce),
        };
        Ok(Resolver { sampler })
    }
}

impl<T> fmt::Debug for Actual<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self.source {
            Source::Static(_) => "Static",
            Source::Producer(_) => "Producer",
            Source::Checked(_) => "Checked",
            Source::CheckedWithContext(_) => "CheckedWithContext",
            Source::ReturnsNothing => "ReturnsNothing",
        };
        f.debug_struct("Actual").field("shape", &shape).finish()
    }
}

enum Sampler<'a, T> {
    Static(Box<dyn FnMut() -> T + 'a>),
    Producer(Producer<'a, T>),
    Checked(CheckedProducer<'a, T>),
    CheckedWithContext(ContextProducer<'a, T>, CancellationToken),
}

/// A validated [`Actual`], ready to be sampled.
pub(crate) struct Resolver<'a, T> {
    sampler: Sampler<'a, T>,
}

impl<T> Resolver<'_, T> {
    pub(crate) fn is_static(&self) -> bool {
        matches!(self.sampler, Sampler::Static(_))
    }

    /// Take one sample.
    pub(crate) fn sample(&mut self) -> Result<T, SampleError> {
        match &mut self.sampler {
            Sampler::Static(produce) => Ok(produce()),
            Sampler::Producer(produce) => produce().map_err(SampleError::Producer),
            Sampler::Checked(produce) => {
                let checker = Checker::new();
                let result = produce(&checker);
                checker.settle(result)
            }
            Sampler::CheckedWithContext(produce, token) => {
                let checker = Checker::new();
                let result = produce(&checker, token);
                checker.settle(result)
            }
        }
    }
}

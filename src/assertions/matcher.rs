// Allow must_use_candidate for matcher factory functions since returning the matcher
// without using it is the common pattern for test setup
#![allow(clippy::must_use_candidate)]

//! Matcher contract and a small set of basic matchers.
//!
//! Polling assertions accept anything implementing [`Matcher`]. A matcher
//! reports whether a value matches (or an error, which may carry a
//! [`PollSignal`](crate::PollSignal)), renders failure text for both the
//! positive and the negated assertion, and may claim that the outcome can no
//! longer change.
//!
//! # Example
//!
//! ```rust
//! use testkit_eventually::matcher::{eq, gt, not, Matcher};
//!
//! assert!(eq(42).matches(&42).unwrap());
//! assert!(gt(0).matches(&50).unwrap());
//! assert!(not(eq(0)).matches(&1).unwrap());
//! ```

use std::fmt::Debug;
use std::marker::PhantomData;

/// A predicate over values of type `T` with failure text.
///
/// # Implementing Custom Matchers
///
/// ```rust
/// use testkit_eventually::matcher::Matcher;
///
/// struct IsEven;
///
/// impl Matcher<i32> for IsEven {
///     fn matches(&self, value: &i32) -> anyhow::Result<bool> {
///         Ok(value % 2 == 0)
///     }
///
///     fn failure_message(&self, value: &i32) -> String {
///         format!("expected {value} to be even")
///     }
///
///     fn negated_failure_message(&self, value: &i32) -> String {
///         format!("expected {value} not to be even")
///     }
/// }
///
/// assert!(IsEven.matches(&4).unwrap());
/// assert!(!IsEven.matches(&3).unwrap());
/// ```
pub trait Matcher<T: ?Sized> {
    /// Check if the value matches.
    ///
    /// An `Err` counts as a failing sample. Returning a
    /// [`PollSignal`](crate::PollSignal) (anywhere in the error chain)
    /// steers the polling loop instead.
    fn matches(&self, actual: &T) -> anyhow::Result<bool>;

    /// Text explaining why `actual` failed a positive assertion.
    fn failure_message(&self, actual: &T) -> String;

    /// Text explaining why `actual` failed a negated assertion.
    fn negated_failure_message(&self, actual: &T) -> String;

    /// Whether polling the same actual again could produce a different outcome.
    ///
    /// Only consulted for static actuals. Returning `false` lets the
    /// polling loop stop early.
    fn may_change_in_the_future(&self, _actual: &T) -> bool {
        true
    }
}

impl<T: ?Sized> Matcher<T> for Box<dyn Matcher<T> + Send + Sync> {
    fn matches(&self, actual: &T) -> anyhow::Result<bool> {
        (**self).matches(actual)
    }

    fn failure_message(&self, actual: &T) -> String {
        (**self).failure_message(actual)
    }

    fn negated_failure_message(&self, actual: &T) -> String {
        (**self).negated_failure_message(actual)
    }

    fn may_change_in_the_future(&self, actual: &T) -> bool {
        (**self).may_change_in_the_future(actual)
    }
}

/// A boxed matcher, for mixing matcher types in combinators.
pub type BoxMatcher<T> = Box<dyn Matcher<T> + Send + Sync>;

/// Box a matcher so different matcher types can share a `Vec`.
pub fn boxed<T, M>(matcher: M) -> BoxMatcher<T>
where
    T: ?Sized,
    M: Matcher<T> + Send + Sync + 'static,
{
    Box::new(matcher)
}

// =============================================================================
// Comparison matchers
// =============================================================================

macro_rules! comparison_matcher {
    ($(#[$doc:meta])* $ctor:ident, $name:ident, $bound:ident, $op:tt, $verb:literal) => {
        $(#[$doc])*
        pub fn $ctor<T: $bound + Debug>(expected: T) -> $name<T> {
            $name { expected }
        }

        #[doc = concat!("Matcher returned by [`", stringify!($ctor), "`].")]
        #[derive(Debug, Clone)]
        pub struct $name<T> {
            expected: T,
        }

        impl<T: $bound + Debug> Matcher<T> for $name<T> {
            fn matches(&self, actual: &T) -> anyhow::Result<bool> {
                Ok(actual $op &self.expected)
            }

            fn failure_message(&self, actual: &T) -> String {
                format!("expected {:?} {} {:?}", actual, $verb, self.expected)
            }

            fn negated_failure_message(&self, actual: &T) -> String {
                format!("expected {:?} not {} {:?}", actual, $verb, self.expected)
            }
        }
    };
}

comparison_matcher!(
    /// Create an equality matcher.
    ///
    /// ```rust
    /// use testkit_eventually::matcher::{eq, Matcher};
    ///
    /// assert!(eq(42).matches(&42).unwrap());
    /// assert!(!eq(42).matches(&0).unwrap());
    /// ```
    eq, EqMatcher, PartialEq, ==, "to equal"
);

comparison_matcher!(
    /// Create a greater-than matcher.
    gt, GtMatcher, PartialOrd, >, "to be greater than"
);

comparison_matcher!(
    /// Create a greater-than-or-equal matcher.
    ///
    /// ```rust
    /// use testkit_eventually::matcher::{gte, Matcher};
    ///
    /// assert!(gte(10).matches(&10).unwrap());
    /// assert!(!gte(10).matches(&5).unwrap());
    /// ```
    gte, GteMatcher, PartialOrd, >=, "to be greater than or equal to"
);

comparison_matcher!(
    /// Create a less-than matcher.
    lt, LtMatcher, PartialOrd, <, "to be less than"
);

comparison_matcher!(
    /// Create a less-than-or-equal matcher.
    lte, LteMatcher, PartialOrd, <=, "to be less than or equal to"
);

// =============================================================================
// Strings and collections
// =============================================================================

/// Create a substring matcher.
///
/// ```rust
/// use testkit_eventually::matcher::{contains_str, Matcher};
///
/// let m = contains_str("world");
/// assert!(m.matches(&"hello world".to_string()).unwrap());
/// assert!(!m.matches(&"hello".to_string()).unwrap());
/// ```
pub fn contains_str(substring: &str) -> ContainsStrMatcher {
    ContainsStrMatcher {
        substring: substring.to_string(),
    }
}

/// Matcher for string contains.
#[derive(Debug, Clone)]
pub struct ContainsStrMatcher {
    substring: String,
}

impl<S: AsRef<str> + Debug + ?Sized> Matcher<S> for ContainsStrMatcher {
    fn matches(&self, actual: &S) -> anyhow::Result<bool> {
        Ok(actual.as_ref().contains(&self.substring))
    }

    fn failure_message(&self, actual: &S) -> String {
        format!("expected {:?} to contain {:?}", actual, self.substring)
    }

    fn negated_failure_message(&self, actual: &S) -> String {
        format!("expected {:?} not to contain {:?}", actual, self.substring)
    }
}

/// Create a contains-element matcher for collections.
///
/// ```rust
/// use testkit_eventually::matcher::{contains, Matcher};
///
/// assert!(contains(2).matches(&vec![1, 2, 3]).unwrap());
/// assert!(!contains(2).matches(&vec![1, 3]).unwrap());
/// ```
pub fn contains<T: PartialEq + Debug>(element: T) -> ContainsMatcher<T> {
    ContainsMatcher { element }
}

/// Matcher for collection contains element.
#[derive(Debug, Clone)]
pub struct ContainsMatcher<T> {
    element: T,
}

impl<T: PartialEq + Debug> Matcher<Vec<T>> for ContainsMatcher<T> {
    fn matches(&self, actual: &Vec<T>) -> anyhow::Result<bool> {
        Ok(actual.contains(&self.element))
    }

    fn failure_message(&self, actual: &Vec<T>) -> String {
        format!("expected {:?} to contain {:?}", actual, self.element)
    }

    fn negated_failure_message(&self, actual: &Vec<T>) -> String {
        format!("expected {:?} not to contain {:?}", actual, self.element)
    }
}

/// Create a length matcher for vectors.
///
/// ```rust
/// use testkit_eventually::matcher::{has_length, Matcher};
///
/// assert!(has_length(3).matches(&vec![1, 2, 3]).unwrap());
/// assert!(!has_length(3).matches(&vec![1, 2]).unwrap());
/// ```
pub fn has_length(length: usize) -> HasLengthMatcher {
    HasLengthMatcher { length }
}

/// Matcher for collection length.
#[derive(Debug, Clone)]
pub struct HasLengthMatcher {
    length: usize,
}

impl<T: Debug> Matcher<Vec<T>> for HasLengthMatcher {
    fn matches(&self, actual: &Vec<T>) -> anyhow::Result<bool> {
        Ok(actual.len() == self.length)
    }

    fn failure_message(&self, actual: &Vec<T>) -> String {
        format!(
            "expected length {}, but was {} (value: {:?})",
            self.length,
            actual.len(),
            actual
        )
    }

    fn negated_failure_message(&self, actual: &Vec<T>) -> String {
        format!("expected {:?} not to have length {}", actual, self.length)
    }
}

/// Create an is-empty matcher for vectors.
pub fn is_empty() -> IsEmptyMatcher {
    IsEmptyMatcher
}

/// Matcher for empty collections.
#[derive(Debug, Clone, Copy)]
pub struct IsEmptyMatcher;

impl<T: Debug> Matcher<Vec<T>> for IsEmptyMatcher {
    fn matches(&self, actual: &Vec<T>) -> anyhow::Result<bool> {
        Ok(actual.is_empty())
    }

    fn failure_message(&self, actual: &Vec<T>) -> String {
        format!(
            "expected empty, but had {} elements: {:?}",
            actual.len(),
            actual
        )
    }

    fn negated_failure_message(&self, _actual: &Vec<T>) -> String {
        "expected a non-empty collection".to_string()
    }
}

// =============================================================================
// Predicates
// =============================================================================

/// Create a matcher that passes whenever the sample produced a value.
///
/// Errors are judged before matchers run, so pairing this with a fallible
/// producer or a [`Checker`](crate::Checker) closure asserts that the
/// producer eventually succeeds.
///
/// ```rust
/// use testkit_eventually::matcher::{succeed, Matcher};
///
/// assert!(succeed().matches(&()).unwrap());
/// ```
pub fn succeed() -> SucceedMatcher {
    SucceedMatcher
}

/// Matcher returned by [`succeed`].
#[derive(Debug, Clone, Copy)]
pub struct SucceedMatcher;

impl<T: ?Sized> Matcher<T> for SucceedMatcher {
    fn matches(&self, _actual: &T) -> anyhow::Result<bool> {
        Ok(true)
    }

    fn failure_message(&self, _actual: &T) -> String {
        "expected success".to_string()
    }

    fn negated_failure_message(&self, _actual: &T) -> String {
        "expected failure, but the function succeeded".to_string()
    }
}

/// Create a predicate-based matcher.
///
/// ```rust
/// use testkit_eventually::matcher::{satisfies, Matcher};
///
/// let m = satisfies(|x: &i32| *x % 2 == 0, "is even");
/// assert!(m.matches(&4).unwrap());
/// assert!(!m.matches(&3).unwrap());
/// ```
pub fn satisfies<T, F>(predicate: F, description: &str) -> PredicateMatcher<T, F>
where
    F: Fn(&T) -> bool,
{
    PredicateMatcher {
        predicate,
        description: description.to_string(),
        _phantom: PhantomData,
    }
}

/// Matcher based on a predicate function.
pub struct PredicateMatcher<T, F> {
    predicate: F,
    description: String,
    _phantom: PhantomData<fn(&T)>,
}

impl<T: Debug, F: Fn(&T) -> bool> Matcher<T> for PredicateMatcher<T, F> {
    fn matches(&self, actual: &T) -> anyhow::Result<bool> {
        Ok((self.predicate)(actual))
    }

    fn failure_message(&self, actual: &T) -> String {
        format!("{:?} does not satisfy: {}", actual, self.description)
    }

    fn negated_failure_message(&self, actual: &T) -> String {
        format!("{:?} unexpectedly satisfies: {}", actual, self.description)
    }
}

/// Create a matcher from a fallible predicate.
///
/// Errors from the predicate become the sample's error, which is how a
/// matcher hands [`stop_trying`](crate::stop_trying) or
/// [`try_again_after`](crate::try_again_after) to the polling loop.
pub fn try_satisfies<T, F>(predicate: F, description: &str) -> FalliblePredicateMatcher<T, F>
where
    F: Fn(&T) -> anyhow::Result<bool>,
{
    FalliblePredicateMatcher {
        predicate,
        description: description.to_string(),
        _phantom: PhantomData,
    }
}

/// Matcher based on a fallible predicate function.
pub struct FalliblePredicateMatcher<T, F> {
    predicate: F,
    description: String,
    _phantom: PhantomData<fn(&T)>,
}

impl<T: Debug, F: Fn(&T) -> anyhow::Result<bool>> Matcher<T> for FalliblePredicateMatcher<T, F> {
    fn matches(&self, actual: &T) -> anyhow::Result<bool> {
        (self.predicate)(actual)
    }

    fn failure_message(&self, actual: &T) -> String {
        format!("{:?} does not satisfy: {}", actual, self.description)
    }

    fn negated_failure_message(&self, actual: &T) -> String {
        format!("{:?} unexpectedly satisfies: {}", actual, self.description)
    }
}

/// Attach an oracle to a matcher.
///
/// `may_change` decides whether a static actual could still change outcome.
/// When it returns `false` and the assertion has not yet passed, `Eventually`
/// gives up early; `Consistently` stops early with success.
///
/// ```rust
/// use testkit_eventually::matcher::{eq, with_oracle, Matcher};
///
/// let m = with_oracle(eq(5), |_: &i32| false);
/// assert!(!m.may_change_in_the_future(&3));
/// ```
pub fn with_oracle<T, M, F>(matcher: M, may_change: F) -> OracleMatcher<M, F>
where
    M: Matcher<T>,
    F: Fn(&T) -> bool,
{
    OracleMatcher {
        inner: matcher,
        may_change,
    }
}

/// Matcher returned by [`with_oracle`].
pub struct OracleMatcher<M, F> {
    inner: M,
    may_change: F,
}

impl<T, M, F> Matcher<T> for OracleMatcher<M, F>
where
    M: Matcher<T>,
    F: Fn(&T) -> bool,
{
    fn matches(&self, actual: &T) -> anyhow::Result<bool> {
        self.inner.matches(actual)
    }

    fn failure_message(&self, actual: &T) -> String {
        self.inner.failure_message(actual)
    }

    fn negated_failure_message(&self, actual: &T) -> String {
        self.inner.negated_failure_message(actual)
    }

    fn may_change_in_the_future(&self, actual: &T) -> bool {
        (self.may_change)(actual)
    }
}

// =============================================================================
// Combinators
// =============================================================================

/// Create a matcher that matches when all matchers match.
///
/// Evaluation stops at the first failing or erroring matcher.
///
/// ```rust
/// use testkit_eventually::matcher::{all_of, boxed, gt, lt, Matcher};
///
/// let m = all_of(vec![boxed(gt(0)), boxed(lt(100))]);
/// assert!(m.matches(&50).unwrap());
/// assert!(!m.matches(&0).unwrap());
/// ```
pub fn all_of<T: ?Sized>(matchers: Vec<BoxMatcher<T>>) -> AllOfMatcher<T> {
    AllOfMatcher { matchers }
}

/// Matcher that requires all inner matchers to match.
pub struct AllOfMatcher<T: ?Sized> {
    matchers: Vec<BoxMatcher<T>>,
}

impl<T: ?Sized> AllOfMatcher<T> {
    fn first_failing(&self, actual: &T) -> Option<&BoxMatcher<T>> {
        self.matchers
            .iter()
            .find(|m| !m.matches(actual).unwrap_or(false))
    }
}

impl<T: ?Sized> Matcher<T> for AllOfMatcher<T> {
    fn matches(&self, actual: &T) -> anyhow::Result<bool> {
        for matcher in &self.matchers {
            if !matcher.matches(actual)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn failure_message(&self, actual: &T) -> String {
        self.first_failing(actual)
            .map(|m| m.failure_message(actual))
            .unwrap_or_default()
    }

    fn negated_failure_message(&self, actual: &T) -> String {
        let messages: Vec<_> = self
            .matchers
            .iter()
            .map(|m| m.negated_failure_message(actual))
            .collect();
        format!("expected not all of: [{}]", messages.join("; "))
    }

    fn may_change_in_the_future(&self, actual: &T) -> bool {
        match self.first_failing(actual) {
            Some(failing) => failing.may_change_in_the_future(actual),
            None => self.matchers.iter().any(|m| m.may_change_in_the_future(actual)),
        }
    }
}

/// Create a matcher that matches when any matcher matches.
///
/// ```rust
/// use testkit_eventually::matcher::{any_of, boxed, eq, Matcher};
///
/// let m = any_of(vec![boxed(eq(1)), boxed(eq(2))]);
/// assert!(m.matches(&2).unwrap());
/// assert!(!m.matches(&4).unwrap());
/// ```
pub fn any_of<T: ?Sized>(matchers: Vec<BoxMatcher<T>>) -> AnyOfMatcher<T> {
    AnyOfMatcher { matchers }
}

/// Matcher that requires at least one inner matcher to match.
pub struct AnyOfMatcher<T: ?Sized> {
    matchers: Vec<BoxMatcher<T>>,
}

impl<T: ?Sized> Matcher<T> for AnyOfMatcher<T> {
    fn matches(&self, actual: &T) -> anyhow::Result<bool> {
        for matcher in &self.matchers {
            if matcher.matches(actual)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn failure_message(&self, actual: &T) -> String {
        let messages: Vec<_> = self
            .matchers
            .iter()
            .map(|m| m.failure_message(actual))
            .collect();
        format!("matched none of: [{}]", messages.join("; "))
    }

    fn negated_failure_message(&self, actual: &T) -> String {
        self.matchers
            .iter()
            .find(|m| m.matches(actual).unwrap_or(false))
            .map(|m| m.negated_failure_message(actual))
            .unwrap_or_default()
    }

    fn may_change_in_the_future(&self, actual: &T) -> bool {
        self.matchers.iter().any(|m| m.may_change_in_the_future(actual))
    }
}

/// Create a negating matcher.
///
/// ```rust
/// use testkit_eventually::matcher::{eq, not, Matcher};
///
/// assert!(not(eq(0)).matches(&1).unwrap());
/// assert!(!not(eq(0)).matches(&0).unwrap());
/// ```
pub fn not<M>(matcher: M) -> NotMatcher<M> {
    NotMatcher { inner: matcher }
}

/// Matcher that negates another matcher.
#[derive(Debug, Clone)]
pub struct NotMatcher<M> {
    inner: M,
}

impl<T: ?Sized, M: Matcher<T>> Matcher<T> for NotMatcher<M> {
    fn matches(&self, actual: &T) -> anyhow::Result<bool> {
        self.inner.matches(actual).map(|matched| !matched)
    }

    fn failure_message(&self, actual: &T) -> String {
        self.inner.negated_failure_message(actual)
    }

    fn negated_failure_message(&self, actual: &T) -> String {
        self.inner.failure_message(actual)
    }

    fn may_change_in_the_future(&self, actual: &T) -> bool {
        self.inner.may_change_in_the_future(actual)
    }
}

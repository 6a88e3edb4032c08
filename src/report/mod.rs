//! Failure reporting.
//!
//! Failure text is composed only when it is needed: when an assertion
//! terminates unsuccessfully, or when a
//! [`ProgressReporter`](crate::ProgressReporter) asks for a snapshot.
//! Composed failures are handed to the harness's [`FailHandler`].

use std::fmt::{self, Display};
use std::panic::Location;

mod handler;

pub use handler::{FailHandler, PanicFailHandler, RecordingFailHandler};

use crate::matcher::Matcher;
use crate::polling::{Mode, SampleError, SampleResult};

/// Frames between user code and the fail handler, before any offset.
pub const BASE_CALLER_SKIP: usize = 2;

/// A failed assertion, as handed to a [`FailHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Full failure text.
    pub message: String,
    /// Stack frames to skip to reach user code: [`BASE_CALLER_SKIP`] plus the
    /// assertion's offset.
    pub caller_skip: usize,
    /// Where the assertion was created.
    pub location: &'static Location<'static>,
}

impl Failure {
    pub(crate) fn new(message: String, offset: usize, location: &'static Location<'static>) -> Self {
        Self {
            message,
            caller_skip: BASE_CALLER_SKIP + offset,
            location,
        }
    }
}

enum DescriptionKind {
    Empty,
    Text(String),
    Lazy(Box<dyn Fn() -> String + Send + Sync>),
}

/// Optional text printed above the failure detail.
///
/// A lazy description is only evaluated when a failure is actually reported.
///
/// ```rust
/// use testkit_eventually::Description;
///
/// let fixed: Description = "the queue should drain".into();
/// let lazy = Description::lazy(|| format!("expensive context: {}", 42));
/// # let _ = (fixed, lazy);
/// ```
pub struct Description {
    kind: DescriptionKind,
}

impl Description {
    /// A description computed on failure.
    pub fn lazy<F>(describe: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self {
            kind: DescriptionKind::Lazy(Box::new(describe)),
        }
    }

    /// Render the description, `None` when there is nothing to print.
    pub(crate) fn render(&self) -> Option<String> {
        let text = match &self.kind {
            DescriptionKind::Empty => return None,
            DescriptionKind::Text(text) => text.clone(),
            DescriptionKind::Lazy(describe) => describe(),
        };
        (!text.is_empty()).then_some(text)
    }
}

impl Default for Description {
    fn default() -> Self {
        Self {
            kind: DescriptionKind::Empty,
        }
    }
}

impl From<&str> for Description {
    fn from(text: &str) -> Self {
        Self::from(text.to_string())
    }
}

impl From<String> for Description {
    fn from(text: String) -> Self {
        Self {
            kind: DescriptionKind::Text(text),
        }
    }
}

impl fmt::Debug for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DescriptionKind::Empty => f.write_str("Description::Empty"),
            DescriptionKind::Text(text) => f.debug_tuple("Description::Text").field(text).finish(),
            DescriptionKind::Lazy(_) => f.write_str("Description::Lazy(..)"),
        }
    }
}

/// `"{header}\n{description}\n{detail}"`, skipping an empty description.
pub(crate) fn compose(header: &dyn Display, description: &Description, detail: &str) -> String {
    let mut message = format!("{header}\n");
    if let Some(text) = description.render() {
        message.push_str(&text);
        message.push('\n');
    }
    message.push_str(detail);
    message
}

/// Explain the latest sample.
pub(crate) fn sample_detail<T, M>(
    mode: Mode,
    desired: bool,
    matcher: &M,
    sample: &SampleResult<T>,
) -> String
where
    M: Matcher<T> + ?Sized,
{
    match &sample.error {
        Some(error) => error_detail(mode, error),
        None => match &sample.value {
            Some(value) if desired => matcher.failure_message(value),
            Some(value) => matcher.negated_failure_message(value),
            None => String::new(),
        },
    }
}

fn error_detail(mode: Mode, error: &SampleError) -> String {
    if let Some(signal) = error.signal() {
        // a stop-trying message is already the header
        let mut detail = if signal.is_stop_trying() {
            signal.wrapped().map(ToString::to_string).unwrap_or_default()
        } else {
            signal.to_string()
        };
        for attachment in signal.attachments() {
            detail.push_str(&format!(
                "\n{}:\n    {}",
                attachment.description, attachment.value
            ));
        }
        return detail;
    }
    match error {
        SampleError::Producer(err) => format!(
            "The function passed to {mode} returned the following error:\n    {err:#}"
        ),
        SampleError::Matcher(err) => format!(
            "The matcher passed to {mode} returned the following error:\n    {err:#}"
        ),
        SampleError::Nested(failure) => format!(
            "The function passed to {mode} failed at {}:{} with:\n{}",
            failure.location.file(),
            failure.location.line(),
            failure.message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::NestedFailure;
    use crate::error::Error;
    use crate::matcher::eq;
    use crate::polling::{stop_trying, try_again_after};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn sample<T>(value: Option<T>, error: Option<SampleError>) -> SampleResult<T> {
        SampleResult {
            value,
            error,
            captured_at: Duration::ZERO,
        }
    }

    #[test]
    fn test_caller_skip_adds_offset() {
        let failure = Failure::new("m".to_string(), 3, Location::caller());
        assert_eq!(failure.caller_skip, BASE_CALLER_SKIP + 3);
    }

    #[test]
    fn test_compose_with_and_without_description() {
        let header = Error::TimedOut(Duration::from_millis(50));
        assert_eq!(
            compose(&header, &Description::default(), "detail"),
            "Timed out after 50ms.\ndetail"
        );
        assert_eq!(
            compose(&header, &"context".into(), "detail"),
            "Timed out after 50ms.\ncontext\ndetail"
        );
        assert_eq!(
            compose(&header, &String::new().into(), "detail"),
            "Timed out after 50ms.\ndetail"
        );
    }

    #[test]
    fn test_lazy_description_runs_only_when_rendered() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let description = Description::lazy(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            "computed".to_string()
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(description.render().as_deref(), Some("computed"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_matcher_messages_follow_desired() {
        let latest = sample(Some(1), None);
        assert_eq!(
            sample_detail(Mode::Eventually, true, &eq(2), &latest),
            "expected 1 to equal 2"
        );
        assert_eq!(
            sample_detail(Mode::Eventually, false, &eq(1), &latest),
            "expected 1 not to equal 1"
        );
    }

    #[test]
    fn test_error_details_name_the_mode() {
        let producer = sample::<i32>(None, Some(SampleError::Producer(anyhow::anyhow!("io"))));
        assert_eq!(
            sample_detail(Mode::Consistently, true, &eq(1), &producer),
            "The function passed to Consistently returned the following error:\n    io"
        );

        let matcher = sample(Some(1), Some(SampleError::Matcher(anyhow::anyhow!("bad"))));
        assert_eq!(
            sample_detail(Mode::Eventually, true, &eq(1), &matcher),
            "The matcher passed to Eventually returned the following error:\n    bad"
        );

        let location = Location::caller();
        let nested = sample::<i32>(
            None,
            Some(SampleError::Nested(NestedFailure {
                message: "expected 1 to equal 2".to_string(),
                location,
            })),
        );
        assert_eq!(
            sample_detail(Mode::Eventually, true, &eq(1), &nested),
            format!(
                "The function passed to Eventually failed at {}:{} with:\nexpected 1 to equal 2",
                location.file(),
                location.line()
            )
        );
    }

    #[test]
    fn test_stop_trying_detail_lists_wrapped_error_and_attachments() {
        let signal = stop_trying("gave up")
            .wrap(std::io::Error::other("disk gone"))
            .attach("the count", &3);
        let latest = sample::<i32>(None, Some(SampleError::Producer(signal.into())));
        assert_eq!(
            sample_detail(Mode::Eventually, true, &eq(1), &latest),
            "disk gone\nthe count:\n    3"
        );
    }

    #[test]
    fn test_try_again_detail_names_the_delay() {
        let signal = try_again_after(Duration::from_millis(30)).wrap(std::io::Error::other("busy"));
        let latest = sample::<i32>(None, Some(SampleError::Producer(signal.into())));
        assert_eq!(
            sample_detail(Mode::Eventually, true, &eq(1), &latest),
            "told to try again after 30ms: busy"
        );
    }
}

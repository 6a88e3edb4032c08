//! The polling loop behind `eventually` and `consistently`.
//!
//! Each run takes its first sample immediately, then alternates between
//! waiting and sampling. A wait races three events, checked in this order
//! when several are ready at once:
//!
//! 1. the cancellation token (if any) firing
//! 2. the overall deadline passing
//! 3. the poll tick, whose length is the configured interval unless the
//!    previous sample asked to [`try_again_after`] a specific delay
//!
//! The deadline is only observed between samples, so a slow producer or
//! matcher can overrun it.

use std::fmt::{self, Display};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::assertions::Resolver;
use crate::error::Error;
use crate::matcher::Matcher;

mod evaluate;
mod progress;
mod signal;

pub(crate) use evaluate::{evaluate, Control, SampleError};
pub(crate) use progress::{LoopState, SampleResult};
pub use progress::ProgressReporter;
pub use signal::{stop_trying, try_again_after, Attachment, PollSignal};

/// Which kind of polling assertion is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Retry until a sample passes or the timeout runs out.
    Eventually,
    /// Verify that every sample passes for the whole duration.
    Consistently,
}

impl Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eventually => f.write_str("Eventually"),
            Self::Consistently => f.write_str("Consistently"),
        }
    }
}

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub(crate) struct PollConfig {
    pub(crate) mode: Mode,
    pub(crate) timeout: Duration,
    pub(crate) polling: Duration,
    pub(crate) context: Option<CancellationToken>,
    pub(crate) must_pass_repeatedly: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wake {
    Tick,
    Deadline,
    Cancelled,
}

struct Step {
    passed: bool,
    settled: bool,
    control: Control,
}

/// Drives sampling and waiting until a terminal outcome.
pub(crate) struct PollingLoop<'s, 'a, T, M> {
    config: &'s PollConfig,
    state: &'s LoopState<T, M>,
    resolver: Resolver<'a, T>,
    /// `None` when the timeout reaches past what the clock can represent.
    deadline: Option<Duration>,
}

impl<'s, 'a, T, M> PollingLoop<'s, 'a, T, M>
where
    M: Matcher<T>,
{
    pub(crate) fn new(
        config: &'s PollConfig,
        state: &'s LoopState<T, M>,
        resolver: Resolver<'a, T>,
    ) -> Self {
        Self {
            config,
            state,
            resolver,
            deadline: state.started().checked_add(config.timeout),
        }
    }

    /// Run to completion. `Ok` means the assertion held.
    pub(crate) async fn run(mut self) -> Result<(), Error> {
        let outcome = match self.config.mode {
            Mode::Eventually => self.eventually().await,
            Mode::Consistently => self.consistently().await,
        };
        let samples = self.state.samples();
        let elapsed = self.state.elapsed();
        match &outcome {
            Ok(()) => debug!(mode = %self.config.mode, samples, ?elapsed, "assertion held"),
            Err(err) => debug!(mode = %self.config.mode, samples, ?elapsed, error = %err, "assertion failed"),
        }
        outcome
    }

    async fn eventually(&mut self) -> Result<(), Error> {
        let mut passes = 0;
        loop {
            let step = self.sample();
            if step.passed {
                passes += 1;
                if passes >= self.config.must_pass_repeatedly {
                    return Ok(());
                }
            } else {
                match step.control {
                    Control::StopTrying(message) => return Err(self.stopped(message)),
                    // a retry request is not a failing sample
                    Control::TryAgainAfter(_) => {}
                    Control::Continue => passes = 0,
                }
                if step.settled {
                    return Err(Error::NoFutureChange(self.state.elapsed()));
                }
            }

            match self.wait().await {
                Wake::Tick => {}
                Wake::Deadline => return Err(Error::TimedOut(self.state.elapsed())),
                Wake::Cancelled => return Err(Error::Cancelled(self.state.elapsed())),
            }
        }
    }

    async fn consistently(&mut self) -> Result<(), Error> {
        loop {
            let step = self.sample();
            match step.control {
                Control::StopTrying(message) => return Err(self.stopped(message)),
                Control::TryAgainAfter(_) => {}
                Control::Continue if step.passed => {
                    if step.settled {
                        return Ok(());
                    }
                }
                Control::Continue => return Err(Error::Failed(self.state.elapsed())),
            }

            match self.wait().await {
                Wake::Tick => {}
                Wake::Deadline => return Ok(()),
                Wake::Cancelled => return Err(Error::Cancelled(self.state.elapsed())),
            }
        }
    }

    fn stopped(&self, message: String) -> Error {
        Error::StoppedTrying {
            message,
            elapsed: self.state.elapsed(),
        }
    }

    /// Take and publish one sample.
    fn sample(&mut self) -> Step {
        let state = self.state;
        let evaluation = evaluate(self.resolver.sample(), state.matcher());
        let passed = evaluation.passed(state.desired());
        let control = evaluation.control();
        let settled = self.resolver.is_static()
            && evaluation
                .value
                .as_ref()
                .is_some_and(|value| !state.matcher().may_change_in_the_future(value));

        let interval_override = match control {
            Control::TryAgainAfter(duration) => Some(duration),
            _ => None,
        };
        let number = state.record(evaluation.value, evaluation.error, interval_override);
        trace!(
            mode = %state.mode(),
            sample = number,
            elapsed = ?state.elapsed(),
            passed,
            "sampled"
        );

        Step {
            passed,
            settled,
            control,
        }
    }

    async fn wait(&self) -> Wake {
        let interval = self
            .state
            .take_interval_override()
            .unwrap_or(self.config.polling);
        let time = self.state.time();
        let cancelled = async {
            match &self.config.context {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let deadline = async {
            match self.deadline {
                Some(deadline) => time.sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = cancelled => Wake::Cancelled,
            () = deadline => Wake::Deadline,
            () = time.sleep(interval) => Wake::Tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::Actual;
    use crate::matcher::{eq, gte, try_satisfies, with_oracle};
    use crate::report::Description;
    use crate::runtime::{TimeSource, TokioTime};
    use std::cell::Cell;
    use std::sync::Arc;

    fn config(mode: Mode, timeout_ms: u64, polling_ms: u64) -> PollConfig {
        PollConfig {
            mode,
            timeout: Duration::from_millis(timeout_ms),
            polling: Duration::from_millis(polling_ms),
            context: None,
            must_pass_repeatedly: 1,
        }
    }

    async fn run<T, M: Matcher<T>>(
        config: &PollConfig,
        actual: Actual<'_, T>,
        matcher: M,
    ) -> (Result<(), Error>, LoopState<T, M>) {
        let state = LoopState::new(
            config.mode,
            true,
            matcher,
            Description::default(),
            Arc::new(TokioTime::new()),
        );
        let resolver = actual
            .into_resolver(config.mode, config.context.as_ref())
            .unwrap();
        let outcome = PollingLoop::new(config, &state, resolver).run().await;
        (outcome, state)
    }

    #[tokio::test(start_paused = true)]
    async fn test_eventually_returns_on_first_pass() {
        let calls = Cell::new(0);
        let actual = Actual::from_fn(|| {
            calls.set(calls.get() + 1);
            calls.get()
        });
        let (outcome, state) = run(&config(Mode::Eventually, 1000, 10), actual, gte(5)).await;
        assert_eq!(outcome, Ok(()));
        assert_eq!(state.samples(), 5);
        assert_eq!(state.elapsed(), Duration::from_millis(40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_eventually_times_out_at_deadline() {
        let (outcome, state) = run(
            &config(Mode::Eventually, 50, 10),
            Actual::from_fn(|| 0),
            eq(1),
        )
        .await;
        assert_eq!(outcome, Err(Error::TimedOut(Duration::from_millis(50))));
        assert_eq!(state.samples(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_must_pass_repeatedly_needs_consecutive_passes() {
        let calls = Cell::new(0);
        let actual = Actual::from_fn(|| {
            calls.set(calls.get() + 1);
            // passes on 2, 4, 5, 6
            !matches!(calls.get(), 1 | 3)
        });
        let mut config = config(Mode::Eventually, 1000, 10);
        config.must_pass_repeatedly = 3;
        let (outcome, state) = run(&config, actual, eq(true)).await;
        assert_eq!(outcome, Ok(()));
        assert_eq!(state.samples(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_static_oracle_bails_out() {
        let matcher = with_oracle(eq(2), |_: &i32| false);
        let (outcome, state) = run(&config(Mode::Eventually, 1000, 10), Actual::value(1), matcher).await;
        assert_eq!(outcome, Err(Error::NoFutureChange(Duration::ZERO)));
        assert_eq!(state.samples(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oracle_ignored_for_producers() {
        let matcher = with_oracle(eq(2), |_: &i32| false);
        let (outcome, state) = run(&config(Mode::Eventually, 30, 10), Actual::from_fn(|| 1), matcher).await;
        assert_eq!(outcome, Err(Error::TimedOut(Duration::from_millis(30))));
        assert_eq!(state.samples(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consistently_fails_at_first_mismatch() {
        let calls = Cell::new(0);
        let actual = Actual::from_fn(|| {
            calls.set(calls.get() + 1);
            calls.get() != 3
        });
        let (outcome, state) = run(&config(Mode::Consistently, 50, 10), actual, eq(true)).await;
        assert_eq!(outcome, Err(Error::Failed(Duration::from_millis(20))));
        assert_eq!(state.samples(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consistently_succeeds_at_deadline() {
        let (outcome, state) = run(
            &config(Mode::Consistently, 50, 10),
            Actual::from_fn(|| 7),
            eq(7),
        )
        .await;
        assert_eq!(outcome, Ok(()));
        assert_eq!(state.samples(), 5);
        assert_eq!(state.elapsed(), Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_consistently_settles_early_on_static_value() {
        let matcher = with_oracle(eq(7), |_: &i32| false);
        let (outcome, state) = run(&config(Mode::Consistently, 50, 10), Actual::value(7), matcher).await;
        assert_eq!(outcome, Ok(()));
        assert_eq!(state.samples(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_matcher_error_is_retried_by_eventually() {
        let calls = Cell::new(0);
        let matcher = try_satisfies(
            |_: &i32| {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    anyhow::bail!("not ready");
                }
                Ok(true)
            },
            "ready",
        );
        let (outcome, state) = run(&config(Mode::Eventually, 1000, 10), Actual::from_fn(|| 1), matcher).await;
        assert_eq!(outcome, Ok(()));
        assert_eq!(state.samples(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_again_after_overrides_one_wait() {
        let calls = Cell::new(0);
        let captured = std::cell::RefCell::new(Vec::new());
        let time = TokioTime::new();
        let actual = Actual::from_fallible(|| {
            captured.borrow_mut().push(time.now());
            calls.set(calls.get() + 1);
            if calls.get() == 2 {
                return Err(try_again_after(Duration::from_millis(25)));
            }
            Ok(calls.get())
        });
        let (outcome, _) = run(&config(Mode::Eventually, 1000, 10), actual, gte(4)).await;
        assert_eq!(outcome, Ok(()));
        assert_eq!(
            *captured.borrow(),
            vec![
                Duration::ZERO,
                Duration::from_millis(10),
                Duration::from_millis(35),
                Duration::from_millis(45),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_during_try_again_after() {
        let actual = Actual::from_fallible(|| {
            Err::<i32, _>(try_again_after(Duration::from_millis(100)))
        });
        let (outcome, state) = run(&config(Mode::Eventually, 50, 10), actual, eq(1)).await;
        assert_eq!(outcome, Err(Error::TimedOut(Duration::from_millis(50))));
        assert_eq!(state.samples(), 1);
        assert_eq!(
            state.failure_message(&outcome.unwrap_err()),
            "Timed out after 50ms.\ntold to try again after 100ms"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_again_after_keeps_consecutive_passes() {
        let calls = Cell::new(0);
        let actual = Actual::from_fallible(|| {
            calls.set(calls.get() + 1);
            match calls.get() {
                2 => Err(try_again_after(Duration::from_millis(5))),
                3 => Ok(false),
                _ => Ok(true),
            }
        });
        let mut config = config(Mode::Eventually, 1000, 10);
        config.must_pass_repeatedly = 2;
        // 1 pass, 2 retry, 3 fail, 4 pass, 5 pass
        let (outcome, state) = run(&config, actual, eq(true)).await;
        assert_eq!(outcome, Ok(()));
        assert_eq!(state.samples(), 5);

        let calls = Cell::new(0);
        let actual = Actual::from_fallible(|| {
            calls.set(calls.get() + 1);
            match calls.get() {
                2 => Err(try_again_after(Duration::from_millis(5))),
                _ => Ok(true),
            }
        });
        // the retry between the first and third samples does not reset the count
        let (outcome, state) = run(&config, actual, eq(true)).await;
        assert_eq!(outcome, Ok(()));
        assert_eq!(state.samples(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_timeout_after_clock_moved() {
        let time = Arc::new(TokioTime::new());
        tokio::time::advance(Duration::from_millis(1)).await;

        let calls = Cell::new(0);
        let actual = Actual::from_fn(|| {
            calls.set(calls.get() + 1);
            calls.get()
        });
        let mut config = config(Mode::Eventually, 0, 10);
        config.timeout = Duration::MAX;
        let state = LoopState::new(config.mode, true, gte(3), Description::default(), time);
        let resolver = actual.into_resolver(config.mode, None).unwrap();
        let outcome = PollingLoop::new(&config, &state, resolver).run().await;
        assert_eq!(outcome, Ok(()));
        assert_eq!(state.elapsed(), Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_again_after_is_not_a_consistently_failure() {
        let calls = Cell::new(0);
        let actual = Actual::from_fallible(|| {
            calls.set(calls.get() + 1);
            if calls.get() == 2 {
                return Err(try_again_after(Duration::from_millis(5)));
            }
            Ok(1)
        });
        let (outcome, _) = run(&config(Mode::Consistently, 30, 10), actual, eq(1)).await;
        assert_eq!(outcome, Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_trying_ends_either_mode() {
        for mode in [Mode::Eventually, Mode::Consistently] {
            let calls = Cell::new(0);
            let actual = Actual::from_fallible(|| {
                calls.set(calls.get() + 1);
                if calls.get() == 2 {
                    return Err(stop_trying("the server went away"));
                }
                Ok(0)
            });
            // eventually never passes, consistently always does
            let matcher = eq(if mode == Mode::Eventually { 1 } else { 0 });
            let (outcome, state) = run(&config(mode, 1000, 10), actual, matcher).await;
            assert_eq!(
                outcome,
                Err(Error::StoppedTrying {
                    message: "the server went away".to_string(),
                    elapsed: Duration::from_millis(10),
                }),
                "{mode}"
            );
            assert_eq!(state.samples(), 2);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_fails_both_modes() {
        for mode in [Mode::Eventually, Mode::Consistently] {
            let token = CancellationToken::new();
            let mut config = config(mode, 1000, 10);
            config.context = Some(token.clone());

            let canceller = {
                let token = token.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(25)).await;
                    token.cancel();
                }
            };
            let matcher = eq(if mode == Mode::Eventually { 1 } else { 0 });
            let ((outcome, _), ()) = tokio::join!(run(&config, Actual::from_fn(|| 0), matcher), canceller);
            assert_eq!(outcome, Err(Error::Cancelled(Duration::from_millis(25))), "{mode}");
        }
    }
}

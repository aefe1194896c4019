//! Retry and backoff control for the request pipeline.
//!
//! Every logical call runs through a single [`RetryController`] loop. The
//! controller never inspects HTTP details itself; it reads the
//! [`ErrorKind`] of each failed attempt and decides:
//!
//! | Kind | Decision |
//! |------|----------|
//! | `RateLimited` | wait the server delay, does not consume `max_retries` |
//! | `Network`, `Timeout`, `ServerError` | exponential backoff while retries remain |
//! | `ClientError`, `Decode`, `Unknown` | terminal |
//!
//! Non-classified failures (credentials, validation, cancellation) are
//! always terminal.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::clients::errors::{ClassifiedError, ErrorKind, HttpError};
use crate::clients::http_response::DEFAULT_RETRY_AFTER_SECS;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for exponential backoff.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Least time that must remain of the overall deadline after a wait for
/// the next attempt to be started. Clamped to the per-attempt timeout.
pub const MIN_ATTEMPT_BUDGET: Duration = Duration::from_millis(500);

/// Backoff policy for transient failures.
///
/// The delay before transient retry `n` (0-based) is
/// `base_delay * 2^n + jitter`, with jitter drawn uniformly from
/// `[0, base_delay)`. The result is clamped to `max_backoff` when set.
/// Delays produced for one call never decrease.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use tracechain::clients::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_retries, 3);
/// assert_eq!(policy.backoff_delay(2, 0.0), Duration::from_secs(4));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed for transient failures (total attempts = `max_retries + 1`).
    pub max_retries: u32,
    /// Base delay for exponential backoff.
    pub base_delay: Duration,
    /// Upper bound applied to each computed backoff delay.
    pub max_backoff: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_backoff: None,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries transient failures.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base_delay: DEFAULT_BASE_DELAY,
            max_backoff: None,
        }
    }

    /// Computes the backoff before transient retry `retry` for a given
    /// jitter fraction in `[0, 1)`.
    #[must_use]
    pub fn backoff_delay(&self, retry: u32, jitter_fraction: f64) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        let exponential = self.base_delay.saturating_mul(factor);

        let fraction = if jitter_fraction.is_finite() {
            jitter_fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let jitter = Duration::from_secs_f64(self.base_delay.as_secs_f64() * fraction);

        let delay = exponential.saturating_add(jitter);
        self.max_backoff.map_or(delay, |cap| delay.min(cap))
    }

    /// Computes the backoff before transient retry `retry` with random jitter.
    #[must_use]
    pub fn backoff_for(&self, retry: u32) -> Duration {
        self.backoff_delay(retry, rand::thread_rng().gen::<f64>())
    }

    /// Decides what to do after a failed attempt.
    ///
    /// `retries_used` is the number of transient retries already taken.
    #[must_use]
    pub fn decide(&self, error: &HttpError, retries_used: u32) -> RetryDecision {
        match error.kind() {
            Some(ErrorKind::RateLimited { retry_after }) => RetryDecision::Throttled(
                Duration::from_secs(retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS)),
            ),
            Some(kind) if kind.is_transient() => {
                if retries_used < self.max_retries {
                    RetryDecision::Backoff(self.backoff_for(retries_used))
                } else {
                    RetryDecision::Stop
                }
            }
            _ => RetryDecision::Stop,
        }
    }
}

/// Outcome of [`RetryPolicy::decide`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait the server-requested delay. Does not consume `max_retries`.
    Throttled(Duration),
    /// Wait the computed backoff. Consumes one retry.
    Backoff(Duration),
    /// Surface the error to the caller.
    Stop,
}

/// Bookkeeping for one logical call.
#[derive(Debug, Default)]
struct RetryState {
    attempt: u32,
    retries_used: u32,
    throttled: u32,
}

/// Drives the attempt loop of a logical call.
///
/// Each attempt is bounded by the per-attempt timeout (clamped to what is
/// left of the overall deadline). No wait is started unless at least
/// [`MIN_ATTEMPT_BUDGET`] of the overall deadline remains after it; the
/// last error is returned instead. Both the
/// attempt and the wait race the caller's [`CancellationToken`].
#[derive(Clone, Debug)]
pub struct RetryController {
    policy: RetryPolicy,
    attempt_timeout: Duration,
    overall_deadline: Option<Duration>,
}

impl RetryController {
    /// Creates a controller.
    #[must_use]
    pub const fn new(
        policy: RetryPolicy,
        attempt_timeout: Duration,
        overall_deadline: Option<Duration>,
    ) -> Self {
        Self {
            policy,
            attempt_timeout,
            overall_deadline,
        }
    }

    /// Returns the backoff policy.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `attempt` until it succeeds or a terminal failure occurs.
    ///
    /// `attempt` receives the 1-based attempt number.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's error unchanged when it is terminal, when
    /// retries are exhausted, or when the overall deadline leaves no room
    /// for another wait. Returns [`HttpError::Cancelled`] if `cancel` fires.
    pub async fn execute<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> Result<T, HttpError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, HttpError>>,
    {
        let deadline = self
            .overall_deadline
            .and_then(|d| Instant::now().checked_add(d));
        let mut state = RetryState::default();

        loop {
            state.attempt += 1;

            let budget = deadline.map_or(self.attempt_timeout, |d| {
                self.attempt_timeout
                    .min(d.saturating_duration_since(Instant::now()))
            });

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!(attempt = state.attempt, "request cancelled during attempt");
                    return Err(HttpError::Cancelled);
                }
                res = tokio::time::timeout(budget, attempt(state.attempt)) => res,
            };

            let error = match outcome {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(error)) => error,
                Err(_) => ClassifiedError::timeout(format!(
                    "attempt {} did not complete within {budget:?}",
                    state.attempt
                ))
                .into(),
            };

            let delay = match self.policy.decide(&error, state.retries_used) {
                RetryDecision::Stop => {
                    if state.retries_used >= self.policy.max_retries
                        && error.kind().is_some_and(|k| k.is_transient())
                    {
                        tracing::warn!(
                            attempts = state.attempt,
                            "giving up after exhausting retries: {error}"
                        );
                    }
                    return Err(error);
                }
                RetryDecision::Throttled(delay) => {
                    state.throttled += 1;
                    delay
                }
                RetryDecision::Backoff(delay) => {
                    state.retries_used += 1;
                    delay
                }
            };

            if let Some(deadline) = deadline {
                let floor = MIN_ATTEMPT_BUDGET.min(self.attempt_timeout);
                let next_start = Instant::now().checked_add(delay.saturating_add(floor));
                if next_start.map_or(true, |end| end > deadline) {
                    tracing::warn!(
                        attempts = state.attempt,
                        ?delay,
                        "overall deadline leaves no room for another attempt: {error}"
                    );
                    return Err(error);
                }
            }

            tracing::debug!(
                attempt = state.attempt,
                retries_used = state.retries_used,
                throttled = state.throttled,
                ?delay,
                "retrying after failure: {error}"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!(attempt = state.attempt, "request cancelled during backoff");
                    return Err(HttpError::Cancelled);
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}

impl Default for RetryController {
    fn default() -> Self {
        Self::new(
            RetryPolicy::default(),
            Duration::from_secs(30),
            Some(Duration::from_secs(300)),
        )
    }
}

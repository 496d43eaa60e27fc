//! Retry with jittered exponential backoff
//!
//! ```text
//!            ┌──────────────────────────────┐
//!            ▼                              │ sleep(delay(n))
//! Idle ──► Running ──► Succeeded            │
//!            │                              │
//!            ├── transient, n < max ──► FailedRetrying
//!            │
//!            └── otherwise ──────────► Exhausted
//! ```
//!
//! Only errors classified by [`Error::is_transient`] are retried. A value
//! returned by the operation (including a failed `SyncResult`) ends the
//! invocation as `Succeeded`.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::events::{EventSink, SyncEvent};

/// Largest exponent applied to the base delay
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Per-invocation retry state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    Running { attempt: u32 },
    FailedRetrying { attempt: u32, delay: Duration },
    Succeeded { attempts: u32 },
    Exhausted { attempts: u32 },
}

impl RetryState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Exhausted { .. })
    }
}

/// Bounded retry around one operation
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_retry_attempts: u32,
    base_delay: Duration,
    use_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry_attempts: 3,
            base_delay: Duration::from_secs(2),
            use_jitter: true,
        }
    }
}

impl RetryPolicy {
    /// `max_retry_attempts` retries after the first attempt, starting at `base_delay`
    pub fn new(max_retry_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_retry_attempts,
            base_delay,
            use_jitter: true,
        }
    }

    pub fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    pub fn max_retry_attempts(&self) -> u32 {
        self.max_retry_attempts
    }

    /// Delay before retry `retry` (1-based) without jitter: `base * 2^(retry-1)`
    pub fn nominal_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Delay before retry `retry`, jittered into `[0.5, 1.5)` of nominal when enabled
    pub fn delay_for(&self, retry: u32) -> Duration {
        let nominal = self.nominal_delay(retry);
        if !self.use_jitter || nominal.is_zero() {
            return nominal;
        }
        let factor: f64 = rand::thread_rng().gen_range(0.5..1.5);
        // mul_f64 panics past Duration::MAX
        Duration::try_from_secs_f64(nominal.as_secs_f64() * factor).unwrap_or(Duration::MAX)
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out
    ///
    /// `op` receives the 0-based attempt number. Cancellation during a
    /// backoff sleep ends the invocation with `Error::Cancelled`.
    pub async fn execute<T, F, Fut>(
        &self,
        events: &EventSink,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut state = RetryState::Idle;
        let mut attempt = 0;

        loop {
            state = transition(state, RetryState::Running { attempt });

            let err = match op(attempt).await {
                Ok(value) => {
                    transition(state, RetryState::Succeeded { attempts: attempt + 1 });
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_transient() || attempt >= self.max_retry_attempts {
                transition(state, RetryState::Exhausted { attempts: attempt + 1 });
                if err.is_transient() {
                    error!("Giving up after {} attempts: {}", attempt + 1, err);
                    events.emit(SyncEvent::RetryExhausted {
                        attempts: attempt + 1,
                        error: err.to_string(),
                    });
                }
                return Err(err);
            }

            attempt += 1;
            let delay = self.delay_for(attempt);
            state = transition(state, RetryState::FailedRetrying { attempt, delay });

            warn!(
                "Retry {} after {}ms due to {}",
                attempt,
                delay.as_millis(),
                err
            );
            events.emit(SyncEvent::RetryScheduled {
                attempt,
                delay,
                error: err.to_string(),
            });

            tokio::select! {
                _ = cancel.cancelled() => {
                    transition(state, RetryState::Exhausted { attempts: attempt });
                    return Err(Error::cancelled("retry backoff cancelled"));
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

fn transition(from: RetryState, to: RetryState) -> RetryState {
    debug!(?from, ?to, "retry state");
    to
}

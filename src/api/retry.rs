//! Retry policy with exponential backoff
//!
//! Delay for attempt `n` (1-indexed) is `min(initial * 2^(n-1), max)`, plus
//! up to 25% random jitter when enabled. A call stops retrying when it runs
//! out of attempts or when the next delay would push it past `max_elapsed`.

use crate::error::Error;
use rand::Rng;
use reqwest::Method;
use std::time::Duration;
use tokio::time::Instant;

/// Retry configuration, part of the effective configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries including the first one (at least 1)
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Wall-clock budget across all attempts and sleeps
    pub max_elapsed: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            max_elapsed: Duration::from_secs(60),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Fast backoff for tests (1ms initial, 20ms max, no jitter)
    pub fn fast(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(20),
            max_elapsed: Duration::from_secs(30),
            jitter: false,
        }
    }

    /// Backoff before retry number `retry` (1 = first retry)
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(31);
        let base = self
            .initial_backoff
            .saturating_mul(1u32 << exp)
            .min(self.max_backoff);

        if self.jitter && !base.is_zero() {
            let extra = rand::thread_rng().gen_range(0.0..0.25);
            base.mul_f64(1.0 + extra).min(self.max_backoff)
        } else {
            base
        }
    }
}

/// GET, HEAD, PUT, DELETE and OPTIONS may be repeated safely
pub fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
    )
}

/// Whether a failed attempt may be retried.
///
/// Idempotent requests retry on any transient failure (network error, 429,
/// 5xx). Non-idempotent requests only retry when the server cannot have acted
/// on them: the connection was never established, or it answered 429.
pub fn is_retryable(method: &Method, error: &Error) -> bool {
    if is_idempotent(method) {
        return error.is_transient();
    }
    match error {
        Error::Transport(err) => err.is_connect(),
        Error::Api(api) => api.status == reqwest::StatusCode::TOO_MANY_REQUESTS,
        _ => false,
    }
}

/// Attempt bookkeeping for one call
#[derive(Debug)]
pub struct RetryState<'a> {
    policy: &'a RetryPolicy,
    started: Instant,
    attempts: u32,
}

impl<'a> RetryState<'a> {
    pub fn new(policy: &'a RetryPolicy) -> Self {
        Self {
            policy,
            started: Instant::now(),
            attempts: 0,
        }
    }

    /// Record the start of an attempt and return its 1-indexed number
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay before the next attempt, or `None` when the budget is spent.
    /// A server-provided `Retry-After` replaces the computed backoff.
    pub fn next_delay(&self, retry_after: Option<Duration>) -> Option<Duration> {
        if self.attempts >= self.policy.max_attempts.max(1) {
            return None;
        }
        let delay = retry_after
            .map(|d| d.min(self.policy.max_backoff))
            .unwrap_or_else(|| self.policy.backoff(self.attempts));

        if self.started.elapsed() + delay > self.policy.max_elapsed {
            tracing::debug!(
                "Retry budget of {:?} would be exceeded, giving up",
                self.policy.max_elapsed
            );
            return None;
        }
        Some(delay)
    }
}

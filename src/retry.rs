use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// What a single request attempt came back with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// 429, 5xx or a transport failure.
    Retryable,
    /// Anything else; retrying would not help.
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// About to make attempt `k` (1-indexed).
    Attempting(u32),
    Success,
    Exhausted,
}

/// Only 429 and 5xx are worth another attempt. Any other non-2xx, 404 and
/// 403 included, ends the request at once instead of being retried.
pub fn classify_status(status: StatusCode) -> Outcome {
    if status.is_success() {
        Outcome::Success
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Outcome::Retryable
    } else {
        Outcome::Fatal
    }
}

/// Bounded exponential backoff. Each request owns its own budget; nothing
/// carries over between requests.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_attempts: u32,
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, max_attempts: u32, max_jitter: Duration) -> Self {
        Self {
            base_delay,
            max_attempts: max_attempts.max(1),
            max_jitter,
        }
    }

    /// Wait after failed attempt `k`: `base_delay * 2^(k-1)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Jitter never exceeds `base_delay`, so the wait before attempt k+1 is
    /// never shorter than the wait before attempt k.
    pub fn jitter_cap(&self) -> Duration {
        self.max_jitter.min(self.base_delay)
    }

    pub fn jittered_backoff<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let cap_micros = self.jitter_cap().as_micros() as u64;
        let jitter = if cap_micros == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(rng.random_range(0..=cap_micros))
        };
        self.backoff(attempt).saturating_add(jitter)
    }

    /// Advance the state machine after attempt `k` finished with `outcome`.
    /// Fatal outcomes exhaust immediately.
    pub fn step(&self, attempt: u32, outcome: Outcome) -> RetryState {
        match outcome {
            Outcome::Success => RetryState::Success,
            Outcome::Fatal => RetryState::Exhausted,
            Outcome::Retryable if attempt >= self.max_attempts => RetryState::Exhausted,
            Outcome::Retryable => RetryState::Attempting(attempt + 1),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(250),
            DEFAULT_MAX_ATTEMPTS,
            Duration::from_millis(100),
        )
    }
}

//! Bounded backoff for root publication.
//!
//! Only transient failures are retried, and never more than `max_attempts`
//! times in total. Delays grow according to the backoff strategy, are capped
//! at `max_delay`, and are jittered so that several publishers recovering
//! from the same outage do not hit the node in lockstep.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::PublishError;

/// Retry policy for ledger calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Upper bound on any single delay.
    pub max_delay: Duration,

    /// Jitter as a fraction of the delay (0.0 to 1.0).
    pub jitter_factor: f64,

    /// How delays grow between attempts.
    pub backoff_strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter_factor: 0.2,
            backoff_strategy: BackoffStrategy::Exponential,
        }
    }
}

/// Strategy for calculating retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// Same delay every time.
    Fixed,
    /// Delay doubles each attempt.
    Exponential,
    /// Delay grows by `base_delay` each attempt.
    Linear,
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after `delay`.
    Retry {
        /// How long to wait before the next attempt.
        delay: Duration,
    },
    /// Stop retrying.
    GiveUp {
        /// Why no further attempt will be made.
        reason: String,
    },
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    /// Decides whether to retry after `attempt` (1-based) failed with
    /// `error`.
    pub fn decide(&self, attempt: u32, error: &PublishError) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::GiveUp { reason: format!("non-retryable error: {error}") };
        }
        if attempt >= self.max_attempts {
            return RetryDecision::GiveUp {
                reason: format!("maximum attempts ({}) exceeded", self.max_attempts),
            };
        }

        RetryDecision::Retry { delay: self.delay_for_attempt(attempt) }
    }

    /// Delay to wait after the given failed attempt (1-based), with jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay_for_attempt(attempt);
        std::cmp::min(apply_jitter(base, self.jitter_factor), self.max_delay)
    }

    fn base_delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = match self.backoff_strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Linear => self.base_delay.saturating_mul(attempt.max(1)),
            BackoffStrategy::Exponential => {
                let exponent = attempt.saturating_sub(1).min(20);
                self.base_delay.saturating_mul(2_u32.saturating_pow(exponent))
            },
        };
        std::cmp::min(delay, self.max_delay)
    }
}

/// Randomizes `duration` by up to ±`jitter_factor`.
fn apply_jitter(duration: Duration, jitter_factor: f64) -> Duration {
    if jitter_factor <= 0.0 || duration.is_zero() {
        return duration;
    }

    let clamped = jitter_factor.clamp(0.0, 1.0);
    let range = duration.as_secs_f64() * clamped;
    let offset = rand::rng().random_range(-range..=range);

    Duration::from_secs_f64((duration.as_secs_f64() + offset).max(0.0))
}

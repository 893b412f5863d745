//! Retry policy for async deliveries.

use rand::Rng;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::function::FunctionError;

/// How often and how patiently a failed delivery is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base: Duration,
    cap: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base: Duration, cap: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base,
            cap: cap.max(base),
        }
    }

    /// A policy that gives up after the first failure.
    pub fn never() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait before the next attempt, or `None` when the delivery should be abandoned.
    ///
    /// `attempt` is the 1-based number of the attempt that just failed.
    pub fn next_delay(&self, attempt: u32, error: &FunctionError) -> Option<Duration> {
        if !error.is_retryable() || attempt >= self.max_attempts {
            return None;
        }
        Some(self.backoff(attempt))
    }

    /// Doubling delay from `base`, capped, plus up to 10% jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        let delay = self.base.saturating_mul(factor).min(self.cap);

        let spread = delay.as_millis() as u64 / 10;
        if spread == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::thread_rng().gen_range(0..spread))
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.attempts(),
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }
}

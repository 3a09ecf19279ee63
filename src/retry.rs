//! Pause policy applied after failed deliveries.
//!
//! A failed document is never redelivered. The policy only decides how long
//! the sampling loop waits before its next cycle.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the loop paces itself after delivery failures.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Wait the normal cadence interval regardless of failures.
    #[default]
    DropAndContinue,
    /// Wait a fixed delay after each failure.
    FixedDelay { delay_ms: u64 },
    /// Double the wait on each consecutive failure, up to `max_ms`.
    ExponentialBackoff { initial_ms: u64, max_ms: u64 },
}

impl RetryPolicy {
    /// Returns the pause before the next cycle.
    ///
    /// `consecutive_failures` is zero after a successful delivery.
    pub fn delay(&self, interval: Duration, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return interval;
        }
        match *self {
            RetryPolicy::DropAndContinue => interval,
            RetryPolicy::FixedDelay { delay_ms } => Duration::from_millis(delay_ms),
            RetryPolicy::ExponentialBackoff { initial_ms, max_ms } => {
                let shift = (consecutive_failures - 1).min(63);
                let backoff = initial_ms.saturating_mul(1u64 << shift).min(max_ms);
                Duration::from_millis(backoff).max(interval)
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RetryPolicy::DropAndContinue => "drop and continue".to_string(),
            RetryPolicy::FixedDelay { delay_ms } => format!("fixed delay {}ms", delay_ms),
            RetryPolicy::ExponentialBackoff { initial_ms, max_ms } => {
                format!("exponential backoff {}ms..{}ms", initial_ms, max_ms)
            }
        }
    }
}

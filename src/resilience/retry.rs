use crate::error::CanonicalError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay growth between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Backoff {
    /// `base * (attempt + 1)`
    #[default]
    Linear,
    /// `base * 2^attempt`, capped at `max_delay_ms`
    Exponential { max_delay_ms: u64 },
}

/// How to proceed after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Retry { delay: Duration },
    Fail,
}

/// Retry controller.
///
/// Only `Timeout` and `NetworkError` are retried. `max_retries` counts additional
/// attempts, so a call makes at most `max_retries + 1` attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            backoff: Backoff::Linear,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before the attempt following 0-based `attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis().min(u64::MAX as u128) as u64;
        let ms = match self.backoff {
            Backoff::Linear => base.saturating_mul(u64::from(attempt) + 1),
            Backoff::Exponential { max_delay_ms } => {
                let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
                base.saturating_mul(factor).min(max_delay_ms)
            }
        };
        Duration::from_millis(ms)
    }

    /// Decide what to do after 0-based `attempt` failed with `err`.
    pub fn decide(&self, err: &CanonicalError, attempt: u32) -> Decision {
        if err.is_retryable() && attempt < self.max_retries {
            Decision::Retry {
                delay: self.backoff_delay(attempt),
            }
        } else {
            Decision::Fail
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(0, Duration::from_millis(250))
    }
}

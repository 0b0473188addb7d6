//! Bounded retry with linear backoff.

use std::time::Duration;

use crate::config::MeshConfig;

/// Attempt budget and backoff shape shared by every delivery.
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
            cap,
        }
    }

    pub fn from_config(config: &MeshConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.backoff_base(),
            config.max_backoff(),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the `attempt`-th failure (1-based): proportional to the
    /// attempt number, never above the cap.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(attempt).min(self.cap)
    }
}

/// Retry bookkeeping for a single job.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempts: u32,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempts
    }

    pub fn exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }

    pub fn next_delay(&self) -> Duration {
        self.policy.delay_after(self.attempts)
    }
}

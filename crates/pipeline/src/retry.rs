//! Per-step retry policy.

use std::time::Duration;

/// How the delay between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed,
    /// Delay grows linearly with the number of failures.
    Linear,
}

/// Bounded retry policy for one step.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt. `0` means execute exactly once.
    pub limit: u32,
    /// Base delay between attempts.
    pub delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Execute exactly once; any failure is final.
    pub fn none() -> Self {
        Self {
            limit: 0,
            delay: Duration::ZERO,
            backoff: Backoff::Fixed,
        }
    }

    /// Policy for the image generation step: one retry after 10 seconds,
    /// growing linearly.
    pub fn image_generation() -> Self {
        Self {
            limit: 1,
            delay: Duration::from_secs(10),
            backoff: Backoff::Linear,
        }
    }

    /// Delay to wait after `failures` failed attempts (1-based).
    pub fn delay_for_attempt(&self, failures: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Linear => self.delay * failures,
        }
    }
}

//! Exponential backoff with jitter for provider requests.

use std::time::Duration;

/// Retry schedule applied to retryable provider failures.
///
/// Total attempts = `max_retries + 1`. Delay for attempt `n` (0-based) is
/// `base * factor^n`, capped at `max`, with optional +/- 50% jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base: Duration,
    pub factor: f64,
    pub max: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base: Duration::from_millis(250),
            factor: 2.0,
            max: Duration::from_secs(5),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Deterministic schedule for tests.
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            base: delay,
            factor: 1.0,
            max: delay,
            jitter: false,
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let scale = self.factor.powi(attempt as i32);
        let seconds = self.base.as_secs_f64() * scale;
        let mut delay = Duration::from_secs_f64(seconds.min(self.max.as_secs_f64()));

        if self.jitter {
            let half_ms = (delay.as_millis() as f64 * 0.5) as u64;
            let offset = fastrand::u64(0..=half_ms.saturating_mul(2));
            let total_ms = delay.as_millis() as i64 + (offset as i64 - half_ms as i64);
            delay = Duration::from_millis(total_ms.max(0) as u64);
        }

        delay
    }
}

//! Bounded exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;
use warren_core::error::ProviderError;

/// How many times to try, and how long to wait in between.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Upper bound of the wait after the `attempt`-th failure (1-based).
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    /// Jittered wait after the `attempt`-th failure.
    ///
    /// "Equal jitter": half the ceiling fixed, the other half random, so
    /// concurrent callers spread out without collapsing to zero.
    pub fn delay(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling(attempt).as_millis() as u64;
        let half = ceiling / 2;
        let jitter = if half == 0 {
            0
        } else {
            rand::rng().random_range(0..=half)
        };
        Duration::from_millis(ceiling - half + jitter)
    }

    /// Wait after a failure, honouring a provider's retry-after hint.
    pub fn delay_for(&self, attempt: u32, err: &ProviderError) -> Duration {
        let delay = self.delay(attempt);
        match err {
            ProviderError::RateLimited { retry_after_secs } => delay
                .max(Duration::from_secs(*retry_after_secs))
                .min(self.max_delay),
            _ => delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500), Duration::from_secs(8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_doubles_and_caps() {
        let p = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(500));
        assert_eq!(p.ceiling(1), Duration::from_millis(100));
        assert_eq!(p.ceiling(2), Duration::from_millis(200));
        assert_eq!(p.ceiling(3), Duration::from_millis(400));
        assert_eq!(p.ceiling(4), Duration::from_millis(500));
        assert_eq!(p.ceiling(40), Duration::from_millis(500));
    }

    #[test]
    fn delay_stays_within_bounds() {
        let p = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_secs(2));
        for attempt in 1..6 {
            let ceiling = p.ceiling(attempt);
            for _ in 0..50 {
                let d = p.delay(attempt);
                assert!(d <= ceiling, "{d:?} > {ceiling:?}");
                assert!(d >= ceiling / 2, "{d:?} < half of {ceiling:?}");
            }
        }
    }

    #[test]
    fn rate_limit_hint_is_capped() {
        let p = RetryPolicy::new(3, Duration::from_millis(10), Duration::from_secs(1));
        let d = p.delay_for(1, &ProviderError::RateLimited { retry_after_secs: 30 });
        assert_eq!(d, Duration::from_secs(1));
    }

    #[test]
    fn zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO, Duration::ZERO).max_attempts, 1);
        assert_eq!(RetryPolicy::none().delay(1), Duration::ZERO);
    }
}

//! Retry backoff policy.
//!
//! Failed uploads are re-attempted with exponential backoff plus jitter so a
//! recovering server is not hammered in lockstep by every queued mutation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Exponential backoff configuration for failed uploads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Upper bound for the computed delay
    pub max_delay: Duration,
    /// Growth factor between consecutive failures
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
            factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Deterministic delay for the given failure count (1-based), capped at
    /// `max_delay`
    #[must_use]
    pub fn delay_for(&self, failures: u32) -> Duration {
        let mut delay = self.initial_delay;
        // Growth is capped, so iterating a bounded number of times is enough
        for _ in 1..failures.min(32) {
            delay = delay.mul_f64(self.factor).min(self.max_delay);
        }
        delay.min(self.max_delay)
    }

    /// Delay with equal jitter: at least half the deterministic delay, at
    /// most the full delay
    #[must_use]
    pub fn jittered_delay_for(&self, failures: u32) -> Duration {
        let delay = self.delay_for(failures);
        let half = delay / 2;
        half + half.mul_f64(rand::random::<f64>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_exponentially() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(2), Duration::from_secs(10));
        assert_eq!(policy.delay_for(3), Duration::from_secs(20));
        assert_eq!(policy.delay_for(4), Duration::from_secs(40));
    }

    #[test]
    fn delay_caps_at_max() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(10), Duration::from_secs(300));
        assert_eq!(policy.delay_for(1_000), Duration::from_secs(300));
    }

    #[test]
    fn zero_failures_uses_initial_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(5));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = RetryPolicy::default();
        for failures in 1..6 {
            let deterministic = policy.delay_for(failures);
            for _ in 0..20 {
                let jittered = policy.jittered_delay_for(failures);
                assert!(jittered >= deterministic / 2);
                assert!(jittered <= deterministic);
            }
        }
    }
}

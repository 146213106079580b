//! Retry backoff policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Automatic retry budget and exponential backoff schedule.
///
/// The n-th scheduled retry waits `base_delay * 2^(n-1)`, so the defaults
/// yield 0.8 s, 1.6 s, 3.2 s. `max_delay` only matters for configurations
/// with more retries or a larger base than the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Automatic retries per failure streak. Manual retries are not counted.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first automatic retry, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for any single delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    800
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Delay for the retry about to be scheduled, given how many retries the
    /// current failure streak has already scheduled.
    pub fn delay_for(&self, completed_retries: u32) -> Duration {
        // cap the exponent so the shift cannot overflow
        let exponent = completed_retries.min(20);
        let millis = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(millis)
    }

    /// Validate policy values.
    ///
    /// Returns a description of the first problem found, if any.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.base_delay_ms == 0 {
            return Err("base_delay_ms must be greater than zero".to_string());
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err("max_delay_ms must be at least base_delay_ms".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_doubles_from_800ms() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(800));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1600));
        assert_eq!(policy.delay_for(2), Duration::from_millis(3200));
    }

    #[test]
    fn nth_retry_waits_base_times_two_to_the_n_minus_one() {
        let policy = RetryPolicy::default();
        for n in 1..=3u32 {
            let expected = Duration::from_millis(800 * 2u64.pow(n - 1));
            assert_eq!(policy.delay_for(n - 1), expected);
        }
    }

    #[test]
    fn schedule_is_strictly_increasing_until_the_cap() {
        let policy = RetryPolicy {
            max_retries: 8,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
        };
        let mut previous = Duration::ZERO;
        for n in 0..5 {
            let delay = policy.delay_for(n);
            assert!(delay > previous, "delay did not grow at retry {n}");
            previous = delay;
        }
        assert_eq!(policy.delay_for(5), Duration::from_millis(10_000));
        assert_eq!(policy.delay_for(6), Duration::from_millis(10_000));
    }

    #[test]
    fn huge_retry_counts_do_not_overflow() {
        let policy = RetryPolicy {
            max_retries: u32::MAX,
            base_delay_ms: u64::MAX / 2,
            max_delay_ms: u64::MAX,
        };
        let delay = policy.delay_for(u32::MAX);
        assert!(delay <= Duration::from_millis(u64::MAX));
    }

    #[test]
    fn validation_rejects_degenerate_delays() {
        let policy = RetryPolicy {
            base_delay_ms: 0,
            ..RetryPolicy::default()
        };
        assert!(policy.validate().is_err());

        let policy = RetryPolicy {
            base_delay_ms: 1000,
            max_delay_ms: 500,
            ..RetryPolicy::default()
        };
        assert!(policy.validate().is_err());

        assert!(RetryPolicy::default().validate().is_ok());
    }

    #[test]
    fn policy_deserializes_with_defaults() {
        let policy: RetryPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy, RetryPolicy::default());

        let policy: RetryPolicy = serde_json::from_str(r#"{"max_retries": 5}"#).unwrap();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.base_delay_ms, 800);
    }
}

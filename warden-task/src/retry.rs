//! Exponential backoff with jitter (base 2s, cap 32s by default).

use crate::RetryPolicy;
use rand::Rng;
use std::time::Duration;

/// Delay before attempt `next_attempt` (1-based), full-jitter between
/// zero and the exponential backoff ceiling for that attempt.
pub fn backoff_delay(policy: &RetryPolicy, next_attempt: u32) -> Duration {
    let exponent = next_attempt.saturating_sub(1).min(16);
    let ceiling = policy
        .base_delay
        .saturating_mul(1u32.checked_shl(exponent).unwrap_or(u32::MAX))
        .min(policy.max_delay);
    let jitter_fraction: f64 = rand::thread_rng().gen_range(0.0..=1.0);
    ceiling.mul_f64(jitter_fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_never_exceeds_cap() {
        let policy = RetryPolicy::default();
        for attempt in 1..=10 {
            let delay = backoff_delay(&policy, attempt);
            assert!(delay <= policy.max_delay);
        }
    }

    #[test]
    fn delay_grows_with_attempt_on_average() {
        let policy = RetryPolicy::default();
        let sample = |attempt| {
            let total = (0..200).fold(Duration::ZERO, |acc, _| acc + backoff_delay(&policy, attempt));
            total / 200
        };
        assert!(sample(1) < sample(3));
    }
}

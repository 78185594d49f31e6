use std::time::Duration;

/// Backoff schedule for collector probes.
///
/// Probing never gives up; only the wait between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// First attempt number that waits `max_delay` instead of doubling.
    pub cap_after: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(15),
            max_delay: Duration::from_secs(60 * 60),
            cap_after: 8,
        }
    }
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration, cap_after: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            cap_after,
        }
    }

    /// Wait before retry number `attempt`: zero for the first attempt,
    /// `base * 2^attempt` up to `cap_after`, then `max_delay`.
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        if attempt >= self.cap_after {
            return self.max_delay;
        }

        2u32.checked_pow(attempt)
            .and_then(|multiplier| self.base_delay.checked_mul(multiplier))
            .unwrap_or(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_doubles_then_caps() {
        let policy = RetryPolicy::default();
        let secs: Vec<u64> = (0..10).map(|n| policy.delay(n).as_secs()).collect();
        assert_eq!(secs, [0, 30, 60, 120, 240, 480, 960, 1920, 3600, 3600]);
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(3600));
    }

    #[test]
    fn custom_policy_uses_its_own_base() {
        let policy = RetryPolicy::new(Duration::from_millis(10), Duration::from_millis(100), 3);
        assert_eq!(policy.delay(1), Duration::from_millis(20));
        assert_eq!(policy.delay(2), Duration::from_millis(40));
        assert_eq!(policy.delay(3), Duration::from_millis(100));
    }

    #[test]
    fn overflowing_multiplier_falls_back_to_max() {
        let policy = RetryPolicy::new(Duration::from_secs(1), Duration::from_secs(5), 100);
        assert_eq!(policy.delay(40), Duration::from_secs(5));
    }
}

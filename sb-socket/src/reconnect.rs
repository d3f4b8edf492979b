//! Reconnection policy: linear backoff with an attempt ceiling.

use std::time::Duration;

/// Tracks consecutive reconnect attempts for one client.
///
/// Attempt N waits `base_delay * N`. Once `max_attempts` attempts have been
/// scheduled without a successful open, the policy is exhausted until
/// [`reset`](Self::reset) is called.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    attempts: u32,
    max_attempts: u32,
    base_delay: Duration,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            base_delay,
        }
    }

    /// Claim the next attempt.
    ///
    /// Returns the 1-based attempt number and the delay before it, or `None`
    /// when the ceiling has been reached.
    pub fn next_attempt(&mut self) -> Option<(u32, Duration)> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some((self.attempts, self.base_delay * self.attempts))
    }

    /// Forget past attempts (successful open or manual connect).
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use sb_core::config::RealtimeConfig;

    #[test]
    fn test_linear_delay_sequence() {
        let config = RealtimeConfig::default();
        let mut policy =
            ReconnectPolicy::new(config.max_reconnect_attempts, config.reconnect_delay());
        let delays: Vec<_> = std::iter::from_fn(|| policy.next_attempt()).collect();
        assert_eq!(
            delays,
            vec![
                (1, Duration::from_secs(3)),
                (2, Duration::from_secs(6)),
                (3, Duration::from_secs(9)),
                (4, Duration::from_secs(12)),
                (5, Duration::from_secs(15)),
            ]
        );
        assert_eq!(policy.next_attempt(), None);
        assert_eq!(policy.attempts(), 5);
    }

    #[test]
    fn test_reset_rearms() {
        let mut policy = ReconnectPolicy::new(2, Duration::from_millis(100));
        policy.next_attempt();
        policy.next_attempt();
        assert_eq!(policy.next_attempt(), None);

        policy.reset();
        assert_eq!(policy.attempts(), 0);
        assert_eq!(policy.next_attempt(), Some((1, Duration::from_millis(100))));
    }

    #[test]
    fn test_zero_attempts_never_reconnects() {
        let mut policy = ReconnectPolicy::new(0, Duration::from_secs(1));
        assert_eq!(policy.next_attempt(), None);
    }
}

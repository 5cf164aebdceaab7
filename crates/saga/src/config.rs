//! Retry and timeout configuration for operation invocations.

use std::time::Duration;

/// Exponential backoff retry policy applied to every operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,

    /// Delay before the second attempt.
    pub initial_interval: Duration,

    /// Cap for exponential growth.
    pub maximum_interval: Duration,

    /// Multiplier applied per attempt (typically 2.0).
    pub backoff_coefficient: f64,
}

impl RetryPolicy {
    /// 3 attempts with 1s and 2s delays between them, capped at 10s.
    pub const DEFAULT: Self = Self {
        max_attempts: 3,
        initial_interval: Duration::from_secs(1),
        maximum_interval: Duration::from_secs(10),
        backoff_coefficient: 2.0,
    };

    pub fn new(
        max_attempts: u32,
        initial_interval: Duration,
        maximum_interval: Duration,
        backoff_coefficient: f64,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_interval,
            maximum_interval,
            backoff_coefficient,
        }
    }

    /// Computes the delay after the given failed attempt (1-indexed).
    ///
    /// `initial_interval * backoff_coefficient^(attempt - 1)`, capped at
    /// `maximum_interval`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let multiplier = self.backoff_coefficient.powi(exponent);
        let delay_secs = self.initial_interval.as_secs_f64() * multiplier;
        let capped_secs = delay_secs.min(self.maximum_interval.as_secs_f64());
        Duration::from_secs_f64(capped_secs.max(0.0))
    }

    /// Returns an iterator over the delays between attempts.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..self.max_attempts).map(|attempt| self.delay_for_attempt(attempt))
    }

    /// Computes the total backoff time if every attempt fails.
    pub fn total_max_wait(&self) -> Duration {
        self.delays().sum()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Configuration of the operation executor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutorConfig {
    /// Bound on a single attempt, from start to close.
    pub start_to_close_timeout: Duration,

    pub retry: RetryPolicy,
}

impl ExecutorConfig {
    pub const DEFAULT: Self = Self {
        start_to_close_timeout: Duration::from_secs(5 * 60),
        retry: RetryPolicy::DEFAULT,
    };

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.start_to_close_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_delays() {
        let policy = RetryPolicy::DEFAULT;
        let delays: Vec<_> = policy.delays().collect();
        assert_eq!(delays, vec![Duration::from_secs(1), Duration::from_secs(2)]);
        assert_eq!(policy.total_max_wait(), Duration::from_secs(3));
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy::new(
            8,
            Duration::from_secs(1),
            Duration::from_secs(10),
            2.0,
        );
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(8));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(10));
        assert_eq!(policy.delay_for_attempt(7), Duration::from_secs(10));
    }

    #[test]
    fn at_least_one_attempt() {
        let policy = RetryPolicy::new(0, Duration::ZERO, Duration::ZERO, 2.0);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.delays().count(), 0);
    }

    #[test]
    fn default_executor_config() {
        let config = ExecutorConfig::default();
        assert_eq!(config.start_to_close_timeout, Duration::from_secs(300));
        assert_eq!(config.retry, RetryPolicy::DEFAULT);

        let config = config.with_timeout(Duration::from_millis(50));
        assert_eq!(config.start_to_close_timeout, Duration::from_millis(50));
    }
}

//! Rate-limit backoff policy.
//!
//! Only HTTP 429 is retried. The delay honours a numeric `Retry-After` header
//! (seconds) and otherwise doubles a base delay per attempt.

use std::time::Duration;

use pathcoach_config::RetryConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per request, counting the first one
    pub max_attempts: u32,
    /// Delay before the second attempt when the service gives no hint
    pub base_delay: Duration,
    /// Delay used when `Retry-After` is present but not a whole number
    pub unparseable_hint_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            unparseable_hint_delay: Duration::from_millis(config.unparseable_retry_after_ms),
        }
    }

    /// How long to wait after a 429 on the zero-based `attempt`.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<&str>) -> Duration {
        match retry_after {
            Some(hint) => match hint.trim().parse::<u64>() {
                Ok(secs) => Duration::from_secs(secs),
                Err(_) => self.unparseable_hint_delay,
            },
            None => self.base_delay.saturating_mul(2u32.saturating_pow(attempt)),
        }
    }
}

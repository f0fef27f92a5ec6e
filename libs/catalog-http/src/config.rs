//! Retry configuration (§4.D, §6 `retryConfig`).

use std::time::Duration;

/// `{max_attempts, base_delay_ms, max_delay_ms, enable_jitter}` (§6).
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub enable_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 30_000,
            enable_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Deterministic config for tests: no jitter, tiny delays.
    #[must_use]
    pub fn deterministic(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 50,
            enable_jitter: false,
        }
    }

    #[must_use]
    pub fn base_delay(self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    #[must_use]
    pub fn max_delay(self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

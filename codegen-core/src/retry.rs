// codegen-core/src/retry.rs

//! Retry policy for the result relay.
//!
//! Remote relay copies ride over ssh and fail transiently; the
//! publisher retries them with exponential backoff and jitter before
//! giving up and leaving the local result file in place.

use std::time::Duration;

use crate::config::RelayConfig;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier applied per attempt.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl From<&RelayConfig> for RetryConfig {
    fn from(relay: &RelayConfig) -> Self {
        Self {
            max_retries: relay.max_retries,
            initial_delay: Duration::from_millis(relay.retry_delay_ms),
            max_delay: Duration::from_millis(relay.max_retry_delay_ms),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Creates a retry configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculates the delay before the given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt >= self.max_retries {
            return Duration::ZERO;
        }

        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        let final_delay = if self.jitter {
            // Up to 25% deterministic jitter keyed on the attempt.
            capped * (1.0 + rand_simple(attempt) * 0.25)
        } else {
            capped
        };

        Duration::from_secs_f64(final_delay)
    }

    /// Returns true if another attempt is allowed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// Deterministic pseudo-random value in [0, 1) derived from the seed.
fn rand_simple(seed: u32) -> f64 {
    let x = seed.wrapping_mul(1103515245).wrapping_add(12345);
    f64::from(x) / f64::from(u32::MAX)
}

/// Retry state machine with capped exponential backoff
///
/// The coordinator only decides; it never sleeps. Callers read `backoff_ms()`
/// (or a jittered copy of it) and schedule the next attempt themselves.
use crate::clamp::at_least_one;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Exponent cap for `base * 2^n`, keeps the backoff from overflowing
pub const MAX_BACKOFF_EXPONENT: u32 = 6;

/// Multiplicative jitter range applied on read (±30%)
const JITTER_RANGE: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of failed attempts before giving up (0 is treated as 1)
    pub max_attempts: u32,
    /// Backoff after the first failure
    pub base_backoff_ms: u64,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, base_backoff_ms: u64) -> Self {
        Self {
            max_attempts,
            base_backoff_ms,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryCoordinator {
    max_attempts: u32,
    base_backoff_ms: u64,
    current_attempt: u32,
    consecutive_successes: u32,
    current_backoff_ms: u64,
    total_retries: u64,
}

impl RetryCoordinator {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            max_attempts: at_least_one(config.max_attempts),
            base_backoff_ms: config.base_backoff_ms,
            current_attempt: 0,
            consecutive_successes: 0,
            current_backoff_ms: config.base_backoff_ms,
            total_retries: 0,
        }
    }

    pub fn record_attempt(&mut self, success: bool) {
        if success {
            self.current_attempt = 0;
            self.current_backoff_ms = self.base_backoff_ms;
            self.consecutive_successes = self.consecutive_successes.saturating_add(1);
            return;
        }

        self.current_attempt = self.current_attempt.saturating_add(1);
        self.total_retries = self.total_retries.saturating_add(1);
        self.consecutive_successes = 0;
        self.current_backoff_ms = backoff_for_attempt(self.base_backoff_ms, self.current_attempt);

        debug!(
            attempt = self.current_attempt,
            max_attempts = self.max_attempts,
            backoff_ms = self.current_backoff_ms,
            "Retry attempt failed"
        );
    }

    /// Strict: once `max_attempts` failures are recorded no retry is allowed.
    pub fn should_retry(&self) -> bool {
        self.current_attempt < self.max_attempts
    }

    pub fn backoff_ms(&self) -> u64 {
        self.current_backoff_ms
    }

    /// Current backoff with ±30% jitter. The stored backoff is unchanged.
    pub fn jittered_backoff_ms(&self) -> u64 {
        self.jittered_backoff_ms_with(&mut rand::thread_rng())
    }

    pub fn jittered_backoff_ms_with<R: Rng>(&self, rng: &mut R) -> u64 {
        let jitter_factor = 1.0 + rng.gen_range(-JITTER_RANGE..JITTER_RANGE);
        (self.current_backoff_ms as f64 * jitter_factor) as u64
    }

    pub fn current_attempt(&self) -> u32 {
        self.current_attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes
    }

    /// Lifetime count of failed attempts, never reset
    pub fn total_retries(&self) -> u64 {
        self.total_retries
    }
}

impl Default for RetryCoordinator {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

/// `base * 2^min(attempt - 1, 6)`, saturating
pub fn backoff_for_attempt(base_backoff_ms: u64, attempt: u32) -> u64 {
    let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    base_backoff_ms.saturating_mul(1u64 << exponent)
}

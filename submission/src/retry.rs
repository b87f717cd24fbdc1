//! Retry policy: exponential backoff with a ceiling.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default total attempts per submission.
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default first backoff (ms).
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;
/// Default backoff ceiling (ms).
const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;
/// Default per-attempt timeout (ms).
const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 15_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub attempt_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
            attempt_timeout_ms: DEFAULT_ATTEMPT_TIMEOUT_MS,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn no_retry(attempt_timeout_ms: u64) -> Self {
        Self {
            max_attempts: 1,
            attempt_timeout_ms,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0 for the first retry).
    pub fn backoff_ms(&self, retry: u32) -> u64 {
        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        self.initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    /// Whether another attempt is allowed after `attempts_made`.
    pub fn allows_another(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}

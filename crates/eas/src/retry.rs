//! Caller-driven retry with exponential backoff
//!
//! The sync core never retries on its own. Callers that own the worker
//! thread wrap backend calls in [`with_retry`].

use log::warn;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::EasResult;

/// Backoff settings for retrying transient failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    /// Add up to 100ms of random jitter to each delay
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (0-based), without jitter
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        Duration::from_millis(delay.min(self.max_delay_ms as f64) as u64)
    }

    fn sleep_before_retry(&self, attempt: u32) {
        let mut delay = self.delay_for_attempt(attempt);
        if self.jitter {
            delay += Duration::from_millis(rand_jitter());
        }
        std::thread::sleep(delay);
    }
}

/// Run `op`, retrying only errors that are retryable
pub fn with_retry<T>(policy: &RetryPolicy, mut op: impl FnMut() -> EasResult<T>) -> EasResult<T> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt + 1 < attempts => {
                warn!("Attempt {} of {} failed: {}", attempt + 1, attempts, err);
                policy.sleep_before_retry(attempt);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Generate a random jitter value (0-100ms)
fn rand_jitter() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0),
    );
    hasher.finish() % 100
}

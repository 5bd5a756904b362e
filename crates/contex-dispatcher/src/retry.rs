//! Exponential backoff for webhook delivery. Shape (config struct, jittered
//! exponential delay, attempt counter) follows
//! `bravo1goingdark-ucfp`'s `resilience::retry`; the classification of which
//! responses are retryable is specialized to HTTP status codes instead of
//! string matching on error text.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub factor: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            factor: 2,
        }
    }
}

/// Delay before the next attempt, `0`-indexed by prior attempt count.
/// `±20%` jitter per the webhook retry policy.
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let base_ms = config.base_delay.as_millis() as u64;
    let exponential = base_ms.saturating_mul(config.factor.pow(attempt) as u64);
    let capped = exponential.min(config.max_delay.as_millis() as u64);

    let jitter_span = (capped as f64 * 0.2) as i64;
    let jitter = if jitter_span > 0 {
        fastrand::i64(-jitter_span..=jitter_span)
    } else {
        0
    };
    let jittered = (capped as i64 + jitter).max(0) as u64;
    Duration::from_millis(jittered)
}

/// A 4xx status other than 408/429 is a poisoned payload: retrying it can
/// never succeed, so it is excluded here.
pub fn is_retryable_status(status: u16) -> bool {
    if (200..300).contains(&status) {
        return false; // success, nothing to retry
    }
    if status == 408 || status == 429 {
        return true;
    }
    if (400..500).contains(&status) {
        return false;
    }
    true // 5xx and anything else transport-shaped
}

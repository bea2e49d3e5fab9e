//! Hourly send ceiling using the token bucket algorithm
//!
//! The bucket holds at most `per_hour` tokens and refills continuously at
//! `per_hour / 3600` tokens per second. Each recipient that reaches the retry
//! cycle consumes one token; when the bucket is empty the dispatch loop waits
//! for the next one.
//!
//! ```text
//! per_hour: 150
//! - Bucket starts with 150 tokens
//! - Refills at one token every 24 seconds
//! - Pacing delays alone (18-25s) rarely drain it
//! ```

use std::time::Duration;

use courier_common::{config::RateLimitConfig, tracing};
use tokio::time::Instant;

const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    /// Tokens added per second
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: u32, refill_rate: f64) -> Self {
        let capacity = f64::from(capacity);
        Self {
            tokens: capacity,
            capacity,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();

        self.tokens = elapsed.mul_add(self.refill_rate, self.tokens).min(self.capacity);
        self.last_refill = now;
    }

    fn try_consume(&mut self) -> bool {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn time_until_available(&mut self) -> Duration {
        self.refill();

        if self.tokens >= 1.0 {
            return Duration::ZERO;
        }

        Duration::from_secs_f64((1.0 - self.tokens) / self.refill_rate)
    }
}

/// Caps the number of recipients processed per rolling hour.
#[derive(Debug)]
pub struct HourlyRateLimiter {
    bucket: TokenBucket,
}

impl HourlyRateLimiter {
    /// A zero ceiling is treated as one send per hour.
    #[must_use]
    pub fn new(per_hour: u32) -> Self {
        let per_hour = per_hour.max(1);
        Self {
            bucket: TokenBucket::new(per_hour, f64::from(per_hour) / SECONDS_PER_HOUR),
        }
    }

    /// `None` when the configuration sets no ceiling.
    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Option<Self> {
        config.per_hour.map(Self::new)
    }

    /// Takes a token, or returns how long until one is available.
    ///
    /// # Errors
    ///
    /// Returns the wait time when the bucket is empty.
    pub fn try_acquire(&mut self) -> Result<(), Duration> {
        if self.bucket.try_consume() {
            Ok(())
        } else {
            let wait = self.bucket.time_until_available();
            tracing::debug!(
                wait_seconds = wait.as_secs_f64(),
                "Hourly ceiling reached, must wait"
            );
            Err(wait)
        }
    }

    /// Tokens currently available, after refilling.
    pub fn available(&mut self) -> f64 {
        self.bucket.refill();
        self.bucket.tokens
    }
}

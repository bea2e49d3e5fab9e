//! Throughput and recovery knobs for the dispatch loop.
//!
//! The defaults reproduce the behaviour the dispatcher has always had:
//! 18 to 25 seconds between recipients, a two minute breather every 50
//! confirmed sends, and three tries per recipient.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigurationError;

/// Inter-send delay and periodic extended pause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Lower bound of the uniform inter-send delay, in seconds.
    #[serde(default = "defaults::min_delay_secs")]
    pub min_delay_secs: f64,

    /// Upper bound of the uniform inter-send delay, in seconds.
    #[serde(default = "defaults::max_delay_secs")]
    pub max_delay_secs: f64,

    /// Take an extended pause every time this many sends have been confirmed.
    #[serde(default = "defaults::pause_every")]
    pub pause_every: u32,

    /// Length of the extended pause, in seconds.
    #[serde(default = "defaults::pause_secs")]
    pub pause_secs: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_secs: defaults::min_delay_secs(),
            max_delay_secs: defaults::max_delay_secs(),
            pause_every: defaults::pause_every(),
            pause_secs: defaults::pause_secs(),
        }
    }
}

impl PacingConfig {
    /// Check `0 < min <= max`, that `max` fits a [`Duration`], and
    /// `pause_every > 0`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Pacing`] describing the first violated bound.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.min_delay_secs.is_finite() || !self.max_delay_secs.is_finite() {
            return Err(ConfigurationError::Pacing(
                "delay bounds must be finite".to_string(),
            ));
        }
        if self.max_delay_secs >= Duration::MAX.as_secs_f64() {
            return Err(ConfigurationError::Pacing(format!(
                "max_delay_secs ({}) is too large",
                self.max_delay_secs
            )));
        }
        if self.min_delay_secs <= 0.0 {
            return Err(ConfigurationError::Pacing(format!(
                "min_delay_secs must be positive, got {}",
                self.min_delay_secs
            )));
        }
        if self.min_delay_secs > self.max_delay_secs {
            return Err(ConfigurationError::Pacing(format!(
                "min_delay_secs ({}) exceeds max_delay_secs ({})",
                self.min_delay_secs, self.max_delay_secs
            )));
        }
        if self.pause_every == 0 {
            return Err(ConfigurationError::Pacing(
                "pause_every must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn pause_duration(&self) -> Duration {
        Duration::from_secs(self.pause_secs)
    }
}

/// Bounded retry protocol for a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Iterations of the retry cycle per recipient.
    ///
    /// Default: 3
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Wait after a failed reconnect before the next iteration.
    ///
    /// Default: 10 seconds
    #[serde(default = "defaults::reconnect_backoff_secs")]
    pub reconnect_backoff_secs: u64,

    /// Wait after a failed send before reconnecting.
    ///
    /// Default: 2 seconds
    #[serde(default = "defaults::send_failure_backoff_secs")]
    pub send_failure_backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            reconnect_backoff_secs: defaults::reconnect_backoff_secs(),
            send_failure_backoff_secs: defaults::send_failure_backoff_secs(),
        }
    }
}

impl RetryConfig {
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Retry`] if `max_attempts` is zero.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_attempts == 0 {
            return Err(ConfigurationError::Retry(
                "max_attempts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn reconnect_backoff(&self) -> Duration {
        Duration::from_secs(self.reconnect_backoff_secs)
    }

    #[must_use]
    pub const fn send_failure_backoff(&self) -> Duration {
        Duration::from_secs(self.send_failure_backoff_secs)
    }
}

/// Optional hard ceiling on sends per hour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum recipients processed per rolling hour. `None` disables the limit.
    #[serde(default)]
    pub per_hour: Option<u32>,
}

impl RateLimitConfig {
    /// # Errors
    ///
    /// Returns [`ConfigurationError::RateLimit`] for a zero ceiling.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.per_hour == Some(0) {
            return Err(ConfigurationError::RateLimit(
                "per_hour must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Run-level breaker for an endpoint that cannot be reached at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Abandon the run after this many consecutive failed reconnects, across
    /// recipients. `None` never abandons.
    #[serde(default)]
    pub max_consecutive_connect_failures: Option<u32>,
}

mod defaults {
    pub const fn min_delay_secs() -> f64 {
        18.0
    }

    pub const fn max_delay_secs() -> f64 {
        25.0
    }

    pub const fn pause_every() -> u32 {
        50
    }

    pub const fn pause_secs() -> u64 {
        120
    }

    pub const fn max_attempts() -> u32 {
        3
    }

    pub const fn reconnect_backoff_secs() -> u64 {
        10
    }

    pub const fn send_failure_backoff_secs() -> u64 {
        2
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pacing_defaults_validate() {
        let pacing = PacingConfig::default();
        assert!(pacing.validate().is_ok());
        assert!((pacing.min_delay_secs - 18.0).abs() < f64::EPSILON);
        assert!((pacing.max_delay_secs - 25.0).abs() < f64::EPSILON);
        assert_eq!(pacing.pause_every, 50);
        assert_eq!(pacing.pause_duration(), Duration::from_secs(120));
    }

    #[test]
    fn test_pacing_rejects_zero_min() {
        let pacing = PacingConfig {
            min_delay_secs: 0.0,
            ..PacingConfig::default()
        };
        assert!(matches!(
            pacing.validate(),
            Err(ConfigurationError::Pacing(_))
        ));
    }

    #[test]
    fn test_pacing_rejects_inverted_bounds() {
        let pacing = PacingConfig {
            min_delay_secs: 5.0,
            max_delay_secs: 1.0,
            ..PacingConfig::default()
        };
        let err = pacing.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds max_delay_secs"));
    }

    #[test]
    fn test_pacing_accepts_equal_bounds() {
        let pacing = PacingConfig {
            min_delay_secs: 3.0,
            max_delay_secs: 3.0,
            ..PacingConfig::default()
        };
        assert!(pacing.validate().is_ok());
    }

    #[test]
    fn test_pacing_rejects_unrepresentable_max() {
        let pacing = PacingConfig {
            min_delay_secs: 1.0,
            max_delay_secs: 1e20,
            ..PacingConfig::default()
        };
        let err = pacing.validate().unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_pacing_rejects_zero_pause_every() {
        let pacing = PacingConfig {
            pause_every: 0,
            ..PacingConfig::default()
        };
        assert!(pacing.validate().is_err());
    }

    #[test]
    fn test_retry_defaults() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.reconnect_backoff(), Duration::from_secs(10));
        assert_eq!(retry.send_failure_backoff(), Duration::from_secs(2));
        assert!(retry.validate().is_ok());
    }

    #[test]
    fn test_retry_rejects_zero_attempts() {
        let retry = RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        };
        assert!(matches!(retry.validate(), Err(ConfigurationError::Retry(_))));
    }

    #[test]
    fn test_rate_limit_rejects_zero() {
        assert!(RateLimitConfig { per_hour: Some(0) }.validate().is_err());
        assert!(RateLimitConfig { per_hour: None }.validate().is_ok());
        assert!(RateLimitConfig { per_hour: Some(150) }.validate().is_ok());
    }
}

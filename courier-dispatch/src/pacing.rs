//! Inter-send delays and periodic extended pauses.

use std::time::Duration;

use courier_common::config::{ConfigurationError, PacingConfig};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Decides how long the dispatch loop waits between recipients.
#[derive(Debug)]
pub struct PacingPolicy {
    min_delay_secs: f64,
    max_delay_secs: f64,
    pause_every: u32,
    pause: Duration,
    rng: StdRng,
}

impl PacingPolicy {
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Pacing`] if the bounds are inconsistent.
    pub fn new(config: &PacingConfig) -> Result<Self, ConfigurationError> {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// A policy whose delays are reproducible for a given seed.
    ///
    /// # Errors
    ///
    /// See [`PacingPolicy::new`].
    pub fn seeded(config: &PacingConfig, seed: u64) -> Result<Self, ConfigurationError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &PacingConfig, rng: StdRng) -> Result<Self, ConfigurationError> {
        config.validate()?;

        Ok(Self {
            min_delay_secs: config.min_delay_secs,
            max_delay_secs: config.max_delay_secs,
            pause_every: config.pause_every,
            pause: config.pause_duration(),
            rng,
        })
    }

    /// Uniform in `[min_delay_secs, max_delay_secs]`.
    pub fn next_delay(&mut self) -> Duration {
        let secs = self
            .rng
            .random_range(self.min_delay_secs..=self.max_delay_secs);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// The extended pause owed after `confirmed` sends, if any.
    #[must_use]
    pub const fn extended_pause(&self, confirmed: u32) -> Option<Duration> {
        if confirmed > 0 && confirmed % self.pause_every == 0 {
            Some(self.pause)
        } else {
            None
        }
    }
}

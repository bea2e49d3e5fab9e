//! Run-level circuit breaker for an unreachable endpoint
//!
//! Counts consecutive failed `ensure_live` calls across recipients. A single
//! successful reconnect resets the count. When a threshold is configured and
//! reached the breaker opens and the run is abandoned instead of spinning on
//! an endpoint that will never accept the session (rejected credentials being
//! the usual cause).
//!
//! Without a threshold the breaker never opens.

use courier_common::{config::CircuitBreakerConfig, tracing};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Reconnects are being attempted normally
    Closed,
    /// Too many consecutive reconnect failures
    Open,
}

#[derive(Debug)]
pub struct ConnectionCircuitBreaker {
    threshold: Option<u32>,
    consecutive_failures: u32,
    state: CircuitState,
}

impl ConnectionCircuitBreaker {
    #[must_use]
    pub const fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            threshold: config.max_consecutive_connect_failures,
            consecutive_failures: 0,
            state: CircuitState::Closed,
        }
    }

    /// Records a failed reconnect. Returns `true` if this failure opened the
    /// circuit.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        match self.threshold {
            Some(threshold)
                if self.state == CircuitState::Closed && self.consecutive_failures >= threshold =>
            {
                self.state = CircuitState::Open;
                tracing::error!(
                    consecutive_failures = self.consecutive_failures,
                    "Circuit breaker opened: endpoint unreachable"
                );
                true
            }
            _ => false,
        }
    }

    pub fn record_success(&mut self) {
        if self.consecutive_failures > 0 {
            tracing::debug!(
                previous_failures = self.consecutive_failures,
                "Reconnected, resetting circuit breaker"
            );
        }
        self.consecutive_failures = 0;
        self.state = CircuitState::Closed;
    }

    #[must_use]
    pub const fn state(&self) -> CircuitState {
        self.state
    }

    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

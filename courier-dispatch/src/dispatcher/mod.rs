//! The dispatch loop: walks the recipient list once, in order, and drives each
//! pending recipient through compose, retry and pacing.

mod cancel;
mod retry;

use courier_common::{
    Signal,
    config::{Config, ConfigurationError, RetryConfig},
    internal, tracing,
};
use tokio::sync::broadcast;

use self::{cancel::Cancellation, retry::Delivery};
use crate::{
    circuit_breaker::ConnectionCircuitBreaker,
    composer::Composer,
    connection::ConnectionManager,
    error::DispatchError,
    ledger::Ledger,
    pacing::PacingPolicy,
    rate_limiter::HourlyRateLimiter,
    types::{Recipient, RunEnd, SessionReport, SessionStats},
};

/// Owns every collaborator of a run. One dispatcher performs one run.
#[derive(Debug)]
pub struct Dispatcher {
    ledger: Ledger,
    connection: ConnectionManager,
    composer: Composer,
    pacing: PacingPolicy,
    rate_limiter: Option<HourlyRateLimiter>,
    breaker: ConnectionCircuitBreaker,
    retry: RetryConfig,
    dry_run: bool,
}

impl Dispatcher {
    /// # Errors
    ///
    /// Returns the first invariant `config` violates.
    pub fn new(
        config: &Config,
        ledger: Ledger,
        connection: ConnectionManager,
        composer: Composer,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;

        Ok(Self {
            ledger,
            connection,
            composer,
            pacing: PacingPolicy::new(&config.pacing)?,
            rate_limiter: HourlyRateLimiter::from_config(&config.rate_limit),
            breaker: ConnectionCircuitBreaker::new(&config.circuit_breaker),
            retry: config.retry.clone(),
            dry_run: config.dry_run,
        })
    }

    /// Replaces the pacing policy, e.g. with a seeded one.
    #[must_use]
    pub fn with_pacing(mut self, pacing: PacingPolicy) -> Self {
        self.pacing = pacing;
        self
    }

    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Processes `recipients` in order until the list is exhausted, a shutdown
    /// signal arrives, or the circuit breaker gives up on the endpoint.
    ///
    /// The session is closed before returning, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Storage`] if the ledger cannot be written and
    /// [`DispatchError::Logic`] if an address is recorded twice. Transport
    /// failures never escape; they are counted in the report.
    pub async fn run(
        &mut self,
        recipients: &[Recipient],
        shutdown: broadcast::Receiver<Signal>,
    ) -> Result<SessionReport, DispatchError> {
        let mut cancel = Cancellation::new(shutdown);
        let mut stats = SessionStats::default();

        internal!(
            level = INFO,
            "Starting run: {} recipients, {} already in {}",
            recipients.len(),
            self.ledger.len(),
            self.ledger.path().display()
        );
        if self.dry_run {
            tracing::warn!("Dry run: nothing will be sent and the ledger will not change");
        }

        let outcome = self.process(recipients, &mut cancel, &mut stats).await;
        self.connection.close().await;

        let end = match outcome {
            Ok(end) => end,
            Err(e) => {
                tracing::error!(
                    confirmed = stats.confirmed,
                    "Run aborted after {} sends: {e}",
                    stats.confirmed
                );
                return Err(e);
            }
        };

        tracing::info!(
            confirmed = stats.confirmed,
            skipped = stats.skipped,
            failed = stats.failed,
            attempts = stats.attempts,
            "Run {end}"
        );

        Ok(SessionReport { stats, end })
    }

    async fn process(
        &mut self,
        recipients: &[Recipient],
        cancel: &mut Cancellation,
        stats: &mut SessionStats,
    ) -> Result<RunEnd, DispatchError> {
        for recipient in recipients {
            if cancel.is_cancelled() {
                return Ok(RunEnd::Cancelled);
            }

            if self.ledger.contains(&recipient.address) {
                tracing::trace!(recipient = %recipient.address, "Already sent, skipping");
                stats.skipped += 1;
                continue;
            }

            if !self.acquire_slot(cancel).await {
                return Ok(RunEnd::Cancelled);
            }

            let delivery = match self.composer.compose(recipient) {
                Ok(message) => self.deliver(recipient, &message, cancel, stats).await?,
                Err(e) => {
                    tracing::error!(
                        recipient = %recipient.address,
                        "Cannot compose message, skipping: {e}"
                    );
                    Delivery::Failed
                }
            };

            match delivery {
                Delivery::Confirmed => {}
                Delivery::Failed => stats.failed += 1,
                Delivery::Cancelled => return Ok(RunEnd::Cancelled),
                Delivery::Abandoned => {
                    tracing::error!(
                        failures = self.breaker.consecutive_failures(),
                        "Endpoint unreachable, abandoning the run"
                    );
                    return Ok(RunEnd::ConnectionAbandoned);
                }
            }

            if !self
                .pace(delivery == Delivery::Confirmed, stats.confirmed, cancel)
                .await
            {
                return Ok(RunEnd::Cancelled);
            }
        }

        Ok(RunEnd::Completed)
    }

    /// Waits for the hourly ceiling, if one is configured. Returns `false` if
    /// cancelled while waiting.
    async fn acquire_slot(&mut self, cancel: &mut Cancellation) -> bool {
        let Some(limiter) = self.rate_limiter.as_mut() else {
            return true;
        };

        loop {
            match limiter.try_acquire() {
                Ok(()) => return true,
                Err(wait) => {
                    internal!(
                        level = INFO,
                        "Hourly limit reached, waiting {:.0}s",
                        wait.as_secs_f64()
                    );
                    if !cancel.sleep(wait).await {
                        return false;
                    }
                }
            }
        }
    }

    /// The randomised delay after a processed recipient, followed by the
    /// periodic pause when this send completed a batch. Returns `false` if
    /// cancelled while waiting.
    async fn pace(&mut self, just_confirmed: bool, confirmed: u32, cancel: &mut Cancellation) -> bool {
        let delay = self.pacing.next_delay();
        internal!(level = INFO, "Waiting {:.2}s", delay.as_secs_f64());
        if !cancel.sleep(delay).await {
            return false;
        }

        if just_confirmed && let Some(pause) = self.pacing.extended_pause(confirmed) {
            internal!(
                level = INFO,
                "Pausing {}s after {confirmed} sends",
                pause.as_secs()
            );
            return cancel.sleep(pause).await;
        }

        true
    }
}

//! The bounded per-recipient retry cycle.

use courier_common::{internal, tracing};

use super::{Dispatcher, cancel::Cancellation};
use crate::{
    error::DispatchError,
    types::{OutgoingMessage, Recipient, SessionStats},
};

/// How a single recipient's retry cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Delivery {
    /// Accepted by the endpoint (or simulated) and recorded.
    Confirmed,
    /// Every attempt failed, or the message could not be built.
    Failed,
    /// A shutdown signal arrived during a backoff.
    Cancelled,
    /// The circuit breaker tripped on this recipient's reconnects.
    Abandoned,
}

impl Dispatcher {
    /// Runs up to `max_attempts` iterations of reconnect-then-send for one
    /// recipient. A failed reconnect uses up an iteration but is not counted in
    /// `stats.attempts`.
    ///
    /// # Errors
    ///
    /// Only ledger failures escape; every transport failure is contained here.
    pub(super) async fn deliver(
        &mut self,
        recipient: &Recipient,
        message: &OutgoingMessage,
        cancel: &mut Cancellation,
        stats: &mut SessionStats,
    ) -> Result<Delivery, DispatchError> {
        let max_attempts = self.retry.max_attempts;

        for attempt in 1..=max_attempts {
            if let Err(e) = self.connection.ensure_live().await {
                tracing::warn!(
                    recipient = %recipient.address,
                    attempt,
                    "Cannot reconnect, waiting {}s: {e}",
                    self.retry.reconnect_backoff_secs
                );

                if self.breaker.record_failure() {
                    return Ok(Delivery::Abandoned);
                }
                if !cancel.sleep(self.retry.reconnect_backoff()).await {
                    return Ok(Delivery::Cancelled);
                }
                continue;
            }
            self.breaker.record_success();

            internal!(
                level = INFO,
                "[{}] Sending to {recipient} (attempt {attempt}/{max_attempts})",
                stats.confirmed + 1
            );
            stats.attempts += 1;

            let sent = if self.dry_run {
                internal!(level = INFO, "[dry run] Would send to {}", recipient.address);
                Ok(())
            } else {
                self.connection.send(message).await
            };

            match sent {
                Ok(()) => {
                    if !self.dry_run {
                        self.ledger.record(&recipient.address).await?;
                    }
                    stats.confirmed += 1;
                    return Ok(Delivery::Confirmed);
                }
                Err(e) => {
                    tracing::warn!(
                        recipient = %recipient.address,
                        attempt,
                        "Send failed, reconnecting: {e}"
                    );
                    self.connection.close().await;

                    if !cancel.sleep(self.retry.send_failure_backoff()).await {
                        return Ok(Delivery::Cancelled);
                    }
                }
            }
        }

        tracing::error!(
            recipient = %recipient.address,
            "Could not send after {max_attempts} attempts, skipping"
        );
        Ok(Delivery::Failed)
    }
}

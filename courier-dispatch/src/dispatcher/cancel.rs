use std::time::Duration;

use courier_common::{Signal, internal};
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Latches the first shutdown signal seen on the broadcast channel.
///
/// A dropped sender is not a cancellation: the run carries on, and waits
/// simply become plain sleeps.
#[derive(Debug)]
pub(crate) struct Cancellation {
    receiver: broadcast::Receiver<Signal>,
    cancelled: bool,
    closed: bool,
}

impl Cancellation {
    pub(crate) const fn new(receiver: broadcast::Receiver<Signal>) -> Self {
        Self {
            receiver,
            cancelled: false,
            closed: false,
        }
    }

    fn latch(&mut self) {
        if !self.cancelled {
            internal!(level = INFO, "Dispatcher received shutdown signal");
            self.cancelled = true;
        }
    }

    /// Non-blocking check for a pending signal.
    pub(crate) fn is_cancelled(&mut self) -> bool {
        if self.cancelled || self.closed {
            return self.cancelled;
        }

        match self.receiver.try_recv() {
            // Any signal, or a lagged receiver that missed one, stops the run.
            Ok(_) | Err(TryRecvError::Lagged(_)) => self.latch(),
            Err(TryRecvError::Closed) => self.closed = true,
            Err(TryRecvError::Empty) => {}
        }

        self.cancelled
    }

    /// Sleeps for `duration` unless cancelled first.
    ///
    /// Returns `false` if the wait was interrupted (or never started) because
    /// of a shutdown signal.
    pub(crate) async fn sleep(&mut self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }

        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);

        loop {
            if self.closed {
                sleep.as_mut().await;
                return true;
            }

            tokio::select! {
                () = &mut sleep => return true,
                signal = self.receiver.recv() => match signal {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        self.latch();
                        return false;
                    }
                    Err(broadcast::error::RecvError::Closed) => self.closed = true,
                },
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes_without_signal() {
        let (tx, rx) = broadcast::channel(4);
        let mut cancel = Cancellation::new(rx);

        let start = Instant::now();
        assert!(cancel.sleep(Duration::from_secs(10)).await);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
        assert!(!cancel.is_cancelled());
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_interrupts_sleep() {
        let (tx, rx) = broadcast::channel(4);
        let mut cancel = Cancellation::new(rx);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            tx.send(Signal::Shutdown).unwrap();
        });

        let start = Instant::now();
        assert!(!cancel.sleep(Duration::from_secs(60)).await);
        assert!(start.elapsed() < Duration::from_secs(60));
        assert!(cancel.is_cancelled());
        assert!(!cancel.sleep(Duration::from_secs(1)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_channel_is_not_cancellation() {
        let (tx, rx) = broadcast::channel::<Signal>(4);
        drop(tx);
        let mut cancel = Cancellation::new(rx);

        assert!(!cancel.is_cancelled());
        assert!(cancel.sleep(Duration::from_secs(5)).await);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_pending_signal_seen_by_check() {
        let (tx, rx) = broadcast::channel(4);
        let mut cancel = Cancellation::new(rx);

        tx.send(Signal::Finalised).unwrap();
        assert!(cancel.is_cancelled());
    }
}

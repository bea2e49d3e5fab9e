//! The seam between the dispatch engine and the submission endpoint.
//!
//! The engine only ever sees these two traits, so tests can script every
//! connection and send outcome without a network.

mod dry_run;
mod smtp;

use async_trait::async_trait;

pub use dry_run::DryRunTransport;
pub use smtp::SmtpTransport;

use crate::{credentials::Credentials, error::SessionError, types::OutgoingMessage};

/// Opens authenticated sessions.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connects and authenticates.
    ///
    /// # Errors
    ///
    /// [`SessionError::Authentication`] if the credentials are rejected,
    /// [`SessionError::Transport`] for anything else.
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Session>, SessionError>;
}

/// One authenticated connection.
#[async_trait]
pub trait Session: Send {
    /// Lightweight liveness check.
    ///
    /// # Errors
    ///
    /// Any error means the session is no longer usable.
    async fn probe(&mut self) -> Result<(), SessionError>;

    /// Transmits one message. Never retries.
    ///
    /// # Errors
    ///
    /// Returns the failure as reported by the endpoint or the network.
    async fn send(&mut self, message: &OutgoingMessage) -> Result<(), SessionError>;

    /// Graceful teardown.
    ///
    /// # Errors
    ///
    /// Returns the teardown failure; callers are free to ignore it.
    async fn close(&mut self) -> Result<(), SessionError>;
}

//! Ownership and health of the single submission session.
//!
//! ```text
//!            connect() ok
//!  ┌────────┐ ───────────────> ┌──────┐
//!  │ Absent │                  │ Live │ ── probe() ok ──┐
//!  └────────┘ <─────────────── └──────┘ <───────────────┘
//!      ^       close(), or probe() failed
//!      └── connect() failed
//! ```

use std::sync::Arc;

use courier_common::{internal, tracing};

use crate::{
    credentials::{CredentialProvider, Credentials},
    error::SessionError,
    transport::{Session, Transport},
    types::OutgoingMessage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No usable connection.
    Absent,
    /// Authenticated, and passed its most recent probe.
    Live,
}

/// Sole owner of the transport session. Nothing else holds the connection,
/// so every caller goes through [`ConnectionManager::ensure_live`].
pub struct ConnectionManager {
    transport: Box<dyn Transport>,
    provider: Arc<dyn CredentialProvider>,
    credentials: Option<Credentials>,
    session: Option<Box<dyn Session>>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(transport: Box<dyn Transport>, provider: Arc<dyn CredentialProvider>) -> Self {
        Self {
            transport,
            provider,
            credentials: None,
            session: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        if self.session.is_some() {
            SessionState::Live
        } else {
            SessionState::Absent
        }
    }

    async fn credentials(&mut self) -> Result<Credentials, SessionError> {
        if let Some(credentials) = &self.credentials {
            return Ok(credentials.clone());
        }

        let credentials = self
            .provider
            .credentials()
            .await
            .map_err(|e| SessionError::Authentication(e.to_string()))?;
        self.credentials = Some(credentials.clone());
        Ok(credentials)
    }

    /// Opens a fresh session, discarding any existing one first.
    ///
    /// # Errors
    ///
    /// Returns the connect failure; the state is `Absent` afterwards.
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        self.close().await;

        let credentials = self.credentials().await?;
        let session = self.transport.connect(&credentials).await?;
        self.session = Some(session);

        internal!(level = DEBUG, "Session established");
        Ok(())
    }

    /// Checks the live session. A failed probe tears the session down.
    ///
    /// # Errors
    ///
    /// Returns the probe failure, or a transport error if no session exists.
    pub async fn probe(&mut self) -> Result<(), SessionError> {
        let Some(session) = self.session.as_mut() else {
            return Err(SessionError::Transport("No session to probe".to_string()));
        };

        if let Err(e) = session.probe().await {
            internal!(level = WARN, "Connection lost: {e}");
            self.close().await;
            return Err(e);
        }

        Ok(())
    }

    /// Best-effort teardown. Errors are logged and discarded.
    pub async fn close(&mut self) {
        if let Some(mut session) = self.session.take()
            && let Err(e) = session.close().await
        {
            tracing::debug!("Ignoring error while closing session: {e}");
        }
    }

    /// Makes sure a probed, authenticated session exists, reconnecting if
    /// needed. Never panics; the caller decides whether to back off.
    ///
    /// # Errors
    ///
    /// Returns the reconnect failure.
    pub async fn ensure_live(&mut self) -> Result<(), SessionError> {
        match self.state() {
            SessionState::Absent => self.connect().await,
            SessionState::Live => {
                if self.probe().await.is_ok() {
                    Ok(())
                } else {
                    internal!(level = INFO, "Reconnecting");
                    self.connect().await
                }
            }
        }
    }

    /// Sends over the live session. No retry, no reconnect.
    ///
    /// # Errors
    ///
    /// Returns the send failure, or a transport error when `Absent`.
    pub async fn send(&mut self, message: &OutgoingMessage) -> Result<(), SessionError> {
        match self.session.as_mut() {
            Some(session) => session.send(message).await,
            None => Err(SessionError::Transport("No live session".to_string())),
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state())
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

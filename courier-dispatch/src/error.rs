//! Typed errors for the dispatch engine.
//!
//! Failures are split by who can recover from them:
//! - [`SessionError`] is contained inside a recipient's retry cycle
//! - [`LedgerError`] is always fatal to the run
//! - [`DispatchError`] is what escapes [`crate::Dispatcher::run`]

use std::{io, path::PathBuf};

use courier_common::config::ConfigurationError;
use courier_smtp::ClientError;
use thiserror::Error;

/// SMTP reply codes that mean the endpoint refused our credentials.
const AUTHENTICATION_CODES: [u16; 3] = [530, 534, 535];

/// A failure talking to the submission endpoint.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The endpoint rejected the credentials.
    #[error("Authentication rejected: {0}")]
    Authentication(String),

    /// Network, handshake, timeout or protocol failure.
    #[error("Transport failure: {0}")]
    Transport(String),
}

impl SessionError {
    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<ClientError> for SessionError {
    fn from(error: ClientError) -> Self {
        match error.code() {
            Some(code) if AUTHENTICATION_CODES.contains(&code) => {
                Self::Authentication(error.to_string())
            }
            _ => Self::Transport(error.to_string()),
        }
    }
}

/// A failure of the durable ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The ledger file exists but could not be read, or could not be appended to.
    #[error("Ledger {path} is not usable: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Asked to record an address that is already present.
    #[error("{0} is already recorded in the ledger")]
    AlreadyRecorded(String),
}

/// Errors that abort a dispatch run.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The run could not start.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The ledger could not be read or written.
    #[error("Storage failure: {0}")]
    Storage(LedgerError),

    /// The engine tried to record a confirmed send twice.
    #[error("Logic error: {0}")]
    Logic(LedgerError),
}

impl DispatchError {
    #[must_use]
    pub const fn is_logic(&self) -> bool {
        matches!(self, Self::Logic(_))
    }
}

impl From<LedgerError> for DispatchError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::AlreadyRecorded(_) => Self::Logic(error),
            LedgerError::Io { .. } => Self::Storage(error),
        }
    }
}

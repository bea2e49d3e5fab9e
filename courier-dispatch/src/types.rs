use std::fmt;

use serde::{Deserialize, Serialize};

/// One addressee. `address` is the natural key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recipient {
    pub display_name: String,
    pub address: String,
}

impl Recipient {
    #[must_use]
    pub fn new(display_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            address: address.into(),
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.display_name, self.address)
    }
}

/// A composed message ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Envelope sender.
    pub sender: String,
    /// Envelope recipient.
    pub recipient: String,
    /// Rendered body, before MIME encoding.
    pub body: String,
    /// Complete RFC 5322 message, headers included.
    pub data: String,
}

/// Per-run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Sends confirmed (or simulated, in dry-run mode) this run.
    pub confirmed: u32,
    /// Recipients skipped because the ledger already held them.
    pub skipped: u32,
    /// Recipients given up on after exhausting their retries.
    pub failed: u32,
    /// Send calls issued, successful or not.
    pub attempts: u32,
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEnd {
    /// Every recipient was processed.
    Completed,
    /// A shutdown signal arrived.
    Cancelled,
    /// The circuit breaker tripped on consecutive failed reconnects.
    ConnectionAbandoned,
}

impl fmt::Display for RunEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::ConnectionAbandoned => "connection abandoned",
        })
    }
}

/// Outcome of [`crate::Dispatcher::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub stats: SessionStats,
    pub end: RunEnd,
}

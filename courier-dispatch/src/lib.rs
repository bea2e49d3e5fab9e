//! Paced, deduplicated dispatch of one personalised message per recipient
//!
//! This crate provides:
//! - A durable ledger of confirmed recipients, so reruns never send twice
//! - A single self-healing SMTP session with bounded per-recipient retries
//! - Randomised pacing, periodic pauses and an optional hourly ceiling
//! - Cancellation between recipients and during every wait

mod circuit_breaker;
mod composer;
mod connection;
mod credentials;
mod dispatcher;
mod error;
mod ledger;
mod pacing;
mod rate_limiter;
pub mod recipients;
pub mod transport;
mod types;

pub use circuit_breaker::{CircuitState, ConnectionCircuitBreaker};
pub use composer::Composer;
pub use connection::{ConnectionManager, SessionState};
pub use credentials::{
    CredentialProvider, Credentials, EnvCredentials, PASSWORD_ENV, StaticCredentials, USER_ENV,
};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, LedgerError, SessionError};
pub use ledger::Ledger;
pub use pacing::PacingPolicy;
pub use rate_limiter::HourlyRateLimiter;
pub use types::{OutgoingMessage, Recipient, RunEnd, SessionReport, SessionStats};

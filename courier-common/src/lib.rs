//! Pieces shared by every courier crate: run configuration, logging setup and
//! the shutdown signal passed between the process boundary and the dispatcher.

pub mod config;
pub mod logging;

pub use tracing;

/// Signals broadcast from the process boundary to long-running work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Stop accepting new work and wind down gracefully.
    Shutdown,
    /// The run has finished on its own.
    Finalised,
}

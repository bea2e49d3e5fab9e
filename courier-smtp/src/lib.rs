//! SMTP submission client.
//!
//! A small, dependency-light client covering what a message submission agent
//! needs: implicit TLS or STARTTLS, EHLO capability discovery, AUTH PLAIN and
//! AUTH LOGIN, NOOP liveness probes, and a single-recipient mail transaction.

pub mod client;

pub use client::{ClientError, MessageBuilder, Response, SmtpClient};

//! Submission endpoint configuration.
//!
//! Describes where the dispatcher connects and how the session is secured.
//! Credentials are not part of it; they come from a credential provider
//! at the process boundary.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the transport session is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TlsMode {
    /// TLS from the first byte (SMTPS, usually port 465).
    #[default]
    Implicit,
    /// Plain TCP upgraded with STARTTLS after the first EHLO (usually port 587).
    StartTls,
    /// No TLS at all. Only sensible for local relays and tests.
    Plain,
}

/// Connection parameters for the mail submission service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Hostname of the submission server; also used for TLS SNI.
    #[serde(default = "defaults::host")]
    pub host: String,

    /// TCP port.
    ///
    /// Default: 465
    #[serde(default = "defaults::port")]
    pub port: u16,

    /// Session security.
    #[serde(default)]
    pub tls: TlsMode,

    /// Name announced in EHLO.
    #[serde(default = "defaults::helo_name")]
    pub helo_name: String,

    /// Accept invalid TLS certificates (for testing only).
    ///
    /// **SECURITY WARNING**: disables certificate validation entirely.
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Per-operation timeouts.
    #[serde(default)]
    pub timeouts: SmtpTimeouts,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
            tls: TlsMode::default(),
            helo_name: defaults::helo_name(),
            accept_invalid_certs: false,
            timeouts: SmtpTimeouts::default(),
        }
    }
}

impl EndpointConfig {
    /// `host:port`, as handed to the TCP connector.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Client-side SMTP timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpTimeouts {
    /// TCP connect plus TLS handshake plus greeting.
    ///
    /// Default: 30 seconds
    #[serde(default = "defaults::connect_secs")]
    pub connect_secs: u64,

    /// Any single command/reply exchange (EHLO, AUTH, NOOP, MAIL, RCPT).
    ///
    /// Default: 60 seconds
    #[serde(default = "defaults::command_secs")]
    pub command_secs: u64,

    /// DATA initiation and message transfer.
    ///
    /// Default: 120 seconds
    #[serde(default = "defaults::data_secs")]
    pub data_secs: u64,

    /// QUIT during teardown.
    ///
    /// Default: 10 seconds
    #[serde(default = "defaults::quit_secs")]
    pub quit_secs: u64,
}

impl Default for SmtpTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: defaults::connect_secs(),
            command_secs: defaults::command_secs(),
            data_secs: defaults::data_secs(),
            quit_secs: defaults::quit_secs(),
        }
    }
}

impl SmtpTimeouts {
    #[must_use]
    pub const fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    #[must_use]
    pub const fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    #[must_use]
    pub const fn data(&self) -> Duration {
        Duration::from_secs(self.data_secs)
    }

    #[must_use]
    pub const fn quit(&self) -> Duration {
        Duration::from_secs(self.quit_secs)
    }
}

mod defaults {
    pub fn host() -> String {
        "localhost".to_string()
    }

    pub const fn port() -> u16 {
        465
    }

    pub fn helo_name() -> String {
        "localhost".to_string()
    }

    pub const fn connect_secs() -> u64 {
        30
    }

    pub const fn command_secs() -> u64 {
        60
    }

    pub const fn data_secs() -> u64 {
        120
    }

    pub const fn quit_secs() -> u64 {
        10
    }
}

//! Run configuration.
//!
//! A [`Config`] is deserialised once at startup (RON in practice) and handed
//! by reference to every component constructor. Nothing reads configuration
//! from ambient state afterwards.
//!
//! Every field carries a serde default, so a configuration file only needs to
//! name what differs from the stock behaviour:
//!
//! ```ron
//! (
//!     endpoint: (host: "smtp.example.com", port: 465),
//!     pacing: (min_delay_secs: 18.0, max_delay_secs: 25.0),
//!     dry_run: true,
//! )
//! ```

mod endpoint;
mod pacing;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use endpoint::{EndpointConfig, SmtpTimeouts, TlsMode};
pub use pacing::{CircuitBreakerConfig, PacingConfig, RateLimitConfig, RetryConfig};

/// Required input is missing, malformed, or the configuration violates an
/// invariant. Always fatal: the run does not start.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// An input artifact could not be opened or read.
    #[error("Cannot read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// An input artifact was read but its content is unusable.
    #[error("Malformed {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// Pacing bounds are inconsistent.
    #[error("Invalid pacing configuration: {0}")]
    Pacing(String),

    /// Retry policy is unusable.
    #[error("Invalid retry configuration: {0}")]
    Retry(String),

    /// Hourly ceiling is unusable.
    #[error("Invalid rate limit configuration: {0}")]
    RateLimit(String),

    /// Endpoint description is unusable.
    #[error("Invalid endpoint configuration: {0}")]
    Endpoint(String),

    /// Credentials could not be obtained.
    #[error("Credentials unavailable: {0}")]
    Credentials(String),
}

/// Where the recipient table lives and which columns to read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientSourceConfig {
    /// CSV file with a header row.
    #[serde(default = "defaults::recipients_path")]
    pub path: PathBuf,

    /// Header of the display-name column (matched case-insensitively).
    #[serde(default = "defaults::name_column")]
    pub name_column: String,

    /// Header of the address column (matched case-insensitively).
    #[serde(default = "defaults::address_column")]
    pub address_column: String,
}

impl Default for RecipientSourceConfig {
    fn default() -> Self {
        Self {
            path: defaults::recipients_path(),
            name_column: defaults::name_column(),
            address_column: defaults::address_column(),
        }
    }
}

/// MIME type of the rendered body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentType {
    #[default]
    Html,
    Plain,
}

impl ContentType {
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Html => "text/html",
            Self::Plain => "text/plain",
        }
    }
}

/// Template and header settings for the composed message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    /// Body template file.
    #[serde(default = "defaults::template_path")]
    pub template_path: PathBuf,

    /// Subject line; the same placeholders as the body are substituted.
    #[serde(default = "defaults::subject")]
    pub subject: String,

    /// Display name on the From header.
    #[serde(default)]
    pub sender_name: Option<String>,

    /// Envelope and header sender. Falls back to the authenticated user.
    #[serde(default)]
    pub sender_address: Option<String>,

    /// Placeholder replaced by the recipient's first name.
    #[serde(default = "defaults::name_token")]
    pub name_token: String,

    /// Placeholder replaced by the recipient's address.
    #[serde(default = "defaults::address_token")]
    pub address_token: String,

    /// First name used when the recipient row has none.
    #[serde(default = "defaults::fallback_name")]
    pub fallback_name: String,

    #[serde(default)]
    pub content_type: ContentType,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            template_path: defaults::template_path(),
            subject: defaults::subject(),
            sender_name: None,
            sender_address: None,
            name_token: defaults::name_token(),
            address_token: defaults::address_token(),
            fallback_name: defaults::fallback_name(),
            content_type: ContentType::default(),
        }
    }
}

/// Everything a run needs, constructed once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub endpoint: EndpointConfig,

    #[serde(default)]
    pub pacing: PacingConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,

    #[serde(default)]
    pub recipients: RecipientSourceConfig,

    #[serde(default)]
    pub message: MessageConfig,

    /// Append-only record of confirmed sends.
    #[serde(default = "defaults::ledger_path")]
    pub ledger_path: PathBuf,

    /// Simulate every send; never touch the ledger.
    #[serde(default)]
    pub dry_run: bool,
}

impl Config {
    /// Check every invariant the dispatch engine relies on.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.pacing.validate()?;
        self.retry.validate()?;
        self.rate_limit.validate()?;

        if self.endpoint.host.trim().is_empty() {
            return Err(ConfigurationError::Endpoint(
                "host must not be empty".to_string(),
            ));
        }
        if self.endpoint.port == 0 {
            return Err(ConfigurationError::Endpoint(
                "port must not be zero".to_string(),
            ));
        }
        if self.circuit_breaker.max_consecutive_connect_failures == Some(0) {
            return Err(ConfigurationError::Retry(
                "max_consecutive_connect_failures must be greater than zero when set"
                    .to_string(),
            ));
        }
        if self.message.name_token.is_empty() || self.message.address_token.is_empty() {
            return Err(ConfigurationError::Malformed {
                path: self.message.template_path.clone(),
                reason: "placeholder tokens must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn recipients_path() -> PathBuf {
        PathBuf::from("scripts/contacts.csv")
    }

    pub fn name_column() -> String {
        "Nombre".to_string()
    }

    pub fn address_column() -> String {
        "Email".to_string()
    }

    pub fn template_path() -> PathBuf {
        PathBuf::from("scripts/template.html")
    }

    pub fn subject() -> String {
        "{{Nombre}}, es momento de elevar el estándar de tus finanzas.".to_string()
    }

    pub fn name_token() -> String {
        "{{Nombre}}".to_string()
    }

    pub fn address_token() -> String {
        "{{Email}}".to_string()
    }

    pub fn fallback_name() -> String {
        "Inversor".to_string()
    }

    pub fn ledger_path() -> PathBuf {
        PathBuf::from("scripts/sent_log.txt")
    }
}

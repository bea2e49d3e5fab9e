//! Where the submission account's username and password come from.

use std::fmt;

use async_trait::async_trait;
use courier_common::config::ConfigurationError;

/// Environment variable holding the submission username.
pub const USER_ENV: &str = "COURIER_SMTP_USER";

/// Environment variable holding the submission password.
pub const PASSWORD_ENV: &str = "COURIER_SMTP_PASSWORD";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Supplies credentials to the connection manager, which asks once and caches
/// the answer for every later reconnect.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Credentials`] if none can be obtained.
    async fn credentials(&self) -> Result<Credentials, ConfigurationError>;
}

/// Credentials known up front.
#[derive(Debug, Clone)]
pub struct StaticCredentials(Credentials);

impl StaticCredentials {
    #[must_use]
    pub const fn new(credentials: Credentials) -> Self {
        Self(credentials)
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn credentials(&self) -> Result<Credentials, ConfigurationError> {
        Ok(self.0.clone())
    }
}

/// Reads [`USER_ENV`] and [`PASSWORD_ENV`] when asked.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl EnvCredentials {
    /// Resolves the pair through `lookup`, so callers can supply something
    /// other than the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Credentials`] naming the first missing
    /// or empty variable.
    pub fn resolve(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Credentials, ConfigurationError> {
        let read = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigurationError::Credentials(format!("{name} is not set")))
        };

        Ok(Credentials {
            username: read(USER_ENV)?,
            password: read(PASSWORD_ENV)?,
        })
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentials {
    async fn credentials(&self) -> Result<Credentials, ConfigurationError> {
        Self::resolve(|name| std::env::var(name).ok())
    }
}

//! Interactive credential entry at the terminal.

use std::sync::Arc;

use async_trait::async_trait;
use courier_common::config::ConfigurationError;
use courier_dispatch::{CredentialProvider, Credentials, EnvCredentials};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

const USERNAME_PROMPT: &str = "SMTP username (e.g. info@example.com): ";
const PASSWORD_PROMPT: &str = "SMTP password: ";

/// Asks for the submission username on stdin and the password without echo.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptCredentials;

#[async_trait]
impl CredentialProvider for PromptCredentials {
    async fn credentials(&self) -> Result<Credentials, ConfigurationError> {
        let username = read_username(
            &mut BufReader::new(tokio::io::stdin()),
            &mut tokio::io::stderr(),
        )
        .await?;
        let password = read_password().await?;

        Ok(Credentials::new(username, password))
    }
}

/// Environment credentials when both variables are set, the prompt otherwise.
#[must_use]
pub fn credential_provider() -> Arc<dyn CredentialProvider> {
    if EnvCredentials::resolve(|name| std::env::var(name).ok()).is_ok() {
        Arc::new(EnvCredentials)
    } else {
        Arc::new(PromptCredentials)
    }
}

fn unavailable(e: impl std::fmt::Display) -> ConfigurationError {
    ConfigurationError::Credentials(e.to_string())
}

/// Prompts on `writer` and reads one trimmed, non-empty line from `reader`.
///
/// # Errors
///
/// Returns [`ConfigurationError::Credentials`] if input ends early or the
/// answer is empty.
pub async fn read_username<R, W>(reader: &mut R, writer: &mut W) -> Result<String, ConfigurationError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer.write_all(USERNAME_PROMPT.as_bytes()).await.map_err(unavailable)?;
    writer.flush().await.map_err(unavailable)?;

    let mut line = String::new();
    if reader.read_line(&mut line).await.map_err(unavailable)? == 0 {
        return Err(ConfigurationError::Credentials(
            "input closed before credentials were entered".to_string(),
        ));
    }

    let username = line.trim();
    if username.is_empty() {
        return Err(ConfigurationError::Credentials(
            "SMTP username must not be empty".to_string(),
        ));
    }

    Ok(username.to_string())
}

/// Reads the password from the terminal with echo disabled.
async fn read_password() -> Result<String, ConfigurationError> {
    let password = tokio::task::spawn_blocking(|| rpassword::prompt_password(PASSWORD_PROMPT))
        .await
        .map_err(unavailable)?
        .map_err(unavailable)?;

    check_password(password)
}

/// Surrounding whitespace is part of the secret and is kept.
fn check_password(password: String) -> Result<String, ConfigurationError> {
    if password.is_empty() {
        return Err(ConfigurationError::Credentials(
            "SMTP password must not be empty".to_string(),
        ));
    }
    Ok(password)
}

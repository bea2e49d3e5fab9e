//! SMTP submission over implicit TLS, STARTTLS or plain TCP.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use courier_common::{
    config::{EndpointConfig, SmtpTimeouts, TlsMode},
    internal, tracing,
};
use courier_smtp::{SmtpClient, client};

use super::{Session, Transport};
use crate::{credentials::Credentials, error::SessionError, types::OutgoingMessage};

/// Runs `operation` under `limit`, mapping a timeout to a transport failure.
async fn timed<T>(
    limit: Duration,
    what: &str,
    operation: impl Future<Output = client::Result<T>>,
) -> Result<T, SessionError> {
    tokio::time::timeout(limit, operation)
        .await
        .map_err(|_| SessionError::Transport(format!("{what} timed out after {limit:?}")))?
        .map_err(SessionError::from)
}

#[derive(Debug, Clone)]
pub struct SmtpTransport {
    endpoint: EndpointConfig,
}

impl SmtpTransport {
    #[must_use]
    pub const fn new(endpoint: EndpointConfig) -> Self {
        Self { endpoint }
    }

    async fn open(&self) -> Result<SmtpClient, SessionError> {
        let address = self.endpoint.address();
        let host = self.endpoint.host.clone();
        let accept_invalid = self.endpoint.accept_invalid_certs;

        if accept_invalid {
            tracing::warn!(
                server = %address,
                "SECURITY WARNING: TLS certificate validation is disabled for this connection"
            );
        }

        let connect = async {
            match self.endpoint.tls {
                TlsMode::Implicit => SmtpClient::connect_tls(&address, host, accept_invalid).await,
                TlsMode::StartTls | TlsMode::Plain => SmtpClient::connect(&address, host)
                    .await
                    .map(|client| client.accept_invalid_certs(accept_invalid)),
            }
        };

        timed(self.endpoint.timeouts.connect(), "Connect", connect).await
    }
}

#[async_trait]
impl Transport for SmtpTransport {
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Session>, SessionError> {
        let timeouts = self.endpoint.timeouts.clone();
        let helo = self.endpoint.helo_name.as_str();

        internal!(level = DEBUG, "Connecting to {}", self.endpoint.address());
        let mut client = self.open().await?;

        timed(timeouts.command(), "Greeting", client.read_greeting()).await?;
        timed(timeouts.command(), "EHLO", client.ehlo(helo)).await?;

        if self.endpoint.tls == TlsMode::StartTls {
            timed(timeouts.command(), "STARTTLS", client.starttls()).await?;
            timed(timeouts.command(), "EHLO after STARTTLS", client.ehlo(helo)).await?;
        }

        timed(
            timeouts.command(),
            "AUTH",
            client.authenticate(&credentials.username, &credentials.password),
        )
        .await?;

        internal!(
            level = INFO,
            "Authenticated to {} as {}",
            self.endpoint.address(),
            credentials.username
        );

        Ok(Box::new(SmtpSession { client, timeouts }))
    }
}

struct SmtpSession {
    client: SmtpClient,
    timeouts: SmtpTimeouts,
}

#[async_trait]
impl Session for SmtpSession {
    async fn probe(&mut self) -> Result<(), SessionError> {
        timed(self.timeouts.command(), "NOOP", self.client.noop()).await?;
        Ok(())
    }

    async fn send(&mut self, message: &OutgoingMessage) -> Result<(), SessionError> {
        let command = self.timeouts.command();

        timed(command, "RSET", self.client.rset()).await?;
        timed(command, "MAIL FROM", self.client.mail_from(&message.sender)).await?;
        timed(command, "RCPT TO", self.client.rcpt_to(&message.recipient)).await?;
        timed(command, "DATA", self.client.data()).await?;
        timed(
            self.timeouts.data(),
            "Message data",
            self.client.send_data(&message.data),
        )
        .await?;

        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        timed(self.timeouts.quit(), "QUIT", self.client.quit()).await?;
        Ok(())
    }
}

//! SMTP client with support for implicit TLS, STARTTLS and AUTH.

use courier_common::{incoming, outgoing};
use tokio::net::TcpStream;

use super::auth::{self, Mechanism};
use super::connection::ClientConnection;
use super::error::{ClientError, Result};
use super::response::Response;

/// Initial size of the read buffer for SMTP replies.
const BUFFER_SIZE: usize = 8192;

/// Maximum size of the read buffer to prevent unbounded growth (1MB).
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// An SMTP client for sending commands and receiving replies.
///
/// The client performs no retries and no reconnects; callers own that policy.
pub struct SmtpClient {
    connection: Option<ClientConnection>,
    buffer: Vec<u8>,
    buffer_pos: usize,
    server_domain: String,
    accept_invalid_certs: bool,
    capabilities: Vec<String>,
    last_response: Option<Response>,
}

impl SmtpClient {
    fn from_connection(connection: ClientConnection, server_domain: String) -> Self {
        Self {
            connection: Some(connection),
            buffer: vec![0u8; BUFFER_SIZE],
            buffer_pos: 0,
            server_domain,
            accept_invalid_certs: false,
            capabilities: Vec::new(),
            last_response: None,
        }
    }

    /// Opens a plain TCP connection. Use [`SmtpClient::starttls`] to upgrade.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(addr: &str, server_domain: String) -> Result<Self> {
        let stream = TcpStream::connect(addr).await.map_err(ClientError::Io)?;
        Ok(Self::from_connection(
            ClientConnection::Plain(stream),
            server_domain,
        ))
    }

    /// Opens a connection that is TLS from the first byte (SMTPS).
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP connection or the TLS handshake fails.
    pub async fn connect_tls(
        addr: &str,
        server_domain: String,
        accept_invalid_certs: bool,
    ) -> Result<Self> {
        let stream = TcpStream::connect(addr).await.map_err(ClientError::Io)?;
        let connection = ClientConnection::Plain(stream)
            .upgrade_to_tls(&server_domain, accept_invalid_certs)
            .await?;

        Ok(Self::from_connection(connection, server_domain).accept_invalid_certs(accept_invalid_certs))
    }

    /// Sets whether to accept invalid TLS certificates on a later STARTTLS.
    ///
    /// Default is `false`. Set to `true` for testing only.
    #[must_use]
    pub const fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Whether the session is currently encrypted.
    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(ClientConnection::is_tls)
    }

    /// Reads the initial server greeting, which must be a 220.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the server refuses the session.
    pub async fn read_greeting(&mut self) -> Result<Response> {
        self.read_response().await?.expect_code(220)
    }

    /// Writes a command line; the text is logged as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails.
    pub async fn send_command(&mut self, command: &str) -> Result<()> {
        outgoing!("{command}");
        self.write_line(command).await
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        let data = format!("{line}\r\n");
        self.connection
            .as_mut()
            .ok_or(ClientError::ConnectionClosed)?
            .send(data.as_bytes())
            .await
    }

    /// Sends a raw command and reads the reply, whatever its code.
    ///
    /// # Errors
    ///
    /// Returns an error if sending or reading fails.
    pub async fn command(&mut self, command: &str) -> Result<Response> {
        self.send_command(command).await?;
        self.read_response().await
    }

    /// Like [`SmtpClient::command`], but keeps the line out of the logs.
    async fn secret_command(&mut self, command: &str) -> Result<Response> {
        outgoing!("<credentials redacted>");
        self.write_line(command).await?;
        self.read_response().await
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or the server does not answer 250.
    pub async fn ehlo(&mut self, domain: &str) -> Result<Response> {
        let response = self.command(&format!("EHLO {domain}")).await?.expect_code(250)?;
        self.capabilities = response.capabilities().map(str::to_string).collect();
        Ok(response)
    }

    /// Extensions from the most recent EHLO.
    #[must_use]
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Whether the most recent EHLO advertised `keyword` (case-insensitive).
    #[must_use]
    pub fn supports(&self, keyword: &str) -> bool {
        self.capabilities.iter().any(|line| {
            line.split_whitespace()
                .next()
                .is_some_and(|first| first.eq_ignore_ascii_case(keyword))
        })
    }

    /// Authenticates with the best mechanism the server offers.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Rejected`] carrying the server's code (535 for
    /// rejected credentials) if authentication fails.
    pub async fn authenticate(&mut self, username: &str, password: &str) -> Result<Response> {
        match Mechanism::select(self.capabilities.iter().map(String::as_str)) {
            Mechanism::Plain => self.auth_plain(username, password).await,
            Mechanism::Login => self.auth_login(username, password).await,
        }
    }

    /// `AUTH PLAIN` with an initial response.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server answers 235.
    pub async fn auth_plain(&mut self, username: &str, password: &str) -> Result<Response> {
        let token = auth::plain_initial_response(username, password);
        self.secret_command(&format!("AUTH PLAIN {token}"))
            .await?
            .expect_code(235)
    }

    /// `AUTH LOGIN` in two challenge rounds.
    ///
    /// # Errors
    ///
    /// Returns an error unless each challenge is a 334 and the final reply a 235.
    pub async fn auth_login(&mut self, username: &str, password: &str) -> Result<Response> {
        self.command("AUTH LOGIN").await?.expect_code(334)?;
        self.secret_command(&auth::login_token(username))
            .await?
            .expect_code(334)?;
        self.secret_command(&auth::login_token(password))
            .await?
            .expect_code(235)
    }

    /// Sends NOOP; a live session answers 250.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails or the reply is not 250.
    pub async fn noop(&mut self) -> Result<Response> {
        self.command("NOOP").await?.expect_code(250)
    }

    /// Sends RSET to abandon any half-finished transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails or the reply is not 2xx.
    pub async fn rset(&mut self) -> Result<Response> {
        self.command("RSET").await?.expect_success()
    }

    /// Sends `MAIL FROM`.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails or the reply is not 2xx.
    pub async fn mail_from(&mut self, from: &str) -> Result<Response> {
        self.command(&format!("MAIL FROM:<{from}>"))
            .await?
            .expect_success()
    }

    /// Sends `RCPT TO`.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails or the reply is not 2xx.
    pub async fn rcpt_to(&mut self, to: &str) -> Result<Response> {
        self.command(&format!("RCPT TO:<{to}>"))
            .await?
            .expect_success()
    }

    /// Sends DATA; the server must answer 354.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails or the reply is not 354.
    pub async fn data(&mut self) -> Result<Response> {
        self.command("DATA").await?.expect_code(354)
    }

    /// Transmits the message, dot-stuffed and CRLF-normalised, followed by the
    /// terminating `.` line.
    ///
    /// # Errors
    ///
    /// Returns an error if sending fails or the server does not accept the message.
    pub async fn send_data(&mut self, data: &str) -> Result<Response> {
        let payload = dot_stuff(data);
        outgoing!("<message content: {} bytes>", payload.len());

        self.connection
            .as_mut()
            .ok_or(ClientError::ConnectionClosed)?
            .send(payload.as_bytes())
            .await?;

        self.read_response().await?.expect_success()
    }

    /// Sends QUIT and shuts the stream down.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn quit(&mut self) -> Result<Response> {
        let response = self.command("QUIT").await?;
        if let Some(mut connection) = self.connection.take() {
            // The server may already have closed its side after 221.
            let _ = connection.shutdown().await;
        }
        Ok(response)
    }

    /// Sends STARTTLS and upgrades the connection to TLS.
    ///
    /// The caller must send EHLO again afterwards (RFC 3207).
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is refused or the TLS upgrade fails.
    pub async fn starttls(&mut self) -> Result<Response> {
        let response = self.command("STARTTLS").await?.expect_code(220)?;

        let connection = self
            .connection
            .take()
            .ok_or(ClientError::ConnectionClosed)?;
        self.connection = Some(
            connection
                .upgrade_to_tls(&self.server_domain, self.accept_invalid_certs)
                .await?,
        );
        self.capabilities.clear();

        Ok(response)
    }

    /// The last reply received, if any.
    #[must_use]
    pub const fn last_response(&self) -> Option<&Response> {
        self.last_response.as_ref()
    }

    /// Reads a complete SMTP reply from the server.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the reply is malformed.
    async fn read_response(&mut self) -> Result<Response> {
        loop {
            if let Some((response, consumed)) =
                Response::parse_response(&self.buffer[..self.buffer_pos])?
            {
                self.buffer.copy_within(consumed..self.buffer_pos, 0);
                self.buffer_pos -= consumed;

                incoming!("{} {}", response.code, response.message());
                self.last_response = Some(response.clone());

                return Ok(response);
            }

            if self.buffer_pos >= self.buffer.len() {
                let new_size = self.buffer.len() * 2;
                if new_size > MAX_BUFFER_SIZE {
                    return Err(ClientError::MalformedReply(format!(
                        "Response too large (exceeds {MAX_BUFFER_SIZE} bytes)"
                    )));
                }
                self.buffer.resize(new_size, 0);
            }

            let connection = self
                .connection
                .as_mut()
                .ok_or(ClientError::ConnectionClosed)?;
            let n = connection.read(&mut self.buffer[self.buffer_pos..]).await?;
            self.buffer_pos += n;
        }
    }
}

/// Normalises line endings to CRLF, doubles a leading `.` on any line
/// (RFC 5321 section 4.5.2), and appends the end-of-data marker.
fn dot_stuff(data: &str) -> String {
    let mut out = String::with_capacity(data.len() + data.len() / 64 + 8);

    for line in data.split_inclusive('\n') {
        let line = line
            .strip_suffix('\n')
            .map_or(line, |l| l.strip_suffix('\r').unwrap_or(l));
        if line.starts_with('.') {
            out.push('.');
        }
        out.push_str(line);
        out.push_str("\r\n");
    }

    out.push_str(".\r\n");
    out
}

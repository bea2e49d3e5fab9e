//! Mock submission server for exercising the client and transport.
//!
//! Speaks enough plain-text ESMTP to drive a full submission session:
//! greeting, EHLO, AUTH PLAIN and AUTH LOGIN, NOOP, RSET, a single mail
//! transaction, and QUIT. Every command is recorded for later inspection and
//! individual replies can be overridden to inject failures.
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = MockSmtpServer::builder()
//!     .with_auth_response(535, "5.7.8 Authentication credentials invalid")
//!     .build()
//!     .await?;
//!
//! // connect to server.addr() ...
//! server.shutdown();
//! # Ok(())
//! # }
//! ```
#![allow(dead_code)] // Shared by several test binaries; not every helper is used in each

use std::{
    fmt::Write,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use courier_common::tracing;
use tokio::{
    io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::RwLock,
    time::timeout,
};

/// Command received by the mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpCommand {
    Ehlo(String),
    /// `AUTH PLAIN <initial response>`
    AuthPlain(String),
    AuthLogin,
    /// A base64 line sent in answer to a 334 challenge.
    AuthContinuation(String),
    Noop,
    Rset,
    MailFrom(String),
    RcptTo(String),
    Data,
    /// Raw message lines between DATA and the terminating dot.
    MessageContent(Vec<u8>),
    Quit,
    Other(String),
}

#[derive(Debug, Clone)]
pub struct SmtpResponse {
    pub code: u16,
    pub message: String,
}

impl SmtpResponse {
    fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        format!("{} {}\r\n", self.code, self.message).into_bytes()
    }
}

#[derive(Clone)]
struct MockServerConfig {
    greeting: SmtpResponse,
    capabilities: Vec<String>,
    auth_response: SmtpResponse,
    noop_response: SmtpResponse,
    mail_from_response: SmtpResponse,
    rcpt_to_response: SmtpResponse,
    data_response: SmtpResponse,
    data_end_response: SmtpResponse,
    quit_response: SmtpResponse,

    response_delay: Option<Duration>,
    drop_after_commands: Option<usize>,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            greeting: SmtpResponse::new(220, "mock.example.com ESMTP ready"),
            capabilities: vec![
                "mock.example.com".to_string(),
                "AUTH PLAIN LOGIN".to_string(),
                "SIZE 10000000".to_string(),
            ],
            auth_response: SmtpResponse::new(235, "2.7.0 Authentication successful"),
            noop_response: SmtpResponse::new(250, "2.0.0 OK"),
            mail_from_response: SmtpResponse::new(250, "2.1.0 OK"),
            rcpt_to_response: SmtpResponse::new(250, "2.1.5 OK"),
            data_response: SmtpResponse::new(354, "Start mail input; end with <CRLF>.<CRLF>"),
            data_end_response: SmtpResponse::new(250, "2.0.0 OK: queued"),
            quit_response: SmtpResponse::new(221, "2.0.0 Bye"),
            response_delay: None,
            drop_after_commands: None,
        }
    }
}

fn ehlo_bytes(capabilities: &[String]) -> Vec<u8> {
    let mut response = String::new();
    let last = capabilities.len().saturating_sub(1);

    for (i, cap) in capabilities.iter().enumerate() {
        let separator = if i < last { '-' } else { ' ' };
        let _ = write!(&mut response, "250{separator}{cap}\r\n");
    }

    response.into_bytes()
}

pub struct MockSmtpServer {
    addr: SocketAddr,
    commands_received: Arc<RwLock<Vec<SmtpCommand>>>,
    shutdown: Arc<AtomicBool>,
    connections: Arc<AtomicUsize>,
}

impl MockSmtpServer {
    #[must_use]
    pub fn builder() -> MockSmtpServerBuilder {
        MockSmtpServerBuilder::new()
    }

    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Every command received, across all connections.
    pub async fn commands(&self) -> Vec<SmtpCommand> {
        self.commands_received.read().await.clone()
    }

    /// Connections accepted so far.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    async fn respond<W: AsyncWrite + Unpin>(
        writer: &mut W,
        config: &MockServerConfig,
        bytes: &[u8],
    ) -> std::io::Result<()> {
        if let Some(delay) = config.response_delay {
            tokio::time::sleep(delay).await;
        }
        writer.write_all(bytes).await?;
        writer.flush().await
    }

    #[allow(clippy::too_many_lines)]
    async fn handle_client(
        mut stream: TcpStream,
        config: Arc<MockServerConfig>,
        commands: Arc<RwLock<Vec<SmtpCommand>>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (reader, mut writer) = stream.split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        let mut handled = 0;

        writer.write_all(&config.greeting.to_bytes()).await?;
        writer.flush().await?;

        loop {
            line.clear();

            if let Some(drop_after) = config.drop_after_commands
                && handled >= drop_after
            {
                return Ok(());
            }

            let Ok(read) = timeout(Duration::from_secs(10), reader.read_line(&mut line)).await
            else {
                return Ok(());
            };
            if read? == 0 {
                return Ok(());
            }
            handled += 1;

            let cmd_line = line.trim_end().to_string();
            tracing::debug!("Mock server received: {cmd_line}");

            let (verb, argument) = cmd_line
                .split_once(' ')
                .map_or((cmd_line.as_str(), ""), |(v, a)| (v, a));

            match verb.to_ascii_uppercase().as_str() {
                "EHLO" => {
                    commands
                        .write()
                        .await
                        .push(SmtpCommand::Ehlo(argument.to_string()));
                    Self::respond(&mut writer, &config, &ehlo_bytes(&config.capabilities)).await?;
                }
                "AUTH" => {
                    let (mechanism, initial) = argument
                        .split_once(' ')
                        .map_or((argument, ""), |(m, i)| (m, i));

                    if mechanism.eq_ignore_ascii_case("PLAIN") {
                        commands
                            .write()
                            .await
                            .push(SmtpCommand::AuthPlain(initial.to_string()));
                    } else if mechanism.eq_ignore_ascii_case("LOGIN") {
                        commands.write().await.push(SmtpCommand::AuthLogin);

                        for challenge in ["VXNlcm5hbWU6", "UGFzc3dvcmQ6"] {
                            Self::respond(
                                &mut writer,
                                &config,
                                &SmtpResponse::new(334, challenge).to_bytes(),
                            )
                            .await?;

                            line.clear();
                            if reader.read_line(&mut line).await? == 0 {
                                return Ok(());
                            }
                            commands
                                .write()
                                .await
                                .push(SmtpCommand::AuthContinuation(line.trim_end().to_string()));
                        }
                    } else {
                        Self::respond(
                            &mut writer,
                            &config,
                            &SmtpResponse::new(504, "Unrecognized authentication type").to_bytes(),
                        )
                        .await?;
                        continue;
                    }

                    Self::respond(&mut writer, &config, &config.auth_response.to_bytes()).await?;
                }
                "NOOP" => {
                    commands.write().await.push(SmtpCommand::Noop);
                    Self::respond(&mut writer, &config, &config.noop_response.to_bytes()).await?;
                }
                "RSET" => {
                    commands.write().await.push(SmtpCommand::Rset);
                    Self::respond(&mut writer, &config, &SmtpResponse::new(250, "OK").to_bytes())
                        .await?;
                }
                "MAIL" => {
                    commands
                        .write()
                        .await
                        .push(SmtpCommand::MailFrom(argument.to_string()));
                    Self::respond(&mut writer, &config, &config.mail_from_response.to_bytes())
                        .await?;
                }
                "RCPT" => {
                    commands
                        .write()
                        .await
                        .push(SmtpCommand::RcptTo(argument.to_string()));
                    Self::respond(&mut writer, &config, &config.rcpt_to_response.to_bytes())
                        .await?;
                }
                "DATA" => {
                    commands.write().await.push(SmtpCommand::Data);
                    Self::respond(&mut writer, &config, &config.data_response.to_bytes()).await?;
                    if config.data_response.code != 354 {
                        continue;
                    }

                    let mut content = Vec::new();
                    loop {
                        line.clear();
                        if reader.read_line(&mut line).await? == 0 {
                            return Ok(());
                        }
                        if line == ".\r\n" || line == ".\n" {
                            break;
                        }
                        content.extend_from_slice(line.as_bytes());
                    }

                    commands
                        .write()
                        .await
                        .push(SmtpCommand::MessageContent(content));
                    Self::respond(&mut writer, &config, &config.data_end_response.to_bytes())
                        .await?;
                }
                "QUIT" => {
                    commands.write().await.push(SmtpCommand::Quit);
                    Self::respond(&mut writer, &config, &config.quit_response.to_bytes()).await?;
                    return Ok(());
                }
                _ => {
                    commands
                        .write()
                        .await
                        .push(SmtpCommand::Other(cmd_line.clone()));
                    Self::respond(
                        &mut writer,
                        &config,
                        &SmtpResponse::new(500, "Unknown command").to_bytes(),
                    )
                    .await?;
                }
            }
        }
    }
}

pub struct MockSmtpServerBuilder {
    config: MockServerConfig,
}

impl MockSmtpServerBuilder {
    fn new() -> Self {
        Self {
            config: MockServerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_greeting(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.greeting = SmtpResponse::new(code, message);
        self
    }

    /// EHLO lines, the first being the server's name.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: &[&str]) -> Self {
        self.config.capabilities = capabilities.iter().map(ToString::to_string).collect();
        self
    }

    /// Final reply to either AUTH mechanism.
    #[must_use]
    pub fn with_auth_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.auth_response = SmtpResponse::new(code, message);
        self
    }

    #[must_use]
    pub fn with_noop_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.noop_response = SmtpResponse::new(code, message);
        self
    }

    #[must_use]
    pub fn with_mail_from_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.mail_from_response = SmtpResponse::new(code, message);
        self
    }

    #[must_use]
    pub fn with_rcpt_to_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.rcpt_to_response = SmtpResponse::new(code, message);
        self
    }

    #[must_use]
    pub fn with_data_end_response(mut self, code: u16, message: impl Into<String>) -> Self {
        self.config.data_end_response = SmtpResponse::new(code, message);
        self
    }

    #[must_use]
    pub const fn with_response_delay(mut self, delay: Duration) -> Self {
        self.config.response_delay = Some(delay);
        self
    }

    /// Close each connection silently after N commands.
    #[must_use]
    pub const fn with_network_error_after_commands(mut self, count: usize) -> Self {
        self.config.drop_after_commands = Some(count);
        self
    }

    /// Bind to an ephemeral local port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn build(self) -> Result<MockSmtpServer, std::io::Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let config = Arc::new(self.config);
        let commands = Arc::new(RwLock::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));
        let connections = Arc::new(AtomicUsize::new(0));

        let server_commands = Arc::clone(&commands);
        let server_shutdown = Arc::clone(&shutdown);
        let server_connections = Arc::clone(&connections);

        tokio::spawn(async move {
            while !server_shutdown.load(Ordering::Relaxed) {
                let accepted = timeout(Duration::from_millis(100), listener.accept()).await;

                if let Ok(Ok((stream, _peer))) = accepted {
                    server_connections.fetch_add(1, Ordering::Relaxed);
                    let config = Arc::clone(&config);
                    let commands = Arc::clone(&server_commands);

                    tokio::spawn(async move {
                        if let Err(e) = MockSmtpServer::handle_client(stream, config, commands).await
                        {
                            tracing::debug!("Mock server client error: {e}");
                        }
                    });
                }
            }
        });

        Ok(MockSmtpServer {
            addr,
            commands_received: commands,
            shutdown,
            connections,
        })
    }
}

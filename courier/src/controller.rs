use std::sync::{Arc, LazyLock};

use courier_common::{Signal, config::Config, internal, tracing};
use courier_dispatch::{
    Composer, ConnectionManager, CredentialProvider, Dispatcher, Ledger, PacingPolicy,
    SessionReport, StaticCredentials,
    recipients,
    transport::{DryRunTransport, SmtpTransport, Transport},
};
use tokio::sync::broadcast;

use crate::prompt;

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

/// Resolves once a second interrupt asks for an immediate exit.
async fn shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!(level = INFO, "CTRL+C entered, finishing the current send. Enter it again to force shutdown");
        }
        _ = terminate.recv() => {
            internal!(level = INFO, "Terminate Signal received, shutting down");
        }
    };

    let mut receiver = SHUTDOWN_BROADCAST.subscribe();

    SHUTDOWN_BROADCAST
        .send(Signal::Shutdown)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Interrupted, e.to_string()))?;

    loop {
        tokio::select! {
            sig = receiver.recv() => {
                match sig {
                    Ok(s) => tracing::debug!("Received {s:?}"),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(e) => tracing::debug!("Received: {e:?}"),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    Ok(())
}

/// Wires the configured collaborators together and performs one run.
pub struct Courier {
    config: Config,
    seed: Option<u64>,
    credentials: Arc<dyn CredentialProvider>,
}

impl Courier {
    /// Credentials come from the environment when set, otherwise from a prompt.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            seed: None,
            credentials: prompt::credential_provider(),
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = credentials;
        self
    }

    fn transport(&self) -> Box<dyn Transport> {
        if self.config.dry_run {
            Box::new(DryRunTransport)
        } else {
            Box::new(SmtpTransport::new(self.config.endpoint.clone()))
        }
    }

    /// Run the dispatcher over every configured recipient.
    ///
    /// # Errors
    ///
    /// This function will return an error if any input cannot be loaded, the
    /// configuration is invalid, the ledger cannot be written, or a second
    /// interrupt forces the process down mid-run.
    pub async fn run(self) -> anyhow::Result<SessionReport> {
        self.config.validate()?;

        internal!(level = INFO, "Courier starting");
        if self.config.dry_run {
            tracing::warn!("DRY RUN ENABLED - no real mail will be sent");
        }

        let recipients = recipients::load(&self.config.recipients).await?;
        let ledger = Ledger::load(self.config.ledger_path.clone()).await?;
        internal!(
            level = INFO,
            "{} recipients in {}, {} already sent",
            recipients.len(),
            self.config.recipients.path.display(),
            ledger.len()
        );

        let credentials = self.credentials.credentials().await?;
        let sender = self
            .config
            .message
            .sender_address
            .clone()
            .unwrap_or_else(|| credentials.username.clone());
        let composer = Composer::load(&self.config.message, sender).await?;

        let connection = ConnectionManager::new(
            self.transport(),
            Arc::new(StaticCredentials::new(credentials)),
        );

        let mut dispatcher = Dispatcher::new(&self.config, ledger, connection, composer)?;
        if let Some(seed) = self.seed {
            dispatcher = dispatcher.with_pacing(PacingPolicy::seeded(&self.config.pacing, seed)?);
        }

        let report = tokio::select! {
            report = dispatcher.run(&recipients, SHUTDOWN_BROADCAST.subscribe()) => report?,
            r = shutdown() => {
                r?;
                anyhow::bail!("Forced shutdown, the current send may not be recorded");
            }
        };

        internal!(level = INFO, "Shutting down...");
        Ok(report)
    }
}

use async_trait::async_trait;
use courier_common::internal;

use super::{Session, Transport};
use crate::{credentials::Credentials, error::SessionError, types::OutgoingMessage};

/// A transport that never touches the network. Every session connects,
/// probes and closes successfully; sends are logged and discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunTransport;

#[async_trait]
impl Transport for DryRunTransport {
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn Session>, SessionError> {
        internal!(
            level = INFO,
            "[dry run] Pretending to authenticate as {}",
            credentials.username
        );
        Ok(Box::new(DryRunSession))
    }
}

struct DryRunSession;

#[async_trait]
impl Session for DryRunSession {
    async fn probe(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn send(&mut self, message: &OutgoingMessage) -> Result<(), SessionError> {
        internal!(level = INFO, "[dry run] Would send to {}", message.recipient);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

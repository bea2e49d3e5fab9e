#![allow(dead_code, clippy::unwrap_used)]

#[path = "../../../courier-smtp/tests/support/mock_server.rs"]
pub mod mock_server;

use std::{
    collections::VecDeque,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use courier_common::config::{Config, MessageConfig, PacingConfig, RetryConfig};
use courier_dispatch::{
    Composer, ConnectionManager, Credentials, Dispatcher, Ledger, OutgoingMessage, PacingPolicy,
    Recipient, SessionError, StaticCredentials,
    transport::{Session, Transport},
};
use tokio::time::Instant;

pub const TEMPLATE: &str = "<p>Hola {{Nombre}}</p><a href=\"/baja?e={{Email}}\">Baja</a>";

/// A message as seen by the scripted endpoint.
#[derive(Debug, Clone)]
pub struct Sent {
    pub recipient: String,
    pub body: String,
    pub at: Instant,
    pub accepted: bool,
}

#[derive(Default)]
struct State {
    connect_results: Mutex<VecDeque<Result<(), SessionError>>>,
    fail_every_connect: Mutex<bool>,
    send_results: Mutex<VecDeque<Result<(), SessionError>>>,
    sends: Mutex<Vec<Sent>>,
    connects: AtomicUsize,
    closes: AtomicUsize,
}

/// An endpoint whose connect and send outcomes are scripted up front.
/// Unscripted operations succeed.
#[derive(Clone, Default)]
pub struct ScriptedEndpoint(Arc<State>);

impl ScriptedEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed_sends(self, count: usize) -> Self {
        {
            let mut results = self.0.send_results.lock().unwrap();
            for _ in 0..count {
                results.push_back(Ok(()));
            }
        }
        self
    }

    pub fn fail_sends(self, count: usize) -> Self {
        {
            let mut results = self.0.send_results.lock().unwrap();
            for _ in 0..count {
                results.push_back(Err(SessionError::Transport(
                    "451 4.3.0 temporary failure".to_string(),
                )));
            }
        }
        self
    }

    pub fn fail_connects(self, count: usize) -> Self {
        {
            let mut results = self.0.connect_results.lock().unwrap();
            for _ in 0..count {
                results.push_back(Err(SessionError::Transport(
                    "connection refused".to_string(),
                )));
            }
        }
        self
    }

    pub fn unreachable(self) -> Self {
        *self.0.fail_every_connect.lock().unwrap() = true;
        self
    }

    pub fn sends(&self) -> Vec<Sent> {
        self.0.sends.lock().unwrap().clone()
    }

    pub fn accepted(&self) -> Vec<Sent> {
        self.sends().into_iter().filter(|s| s.accepted).collect()
    }

    pub fn connects(&self) -> usize {
        self.0.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.0.closes.load(Ordering::SeqCst)
    }

    pub fn connection_manager(&self) -> ConnectionManager {
        ConnectionManager::new(
            Box::new(self.clone()),
            Arc::new(StaticCredentials::new(Credentials::new(
                "info@example.com",
                "secret",
            ))),
        )
    }
}

#[async_trait]
impl Transport for ScriptedEndpoint {
    async fn connect(&self, _: &Credentials) -> Result<Box<dyn Session>, SessionError> {
        self.0.connects.fetch_add(1, Ordering::SeqCst);

        if *self.0.fail_every_connect.lock().unwrap() {
            return Err(SessionError::Transport("connection refused".to_string()));
        }

        let next = self.0.connect_results.lock().unwrap().pop_front();
        next.unwrap_or(Ok(()))
            .map(|()| Box::new(ScriptedSession(Arc::clone(&self.0))) as Box<dyn Session>)
    }
}

struct ScriptedSession(Arc<State>);

#[async_trait]
impl Session for ScriptedSession {
    async fn probe(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn send(&mut self, message: &OutgoingMessage) -> Result<(), SessionError> {
        let result = self
            .0
            .send_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));

        self.0.sends.lock().unwrap().push(Sent {
            recipient: message.recipient.clone(),
            body: message.body.clone(),
            at: Instant::now(),
            accepted: result.is_ok(),
        });

        result
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.0.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Stock pacing and retry settings, with the ledger kept in `dir`.
pub fn config(dir: &Path) -> Config {
    Config {
        pacing: PacingConfig {
            min_delay_secs: 18.0,
            max_delay_secs: 25.0,
            pause_every: 50,
            pause_secs: 120,
        },
        retry: RetryConfig::default(),
        message: MessageConfig {
            sender_name: Some("Aurora Academy".to_string()),
            ..MessageConfig::default()
        },
        ledger_path: dir.join("sent_log.txt"),
        ..Config::default()
    }
}

pub async fn dispatcher(config: &Config, endpoint: &ScriptedEndpoint) -> Dispatcher {
    let ledger = Ledger::load(config.ledger_path.clone()).await.unwrap();
    let composer = Composer::new(
        &config.message,
        TEMPLATE.to_string(),
        "info@example.com".to_string(),
    );

    Dispatcher::new(config, ledger, endpoint.connection_manager(), composer)
        .unwrap()
        .with_pacing(PacingPolicy::seeded(&config.pacing, 7).unwrap())
}

pub fn recipients(pairs: &[(&str, &str)]) -> Vec<Recipient> {
    pairs
        .iter()
        .map(|(name, address)| Recipient::new(*name, *address))
        .collect()
}

pub fn ledger_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|content| content.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

#![allow(dead_code, clippy::unwrap_used)]

#[path = "../../../courier-smtp/tests/support/mock_server.rs"]
pub mod mock_server;

use std::{path::Path, sync::Arc};

use courier_common::config::Config;
use courier_dispatch::{CredentialProvider, Credentials, StaticCredentials};

pub const CONTACTS: &str = "Nombre,Email,Ciudad\n\
    Ana Ruiz,ana@x.com,Lima\n\
    \"Leo\",leo@gmail.com,\"Buenos Aires, AR\"\n\
    Sin Correo,,Quito\n";

pub const TEMPLATE: &str = "<p>Hola {{Nombre}}</p><a href=\"/baja?e={{Email}}\">Baja</a>";

/// Writes the contact list and template into `dir` and points a fast-paced
/// configuration at them.
pub fn workspace(dir: &Path) -> Config {
    std::fs::write(dir.join("contacts.csv"), CONTACTS).unwrap();
    std::fs::write(dir.join("template.html"), TEMPLATE).unwrap();

    let mut config = Config::default();
    config.recipients.path = dir.join("contacts.csv");
    config.message.template_path = dir.join("template.html");
    config.message.sender_name = Some("Aurora Academy".to_string());
    config.ledger_path = dir.join("sent_log.txt");
    config.pacing.min_delay_secs = 0.01;
    config.pacing.max_delay_secs = 0.02;
    config
}

pub fn credentials() -> Arc<dyn CredentialProvider> {
    Arc::new(StaticCredentials::new(Credentials::new(
        "info@example.com",
        "secret",
    )))
}

pub fn ledger_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|content| content.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

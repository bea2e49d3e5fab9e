//! Command line and configuration file discovery.

use std::path::{Path, PathBuf};

use clap::Parser;
use courier_common::config::Config;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "COURIER_CONFIG";

/// Send a personalised message to every recipient in a list, once.
#[derive(Parser, Debug, Default)]
#[command(name = "courier")]
#[command(about = "Paced, deduplicated bulk mail dispatcher", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (RON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Simulate every send; the ledger is left untouched
    #[arg(long)]
    pub dry_run: bool,

    /// Recipient CSV, overriding the configured one
    #[arg(short, long)]
    pub recipients: Option<PathBuf>,

    /// Ledger of confirmed sends, overriding the configured one
    #[arg(short, long)]
    pub ledger: Option<PathBuf>,

    /// Message template, overriding the configured one
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Seed for reproducible pacing delays
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Cli {
    /// Loads the configuration file, if any, and applies command line overrides.
    ///
    /// # Errors
    ///
    /// Fails if a named configuration file does not exist or cannot be parsed.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let path = find_config_file(self.config.as_deref(), std::env::var(CONFIG_ENV).ok())?;

        let mut config = match path {
            Some(path) => read_config(&path)?,
            None => Config::default(),
        };

        self.apply(&mut config);
        Ok(config)
    }

    /// Command line flags take precedence over the file.
    pub fn apply(&self, config: &mut Config) {
        if self.dry_run {
            config.dry_run = true;
        }
        if let Some(path) = &self.recipients {
            config.recipients.path.clone_from(path);
        }
        if let Some(path) = &self.ledger {
            config.ledger_path.clone_from(path);
        }
        if let Some(path) = &self.template {
            config.message.template_path.clone_from(path);
        }
    }
}

/// Parses a RON configuration file.
///
/// # Errors
///
/// Fails if the file cannot be read or is not a valid configuration.
pub fn read_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        anyhow::anyhow!("Failed to read config from {}: {}", path.display(), e)
    })?;

    ron::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
}

/// Find the configuration file using the following precedence:
/// 1. `--config`
/// 2. `COURIER_CONFIG` environment variable
/// 3. ./courier.config.ron (current working directory)
/// 4. /etc/courier/courier.config.ron (system-wide config)
///
/// Returns `None` when nothing was named and no default file exists; every
/// setting then takes its built-in default.
///
/// # Errors
///
/// Fails if `--config` or `COURIER_CONFIG` names a file that does not exist.
pub fn find_config_file(
    explicit: Option<&Path>,
    env_path: Option<String>,
) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(Some(path.to_path_buf()));
        }
        anyhow::bail!("--config points to non-existent file: {}", path.display());
    }

    if let Some(env_path) = env_path {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(Some(path));
        }
        anyhow::bail!(
            "{CONFIG_ENV} points to non-existent file: {}",
            path.display()
        );
    }

    let default_paths = [
        PathBuf::from("./courier.config.ron"),
        PathBuf::from("/etc/courier/courier.config.ron"),
    ];

    Ok(default_paths.into_iter().find(|path| path.exists()))
}

//! Append-only record of confirmed sends.
//!
//! The on-disk form is one address per line. The file is read once at startup
//! and afterwards only ever appended to, one line per confirmed send, synced
//! to disk before [`Ledger::record`] returns. A crash therefore loses at most
//! the send that was in flight.

use std::{
    io,
    path::{Path, PathBuf},
};

use ahash::AHashSet;
use courier_common::tracing;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};

use crate::error::LedgerError;

#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: AHashSet<String>,
    /// The file's last line is unterminated; the next append starts a new line.
    unterminated: bool,
}

impl Ledger {
    /// Reads the ledger at `path`. A missing file is an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] if the file exists but cannot be read.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();

        let (entries, unterminated) = match tokio::fs::read_to_string(&path).await {
            Ok(content) => (parse(&content), !content.is_empty() && !content.ends_with('\n')),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No ledger yet, starting empty");
                (AHashSet::new(), false)
            }
            Err(source) => return Err(LedgerError::Io { path, source }),
        };

        Ok(Self {
            path,
            entries,
            unterminated,
        })
    }

    #[must_use]
    pub fn contains(&self, address: &str) -> bool {
        self.entries.contains(address)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably appends `address`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AlreadyRecorded`] if the address is present; nothing is
    /// written in that case. [`LedgerError::Io`] if the append or sync fails.
    pub async fn record(&mut self, address: &str) -> Result<(), LedgerError> {
        if self.contains(address) {
            return Err(LedgerError::AlreadyRecorded(address.to_string()));
        }

        self.append(address).await.map_err(|source| LedgerError::Io {
            path: self.path.clone(),
            source,
        })?;

        self.unterminated = false;
        self.entries.insert(address.to_string());
        Ok(())
    }

    async fn append(&self, address: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let line = if self.unterminated {
            format!("\n{address}\n")
        } else {
            format!("{address}\n")
        };

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        file.sync_all().await
    }
}

fn parse(content: &str) -> AHashSet<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

//! The push-event stream.
//!
//! Production reads the systemd journal of the registry service:
//! `journalctl -S <since> -f -u <unit> -g <pattern>`, a catch-up over
//! the lookback window followed by a blocking follow of new entries, as
//! one continuous line stream. The grep pattern pre-filters to likely
//! manifest pushes; [`crate::event::extract_push_event`] stays the only
//! authority on what actually dispatches.

use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{info, warn};

/// Journal grep for manifest push request lines.
const PUSH_GREP: &str = "\"PUT /v2/.+/manifests";

/// Errors from starting the journal stream.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("failed to start journalctl: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("journalctl stdout was not captured")]
    MissingStdout,
}

/// A line-oriented event source. `None` means the stream closed.
#[async_trait]
pub trait EventReader: Send {
    async fn next_line(&mut self) -> Option<String>;
}

/// Where and how far back to read the journal.
#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Lookback passed to `journalctl -S`, e.g. `-1h`.
    pub since: String,

    /// The systemd unit whose journal carries registry access logs.
    pub unit: String,
}

/// Follows the registry's journal as a line stream.
pub struct JournalReader {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
}

impl JournalReader {
    /// Spawn `journalctl` and begin following.
    pub fn spawn(config: &JournalConfig) -> Result<Self, JournalError> {
        info!(
            since = %config.since,
            unit = %config.unit,
            "following registry journal"
        );

        let mut child = Command::new("journalctl")
            .arg("-S")
            .arg(&config.since)
            .arg("-f")
            .arg("-u")
            .arg(&config.unit)
            .arg("-g")
            .arg(PUSH_GREP)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take().ok_or(JournalError::MissingStdout)?;
        Ok(Self {
            child,
            lines: BufReader::new(stdout).lines(),
        })
    }
}

#[async_trait]
impl EventReader for JournalReader {
    async fn next_line(&mut self) -> Option<String> {
        match self.lines.next_line().await {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "journal read failed, treating stream as closed");
                let _ = self.child.start_kill();
                None
            }
        }
    }
}

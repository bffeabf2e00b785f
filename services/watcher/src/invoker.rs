//! Repair dispatch.
//!
//! The watcher never repairs anything itself; it runs the repair tool as
//! an external command, once per event, and waits for it to exit. Output
//! is inherited so repair logs interleave with watcher logs on stdout.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::event::PushEvent;

/// Errors from one repair invocation.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("failed to run repair command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("repair command exited with status {code:?}")]
    Failed { code: Option<i32> },
}

/// Dispatches one repair for a pushed image.
#[async_trait]
pub trait RepairInvoker: Send + Sync {
    async fn invoke(&self, event: &PushEvent) -> Result<(), InvokeError>;
}

/// Runs the repair binary as a child process.
#[derive(Debug, Clone)]
pub struct CommandInvoker {
    program: PathBuf,
    dry_run: bool,
    delete_tag_refs: bool,
}

impl CommandInvoker {
    /// Create an invoker for the given repair binary, forwarding the
    /// dry-run and tag-deletion flags to every invocation.
    pub fn new(program: PathBuf, dry_run: bool, delete_tag_refs: bool) -> Self {
        Self {
            program,
            dry_run,
            delete_tag_refs,
        }
    }
}

#[async_trait]
impl RepairInvoker for CommandInvoker {
    async fn invoke(&self, event: &PushEvent) -> Result<(), InvokeError> {
        let mut command = Command::new(&self.program);
        command
            .arg("--repo")
            .arg(&event.repository)
            .arg("--tag")
            .arg(&event.tag);
        if self.dry_run {
            command.arg("--dry-run");
        }
        if self.delete_tag_refs {
            command.arg("--delete-tag");
        }

        debug!(
            program = %self.program.display(),
            repo = %event.repository,
            tag = %event.tag,
            "running repair command"
        );

        let status = command.status().await?;
        if !status.success() {
            return Err(InvokeError::Failed {
                code: status.code(),
            });
        }
        Ok(())
    }
}

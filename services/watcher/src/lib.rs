//! scour watcher library.
//!
//! The watcher tails the registry's access journal for image pushes and
//! dispatches one repair invocation per pushed `(repository, tag)`,
//! rate-limited by a cooldown so a push burst never saturates the store.
//! It is fire-and-forget by design: repair results are logged, never read.
//!
//! This crate primarily ships a `scour-watcher` binary, but we expose a
//! small library surface to enable integration testing and reuse.
//!
//! ## Modules
//!
//! - `event`: push-event extraction from journal lines
//! - `journal`: the event stream (journalctl follow)
//! - `invoker`: repair dispatch as an external command
//! - `gate`: the cooldown rate limiter
//! - `dispatch`: the read → extract → dispatch loop
//! - `config`: command-line arguments

pub mod config;
pub mod dispatch;
pub mod event;
pub mod gate;
pub mod invoker;
pub mod journal;

pub use config::WatcherArgs;
pub use dispatch::{DispatchStats, Dispatcher};
pub use event::{extract_push_event, PushEvent};
pub use gate::RateGate;
pub use invoker::{CommandInvoker, InvokeError, RepairInvoker};
pub use journal::{EventReader, JournalConfig, JournalError, JournalReader};

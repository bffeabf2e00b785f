//! The watcher's core loop: read a line, extract a push, dispatch a repair.
//!
//! Unmatched lines are skipped silently; a failed invocation is logged
//! and never stops the loop. Everything is sequential: one repair runs
//! at a time, and the gate spaces dispatches out.

use tokio::time::Duration;
use tracing::{info, warn};

use crate::event::extract_push_event;
use crate::gate::RateGate;
use crate::invoker::RepairInvoker;
use crate::journal::EventReader;

/// Counters for one dispatcher run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Lines read from the event stream.
    pub lines: u64,

    /// Repair invocations dispatched.
    pub dispatched: u64,

    /// Dispatched invocations that failed to run or exited non-zero.
    pub failures: u64,
}

/// Drives the event stream into the repair invoker.
pub struct Dispatcher {
    gate: RateGate,
}

impl Dispatcher {
    /// Create a dispatcher with the given cooldown between repairs.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            gate: RateGate::new(cooldown),
        }
    }

    /// Run until the event stream closes.
    pub async fn run(
        &mut self,
        reader: &mut dyn EventReader,
        invoker: &dyn RepairInvoker,
    ) -> DispatchStats {
        let mut stats = DispatchStats::default();

        while let Some(line) = reader.next_line().await {
            stats.lines += 1;

            let Some(event) = extract_push_event(&line) else {
                continue;
            };

            self.gate.admit().await;
            info!(
                repo = %event.repository,
                tag = %event.tag,
                "dispatching repair"
            );
            stats.dispatched += 1;

            if let Err(e) = invoker.invoke(&event).await {
                warn!(
                    repo = %event.repository,
                    tag = %event.tag,
                    error = %e,
                    "repair invocation failed"
                );
                stats.failures += 1;
            }
        }

        info!(
            lines = stats.lines,
            dispatched = stats.dispatched,
            failures = stats.failures,
            "event stream closed"
        );
        stats
    }
}

//! scour watcher
//!
//! Tails the registry's journal for image pushes and dispatches one
//! repair invocation per pushed `(repository, tag)`, spaced by a
//! cooldown. Runs until the journal stream closes or the process is
//! terminated; there is no graceful in-flight-repair cancellation.

use anyhow::Result;
use clap::Parser;
use tokio::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scour_watcher::{
    CommandInvoker, Dispatcher, JournalConfig, JournalReader, WatcherArgs,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = WatcherArgs::parse();
    info!(
        repair_path = %args.repair_path.display(),
        unit = %args.unit,
        since = %args.since,
        cooldown_secs = args.cooldown,
        "starting registry watcher"
    );
    if args.dry_run {
        info!("dry run enabled, repairs will not delete anything");
    }

    let mut reader = JournalReader::spawn(&JournalConfig {
        since: args.since.clone(),
        unit: args.unit.clone(),
    })?;
    let invoker = CommandInvoker::new(args.repair_path.clone(), args.dry_run, args.delete_tag);
    let mut dispatcher = Dispatcher::new(Duration::from_secs(args.cooldown));

    tokio::select! {
        stats = dispatcher.run(&mut reader, &invoker) => {
            info!(dispatched = stats.dispatched, "journal stream ended, watcher exiting");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
    }

    Ok(())
}

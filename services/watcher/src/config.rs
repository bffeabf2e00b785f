//! Command-line arguments for the watcher.

use std::path::PathBuf;

use clap::Parser;

/// Watch registry push events and dispatch consistency repairs.
#[derive(Debug, Parser)]
#[command(name = "scour-watcher")]
#[command(author, version, about, long_about = None)]
pub struct WatcherArgs {
    /// Repair binary to invoke for each pushed image.
    #[arg(long, default_value = "scour", env = "SCOUR_REPAIR_PATH")]
    pub repair_path: PathBuf,

    /// Journal lookback to catch up on before following, e.g. -1h.
    #[arg(short = 's', long, default_value = "-1h", allow_hyphen_values = true)]
    pub since: String,

    /// Systemd unit whose journal carries registry access logs.
    #[arg(short = 'u', long, default_value = "docker-registry.service")]
    pub unit: String,

    /// Seconds to wait between repair dispatches.
    #[arg(short = 't', long, default_value_t = 5)]
    pub cooldown: u64,

    /// Forwarded to the repair binary: log actions without deleting.
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Forwarded to the repair binary: also delete all tag references.
    #[arg(long)]
    pub delete_tag: bool,
}

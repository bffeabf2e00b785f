//! scour - consistency repair for a content-addressable registry store.
//!
//! Resolves a repository:tag to its manifest, verifies every digest the
//! manifest references against stored blob content, and prunes all stale
//! references (and provably corrupt blobs). The watcher daemon invokes
//! this binary once per pushed image; it is equally usable by hand.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scour_repair::RepairEngine;
use scour_store::{RedisCliCache, RegistryLayout};

/// Verify and repair one repository:tag in the registry store.
#[derive(Debug, Parser)]
#[command(name = "scour")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Repository part of the image name, like `cardano-public-documentation`.
    #[arg(short = 'r', long)]
    repo: String,

    /// Tag of the image, the part after the `:`.
    #[arg(short = 't', long)]
    tag: String,

    /// Log actions without deleting anything.
    #[arg(short = 'd', long)]
    dry_run: bool,

    /// Also delete all tag references and the tag itself.
    #[arg(long)]
    delete_tag: bool,

    /// The registry root path.
    #[arg(
        long,
        default_value = "/var/lib/docker-registry/docker/registry/v2",
        env = "SCOUR_REGISTRY_PATH"
    )]
    registry_path: PathBuf,

    /// Cache CLI program used to list and delete cache keys.
    #[arg(long, default_value = "redis-cli", env = "SCOUR_REDIS_CLI")]
    redis_cli: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    if args.dry_run {
        info!("dry run enabled, will not actually delete anything");
    }

    let layout = RegistryLayout::new(args.registry_path.clone());
    let cache = Arc::new(RedisCliCache::new(args.redis_cli.clone()));
    let engine = RepairEngine::new(layout, cache, args.dry_run);

    match engine
        .repair_tag(&args.repo, &args.tag, args.delete_tag)
        .await
    {
        Ok(report) => {
            if report.is_clean() && !report.tag_link_missing {
                info!(repo = %args.repo, tag = %args.tag, "image is consistent");
            }
            Ok(())
        }
        Err(e) => {
            error!(repo = %args.repo, tag = %args.tag, error = %e, "repair failed");
            std::process::exit(1);
        }
    }
}

//! Reference pruning for broken digests.
//!
//! Pruning removes every index entry that points at a digest: cache keys,
//! layer links, manifest-revision links, and tag-index links, across every
//! repository (or one, when scoped), optionally followed by the blob
//! itself. Deletions are not transactional; a crash mid-prune leaves
//! strictly fewer dangling references and the next pass finishes the job.
//!
//! Every removal is logged with its resolved path or key before acting.
//! Dry-run is enforced inside the two deletion helpers, so the logged
//! sequence of a dry run is exactly the sequence of a real run.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use scour_digest::Digest;
use scour_store::{blob_presence_key, CacheError, CacheStore, RegistryLayout};

/// Errors from a prune pass.
#[derive(Debug, Error)]
pub enum PruneError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

/// What a prune pass removed (or, under dry run, would remove).
///
/// Counts are counts of logged removal actions, so a dry run and a real
/// run over the same state produce equal outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    /// Cache keys removed.
    pub cache_keys: usize,

    /// Layer, revision, and tag-index links removed.
    pub links: usize,

    /// Whether the blob payload itself was removed.
    pub blob_deleted: bool,
}

impl PruneOutcome {
    /// Returns true if the pass found nothing to remove.
    pub fn is_noop(&self) -> bool {
        self.cache_keys == 0 && self.links == 0 && !self.blob_deleted
    }
}

/// Removes every reference to a digest from the index tree and cache.
pub struct Pruner {
    layout: RegistryLayout,
    cache: Arc<dyn CacheStore>,
    dry_run: bool,
}

impl Pruner {
    /// Create a pruner over a registry tree and its cache.
    pub fn new(layout: RegistryLayout, cache: Arc<dyn CacheStore>, dry_run: bool) -> Self {
        Self {
            layout,
            cache,
            dry_run,
        }
    }

    /// Remove every reference to `digest`.
    ///
    /// `scope` limits link removal to one repository; cache keys are not
    /// repository-scoped and are always purged globally. With
    /// `delete_blob`, the blob payload and its presence cache key go too.
    ///
    /// Idempotent: pruning an already-pruned digest is a no-op beyond
    /// re-scanning.
    pub async fn prune(
        &self,
        digest: &Digest,
        scope: Option<&str>,
        delete_blob: bool,
    ) -> Result<PruneOutcome, PruneError> {
        let mut outcome = PruneOutcome::default();

        for key in self.cache.keys_matching(digest.hex()).await? {
            self.delete_cache_key(&key).await?;
            outcome.cache_keys += 1;
        }

        let repos = match scope {
            Some(repo) => vec![repo.to_string()],
            None => self.layout.repositories()?,
        };

        for repo in &repos {
            if self.remove_path(&self.layout.layer_link(repo, digest))? {
                outcome.links += 1;
            }
            if self.remove_path(&self.layout.revision_link(repo, digest))? {
                outcome.links += 1;
            }
            for tag in self.layout.tags(repo)? {
                if self.remove_path(&self.layout.tag_index_link(repo, &tag, digest))? {
                    outcome.links += 1;
                }
            }
        }

        if delete_blob {
            let blob_path = self.layout.blob_data_path(digest);
            if blob_path.exists() {
                self.delete_cache_key(&blob_presence_key(digest)).await?;
                outcome.cache_keys += 1;
                outcome.blob_deleted = self.remove_path(&blob_path)?;
            }
        }

        Ok(outcome)
    }

    /// Log and delete one cache key, honoring dry-run.
    async fn delete_cache_key(&self, key: &str) -> Result<(), CacheError> {
        info!(key = %key, "removing cache entry");
        if self.dry_run {
            return Ok(());
        }
        self.cache.delete(key).await?;
        Ok(())
    }

    /// Log and remove one path, honoring dry-run.
    ///
    /// Returns whether the path existed. Links are directories in a real
    /// registry tree and plain files in minimal ones; both are handled.
    pub(crate) fn remove_path(&self, path: &Path) -> io::Result<bool> {
        if !path.exists() {
            return Ok(false);
        }

        info!(path = %path.display(), "removing");
        if self.dry_run {
            return Ok(true);
        }

        if path.is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
        Ok(true)
    }
}

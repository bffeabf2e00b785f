//! Tag-level repair orchestration.
//!
//! A repair pass resolves `(repository, tag)` to its manifest, verifies
//! every digest the manifest references against stored content, and
//! prunes whatever fails. Verification failures are per-digest: one
//! broken layer never stops the remaining layers from being checked.

use std::fs;
use std::io;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use scour_digest::{Digest, DigestError};
use scour_store::{CacheStore, RegistryLayout};

use crate::manifest::Manifest;
use crate::prune::{PruneError, Pruner};
use crate::verify::{verify_blob, BlobHealth};

/// Errors that abort a single repair operation.
#[derive(Debug, Error)]
pub enum RepairError {
    /// The tag link exists but does not contain a digest.
    #[error("tag link for {repo}:{tag} contains a malformed digest: {source}")]
    MalformedTagLink {
        repo: String,
        tag: String,
        source: DigestError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("prune failed: {0}")]
    Prune(#[from] PruneError),
}

/// Summary of one repair pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// The manifest digest the tag pointed at, when resolvable.
    pub manifest_digest: Option<Digest>,

    /// The tag link was absent; nothing was verified.
    pub tag_link_missing: bool,

    /// The manifest blob was absent or unparseable and was pruned.
    pub manifest_unreadable: bool,

    /// Digests whose blobs verified clean.
    pub healthy: usize,

    /// Digests pruned because their blob was absent.
    pub missing: usize,

    /// Digests pruned, blob included, because content hashed differently.
    pub mismatched: usize,

    /// Manifest entries skipped because their digest string was malformed.
    pub skipped_malformed: usize,

    /// Digests whose blobs could not be read for verification.
    pub unverifiable: usize,

    /// The tag directory itself was removed.
    pub tag_removed: bool,
}

impl RepairReport {
    /// Returns true if the pass changed (or, dry run, would change) nothing.
    pub fn is_clean(&self) -> bool {
        self.missing == 0 && self.mismatched == 0 && !self.manifest_unreadable && !self.tag_removed
    }
}

/// Verifies a tag's manifest references and prunes the broken ones.
pub struct RepairEngine {
    layout: RegistryLayout,
    pruner: Pruner,
}

impl RepairEngine {
    /// Create an engine over a registry tree and its cache.
    pub fn new(layout: RegistryLayout, cache: Arc<dyn CacheStore>, dry_run: bool) -> Self {
        let pruner = Pruner::new(layout.clone(), cache, dry_run);
        Self { layout, pruner }
    }

    /// Repair one `(repository, tag)` pair.
    ///
    /// With `delete_tag_refs`, additionally removes every reference to the
    /// manifest digest and the tag directory itself.
    pub async fn repair_tag(
        &self,
        repo: &str,
        tag: &str,
        delete_tag_refs: bool,
    ) -> Result<RepairReport, RepairError> {
        let mut report = RepairReport::default();

        info!(repo = %repo, tag = %tag, "verifying image");

        let link_path = self.layout.tag_current_link(repo, tag);
        let raw_link = match fs::read_to_string(&link_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %link_path.display(), "tag link missing, cannot read manifest");
                report.tag_link_missing = true;
                return Ok(report);
            }
            Err(e) => return Err(e.into()),
        };

        let manifest_digest =
            Digest::parse(raw_link.trim()).map_err(|source| RepairError::MalformedTagLink {
                repo: repo.to_string(),
                tag: tag.to_string(),
                source,
            })?;
        report.manifest_digest = Some(manifest_digest.clone());

        match self.read_manifest(&manifest_digest) {
            Some(manifest) => {
                for (kind, raw_digest) in manifest.referenced_digests() {
                    self.check_digest(kind, raw_digest, &mut report).await?;
                }
            }
            None => {
                report.manifest_unreadable = true;
                self.pruner.prune(&manifest_digest, None, true).await?;
            }
        }

        if delete_tag_refs {
            if !report.manifest_unreadable {
                self.pruner.prune(&manifest_digest, None, false).await?;
            }
            report.tag_removed = self
                .pruner
                .remove_path(&self.layout.tag_dir(repo, tag))?;
        }

        info!(
            repo = %repo,
            tag = %tag,
            healthy = report.healthy,
            missing = report.missing,
            mismatched = report.mismatched,
            "verification complete"
        );

        Ok(report)
    }

    /// Read and parse the manifest blob, or `None` if it is unreadable.
    fn read_manifest(&self, digest: &Digest) -> Option<Manifest> {
        let path = self.layout.blob_data_path(digest);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    digest = %digest,
                    path = %path.display(),
                    error = %e,
                    "manifest blob unreadable, treating manifest digest as broken"
                );
                return None;
            }
        };

        match Manifest::from_slice(&bytes) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!(
                    digest = %digest,
                    error = %e,
                    "manifest blob is not a valid manifest, treating manifest digest as broken"
                );
                None
            }
        }
    }

    /// Verify one referenced digest and prune it if broken.
    async fn check_digest(
        &self,
        kind: &'static str,
        raw_digest: &str,
        report: &mut RepairReport,
    ) -> Result<(), RepairError> {
        let digest = match Digest::parse(raw_digest) {
            Ok(digest) => digest,
            Err(e) => {
                // Never build a path or a cache pattern from an
                // unvalidated digest string.
                error!(kind = kind, digest = %raw_digest, error = %e, "malformed digest in manifest, skipping");
                report.skipped_malformed += 1;
                return Ok(());
            }
        };

        let health = match verify_blob(&self.layout, &digest) {
            Ok(health) => health,
            Err(e) => {
                error!(kind = kind, digest = %digest, error = %e, "failed to verify blob");
                report.unverifiable += 1;
                return Ok(());
            }
        };

        match health {
            BlobHealth::Healthy => {
                debug!(kind = kind, digest = %digest, "blob verified");
                report.healthy += 1;
            }
            BlobHealth::Missing => {
                warn!(
                    kind = kind,
                    digest = %digest,
                    path = %self.layout.blob_data_path(&digest).display(),
                    "blob missing, pruning references"
                );
                self.pruner.prune(&digest, None, false).await?;
                report.missing += 1;
            }
            BlobHealth::Mismatched { actual } => {
                warn!(
                    kind = kind,
                    expected = %digest,
                    actual = %actual,
                    "blob content disagrees with digest, pruning references and blob"
                );
                self.pruner.prune(&digest, None, true).await?;
                report.mismatched += 1;
            }
        }

        Ok(())
    }
}

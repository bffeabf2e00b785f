//! Path derivation for the registry's v2 storage tree.
//!
//! Layout, relative to the registry root:
//!
//! ```text
//! blobs/sha256/<aa>/<hex>/data                                  blob payload
//! repositories/<repo>/_layers/sha256/<hex>                      layer link
//! repositories/<repo>/_manifests/revisions/sha256/<hex>         revision link
//! repositories/<repo>/_manifests/tags/<tag>/index/sha256/<hex>  tag-index link
//! repositories/<repo>/_manifests/tags/<tag>/current/link        tag link file
//! ```
//!
//! `<aa>` is the first two hex characters of the digest. All digest-derived
//! segments come from a validated [`Digest`], never from raw input.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use scour_digest::Digest;

/// Path derivation over a registry root directory.
#[derive(Debug, Clone)]
pub struct RegistryLayout {
    root: PathBuf,
}

impl RegistryLayout {
    /// Create a layout rooted at the registry's `v2` storage directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The registry root this layout resolves against.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the blob payload for a digest.
    #[must_use]
    pub fn blob_data_path(&self, digest: &Digest) -> PathBuf {
        self.root
            .join("blobs")
            .join(Digest::ALGORITHM)
            .join(digest.fanout_prefix())
            .join(digest.hex())
            .join("data")
    }

    /// The `repositories` directory holding all per-repo indexes.
    #[must_use]
    pub fn repositories_dir(&self) -> PathBuf {
        self.root.join("repositories")
    }

    /// Layer link for a digest within one repository.
    #[must_use]
    pub fn layer_link(&self, repo: &str, digest: &Digest) -> PathBuf {
        self.repositories_dir()
            .join(repo)
            .join("_layers")
            .join(Digest::ALGORITHM)
            .join(digest.hex())
    }

    /// Manifest-revision link for a digest within one repository.
    #[must_use]
    pub fn revision_link(&self, repo: &str, digest: &Digest) -> PathBuf {
        self.repositories_dir()
            .join(repo)
            .join("_manifests")
            .join("revisions")
            .join(Digest::ALGORITHM)
            .join(digest.hex())
    }

    /// Tag-index link for a digest under one tag of one repository.
    #[must_use]
    pub fn tag_index_link(&self, repo: &str, tag: &str, digest: &Digest) -> PathBuf {
        self.tag_dir(repo, tag)
            .join("index")
            .join(Digest::ALGORITHM)
            .join(digest.hex())
    }

    /// Directory holding one tag's index and current link.
    #[must_use]
    pub fn tag_dir(&self, repo: &str, tag: &str) -> PathBuf {
        self.repositories_dir()
            .join(repo)
            .join("_manifests")
            .join("tags")
            .join(tag)
    }

    /// The `current/link` file naming the manifest digest a tag points at.
    #[must_use]
    pub fn tag_current_link(&self, repo: &str, tag: &str) -> PathBuf {
        self.tag_dir(repo, tag).join("current").join("link")
    }

    /// List repository names present in the tree.
    ///
    /// A missing `repositories` directory is an empty registry, not an error.
    pub fn repositories(&self) -> io::Result<Vec<String>> {
        list_dir_names(&self.repositories_dir())
    }

    /// List tag names present under one repository.
    pub fn tags(&self, repo: &str) -> io::Result<Vec<String>> {
        list_dir_names(
            &self
                .repositories_dir()
                .join(repo)
                .join("_manifests")
                .join("tags"),
        )
    }
}

/// Names of subdirectories of `dir`, sorted for deterministic scans.
fn list_dir_names(dir: &Path) -> io::Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

//! Blob health checks.
//!
//! A digest is healthy iff the blob file at its resolved path exists and
//! its content hashes back to the digest. A missing file is classified
//! without touching the hasher, so absent multi-gigabyte layers cost one
//! `open` call.

use std::fs::File;
use std::io;

use scour_digest::Digest;
use scour_store::RegistryLayout;

/// Outcome of verifying one blob against its claimed digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobHealth {
    /// The blob exists and hashes to its address.
    Healthy,

    /// No file exists at the blob's resolved path.
    Missing,

    /// The blob exists but its content hashes to a different digest.
    ///
    /// A content-addressed store must never keep such a blob: a later
    /// write-once check would treat the address as already present.
    Mismatched { actual: Digest },
}

impl BlobHealth {
    /// Returns true if no repair action is needed.
    pub fn is_healthy(&self) -> bool {
        matches!(self, BlobHealth::Healthy)
    }
}

/// Verify the blob stored for `digest` under `layout`.
pub fn verify_blob(layout: &RegistryLayout, digest: &Digest) -> io::Result<BlobHealth> {
    let path = layout.blob_data_path(digest);

    let file = match File::open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BlobHealth::Missing),
        Err(e) => return Err(e),
    };

    let actual = Digest::of_reader(file)?;
    if actual == *digest {
        Ok(BlobHealth::Healthy)
    } else {
        Ok(BlobHealth::Mismatched { actual })
    }
}

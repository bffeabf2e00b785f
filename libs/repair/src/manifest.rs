//! Image manifest model.
//!
//! Only the fields repair needs are modeled: the config descriptor and the
//! ordered layer descriptors. Parsing is deliberately lenient: unknown
//! fields and missing sizes are tolerated, since a manifest that is valid
//! JSON with config and layer digests is repairable regardless of schema
//! vintage.

use serde::{Deserialize, Serialize};

/// An image manifest: one config blob plus an ordered list of layers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Schema version.
    #[serde(default)]
    pub schema_version: u32,

    /// Media type.
    #[serde(default)]
    pub media_type: Option<String>,

    /// Config descriptor.
    pub config: Descriptor,

    /// Layer descriptors, in order.
    pub layers: Vec<Descriptor>,
}

/// Content descriptor.
///
/// The digest is kept as a raw string here; it is validated where it is
/// used, so one malformed entry cannot poison parsing of the manifest.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content.
    #[serde(default)]
    pub media_type: Option<String>,

    /// Digest of the content.
    pub digest: String,

    /// Size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
}

impl Manifest {
    /// Parse a manifest from raw blob bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Every digest string the manifest references, config first.
    pub fn referenced_digests(&self) -> impl Iterator<Item = (&'static str, &str)> {
        std::iter::once(("config", self.config.digest.as_str())).chain(
            self.layers
                .iter()
                .map(|layer| ("layer", layer.digest.as_str())),
        )
    }
}

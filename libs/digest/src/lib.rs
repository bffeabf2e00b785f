//! # scour-digest
//!
//! Content digest type, parsing, and validation for the scour toolkit.
//!
//! ## Design Principles
//!
//! - A digest is the address of a blob; nothing downstream touches the
//!   filesystem or the cache with an unvalidated digest string
//! - Digests have a canonical string representation with strict parsing
//! - Hex is normalized to lowercase at parse time so comparisons and
//!   path construction never depend on input casing
//!
//! ## Digest Format
//!
//! `sha256:{64 lowercase hex characters}`
//!
//! Example:
//! - `sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855`
//!
//! sha256 is the only supported algorithm; anything else is rejected at
//! the parse boundary rather than resolved into a path.

mod error;

pub use error::DigestError;

use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

use sha2::{Digest as _, Sha256};

/// Number of hex characters in a sha256 digest.
const HEX_LEN: usize = 64;

/// A validated sha256 content digest.
///
/// The inner hex string is always 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest {
    hex: String,
}

impl Digest {
    /// The only algorithm this store addresses content with.
    pub const ALGORITHM: &'static str = "sha256";

    /// Parse a digest from its canonical `sha256:<hex>` form.
    ///
    /// Uppercase hex is accepted and normalized to lowercase.
    pub fn parse(input: &str) -> Result<Self, DigestError> {
        if input.is_empty() {
            return Err(DigestError::Empty);
        }

        let (algorithm, hex) = input.split_once(':').ok_or(DigestError::MissingSeparator)?;

        if algorithm != Self::ALGORITHM {
            return Err(DigestError::UnsupportedAlgorithm {
                expected: Self::ALGORITHM,
                actual: algorithm.to_string(),
            });
        }

        if hex.len() != HEX_LEN {
            return Err(DigestError::InvalidLength {
                expected: HEX_LEN,
                actual: hex.len(),
            });
        }

        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DigestError::InvalidHex {
                hex: hex.to_string(),
            });
        }

        Ok(Self {
            hex: hex.to_ascii_lowercase(),
        })
    }

    /// Compute the digest of a byte slice.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self {
            hex: hex::encode(Sha256::digest(bytes)),
        }
    }

    /// Compute the digest of a reader's full contents.
    ///
    /// Streams through the hasher, so blob size is not bounded by memory.
    pub fn of_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut hasher = Sha256::new();
        io::copy(&mut reader, &mut hasher)?;
        Ok(Self {
            hex: hex::encode(hasher.finalize()),
        })
    }

    /// The full 64-character lowercase hex value.
    #[must_use]
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// The two-character fan-out prefix used by the blob directory layout.
    #[must_use]
    pub fn fanout_prefix(&self) -> &str {
        &self.hex[..2]
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", Self::ALGORITHM, self.hex)
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

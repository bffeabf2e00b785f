//! Error types for digest parsing and validation.

use thiserror::Error;

/// Errors that can occur when parsing a digest string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DigestError {
    /// The digest string is empty.
    #[error("digest cannot be empty")]
    Empty,

    /// The digest is missing the `algorithm:` separator.
    #[error("digest missing ':' separator between algorithm and hex")]
    MissingSeparator,

    /// The digest names an algorithm other than sha256.
    #[error("unsupported digest algorithm: expected '{expected}', got '{actual}'")]
    UnsupportedAlgorithm {
        expected: &'static str,
        actual: String,
    },

    /// The hex portion has the wrong length.
    #[error("invalid digest length: expected {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// The hex portion contains non-hex characters.
    #[error("invalid digest hex: '{hex}'")]
    InvalidHex { hex: String },
}

impl DigestError {
    /// Returns true if the error indicates an algorithm this store does not speak.
    pub fn is_algorithm_error(&self) -> bool {
        matches!(self, DigestError::UnsupportedAlgorithm { .. })
    }
}

//! Manifest Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A manifest error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for manifest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The payload is not a manifest frame at all (bad magic, truncated).
    #[display("malformed manifest frame: {_0}")]
    MalformedFrame(#[error(not(source))] &'static str),
    /// The frame was written by a newer (or unknown) codec revision.
    #[display("unsupported manifest format version: {_0}")]
    UnsupportedVersion(#[error(not(source))] u8),
    /// A local manifest was given where a target manifest was expected, or
    /// the other way around.
    #[display("expected a {expected} manifest, found {found}")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },
    /// Body checksum does not match the frame header; the payload is corrupt.
    #[display("checksum mismatch: header {expected:08x}, body {actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
    /// Body could not be decompressed, or inflates past the body limit.
    #[display("invalid compressed body")]
    Decompression,
    /// Body decompressed fine but is not a manifest document.
    #[display("invalid manifest body")]
    Deserialize,
    /// The manifest decoded but contradicts itself (dangling indexes,
    /// duplicate entries, unusable names).
    #[display("inconsistent manifest: {_0}")]
    Inconsistent(#[error(not(source))] String),
    /// Serializing a manifest failed.
    #[display("failed to encode manifest")]
    Encode,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // The bytes are either a valid manifest or they are not.
        false
    }
}

//! Checker Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.
//!
//! Only fatal conditions are errors. Best-effort failures (backup recovery,
//! deleting a stale file, pruning directories) are reported as
//! [`BestEffortFailure`](crate::BestEffortFailure) values and never abort a
//! check.

use crate::ManifestSource;
use derive_more::{Display, Error};

/// A checker error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for checker operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies why a resource check was aborted.
///
/// ### Caller errors
/// - [`ErrorKind::Configuration`]
///
/// ### Dependency errors
/// - [`ErrorKind::Transport`]
/// - [`ErrorKind::Decode`]
///
/// ### Defects
/// - [`ErrorKind::LoadAborted`]
/// - [`ErrorKind::ProtocolViolation`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A storage area, the codec or a file name is not configured. Raised
    /// before any manifest load is issued.
    #[display("resource checker is not configured: {_0}")]
    Configuration(#[error(not(source))] String),
    /// Loading a manifest failed. Only ever raised for the target manifest;
    /// local manifests that fail to load count as empty.
    #[display("could not load the {_0} manifest")]
    Transport(#[error(not(source))] ManifestSource),
    /// A manifest payload was present but is not a valid manifest.
    #[display("could not decode the {_0} manifest")]
    Decode(#[error(not(source))] ManifestSource),
    /// The task handling a manifest load died (panicked or was cancelled)
    /// before the check could finish.
    #[display("the {_0} manifest load was aborted")]
    LoadAborted(#[error(not(source))] ManifestSource),
    /// The check orchestration broke one of its own invariants.
    #[display("protocol violation: {_0}")]
    ProtocolViolation(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

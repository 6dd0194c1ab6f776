//! Crash recovery of the mutable-area manifest.
//!
//! Whoever rewrites the mutable-area manifest first moves the old one to a
//! backup path, writes the new file, then removes the backup. A backup that
//! is still around means that sequence was interrupted and the manifest next
//! to it cannot be trusted.

use derive_more::Display;
use resman_storage::StorageBackend;
use std::path::Path;
use tracing::instrument;

/// Result of [`recover`].
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// No backup file; the manifest was left as is.
    #[display("clean")]
    Clean,
    /// The backup replaced the manifest.
    #[display("restored")]
    Restored,
    /// Restoring failed; the manifest may be missing, which reads as an
    /// empty mutable area.
    #[display("failed")]
    Failed,
}
impl RecoveryOutcome {
    pub fn is_failed(self) -> bool {
        self == Self::Failed
    }
}

/// Restore `manifest` from `backup` if a backup exists.
///
/// Never fails: storage errors are logged and reported as
/// [`RecoveryOutcome::Failed`] so the check can go on.
#[instrument(skip(backend), fields(backend = backend.name(), manifest = %manifest.display()))]
pub async fn recover(backend: &dyn StorageBackend, manifest: &Path, backup: &Path) -> RecoveryOutcome {
    match backend.exists(backup).await {
        Ok(false) => return RecoveryOutcome::Clean,
        Ok(true) => {},
        Err(e) => {
            tracing::warn!(error = %e, path = %backup.display(), "Could not look for manifest backup");
            return RecoveryOutcome::Failed;
        },
    }
    tracing::info!(path = %backup.display(), "Found manifest backup, restoring");
    match backend.delete(manifest).await {
        Ok(()) => {},
        Err(e) if e.is_not_found() => {},
        Err(e) => {
            tracing::warn!(error = %e, path = %manifest.display(), "Could not remove half-written manifest");
            return RecoveryOutcome::Failed;
        },
    }
    if let Err(e) = backend.rename(backup, manifest).await {
        tracing::warn!(error = %e, path = %backup.display(), "Could not restore manifest backup");
        return RecoveryOutcome::Failed;
    }
    RecoveryOutcome::Restored
}

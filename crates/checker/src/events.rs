use crate::recovery::RecoveryOutcome;
use derive_more::Display;
use resman_manifest::models::{LoadType, ResourceName};
use std::path::PathBuf;

/// Progress events emitted by [`ResourceChecker::check`](crate::ResourceChecker::check).
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started): exactly once.
/// 2. [`Recovered`](Self::Recovered): exactly once, before any manifest is
///    loaded.
/// 3. [`ResourceNeedsUpdate`](Self::ResourceNeedsUpdate): zero or more times,
///    one per resource, in no particular order.
/// 4. [`Complete`](Self::Complete): exactly once, signalling the stream is
///    finished.
///
/// A fatal error terminates the stream early, in which case
/// [`Complete`](Self::Complete) is never emitted and the previous snapshot
/// stays in place.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckEvent {
    Started,
    Recovered(RecoveryOutcome),
    ResourceNeedsUpdate(UpdateRequest),
    Complete(CheckSummary),
}

/// A resource that has to be downloaded into the mutable area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub name: ResourceName,
    pub load_type: LoadType,
    pub length: u64,
    pub hash: u32,
    pub compressed_length: u64,
    pub compressed_hash: u32,
}

/// Something went wrong that did not stop the check.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum BestEffortFailure {
    #[display("manifest backup could not be restored")]
    Recovery,
    #[display("could not delete {}: {reason}", path.display())]
    Delete { name: ResourceName, path: PathBuf, reason: String },
    #[display("could not prune empty directories: {_0}")]
    Prune(String),
}

/// Totals of a completed reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckSummary {
    /// Disused resources purged from the mutable area, including any whose
    /// deletion failed (see `failures`).
    pub removed_count: u64,
    pub update_count: u64,
    pub update_total_length: u64,
    pub update_total_compressed_length: u64,
    pub failures: Vec<BestEffortFailure>,
}
impl CheckSummary {
    /// The four totals, without the failure list.
    pub fn totals(&self) -> (u64, u64, u64, u64) {
        (self.removed_count, self.update_count, self.update_total_length, self.update_total_compressed_length)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Everything a check emitted, collected.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub recovery: RecoveryOutcome,
    pub updates: Vec<UpdateRequest>,
    pub summary: CheckSummary,
}

//! A single resource check: the join over the three manifest loads and the
//! reconciliation pass it triggers.
//!
//! Each load completion claims its source bit, parses its payload and merges
//! the observations into the record table, then sets its ready bit. The
//! completion that sets the last ready bit runs the pass; since every bit is
//! set at most once, exactly one completion ever sees the full mask.

use crate::assets::AssetIndex;
use crate::context::{
    CachedResourceEntry, ManifestMetadata, ResolvedResourceEntry, ResourceContext, ResourceSnapshot, StorageArea,
};
use crate::error::{ErrorKind, Result};
use crate::events::{BestEffortFailure, CheckEvent, CheckSummary, UpdateRequest};
use crate::groups::ResourceGroups;
use crate::record::{CheckRecord, Disposition, LocalObservation, TargetObservation};
use crate::recovery::RecoveryOutcome;
use crate::settings::CheckerSettings;
use crate::source::ManifestSource;
use exn::ResultExt;
use resman_manifest::ManifestCodec;
use resman_manifest::models::{LocalManifest, ResourceName, TargetManifest};
use resman_storage::BackendHandle;
use resman_storage::error::Result as StorageResult;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedSender;
use tracing::instrument;

/// A manifest load after deciding whether its failure is tolerable.
#[derive(Debug)]
pub(crate) enum LoadOutcome {
    Loaded(Vec<u8>),
    /// No manifest: the storage area holds no resources yet.
    Missing,
}
impl LoadOutcome {
    /// The target manifest must be present; local manifests that are empty,
    /// absent or unreadable count as [`Missing`](Self::Missing).
    pub(crate) fn classify(source: ManifestSource, loaded: StorageResult<Vec<u8>>) -> Result<Self> {
        match loaded {
            Ok(bytes) if !bytes.is_empty() => Ok(Self::Loaded(bytes)),
            Ok(_) if source == ManifestSource::Target => exn::bail!(ErrorKind::Transport(source)),
            Err(e) if source == ManifestSource::Target => Err(e.raise(ErrorKind::Transport(source))),
            Ok(_) => {
                tracing::debug!(%source, "Manifest is empty");
                Ok(Self::Missing)
            },
            Err(e) if e.is_not_found() => {
                tracing::debug!(%source, "No manifest found");
                Ok(Self::Missing)
            },
            Err(e) => {
                tracing::warn!(%source, error = %e, "Could not load manifest, treating storage area as empty");
                Ok(Self::Missing)
            },
        }
    }
}

/// Projections of the target manifest, built as soon as it is parsed.
struct ParsedTarget {
    metadata: ManifestMetadata,
    assets: AssetIndex,
    groups: ResourceGroups,
}

#[derive(Default)]
struct SessionState {
    records: HashMap<ResourceName, CheckRecord>,
    /// Target resources skipped because their variant is not selected.
    other_variants: HashSet<ResourceName>,
    cached: HashMap<ResourceName, CachedResourceEntry>,
    target: Option<ParsedTarget>,
}
impl SessionState {
    fn record(&mut self, name: ResourceName) -> &mut CheckRecord {
        self.records.entry(name).or_insert_with_key(|name| CheckRecord::new(name.clone()))
    }
}

pub(crate) struct CheckSession {
    variant: Option<String>,
    settings: CheckerSettings,
    codec: Arc<dyn ManifestCodec>,
    read_write: BackendHandle,
    context: Arc<ResourceContext>,
    recovery: RecoveryOutcome,
    claimed: AtomicU8,
    ready: AtomicU8,
    failed: AtomicBool,
    state: Mutex<SessionState>,
    events: UnboundedSender<Result<CheckEvent>>,
}

impl CheckSession {
    pub(crate) fn new(
        variant: Option<String>,
        settings: CheckerSettings,
        codec: Arc<dyn ManifestCodec>,
        read_write: BackendHandle,
        context: Arc<ResourceContext>,
        recovery: RecoveryOutcome,
        events: UnboundedSender<Result<CheckEvent>>,
    ) -> Self {
        Self {
            variant,
            settings,
            codec,
            read_write,
            context,
            recovery,
            claimed: AtomicU8::new(0),
            ready: AtomicU8::new(0),
            failed: AtomicBool::new(false),
            state: Mutex::new(SessionState::default()),
            events,
        }
    }

    pub(crate) fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    pub(crate) fn emit(&self, event: Result<CheckEvent>) {
        if self.events.send(event).is_err() {
            tracing::trace!("Check event dropped, nobody is listening");
        }
    }

    /// Completion handler of one manifest load.
    ///
    /// Returns the summary if this completion ran the reconciliation pass.
    /// Any error marks the session failed: later completions are ignored and
    /// the context keeps its previous snapshot.
    pub(crate) async fn complete(
        &self,
        source: ManifestSource,
        loaded: StorageResult<Vec<u8>>,
    ) -> Result<Option<CheckSummary>> {
        let result = self.complete_inner(source, loaded).await;
        if result.is_err() {
            self.failed.store(true, Ordering::Release);
        }
        result
    }

    async fn complete_inner(
        &self,
        source: ManifestSource,
        loaded: StorageResult<Vec<u8>>,
    ) -> Result<Option<CheckSummary>> {
        let bit = source.bit();
        if self.claimed.fetch_or(bit, Ordering::AcqRel) & bit != 0 {
            exn::bail!(ErrorKind::ProtocolViolation(format!("{source} manifest completed more than once")));
        }
        if self.has_failed() {
            tracing::debug!(%source, "Ignoring manifest, check already failed");
            return Ok(None);
        }

        match LoadOutcome::classify(source, loaded)? {
            LoadOutcome::Loaded(bytes) => self.parse(source, &bytes)?,
            LoadOutcome::Missing => {},
        }

        let ready = self.ready.fetch_or(bit, Ordering::AcqRel) | bit;
        if ready != ManifestSource::ALL_BITS {
            tracing::debug!(%source, ready, "Manifest ready, waiting for the others");
            return Ok(None);
        }
        self.reconcile().await.map(Some)
    }

    fn parse(&self, source: ManifestSource, bytes: &[u8]) -> Result<()> {
        match source {
            ManifestSource::Target => {
                let manifest = self.codec.decode_target(bytes).or_raise(|| ErrorKind::Decode(source))?;
                self.merge_target(manifest)
            },
            ManifestSource::ReadOnly | ManifestSource::ReadWrite => {
                let manifest = self.codec.decode_local(bytes).or_raise(|| ErrorKind::Decode(source))?;
                self.merge_local(source, manifest)
            },
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn merge_target(&self, manifest: TargetManifest) -> Result<()> {
        let variant = self.variant.as_deref();
        let assets = AssetIndex::project(&manifest, variant);
        let groups = ResourceGroups::project(&manifest, variant);
        let mut state = self.state();
        for resource in &manifest.resources {
            let name = resource.resource_name();
            if name.matches_variant(variant) {
                state.record(name).set_target(TargetObservation::from(resource))?;
            } else {
                state.other_variants.insert(name);
            }
        }
        tracing::debug!(
            resources = manifest.resources.len(),
            skipped = state.other_variants.len(),
            assets = assets.len(),
            "Parsed target manifest"
        );
        state.target = Some(ParsedTarget {
            metadata: ManifestMetadata {
                applicable_version: manifest.applicable_version,
                internal_version: manifest.internal_version,
            },
            assets,
            groups,
        });
        Ok(())
    }

    fn merge_local(&self, source: ManifestSource, manifest: LocalManifest) -> Result<()> {
        let mut state = self.state();
        for resource in &manifest.resources {
            let name = resource.resource_name();
            let observation = LocalObservation::from(resource);
            if source == ManifestSource::ReadWrite {
                state.cached.insert(name.clone(), observation.into());
                state.record(name).set_cache(observation)?;
            } else {
                state.record(name).set_local(observation)?;
            }
        }
        tracing::debug!(%source, resources = manifest.resources.len(), "Parsed local manifest");
        Ok(())
    }

    /// Classify every record, apply the side effects and publish a new
    /// snapshot.
    #[instrument(skip(self), fields(variant = ?self.variant))]
    async fn reconcile(&self) -> Result<CheckSummary> {
        let SessionState { records, other_variants, mut cached, target } = std::mem::take(&mut *self.state());
        let Some(ParsedTarget { metadata, assets, mut groups }) = target else {
            exn::bail!(ErrorKind::ProtocolViolation("reconciliation started without a target manifest".to_string()));
        };

        let mut summary = CheckSummary::default();
        if self.recovery.is_failed() {
            summary.failures.push(BestEffortFailure::Recovery);
        }
        let mut resolved = HashMap::new();
        for record in records.into_values() {
            let keep = self.settings.keep_other_variants && other_variants.contains(record.name());
            let verdict = record.verdict(keep);
            let name = record.name();
            match (verdict.disposition, record.target()) {
                (Disposition::StorageInReadOnly | Disposition::StorageInReadWrite, Some(target)) => {
                    let storage = match verdict.disposition {
                        Disposition::StorageInReadOnly => StorageArea::ReadOnly,
                        _ => StorageArea::ReadWrite,
                    };
                    groups.mark_ready(name);
                    resolved.insert(
                        name.clone(),
                        ResolvedResourceEntry {
                            name: name.clone(),
                            load_type: target.load_type,
                            length: target.length,
                            hash: target.hash,
                            storage,
                        },
                    );
                },
                (Disposition::NeedUpdate, Some(target)) => {
                    // Totals saturate: a codec is not obliged to bound sizes.
                    summary.update_count += 1;
                    summary.update_total_length = summary.update_total_length.saturating_add(target.length);
                    summary.update_total_compressed_length =
                        summary.update_total_compressed_length.saturating_add(target.compressed_length);
                    tracing::debug!(resource = %name, length = target.length, "Resource needs update");
                    self.emit(Ok(CheckEvent::ResourceNeedsUpdate(UpdateRequest {
                        name: name.clone(),
                        load_type: target.load_type,
                        length: target.length,
                        hash: target.hash,
                        compressed_length: target.compressed_length,
                        compressed_hash: target.compressed_hash,
                    })));
                },
                (Disposition::Disuse | Disposition::Unavailable, None) => {},
                (disposition, _) => exn::bail!(ErrorKind::ProtocolViolation(format!(
                    "{name} classified as {disposition} contradicts its observations"
                ))),
            }
            if verdict.needs_removal {
                summary.removed_count += 1;
                match self.remove(name).await {
                    Some(failure) => summary.failures.push(failure),
                    None => {
                        cached.remove(name);
                    },
                }
            }
        }

        if summary.removed_count > 0 {
            match self.read_write.prune_empty_dirs().await {
                Ok(pruned) => tracing::debug!(pruned, "Pruned empty directories"),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not prune empty directories");
                    summary.failures.push(BestEffortFailure::Prune(e.to_string()));
                },
            }
        }

        self.context.publish(ResourceSnapshot {
            variant: self.variant.clone(),
            metadata,
            resolved,
            cached,
            assets,
            groups,
        });
        tracing::info!(
            removed = summary.removed_count,
            updates = summary.update_count,
            update_bytes = summary.update_total_length,
            failures = summary.failures.len(),
            "Resource check complete"
        );
        self.emit(Ok(CheckEvent::Complete(summary.clone())));
        Ok(summary)
    }

    /// Delete the file of a disused resource. A file that is already gone
    /// counts as deleted.
    async fn remove(&self, name: &ResourceName) -> Option<BestEffortFailure> {
        let path = name.file_path(&self.settings.resource_extension);
        match self.read_write.delete(&path).await {
            Ok(()) => {
                tracing::debug!(resource = %name, path = %path.display(), "Deleted disused resource");
                None
            },
            Err(e) if e.is_not_found() => {
                tracing::debug!(resource = %name, path = %path.display(), "Disused resource already gone");
                None
            },
            Err(e) => {
                tracing::warn!(resource = %name, path = %path.display(), error = %e, "Could not delete disused resource");
                Some(BestEffortFailure::Delete { name: name.clone(), path, reason: e.to_string() })
            },
        }
    }
}

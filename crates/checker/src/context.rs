//! The resource-management context owning the results of the last
//! successful check.

use crate::assets::AssetIndex;
use crate::groups::ResourceGroups;
use crate::record::LocalObservation;
use derive_more::Display;
use resman_manifest::models::{LoadType, ResourceName};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Which storage area serves a resolved resource.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageArea {
    #[display("read-only")]
    ReadOnly,
    #[display("read-write")]
    ReadWrite,
}

/// A resource that can be loaded as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResourceEntry {
    pub name: ResourceName,
    pub load_type: LoadType,
    pub length: u64,
    pub hash: u32,
    pub storage: StorageArea,
}

/// A resource file present in the mutable area, wanted or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedResourceEntry {
    pub load_type: LoadType,
    pub length: u64,
    pub hash: u32,
}
impl From<LocalObservation> for CachedResourceEntry {
    fn from(observation: LocalObservation) -> Self {
        Self { load_type: observation.load_type, length: observation.length, hash: observation.hash }
    }
}

/// Versions declared by the target manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestMetadata {
    /// Application version the resources were built for.
    pub applicable_version: String,
    pub internal_version: u32,
}

/// Results of one successful check. Never mutated after publication.
#[derive(Debug, Clone)]
pub struct ResourceSnapshot {
    pub variant: Option<String>,
    pub metadata: ManifestMetadata,
    pub resolved: HashMap<ResourceName, ResolvedResourceEntry>,
    pub cached: HashMap<ResourceName, CachedResourceEntry>,
    pub assets: AssetIndex,
    pub groups: ResourceGroups,
}
impl ResourceSnapshot {
    pub fn resolve(&self, name: &ResourceName) -> Option<&ResolvedResourceEntry> {
        self.resolved.get(name)
    }

    /// Resolve the resource an asset is packed into.
    pub fn resolve_asset(&self, asset: &str) -> Option<&ResolvedResourceEntry> {
        self.assets.asset(asset).and_then(|info| self.resolved.get(&info.resource))
    }
}

/// Owner of the current [`ResourceSnapshot`].
///
/// A check builds a complete new snapshot and swaps it in on success, so
/// readers holding the previous one are never disturbed.
#[derive(Debug, Default)]
pub struct ResourceContext {
    current: RwLock<Option<Arc<ResourceSnapshot>>>,
}

impl ResourceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The snapshot of the last successful check, if any.
    pub fn snapshot(&self) -> Option<Arc<ResourceSnapshot>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn metadata(&self) -> Option<ManifestMetadata> {
        self.snapshot().map(|snapshot| snapshot.metadata.clone())
    }

    /// Swap in a new snapshot, returning the replaced one.
    pub(crate) fn publish(&self, snapshot: ResourceSnapshot) -> Option<Arc<ResourceSnapshot>> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        current.replace(Arc::new(snapshot))
    }
}

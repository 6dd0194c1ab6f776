use super::{LoadType, ResourceName};
use serde::{Deserialize, Serialize};

/// An asset packed inside one of the target resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetAsset {
    pub name: String,
    /// Indexes into [`TargetManifest::assets`].
    #[serde(default)]
    pub dependencies: Vec<usize>,
}

/// A resource the remote manifest says should exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetResource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default)]
    pub load_type: LoadType,
    pub length: u64,
    pub hash: u32,
    pub compressed_length: u64,
    pub compressed_hash: u32,
    /// Indexes into [`TargetManifest::assets`] of the assets this resource
    /// contains.
    #[serde(default)]
    pub assets: Vec<usize>,
}
impl TargetResource {
    pub fn resource_name(&self) -> ResourceName {
        ResourceName::new(self.name.clone(), self.variant.clone())
    }
}

/// A named subset of the target resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetResourceGroup {
    pub name: String,
    /// Indexes into [`TargetManifest::resources`].
    #[serde(default)]
    pub resources: Vec<usize>,
}

/// The authoritative remote manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetManifest {
    /// Application version this resource set was built for.
    pub applicable_version: String,
    /// Monotonic resource build number.
    pub internal_version: u32,
    #[serde(default)]
    pub assets: Vec<TargetAsset>,
    #[serde(default)]
    pub resources: Vec<TargetResource>,
    #[serde(default)]
    pub resource_groups: Vec<TargetResourceGroup>,
}

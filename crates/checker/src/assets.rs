//! Asset → resource projection of the target manifest.

use resman_manifest::models::{ResourceName, TargetManifest};
use std::collections::{HashMap, HashSet};

/// An asset packed into one of the resources wanted for the current variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInfo {
    pub name: String,
    /// The resource the asset is packed into.
    pub resource: ResourceName,
    /// Direct dependencies, in manifest order.
    pub dependencies: Vec<String>,
}

/// Lookup of the assets belonging to resources of the current variant.
///
/// Dependencies are kept by name even when they point at an asset outside
/// the projection; traversals just stop there.
#[derive(Debug, Clone, Default)]
pub struct AssetIndex {
    assets: HashMap<String, AssetInfo>,
    by_resource: HashMap<ResourceName, Vec<String>>,
}

impl AssetIndex {
    /// Project the assets of every resource whose variant is wanted while
    /// `variant` is selected.
    ///
    /// Expects a validated manifest: out-of-range indexes are skipped.
    pub fn project(manifest: &TargetManifest, variant: Option<&str>) -> Self {
        let mut index = Self::default();
        for resource in &manifest.resources {
            let owner = resource.resource_name();
            if !owner.matches_variant(variant) {
                continue;
            }
            for asset in resource.assets.iter().filter_map(|&i| manifest.assets.get(i)) {
                let dependencies =
                    asset.dependencies.iter().filter_map(|&i| manifest.assets.get(i)).map(|d| d.name.clone()).collect();
                index.by_resource.entry(owner.clone()).or_default().push(asset.name.clone());
                index.assets.insert(
                    asset.name.clone(),
                    AssetInfo { name: asset.name.clone(), resource: owner.clone(), dependencies },
                );
            }
        }
        index
    }

    pub fn asset(&self, name: &str) -> Option<&AssetInfo> {
        self.assets.get(name)
    }

    pub fn dependencies(&self, name: &str) -> Option<&[String]> {
        self.assets.get(name).map(|info| info.dependencies.as_slice())
    }

    /// Every asset `name` depends on, directly or not, depth first. Each
    /// asset appears once; cycles are tolerated and `name` itself is never
    /// part of the result.
    pub fn all_dependencies(&self, name: &str) -> Vec<&str> {
        let mut seen: HashSet<&str> = HashSet::from([name]);
        let mut ordered = Vec::new();
        let mut pending: Vec<&str> = match self.assets.get(name) {
            Some(info) => info.dependencies.iter().rev().map(String::as_str).collect(),
            None => return ordered,
        };
        while let Some(current) = pending.pop() {
            if !seen.insert(current) {
                continue;
            }
            ordered.push(current);
            if let Some(info) = self.assets.get(current) {
                pending.extend(info.dependencies.iter().rev().map(String::as_str));
            }
        }
        ordered
    }

    /// Names of the assets packed into `resource`.
    pub fn assets_of(&self, resource: &ResourceName) -> &[String] {
        self.by_resource.get(resource).map(Vec::as_slice).unwrap_or_default()
    }

    /// Resources that must be present before `name` can be loaded: the
    /// owner of the asset and of everything it depends on.
    pub fn required_resources(&self, name: &str) -> Vec<&ResourceName> {
        let mut resources: Vec<&ResourceName> = Vec::new();
        let names = std::iter::once(name).chain(self.all_dependencies(name));
        for info in names.filter_map(|n| self.assets.get(n)) {
            if !resources.contains(&&info.resource) {
                resources.push(&info.resource);
            }
        }
        resources
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetInfo> {
        self.assets.values()
    }
}
